// src/validation/mod.rs

pub mod bucket;
pub mod route;
pub mod route_validator;

pub use bucket::PoolBucket;
pub use route::{Path, Route, RouteSummary, SwapSummary};
pub use route_validator::{RouteValidator, ValidationError, BASE_GAS};
