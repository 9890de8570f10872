// src/math/mod.rs

pub mod full_math;
pub mod tick_math;

pub use full_math::{MulDiv, U256};
