pub mod math;
pub mod pool;

pub use pool::{OraclePmmPool, OraclePmmSwapInfo, POOL_TYPE, SWAP_GAS};
