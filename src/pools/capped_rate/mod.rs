pub mod pool;

pub use pool::{CappedRatePool, CappedRateSwapInfo, POOL_TYPE, SWAP_GAS};
