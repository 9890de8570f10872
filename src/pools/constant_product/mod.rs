pub mod pool;

// On ré-exporte les éléments principaux pour un accès plus facile
pub use pool::{ConstantProductPool, ConstantProductSwapInfo, POOL_TYPE, SWAP_GAS};
