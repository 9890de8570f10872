pub mod pool_cache;
pub mod volume_meter;

pub use pool_cache::{PoolMap, PoolStateCache};
pub use volume_meter::{MeterError, VolumeBaseline, VolumeMeter, VolumeWindow};
