pub mod logging;
pub mod metrics;

pub use metrics::render_metrics;
