pub mod metrics;
pub mod tracing;

pub use metrics::{ConsumerMetrics, ConsumerStats};

#[cfg(feature = "tracing-basic")]
pub use self::tracing::init_tracing;
