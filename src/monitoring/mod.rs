//! Logging, metrics, and spans shared by every pipeline stage.

pub mod logging;
pub mod metrics;

pub use logging::{init_default, init_logging, spans, LogConfig, LogFormat};
