//! Structured logging configuration.
//!
//! Production-ready logging with `tracing`: multiple output formats,
//! per-component filtering, span tracking.

use std::io;
use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter,
};

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    Json,
    Compact,
}

impl LogFormat {
    pub fn from_env() -> Self {
        match std::env::var("LOG_FORMAT").unwrap_or_else(|_| "pretty".to_string()).to_lowercase().as_str() {
            "json" => Self::Json,
            "compact" => Self::Compact,
            _ => Self::Pretty,
        }
    }
}

#[derive(Debug, Clone)]
pub struct LogConfig {
    pub format: LogFormat,
    pub default_level: String,
    pub component_levels: Vec<(String, String)>,
    pub span_events: bool,
    pub ansi: bool,
    pub thread_ids: bool,
    pub thread_names: bool,
    pub target: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            format: LogFormat::from_env(),
            default_level: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
            component_levels: vec![],
            span_events: true,
            ansi: true,
            thread_ids: false,
            thread_names: true,
            target: true,
        }
    }
}

impl LogConfig {
    /// JSON, no ANSI, reduced span volume — for a running service.
    pub fn production() -> Self {
        Self {
            format: LogFormat::Json,
            default_level: "info".to_string(),
            component_levels: vec![
                ("tokio_postgres".to_string(), "warn".to_string()),
                ("deadpool_postgres".to_string(), "warn".to_string()),
            ],
            span_events: false,
            ansi: false,
            thread_ids: true,
            thread_names: true,
            target: true,
        }
    }

    /// Pretty, with colors and span events — for local iteration.
    pub fn development() -> Self {
        Self {
            format: LogFormat::Pretty,
            default_level: "debug".to_string(),
            component_levels: vec![("semantic_substrate".to_string(), "debug".to_string())],
            span_events: true,
            ansi: true,
            thread_ids: false,
            thread_names: true,
            target: true,
        }
    }

    fn build_filter(&self) -> EnvFilter {
        let mut filter = EnvFilter::new(&self.default_level);
        for (component, level) in &self.component_levels {
            filter = filter.add_directive(format!("{component}={level}").parse().expect("invalid filter directive"));
        }
        filter
    }
}

/// Initialize the global tracing subscriber.
pub fn init_logging(config: LogConfig) -> Result<(), Box<dyn std::error::Error>> {
    let filter = config.build_filter();
    let span_events = if config.span_events { FmtSpan::NEW | FmtSpan::CLOSE } else { FmtSpan::NONE };

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_writer(io::stdout)
                .with_ansi(config.ansi)
                .with_thread_ids(config.thread_ids)
                .with_thread_names(config.thread_names)
                .with_target(config.target)
                .with_span_events(span_events),
        )
        .try_init()?;
    Ok(())
}

pub fn init_default() -> Result<(), Box<dyn std::error::Error>> {
    init_logging(LogConfig::default())
}

/// Span helpers, one per pipeline stage that's worth correlating across log
/// lines.
pub mod spans {
    use tracing::{Level, Span};

    pub fn ingest_batch(kind: &str, record_count: usize) -> Span {
        tracing::span!(Level::INFO, "ingest_batch", kind = kind, record_count = record_count)
    }

    pub fn extract_layer(layer_name: &str, layer_index: usize) -> Span {
        tracing::span!(Level::INFO, "extract_layer", layer_name = layer_name, layer_index = layer_index)
    }

    pub fn walk(start: &str, max_steps: usize) -> Span {
        tracing::span!(Level::DEBUG, "walk", start = start, max_steps = max_steps)
    }

    pub fn search(start: &str, goal: &str) -> Span {
        tracing::span!(Level::DEBUG, "astar_search", start = start, goal = goal)
    }

    pub fn reasoning_phase(phase: &str) -> Span {
        tracing::span!(Level::INFO, "reasoning_phase", phase = phase)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_format_from_env_parses_known_values() {
        std::env::set_var("LOG_FORMAT", "json");
        assert_eq!(LogFormat::from_env(), LogFormat::Json);
        std::env::set_var("LOG_FORMAT", "compact");
        assert_eq!(LogFormat::from_env(), LogFormat::Compact);
        std::env::set_var("LOG_FORMAT", "pretty");
        assert_eq!(LogFormat::from_env(), LogFormat::Pretty);
    }

    #[test]
    fn production_config_disables_ansi_and_span_events() {
        let config = LogConfig::production();
        assert_eq!(config.format, LogFormat::Json);
        assert!(!config.ansi);
        assert!(!config.span_events);
    }

    #[test]
    fn development_config_enables_span_events() {
        let config = LogConfig::development();
        assert_eq!(config.format, LogFormat::Pretty);
        assert!(config.span_events);
    }
}
