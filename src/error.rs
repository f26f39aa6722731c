use std::fmt;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, SubstrateError>;

/// Where and how an error happened, attached to errors that cross component
/// boundaries so the caller doesn't have to re-derive it from the message.
#[derive(Debug, Clone, Default)]
pub struct ErrorContext {
    pub component: Option<String>,
    pub operation: Option<String>,
    pub stage: Option<String>,
}

impl ErrorContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_component(mut self, component: impl Into<String>) -> Self {
        self.component = Some(component.into());
        self
    }

    pub fn with_operation(mut self, operation: impl Into<String>) -> Self {
        self.operation = Some(operation.into());
        self
    }

    pub fn with_stage(mut self, stage: impl Into<String>) -> Self {
        self.stage = Some(stage.into());
        self
    }
}

impl fmt::Display for ErrorContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts = Vec::new();
        if let Some(c) = &self.component {
            parts.push(format!("component={c}"));
        }
        if let Some(op) = &self.operation {
            parts.push(format!("operation={op}"));
        }
        if let Some(s) = &self.stage {
            parts.push(format!("stage={s}"));
        }
        if parts.is_empty() {
            write!(f, "[no context]")
        } else {
            write!(f, "[{}]", parts.join(", "))
        }
    }
}

#[derive(Error, Debug)]
pub enum SubstrateError {
    /// Composition or position lookup missed. Recoverable locally by
    /// substituting a worst-case heuristic or returning an empty result.
    #[error("not found: {0}")]
    NotFound(String),

    /// Malformed hex, unparseable tensor header, shape mismatch. Fatal to
    /// the current request.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Transaction failure or constraint violation. Aborts the current
    /// flush.
    #[error("persistence error: {message} {context}")]
    PersistenceError { message: String, context: ErrorContext },

    /// A\* expansion limit, walk energy exhaustion, or Reflexion round
    /// limit. Not a failure — a structured terminal state that callers
    /// match on rather than unwrap past.
    #[error("resource exhausted: {0}")]
    ResourceExhausted(String),

    /// Physicality centroid off S³, hash mismatch on reload. Fatal.
    #[error("corruption: {0}")]
    Corruption(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("config error: {0}")]
    Config(String),

    #[error("{message} {context}")]
    WithContext { message: String, context: ErrorContext },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecoveryStrategy {
    /// Retry the operation (transient I/O).
    Retry,
    /// Substitute a default/fallback value and continue.
    Fallback,
    /// Propagate to the caller; the request fails.
    Propagate,
    /// Already a structured terminal state; not an error condition.
    Ignore,
}

impl SubstrateError {
    pub fn recovery_strategy(&self) -> RecoveryStrategy {
        match self {
            SubstrateError::NotFound(_) => RecoveryStrategy::Fallback,
            SubstrateError::ResourceExhausted(_) => RecoveryStrategy::Ignore,
            SubstrateError::PersistenceError { .. } => RecoveryStrategy::Propagate,
            SubstrateError::Corruption(_) => RecoveryStrategy::Propagate,
            SubstrateError::InvalidInput(_) => RecoveryStrategy::Propagate,
            _ => RecoveryStrategy::Propagate,
        }
    }

    pub fn is_retryable(&self) -> bool {
        matches!(self.recovery_strategy(), RecoveryStrategy::Retry)
    }

    pub fn with_context(self, context: ErrorContext) -> Self {
        match self {
            SubstrateError::PersistenceError { message, .. } => {
                SubstrateError::PersistenceError { message, context }
            }
            other => SubstrateError::WithContext {
                message: other.to_string(),
                context,
            },
        }
    }
}
