use thiserror::Error;

/// Common error types used across the monitor.
#[derive(Debug, Error)]
pub enum MonitorError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Unsupported time format: {0}")]
    UnsupportedDuration(String),

    #[error("Template not found: {0}")]
    TemplateNotFound(String),

    #[error("Malformed sampler row {line}: {reason}")]
    MalformedRow { line: String, reason: String },

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Shutdown error: {0}")]
    Shutdown(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl MonitorError {
    /// Contract errors abort the current pass instead of being recovered.
    pub fn is_contract_error(&self) -> bool {
        matches!(
            self,
            MonitorError::Config(_)
                | MonitorError::UnsupportedDuration(_)
                | MonitorError::TemplateNotFound(_)
                | MonitorError::MalformedRow { .. }
        )
    }
}
