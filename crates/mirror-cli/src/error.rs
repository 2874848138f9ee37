//! Error types for mirror-cli

/// Result type for CLI operations
pub type Result<T> = std::result::Result<T, CliError>;

/// Errors that can occur in CLI operations
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    /// Command-line values that failed validation
    #[error("{message}")]
    InvalidArguments { message: String },

    /// The tracing subscriber or log file could not be set up
    #[error("Failed to initialise logging: {message}")]
    Logging { message: String },

    /// Error from mirror-core
    #[error(transparent)]
    Core(#[from] mirror_core::Error),

    /// Standard I/O error
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl CliError {
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidArguments {
            message: message.into(),
        }
    }

    pub fn logging(message: impl ToString) -> Self {
        Self::Logging {
            message: message.to_string(),
        }
    }

    /// Process exit status for this error: 2 for bad arguments, 1 otherwise.
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::InvalidArguments { .. } => 2,
            _ => 1,
        }
    }
}
