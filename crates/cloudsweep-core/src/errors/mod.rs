use std::error::Error;

// Re-export ConfigError so callers only need the core crate
pub use cloudsweep_config::ConfigError;

/// Base trait for all application errors
pub trait SweepError: Error + Send + Sync + 'static {
    /// Error code for programmatic handling
    fn error_code(&self) -> &'static str;

    /// Whether this error was caused by operator input rather than the environment
    fn is_user_error(&self) -> bool {
        false
    }
}

/// Common result type for the application
pub type SweepResult<T> = Result<T, Box<dyn SweepError>>;

impl SweepError for ConfigError {
    fn error_code(&self) -> &'static str {
        match self {
            ConfigError::ConfigNotFound { .. } => "CONFIG_NOT_FOUND",
            ConfigError::ConfigParseError { .. } => "CONFIG_PARSE_ERROR",
            ConfigError::InvalidPattern { .. } => "CONFIG_INVALID_PATTERN",
            ConfigError::UnknownResourceClass { .. } => "CONFIG_UNKNOWN_CLASS",
            ConfigError::InvalidConfiguration { .. } => "INVALID_CONFIGURATION",
            ConfigError::IoError { .. } => "CONFIG_IO_ERROR",
        }
    }

    fn is_user_error(&self) -> bool {
        !matches!(self, ConfigError::IoError { .. })
    }
}

/// Log an application error with its code at the right level.
pub fn log_app_error<E: SweepError>(error: &E) {
    if error.is_user_error() {
        tracing::warn!(
            event = "core.app.user_error",
            error_code = error.error_code(),
            error = %error
        );
    } else {
        tracing::error!(
            event = "core.app.error",
            error_code = error.error_code(),
            error = %error
        );
    }
}
