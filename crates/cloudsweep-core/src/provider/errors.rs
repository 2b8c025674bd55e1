use serde::{Deserialize, Serialize};

use crate::errors::SweepError;

/// Coarse classification of a provider failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderErrorKind {
    NotFound,
    PermissionDenied,
    Throttled,
    Transient,
    Other,
}

impl ProviderErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderErrorKind::NotFound => "not_found",
            ProviderErrorKind::PermissionDenied => "permission_denied",
            ProviderErrorKind::Throttled => "throttled",
            ProviderErrorKind::Transient => "transient",
            ProviderErrorKind::Other => "other",
        }
    }
}

impl std::fmt::Display for ProviderErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Failure reported by a discovery or deletion call.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{kind}: {message}")]
pub struct ProviderError {
    pub kind: ProviderErrorKind,
    pub message: String,
}

impl ProviderError {
    pub fn new(kind: ProviderErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorKind::NotFound, message)
    }

    pub fn throttled(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorKind::Throttled, message)
    }

    /// Only throttling and transient failures are worth another attempt.
    /// Missing resources and permission errors are terminal.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self.kind,
            ProviderErrorKind::Throttled | ProviderErrorKind::Transient
        )
    }
}

impl SweepError for ProviderError {
    fn error_code(&self) -> &'static str {
        match self.kind {
            ProviderErrorKind::NotFound => "PROVIDER_NOT_FOUND",
            ProviderErrorKind::PermissionDenied => "PROVIDER_PERMISSION_DENIED",
            ProviderErrorKind::Throttled => "PROVIDER_THROTTLED",
            ProviderErrorKind::Transient => "PROVIDER_TRANSIENT",
            ProviderErrorKind::Other => "PROVIDER_ERROR",
        }
    }

    fn is_user_error(&self) -> bool {
        matches!(self.kind, ProviderErrorKind::PermissionDenied)
    }
}
