//! Error types for duck-core
//!
//! Every backend maps its transport failures into this taxonomy so that
//! front-ends can classify failures without knowing the protocol.

use thiserror::Error;

/// Suffix appended to provider-supplied login failure descriptions
pub const CONTACT_PROVIDER: &str =
    "Please contact your web hosting service provider for assistance.";

/// Result type alias for duck-core operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for duck-core
#[derive(Error, Debug)]
pub enum Error {
    /// Transport unreachable, TLS or handshake failure, session closed
    #[error("Connection failed: {0}")]
    Connectivity(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid or expired credentials or tokens
    #[error("Login failed: {message}")]
    LoginFailure { message: String, detail: String },

    /// The user (or a headless callback) declined to provide credentials
    #[error("Login canceled")]
    LoginCanceled { detail: Option<String> },

    #[error("Not found: {0}")]
    NotFound(String),

    /// Digest reported by the server differs from the declared one
    #[error("Checksum mismatch: expected {expected}, got {actual}")]
    Integrity { expected: String, actual: String },

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Invalid path: {0}")]
    InvalidPath(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Unsupported feature: {0}")]
    UnsupportedFeature(String),

    #[error("{0}")]
    General(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),
}

impl Error {
    /// Build a login failure whose detail is a provider description
    /// followed by the standard contact hint.
    pub fn login_failure(message: impl Into<String>, description: &str) -> Self {
        let description = description.trim();
        let detail = if description.is_empty() {
            CONTACT_PROVIDER.to_string()
        } else if description.ends_with('.') {
            format!("{description} {CONTACT_PROVIDER}")
        } else {
            format!("{description}. {CONTACT_PROVIDER}")
        };
        Error::LoginFailure {
            message: message.into(),
            detail,
        }
    }

    /// Human-readable detail supplied by the backend, if any
    pub fn detail(&self) -> Option<&str> {
        match self {
            Error::LoginFailure { detail, .. } => Some(detail),
            Error::LoginCanceled { detail } => detail.as_deref(),
            _ => None,
        }
    }

    /// True for login failures, including cancellation
    pub fn is_login_failure(&self) -> bool {
        matches!(self, Error::LoginFailure { .. } | Error::LoginCanceled { .. })
    }

    /// True when the user canceled a prompt
    pub fn is_canceled(&self) -> bool {
        matches!(self, Error::LoginCanceled { .. })
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound(_))
    }

    /// Turn a cancellation into one that carries the detail of the
    /// failure that caused the prompt.
    pub fn with_cause_detail(self, cause: &Error) -> Self {
        match self {
            Error::LoginCanceled { detail: None } => Error::LoginCanceled {
                detail: cause.detail().map(str::to_string),
            },
            other => other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_login_failure_detail() {
        let e = Error::login_failure("Login failed", "Invalid refresh token");
        assert_eq!(
            e.detail(),
            Some(
                "Invalid refresh token. Please contact your web hosting service provider for assistance."
            )
        );
        assert!(e.is_login_failure());
        assert!(!e.is_canceled());
    }

    #[test]
    fn test_login_failure_detail_with_period() {
        let e = Error::login_failure("Login failed", "Token expired.");
        assert_eq!(
            e.detail(),
            Some("Token expired. Please contact your web hosting service provider for assistance.")
        );
    }

    #[test]
    fn test_canceled_inherits_cause_detail() {
        let cause = Error::login_failure("Login failed", "Invalid refresh token");
        let canceled = Error::LoginCanceled { detail: None }.with_cause_detail(&cause);
        assert!(canceled.is_canceled());
        assert!(canceled.is_login_failure());
        assert_eq!(canceled.detail(), cause.detail());
    }

    #[test]
    fn test_other_errors_have_no_detail() {
        assert!(Error::NotFound("x".into()).detail().is_none());
        assert!(Error::NotFound("x".into()).is_not_found());
        assert!(!Error::Connectivity("x".into()).is_login_failure());
    }
}
