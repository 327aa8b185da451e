//! Error type for authentication operations

use thiserror::Error;

/// Authentication errors
///
/// The `Display` output of the credential variants is the message shown to
/// the user, so it can be surfaced directly in a notification.
#[derive(Error, Debug)]
pub enum AuthError {
    #[error("No user found with this email")]
    UserNotFound,

    #[error("Incorrect password")]
    WrongPassword,

    #[error("Invalid email or password")]
    InvalidCredentials,

    #[error("Invalid email address")]
    InvalidEmail,

    #[error("Too many failed attempts. Please try again later")]
    TooManyRequests,

    #[error("An account with this email already exists")]
    EmailInUse,

    #[error("Password should be at least 6 characters")]
    WeakPassword,

    #[error("Email/password accounts are not enabled")]
    OperationNotAllowed,

    #[error("Not logged in")]
    MissingSession,

    /// The credential expired and cannot be refreshed
    #[error("Your session has expired. Please sign in again")]
    SessionExpired,

    /// A provider code with no dedicated variant
    #[error("{message}")]
    Provider { code: String, message: String },

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("JSON serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Session storage error: {0}")]
    Storage(#[from] std::io::Error),

    #[error("URL error: {0}")]
    Url(#[from] url::ParseError),
}

impl AuthError {
    /// Map an identity provider error code to an [`AuthError`]
    ///
    /// Codes may carry a detail suffix (`WEAK_PASSWORD : Password should be ...`);
    /// only the part before ` : ` is matched. Unknown codes keep `fallback` as
    /// their user-facing message.
    pub fn from_provider_code(code: &str, fallback: &str) -> Self {
        let key = code.split(" : ").next().unwrap_or(code).trim();

        match key {
            "EMAIL_NOT_FOUND" | "USER_NOT_FOUND" => Self::UserNotFound,
            "INVALID_PASSWORD" => Self::WrongPassword,
            "INVALID_LOGIN_CREDENTIALS" => Self::InvalidCredentials,
            "INVALID_EMAIL" | "MISSING_EMAIL" => Self::InvalidEmail,
            "TOO_MANY_ATTEMPTS_TRY_LATER" => Self::TooManyRequests,
            "EMAIL_EXISTS" => Self::EmailInUse,
            "WEAK_PASSWORD" => Self::WeakPassword,
            "OPERATION_NOT_ALLOWED" | "PASSWORD_LOGIN_DISABLED" => Self::OperationNotAllowed,
            other => Self::Provider {
                code: other.to_string(),
                message: fallback.to_string(),
            },
        }
    }

    /// Whether the user can fix this by retrying with different input
    pub fn is_recoverable(&self) -> bool {
        !matches!(
            self,
            Self::Serialization(_) | Self::Storage(_) | Self::Url(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_codes_map_to_messages() {
        let err = AuthError::from_provider_code("EMAIL_EXISTS", "Registration failed");
        assert!(matches!(err, AuthError::EmailInUse));
        assert_eq!(err.to_string(), "An account with this email already exists");

        let err = AuthError::from_provider_code(
            "WEAK_PASSWORD : Password should be at least 6 characters",
            "Registration failed",
        );
        assert!(matches!(err, AuthError::WeakPassword));

        let err = AuthError::from_provider_code("EMAIL_NOT_FOUND", "Login failed");
        assert_eq!(err.to_string(), "No user found with this email");
    }

    #[test]
    fn test_unknown_code_uses_fallback_message() {
        let err = AuthError::from_provider_code("USER_DISABLED", "Login failed");
        match &err {
            AuthError::Provider { code, message } => {
                assert_eq!(code, "USER_DISABLED");
                assert_eq!(message, "Login failed");
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(err.to_string(), "Login failed");
        assert!(err.is_recoverable());
    }

    #[test]
    fn test_expired_session_message() {
        assert_eq!(
            AuthError::SessionExpired.to_string(),
            "Your session has expired. Please sign in again"
        );
    }
}
