//! Unified error handling.
//!
//! Provides a unifying `ClientError` type plus the user-facing message
//! mapping. Errors are handled at the component boundary where they occur;
//! none are fatal, and nothing in this crate panics on them.
//!
//! Taxonomy:
//! - auth failures are recoverable and shown as a message
//! - authorization mismatches never become errors (the guard redirects)
//! - network failures are transient notices; there is no automatic retry
//! - payment failures re-enable the checkout control
//! - adding a duplicate cart item is a silent no-op, not a conflict

use thiserror::Error;

use crate::api::ApiError;
use crate::checkout::PaymentError;
use crate::config::ConfigError;
use crate::enrollment::EnrollmentError;
use crate::store::session::AuthError;
use crate::store::vault::StorageError;

/// Application-level error type for the client core.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Configuration loading failed.
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    /// Marketplace API call failed.
    #[error("API error: {0}")]
    Api(#[from] ApiError),

    /// Login, registration, or profile update failed.
    #[error("Auth error: {0}")]
    Auth(#[from] AuthError),

    /// A checkout attempt failed.
    #[error("Payment error: {0}")]
    Payment(#[from] PaymentError),

    /// An enrollment operation failed.
    #[error("Enrollment error: {0}")]
    Enrollment(#[from] EnrollmentError),

    /// The persistence vault failed.
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

impl ClientError {
    /// The message a UI shows for this error.
    ///
    /// Internal details (transport, parse, storage) are not exposed.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Auth(err) => err.to_string(),
            Self::Payment(err) => err.to_string(),
            Self::Enrollment(EnrollmentError::Rejected(message)) => message.clone(),
            Self::Enrollment(EnrollmentError::Api(err)) | Self::Api(err) => match err {
                ApiError::Http(_) => "Network error. Please try again.".to_string(),
                ApiError::Unauthorized(_) => {
                    "Your session has expired. Please sign in again.".to_string()
                }
                ApiError::NotFound(message) | ApiError::Api { message, .. }
                    if !message.is_empty() =>
                {
                    message.clone()
                }
                _ => "Something went wrong. Please try again.".to_string(),
            },
            Self::Config(_) | Self::Storage(_) => "Internal error".to_string(),
        }
    }

    /// Whether this is a transient network failure worth retrying manually.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::Api(ApiError::Http(_)) | Self::Enrollment(EnrollmentError::Api(ApiError::Http(_)))
        )
    }
}

/// Result type alias for `ClientError`.
pub type Result<T> = std::result::Result<T, ClientError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_auth_error_shows_server_message() {
        let err = ClientError::Auth(AuthError::LoginFailed(
            "Invalid email or password".to_string(),
        ));
        assert_eq!(err.user_message(), "Invalid email or password");
    }

    #[test]
    fn test_payment_error_messages() {
        let err = ClientError::Payment(PaymentError::MissingConfiguration);
        assert_eq!(err.user_message(), "missing payment configuration");

        let err = ClientError::Payment(PaymentError::VerificationFailed);
        assert_eq!(err.user_message(), "payment verification failed");
    }

    #[test]
    fn test_api_error_hides_internals() {
        let err = ClientError::Api(ApiError::Api {
            status: 500,
            message: String::new(),
        });
        assert_eq!(err.user_message(), "Something went wrong. Please try again.");
    }

    #[test]
    fn test_unauthorized_message() {
        let err = ClientError::Api(ApiError::Unauthorized(String::new()));
        assert_eq!(
            err.user_message(),
            "Your session has expired. Please sign in again."
        );
    }

    #[test]
    fn test_storage_error_is_internal() {
        let err = ClientError::Storage(StorageError::Backend("disk gone".to_string()));
        assert_eq!(err.user_message(), "Internal error");
        assert!(!err.is_transient());
    }
}
