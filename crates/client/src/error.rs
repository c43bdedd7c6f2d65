//! Client error taxonomy.
//!
//! Coordinators return [`ClientError`]. Every variant has a user-facing
//! message so the view can turn any failure into a toast without inspecting
//! it.

use thiserror::Error;

use crate::api::ApiError;
use crate::storage::StorageError;

/// Fallback shown when a failure carries no usable message.
pub const GENERIC_FAILURE: &str = "Something went wrong. Please try again.";

/// Errors surfaced by the coordinators.
#[derive(Debug, Error)]
pub enum ClientError {
    /// The action needs a logged-in user. Views respond with a login prompt,
    /// not a form error.
    #[error("Please login to continue")]
    Unauthenticated,

    /// A client-side precondition failed; no request was sent.
    #[error("{0}")]
    ValidationRejected(String),

    /// The backend refused the request.
    #[error("server rejected request ({status}): {}", message.as_deref().unwrap_or("no message"))]
    ServerRejected {
        status: u16,
        message: Option<String>,
    },

    /// The backend could not be reached or answered with garbage.
    #[error("transport failure: {0}")]
    TransportFailure(String),

    /// The hosted payment flow failed.
    #[error("Payment failed: {0}")]
    GatewayFailure(String),

    /// The access token expired and could not be refreshed.
    #[error("Session expired. Please login again.")]
    SessionExpired,

    /// Durable state could not be written.
    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl ClientError {
    /// Message suitable for a toast, with the generic fallback.
    #[must_use]
    pub fn user_message(&self) -> String {
        self.user_message_or(GENERIC_FAILURE)
    }

    /// Message suitable for a toast, using `fallback` when the failure
    /// carries no message of its own.
    #[must_use]
    pub fn user_message_or(&self, fallback: &str) -> String {
        match self {
            Self::ServerRejected {
                message: Some(message),
                ..
            } => message.clone(),
            Self::ServerRejected { message: None, .. }
            | Self::TransportFailure(_)
            | Self::Storage(_) => fallback.to_string(),
            Self::Unauthenticated
            | Self::ValidationRejected(_)
            | Self::GatewayFailure(_)
            | Self::SessionExpired => self.to_string(),
        }
    }

    /// Whether the view should route to login.
    #[must_use]
    pub const fn requires_login(&self) -> bool {
        matches!(self, Self::Unauthenticated | Self::SessionExpired)
    }
}

impl From<ApiError> for ClientError {
    fn from(err: ApiError) -> Self {
        match err {
            ApiError::Status { status: 401, .. } => Self::Unauthenticated,
            ApiError::Status { status, message } => Self::ServerRejected { status, message },
            ApiError::SessionExpired => Self::SessionExpired,
            ApiError::Storage(e) => Self::Storage(e),
            ApiError::Transport(e) => Self::TransportFailure(e.to_string()),
            ApiError::Json(e) => Self::TransportFailure(e.to_string()),
        }
    }
}

/// Result alias for coordinator operations.
pub type Result<T, E = ClientError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_classification() {
        let err: ClientError = ApiError::Status {
            status: 401,
            message: Some("Token is invalid".to_string()),
        }
        .into();
        assert!(matches!(err, ClientError::Unauthenticated));
        assert!(err.requires_login());

        let err: ClientError = ApiError::Status {
            status: 400,
            message: Some("Invalid coupon code".to_string()),
        }
        .into();
        assert!(matches!(
            err,
            ClientError::ServerRejected { status: 400, .. }
        ));
        assert_eq!(err.user_message(), "Invalid coupon code");
    }

    #[test]
    fn test_fallback_message() {
        let err = ClientError::ServerRejected {
            status: 500,
            message: None,
        };
        assert_eq!(
            err.user_message_or("Failed to place order"),
            "Failed to place order"
        );

        let err = ClientError::TransportFailure("connection refused".to_string());
        assert_eq!(err.user_message(), GENERIC_FAILURE);
    }

    #[test]
    fn test_own_messages() {
        assert_eq!(
            ClientError::ValidationRejected("Please select a branch".to_string()).user_message(),
            "Please select a branch"
        );
        assert_eq!(
            ClientError::GatewayFailure("Card declined".to_string()).user_message(),
            "Payment failed: Card declined"
        );
        assert!(ClientError::SessionExpired.requires_login());
    }

    #[test]
    fn test_session_expired_maps_through() {
        let err: ClientError = ApiError::SessionExpired.into();
        assert!(matches!(err, ClientError::SessionExpired));
    }
}
