//! Login, logout and registration.
//!
//! The access token lives for the process, the refresh token survives
//! restarts. Logging in or out resynchronizes the cart so the branch lock
//! follows the account.

use std::sync::Arc;

use peelojuice_core::LoginIdentifier;
use secrecy::SecretString;
use tracing::{info, instrument, warn};

use super::cart::CartCoordinator;
use crate::api::types::{Registration, User};
use crate::api::{ApiError, StorefrontApi};
use crate::error::{ClientError, Result};

/// Minimum password length accepted by the backend.
pub const MIN_PASSWORD_LENGTH: usize = 8;

/// Fallback when login fails without a server message.
pub const LOGIN_FAILED: &str = "Authentication failed. Please check your credentials.";

/// Fallback when registration fails without a server message.
pub const REGISTRATION_FAILED: &str = "Registration failed. Please try again.";

/// Check a new password and its confirmation before sending them.
///
/// # Errors
///
/// Returns `ClientError::ValidationRejected` if the passwords differ or the
/// password is too short.
pub fn validate_new_password(password: &str, confirm: &str) -> Result<()> {
    if password != confirm {
        return Err(ClientError::ValidationRejected(
            "Passwords do not match".to_string(),
        ));
    }
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(ClientError::ValidationRejected(format!(
            "Password must be at least {MIN_PASSWORD_LENGTH} characters"
        )));
    }
    Ok(())
}

/// A 401 from a credential endpoint is a rejected credential, not a missing
/// session.
fn credential_error(err: ApiError, fallback: &str) -> ClientError {
    match err {
        ApiError::Status { status, message } => ClientError::ServerRejected {
            status,
            message: Some(message.unwrap_or_else(|| fallback.to_string())),
        },
        other => other.into(),
    }
}

/// Account lifecycle coordinator.
#[derive(Debug, Clone)]
pub struct AuthCoordinator<A> {
    inner: Arc<AuthInner<A>>,
}

#[derive(Debug)]
struct AuthInner<A> {
    api: A,
    cart: CartCoordinator<A>,
}

impl<A: StorefrontApi> AuthCoordinator<A> {
    #[must_use]
    pub fn new(api: A, cart: CartCoordinator<A>) -> Self {
        Self {
            inner: Arc::new(AuthInner { api, cart }),
        }
    }

    /// Whether requests currently carry an access token.
    pub async fn is_authenticated(&self) -> bool {
        self.inner.api.session().is_authenticated().await
    }

    /// Restore the session at startup.
    ///
    /// A fresh process has no access token. When a refresh token survived
    /// the restart a new access token is obtained; if that fails the stale
    /// credentials are dropped without announcing a logout.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Storage` if the stores cannot be written.
    #[instrument(skip(self))]
    pub async fn restore(&self) -> Result<bool> {
        let session = self.inner.api.session().snapshot().await;
        if !session.access_token_present && session.refresh_token_present {
            if let Err(e) = self.inner.api.refresh_access_token().await {
                warn!(error = %e, "Could not restore session");
                self.inner.api.session().clear().await?;
            }
        }

        let authenticated = self.is_authenticated().await;
        if authenticated {
            self.inner.cart.refresh().await;
        }
        info!(authenticated, "Session restored");
        Ok(authenticated)
    }

    /// Log in with an email address or phone number.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::ValidationRejected` for a malformed identifier
    /// and `ClientError::ServerRejected` for rejected credentials.
    #[instrument(skip(self, password))]
    pub async fn login(&self, identifier: &str, password: &SecretString) -> Result<User> {
        let identifier = LoginIdentifier::parse(identifier)
            .map_err(|e| ClientError::ValidationRejected(e.to_string()))?;

        let response = self
            .inner
            .api
            .login(&identifier, password)
            .await
            .map_err(|e| credential_error(e, LOGIN_FAILED))?;

        self.inner
            .api
            .session()
            .sign_in(
                &SecretString::from(response.access_token),
                &SecretString::from(response.refresh_token),
            )
            .await?;
        self.inner.cart.refresh().await;
        Ok(response.user)
    }

    /// Log out. The server call is best effort; local credentials are always
    /// cleared.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Storage` if the stores cannot be written.
    #[instrument(skip(self))]
    pub async fn logout(&self) -> Result<()> {
        if let Some(refresh) = self.inner.api.session().refresh_token().await {
            if let Err(e) = self.inner.api.logout(&refresh).await {
                warn!(error = %e, "Server logout failed, clearing local session anyway");
            }
        }
        self.inner.api.session().sign_out().await?;
        self.inner.cart.clear().await;
        Ok(())
    }

    /// Create an account. Returns the backend's confirmation message.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::ValidationRejected` if the passwords fail local
    /// checks, otherwise the backend's first validation message.
    #[instrument(skip_all, fields(email = %registration.email))]
    pub async fn register(&self, registration: &Registration) -> Result<String> {
        validate_new_password(&registration.password, &registration.confirm_password)?;

        let response = self
            .inner
            .api
            .register(registration)
            .await
            .map_err(|e| credential_error(e, REGISTRATION_FAILED))?;
        Ok(response
            .message
            .unwrap_or_else(|| "Registration successful".to_string()))
    }
}
