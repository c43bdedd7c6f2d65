//! Account endpoints: login, logout, registration, OTP verification and
//! password reset.
//!
//! Credential-entry calls never trigger a token refresh; a 401 from them is a
//! rejected credential.

use peelojuice_core::LoginIdentifier;
use secrecy::{ExposeSecret, SecretString};
use serde_json::json;
use tracing::{info, instrument};

use super::types::{LoginRequest, LoginResponse, LogoutRequest, MessageResponse, Registration};
use super::{ApiClient, ApiError, ApiRequest};

impl ApiClient {
    /// Exchange credentials for an access/refresh token pair.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Status` if the credentials are rejected.
    #[instrument(skip(self, password), fields(identifier = %identifier))]
    pub async fn login(
        &self,
        identifier: &LoginIdentifier,
        password: &SecretString,
    ) -> Result<LoginResponse, ApiError> {
        let request = ApiRequest::post("/users/login/")
            .without_refresh()
            .json(&LoginRequest {
                email_or_phone: identifier,
                password: password.expose_secret(),
            })?;
        let response: LoginResponse = self.execute(request).await?;
        info!(user_id = response.user.id, "Logged in");
        Ok(response)
    }

    /// Blacklist the refresh token server-side.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip(self, refresh))]
    pub async fn logout(&self, refresh: &SecretString) -> Result<MessageResponse, ApiError> {
        let request = ApiRequest::post("/users/logout/")
            .without_refresh()
            .json(&LogoutRequest {
                refresh_token: refresh.expose_secret(),
            })?;
        self.execute_message(request).await
    }

    /// Create an account. Verification OTPs are sent by the backend.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Status` with the first validation message if the
    /// form is rejected.
    #[instrument(skip(self, registration), fields(email = %registration.email))]
    pub async fn register(&self, registration: &Registration) -> Result<MessageResponse, ApiError> {
        let request = ApiRequest::post("/users/register/")
            .without_refresh()
            .json(registration)?;
        self.execute_message(request).await
    }

    /// Confirm an email address with its OTP.
    ///
    /// # Errors
    ///
    /// Returns an error if the OTP is wrong or expired.
    #[instrument(skip(self, otp))]
    pub async fn verify_email(&self, email: &str, otp: &str) -> Result<MessageResponse, ApiError> {
        let request = ApiRequest::post("/users/verify-email/")
            .without_refresh()
            .json(&json!({ "email": email, "otp": otp }))?;
        self.execute_message(request).await
    }

    /// Confirm a phone number with its OTP.
    ///
    /// # Errors
    ///
    /// Returns an error if the OTP is wrong or expired.
    #[instrument(skip(self, otp))]
    pub async fn verify_phone(
        &self,
        phone_number: &str,
        otp: &str,
    ) -> Result<MessageResponse, ApiError> {
        let request = ApiRequest::post("/users/verify-phone/")
            .without_refresh()
            .json(&json!({ "phone_number": phone_number, "otp": otp }))?;
        self.execute_message(request).await
    }

    /// Send a fresh email OTP.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend refuses (for example when rate limited).
    #[instrument(skip(self))]
    pub async fn resend_email_otp(&self, email: &str) -> Result<MessageResponse, ApiError> {
        let request = ApiRequest::post("/users/resend-email-otp/")
            .without_refresh()
            .json(&json!({ "email": email }))?;
        self.execute_message(request).await
    }

    /// Send a fresh phone OTP.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend refuses (for example when rate limited).
    #[instrument(skip(self))]
    pub async fn resend_phone_otp(&self, phone_number: &str) -> Result<MessageResponse, ApiError> {
        let request = ApiRequest::post("/users/resend-phone-otp/")
            .without_refresh()
            .json(&json!({ "phone_number": phone_number }))?;
        self.execute_message(request).await
    }

    /// Start a password reset; the backend sends an OTP.
    ///
    /// # Errors
    ///
    /// Returns an error if the account is unknown or the request fails.
    #[instrument(skip(self), fields(identifier = %identifier))]
    pub async fn request_password_reset(
        &self,
        identifier: &LoginIdentifier,
    ) -> Result<MessageResponse, ApiError> {
        let request = ApiRequest::post("/users/password-reset/request/")
            .without_refresh()
            .json(&json!({ "email_or_phone": identifier }))?;
        self.execute_message(request).await
    }

    /// Check a password reset OTP.
    ///
    /// # Errors
    ///
    /// Returns an error if the OTP is wrong or expired.
    #[instrument(skip(self, otp), fields(identifier = %identifier))]
    pub async fn verify_password_reset(
        &self,
        identifier: &LoginIdentifier,
        otp: &str,
    ) -> Result<MessageResponse, ApiError> {
        let request = ApiRequest::post("/users/password-reset/verify/")
            .without_refresh()
            .json(&json!({ "email_or_phone": identifier, "otp": otp }))?;
        self.execute_message(request).await
    }

    /// Set the new password after a verified OTP.
    ///
    /// # Errors
    ///
    /// Returns an error if the reset was not verified or the password is
    /// rejected.
    #[instrument(skip(self, new_password), fields(identifier = %identifier))]
    pub async fn confirm_password_reset(
        &self,
        identifier: &LoginIdentifier,
        new_password: &SecretString,
    ) -> Result<MessageResponse, ApiError> {
        let request = ApiRequest::post("/users/password-reset/confirm/")
            .without_refresh()
            .json(&json!({
                "email_or_phone": identifier,
                "new_password": new_password.expose_secret(),
            }))?;
        self.execute_message(request).await
    }
}
