//! Login, registration, OTP verification and password reset.

use clap::Subcommand;
use peelojuice_client::ClientError;
use peelojuice_client::api::types::Registration;
use peelojuice_client::state::auth::validate_new_password;
use peelojuice_core::LoginIdentifier;
use secrecy::ExposeSecret;

use crate::prompt;
use crate::{CliError, Shop};

#[derive(Subcommand)]
pub enum VerifyTarget {
    /// Verify an email address
    Email {
        email: String,
        /// Send a new OTP instead of verifying
        #[arg(long)]
        resend: bool,
    },
    /// Verify a phone number
    Phone {
        phone: String,
        /// Send a new OTP instead of verifying
        #[arg(long)]
        resend: bool,
    },
}

#[allow(clippy::print_stdout)]
pub async fn login(shop: &Shop, identifier: &str) -> Result<(), CliError> {
    let password = prompt::secret("Password").await?;
    let user = shop.auth().login(identifier, &password).await?;
    shop.toasts()
        .success(format!("Welcome back, {}!", user.display_name()))
        .await;

    let lines = shop.cart().line_count().await;
    if lines > 0 {
        println!("You have {lines} item(s) in your cart.");
    }
    Ok(())
}

pub async fn logout(shop: &Shop) -> Result<(), CliError> {
    shop.auth().logout().await?;
    shop.toasts().success("Logged out").await;
    Ok(())
}

#[allow(clippy::print_stdout)]
pub async fn register(
    shop: &Shop,
    email: String,
    phone_number: String,
    first_name: String,
    last_name: String,
) -> Result<(), CliError> {
    let password = prompt::secret("Password").await?;
    let confirm = prompt::secret("Confirm password").await?;

    let registration = Registration {
        email,
        first_name,
        last_name,
        phone_number,
        password: password.expose_secret().to_string(),
        confirm_password: confirm.expose_secret().to_string(),
    };
    let message = shop.auth().register(&registration).await?;
    shop.toasts().success(message).await;
    println!(
        "Verify your account with `pj verify email {}` and `pj verify phone {}`.",
        registration.email, registration.phone_number
    );
    Ok(())
}

pub async fn verify(shop: &Shop, target: VerifyTarget) -> Result<(), CliError> {
    let api = shop.api();
    let response = match target {
        VerifyTarget::Email { email, resend: true } => api.resend_email_otp(&email).await,
        VerifyTarget::Phone { phone, resend: true } => api.resend_phone_otp(&phone).await,
        VerifyTarget::Email {
            email,
            resend: false,
        } => {
            let otp = prompt::line("Email OTP").await?;
            api.verify_email(&email, &otp).await
        }
        VerifyTarget::Phone {
            phone,
            resend: false,
        } => {
            let otp = prompt::line("Phone OTP").await?;
            api.verify_phone(&phone, &otp).await
        }
    }?;

    if let Some(message) = response.message {
        shop.toasts().success(message).await;
    }
    Ok(())
}

/// Request an OTP, check it, then set the new password.
#[allow(clippy::print_stdout)]
pub async fn reset_password(shop: &Shop, identifier: &str) -> Result<(), CliError> {
    let identifier = LoginIdentifier::parse(identifier)
        .map_err(|e| ClientError::ValidationRejected(e.to_string()))?;
    let api = shop.api();

    let sent = api.request_password_reset(&identifier).await?;
    if let Some(message) = sent.message {
        println!("{message}");
    }

    let otp = prompt::line("OTP").await?;
    api.verify_password_reset(&identifier, &otp).await?;

    let password = prompt::secret("New password").await?;
    let confirm = prompt::secret("Confirm new password").await?;
    validate_new_password(password.expose_secret(), confirm.expose_secret())?;

    api.confirm_password_reset(&identifier, &password).await?;
    shop.toasts()
        .success("Password reset. You can now log in with your new password.")
        .await;
    Ok(())
}
