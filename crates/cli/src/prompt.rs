//! Terminal input and the stand-in for the hosted payment overlay.

use std::io::Write;

use peelojuice_client::api::types::{GatewayOrder, PaymentProof};
use peelojuice_client::{GatewayOutcome, PaymentGateway};
use secrecy::SecretString;

/// Print `label` and read one trimmed line from stdin.
///
/// # Errors
///
/// Returns an error if stdin is closed or unreadable.
#[allow(clippy::print_stdout)]
pub async fn line(label: &str) -> std::io::Result<String> {
    print!("{label}: ");
    std::io::stdout().flush()?;

    // std's stdin keeps one buffer across prompts
    let (read, input) = tokio::task::spawn_blocking(|| {
        let mut input = String::new();
        std::io::stdin().read_line(&mut input).map(|read| (read, input))
    })
    .await
    .map_err(std::io::Error::other)??;
    if read == 0 {
        return Err(std::io::Error::new(
            std::io::ErrorKind::UnexpectedEof,
            format!("no input for {label}"),
        ));
    }
    Ok(input.trim().to_string())
}

/// Like [`line`], but empty input becomes `None`.
///
/// # Errors
///
/// Returns an error if stdin is closed or unreadable.
pub async fn optional(label: &str) -> std::io::Result<Option<String>> {
    let value = line(label).await?;
    Ok((!value.is_empty()).then_some(value))
}

/// Read a password.
///
/// # Errors
///
/// Returns an error if stdin is closed or unreadable.
pub async fn secret(label: &str) -> std::io::Result<SecretString> {
    Ok(SecretString::from(line(label).await?))
}

/// Payment overlay driven from the terminal.
///
/// Shows the gateway order, then waits for the payment id and signature the
/// hosted page hands back. `fail <reason>` reports a declined payment; an
/// empty line closes the overlay.
#[derive(Debug, Clone, Copy)]
pub struct PromptGateway;

impl PaymentGateway for PromptGateway {
    #[allow(clippy::print_stdout)]
    async fn begin(&self, order: &GatewayOrder) -> GatewayOutcome {
        println!(
            "Pay {}.{:02} {} for gateway order {} (key {})",
            order.amount / 100,
            order.amount % 100,
            order.currency,
            order.razorpay_order_id,
            order.key_id
        );

        let Ok(input) = line("Payment id and signature (`fail <reason>` or empty to cancel)").await
        else {
            return GatewayOutcome::Dismissed;
        };

        if input.is_empty() {
            return GatewayOutcome::Dismissed;
        }
        if let Some(reason) = input.strip_prefix("fail") {
            let reason = reason.trim();
            return GatewayOutcome::Failed(if reason.is_empty() {
                "Payment declined".to_string()
            } else {
                reason.to_string()
            });
        }

        let mut parts = input.split_whitespace();
        match (parts.next(), parts.next()) {
            (Some(payment_id), Some(signature)) => GatewayOutcome::Succeeded(PaymentProof {
                razorpay_order_id: order.razorpay_order_id.clone(),
                razorpay_payment_id: payment_id.to_string(),
                razorpay_signature: signature.to_string(),
            }),
            _ => GatewayOutcome::Failed("Incomplete payment response".to_string()),
        }
    }
}
