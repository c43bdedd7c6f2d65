//! Order placement.

use peelojuice_client::ViewLifetime;
use peelojuice_client::state::checkout::CheckoutState;
use peelojuice_core::{AddressId, PaymentMethod};

use crate::{CliError, Shop};

/// Place an order for the current cart, delivering to `address` or the
/// default address.
#[allow(clippy::print_stdout)]
pub async fn checkout(
    shop: &Shop,
    method: PaymentMethod,
    address: Option<AddressId>,
) -> Result<(), CliError> {
    shop.addresses().load().await?;
    if let Some(id) = address {
        shop.addresses().select(id).await?;
    }

    let view = ViewLifetime::new();
    let state = shop
        .checkout()
        .submit(method, shop.addresses().selected().await, &view)
        .await?;

    match &state {
        CheckoutState::CodConfirmed { order_id } => {
            shop.toasts()
                .success(format!("Order {order_id} placed. Pay on delivery."))
                .await;
        }
        CheckoutState::Confirmed { order_id } => {
            shop.toasts()
                .success(format!("Payment received for order {order_id}"))
                .await;
        }
        CheckoutState::Cancelled { order_id } => {
            println!("Order {order_id} is waiting for payment.");
        }
        CheckoutState::VerificationFailed { order_id, message } => {
            println!("Payment for order {order_id} could not be confirmed: {message}");
        }
        _ => {}
    }
    if let Some(view) = state.success_view() {
        println!("/order-success?{view}");
    }
    Ok(())
}
