//! Cart commands. Every change prints the refetched cart.

use peelojuice_client::api::types::{Cart, QuantityAction};
use peelojuice_client::state::cart::CartSnapshot;
use peelojuice_core::{JuiceId, Price};

use crate::{CliError, Shop};

#[allow(clippy::print_stdout)]
fn print_total(label: &str, value: Option<Price>) {
    if let Some(value) = value {
        println!("  {label:<16} {value}");
    }
}

#[allow(clippy::print_stdout)]
fn print_cart(cart: &Cart) {
    for item in &cart.items {
        let subtotal = item
            .subtotal
            .map(|s| s.to_string())
            .unwrap_or_default();
        println!(
            "{:>4}  {} x{} @ {}  {subtotal}",
            item.juice, item.juice_name, item.quantity, item.price_at_added
        );
        if let Some(note) = item.cooking_instructions.as_deref().filter(|n| !n.is_empty()) {
            println!("        note: {note}");
        }
    }

    if let Some(coupon) = &cart.applied_coupon {
        println!("Coupon {}", coupon.code);
    }

    let totals = &cart.totals;
    print_total("Items", totals.total_amount);
    print_total("Discount", totals.coupon_discount);
    print_total("GST", totals.food_gst);
    if totals.free_delivery {
        println!("  {:<16} free", "Delivery");
    } else {
        print_total("Delivery", totals.delivery_fee_base);
    }
    print_total("Delivery GST", totals.delivery_gst);
    print_total("Platform fee", totals.platform_fee);
    print_total("Total", totals.grand_total);
}

#[allow(clippy::print_stdout)]
fn print_snapshot(snapshot: &CartSnapshot) {
    match &snapshot.cart {
        Some(cart) if !cart.is_empty() => print_cart(cart),
        _ => println!("Your cart is empty"),
    }
}

/// Show the cart.
pub async fn show(shop: &Shop) -> Result<(), CliError> {
    if !shop.auth().is_authenticated().await {
        return Err(peelojuice_client::ClientError::Unauthenticated.into());
    }
    print_snapshot(&shop.cart().snapshot().await);
    Ok(())
}

pub async fn add(shop: &Shop, juice: JuiceId, quantity: u32) -> Result<(), CliError> {
    let snapshot = shop.cart().add_item(juice, quantity).await?;
    shop.toasts().success("Added to cart!").await;
    print_snapshot(&snapshot);
    Ok(())
}

pub async fn increment(shop: &Shop, juice: JuiceId) -> Result<(), CliError> {
    let snapshot = shop
        .cart()
        .update_quantity(juice, QuantityAction::Increment)
        .await?;
    print_snapshot(&snapshot);
    Ok(())
}

pub async fn decrement(shop: &Shop, juice: JuiceId) -> Result<(), CliError> {
    let snapshot = shop
        .cart()
        .update_quantity(juice, QuantityAction::Decrement)
        .await?;
    print_snapshot(&snapshot);
    Ok(())
}

pub async fn remove(shop: &Shop, juice: JuiceId) -> Result<(), CliError> {
    let snapshot = shop.cart().remove_item(juice).await?;
    shop.toasts().success("Item removed").await;
    print_snapshot(&snapshot);
    Ok(())
}

pub async fn apply_coupon(shop: &Shop, code: &str) -> Result<(), CliError> {
    let message = shop.cart().apply_coupon(code).await?;
    shop.toasts().success(message).await;
    print_snapshot(&shop.cart().snapshot().await);
    Ok(())
}

pub async fn remove_coupon(shop: &Shop) -> Result<(), CliError> {
    let snapshot = shop.cart().remove_coupon().await?;
    shop.toasts().success("Coupon removed").await;
    print_snapshot(&snapshot);
    Ok(())
}

pub async fn note(shop: &Shop, juice: JuiceId, instructions: &str) -> Result<(), CliError> {
    let snapshot = shop.cart().update_instructions(juice, instructions).await?;
    print_snapshot(&snapshot);
    Ok(())
}
