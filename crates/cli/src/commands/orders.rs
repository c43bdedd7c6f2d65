//! Order history.

use peelojuice_client::api::types::Order;
use peelojuice_core::{OrderFilter, OrderId};

use crate::{CliError, Shop};

#[allow(clippy::print_stdout)]
fn print_order(order: &Order) {
    let number = order
        .order_number
        .clone()
        .unwrap_or_else(|| format!("#{}", order.id));
    let total = order
        .total_amount
        .map(|t| t.to_string())
        .unwrap_or_default();
    let placed = order
        .created_at
        .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_default();
    println!(
        "{:>5}  {number}  {}  {total}  {placed}",
        order.id, order.status
    );
}

#[allow(clippy::print_stdout)]
pub async fn list(shop: &Shop, filter: Option<OrderFilter>) -> Result<(), CliError> {
    let list = shop.api().orders(filter).await?;
    if list.orders.is_empty() {
        println!("No orders yet.");
    }
    for order in &list.orders {
        print_order(order);
    }
    Ok(())
}

#[allow(clippy::print_stdout)]
pub async fn show(shop: &Shop, id: OrderId) -> Result<(), CliError> {
    let order = shop.api().order(id).await?;
    print_order(&order);
    if let Some(method) = &order.payment_method {
        let status = order.payment_status.as_deref().unwrap_or("pending");
        println!("       {method} ({status})");
    }
    for item in &order.items {
        let subtotal = item
            .subtotal
            .map(|s| s.to_string())
            .unwrap_or_default();
        println!("       {} x{}  {subtotal}", item.juice_name, item.quantity);
    }
    Ok(())
}

pub async fn cancel(shop: &Shop, id: OrderId) -> Result<(), CliError> {
    let response = shop.api().cancel_order(id).await?;
    shop.toasts()
        .success(
            response
                .message
                .unwrap_or_else(|| format!("Order {id} cancelled")),
        )
        .await;
    Ok(())
}
