//! Delivery address management.

use peelojuice_client::api::types::AddressInput;
use peelojuice_core::AddressId;

use crate::prompt;
use crate::{CliError, Shop};

#[allow(clippy::print_stdout)]
pub async fn list(shop: &Shop) -> Result<(), CliError> {
    let addresses = shop.addresses().load().await?;
    if addresses.is_empty() {
        println!("No saved addresses. Add one with `pj addresses add`.");
        return Ok(());
    }

    for address in addresses {
        let default = if address.is_default { " (default)" } else { "" };
        println!(
            "{:>4}  {}{default}: {}, {}",
            address.id,
            address.label,
            address.full_name,
            address.one_line()
        );
    }
    Ok(())
}

pub async fn add(shop: &Shop, is_default: bool) -> Result<(), CliError> {
    let input = AddressInput {
        label: prompt::optional("Label [Home]")
            .await?
            .unwrap_or_else(|| "Home".to_string()),
        full_name: prompt::line("Full name").await?,
        phone_number: prompt::line("Phone number").await?,
        address_line1: prompt::line("Address line 1").await?,
        address_line2: prompt::optional("Address line 2").await?,
        city: prompt::line("City").await?,
        state: prompt::line("State").await?,
        pincode: prompt::line("Pincode").await?,
        landmark: prompt::optional("Landmark").await?,
        is_default,
    };

    let address = shop.addresses().create(&input).await?;
    shop.toasts()
        .success(format!("Saved address {} ({})", address.id, address.label))
        .await;
    Ok(())
}

/// Edit an address; empty input keeps the current value.
pub async fn edit(shop: &Shop, id: AddressId) -> Result<(), CliError> {
    let current = shop.api().address(id).await?;

    let input = AddressInput {
        label: keep("Label", current.label).await?,
        full_name: keep("Full name", current.full_name).await?,
        phone_number: keep("Phone number", current.phone_number).await?,
        address_line1: keep("Address line 1", current.address_line1).await?,
        address_line2: keep_optional("Address line 2", current.address_line2).await?,
        city: keep("City", current.city).await?,
        state: keep("State", current.state).await?,
        pincode: keep("Pincode", current.pincode).await?,
        landmark: keep_optional("Landmark", current.landmark).await?,
        is_default: current.is_default,
    };

    shop.addresses().update(id, &input).await?;
    shop.toasts().success("Address updated").await;
    Ok(())
}

async fn keep(label: &str, current: String) -> std::io::Result<String> {
    Ok(prompt::optional(&format!("{label} [{current}]"))
        .await?
        .unwrap_or(current))
}

async fn keep_optional(label: &str, current: Option<String>) -> std::io::Result<Option<String>> {
    let shown = current.as_deref().unwrap_or("");
    Ok(prompt::optional(&format!("{label} [{shown}]"))
        .await?
        .or(current))
}

pub async fn set_default(shop: &Shop, id: AddressId) -> Result<(), CliError> {
    shop.addresses().load().await?;
    shop.addresses().set_default(id).await?;
    shop.toasts().success("Default address updated").await;
    Ok(())
}

pub async fn delete(shop: &Shop, id: AddressId) -> Result<(), CliError> {
    shop.addresses().delete(id).await?;
    shop.toasts().success("Address deleted").await;
    Ok(())
}
