//! Branch selection and menu browsing.

use peelojuice_client::state::branch::SelectOutcome;
use peelojuice_core::{BranchId, CategoryId, JuiceId};

use crate::{CliError, Shop};

/// List branches, marking the selected one. With `select`, switch to that
/// branch first.
#[allow(clippy::print_stdout)]
pub async fn branches(shop: &Shop, select: Option<BranchId>) -> Result<(), CliError> {
    if let Some(id) = select {
        match shop.branch().select_by_id(id).await? {
            SelectOutcome::Applied(Some(branch)) => {
                shop.toasts()
                    .success(format!("Delivering from {}", branch.name))
                    .await;
            }
            SelectOutcome::Applied(None) => {}
            SelectOutcome::Rejected { message } => {
                shop.toasts().warning(message).await;
            }
        }
    }

    let state = shop.branch().state().await;
    let selected = state.branch().map(|b| b.id);
    for branch in shop.branch().branches().await {
        let marker = if Some(branch.id) == selected { "*" } else { " " };
        let lock = if Some(branch.id) == selected && state.is_locked() {
            "  [locked while cart has items]"
        } else {
            ""
        };
        println!(
            "{marker} {:>3}  {} ({}){lock}",
            branch.id, branch.name, branch.city
        );
    }
    Ok(())
}

/// Print the selected branch's menu.
#[allow(clippy::print_stdout)]
pub async fn menu(shop: &Shop, category: Option<CategoryId>) -> Result<(), CliError> {
    if let Some(branch) = shop.branch().selected().await {
        println!("Menu at {}", branch.name);
    }

    for juice in shop.branch().menu(shop.api(), category).await? {
        let size = juice
            .net_quantity_ml
            .map(|ml| format!(" {ml}ml"))
            .unwrap_or_default();
        let availability = if juice.is_available { "" } else { " (sold out)" };
        println!(
            "{:>4}  {}{size}  {}{availability}",
            juice.id, juice.name, juice.price
        );
    }
    Ok(())
}

#[allow(clippy::print_stdout)]
pub async fn categories(shop: &Shop) -> Result<(), CliError> {
    for category in shop.api().categories().await? {
        println!("{:>4}  {}", category.id, category.name);
    }
    Ok(())
}

/// Print one juice in full.
#[allow(clippy::print_stdout)]
pub async fn juice(shop: &Shop, id: JuiceId) -> Result<(), CliError> {
    let juice = shop.api().juice(id).await?;

    println!("{} ({})", juice.name, juice.price);
    if let Some(category) = &juice.category {
        println!("Category: {}", category.name);
    }
    if let Some(ml) = juice.net_quantity_ml {
        println!("Size: {ml}ml");
    }
    if !juice.is_available {
        println!("Currently sold out");
    }
    if let Some(description) = juice.description.as_deref().filter(|d| !d.is_empty()) {
        println!();
        println!("{description}");
    }
    Ok(())
}
