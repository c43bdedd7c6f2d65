//! Subcommand implementations.
//!
//! Commands print results to stdout. Failures are returned to `main`, which
//! turns them into toasts; toasts raised along the way are printed once the
//! command finishes.

pub mod account;
pub mod addresses;
pub mod cart;
pub mod catalog;
pub mod checkout;
pub mod orders;

use peelojuice_client::state::toast::ToastKind;

use crate::Shop;

/// Print and drop every pending toast.
#[allow(clippy::print_stdout)]
pub async fn print_toasts(shop: &Shop) {
    for toast in shop.toasts().drain().await {
        let marker = match toast.kind {
            ToastKind::Success => "ok",
            ToastKind::Error => "error",
            ToastKind::Warning => "warning",
            ToastKind::Info => "info",
        };
        println!("[{marker}] {}", toast.message);
    }
}
