//! PeelOJuice Core - Shared domain types.
//!
//! This crate provides the types shared by every PeelOJuice client component:
//! - `client` - State coordination and REST adapter for the juice storefront
//! - `cli` - Command-line storefront driving the client
//!
//! # Architecture
//!
//! The core crate contains only types - no I/O, no HTTP clients, no storage.
//! Everything here mirrors values owned by the backend; nothing is computed
//! client-side that the backend already computes (prices, totals, taxes).
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for IDs, money, coupon codes, login
//!   identifiers, and order/payment statuses

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
