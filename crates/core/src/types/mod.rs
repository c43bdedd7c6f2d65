//! Core types for PeelOJuice.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod coupon;
pub mod id;
pub mod login;
pub mod price;
pub mod status;

pub use coupon::{CouponCode, CouponCodeError};
pub use id::*;
pub use login::{LoginIdentifier, LoginIdentifierError};
pub use price::{CurrencyCode, Price};
pub use status::*;
