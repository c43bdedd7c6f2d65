//! PeelOJuice storefront client.
//!
//! Keeps the client-side session, branch, cart and checkout state in sync
//! with the PeelOJuice REST backend. Prices, totals, taxes and coupons are
//! computed server-side; this crate renders what the server reports and
//! resynchronizes after every mutation.
//!
//! # Modules
//!
//! - [`api`] - REST adapter with bearer auth and a single refresh on 401
//! - [`session`] - Access/refresh token storage and session events
//! - [`state`] - Branch gate, cart, address book, checkout, auth and toasts
//! - [`storage`] - Tab-scoped and durable key-value stores
//! - [`config`] - Environment configuration
//! - [`error`] - User-facing error taxonomy

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod api;
pub mod config;
pub mod error;
pub mod session;
pub mod state;
pub mod storage;

pub use api::{ApiClient, ApiError, StorefrontApi};
pub use config::{ClientConfig, ConfigError};
pub use error::ClientError;
pub use session::{SessionEvent, SessionStore};
pub use state::Storefront;
pub use state::checkout::{GatewayOutcome, PaymentGateway, ViewLifetime};
