//! Client-side state shared by every view.
//!
//! Each piece of state is owned by exactly one coordinator; views get
//! snapshots and issue commands. [`Storefront`] wires the coordinators
//! together over one API adapter.

pub mod addresses;
pub mod auth;
pub mod branch;
pub mod cart;
pub mod checkout;
pub mod toast;

#[cfg(test)]
mod fake;

use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};
use uuid::Uuid;

use self::addresses::AddressBook;
use self::auth::AuthCoordinator;
use self::branch::BranchGate;
use self::cart::CartCoordinator;
use self::checkout::{CheckoutCoordinator, PaymentGateway};
use self::toast::ToastQueue;
use crate::api::{ApiClient, ApiError, StorefrontApi};
use crate::config::ClientConfig;
use crate::error::{ClientError, Result};
use crate::session::SessionStore;
use crate::storage::{KeyValueStore, StorageError};

/// Error wiring up a [`Storefront`] from configuration.
#[derive(Debug, thiserror::Error)]
pub enum BootstrapError {
    #[error("failed to open durable store: {0}")]
    Storage(#[from] StorageError),
    #[error("failed to build API client: {0}")]
    Api(#[from] ApiError),
}

/// Every coordinator, sharing one API adapter.
///
/// Cheaply cloneable via `Arc`.
#[derive(Debug)]
pub struct Storefront<A, G> {
    inner: Arc<StorefrontInner<A, G>>,
}

impl<A, G> Clone for Storefront<A, G> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

#[derive(Debug)]
struct StorefrontInner<A, G> {
    api: A,
    branch: BranchGate,
    cart: CartCoordinator<A>,
    addresses: AddressBook<A>,
    checkout: CheckoutCoordinator<A, G>,
    auth: AuthCoordinator<A>,
    toasts: ToastQueue,
}

impl<G: PaymentGateway> Storefront<ApiClient, G> {
    /// Open the durable store under the configured state directory and build
    /// the HTTP adapter.
    ///
    /// # Errors
    ///
    /// Returns an error if the durable store is unreadable or the HTTP client
    /// cannot be built.
    pub async fn bootstrap(config: &ClientConfig, gateway: G) -> Result<Self, BootstrapError> {
        let durable = KeyValueStore::open(config.durable_store_path()).await?;
        let session = SessionStore::new(KeyValueStore::tab(), durable);
        let api = ApiClient::new(config, session)?;

        info!(api = %config.api_root(), "Storefront client ready");
        Ok(Self::new(api, gateway, config.toast_ttl, config.razorpay_key_id.clone()).await)
    }
}

impl<A: StorefrontApi + Clone, G: PaymentGateway> Storefront<A, G> {
    /// Wire the coordinators over `api`. The branch selection is restored
    /// from the session's durable store.
    pub async fn new(
        api: A,
        gateway: G,
        toast_ttl: Duration,
        gateway_key_override: Option<String>,
    ) -> Self {
        let branch = BranchGate::restore(api.session().durable().clone()).await;
        let cart = CartCoordinator::new(api.clone(), branch.clone());
        let addresses = AddressBook::new(api.clone());
        let toasts = ToastQueue::new(toast_ttl);
        let checkout = CheckoutCoordinator::new(
            api.clone(),
            gateway,
            branch.clone(),
            cart.clone(),
            toasts.clone(),
            gateway_key_override,
        );
        let auth = AuthCoordinator::new(api.clone(), cart.clone());

        Self {
            inner: Arc::new(StorefrontInner {
                api,
                branch,
                cart,
                addresses,
                checkout,
                auth,
                toasts,
            }),
        }
    }

    /// Restore the session and load the branch list.
    ///
    /// A branch list failure is reported as a toast; the storefront stays
    /// usable with whatever selection was persisted.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Storage` if the session cannot be restored.
    pub async fn start(&self) -> Result<bool> {
        let authenticated = self.inner.auth.restore().await?;
        if let Err(e) = self.inner.branch.load_branches(&self.inner.api).await {
            warn!(error = %e, "Failed to load branches");
            self.report(&e).await;
        }
        Ok(authenticated)
    }

    /// Turn a failure into an error toast.
    pub async fn report(&self, err: &ClientError) -> Uuid {
        self.inner.toasts.error(err.user_message()).await
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    #[must_use]
    pub fn api(&self) -> &A {
        &self.inner.api
    }

    #[must_use]
    pub fn session(&self) -> &SessionStore {
        self.inner.api.session()
    }

    #[must_use]
    pub fn branch(&self) -> &BranchGate {
        &self.inner.branch
    }

    #[must_use]
    pub fn cart(&self) -> &CartCoordinator<A> {
        &self.inner.cart
    }

    #[must_use]
    pub fn addresses(&self) -> &AddressBook<A> {
        &self.inner.addresses
    }

    #[must_use]
    pub fn checkout(&self) -> &CheckoutCoordinator<A, G> {
        &self.inner.checkout
    }

    #[must_use]
    pub fn auth(&self) -> &AuthCoordinator<A> {
        &self.inner.auth
    }

    #[must_use]
    pub fn toasts(&self) -> &ToastQueue {
        &self.inner.toasts
    }
}
