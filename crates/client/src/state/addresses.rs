//! Address book with a checkout selection.
//!
//! The backend keeps at most one default address. After every load the
//! selection survives if the address still exists and otherwise falls back to
//! the default.

use std::sync::Arc;

use peelojuice_core::AddressId;
use tokio::sync::RwLock;
use tracing::instrument;

use crate::api::StorefrontApi;
use crate::api::types::{Address, AddressInput};
use crate::error::{ClientError, Result};

/// Saved addresses plus the one picked for delivery.
#[derive(Debug, Clone)]
pub struct AddressBook<A> {
    inner: Arc<AddressBookInner<A>>,
}

#[derive(Debug)]
struct AddressBookInner<A> {
    api: A,
    state: RwLock<BookState>,
}

#[derive(Debug, Default)]
struct BookState {
    addresses: Vec<Address>,
    selected: Option<AddressId>,
}

impl BookState {
    fn reconcile(&mut self, addresses: Vec<Address>) {
        let keep = self
            .selected
            .filter(|id| addresses.iter().any(|a| a.id == *id));
        self.selected = keep.or_else(|| addresses.iter().find(|a| a.is_default).map(|a| a.id));
        self.addresses = addresses;
    }
}

impl<A: StorefrontApi> AddressBook<A> {
    #[must_use]
    pub fn new(api: A) -> Self {
        Self {
            inner: Arc::new(AddressBookInner {
                api,
                state: RwLock::new(BookState::default()),
            }),
        }
    }

    /// Addresses from the last load.
    pub async fn addresses(&self) -> Vec<Address> {
        self.inner.state.read().await.addresses.clone()
    }

    /// Address picked for delivery, if any.
    pub async fn selected(&self) -> Option<AddressId> {
        self.inner.state.read().await.selected
    }

    /// Fetch addresses and reconcile the selection.
    ///
    /// # Errors
    ///
    /// Returns an error if the list cannot be fetched.
    #[instrument(skip(self))]
    pub async fn load(&self) -> Result<Vec<Address>> {
        let addresses = self.inner.api.addresses().await?;
        self.inner.state.write().await.reconcile(addresses.clone());
        Ok(addresses)
    }

    /// Pick a loaded address for delivery.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::ValidationRejected` for an unknown id.
    pub async fn select(&self, id: AddressId) -> Result<()> {
        let mut state = self.inner.state.write().await;
        if !state.addresses.iter().any(|a| a.id == id) {
            return Err(ClientError::ValidationRejected(format!(
                "Address {id} not found"
            )));
        }
        state.selected = Some(id);
        Ok(())
    }

    /// Save a new address and select it.
    ///
    /// # Errors
    ///
    /// Returns the backend's validation message.
    #[instrument(skip_all)]
    pub async fn create(&self, input: &AddressInput) -> Result<Address> {
        let address = self.inner.api.create_address(input).await?;
        self.load().await?;
        self.inner.state.write().await.selected = Some(address.id);
        Ok(address)
    }

    /// Replace an address.
    ///
    /// # Errors
    ///
    /// Returns the backend's validation message.
    #[instrument(skip(self, input))]
    pub async fn update(&self, id: AddressId, input: &AddressInput) -> Result<Address> {
        let address = self.inner.api.update_address(id, input).await?;
        self.load().await?;
        Ok(address)
    }

    /// Delete an address. A deleted selection falls back to the default.
    ///
    /// # Errors
    ///
    /// Returns the backend's rejection.
    #[instrument(skip(self))]
    pub async fn delete(&self, id: AddressId) -> Result<()> {
        self.inner.api.delete_address(id).await?;
        self.load().await?;
        Ok(())
    }

    /// Make an address the default.
    ///
    /// # Errors
    ///
    /// Returns the backend's rejection.
    #[instrument(skip(self))]
    pub async fn set_default(&self, id: AddressId) -> Result<()> {
        self.inner.api.set_default_address(id).await?;
        self.load().await?;
        Ok(())
    }
}
