//! Address book endpoints.

use peelojuice_core::AddressId;
use serde::de::IgnoredAny;
use tracing::instrument;

use super::types::{Address, AddressInput, ListResponse, MessageResponse};
use super::{ApiClient, ApiError, ApiRequest};

impl ApiClient {
    /// List saved addresses.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self))]
    pub async fn addresses(&self) -> Result<Vec<Address>, ApiError> {
        let response: ListResponse<Address> =
            self.execute(ApiRequest::get("/addresses/")).await?;
        Ok(response.into_vec())
    }

    /// Fetch one address.
    ///
    /// # Errors
    ///
    /// Returns an error if the address does not exist or the request fails.
    #[instrument(skip(self), fields(address = %id))]
    pub async fn address(&self, id: AddressId) -> Result<Address, ApiError> {
        self.execute(ApiRequest::get(format!("/addresses/{id}/")))
            .await
    }

    /// Save a new address.
    ///
    /// # Errors
    ///
    /// Returns an error if validation fails server-side or the request fails.
    #[instrument(skip(self, input))]
    pub async fn create_address(&self, input: &AddressInput) -> Result<Address, ApiError> {
        self.execute(ApiRequest::post("/addresses/").json(input)?)
            .await
    }

    /// Replace an address.
    ///
    /// # Errors
    ///
    /// Returns an error if validation fails server-side or the request fails.
    #[instrument(skip(self, input), fields(address = %id))]
    pub async fn update_address(
        &self,
        id: AddressId,
        input: &AddressInput,
    ) -> Result<Address, ApiError> {
        self.execute(ApiRequest::put(format!("/addresses/{id}/")).json(input)?)
            .await
    }

    /// Delete an address.
    ///
    /// # Errors
    ///
    /// Returns an error if the address does not exist or the request fails.
    #[instrument(skip(self), fields(address = %id))]
    pub async fn delete_address(&self, id: AddressId) -> Result<(), ApiError> {
        let _: IgnoredAny = self
            .execute(ApiRequest::delete(format!("/addresses/{id}/")))
            .await?;
        Ok(())
    }

    /// Mark an address as the default.
    ///
    /// # Errors
    ///
    /// Returns an error if the address does not exist or the request fails.
    #[instrument(skip(self), fields(address = %id))]
    pub async fn set_default_address(&self, id: AddressId) -> Result<MessageResponse, ApiError> {
        self.execute_message(ApiRequest::post(format!("/addresses/{id}/set_default/")))
            .await
    }
}
