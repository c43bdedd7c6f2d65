//! Cart endpoints. The cart is server-owned; every call here is a thin
//! request, and callers refetch after mutating.

use peelojuice_core::{CouponCode, JuiceId};
use tracing::instrument;

use super::types::{
    AddToCartRequest, Cart, CouponRequest, InstructionsRequest, JuiceRef, MessageResponse,
    QuantityAction, UpdateCartItemRequest,
};
use super::{ApiClient, ApiError, ApiRequest};

impl ApiClient {
    /// Fetch the current cart.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self))]
    pub async fn cart(&self) -> Result<Cart, ApiError> {
        self.execute(ApiRequest::get("/cart/")).await
    }

    /// Add `quantity` of a juice.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend rejects the request.
    #[instrument(skip(self), fields(juice = %juice, quantity))]
    pub async fn add_to_cart(
        &self,
        juice: JuiceId,
        quantity: u32,
    ) -> Result<MessageResponse, ApiError> {
        let request = ApiRequest::post("/cart/add/").json(&AddToCartRequest {
            juice_id: juice,
            quantity,
        })?;
        self.execute_message(request).await
    }

    /// Step a line's quantity up or down by one.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend rejects the request.
    #[instrument(skip(self), fields(juice = %juice))]
    pub async fn update_cart_item(
        &self,
        juice: JuiceId,
        action: QuantityAction,
    ) -> Result<MessageResponse, ApiError> {
        let request = ApiRequest::post("/cart/update/").json(&UpdateCartItemRequest {
            juice_id: juice,
            action,
        })?;
        self.execute_message(request).await
    }

    /// Remove a line.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend rejects the request.
    #[instrument(skip(self), fields(juice = %juice))]
    pub async fn remove_cart_item(&self, juice: JuiceId) -> Result<MessageResponse, ApiError> {
        let request = ApiRequest::delete("/cart/remove/").json(&JuiceRef { juice_id: juice })?;
        self.execute_message(request).await
    }

    /// Apply a coupon to the cart.
    ///
    /// # Errors
    ///
    /// Returns an error if the coupon is invalid or the request fails.
    #[instrument(skip(self), fields(code = %code))]
    pub async fn apply_coupon(&self, code: &CouponCode) -> Result<MessageResponse, ApiError> {
        let request = ApiRequest::post("/cart/apply-coupon/").json(&CouponRequest {
            code: code.as_str(),
        })?;
        self.execute_message(request).await
    }

    /// Remove the applied coupon.
    ///
    /// # Errors
    ///
    /// Returns an error if no coupon is applied or the request fails.
    #[instrument(skip(self))]
    pub async fn remove_coupon(&self) -> Result<MessageResponse, ApiError> {
        self.execute_message(ApiRequest::post("/cart/remove-coupon/"))
            .await
    }

    /// Set a line's cooking instructions.
    ///
    /// # Errors
    ///
    /// Returns an error if the line is missing or the request fails.
    #[instrument(skip(self, instructions), fields(juice = %juice))]
    pub async fn update_instructions(
        &self,
        juice: JuiceId,
        instructions: &str,
    ) -> Result<MessageResponse, ApiError> {
        let request =
            ApiRequest::post("/cart/update-instructions/").json(&InstructionsRequest {
                juice_id: juice,
                instructions,
            })?;
        self.execute_message(request).await
    }
}
