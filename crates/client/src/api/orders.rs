//! Order placement and history endpoints.

use peelojuice_core::{AddressId, BranchId, OrderFilter, OrderId, PaymentMethod};
use tracing::{info, instrument};

use super::types::{CheckoutRequest, CheckoutResponse, MessageResponse, Order, OrderList};
use super::{ApiClient, ApiError, ApiRequest};

impl ApiClient {
    /// Place an order from the current cart.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend rejects the order or the request fails.
    #[instrument(skip(self), fields(method = %method, address = %address, branch = %branch))]
    pub async fn checkout(
        &self,
        method: PaymentMethod,
        address: AddressId,
        branch: BranchId,
    ) -> Result<CheckoutResponse, ApiError> {
        let request = ApiRequest::post("/orders/checkout/").json(&CheckoutRequest {
            payment_method: method,
            address_id: address,
            branch_id: branch,
        })?;
        let response: CheckoutResponse = self.execute(request).await?;
        info!(order_id = %response.order.id, "Order placed");
        Ok(response)
    }

    /// List the customer's orders, optionally filtered.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self))]
    pub async fn orders(&self, filter: Option<OrderFilter>) -> Result<OrderList, ApiError> {
        let mut request = ApiRequest::get("/orders/my-orders/");
        if let Some(filter) = filter {
            request = request.query("status", filter.as_str());
        }
        self.execute(request).await
    }

    /// Fetch one order.
    ///
    /// # Errors
    ///
    /// Returns an error if the order does not exist or the request fails.
    #[instrument(skip(self), fields(order = %id))]
    pub async fn order(&self, id: OrderId) -> Result<Order, ApiError> {
        self.execute(ApiRequest::get(format!("/orders/my-orders/{id}/")))
            .await
    }

    /// Cancel an order that has not been prepared yet.
    ///
    /// # Errors
    ///
    /// Returns an error if the order can no longer be cancelled.
    #[instrument(skip(self), fields(order = %id))]
    pub async fn cancel_order(&self, id: OrderId) -> Result<MessageResponse, ApiError> {
        self.execute_message(ApiRequest::post(format!("/orders/my-orders/{id}/cancel/")))
            .await
    }
}
