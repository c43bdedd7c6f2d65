//! Hosted gateway endpoints.

use peelojuice_core::OrderId;
use tracing::{info, instrument};

use super::types::{GatewayOrder, GatewayOrderRequest, MessageResponse, PaymentProof};
use super::{ApiClient, ApiError, ApiRequest};

impl ApiClient {
    /// Open a gateway payment for a placed order.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot create the gateway order.
    #[instrument(skip(self), fields(order = %order))]
    pub async fn create_gateway_order(&self, order: OrderId) -> Result<GatewayOrder, ApiError> {
        let request = ApiRequest::post("/payments/razorpay/create-order/")
            .json(&GatewayOrderRequest { order_id: order })?;
        self.execute(request).await
    }

    /// Verify the gateway's payment proof.
    ///
    /// # Errors
    ///
    /// Returns an error if the signature does not verify or the request fails.
    #[instrument(skip(self, proof), fields(gateway_order = %proof.razorpay_order_id))]
    pub async fn verify_payment(&self, proof: &PaymentProof) -> Result<MessageResponse, ApiError> {
        let request = ApiRequest::post("/payments/razorpay/verify/").json(proof)?;
        let response = self.execute_message(request).await?;
        info!("Payment verified");
        Ok(response)
    }
}
