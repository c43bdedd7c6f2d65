//! Checkout orchestration.
//!
//! ```text
//! Idle → Submitting ─┬─ cod ────→ CodConfirmed
//!                    └─ online ─→ AwaitingGateway ─┬─ Succeeded → Verifying ─┬→ Confirmed
//!                                                  │                         └→ VerificationFailed
//!                                                  ├─ Failed ──→ GatewayFailed
//!                                                  └─ Dismissed → Cancelled
//! ```
//!
//! `Failed` keeps the customer on checkout with a toast; only the states in
//! [`CheckoutState::success_view`] navigate away.
//!
//! Only `Submitting` and `Verifying` wait on the network. A submission while
//! another is in flight is rejected. Each submission is bound to a
//! [`ViewLifetime`]; completions arriving after the view ended leave the
//! coordinator back at `Idle` instead of publishing their outcome.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use peelojuice_core::{AddressId, OrderId, PaymentMethod};
use tokio::sync::RwLock;
use tracing::{debug, error, info, instrument, warn};

use super::branch::BranchGate;
use super::cart::CartCoordinator;
use super::toast::ToastQueue;
use crate::api::StorefrontApi;
use crate::api::types::{GatewayOrder, PaymentProof};
use crate::error::{ClientError, Result};

/// Shown when checkout is attempted without a branch.
pub const SELECT_BRANCH_MESSAGE: &str = "Please select a branch";

/// Shown when checkout is attempted without a delivery address.
pub const SELECT_ADDRESS_MESSAGE: &str = "Please select a delivery address";

/// Fallback when order placement fails without a server message.
pub const PLACE_ORDER_FAILED: &str = "Failed to place order";

/// Shown when the customer closes the payment overlay.
pub const PAYMENT_CANCELLED: &str = "Payment cancelled";

/// Shown when a submission arrives while another is in flight.
pub const CHECKOUT_IN_PROGRESS: &str = "Your order is already being placed";

// =============================================================================
// Gateway capability
// =============================================================================

/// What the hosted payment overlay reported.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GatewayOutcome {
    Succeeded(PaymentProof),
    /// The gateway declined; carries its description.
    Failed(String),
    /// The customer closed the overlay.
    Dismissed,
}

/// The hosted payment overlay. Implementations open the third-party flow for
/// `order` and resolve once it reports back.
pub trait PaymentGateway {
    async fn begin(&self, order: &GatewayOrder) -> GatewayOutcome;
}

// =============================================================================
// View lifetime
// =============================================================================

/// Liveness token of the view that started a checkout.
#[derive(Debug, Clone)]
pub struct ViewLifetime(Arc<AtomicBool>);

impl ViewLifetime {
    #[must_use]
    pub fn new() -> Self {
        Self(Arc::new(AtomicBool::new(true)))
    }

    /// Mark the view as torn down.
    pub fn end(&self) {
        self.0.store(false, Ordering::SeqCst);
    }

    #[must_use]
    pub fn is_alive(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

impl Default for ViewLifetime {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// State
// =============================================================================

/// Checkout progress.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum CheckoutState {
    #[default]
    Idle,
    Submitting,
    CodConfirmed {
        order_id: OrderId,
    },
    AwaitingGateway {
        order_id: OrderId,
    },
    Verifying {
        order_id: OrderId,
    },
    Confirmed {
        order_id: OrderId,
    },
    /// Placement or gateway order creation failed; the customer may retry.
    Failed {
        order_id: Option<OrderId>,
        message: String,
    },
    /// The gateway took the payment but the backend rejected the proof.
    VerificationFailed {
        order_id: OrderId,
        message: String,
    },
    /// The gateway declined; the customer may retry.
    GatewayFailed {
        order_id: OrderId,
        reason: String,
    },
    /// The overlay was dismissed; the order stays pending server-side.
    Cancelled {
        order_id: OrderId,
    },
}

impl CheckoutState {
    /// Whether a submission is in progress.
    #[must_use]
    pub const fn is_in_flight(&self) -> bool {
        matches!(
            self,
            Self::Submitting | Self::AwaitingGateway { .. } | Self::Verifying { .. }
        )
    }

    /// Where the view should navigate, for terminal states that leave the
    /// checkout page.
    #[must_use]
    pub const fn success_view(&self) -> Option<SuccessView> {
        match self {
            Self::CodConfirmed { order_id } => Some(SuccessView {
                success: true,
                order_id: Some(*order_id),
                method: Some(PaymentMethod::Cod),
            }),
            Self::Confirmed { order_id } => Some(SuccessView {
                success: true,
                order_id: Some(*order_id),
                method: Some(PaymentMethod::Online),
            }),
            Self::VerificationFailed { .. } => Some(SuccessView {
                success: false,
                order_id: None,
                method: None,
            }),
            _ => None,
        }
    }
}

/// Parameters of the order-result view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SuccessView {
    pub success: bool,
    pub order_id: Option<OrderId>,
    pub method: Option<PaymentMethod>,
}

impl std::fmt::Display for SuccessView {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "success={}", self.success)?;
        if let Some(order_id) = self.order_id {
            write!(f, "&orderId={order_id}")?;
        }
        if let Some(method) = self.method {
            write!(f, "&method={method}")?;
        }
        Ok(())
    }
}

// =============================================================================
// Coordinator
// =============================================================================

/// Drives order placement and the optional online payment.
#[derive(Debug, Clone)]
pub struct CheckoutCoordinator<A, G> {
    inner: Arc<CheckoutInner<A, G>>,
}

#[derive(Debug)]
struct CheckoutInner<A, G> {
    api: A,
    gateway: G,
    branch: BranchGate,
    cart: CartCoordinator<A>,
    toasts: ToastQueue,
    gateway_key_override: Option<String>,
    state: RwLock<CheckoutState>,
}

impl<A: StorefrontApi, G: PaymentGateway> CheckoutCoordinator<A, G> {
    #[must_use]
    pub fn new(
        api: A,
        gateway: G,
        branch: BranchGate,
        cart: CartCoordinator<A>,
        toasts: ToastQueue,
        gateway_key_override: Option<String>,
    ) -> Self {
        Self {
            inner: Arc::new(CheckoutInner {
                api,
                gateway,
                branch,
                cart,
                toasts,
                gateway_key_override,
                state: RwLock::new(CheckoutState::Idle),
            }),
        }
    }

    pub async fn state(&self) -> CheckoutState {
        self.inner.state.read().await.clone()
    }

    /// Return to `Idle` unless a submission is in flight.
    pub async fn reset(&self) {
        let mut state = self.inner.state.write().await;
        if !state.is_in_flight() {
            *state = CheckoutState::Idle;
        }
    }

    /// Place an order.
    ///
    /// Preconditions are checked in order (branch, then address) before any
    /// request. Failures after that point are reported as toasts and as the
    /// returned state, not as errors.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::ValidationRejected` if a precondition is missing
    /// or a submission is already in flight. Nothing is sent in that case.
    #[instrument(skip(self, view), fields(method = %method))]
    pub async fn submit(
        &self,
        method: PaymentMethod,
        address: Option<AddressId>,
        view: &ViewLifetime,
    ) -> Result<CheckoutState> {
        let Some(branch) = self.inner.branch.selected().await else {
            return Err(ClientError::ValidationRejected(
                SELECT_BRANCH_MESSAGE.to_string(),
            ));
        };
        let Some(address) = address else {
            return Err(ClientError::ValidationRejected(
                SELECT_ADDRESS_MESSAGE.to_string(),
            ));
        };

        {
            let mut state = self.inner.state.write().await;
            if state.is_in_flight() {
                debug!("Checkout already in flight");
                return Err(ClientError::ValidationRejected(
                    CHECKOUT_IN_PROGRESS.to_string(),
                ));
            }
            *state = CheckoutState::Submitting;
        }

        let placed = self.inner.api.checkout(method, address, branch.id).await;
        let order_id = match placed {
            Ok(response) => response.order.id,
            Err(e) => {
                let err = ClientError::from(e);
                let message = err.user_message_or(PLACE_ORDER_FAILED);
                error!(error = %err, "Order placement failed");
                self.inner.toasts.error(message.clone()).await;
                return Ok(self
                    .settle(
                        view,
                        CheckoutState::Failed {
                            order_id: None,
                            message,
                        },
                    )
                    .await);
            }
        };

        match method {
            PaymentMethod::Cod => {
                self.inner.cart.clear().await;
                info!(order_id = %order_id, "Cash on delivery order confirmed");
                Ok(self
                    .settle(view, CheckoutState::CodConfirmed { order_id })
                    .await)
            }
            PaymentMethod::Online => Ok(self.pay_online(order_id, view).await),
        }
    }

    async fn pay_online(&self, order_id: OrderId, view: &ViewLifetime) -> CheckoutState {
        let mut gateway_order = match self.inner.api.create_gateway_order(order_id).await {
            Ok(gateway_order) => gateway_order,
            Err(e) => {
                let err = ClientError::from(e);
                let message = err.user_message_or(PLACE_ORDER_FAILED);
                error!(error = %err, order_id = %order_id, "Gateway order creation failed");
                self.inner.toasts.error(message.clone()).await;
                return self
                    .settle(
                        view,
                        CheckoutState::Failed {
                            order_id: Some(order_id),
                            message,
                        },
                    )
                    .await;
            }
        };

        if !view.is_alive() {
            debug!(order_id = %order_id, "View closed before payment, leaving order pending");
            return self
                .settle(view, CheckoutState::Cancelled { order_id })
                .await;
        }

        if let Some(key) = &self.inner.gateway_key_override {
            gateway_order.key_id.clone_from(key);
        }

        *self.inner.state.write().await = CheckoutState::AwaitingGateway { order_id };

        match self.inner.gateway.begin(&gateway_order).await {
            GatewayOutcome::Succeeded(proof) => self.verify(order_id, &proof, view).await,
            GatewayOutcome::Failed(reason) => {
                warn!(order_id = %order_id, reason = %reason, "Gateway reported failure");
                self.inner
                    .toasts
                    .error(ClientError::GatewayFailure(reason.clone()).user_message())
                    .await;
                self.settle(view, CheckoutState::GatewayFailed { order_id, reason })
                    .await
            }
            GatewayOutcome::Dismissed => {
                info!(order_id = %order_id, "Payment overlay dismissed");
                self.inner.toasts.info(PAYMENT_CANCELLED).await;
                self.settle(view, CheckoutState::Cancelled { order_id })
                    .await
            }
        }
    }

    async fn verify(
        &self,
        order_id: OrderId,
        proof: &PaymentProof,
        view: &ViewLifetime,
    ) -> CheckoutState {
        *self.inner.state.write().await = CheckoutState::Verifying { order_id };

        match self.inner.api.verify_payment(proof).await {
            Ok(_) => {
                self.inner.cart.clear().await;
                info!(order_id = %order_id, "Online payment confirmed");
                self.settle(view, CheckoutState::Confirmed { order_id })
                    .await
            }
            Err(e) => {
                let err = ClientError::from(e);
                let message = err.user_message();
                error!(error = %err, order_id = %order_id, "Payment verification failed");
                self.settle(view, CheckoutState::VerificationFailed { order_id, message })
                    .await
            }
        }
    }

    /// Publish `next` if the view is still alive; otherwise go back to idle.
    async fn settle(&self, view: &ViewLifetime, next: CheckoutState) -> CheckoutState {
        let mut state = self.inner.state.write().await;
        if view.is_alive() {
            *state = next.clone();
        } else {
            debug!(outcome = ?next, "View closed, dropping checkout completion");
            *state = CheckoutState::Idle;
        }
        next
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use std::sync::Mutex;

    use peelojuice_core::JuiceId;

    use super::*;
    use crate::state::fake::{FakeBackend, VALID_SIGNATURE, address_input};
    use crate::state::toast::ToastKind;

    /// Gateway returning a scripted outcome and recording what it was given.
    #[derive(Debug, Default)]
    struct ScriptedGateway {
        outcome: Mutex<Option<GatewayOutcome>>,
        seen: Mutex<Vec<GatewayOrder>>,
        end_view: Option<ViewLifetime>,
    }

    impl ScriptedGateway {
        fn with(outcome: GatewayOutcome) -> Self {
            Self {
                outcome: Mutex::new(Some(outcome)),
                ..Self::default()
            }
        }
    }

    impl PaymentGateway for Arc<ScriptedGateway> {
        async fn begin(&self, order: &GatewayOrder) -> GatewayOutcome {
            self.seen.lock().unwrap().push(order.clone());
            if let Some(view) = &self.end_view {
                view.end();
            }
            self.outcome
                .lock()
                .unwrap()
                .take()
                .unwrap_or(GatewayOutcome::Dismissed)
        }
    }

    struct Fixture {
        api: FakeBackend,
        cart: CartCoordinator<FakeBackend>,
        toasts: ToastQueue,
        checkout: CheckoutCoordinator<FakeBackend, Arc<ScriptedGateway>>,
        gateway: Arc<ScriptedGateway>,
        address: AddressId,
    }

    async fn fixture(gateway: ScriptedGateway, key_override: Option<&str>) -> Fixture {
        let api = FakeBackend::signed_in().await;
        let gate = BranchGate::restore(api.session().durable().clone()).await;
        gate.load_branches(&api).await.unwrap();
        let cart = CartCoordinator::new(api.clone(), gate.clone());
        cart.add_item(JuiceId::new(1), 3).await.unwrap();
        let address = api.create_address(&address_input("Home")).await.unwrap().id;
        let toasts = ToastQueue::new(std::time::Duration::from_secs(3));
        let gateway = Arc::new(gateway);
        let checkout = CheckoutCoordinator::new(
            api.clone(),
            Arc::clone(&gateway),
            gate,
            cart.clone(),
            toasts.clone(),
            key_override.map(str::to_string),
        );
        api.reset_calls();
        Fixture {
            api,
            cart,
            toasts,
            checkout,
            gateway,
            address,
        }
    }

    fn proof(signature: &str) -> PaymentProof {
        PaymentProof {
            razorpay_order_id: "order_rzp_42".to_string(),
            razorpay_payment_id: "pay_1".to_string(),
            razorpay_signature: signature.to_string(),
        }
    }

    #[tokio::test]
    async fn test_cod_clears_cart_and_navigates_to_success() {
        let f = fixture(ScriptedGateway::default(), None).await;

        let state = f
            .checkout
            .submit(PaymentMethod::Cod, Some(f.address), &ViewLifetime::new())
            .await
            .unwrap();

        assert_eq!(
            state,
            CheckoutState::CodConfirmed {
                order_id: OrderId::new(42)
            }
        );
        assert_eq!(
            state.success_view().unwrap().to_string(),
            "success=true&orderId=42&method=cod"
        );
        assert_eq!(f.cart.line_count().await, 0);
        assert_eq!(f.api.calls(), vec!["checkout"]);
    }

    #[tokio::test]
    async fn test_missing_branch_short_circuits_first() {
        let api = FakeBackend::signed_in().await;
        let gate = BranchGate::restore(api.session().durable().clone()).await;
        let cart = CartCoordinator::new(api.clone(), gate.clone());
        let checkout = CheckoutCoordinator::new(
            api.clone(),
            Arc::new(ScriptedGateway::default()),
            gate,
            cart,
            ToastQueue::new(std::time::Duration::from_secs(3)),
            None,
        );

        let err = checkout
            .submit(PaymentMethod::Cod, None, &ViewLifetime::new())
            .await
            .unwrap_err();

        assert_eq!(err.user_message(), SELECT_BRANCH_MESSAGE);
        assert!(api.calls().is_empty());
        assert_eq!(checkout.state().await, CheckoutState::Idle);
    }

    #[tokio::test]
    async fn test_missing_address_short_circuits() {
        let f = fixture(ScriptedGateway::default(), None).await;

        let err = f
            .checkout
            .submit(PaymentMethod::Online, None, &ViewLifetime::new())
            .await
            .unwrap_err();

        assert_eq!(err.user_message(), SELECT_ADDRESS_MESSAGE);
        assert!(f.api.calls().is_empty());
    }

    #[tokio::test]
    async fn test_placement_failure_uses_server_message_or_fallback() {
        let f = fixture(ScriptedGateway::default(), None).await;
        f.api.fail("checkout", 400, Some("Branch is closed"));

        let state = f
            .checkout
            .submit(PaymentMethod::Cod, Some(f.address), &ViewLifetime::new())
            .await
            .unwrap();
        assert!(matches!(state, CheckoutState::Failed { ref message, .. } if message == "Branch is closed"));
        assert!(state.success_view().is_none());

        f.api.fail("checkout", 500, None);
        f.checkout
            .submit(PaymentMethod::Cod, Some(f.address), &ViewLifetime::new())
            .await
            .unwrap();

        let toasts = f.toasts.list().await;
        assert_eq!(toasts[0].message, "Branch is closed");
        assert_eq!(toasts[1].message, PLACE_ORDER_FAILED);
        assert_eq!(f.cart.line_count().await, 1);
    }

    #[tokio::test]
    async fn test_online_success_verifies_and_clears_cart() {
        let f = fixture(
            ScriptedGateway::with(GatewayOutcome::Succeeded(proof(VALID_SIGNATURE))),
            None,
        )
        .await;

        let state = f
            .checkout
            .submit(PaymentMethod::Online, Some(f.address), &ViewLifetime::new())
            .await
            .unwrap();

        assert_eq!(
            state,
            CheckoutState::Confirmed {
                order_id: OrderId::new(42)
            }
        );
        assert_eq!(
            state.success_view().unwrap().to_string(),
            "success=true&orderId=42&method=online"
        );
        assert_eq!(
            f.api.calls(),
            vec!["checkout", "create_gateway_order", "verify_payment"]
        );
        assert_eq!(f.cart.line_count().await, 0);
    }

    #[tokio::test]
    async fn test_verification_failure_navigates_without_toast() {
        let f = fixture(
            ScriptedGateway::with(GatewayOutcome::Succeeded(proof("forged"))),
            None,
        )
        .await;

        let state = f
            .checkout
            .submit(PaymentMethod::Online, Some(f.address), &ViewLifetime::new())
            .await
            .unwrap();

        assert!(matches!(
            state,
            CheckoutState::VerificationFailed { ref message, .. }
                if message == "Payment verification failed"
        ));
        assert_eq!(state.success_view().unwrap().to_string(), "success=false");
        assert!(f.toasts.list().await.is_empty());
        assert_eq!(f.api.count("verify_payment"), 1);
        assert_eq!(f.cart.line_count().await, 1);
    }

    #[tokio::test]
    async fn test_gateway_order_failure_stays_on_checkout() {
        let f = fixture(ScriptedGateway::with(GatewayOutcome::Dismissed), None).await;
        f.api.fail("create_gateway_order", 502, None);

        let state = f
            .checkout
            .submit(PaymentMethod::Online, Some(f.address), &ViewLifetime::new())
            .await
            .unwrap();

        assert_eq!(
            state,
            CheckoutState::Failed {
                order_id: Some(OrderId::new(42)),
                message: PLACE_ORDER_FAILED.to_string(),
            }
        );
        assert!(state.success_view().is_none());
        assert!(!state.is_in_flight());
        assert!(f.gateway.seen.lock().unwrap().is_empty());
        let toasts = f.toasts.list().await;
        assert_eq!(toasts.len(), 1);
        assert_eq!(toasts[0].kind, ToastKind::Error);
        assert_eq!(toasts[0].message, PLACE_ORDER_FAILED);
        assert_eq!(f.cart.line_count().await, 1);

        f.api.heal("create_gateway_order");
        let retry = f
            .checkout
            .submit(PaymentMethod::Online, Some(f.address), &ViewLifetime::new())
            .await
            .unwrap();
        assert!(matches!(retry, CheckoutState::Cancelled { .. }));
    }

    #[tokio::test]
    async fn test_dismissal_keeps_cart_and_shows_info_toast() {
        let f = fixture(ScriptedGateway::with(GatewayOutcome::Dismissed), None).await;

        let state = f
            .checkout
            .submit(PaymentMethod::Online, Some(f.address), &ViewLifetime::new())
            .await
            .unwrap();

        assert_eq!(
            state,
            CheckoutState::Cancelled {
                order_id: OrderId::new(42)
            }
        );
        assert_eq!(f.cart.line_count().await, 1);
        let toasts = f.toasts.list().await;
        assert_eq!(toasts.len(), 1);
        assert_eq!(toasts[0].kind, ToastKind::Info);
        assert_eq!(toasts[0].message, PAYMENT_CANCELLED);
    }

    #[tokio::test]
    async fn test_gateway_failure_allows_retry() {
        let f = fixture(
            ScriptedGateway::with(GatewayOutcome::Failed("Card declined".to_string())),
            None,
        )
        .await;

        let state = f
            .checkout
            .submit(PaymentMethod::Online, Some(f.address), &ViewLifetime::new())
            .await
            .unwrap();

        assert!(matches!(state, CheckoutState::GatewayFailed { .. }));
        assert!(!state.is_in_flight());
        assert_eq!(f.toasts.list().await[0].message, "Payment failed: Card declined");
        assert_eq!(f.cart.line_count().await, 1);

        // Gateway now dismisses; the second attempt is accepted.
        let retry = f
            .checkout
            .submit(PaymentMethod::Online, Some(f.address), &ViewLifetime::new())
            .await
            .unwrap();
        assert!(matches!(retry, CheckoutState::Cancelled { .. }));
    }

    #[tokio::test]
    async fn test_gateway_key_override() {
        let f = fixture(
            ScriptedGateway::with(GatewayOutcome::Dismissed),
            Some("rzp_live_override"),
        )
        .await;

        f.checkout
            .submit(PaymentMethod::Online, Some(f.address), &ViewLifetime::new())
            .await
            .unwrap();

        let seen = f.gateway.seen.lock().unwrap().clone();
        assert_eq!(seen[0].key_id, "rzp_live_override");
        assert_eq!(seen[0].razorpay_order_id, "order_rzp_42");
    }

    #[tokio::test]
    async fn test_late_completion_after_view_ends_is_dropped() {
        let view = ViewLifetime::new();
        let gateway = ScriptedGateway {
            outcome: Mutex::new(Some(GatewayOutcome::Succeeded(proof(VALID_SIGNATURE)))),
            end_view: Some(view.clone()),
            ..ScriptedGateway::default()
        };
        let f = fixture(gateway, None).await;

        let outcome = f
            .checkout
            .submit(PaymentMethod::Online, Some(f.address), &view)
            .await
            .unwrap();

        assert!(matches!(outcome, CheckoutState::Confirmed { .. }));
        assert_eq!(f.checkout.state().await, CheckoutState::Idle);
    }

    #[tokio::test]
    async fn test_in_flight_submission_is_rejected() {
        let f = fixture(ScriptedGateway::default(), None).await;
        *f.checkout.inner.state.write().await = CheckoutState::Verifying {
            order_id: OrderId::new(1),
        };

        let err = f
            .checkout
            .submit(PaymentMethod::Cod, Some(f.address), &ViewLifetime::new())
            .await
            .unwrap_err();

        assert_eq!(err.user_message(), CHECKOUT_IN_PROGRESS);
        assert!(f.api.calls().is_empty());
    }
}
