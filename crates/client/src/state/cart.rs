//! Cart coordinator.
//!
//! The cart is server-owned. Every mutation is followed by a full refetch of
//! `GET /cart/`, and whatever that refetch returns replaces the local copy.
//! Concurrent mutations are not serialized: the last refetch to resolve wins.

use std::sync::Arc;

use peelojuice_core::{CouponCode, JuiceId};
use tokio::sync::RwLock;
use tracing::{debug, instrument, warn};

use super::branch::BranchGate;
use crate::api::StorefrontApi;
use crate::api::types::{Cart, QuantityAction};
use crate::error::{ClientError, Result};

/// Maximum length of a line's cooking instructions.
pub const MAX_INSTRUCTIONS_LENGTH: usize = 200;

/// Read-only view of the cart for rendering.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CartSnapshot {
    /// `None` when logged out or when the last fetch failed.
    pub cart: Option<Cart>,
    /// Distinct lines, not the sum of quantities.
    pub line_count: usize,
}

/// Owner of the local cart copy.
#[derive(Debug, Clone)]
pub struct CartCoordinator<A> {
    inner: Arc<CartCoordinatorInner<A>>,
}

#[derive(Debug)]
struct CartCoordinatorInner<A> {
    api: A,
    branch: BranchGate,
    cart: RwLock<Option<Cart>>,
}

impl<A: StorefrontApi> CartCoordinator<A> {
    /// Create a coordinator with no cart loaded.
    #[must_use]
    pub fn new(api: A, branch: BranchGate) -> Self {
        Self {
            inner: Arc::new(CartCoordinatorInner {
                api,
                branch,
                cart: RwLock::new(None),
            }),
        }
    }

    /// Current cart and line count.
    pub async fn snapshot(&self) -> CartSnapshot {
        let cart = self.inner.cart.read().await.clone();
        let line_count = cart.as_ref().map_or(0, Cart::line_count);
        CartSnapshot { cart, line_count }
    }

    /// Number of distinct lines.
    pub async fn line_count(&self) -> usize {
        self.inner
            .cart
            .read()
            .await
            .as_ref()
            .map_or(0, Cart::line_count)
    }

    /// Resynchronize with the server.
    ///
    /// Logged out: the cart becomes "no cart" without a request. A failed
    /// fetch also yields "no cart"; neither is reported as an error.
    #[instrument(skip(self))]
    pub async fn refresh(&self) -> CartSnapshot {
        let cart = if self.inner.api.session().is_authenticated().await {
            match self.inner.api.cart().await {
                Ok(cart) => Some(cart),
                Err(e) => {
                    warn!(error = %e, "Cart fetch failed, treating as empty");
                    None
                }
            }
        } else {
            None
        };

        let line_count = cart.as_ref().map_or(0, Cart::line_count);
        debug!(line_count, "Cart refetched");
        self.replace(cart.clone()).await;
        CartSnapshot { cart, line_count }
    }

    /// Local-only reset to an empty cart.
    pub async fn clear(&self) {
        self.replace(None).await;
    }

    async fn replace(&self, cart: Option<Cart>) {
        let line_count = cart.as_ref().map_or(0, Cart::line_count);
        *self.inner.cart.write().await = cart;
        self.inner.branch.on_cart_lines(line_count).await;
    }

    // =========================================================================
    // Mutations
    // =========================================================================

    /// Add `quantity` of a juice.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Unauthenticated` without sending anything when
    /// logged out, or the backend's rejection.
    #[instrument(skip(self), fields(juice = %juice))]
    pub async fn add_item(&self, juice: JuiceId, quantity: u32) -> Result<CartSnapshot> {
        if !self.inner.api.session().is_authenticated().await {
            return Err(ClientError::Unauthenticated);
        }
        if quantity == 0 {
            return Err(ClientError::ValidationRejected(
                "Quantity must be at least 1".to_string(),
            ));
        }

        self.inner.api.add_to_cart(juice, quantity).await?;
        Ok(self.refresh().await)
    }

    /// Step a line's quantity. Decrementing a line at 1 removes it
    /// server-side; views disable that control instead.
    ///
    /// # Errors
    ///
    /// Returns the backend's rejection verbatim.
    #[instrument(skip(self), fields(juice = %juice))]
    pub async fn update_quantity(
        &self,
        juice: JuiceId,
        action: QuantityAction,
    ) -> Result<CartSnapshot> {
        self.inner.api.update_cart_item(juice, action).await?;
        Ok(self.refresh().await)
    }

    /// Remove a line.
    ///
    /// # Errors
    ///
    /// Returns the backend's rejection verbatim.
    #[instrument(skip(self), fields(juice = %juice))]
    pub async fn remove_item(&self, juice: JuiceId) -> Result<CartSnapshot> {
        self.inner.api.remove_cart_item(juice).await?;
        Ok(self.refresh().await)
    }

    /// Apply a coupon and return the server's confirmation message.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::ValidationRejected` for an empty code (no
    /// request is sent), or the backend's rejection.
    #[instrument(skip(self))]
    pub async fn apply_coupon(&self, code: &str) -> Result<String> {
        let code =
            CouponCode::parse(code).map_err(|e| ClientError::ValidationRejected(e.to_string()))?;

        let response = self.inner.api.apply_coupon(&code).await?;
        self.refresh().await;
        Ok(response
            .message
            .unwrap_or_else(|| format!("Coupon {code} applied")))
    }

    /// Remove the applied coupon.
    ///
    /// # Errors
    ///
    /// Returns the backend's rejection.
    #[instrument(skip(self))]
    pub async fn remove_coupon(&self) -> Result<CartSnapshot> {
        self.inner.api.remove_coupon().await?;
        Ok(self.refresh().await)
    }

    /// Set a line's cooking instructions, truncated to
    /// [`MAX_INSTRUCTIONS_LENGTH`] characters.
    ///
    /// # Errors
    ///
    /// Returns the backend's rejection.
    #[instrument(skip(self, instructions), fields(juice = %juice))]
    pub async fn update_instructions(
        &self,
        juice: JuiceId,
        instructions: &str,
    ) -> Result<CartSnapshot> {
        let instructions: String = instructions
            .trim()
            .chars()
            .take(MAX_INSTRUCTIONS_LENGTH)
            .collect();
        self.inner
            .api
            .update_instructions(juice, &instructions)
            .await?;
        Ok(self.refresh().await)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use crate::state::branch::BranchState;
    use crate::state::fake::{FakeBackend, VALID_COUPON};

    async fn coordinator(api: &FakeBackend) -> (CartCoordinator<FakeBackend>, BranchGate) {
        let gate = BranchGate::restore(api.session().durable().clone()).await;
        gate.load_branches(api).await.unwrap();
        (CartCoordinator::new(api.clone(), gate.clone()), gate)
    }

    #[tokio::test]
    async fn test_add_requires_authentication_before_any_request() {
        let api = FakeBackend::new();
        let (cart, _) = coordinator(&api).await;
        api.reset_calls();

        let err = cart.add_item(JuiceId::new(1), 1).await.unwrap_err();

        assert!(matches!(err, ClientError::Unauthenticated));
        assert!(api.calls().is_empty());
    }

    #[tokio::test]
    async fn test_every_mutation_is_followed_by_refetch() {
        let api = FakeBackend::signed_in().await;
        let (cart, _) = coordinator(&api).await;
        api.reset_calls();

        cart.add_item(JuiceId::new(1), 1).await.unwrap();
        cart.update_quantity(JuiceId::new(1), QuantityAction::Increment)
            .await
            .unwrap();
        cart.remove_item(JuiceId::new(1)).await.unwrap();

        assert_eq!(
            api.calls(),
            vec![
                "add_to_cart",
                "cart",
                "update_cart_item",
                "cart",
                "remove_cart_item",
                "cart"
            ]
        );
    }

    #[tokio::test]
    async fn test_line_count_counts_distinct_lines() {
        let api = FakeBackend::signed_in().await;
        let (cart, _) = coordinator(&api).await;

        cart.add_item(JuiceId::new(1), 3).await.unwrap();
        cart.add_item(JuiceId::new(1), 2).await.unwrap();
        let snapshot = cart.add_item(JuiceId::new(2), 1).await.unwrap();

        assert_eq!(snapshot.line_count, 2);
        assert_eq!(cart.line_count().await, api.server_lines());
    }

    #[tokio::test]
    async fn test_totals_are_the_servers() {
        let api = FakeBackend::signed_in().await;
        let (cart, _) = coordinator(&api).await;

        let snapshot = cart.add_item(JuiceId::new(1), 3).await.unwrap();
        let totals = snapshot.cart.unwrap().totals;

        assert_eq!(totals.total_amount.unwrap().to_string(), "₹150");
    }

    #[tokio::test]
    async fn test_branch_locks_and_unlocks_with_cart() {
        let api = FakeBackend::signed_in().await;
        let (cart, gate) = coordinator(&api).await;

        cart.add_item(JuiceId::new(2), 1).await.unwrap();
        assert!(gate.state().await.is_locked());

        cart.update_quantity(JuiceId::new(2), QuantityAction::Decrement)
            .await
            .unwrap();
        assert!(matches!(gate.state().await, BranchState::Selected(_)));
    }

    #[tokio::test]
    async fn test_clear_is_local_and_idempotent() {
        let api = FakeBackend::signed_in().await;
        let (cart, gate) = coordinator(&api).await;
        cart.add_item(JuiceId::new(1), 1).await.unwrap();
        api.reset_calls();

        cart.clear().await;
        cart.clear().await;

        assert_eq!(cart.snapshot().await, CartSnapshot::default());
        assert!(!gate.state().await.is_locked());
        assert!(api.calls().is_empty());
        assert_eq!(api.server_lines(), 1);
    }

    #[tokio::test]
    async fn test_refresh_failure_resets_to_no_cart() {
        let api = FakeBackend::signed_in().await;
        let (cart, _) = coordinator(&api).await;
        cart.add_item(JuiceId::new(1), 1).await.unwrap();

        api.fail("cart", 500, None);
        let snapshot = cart.refresh().await;

        assert_eq!(snapshot, CartSnapshot::default());
    }

    #[tokio::test]
    async fn test_refresh_when_logged_out_sends_nothing() {
        let api = FakeBackend::new();
        let (cart, _) = coordinator(&api).await;
        api.reset_calls();

        assert_eq!(cart.refresh().await.line_count, 0);
        assert!(api.calls().is_empty());
    }

    #[tokio::test]
    async fn test_server_errors_surface_verbatim() {
        let api = FakeBackend::signed_in().await;
        let (cart, _) = coordinator(&api).await;

        let err = cart.remove_item(JuiceId::new(2)).await.unwrap_err();

        assert_eq!(err.user_message(), "Item not found in cart");
    }

    #[tokio::test]
    async fn test_blank_coupon_rejected_without_request() {
        let api = FakeBackend::signed_in().await;
        let (cart, _) = coordinator(&api).await;
        api.reset_calls();

        let err = cart.apply_coupon("   ").await.unwrap_err();

        assert!(matches!(err, ClientError::ValidationRejected(_)));
        assert_eq!(err.user_message(), "Please enter a coupon code");
        assert!(api.calls().is_empty());
    }

    #[tokio::test]
    async fn test_coupon_is_uppercased_and_applied() {
        let api = FakeBackend::signed_in().await;
        let (cart, _) = coordinator(&api).await;
        cart.add_item(JuiceId::new(1), 1).await.unwrap();

        let message = cart
            .apply_coupon(&VALID_COUPON.to_lowercase())
            .await
            .unwrap();

        assert!(message.starts_with("Coupon applied"));
        let applied = cart.snapshot().await.cart.unwrap().applied_coupon.unwrap();
        assert_eq!(applied.code, VALID_COUPON);

        cart.remove_coupon().await.unwrap();
        assert!(cart.snapshot().await.cart.unwrap().applied_coupon.is_none());
    }

    #[tokio::test]
    async fn test_instructions_are_truncated() {
        let api = FakeBackend::signed_in().await;
        let (cart, _) = coordinator(&api).await;
        cart.add_item(JuiceId::new(1), 1).await.unwrap();

        let long = "less ice ".repeat(40);
        let snapshot = cart
            .update_instructions(JuiceId::new(1), &long)
            .await
            .unwrap();

        let stored = snapshot.cart.unwrap().items[0]
            .cooking_instructions
            .clone()
            .unwrap();
        assert_eq!(stored.chars().count(), MAX_INSTRUCTIONS_LENGTH);
    }
}
