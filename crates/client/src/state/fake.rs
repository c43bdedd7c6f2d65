//! In-memory backend used by coordinator tests.

#![allow(clippy::unwrap_used, clippy::indexing_slicing)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use peelojuice_core::{
    AddressId, BranchId, CartLineId, CouponCode, JuiceId, LoginIdentifier, OrderId, OrderStatus,
    PaymentMethod, Price,
};
use rust_decimal::Decimal;
use secrecy::{ExposeSecret, SecretString};

use crate::api::types::{
    Address, AddressInput, AppliedCoupon, Branch, Cart, CartItem, CartTotals, CheckoutResponse,
    GatewayOrder, Juice, LoginResponse, MenuQuery, MessageResponse, Order, PaymentProof,
    QuantityAction, Registration, User,
};
use crate::api::{ApiError, StorefrontApi};
use crate::session::SessionStore;

pub const VALID_PASSWORD: &str = "secret-pass";
pub const VALID_COUPON: &str = "FRESH10";
pub const VALID_SIGNATURE: &str = "sig-ok";

#[derive(Clone)]
pub struct FakeBackend {
    inner: Arc<FakeInner>,
}

struct FakeInner {
    session: SessionStore,
    state: Mutex<FakeState>,
}

struct FakeState {
    branches: Vec<Branch>,
    menu: Vec<Juice>,
    cart: Vec<CartItem>,
    coupon: Option<String>,
    addresses: Vec<Address>,
    next_line_id: i64,
    next_address_id: i64,
    next_order_id: i64,
    calls: Vec<&'static str>,
    failures: HashMap<&'static str, (u16, Option<String>)>,
}

pub fn branch(id: i64, name: &str) -> Branch {
    Branch {
        id: BranchId::new(id),
        name: name.to_string(),
        city: "Bengaluru".to_string(),
        address: None,
        phone: None,
        is_active: true,
    }
}

fn juice(id: i64, name: &str, price: i64) -> Juice {
    Juice {
        id: JuiceId::new(id),
        name: name.to_string(),
        price: Price::new(Decimal::new(price, 0)),
        description: None,
        image: None,
        is_available: true,
        category: None,
        net_quantity_ml: Some(300),
    }
}

pub fn address_input(label: &str) -> AddressInput {
    AddressInput {
        label: label.to_string(),
        full_name: "Asha Rao".to_string(),
        phone_number: "9876543210".to_string(),
        address_line1: "12 MG Road".to_string(),
        address_line2: None,
        city: "Bengaluru".to_string(),
        state: "Karnataka".to_string(),
        pincode: "560001".to_string(),
        landmark: None,
        is_default: false,
    }
}

impl FakeBackend {
    /// Two branches, two juices, empty cart, no addresses, logged out.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(FakeInner {
                session: SessionStore::ephemeral(),
                state: Mutex::new(FakeState {
                    branches: vec![branch(1, "Koramangala"), branch(2, "Indiranagar")],
                    menu: vec![juice(1, "ABC Detox", 50), juice(2, "Watermelon Cooler", 80)],
                    cart: Vec::new(),
                    coupon: None,
                    addresses: Vec::new(),
                    next_line_id: 1,
                    next_address_id: 1,
                    next_order_id: 42,
                    calls: Vec::new(),
                    failures: HashMap::new(),
                }),
            }),
        }
    }

    /// Same as [`Self::new`] with credentials already stored.
    pub async fn signed_in() -> Self {
        let backend = Self::new();
        backend
            .inner
            .session
            .sign_in(
                &SecretString::from("access-0".to_string()),
                &SecretString::from("refresh-0".to_string()),
            )
            .await
            .unwrap();
        backend
    }

    /// Every call received so far, in order.
    pub fn calls(&self) -> Vec<&'static str> {
        self.state().calls.clone()
    }

    pub fn count(&self, name: &str) -> usize {
        self.state().calls.iter().filter(|c| **c == name).count()
    }

    pub fn reset_calls(&self) {
        self.state().calls.clear();
    }

    /// Make every subsequent call to `name` fail with `status`.
    pub fn fail(&self, name: &'static str, status: u16, message: Option<&str>) {
        self.state()
            .failures
            .insert(name, (status, message.map(str::to_string)));
    }

    pub fn heal(&self, name: &'static str) {
        self.state().failures.remove(name);
    }

    pub fn set_branches(&self, branches: Vec<Branch>) {
        self.state().branches = branches;
    }

    /// Server-side line count, bypassing the client.
    pub fn server_lines(&self) -> usize {
        self.state().cart.len()
    }

    fn state(&self) -> MutexGuard<'_, FakeState> {
        self.inner.state.lock().unwrap()
    }

    fn begin(&self, name: &'static str) -> Result<MutexGuard<'_, FakeState>, ApiError> {
        let mut state = self.state();
        state.calls.push(name);
        if let Some((status, message)) = state.failures.get(name).cloned() {
            return Err(ApiError::Status { status, message });
        }
        Ok(state)
    }

    async fn begin_authed(
        &self,
        name: &'static str,
    ) -> Result<MutexGuard<'_, FakeState>, ApiError> {
        let authenticated = self.inner.session.is_authenticated().await;
        let state = self.begin(name)?;
        if !authenticated {
            return Err(rejected(
                401,
                "Authentication credentials were not provided.",
            ));
        }
        Ok(state)
    }
}

fn rejected(status: u16, message: &str) -> ApiError {
    ApiError::Status {
        status,
        message: Some(message.to_string()),
    }
}

fn ok(message: &str) -> MessageResponse {
    MessageResponse {
        message: Some(message.to_string()),
    }
}

fn cart_of(state: &FakeState) -> Cart {
    let total: Decimal = state
        .cart
        .iter()
        .map(|item| item.price_at_added.amount() * Decimal::from(item.quantity))
        .sum();
    Cart {
        items: state.cart.clone(),
        applied_coupon: state.coupon.clone().map(|code| AppliedCoupon {
            code,
            description: None,
        }),
        totals: CartTotals {
            total_amount: Some(Price::new(total)),
            grand_total: Some(Price::new(total)),
            ..CartTotals::default()
        },
    }
}

fn address_from(id: AddressId, input: &AddressInput, is_default: bool) -> Address {
    Address {
        id,
        label: input.label.clone(),
        full_name: input.full_name.clone(),
        phone_number: input.phone_number.clone(),
        address_line1: input.address_line1.clone(),
        address_line2: input.address_line2.clone(),
        city: input.city.clone(),
        state: input.state.clone(),
        pincode: input.pincode.clone(),
        landmark: input.landmark.clone(),
        is_default,
    }
}

impl StorefrontApi for FakeBackend {
    fn session(&self) -> &SessionStore {
        &self.inner.session
    }

    async fn refresh_access_token(&self) -> Result<(), ApiError> {
        let refresh = self.inner.session.refresh_token().await;
        drop(self.begin("refresh")?);
        let Some(refresh) = refresh else {
            return Err(ApiError::SessionExpired);
        };
        let access = format!("access-for-{}", refresh.expose_secret());
        self.inner
            .session
            .set_access_token(&SecretString::from(access))
            .await?;
        Ok(())
    }

    async fn branches(&self) -> Result<Vec<Branch>, ApiError> {
        Ok(self.begin("branches")?.branches.clone())
    }

    async fn menu(&self, query: MenuQuery) -> Result<Vec<Juice>, ApiError> {
        let name = if query.branch.is_some() {
            "branch_menu"
        } else {
            "menu"
        };
        Ok(self.begin(name)?.menu.clone())
    }

    async fn cart(&self) -> Result<Cart, ApiError> {
        let state = self.begin_authed("cart").await?;
        Ok(cart_of(&state))
    }

    async fn add_to_cart(
        &self,
        juice: JuiceId,
        quantity: u32,
    ) -> Result<MessageResponse, ApiError> {
        let mut state = self.begin_authed("add_to_cart").await?;
        let Some(product) = state.menu.iter().find(|j| j.id == juice).cloned() else {
            return Err(rejected(404, "Juice not found"));
        };
        if let Some(line) = state.cart.iter_mut().find(|l| l.juice == juice) {
            line.quantity += quantity;
        } else {
            let id = CartLineId::new(state.next_line_id);
            state.next_line_id += 1;
            state.cart.push(CartItem {
                id,
                juice,
                juice_name: product.name,
                juice_image: None,
                quantity,
                price_at_added: product.price,
                subtotal: None,
                cooking_instructions: None,
            });
        }
        Ok(ok("Item added to cart"))
    }

    async fn update_cart_item(
        &self,
        juice: JuiceId,
        action: QuantityAction,
    ) -> Result<MessageResponse, ApiError> {
        let mut state = self.begin_authed("update_cart_item").await?;
        let Some(index) = state.cart.iter().position(|l| l.juice == juice) else {
            return Err(rejected(404, "Item not in cart"));
        };
        let quantity = state.cart[index].quantity;
        match action {
            QuantityAction::Increment => state.cart[index].quantity = quantity + 1,
            QuantityAction::Decrement if quantity > 1 => state.cart[index].quantity = quantity - 1,
            QuantityAction::Decrement => {
                state.cart.remove(index);
                return Ok(ok("Item removed from cart"));
            }
        }
        Ok(ok("Cart updated successfully"))
    }

    async fn remove_cart_item(&self, juice: JuiceId) -> Result<MessageResponse, ApiError> {
        let mut state = self.begin_authed("remove_cart_item").await?;
        let before = state.cart.len();
        state.cart.retain(|l| l.juice != juice);
        if state.cart.len() == before {
            return Err(rejected(404, "Item not found in cart"));
        }
        Ok(ok("Item removed successfully"))
    }

    async fn apply_coupon(&self, code: &CouponCode) -> Result<MessageResponse, ApiError> {
        let mut state = self.begin_authed("apply_coupon").await?;
        if code.as_str() != VALID_COUPON {
            return Err(ApiError::Status {
                status: 404,
                message: Some("Invalid coupon code".to_string()),
            });
        }
        state.coupon = Some(code.as_str().to_string());
        Ok(ok("Coupon applied! You saved ₹5.00"))
    }

    async fn remove_coupon(&self) -> Result<MessageResponse, ApiError> {
        let mut state = self.begin_authed("remove_coupon").await?;
        if state.coupon.take().is_none() {
            return Err(rejected(400, "No coupon applied"));
        }
        Ok(ok("Coupon removed successfully"))
    }

    async fn update_instructions(
        &self,
        juice: JuiceId,
        instructions: &str,
    ) -> Result<MessageResponse, ApiError> {
        let mut state = self.begin_authed("update_instructions").await?;
        let Some(line) = state.cart.iter_mut().find(|l| l.juice == juice) else {
            return Err(rejected(404, "Item not in cart"));
        };
        line.cooking_instructions = Some(instructions.to_string());
        Ok(ok("Instructions updated"))
    }

    async fn addresses(&self) -> Result<Vec<Address>, ApiError> {
        Ok(self.begin_authed("addresses").await?.addresses.clone())
    }

    async fn create_address(&self, input: &AddressInput) -> Result<Address, ApiError> {
        let mut state = self.begin_authed("create_address").await?;
        let id = AddressId::new(state.next_address_id);
        state.next_address_id += 1;
        let is_default = input.is_default || state.addresses.is_empty();
        if is_default {
            for existing in &mut state.addresses {
                existing.is_default = false;
            }
        }
        let address = address_from(id, input, is_default);
        state.addresses.push(address.clone());
        Ok(address)
    }

    async fn update_address(
        &self,
        id: AddressId,
        input: &AddressInput,
    ) -> Result<Address, ApiError> {
        let mut state = self.begin_authed("update_address").await?;
        let Some(existing) = state.addresses.iter_mut().find(|a| a.id == id) else {
            return Err(rejected(404, "Not found."));
        };
        *existing = address_from(id, input, existing.is_default);
        Ok(existing.clone())
    }

    async fn delete_address(&self, id: AddressId) -> Result<(), ApiError> {
        let mut state = self.begin_authed("delete_address").await?;
        state.addresses.retain(|a| a.id != id);
        Ok(())
    }

    async fn set_default_address(&self, id: AddressId) -> Result<MessageResponse, ApiError> {
        let mut state = self.begin_authed("set_default_address").await?;
        if !state.addresses.iter().any(|a| a.id == id) {
            return Err(rejected(404, "Not found."));
        }
        for address in &mut state.addresses {
            address.is_default = address.id == id;
        }
        Ok(ok("Default address updated"))
    }

    async fn checkout(
        &self,
        method: PaymentMethod,
        address: AddressId,
        _branch: BranchId,
    ) -> Result<CheckoutResponse, ApiError> {
        let mut state = self.begin_authed("checkout").await?;
        if state.cart.is_empty() {
            return Err(rejected(400, "Cart is empty"));
        }
        if !state.addresses.iter().any(|a| a.id == address) {
            return Err(ApiError::Status {
                status: 404,
                message: Some("Address not found".to_string()),
            });
        }
        let id = OrderId::new(state.next_order_id);
        state.next_order_id += 1;
        let total = cart_of(&state).totals.grand_total;
        if method == PaymentMethod::Cod {
            state.cart.clear();
        }
        Ok(CheckoutResponse {
            message: Some("Order placed successfully".to_string()),
            order: Order {
                id,
                order_number: Some(format!("PJ{:06}", id.as_i64())),
                status: OrderStatus::Pending,
                total_amount: total,
                payment_method: None,
                payment_status: None,
                can_cancel: Some(true),
                created_at: None,
                items: Vec::new(),
            },
            payment_method: Some(method),
        })
    }

    async fn create_gateway_order(&self, order: OrderId) -> Result<GatewayOrder, ApiError> {
        drop(self.begin_authed("create_gateway_order").await?);
        Ok(GatewayOrder {
            razorpay_order_id: format!("order_rzp_{order}"),
            amount: 15_000,
            currency: "INR".to_string(),
            key_id: "rzp_test_backend".to_string(),
        })
    }

    async fn verify_payment(&self, proof: &PaymentProof) -> Result<MessageResponse, ApiError> {
        let mut state = self.begin_authed("verify_payment").await?;
        if proof.razorpay_signature != VALID_SIGNATURE {
            return Err(rejected(400, "Payment verification failed"));
        }
        state.cart.clear();
        Ok(ok("Payment verified successfully"))
    }

    async fn login(
        &self,
        identifier: &LoginIdentifier,
        password: &SecretString,
    ) -> Result<LoginResponse, ApiError> {
        drop(self.begin("login")?);
        if password.expose_secret() != VALID_PASSWORD {
            return Err(ApiError::Status {
                status: 401,
                message: Some("Invalid credentials".to_string()),
            });
        }
        Ok(LoginResponse {
            access_token: "access-1".to_string(),
            refresh_token: "refresh-1".to_string(),
            user: User {
                id: 7,
                email: Some(identifier.to_string()),
                first_name: "Asha".to_string(),
                last_name: "Rao".to_string(),
                phone_number: None,
                is_email_verified: true,
                is_phone_verified: false,
            },
        })
    }

    async fn logout(&self, _refresh: &SecretString) -> Result<MessageResponse, ApiError> {
        drop(self.begin("logout")?);
        Ok(ok("Logout successful"))
    }

    async fn register(&self, registration: &Registration) -> Result<MessageResponse, ApiError> {
        drop(self.begin("register")?);
        if registration.email.is_empty() {
            return Err(rejected(400, "email: This field may not be blank."));
        }
        Ok(ok("Registration successful. Please verify your email."))
    }
}
