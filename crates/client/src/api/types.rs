//! Wire types for the storefront REST API.
//!
//! Field names follow the backend JSON verbatim. Money fields are [`Price`]s
//! displayed exactly as the server reports them.

use chrono::{DateTime, Utc};
use peelojuice_core::{
    AddressId, BranchId, CartLineId, CategoryId, JuiceId, LoginIdentifier, OrderId, OrderStatus,
    PaymentMethod, Price,
};
use serde::{Deserialize, Serialize};

// =============================================================================
// Shared
// =============================================================================

/// A list endpoint that may or may not be paginated.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum ListResponse<T> {
    Paginated { results: Vec<T> },
    Plain(Vec<T>),
}

impl<T> ListResponse<T> {
    /// The items regardless of envelope.
    #[must_use]
    pub fn into_vec(self) -> Vec<T> {
        match self {
            Self::Paginated { results } => results,
            Self::Plain(items) => items,
        }
    }
}

/// A mutation acknowledgement carrying an optional human-readable message.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MessageResponse {
    #[serde(default)]
    pub message: Option<String>,
}

// =============================================================================
// Catalog
// =============================================================================

/// A physical store the customer orders from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Branch {
    pub id: BranchId,
    pub name: String,
    #[serde(default)]
    pub city: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

/// A menu category.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Category {
    pub id: CategoryId,
    pub name: String,
}

/// A product on the menu.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Juice {
    pub id: JuiceId,
    pub name: String,
    pub price: Price,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default = "default_true")]
    pub is_available: bool,
    #[serde(default)]
    pub category: Option<Category>,
    #[serde(default)]
    pub net_quantity_ml: Option<u32>,
}

/// Filters for the menu listing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct MenuQuery {
    /// Branch whose menu to list; `None` lists the global catalog.
    pub branch: Option<BranchId>,
    pub category: Option<CategoryId>,
}

// =============================================================================
// Cart
// =============================================================================

/// The server-owned cart.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
pub struct Cart {
    #[serde(default)]
    pub items: Vec<CartItem>,
    #[serde(default)]
    pub applied_coupon: Option<AppliedCoupon>,
    #[serde(flatten)]
    pub totals: CartTotals,
}

impl Cart {
    /// Number of distinct lines (not the sum of quantities).
    #[must_use]
    pub fn line_count(&self) -> usize {
        self.items.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// One cart line.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CartItem {
    pub id: CartLineId,
    pub juice: JuiceId,
    pub juice_name: String,
    #[serde(default)]
    pub juice_image: Option<String>,
    pub quantity: u32,
    pub price_at_added: Price,
    #[serde(default)]
    pub subtotal: Option<Price>,
    #[serde(default)]
    pub cooking_instructions: Option<String>,
}

/// Coupon currently applied to the cart.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AppliedCoupon {
    pub code: String,
    #[serde(default)]
    pub description: Option<String>,
}

/// Server-computed totals. Every field is optional and shown verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
pub struct CartTotals {
    #[serde(default)]
    pub total_amount: Option<Price>,
    #[serde(default)]
    pub coupon_discount: Option<Price>,
    #[serde(default)]
    pub food_gst: Option<Price>,
    #[serde(default)]
    pub delivery_fee_base: Option<Price>,
    #[serde(default)]
    pub delivery_gst: Option<Price>,
    #[serde(default)]
    pub platform_fee: Option<Price>,
    #[serde(default)]
    pub grand_total: Option<Price>,
    #[serde(default)]
    pub free_delivery: bool,
    #[serde(default)]
    pub original_delivery_fee: Option<Price>,
}

/// Direction of a single-step quantity change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum QuantityAction {
    Increment,
    Decrement,
}

#[derive(Debug, Serialize)]
pub(crate) struct AddToCartRequest {
    pub juice_id: JuiceId,
    pub quantity: u32,
}

#[derive(Debug, Serialize)]
pub(crate) struct UpdateCartItemRequest {
    pub juice_id: JuiceId,
    pub action: QuantityAction,
}

#[derive(Debug, Serialize)]
pub(crate) struct JuiceRef {
    pub juice_id: JuiceId,
}

#[derive(Debug, Serialize)]
pub(crate) struct CouponRequest<'a> {
    pub code: &'a str,
}

#[derive(Debug, Serialize)]
pub(crate) struct InstructionsRequest<'a> {
    pub juice_id: JuiceId,
    pub instructions: &'a str,
}

// =============================================================================
// Addresses
// =============================================================================

/// A saved delivery address.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Address {
    pub id: AddressId,
    #[serde(default)]
    pub label: String,
    pub full_name: String,
    pub phone_number: String,
    pub address_line1: String,
    #[serde(default)]
    pub address_line2: Option<String>,
    pub city: String,
    pub state: String,
    pub pincode: String,
    #[serde(default)]
    pub landmark: Option<String>,
    #[serde(default)]
    pub is_default: bool,
}

impl Address {
    /// Single-line rendering for pickers.
    #[must_use]
    pub fn one_line(&self) -> String {
        let mut parts = vec![self.address_line1.as_str()];
        if let Some(line2) = self.address_line2.as_deref().filter(|s| !s.is_empty()) {
            parts.push(line2);
        }
        parts.push(&self.city);
        format!("{} - {}", parts.join(", "), self.pincode)
    }
}

/// Body for creating or replacing an address.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AddressInput {
    pub label: String,
    pub full_name: String,
    pub phone_number: String,
    pub address_line1: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address_line2: Option<String>,
    pub city: String,
    pub state: String,
    pub pincode: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub landmark: Option<String>,
    pub is_default: bool,
}

// =============================================================================
// Orders
// =============================================================================

#[derive(Debug, Serialize)]
pub(crate) struct CheckoutRequest {
    pub payment_method: PaymentMethod,
    pub address_id: AddressId,
    pub branch_id: BranchId,
}

/// Response to a successful order placement.
#[derive(Debug, Clone, Deserialize)]
pub struct CheckoutResponse {
    #[serde(default)]
    pub message: Option<String>,
    pub order: Order,
    #[serde(default)]
    pub payment_method: Option<PaymentMethod>,
}

/// An order as listed in the customer's history.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Order {
    pub id: OrderId,
    #[serde(default)]
    pub order_number: Option<String>,
    #[serde(default)]
    pub status: OrderStatus,
    #[serde(default)]
    pub total_amount: Option<Price>,
    /// Display label of the payment method, e.g. "Cash on Delivery".
    #[serde(default)]
    pub payment_method: Option<String>,
    #[serde(default)]
    pub payment_status: Option<String>,
    #[serde(default)]
    pub can_cancel: Option<bool>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub items: Vec<OrderItem>,
}

/// One line of a placed order.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct OrderItem {
    pub juice_name: String,
    pub quantity: u32,
    #[serde(default)]
    pub price_per_item: Option<Price>,
    #[serde(default)]
    pub subtotal: Option<Price>,
}

/// Envelope of the order history endpoint.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct OrderList {
    #[serde(default)]
    pub count: usize,
    #[serde(default)]
    pub orders: Vec<Order>,
}

// =============================================================================
// Payments
// =============================================================================

/// Handle for a hosted gateway payment.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct GatewayOrder {
    pub razorpay_order_id: String,
    /// Amount in the smallest currency unit (paise).
    pub amount: u64,
    pub currency: String,
    pub key_id: String,
}

/// Proof of payment returned by the gateway on success.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentProof {
    pub razorpay_order_id: String,
    pub razorpay_payment_id: String,
    pub razorpay_signature: String,
}

#[derive(Debug, Serialize)]
pub(crate) struct GatewayOrderRequest {
    pub order_id: OrderId,
}

// =============================================================================
// Users
// =============================================================================

/// Account profile returned at login.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct User {
    pub id: i64,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub phone_number: Option<String>,
    #[serde(default)]
    pub is_email_verified: bool,
    #[serde(default)]
    pub is_phone_verified: bool,
}

impl User {
    /// Name for greetings, falling back to the email.
    #[must_use]
    pub fn display_name(&self) -> String {
        let full = format!("{} {}", self.first_name, self.last_name);
        let full = full.trim();
        if full.is_empty() {
            self.email.clone().unwrap_or_default()
        } else {
            full.to_string()
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct LoginRequest<'a> {
    pub email_or_phone: &'a LoginIdentifier,
    pub password: &'a str,
}

/// Tokens and profile returned by a successful login.
#[derive(Deserialize)]
pub struct LoginResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub user: User,
}

impl std::fmt::Debug for LoginResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoginResponse")
            .field("access_token", &"[REDACTED]")
            .field("refresh_token", &"[REDACTED]")
            .field("user", &self.user)
            .finish()
    }
}

/// Account registration form.
#[derive(Clone, Serialize)]
pub struct Registration {
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub phone_number: String,
    pub password: String,
    pub confirm_password: String,
}

impl std::fmt::Debug for Registration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registration")
            .field("email", &self.email)
            .field("first_name", &self.first_name)
            .field("last_name", &self.last_name)
            .field("phone_number", &self.phone_number)
            .finish_non_exhaustive()
    }
}

#[derive(Serialize)]
pub(crate) struct RefreshRequest<'a> {
    pub refresh: &'a str,
}

#[derive(Deserialize)]
pub(crate) struct RefreshResponse {
    pub access: String,
}

#[derive(Serialize)]
pub(crate) struct LogoutRequest<'a> {
    pub refresh_token: &'a str,
}

const fn default_true() -> bool {
    true
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_list_response_accepts_both_envelopes() {
        let paged: ListResponse<Category> =
            serde_json::from_str(r#"{"count":1,"results":[{"id":1,"name":"Detox"}]}"#).unwrap();
        let plain: ListResponse<Category> =
            serde_json::from_str(r#"[{"id":1,"name":"Detox"}]"#).unwrap();
        assert_eq!(paged.into_vec(), plain.into_vec());
    }

    #[test]
    fn test_cart_totals_are_kept_verbatim() {
        let cart: Cart = serde_json::from_str(
            r#"{
                "id": 9,
                "items": [{
                    "id": 1, "juice": 3, "juice_name": "ABC Detox",
                    "quantity": 3, "price_at_added": "50.00"
                }],
                "total_amount": "150.00",
                "grand_total": "171.30",
                "free_delivery": false
            }"#,
        )
        .unwrap();

        assert_eq!(cart.line_count(), 1);
        assert_eq!(cart.totals.total_amount.unwrap().to_string(), "₹150.00");
        assert_eq!(cart.totals.grand_total.unwrap().to_string(), "₹171.30");
        assert!(cart.totals.coupon_discount.is_none());
    }

    #[test]
    fn test_branch_round_trips_for_persistence() {
        let branch = Branch {
            id: BranchId::new(2),
            name: "Indiranagar".to_string(),
            city: "Bengaluru".to_string(),
            address: None,
            phone: None,
            is_active: true,
        };
        let json = serde_json::to_string(&branch).unwrap();
        assert_eq!(serde_json::from_str::<Branch>(&json).unwrap(), branch);
    }

    #[test]
    fn test_quantity_action_wire_value() {
        let body = UpdateCartItemRequest {
            juice_id: JuiceId::new(4),
            action: QuantityAction::Decrement,
        };
        assert_eq!(
            serde_json::to_value(&body).unwrap(),
            serde_json::json!({"juice_id": 4, "action": "decrement"})
        );
    }

    #[test]
    fn test_address_one_line() {
        let address: Address = serde_json::from_str(
            r#"{"id":1,"label":"Home","full_name":"Asha","phone_number":"9876543210",
                "address_line1":"12 MG Road","address_line2":"","city":"Pune",
                "state":"MH","pincode":"411001","is_default":true}"#,
        )
        .unwrap();
        assert_eq!(address.one_line(), "12 MG Road, Pune - 411001");
    }

    #[test]
    fn test_login_response_debug_redacts_tokens() {
        let response: LoginResponse = serde_json::from_str(
            r#"{"access_token":"secret-a","refresh_token":"secret-r","user":{"id":1}}"#,
        )
        .unwrap();
        let debug = format!("{response:?}");
        assert!(!debug.contains("secret-a"));
        assert!(!debug.contains("secret-r"));
    }
}
