//! Integration tests for the PeelOJuice client.
//!
//! [`TestBackend`] is a throwaway `axum` server on `127.0.0.1:0` that speaks
//! the subset of the storefront REST API the tests drive. The real `reqwest`
//! adapter talks to it over HTTP, so token refresh, error bodies and JSON
//! shapes go through the same code paths as production.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p peelojuice-integration-tests
//! ```

use std::collections::HashMap;
use std::net::SocketAddr;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use axum::extract::{Path as UrlPath, State};
use axum::http::{HeaderMap, StatusCode, header};
use axum::routing::{get, post};
use axum::{Json, Router};
use peelojuice_client::api::types::{GatewayOrder, PaymentProof};
use peelojuice_client::{ApiClient, ClientConfig, GatewayOutcome, PaymentGateway, Storefront};
use serde_json::{Value, json};

/// Password the backend accepts for every account.
pub const PASSWORD: &str = "secret-pass";

/// Signature the backend accepts as a genuine payment.
pub const VALID_SIGNATURE: &str = "sig-ok";

/// First order id handed out.
pub const FIRST_ORDER_ID: i64 = 42;

/// Default address returned by `GET /addresses/`.
pub const DEFAULT_ADDRESS_ID: i64 = 5;

type Reply = (StatusCode, Json<Value>);
type Shared = Arc<Mutex<BackendState>>;

#[derive(Debug)]
struct BackendState {
    /// The only access token the backend currently honours.
    access: Option<String>,
    /// The only refresh token the backend currently honours.
    refresh: Option<String>,
    /// Reject every access token, even freshly refreshed ones.
    refuse_access: bool,
    issued: u32,
    /// `(juice id, quantity)` per line.
    cart: Vec<(i64, u32)>,
    next_order_id: i64,
    last_checkout: Option<Value>,
    hits: HashMap<&'static str, usize>,
}

impl BackendState {
    fn hit(&mut self, route: &'static str) {
        *self.hits.entry(route).or_default() += 1;
    }

    fn issue(&mut self, kind: &str) -> String {
        self.issued += 1;
        format!("{kind}-{}", self.issued)
    }

    fn authorize(&self, headers: &HeaderMap) -> Result<(), Reply> {
        let presented = headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "));
        match (presented, self.access.as_deref()) {
            (Some(presented), Some(valid)) if presented == valid && !self.refuse_access => {
                Ok(())
            }
            _ => Err((
                StatusCode::UNAUTHORIZED,
                Json(json!({
                    "detail": "Given token not valid for any token type",
                    "code": "token_not_valid",
                })),
            )),
        }
    }

    fn cart_total(&self) -> i64 {
        self.cart
            .iter()
            .map(|(juice, quantity)| juice_price(*juice) * i64::from(*quantity))
            .sum()
    }

    fn cart_json(&self) -> Value {
        let items: Vec<Value> = self
            .cart
            .iter()
            .enumerate()
            .map(|(index, (juice, quantity))| {
                json!({
                    "id": index + 1,
                    "juice": juice,
                    "juice_name": juice_name(*juice),
                    "quantity": quantity,
                    "price_at_added": format!("{}.00", juice_price(*juice)),
                    "subtotal": format!("{}.00", juice_price(*juice) * i64::from(*quantity)),
                })
            })
            .collect();
        let total = format!("{}.00", self.cart_total());
        json!({
            "items": items,
            "applied_coupon": null,
            "total_amount": total,
            "coupon_discount": "0.00",
            "grand_total": total,
            "free_delivery": false,
        })
    }
}

fn juice_name(id: i64) -> &'static str {
    match id {
        1 => "ABC Detox",
        _ => "Watermelon Cooler",
    }
}

fn juice_price(id: i64) -> i64 {
    match id {
        1 => 50,
        _ => 80,
    }
}

fn message(status: StatusCode, text: &str) -> Reply {
    (status, Json(json!({ "message": text })))
}

fn lock(state: &Shared) -> MutexGuard<'_, BackendState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

// =============================================================================
// Handlers
// =============================================================================

async fn login(State(state): State<Shared>, Json(body): Json<Value>) -> Reply {
    let mut state = lock(&state);
    state.hit("login");
    if body["password"] != PASSWORD {
        return (
            StatusCode::UNAUTHORIZED,
            Json(json!({ "error": "Invalid credentials" })),
        );
    }

    let access = state.issue("access");
    let refresh = state.issue("refresh");
    state.access = Some(access.clone());
    state.refresh = Some(refresh.clone());
    (
        StatusCode::OK,
        Json(json!({
            "access_token": access,
            "refresh_token": refresh,
            "user": {
                "id": 7,
                "email": body["email_or_phone"],
                "first_name": "Asha",
                "last_name": "Rao",
                "is_email_verified": true,
                "is_phone_verified": false,
            },
        })),
    )
}

async fn refresh(State(state): State<Shared>, Json(body): Json<Value>) -> Reply {
    let mut state = lock(&state);
    state.hit("refresh");
    let valid = state
        .refresh
        .as_deref()
        .is_some_and(|valid| body["refresh"] == valid);
    if !valid {
        return (
            StatusCode::UNAUTHORIZED,
            Json(json!({
                "detail": "Token is invalid or expired",
                "code": "token_not_valid",
            })),
        );
    }

    let access = state.issue("access");
    state.access = Some(access.clone());
    (StatusCode::OK, Json(json!({ "access": access })))
}

async fn logout(State(state): State<Shared>) -> Reply {
    let mut state = lock(&state);
    state.hit("logout");
    state.refresh = None;
    message(StatusCode::OK, "Logout successful")
}

async fn branches(State(state): State<Shared>) -> Reply {
    lock(&state).hit("branches");
    (
        StatusCode::OK,
        Json(json!([
            { "id": 1, "name": "Koramangala", "city": "Bengaluru", "is_active": true },
            { "id": 2, "name": "Indiranagar", "city": "Bengaluru", "is_active": true },
        ])),
    )
}

async fn branch_menu(State(state): State<Shared>, UrlPath(branch): UrlPath<i64>) -> Reply {
    lock(&state).hit("branch_menu");
    let juices: Vec<Value> = [1, 2]
        .into_iter()
        .map(|id| {
            json!({
                "id": id,
                "name": juice_name(id),
                "price": format!("{}.00", juice_price(id)),
                "is_available": true,
                "branch": branch,
            })
        })
        .collect();
    (StatusCode::OK, Json(Value::Array(juices)))
}

async fn cart(State(state): State<Shared>, headers: HeaderMap) -> Reply {
    let mut state = lock(&state);
    state.hit("cart");
    if let Err(reply) = state.authorize(&headers) {
        return reply;
    }
    (StatusCode::OK, Json(state.cart_json()))
}

async fn add_to_cart(
    State(state): State<Shared>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Reply {
    let mut state = lock(&state);
    state.hit("add_to_cart");
    if let Err(reply) = state.authorize(&headers) {
        return reply;
    }

    let (Some(juice), Some(quantity)) = (body["juice_id"].as_i64(), body["quantity"].as_u64())
    else {
        return message(StatusCode::BAD_REQUEST, "juice_id and quantity are required");
    };
    let quantity = u32::try_from(quantity).unwrap_or(u32::MAX);
    match state.cart.iter_mut().find(|(id, _)| *id == juice) {
        Some(line) => line.1 += quantity,
        None => state.cart.push((juice, quantity)),
    }
    message(StatusCode::OK, "Item added to cart")
}

async fn addresses(State(state): State<Shared>, headers: HeaderMap) -> Reply {
    let mut state = lock(&state);
    state.hit("addresses");
    if let Err(reply) = state.authorize(&headers) {
        return reply;
    }
    (
        StatusCode::OK,
        Json(json!([{
            "id": DEFAULT_ADDRESS_ID,
            "label": "Home",
            "full_name": "Asha Rao",
            "phone_number": "9876543210",
            "address_line1": "12 MG Road",
            "city": "Bengaluru",
            "state": "Karnataka",
            "pincode": "560001",
            "is_default": true,
        }])),
    )
}

async fn checkout(
    State(state): State<Shared>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Reply {
    let mut state = lock(&state);
    state.hit("checkout");
    if let Err(reply) = state.authorize(&headers) {
        return reply;
    }
    if state.cart.is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "Cart is empty" })),
        );
    }

    let id = state.next_order_id;
    state.next_order_id += 1;
    let total = format!("{}.00", state.cart_total());
    let method = body["payment_method"].clone();
    if method == "cod" {
        state.cart.clear();
    }
    state.last_checkout = Some(body);
    (
        StatusCode::CREATED,
        Json(json!({
            "message": "Order placed successfully",
            "order": {
                "id": id,
                "order_number": format!("PJ{id:06}"),
                "status": "pending",
                "total_amount": total,
            },
            "payment_method": method,
        })),
    )
}

async fn create_gateway_order(
    State(state): State<Shared>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Reply {
    let mut state = lock(&state);
    state.hit("create_gateway_order");
    if let Err(reply) = state.authorize(&headers) {
        return reply;
    }
    (
        StatusCode::OK,
        Json(json!({
            "razorpay_order_id": format!("order_rzp_{}", body["order_id"]),
            "amount": state.cart_total() * 100,
            "currency": "INR",
            "key_id": "rzp_test_backend",
        })),
    )
}

async fn verify_payment(
    State(state): State<Shared>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Reply {
    let mut state = lock(&state);
    state.hit("verify_payment");
    if let Err(reply) = state.authorize(&headers) {
        return reply;
    }
    if body["razorpay_signature"] != VALID_SIGNATURE {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "Payment verification failed" })),
        );
    }
    state.cart.clear();
    message(StatusCode::OK, "Payment verified successfully")
}

// =============================================================================
// Backend handle
// =============================================================================

/// A running fake backend. The server task lives until the test's runtime
/// shuts down.
#[derive(Debug, Clone)]
pub struct TestBackend {
    addr: SocketAddr,
    state: Shared,
}

impl TestBackend {
    /// Bind to an ephemeral port and start serving.
    ///
    /// # Panics
    ///
    /// Panics if no local port can be bound.
    pub async fn start() -> Self {
        let state: Shared = Arc::new(Mutex::new(BackendState {
            access: None,
            refresh: None,
            refuse_access: false,
            issued: 0,
            cart: Vec::new(),
            next_order_id: FIRST_ORDER_ID,
            last_checkout: None,
            hits: HashMap::new(),
        }));

        let app = Router::new()
            .route("/api/users/login/", post(login))
            .route("/api/users/token/refresh/", post(refresh))
            .route("/api/users/logout/", post(logout))
            .route("/api/products/branches/", get(branches))
            .route("/api/products/branches/{id}/products/", get(branch_menu))
            .route("/api/cart/", get(cart))
            .route("/api/cart/add/", post(add_to_cart))
            .route("/api/addresses/", get(addresses))
            .route("/api/orders/checkout/", post(checkout))
            .route(
                "/api/payments/razorpay/create-order/",
                post(create_gateway_order),
            )
            .route("/api/payments/razorpay/verify/", post(verify_payment))
            .with_state(Arc::clone(&state));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind listener");
        let addr = listener.local_addr().expect("local addr");
        tokio::spawn(async move { axum::serve(listener, app).await.expect("serve backend") });

        Self { addr, state }
    }

    /// Origin to configure the client with.
    #[must_use]
    pub fn origin(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Reject every access token issued so far. Refresh still works.
    pub fn expire_access_tokens(&self) {
        lock(&self.state).access = None;
    }

    /// Keep issuing access tokens on refresh but reject all of them.
    pub fn refuse_access_tokens(&self) {
        lock(&self.state).refuse_access = true;
    }

    /// Reject every refresh token issued so far.
    pub fn revoke_refresh_tokens(&self) {
        lock(&self.state).refresh = None;
    }

    /// Requests received on `route` since the last reset.
    #[must_use]
    pub fn hits(&self, route: &str) -> usize {
        lock(&self.state).hits.get(route).copied().unwrap_or(0)
    }

    pub fn reset_hits(&self) {
        lock(&self.state).hits.clear();
    }

    /// Body of the last checkout request.
    #[must_use]
    pub fn last_checkout(&self) -> Option<Value> {
        lock(&self.state).last_checkout.clone()
    }

    /// Lines in the server-side cart.
    #[must_use]
    pub fn cart_lines(&self) -> usize {
        lock(&self.state).cart.len()
    }
}

// =============================================================================
// Client helpers
// =============================================================================

/// Payment overlay with a fixed response.
#[derive(Debug, Clone)]
pub enum Overlay {
    /// Pay and hand back a proof carrying `signature`.
    Pay { signature: String },
    Decline(String),
    Close,
}

impl PaymentGateway for Overlay {
    async fn begin(&self, order: &GatewayOrder) -> GatewayOutcome {
        match self {
            Self::Pay { signature } => GatewayOutcome::Succeeded(PaymentProof {
                razorpay_order_id: order.razorpay_order_id.clone(),
                razorpay_payment_id: "pay_test_1".to_string(),
                razorpay_signature: signature.clone(),
            }),
            Self::Decline(reason) => GatewayOutcome::Failed(reason.clone()),
            Self::Close => GatewayOutcome::Dismissed,
        }
    }
}

/// A storefront pointed at `backend`, keeping durable state in `state_dir`.
///
/// # Panics
///
/// Panics if the client cannot be configured.
pub async fn storefront<G: PaymentGateway>(
    backend: &TestBackend,
    state_dir: &Path,
    gateway: G,
) -> Storefront<ApiClient, G> {
    let config = ClientConfig::for_api_url(&backend.origin(), state_dir).expect("client config");
    Storefront::bootstrap(&config, gateway)
        .await
        .expect("bootstrap storefront")
}
