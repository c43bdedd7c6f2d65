//! HTTP adapter for the storefront REST API.
//!
//! # Architecture
//!
//! - One `reqwest` client per [`ApiClient`], shared by clones
//! - Every request carries `Authorization: Bearer <token>` when the session
//!   holds an access token, and goes out unauthenticated otherwise
//! - A 401 triggers at most one token refresh followed by at most one retry of
//!   the original request; a failed refresh clears the session and emits
//!   `SessionEvent::LoginRequired`
//! - Branch lists, categories and menus are cached in memory via `moka`
//!
//! Endpoint methods live in one submodule per API area. Coordinators talk to
//! the backend through the [`StorefrontApi`] trait so they can be exercised
//! against an in-memory fake.

mod addresses;
mod cache;
mod cart;
mod catalog;
mod orders;
mod payments;
pub mod types;
mod users;

use std::sync::Arc;

use moka::future::Cache;
use peelojuice_core::{
    AddressId, BranchId, CouponCode, JuiceId, LoginIdentifier, OrderId, PaymentMethod,
};
use reqwest::{Method, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::{Serialize, de::DeserializeOwned};
use thiserror::Error;
use tracing::{debug, error, instrument, warn};

use crate::config::ClientConfig;
use crate::session::SessionStore;
use crate::storage::StorageError;

use cache::{CacheKey, CacheValue};
use types::{
    Address, AddressInput, Branch, Cart, CheckoutResponse, GatewayOrder, Juice, LoginResponse,
    MenuQuery, MessageResponse, PaymentProof, QuantityAction, RefreshRequest, RefreshResponse,
    Registration,
};

/// Maximum number of cached catalog responses.
const CACHE_CAPACITY: u64 = 256;

/// Keys probed, in order, for a human-readable error message.
const MESSAGE_KEYS: [&str; 3] = ["message", "error", "detail"];

// =============================================================================
// Errors
// =============================================================================

/// Errors that can occur when talking to the backend.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The request never produced an HTTP response.
    #[error("HTTP error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The backend answered with a non-success status.
    #[error("HTTP {status}: {}", message.as_deref().unwrap_or("no message"))]
    Status {
        status: u16,
        message: Option<String>,
    },

    /// A body could not be encoded or decoded.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The access token was rejected and could not be refreshed.
    #[error("session expired, please log in again")]
    SessionExpired,

    /// The session store could not be updated.
    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl ApiError {
    /// HTTP status when the backend answered.
    #[must_use]
    pub const fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Server-provided message, if any.
    #[must_use]
    pub fn server_message(&self) -> Option<&str> {
        match self {
            Self::Status { message, .. } => message.as_deref(),
            _ => None,
        }
    }
}

// =============================================================================
// Request description
// =============================================================================

/// A replayable request: everything needed to issue it a second time after a
/// token refresh.
#[derive(Debug, Clone)]
pub(crate) struct ApiRequest {
    method: Method,
    path: String,
    query: Vec<(&'static str, String)>,
    body: Option<serde_json::Value>,
    /// Attach the access token when present.
    attach_token: bool,
    /// Recover from a 401 by refreshing once.
    refresh_on_401: bool,
}

impl ApiRequest {
    fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            body: None,
            attach_token: true,
            refresh_on_401: true,
        }
    }

    pub(crate) fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub(crate) fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    pub(crate) fn put(path: impl Into<String>) -> Self {
        Self::new(Method::PUT, path)
    }

    pub(crate) fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    pub(crate) fn query(mut self, key: &'static str, value: impl ToString) -> Self {
        self.query.push((key, value.to_string()));
        self
    }

    pub(crate) fn json<T: Serialize + ?Sized>(mut self, body: &T) -> Result<Self, ApiError> {
        self.body = Some(serde_json::to_value(body)?);
        Ok(self)
    }

    /// Credential-entry calls (login, register, password reset): a 401 here is
    /// a wrong password, not an expired token.
    pub(crate) const fn without_refresh(mut self) -> Self {
        self.refresh_on_401 = false;
        self
    }

    /// Sent without the access token and never refreshed.
    pub(crate) const fn anonymous(mut self) -> Self {
        self.attach_token = false;
        self.refresh_on_401 = false;
        self
    }
}

// =============================================================================
// ApiClient
// =============================================================================

/// Client for the storefront REST API.
#[derive(Clone)]
pub struct ApiClient {
    inner: Arc<ApiClientInner>,
}

struct ApiClientInner {
    client: reqwest::Client,
    base_url: String,
    session: SessionStore,
    cache: Cache<CacheKey, CacheValue>,
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("base_url", &self.inner.base_url)
            .finish_non_exhaustive()
    }
}

impl ApiClient {
    /// Create a new API client bound to `session`.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Transport` if the HTTP client cannot be built.
    pub fn new(config: &ClientConfig, session: SessionStore) -> Result<Self, ApiError> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()?;

        let cache = Cache::builder()
            .max_capacity(CACHE_CAPACITY)
            .time_to_live(config.catalog_cache_ttl)
            .build();

        Ok(Self {
            inner: Arc::new(ApiClientInner {
                client,
                base_url: config.api_root(),
                session,
                cache,
            }),
        })
    }

    /// The session this client authenticates with.
    #[must_use]
    pub fn session(&self) -> &SessionStore {
        &self.inner.session
    }

    /// Drop every cached catalog response.
    pub fn invalidate_catalog(&self) {
        self.inner.cache.invalidate_all();
    }

    // =========================================================================
    // Execution
    // =========================================================================

    /// Execute a request and decode the JSON body.
    ///
    /// On a 401 the access token is refreshed once and the request re-issued
    /// once. A second 401 is returned to the caller as `ApiError::Status`.
    #[instrument(skip(self, request), fields(method = %request.method, path = %request.path))]
    pub(crate) async fn execute<T: DeserializeOwned>(
        &self,
        request: ApiRequest,
    ) -> Result<T, ApiError> {
        let mut response = self.send(&request).await?;

        if response.status() == StatusCode::UNAUTHORIZED && request.refresh_on_401 {
            debug!("Access token rejected, attempting refresh");
            self.recover_session().await?;
            response = self.send(&request).await?;
        }

        decode(response).await
    }

    /// Execute a mutation whose body is only an acknowledgement.
    pub(crate) async fn execute_message(
        &self,
        request: ApiRequest,
    ) -> Result<MessageResponse, ApiError> {
        let message: Option<MessageResponse> = self.execute(request).await?;
        Ok(message.unwrap_or_default())
    }

    async fn send(&self, request: &ApiRequest) -> Result<reqwest::Response, ApiError> {
        let url = format!("{}{}", self.inner.base_url, request.path);
        let mut builder = self.inner.client.request(request.method.clone(), &url);

        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }

        if request.attach_token
            && let Some(token) = self.inner.session.access_token().await
        {
            builder = builder.bearer_auth(token.expose_secret());
        }

        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        Ok(builder.send().await?)
    }

    /// Refresh once; on failure tear the session down.
    async fn recover_session(&self) -> Result<(), ApiError> {
        match self.refresh_access_token().await {
            Ok(()) => Ok(()),
            Err(e) => {
                warn!(error = %e, "Token refresh failed, clearing session");
                self.inner.session.expire().await?;
                Err(ApiError::SessionExpired)
            }
        }
    }

    /// Exchange the refresh token for a new access token.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::SessionExpired` if no refresh token is stored, or
    /// the backend's error if it rejects the refresh token.
    #[instrument(skip(self))]
    pub async fn refresh_access_token(&self) -> Result<(), ApiError> {
        let Some(refresh) = self.inner.session.refresh_token().await else {
            return Err(ApiError::SessionExpired);
        };

        let request = ApiRequest::post("/users/token/refresh/")
            .anonymous()
            .json(&RefreshRequest {
                refresh: refresh.expose_secret(),
            })?;

        // Sent directly: a 401 here must not re-enter recovery
        let response: RefreshResponse = decode(self.send(&request).await?).await?;
        self.inner
            .session
            .set_access_token(&SecretString::from(response.access))
            .await?;

        debug!("Access token refreshed");
        Ok(())
    }
}

/// Decode a response, mapping non-success statuses to `ApiError::Status`.
async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, ApiError> {
    let status = response.status();
    let text = response.text().await?;

    if !status.is_success() {
        let message = extract_message(&text);
        if status.is_server_error() {
            error!(
                status = %status,
                body = %text.chars().take(500).collect::<String>(),
                "Backend returned server error"
            );
        } else {
            debug!(status = %status, message = ?message, "Backend rejected request");
        }
        return Err(ApiError::Status {
            status: status.as_u16(),
            message,
        });
    }

    let body = if text.trim().is_empty() { "null" } else { &text };
    serde_json::from_str(body).map_err(|e| {
        error!(
            error = %e,
            body = %text.chars().take(500).collect::<String>(),
            "Failed to parse backend response"
        );
        ApiError::Json(e)
    })
}

/// Pull a human-readable message out of an error body.
///
/// Looks at `message`, `error` and `detail` in that order, then at the first
/// field-level validation error (`{"field": ["msg"]}`).
fn extract_message(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    let object = value.as_object()?;

    for key in MESSAGE_KEYS {
        if let Some(message) = object.get(key).and_then(serde_json::Value::as_str) {
            return Some(message.to_string());
        }
    }

    object.iter().find_map(|(field, errors)| {
        let first = errors.as_array()?.first()?.as_str()?;
        if field == "non_field_errors" {
            Some(first.to_string())
        } else {
            Some(format!("{field}: {first}"))
        }
    })
}

// =============================================================================
// StorefrontApi
// =============================================================================

/// Backend operations the coordinators depend on.
pub trait StorefrontApi {
    /// The session whose credentials requests carry.
    fn session(&self) -> &SessionStore;

    async fn refresh_access_token(&self) -> Result<(), ApiError>;

    async fn branches(&self) -> Result<Vec<Branch>, ApiError>;
    async fn menu(&self, query: MenuQuery) -> Result<Vec<Juice>, ApiError>;

    async fn cart(&self) -> Result<Cart, ApiError>;
    async fn add_to_cart(&self, juice: JuiceId, quantity: u32)
    -> Result<MessageResponse, ApiError>;
    async fn update_cart_item(
        &self,
        juice: JuiceId,
        action: QuantityAction,
    ) -> Result<MessageResponse, ApiError>;
    async fn remove_cart_item(&self, juice: JuiceId) -> Result<MessageResponse, ApiError>;
    async fn apply_coupon(&self, code: &CouponCode) -> Result<MessageResponse, ApiError>;
    async fn remove_coupon(&self) -> Result<MessageResponse, ApiError>;
    async fn update_instructions(
        &self,
        juice: JuiceId,
        instructions: &str,
    ) -> Result<MessageResponse, ApiError>;

    async fn addresses(&self) -> Result<Vec<Address>, ApiError>;
    async fn create_address(&self, input: &AddressInput) -> Result<Address, ApiError>;
    async fn update_address(
        &self,
        id: AddressId,
        input: &AddressInput,
    ) -> Result<Address, ApiError>;
    async fn delete_address(&self, id: AddressId) -> Result<(), ApiError>;
    async fn set_default_address(&self, id: AddressId) -> Result<MessageResponse, ApiError>;

    async fn checkout(
        &self,
        method: PaymentMethod,
        address: AddressId,
        branch: BranchId,
    ) -> Result<CheckoutResponse, ApiError>;
    async fn create_gateway_order(&self, order: OrderId) -> Result<GatewayOrder, ApiError>;
    async fn verify_payment(&self, proof: &PaymentProof) -> Result<MessageResponse, ApiError>;

    async fn login(
        &self,
        identifier: &LoginIdentifier,
        password: &SecretString,
    ) -> Result<LoginResponse, ApiError>;
    async fn logout(&self, refresh: &SecretString) -> Result<MessageResponse, ApiError>;
    async fn register(&self, registration: &Registration) -> Result<MessageResponse, ApiError>;
}

impl StorefrontApi for ApiClient {
    fn session(&self) -> &SessionStore {
        Self::session(self)
    }

    async fn refresh_access_token(&self) -> Result<(), ApiError> {
        Self::refresh_access_token(self).await
    }

    async fn branches(&self) -> Result<Vec<Branch>, ApiError> {
        Self::branches(self).await
    }

    async fn menu(&self, query: MenuQuery) -> Result<Vec<Juice>, ApiError> {
        Self::menu(self, query).await
    }

    async fn cart(&self) -> Result<Cart, ApiError> {
        Self::cart(self).await
    }

    async fn add_to_cart(
        &self,
        juice: JuiceId,
        quantity: u32,
    ) -> Result<MessageResponse, ApiError> {
        Self::add_to_cart(self, juice, quantity).await
    }

    async fn update_cart_item(
        &self,
        juice: JuiceId,
        action: QuantityAction,
    ) -> Result<MessageResponse, ApiError> {
        Self::update_cart_item(self, juice, action).await
    }

    async fn remove_cart_item(&self, juice: JuiceId) -> Result<MessageResponse, ApiError> {
        Self::remove_cart_item(self, juice).await
    }

    async fn apply_coupon(&self, code: &CouponCode) -> Result<MessageResponse, ApiError> {
        Self::apply_coupon(self, code).await
    }

    async fn remove_coupon(&self) -> Result<MessageResponse, ApiError> {
        Self::remove_coupon(self).await
    }

    async fn update_instructions(
        &self,
        juice: JuiceId,
        instructions: &str,
    ) -> Result<MessageResponse, ApiError> {
        Self::update_instructions(self, juice, instructions).await
    }

    async fn addresses(&self) -> Result<Vec<Address>, ApiError> {
        Self::addresses(self).await
    }

    async fn create_address(&self, input: &AddressInput) -> Result<Address, ApiError> {
        Self::create_address(self, input).await
    }

    async fn update_address(
        &self,
        id: AddressId,
        input: &AddressInput,
    ) -> Result<Address, ApiError> {
        Self::update_address(self, id, input).await
    }

    async fn delete_address(&self, id: AddressId) -> Result<(), ApiError> {
        Self::delete_address(self, id).await
    }

    async fn set_default_address(&self, id: AddressId) -> Result<MessageResponse, ApiError> {
        Self::set_default_address(self, id).await
    }

    async fn checkout(
        &self,
        method: PaymentMethod,
        address: AddressId,
        branch: BranchId,
    ) -> Result<CheckoutResponse, ApiError> {
        Self::checkout(self, method, address, branch).await
    }

    async fn create_gateway_order(&self, order: OrderId) -> Result<GatewayOrder, ApiError> {
        Self::create_gateway_order(self, order).await
    }

    async fn verify_payment(&self, proof: &PaymentProof) -> Result<MessageResponse, ApiError> {
        Self::verify_payment(self, proof).await
    }

    async fn login(
        &self,
        identifier: &LoginIdentifier,
        password: &SecretString,
    ) -> Result<LoginResponse, ApiError> {
        Self::login(self, identifier, password).await
    }

    async fn logout(&self, refresh: &SecretString) -> Result<MessageResponse, ApiError> {
        Self::logout(self, refresh).await
    }

    async fn register(&self, registration: &Registration) -> Result<MessageResponse, ApiError> {
        Self::register(self, registration).await
    }
}
