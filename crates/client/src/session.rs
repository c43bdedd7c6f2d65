//! Session and token store.
//!
//! The access token lives in tab-scoped storage; the refresh token lives in
//! durable storage. A request is authenticated iff an access token is present.
//!
//! The session has an explicit lifecycle: [`SessionStore::new`] reads the
//! persisted values at startup, [`SessionStore::clear`] tears everything down
//! on logout or failed refresh. Nothing resets it implicitly.

use std::sync::Arc;

use secrecy::{ExposeSecret, SecretString};
use tokio::sync::{Mutex, broadcast};
use tracing::{info, instrument};

use crate::storage::{KeyValueStore, StorageError};

/// Storage keys used by the session.
pub mod keys {
    /// Tab-scoped access token.
    pub const ACCESS_TOKEN: &str = "accessToken";

    /// Durable refresh token.
    pub const REFRESH_TOKEN: &str = "refreshToken";
}

/// Capacity of the session event channel.
const EVENT_CHANNEL_CAPACITY: usize = 16;

/// Observable summary of the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Session {
    /// An access token is present (requests are authenticated).
    pub access_token_present: bool,
    /// A refresh token is present (expiry can be recovered once).
    pub refresh_token_present: bool,
}

impl Session {
    /// Whether requests will carry credentials.
    #[must_use]
    pub const fn is_authenticated(&self) -> bool {
        self.access_token_present
    }
}

/// Session lifecycle events, broadcast to the view layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEvent {
    /// Credentials were stored after login.
    SignedIn,
    /// Credentials were cleared by an explicit logout.
    SignedOut,
    /// A refresh failed and credentials were cleared; the view must navigate
    /// to the login entry point.
    LoginRequired,
}

/// Owner of the access and refresh credentials.
#[derive(Clone)]
pub struct SessionStore {
    inner: Arc<SessionStoreInner>,
}

struct SessionStoreInner {
    tab: KeyValueStore,
    durable: KeyValueStore,
    events: broadcast::Sender<SessionEvent>,
    /// Serializes teardown; exactly one concurrent clear sees the credentials.
    teardown: Mutex<()>,
}

impl std::fmt::Debug for SessionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionStore")
            .field("tab", &self.inner.tab)
            .field("durable", &self.inner.durable)
            .finish_non_exhaustive()
    }
}

impl SessionStore {
    /// Create a session over the given stores.
    #[must_use]
    pub fn new(tab: KeyValueStore, durable: KeyValueStore) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            inner: Arc::new(SessionStoreInner {
                tab,
                durable,
                events,
                teardown: Mutex::new(()),
            }),
        }
    }

    /// A session backed only by memory (both scopes). Used by tests and
    /// throwaway clients.
    #[must_use]
    pub fn ephemeral() -> Self {
        Self::new(KeyValueStore::tab(), KeyValueStore::tab())
    }

    /// The durable store, shared with other restart-durable state.
    #[must_use]
    pub fn durable(&self) -> &KeyValueStore {
        &self.inner.durable
    }

    /// Subscribe to session events.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.inner.events.subscribe()
    }

    /// Current access token, if any.
    pub async fn access_token(&self) -> Option<SecretString> {
        self.inner
            .tab
            .get(keys::ACCESS_TOKEN)
            .await
            .map(SecretString::from)
    }

    /// Current refresh token, if any.
    pub async fn refresh_token(&self) -> Option<SecretString> {
        self.inner
            .durable
            .get(keys::REFRESH_TOKEN)
            .await
            .map(SecretString::from)
    }

    /// Whether an access token is present.
    pub async fn is_authenticated(&self) -> bool {
        self.inner.tab.get(keys::ACCESS_TOKEN).await.is_some()
    }

    /// Snapshot of which credentials are present.
    pub async fn snapshot(&self) -> Session {
        Session {
            access_token_present: self.inner.tab.get(keys::ACCESS_TOKEN).await.is_some(),
            refresh_token_present: self.inner.durable.get(keys::REFRESH_TOKEN).await.is_some(),
        }
    }

    /// Store both tokens after a successful login.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the durable store cannot be written.
    #[instrument(skip_all)]
    pub async fn sign_in(
        &self,
        access: &SecretString,
        refresh: &SecretString,
    ) -> Result<(), StorageError> {
        self.inner
            .tab
            .set(keys::ACCESS_TOKEN, access.expose_secret())
            .await?;
        self.inner
            .durable
            .set(keys::REFRESH_TOKEN, refresh.expose_secret())
            .await?;
        info!("Session established");
        let _ = self.inner.events.send(SessionEvent::SignedIn);
        Ok(())
    }

    /// Replace the access token after a refresh.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the tab store cannot be written.
    pub async fn set_access_token(&self, access: &SecretString) -> Result<(), StorageError> {
        self.inner
            .tab
            .set(keys::ACCESS_TOKEN, access.expose_secret())
            .await
    }

    /// Remove both credentials. Returns whether anything was removed.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the durable store cannot be written.
    pub async fn clear(&self) -> Result<bool, StorageError> {
        let _teardown = self.inner.teardown.lock().await;
        let had_access = self.inner.tab.remove(keys::ACCESS_TOKEN).await?;
        let had_refresh = self.inner.durable.remove(keys::REFRESH_TOKEN).await?;
        Ok(had_access || had_refresh)
    }

    /// Explicit logout: clear credentials and announce it.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the durable store cannot be written.
    #[instrument(skip_all)]
    pub async fn sign_out(&self) -> Result<(), StorageError> {
        self.clear().await?;
        info!("Session cleared by logout");
        let _ = self.inner.events.send(SessionEvent::SignedOut);
        Ok(())
    }

    /// Expire the session after a failed refresh.
    ///
    /// Clears credentials and emits [`SessionEvent::LoginRequired`] only when
    /// something was actually cleared, so concurrent failures produce a single
    /// navigation to login.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the durable store cannot be written.
    #[instrument(skip_all)]
    pub async fn expire(&self) -> Result<bool, StorageError> {
        let cleared = self.clear().await?;
        if cleared {
            info!("Session expired, login required");
            let _ = self.inner.events.send(SessionEvent::LoginRequired);
        }
        Ok(cleared)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn secret(s: &str) -> SecretString {
        SecretString::from(s.to_string())
    }

    #[tokio::test]
    async fn test_sign_in_sets_both_scopes() {
        let tab = KeyValueStore::tab();
        let durable = KeyValueStore::tab();
        let session = SessionStore::new(tab.clone(), durable.clone());

        session.sign_in(&secret("a"), &secret("r")).await.unwrap();

        assert_eq!(tab.get(keys::ACCESS_TOKEN).await.as_deref(), Some("a"));
        assert_eq!(durable.get(keys::REFRESH_TOKEN).await.as_deref(), Some("r"));
        assert_eq!(
            session.snapshot().await,
            Session {
                access_token_present: true,
                refresh_token_present: true
            }
        );
    }

    #[tokio::test]
    async fn test_authenticated_iff_access_token_present() {
        let session = SessionStore::ephemeral();
        assert!(!session.is_authenticated().await);

        session
            .durable()
            .set(keys::REFRESH_TOKEN, "r")
            .await
            .unwrap();
        assert!(!session.is_authenticated().await);

        session.set_access_token(&secret("a")).await.unwrap();
        assert!(session.is_authenticated().await);
    }

    #[tokio::test]
    async fn test_expire_emits_login_required_once() {
        let session = SessionStore::ephemeral();
        let mut events = session.subscribe();
        session.sign_in(&secret("a"), &secret("r")).await.unwrap();
        assert_eq!(events.recv().await.unwrap(), SessionEvent::SignedIn);

        assert!(session.expire().await.unwrap());
        assert!(!session.expire().await.unwrap());

        assert_eq!(events.recv().await.unwrap(), SessionEvent::LoginRequired);
        assert!(events.try_recv().is_err());
        assert_eq!(session.snapshot().await, Session::default());
    }

    #[tokio::test]
    async fn test_concurrent_expiry_clears_once() {
        let session = SessionStore::ephemeral();
        session.sign_in(&secret("a"), &secret("r")).await.unwrap();
        let mut events = session.subscribe();

        let (first, second) = tokio::join!(session.expire(), session.expire());

        assert!(first.unwrap() ^ second.unwrap());
        assert_eq!(events.recv().await.unwrap(), SessionEvent::LoginRequired);
        assert!(events.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_sign_out_always_announces() {
        let session = SessionStore::ephemeral();
        let mut events = session.subscribe();
        session.sign_out().await.unwrap();
        assert_eq!(events.recv().await.unwrap(), SessionEvent::SignedOut);
    }
}
