//! Transient notification queue.
//!
//! Toasts are ordered oldest first, never merged or deduplicated, and never
//! persisted. Auto-dismissal is modelled by [`ToastQueue::expire`] so the
//! queue needs no timers of its own.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

/// Severity of a toast.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ToastKind {
    Success,
    Error,
    Warning,
    Info,
}

impl std::fmt::Display for ToastKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Success => write!(f, "success"),
            Self::Error => write!(f, "error"),
            Self::Warning => write!(f, "warning"),
            Self::Info => write!(f, "info"),
        }
    }
}

/// A single notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Toast {
    pub id: Uuid,
    pub message: String,
    pub kind: ToastKind,
    pub created_at: DateTime<Utc>,
}

/// Shared toast queue handle.
#[derive(Debug, Clone)]
pub struct ToastQueue {
    inner: Arc<ToastQueueInner>,
}

#[derive(Debug)]
struct ToastQueueInner {
    ttl: TimeDelta,
    toasts: RwLock<Vec<Toast>>,
}

impl ToastQueue {
    /// Create an empty queue whose toasts auto-dismiss after `ttl`.
    #[must_use]
    pub fn new(ttl: Duration) -> Self {
        Self {
            inner: Arc::new(ToastQueueInner {
                ttl: TimeDelta::from_std(ttl).unwrap_or(TimeDelta::MAX),
                toasts: RwLock::new(Vec::new()),
            }),
        }
    }

    /// Append a toast and return its id.
    pub async fn push(&self, message: impl Into<String>, kind: ToastKind) -> Uuid {
        let toast = Toast {
            id: Uuid::new_v4(),
            message: message.into(),
            kind,
            created_at: Utc::now(),
        };
        let id = toast.id;
        self.inner.toasts.write().await.push(toast);
        id
    }

    pub async fn success(&self, message: impl Into<String>) -> Uuid {
        self.push(message, ToastKind::Success).await
    }

    pub async fn error(&self, message: impl Into<String>) -> Uuid {
        self.push(message, ToastKind::Error).await
    }

    pub async fn warning(&self, message: impl Into<String>) -> Uuid {
        self.push(message, ToastKind::Warning).await
    }

    pub async fn info(&self, message: impl Into<String>) -> Uuid {
        self.push(message, ToastKind::Info).await
    }

    /// Remove the toast with `id`. Unknown ids are ignored.
    pub async fn dismiss(&self, id: Uuid) -> bool {
        let mut toasts = self.inner.toasts.write().await;
        let before = toasts.len();
        toasts.retain(|t| t.id != id);
        toasts.len() != before
    }

    /// Drop toasts older than the auto-dismiss window. Returns how many were
    /// removed.
    pub async fn expire(&self, now: DateTime<Utc>) -> usize {
        let ttl = self.inner.ttl;
        let mut toasts = self.inner.toasts.write().await;
        let before = toasts.len();
        toasts.retain(|t| now.signed_duration_since(t.created_at) < ttl);
        before - toasts.len()
    }

    /// Visible toasts, oldest first.
    pub async fn list(&self) -> Vec<Toast> {
        self.inner.toasts.read().await.clone()
    }

    /// Remove and return every toast, oldest first.
    pub async fn drain(&self) -> Vec<Toast> {
        std::mem::take(&mut *self.inner.toasts.write().await)
    }
}
