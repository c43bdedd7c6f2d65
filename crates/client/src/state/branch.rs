//! Branch selection gate.
//!
//! Exactly one branch may be selected. The selection is persisted verbatim
//! under [`BRANCH_KEY`] and restored on startup. While the cart holds at least
//! one line the selection is locked; the lock is recomputed from the cart and
//! never persisted.

use std::sync::Arc;

use peelojuice_core::{BranchId, CategoryId};
use tokio::sync::RwLock;
use tracing::{debug, info, instrument};

use crate::api::StorefrontApi;
use crate::api::types::{Branch, Juice, MenuQuery};
use crate::error::{ClientError, Result};
use crate::storage::KeyValueStore;

/// Durable storage key of the selected branch (JSON).
pub const BRANCH_KEY: &str = "selectedBranch";

/// Shown when a branch change is attempted while the cart has items.
pub const BRANCH_LOCKED_MESSAGE: &str =
    "Your cart has items from this branch. Clear your cart to switch branches.";

/// Observable state of the gate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BranchState {
    Unselected,
    Selected(Branch),
    /// Selected, and the cart is non-empty.
    Locked(Branch),
}

impl BranchState {
    /// The selected branch, locked or not.
    #[must_use]
    pub const fn branch(&self) -> Option<&Branch> {
        match self {
            Self::Unselected => None,
            Self::Selected(branch) | Self::Locked(branch) => Some(branch),
        }
    }

    #[must_use]
    pub const fn is_locked(&self) -> bool {
        matches!(self, Self::Locked(_))
    }
}

/// Result of a selection attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectOutcome {
    /// The given branch is now selected (or cleared when `None`).
    Applied(Option<Branch>),
    /// The gate is locked; nothing changed.
    Rejected { message: String },
}

/// Owner of the branch selection.
#[derive(Debug, Clone)]
pub struct BranchGate {
    inner: Arc<BranchGateInner>,
}

#[derive(Debug)]
struct BranchGateInner {
    store: KeyValueStore,
    state: RwLock<GateState>,
}

#[derive(Debug, Default)]
struct GateState {
    selected: Option<Branch>,
    cart_lines: usize,
    branches: Vec<Branch>,
}

impl GateState {
    fn view(&self) -> BranchState {
        match &self.selected {
            None => BranchState::Unselected,
            Some(branch) if self.cart_lines > 0 => BranchState::Locked(branch.clone()),
            Some(branch) => BranchState::Selected(branch.clone()),
        }
    }
}

impl BranchGate {
    /// Restore the persisted selection from `store`.
    pub async fn restore(store: KeyValueStore) -> Self {
        let selected: Option<Branch> = store.get_json(BRANCH_KEY).await;
        if let Some(branch) = &selected {
            debug!(branch_id = %branch.id, "Restored selected branch");
        }

        Self {
            inner: Arc::new(BranchGateInner {
                store,
                state: RwLock::new(GateState {
                    selected,
                    ..GateState::default()
                }),
            }),
        }
    }

    /// Current gate state.
    pub async fn state(&self) -> BranchState {
        self.inner.state.read().await.view()
    }

    /// The selected branch, if any.
    pub async fn selected(&self) -> Option<Branch> {
        self.inner.state.read().await.selected.clone()
    }

    /// Branches from the last [`Self::load_branches`].
    pub async fn branches(&self) -> Vec<Branch> {
        self.inner.state.read().await.branches.clone()
    }

    /// Fetch the branch list. When nothing is selected yet the first branch
    /// is auto-selected and persisted.
    ///
    /// # Errors
    ///
    /// Returns an error if the branch list cannot be fetched or the
    /// auto-selection cannot be persisted.
    #[instrument(skip_all)]
    pub async fn load_branches<A: StorefrontApi>(&self, api: &A) -> Result<Vec<Branch>> {
        let branches = api.branches().await?;

        let mut state = self.inner.state.write().await;
        state.branches.clone_from(&branches);
        if state.selected.is_none()
            && let Some(first) = branches.first()
        {
            self.inner.store.set_json(BRANCH_KEY, first).await?;
            info!(branch_id = %first.id, "Auto-selected first branch");
            state.selected = Some(first.clone());
        }

        Ok(branches)
    }

    /// Select `branch`. Rejected while locked unless it is already selected.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Storage` if the selection cannot be persisted.
    #[instrument(skip_all, fields(branch_id = %branch.id))]
    pub async fn select(&self, branch: Branch) -> Result<SelectOutcome> {
        let mut state = self.inner.state.write().await;
        if let Some(current) = &state.selected {
            if current.id == branch.id && state.cart_lines > 0 {
                return Ok(SelectOutcome::Applied(Some(current.clone())));
            }
            if state.cart_lines > 0 {
                debug!("Branch change rejected, cart is not empty");
                return Ok(SelectOutcome::Rejected {
                    message: BRANCH_LOCKED_MESSAGE.to_string(),
                });
            }
        }

        // Memory follows the durable store, never the other way round
        self.inner.store.set_json(BRANCH_KEY, &branch).await?;
        state.selected = Some(branch.clone());
        info!("Branch selected");
        Ok(SelectOutcome::Applied(Some(branch)))
    }

    /// Select a branch from the loaded list by id.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::ValidationRejected` if the id is not in the
    /// loaded list.
    pub async fn select_by_id(&self, id: BranchId) -> Result<SelectOutcome> {
        let branch = self
            .inner
            .state
            .read()
            .await
            .branches
            .iter()
            .find(|b| b.id == id)
            .cloned();

        match branch {
            Some(branch) => self.select(branch).await,
            None => Err(ClientError::ValidationRejected(format!(
                "Branch {id} is not available"
            ))),
        }
    }

    /// Forget the selection. Rejected while locked.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Storage` if the durable store cannot be written.
    pub async fn clear_selection(&self) -> Result<SelectOutcome> {
        let mut state = self.inner.state.write().await;
        if state.cart_lines > 0 && state.selected.is_some() {
            return Ok(SelectOutcome::Rejected {
                message: BRANCH_LOCKED_MESSAGE.to_string(),
            });
        }
        self.inner.store.remove(BRANCH_KEY).await?;
        state.selected = None;
        Ok(SelectOutcome::Applied(None))
    }

    /// Record the cart's line count, locking or unlocking the selection.
    pub async fn on_cart_lines(&self, lines: usize) {
        let mut state = self.inner.state.write().await;
        let was_locked = state.cart_lines > 0;
        state.cart_lines = lines;
        if was_locked != (lines > 0) && state.selected.is_some() {
            debug!(lines, locked = lines > 0, "Branch lock changed");
        }
    }

    /// The menu for the current selection: the branch's products when one is
    /// selected, the global catalog otherwise.
    ///
    /// # Errors
    ///
    /// Returns an error if the menu cannot be fetched.
    pub async fn menu<A: StorefrontApi>(
        &self,
        api: &A,
        category: Option<CategoryId>,
    ) -> Result<Vec<Juice>> {
        let branch = self.inner.state.read().await.selected.as_ref().map(|b| b.id);
        Ok(api.menu(MenuQuery { branch, category }).await?)
    }
}
