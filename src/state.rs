//! Shared client state: constructed once at startup, handed to the
//! components that read or mutate it.

use std::sync::Arc;

use tokio::sync::RwLock;

use crate::models::GlobalCopyState;
use crate::registry::AccountRegistry;

pub type SharedRegistry = Arc<RwLock<AccountRegistry>>;

/// Last known global copy state plus the error marker for a failed
/// refresh. The known-good value stays visible through failures.
#[derive(Debug, Default)]
pub struct GlobalView {
    pub copy: Option<GlobalCopyState>,
    pub error: Option<String>,
}

impl GlobalView {
    pub fn apply(&mut self, state: GlobalCopyState) {
        self.copy = Some(state);
        self.error = None;
    }

    pub fn mark_failed(&mut self, error: impl Into<String>) {
        self.error = Some(error.into());
    }
}

/// All mutable client state. Cheap to clone; clones share the stores.
#[derive(Clone, Default)]
pub struct ClientState {
    pub registry: SharedRegistry,
    pub global: Arc<RwLock<GlobalView>>,
}

impl ClientState {
    pub fn new() -> Self {
        Self::default()
    }
}
