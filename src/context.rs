//! Application-scoped context shared across invocations.

use std::sync::Arc;

use crate::{identity::IdentityDeleter, store::AccountStore};

/// Holds the persistence and identity ports the handler drives.
#[derive(Clone)]
pub struct AppContext {
    store: Arc<dyn AccountStore>,
    identity: Arc<dyn IdentityDeleter>,
}

impl AppContext {
    /// Construct a new context from the two ports.
    pub fn new(store: Arc<dyn AccountStore>, identity: Arc<dyn IdentityDeleter>) -> Self {
        Self { store, identity }
    }

    /// Tenant and central database access.
    pub fn store(&self) -> &dyn AccountStore {
        self.store.as_ref()
    }

    /// Identity-provider deletion.
    pub fn identity(&self) -> &dyn IdentityDeleter {
        self.identity.as_ref()
    }
}
