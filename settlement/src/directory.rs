//! Issuer/cashier display-name resolution
//!
//! Receipts and settlement fragments store user IDs; listings show
//! display names. The directory is the seam between the two, backed by
//! whatever user store the deployment has.

use parking_lot::RwLock;
use std::collections::HashMap;

/// Resolve user IDs to display names
pub trait UserDirectory: Send + Sync {
    /// Display name for a user, or `None` when the ID is unknown
    fn display_name(&self, user_id: &str) -> Option<String>;

    /// Whether the user exists
    fn exists(&self, user_id: &str) -> bool {
        self.display_name(user_id).is_some()
    }
}

/// In-memory user registry
#[derive(Default)]
pub struct InMemoryUserDirectory {
    names: RwLock<HashMap<String, String>>,
}

impl InMemoryUserDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register or replace a user's display name
    pub fn register(&self, user_id: impl Into<String>, name: impl Into<String>) {
        self.names.write().insert(user_id.into(), name.into());
    }
}

impl UserDirectory for InMemoryUserDirectory {
    fn display_name(&self, user_id: &str) -> Option<String> {
        self.names.read().get(user_id).cloned()
    }
}
