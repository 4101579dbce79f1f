use crate::domain::entitlement::{Entitlement, bought_key, checked_key, collect_entitlements};
use crate::domain::ports::EntitlementStore;
use crate::error::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// A thread-safe in-memory entitlement cache.
///
/// Keeps the same flat key layout as the persistent store (`{id}` and
/// `{id}_WAS_CHECKED`). Contents are lost when the process exits.
#[derive(Default, Clone)]
pub struct InMemoryEntitlementStore {
    flags: Arc<RwLock<HashMap<String, bool>>>,
}

impl InMemoryEntitlementStore {
    /// Creates a new, empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }

    async fn flag(&self, key: &str) -> bool {
        let flags = self.flags.read().await;
        flags.get(key).copied().unwrap_or(false)
    }

    async fn put(&self, key: String, value: bool) {
        let mut flags = self.flags.write().await;
        flags.insert(key, value);
    }
}

#[async_trait]
impl EntitlementStore for InMemoryEntitlementStore {
    async fn is_bought(&self, product_id: &str) -> Result<bool> {
        Ok(self.flag(&bought_key(product_id)).await)
    }

    async fn was_checked(&self, product_id: &str) -> Result<bool> {
        Ok(self.flag(&checked_key(product_id)).await)
    }

    async fn set_bought(&self, product_id: &str, bought: bool) -> Result<()> {
        self.put(bought_key(product_id), bought).await;
        Ok(())
    }

    async fn set_checked(&self, product_id: &str, checked: bool) -> Result<()> {
        self.put(checked_key(product_id), checked).await;
        Ok(())
    }

    async fn all(&self) -> Result<Vec<Entitlement>> {
        let flags = self.flags.read().await;
        Ok(collect_entitlements(
            flags.iter().map(|(key, flag)| (key.as_str(), *flag)),
        ))
    }
}
