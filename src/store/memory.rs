use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::domain::{EmailSubscription, SubscriberEmail};
use crate::store::{StoreError, StoreStatus, SubscriptionStore};

/// Keeps subscriptions in a map keyed by normalized email.
pub struct InMemoryStore {
    subscriptions: RwLock<HashMap<String, EmailSubscription>>,
    connected: AtomicBool,
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self {
            subscriptions: RwLock::new(HashMap::new()),
            connected: AtomicBool::new(true),
        }
    }
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulates losing the connection: every operation fails until
    /// [`InMemoryStore::reconnect`] is called.
    pub fn disconnect(&self) {
        self.connected.store(false, Ordering::SeqCst);
    }

    pub fn reconnect(&self) {
        self.connected.store(true, Ordering::SeqCst);
    }

    fn ensure_connected(&self) -> Result<(), StoreError> {
        if self.connected.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(anyhow::anyhow!("The in-memory store is disconnected").into())
        }
    }
}

#[async_trait]
impl SubscriptionStore for InMemoryStore {
    #[tracing::instrument(name = "Looking up an email in memory", skip(self, email))]
    async fn find_by_email(
        &self,
        email: &SubscriberEmail,
    ) -> Result<Option<EmailSubscription>, StoreError> {
        self.ensure_connected()?;

        Ok(self.subscriptions.read().await.get(email.as_ref()).cloned())
    }

    #[tracing::instrument(name = "Saving an email in memory", skip(self, subscription))]
    async fn insert(&self, subscription: &EmailSubscription) -> Result<(), StoreError> {
        self.ensure_connected()?;

        match self
            .subscriptions
            .write()
            .await
            .entry(subscription.email.as_ref().to_string())
        {
            Entry::Occupied(entry) => Err(StoreError::Duplicate(entry.key().clone())),
            Entry::Vacant(entry) => {
                entry.insert(subscription.clone());
                Ok(())
            }
        }
    }

    async fn count(&self) -> Result<u64, StoreError> {
        self.ensure_connected()?;

        Ok(self.subscriptions.read().await.len() as u64)
    }

    async fn status(&self) -> StoreStatus {
        match self.connected.load(Ordering::SeqCst) {
            true => StoreStatus::Connected,
            false => StoreStatus::Disconnected,
        }
    }
}
