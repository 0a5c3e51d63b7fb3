//! Persistence for waitlist entries.
//!
//! The service talks to the store through [`SubscriptionStore`] so that the
//! Postgres-backed store used in production and the in-memory store used by
//! the test suite are interchangeable.

mod memory;
mod postgres;

use std::fmt::Debug;
use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;

use crate::domain::{EmailSubscription, SubscriberEmail};
use crate::error::error_chain_fmt;

pub use memory::InMemoryStore;
pub use postgres::PostgresStore;

pub type SharedStore = Arc<dyn SubscriptionStore>;

#[async_trait]
pub trait SubscriptionStore: Send + Sync {
    async fn find_by_email(
        &self,
        email: &SubscriberEmail,
    ) -> Result<Option<EmailSubscription>, StoreError>;

    /// Must fail with [`StoreError::Duplicate`] when the email is already stored.
    async fn insert(&self, subscription: &EmailSubscription) -> Result<(), StoreError>;

    async fn count(&self) -> Result<u64, StoreError>;

    async fn status(&self) -> StoreStatus;

    async fn close(&self) {}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreStatus {
    Connected,
    Disconnected,
}

#[derive(thiserror::Error)]
pub enum StoreError {
    #[error("{0} is already on the waitlist")]
    Duplicate(String),
    #[error("The store rejected the record: {0}")]
    Rejected(String),
    #[error(transparent)]
    Unexpected(#[from] anyhow::Error),
}

impl Debug for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        error_chain_fmt(self, f)
    }
}
