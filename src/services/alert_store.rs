use async_trait::async_trait;

use crate::{
    error::StoreError,
    models::{Alert, OwnerId},
};

#[derive(Debug, Clone, PartialEq)]
pub enum AddOutcome {
    Added(Alert),
    AlreadyExists,
}

/// Canonical storage of alerts, keyed by (owner, symbol).
///
/// Implementations must reject a second alert for the same pair at the
/// storage layer itself. Counts returned by mutations are the number of
/// rows affected; zero is a normal answer, not an error.
#[async_trait]
pub trait AlertStore: Send + Sync {
    async fn add(&self, owner: OwnerId, symbol: &str, target_price: f64) -> Result<AddOutcome, StoreError>;

    async fn exists(&self, owner: OwnerId, symbol: &str) -> Result<bool, StoreError>;

    async fn update_price(&self, owner: OwnerId, symbol: &str, target_price: f64) -> Result<u64, StoreError>;

    async fn remove_by_symbol(&self, owner: OwnerId, symbol: &str) -> Result<u64, StoreError>;

    async fn clear_all(&self, owner: OwnerId) -> Result<u64, StoreError>;

    /// Ordered by symbol.
    async fn list_for_owner(&self, owner: OwnerId) -> Result<Vec<Alert>, StoreError>;

    async fn list_all(&self) -> Result<Vec<Alert>, StoreError>;

    async fn ping(&self) -> Result<(), StoreError>;
}
