use std::collections::BTreeMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::{
    error::StoreError,
    models::{normalize_symbol, Alert, OwnerId},
    services::alert_store::{AddOutcome, AlertStore},
};

/// Process-local store. Used with `STORE_BACKEND=memory` and in tests.
#[derive(Default)]
pub struct MemoryAlertStore {
    rows: RwLock<BTreeMap<(OwnerId, String), Alert>>,
}

impl MemoryAlertStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AlertStore for MemoryAlertStore {
    async fn add(&self, owner: OwnerId, symbol: &str, target_price: f64) -> Result<AddOutcome, StoreError> {
        let sym = normalize_symbol(symbol);
        let mut rows = self.rows.write().await;

        if rows.contains_key(&(owner, sym.clone())) {
            return Ok(AddOutcome::AlreadyExists);
        }

        let alert = Alert::new(owner, &sym, target_price);
        rows.insert((owner, sym), alert.clone());
        Ok(AddOutcome::Added(alert))
    }

    async fn exists(&self, owner: OwnerId, symbol: &str) -> Result<bool, StoreError> {
        let rows = self.rows.read().await;
        Ok(rows.contains_key(&(owner, normalize_symbol(symbol))))
    }

    async fn update_price(&self, owner: OwnerId, symbol: &str, target_price: f64) -> Result<u64, StoreError> {
        let mut rows = self.rows.write().await;
        match rows.get_mut(&(owner, normalize_symbol(symbol))) {
            Some(alert) => {
                alert.target_price = target_price;
                Ok(1)
            }
            None => Ok(0),
        }
    }

    async fn remove_by_symbol(&self, owner: OwnerId, symbol: &str) -> Result<u64, StoreError> {
        let mut rows = self.rows.write().await;
        Ok(rows.remove(&(owner, normalize_symbol(symbol))).map_or(0, |_| 1))
    }

    async fn clear_all(&self, owner: OwnerId) -> Result<u64, StoreError> {
        let mut rows = self.rows.write().await;
        let before = rows.len();
        rows.retain(|(o, _), _| *o != owner);
        Ok((before - rows.len()) as u64)
    }

    async fn list_for_owner(&self, owner: OwnerId) -> Result<Vec<Alert>, StoreError> {
        let rows = self.rows.read().await;
        Ok(rows
            .iter()
            .filter(|((o, _), _)| *o == owner)
            .map(|(_, a)| a.clone())
            .collect())
    }

    async fn list_all(&self) -> Result<Vec<Alert>, StoreError> {
        let rows = self.rows.read().await;
        Ok(rows.values().cloned().collect())
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }
}
