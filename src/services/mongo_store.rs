use async_trait::async_trait;
use futures_util::StreamExt;
use mongodb::{
    bson::doc,
    error::{ErrorKind, WriteFailure},
    options::{FindOptions, IndexOptions},
    Client, Collection, Database, IndexModel,
};

use crate::{
    error::StoreError,
    models::{normalize_symbol, Alert, OwnerId},
    services::alert_store::{AddOutcome, AlertStore},
};

const DUPLICATE_KEY: i32 = 11000;

#[derive(Clone)]
pub struct MongoAlertStore {
    db: Database,
    alerts: Collection<Alert>,
}

impl MongoAlertStore {
    pub async fn connect(uri: &str, db_name: &str) -> Result<Self, StoreError> {
        let client = Client::with_uri_str(uri).await?;
        Ok(Self::new(client.database(db_name)))
    }

    pub fn new(db: Database) -> Self {
        let alerts = db.collection::<Alert>("alerts");
        Self { db, alerts }
    }

    pub async fn ensure_indexes(&self) -> Result<(), StoreError> {
        // alerts: unique per (owner, symbol)
        {
            let model = IndexModel::builder()
                .keys(doc! { "owner": 1, "symbol": 1 })
                .options(IndexOptions::builder().unique(true).build())
                .build();

            self.alerts.create_index(model, None).await?;
        }

        // alerts: monitor scan groups by symbol
        {
            let model = IndexModel::builder().keys(doc! { "symbol": 1 }).build();

            self.alerts.create_index(model, None).await?;
        }

        Ok(())
    }

    async fn collect(&self, filter: mongodb::bson::Document) -> Result<Vec<Alert>, StoreError> {
        let find_opts = FindOptions::builder().sort(doc! { "symbol": 1 }).build();
        let mut cursor = self.alerts.find(filter, find_opts).await?;

        let mut items = Vec::new();
        while let Some(res) = cursor.next().await {
            items.push(res?);
        }
        Ok(items)
    }
}

fn is_duplicate_key(err: &mongodb::error::Error) -> bool {
    match err.kind.as_ref() {
        ErrorKind::Write(WriteFailure::WriteError(we)) => we.code == DUPLICATE_KEY,
        _ => false,
    }
}

#[async_trait]
impl AlertStore for MongoAlertStore {
    async fn add(&self, owner: OwnerId, symbol: &str, target_price: f64) -> Result<AddOutcome, StoreError> {
        let alert = Alert::new(owner, symbol, target_price);

        match self.alerts.insert_one(&alert, None).await {
            Ok(_) => Ok(AddOutcome::Added(alert)),
            Err(e) if is_duplicate_key(&e) => Ok(AddOutcome::AlreadyExists),
            Err(e) => Err(e.into()),
        }
    }

    async fn exists(&self, owner: OwnerId, symbol: &str) -> Result<bool, StoreError> {
        let found = self
            .alerts
            .find_one(doc! { "owner": owner, "symbol": normalize_symbol(symbol) }, None)
            .await?;
        Ok(found.is_some())
    }

    async fn update_price(&self, owner: OwnerId, symbol: &str, target_price: f64) -> Result<u64, StoreError> {
        let res = self
            .alerts
            .update_one(
                doc! { "owner": owner, "symbol": normalize_symbol(symbol) },
                doc! { "$set": { "target_price": target_price } },
                None,
            )
            .await?;
        Ok(res.matched_count)
    }

    async fn remove_by_symbol(&self, owner: OwnerId, symbol: &str) -> Result<u64, StoreError> {
        let res = self
            .alerts
            .delete_many(doc! { "owner": owner, "symbol": normalize_symbol(symbol) }, None)
            .await?;
        Ok(res.deleted_count)
    }

    async fn clear_all(&self, owner: OwnerId) -> Result<u64, StoreError> {
        let res = self.alerts.delete_many(doc! { "owner": owner }, None).await?;
        Ok(res.deleted_count)
    }

    async fn list_for_owner(&self, owner: OwnerId) -> Result<Vec<Alert>, StoreError> {
        self.collect(doc! { "owner": owner }).await
    }

    async fn list_all(&self) -> Result<Vec<Alert>, StoreError> {
        self.collect(doc! {}).await
    }

    async fn ping(&self) -> Result<(), StoreError> {
        self.db.run_command(doc! { "ping": 1 }, None).await?;
        Ok(())
    }
}
