use chrono::Utc;
use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};

/// Recipient of an alert. For the Telegram transport this is the chat id.
pub type OwnerId = i64;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    #[serde(rename = "_id")]
    pub id: ObjectId,

    pub owner: OwnerId,
    pub symbol: String,
    pub target_price: f64,

    // informational only
    pub created_at: i64,
}

impl Alert {
    pub fn new(owner: OwnerId, symbol: &str, target_price: f64) -> Self {
        Self {
            id: ObjectId::new(),
            owner,
            symbol: normalize_symbol(symbol),
            target_price,
            created_at: Utc::now().timestamp(),
        }
    }

    /// An alert fires once the price reaches the target; equality counts.
    pub fn is_triggered_by(&self, price: f64) -> bool {
        price >= self.target_price
    }
}

pub fn normalize_symbol(symbol: &str) -> String {
    symbol.trim().to_uppercase()
}
