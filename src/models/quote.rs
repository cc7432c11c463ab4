use serde::{Deserialize, Serialize};

/// Result of one lookup in a cycle. `price` is `None` when the symbol
/// could not be resolved.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Quote {
    pub symbol: String,
    pub price: Option<f64>,
}

/// Latest daily bar for a symbol, used by the price command.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StockInfo {
    pub symbol: String,
    pub price: f64,
    pub change: f64,
    pub change_percent: f64,
    pub high: f64,
    pub low: f64,
    pub volume: f64,
}
