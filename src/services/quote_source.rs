use async_trait::async_trait;

use crate::{error::QuoteError, models::StockInfo};

/// Single-symbol price lookups. Callers decide about batching and deadlines.
#[async_trait]
pub trait QuoteSource: Send + Sync {
    /// Latest available close for `symbol`.
    async fn last_price(&self, symbol: &str) -> Result<f64, QuoteError>;

    async fn stock_info(&self, symbol: &str) -> Result<StockInfo, QuoteError>;
}
