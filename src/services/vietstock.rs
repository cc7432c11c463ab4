use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use reqwest::{
    header::{HeaderMap, HeaderValue, ACCEPT, ORIGIN, REFERER, USER_AGENT},
    Client,
};
use serde::{Deserialize, Serialize};

use crate::{
    error::QuoteError,
    models::{normalize_symbol, StockInfo},
    services::quote_source::QuoteSource,
};

#[derive(Clone)]
pub struct VietstockClient {
    http: Client,
    base_url: String,
    timeout: Duration,
    lookback_days: i64,
}

impl VietstockClient {
    pub fn new(base_url: String, timeout: Duration, lookback_days: i64) -> Result<Self, QuoteError> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("*/*"));
        headers.insert(ORIGIN, HeaderValue::from_static("https://stockchart.vietstock.vn"));
        headers.insert(REFERER, HeaderValue::from_static("https://stockchart.vietstock.vn/"));
        headers.insert(
            USER_AGENT,
            HeaderValue::from_static(
                "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/141.0.0.0 Safari/537.36",
            ),
        );

        let http = Client::builder().default_headers(headers).build()?;

        Ok(Self {
            http,
            base_url,
            timeout,
            lookback_days,
        })
    }

    /// Daily bars for the last `lookback_days` days.
    pub async fn history(&self, symbol: &str) -> Result<HistoryResponse, QuoteError> {
        let sym = normalize_symbol(symbol);
        let to = Utc::now().timestamp();
        let from = to - self.lookback_days * 24 * 3600;

        let res = self
            .http
            .get(&self.base_url)
            .query(&[
                ("symbol", sym.clone()),
                ("resolution", "1D".to_string()),
                ("from", from.to_string()),
                ("to", to.to_string()),
                ("countback", self.lookback_days.to_string()),
            ])
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    QuoteError::Timeout(sym.clone())
                } else {
                    QuoteError::Http(e)
                }
            })?;

        if !res.status().is_success() {
            let status = res.status().as_u16();
            let body = res.text().await.unwrap_or_default();
            return Err(QuoteError::Status {
                status,
                body: body.chars().take(200).collect(),
            });
        }

        let body = res.text().await?;
        serde_json::from_str::<HistoryResponse>(&body).map_err(|e| QuoteError::Malformed(e.to_string()))
    }
}

#[async_trait]
impl QuoteSource for VietstockClient {
    async fn last_price(&self, symbol: &str) -> Result<f64, QuoteError> {
        let history = self.history(symbol).await?;
        history
            .last_close()
            .ok_or_else(|| QuoteError::NoData(normalize_symbol(symbol)))
    }

    async fn stock_info(&self, symbol: &str) -> Result<StockInfo, QuoteError> {
        let history = self.history(symbol).await?;
        history
            .latest_bar(&normalize_symbol(symbol))
            .ok_or_else(|| QuoteError::NoData(normalize_symbol(symbol)))
    }
}

/// Column-oriented bars as returned by the history endpoint.
#[derive(Debug, Default, Deserialize, Serialize)]
pub struct HistoryResponse {
    // close
    #[serde(default)]
    pub c: Vec<f64>,
    // open
    #[serde(default)]
    pub o: Vec<f64>,
    // high
    #[serde(default)]
    pub h: Vec<f64>,
    // low
    #[serde(default)]
    pub l: Vec<f64>,
    // volume
    #[serde(default)]
    pub v: Vec<f64>,
    // bar timestamps
    #[serde(default)]
    pub t: Vec<i64>,
}

impl HistoryResponse {
    pub fn last_close(&self) -> Option<f64> {
        self.c
            .last()
            .copied()
            .filter(|p| p.is_finite() && *p > 0.0)
    }

    pub fn latest_bar(&self, symbol: &str) -> Option<StockInfo> {
        let price = self.last_close()?;
        let open = self.o.last().copied().unwrap_or(price);
        let change = price - open;
        let change_percent = if open > 0.0 { change / open * 100.0 } else { 0.0 };

        Some(StockInfo {
            symbol: symbol.to_string(),
            price,
            change,
            change_percent,
            high: self.h.last().copied().unwrap_or(price),
            low: self.l.last().copied().unwrap_or(price),
            volume: self.v.last().copied().unwrap_or(0.0),
        })
    }
}
