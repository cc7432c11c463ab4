#![allow(dead_code)]

use std::{
    collections::{HashMap, HashSet},
    sync::{
        atomic::{AtomicBool, AtomicUsize, Ordering},
        Arc, Mutex,
    },
    time::Duration,
};

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use stockalert::{
    config::{self, DeadlinePolicy, FetchConfig},
    error::{NotifyError, QuoteError, StoreError},
    models::{Alert, OwnerId, StockInfo},
    services::{
        alert_monitor::AlertMonitor,
        alert_store::{AddOutcome, AlertStore},
        batch_fetcher::BatchQuoteFetcher,
        memory_store::MemoryAlertStore,
        notifier::Notifier,
        quote_source::QuoteSource,
        session_gate::SessionGate,
    },
    templates, AppState,
};

/// Quote source answering from a fixed table. Unknown symbols fail,
/// hanging symbols never answer.
#[derive(Default)]
pub struct ScriptedQuoteSource {
    prices: Mutex<HashMap<String, f64>>,
    hanging: Mutex<HashSet<String>>,
    calls: Mutex<Vec<String>>,
}

impl ScriptedQuoteSource {
    pub fn with(prices: &[(&str, f64)]) -> Arc<Self> {
        Arc::new(Self {
            prices: Mutex::new(prices.iter().map(|(s, p)| (s.to_string(), *p)).collect()),
            ..Default::default()
        })
    }

    pub fn hang(&self, symbol: &str) {
        self.hanging.lock().unwrap().insert(symbol.to_string());
    }

    pub fn set_price(&self, symbol: &str, price: f64) {
        self.prices.lock().unwrap().insert(symbol.to_string(), price);
    }

    pub fn calls(&self) -> Vec<String> {
        let mut c = self.calls.lock().unwrap().clone();
        c.sort();
        c
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn reset_calls(&self) {
        self.calls.lock().unwrap().clear();
    }

    fn lookup(&self, symbol: &str) -> Result<f64, QuoteError> {
        self.calls.lock().unwrap().push(symbol.to_string());
        self.prices
            .lock()
            .unwrap()
            .get(symbol)
            .copied()
            .ok_or_else(|| QuoteError::NoData(symbol.to_string()))
    }
}

#[async_trait]
impl QuoteSource for ScriptedQuoteSource {
    async fn last_price(&self, symbol: &str) -> Result<f64, QuoteError> {
        if self.hanging.lock().unwrap().contains(symbol) {
            self.calls.lock().unwrap().push(symbol.to_string());
            tokio::time::sleep(Duration::from_secs(3600)).await;
        }
        self.lookup(symbol)
    }

    async fn stock_info(&self, symbol: &str) -> Result<StockInfo, QuoteError> {
        let price = self.lookup(symbol)?;
        let open = price - 500.0;
        Ok(StockInfo {
            symbol: symbol.to_string(),
            price,
            change: price - open,
            change_percent: (price - open) / open * 100.0,
            high: price + 100.0,
            low: open,
            volume: 1_234_500.0,
        })
    }
}

#[derive(Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<(OwnerId, String)>>,
    attempts: AtomicUsize,
    failing: AtomicBool,
}

impl RecordingNotifier {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn fail(&self, on: bool) {
        self.failing.store(on, Ordering::SeqCst);
    }

    pub fn sent(&self) -> Vec<(OwnerId, String)> {
        self.sent.lock().unwrap().clone()
    }

    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send(&self, owner: OwnerId, text: &str) -> Result<(), NotifyError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        if self.failing.load(Ordering::SeqCst) {
            return Err(NotifyError::Transport("connection reset".to_string()));
        }
        self.sent.lock().unwrap().push((owner, text.to_string()));
        Ok(())
    }
}

/// Memory store that counts every call and can be told to fail.
#[derive(Default)]
pub struct CountingStore {
    inner: MemoryAlertStore,
    calls: AtomicUsize,
    fail_scan: AtomicBool,
    fail_remove: AtomicBool,
    race_remove: AtomicBool,
}

impl CountingStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn fail_scan(&self, on: bool) {
        self.fail_scan.store(on, Ordering::SeqCst);
    }

    pub fn fail_remove(&self, on: bool) {
        self.fail_remove.store(on, Ordering::SeqCst);
    }

    /// Makes every remove lose a race: the row is deleted by "someone
    /// else" first, so the caller sees zero affected rows.
    pub fn race_remove(&self, on: bool) {
        self.race_remove.store(on, Ordering::SeqCst);
    }

    /// Seeds a row without counting it as a call.
    pub async fn seed(&self, owner: OwnerId, symbol: &str, target_price: f64) {
        let out = self.inner.add(owner, symbol, target_price).await.unwrap();
        assert!(matches!(out, AddOutcome::Added(_)), "duplicate seed {owner}/{symbol}");
    }

    pub async fn snapshot(&self) -> Vec<Alert> {
        self.inner.list_all().await.unwrap()
    }

    fn hit(&self) {
        self.calls.fetch_add(1, Ordering::SeqCst);
    }
}

fn down() -> StoreError {
    StoreError::Unavailable("test store offline".to_string())
}

#[async_trait]
impl AlertStore for CountingStore {
    async fn add(&self, owner: OwnerId, symbol: &str, target_price: f64) -> Result<AddOutcome, StoreError> {
        self.hit();
        self.inner.add(owner, symbol, target_price).await
    }

    async fn exists(&self, owner: OwnerId, symbol: &str) -> Result<bool, StoreError> {
        self.hit();
        self.inner.exists(owner, symbol).await
    }

    async fn update_price(&self, owner: OwnerId, symbol: &str, target_price: f64) -> Result<u64, StoreError> {
        self.hit();
        self.inner.update_price(owner, symbol, target_price).await
    }

    async fn remove_by_symbol(&self, owner: OwnerId, symbol: &str) -> Result<u64, StoreError> {
        self.hit();
        if self.fail_remove.load(Ordering::SeqCst) {
            return Err(down());
        }
        if self.race_remove.load(Ordering::SeqCst) {
            self.inner.remove_by_symbol(owner, symbol).await?;
        }
        self.inner.remove_by_symbol(owner, symbol).await
    }

    async fn clear_all(&self, owner: OwnerId) -> Result<u64, StoreError> {
        self.hit();
        self.inner.clear_all(owner).await
    }

    async fn list_for_owner(&self, owner: OwnerId) -> Result<Vec<Alert>, StoreError> {
        self.hit();
        if self.fail_scan.load(Ordering::SeqCst) {
            return Err(down());
        }
        self.inner.list_for_owner(owner).await
    }

    async fn list_all(&self) -> Result<Vec<Alert>, StoreError> {
        self.hit();
        if self.fail_scan.load(Ordering::SeqCst) {
            return Err(down());
        }
        self.inner.list_all().await
    }

    async fn ping(&self) -> Result<(), StoreError> {
        if self.fail_scan.load(Ordering::SeqCst) {
            return Err(down());
        }
        Ok(())
    }
}

pub fn fetch_config() -> FetchConfig {
    FetchConfig {
        per_call_timeout: Duration::from_secs(2),
        batch_deadline: Duration::from_secs(5),
        concurrency: 8,
        deadline_policy: DeadlinePolicy::KeepPartial,
    }
}

pub fn fetcher(source: Arc<ScriptedQuoteSource>) -> BatchQuoteFetcher {
    BatchQuoteFetcher::new(source, &fetch_config())
}

/// Config for tests where one symbol never answers: the batch deadline
/// fires long before the per-call timeout.
pub fn deadline_config(deadline_policy: DeadlinePolicy) -> FetchConfig {
    FetchConfig {
        per_call_timeout: Duration::from_secs(60),
        batch_deadline: Duration::from_secs(5),
        concurrency: 8,
        deadline_policy,
    }
}

pub fn default_gate() -> SessionGate {
    let market = config::Settings::default().market;
    SessionGate::new(market.utc_offset, market.sessions, market.trading_days)
}

pub struct Harness {
    pub store: Arc<CountingStore>,
    pub source: Arc<ScriptedQuoteSource>,
    pub notifier: Arc<RecordingNotifier>,
    pub monitor: AlertMonitor,
    pub state: AppState,
}

pub fn harness(prices: &[(&str, f64)]) -> Harness {
    harness_with(prices, fetch_config())
}

pub fn harness_with(prices: &[(&str, f64)], cfg: FetchConfig) -> Harness {
    let store = CountingStore::new();
    let source = ScriptedQuoteSource::with(prices);
    let notifier = RecordingNotifier::new();
    let hbs = templates::build_handlebars();

    let monitor = AlertMonitor::new(
        store.clone(),
        BatchQuoteFetcher::new(source.clone(), &cfg),
        notifier.clone(),
        default_gate(),
        hbs.clone(),
    );

    let state = AppState {
        hbs,
        store: store.clone(),
        fetcher: BatchQuoteFetcher::new(source.clone(), &cfg),
        settings: config::Settings::default(),
        bot_username: Some("StockAlertBot".to_string()),
    };

    Harness {
        store,
        source,
        notifier,
        monitor,
        state,
    }
}

/// A Vietnam-local wall clock time turned into UTC.
pub fn vn(y: i32, m: u32, d: u32, h: u32, min: u32, s: u32) -> DateTime<Utc> {
    chrono::FixedOffset::east_opt(7 * 3600)
        .unwrap()
        .with_ymd_and_hms(y, m, d, h, min, s)
        .unwrap()
        .with_timezone(&Utc)
}

/// Wednesday 2024-05-15, 10:00 in Hanoi: inside the morning session.
pub fn market_open() -> DateTime<Utc> {
    vn(2024, 5, 15, 10, 0, 0)
}
