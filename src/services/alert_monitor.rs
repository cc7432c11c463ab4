use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    time::Duration,
};

use chrono::{DateTime, Utc};
use serde_json::json;
use tokio::{task::JoinHandle, time};

use crate::{
    models::Alert,
    services::{
        alert_store::AlertStore, batch_fetcher::BatchQuoteFetcher, notifier::Notifier,
        session_gate::SessionGate,
    },
    templates::{self, Hbs},
};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CycleReport {
    pub alerts: usize,
    pub symbols: usize,
    pub resolved: usize,
    pub triggered: usize,
    pub notified: usize,
    pub notify_failures: usize,
    pub retired: usize,
    pub store_failures: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleOutcome {
    MarketClosed,
    AlreadyRunning,
    ScanFailed,
    NoAlerts,
    Completed(CycleReport),
}

/// One evaluation pass over every stored alert.
///
/// gate -> scan -> group by symbol -> batch fetch -> evaluate -> notify and
/// delete. Nothing is carried between cycles except what the store holds.
pub struct AlertMonitor {
    store: Arc<dyn AlertStore>,
    fetcher: BatchQuoteFetcher,
    notifier: Arc<dyn Notifier>,
    gate: SessionGate,
    hbs: Hbs,
    in_flight: AtomicBool,
}

struct InFlight<'a>(&'a AtomicBool);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl AlertMonitor {
    pub fn new(
        store: Arc<dyn AlertStore>,
        fetcher: BatchQuoteFetcher,
        notifier: Arc<dyn Notifier>,
        gate: SessionGate,
        hbs: Hbs,
    ) -> Self {
        Self {
            store,
            fetcher,
            notifier,
            gate,
            hbs,
            in_flight: AtomicBool::new(false),
        }
    }

    pub async fn run_cycle(&self) -> CycleOutcome {
        self.run_cycle_at(Utc::now()).await
    }

    pub async fn run_cycle_at(&self, now: DateTime<Utc>) -> CycleOutcome {
        if self
            .in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            tracing::warn!("previous alert cycle still running, skipping");
            return CycleOutcome::AlreadyRunning;
        }
        let _guard = InFlight(&self.in_flight);

        if !self.gate.is_open(now) {
            tracing::debug!(local_time = %self.gate.local_time(now), "market closed, skipping price check");
            return CycleOutcome::MarketClosed;
        }

        let alerts = match self.store.list_all().await {
            Ok(a) => a,
            Err(e) => {
                tracing::error!(error = %e, "alert scan failed");
                return CycleOutcome::ScanFailed;
            }
        };

        if alerts.is_empty() {
            return CycleOutcome::NoAlerts;
        }

        let mut report = CycleReport {
            alerts: alerts.len(),
            ..CycleReport::default()
        };

        // one quote request per symbol, however many alerts share it
        let mut by_symbol: HashMap<String, Vec<Alert>> = HashMap::new();
        for a in alerts {
            by_symbol.entry(a.symbol.clone()).or_default().push(a);
        }
        report.symbols = by_symbol.len();

        let quotes = self.fetcher.fetch(by_symbol.keys()).await;
        report.resolved = quotes.prices.len();

        for (sym, group) in by_symbol {
            let Some(price) = quotes.price(&sym) else {
                continue;
            };

            for a in group {
                if !a.is_triggered_by(price) {
                    continue;
                }
                report.triggered += 1;
                self.retire(&a, price, &mut report).await;
            }
        }

        tracing::info!(
            alerts = report.alerts,
            symbols = report.symbols,
            resolved = report.resolved,
            triggered = report.triggered,
            notify_failures = report.notify_failures,
            store_failures = report.store_failures,
            "alert cycle finished"
        );

        CycleOutcome::Completed(report)
    }

    /// Notify, then delete whether or not the message got through.
    async fn retire(&self, alert: &Alert, price: f64, report: &mut CycleReport) {
        let text = templates::render(
            &self.hbs,
            "triggered",
            &json!({
                "symbol": alert.symbol,
                "target_price": alert.target_price,
                "current_price": price,
            }),
        );

        match self.notifier.send(alert.owner, &text).await {
            Ok(()) => report.notified += 1,
            Err(e) => {
                report.notify_failures += 1;
                tracing::error!(owner = alert.owner, symbol = %alert.symbol, error = %e, "alert notification failed");
            }
        }

        match self.store.remove_by_symbol(alert.owner, &alert.symbol).await {
            Ok(n) => {
                report.retired += n as usize;
                tracing::info!(
                    owner = alert.owner,
                    symbol = %alert.symbol,
                    target = alert.target_price,
                    price,
                    removed = n,
                    "alert triggered and removed"
                );
            }
            Err(e) => {
                report.store_failures += 1;
                tracing::error!(owner = alert.owner, symbol = %alert.symbol, error = %e, "failed to remove triggered alert");
            }
        }
    }
}

/// Runs a cycle every `every`. Cycles never overlap: the loop awaits each
/// one and ticks missed while it ran are skipped.
pub fn spawn_price_alert_monitor(monitor: Arc<AlertMonitor>, every: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = time::interval(every);
        interval.set_missed_tick_behavior(time::MissedTickBehavior::Skip);

        tracing::info!(interval_secs = every.as_secs(), "alert monitor started");

        loop {
            interval.tick().await;

            if let CycleOutcome::Completed(r) = monitor.run_cycle().await {
                if r.triggered > 0 {
                    tracing::info!(triggered = r.triggered, retired = r.retired, "alerts fired this tick");
                }
            }
        }
    })
}
