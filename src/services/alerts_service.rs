use std::collections::HashSet;

use serde::Serialize;

use crate::{
    error::{QuoteError, StoreError},
    models::{normalize_symbol, Alert, OwnerId, Quote, StockInfo},
    services::alert_store::AddOutcome,
    AppState,
};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AddedAlert {
    pub symbol: String,
    pub target_price: f64,
    pub current_price: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FailedAlert {
    pub symbol: String,
    pub reason: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BatchAddReport {
    pub added: Vec<AddedAlert>,
    pub invalid: Vec<String>,
    pub skipped: Vec<String>,
    pub failed: Vec<FailedAlert>,
    /// No quote before the batch deadline; worth retrying.
    pub unavailable: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RemoveReport {
    pub removed: Vec<String>,
    pub not_found: Vec<String>,
    pub invalid: Vec<String>,
    /// Nothing removed and the symbol could not be checked in time.
    pub unavailable: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum UpdateOutcome {
    Updated { current_price: Option<f64> },
    NotFound,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AlertView {
    pub id: String,
    pub symbol: String,
    pub target_price: f64,
    pub current_price: Option<f64>,
    pub distance: Option<f64>,
    pub distance_pct: Option<f64>,
    pub reached: bool,
}

/// Registers several (symbol, target) pairs for one owner.
///
/// Pairs the owner already has are skipped without a lookup; the rest are
/// validated with a single batch fetch. Symbols the source could not
/// resolve are invalid; symbols cut off by the batch deadline are
/// reported as unavailable instead.
pub async fn add_alerts(
    state: &AppState,
    owner: OwnerId,
    requests: &[(String, f64)],
) -> Result<BatchAddReport, StoreError> {
    let mut report = BatchAddReport::default();
    let mut seen = HashSet::new();
    let mut pending: Vec<(String, f64)> = Vec::new();

    for (symbol, target) in requests {
        let sym = normalize_symbol(symbol);
        if !seen.insert(sym.clone()) || state.store.exists(owner, &sym).await? {
            report.skipped.push(sym);
            continue;
        }
        pending.push((sym, *target));
    }

    if pending.is_empty() {
        return Ok(report);
    }

    let quotes = state.fetcher.fetch(pending.iter().map(|(s, _)| s)).await;

    for (sym, target) in pending {
        let Some(current_price) = quotes.price(&sym) else {
            if quotes.is_unfinished(&sym) {
                report.unavailable.push(sym);
            } else {
                report.invalid.push(sym);
            }
            continue;
        };

        match state.store.add(owner, &sym, target).await {
            Ok(AddOutcome::Added(_)) => report.added.push(AddedAlert {
                symbol: sym,
                target_price: target,
                current_price,
            }),
            Ok(AddOutcome::AlreadyExists) => report.skipped.push(sym),
            Err(e) => {
                tracing::error!(owner, symbol = %sym, error = %e, "failed to add alert");
                report.failed.push(FailedAlert {
                    symbol: sym,
                    reason: e.to_string(),
                });
            }
        }
    }

    tracing::info!(
        owner,
        added = report.added.len(),
        invalid = report.invalid.len(),
        skipped = report.skipped.len(),
        failed = report.failed.len(),
        unavailable = report.unavailable.len(),
        "alert registration"
    );

    Ok(report)
}

/// Removes the owner's alerts for each symbol. Symbols with nothing to
/// remove are checked against the quote source to tell a typo from a
/// symbol that simply had no alert.
pub async fn remove_alerts(
    state: &AppState,
    owner: OwnerId,
    symbols: &[String],
) -> Result<RemoveReport, StoreError> {
    let mut report = RemoveReport::default();
    let mut seen = HashSet::new();
    let mut missing = Vec::new();

    for symbol in symbols {
        let sym = normalize_symbol(symbol);
        if !seen.insert(sym.clone()) {
            continue;
        }

        if state.store.remove_by_symbol(owner, &sym).await? > 0 {
            report.removed.push(sym);
        } else {
            missing.push(sym);
        }
    }

    if !missing.is_empty() {
        let quotes = state.fetcher.fetch(&missing).await;
        for sym in missing {
            if quotes.price(&sym).is_some() {
                report.not_found.push(sym);
            } else if quotes.is_unfinished(&sym) {
                report.unavailable.push(sym);
            } else {
                report.invalid.push(sym);
            }
        }
    }

    Ok(report)
}

pub async fn update_alert(
    state: &AppState,
    owner: OwnerId,
    symbol: &str,
    target_price: f64,
) -> Result<UpdateOutcome, StoreError> {
    let sym = normalize_symbol(symbol);

    if state.store.update_price(owner, &sym, target_price).await? == 0 {
        return Ok(UpdateOutcome::NotFound);
    }

    let current_price = state.fetcher.fetch([&sym]).await.price(&sym);
    Ok(UpdateOutcome::Updated { current_price })
}

pub async fn clear_alerts(state: &AppState, owner: OwnerId) -> Result<u64, StoreError> {
    state.store.clear_all(owner).await
}

/// The owner's alerts, each with a live price and distance to target.
pub async fn list_alerts(state: &AppState, owner: OwnerId) -> Result<Vec<AlertView>, StoreError> {
    let alerts = state.store.list_for_owner(owner).await?;
    if alerts.is_empty() {
        return Ok(Vec::new());
    }

    let quotes = state.fetcher.fetch(alerts.iter().map(|a| &a.symbol)).await;

    Ok(alerts
        .into_iter()
        .map(|a| view(a, |s| quotes.price(s)))
        .collect())
}

fn view(a: Alert, price_of: impl Fn(&str) -> Option<f64>) -> AlertView {
    let current_price = price_of(&a.symbol);
    let distance = current_price.map(|p| a.target_price - p);
    let distance_pct = current_price.zip(distance).map(|(p, d)| d / p * 100.0);

    AlertView {
        id: a.id.to_hex(),
        reached: current_price.is_some_and(|p| a.is_triggered_by(p)),
        symbol: a.symbol,
        target_price: a.target_price,
        current_price,
        distance,
        distance_pct,
    }
}

/// Current prices for several symbols, in request order, duplicates dropped.
pub async fn quotes(state: &AppState, symbols: &[String]) -> Vec<Quote> {
    let mut seen = HashSet::new();
    let wanted: Vec<String> = symbols
        .iter()
        .map(|s| normalize_symbol(s))
        .filter(|s| !s.is_empty() && seen.insert(s.clone()))
        .collect();

    let quotes = state.fetcher.fetch(&wanted).await;

    wanted
        .into_iter()
        .map(|symbol| Quote {
            price: quotes.price(&symbol),
            symbol,
        })
        .collect()
}

pub async fn stock_info(state: &AppState, symbol: &str) -> Result<StockInfo, QuoteError> {
    state.fetcher.source().stock_info(&normalize_symbol(symbol)).await
}
