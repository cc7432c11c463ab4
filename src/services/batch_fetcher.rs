use std::{
    collections::{BTreeSet, HashMap},
    sync::Arc,
    time::Duration,
};

use tokio::{
    sync::Semaphore,
    task::{JoinError, JoinSet},
};

use crate::{
    config::{DeadlinePolicy, FetchConfig},
    models::normalize_symbol,
    services::quote_source::QuoteSource,
};

type Lookup = (String, Option<f64>);

/// Outcome of one [`BatchQuoteFetcher::fetch`] call.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BatchQuotes {
    pub prices: HashMap<String, f64>,
    /// Symbols left without an answer because the batch deadline expired.
    /// Under `DiscardAll` this is every requested symbol.
    pub unfinished: BTreeSet<String>,
}

impl BatchQuotes {
    pub fn price(&self, symbol: &str) -> Option<f64> {
        self.prices.get(symbol).copied()
    }

    pub fn is_unfinished(&self, symbol: &str) -> bool {
        self.unfinished.contains(symbol)
    }
}

/// Resolves many symbols at once against a [`QuoteSource`].
///
/// Each distinct symbol is looked up exactly once per call. Lookups run
/// concurrently (capped by `concurrency`), each under `per_call_timeout`,
/// and the whole batch under `batch_deadline`. Failed symbols are simply
/// missing from `prices`; symbols cut off by the deadline are also listed
/// in `unfinished`.
#[derive(Clone)]
pub struct BatchQuoteFetcher {
    source: Arc<dyn QuoteSource>,
    per_call_timeout: Duration,
    batch_deadline: Duration,
    concurrency: usize,
    deadline_policy: DeadlinePolicy,
}

impl BatchQuoteFetcher {
    pub fn new(source: Arc<dyn QuoteSource>, cfg: &FetchConfig) -> Self {
        Self {
            source,
            per_call_timeout: cfg.per_call_timeout,
            batch_deadline: cfg.batch_deadline,
            concurrency: cfg.concurrency.max(1),
            deadline_policy: cfg.deadline_policy,
        }
    }

    pub fn source(&self) -> &Arc<dyn QuoteSource> {
        &self.source
    }

    pub async fn fetch<I, S>(&self, symbols: I) -> BatchQuotes
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let unique: BTreeSet<String> = symbols
            .into_iter()
            .map(|s| normalize_symbol(s.as_ref()))
            .filter(|s| !s.is_empty())
            .collect();

        if unique.is_empty() {
            return BatchQuotes::default();
        }

        let requested = unique.len();
        let permits = Arc::new(Semaphore::new(self.concurrency));
        let mut lookups = JoinSet::new();

        for symbol in unique.iter().cloned() {
            let source = Arc::clone(&self.source);
            let permits = Arc::clone(&permits);
            let per_call = self.per_call_timeout;

            lookups.spawn(async move {
                let _permit = permits.acquire_owned().await.ok();
                let price = lookup(source.as_ref(), &symbol, per_call).await;
                (symbol, price)
            });
        }

        let mut tally = Tally::new(unique);

        let deadline = tokio::time::sleep(self.batch_deadline);
        tokio::pin!(deadline);

        let mut deadline_hit = false;
        loop {
            tokio::select! {
                biased;
                next = lookups.join_next() => match next {
                    Some(joined) => tally.record(joined),
                    None => break,
                },
                _ = &mut deadline => {
                    deadline_hit = true;
                    break;
                }
            }
        }

        if !deadline_hit {
            tracing::debug!(requested, resolved = tally.prices.len(), "batch quote fetch finished");
            return tally.finish(false);
        }

        drain_aborted(&mut lookups, &mut tally).await;

        tracing::error!(
            requested,
            resolved = tally.prices.len(),
            unfinished = tally.pending.len(),
            deadline_secs = self.batch_deadline.as_secs_f64(),
            policy = ?self.deadline_policy,
            "batch quote deadline exceeded"
        );

        if self.deadline_policy == DeadlinePolicy::DiscardAll {
            return BatchQuotes {
                prices: HashMap::new(),
                unfinished: tally.requested,
            };
        }
        tally.finish(true)
    }
}

struct Tally {
    requested: BTreeSet<String>,
    pending: BTreeSet<String>,
    prices: HashMap<String, f64>,
}

impl Tally {
    fn new(requested: BTreeSet<String>) -> Self {
        Self {
            pending: requested.clone(),
            prices: HashMap::with_capacity(requested.len()),
            requested,
        }
    }

    fn record(&mut self, joined: Result<Lookup, JoinError>) {
        match joined {
            Ok((symbol, price)) => {
                self.pending.remove(&symbol);
                if let Some(p) = price {
                    self.prices.insert(symbol, p);
                }
            }
            Err(e) if e.is_cancelled() => {}
            Err(e) => tracing::warn!(error = %e, "quote lookup task failed"),
        }
    }

    fn finish(self, deadline_hit: bool) -> BatchQuotes {
        BatchQuotes {
            prices: self.prices,
            unfinished: if deadline_hit { self.pending } else { BTreeSet::new() },
        }
    }
}

/// Cancels what is still running and keeps lookups that had already
/// completed but were not joined yet.
async fn drain_aborted(lookups: &mut JoinSet<Lookup>, tally: &mut Tally) {
    lookups.abort_all();
    while let Some(joined) = lookups.join_next().await {
        tally.record(joined);
    }
}

async fn lookup(source: &dyn QuoteSource, symbol: &str, per_call: Duration) -> Option<f64> {
    match tokio::time::timeout(per_call, source.last_price(symbol)).await {
        Ok(Ok(price)) if price.is_finite() && price > 0.0 => Some(price),
        Ok(Ok(price)) => {
            tracing::debug!(symbol, price, "ignoring unusable price");
            None
        }
        Ok(Err(e)) => {
            tracing::warn!(symbol, error = %e, "quote lookup failed");
            None
        }
        Err(_) => {
            tracing::warn!(symbol, timeout_secs = per_call.as_secs_f64(), "quote lookup timed out");
            None
        }
    }
}
