//! Library entrypoint for the stock alert service.
//!
//! Kept separate from `main.rs` so integration tests under `tests/` can build
//! an `AppState` with fakes and drive controllers, routes and the monitor.

use std::sync::Arc;

pub mod config;
pub mod error;
pub mod models;
pub mod services;

#[path = "views/templates.rs"]
pub mod templates;

pub mod bot;
pub mod controllers;
pub mod routes;

#[derive(Clone)]
pub struct AppState {
    pub hbs: templates::Hbs,
    pub store: Arc<dyn services::alert_store::AlertStore>,
    pub fetcher: services::batch_fetcher::BatchQuoteFetcher,
    pub settings: config::Settings,
    /// Filled from `getMe`; commands mentioning another bot are ignored.
    pub bot_username: Option<String>,
}
