use std::{net::SocketAddr, sync::Arc};

use anyhow::Context;
use tracing_subscriber::EnvFilter;

use stockalert::{
    bot, config, routes,
    services::{
        alert_monitor::{spawn_price_alert_monitor, AlertMonitor},
        alert_store::AlertStore,
        batch_fetcher::BatchQuoteFetcher,
        memory_store::MemoryAlertStore,
        mongo_store::MongoAlertStore,
        notifier::{LogNotifier, Notifier},
        session_gate::SessionGate,
        telegram::TelegramClient,
        vietstock::VietstockClient,
    },
    templates, AppState,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let settings = config::load()?;

    let store: Arc<dyn AlertStore> = match settings.store_backend {
        config::StoreBackend::Mongo => {
            let store = MongoAlertStore::connect(&settings.mongodb_uri, &settings.mongodb_db)
                .await
                .context("failed to connect to MongoDB")?;
            store.ensure_indexes().await.context("failed to create alert indexes")?;
            tracing::info!(db = %settings.mongodb_db, "using mongodb alert store");
            Arc::new(store)
        }
        config::StoreBackend::Memory => {
            tracing::warn!("using in-memory alert store, alerts are lost on restart");
            Arc::new(MemoryAlertStore::new())
        }
    };

    let vietstock = VietstockClient::new(
        settings.vietstock_api_url.clone(),
        settings.fetch.per_call_timeout,
        settings.quote_lookback_days,
    )
    .context("failed to build quote client")?;
    let fetcher = BatchQuoteFetcher::new(Arc::new(vietstock), &settings.fetch);
    let hbs = templates::build_handlebars();

    let telegram = (!settings.telegram_bot_token.is_empty()).then(|| {
        TelegramClient::new(
            settings.telegram_api_url.clone(),
            settings.telegram_bot_token.clone(),
        )
    });

    let notifier: Arc<dyn Notifier> = match &telegram {
        Some(client) => Arc::new(client.clone()),
        None => {
            tracing::warn!("TELEGRAM_BOT_TOKEN not set, notifications go to the log only");
            Arc::new(LogNotifier)
        }
    };

    let gate = SessionGate::new(
        settings.market.utc_offset,
        settings.market.sessions.clone(),
        settings.market.trading_days.clone(),
    );

    let state = AppState {
        hbs: hbs.clone(),
        store: store.clone(),
        fetcher: fetcher.clone(),
        settings: settings.clone(),
        bot_username: None,
    };

    let monitor = Arc::new(AlertMonitor::new(store, fetcher, notifier, gate, hbs));
    spawn_price_alert_monitor(monitor, settings.check_interval);

    if let Some(client) = telegram {
        bot::spawn_bot_poller(state.clone(), client);
    }

    let app = routes::app(state);

    let ip: std::net::IpAddr = settings
        .host
        .parse()
        .with_context(|| format!("invalid HOST {:?}", settings.host))?;
    let addr = SocketAddr::from((ip, settings.port));
    tracing::info!("listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
