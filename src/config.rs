use std::{env, str::FromStr, time::Duration};

use chrono::{FixedOffset, NaiveTime, Weekday};

use crate::{error::ConfigError, services::session_gate::SessionWindow};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Mongo,
    Memory,
}

/// What the batch fetcher returns when its overall deadline expires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeadlinePolicy {
    /// Keep prices that arrived before the deadline.
    KeepPartial,
    /// Return nothing for the whole batch.
    DiscardAll,
}

#[derive(Debug, Clone)]
pub struct FetchConfig {
    pub per_call_timeout: Duration,
    pub batch_deadline: Duration,
    pub concurrency: usize,
    pub deadline_policy: DeadlinePolicy,
}

#[derive(Debug, Clone)]
pub struct MarketConfig {
    pub utc_offset: FixedOffset,
    pub sessions: Vec<SessionWindow>,
    pub trading_days: Vec<Weekday>,
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub host: String,
    pub port: u16,

    pub store_backend: StoreBackend,
    pub mongodb_uri: String,
    pub mongodb_db: String,

    pub telegram_bot_token: String,
    pub telegram_api_url: String,
    pub telegram_poll_timeout: Duration,

    pub vietstock_api_url: String,
    pub quote_lookback_days: i64,

    pub check_interval: Duration,
    pub fetch: FetchConfig,
    pub market: MarketConfig,
}

const DEFAULT_SESSIONS: &str = "09:00-11:30,13:00-15:00";
const DEFAULT_WEEKDAYS: &str = "mon,tue,wed,thu,fri";
const DEFAULT_UTC_OFFSET: &str = "+07:00";

impl Default for Settings {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3000,
            store_backend: StoreBackend::Mongo,
            mongodb_uri: "mongodb://localhost:27017".to_string(),
            mongodb_db: "stockalert".to_string(),
            telegram_bot_token: String::new(),
            telegram_api_url: "https://api.telegram.org".to_string(),
            telegram_poll_timeout: Duration::from_secs(30),
            vietstock_api_url: "https://api.vietstock.vn/tvnew/history".to_string(),
            quote_lookback_days: 7,
            check_interval: Duration::from_secs(10),
            fetch: FetchConfig {
                per_call_timeout: Duration::from_secs(10),
                batch_deadline: Duration::from_secs(15),
                concurrency: 16,
                deadline_policy: DeadlinePolicy::KeepPartial,
            },
            market: MarketConfig {
                utc_offset: FixedOffset::east_opt(7 * 3600).expect("static offset"),
                sessions: vec![
                    SessionWindow::new(hm(9, 0), hm(11, 30)),
                    SessionWindow::new(hm(13, 0), hm(15, 0)),
                ],
                trading_days: vec![
                    Weekday::Mon,
                    Weekday::Tue,
                    Weekday::Wed,
                    Weekday::Thu,
                    Weekday::Fri,
                ],
            },
        }
    }
}

fn hm(h: u32, m: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(h, m, 0).expect("static time")
}

fn env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_parse<T: FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|s| s.trim().parse::<T>().ok())
        .unwrap_or(default)
}

pub fn load() -> Result<Settings, ConfigError> {
    // Loads .env if present (no crash if missing)
    dotenvy::dotenv().ok();

    let defaults = Settings::default();

    let store_backend = match env_or("STORE_BACKEND", "mongo").trim().to_lowercase().as_str() {
        "mongo" | "mongodb" => StoreBackend::Mongo,
        "memory" => StoreBackend::Memory,
        other => {
            return Err(ConfigError::invalid(
                "STORE_BACKEND",
                other,
                "expected mongo or memory",
            ));
        }
    };

    let fetch = FetchConfig {
        per_call_timeout: Duration::from_secs(env_parse("QUOTE_TIMEOUT_SECS", 10u64).max(1)),
        batch_deadline: Duration::from_secs(env_parse("BATCH_DEADLINE_SECS", 15u64).max(1)),
        concurrency: env_parse("FETCH_CONCURRENCY", defaults.fetch.concurrency).max(1),
        deadline_policy: parse_deadline_policy(&env_or("BATCH_DEADLINE_POLICY", "partial"))?,
    };

    let market = MarketConfig {
        utc_offset: parse_utc_offset(&env_or("MARKET_UTC_OFFSET", DEFAULT_UTC_OFFSET))?,
        sessions: parse_sessions(&env_or("MARKET_SESSIONS", DEFAULT_SESSIONS))?,
        trading_days: parse_weekdays(&env_or("MARKET_WEEKDAYS", DEFAULT_WEEKDAYS))?,
    };

    Ok(Settings {
        host: env_or("HOST", &defaults.host),
        port: env_parse("PORT", defaults.port),
        store_backend,
        mongodb_uri: env_or("MONGODB_URI", &defaults.mongodb_uri),
        mongodb_db: env_or("MONGODB_DB", &defaults.mongodb_db),
        telegram_bot_token: env_or("TELEGRAM_BOT_TOKEN", "").trim().to_string(),
        telegram_api_url: env_or("TELEGRAM_API_URL", &defaults.telegram_api_url),
        telegram_poll_timeout: Duration::from_secs(env_parse("TELEGRAM_POLL_TIMEOUT_SECS", 30u64)),
        vietstock_api_url: env_or("VIETSTOCK_API_URL", &defaults.vietstock_api_url),
        quote_lookback_days: env_parse("QUOTE_LOOKBACK_DAYS", defaults.quote_lookback_days).max(1),
        check_interval: Duration::from_secs(env_parse("CHECK_INTERVAL_SECS", 10u64).max(1)),
        fetch,
        market,
    })
}

pub fn parse_deadline_policy(raw: &str) -> Result<DeadlinePolicy, ConfigError> {
    match raw.trim().to_lowercase().as_str() {
        "partial" => Ok(DeadlinePolicy::KeepPartial),
        "discard" => Ok(DeadlinePolicy::DiscardAll),
        _ => Err(ConfigError::invalid(
            "BATCH_DEADLINE_POLICY",
            raw,
            "expected partial or discard",
        )),
    }
}

/// Accepts `+07:00`, `-05:30` or a bare hour count such as `7`.
pub fn parse_utc_offset(raw: &str) -> Result<FixedOffset, ConfigError> {
    let bad = |reason: &str| ConfigError::invalid("MARKET_UTC_OFFSET", raw, reason);

    let s = raw.trim();
    let (sign, rest) = match s.chars().next() {
        Some('+') => (1, &s[1..]),
        Some('-') => (-1, &s[1..]),
        Some(_) => (1, s),
        None => return Err(bad("empty offset")),
    };

    let (h, m) = rest.split_once(':').unwrap_or((rest, "0"));
    let h: i32 = h.parse().map_err(|_| bad("hours must be a number"))?;
    let m: i32 = m.parse().map_err(|_| bad("minutes must be a number"))?;
    if !(0..=14).contains(&h) || !(0..=59).contains(&m) {
        return Err(bad("offset out of range"));
    }

    FixedOffset::east_opt(sign * (h * 3600 + m * 60)).ok_or_else(|| bad("offset out of range"))
}

/// Parses `HH:MM-HH:MM` windows separated by commas.
pub fn parse_sessions(raw: &str) -> Result<Vec<SessionWindow>, ConfigError> {
    let bad = |reason: String| ConfigError::invalid("MARKET_SESSIONS", raw, reason);

    let mut windows = Vec::new();
    for part in raw.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        let (start, end) = part
            .split_once('-')
            .ok_or_else(|| bad(format!("window {part:?} is not START-END")))?;

        let start = NaiveTime::parse_from_str(start.trim(), "%H:%M")
            .map_err(|e| bad(format!("bad start in {part:?}: {e}")))?;
        let end = NaiveTime::parse_from_str(end.trim(), "%H:%M")
            .map_err(|e| bad(format!("bad end in {part:?}: {e}")))?;

        if start > end {
            return Err(bad(format!("window {part:?} ends before it starts")));
        }
        windows.push(SessionWindow::new(start, end));
    }

    if windows.is_empty() {
        return Err(bad("at least one session window is required".to_string()));
    }
    Ok(windows)
}

pub fn parse_weekdays(raw: &str) -> Result<Vec<Weekday>, ConfigError> {
    let mut days = Vec::new();
    for part in raw.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        let day = Weekday::from_str(part)
            .map_err(|_| ConfigError::invalid("MARKET_WEEKDAYS", raw, format!("unknown day {part:?}")))?;
        if !days.contains(&day) {
            days.push(day);
        }
    }

    if days.is_empty() {
        return Err(ConfigError::invalid(
            "MARKET_WEEKDAYS",
            raw,
            "at least one trading day is required",
        ));
    }
    Ok(days)
}
