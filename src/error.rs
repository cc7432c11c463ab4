use thiserror::Error;

#[derive(Debug, Error)]
pub enum QuoteError {
    #[error("quote request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("quote source returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("malformed quote payload: {0}")]
    Malformed(String),

    #[error("no price data for {0}")]
    NoData(String),

    #[error("quote request for {0} timed out")]
    Timeout(String),
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] mongodb::error::Error),

    #[error("store unavailable: {0}")]
    Unavailable(String),
}

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("notification transport failed: {0}")]
    Transport(String),

    #[error("notification rejected: {0}")]
    Rejected(String),
}

#[derive(Debug, Error)]
pub enum TelegramError {
    #[error("telegram request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("telegram api error: {0}")]
    Api(String),
}

impl From<TelegramError> for NotifyError {
    fn from(err: TelegramError) -> Self {
        match err {
            TelegramError::Http(e) => NotifyError::Transport(e.to_string()),
            TelegramError::Api(msg) => NotifyError::Rejected(msg),
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {key}={value:?}: {reason}")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },
}

impl ConfigError {
    pub fn invalid(key: &'static str, value: &str, reason: impl Into<String>) -> Self {
        ConfigError::Invalid {
            key,
            value: value.to_string(),
            reason: reason.into(),
        }
    }
}

/// Rejected user input. Messages are shown to the user as-is.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CommandError {
    #[error("Wrong syntax. Usage: {usage}")]
    Usage {
        usage: &'static str,
        example: &'static str,
    },

    #[error("Invalid price {0:?}. Please enter a number.")]
    InvalidPrice(String),

    #[error("Price must be greater than 0.")]
    NonPositivePrice,

    #[error("Invalid symbol {0:?}. Symbols are 1 to 10 letters or digits.")]
    InvalidSymbol(String),
}
