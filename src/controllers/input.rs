use std::sync::LazyLock;

use regex::Regex;

use crate::{error::CommandError, models::normalize_symbol};

static SYMBOL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Z0-9]{1,10}$").expect("static symbol regex"));

/// Uppercases and checks the ticker format. Whether the symbol is listed
/// is decided later by the quote source.
pub fn parse_symbol(raw: &str) -> Result<String, CommandError> {
    let sym = normalize_symbol(raw);
    if SYMBOL_RE.is_match(&sym) {
        Ok(sym)
    } else {
        Err(CommandError::InvalidSymbol(raw.trim().to_string()))
    }
}

/// Parses a price argument; `25,500` is accepted.
pub fn parse_price(raw: &str) -> Result<f64, CommandError> {
    let cleaned = raw.trim().replace(',', "");
    let price: f64 = cleaned
        .parse()
        .map_err(|_| CommandError::InvalidPrice(raw.trim().to_string()))?;
    check_price(price).map_err(|e| match e {
        CommandError::NonPositivePrice => e,
        _ => CommandError::InvalidPrice(raw.trim().to_string()),
    })
}

pub fn check_price(price: f64) -> Result<f64, CommandError> {
    if !price.is_finite() {
        return Err(CommandError::InvalidPrice(price.to_string()));
    }
    if price <= 0.0 {
        return Err(CommandError::NonPositivePrice);
    }
    Ok(price)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn symbols_are_normalized_and_checked() {
        assert_eq!(parse_symbol(" hpg ").unwrap(), "HPG");
        assert_eq!(parse_symbol("E1VFVN30").unwrap(), "E1VFVN30");
        assert!(matches!(parse_symbol("HP-G"), Err(CommandError::InvalidSymbol(_))));
        assert!(parse_symbol("").is_err());
        assert!(parse_symbol("ABCDEFGHIJK").is_err());
    }

    #[test]
    fn prices_must_be_positive_numbers() {
        assert_eq!(parse_price("25500").unwrap(), 25_500.0);
        assert_eq!(parse_price("25,500").unwrap(), 25_500.0);
        assert_eq!(parse_price("26.5").unwrap(), 26.5);
        assert_eq!(parse_price("0"), Err(CommandError::NonPositivePrice));
        assert_eq!(parse_price("-3"), Err(CommandError::NonPositivePrice));
        assert_eq!(parse_price("abc"), Err(CommandError::InvalidPrice("abc".to_string())));
        assert_eq!(parse_price("inf"), Err(CommandError::InvalidPrice("inf".to_string())));
        assert_eq!(parse_price("NaN"), Err(CommandError::InvalidPrice("NaN".to_string())));
    }
}
