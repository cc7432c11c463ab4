use serde_json::json;

use crate::{
    controllers::input::{parse_price, parse_symbol},
    error::CommandError,
    models::OwnerId,
    services::alerts_service::{self, UpdateOutcome},
    templates, AppState,
};

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Start,
    Help,
    Guide,
    Alert(Vec<(String, f64)>),
    List,
    Edit { symbol: String, target_price: f64 },
    Remove(Vec<String>),
    Clear,
    Price(String),
    Unknown(String),
}

const ALERT_USAGE: (&str, &str) = ("/alert <SYMBOL> <PRICE> [<SYMBOL> <PRICE> ...]", "/alert HPG 25500");
const EDIT_USAGE: (&str, &str) = ("/edit <SYMBOL> <NEW_PRICE>", "/edit HPG 26500");
const REMOVE_USAGE: (&str, &str) = ("/remove <SYMBOL> [<SYMBOL> ...]", "/remove HPG");
const PRICE_USAGE: (&str, &str) = ("/price <SYMBOL>", "/price HPG");

fn usage((usage, example): (&'static str, &'static str)) -> CommandError {
    CommandError::Usage { usage, example }
}

/// `None` when the text is not a command, or is a command addressed to
/// a different bot (`/list@OtherBot` in a group chat). With no known
/// username every mention is accepted.
pub fn parse_command(text: &str, bot_username: Option<&str>) -> Option<Result<Command, CommandError>> {
    let mut parts = text.split_whitespace();
    let head = parts.next()?.strip_prefix('/')?;
    let (name, mention) = match head.split_once('@') {
        Some((name, mention)) => (name, Some(mention)),
        None => (head, None),
    };
    if let (Some(mention), Some(me)) = (mention, bot_username) {
        if !mention.eq_ignore_ascii_case(me) {
            return None;
        }
    }
    let name = name.to_lowercase();
    let args: Vec<&str> = parts.collect();

    let parsed = match name.as_str() {
        "start" => Ok(Command::Start),
        "help" => Ok(Command::Help),
        "guide" => Ok(Command::Guide),
        "list" => Ok(Command::List),
        "clear" => Ok(Command::Clear),
        "alert" => parse_alert(&args),
        "edit" => parse_edit(&args),
        "remove" => parse_remove(&args),
        "price" => parse_price_cmd(&args),
        _ => Ok(Command::Unknown(name)),
    };
    Some(parsed)
}

fn parse_alert(args: &[&str]) -> Result<Command, CommandError> {
    if args.is_empty() || args.len() % 2 != 0 {
        return Err(usage(ALERT_USAGE));
    }

    let pairs = args
        .chunks(2)
        .map(|pair| -> Result<(String, f64), CommandError> {
            Ok((parse_symbol(pair[0])?, parse_price(pair[1])?))
        })
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Command::Alert(pairs))
}

fn parse_edit(args: &[&str]) -> Result<Command, CommandError> {
    let [symbol, price] = args else {
        return Err(usage(EDIT_USAGE));
    };
    Ok(Command::Edit {
        symbol: parse_symbol(symbol)?,
        target_price: parse_price(price)?,
    })
}

fn parse_remove(args: &[&str]) -> Result<Command, CommandError> {
    if args.is_empty() {
        return Err(usage(REMOVE_USAGE));
    }
    let symbols = args
        .iter()
        .map(|s| parse_symbol(s))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Command::Remove(symbols))
}

fn parse_price_cmd(args: &[&str]) -> Result<Command, CommandError> {
    let [symbol] = args else {
        return Err(usage(PRICE_USAGE));
    };
    Ok(Command::Price(parse_symbol(symbol)?))
}

/// Turns one chat message into the reply text, or `None` if the message
/// is not a command.
pub async fn handle_message(state: &AppState, owner: OwnerId, text: &str) -> Option<String> {
    let reply = match parse_command(text, state.bot_username.as_deref())? {
        Ok(cmd) => execute(state, owner, cmd).await,
        Err(CommandError::Usage { usage, example }) => templates::render(
            &state.hbs,
            "usage",
            &json!({ "usage": usage, "example": example }),
        ),
        Err(e) => templates::render(&state.hbs, "input_error", &json!({ "message": e.to_string() })),
    };
    Some(reply)
}

pub async fn execute(state: &AppState, owner: OwnerId, cmd: Command) -> String {
    let hbs = &state.hbs;

    match cmd {
        Command::Start => templates::render(hbs, "welcome", &json!({})),
        Command::Help => templates::render(hbs, "help", &json!({})),
        Command::Guide => templates::render(hbs, "guide", &json!({})),
        Command::Unknown(name) => {
            tracing::debug!(owner, command = %name, "unknown command");
            templates::render(hbs, "unknown", &json!({}))
        }

        Command::Alert(pairs) => match alerts_service::add_alerts(state, owner, &pairs).await {
            Ok(report) => templates::render(
                hbs,
                "alert_report",
                &json!({
                    "added": report.added,
                    "skipped": report.skipped,
                    "invalid": report.invalid,
                    "failed": report.failed,
                    "unavailable": report.unavailable,
                    "added_count": report.added.len(),
                    "invalid_count": report.invalid.len(),
                    "skipped_count": report.skipped.len(),
                }),
            ),
            Err(e) => store_error(state, owner, "alert", e),
        },

        Command::List => match alerts_service::list_alerts(state, owner).await {
            Ok(alerts) if alerts.is_empty() => templates::render(hbs, "empty_list", &json!({})),
            Ok(alerts) => templates::render(
                hbs,
                "list",
                &json!({ "count": alerts.len(), "alerts": alerts }),
            ),
            Err(e) => store_error(state, owner, "list", e),
        },

        Command::Edit {
            symbol,
            target_price,
        } => match alerts_service::update_alert(state, owner, &symbol, target_price).await {
            Ok(UpdateOutcome::Updated { current_price }) => templates::render(
                hbs,
                "edit_ok",
                &json!({
                    "symbol": symbol,
                    "target_price": target_price,
                    "current_price": current_price,
                }),
            ),
            Ok(UpdateOutcome::NotFound) => templates::render(
                hbs,
                "edit_missing",
                &json!({ "symbol": symbol, "target_price": target_price }),
            ),
            Err(e) => store_error(state, owner, "edit", e),
        },

        Command::Remove(symbols) => match alerts_service::remove_alerts(state, owner, &symbols).await {
            Ok(report) => templates::render(hbs, "remove_report", &json!(report)),
            Err(e) => store_error(state, owner, "remove", e),
        },

        Command::Clear => match alerts_service::clear_alerts(state, owner).await {
            Ok(count) => templates::render(hbs, "clear", &json!({ "count": count })),
            Err(e) => store_error(state, owner, "clear", e),
        },

        Command::Price(symbol) => match alerts_service::stock_info(state, &symbol).await {
            Ok(info) => {
                let marker = if info.change > 0.0 {
                    "🟢"
                } else if info.change < 0.0 {
                    "🔴"
                } else {
                    "⚪"
                };
                let mut ctx = json!(info);
                ctx["marker"] = json!(marker);
                templates::render(hbs, "price", &ctx)
            }
            Err(e) => {
                tracing::warn!(symbol = %symbol, error = %e, "price lookup failed");
                templates::render(hbs, "price_missing", &json!({ "symbol": symbol }))
            }
        },
    }
}

fn store_error(state: &AppState, owner: OwnerId, command: &str, e: crate::error::StoreError) -> String {
    tracing::error!(owner, command, error = %e, "store error while handling command");
    templates::render(&state.hbs, "store_error", &json!({}))
}
