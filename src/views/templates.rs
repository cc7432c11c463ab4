use handlebars::{handlebars_helper, Handlebars};
use std::sync::Arc;

pub type Hbs = Arc<Handlebars<'static>>;

// Telegram "Markdown" flavour: *bold*, _italic_, `code`.

const WELCOME: &str = r#"🤖 *Welcome to Stock Alert Bot!*

📊 Track stock prices and get a message when they reach your target.

*Commands:*
/alert <SYMBOL> <PRICE> - Set an alert (e.g. /alert HPG 25500)
/list - Show your alerts
/edit <SYMBOL> <PRICE> - Change an alert's target
/remove <SYMBOL> - Remove an alert
/clear - Remove all alerts
/price <SYMBOL> - Current price
/guide - Detailed guide
/help - Command list

*Notes:*
• Prices are checked during market hours only
• An alert is removed once it fires

Start with: /alert HPG 25500"#;

const HELP: &str = r#"📋 *Commands:*

/alert <SYMBOL> <PRICE> [<SYMBOL> <PRICE> ...] - Set alerts
/list - Show alerts
/edit <SYMBOL> <PRICE> - Change target
/remove <SYMBOL> [<SYMBOL> ...] - Remove alerts
/clear - Remove all
/price <SYMBOL> - Check price
/guide - Detailed guide

*Examples:*
`/alert HPG 26500`
`/alert HPG 26500 VNM 80000`
`/price HPG`
`/edit HPG 27000`"#;

const GUIDE: &str = r#"📖 *Guide*

*1. Set an alert*
`/alert HPG 25500`
→ You are notified when HPG reaches 25,500 or more.
`/alert HPG 25500 VNM 80000` sets several at once.

*2. List alerts*
`/list`
→ All alerts with current prices.

*3. Change a target*
`/edit HPG 26500`

*4. Remove alerts*
`/remove HPG` - one symbol
`/remove HPG VNM` - several symbols
`/clear` - everything

*5. Check a price*
`/price HPG`

*Notes:*
• One alert per symbol
• Alerts are removed after they fire"#;

const USAGE: &str = r#"❌ Wrong syntax!

Usage: `{{usage}}`
Example: `{{example}}`"#;

// message may quote raw user input
const INPUT_ERROR: &str = "❌ {{md message}}";

const UNKNOWN: &str = r#"❌ Unknown command!

Type /help to see the command list."#;

const STORE_ERROR: &str = "❌ Something went wrong while handling your request. Please try again.";

const ALERT_REPORT: &str = r#"{{#if added}}✅ *Alerts set:*
{{#each added}}• *{{symbol}}* at *{{fmt_price target_price}}*{{#if current_price}} (now {{fmt_price current_price}}){{/if}}
{{/each}}
{{/if}}{{#if skipped}}⚠️ *Already set:* {{#each skipped}}{{this}}{{#unless @last}}, {{/unless}}{{/each}}
Use `/edit` to change a target.

{{/if}}{{#if invalid}}❌ *Unknown symbols:* {{#each invalid}}{{this}}{{#unless @last}}, {{/unless}}{{/each}}

{{/if}}{{#if unavailable}}⏳ *No quote in time for:* {{#each unavailable}}{{this}}{{#unless @last}}, {{/unless}}{{/each}}
Please try again in a moment.

{{/if}}{{#if failed}}❌ *Could not save:* {{#each failed}}{{symbol}}{{#unless @last}}, {{/unless}}{{/each}}

{{/if}}Added {{added_count}}, invalid {{invalid_count}}, skipped {{skipped_count}}"#;

const LIST: &str = r#"📋 *Your alerts:*

{{#each alerts}}*{{symbol}}*
  🎯 Target: {{fmt_price target_price}}
  💰 Current: {{#if current_price}}{{fmt_price current_price}}{{else}}N/A{{/if}}
{{#if current_price}}{{#if reached}}  ✅ Reached
{{else}}  📈 {{fmt_price distance}} to go ({{fmt_pct distance_pct}})
{{/if}}{{/if}}
{{/each}}Total: {{count}} alert(s)"#;

const EMPTY_LIST: &str = r#"📭 You have no alerts yet.

Create one with: /alert HPG 25500"#;

const EDIT_OK: &str = r#"✅ *Alert updated!*

📊 Symbol: *{{symbol}}*
🎯 New target: *{{fmt_price target_price}}*{{#if current_price}}
💰 Current: *{{fmt_price current_price}}*{{/if}}"#;

const EDIT_MISSING: &str = r#"❌ You have no alert for *{{symbol}}*.

Create one with `/alert {{symbol}} {{fmt_price target_price}}`"#;

const REMOVE_REPORT: &str = r#"{{#if removed}}✅ Removed: {{#each removed}}*{{this}}*{{#unless @last}}, {{/unless}}{{/each}}
{{/if}}{{#if not_found}}📭 No alert for: {{#each not_found}}*{{this}}*{{#unless @last}}, {{/unless}}{{/each}}
{{/if}}{{#if invalid}}❌ Unknown symbols: {{#each invalid}}*{{this}}*{{#unless @last}}, {{/unless}}{{/each}}
{{/if}}{{#if unavailable}}⏳ Could not check: {{#each unavailable}}*{{this}}*{{#unless @last}}, {{/unless}}{{/each}}. Please try again.
{{/if}}"#;

const CLEAR: &str = "{{#if count}}✅ Removed all {{count}} alert(s).{{else}}📭 You have no alerts to remove.{{/if}}";

const PRICE: &str = r#"{{marker}} *{{symbol}}*

💰 Price: *{{fmt_price price}}*
📈 Change: {{fmt_signed change}} ({{fmt_pct change_percent}})
📊 High: {{fmt_price high}} | Low: {{fmt_price low}}
📦 Volume: {{fmt_price volume}}"#;

const PRICE_MISSING: &str = "❌ No data found for *{{symbol}}*.";

const TRIGGERED: &str = r#"🎯 *PRICE ALERT!*

📊 *{{symbol}}* reached your target!

🎯 Target: *{{fmt_price target_price}}*
💰 Current: *{{fmt_price current_price}}*

This alert has been removed."#;

handlebars_helper!(fmt_price: |v: f64| format_price(v));
handlebars_helper!(fmt_signed: |v: f64| format_signed(v));
handlebars_helper!(fmt_pct: |v: f64| format!("{v:+.2}%"));
handlebars_helper!(md: |v: str| escape_markdown(v));

pub fn build_handlebars() -> Hbs {
    let mut hb = Handlebars::new();
    hb.register_escape_fn(handlebars::no_escape);

    hb.register_helper("fmt_price", Box::new(fmt_price));
    hb.register_helper("fmt_signed", Box::new(fmt_signed));
    hb.register_helper("fmt_pct", Box::new(fmt_pct));
    hb.register_helper("md", Box::new(md));

    let templates = [
        ("welcome", WELCOME),
        ("help", HELP),
        ("guide", GUIDE),
        ("usage", USAGE),
        ("input_error", INPUT_ERROR),
        ("unknown", UNKNOWN),
        ("store_error", STORE_ERROR),
        ("alert_report", ALERT_REPORT),
        ("list", LIST),
        ("empty_list", EMPTY_LIST),
        ("edit_ok", EDIT_OK),
        ("edit_missing", EDIT_MISSING),
        ("remove_report", REMOVE_REPORT),
        ("clear", CLEAR),
        ("price", PRICE),
        ("price_missing", PRICE_MISSING),
        ("triggered", TRIGGERED),
    ];

    for (name, source) in templates {
        hb.register_template_string(name, source)
            .unwrap_or_else(|e| panic!("template {name}: {e}"));
    }

    Arc::new(hb)
}

pub fn render(hbs: &Hbs, name: &str, ctx: &serde_json::Value) -> String {
    hbs.render(name, ctx).unwrap_or_else(|e| {
        tracing::error!(template = name, error = %e, "template render failed");
        format!("template error: {e}")
    })
}

/// Whole prices get thousands separators only; others keep one decimal.
pub fn format_price(price: f64) -> String {
    if !price.is_finite() {
        return "N/A".to_string();
    }

    let abs = price.abs();
    let text = if abs.fract() == 0.0 {
        format!("{abs:.0}")
    } else {
        format!("{abs:.1}")
    };

    let (int_part, frac_part) = match text.split_once('.') {
        Some((i, f)) => (i, Some(f)),
        None => (text.as_str(), None),
    };

    let mut out = String::with_capacity(text.len() + int_part.len() / 3 + 1);
    if price < 0.0 {
        out.push('-');
    }
    for (i, ch) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    if let Some(f) = frac_part {
        out.push('.');
        out.push_str(f);
    }
    out
}

/// Backslash-escapes the entity characters of Telegram's legacy Markdown.
pub fn escape_markdown(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        if matches!(ch, '_' | '*' | '`' | '[') {
            out.push('\\');
        }
        out.push(ch);
    }
    out
}

pub fn format_signed(v: f64) -> String {
    if v > 0.0 {
        format!("+{}", format_price(v))
    } else {
        format_price(v)
    }
}
