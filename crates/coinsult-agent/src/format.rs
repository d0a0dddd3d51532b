//! Renders collected data into text blocks for the model.
//!
//! Every function here is total: missing or non-numeric fields render as
//! [`NOT_AVAILABLE`] and an `error` key short-circuits to an error line.

use serde_json::Value;

pub const NOT_AVAILABLE: &str = "n/a";

/// Format a JSON number with fixed decimals, or `n/a` for anything else.
pub fn number_or_na(value: Option<&Value>, decimals: usize, grouped: bool) -> String {
    let Some(number) = value.and_then(Value::as_f64) else {
        return NOT_AVAILABLE.to_string();
    };
    let plain = format!("{:.*}", decimals, number);
    if grouped {
        group_thousands(&plain)
    } else {
        plain
    }
}

/// Insert `,` between thousands in the integer part of a formatted number
fn group_thousands(formatted: &str) -> String {
    let (sign, unsigned) = match formatted.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", formatted),
    };
    let (int_part, frac_part) = match unsigned.split_once('.') {
        Some((i, f)) => (i, Some(f)),
        None => (unsigned, None),
    };

    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (i, ch) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    match frac_part {
        Some(frac) => format!("{sign}{grouped}.{frac}"),
        None => format!("{sign}{grouped}"),
    }
}

fn text_field<'a>(data: &'a Value, key: &str) -> Option<&'a str> {
    data.get(key).and_then(Value::as_str)
}

fn error_text(data: &Value) -> Option<String> {
    data.get("error").map(|e| match e {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    })
}

/// Price block for a price-intent answer
pub fn format_price_data(data: &Value) -> String {
    if let Some(error) = error_text(data) {
        return format!("Error: {error}");
    }

    let price = number_or_na(data.get("price_usd"), 2, true);
    let change = number_or_na(data.get("price_change_24h_pct"), 2, false);
    let market_cap = number_or_na(data.get("market_cap_usd"), 0, true);
    let volume = number_or_na(data.get("total_volume_usd"), 0, true);
    let change = if change == NOT_AVAILABLE {
        change
    } else {
        format!("{change}%")
    };

    let name = text_field(data, "name").filter(|s| !s.is_empty()).unwrap_or("?");
    let symbol = text_field(data, "symbol").filter(|s| !s.is_empty()).unwrap_or("?");

    format!(
        "Coin: {name} ({symbol})\n\
         Price: ${price}\n\
         24h change: {change}\n\
         Market cap: ${market_cap}\n\
         24h volume: ${volume}"
    )
}

fn first_error(items: &[Value]) -> Option<String> {
    items.first().and_then(error_text)
}

/// Numbered article list
pub fn format_news_data(articles: Option<&Value>) -> String {
    let items = articles.and_then(Value::as_array).map(Vec::as_slice).unwrap_or(&[]);
    if items.is_empty() {
        return "No news found.".to_string();
    }
    if let Some(error) = first_error(items) {
        return format!("Error: {error}");
    }

    items
        .iter()
        .enumerate()
        .map(|(i, a)| {
            format!(
                "{}. {}\n   Source: {} | {}\n   {}\n   Link: {}",
                i + 1,
                text_field(a, "title").unwrap_or("?"),
                text_field(a, "source").unwrap_or("?"),
                text_field(a, "published_at").unwrap_or("?"),
                text_field(a, "description").unwrap_or(""),
                text_field(a, "url").unwrap_or(""),
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Numbered web-search result list
pub fn format_search_data(results: Option<&Value>) -> String {
    let items = results.and_then(Value::as_array).map(Vec::as_slice).unwrap_or(&[]);
    if items.is_empty() {
        return "No search results found.".to_string();
    }
    if let Some(error) = first_error(items) {
        return format!("Error: {error}");
    }

    items
        .iter()
        .enumerate()
        .map(|(i, r)| {
            format!(
                "{}. {}\n   {}",
                i + 1,
                text_field(r, "title").unwrap_or("?"),
                text_field(r, "body").unwrap_or(""),
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Collapse whitespace and cap the length with a `...` suffix
pub fn preview(text: &str, limit: usize) -> String {
    let compact = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if compact.chars().count() <= limit {
        return compact;
    }
    let kept: String = compact.chars().take(limit.saturating_sub(3)).collect();
    format!("{kept}...")
}
