use crate::models::{ApiCall, ApiDefinition, JsonMap};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

static PREFIX_PHRASE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r#"(?i)(?:start|starting|begin|beginning)[^a-zA-Z]+(?:with\s+)?(?:the\s+)?(?:letter\s+)?['"]?([A-Za-z]{1,20})"#,
    )
    .expect("prefix phrase regex")
});

fn prefix_from_message(message: &str) -> Option<String> {
    PREFIX_PHRASE
        .captures(message)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

fn prefix_from_query(query: &JsonMap) -> Option<String> {
    ["name", "country"].iter().find_map(|key| {
        let cleaned = query
            .get(*key)?
            .as_str()?
            .trim()
            .trim_end_matches(|c| c == '*' || c == '%');
        (!cleaned.is_empty()).then(|| cleaned.to_string())
    })
}

fn country_name(item: &JsonMap) -> Option<&str> {
    match item.get("name") {
        Some(Value::Object(names)) => names
            .get("common")
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
            .or_else(|| names.get("official").and_then(Value::as_str)),
        Some(Value::String(name)) => Some(name.as_str()),
        _ => None,
    }
}

/// Keeps countries whose name starts with `prefix`. Returns `None` when the
/// payload is not a list or nothing matches.
fn filter_countries_by_prefix(items: &Value, prefix: &str) -> Option<Value> {
    let list = items.as_array()?;
    let wanted = prefix.to_lowercase();
    let filtered: Vec<Value> = list
        .iter()
        .filter(|item| {
            item.as_object()
                .and_then(country_name)
                .map(|name| name.to_lowercase().starts_with(&wanted))
                .unwrap_or(false)
        })
        .cloned()
        .collect();
    (!filtered.is_empty()).then_some(Value::Array(filtered))
}

/// Client-side fixes for requests an API cannot express directly. Returns the
/// possibly rewritten payload and a note describing what was applied.
pub fn apply_post_processing(
    api: &ApiDefinition,
    call: &ApiCall,
    user_message: &str,
    response: Value,
) -> (Value, Option<String>) {
    if api.name.to_lowercase() != "restcountries" {
        return (response, None);
    }
    let Some(prefix) = prefix_from_query(&call.query).or_else(|| prefix_from_message(user_message))
    else {
        return (response, None);
    };
    match filter_countries_by_prefix(&response, &prefix) {
        Some(filtered) => (
            filtered,
            Some(format!(
                "Client-side filter applied for country names starting with '{}'.",
                prefix
            )),
        ),
        None => (response, None),
    }
}
