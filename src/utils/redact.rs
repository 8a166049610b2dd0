use crate::models::JsonMap;
use crate::utils::text::truncate_utf8_prefix;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use std::collections::HashSet;
use url::Url;

const DEFAULT_REDACTION: &str = "[REDACTED]";
const INLINE_REDACTION: &str = "***REDACTED***";

static SENSITIVE_KEYS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "password",
        "secret",
        "token",
        "api_key",
        "apikey",
        "appid",
        "access_key",
        "auth_token",
        "client_secret",
        "refresh_token",
        "authorization",
    ]
    .into_iter()
    .collect()
});

static SENSITIVE_HEADER_KEYS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "authorization",
        "proxy-authorization",
        "x-api-key",
        "x-auth-token",
        "x-access-token",
        "x-rapidapi-key",
    ]
    .into_iter()
    .collect()
});

static INLINE_REDACTION_PATTERNS: Lazy<Vec<(Regex, &'static str)>> = Lazy::new(|| {
    vec![
        (
            Regex::new(r"\b(Bearer)\s+([A-Za-z0-9._~+/=-]{6,})").expect("inline redaction regex"),
            "$1 ***REDACTED***",
        ),
        (
            Regex::new(r"\bsk-[A-Za-z0-9_-]{10,}\b").expect("inline redaction regex"),
            "sk-***REDACTED***",
        ),
        (
            Regex::new(r#"(?i)([?&][A-Za-z0-9_.-]*(?:key|token|secret|password|signature|appid)=)[^&#\s"'`]+"#)
                .expect("inline redaction regex"),
            "$1***REDACTED***",
        ),
        (
            Regex::new(r#"\b(api[_-]?key|apikey|appid|token|secret|access[_-]?token)\b\s*([:=])\s*([^\s"'&`]+)"#)
                .expect("inline redaction regex"),
            "$1$2***REDACTED***",
        ),
    ]
});

fn normalize_key(key: &str) -> String {
    key.trim().to_lowercase()
}

pub fn is_sensitive_key(key: &str) -> bool {
    let normalized = normalize_key(key);
    if normalized.is_empty() {
        return false;
    }
    if SENSITIVE_KEYS.contains(normalized.as_str())
        || SENSITIVE_HEADER_KEYS.contains(normalized.as_str())
    {
        return true;
    }
    normalized.contains("secret") || normalized.contains("token")
}

fn redact_inline_secrets(value: &str, extra: &[String]) -> String {
    let mut out = value.to_string();
    for (re, replacement) in INLINE_REDACTION_PATTERNS.iter() {
        if re.is_match(&out) {
            out = re.replace_all(&out, *replacement).to_string();
        }
    }
    for raw in extra {
        let needle = raw.trim();
        if needle.len() < 4 {
            continue;
        }
        out = out.replace(needle, INLINE_REDACTION);
    }
    out
}

/// Masks inline credentials and any of the `extra` secret values, then caps
/// the result at `max_bytes`.
pub fn redact_text(value: &str, max_bytes: usize, extra: &[String]) -> String {
    let redacted = redact_inline_secrets(value, extra);
    if redacted.len() <= max_bytes {
        return redacted;
    }
    format!("{}...", truncate_utf8_prefix(&redacted, max_bytes))
}

/// Masks the API's auth parameter, sensitive parameter names and any query
/// value carrying one of the `extra` secrets. Values are compared decoded, so
/// form-encoded secrets are caught too.
pub fn redact_url(raw: &str, auth_key_name: &str, extra: &[String]) -> String {
    let Ok(mut url) = Url::parse(raw) else {
        return redact_text(raw, usize::MAX, extra);
    };
    if url.query().is_some() {
        let pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();
        let mut serializer = url.query_pairs_mut();
        serializer.clear();
        for (key, value) in &pairs {
            let carries_secret = extra
                .iter()
                .map(|secret| secret.trim())
                .any(|secret| !secret.is_empty() && value.contains(secret));
            if key == auth_key_name || is_sensitive_key(key) || carries_secret {
                serializer.append_pair(key, DEFAULT_REDACTION);
            } else {
                serializer.append_pair(key, value);
            }
        }
    }
    redact_text(url.as_str(), usize::MAX, extra)
}

pub fn redact_headers(headers: &JsonMap, extra: &[String]) -> Value {
    let mut out = JsonMap::new();
    for (key, entry) in headers {
        let normalized = normalize_key(key);
        if SENSITIVE_HEADER_KEYS.contains(normalized.as_str()) {
            out.insert(key.clone(), Value::String(DEFAULT_REDACTION.to_string()));
        } else if let Some(text) = entry.as_str() {
            out.insert(key.clone(), Value::String(redact_text(text, usize::MAX, extra)));
        } else {
            out.insert(key.clone(), entry.clone());
        }
    }
    Value::Object(out)
}

/// Query maps mask the API's configured auth parameter in addition to the
/// generic sensitive names.
pub fn redact_query(query: &JsonMap, auth_key_name: &str, extra: &[String]) -> Value {
    let mut out = JsonMap::new();
    for (key, entry) in query {
        if key == auth_key_name || is_sensitive_key(key) {
            out.insert(key.clone(), Value::String(DEFAULT_REDACTION.to_string()));
        } else {
            out.insert(key.clone(), redact_value(entry, extra));
        }
    }
    Value::Object(out)
}

pub fn redact_value(value: &Value, extra: &[String]) -> Value {
    match value {
        Value::String(text) => Value::String(redact_text(text, usize::MAX, extra)),
        Value::Array(items) => {
            Value::Array(items.iter().map(|item| redact_value(item, extra)).collect())
        }
        Value::Object(map) => {
            let mut out = JsonMap::new();
            for (key, entry) in map {
                if key == "headers" {
                    if let Some(headers) = entry.as_object() {
                        out.insert(key.clone(), redact_headers(headers, extra));
                        continue;
                    }
                }
                if is_sensitive_key(key) {
                    out.insert(key.clone(), Value::String(DEFAULT_REDACTION.to_string()));
                    continue;
                }
                out.insert(key.clone(), redact_value(entry, extra));
            }
            Value::Object(out)
        }
        _ => value.clone(),
    }
}
