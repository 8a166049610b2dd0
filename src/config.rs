use crate::constants::{cache, model, network};
use std::env;
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_DEFINITIONS_DIR: &str = "./api_definitions";
pub const DEFAULT_SECRET_PREFIX: &str = "APICALL_KEY_";

/// Treats empty, `null` and `undefined` as unset.
pub fn normalize_env_value(value: Option<String>) -> Option<String> {
    let raw = value?;
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    let lowered = trimmed.to_lowercase();
    if lowered == "undefined" || lowered == "null" {
        return None;
    }
    Some(trimmed.to_string())
}

fn env_string(key: &str) -> Option<String> {
    normalize_env_value(env::var(key).ok())
}

fn env_u64(key: &str, default: u64) -> u64 {
    env_string(key)
        .and_then(|raw| raw.parse::<u64>().ok())
        .filter(|value| *value > 0)
        .unwrap_or(default)
}

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub definitions_dir: PathBuf,
    pub request_timeout: Duration,
    pub cache_ttl: Duration,
    pub cache_max_entries: usize,
    pub ollama_url: String,
    pub ollama_model: String,
    pub secret_prefix: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            definitions_dir: PathBuf::from(DEFAULT_DEFINITIONS_DIR),
            request_timeout: Duration::from_millis(network::TIMEOUT_API_REQUEST_MS),
            cache_ttl: Duration::from_millis(cache::DEFAULT_TTL_MS),
            cache_max_entries: cache::DEFAULT_MAX_ENTRIES,
            ollama_url: model::DEFAULT_OLLAMA_URL.to_string(),
            ollama_model: model::DEFAULT_OLLAMA_MODEL.to_string(),
            secret_prefix: DEFAULT_SECRET_PREFIX.to_string(),
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            definitions_dir: env_string("APICALL_DEFINITIONS_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.definitions_dir),
            request_timeout: Duration::from_millis(env_u64(
                "APICALL_REQUEST_TIMEOUT_MS",
                network::TIMEOUT_API_REQUEST_MS,
            )),
            cache_ttl: Duration::from_millis(env_u64("APICALL_CACHE_TTL_MS", cache::DEFAULT_TTL_MS)),
            cache_max_entries: env_u64(
                "APICALL_CACHE_MAX_ENTRIES",
                cache::DEFAULT_MAX_ENTRIES as u64,
            ) as usize,
            ollama_url: env_string("OLLAMA_URL").unwrap_or(defaults.ollama_url),
            ollama_model: env_string("OLLAMA_MODEL").unwrap_or(defaults.ollama_model),
            secret_prefix: env_string("APICALL_SECRET_PREFIX").unwrap_or(defaults.secret_prefix),
        }
    }
}
