use std::collections::HashMap;

/// Source of per-API credentials. Secrets are fetched per call and never
/// retained by the pipeline.
pub trait SecretStore: Send + Sync {
    fn load_secret(&self, api_name: &str) -> Option<String>;
}

/// `weather-api` -> `WEATHER_API`.
pub fn env_key_suffix(api_name: &str) -> String {
    let mut out = String::with_capacity(api_name.len());
    let mut last_underscore = true;
    for ch in api_name.trim().chars() {
        if ch.is_ascii_alphanumeric() {
            out.push(ch.to_ascii_uppercase());
            last_underscore = false;
        } else if !last_underscore {
            out.push('_');
            last_underscore = true;
        }
    }
    out.trim_end_matches('_').to_string()
}

/// Reads `<prefix><API_NAME>` from the process environment.
#[derive(Debug, Clone)]
pub struct EnvSecretStore {
    prefix: String,
}

impl EnvSecretStore {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    pub fn var_name(&self, api_name: &str) -> String {
        format!("{}{}", self.prefix, env_key_suffix(api_name))
    }
}

impl SecretStore for EnvSecretStore {
    fn load_secret(&self, api_name: &str) -> Option<String> {
        std::env::var(self.var_name(api_name))
            .ok()
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
    }
}

#[derive(Debug, Clone, Default)]
pub struct StaticSecretStore {
    secrets: HashMap<String, String>,
}

impl StaticSecretStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_secret(mut self, api_name: &str, secret: &str) -> Self {
        self.secrets.insert(api_name.to_string(), secret.to_string());
        self
    }
}

impl SecretStore for StaticSecretStore {
    fn load_secret(&self, api_name: &str) -> Option<String> {
        self.secrets.get(api_name).cloned()
    }
}
