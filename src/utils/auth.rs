use crate::constants::auth::{RAPIDAPI_HOST_HEADER, RAPIDAPI_KEY_HEADER};
use crate::errors::PipelineError;
use crate::models::{ApiDefinition, AuthType, JsonMap};
use serde_json::Value;
use url::Url;

fn has_header(headers: &JsonMap, name: &str) -> bool {
    headers.keys().any(|key| key.eq_ignore_ascii_case(name))
}

fn set_header_default(headers: &mut JsonMap, name: &str, value: String) {
    if !has_header(headers, name) {
        headers.insert(name.to_string(), Value::String(value));
    }
}

/// Adds credentials per the API's declared strategy. Values the caller
/// already supplied are left untouched.
pub fn apply_auth(
    api: &ApiDefinition,
    headers: &mut JsonMap,
    query: &mut JsonMap,
    secret: Option<&str>,
) -> Result<(), PipelineError> {
    if api.auth_type == AuthType::None {
        return Ok(());
    }
    let secret = secret
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| PipelineError::unauthorized("API key not configured for this API"))?;

    match api.auth_type {
        AuthType::None => {}
        AuthType::Query => {
            if !query.contains_key(&api.auth_key_name) {
                query.insert(api.auth_key_name.clone(), Value::String(secret.to_string()));
            }
        }
        AuthType::Rapidapi => {
            let host = Url::parse(&api.base_url)
                .ok()
                .and_then(|url| url.host_str().map(str::to_string))
                .filter(|host| !host.is_empty())
                .ok_or_else(|| {
                    PipelineError::auth_config("RapidAPI base_url must include a host")
                })?;
            set_header_default(headers, RAPIDAPI_KEY_HEADER, secret.to_string());
            set_header_default(headers, RAPIDAPI_HOST_HEADER, host);
        }
        AuthType::Header | AuthType::Other => {
            set_header_default(headers, "Authorization", format!("Bearer {}", secret));
        }
    }
    Ok(())
}
