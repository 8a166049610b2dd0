use crate::constants::{limits, network, protocols::ALLOWED_HTTP};
use crate::errors::{PipelineError, TransportFailure};
use crate::managers::dispatcher::{ensure_method_allowed, DispatchFailure, Dispatcher};
use crate::models::{ApiCall, ApiDefinition, JsonMap, RequestMetadata, TransportAttempt};
use crate::services::cache::ResponseCache;
use crate::services::logger::Logger;
use crate::services::transport::{headers_to_headermap, HttpTransport, OutboundRequest};
use crate::utils::auth::apply_auth;
use crate::utils::endpoint::{has_relative_segment, match_endpoint};
use crate::utils::params::{resolve_params, stringify_param};
use crate::utils::redact::{redact_headers, redact_query, redact_text, redact_url, redact_value};
use reqwest::Method;
use serde_json::Value;
use std::sync::Arc;
use std::time::{Duration, Instant};
use url::Url;

/// Runs a call against its API: contract check, parameter resolution,
/// authentication, cache lookup, dispatch and response parsing.
#[derive(Clone)]
pub struct CallExecutor {
    logger: Logger,
    cache: Arc<ResponseCache>,
    dispatcher: Dispatcher,
    timeout: Duration,
}

struct PreparedCall {
    method: String,
    path: String,
    url: String,
    display_url: String,
    headers: JsonMap,
    query: JsonMap,
    body: JsonMap,
}

impl CallExecutor {
    pub fn new(
        logger: Logger,
        cache: Arc<ResponseCache>,
        transport: Arc<dyn HttpTransport>,
        timeout: Duration,
    ) -> Self {
        Self {
            dispatcher: Dispatcher::new(logger.clone(), transport),
            logger: logger.child("executor"),
            cache,
            timeout,
        }
    }

    pub fn with_default_timeout(
        logger: Logger,
        cache: Arc<ResponseCache>,
        transport: Arc<dyn HttpTransport>,
    ) -> Self {
        Self::new(
            logger,
            cache,
            transport,
            Duration::from_millis(network::TIMEOUT_API_REQUEST_MS),
        )
    }

    pub fn cache(&self) -> &Arc<ResponseCache> {
        &self.cache
    }

    fn prepare(
        &self,
        api: &ApiDefinition,
        call: &ApiCall,
        secret: Option<&str>,
    ) -> Result<PreparedCall, PipelineError> {
        call.validate()?;
        let mut call = call.clone();
        call.method = call.method.trim().to_uppercase();
        ensure_method_allowed(&call.method)?;

        let endpoint = match_endpoint(api, &call)?;
        let resolved = resolve_params(api, endpoint, &call)?;
        if has_relative_segment(&resolved.endpoint) {
            return Err(PipelineError::contract("Endpoint is not allowed for this API")
                .with_details(serde_json::json!({"endpoint": call.endpoint})));
        }

        let mut headers = JsonMap::new();
        headers.insert(
            "Accept".to_string(),
            Value::String(network::ACCEPT.to_string()),
        );
        for (key, value) in &call.headers {
            headers.insert(key.clone(), value.clone());
        }
        let mut query = resolved.query;
        apply_auth(api, &mut headers, &mut query, secret)?;

        let url = build_url(&api.base_url, &resolved.endpoint, &query)?;
        let display_url = redact_url(&url, &api.auth_key_name, &secret_list(secret));
        Ok(PreparedCall {
            method: call.method,
            path: resolved.endpoint,
            url,
            display_url,
            headers,
            query,
            body: resolved.body,
        })
    }

    fn metadata(
        &self,
        api: &ApiDefinition,
        prepared: &PreparedCall,
        secret: Option<&str>,
        duration_ms: u64,
        status: Option<u16>,
        cache_hit: bool,
        attempts: Vec<TransportAttempt>,
    ) -> RequestMetadata {
        let extra = secret_list(secret);
        RequestMetadata {
            request_id: uuid::Uuid::new_v4().to_string(),
            url: prepared.display_url.clone(),
            method: prepared.method.clone(),
            duration_ms,
            status,
            cache_hit,
            headers: redact_headers(&prepared.headers, &extra),
            query: redact_query(&prepared.query, &api.auth_key_name, &extra),
            body: redact_value(&Value::Object(prepared.body.clone()), &extra),
            attempts,
        }
    }

    /// Executes `call` against `api`, returning the parsed body and redacted
    /// diagnostics. GET responses are served from and written to the cache.
    pub async fn execute(
        &self,
        api: &ApiDefinition,
        call: &ApiCall,
        secret: Option<&str>,
    ) -> Result<(Value, RequestMetadata), PipelineError> {
        let prepared = self.prepare(api, call, secret)?;

        let cache_key = (prepared.method == "GET").then(|| {
            self.cache.build_key(
                &api.name,
                &prepared.path,
                &prepared.method,
                &prepared.query,
                &api.auth_key_name,
                &prepared.body,
            )
        });
        if let Some(key) = cache_key.as_deref() {
            if let Some(cached) = self.cache.get(key) {
                self.logger.debug(
                    "Cache hit",
                    Some(&serde_json::json!({"api": api.name, "path": prepared.path})),
                );
                let meta = self.metadata(api, &prepared, secret, 0, None, true, Vec::new());
                return Ok((cached, meta));
            }
            self.logger.debug(
                "Cache miss",
                Some(&serde_json::json!({"api": api.name, "path": prepared.path})),
            );
        }

        let method = Method::from_bytes(prepared.method.as_bytes())
            .map_err(|_| PipelineError::contract("Unsupported HTTP method"))?;
        let request = OutboundRequest {
            method,
            url: prepared.url.clone(),
            display_url: prepared.display_url.clone(),
            headers: headers_to_headermap(&prepared.headers)?,
            body: (!prepared.body.is_empty()).then(|| Value::Object(prepared.body.clone())),
            timeout: self.timeout,
        };

        let started = Instant::now();
        let report = self.dispatcher.dispatch(&request).await;
        let duration_ms = started.elapsed().as_millis() as u64;

        match report.result {
            Ok(response) => {
                let parsed = parse_body(&response.body);
                if let Some(key) = cache_key.as_deref() {
                    self.cache.put(key, parsed.clone());
                }
                let meta = self.metadata(
                    api,
                    &prepared,
                    secret,
                    duration_ms,
                    Some(response.status),
                    false,
                    report.attempts,
                );
                Ok((parsed, meta))
            }
            Err(failure) => {
                let status = match &failure {
                    DispatchFailure::Status { status, .. } => Some(*status),
                    DispatchFailure::Transport(_) => None,
                };
                let meta = self.metadata(
                    api,
                    &prepared,
                    secret,
                    duration_ms,
                    status,
                    false,
                    report.attempts,
                );
                Err(classify_failure(failure, &secret_list(secret))
                    .with_details(serde_json::json!({"metadata": meta})))
            }
        }
    }
}

/// The raw secret plus its form-encoded spelling, as it appears in a URL.
fn secret_list(secret: Option<&str>) -> Vec<String> {
    let Some(secret) = secret else {
        return Vec::new();
    };
    let mut list = vec![secret.to_string()];
    let encoded: String = url::form_urlencoded::byte_serialize(secret.as_bytes()).collect();
    if encoded != secret {
        list.push(encoded);
    }
    list
}

fn classify_failure(failure: DispatchFailure, secrets: &[String]) -> PipelineError {
    match failure {
        DispatchFailure::Status { status, body } => PipelineError::upstream(
            status,
            format!(
                "API returned an error: {}",
                redact_text(&body, limits::ERROR_BODY_CHARS, secrets)
            ),
        ),
        DispatchFailure::Transport(TransportFailure::Timeout(detail)) => PipelineError::transport(
            format!("API request timed out: {}", redact_text(&detail, usize::MAX, secrets)),
        ),
        DispatchFailure::Transport(other) => PipelineError::transport(format!(
            "API request failed: {}",
            redact_text(&other.to_string(), usize::MAX, secrets)
        )),
    }
}

/// Non-JSON upstream bodies are wrapped rather than treated as failures.
pub fn parse_body(raw: &str) -> Value {
    serde_json::from_str::<Value>(raw)
        .unwrap_or_else(|_| serde_json::json!({"text": raw}))
}

fn scheme_allowed(scheme: &str) -> bool {
    ALLOWED_HTTP
        .iter()
        .any(|allowed| allowed.trim_end_matches(':') == scheme)
}

pub fn build_url(base_url: &str, path: &str, query: &JsonMap) -> Result<String, PipelineError> {
    let joined = format!("{}{}", base_url.trim_end_matches('/'), path);
    let mut url = Url::parse(&joined)
        .map_err(|_| PipelineError::contract(format!("Invalid API URL: {}", base_url)))?;
    if !scheme_allowed(url.scheme()) {
        return Err(PipelineError::contract("Only http/https URLs are supported"));
    }
    if query.values().any(|value| !value.is_null()) {
        let mut pairs = url.query_pairs_mut();
        for (key, value) in query {
            match value {
                Value::Null => {}
                Value::Array(items) => {
                    for item in items {
                        pairs.append_pair(key, &stringify_param(item));
                    }
                }
                other => {
                    pairs.append_pair(key, &stringify_param(other));
                }
            }
        }
    }
    Ok(url.to_string())
}
