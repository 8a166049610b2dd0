use crate::errors::{PipelineError, TransportFailure};
use crate::models::JsonMap;
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::{Client, Method};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

/// A fully resolved outbound request. Credentials are already applied to
/// `url`; `display_url` is the redacted form used in logs and diagnostics.
#[derive(Debug, Clone)]
pub struct OutboundRequest {
    pub method: Method,
    pub url: String,
    pub display_url: String,
    pub headers: HeaderMap,
    pub body: Option<Value>,
    pub timeout: Duration,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TransportResponse {
    pub status: u16,
    pub body: String,
}

impl TransportResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Sends one request under one transport configuration. `trust_env` decides
/// whether proxy settings from the environment are honoured.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    async fn send(
        &self,
        request: &OutboundRequest,
        trust_env: bool,
    ) -> Result<TransportResponse, TransportFailure>;
}

/// reqwest-backed transport with one pooled client per configuration.
#[derive(Default)]
pub struct ReqwestTransport {
    clients: Mutex<HashMap<bool, Client>>,
}

impl ReqwestTransport {
    pub fn new() -> Self {
        Self::default()
    }

    fn get_client(&self, trust_env: bool) -> Result<Client, TransportFailure> {
        let mut guard = self.clients.lock().unwrap_or_else(|err| err.into_inner());
        if let Some(existing) = guard.get(&trust_env) {
            return Ok(existing.clone());
        }
        let mut builder = Client::builder()
            .user_agent(crate::constants::network::USER_AGENT)
            .redirect(reqwest::redirect::Policy::limited(10));
        if !trust_env {
            builder = builder.no_proxy();
        }
        let client = builder
            .build()
            .map_err(|err| TransportFailure::Other(format!("Failed to build HTTP client: {}", err)))?;
        guard.insert(trust_env, client.clone());
        Ok(client)
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn send(
        &self,
        request: &OutboundRequest,
        trust_env: bool,
    ) -> Result<TransportResponse, TransportFailure> {
        let client = self.get_client(trust_env)?;
        let mut req = client
            .request(request.method.clone(), request.url.as_str())
            .headers(request.headers.clone())
            .timeout(request.timeout);
        if let Some(body) = request.body.as_ref() {
            req = req.json(body);
        }
        let response = req
            .send()
            .await
            .map_err(|err| TransportFailure::from_reqwest(&err))?;
        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|err| TransportFailure::from_reqwest(&err))?;
        Ok(TransportResponse { status, body })
    }
}

pub fn headers_to_headermap(headers: &JsonMap) -> Result<HeaderMap, PipelineError> {
    let mut map = HeaderMap::new();
    for (key, value) in headers {
        let rendered = match value {
            Value::Null => continue,
            Value::String(text) => text.clone(),
            other => other.to_string(),
        };
        let name = HeaderName::from_bytes(key.as_bytes())
            .map_err(|_| PipelineError::validation(format!("Invalid header name: {}", key)))?;
        let val = HeaderValue::from_str(&rendered)
            .map_err(|_| PipelineError::validation(format!("Invalid header value for {}", key)))?;
        map.insert(name, val);
    }
    Ok(map)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_conversion_rejects_bad_names_and_skips_nulls() {
        let headers = serde_json::json!({"Accept": "application/json", "X-Count": 3, "X-None": null})
            .as_object()
            .cloned()
            .unwrap_or_default();
        let map = headers_to_headermap(&headers).expect("headers");
        assert_eq!(map.len(), 2);
        assert_eq!(map.get("x-count").and_then(|v| v.to_str().ok()), Some("3"));

        let bad = serde_json::json!({"bad header": "x"})
            .as_object()
            .cloned()
            .unwrap_or_default();
        assert_eq!(headers_to_headermap(&bad).unwrap_err().status, 400);
    }

    #[test]
    fn success_range_is_2xx() {
        let ok = TransportResponse { status: 204, body: String::new() };
        let redirect = TransportResponse { status: 304, body: String::new() };
        assert!(ok.is_success());
        assert!(!redirect.is_success());
    }
}
