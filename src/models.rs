use crate::errors::PipelineError;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

pub type JsonMap = Map<String, Value>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum AuthType {
    #[default]
    None,
    Header,
    Query,
    Rapidapi,
    /// Any declared strategy we do not know; treated like `header`.
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExampleEndpoint {
    pub name: String,
    pub path: String,
    pub method: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allowed_query_params: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allowed_body_params: Option<Vec<String>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiDefinition {
    pub name: String,
    pub base_url: String,
    #[serde(default)]
    pub auth_type: AuthType,
    #[serde(default = "default_auth_key_name")]
    pub auth_key_name: String,
    #[serde(default)]
    pub example_endpoints: Vec<ExampleEndpoint>,
}

fn default_auth_key_name() -> String {
    "api_key".to_string()
}

/// A concrete call against one API, either proposed by the model or supplied
/// verbatim by a caller.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ApiCall {
    pub endpoint: String,
    pub method: String,
    #[serde(default, deserialize_with = "object_or_null")]
    pub headers: JsonMap,
    #[serde(default, deserialize_with = "object_or_null")]
    pub path_params: JsonMap,
    #[serde(default, deserialize_with = "object_or_null")]
    pub query: JsonMap,
    #[serde(default, deserialize_with = "object_or_null")]
    pub body: JsonMap,
    #[serde(default, deserialize_with = "string_or_null")]
    pub notes: String,
}

impl ApiCall {
    pub fn new(endpoint: impl Into<String>, method: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            method: method.into(),
            headers: JsonMap::new(),
            path_params: JsonMap::new(),
            query: JsonMap::new(),
            body: JsonMap::new(),
            notes: String::new(),
        }
    }

    pub fn validate(&self) -> Result<(), PipelineError> {
        if !self.endpoint.starts_with('/') {
            return Err(PipelineError::validation(
                "endpoint must start with a slash, e.g. /data",
            ));
        }
        Ok(())
    }
}

fn object_or_null<'de, D>(deserializer: D) -> Result<JsonMap, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<JsonMap>::deserialize(deserializer)?.unwrap_or_default())
}

fn string_or_null<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(text)) => text,
        Some(other) => other.to_string(),
    })
}

/// One dispatch attempt under a single transport configuration.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct TransportAttempt {
    pub trust_env: bool,
    pub outcome: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub duration_ms: u64,
}

/// Per-call diagnostics. Headers, query and body are already redacted.
#[derive(Debug, Clone, Serialize)]
pub struct RequestMetadata {
    pub request_id: String,
    pub url: String,
    pub method: String,
    pub duration_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
    pub cache_hit: bool,
    pub headers: Value,
    pub query: Value,
    pub body: Value,
    pub attempts: Vec<TransportAttempt>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_auth_type_deserializes_as_other() {
        let def: ApiDefinition = serde_json::from_value(serde_json::json!({
            "name": "x",
            "base_url": "https://example.com",
            "auth_type": "oauth2",
        }))
        .expect("definition");
        assert_eq!(def.auth_type, AuthType::Other);
        assert_eq!(def.auth_key_name, "api_key");
        assert!(def.example_endpoints.is_empty());
    }

    #[test]
    fn api_call_accepts_null_maps_and_non_string_notes() {
        let call: ApiCall = serde_json::from_value(serde_json::json!({
            "endpoint": "/x",
            "method": "GET",
            "body": null,
            "notes": 42,
        }))
        .expect("call");
        assert!(call.body.is_empty());
        assert_eq!(call.notes, "42");
    }

    #[test]
    fn endpoint_without_leading_slash_is_rejected() {
        let call = ApiCall::new("data", "GET");
        assert_eq!(call.validate().unwrap_err().status, 400);
    }
}
