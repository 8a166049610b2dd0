use crate::errors::PipelineError;
use crate::models::{ApiCall, ApiDefinition, ExampleEndpoint, JsonMap};
use crate::utils::endpoint::{is_dot_segment, normalize_path};
use serde_json::Value;

/// Query parameters injected for a known API when the model leaves them out.
pub struct DefaultParamRule {
    pub api: &'static str,
    pub endpoint: &'static str,
    pub param: &'static str,
    pub value: &'static str,
}

/// restcountries v3.1 rejects `/all` without an explicit field selection.
pub const DEFAULT_PARAM_RULES: &[DefaultParamRule] = &[DefaultParamRule {
    api: "restcountries",
    endpoint: "/all",
    param: "fields",
    value: "name,cca2,region,population",
}];

/// Call parts after substitution, filtering and defaulting.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedParams {
    pub endpoint: String,
    pub query: JsonMap,
    pub body: JsonMap,
}

pub fn stringify_param(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(text) => text.clone(),
        Value::Number(num) => num.to_string(),
        Value::Bool(flag) => flag.to_string(),
        _ => serde_json::to_string(value).unwrap_or_default(),
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TemplateError {
    Missing(String),
    /// The value for this key would become a `.` or `..` segment.
    DotSegment(String),
}

/// Replaces every `{key}` in `template` with the percent-encoded value from
/// `params`.
pub fn fill_path_template(template: &str, params: &JsonMap) -> Result<String, TemplateError> {
    let mut out = String::new();
    let mut rest = template;
    while let Some(start) = rest.find('{') {
        let (prefix, tail) = rest.split_at(start);
        out.push_str(prefix);
        let Some(end) = tail.find('}') else {
            out.push_str(tail);
            rest = "";
            break;
        };
        let key = tail[1..end].trim();
        let Some(value) = params.get(key).filter(|value| !value.is_null()) else {
            return Err(TemplateError::Missing(key.to_string()));
        };
        let raw = stringify_param(value);
        if is_dot_segment(raw.trim()) {
            return Err(TemplateError::DotSegment(key.to_string()));
        }
        out.push_str(&urlencoding::encode(&raw));
        rest = &tail[end + 1..];
    }
    out.push_str(rest);
    Ok(out)
}

pub fn filter_allowed(params: &JsonMap, allowed: Option<&[String]>) -> JsonMap {
    match allowed {
        None => params.clone(),
        Some(allowed) => params
            .iter()
            .filter(|(key, _)| allowed.iter().any(|name| name == *key))
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect(),
    }
}

fn is_allowed(endpoint: &ExampleEndpoint, param: &str) -> bool {
    endpoint
        .allowed_query_params
        .as_ref()
        .map(|allowed| allowed.iter().any(|name| name == param))
        .unwrap_or(true)
}

pub fn apply_default_params(api: &ApiDefinition, endpoint: &ExampleEndpoint, query: &mut JsonMap) {
    let api_name = api.name.to_lowercase();
    for rule in DEFAULT_PARAM_RULES {
        if rule.api != api_name || endpoint.path != rule.endpoint {
            continue;
        }
        if !is_allowed(endpoint, rule.param) || query.contains_key(rule.param) {
            continue;
        }
        query.insert(rule.param.to_string(), Value::String(rule.value.to_string()));
    }
}

pub fn resolve_params(
    api: &ApiDefinition,
    endpoint: &ExampleEndpoint,
    call: &ApiCall,
) -> Result<ResolvedParams, PipelineError> {
    let filled = fill_path_template(&call.endpoint, &call.path_params).map_err(|err| match err {
        TemplateError::Missing(key) => {
            PipelineError::validation(format!("Missing path parameter: {}", key))
                .with_details(serde_json::json!({"endpoint": call.endpoint, "missing": key}))
        }
        TemplateError::DotSegment(key) => PipelineError::validation(format!(
            "Path parameter {} cannot be a relative segment",
            key
        )),
    })?;
    let path = normalize_path(&filled);
    let mut query = filter_allowed(&call.query, endpoint.allowed_query_params.as_deref());
    let body = filter_allowed(&call.body, endpoint.allowed_body_params.as_deref());
    apply_default_params(api, endpoint, &mut query);
    Ok(ResolvedParams {
        endpoint: path,
        query,
        body,
    })
}
