use crate::errors::PipelineError;
use crate::models::{ApiCall, JsonMap};
use crate::utils::json_repair::parse_with_repairs;
use crate::utils::params::{fill_path_template, TemplateError};
use serde_json::Value;

const MAP_KEYS: &[&str] = &["headers", "query", "body", "path_params"];

/// Guarantees the call keys exist with the right shapes. `query_params` is
/// accepted as a legacy spelling of `query`.
pub fn normalize_schema(mut raw: JsonMap) -> JsonMap {
    if !raw.get("query").map(Value::is_object).unwrap_or(false) {
        if let Some(legacy) = raw.remove("query_params") {
            raw.insert("query".to_string(), legacy);
        }
    }
    raw.remove("query_params");

    for key in MAP_KEYS {
        let valid = raw.get(*key).map(Value::is_object).unwrap_or(false);
        if !valid {
            raw.insert(key.to_string(), Value::Object(JsonMap::new()));
        }
    }

    let endpoint = match raw.get("endpoint") {
        Some(Value::String(text)) => text.trim().to_string(),
        _ => String::new(),
    };
    raw.insert("endpoint".to_string(), Value::String(endpoint));

    let method = match raw.get("method") {
        Some(Value::String(text)) => text.trim().to_uppercase(),
        _ => String::new(),
    };
    raw.insert("method".to_string(), Value::String(method));

    let notes = match raw.get("notes") {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(text)) => text.clone(),
        Some(other) => other.to_string(),
    };
    raw.insert("notes".to_string(), Value::String(notes));
    raw
}

/// Turns raw model text into a well-formed call with its path placeholders
/// already substituted.
pub fn normalize_model_output(text: &str) -> Result<ApiCall, PipelineError> {
    let (parsed, _stage) = parse_with_repairs(text)
        .ok_or_else(|| PipelineError::model_output("The model response was not valid JSON."))?;
    let raw = match parsed {
        Value::Object(map) => map,
        _ => return Err(PipelineError::model_output("The model response was not a JSON object.")),
    };
    let normalized = normalize_schema(raw);
    let mut call: ApiCall = serde_json::from_value(Value::Object(normalized))
        .map_err(|err| PipelineError::model_output(format!("Model JSON failed validation: {}", err)))?;

    call.endpoint = fill_path_template(&call.endpoint, &call.path_params).map_err(|err| match err {
        TemplateError::Missing(key) => PipelineError::model_output(format!(
            "Model JSON failed validation: missing path parameter '{}'",
            key
        )),
        TemplateError::DotSegment(key) => PipelineError::model_output(format!(
            "Model JSON failed validation: path parameter '{}' cannot be a relative segment",
            key
        )),
    })?;
    call.validate().map_err(|err| {
        PipelineError::model_output(format!("Model JSON failed validation: {}", err.message))
    })?;
    Ok(call)
}
