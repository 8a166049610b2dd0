use crate::errors::PipelineError;
use crate::models::{ApiCall, ApiDefinition, ExampleEndpoint};
use once_cell::sync::Lazy;
use regex::Regex;

static PLACEHOLDER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{[^{}/]*\}").expect("placeholder regex"));

/// Drops any query string and trailing slashes. An empty result becomes `/`.
pub fn normalize_path(path: &str) -> String {
    let without_query = path.split('?').next().unwrap_or("");
    let trimmed = without_query.trim_end_matches('/');
    if trimmed.is_empty() {
        "/".to_string()
    } else {
        trimmed.to_string()
    }
}

/// Compiles an example path into an anchored pattern where each `{name}`
/// matches exactly one path segment.
pub fn template_pattern(template: &str) -> Regex {
    let normalized = normalize_path(template);
    let mut pattern = String::from("^");
    let mut last = 0;
    for found in PLACEHOLDER.find_iter(&normalized) {
        pattern.push_str(&regex::escape(&normalized[last..found.start()]));
        pattern.push_str("[^/]+");
        last = found.end();
    }
    pattern.push_str(&regex::escape(&normalized[last..]));
    pattern.push('$');
    // Every literal piece is escaped, so the pattern is always valid.
    Regex::new(&pattern).unwrap_or_else(|_| Regex::new("^$").expect("empty pattern"))
}

pub fn is_dot_segment(segment: &str) -> bool {
    segment == "." || segment == ".."
}

/// True when a URL parser would collapse part of `path`: a `.`/`..` segment,
/// also when percent-encoded, or a backslash, which http URLs treat as `/`.
pub fn has_relative_segment(path: &str) -> bool {
    path.split('/').any(|segment| {
        let decoded = urlencoding::decode(segment)
            .map(|cow| cow.into_owned())
            .unwrap_or_else(|_| segment.to_string());
        segment.contains('\\') || is_dot_segment(decoded.trim())
    })
}

pub fn endpoint_matches(endpoint: &ExampleEndpoint, path: &str, method: &str) -> bool {
    if endpoint.method != method {
        return false;
    }
    let normalized = normalize_path(path);
    if has_relative_segment(&normalized) {
        return false;
    }
    template_pattern(&endpoint.path).is_match(&normalized)
}

/// Finds the declared endpoint a call targets. Anything outside the declared
/// surface is rejected.
pub fn match_endpoint<'a>(
    api: &'a ApiDefinition,
    call: &ApiCall,
) -> Result<&'a ExampleEndpoint, PipelineError> {
    api.example_endpoints
        .iter()
        .find(|endpoint| endpoint_matches(endpoint, &call.endpoint, &call.method))
        .ok_or_else(|| {
            PipelineError::contract(
                "Endpoint or method not recognized for this API. Please adjust your request.",
            )
            .with_details(serde_json::json!({
                "api": api.name,
                "endpoint": call.endpoint,
                "method": call.method,
            }))
        })
}
