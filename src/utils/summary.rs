use crate::constants::limits::{SUMMARY_PREVIEW_FIELDS, SUMMARY_SAMPLE_NAMES, SUMMARY_VALUE_CHARS};
use crate::models::JsonMap;
use crate::utils::text::ellipsize;
use serde_json::Value;

fn format_value(value: &Value) -> String {
    match value {
        Value::Object(map) => format!("object with {} keys", map.len()),
        Value::Array(items) => format!("list with {} items", items.len()),
        Value::String(text) => ellipsize(text, SUMMARY_VALUE_CHARS),
        Value::Null => "None".to_string(),
        other => other.to_string(),
    }
}

fn preview_fields(map: &JsonMap) -> String {
    let preview: Vec<String> = map
        .iter()
        .take(SUMMARY_PREVIEW_FIELDS)
        .map(|(key, value)| format!("{}: {}", key, format_value(value)))
        .collect();
    let extra = if map.len() > SUMMARY_PREVIEW_FIELDS { " …" } else { "" };
    format!("{}{}", preview.join(", "), extra)
}

fn summarize_object(map: &JsonMap) -> String {
    if map.is_empty() {
        return "Received an empty object.".to_string();
    }
    if let Some(results) = map.get("results").and_then(Value::as_array) {
        let names: Vec<String> = results
            .iter()
            .take(SUMMARY_SAMPLE_NAMES)
            .filter_map(|item| {
                let item = item.as_object()?;
                item.get("title")
                    .or_else(|| item.get("name"))
                    .filter(|v| !v.is_null())
                    .map(|v| v.as_str().map(str::to_string).unwrap_or_else(|| v.to_string()))
            })
            .collect();
        if !names.is_empty() {
            let total = map
                .get("total_results")
                .and_then(Value::as_u64)
                .filter(|total| *total > 0)
                .unwrap_or(results.len() as u64);
            return format!(
                "Found {} result(s). Top examples include: {}.",
                total,
                names.join(", ")
            );
        }
    }
    format!(
        "Received an object with {} key(s). Top fields -> {}.",
        map.len(),
        preview_fields(map)
    )
}

fn summarize_list(items: &[Value]) -> String {
    let Some(first) = items.first() else {
        return "Received an empty list.".to_string();
    };
    let prefix = format!("Received a list with {} item(s).", items.len());
    match first {
        Value::Object(map) => format!("{} Sample item -> {}.", prefix, preview_fields(map)),
        Value::Array(_) => prefix,
        _ => {
            let values: Vec<String> = items
                .iter()
                .take(SUMMARY_PREVIEW_FIELDS)
                .map(format_value)
                .collect();
            let extra = if items.len() > SUMMARY_PREVIEW_FIELDS { " …" } else { "" };
            format!("{} Examples -> {}{}.", prefix, values.join(", "), extra)
        }
    }
}

/// Plain-text description of a response, used when no summarizer is wired.
pub fn summarize_response(data: &Value, notes: Option<&str>) -> String {
    let base = match data {
        Value::Object(map) => summarize_object(map),
        Value::Array(items) => summarize_list(items),
        Value::String(text) => text.clone(),
        other => other.to_string(),
    };
    match notes.map(str::trim).filter(|n| !n.is_empty()) {
        Some(notes) => format!("{} {}", notes, base).trim().to_string(),
        None => base,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn results_payload_lists_top_names() {
        let data = json!({"results": [{"title": "Dune"}, {"name": "Arrival"}], "total_results": 120});
        assert_eq!(
            summarize_response(&data, None),
            "Found 120 result(s). Top examples include: Dune, Arrival."
        );
    }

    #[test]
    fn empty_shapes_have_fixed_wording() {
        assert_eq!(summarize_response(&json!({}), None), "Received an empty object.");
        assert_eq!(summarize_response(&json!([]), None), "Received an empty list.");
    }

    #[test]
    fn notes_prefix_the_summary() {
        let out = summarize_response(&json!([1, 2]), Some("Used /all."));
        assert_eq!(out, "Used /all. Received a list with 2 item(s). Examples -> 1, 2.");
    }

    #[test]
    fn object_preview_caps_fields() {
        let data = json!({"a": 1, "b": "x", "c": [1], "d": {"k": 1}, "e": null, "f": true});
        let out = summarize_response(&data, None);
        assert!(out.starts_with("Received an object with 6 key(s)."));
        assert!(out.contains("c: list with 1 items"));
        assert!(out.ends_with(" …."));
    }
}
