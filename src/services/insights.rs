//! Heuristic ranking of list-shaped API responses.
//!
//! Extraction never fails: anything that cannot be coerced is skipped and the
//! result degrades to empty lists and counts.

use crate::constants::insights::{DATE_KEYS, LIST_KEYS, METADATA_KEYS, NAME_KEYS, TOP_ITEMS};
use crate::models::JsonMap;
use chrono::NaiveDate;
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;

/// One group of interchangeable sort fields, tried in order.
pub struct SortCandidate {
    pub keys: &'static [&'static str],
    pub descending: bool,
}

pub struct DomainRule {
    pub tag: &'static str,
    pub keywords: &'static [&'static str],
    pub sort_candidates: &'static [SortCandidate],
}

pub const DOMAIN_RULES: &[DomainRule] = &[
    DomainRule {
        tag: "movies",
        keywords: &["movie", "film", "tmdb", "tv"],
        sort_candidates: &[
            SortCandidate { keys: &["vote_average", "rating"], descending: true },
            SortCandidate { keys: &["popularity"], descending: true },
            SortCandidate { keys: &["release_date", "first_air_date"], descending: true },
        ],
    },
    DomainRule {
        tag: "finance",
        keywords: &["coin", "stock", "finance", "crypto", "market"],
        sort_candidates: &[
            SortCandidate { keys: &["market_cap", "marketCap"], descending: true },
            SortCandidate {
                keys: &["current_price", "regularMarketPrice", "price"],
                descending: true,
            },
            SortCandidate { keys: &["price_change_24h"], descending: true },
        ],
    },
    DomainRule {
        tag: "weather",
        keywords: &["weather", "forecast", "temperature", "rain"],
        sort_candidates: &[
            SortCandidate { keys: &["temp", "temperature"], descending: true },
            SortCandidate { keys: &["humidity"], descending: true },
        ],
    },
];

pub static GENERIC_RULE: DomainRule = DomainRule {
    tag: "generic",
    keywords: &[],
    sort_candidates: &[SortCandidate {
        keys: &["score", "rank", "popularity"],
        descending: true,
    }],
};

/// Named bests computed independently of the ranking.
const METRIC_RULES: &[(&str, &str, bool)] = &[
    ("top_by_rating", "vote_average", true),
    ("top_by_popularity", "popularity", true),
    ("lowest_price", "current_price", false),
    ("highest_market_cap", "market_cap", true),
];

#[derive(Debug, Clone, Default)]
pub struct InsightContext {
    pub user_query: String,
    pub api_name: String,
}

impl InsightContext {
    pub fn new(user_query: impl Into<String>, api_name: impl Into<String>) -> Self {
        Self {
            user_query: user_query.into(),
            api_name: api_name.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct RankedItem {
    pub rank: usize,
    pub name: String,
    pub score_key: String,
    pub score: f64,
    pub metadata: JsonMap,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct MetricValue {
    pub name: String,
    pub value: Value,
    pub raw: Value,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Insight {
    pub domain: String,
    pub item_count: usize,
    pub top_items: Vec<RankedItem>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub metrics: BTreeMap<String, MetricValue>,
}

pub fn as_number(value: &Value) -> Option<f64> {
    let number = match value {
        Value::Number(num) => num.as_f64(),
        Value::String(text) => text.replace(',', "").trim().parse::<f64>().ok(),
        _ => None,
    }?;
    number.is_finite().then_some(number)
}

pub fn as_date(value: &Value) -> Option<NaiveDate> {
    let text = value.as_str()?.trim();
    if let Some(day) = text.get(..10) {
        for format in ["%Y-%m-%d", "%Y/%m/%d"] {
            if let Ok(date) = NaiveDate::parse_from_str(day, format) {
                return Some(date);
            }
        }
    }
    if let Some(month) = text.get(..7) {
        if let Ok(date) = NaiveDate::parse_from_str(&format!("{}-01", month), "%Y-%m-%d") {
            return Some(date);
        }
    }
    let year = text.get(..4)?;
    if !year.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    NaiveDate::from_ymd_opt(year.parse().ok()?, 1, 1)
}

pub fn list_items(payload: &Value) -> &[Value] {
    match payload {
        Value::Array(items) => items.as_slice(),
        Value::Object(map) => LIST_KEYS
            .iter()
            .find_map(|key| map.get(*key).and_then(Value::as_array))
            .map(Vec::as_slice)
            .unwrap_or(&[]),
        _ => &[],
    }
}

pub fn infer_domain(context: &InsightContext) -> &'static DomainRule {
    let text = format!("{} {}", context.user_query, context.api_name).to_lowercase();
    DOMAIN_RULES
        .iter()
        .find(|rule| rule.keywords.iter().any(|word| text.contains(word)))
        .unwrap_or(&GENERIC_RULE)
}

pub fn item_name(item: &JsonMap) -> String {
    for key in NAME_KEYS {
        match item.get(*key) {
            None | Some(Value::Null) | Some(Value::Bool(false)) => continue,
            Some(Value::String(text)) if text.is_empty() => continue,
            Some(Value::String(text)) => return text.clone(),
            Some(Value::Number(num)) if num.as_f64() == Some(0.0) => continue,
            Some(other) => return other.to_string(),
        }
    }
    "item".to_string()
}

fn choose_sort_key(items: &[&JsonMap], rule: &DomainRule) -> Option<(&'static str, bool)> {
    rule.sort_candidates.iter().find_map(|candidate| {
        candidate
            .keys
            .iter()
            .find(|key| items.iter().any(|item| item.contains_key(**key)))
            .map(|key| (*key, candidate.descending))
    })
}

fn rank_items(items: &[&JsonMap], key: &str, descending: bool) -> Vec<RankedItem> {
    let mut scored: Vec<(f64, &JsonMap)> = items
        .iter()
        .filter_map(|item| item.get(key).and_then(as_number).map(|score| (score, *item)))
        .collect();
    scored.sort_by(|a, b| {
        let ord = a.0.partial_cmp(&b.0).unwrap_or(std::cmp::Ordering::Equal);
        if descending {
            ord.reverse()
        } else {
            ord
        }
    });
    scored
        .into_iter()
        .take(TOP_ITEMS)
        .enumerate()
        .map(|(idx, (score, item))| RankedItem {
            rank: idx + 1,
            name: item_name(item),
            score_key: key.to_string(),
            score,
            metadata: item
                .iter()
                .filter(|(field, _)| field.as_str() == key || METADATA_KEYS.contains(&field.as_str()))
                .map(|(field, value)| (field.clone(), value.clone()))
                .collect(),
        })
        .collect()
}

fn best_by<'a, K: PartialOrd>(
    items: &[&'a JsonMap],
    score: impl Fn(&JsonMap) -> Option<K>,
    highest: bool,
) -> Option<&'a JsonMap> {
    let mut best: Option<(K, &'a JsonMap)> = None;
    for item in items {
        let Some(value) = score(*item) else {
            continue;
        };
        let better = match &best {
            None => true,
            Some((current, _)) if highest => value > *current,
            Some((current, _)) => value < *current,
        };
        if better {
            best = Some((value, *item));
        }
    }
    best.map(|(_, item)| item)
}

fn metric(item: &JsonMap, key: &str) -> MetricValue {
    MetricValue {
        name: item_name(item),
        value: item.get(key).cloned().unwrap_or(Value::Null),
        raw: Value::Object(item.clone()),
    }
}

fn collect_metrics(items: &[&JsonMap]) -> BTreeMap<String, MetricValue> {
    let mut metrics = BTreeMap::new();
    for (label, key, highest) in METRIC_RULES {
        let best = best_by(items, |item| item.get(*key).and_then(as_number), *highest);
        if let Some(item) = best {
            metrics.insert(label.to_string(), metric(item, key));
        }
    }
    for key in DATE_KEYS {
        if let Some(item) = best_by(items, |item| item.get(*key).and_then(as_date), true) {
            metrics.insert("most_recent".to_string(), metric(item, key));
            break;
        }
    }
    metrics
}

/// Finds the list inside `payload`, guesses its domain from the request
/// context, and returns the top items plus domain metrics.
pub fn extract_insights(payload: &Value, context: &InsightContext) -> Insight {
    let raw_items = list_items(payload);
    let items: Vec<&JsonMap> = raw_items.iter().filter_map(Value::as_object).collect();
    let rule = infer_domain(context);

    let top_items = choose_sort_key(&items, rule)
        .map(|(key, descending)| rank_items(&items, key, descending))
        .unwrap_or_default();

    Insight {
        domain: rule.tag.to_string(),
        item_count: raw_items.len(),
        top_items,
        metrics: collect_metrics(&items),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn movies() -> InsightContext {
        InsightContext::new("top rated movies", "tmdb")
    }

    #[test]
    fn ranks_movies_by_vote_average() {
        let payload = json!([
            {"name": "B", "vote_average": 7},
            {"name": "A", "vote_average": 9},
        ]);
        let insight = extract_insights(&payload, &movies());
        assert_eq!(insight.domain, "movies");
        assert_eq!(insight.top_items[0].name, "A");
        assert_eq!(insight.top_items[0].score, 9.0);
        assert_eq!(insight.top_items[0].rank, 1);
        assert_eq!(insight.top_items[1].rank, 2);
        assert_eq!(insight.metrics["top_by_rating"].name, "A");
    }

    #[test]
    fn empty_and_scalar_payloads_degrade() {
        let empty = extract_insights(&json!([]), &movies());
        assert_eq!(empty.item_count, 0);
        assert!(empty.top_items.is_empty());
        assert!(empty.metrics.is_empty());

        let scalar = extract_insights(&json!("hello"), &InsightContext::default());
        assert_eq!(scalar.domain, "generic");
        assert_eq!(scalar.item_count, 0);
    }

    #[test]
    fn non_numeric_scores_are_skipped() {
        let payload = json!({"results": [
            {"title": "X", "vote_average": "n/a"},
            {"title": "Y", "vote_average": null},
        ]});
        let insight = extract_insights(&payload, &movies());
        assert_eq!(insight.item_count, 2);
        assert!(insight.top_items.is_empty());
    }

    #[test]
    fn list_is_found_under_known_keys() {
        let payload = json!({"page": 1, "data": [{"symbol": "BTC", "market_cap": "1,200,000"}]});
        let insight = extract_insights(&payload, &InsightContext::new("crypto", "coingecko"));
        assert_eq!(insight.domain, "finance");
        assert_eq!(insight.top_items[0].name, "BTC");
        assert_eq!(insight.top_items[0].score, 1_200_000.0);
        assert_eq!(insight.metrics["highest_market_cap"].name, "BTC");
    }

    #[test]
    fn top_items_are_capped_and_metadata_filtered() {
        let items: Vec<Value> = (0..8)
            .map(|idx| json!({"title": format!("m{}", idx), "popularity": idx, "secret_field": true}))
            .collect();
        let insight = extract_insights(&Value::Array(items), &movies());
        assert_eq!(insight.top_items.len(), 5);
        assert_eq!(insight.top_items[0].name, "m7");
        assert_eq!(insight.top_items[0].score_key, "popularity");
        assert!(!insight.top_items[0].metadata.contains_key("secret_field"));
        assert!(insight.top_items[0].metadata.contains_key("popularity"));
    }

    #[test]
    fn most_recent_uses_first_parseable_date_field() {
        let payload = json!([
            {"title": "old", "release_date": "1999-03-31"},
            {"title": "new", "release_date": "2021/10/22"},
            {"title": "vague", "release_date": "2020"},
            {"title": "junk", "release_date": "soon"},
        ]);
        let insight = extract_insights(&payload, &movies());
        assert_eq!(insight.metrics["most_recent"].name, "new");
        assert_eq!(insight.metrics["most_recent"].value, "2021/10/22");
    }

    #[test]
    fn lowest_price_prefers_smallest_value() {
        let payload = json!([
            {"id": "a", "current_price": 10.5},
            {"id": "b", "current_price": "2.25"},
        ]);
        let insight = extract_insights(&payload, &InsightContext::new("cheapest coin", "x"));
        assert_eq!(insight.metrics["lowest_price"].name, "b");
    }

    #[test]
    fn date_coercion_accepts_known_shapes() {
        assert!(as_date(&json!("2024-01-15T10:00:00Z")).is_some());
        assert_eq!(as_date(&json!("2024-02")), NaiveDate::from_ymd_opt(2024, 2, 1));
        assert_eq!(as_date(&json!("1987")), NaiveDate::from_ymd_opt(1987, 1, 1));
        assert!(as_date(&json!("n/a")).is_none());
        assert!(as_date(&json!(2020)).is_none());
    }
}
