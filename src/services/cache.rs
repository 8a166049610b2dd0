use crate::constants::cache as cache_constants;
use crate::models::JsonMap;
use crate::services::logger::Logger;
use crate::utils::endpoint::normalize_path;
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

struct CacheEntry {
    inserted_at: Instant,
    seq: u64,
    value: Value,
}

#[derive(Default)]
struct CacheState {
    entries: HashMap<String, CacheEntry>,
    next_seq: u64,
    hits: u64,
    misses: u64,
    writes: u64,
    evictions: u64,
}

/// Bounded in-memory memo of GET responses. Every read and write prunes
/// expired entries and then trims the oldest until the map fits, all under a
/// single lock.
pub struct ResponseCache {
    logger: Logger,
    ttl: Duration,
    max_entries: usize,
    state: Mutex<CacheState>,
}

impl ResponseCache {
    pub fn new(logger: Logger, ttl: Duration, max_entries: usize) -> Self {
        Self {
            logger: logger.child("cache"),
            ttl,
            max_entries,
            state: Mutex::new(CacheState::default()),
        }
    }

    pub fn with_defaults(logger: Logger) -> Self {
        Self::new(
            logger,
            Duration::from_millis(cache_constants::DEFAULT_TTL_MS),
            cache_constants::DEFAULT_MAX_ENTRIES,
        )
    }

    /// Canonical key for a GET call. The auth query parameter is excluded so
    /// the key does not depend on credentials.
    pub fn build_key(
        &self,
        api_name: &str,
        path: &str,
        method: &str,
        query: &JsonMap,
        auth_key_name: &str,
        body: &JsonMap,
    ) -> String {
        let mut query = query.clone();
        query.remove(auth_key_name);
        let payload = serde_json::json!({
            "api": api_name,
            "path": normalize_path(path),
            "method": method.to_uppercase(),
            "query": query,
            "body": body,
        });
        let mut hasher = Sha256::new();
        hasher.update(stable_stringify(&payload).as_bytes());
        hex::encode(hasher.finalize())
    }

    fn prune(&self, state: &mut CacheState, now: Instant) {
        let ttl = self.ttl;
        let before = state.entries.len();
        state
            .entries
            .retain(|_, entry| now.saturating_duration_since(entry.inserted_at) < ttl);
        let mut evicted = (before - state.entries.len()) as u64;

        while state.entries.len() > self.max_entries {
            let oldest = state
                .entries
                .iter()
                .min_by_key(|(_, entry)| (entry.inserted_at, entry.seq))
                .map(|(key, _)| key.clone());
            match oldest {
                Some(key) => {
                    state.entries.remove(&key);
                    evicted += 1;
                }
                None => break,
            }
        }
        if evicted > 0 {
            state.evictions += evicted;
            self.logger.debug(
                "Cache entries evicted",
                Some(&serde_json::json!({"evicted": evicted, "remaining": state.entries.len()})),
            );
        }
    }

    pub fn get(&self, key: &str) -> Option<Value> {
        let mut state = self.state.lock().unwrap_or_else(|err| err.into_inner());
        self.prune(&mut state, Instant::now());
        let found = state.entries.get(key).map(|entry| entry.value.clone());
        if found.is_some() {
            state.hits += 1;
        } else {
            state.misses += 1;
        }
        found
    }

    pub fn put(&self, key: &str, value: Value) {
        let mut state = self.state.lock().unwrap_or_else(|err| err.into_inner());
        let seq = state.next_seq;
        state.next_seq += 1;
        state.entries.insert(
            key.to_string(),
            CacheEntry {
                inserted_at: Instant::now(),
                seq,
                value,
            },
        );
        state.writes += 1;
        self.prune(&mut state, Instant::now());
    }

    pub fn len(&self) -> usize {
        let state = self.state.lock().unwrap_or_else(|err| err.into_inner());
        state.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, key: &str) -> bool {
        let state = self.state.lock().unwrap_or_else(|err| err.into_inner());
        state.entries.contains_key(key)
    }

    pub fn stats(&self) -> Value {
        let state = self.state.lock().unwrap_or_else(|err| err.into_inner());
        serde_json::json!({
            "entries": state.entries.len(),
            "max_entries": self.max_entries,
            "ttl_ms": self.ttl.as_millis() as u64,
            "hits": state.hits,
            "misses": state.misses,
            "writes": state.writes,
            "evictions": state.evictions,
        })
    }
}

fn stable_stringify(value: &Value) -> String {
    match value {
        Value::Null => "null".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => serde_json::to_string(s).unwrap_or_else(|_| s.clone()),
        Value::Array(arr) => {
            let inner: Vec<String> = arr.iter().map(stable_stringify).collect();
            format!("[{}]", inner.join(","))
        }
        Value::Object(map) => {
            let mut keys: Vec<_> = map.keys().collect();
            keys.sort();
            let inner: Vec<String> = keys
                .iter()
                .map(|key| {
                    format!(
                        "{}:{}",
                        serde_json::to_string(key).unwrap_or_default(),
                        stable_stringify(&map[*key])
                    )
                })
                .collect();
            format!("{{{}}}", inner.join(","))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn cache(ttl_ms: u64, max: usize) -> ResponseCache {
        ResponseCache::new(Logger::new("test"), Duration::from_millis(ttl_ms), max)
    }

    fn map(value: Value) -> JsonMap {
        value.as_object().cloned().unwrap_or_default()
    }

    #[test]
    fn overflow_keeps_most_recent_entries() {
        let cache = cache(60_000, 3);
        for idx in 0..5 {
            cache.put(&format!("k{}", idx), json!(idx));
        }
        assert_eq!(cache.len(), 3);
        assert!(!cache.contains("k0"));
        assert!(!cache.contains("k1"));
        for idx in 2..5 {
            assert_eq!(cache.get(&format!("k{}", idx)), Some(json!(idx)));
        }
        assert_eq!(cache.stats()["evictions"], 2);
    }

    #[test]
    fn expired_entries_are_gone_for_good() {
        let cache = cache(30, 8);
        cache.put("k", json!({"a": 1}));
        assert!(cache.get("k").is_some());
        std::thread::sleep(Duration::from_millis(60));
        assert!(cache.get("k").is_none());
        assert!(cache.get("k").is_none());
        assert!(cache.is_empty());
    }

    #[test]
    fn key_ignores_auth_param_and_query_order() {
        let cache = cache(1_000, 8);
        let a = cache.build_key(
            "weather",
            "/weather/",
            "get",
            &map(json!({"q": "tokyo", "units": "metric", "appid": "secret"})),
            "appid",
            &JsonMap::new(),
        );
        let b = cache.build_key(
            "weather",
            "/weather",
            "GET",
            &map(json!({"units": "metric", "q": "tokyo"})),
            "appid",
            &JsonMap::new(),
        );
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);

        let other = cache.build_key(
            "weather",
            "/weather",
            "GET",
            &map(json!({"q": "osaka", "units": "metric"})),
            "appid",
            &JsonMap::new(),
        );
        assert_ne!(a, other);
    }

    #[test]
    fn stable_stringify_sorts_nested_keys() {
        let left = stable_stringify(&json!({"b": {"y": 1, "x": 2}, "a": [1, "two"]}));
        assert_eq!(left, r#"{"a":[1,"two"],"b":{"x":2,"y":1}}"#);
    }

    #[test]
    fn concurrent_writers_never_exceed_capacity() {
        let cache = std::sync::Arc::new(cache(60_000, 16));
        let handles: Vec<_> = (0..8)
            .map(|worker| {
                let cache = cache.clone();
                std::thread::spawn(move || {
                    for idx in 0..50 {
                        let key = format!("w{}-{}", worker, idx);
                        cache.put(&key, json!(idx));
                        let _ = cache.get(&key);
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().expect("worker");
        }
        assert_eq!(cache.len(), 16);
        assert_eq!(cache.stats()["writes"], 400);
    }
}
