use apicall::app::App;
use apicall::config::Config;
use apicall::models::AuthType;
use apicall::services::logger::Logger;
use apicall::services::registry::ApiRegistry;
use apicall::services::secrets::{EnvSecretStore, SecretStore};
use serde_json::Value;
use std::time::Duration;

mod common;
use common::ENV_LOCK;

fn write_json(path: &std::path::Path, value: &Value) {
    let payload = serde_json::to_string_pretty(value).expect("serialize json");
    std::fs::write(path, format!("{}\n", payload)).expect("write file");
}

fn temp_dir(label: &str) -> std::path::PathBuf {
    let dir = std::env::temp_dir().join(format!("apicall-{}-{}", label, uuid::Uuid::new_v4()));
    std::fs::create_dir_all(&dir).expect("create temp dir");
    dir
}

#[tokio::test]
async fn app_loads_definitions_from_configured_dir() {
    let _guard = ENV_LOCK.lock().await;
    let dir = temp_dir("defs");
    write_json(
        &dir.join("weather.json"),
        &serde_json::json!({
            "name": "openweather",
            "base_url": "https://api.openweathermap.org/data/2.5",
            "auth_type": "query",
            "auth_key_name": "appid",
            "example_endpoints": [
                {"name": "Current", "path": "/weather", "method": "GET"}
            ]
        }),
    );
    write_json(
        &dir.join("countries.json"),
        &serde_json::json!({
            "name": "restcountries",
            "base_url": "https://restcountries.com/v3.1",
            "example_endpoints": []
        }),
    );
    std::fs::write(dir.join("README.md"), "not a definition").expect("write readme");

    let prev_dir = std::env::var("APICALL_DEFINITIONS_DIR").ok();
    let prev_ttl = std::env::var("APICALL_CACHE_TTL_MS").ok();
    std::env::set_var("APICALL_DEFINITIONS_DIR", dir.to_string_lossy().as_ref());
    std::env::set_var("APICALL_CACHE_TTL_MS", "not-a-number");

    let config = Config::from_env();
    let app = App::initialize(config);

    match prev_dir {
        Some(value) => std::env::set_var("APICALL_DEFINITIONS_DIR", value),
        None => std::env::remove_var("APICALL_DEFINITIONS_DIR"),
    }
    match prev_ttl {
        Some(value) => std::env::set_var("APICALL_CACHE_TTL_MS", value),
        None => std::env::remove_var("APICALL_CACHE_TTL_MS"),
    }

    let app = app.expect("app initializes");
    assert_eq!(app.config.cache_ttl, Duration::from_secs(120));
    let registry = app.pipeline.registry();
    let names: Vec<&str> = registry.all().iter().map(|d| d.name.as_str()).collect();
    assert_eq!(names, vec!["openweather", "restcountries"]);

    let weather = registry.get("openweather").expect("weather");
    assert_eq!(weather.auth_type, AuthType::Query);
    assert_eq!(weather.auth_key_name, "appid");
    let countries = registry.get("restcountries").expect("countries");
    assert_eq!(countries.auth_type, AuthType::None);
    assert_eq!(countries.auth_key_name, "api_key");

    let _ = std::fs::remove_dir_all(&dir);
}

#[tokio::test]
async fn empty_definitions_dir_is_an_error() {
    let dir = temp_dir("empty");
    let err = ApiRegistry::load_dir(&dir, &Logger::new("test")).unwrap_err();
    assert!(err.message.contains("No API definitions"));
    let _ = std::fs::remove_dir_all(&dir);
}

#[tokio::test]
async fn env_secret_store_reads_prefixed_variable() {
    let _guard = ENV_LOCK.lock().await;
    let store = EnvSecretStore::new("APICALL_TEST_KEY_");
    std::env::set_var("APICALL_TEST_KEY_OPEN_WEATHER", "w-123");
    let found = store.load_secret("open-weather");
    std::env::set_var("APICALL_TEST_KEY_OPEN_WEATHER", "   ");
    let blank = store.load_secret("open-weather");
    std::env::remove_var("APICALL_TEST_KEY_OPEN_WEATHER");

    assert_eq!(found.as_deref(), Some("w-123"));
    assert!(blank.is_none());
}
