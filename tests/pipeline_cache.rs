use apicall::models::ApiCall;
use apicall::services::secrets::StaticSecretStore;
use serde_json::json;

mod common;
use common::{build_app, ok, ScriptedTransport};

const SECRET: &str = "tmdb-secret-123";

fn discover_call() -> ApiCall {
    let mut call = ApiCall::new("/discover/movie/", "get");
    call.query.insert("sort_by".into(), json!("vote_average.desc"));
    call.query.insert("page".into(), json!(2));
    call.notes = "Top rated movies.".to_string();
    call
}

#[tokio::test]
async fn repeated_get_is_served_from_cache() {
    let transport = ScriptedTransport::new(vec![ok(
        200,
        r#"{"results":[{"title":"Dune","vote_average":8.1},{"title":"Heat","vote_average":8.3}],"total_results":2}"#,
    )]);
    let app = build_app(
        transport.clone(),
        StaticSecretStore::new().with_secret("tmdb", SECRET),
        "",
    );

    let first = app.pipeline.run("tmdb", discover_call()).await.expect("first run");
    let second = app.pipeline.run("tmdb", discover_call()).await.expect("second run");

    assert_eq!(transport.calls(), 1);
    assert_eq!(first.response_json, second.response_json);
    assert!(!first.metadata.cache_hit);
    assert_eq!(first.metadata.status, Some(200));
    assert_eq!(first.metadata.attempts.len(), 1);
    assert!(second.metadata.cache_hit);
    assert_eq!(second.metadata.duration_ms, 0);
    assert!(second.metadata.attempts.is_empty());
    assert_ne!(first.metadata.request_id, second.metadata.request_id);

    let stats = app.cache.stats();
    assert_eq!(stats["hits"], 1);
    assert_eq!(app.cache.len(), 1);

    assert_eq!(first.insight.domain, "movies");
    assert_eq!(first.insight.top_items[0].name, "Heat");
    assert_eq!(
        first.response_text,
        "Top rated movies. Found 2 result(s). Top examples include: Dune, Heat."
    );
}

#[tokio::test]
async fn secret_reaches_upstream_but_not_diagnostics() {
    let transport = ScriptedTransport::new(vec![ok(200, r#"{"results":[]}"#)]);
    let app = build_app(
        transport.clone(),
        StaticSecretStore::new().with_secret("tmdb", SECRET),
        "",
    );

    let outcome = app.pipeline.run("tmdb", discover_call()).await.expect("run");

    let url = transport.last_url();
    assert_eq!(
        url,
        format!(
            "https://api.themoviedb.org/3/discover/movie?api_key={}&sort_by=vote_average.desc",
            SECRET
        )
    );
    assert!(!url.contains("page="));

    let meta = serde_json::to_string(&outcome.metadata).expect("serialize metadata");
    assert!(!meta.contains(SECRET));
    assert!(outcome.metadata.query.get("sort_by").is_some());
}

#[tokio::test]
async fn missing_secret_is_unauthorized_before_any_io() {
    let transport = ScriptedTransport::new(vec![]);
    let app = build_app(transport.clone(), StaticSecretStore::new(), "");

    let err = app.pipeline.run("tmdb", discover_call()).await.unwrap_err();
    assert_eq!(err.status, 401);
    assert_eq!(transport.calls(), 0);
}

#[tokio::test]
async fn unknown_endpoint_is_rejected_before_any_io() {
    let transport = ScriptedTransport::new(vec![]);
    let app = build_app(
        transport.clone(),
        StaticSecretStore::new().with_secret("tmdb", SECRET),
        "",
    );

    let err = app
        .pipeline
        .run("tmdb", ApiCall::new("/admin/users", "GET"))
        .await
        .unwrap_err();
    assert_eq!(err.status, 400);
    assert_eq!(transport.calls(), 0);

    let err = app
        .pipeline
        .run("nope", ApiCall::new("/x", "GET"))
        .await
        .unwrap_err();
    assert_eq!(err.status, 404);
}
