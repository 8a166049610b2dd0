use apicall::errors::ErrorKind;
use apicall::services::secrets::StaticSecretStore;

mod common;
use common::{build_app, ok, ScriptedTransport};

const COUNTRIES: &str = r#"[
    {"name": {"common": "Norway"}, "population": 5400000},
    {"name": {"common": "Nepal"}, "population": 30000000},
    {"name": {"common": "Peru"}, "population": 34000000}
]"#;

#[tokio::test]
async fn model_output_with_comments_is_repaired_and_executed() {
    let reply = r#"Sure, here is the call:
{
  "endpoint": "/movie/{movie_id}", // details endpoint
  "method": "get",
  "path_params": {"movie_id": 550},
  "notes": "Looked up the film by id."
}}"#;
    let transport = ScriptedTransport::new(vec![ok(200, r#"{"id":550,"title":"Fight Club"}"#)]);
    let app = build_app(
        transport.clone(),
        StaticSecretStore::new().with_secret("tmdb", "k"),
        reply,
    );

    let outcome = app
        .pipeline
        .chat("tmdb", "details for movie 550")
        .await
        .expect("chat");

    assert_eq!(outcome.call.endpoint, "/movie/550");
    assert_eq!(outcome.call.method, "GET");
    assert!(transport.last_url().starts_with("https://api.themoviedb.org/3/movie/550?api_key=k"));
    assert_eq!(outcome.response_json["title"], "Fight Club");
    assert!(outcome.response_text.starts_with("Looked up the film by id."));
    assert_eq!(outcome.insight.item_count, 0);
}

#[tokio::test]
async fn restcountries_results_are_filtered_by_requested_prefix() {
    let reply = r#"{"endpoint": "/all", "method": "GET", "query_params": {}}"#;
    let transport = ScriptedTransport::new(vec![ok(200, COUNTRIES)]);
    let app = build_app(transport, StaticSecretStore::new(), reply);

    let outcome = app
        .pipeline
        .chat("restcountries", "countries starting with the letter N")
        .await
        .expect("chat");

    let names: Vec<&str> = outcome
        .response_json
        .as_array()
        .expect("list")
        .iter()
        .filter_map(|item| item["name"]["common"].as_str())
        .collect();
    assert_eq!(names, vec!["Norway", "Nepal"]);
    assert!(outcome.response_text.contains("starting with 'N'"));
    assert_eq!(outcome.insight.item_count, 2);
}

#[tokio::test]
async fn unparseable_model_output_is_a_model_error() {
    let transport = ScriptedTransport::new(vec![]);
    let app = build_app(transport.clone(), StaticSecretStore::new(), "I cannot help with that.");

    let err = app.pipeline.chat("restcountries", "anything").await.unwrap_err();

    assert_eq!(err.kind, ErrorKind::ModelOutput);
    assert_eq!(err.status, 500);
    assert!(err.hint.is_some());
    assert_eq!(transport.calls(), 0);
}

#[tokio::test]
async fn model_call_missing_path_param_is_rejected() {
    let reply = r#"{"endpoint": "/movie/{movie_id}", "method": "GET"}"#;
    let transport = ScriptedTransport::new(vec![]);
    let app = build_app(
        transport.clone(),
        StaticSecretStore::new().with_secret("tmdb", "k"),
        reply,
    );

    let err = app.pipeline.chat("tmdb", "a movie").await.unwrap_err();

    assert!(err.message.contains("movie_id"));
    assert_eq!(transport.calls(), 0);
}
