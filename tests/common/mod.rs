#![allow(dead_code)]

use apicall::app::App;
use apicall::config::Config;
use apicall::errors::{PipelineError, TransportFailure};
use apicall::models::{ApiDefinition, AuthType, ExampleEndpoint};
use apicall::services::logger::Logger;
use apicall::services::model::ModelClient;
use apicall::services::registry::ApiRegistry;
use apicall::services::secrets::{SecretStore, StaticSecretStore};
use apicall::services::transport::{HttpTransport, OutboundRequest, TransportResponse};
use async_trait::async_trait;
use once_cell::sync::Lazy;
use std::sync::Arc;
use tokio::sync::Mutex;

pub static ENV_LOCK: Lazy<Mutex<()>> = Lazy::new(|| Mutex::new(()));

pub type Reply = Result<TransportResponse, TransportFailure>;

/// Transport that replays canned replies and records what it was asked.
pub struct ScriptedTransport {
    replies: std::sync::Mutex<Vec<Reply>>,
    pub seen: std::sync::Mutex<Vec<(OutboundRequest, bool)>>,
}

impl ScriptedTransport {
    pub fn new(mut replies: Vec<Reply>) -> Arc<Self> {
        replies.reverse();
        Arc::new(Self {
            replies: std::sync::Mutex::new(replies),
            seen: std::sync::Mutex::new(Vec::new()),
        })
    }

    pub fn calls(&self) -> usize {
        self.seen.lock().expect("seen").len()
    }

    pub fn last_url(&self) -> String {
        self.seen
            .lock()
            .expect("seen")
            .last()
            .map(|(req, _)| req.url.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl HttpTransport for ScriptedTransport {
    async fn send(&self, request: &OutboundRequest, trust_env: bool) -> Reply {
        self.seen
            .lock()
            .expect("seen")
            .push((request.clone(), trust_env));
        self.replies
            .lock()
            .expect("replies")
            .pop()
            .unwrap_or_else(|| Err(TransportFailure::Other("no scripted reply".into())))
    }
}

pub fn ok(status: u16, body: &str) -> Reply {
    Ok(TransportResponse {
        status,
        body: body.to_string(),
    })
}

/// Model stub that always proposes the same raw text.
pub struct CannedModel {
    pub reply: String,
}

#[async_trait]
impl ModelClient for CannedModel {
    async fn propose_call(&self, _message: &str, _api: &ApiDefinition) -> Result<String, PipelineError> {
        Ok(self.reply.clone())
    }

    async fn free_chat(&self, message: &str, _system_prompt: &str) -> Result<String, PipelineError> {
        Ok(message.to_string())
    }
}

pub fn endpoint(name: &str, path: &str, method: &str, query: Option<&[&str]>) -> ExampleEndpoint {
    ExampleEndpoint {
        name: name.to_string(),
        path: path.to_string(),
        method: method.to_string(),
        description: None,
        allowed_query_params: query.map(|keys| keys.iter().map(|k| k.to_string()).collect()),
        allowed_body_params: None,
    }
}

pub fn movies_api() -> ApiDefinition {
    ApiDefinition {
        name: "tmdb".to_string(),
        base_url: "https://api.themoviedb.org/3".to_string(),
        auth_type: AuthType::Query,
        auth_key_name: "api_key".to_string(),
        example_endpoints: vec![
            endpoint("Discover", "/discover/movie", "GET", Some(&["sort_by", "year"])),
            endpoint("Details", "/movie/{movie_id}", "GET", None),
        ],
    }
}

pub fn countries_api() -> ApiDefinition {
    ApiDefinition {
        name: "restcountries".to_string(),
        base_url: "https://restcountries.com/v3.1".to_string(),
        auth_type: AuthType::None,
        auth_key_name: "api_key".to_string(),
        example_endpoints: vec![
            endpoint("All", "/all", "GET", Some(&["fields"])),
            endpoint("By name", "/name/{name}", "GET", None),
        ],
    }
}

pub fn build_app(
    transport: Arc<ScriptedTransport>,
    secrets: StaticSecretStore,
    model_reply: &str,
) -> App {
    let registry = ApiRegistry::from_definitions(vec![movies_api(), countries_api()])
        .expect("registry");
    let secrets: Arc<dyn SecretStore> = Arc::new(secrets);
    let model: Arc<dyn ModelClient> = Arc::new(CannedModel {
        reply: model_reply.to_string(),
    });
    App::wire(
        Logger::new("test"),
        Config::default(),
        Arc::new(registry),
        secrets,
        model,
        transport,
    )
}
