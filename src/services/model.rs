use crate::constants::network;
use crate::errors::PipelineError;
use crate::models::ApiDefinition;
use crate::services::logger::Logger;
use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use std::time::{Duration, Instant};

/// Language-model collaborator. `propose_call` returns raw text that is fed
/// to the payload normalizer as-is.
#[async_trait]
pub trait ModelClient: Send + Sync {
    async fn propose_call(
        &self,
        message: &str,
        api: &ApiDefinition,
    ) -> Result<String, PipelineError>;

    async fn free_chat(&self, message: &str, system_prompt: &str) -> Result<String, PipelineError>;
}

const CALL_INSTRUCTIONS: &str = "Translate the user message into one REST call against the API below. \
Reply with a single JSON object and nothing else, shaped as \
{\"endpoint\": \"/path\", \"method\": \"GET|POST|PUT|DELETE\", \"path_params\": {}, \
\"query\": {}, \"headers\": {}, \"body\": {}, \"notes\": \"why this call\"}. \
Only use the listed endpoints and never invent path parameters.";

pub fn build_call_prompt(message: &str, api: &ApiDefinition) -> String {
    let endpoints: Vec<String> = api
        .example_endpoints
        .iter()
        .map(|ep| {
            format!(
                "- {}: {} {} -- {}",
                ep.name,
                ep.method,
                ep.path,
                ep.description.as_deref().unwrap_or("no description")
            )
        })
        .collect();
    format!(
        "{}\n\nAPI: {}\nBase URL: {}\nEndpoints:\n{}\n\nUSER MESSAGE: {}",
        CALL_INSTRUCTIONS,
        api.name,
        api.base_url,
        endpoints.join("\n"),
        message
    )
}

/// Ollama `generate` client (`{"model","prompt","stream":false}` in,
/// `{"response"}` out).
#[derive(Clone)]
pub struct OllamaClient {
    logger: Logger,
    client: Client,
    url: String,
    model: String,
    timeout: Duration,
}

impl OllamaClient {
    pub fn new(logger: Logger, url: &str, model: &str) -> Result<Self, PipelineError> {
        let client = Client::builder()
            .user_agent(network::USER_AGENT)
            .build()
            .map_err(|err| PipelineError::internal(format!("Failed to build model client: {}", err)))?;
        Ok(Self {
            logger: logger.child("model"),
            client,
            url: url.to_string(),
            model: model.to_string(),
            timeout: Duration::from_millis(network::TIMEOUT_MODEL_REQUEST_MS),
        })
    }

    async fn generate(&self, prompt: String) -> Result<String, PipelineError> {
        let payload = serde_json::json!({
            "model": self.model,
            "prompt": prompt,
            "stream": false,
        });
        let started = Instant::now();
        let response = self
            .client
            .post(&self.url)
            .json(&payload)
            .timeout(self.timeout)
            .send()
            .await
            .and_then(|resp| resp.error_for_status())
            .map_err(|err| PipelineError::transport(format!("Ollama request failed: {}", err)))?;
        let content: Value = response
            .json()
            .await
            .map_err(|err| PipelineError::transport(format!("Invalid Ollama response: {}", err)))?;
        self.logger.debug(
            "Model replied",
            Some(&serde_json::json!({
                "model": self.model,
                "duration_ms": started.elapsed().as_millis() as u64,
            })),
        );
        parse_generate_response(&content)
    }
}

pub fn parse_generate_response(content: &Value) -> Result<String, PipelineError> {
    content
        .get("response")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|text| !text.is_empty())
        .map(str::to_string)
        .ok_or_else(|| PipelineError::transport("No response text from Ollama"))
}

#[async_trait]
impl ModelClient for OllamaClient {
    async fn propose_call(
        &self,
        message: &str,
        api: &ApiDefinition,
    ) -> Result<String, PipelineError> {
        self.generate(build_call_prompt(message, api)).await
    }

    async fn free_chat(&self, message: &str, system_prompt: &str) -> Result<String, PipelineError> {
        let prompt = if system_prompt.trim().is_empty() {
            message.to_string()
        } else {
            format!("{}\n\n{}", system_prompt.trim(), message)
        };
        self.generate(prompt).await
    }
}
