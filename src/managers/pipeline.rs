use crate::errors::PipelineError;
use crate::managers::executor::CallExecutor;
use crate::models::{ApiCall, ApiDefinition, RequestMetadata};
use crate::services::insights::{extract_insights, Insight, InsightContext};
use crate::services::logger::Logger;
use crate::services::model::ModelClient;
use crate::services::postprocess::apply_post_processing;
use crate::services::registry::ApiRegistry;
use crate::services::secrets::SecretStore;
use crate::utils::payload::normalize_model_output;
use crate::utils::summary::summarize_response;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;

/// Everything a caller gets back for one resolved request.
#[derive(Debug, Clone, Serialize)]
pub struct ChatOutcome {
    pub api: String,
    pub call: ApiCall,
    pub response_json: Value,
    pub response_text: String,
    pub insight: Insight,
    pub metadata: RequestMetadata,
}

#[derive(Clone)]
pub struct ApiPipeline {
    logger: Logger,
    registry: Arc<ApiRegistry>,
    secrets: Arc<dyn SecretStore>,
    model: Arc<dyn ModelClient>,
    executor: CallExecutor,
}

impl ApiPipeline {
    pub fn new(
        logger: Logger,
        registry: Arc<ApiRegistry>,
        secrets: Arc<dyn SecretStore>,
        model: Arc<dyn ModelClient>,
        executor: CallExecutor,
    ) -> Self {
        Self {
            logger: logger.child("pipeline"),
            registry,
            secrets,
            model,
            executor,
        }
    }

    pub fn registry(&self) -> &ApiRegistry {
        &self.registry
    }

    pub fn executor(&self) -> &CallExecutor {
        &self.executor
    }

    /// Natural-language entry point: the model proposes a call which is then
    /// normalized and executed.
    pub async fn chat(&self, api_name: &str, message: &str) -> Result<ChatOutcome, PipelineError> {
        let api = self.registry.get(api_name)?;
        let raw = self.model.propose_call(message, api).await?;
        let call = normalize_model_output(&raw)?;
        self.logger.info(
            "Model proposed call",
            Some(&serde_json::json!({
                "api": api.name,
                "method": call.method,
                "endpoint": call.endpoint,
            })),
        );
        self.complete(api, call, message).await
    }

    /// Executes a caller-supplied call without involving the model.
    pub async fn run(&self, api_name: &str, call: ApiCall) -> Result<ChatOutcome, PipelineError> {
        let api = self.registry.get(api_name)?;
        let context = call.notes.clone();
        self.complete(api, call, &context).await
    }

    async fn complete(
        &self,
        api: &ApiDefinition,
        call: ApiCall,
        message: &str,
    ) -> Result<ChatOutcome, PipelineError> {
        let secret = self.secrets.load_secret(&api.name);
        let (body, metadata) = self.executor.execute(api, &call, secret.as_deref()).await?;
        drop(secret);

        let (body, post_note) = apply_post_processing(api, &call, message, body);
        let insight = extract_insights(&body, &InsightContext::new(message, api.name.as_str()));
        let notes = match post_note {
            Some(note) if call.notes.trim().is_empty() => note,
            Some(note) => format!("{} {}", call.notes.trim(), note),
            None => call.notes.clone(),
        };
        let response_text = summarize_response(&body, Some(&notes));

        Ok(ChatOutcome {
            api: api.name.clone(),
            call,
            response_json: body,
            response_text,
            insight,
            metadata,
        })
    }
}
