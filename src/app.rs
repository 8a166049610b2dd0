use crate::config::Config;
use crate::errors::PipelineError;
use crate::managers::executor::CallExecutor;
use crate::managers::pipeline::ApiPipeline;
use crate::services::cache::ResponseCache;
use crate::services::logger::Logger;
use crate::services::model::{ModelClient, OllamaClient};
use crate::services::registry::ApiRegistry;
use crate::services::secrets::{EnvSecretStore, SecretStore};
use crate::services::transport::{HttpTransport, ReqwestTransport};
use std::sync::Arc;

pub struct App {
    pub logger: Logger,
    pub config: Config,
    pub cache: Arc<ResponseCache>,
    pub pipeline: ApiPipeline,
}

impl App {
    pub fn initialize(config: Config) -> Result<Self, PipelineError> {
        let logger = Logger::new("apicall");
        let registry = Arc::new(ApiRegistry::load_dir(&config.definitions_dir, &logger)?);
        let secrets: Arc<dyn SecretStore> =
            Arc::new(EnvSecretStore::new(config.secret_prefix.clone()));
        let model: Arc<dyn ModelClient> = Arc::new(
            OllamaClient::new(logger.clone(), &config.ollama_url, &config.ollama_model)?,
        );
        let transport: Arc<dyn HttpTransport> = Arc::new(ReqwestTransport::new());
        Ok(Self::wire(logger, config, registry, secrets, model, transport))
    }

    /// Builds the pipeline from explicit collaborators. One cache instance is
    /// shared by every call made through the returned app.
    pub fn wire(
        logger: Logger,
        config: Config,
        registry: Arc<ApiRegistry>,
        secrets: Arc<dyn SecretStore>,
        model: Arc<dyn ModelClient>,
        transport: Arc<dyn HttpTransport>,
    ) -> Self {
        let cache = Arc::new(ResponseCache::new(
            logger.clone(),
            config.cache_ttl,
            config.cache_max_entries,
        ));
        let executor = CallExecutor::new(
            logger.clone(),
            cache.clone(),
            transport,
            config.request_timeout,
        );
        let pipeline = ApiPipeline::new(logger.clone(), registry, secrets, model, executor);
        Self {
            logger,
            config,
            cache,
            pipeline,
        }
    }
}
