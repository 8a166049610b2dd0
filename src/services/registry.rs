use crate::errors::PipelineError;
use crate::models::ApiDefinition;
use crate::services::logger::Logger;
use std::collections::HashMap;
use std::path::Path;
use walkdir::WalkDir;

/// Read-only set of API contracts, loaded once per process.
#[derive(Debug, Clone)]
pub struct ApiRegistry {
    definitions: HashMap<String, ApiDefinition>,
}

impl ApiRegistry {
    pub fn from_definitions(definitions: Vec<ApiDefinition>) -> Result<Self, PipelineError> {
        if definitions.is_empty() {
            return Err(PipelineError::internal("No API definitions found"));
        }
        let definitions = definitions
            .into_iter()
            .map(|def| (def.name.clone(), def))
            .collect();
        Ok(Self { definitions })
    }

    /// Loads every `*.json` file directly inside `dir`. Later files win on
    /// duplicate names, in file-name order.
    pub fn load_dir(dir: &Path, logger: &Logger) -> Result<Self, PipelineError> {
        let logger = logger.child("registry");
        if !dir.is_dir() {
            return Err(PipelineError::internal(format!(
                "API definitions directory not found: {}",
                dir.display()
            )));
        }
        let mut definitions = Vec::new();
        for entry in WalkDir::new(dir)
            .min_depth(1)
            .max_depth(1)
            .sort_by_file_name()
            .into_iter()
            .filter_map(Result::ok)
        {
            let path = entry.path();
            if !entry.file_type().is_file()
                || path.extension().and_then(|ext| ext.to_str()) != Some("json")
            {
                continue;
            }
            let raw = std::fs::read_to_string(path)?;
            let def: ApiDefinition = serde_json::from_str(&raw).map_err(|err| {
                PipelineError::internal(format!(
                    "Invalid API definition {}: {}",
                    path.display(),
                    err
                ))
            })?;
            definitions.push(def);
        }
        let registry = Self::from_definitions(definitions)?;
        logger.info(
            "API definitions loaded",
            Some(&serde_json::json!({
                "dir": dir.display().to_string(),
                "count": registry.definitions.len(),
            })),
        );
        Ok(registry)
    }

    pub fn get(&self, name: &str) -> Result<&ApiDefinition, PipelineError> {
        self.definitions
            .get(name)
            .ok_or_else(|| PipelineError::not_found(format!("Unknown API: {}", name)))
    }

    pub fn all(&self) -> Vec<&ApiDefinition> {
        let mut list: Vec<&ApiDefinition> = self.definitions.values().collect();
        list.sort_by(|a, b| a.name.cmp(&b.name));
        list
    }
}
