//! Prompt templates
//!
//! Templates live in a YAML file keyed by name. Only string entries are
//! templates; nested sections (`planning`, `final_answer`, ...) may sit beside
//! them and are ignored. The agent reads the system prompt once at startup.

use sdk::errors::EngineError;
use std::collections::HashMap;
use std::fs;
use std::path::Path;

/// Named prompt templates loaded from YAML
#[derive(Debug, Clone, Default)]
pub struct PromptTemplates {
    templates: HashMap<String, serde_yaml::Value>,
}

impl PromptTemplates {
    /// Load templates from a YAML file
    pub fn load(path: &Path) -> Result<Self, EngineError> {
        let contents = fs::read_to_string(path).map_err(|e| {
            EngineError::Config(format!(
                "Failed to read prompts file {}: {}",
                path.display(),
                e
            ))
        })?;

        let templates = Self::from_yaml_str(&contents).map_err(|e| match e {
            EngineError::Config(msg) => EngineError::Config(format!("{}: {}", path.display(), msg)),
            other => other,
        })?;

        tracing::debug!(
            "Loaded {} prompt templates from {}",
            templates.len(),
            path.display()
        );
        Ok(templates)
    }

    /// Parse templates from YAML text
    pub fn from_yaml_str(contents: &str) -> Result<Self, EngineError> {
        let templates: HashMap<String, serde_yaml::Value> = serde_yaml::from_str(contents)
            .map_err(|e| EngineError::Config(format!("Invalid prompts YAML: {}", e)))?;
        Ok(Self { templates })
    }

    /// Look up a template by name. The entry must be a string.
    pub fn get(&self, key: &str) -> Result<&str, EngineError> {
        let value = self
            .templates
            .get(key)
            .ok_or_else(|| EngineError::Config(format!("Prompt template '{}' not found", key)))?;
        value.as_str().ok_or_else(|| {
            EngineError::Config(format!("Prompt template '{}' is not a string", key))
        })
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }
}
