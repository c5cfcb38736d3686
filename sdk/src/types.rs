//! Tool input/output types

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Descriptor of a tool, as bound to the model service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolSpec {
    /// Stable tool name the model uses to request it
    pub name: String,

    /// One-line description shown to the model
    pub description: String,

    /// JSON schema of the argument object
    pub parameters: Value,
}

impl ToolSpec {
    /// Create a spec with an object schema built from `(name, type, description)`
    /// triples. Every listed property is required.
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        properties: &[(&str, &str, &str)],
    ) -> Self {
        let mut props = Map::new();
        for (prop, kind, about) in properties {
            props.insert(
                (*prop).to_string(),
                serde_json::json!({ "type": kind, "description": about }),
            );
        }
        let required: Vec<&str> = properties.iter().map(|(prop, _, _)| *prop).collect();

        Self {
            name: name.into(),
            description: description.into(),
            parameters: serde_json::json!({
                "type": "object",
                "properties": props,
                "required": required,
            }),
        }
    }
}

/// Input to a tool function
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolInput {
    pub method: String,
    pub params: Map<String, Value>,
}

impl ToolInput {
    /// Create a new ToolInput
    pub fn new(method: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            params: Map::new(),
        }
    }

    /// Build the input for a tool call from its JSON arguments.
    ///
    /// Models sometimes send arguments as a JSON-encoded string; that form is
    /// decoded first. `null` means no arguments.
    pub fn from_arguments(method: impl Into<String>, arguments: &Value) -> Result<Self, ToolError> {
        let params = match arguments {
            Value::Object(map) => map.clone(),
            Value::Null => Map::new(),
            Value::String(raw) => match serde_json::from_str::<Value>(raw) {
                Ok(Value::Object(map)) => map,
                _ => {
                    return Err(ToolError::InvalidParameter(
                        "arguments must be a JSON object".to_string(),
                    ))
                }
            },
            _ => {
                return Err(ToolError::InvalidParameter(
                    "arguments must be a JSON object".to_string(),
                ))
            }
        };

        Ok(Self {
            method: method.into(),
            params,
        })
    }

    /// Add a parameter
    pub fn with_param(mut self, key: impl Into<String>, value: Value) -> Self {
        self.params.insert(key.into(), value);
        self
    }

    /// Get a string parameter
    pub fn param_str(&self, key: &str) -> Result<String, ToolError> {
        self.params
            .get(key)
            .and_then(|v| v.as_str())
            .map(String::from)
            .ok_or_else(|| ToolError::MissingParameter(key.to_string()))
    }
}

/// Output from a tool function
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolOutput {
    pub data: Value,
}

impl ToolOutput {
    /// Create an output with text
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            data: Value::String(text.into()),
        }
    }

    /// Render the output as the content of a tool-result message
    pub fn render(&self) -> String {
        match &self.data {
            Value::String(text) => text.clone(),
            other => other.to_string(),
        }
    }
}

/// Tool-specific errors
#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    #[error("Missing parameter: {0}")]
    MissingParameter(String),

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Upstream service error: {0}")]
    Upstream(String),
}
