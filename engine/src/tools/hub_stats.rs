//! Hugging Face Hub statistics tool
//!
//! Reports the most downloaded model published by an author.

use async_trait::async_trait;
use reqwest::Client;
use sdk::types::{ToolError, ToolInput, ToolOutput, ToolSpec};
use serde::Deserialize;
use tracing::info;

use super::Tool;

pub struct HubStatsTool {
    client: Client,
    base_url: String,
}

impl HubStatsTool {
    pub fn new(base_url: &str) -> Self {
        Self {
            client: super::http_client(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl Tool for HubStatsTool {
    fn spec(&self) -> ToolSpec {
        ToolSpec::new(
            "hub_stats",
            "Fetches the most downloaded model from a specific author on the Hugging Face Hub.",
            &[(
                "author",
                "string",
                "The username of the model author/organization to find models from.",
            )],
        )
    }

    async fn invoke(&self, input: &ToolInput) -> Result<ToolOutput, ToolError> {
        let author = input.param_str("author")?;
        let author = author.trim();
        if author.is_empty() {
            return Err(ToolError::InvalidParameter(
                "author must not be empty".to_string(),
            ));
        }

        info!("Hub stats lookup: {}", author);
        let response = self
            .client
            .get(format!("{}/api/models", self.base_url))
            .query(&[
                ("author", author),
                ("sort", "downloads"),
                ("direction", "-1"),
                ("limit", "1"),
            ])
            .send()
            .await
            .map_err(|e| ToolError::Upstream(format!("hub request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(super::upstream_error("Hugging Face Hub", response).await);
        }

        let models: Vec<HubModel> = response
            .json()
            .await
            .map_err(|e| ToolError::Upstream(format!("invalid hub response: {}", e)))?;

        match models.into_iter().next() {
            Some(model) => Ok(ToolOutput::text(format!(
                "The most downloaded model by {} is {} with {} downloads.",
                author,
                model.name(),
                model.downloads
            ))),
            None => Ok(ToolOutput::text(format!(
                "No models found for author {}.",
                author
            ))),
        }
    }
}

#[derive(Debug, Deserialize)]
struct HubModel {
    #[serde(default)]
    id: Option<String>,
    #[serde(rename = "modelId", default)]
    model_id: Option<String>,
    #[serde(default)]
    downloads: u64,
}

impl HubModel {
    fn name(&self) -> &str {
        self.id
            .as_deref()
            .or(self.model_id.as_deref())
            .unwrap_or("an unnamed model")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_model_deserialization_accepts_model_id() {
        let model: HubModel =
            serde_json::from_value(json!({"modelId": "facebook/bart", "downloads": 7})).unwrap();
        assert_eq!(model.name(), "facebook/bart");
        assert_eq!(model.downloads, 7);

        let both: HubModel = serde_json::from_value(
            json!({"id": "facebook/bart", "modelId": "facebook/bart", "downloads": 1}),
        )
        .unwrap();
        assert_eq!(both.name(), "facebook/bart");
    }

    #[test]
    fn test_spec() {
        let spec = HubStatsTool::new("https://huggingface.co").spec();
        assert_eq!(spec.name, "hub_stats");
        assert_eq!(spec.parameters["required"], json!(["author"]));
    }
}
