//! Web search tool
//!
//! Queries the DuckDuckGo Instant Answer API and returns the abstract plus
//! related topics as plain text.

use async_trait::async_trait;
use reqwest::Client;
use sdk::types::{ToolError, ToolInput, ToolOutput, ToolSpec};
use serde::Deserialize;
use tracing::{debug, info};

use super::Tool;

pub struct WebSearchTool {
    client: Client,
    base_url: String,
    max_results: usize,
}

impl WebSearchTool {
    pub fn new(base_url: &str, max_results: usize) -> Self {
        Self {
            client: super::http_client(),
            base_url: base_url.trim_end_matches('/').to_string(),
            max_results,
        }
    }

    /// Flatten an answer into at most `max_results` text entries
    fn collect_results(&self, answer: InstantAnswer) -> Vec<String> {
        let mut results = Vec::new();

        if !answer.abstract_text.is_empty() {
            let source = if answer.abstract_url.is_empty() {
                String::new()
            } else {
                format!(" ({})", answer.abstract_url)
            };
            results.push(format!("{}{}", answer.abstract_text, source));
        }

        if !answer.answer.is_empty() {
            results.push(answer.answer);
        }

        let mut pending: Vec<RelatedTopic> = answer.related_topics;
        pending.reverse();
        while let Some(topic) = pending.pop() {
            if results.len() >= self.max_results {
                break;
            }
            match topic {
                RelatedTopic::Entry { text, first_url } if !text.is_empty() => {
                    results.push(format!("{} ({})", text, first_url));
                }
                RelatedTopic::Group { topics } => {
                    // Grouped topics keep their position in the list
                    pending.extend(topics.into_iter().rev());
                }
                RelatedTopic::Entry { .. } => {}
            }
        }

        results.truncate(self.max_results);
        results
    }
}

#[async_trait]
impl Tool for WebSearchTool {
    fn spec(&self) -> ToolSpec {
        ToolSpec::new(
            "web_search",
            "Searches the web and returns short summaries of the best matching results.",
            &[("query", "string", "The search query.")],
        )
    }

    async fn invoke(&self, input: &ToolInput) -> Result<ToolOutput, ToolError> {
        let query = input.param_str("query")?;
        if query.trim().is_empty() {
            return Err(ToolError::InvalidParameter(
                "query must not be empty".to_string(),
            ));
        }

        info!("Web search: {}", query);
        let response = self
            .client
            .get(format!("{}/", self.base_url))
            .query(&[
                ("q", query.as_str()),
                ("format", "json"),
                ("no_html", "1"),
                ("skip_disambig", "1"),
            ])
            .send()
            .await
            .map_err(|e| ToolError::Upstream(format!("web search request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(super::upstream_error("DuckDuckGo", response).await);
        }

        let answer: InstantAnswer = response
            .json()
            .await
            .map_err(|e| ToolError::Upstream(format!("invalid search response: {}", e)))?;

        let results = self.collect_results(answer);
        debug!("Web search returned {} results", results.len());

        if results.is_empty() {
            return Ok(ToolOutput::text(format!("No results found for '{}'.", query)));
        }

        Ok(ToolOutput::text(results.join("\n")))
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct InstantAnswer {
    #[serde(rename = "AbstractText")]
    abstract_text: String,
    #[serde(rename = "AbstractURL")]
    abstract_url: String,
    #[serde(rename = "Answer")]
    answer: String,
    #[serde(rename = "RelatedTopics")]
    related_topics: Vec<RelatedTopic>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RelatedTopic {
    Group {
        #[serde(rename = "Topics")]
        topics: Vec<RelatedTopic>,
    },
    Entry {
        #[serde(rename = "Text", default)]
        text: String,
        #[serde(rename = "FirstURL", default)]
        first_url: String,
    },
}
