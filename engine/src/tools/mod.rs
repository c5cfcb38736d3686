//! Tools the agent can call
//!
//! Every tool implements [`Tool`]: a descriptor the model sees, and an async
//! `invoke` over JSON arguments. [`ToolRegistry`] holds the enabled tools in a
//! fixed order and dispatches model tool calls to them by name.

pub mod guest_info;
pub mod hub_stats;
pub mod weather;
pub mod web_search;

pub use guest_info::GuestInfoTool;
pub use hub_stats::HubStatsTool;
pub use weather::WeatherTool;
pub use web_search::WebSearchTool;

use async_trait::async_trait;
use reqwest::Client;
use sdk::errors::EngineError;
use sdk::types::{ToolError, ToolInput, ToolOutput, ToolSpec};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use crate::config::ToolsConfig;
use crate::llm::ToolCall;

/// Timeout for a single upstream request made by a tool
const TOOL_HTTP_TIMEOUT_SECS: u64 = 30;

/// A callable tool
#[async_trait]
pub trait Tool: Send + Sync {
    /// Descriptor bound to the model
    fn spec(&self) -> ToolSpec;

    /// Run the tool with decoded arguments
    async fn invoke(&self, input: &ToolInput) -> Result<ToolOutput, ToolError>;
}

/// HTTP client shared by the network-backed tools
pub(crate) fn http_client() -> Client {
    Client::builder()
        .timeout(Duration::from_secs(TOOL_HTTP_TIMEOUT_SECS))
        .user_agent(concat!("alfred/", env!("CARGO_PKG_VERSION")))
        .build()
        .unwrap_or_else(|e| {
            warn!("Failed to build tool HTTP client ({}), using defaults", e);
            Client::new()
        })
}

/// Map a failed upstream response to a tool error
pub(crate) async fn upstream_error(service: &str, response: reqwest::Response) -> ToolError {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    ToolError::Upstream(format!("{} returned {}: {}", service, status, body.trim()))
}

/// Registry of the tools available to the agent.
///
/// Order is registration order; it is the order tools are bound to the model.
#[derive(Default, Clone)]
pub struct ToolRegistry {
    tools: Vec<Arc<dyn Tool>>,
}

impl std::fmt::Debug for ToolRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolRegistry")
            .field("tools", &self.names())
            .finish()
    }
}

impl ToolRegistry {
    /// Create an empty registry with no tools enabled.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the registry from the `[tools]` config section.
    ///
    /// Order is the order the model sees them in: guest retriever, web
    /// search, weather, hub stats.
    pub fn from_config(config: &ToolsConfig) -> Result<Self, EngineError> {
        let mut registry = Self::new();

        if config.guest_info.enabled {
            registry.register(Arc::new(GuestInfoTool::from_file(
                &config.guest_info.dataset,
                config.guest_info.top_k,
            )?))?;
        }
        if config.web_search.enabled {
            registry.register(Arc::new(WebSearchTool::new(
                &config.web_search.base_url,
                config.web_search.max_results,
            )))?;
        }
        if config.weather_info.enabled {
            registry.register(Arc::new(WeatherTool::new(&config.weather_info.base_url)))?;
        }
        if config.hub_stats.enabled {
            registry.register(Arc::new(HubStatsTool::new(&config.hub_stats.base_url)))?;
        }

        debug!("Tool registry ready: {:?}", registry.names());
        Ok(registry)
    }

    /// Add a tool. Names must be unique.
    pub fn register(&mut self, tool: Arc<dyn Tool>) -> Result<(), EngineError> {
        let name = tool.spec().name;
        if self.get(&name).is_some() {
            return Err(EngineError::Config(format!(
                "Tool '{}' is registered twice",
                name
            )));
        }
        self.tools.push(tool);
        Ok(())
    }

    /// Builder form of [`register`](Self::register)
    pub fn with_tool(mut self, tool: Arc<dyn Tool>) -> Result<Self, EngineError> {
        self.register(tool)?;
        Ok(self)
    }

    /// Look up a tool by name
    pub fn get(&self, name: &str) -> Option<&Arc<dyn Tool>> {
        self.tools.iter().find(|t| t.spec().name == name)
    }

    /// Descriptors of all tools, in registration order
    pub fn specs(&self) -> Vec<ToolSpec> {
        self.tools.iter().map(|t| t.spec()).collect()
    }

    /// Return the names of all currently enabled tools.
    pub fn names(&self) -> Vec<String> {
        self.tools.iter().map(|t| t.spec().name).collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Dispatch a tool call by name.
    ///
    /// Unknown names are `ToolNotFound`; argument decoding and tool failures
    /// are `ToolInvocation`. Errors are never turned into tool output.
    pub async fn dispatch(&self, call: &ToolCall) -> Result<ToolOutput, EngineError> {
        debug!(
            "Dispatching tool '{}' ({}) with args: {}",
            call.name, call.id, call.arguments
        );

        let Some(tool) = self.get(&call.name) else {
            warn!("Unknown tool requested: {}", call.name);
            return Err(EngineError::ToolNotFound(call.name.clone()));
        };

        let input = ToolInput::from_arguments(call.name.as_str(), &call.arguments)
            .map_err(|e| EngineError::tool(call.name.as_str(), e.to_string()))?;

        tool.invoke(&input).await.map_err(|e| {
            warn!("Tool '{}' failed: {}", call.name, e);
            EngineError::tool(call.name.as_str(), e.to_string())
        })
    }
}
