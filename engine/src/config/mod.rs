//! Configuration management
//!
//! This module handles loading, validation, and management of the Alfred configuration.
//! Configuration is stored in TOML format at ~/.alfred/config.toml.
//!
//! # Configuration Sections
//!
//! - **core**: Log level
//! - **llm**: Model provider settings and call timeout
//! - **agent**: Prompt templates and turn guards
//! - **tools**: Tool enablement and per-tool backends
//! - **server**: Chat widget / HTTP API bind address
//!
//! # Path Resolution
//!
//! `~` expands to the user's home directory. Relative paths (prompts file,
//! guest dataset) resolve against the directory holding the config file.
//!
//! # Environment Overrides
//!
//! `OLLAMA_HOST` and `ALFRED_MODEL` override `[llm.ollama]` after the file is read.
//!
//! # Examples
//!
//! ```no_run
//! use alfred_engine::config::Config;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = Config::load_or_create()?;
//! println!("Model: {}", config.llm.ollama.model);
//! println!("Prompts: {:?}", config.agent.prompts_file);
//! # Ok(())
//! # }
//! ```

use sdk::errors::EngineError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Environment variable overriding the Ollama base URL
pub const ENV_OLLAMA_HOST: &str = "OLLAMA_HOST";

/// Environment variable overriding the model name
pub const ENV_MODEL: &str = "ALFRED_MODEL";

/// Prompt templates written next to a freshly created config
const DEFAULT_PROMPTS: &str = include_str!("../../assets/prompts.yaml");

/// Guest list written next to a freshly created config
const DEFAULT_GUESTS: &str = include_str!("../../assets/guests.json");

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Core settings
    #[serde(default)]
    pub core: CoreConfig,

    /// Model provider configuration
    #[serde(default)]
    pub llm: LLMConfig,

    /// Turn loop configuration
    #[serde(default)]
    pub agent: AgentConfig,

    /// Tool enablement and backends
    #[serde(default)]
    pub tools: ToolsConfig,

    /// HTTP server configuration
    #[serde(default)]
    pub server: ServerConfig,
}

/// Core configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoreConfig {
    /// Log level (error, warn, info, debug, trace)
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

/// Model provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LLMConfig {
    /// Provider name (only "ollama" is built in)
    #[serde(default = "default_provider")]
    pub provider: String,

    /// Timeout for a single model call in seconds
    #[serde(default = "default_llm_timeout")]
    pub timeout_secs: u64,

    /// Ollama provider settings
    #[serde(default)]
    pub ollama: OllamaConfig,
}

/// Ollama provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OllamaConfig {
    /// Base URL for Ollama API
    #[serde(default = "default_ollama_base_url")]
    pub base_url: String,

    /// Model name
    #[serde(default = "default_ollama_model")]
    pub model: String,

    /// Sampling temperature; the model default applies when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
}

/// Turn loop configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    /// YAML file holding prompt templates
    #[serde(default = "default_prompts_file")]
    pub prompts_file: PathBuf,

    /// Template name used as the system prompt
    #[serde(default = "default_system_prompt_key")]
    pub system_prompt_key: String,

    /// Maximum tool rounds within one turn
    #[serde(default = "default_max_rounds")]
    pub max_rounds: usize,

    /// Maximum size of a tool result or final answer in bytes
    #[serde(default = "default_max_result_bytes")]
    pub max_result_bytes: usize,
}

/// Tools configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ToolsConfig {
    /// Web search tool
    #[serde(default)]
    pub web_search: WebSearchConfig,

    /// Weather lookup tool
    #[serde(default)]
    pub weather_info: WeatherConfig,

    /// Model hub statistics tool
    #[serde(default)]
    pub hub_stats: HubStatsConfig,

    /// Guest information retriever
    #[serde(default)]
    pub guest_info: GuestInfoConfig,
}

/// Web search tool configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebSearchConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// DuckDuckGo Instant Answer endpoint
    #[serde(default = "default_web_search_base_url")]
    pub base_url: String,

    /// Maximum number of results returned to the model
    #[serde(default = "default_max_results")]
    pub max_results: usize,
}

/// Weather tool configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeatherConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// wttr.in compatible endpoint
    #[serde(default = "default_weather_base_url")]
    pub base_url: String,
}

/// Hub statistics tool configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HubStatsConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Hugging Face Hub endpoint
    #[serde(default = "default_hub_base_url")]
    pub base_url: String,
}

/// Guest retriever configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GuestInfoConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// JSON file with the guest list
    #[serde(default = "default_guest_dataset")]
    pub dataset: PathBuf,

    /// Number of guest records returned per query
    #[serde(default = "default_top_k")]
    pub top_k: usize,
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Bind address for the chat widget and API
    #[serde(default = "default_bind")]
    pub bind: String,
}

// Default value functions
fn default_log_level() -> String {
    "info".to_string()
}

fn default_true() -> bool {
    true
}

fn default_provider() -> String {
    "ollama".to_string()
}

fn default_llm_timeout() -> u64 {
    300
}

fn default_ollama_base_url() -> String {
    "http://localhost:11434".to_string()
}

fn default_ollama_model() -> String {
    "qwen2:7b".to_string()
}

fn default_prompts_file() -> PathBuf {
    PathBuf::from("prompts.yaml")
}

fn default_system_prompt_key() -> String {
    "system_prompt".to_string()
}

fn default_max_rounds() -> usize {
    20
}

fn default_max_result_bytes() -> usize {
    5 * 1024 * 1024
}

fn default_web_search_base_url() -> String {
    "https://api.duckduckgo.com".to_string()
}

fn default_max_results() -> usize {
    5
}

fn default_weather_base_url() -> String {
    "https://wttr.in".to_string()
}

fn default_hub_base_url() -> String {
    "https://huggingface.co".to_string()
}

fn default_guest_dataset() -> PathBuf {
    PathBuf::from("guests.json")
}

fn default_top_k() -> usize {
    3
}

fn default_bind() -> String {
    "127.0.0.1:7860".to_string()
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

impl Default for LLMConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            timeout_secs: default_llm_timeout(),
            ollama: OllamaConfig::default(),
        }
    }
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            base_url: default_ollama_base_url(),
            model: default_ollama_model(),
            temperature: None,
        }
    }
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            prompts_file: default_prompts_file(),
            system_prompt_key: default_system_prompt_key(),
            max_rounds: default_max_rounds(),
            max_result_bytes: default_max_result_bytes(),
        }
    }
}

impl Default for WebSearchConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            base_url: default_web_search_base_url(),
            max_results: default_max_results(),
        }
    }
}

impl Default for WeatherConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            base_url: default_weather_base_url(),
        }
    }
}

impl Default for HubStatsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            base_url: default_hub_base_url(),
        }
    }
}

impl Default for GuestInfoConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            dataset: default_guest_dataset(),
            top_k: default_top_k(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::default_config()
    }
}

impl Config {
    /// Load configuration from the default location (~/.alfred/config.toml)
    ///
    /// If the configuration file doesn't exist, creates a default configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Configuration file cannot be read or written
    /// - TOML parsing fails
    /// - Validation fails
    pub fn load_or_create() -> Result<Self, EngineError> {
        let config_path = Self::default_config_path()?;

        if config_path.exists() {
            Self::load_from_path(&config_path)
        } else {
            Self::create_default(&config_path)
        }
    }

    /// Load configuration from a specific path
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - File cannot be read
    /// - TOML parsing fails
    /// - Validation fails
    pub fn load_from_path(path: &Path) -> Result<Self, EngineError> {
        let contents = fs::read_to_string(path)
            .map_err(|e| EngineError::Config(format!("Failed to read config file: {}", e)))?;

        let mut config = Self::from_toml_str(&contents)?;
        let base_dir = path.parent().unwrap_or_else(|| Path::new("."));
        config.resolve_paths(base_dir)?;

        Ok(config)
    }

    /// Parse and validate a configuration from TOML text.
    ///
    /// Environment overrides are applied; relative paths are left untouched.
    pub fn from_toml_str(contents: &str) -> Result<Self, EngineError> {
        let mut config: Config = toml::from_str(contents)
            .map_err(|e| EngineError::Config(format!("Failed to parse config: {}", e)))?;

        config.apply_env_overrides();
        config.validate()?;

        Ok(config)
    }

    /// Create default configuration and save to path
    fn create_default(path: &Path) -> Result<Self, EngineError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                EngineError::Config(format!("Failed to create config directory: {}", e))
            })?;
        }

        let config = Self::default_config();

        let toml_string = toml::to_string_pretty(&config)
            .map_err(|e| EngineError::Config(format!("Failed to serialize config: {}", e)))?;

        fs::write(path, toml_string)
            .map_err(|e| EngineError::Config(format!("Failed to write config file: {}", e)))?;

        // Seed the relative prompts/guest files the default config points at
        let base_dir = path.parent().unwrap_or_else(|| Path::new("."));
        seed_file(&base_dir.join(&config.agent.prompts_file), DEFAULT_PROMPTS)?;
        seed_file(&base_dir.join(&config.tools.guest_info.dataset), DEFAULT_GUESTS)?;

        tracing::info!("Created default configuration at {}", path.display());
        Self::load_from_path(path)
    }

    /// Get the default configuration file path (~/.alfred/config.toml)
    fn default_config_path() -> Result<PathBuf, EngineError> {
        let home = dirs::home_dir()
            .ok_or_else(|| EngineError::Config("Could not determine home directory".to_string()))?;

        Ok(home.join(".alfred").join("config.toml"))
    }

    /// Create a default configuration
    fn default_config() -> Self {
        Self {
            core: CoreConfig::default(),
            llm: LLMConfig::default(),
            agent: AgentConfig::default(),
            tools: ToolsConfig::default(),
            server: ServerConfig::default(),
        }
    }

    /// Apply `OLLAMA_HOST` / `ALFRED_MODEL` overrides
    fn apply_env_overrides(&mut self) {
        if let Ok(host) = std::env::var(ENV_OLLAMA_HOST) {
            if !host.trim().is_empty() {
                self.llm.ollama.base_url = normalize_host(host.trim());
            }
        }
        if let Ok(model) = std::env::var(ENV_MODEL) {
            if !model.trim().is_empty() {
                self.llm.ollama.model = model.trim().to_string();
            }
        }
    }

    /// Validate field values
    ///
    /// # Errors
    ///
    /// Returns `EngineError::Config` describing the first invalid field.
    pub fn validate(&self) -> Result<(), EngineError> {
        let valid_log_levels = ["error", "warn", "info", "debug", "trace"];
        if !valid_log_levels.contains(&self.core.log_level.as_str()) {
            return Err(EngineError::Config(format!(
                "Invalid log level '{}'. Must be one of: {}",
                self.core.log_level,
                valid_log_levels.join(", ")
            )));
        }

        let valid_providers = ["ollama"];
        if !valid_providers.contains(&self.llm.provider.as_str()) {
            return Err(EngineError::Config(format!(
                "Invalid provider '{}'. Must be one of: {}",
                self.llm.provider,
                valid_providers.join(", ")
            )));
        }

        if self.llm.timeout_secs == 0 {
            return Err(EngineError::Config(
                "llm.timeout_secs must be greater than 0".to_string(),
            ));
        }

        if self.llm.ollama.model.trim().is_empty() {
            return Err(EngineError::Config(
                "llm.ollama.model must not be empty".to_string(),
            ));
        }

        if let Some(temperature) = self.llm.ollama.temperature {
            if !(0.0..=2.0).contains(&temperature) {
                return Err(EngineError::Config(
                    "llm.ollama.temperature must be between 0.0 and 2.0".to_string(),
                ));
            }
        }

        if self.agent.system_prompt_key.trim().is_empty() {
            return Err(EngineError::Config(
                "agent.system_prompt_key must not be empty".to_string(),
            ));
        }

        if self.agent.max_rounds == 0 {
            return Err(EngineError::Config(
                "agent.max_rounds must be at least 1".to_string(),
            ));
        }

        if self.tools.web_search.max_results == 0 {
            return Err(EngineError::Config(
                "tools.web_search.max_results must be at least 1".to_string(),
            ));
        }

        if self.tools.guest_info.top_k == 0 {
            return Err(EngineError::Config(
                "tools.guest_info.top_k must be at least 1".to_string(),
            ));
        }

        Ok(())
    }

    /// Expand `~` and anchor relative paths at `base_dir`
    pub fn resolve_paths(&mut self, base_dir: &Path) -> Result<(), EngineError> {
        self.agent.prompts_file = anchor(expand_path(&self.agent.prompts_file)?, base_dir);
        self.tools.guest_info.dataset =
            anchor(expand_path(&self.tools.guest_info.dataset)?, base_dir);
        Ok(())
    }
}

/// Accept `host:port` as well as a full URL, as the Ollama CLI does
fn normalize_host(host: &str) -> String {
    let host = host.trim_end_matches('/');
    if host.starts_with("http://") || host.starts_with("https://") {
        host.to_string()
    } else {
        format!("http://{}", host)
    }
}

/// Write `contents` to `path` unless the file already exists
fn seed_file(path: &Path, contents: &str) -> Result<(), EngineError> {
    if path.exists() {
        return Ok(());
    }
    fs::write(path, contents).map_err(|e| {
        EngineError::Config(format!("Failed to write {}: {}", path.display(), e))
    })
}

fn anchor(path: PathBuf, base_dir: &Path) -> PathBuf {
    if path.is_absolute() {
        path
    } else {
        base_dir.join(path)
    }
}

/// Expand ~ in path to user's home directory
fn expand_path(path: &Path) -> Result<PathBuf, EngineError> {
    let path_str = path
        .to_str()
        .ok_or_else(|| EngineError::Config("Invalid UTF-8 in path".to_string()))?;

    if let Some(rest) = path_str.strip_prefix("~/") {
        let home = dirs::home_dir()
            .ok_or_else(|| EngineError::Config("Could not determine home directory".to_string()))?;

        Ok(home.join(rest))
    } else if path_str == "~" {
        dirs::home_dir()
            .ok_or_else(|| EngineError::Config("Could not determine home directory".to_string()))
    } else {
        Ok(path.to_path_buf())
    }
}
