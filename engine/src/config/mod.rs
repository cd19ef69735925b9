//! Configuration management
//!
//! This module handles loading, validation, and management of the Genesis configuration.
//! Configuration is stored in TOML format at ~/.genesis/config.toml.
//!
//! # Configuration Sections
//!
//! - **core**: Workspace path, log level
//! - **llm**: Endpoint and model for each provider
//! - **agent**: Decision loop cap and conversation pruning limits
//!
//! API keys are never stored here; see [`crate::secrets::ApiKeys`].
//!
//! # Examples
//!
//! ```no_run
//! use genesis_engine::config::Config;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = Config::load_or_create()?;
//! println!("Workspace: {:?}", config.core.workspace);
//! println!("Local model: {}", config.llm.ollama.model);
//! # Ok(())
//! # }
//! ```

use sdk::errors::EngineError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Core engine settings
    #[serde(default)]
    pub core: CoreConfig,

    /// LLM provider configuration
    #[serde(default)]
    pub llm: LLMConfig,

    /// Agent and decision loop settings
    #[serde(default)]
    pub agent: AgentConfig,
}

/// Core engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoreConfig {
    /// Workspace directory path (supports ~ expansion, relative to cwd otherwise)
    #[serde(default = "default_workspace")]
    pub workspace: PathBuf,

    /// Log level (error, warn, info, debug, trace)
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

/// LLM provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LLMConfig {
    /// Anthropic Messages API (SMART tier)
    #[serde(default = "default_anthropic")]
    pub anthropic: ProviderEndpoint,

    /// DeepSeek, OpenAI-compatible (FAST tier)
    #[serde(default = "default_deepseek")]
    pub deepseek: ProviderEndpoint,

    /// OpenAI chat completions
    #[serde(default = "default_openai")]
    pub openai: ProviderEndpoint,

    /// Local Ollama, always configured
    #[serde(default = "default_ollama")]
    pub ollama: ProviderEndpoint,
}

/// Endpoint and model for one provider
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProviderEndpoint {
    /// Base URL of the API
    pub base_url: String,

    /// Model name
    pub model: String,
}

impl ProviderEndpoint {
    pub fn new(base_url: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            model: model.into(),
        }
    }
}

/// Agent configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Maximum chat turns per user request
    #[serde(default = "default_max_turns")]
    pub max_turns: usize,

    /// Conversation length that triggers pruning
    #[serde(default = "default_history_ceiling")]
    pub history_ceiling: usize,

    /// Messages kept (after the system message) when pruning
    #[serde(default = "default_history_tail")]
    pub history_tail: usize,

    /// Task state file, relative to the workspace
    #[serde(default = "default_task_state_file")]
    pub task_state_file: PathBuf,
}

// Default value functions
fn default_workspace() -> PathBuf {
    PathBuf::from("workspace")
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_anthropic() -> ProviderEndpoint {
    ProviderEndpoint::new("https://api.anthropic.com/v1", "claude-3-5-sonnet-20241022")
}

fn default_deepseek() -> ProviderEndpoint {
    ProviderEndpoint::new("https://api.deepseek.com", "deepseek-chat")
}

fn default_openai() -> ProviderEndpoint {
    ProviderEndpoint::new("https://api.openai.com/v1", "gpt-4o")
}

fn default_ollama() -> ProviderEndpoint {
    ProviderEndpoint::new("http://localhost:11434", "qwen2.5-coder:14b")
}

fn default_max_turns() -> usize {
    10
}

fn default_history_ceiling() -> usize {
    100
}

fn default_history_tail() -> usize {
    50
}

fn default_task_state_file() -> PathBuf {
    PathBuf::from("task_state.json")
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            workspace: default_workspace(),
            log_level: default_log_level(),
        }
    }
}

impl Default for LLMConfig {
    fn default() -> Self {
        Self {
            anthropic: default_anthropic(),
            deepseek: default_deepseek(),
            openai: default_openai(),
            ollama: default_ollama(),
        }
    }
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            max_turns: default_max_turns(),
            history_ceiling: default_history_ceiling(),
            history_tail: default_history_tail(),
            task_state_file: default_task_state_file(),
        }
    }
}

impl Config {
    /// Load configuration from the default location (~/.genesis/config.toml)
    ///
    /// If the configuration file doesn't exist, creates a default configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed, or if validation
    /// fails (bad log level, pruning limits out of order, unusable workspace).
    pub fn load_or_create() -> Result<Self, EngineError> {
        let config_path = Self::default_config_path()?;

        if config_path.exists() {
            Self::load_from_path(&config_path)
        } else {
            Self::create_default(&config_path)
        }
    }

    /// Load configuration from a specific path
    pub fn load_from_path(path: &Path) -> Result<Self, EngineError> {
        let contents = fs::read_to_string(path)
            .map_err(|e| EngineError::Config(format!("Failed to read config file: {}", e)))?;

        let mut config: Config = toml::from_str(&contents)
            .map_err(|e| EngineError::Config(format!("Failed to parse config: {}", e)))?;

        config.validate_and_process()?;

        Ok(config)
    }

    /// Create default configuration and save to path
    fn create_default(path: &Path) -> Result<Self, EngineError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                EngineError::Config(format!("Failed to create config directory: {}", e))
            })?;
        }

        let config = Self::default();

        let toml_string = toml::to_string_pretty(&config)
            .map_err(|e| EngineError::Config(format!("Failed to serialize config: {}", e)))?;

        fs::write(path, toml_string)
            .map_err(|e| EngineError::Config(format!("Failed to write config file: {}", e)))?;

        tracing::info!("Wrote default configuration to {}", path.display());

        let mut config = config;
        config.validate_and_process()?;
        Ok(config)
    }

    /// Get the default configuration file path (~/.genesis/config.toml)
    fn default_config_path() -> Result<PathBuf, EngineError> {
        let home = dirs::home_dir()
            .ok_or_else(|| EngineError::Config("Could not determine home directory".to_string()))?;

        Ok(home.join(".genesis").join("config.toml"))
    }

    /// Absolute path of the task state file
    pub fn task_state_path(&self) -> PathBuf {
        self.core.workspace.join(&self.agent.task_state_file)
    }

    /// Path of the event database
    pub fn event_db_path(&self) -> PathBuf {
        self.core.workspace.join("agent.db")
    }

    /// Directory holding the markdown session transcripts
    pub fn session_log_dir(&self) -> PathBuf {
        self.core.workspace.join("logs")
    }

    /// Validate settings without touching the filesystem
    pub fn validate(&self) -> Result<(), EngineError> {
        let valid_log_levels = ["error", "warn", "info", "debug", "trace"];
        if !valid_log_levels.contains(&self.core.log_level.as_str()) {
            return Err(EngineError::Config(format!(
                "Invalid log level '{}'. Must be one of: {}",
                self.core.log_level,
                valid_log_levels.join(", ")
            )));
        }

        if self.agent.max_turns == 0 {
            return Err(EngineError::Config(
                "agent.max_turns must be at least 1".to_string(),
            ));
        }

        if self.agent.history_tail == 0 || self.agent.history_tail >= self.agent.history_ceiling {
            return Err(EngineError::Config(format!(
                "agent.history_tail ({}) must be at least 1 and below agent.history_ceiling ({})",
                self.agent.history_tail, self.agent.history_ceiling
            )));
        }

        for (name, endpoint) in [
            ("anthropic", &self.llm.anthropic),
            ("deepseek", &self.llm.deepseek),
            ("openai", &self.llm.openai),
            ("ollama", &self.llm.ollama),
        ] {
            if endpoint.base_url.trim().is_empty() || endpoint.model.trim().is_empty() {
                return Err(EngineError::Config(format!(
                    "llm.{} needs both base_url and model",
                    name
                )));
            }
        }

        Ok(())
    }

    /// Validate and process configuration
    ///
    /// Validates settings, expands ~ in the workspace path, creates the
    /// workspace if needed and canonicalizes it.
    pub fn validate_and_process(&mut self) -> Result<(), EngineError> {
        self.validate()?;

        self.core.workspace = expand_path(&self.core.workspace)?;
        self.core.workspace = canonicalize_or_create(&self.core.workspace)?;

        if !self.core.workspace.is_dir() {
            return Err(EngineError::Config(format!(
                "Workspace path is not a directory: {:?}",
                self.core.workspace
            )));
        }

        Ok(())
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

/// Canonicalize path, creating it if it doesn't exist
fn canonicalize_or_create(path: &Path) -> Result<PathBuf, EngineError> {
    if !path.exists() {
        fs::create_dir_all(path).map_err(|e| {
            EngineError::Config(format!("Failed to create directory {:?}: {}", path, e))
        })?;
    }

    path.canonicalize()
        .map_err(|e| EngineError::PathCanonicalization(path.to_path_buf(), e.to_string()))
}
