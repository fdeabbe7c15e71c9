//! Configuration types, defaults, loading, and validation.

use super::secrets::SecretString;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// A2A relay server
    #[serde(default)]
    pub a2a: A2aConfig,

    /// Search agent behaviour
    #[serde(default)]
    pub agent: AgentConfig,

    /// LLM provider configurations
    #[serde(default)]
    pub providers: ProviderConfigs,

    /// Web search tool configuration
    #[serde(default)]
    pub search: SearchConfig,

    /// Question-answering service
    #[serde(default)]
    pub ask: AskConfig,

    /// OTLP telemetry export
    #[serde(default)]
    pub telemetry: TelemetryConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// A2A (Agent-to-Agent) relay server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct A2aConfig {
    /// Bind address (default: "0.0.0.0")
    #[serde(default = "default_a2a_bind")]
    pub bind: String,

    /// Listen port (default: 10000, `PORT` env overrides)
    #[serde(default = "default_a2a_port")]
    pub port: u16,

    /// Public URL advertised in the agent card (`SERVICE_URL` env overrides).
    /// Defaults to `http://localhost:{port}`.
    #[serde(default)]
    pub service_url: Option<String>,

    /// Allowed CORS origins. Empty disables CORS, `"*"` allows any origin.
    #[serde(default)]
    pub allowed_origins: Vec<String>,

    /// Optional bearer token required on the JSON-RPC endpoint.
    #[serde(default)]
    pub api_key: Option<SecretString>,

    /// Forward tool calls and tool results as working-status events.
    #[serde(default = "default_true")]
    pub forward_tool_calls: bool,
}

impl A2aConfig {
    /// URL other agents should use to reach this relay.
    pub fn public_url(&self) -> String {
        self.service_url
            .clone()
            .unwrap_or_else(|| format!("http://localhost:{}", self.port))
    }
}

impl Default for A2aConfig {
    fn default() -> Self {
        Self {
            bind: default_a2a_bind(),
            port: default_a2a_port(),
            service_url: None,
            allowed_origins: vec![],
            api_key: None,
            forward_tool_calls: true,
        }
    }
}

fn default_a2a_bind() -> String {
    "0.0.0.0".to_string()
}

fn default_a2a_port() -> u16 {
    10000
}

fn default_true() -> bool {
    true
}

/// Agent loop configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Model override; provider default when unset
    #[serde(default)]
    pub model: Option<String>,

    /// Max model/tool round trips before the structured response is requested
    #[serde(default = "default_max_iterations")]
    pub max_iterations: usize,

    /// Max output tokens per model call
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            model: None,
            max_iterations: default_max_iterations(),
            max_tokens: default_max_tokens(),
        }
    }
}

fn default_max_iterations() -> usize {
    10
}

fn default_max_tokens() -> u32 {
    4096
}

/// LLM provider configurations
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProviderConfigs {
    #[serde(default)]
    pub anthropic: Option<ProviderConfig>,
    #[serde(default)]
    pub openai: Option<ProviderConfig>,
}

/// Individual provider configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Explicitly selected as the agent's provider
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub api_key: Option<SecretString>,
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default)]
    pub default_model: Option<String>,
}

impl ProviderConfig {
    pub fn has_key(&self) -> bool {
        self.api_key.as_ref().is_some_and(|k| !k.is_empty())
    }
}

/// Tavily search configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    #[serde(default)]
    pub api_key: Option<SecretString>,

    /// Results per search (default: 2)
    #[serde(default = "default_max_results")]
    pub max_results: u32,

    /// "general" or "news"
    #[serde(default = "default_topic")]
    pub topic: String,

    /// "basic" or "advanced"
    #[serde(default = "default_search_depth")]
    pub search_depth: String,

    #[serde(default)]
    pub base_url: Option<String>,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            max_results: default_max_results(),
            topic: default_topic(),
            search_depth: default_search_depth(),
            base_url: None,
        }
    }
}

fn default_max_results() -> u32 {
    2
}

fn default_topic() -> String {
    "general".to_string()
}

fn default_search_depth() -> String {
    "basic".to_string()
}

/// Question-answering service configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AskConfig {
    #[serde(default = "default_a2a_bind")]
    pub bind: String,

    /// Listen port (default: 8000)
    #[serde(default = "default_ask_port")]
    pub port: u16,

    /// Chat-completion model (default: gpt-4o-mini)
    #[serde(default = "default_ask_model")]
    pub model: String,

    /// Service name reported in health checks and telemetry
    #[serde(default = "default_ask_service_name")]
    pub service_name: String,
}

impl Default for AskConfig {
    fn default() -> Self {
        Self {
            bind: default_a2a_bind(),
            port: default_ask_port(),
            model: default_ask_model(),
            service_name: default_ask_service_name(),
        }
    }
}

fn default_ask_port() -> u16 {
    8000
}

fn default_ask_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_ask_service_name() -> String {
    "Open-AI Q/A Agent".to_string()
}

/// OTLP export configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelemetryConfig {
    /// Export from the relay as well (the ask service always exports)
    #[serde(default)]
    pub enabled: bool,

    /// Collector gRPC endpoint. Falls back to `~/.a2a/config.json`, then `localhost:4317`.
    #[serde(default)]
    pub endpoint: Option<String>,

    /// Metric export period in seconds (default: 5)
    #[serde(default = "default_export_interval")]
    pub export_interval_secs: u64,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            endpoint: None,
            export_interval_secs: default_export_interval(),
        }
    }
}

fn default_export_interval() -> u64 {
    5
}

pub const DEFAULT_COLLECTOR_ENDPOINT: &str = "localhost:4317";

impl TelemetryConfig {
    /// Collector endpoint with an `http://` scheme, as tonic expects.
    pub fn resolved_endpoint(&self) -> String {
        let raw = self
            .endpoint
            .clone()
            .or_else(|| dirs::home_dir().and_then(|home| collector_from_a2a_config(&home)))
            .unwrap_or_else(|| DEFAULT_COLLECTOR_ENDPOINT.to_string());
        with_http_scheme(&raw)
    }
}

/// Read `collector.endpointGrpc` from `<home>/.a2a/config.json`.
pub fn collector_from_a2a_config(home: &Path) -> Option<String> {
    let path = home.join(".a2a").join("config.json");
    let contents = fs::read_to_string(&path).ok()?;
    let value: serde_json::Value = match serde_json::from_str(&contents) {
        Ok(v) => v,
        Err(e) => {
            tracing::warn!("Ignoring malformed {:?}: {}", path, e);
            return None;
        }
    };
    value
        .get("collector")
        .and_then(|c| c.get("endpointGrpc"))
        .and_then(|e| e.as_str())
        .map(|e| e.trim_start_matches("http://").to_string())
}

fn with_http_scheme(endpoint: &str) -> String {
    if endpoint.starts_with("http://") || endpoint.starts_with("https://") {
        endpoint.to_string()
    } else {
        format!("http://{}", endpoint)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Emit JSON lines instead of human-readable output
    #[serde(default)]
    pub json: bool,

    /// Directory for daily-rolling log files
    #[serde(default)]
    pub directory: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
            directory: None,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Config {
    /// Load configuration from default locations
    ///
    /// Priority (lowest to highest):
    /// 1. Default values
    /// 2. System config: ~/.tavily-agent/config.toml
    /// 3. Local config: ./tavily-agent.toml
    /// 4. Environment variables
    pub fn load() -> Result<Self> {
        tracing::debug!("Loading configuration...");

        let layers: Vec<PathBuf> = Self::system_config_path()
            .into_iter()
            .chain(std::iter::once(Self::local_config_path()))
            .collect();
        let config = Self::from_layers(&layers)?;
        let config = Self::finish(config)?;

        tracing::debug!("Configuration loaded successfully");
        Ok(config)
    }

    /// Load configuration with `path` in place of the local config file,
    /// still layered over the system config, then apply env overrides.
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        tracing::debug!("Loading configuration from custom path: {:?}", path);

        if !path.exists() {
            anyhow::bail!("Config file not found: {:?}", path);
        }
        let layers: Vec<PathBuf> = Self::system_config_path()
            .into_iter()
            .chain(std::iter::once(path.to_path_buf()))
            .collect();
        Self::finish(Self::from_layers(&layers)?)
    }

    fn finish(config: Self) -> Result<Self> {
        let mut config = Self::apply_env_overrides(config, |key| std::env::var(key).ok())?;
        config.logging.directory = config.logging.directory.map(|d| expand_tilde(&d));
        Ok(config)
    }

    /// Get the system config path: ~/.tavily-agent/config.toml
    pub fn system_config_path() -> Option<PathBuf> {
        dirs::home_dir().map(|home| home.join(".tavily-agent").join("config.toml"))
    }

    fn local_config_path() -> PathBuf {
        PathBuf::from("./tavily-agent.toml")
    }

    /// Merge the existing files in `paths`, later files winning key by key,
    /// over the defaults.
    pub fn from_layers<P: AsRef<Path>>(paths: &[P]) -> Result<Self> {
        let mut merged = toml::Table::new();
        for path in paths {
            let path = path.as_ref();
            if !path.exists() {
                continue;
            }
            tracing::debug!("Loading config layer from: {:?}", path);
            merge_tables(&mut merged, Self::read_table(path)?);
        }
        toml::Value::Table(merged)
            .try_into()
            .context("Failed to parse merged configuration")
    }

    fn read_table(path: &Path) -> Result<toml::Table> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        toml::from_str(&contents).with_context(|| format!("Failed to parse config file: {:?}", path))
    }

    /// Apply environment variable overrides. `lookup` is `std::env::var` in production.
    pub fn apply_env_overrides<F>(mut config: Self, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(port) = lookup("PORT") {
            config.a2a.port = port
                .trim()
                .parse()
                .with_context(|| format!("PORT is not a valid port number: {:?}", port))?;
        }

        if let Some(url) = lookup("SERVICE_URL").filter(|u| !u.is_empty()) {
            config.a2a.service_url = Some(url);
        }

        if let Some(key) = lookup("TAVILY_API_KEY").filter(|k| !k.is_empty()) {
            config.search.api_key = Some(SecretString::new(key));
        }

        if let Some(key) = lookup("ANTHROPIC_API_KEY").filter(|k| !k.is_empty()) {
            config
                .providers
                .anthropic
                .get_or_insert_with(ProviderConfig::default)
                .api_key = Some(SecretString::new(key));
        }

        if let Some(key) = lookup("OPENAI_API_KEY").filter(|k| !k.is_empty()) {
            config
                .providers
                .openai
                .get_or_insert_with(ProviderConfig::default)
                .api_key = Some(SecretString::new(key));
        }

        if let Some(level) = lookup("TAVILY_AGENT_LOG_LEVEL") {
            config.logging.level = level;
        }

        if let Some(endpoint) = lookup("OTEL_EXPORTER_OTLP_ENDPOINT").filter(|e| !e.is_empty()) {
            config.telemetry.endpoint = Some(endpoint);
        }

        Ok(config)
    }

    /// Fail early when the relay cannot possibly serve a request.
    pub fn validate_for_relay(&self) -> Result<()> {
        if !self.search.api_key.as_ref().is_some_and(|k| !k.is_empty()) {
            anyhow::bail!("No Tavily API key configured. Set TAVILY_API_KEY or [search].api_key.");
        }
        let has_llm = [&self.providers.anthropic, &self.providers.openai]
            .into_iter()
            .flatten()
            .any(|p| p.has_key() || p.base_url.is_some());
        if !has_llm {
            anyhow::bail!(
                "No LLM provider configured. Set ANTHROPIC_API_KEY or OPENAI_API_KEY, or configure [providers]."
            );
        }
        Ok(())
    }

    /// Save configuration to file
    pub fn save(&self, path: &Path) -> Result<()> {
        let toml_string =
            toml::to_string_pretty(self).context("Failed to serialize config to TOML")?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create config directory: {:?}", parent))?;
        }
        fs::write(path, toml_string)
            .with_context(|| format!("Failed to write config file: {:?}", path))?;
        tracing::info!("Configuration saved to: {:?}", path);
        Ok(())
    }
}

/// Deep-merge `overlay` into `base`: tables merge recursively, any other
/// value in `overlay` replaces the one in `base`.
fn merge_tables(base: &mut toml::Table, overlay: toml::Table) {
    for (key, value) in overlay {
        match (base.get_mut(&key), value) {
            (Some(toml::Value::Table(existing)), toml::Value::Table(incoming)) => {
                merge_tables(existing, incoming)
            }
            (_, value) => {
                base.insert(key, value);
            }
        }
    }
}

fn expand_tilde(p: &Path) -> PathBuf {
    if let Ok(rest) = p.strip_prefix("~") {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(rest)
    } else {
        p.to_path_buf()
    }
}
