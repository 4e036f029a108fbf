use crate::errors::{ConfigError, ConfigResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

const APP_NAME: &str = "crafter-agent";

/// Which flavour of chat completions API a model is served from
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    #[default]
    OpenAi,
    Azure,
}

/// One entry of the model registry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Model (or Azure deployment) name sent upstream.
    pub model: String,
    /// Base URL, e.g. `https://api.openai.com/v1`.
    pub endpoint: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    #[serde(default)]
    pub provider: Provider,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_version: Option<String>,
    /// Context limit in thousands of characters.
    pub context_limit: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    #[serde(default = "default_true")]
    pub system_prompt_support: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_timeout_secs: Option<u64>,
}

impl ModelConfig {
    /// Maximum characters kept per turn after normalization
    pub fn context_budget(&self) -> usize {
        self.context_limit.saturating_mul(1000)
    }

    /// API key from the config file, or from the provider's environment variable.
    pub fn resolve_api_key(&self) -> Option<String> {
        if let Some(key) = self.api_key.as_ref().filter(|k| !k.is_empty()) {
            return Some(key.clone());
        }
        let var = match self.provider {
            Provider::OpenAi => "OPENAI_API_KEY",
            Provider::Azure => "AZURE_OPENAI_API_KEY",
        };
        env::var(var).ok().filter(|k| !k.is_empty())
    }
}

/// Backoff policy for transient transport failures
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrySettings {
    pub max_attempts: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
    /// Upper bound accepted for `(max_attempts - 1) * max_delay_ms`, the
    /// longest one request can spend backing off.
    pub max_total_wait_secs: u64,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_attempts: 100,
            base_delay_ms: 1_000,
            max_delay_ms: 10_000,
            max_total_wait_secs: 3_600,
        }
    }
}

impl RetrySettings {
    pub fn base_delay(&self) -> Duration {
        Duration::from_millis(self.base_delay_ms)
    }

    pub fn max_delay(&self) -> Duration {
        Duration::from_millis(self.max_delay_ms)
    }

    /// Longest a single `send` can spend sleeping between attempts.
    pub fn worst_case_wait(&self) -> Duration {
        Duration::from_millis(
            self.max_delay_ms
                .saturating_mul(u64::from(self.max_attempts.saturating_sub(1))),
        )
    }
}

/// Prompt flavour used by the action selector
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentType {
    #[default]
    Plain,
    Cot,
}

impl std::str::FromStr for AgentType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "plain" => Ok(AgentType::Plain),
            "cot" => Ok(AgentType::Cot),
            other => Err(format!("unknown agent type `{}` (expected plain or cot)", other)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentSettings {
    /// Key into the model registry.
    pub model: String,
    pub agent_type: AgentType,
    pub max_selection_attempts: u32,
    pub history_size: usize,
    pub step_budget: u32,
    pub map_size: u32,
    pub log_dir: PathBuf,
    /// Tell the model why its previous answer was rejected when retrying.
    pub feedback_on_retry: bool,
}

impl Default for AgentSettings {
    fn default() -> Self {
        Self {
            model: "gpt-4o".to_string(),
            agent_type: AgentType::Plain,
            max_selection_attempts: 20,
            history_size: 5,
            step_budget: 1_000,
            map_size: 64,
            log_dir: PathBuf::from("log"),
            feedback_on_retry: false,
        }
    }
}

/// How to launch the external game-engine bridge
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineSettings {
    pub command: String,
    pub args: Vec<String>,
    pub seed: u64,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            command: "python3".to_string(),
            args: vec!["-m".to_string(), "crafter_bridge".to_string()],
            seed: 43,
        }
    }
}

/// Everything the agent process needs, loaded once at startup and never mutated
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UnifiedConfig {
    pub agent: AgentSettings,
    pub retry: RetrySettings,
    pub engine: EngineSettings,
    pub models: BTreeMap<String, ModelConfig>,
}

impl Default for UnifiedConfig {
    fn default() -> Self {
        let mut models = BTreeMap::new();
        models.insert(
            "gpt-4o".to_string(),
            ModelConfig {
                model: "gpt-4o".to_string(),
                endpoint: "https://api.openai.com/v1".to_string(),
                api_key: None,
                provider: Provider::OpenAi,
                api_version: None,
                context_limit: 128,
                max_tokens: None,
                system_prompt_support: true,
                request_timeout_secs: Some(120),
            },
        );
        Self {
            agent: AgentSettings::default(),
            retry: RetrySettings::default(),
            engine: EngineSettings::default(),
            models,
        }
    }
}

impl UnifiedConfig {
    /// Loads configuration from a file if it exists, otherwise returns the default config
    pub fn load_from_file(path: &Path) -> ConfigResult<Self> {
        if path.exists() {
            let content = fs::read_to_string(path)?;
            let config: Self = toml::from_str(&content)?;
            Ok(config)
        } else {
            Ok(Self::default())
        }
    }

    /// Loads from `~/.config/crafter-agent/config.toml`, falling back to defaults
    pub fn load() -> ConfigResult<Self> {
        match get_default_config_file() {
            Some(path) => Self::load_from_file(&path),
            None => Ok(Self::default()),
        }
    }

    /// Saves configuration to a file
    pub fn save_to_file(&self, path: &Path) -> ConfigResult<()> {
        let content = toml::to_string_pretty(self)?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        fs::write(path, content)?;
        Ok(())
    }

    /// Registry entry for the model the agent is configured to use
    pub fn active_model(&self) -> ConfigResult<&ModelConfig> {
        self.models
            .get(&self.agent.model)
            .ok_or_else(|| ConfigError::UnknownModel(self.agent.model.clone()))
    }

    /// Longest one step can spend backing off: every selection attempt may
    /// exhaust the transport's retry budget before being rejected.
    pub fn worst_case_step_wait(&self) -> Duration {
        self.retry
            .worst_case_wait()
            .saturating_mul(self.agent.max_selection_attempts)
    }

    /// Checks bounds that must hold before any request is issued.
    pub fn validate(&self) -> ConfigResult<()> {
        let model = self.active_model()?;

        if self.retry.max_attempts == 0 {
            return Err(ConfigError::Invalid(
                "retry.max_attempts must be at least 1".to_string(),
            ));
        }
        if self.agent.max_selection_attempts == 0 {
            return Err(ConfigError::Invalid(
                "agent.max_selection_attempts must be at least 1".to_string(),
            ));
        }
        if self.retry.base_delay_ms > self.retry.max_delay_ms {
            return Err(ConfigError::Invalid(format!(
                "retry.base_delay_ms ({}) exceeds retry.max_delay_ms ({})",
                self.retry.base_delay_ms, self.retry.max_delay_ms
            )));
        }
        let worst = self.retry.worst_case_wait();
        if worst > Duration::from_secs(self.retry.max_total_wait_secs) {
            return Err(ConfigError::Invalid(format!(
                "worst-case backoff of {}s exceeds retry.max_total_wait_secs ({}s)",
                worst.as_secs(),
                self.retry.max_total_wait_secs
            )));
        }
        if model.context_limit == 0 {
            return Err(ConfigError::Invalid(format!(
                "model `{}` has a zero context_limit",
                self.agent.model
            )));
        }
        if model.provider == Provider::Azure && model.api_version.is_none() {
            return Err(ConfigError::Invalid(format!(
                "azure model `{}` needs an api_version",
                self.agent.model
            )));
        }
        Ok(())
    }
}

fn default_true() -> bool {
    true
}

/// Helper function to get default config directory
pub fn get_default_config_dir() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".config").join(APP_NAME))
}

/// Helper function to get default config file path
pub fn get_default_config_file() -> Option<PathBuf> {
    get_default_config_dir().map(|dir| dir.join("config.toml"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_validate() {
        let config = UnifiedConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.active_model().unwrap().context_budget(), 128_000);
        assert_eq!(config.retry.worst_case_wait(), Duration::from_secs(990));
        assert_eq!(config.worst_case_step_wait(), Duration::from_secs(990 * 20));
    }

    #[test]
    fn test_unknown_model_is_rejected() {
        let mut config = UnifiedConfig::default();
        config.agent.model = "missing".to_string();
        assert!(matches!(config.validate(), Err(ConfigError::UnknownModel(m)) if m == "missing"));
    }

    #[test]
    fn test_worst_case_wait_bound() {
        let mut config = UnifiedConfig::default();
        config.retry.max_total_wait_secs = 60;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_base_delay_above_cap_is_rejected() {
        let mut config = UnifiedConfig::default();
        config.retry.base_delay_ms = 20_000;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_partial_toml_fills_defaults() {
        let toml_str = r#"
            [agent]
            model = "local"
            agent_type = "cot"

            [models.local]
            model = "llama3"
            endpoint = "http://localhost:11434/v1"
            context_limit = 8
            system_prompt_support = false
        "#;
        let config: UnifiedConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.agent.agent_type, AgentType::Cot);
        assert_eq!(config.agent.max_selection_attempts, 20);
        assert_eq!(config.retry.max_attempts, 100);
        let model = config.active_model().unwrap();
        assert!(!model.system_prompt_support);
        assert_eq!(model.provider, Provider::OpenAi);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_azure_requires_api_version() {
        let mut config = UnifiedConfig::default();
        let model = config.models.get_mut("gpt-4o").unwrap();
        model.provider = Provider::Azure;
        assert!(config.validate().is_err());
        config.models.get_mut("gpt-4o").unwrap().api_version = Some("2024-06-01".to_string());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_save_and_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        let mut config = UnifiedConfig::default();
        config.engine.seed = 7;
        config.save_to_file(&path).unwrap();

        let loaded = UnifiedConfig::load_from_file(&path).unwrap();
        assert_eq!(loaded.engine.seed, 7);
        assert!(loaded.models.contains_key("gpt-4o"));
    }

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let loaded = UnifiedConfig::load_from_file(&dir.path().join("nope.toml")).unwrap();
        assert_eq!(loaded.agent.model, "gpt-4o");
    }
}
