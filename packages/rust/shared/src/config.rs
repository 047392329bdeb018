//! Application configuration for CreatorFlow.
//!
//! User config lives at `~/.creatorflow/creatorflow.toml`.
//! CLI flags override config file values, which override defaults.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{CreatorFlowError, Result};
use crate::run::StageKind;

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "creatorflow.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".creatorflow";

// ---------------------------------------------------------------------------
// Config structs (matching creatorflow.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Global defaults.
    #[serde(default)]
    pub defaults: DefaultsConfig,

    /// Generation provider settings.
    #[serde(default)]
    pub provider: ProviderConfig,

    /// Pipeline execution policy.
    #[serde(default)]
    pub pipeline: PipelinePolicyConfig,

    /// Lead generation policy.
    #[serde(default)]
    pub lead_gen: LeadGenConfig,
}

/// `[defaults]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DefaultsConfig {
    /// Default run database path.
    #[serde(default = "default_db_path")]
    pub db_path: String,

    /// Default content tone.
    #[serde(default = "default_tone")]
    pub tone: String,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            tone: default_tone(),
        }
    }
}

fn default_db_path() -> String {
    "~/.creatorflow/runs.db".into()
}
fn default_tone() -> String {
    "professional".into()
}

/// `[provider]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Name of the env var holding the API key (never store the key itself).
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,

    /// Model identifier sent to the completions endpoint.
    #[serde(default = "default_model")]
    pub model: String,

    /// Base URL of the OpenAI-compatible API.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// HTTP request timeout in seconds.
    #[serde(default = "default_provider_timeout")]
    pub timeout_secs: u64,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            api_key_env: default_api_key_env(),
            model: default_model(),
            base_url: default_base_url(),
            timeout_secs: default_provider_timeout(),
        }
    }
}

fn default_api_key_env() -> String {
    "OPENAI_API_KEY".into()
}
fn default_model() -> String {
    "gpt-4-turbo-preview".into()
}
fn default_base_url() -> String {
    "https://api.openai.com/v1".into()
}
fn default_provider_timeout() -> u64 {
    30
}

/// `[pipeline]` section. All values are policy, not protocol.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelinePolicyConfig {
    /// Default per-stage deadline in seconds.
    #[serde(default = "default_stage_timeout")]
    pub stage_timeout_secs: u64,

    /// Per-stage deadline overrides in seconds.
    #[serde(default)]
    pub research_timeout_secs: Option<u64>,
    #[serde(default)]
    pub lead_gen_timeout_secs: Option<u64>,
    #[serde(default)]
    pub content_timeout_secs: Option<u64>,
    #[serde(default)]
    pub outreach_timeout_secs: Option<u64>,

    /// Extra attempts after a recoverable stage failure.
    #[serde(default = "default_retry_limit")]
    pub retry_limit: u32,

    /// Fixed delay between attempts, in milliseconds.
    #[serde(default = "default_retry_delay")]
    pub retry_delay_ms: u64,
}

impl Default for PipelinePolicyConfig {
    fn default() -> Self {
        Self {
            stage_timeout_secs: default_stage_timeout(),
            research_timeout_secs: None,
            lead_gen_timeout_secs: None,
            content_timeout_secs: None,
            outreach_timeout_secs: None,
            retry_limit: default_retry_limit(),
            retry_delay_ms: default_retry_delay(),
        }
    }
}

fn default_stage_timeout() -> u64 {
    30
}
fn default_retry_limit() -> u32 {
    1
}
fn default_retry_delay() -> u64 {
    500
}

/// `[lead_gen]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LeadGenConfig {
    /// Maximum leads kept after ranking.
    #[serde(default = "default_max_leads")]
    pub max_leads: usize,
}

impl Default for LeadGenConfig {
    fn default() -> Self {
        Self {
            max_leads: default_max_leads(),
        }
    }
}

fn default_max_leads() -> usize {
    20
}

// ---------------------------------------------------------------------------
// Pipeline config (runtime, merged from config + CLI flags)
// ---------------------------------------------------------------------------

/// Runtime pipeline execution policy consumed by the orchestrator.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Default per-stage deadline.
    pub stage_timeout: Duration,
    /// Per-stage deadline overrides.
    pub research_timeout: Option<Duration>,
    pub lead_gen_timeout: Option<Duration>,
    pub content_timeout: Option<Duration>,
    pub outreach_timeout: Option<Duration>,
    /// Extra attempts after a recoverable stage failure.
    pub retry_limit: u32,
    /// Fixed delay between attempts.
    pub retry_delay: Duration,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self::from(&PipelinePolicyConfig::default())
    }
}

impl From<&PipelinePolicyConfig> for PipelineConfig {
    fn from(config: &PipelinePolicyConfig) -> Self {
        Self {
            stage_timeout: Duration::from_secs(config.stage_timeout_secs),
            research_timeout: config.research_timeout_secs.map(Duration::from_secs),
            lead_gen_timeout: config.lead_gen_timeout_secs.map(Duration::from_secs),
            content_timeout: config.content_timeout_secs.map(Duration::from_secs),
            outreach_timeout: config.outreach_timeout_secs.map(Duration::from_secs),
            retry_limit: config.retry_limit,
            retry_delay: Duration::from_millis(config.retry_delay_ms),
        }
    }
}

impl From<&AppConfig> for PipelineConfig {
    fn from(config: &AppConfig) -> Self {
        Self::from(&config.pipeline)
    }
}

impl PipelineConfig {
    /// Effective deadline for a stage: its override, or the default.
    pub fn timeout_for(&self, kind: StageKind) -> Duration {
        let override_for = match kind {
            StageKind::Research => self.research_timeout,
            StageKind::LeadGeneration => self.lead_gen_timeout,
            StageKind::ContentCreation => self.content_timeout,
            StageKind::Outreach => self.outreach_timeout,
        };
        override_for.unwrap_or(self.stage_timeout)
    }
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.creatorflow/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| CreatorFlowError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.creatorflow/creatorflow.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| CreatorFlowError::io(path, e))?;

    toml::from_str(&content).map_err(|e| {
        CreatorFlowError::config(format!("failed to parse {}: {e}", path.display()))
    })
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| CreatorFlowError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| CreatorFlowError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| CreatorFlowError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}

/// Check that the provider API key env var is set and non-empty.
pub fn validate_api_key(config: &AppConfig) -> Result<()> {
    let var_name = &config.provider.api_key_env;
    match std::env::var(var_name) {
        Ok(val) if !val.is_empty() => Ok(()),
        _ => Err(CreatorFlowError::config(format!(
            "provider API key not found. Set the {var_name} environment variable."
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_serializes() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).expect("serialize default config");
        assert!(toml_str.contains("db_path"));
        assert!(toml_str.contains("OPENAI_API_KEY"));
    }

    #[test]
    fn config_roundtrip() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).expect("serialize");
        let parsed: AppConfig = toml::from_str(&toml_str).expect("deserialize");
        assert_eq!(parsed.pipeline.stage_timeout_secs, 30);
        assert_eq!(parsed.pipeline.retry_limit, 1);
        assert_eq!(parsed.lead_gen.max_leads, 20);
        assert_eq!(parsed.provider.api_key_env, "OPENAI_API_KEY");
    }

    #[test]
    fn partial_config_fills_defaults() {
        let toml_str = r#"
[pipeline]
stage_timeout_secs = 10
content_timeout_secs = 45
"#;
        let config: AppConfig = toml::from_str(toml_str).expect("parse");
        assert_eq!(config.pipeline.stage_timeout_secs, 10);
        assert_eq!(config.pipeline.content_timeout_secs, Some(45));
        assert_eq!(config.pipeline.retry_limit, 1);
        assert_eq!(config.defaults.tone, "professional");
    }

    #[test]
    fn pipeline_config_from_app_config() {
        let mut app = AppConfig::default();
        app.pipeline.lead_gen_timeout_secs = Some(12);
        let pipeline = PipelineConfig::from(&app);

        assert_eq!(pipeline.stage_timeout, Duration::from_secs(30));
        assert_eq!(
            pipeline.timeout_for(StageKind::LeadGeneration),
            Duration::from_secs(12)
        );
        assert_eq!(
            pipeline.timeout_for(StageKind::ContentCreation),
            Duration::from_secs(30)
        );
        assert_eq!(pipeline.retry_delay, Duration::from_millis(500));
    }

    #[test]
    fn api_key_validation() {
        let mut config = AppConfig::default();
        // Use a unique env var name to avoid interfering with other tests
        config.provider.api_key_env = "CF_TEST_NONEXISTENT_KEY_12345".into();
        let result = validate_api_key(&config);
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("API key not found"));
    }
}
