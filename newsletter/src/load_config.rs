/// `load_config` module: reads the optional YAML settings file and the secrets
/// held in the environment.
///
/// # Responsibilities
/// - Parse the YAML file (if any) into [`AppConfig`]; every key is optional
/// - Read credentials from environment variables into [`Secrets`]
/// - Report any missing or malformed input with the offending path or variable name
///
/// Secrets never come from YAML. A `.env` file is honoured because the binary
/// calls `dotenvy::dotenv()` before anything here runs.
///
/// # Errors
/// All errors are `anyhow::Error` with context and surface at the CLI boundary.
use anyhow::{Context, Result};
use newsletter_core::config::PipelineConfig;
use newsletter_core::download::GITHUB_BASE_URL;
use serde::Deserialize;
use std::fs;
use std::path::Path;
use tracing::{error, info};

use crate::gemini::{DEFAULT_MODEL, GEMINI_BASE_URL};
use crate::mermaid_ink::MERMAID_INK_BASE_URL;
use crate::notion::NOTION_BASE_URL;

pub const DEFAULT_BIND: &str = "0.0.0.0:8000";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerSection,
    pub pipeline: PipelineConfig,
    pub services: ServicesSection,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerSection {
    pub bind: String,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            bind: DEFAULT_BIND.to_string(),
        }
    }
}

/// Where each remote collaborator lives.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServicesSection {
    pub github_base_url: String,
    pub gemini_base_url: String,
    pub gemini_model: String,
    pub mermaid_ink_base_url: String,
    pub notion_base_url: String,
    /// Custom S3-compatible endpoint; requests go to AWS when absent.
    pub s3_endpoint: Option<String>,
}

impl Default for ServicesSection {
    fn default() -> Self {
        Self {
            github_base_url: GITHUB_BASE_URL.to_string(),
            gemini_base_url: GEMINI_BASE_URL.to_string(),
            gemini_model: DEFAULT_MODEL.to_string(),
            mermaid_ink_base_url: MERMAID_INK_BASE_URL.to_string(),
            notion_base_url: NOTION_BASE_URL.to_string(),
            s3_endpoint: None,
        }
    }
}

/// Credentials and identifiers read from the environment.
#[derive(Clone)]
pub struct Secrets {
    pub api_key: String,
    pub gemini_api_key: String,
    pub aws_access_key_id: String,
    pub aws_secret_access_key: String,
    pub aws_region: String,
    pub aws_bucket: String,
    pub notion_api_key: String,
}

// Keep credentials out of logs.
impl std::fmt::Debug for Secrets {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Secrets")
            .field("aws_region", &self.aws_region)
            .field("aws_bucket", &self.aws_bucket)
            .finish_non_exhaustive()
    }
}

impl Secrets {
    pub fn from_env() -> Result<Self> {
        let secrets = Self {
            api_key: require_env("API_KEY")?,
            gemini_api_key: require_env("GEMINI_API_KEY")?,
            aws_access_key_id: require_env("AWS_ACCESS_KEY_ID")?,
            aws_secret_access_key: require_env("AWS_SECRET_ACCESS_KEY")?,
            aws_region: require_env("AWS_S3_REGION")?,
            aws_bucket: require_env("AWS_S3_BUCKET")?,
            notion_api_key: require_env("NOTION_API_KEY")?,
        };
        info!(
            bucket = %secrets.aws_bucket,
            region = %secrets.aws_region,
            "Loaded secrets from environment"
        );
        Ok(secrets)
    }
}

fn require_env(name: &str) -> Result<String> {
    match std::env::var(name) {
        Ok(value) if !value.trim().is_empty() => Ok(value),
        Ok(_) => {
            error!(variable = name, "Environment variable is empty");
            anyhow::bail!("environment variable {name} is empty")
        }
        Err(e) => {
            error!(variable = name, error = %e, "Environment variable missing");
            Err(e).with_context(|| format!("environment variable {name} is not set"))
        }
    }
}

/// Load settings from `path`, or defaults when no path is given.
pub fn load_config(path: Option<&Path>) -> Result<AppConfig> {
    let Some(path) = path else {
        info!("No config file given, using defaults");
        return Ok(AppConfig::default());
    };
    info!(config_path = ?path, "Loading configuration from file");

    let content = fs::read_to_string(path).map_err(|e| {
        error!(error = ?e, config_path = ?path, "Failed to read config file");
        anyhow::anyhow!("Failed to read config file {:?}: {}", path, e)
    })?;

    // An empty file deserializes to unit; treat it as all defaults.
    if content.trim().is_empty() {
        return Ok(AppConfig::default());
    }

    let config: AppConfig = serde_yaml::from_str(&content).map_err(|e| {
        error!(error = ?e, config_path = ?path, "Failed to parse config YAML");
        anyhow::anyhow!("Failed to parse config YAML {:?}: {e}", path)
    })?;

    info!(config_path = ?path, bind = %config.server.bind, "Parsed config YAML successfully");
    config.pipeline.trace_loaded();
    Ok(config)
}
