//! Layered settings: built-in defaults overridden by `DAO_AGENT_*` environment variables.
//!
//! Nested keys use a double underscore, e.g. `DAO_AGENT_AGENT__MAX_ITERATIONS=4` or
//! `DAO_AGENT_CHAIN__RPC_URL=...`. Credentials themselves are never part of the settings;
//! only the *names* of the variables holding them are, and those are read when a tool runs.

use config::{Config, Environment};
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

pub const ENV_PREFIX: &str = "DAO_AGENT";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Environment variable {env_var} has an invalid value: {message}")]
    InvalidEnvVar { env_var: String, message: String },

    #[error("Configuration error: {0}")]
    Other(#[from] config::ConfigError),
}

/// Convert a dotted configuration key into the environment variable that sets it
pub fn to_env_var(field_path: &str) -> String {
    let path = field_path
        .split('.')
        .map(|part| part.to_uppercase())
        .collect::<Vec<_>>()
        .join("__");
    format!("{}_{}", ENV_PREFIX, path)
}

/// The environment source every settings loader in the workspace layers on top of its defaults
pub fn environment() -> Environment {
    Environment::with_prefix(ENV_PREFIX)
        .prefix_separator("_")
        .separator("__")
        .try_parsing(true)
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ProviderSettings {
    /// Base URL of an OpenAI-compatible chat completions API
    pub base_url: String,
    pub model: String,
    /// Name of the environment variable holding the API key
    pub api_key_var: String,
    pub temperature: Option<f32>,
    pub max_tokens: Option<i32>,
    pub timeout_secs: u64,
}

impl Default for ProviderSettings {
    fn default() -> Self {
        Self {
            base_url: "https://generativelanguage.googleapis.com/v1beta/openai".to_string(),
            model: "gemini-2.0-flash".to_string(),
            api_key_var: "GEMINI_API_KEY".to_string(),
            temperature: None,
            max_tokens: None,
            timeout_secs: 120,
        }
    }
}

impl ProviderSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AgentSettings {
    /// Model round trips allowed per turn before the agent gives up
    pub max_iterations: usize,
    pub default_thread_id: String,
    /// Optional variable whose value is woven into the system preamble
    pub account_id_var: String,
}

impl Default for AgentSettings {
    fn default() -> Self {
        Self {
            max_iterations: 10,
            default_thread_id: "0x0001".to_string(),
            account_id_var: "HEDERA_ACCOUNT_ID".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ChainSettings {
    pub cast_binary: String,
    pub contract_address: String,
    pub rpc_url: String,
    pub proposal_duration_secs: u64,
    pub private_key_var: String,
    pub timeout_secs: u64,
    /// Upper bound on proposals read by a single `get_all_proposals` call
    pub max_proposals: u64,
}

impl Default for ChainSettings {
    fn default() -> Self {
        Self {
            cast_binary: "cast".to_string(),
            contract_address: "0x905b7a93269437fdcB77B46e5465ecD32a5E85E9".to_string(),
            rpc_url: "https://testnet.hashio.io/api".to_string(),
            proposal_duration_secs: 86400,
            private_key_var: "HEDERA_ACCOUNT_PRIVATE_KEY".to_string(),
            timeout_secs: 60,
            max_proposals: 50,
        }
    }
}

impl ChainSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SearchSettings {
    pub endpoint: String,
    pub api_key_var: String,
    pub timeout_secs: u64,
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self {
            endpoint: "https://google.serper.dev/search".to_string(),
            api_key_var: "SERPER_API_KEY".to_string(),
            timeout_secs: 30,
        }
    }
}

impl SearchSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RemoteToolSettings {
    /// JSON file listing remote API tool descriptors; no remote tools when unset
    pub descriptor_path: Option<PathBuf>,
    pub base_url: String,
    pub timeout_secs: u64,
}

impl Default for RemoteToolSettings {
    fn default() -> Self {
        Self {
            descriptor_path: None,
            base_url: "https://testnet.mirrornode.hedera.com".to_string(),
            timeout_secs: 30,
        }
    }
}

impl RemoteToolSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub provider: ProviderSettings,
    pub agent: AgentSettings,
    pub chain: ChainSettings,
    pub search: SearchSettings,
    pub remote_tools: RemoteToolSettings,
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        let config = Config::builder().add_source(environment()).build()?;

        config.try_deserialize().map_err(|err| {
            tracing::debug!("Configuration error: {:?}", &err);
            match err {
                config::ConfigError::Type {
                    key: Some(ref key), ..
                } => ConfigError::InvalidEnvVar {
                    env_var: to_env_var(key),
                    message: err.to_string(),
                },
                other => ConfigError::Other(other),
            }
        })
    }
}
