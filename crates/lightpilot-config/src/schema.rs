//! Configuration schema definitions.

use serde::{Deserialize, Serialize};

/// Root configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub xai: XAiConfig,

    #[serde(default)]
    pub x: XConfig,

    #[serde(default)]
    pub bus: BusConfig,

    #[serde(default)]
    pub agent: AgentConfig,

    #[serde(default)]
    pub store: StoreConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Completion API configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct XAiConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    #[serde(default = "default_xai_url")]
    pub base_url: String,

    #[serde(default = "default_model")]
    pub model: String,

    #[serde(default = "default_temperature")]
    pub temperature: f32,
}

impl Default for XAiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: default_xai_url(),
            model: default_model(),
            temperature: default_temperature(),
        }
    }
}

fn default_xai_url() -> String {
    "https://api.x.ai/v1/chat/completions".to_string()
}

fn default_model() -> String {
    "grok-preview".to_string()
}

fn default_temperature() -> f32 {
    0.7
}

/// Social-search API configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct XConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bearer_token: Option<String>,

    #[serde(default = "default_x_url")]
    pub base_url: String,
}

impl Default for XConfig {
    fn default() -> Self {
        Self {
            bearer_token: None,
            base_url: default_x_url(),
        }
    }
}

fn default_x_url() -> String {
    "https://api.twitter.com/2".to_string()
}

/// Message bus configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BusConfig {
    /// Upper bound on how long a sender waits for a reply.
    #[serde(default = "default_reply_timeout")]
    pub reply_timeout_ms: u64,
}

impl Default for BusConfig {
    fn default() -> Self {
        Self {
            reply_timeout_ms: default_reply_timeout(),
        }
    }
}

fn default_reply_timeout() -> u64 {
    30_000
}

/// Automated UI-drive configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Page opened by `buildWithAgent`; the prompt is appended as the
    /// `prompt` query parameter.
    #[serde(default = "default_build_url")]
    pub build_url: String,

    #[serde(default = "default_control_selector")]
    pub control_selector: String,

    /// Fixed wait before the first lookup.
    #[serde(default)]
    pub settle_delay_ms: u64,

    #[serde(default = "default_poll_interval")]
    pub poll_interval_ms: u64,

    #[serde(default = "default_poll_timeout")]
    pub poll_timeout_ms: u64,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            build_url: default_build_url(),
            control_selector: default_control_selector(),
            settle_delay_ms: 0,
            poll_interval_ms: default_poll_interval(),
            poll_timeout_ms: default_poll_timeout(),
        }
    }
}

fn default_build_url() -> String {
    "https://replit.com/new/nix?tab=ai".to_string()
}

fn default_control_selector() -> String {
    r#"button[data-cy="ai-prompt-submit"]"#.to_string()
}

fn default_poll_interval() -> u64 {
    100
}

fn default_poll_timeout() -> u64 {
    5_000
}

/// Persistent store backend.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    #[default]
    File,
    Memory,
}

/// Persistent store configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    #[serde(default)]
    pub backend: StoreBackend,

    #[serde(default = "default_store_path")]
    pub path: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::default(),
            path: default_store_path(),
        }
    }
}

fn default_store_path() -> String {
    "~/.lightpilot/state".to_string()
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Filter used when `RUST_LOG` is not set.
    #[serde(default = "default_level")]
    pub level: String,

    /// Directory for daily rolling log files.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
            file: None,
        }
    }
}

fn default_level() -> String {
    "info".to_string()
}

#[cfg(test)]
#[path = "schema_tests.rs"]
mod tests;
