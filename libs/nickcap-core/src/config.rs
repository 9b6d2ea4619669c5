use serde::Deserialize;

use nickcap_api::event::QQ_OFFICIAL_WEBHOOK;

use crate::error::CoreError;

/// Root configuration — parsed from TOML. Every field has a default, so an
/// empty file (or string) yields a usable configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct NickcapConfig {
    /// Webhook HTTP port.
    #[serde(default = "default_api_port")]
    pub api_port: u16,

    /// Platform tag the event gate filters for.
    #[serde(default = "default_platform")]
    pub platform: String,

    /// Correlation entries older than this are evicted. Normalization is
    /// expected to follow the raw delivery almost immediately, so a few
    /// seconds is plenty.
    #[serde(default = "default_correlation_ttl_secs")]
    pub correlation_ttl_secs: u64,
}

fn default_api_port() -> u16 {
    8443
}

fn default_platform() -> String {
    QQ_OFFICIAL_WEBHOOK.to_string()
}

fn default_correlation_ttl_secs() -> u64 {
    5
}

impl Default for NickcapConfig {
    fn default() -> Self {
        Self {
            api_port: default_api_port(),
            platform: default_platform(),
            correlation_ttl_secs: default_correlation_ttl_secs(),
        }
    }
}

impl NickcapConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: &str) -> Result<Self, CoreError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| CoreError::Config(format!("{path}: {e}")))?;
        Self::parse(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn parse(toml_str: &str) -> Result<Self, CoreError> {
        toml::from_str(toml_str).map_err(|e| CoreError::Config(e.to_string()))
    }
}
