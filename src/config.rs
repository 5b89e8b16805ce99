use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::env;

/// Runtime tunables for the request pipeline. Defaults are safe for
/// production; individual values can be overridden through `ROUTEWIRE_*`
/// environment variables.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Upper bound on an accepted request body, in bytes.
    pub max_body_bytes: usize,
    /// Emit a debug line per dispatched request.
    pub log_requests: bool,
    /// Default lifetime for claimed request keys, in milliseconds.
    pub default_key_ttl_ms: u64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_body_bytes: 1024 * 1024,
            log_requests: false,
            default_key_ttl_ms: 15_000,
        }
    }
}

impl PipelineConfig {
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(v) = env::var("ROUTEWIRE_MAX_BODY_BYTES") {
            config.max_body_bytes = v.parse().unwrap_or(config.max_body_bytes);
        }
        if let Ok(v) = env::var("ROUTEWIRE_LOG_REQUESTS") {
            config.log_requests = v.parse().unwrap_or(config.log_requests);
        }
        if let Ok(v) = env::var("ROUTEWIRE_KEY_TTL_MS") {
            config.default_key_ttl_ms = v.parse().unwrap_or(config.default_key_ttl_ms);
        }
        config
    }
}

pub static CONFIG: Lazy<PipelineConfig> = Lazy::new(PipelineConfig::from_env);

pub fn pipeline_config() -> &'static PipelineConfig {
    &CONFIG
}
