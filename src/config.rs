use std::{env, fmt::Display, str::FromStr, time::Duration};

use crate::error::ConfigError;
use crate::handlers::CallStrategy;
use crate::services::image::DEFAULT_MAX_UPLOAD_BYTES;
use crate::services::upstream::DEFAULT_MODEL_URL;
use crate::services::vqa::DEFAULT_TIMEOUT_MS;

#[derive(Debug, Clone)]
pub struct Config {
    pub relay_url: String,
    pub timeout_ms: u64,
    pub upstream_timeout_ms: u64,
    pub strategy: CallStrategy,
    pub max_upload_bytes: u64,
    pub relay_addr: String,
    pub model_url: String,
    pub hf_token: Option<String>,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let timeout_ms: u64 = try_load(&lookup, "VQA_TIMEOUT_MS", &DEFAULT_TIMEOUT_MS.to_string())?;

        Ok(Self {
            relay_url: try_load(&lookup, "VQA_RELAY_URL", "http://localhost:8080")?,
            timeout_ms,
            // The relay must give up before the client does, or its error never arrives.
            upstream_timeout_ms: try_load(
                &lookup,
                "HF_TIMEOUT_MS",
                &(timeout_ms * 5 / 6).to_string(),
            )?,
            strategy: try_load(&lookup, "VQA_CALL_STRATEGY", "sequential")?,
            max_upload_bytes: try_load(
                &lookup,
                "VQA_MAX_UPLOAD_BYTES",
                &DEFAULT_MAX_UPLOAD_BYTES.to_string(),
            )?,
            relay_addr: try_load(&lookup, "RELAY_ADDR", "0.0.0.0:8080")?,
            model_url: try_load(&lookup, "HF_MODEL_URL", DEFAULT_MODEL_URL)?,
            hf_token: lookup("HF_TOKEN").filter(|t| !t.trim().is_empty()),
        })
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn upstream_timeout(&self) -> Duration {
        Duration::from_millis(self.upstream_timeout_ms)
    }

    /// The bearer credential is only needed by the relay.
    pub fn require_hf_token(&self) -> Result<&str, ConfigError> {
        self.hf_token
            .as_deref()
            .ok_or(ConfigError::Missing { key: "HF_TOKEN" })
    }
}

fn try_load<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &'static str,
    default: &str,
) -> Result<T, ConfigError>
where
    T::Err: Display,
{
    let value = lookup(key).unwrap_or_else(|| {
        log::info!("{} not set, using default: {}", key, default);
        default.to_string()
    });

    value.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
        key,
        value: value.clone(),
        reason: e.to_string(),
    })
}
