//! Token issuing and verification configuration.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::{parse_duration, ConfigError};
use crate::eth::Address;
use crate::keys::KeyPair;
use crate::serialization::SerializationFormat;

/// Key of the fallback entry in [`TokenConfig::trusted_signers`].
pub const ANY_CONTENT: &str = "*";

/// Configuration for issuing and verifying tokens.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenConfig {
    /// Payload serialization of newly issued tokens.
    #[serde(default = "default_format")]
    pub format: SerializationFormat,

    /// Whether newly issued payloads are DEFLATE compressed.
    #[serde(default = "default_true")]
    pub compress: bool,

    /// Validity window of newly issued tokens (e.g., "1h", "30m").
    #[serde(default = "default_validity")]
    pub validity: String,

    /// Maximum accepted age of a token, measured from its issued-at time.
    #[serde(default)]
    pub max_validity: Option<String>,

    /// Tolerated clock difference between issuer and verifier.
    #[serde(default = "default_time_skew")]
    pub time_skew: String,

    /// Trusted signer address per content ID; `"*"` applies to any content.
    #[serde(default)]
    pub trusted_signers: HashMap<String, String>,

    /// Environment variable containing the private key (hex-encoded).
    #[serde(default)]
    pub private_key_env: Option<String>,

    /// Path to the private key file.
    #[serde(default)]
    pub private_key_file: Option<PathBuf>,
}

impl Default for TokenConfig {
    fn default() -> Self {
        Self {
            format: default_format(),
            compress: true,
            validity: default_validity(),
            max_validity: None,
            time_skew: default_time_skew(),
            trusted_signers: HashMap::new(),
            private_key_env: None,
            private_key_file: None,
        }
    }
}

impl TokenConfig {
    /// Load configuration from a YAML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path.as_ref())?;
        Self::from_yaml(&content)
    }

    /// Parse configuration from YAML content.
    pub fn from_yaml(content: &str) -> Result<Self, ConfigError> {
        serde_yaml::from_str(content).map_err(ConfigError::from)
    }

    /// Validity window of newly issued tokens.
    pub fn validity(&self) -> Result<chrono::Duration, ConfigError> {
        parse_duration(&self.validity)
    }

    /// Maximum accepted token age, if configured.
    pub fn max_validity(&self) -> Result<Option<chrono::Duration>, ConfigError> {
        self.max_validity.as_deref().map(parse_duration).transpose()
    }

    /// Tolerated clock skew.
    pub fn time_skew(&self) -> Result<chrono::Duration, ConfigError> {
        parse_duration(&self.time_skew)
    }

    /// Trusted signer for the given content ID, falling back to the `"*"` entry.
    pub fn trusted_signer(&self, content_id: &str) -> Result<Option<Address>, ConfigError> {
        let Some(addr) = self
            .trusted_signers
            .get(content_id)
            .or_else(|| self.trusted_signers.get(ANY_CONTENT))
        else {
            return Ok(None);
        };
        Address::parse(addr)
            .map(Some)
            .map_err(|e| ConfigError::Config(format!("invalid trusted signer for '{content_id}': {e}")))
    }

    /// Resolve the private key from environment or file.
    pub fn resolve_private_key(&self) -> Result<Option<KeyPair>, ConfigError> {
        // Try environment variable first
        if let Some(env_var) = &self.private_key_env {
            if let Ok(key) = std::env::var(env_var) {
                tracing::debug!(env = %env_var, "Using private key from environment");
                return KeyPair::from_private_key_hex(&key)
                    .map(Some)
                    .map_err(|e| ConfigError::Config(e.to_string()));
            }
        }

        // Try file path
        if let Some(path) = &self.private_key_file {
            if path.exists() {
                tracing::debug!(path = %path.display(), "Using private key from file");
                let key = fs::read_to_string(path)?;
                return KeyPair::from_private_key_hex(key.trim())
                    .map(Some)
                    .map_err(|e| ConfigError::Config(e.to_string()));
            }
        }

        Ok(None)
    }
}

fn default_format() -> SerializationFormat {
    SerializationFormat::Json
}

fn default_true() -> bool {
    true
}

fn default_validity() -> String {
    "1h".to_string()
}

fn default_time_skew() -> String {
    "30s".to_string()
}
