//! Configuration types for the fabric token crates.
//!
//! Configuration is loaded from YAML. All fields are optional and default to values
//! suitable for issuing and verifying tokens locally.
//!
//! ```yaml
//! format: json
//! compress: true
//! validity: 1h
//! max_validity: 24h
//! time_skew: 30s
//! trusted_signers:
//!   "*": "0x8fd379246834eac74b8419ffda202cf8051f7a03"
//! private_key_env: ELV_PRIVATE_KEY
//! ```

pub mod token;

pub use token::{TokenConfig, ANY_CONTENT};

/// Error type for configuration loading.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}

/// Parse a duration string like "24h", "7d", "30m", "60s" into `chrono::Duration`.
///
/// A bare number is interpreted as hours.
pub fn parse_duration(s: &str) -> Result<chrono::Duration, ConfigError> {
    let s = s.trim().to_lowercase();
    let invalid = |_| ConfigError::Config(format!("invalid duration '{s}'"));

    if let Some(hours) = s.strip_suffix('h') {
        return Ok(chrono::Duration::hours(hours.trim().parse().map_err(invalid)?));
    }
    if let Some(days) = s.strip_suffix('d') {
        return Ok(chrono::Duration::days(days.trim().parse().map_err(invalid)?));
    }
    if let Some(minutes) = s.strip_suffix('m') {
        return Ok(chrono::Duration::minutes(minutes.trim().parse().map_err(invalid)?));
    }
    if let Some(seconds) = s.strip_suffix('s') {
        return Ok(chrono::Duration::seconds(seconds.trim().parse().map_err(invalid)?));
    }

    Ok(chrono::Duration::hours(s.parse().map_err(invalid)?))
}
