//! Service configuration.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use keebridge_common::{Error, Result};

/// Tunables for the session, change detector and search cache.
///
/// Every field has a default, so a config file only needs the values it
/// overrides.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// Vault opened when an unlock request names no path.
    pub default_vault_path: PathBuf,
    /// Minimum time between two fingerprints of the vault file.
    pub poll_interval_ms: u64,
    /// How long a search result stays servable from the cache.
    pub cache_ttl_secs: u64,
    /// Number of cached domains allowed before eviction kicks in.
    pub cache_capacity: usize,
    /// How many of the oldest domains one eviction removes.
    pub cache_evict_batch: usize,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            default_vault_path: PathBuf::from("Passwords.kbv"),
            poll_interval_ms: 1000,
            cache_ttl_secs: 10,
            cache_capacity: 100,
            cache_evict_batch: 50,
        }
    }
}

impl ServiceConfig {
    /// Polling interval as a duration.
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Cache TTL as a duration.
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    /// Check invariants the cache relies on.
    ///
    /// # Errors
    /// - `InvalidInput` for a zero TTL or capacity
    /// - `InvalidInput` if the eviction batch is zero or larger than the capacity
    pub fn validate(&self) -> Result<()> {
        if self.cache_ttl_secs == 0 {
            return Err(Error::InvalidInput("cache_ttl_secs must be positive".to_string()));
        }
        if self.cache_capacity == 0 {
            return Err(Error::InvalidInput("cache_capacity must be positive".to_string()));
        }
        if self.cache_evict_batch == 0 || self.cache_evict_batch > self.cache_capacity {
            return Err(Error::InvalidInput(format!(
                "cache_evict_batch must be between 1 and {}",
                self.cache_capacity
            )));
        }
        Ok(())
    }

    /// Parse and validate a JSON configuration.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| Error::Serialization(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load a JSON configuration file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                Error::NotFound(format!("Config file not found: {}", path.display()))
            } else {
                Error::Io(e)
            }
        })?;
        Self::from_json(&json)
    }

    /// Serialize configuration to JSON.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| Error::Serialization(e.to_string()))
    }
}

/// Expand a leading `~` to the user's home directory.
pub fn expand_home(path: &str) -> PathBuf {
    if path == "~" {
        if let Some(home) = dirs::home_dir() {
            return home;
        }
    } else if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    PathBuf::from(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ServiceConfig::default();
        assert_eq!(config.poll_interval(), Duration::from_secs(1));
        assert_eq!(config.cache_ttl(), Duration::from_secs(10));
        assert_eq!(config.cache_capacity, 100);
        assert_eq!(config.cache_evict_batch, 50);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config = ServiceConfig::from_json(r#"{"poll_interval_ms": 250}"#).unwrap();
        assert_eq!(config.poll_interval(), Duration::from_millis(250));
        assert_eq!(config.cache_capacity, 100);
    }

    #[test]
    fn test_oversized_evict_batch_rejected() {
        let err = ServiceConfig::from_json(r#"{"cache_capacity": 10, "cache_evict_batch": 11}"#)
            .unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
    }

    #[test]
    fn test_missing_file_is_not_found() {
        let err = ServiceConfig::from_file(Path::new("/nonexistent/keebridge.json")).unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }

    #[test]
    fn test_json_roundtrip() {
        let config = ServiceConfig {
            cache_ttl_secs: 30,
            ..ServiceConfig::default()
        };
        let restored = ServiceConfig::from_json(&config.to_json().unwrap()).unwrap();
        assert_eq!(restored, config);
    }

    #[test]
    fn test_expand_home() {
        assert_eq!(expand_home("/abs/vault.kbv"), PathBuf::from("/abs/vault.kbv"));
        if let Some(home) = dirs::home_dir() {
            assert_eq!(expand_home("~/vault.kbv"), home.join("vault.kbv"));
        }
    }
}
