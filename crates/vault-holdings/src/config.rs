//! Registry configuration.

use std::path::Path;

use serde::{Deserialize, Serialize};
use vault_core::Asset;

use crate::error::{HoldingsError, HoldingsResult};

/// Per-exchange holdings configuration.
///
/// ```toml
/// exchange = "binance"
/// supported_assets = ["spot", "perpetual_swap"]
/// accounts = ["main", "hedge"]
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HoldingsConfig {
    /// Exchange name, used in keys, logs and metrics labels.
    pub exchange: String,
    /// Asset classes accepted by the registry. Empty means all.
    #[serde(default)]
    pub supported_assets: Vec<Asset>,
    /// Accounts registered at startup.
    #[serde(default)]
    pub accounts: Vec<String>,
}

impl HoldingsConfig {
    /// Load configuration from a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> HoldingsResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            HoldingsError::Config(format!("Failed to read config {}: {e}", path.display()))
        })?;
        Self::from_toml_str(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn from_toml_str(content: &str) -> HoldingsResult<Self> {
        let config: Self = toml::from_str(content)
            .map_err(|e| HoldingsError::Config(format!("Failed to parse config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> HoldingsResult<()> {
        if self.exchange.trim().is_empty() {
            return Err(HoldingsError::Config("exchange name is empty".to_string()));
        }
        Ok(())
    }
}
