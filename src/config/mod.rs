//! Network configuration
//!
//! One explicit configuration struct assembled at startup and threaded
//! through the execution context. Environment overrides are applied here,
//! once, at load time; nothing else in the crate reads the environment.

use crate::error::OpsError;
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};

/// Default fee denomination for Cosmos-style chains
pub const DEFAULT_DENOM: &str = "ucosm";

fn default_denom() -> String {
    DEFAULT_DENOM.to_string()
}

/// Per-network configuration, loaded from `networks/<name>.json`
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct NetworkConfig {
    /// Network name (matches the file name)
    pub name: String,
    /// Chain id, also keys the address-label cache
    pub chain_id: String,
    /// Node REST endpoint
    pub node_url: String,
    /// Operator (signer) account address
    pub signer: String,
    /// Hex-encoded signing key file, consumed by the chain client only
    #[serde(default)]
    pub signing_key_file: Option<PathBuf>,
    /// Fee denomination
    #[serde(default = "default_denom")]
    pub denom: String,
    /// Default gas price in `denom` per gas unit
    #[serde(default)]
    pub default_gas_price: f64,
    /// cw3-flex-multisig wallet address (required for `:multisig` commands)
    #[serde(default)]
    pub multisig: Option<String>,
    /// cw4-group address backing the multisig
    #[serde(default)]
    pub group: Option<String>,
    /// Directory holding contract schemas and wasm artifacts
    #[serde(default)]
    pub artifacts_dir: Option<PathBuf>,
    /// Directory for persisted state (code-id maps, reports)
    #[serde(default = "NetworkConfig::default_data_dir")]
    pub data_dir: PathBuf,
}

impl NetworkConfig {
    fn default_data_dir() -> PathBuf {
        PathBuf::from(".chainops")
    }

    /// Load `networks/<name>.json` from `dir` and apply environment overrides
    pub fn load(dir: &Path, name: &str) -> Result<Self, OpsError> {
        let path = dir.join(format!("{}.json", name));
        let raw = std::fs::read_to_string(&path).map_err(|e| {
            OpsError::Configuration(format!(
                "cannot read network config {}: {}",
                path.display(),
                e
            ))
        })?;
        let mut config: NetworkConfig = serde_json::from_str(&raw).map_err(|e| {
            OpsError::Configuration(format!("invalid network config {}: {}", path.display(), e))
        })?;
        config.name = name.to_string();
        config.apply_env_overrides();
        config.check()?;
        Ok(config)
    }

    /// Environment overrides, applied exactly once at load time
    fn apply_env_overrides(&mut self) {
        if let Ok(url) = env::var("CHAINOPS_NODE_URL") {
            self.node_url = url;
        }
        if let Ok(signer) = env::var("CHAINOPS_SIGNER") {
            self.signer = signer;
        }
        if let Ok(multisig) = env::var("CHAINOPS_MULTISIG") {
            self.multisig = Some(multisig);
        }
        if let Ok(group) = env::var("CHAINOPS_GROUP") {
            self.group = Some(group);
        }
    }

    fn check(&self) -> Result<(), OpsError> {
        if self.chain_id.is_empty() {
            return Err(OpsError::Configuration("chain_id must not be empty".into()));
        }
        if self.node_url.is_empty() {
            return Err(OpsError::Configuration("node_url must not be empty".into()));
        }
        if self.signer.is_empty() {
            return Err(OpsError::Configuration("signer must not be empty".into()));
        }
        Ok(())
    }

    /// Multisig wallet address, required by `:multisig` commands
    pub fn multisig(&self) -> Result<&str, OpsError> {
        self.multisig.as_deref().ok_or_else(|| {
            OpsError::Configuration(
                "multisig address not configured (set `multisig` in the network config or CHAINOPS_MULTISIG)"
                    .into(),
            )
        })
    }

    /// cw4-group address, required by `:multisig` commands
    pub fn group(&self) -> Result<&str, OpsError> {
        self.group.as_deref().ok_or_else(|| {
            OpsError::Configuration(
                "group address not configured (set `group` in the network config or CHAINOPS_GROUP)"
                    .into(),
            )
        })
    }

    /// In-memory config for tests and local dry runs
    pub fn local(signer: &str) -> Self {
        Self {
            name: "local".to_string(),
            chain_id: "chainops-local".to_string(),
            node_url: "http://127.0.0.1:1317".to_string(),
            signer: signer.to_string(),
            signing_key_file: None,
            denom: default_denom(),
            default_gas_price: 0.025,
            multisig: None,
            group: None,
            artifacts_dir: None,
            data_dir: Self::default_data_dir(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_config(dir: &Path, name: &str, body: &str) {
        std::fs::write(dir.join(format!("{}.json", name)), body).unwrap();
    }

    #[test]
    fn test_load_network_config() {
        let dir = tempfile::tempdir().unwrap();
        write_config(
            dir.path(),
            "testnet",
            r#"{
                "name": "testnet",
                "chain_id": "wasmtest-4",
                "node_url": "http://localhost:1317",
                "signer": "wasm1operator",
                "multisig": "wasm1multisig"
            }"#,
        );

        let config = NetworkConfig::load(dir.path(), "testnet").unwrap();
        assert_eq!(config.chain_id, "wasmtest-4");
        assert_eq!(config.denom, DEFAULT_DENOM);
        assert_eq!(config.multisig().unwrap(), "wasm1multisig");
        assert!(config.group().is_err());
    }

    #[test]
    fn test_missing_config_is_configuration_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = NetworkConfig::load(dir.path(), "nope").unwrap_err();
        assert_eq!(err.kind(), "configuration");
    }
}
