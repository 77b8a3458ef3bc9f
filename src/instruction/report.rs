//! Execution reports
//!
//! Optional machine-readable JSON record of one command run, written after
//! the command finishes when `--report=<path>` is given.

use crate::chain::client::TxResult;
use crate::config::NetworkConfig;
use crate::error::OpsError;
use crate::instruction::command::CommandResult;
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use std::path::Path;

#[derive(Clone, Debug, Serialize)]
pub struct ExecutionReport {
    pub command: String,
    pub network: String,
    pub chain_id: String,
    pub timestamp: DateTime<Utc>,
    pub contract: String,
    pub tx: Option<TxResult>,
    pub data: Option<Value>,
}

impl ExecutionReport {
    pub fn new(command: &str, config: &NetworkConfig, result: &CommandResult) -> Self {
        Self {
            command: command.to_string(),
            network: config.name.clone(),
            chain_id: config.chain_id.clone(),
            timestamp: Utc::now(),
            contract: result.contract.clone(),
            tx: result.tx.clone(),
            data: result.data.clone(),
        }
    }

    pub fn write(&self, path: &Path) -> Result<(), OpsError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        std::fs::write(path, serde_json::to_string_pretty(self)?)?;
        log::info!("Execution report written to {}", path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("reports").join("run.json");
        let result = CommandResult {
            tx: None,
            contract: "wasm1c".to_string(),
            data: Some(serde_json::json!({"proposalId": 4})),
        };
        let report =
            ExecutionReport::new("ocr2:propose_config", &NetworkConfig::local("wasm1op"), &result);
        report.write(&path).unwrap();

        let raw: Value = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(raw["command"], "ocr2:propose_config");
        assert_eq!(raw["data"]["proposalId"], 4);
    }
}
