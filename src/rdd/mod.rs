//! Reference data directory (RDD)
//!
//! External JSON file describing the expected off-chain configuration of
//! deployed contracts. Used both to build command inputs (propose_config,
//! accept_proposal) and as the expectation side of inspections.

use crate::error::OpsError;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::Path;

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Rdd {
    #[serde(default)]
    pub contracts: BTreeMap<String, RddContract>,
    #[serde(default)]
    pub operators: BTreeMap<String, RddOperator>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct RddContract {
    #[serde(default)]
    pub config: RddConfig,
    #[serde(default)]
    pub oracles: Vec<RddOracle>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct RddConfig {
    #[serde(default)]
    pub f: u32,
    /// Remaining offchain config fields, kept as-is for digest generation
    #[serde(flatten)]
    pub offchain: BTreeMap<String, Value>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct RddOracle {
    pub operator: String,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RddOperator {
    #[serde(default)]
    pub ocr2_onchain_public_key: Vec<String>,
    #[serde(default)]
    pub ocr_node_address: Vec<String>,
    #[serde(default)]
    pub admin_address: String,
}

/// The oracle set an aggregator contract should run with, derived from RDD
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OracleSet {
    pub f: u32,
    /// Onchain public keys, hex with the `ocr2on_cosmos_` prefix stripped
    pub signers: Vec<String>,
    pub transmitters: Vec<String>,
    pub payees: Vec<String>,
}

impl Rdd {
    pub fn load(path: &Path) -> Result<Self, OpsError> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            OpsError::Configuration(format!("cannot read RDD file {}: {}", path.display(), e))
        })?;
        serde_json::from_str(&raw).map_err(|e| {
            OpsError::Configuration(format!("invalid RDD file {}: {}", path.display(), e))
        })
    }

    pub fn contract(&self, address: &str) -> Result<&RddContract, OpsError> {
        self.contracts.get(address).ok_or_else(|| {
            OpsError::Configuration(format!("contract {} not present in RDD", address))
        })
    }

    /// Resolve the oracle set for an aggregator contract
    pub fn oracle_set(&self, address: &str) -> Result<OracleSet, OpsError> {
        let contract = self.contract(address)?;
        let mut signers = Vec::new();
        let mut transmitters = Vec::new();
        let mut payees = Vec::new();
        for oracle in &contract.oracles {
            let operator = self.operators.get(&oracle.operator).ok_or_else(|| {
                OpsError::Configuration(format!(
                    "operator {} referenced by {} not present in RDD",
                    oracle.operator, address
                ))
            })?;
            let signer = operator.ocr2_onchain_public_key.first().ok_or_else(|| {
                OpsError::Configuration(format!(
                    "operator {} has no ocr2 onchain public key",
                    oracle.operator
                ))
            })?;
            let transmitter = operator.ocr_node_address.first().ok_or_else(|| {
                OpsError::Configuration(format!(
                    "operator {} has no ocr node address",
                    oracle.operator
                ))
            })?;
            signers.push(signer.trim_start_matches("ocr2on_cosmos_").to_string());
            transmitters.push(transmitter.clone());
            payees.push(operator.admin_address.clone());
        }
        Ok(OracleSet {
            f: contract.config.f,
            signers,
            transmitters,
            payees,
        })
    }
}

#[cfg(test)]
pub mod fixtures {
    use super::*;
    use serde_json::json;

    /// An RDD with one aggregator and four operators
    pub fn sample(contract: &str) -> Rdd {
        let operators = (0..4).map(|i| {
            (
                format!("operator-{}", i),
                json!({
                    "ocr2OnchainPublicKey": [format!("ocr2on_cosmos_{:064x}", i + 1)],
                    "ocrNodeAddress": [format!("wasm1transmitter{}", i)],
                    "adminAddress": format!("wasm1payee{}", i),
                }),
            )
        });
        serde_json::from_value(json!({
            "contracts": {
                contract: {
                    "config": { "f": 1, "deltaProgressNanoseconds": 8000000000u64 },
                    "oracles": (0..4).map(|i| json!({"operator": format!("operator-{}", i)})).collect::<Vec<_>>(),
                }
            },
            "operators": operators.collect::<BTreeMap<String, Value>>(),
        }))
        .unwrap()
    }
}
