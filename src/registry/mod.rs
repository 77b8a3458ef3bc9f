//! Contract registry
//!
//! Resolves a contract kind + version to its ABI schema and wasm bytecode
//! from a local artifacts directory, classifies functions as execute or
//! query from the schema, and persists the per-network code-id map written
//! after uploads.

use crate::error::OpsError;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Artifact version resolved when no `--version` flag is given
pub const DEFAULT_VERSION: &str = "local";

/// Contract families this tool manages
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContractKind {
    Ocr2,
    Cw20Base,
    AccessController,
    Cw3FlexMultisig,
    Cw4Group,
}

impl ContractKind {
    pub const ALL: [ContractKind; 5] = [
        ContractKind::Ocr2,
        ContractKind::Cw20Base,
        ContractKind::AccessController,
        ContractKind::Cw3FlexMultisig,
        ContractKind::Cw4Group,
    ];

    pub fn id(&self) -> &'static str {
        match self {
            ContractKind::Ocr2 => "ocr2",
            ContractKind::Cw20Base => "cw20_base",
            ContractKind::AccessController => "access_controller",
            ContractKind::Cw3FlexMultisig => "cw3_flex_multisig",
            ContractKind::Cw4Group => "cw4_group",
        }
    }
}

impl fmt::Display for ContractKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

impl FromStr for ContractKind {
    type Err = OpsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ContractKind::ALL
            .into_iter()
            .find(|kind| kind.id() == s)
            .ok_or_else(|| OpsError::Configuration(format!("unknown contract kind: {}", s)))
    }
}

/// How a `kind:function[:suffix]` resolves against the ABI
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Operation {
    Deploy,
    Execute,
    Query,
    Help,
}

/// Contract ABI: the three JSON schemas shipped with a CosmWasm contract
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Abi {
    #[serde(default)]
    pub instantiate: Value,
    #[serde(default)]
    pub execute: Value,
    #[serde(default)]
    pub query: Value,
}

impl Abi {
    /// Function names declared by one schema (oneOf/anyOf variants)
    fn functions_of(schema: &Value) -> Vec<&str> {
        let variants = schema["oneOf"]
            .as_array()
            .or_else(|| schema["anyOf"].as_array());
        let mut names = Vec::new();
        for variant in variants.into_iter().flatten() {
            if let Some(required) = variant["required"].as_array() {
                names.extend(required.iter().filter_map(Value::as_str));
            }
            if let Some(options) = variant["enum"].as_array() {
                names.extend(options.iter().filter_map(Value::as_str));
            }
        }
        names
    }

    pub fn has_function(&self, name: &str) -> bool {
        Self::functions_of(&self.execute).contains(&name)
            || Self::functions_of(&self.query).contains(&name)
    }

    pub fn is_query(&self, name: &str) -> bool {
        Self::functions_of(&self.query).contains(&name)
    }

    /// Static dispatch: deploy/help are fixed names, the rest classify
    /// against the schema
    pub fn classify(&self, function: &str) -> Result<Operation, OpsError> {
        match function {
            "deploy" => Ok(Operation::Deploy),
            "help" => Ok(Operation::Help),
            name if self.is_query(name) => Ok(Operation::Query),
            name if self.has_function(name) => Ok(Operation::Execute),
            name => Err(OpsError::Configuration(format!(
                "function {} not found in contract ABI",
                name
            ))),
        }
    }
}

/// A resolved contract: schema plus bytecode
#[derive(Clone, Debug)]
pub struct Contract {
    pub kind: ContractKind,
    pub version: String,
    pub abi: Abi,
    pub bytecode: Vec<u8>,
}

/// Loads contract artifacts from `<artifacts_dir>/<kind>/<version>/`
pub struct Registry {
    artifacts_dir: PathBuf,
}

impl Registry {
    pub fn new(artifacts_dir: impl Into<PathBuf>) -> Self {
        Self {
            artifacts_dir: artifacts_dir.into(),
        }
    }

    fn contract_dir(&self, kind: ContractKind, version: &str) -> PathBuf {
        self.artifacts_dir.join(kind.id()).join(version)
    }

    /// Resolve a contract kind + version to its ABI and bytecode
    pub fn resolve(&self, kind: ContractKind, version: &str) -> Result<Contract, OpsError> {
        let dir = self.contract_dir(kind, version);
        let schema_path = dir.join("schema.json");
        let raw = std::fs::read_to_string(&schema_path).map_err(|e| {
            OpsError::Configuration(format!(
                "cannot read schema {}: {}",
                schema_path.display(),
                e
            ))
        })?;
        let abi: Abi = serde_json::from_str(&raw).map_err(|e| {
            OpsError::Configuration(format!("invalid schema {}: {}", schema_path.display(), e))
        })?;

        let wasm_path = dir.join(format!("{}.wasm", kind.id()));
        let bytecode = std::fs::read(&wasm_path).unwrap_or_default();

        Ok(Contract {
            kind,
            version: version.to_string(),
            abi,
            bytecode,
        })
    }

    /// Like `resolve`, but absent artifacts are not an error. Lets commands
    /// check against the schema only when one is actually shipped.
    pub fn try_resolve(
        &self,
        kind: ContractKind,
        version: &str,
    ) -> Result<Option<Contract>, OpsError> {
        if !self.contract_dir(kind, version).join("schema.json").exists() {
            return Ok(None);
        }
        self.resolve(kind, version).map(Some)
    }
}

/// Per-network map of contract kind to stored code id, persisted after upload
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct CodeIds {
    #[serde(flatten)]
    ids: BTreeMap<String, u64>,
}

impl CodeIds {
    fn path(data_dir: &Path, network: &str) -> PathBuf {
        data_dir.join("code_ids").join(format!("{}.json", network))
    }

    pub fn load(data_dir: &Path, network: &str) -> Result<Self, OpsError> {
        let path = Self::path(data_dir, network);
        if !path.exists() {
            return Ok(Self::default());
        }
        let raw = std::fs::read_to_string(&path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    pub fn save(&self, data_dir: &Path, network: &str) -> Result<(), OpsError> {
        let path = Self::path(data_dir, network);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    pub fn get(&self, kind: ContractKind) -> Option<u64> {
        self.ids.get(kind.id()).copied()
    }

    pub fn set(&mut self, kind: ContractKind, code_id: u64) {
        self.ids.insert(kind.id().to_string(), code_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn cw20_abi() -> Abi {
        serde_json::from_value(json!({
            "instantiate": { "required": ["name", "symbol", "decimals"] },
            "execute": { "oneOf": [
                { "required": ["transfer"] },
                { "required": ["mint"] },
                { "required": ["burn"] }
            ]},
            "query": { "anyOf": [
                { "required": ["balance"] },
                { "enum": ["token_info"] }
            ]}
        }))
        .unwrap()
    }

    #[test]
    fn test_function_existence_and_classification() {
        let abi = cw20_abi();
        assert!(abi.has_function("mint"));
        assert!(abi.has_function("balance"));
        assert!(!abi.has_function("withdraw_funds"));

        assert_eq!(abi.classify("mint").unwrap(), Operation::Execute);
        assert_eq!(abi.classify("balance").unwrap(), Operation::Query);
        assert_eq!(abi.classify("token_info").unwrap(), Operation::Query);
        assert_eq!(abi.classify("deploy").unwrap(), Operation::Deploy);
        assert_eq!(abi.classify("help").unwrap(), Operation::Help);
        assert!(abi.classify("nope").is_err());
    }

    #[test]
    fn test_contract_kind_round_trip() {
        for kind in ContractKind::ALL {
            assert_eq!(kind.id().parse::<ContractKind>().unwrap(), kind);
        }
        assert!("flux_monitor".parse::<ContractKind>().is_err());
    }

    #[test]
    fn test_code_ids_persist_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let mut ids = CodeIds::load(dir.path(), "testnet").unwrap();
        assert_eq!(ids.get(ContractKind::Ocr2), None);

        ids.set(ContractKind::Ocr2, 42);
        ids.save(dir.path(), "testnet").unwrap();

        let reloaded = CodeIds::load(dir.path(), "testnet").unwrap();
        assert_eq!(reloaded.get(ContractKind::Ocr2), Some(42));
    }

    #[test]
    fn test_registry_resolves_schema_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let contract_dir = dir.path().join("cw20_base").join("v1.0.0");
        std::fs::create_dir_all(&contract_dir).unwrap();
        std::fs::write(
            contract_dir.join("schema.json"),
            serde_json::to_string(&cw20_abi()).unwrap(),
        )
        .unwrap();

        let registry = Registry::new(dir.path());
        let contract = registry.resolve(ContractKind::Cw20Base, "v1.0.0").unwrap();
        assert!(contract.abi.has_function("transfer"));
        assert!(registry.resolve(ContractKind::Ocr2, "v1.0.0").is_err());
    }

    #[test]
    fn test_try_resolve_tolerates_missing_artifacts() {
        let dir = tempfile::tempdir().unwrap();
        let registry = Registry::new(dir.path());
        assert!(registry
            .try_resolve(ContractKind::Ocr2, DEFAULT_VERSION)
            .unwrap()
            .is_none());
    }
}
