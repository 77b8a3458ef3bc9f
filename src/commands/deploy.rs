//! Contract upload and deployment
//!
//! Uploads and instantiations go through dedicated client calls rather than
//! the execute-message path, so both commands implement the command protocol
//! directly. Uploaded code ids are persisted per network and looked up again
//! at deploy time.

use crate::chain::client::TxResult;
use crate::chain::msg::CosmosMsg;
use crate::error::OpsError;
use crate::instruction::command::{confirm, Command, CommandResult};
use crate::instruction::context::CommandEnv;
use crate::instruction::flags::Flags;
use crate::registry::{CodeIds, Contract, ContractKind, Registry, DEFAULT_VERSION};
use async_trait::async_trait;
use serde_json::{json, Value};
use std::path::PathBuf;

fn artifacts_dir(env: &CommandEnv) -> Result<PathBuf, OpsError> {
    env.config.artifacts_dir.clone().ok_or_else(|| {
        OpsError::Configuration(
            "artifacts_dir not configured (set `artifacts_dir` in the network config)".into(),
        )
    })
}

/// Stores the contract bytecode on chain and records the new code id
pub struct UploadCommand {
    kind: ContractKind,
    env: CommandEnv,
    flags: Flags,
    resolved: Option<Contract>,
}

impl UploadCommand {
    pub fn new(kind: ContractKind, env: CommandEnv, flags: Flags) -> Self {
        Self {
            kind,
            env,
            flags,
            resolved: None,
        }
    }

    fn resolved(&self) -> Result<&Contract, OpsError> {
        self.resolved
            .as_ref()
            .ok_or_else(|| OpsError::Configuration("command has not been built".into()))
    }
}

#[async_trait]
impl Command for UploadCommand {
    fn id(&self) -> String {
        format!("{}:upload", self.kind)
    }

    async fn build(&mut self) -> Result<(), OpsError> {
        let version = self
            .flags
            .str("version")
            .or_else(|| self.flags.str("versionTag"))
            .unwrap_or_else(|| DEFAULT_VERSION.to_string());
        let registry = Registry::new(artifacts_dir(&self.env)?);
        let contract = registry.resolve(self.kind, &version)?;
        if contract.bytecode.is_empty() {
            return Err(OpsError::Configuration(format!(
                "no bytecode found for {} {}",
                self.kind, version
            )));
        }
        self.resolved = Some(contract);
        Ok(())
    }

    async fn raw_messages(&self, _sender: &str) -> Result<Vec<CosmosMsg>, OpsError> {
        Err(OpsError::UnsupportedOperation(format!(
            "{} is submitted through a dedicated store-code call",
            self.id()
        )))
    }

    async fn before_execute(&self, signer: &str) -> Result<(), OpsError> {
        let contract = self.resolved()?;
        println!(
            "Uploading {} {} ({} bytes) as {}",
            contract.kind,
            contract.version,
            contract.bytecode.len(),
            self.env.style(signer),
        );
        Ok(())
    }

    async fn after_execute(&self, _response: &TxResult) -> Result<Option<Value>, OpsError> {
        Ok(None)
    }

    async fn execute(&mut self) -> Result<CommandResult, OpsError> {
        self.build().await?;
        let signer = self.env.config.signer.clone();
        self.before_execute(&signer).await?;
        confirm("Continue?", &self.flags)?;

        let contract = self.resolved()?;
        let code_id = self
            .env
            .client
            .upload(&signer, &contract.bytecode)
            .await
            .map_err(|e| OpsError::Submission(e.to_string()))?;
        log::info!("Uploaded {} with code id {}", self.kind, code_id);

        let data_dir = self.env.config.data_dir.clone();
        let network = self.env.config.name.clone();
        let mut ids = CodeIds::load(&data_dir, &network)?;
        ids.set(self.kind, code_id);
        ids.save(&data_dir, &network)?;

        Ok(CommandResult {
            tx: None,
            contract: String::new(),
            data: Some(json!({ "codeId": code_id })),
        })
    }
}

/// Instantiates a previously uploaded contract from its stored code id
pub struct DeployCommand {
    kind: ContractKind,
    env: CommandEnv,
    flags: Flags,
    built: Option<(u64, String, Value)>,
}

impl DeployCommand {
    pub fn new(kind: ContractKind, env: CommandEnv, flags: Flags) -> Self {
        Self {
            kind,
            env,
            flags,
            built: None,
        }
    }

    fn built(&self) -> Result<&(u64, String, Value), OpsError> {
        self.built
            .as_ref()
            .ok_or_else(|| OpsError::Configuration("command has not been built".into()))
    }
}

#[async_trait]
impl Command for DeployCommand {
    fn id(&self) -> String {
        format!("{}:deploy", self.kind)
    }

    async fn build(&mut self) -> Result<(), OpsError> {
        let code_id = match self.flags.u64("codeId") {
            Some(id) => id,
            None => {
                let ids = CodeIds::load(&self.env.config.data_dir, &self.env.config.name)?;
                ids.get(self.kind).ok_or_else(|| {
                    OpsError::Configuration(format!(
                        "no code id stored for {} on {}; upload it first or pass --codeId",
                        self.kind, self.env.config.name
                    ))
                })?
            }
        };
        let init_msg = self
            .flags
            .get("input")
            .cloned()
            .ok_or_else(|| OpsError::Configuration("--input init message is required".into()))?;
        let init_msg = match init_msg {
            Value::String(raw) => serde_json::from_str(&raw)
                .map_err(|e| OpsError::Configuration(format!("invalid --input: {}", e)))?,
            other => other,
        };
        let label = self
            .flags
            .str("label")
            .unwrap_or_else(|| self.kind.id().to_string());
        self.built = Some((code_id, label, init_msg));
        Ok(())
    }

    async fn raw_messages(&self, _sender: &str) -> Result<Vec<CosmosMsg>, OpsError> {
        Err(OpsError::UnsupportedOperation(format!(
            "{} is submitted through a dedicated instantiate call",
            self.id()
        )))
    }

    async fn before_execute(&self, _signer: &str) -> Result<(), OpsError> {
        let (code_id, label, init_msg) = self.built()?;
        println!(
            "Deploying {} (code id {}) with init message:\n{}",
            label,
            code_id,
            serde_json::to_string_pretty(init_msg)?
        );
        Ok(())
    }

    async fn after_execute(&self, _response: &TxResult) -> Result<Option<Value>, OpsError> {
        Ok(None)
    }

    async fn execute(&mut self) -> Result<CommandResult, OpsError> {
        self.build().await?;
        let signer = self.env.config.signer.clone();
        self.before_execute(&signer).await?;
        confirm("Continue?", &self.flags)?;

        let (code_id, label, init_msg) = self.built()?.clone();
        let deployed = self
            .env
            .client
            .instantiate(&signer, code_id, &label, &init_msg)
            .await
            .map_err(|e| OpsError::Submission(e.to_string()))?;
        log::info!(
            "Deployed {} at {} (tx {})",
            self.kind,
            deployed.address,
            deployed.tx_hash
        );

        Ok(CommandResult {
            tx: None,
            contract: deployed.address.clone(),
            data: Some(json!({ "address": deployed.address, "codeId": code_id })),
        })
    }
}
