//! Batch compiler
//!
//! Fans one instruction out over multiple target contracts, either with one
//! shared input or with a parallel per-target input list. Sub-commands are
//! built concurrently; their messages are concatenated in input order into a
//! single atomic multi-message transaction with one shared gas simulation.

use crate::chain::client::TxResult;
use crate::chain::msg::CosmosMsg;
use crate::error::OpsError;
use crate::instruction::command::{confirm, Command, CommandResult, CompiledCommand};
use crate::instruction::context::CommandEnv;
use crate::instruction::definition::Instruction;
use crate::instruction::flags::Flags;
use async_trait::async_trait;
use futures::future::try_join_all;
use serde_json::Value;

pub struct BatchCommand<I: Instruction + Clone> {
    instruction: I,
    env: CommandEnv,
    flags: Flags,
    targets: Vec<String>,
    subs: Vec<CompiledCommand<I>>,
}

impl<I: Instruction + Clone> BatchCommand<I> {
    pub fn new(instruction: I, env: CommandEnv, flags: Flags, targets: Vec<String>) -> Self {
        Self {
            instruction,
            env,
            flags,
            targets,
            subs: Vec::new(),
        }
    }

    /// Per-target inputs from `--input`/`--inputFile`, if given
    fn explicit_inputs(&self) -> Result<Option<Vec<Value>>, OpsError> {
        let Some(raw) = self.flags.raw_input()? else {
            return Ok(None);
        };
        match raw {
            Value::Array(items) => Ok(Some(items)),
            other => Err(OpsError::Configuration(format!(
                "batch input must be a JSON array, got: {}",
                other
            ))),
        }
    }

    /// Precondition check; runs before any sub-command is built
    fn check_preconditions(&self, inputs: &Option<Vec<Value>>) -> Result<(), OpsError> {
        if self.targets.is_empty() {
            return Err(OpsError::Configuration(
                "batch requires at least one target contract".into(),
            ));
        }
        if let Some(inputs) = inputs {
            if inputs.len() != self.targets.len() && inputs.len() != 1 {
                return Err(OpsError::Configuration(format!(
                    "cannot apply {} command inputs to {} contracts",
                    inputs.len(),
                    self.targets.len()
                )));
            }
        }
        Ok(())
    }

    fn separator() {
        println!("{}", console::style("-".repeat(60)).dim());
    }
}

#[async_trait]
impl<I: Instruction + Clone> Command for BatchCommand<I> {
    fn id(&self) -> String {
        format!("{}:batch", self.instruction.spec().id())
    }

    async fn build(&mut self) -> Result<(), OpsError> {
        let inputs = self.explicit_inputs()?;
        self.check_preconditions(&inputs)?;

        let mut subs = Vec::with_capacity(self.targets.len());
        for (index, target) in self.targets.iter().enumerate() {
            let mut flags = self.flags.clone();
            flags.remove("input");
            flags.remove("inputFile");
            if let Some(inputs) = &inputs {
                let input = if inputs.len() == 1 { &inputs[0] } else { &inputs[index] };
                flags.merge_object(input)?;
            }
            subs.push(CompiledCommand::new(
                self.instruction.clone(),
                self.env.clone(),
                flags,
                vec![target.clone()],
            ));
        }

        // concurrent builds; any failure fails the whole batch
        try_join_all(subs.iter_mut().map(|sub| sub.build())).await?;
        self.subs = subs;
        Ok(())
    }

    async fn raw_messages(&self, sender: &str) -> Result<Vec<CosmosMsg>, OpsError> {
        if self.subs.is_empty() {
            return Err(OpsError::Configuration("batch has not been built".into()));
        }
        let mut msgs = Vec::with_capacity(self.subs.len());
        for sub in &self.subs {
            msgs.extend(sub.raw_messages(sender).await?);
        }
        Ok(msgs)
    }

    async fn before_execute(&self, signer: &str) -> Result<(), OpsError> {
        for sub in &self.subs {
            Self::separator();
            sub.before_execute(signer).await?;
        }
        Self::separator();
        Ok(())
    }

    async fn after_execute(&self, response: &TxResult) -> Result<Option<Value>, OpsError> {
        if !self.overrides_after_execute() {
            return Ok(None);
        }
        let mut collected = Vec::with_capacity(self.subs.len());
        for sub in &self.subs {
            Self::separator();
            collected.push(sub.after_execute(response).await?);
        }
        Self::separator();
        Ok(Some(Value::Array(
            collected.into_iter().map(|d| d.unwrap_or(Value::Null)).collect(),
        )))
    }

    fn overrides_after_execute(&self) -> bool {
        self.instruction.overrides_after_execute()
    }

    async fn execute(&mut self) -> Result<CommandResult, OpsError> {
        self.build().await?;
        let signer = self.env.config.signer.clone();
        let msgs = self.raw_messages(&signer).await?;

        log::info!("Executing batch {} tx simulation", self.id());
        let gas = self
            .env
            .client
            .simulate(&signer, &msgs)
            .await
            .map_err(|e| OpsError::Simulation(e.to_string()))?;
        log::info!("Tx simulation successful: estimated gas usage is {}", gas);

        self.before_execute(&signer).await?;
        confirm("Continue?", &self.flags)?;

        let response = self
            .env
            .client
            .sign_and_broadcast(&signer, &msgs)
            .await
            .map_err(|e| OpsError::Submission(e.to_string()))?;
        log::info!("Tx finished at {}", response.tx_hash);

        let data = self.after_execute(&response).await?;
        Ok(CommandResult {
            tx: Some(response),
            contract: self.targets[0].clone(),
            data,
        })
    }
}
