//! Instruction definitions
//!
//! An instruction is a declarative description of one contract operation:
//! how to build user input from flags, how to validate it, how to map it to
//! the exact shape the contract expects, and optional hooks around
//! submission. The compiler in `command.rs` turns any implementation of this
//! trait into a runnable command.

use crate::chain::client::TxResult;
use crate::error::OpsError;
use crate::instruction::context::ExecutionContext;
use crate::instruction::flags::Flags;
use crate::registry::ContractKind;
use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;

/// Static identity of an instruction
#[derive(Clone, Copy, Debug)]
pub struct InstructionSpec {
    pub category: &'static str,
    pub kind: ContractKind,
    pub function: &'static str,
    pub examples: &'static [&'static str],
}

impl InstructionSpec {
    /// Composite command identifier, `<kind>:<function>`
    pub fn id(&self) -> String {
        format!("{}:{}", self.kind, self.function)
    }
}

/// User-facing and contract-facing input of one build
pub struct Input<U, C> {
    pub user: U,
    pub contract: C,
}

/// One contract operation, declaratively described.
///
/// `make_contract_input` must be pure given the user input, apart from
/// read-only chain queries through the context.
#[async_trait]
pub trait Instruction: Send + Sync + 'static {
    type UserInput: Send + Sync;
    type ContractInput: Serialize + Send + Sync;

    fn spec(&self) -> InstructionSpec;

    /// Build the user-facing input from raw CLI flags and positional args
    async fn make_user_input(
        &self,
        flags: &Flags,
        args: &[String],
    ) -> Result<Self::UserInput, OpsError>;

    /// Names of the independent validators; each can be skipped with
    /// `--skip=<name>`
    fn validations(&self) -> &'static [&'static str] {
        &[]
    }

    /// Run the named validator. Only called with names from `validations()`.
    async fn validate(
        &self,
        name: &str,
        _user: &Self::UserInput,
        _ctx: &ExecutionContext,
    ) -> Result<(), String> {
        Err(format!("unknown validator {}", name))
    }

    /// Single whole-input predicate, always run and never skippable
    fn validate_user_input(&self, _user: &Self::UserInput) -> Result<(), String> {
        Ok(())
    }

    /// Map user input to the exact payload the contract call expects
    async fn make_contract_input(
        &self,
        user: &Self::UserInput,
        ctx: &ExecutionContext,
    ) -> Result<Self::ContractInput, OpsError>;

    /// Pre-submission review step; the default logs the planned input
    async fn before_execute(
        &self,
        ctx: &ExecutionContext,
        input: &Input<Self::UserInput, Self::ContractInput>,
        _signer: &str,
    ) -> Result<(), OpsError> {
        log::info!("Executing {} from contract {}", ctx.id, ctx.contract);
        println!(
            "Input params:\n{}",
            serde_json::to_string_pretty(&input.contract)?
        );
        Ok(())
    }

    /// Parse the submission response for derived facts
    async fn after_execute(
        &self,
        _ctx: &ExecutionContext,
        _input: &Input<Self::UserInput, Self::ContractInput>,
        _response: &TxResult,
    ) -> Result<Option<Value>, OpsError> {
        Ok(None)
    }

    /// Whether `after_execute` is overridden. Explicit, so wrappers never
    /// have to infer it from behavior.
    fn overrides_after_execute(&self) -> bool {
        false
    }
}
