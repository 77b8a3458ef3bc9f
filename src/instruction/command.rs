//! Command execution protocol
//!
//! `CompiledCommand` turns any `Instruction` into a runnable command with
//! the fixed lifecycle: build (input + validation + mapping), simulate,
//! confirm, submit, postprocess. Hand-written commands and wrappers
//! implement the erased `Command` trait directly.

use crate::chain::client::TxResult;
use crate::chain::msg::CosmosMsg;
use crate::error::{OpsError, ValidationFailure};
use crate::instruction::context::{CommandEnv, ExecutionContext};
use crate::instruction::definition::{Input, Instruction};
use crate::instruction::flags::Flags;
use crate::registry::{Operation, Registry, DEFAULT_VERSION};
use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;

/// Outcome of one command invocation
#[derive(Clone, Debug, Serialize)]
pub struct CommandResult {
    /// Broadcast result; `None` for read-only and dry-mode commands
    pub tx: Option<TxResult>,
    pub contract: String,
    /// Derived data from `after_execute` (digest, proposal id, verdict)
    pub data: Option<Value>,
}

/// The erased command object the dispatcher and the wrappers drive
#[async_trait]
pub trait Command: Send + Sync {
    fn id(&self) -> String;

    /// Stage 1: build input, run validation, map to contract input
    async fn build(&mut self) -> Result<(), OpsError>;

    /// The raw message list this command would submit, built for `sender`.
    /// Requires a prior `build`.
    async fn raw_messages(&self, sender: &str) -> Result<Vec<CosmosMsg>, OpsError>;

    /// Stage 3 review hook
    async fn before_execute(&self, signer: &str) -> Result<(), OpsError>;

    /// Stage 5 postprocess hook
    async fn after_execute(&self, response: &TxResult) -> Result<Option<Value>, OpsError>;

    fn overrides_after_execute(&self) -> bool {
        false
    }

    /// Full lifecycle: build, simulate, confirm, submit, postprocess
    async fn execute(&mut self) -> Result<CommandResult, OpsError>;
}

/// Interactive confirmation; the only stage allowed to prompt. Skipped with
/// `--yes` or when not attached to a terminal.
pub fn confirm(prompt: &str, flags: &Flags) -> Result<(), OpsError> {
    if flags.bool("yes") || !console::user_attended() {
        return Ok(());
    }
    let accepted = dialoguer::Confirm::new()
        .with_prompt(prompt)
        .default(false)
        .interact()
        .map_err(|e| OpsError::Configuration(format!("confirmation prompt failed: {}", e)))?;
    if accepted {
        Ok(())
    } else {
        Err(OpsError::Aborted)
    }
}

struct BuiltState<I: Instruction> {
    context: ExecutionContext,
    input: Input<I::UserInput, I::ContractInput>,
}

/// An instruction compiled into a runnable command
pub struct CompiledCommand<I: Instruction> {
    instruction: I,
    env: CommandEnv,
    flags: Flags,
    args: Vec<String>,
    built: Option<BuiltState<I>>,
}

impl<I: Instruction> CompiledCommand<I> {
    pub fn new(instruction: I, env: CommandEnv, flags: Flags, args: Vec<String>) -> Self {
        Self {
            instruction,
            env,
            flags,
            args,
            built: None,
        }
    }

    fn built(&self) -> Result<&BuiltState<I>, OpsError> {
        self.built
            .as_ref()
            .ok_or_else(|| OpsError::Configuration("command has not been built".into()))
    }

    /// When the contract schema is available locally, the function must
    /// exist in it and must not be a read-only query
    fn check_abi(&self) -> Result<(), OpsError> {
        let Some(dir) = &self.env.config.artifacts_dir else {
            return Ok(());
        };
        let spec = self.instruction.spec();
        let version = self
            .flags
            .str("version")
            .unwrap_or_else(|| DEFAULT_VERSION.to_string());
        let Some(contract) = Registry::new(dir).try_resolve(spec.kind, &version)? else {
            return Ok(());
        };
        match contract.abi.classify(spec.function)? {
            Operation::Execute => Ok(()),
            _ => Err(OpsError::UnsupportedOperation(format!(
                "{} is not an execute function of {}",
                spec.function, spec.kind
            ))),
        }
    }

    /// Run every non-skipped validator, collecting all failures so the
    /// operator sees every problem at once
    async fn run_validations(
        &self,
        user: &I::UserInput,
        context: &ExecutionContext,
    ) -> Result<(), OpsError> {
        let skipped = self.flags.skipped_validations();
        let mut failures: Vec<ValidationFailure> = Vec::new();

        for name in self.instruction.validations() {
            if skipped.iter().any(|s| s == name) {
                log::warn!("Skipping validation {}", name);
                continue;
            }
            match self.instruction.validate(name, user, context).await {
                Ok(()) => log::debug!("Validation {} succeeded", name),
                Err(message) => failures.push(ValidationFailure::new(*name, message)),
            }
        }

        if let Err(message) = self.instruction.validate_user_input(user) {
            failures.push(ValidationFailure::new("input", message));
        }

        if failures.is_empty() {
            Ok(())
        } else {
            Err(OpsError::Validation(failures))
        }
    }
}

#[async_trait]
impl<I: Instruction> Command for CompiledCommand<I> {
    fn id(&self) -> String {
        self.instruction.spec().id()
    }

    async fn build(&mut self) -> Result<(), OpsError> {
        self.check_abi()?;
        let contract = self.args.first().cloned().ok_or_else(|| {
            OpsError::Configuration(format!("{}: target contract address required", self.id()))
        })?;

        let context = ExecutionContext {
            id: self.id(),
            contract,
            signer: self.env.config.signer.clone(),
            env: self.env.clone(),
            flags: self.flags.clone(),
        };

        let user = self
            .instruction
            .make_user_input(&self.flags, &self.args)
            .await?;
        self.run_validations(&user, &context).await?;
        let contract_input = self
            .instruction
            .make_contract_input(&user, &context)
            .await?;

        self.built = Some(BuiltState {
            context,
            input: Input {
                user,
                contract: contract_input,
            },
        });
        Ok(())
    }

    async fn raw_messages(&self, sender: &str) -> Result<Vec<CosmosMsg>, OpsError> {
        let built = self.built()?;
        // The execute payload nests the input under the function name,
        // matching the contract's ABI shape.
        let function = self.instruction.spec().function;
        let msg = serde_json::json!({ function: serde_json::to_value(&built.input.contract)? });
        Ok(vec![CosmosMsg::execute(
            sender,
            built.context.contract.clone(),
            msg,
        )])
    }

    async fn before_execute(&self, signer: &str) -> Result<(), OpsError> {
        let built = self.built()?;
        self.instruction
            .before_execute(&built.context, &built.input, signer)
            .await
    }

    async fn after_execute(&self, response: &TxResult) -> Result<Option<Value>, OpsError> {
        let built = self.built()?;
        self.instruction
            .after_execute(&built.context, &built.input, response)
            .await
    }

    fn overrides_after_execute(&self) -> bool {
        self.instruction.overrides_after_execute()
    }

    async fn execute(&mut self) -> Result<CommandResult, OpsError> {
        self.build().await?;
        let signer = self.env.config.signer.clone();
        let msgs = self.raw_messages(&signer).await?;

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
        let contract = self.built()?.context.contract.clone();
        Ok(CommandResult {
            tx: Some(response),
            contract,
            data,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::mock::MockClient;
    use crate::config::NetworkConfig;
    use crate::instruction::definition::InstructionSpec;
    use crate::registry::ContractKind;
    use std::sync::Arc;

    #[derive(Serialize)]
    struct TransferInput {
        recipient: String,
        amount: String,
    }

    /// Minimal instruction with two named validators
    struct Transfer;

    #[async_trait]
    impl Instruction for Transfer {
        type UserInput = (String, String);
        type ContractInput = TransferInput;

        fn spec(&self) -> InstructionSpec {
            InstructionSpec {
                category: "Token",
                kind: ContractKind::Cw20Base,
                function: "transfer",
                examples: &[],
            }
        }

        async fn make_user_input(
            &self,
            flags: &Flags,
            _args: &[String],
        ) -> Result<Self::UserInput, OpsError> {
            Ok((
                flags.str("to").unwrap_or_default(),
                flags.str("amount").unwrap_or_default(),
            ))
        }

        fn validations(&self) -> &'static [&'static str] {
            &["validRecipient", "validAmount"]
        }

        async fn validate(
            &self,
            name: &str,
            user: &Self::UserInput,
            _ctx: &ExecutionContext,
        ) -> Result<(), String> {
            match name {
                "validRecipient" if user.0.is_empty() => Err("recipient is required".into()),
                "validAmount" if user.1.parse::<u128>().is_err() => {
                    Err(format!("invalid amount {}", user.1))
                }
                _ => Ok(()),
            }
        }

        async fn make_contract_input(
            &self,
            user: &Self::UserInput,
            _ctx: &ExecutionContext,
        ) -> Result<Self::ContractInput, OpsError> {
            Ok(TransferInput {
                recipient: user.0.clone(),
                amount: user.1.clone(),
            })
        }
    }

    fn env() -> (Arc<MockClient>, CommandEnv) {
        let client = Arc::new(MockClient::new());
        let env = CommandEnv::new(client.clone(), NetworkConfig::local("wasm1operator"));
        (client, env)
    }

    fn flags(pairs: &[&str]) -> Flags {
        Flags::from_pairs(pairs).unwrap()
    }

    #[tokio::test]
    async fn test_all_failures_reported_together() {
        let (_client, env) = env();
        let mut command = CompiledCommand::new(
            Transfer,
            env,
            flags(&["--amount=abc"]),
            vec!["wasm1token".into()],
        );

        let err = command.build().await.unwrap_err();
        match err {
            OpsError::Validation(failures) => {
                let names: Vec<_> = failures.iter().map(|f| f.name.as_str()).collect();
                assert_eq!(names, vec!["validRecipient", "validAmount"]);
            }
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_skip_flag_excludes_exactly_named_validators() {
        let (_client, env) = env();
        let mut command = CompiledCommand::new(
            Transfer,
            env,
            flags(&["--amount=abc", "--skip=validRecipient"]),
            vec!["wasm1token".into()],
        );

        let err = command.build().await.unwrap_err();
        match err {
            OpsError::Validation(failures) => {
                assert_eq!(failures.len(), 1);
                assert_eq!(failures[0].name, "validAmount");
            }
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_valid_input_builds_contract_input() {
        let (_client, env) = env();
        let mut command = CompiledCommand::new(
            Transfer,
            env,
            flags(&["--to=wasm1dest", "--amount=100"]),
            vec!["wasm1token".into()],
        );

        command.build().await.unwrap();
        let msgs = command.raw_messages("wasm1operator").await.unwrap();
        assert_eq!(msgs.len(), 1);
        match &msgs[0] {
            CosmosMsg::ExecuteContract { contract, msg, .. } => {
                assert_eq!(contract, "wasm1token");
                assert_eq!(msg["transfer"]["amount"], "100");
            }
            other => panic!("unexpected message {:?}", other),
        }
    }

    fn env_with_schema(schema: &str) -> (tempfile::TempDir, CommandEnv) {
        let dir = tempfile::tempdir().unwrap();
        let schema_dir = dir.path().join("cw20_base").join(DEFAULT_VERSION);
        std::fs::create_dir_all(&schema_dir).unwrap();
        std::fs::write(schema_dir.join("schema.json"), schema).unwrap();

        let mut config = NetworkConfig::local("wasm1operator");
        config.artifacts_dir = Some(dir.path().to_path_buf());
        let env = CommandEnv::new(Arc::new(MockClient::new()), config);
        (dir, env)
    }

    #[tokio::test]
    async fn test_build_accepts_function_declared_in_local_schema() {
        let (_dir, env) = env_with_schema(r#"{"execute": {"oneOf": [{"required": ["transfer"]}]}}"#);
        let mut command = CompiledCommand::new(
            Transfer,
            env,
            flags(&["--to=wasm1dest", "--amount=100"]),
            vec!["wasm1token".into()],
        );
        command.build().await.unwrap();
    }

    #[tokio::test]
    async fn test_build_rejects_function_missing_from_local_schema() {
        let (_dir, env) = env_with_schema(r#"{"execute": {"oneOf": [{"required": ["mint"]}]}}"#);
        let mut command = CompiledCommand::new(
            Transfer,
            env,
            flags(&["--to=wasm1dest", "--amount=100"]),
            vec!["wasm1token".into()],
        );
        let err = command.build().await.unwrap_err();
        assert_eq!(err.kind(), "configuration");
        assert!(err.to_string().contains("not found in contract ABI"));
    }

    #[tokio::test]
    async fn test_build_rejects_query_function_on_execute_path() {
        let (_dir, env) = env_with_schema(r#"{"query": {"oneOf": [{"required": ["transfer"]}]}}"#);
        let mut command = CompiledCommand::new(
            Transfer,
            env,
            flags(&["--to=wasm1dest", "--amount=100"]),
            vec!["wasm1token".into()],
        );
        let err = command.build().await.unwrap_err();
        assert_eq!(err.kind(), "unsupported-operation");
    }

    #[tokio::test]
    async fn test_simulation_failure_aborts_before_broadcast() {
        let (client, env) = env();
        client.fail_simulation("insufficient funds");
        let mut command = CompiledCommand::new(
            Transfer,
            env,
            flags(&["--to=wasm1dest", "--amount=100", "--yes"]),
            vec!["wasm1token".into()],
        );

        let err = command.execute().await.unwrap_err();
        assert_eq!(err.kind(), "simulation");
        assert_eq!(client.broadcast_count(), 0);
    }

    #[tokio::test]
    async fn test_broadcast_failure_is_submission_error() {
        let (client, env) = env();
        client.fail_broadcast("mempool full");
        let mut command = CompiledCommand::new(
            Transfer,
            env,
            flags(&["--to=wasm1dest", "--amount=100", "--yes"]),
            vec!["wasm1token".into()],
        );

        let err = command.execute().await.unwrap_err();
        assert_eq!(err.kind(), "submission");
    }

    #[tokio::test]
    async fn test_execute_submits_and_reports() {
        let (client, env) = env();
        let mut command = CompiledCommand::new(
            Transfer,
            env,
            flags(&["--to=wasm1dest", "--amount=100", "--yes"]),
            vec!["wasm1token".into()],
        );

        let result = command.execute().await.unwrap();
        assert_eq!(result.contract, "wasm1token");
        assert!(result.tx.is_some());
        let broadcasts = client.broadcasts();
        assert_eq!(broadcasts.len(), 1);
        assert_eq!(broadcasts[0].0, "wasm1operator");
    }
}
