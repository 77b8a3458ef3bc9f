//! Access controller commands

use crate::chain::address::is_valid_address;
use crate::error::OpsError;
use crate::instruction::context::ExecutionContext;
use crate::instruction::definition::{Instruction, InstructionSpec};
use crate::instruction::flags::Flags;
use crate::registry::ContractKind;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AccessInput {
    pub address: String,
}

#[derive(Clone, Debug, Serialize)]
pub struct AccessPayload {
    pub address: String,
}

fn make_input(flags: &Flags) -> Result<AccessInput, OpsError> {
    if let Some(input) = flags.input_override()? {
        return Ok(input);
    }
    Ok(AccessInput {
        address: flags.str("address").unwrap_or_default(),
    })
}

fn validate_access(name: &str, user: &AccessInput) -> Result<(), String> {
    match name {
        "validAddress" => {
            if !is_valid_address(&user.address) {
                return Err(format!("invalid access address {}", user.address));
            }
            Ok(())
        }
        other => Err(format!("unknown validator {}", other)),
    }
}

#[derive(Clone, Copy, Default)]
pub struct AddAccess;

#[async_trait]
impl Instruction for AddAccess {
    type UserInput = AccessInput;
    type ContractInput = AccessPayload;

    fn spec(&self) -> InstructionSpec {
        InstructionSpec {
            category: "Access Controller",
            kind: ContractKind::AccessController,
            function: "add_access",
            examples: &[
                "chainops access_controller:add_access --network=<NETWORK> --address=<ADDRESS> <CONTRACT_ADDRESS>",
            ],
        }
    }

    async fn make_user_input(
        &self,
        flags: &Flags,
        _args: &[String],
    ) -> Result<Self::UserInput, OpsError> {
        make_input(flags)
    }

    fn validations(&self) -> &'static [&'static str] {
        &["validAddress"]
    }

    async fn validate(
        &self,
        name: &str,
        user: &Self::UserInput,
        _ctx: &ExecutionContext,
    ) -> Result<(), String> {
        validate_access(name, user)
    }

    async fn make_contract_input(
        &self,
        user: &Self::UserInput,
        _ctx: &ExecutionContext,
    ) -> Result<Self::ContractInput, OpsError> {
        Ok(AccessPayload {
            address: user.address.clone(),
        })
    }
}

#[derive(Clone, Copy, Default)]
pub struct RemoveAccess;

#[async_trait]
impl Instruction for RemoveAccess {
    type UserInput = AccessInput;
    type ContractInput = AccessPayload;

    fn spec(&self) -> InstructionSpec {
        InstructionSpec {
            category: "Access Controller",
            kind: ContractKind::AccessController,
            function: "remove_access",
            examples: &[
                "chainops access_controller:remove_access --network=<NETWORK> --address=<ADDRESS> <CONTRACT_ADDRESS>",
            ],
        }
    }

    async fn make_user_input(
        &self,
        flags: &Flags,
        _args: &[String],
    ) -> Result<Self::UserInput, OpsError> {
        make_input(flags)
    }

    fn validations(&self) -> &'static [&'static str] {
        &["validAddress"]
    }

    async fn validate(
        &self,
        name: &str,
        user: &Self::UserInput,
        _ctx: &ExecutionContext,
    ) -> Result<(), String> {
        validate_access(name, user)
    }

    async fn make_contract_input(
        &self,
        user: &Self::UserInput,
        _ctx: &ExecutionContext,
    ) -> Result<Self::ContractInput, OpsError> {
        Ok(AccessPayload {
            address: user.address.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::mock::MockClient;
    use crate::chain::msg::CosmosMsg;
    use crate::config::NetworkConfig;
    use crate::instruction::command::{Command, CompiledCommand};
    use crate::instruction::context::CommandEnv;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_add_access_message_shape() {
        let env = CommandEnv::new(
            Arc::new(MockClient::new()),
            NetworkConfig::local("wasm1operator"),
        );
        let flags = Flags::from_pairs(&[
            "--address=wasm1hft9sxhx7d7furw9y0rjxu4hfsm76ehkman78g",
        ])
        .unwrap();
        let mut command =
            CompiledCommand::new(AddAccess, env, flags, vec!["wasm1controller".into()]);
        command.build().await.unwrap();

        let msgs = command.raw_messages("wasm1operator").await.unwrap();
        match &msgs[0] {
            CosmosMsg::ExecuteContract { msg, .. } => {
                assert_eq!(
                    msg["add_access"]["address"],
                    "wasm1hft9sxhx7d7furw9y0rjxu4hfsm76ehkman78g"
                );
            }
            other => panic!("unexpected message {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_remove_access_rejects_invalid_address() {
        let env = CommandEnv::new(
            Arc::new(MockClient::new()),
            NetworkConfig::local("wasm1operator"),
        );
        let flags = Flags::from_pairs(&["--address=bogus"]).unwrap();
        let mut command =
            CompiledCommand::new(RemoveAccess, env, flags, vec!["wasm1controller".into()]);
        let err = command.build().await.unwrap_err();
        assert_eq!(err.kind(), "validation");
    }
}
