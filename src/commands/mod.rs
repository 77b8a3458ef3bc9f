//! Command catalog and dispatch
//!
//! Maps a `kind:function[:modifier...]` identifier to a runnable command.
//! The `batch` modifier fans the instruction out over every positional
//! target; the `multisig` modifier wraps whatever was built so its
//! transaction goes through cw3 governance. Modifiers compose in that order.

pub mod access_controller;
pub mod cw20;
pub mod deploy;
pub mod ocr2;
pub mod wallet;

use crate::error::OpsError;
use crate::instruction::batch::BatchCommand;
use crate::instruction::command::{Command, CompiledCommand};
use crate::instruction::context::CommandEnv;
use crate::instruction::definition::{Instruction, InstructionSpec};
use crate::instruction::flags::Flags;
use crate::instruction::inspection::InspectionCommand;
use crate::multisig::MultisigCommand;

use access_controller::{AddAccess, RemoveAccess};
use cw20::{Mint, Transfer};
use deploy::{DeployCommand, UploadCommand};
use ocr2::{AcceptProposal, Ocr2Inspect, ProposeConfig, WithdrawFunds};
use wallet::WalletSend;

/// Every registered instruction, for `help` output
pub fn known_commands() -> Vec<InstructionSpec> {
    use crate::instruction::inspection::InspectInstruction;
    vec![
        ProposeConfig.spec(),
        AcceptProposal.spec(),
        WithdrawFunds.spec(),
        InspectInstruction::spec(&Ocr2Inspect),
        Mint.spec(),
        Transfer.spec(),
        AddAccess.spec(),
        RemoveAccess.spec(),
    ]
}

struct Parsed<'a> {
    kind: &'a str,
    function: &'a str,
    batch: bool,
    multisig: bool,
}

fn parse_id(id: &str) -> Result<Parsed<'_>, OpsError> {
    let mut parts = id.split(':');
    let kind = parts.next().unwrap_or_default();
    let function = parts.next().ok_or_else(|| {
        OpsError::Configuration(format!(
            "malformed command {}: expected <kind>:<function>[:modifier]",
            id
        ))
    })?;
    let mut parsed = Parsed {
        kind,
        function,
        batch: false,
        multisig: false,
    };
    for modifier in parts {
        match modifier {
            "batch" => parsed.batch = true,
            "multisig" => parsed.multisig = true,
            other => {
                return Err(OpsError::Configuration(format!(
                    "unknown command modifier: {}",
                    other
                )))
            }
        }
    }
    Ok(parsed)
}

fn compile<I: Instruction + Clone>(
    instruction: I,
    env: &CommandEnv,
    flags: &Flags,
    args: &[String],
    batch: bool,
) -> Box<dyn Command> {
    if batch {
        Box::new(BatchCommand::new(
            instruction,
            env.clone(),
            flags.clone(),
            args.to_vec(),
        ))
    } else {
        Box::new(CompiledCommand::new(
            instruction,
            env.clone(),
            flags.clone(),
            args.to_vec(),
        ))
    }
}

/// Resolve a command identifier into a runnable command
pub fn make_command(
    id: &str,
    env: &CommandEnv,
    flags: &Flags,
    args: &[String],
) -> Result<Box<dyn Command>, OpsError> {
    let parsed = parse_id(id)?;

    let base: Box<dyn Command> = match (parsed.kind, parsed.function) {
        ("wallet", "send") => {
            if parsed.batch {
                return Err(OpsError::UnsupportedOperation(
                    "wallet:send cannot be batched".into(),
                ));
            }
            Box::new(WalletSend::new(env.clone(), flags.clone(), args.to_vec()))
        }
        ("ocr2", "propose_config") => compile(ProposeConfig, env, flags, args, parsed.batch),
        ("ocr2", "accept_proposal") => compile(AcceptProposal, env, flags, args, parsed.batch),
        ("ocr2", "withdraw_funds") => compile(WithdrawFunds, env, flags, args, parsed.batch),
        ("ocr2", "inspect") => {
            if parsed.batch || parsed.multisig {
                return Err(OpsError::UnsupportedOperation(
                    "inspections are read-only and take no modifiers".into(),
                ));
            }
            Box::new(InspectionCommand::new(
                Ocr2Inspect,
                env.clone(),
                flags.clone(),
                args.to_vec(),
            ))
        }
        ("cw20_base", "mint") => compile(Mint, env, flags, args, parsed.batch),
        ("cw20_base", "transfer") => compile(Transfer, env, flags, args, parsed.batch),
        ("access_controller", "add_access") => compile(AddAccess, env, flags, args, parsed.batch),
        ("access_controller", "remove_access") => {
            compile(RemoveAccess, env, flags, args, parsed.batch)
        }
        (kind, "upload") => {
            Box::new(UploadCommand::new(kind.parse()?, env.clone(), flags.clone()))
        }
        (kind, "deploy") => {
            Box::new(DeployCommand::new(kind.parse()?, env.clone(), flags.clone()))
        }
        (kind, function) => {
            return Err(OpsError::Configuration(format!(
                "unknown command {}:{}; run `chainops help` for the catalog",
                kind, function
            )))
        }
    };

    if parsed.multisig {
        let wrapped = MultisigCommand::new(base, env.clone(), flags.clone())?;
        return Ok(Box::new(wrapped));
    }
    Ok(base)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::mock::MockClient;
    use crate::config::NetworkConfig;
    use std::sync::Arc;

    fn env() -> CommandEnv {
        CommandEnv::new(
            Arc::new(MockClient::new()),
            NetworkConfig::local("wasm1operator"),
        )
    }

    #[test]
    fn test_dispatch_known_commands() {
        let env = env();
        let flags = Flags::new();
        let args = vec!["wasm1contract".to_string()];
        for id in [
            "wallet:send",
            "ocr2:propose_config",
            "ocr2:accept_proposal",
            "ocr2:withdraw_funds",
            "ocr2:inspect",
            "cw20_base:mint",
            "cw20_base:transfer",
            "cw20_base:mint:batch",
            "access_controller:add_access",
            "access_controller:remove_access",
            "ocr2:upload",
            "ocr2:deploy",
        ] {
            let command = make_command(id, &env, &flags, &args).unwrap();
            assert_eq!(command.id(), id);
        }
    }

    #[test]
    fn test_dispatch_rejects_unknown() {
        let env = env();
        let flags = Flags::new();
        assert!(make_command("ocr2", &env, &flags, &[]).is_err());
        assert!(make_command("ocr2:fly", &env, &flags, &[]).is_err());
        assert!(make_command("flux:deploy", &env, &flags, &[]).is_err());
        assert!(make_command("ocr2:inspect:batch", &env, &flags, &[]).is_err());
        assert!(make_command("cw20_base:mint:turbo", &env, &flags, &[]).is_err());
    }

    #[test]
    fn test_multisig_modifier_requires_configured_multisig() {
        let env = env();
        let flags = Flags::new();
        // the trait object has no Debug impl, so match instead of unwrap_err
        match make_command(
            "cw20_base:mint:multisig",
            &env,
            &flags,
            &["wasm1contract".to_string()],
        ) {
            Err(err) => assert_eq!(err.kind(), "configuration"),
            Ok(_) => panic!("expected a configuration error"),
        }
    }

    #[test]
    fn test_multisig_modifier_wraps_command() {
        let client = Arc::new(MockClient::new());
        let mut config = NetworkConfig::local("wasm1operator");
        config.multisig = Some("wasm1hft9sxhx7d7furw9y0rjxu4hfsm76ehkman78g".to_string());
        config.group = Some("wasm10f0wy3fs6ex395ylturr0hv03m3cjcjpy4ux6x".to_string());
        let env = CommandEnv::new(client, config);

        let command = make_command(
            "cw20_base:mint:multisig",
            &env,
            &Flags::new(),
            &["wasm1contract".to_string()],
        )
        .unwrap();
        assert_eq!(command.id(), "cw20_base:mint:multisig");
    }

    #[test]
    fn test_catalog_lists_every_instruction() {
        let ids: Vec<String> = known_commands().iter().map(|s| s.id()).collect();
        assert!(ids.contains(&"ocr2:propose_config".to_string()));
        assert!(ids.contains(&"cw20_base:transfer".to_string()));
        assert_eq!(ids.len(), 8);
    }
}
