//! ocr2 aggregator commands

use crate::encoding::{config_digest_hex, offchain_config_b64};
use crate::error::OpsError;
use crate::instruction::context::{CommandEnv, ExecutionContext};
use crate::instruction::definition::{Input, Instruction, InstructionSpec};
use crate::instruction::flags::Flags;
use crate::instruction::inspection::{InspectInstruction, Inspection};
use crate::chain::address::is_valid_address;
use crate::chain::client::TxResult;
use crate::rdd::Rdd;
use crate::registry::ContractKind;
use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::path::PathBuf;

fn rdd_from_flags(flags: &Flags) -> Result<Option<Rdd>, OpsError> {
    match flags.str("rdd") {
        Some(path) => Ok(Some(Rdd::load(&PathBuf::from(path))?)),
        None => Ok(None),
    }
}

// ---------------------------------------------------------------------------
// ocr2:propose_config

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ProposeConfigInput {
    pub f: u32,
    pub proposal_id: String,
    /// Onchain public keys, hex, `ocr2on_cosmos_` prefix already stripped
    pub signers: Vec<String>,
    pub transmitters: Vec<String>,
    pub payees: Vec<String>,
    #[serde(default)]
    pub onchain_config: String,
}

#[derive(Clone, Debug, Serialize)]
pub struct ProposeConfigPayload {
    pub f: u32,
    pub id: String,
    pub onchain_config: String,
    /// base64-encoded signer keys
    pub signers: Vec<String>,
    pub transmitters: Vec<String>,
    pub payees: Vec<String>,
}

#[derive(Clone, Copy, Default)]
pub struct ProposeConfig;

fn has_duplicates(items: &[String]) -> bool {
    let mut seen = std::collections::BTreeSet::new();
    items.iter().any(|item| !seen.insert(item))
}

#[async_trait]
impl Instruction for ProposeConfig {
    type UserInput = ProposeConfigInput;
    type ContractInput = ProposeConfigPayload;

    fn spec(&self) -> InstructionSpec {
        InstructionSpec {
            category: "OCR",
            kind: ContractKind::Ocr2,
            function: "propose_config",
            examples: &[
                "chainops ocr2:propose_config --network=<NETWORK> --rdd=<RDD_PATH> --configProposal=<PROPOSAL_ID> <CONTRACT_ADDRESS>",
            ],
        }
    }

    async fn make_user_input(
        &self,
        flags: &Flags,
        args: &[String],
    ) -> Result<Self::UserInput, OpsError> {
        if let Some(input) = flags.input_override()? {
            return Ok(input);
        }
        let proposal_id = flags
            .str("proposalId")
            .or_else(|| flags.str("configProposal"))
            .or_else(|| flags.str("id"))
            .unwrap_or_default();

        if let Some(rdd) = rdd_from_flags(flags)? {
            let contract = args.first().map(String::as_str).unwrap_or_default();
            let oracles = rdd.oracle_set(contract)?;
            return Ok(ProposeConfigInput {
                f: oracles.f,
                proposal_id,
                signers: oracles.signers,
                transmitters: oracles.transmitters,
                payees: oracles.payees,
                onchain_config: String::new(),
            });
        }

        Ok(ProposeConfigInput {
            f: flags.u64("f").unwrap_or(0) as u32,
            proposal_id,
            signers: flags.list("signers"),
            transmitters: flags.list("transmitters"),
            payees: flags.list("payees"),
            onchain_config: String::new(),
        })
    }

    fn validations(&self) -> &'static [&'static str] {
        &["fOracles", "equalLengths", "noDuplicates"]
    }

    async fn validate(
        &self,
        name: &str,
        user: &Self::UserInput,
        _ctx: &ExecutionContext,
    ) -> Result<(), String> {
        match name {
            "fOracles" => {
                if 3 * user.f as usize >= user.signers.len() {
                    return Err(format!(
                        "signers length needs to be higher than 3 * f ({}); currently {}",
                        3 * user.f,
                        user.signers.len()
                    ));
                }
                Ok(())
            }
            "equalLengths" => {
                if user.signers.len() != user.transmitters.len() {
                    return Err("signers and transmitters length are different".into());
                }
                if user.transmitters.len() != user.payees.len() {
                    return Err("transmitters and payees length are different".into());
                }
                Ok(())
            }
            "noDuplicates" => {
                if has_duplicates(&user.signers) {
                    return Err("signers array contains duplicates".into());
                }
                if has_duplicates(&user.transmitters) {
                    return Err("transmitters array contains duplicates".into());
                }
                Ok(())
            }
            other => Err(format!("unknown validator {}", other)),
        }
    }

    async fn make_contract_input(
        &self,
        user: &Self::UserInput,
        _ctx: &ExecutionContext,
    ) -> Result<Self::ContractInput, OpsError> {
        let signers = user
            .signers
            .iter()
            .map(|signer| {
                let raw = hex::decode(signer.trim_start_matches("ocr2on_cosmos_")).map_err(
                    |e| {
                        OpsError::Configuration(format!(
                            "signer key {} is not valid hex: {}",
                            signer, e
                        ))
                    },
                )?;
                Ok(BASE64.encode(raw))
            })
            .collect::<Result<Vec<_>, OpsError>>()?;

        Ok(ProposeConfigPayload {
            f: user.f,
            id: user.proposal_id.clone(),
            onchain_config: user.onchain_config.clone(),
            signers,
            transmitters: user.transmitters.clone(),
            payees: user.payees.clone(),
        })
    }

    async fn before_execute(
        &self,
        ctx: &ExecutionContext,
        input: &Input<Self::UserInput, Self::ContractInput>,
        _signer: &str,
    ) -> Result<(), OpsError> {
        log::info!("Executing {} from contract {}", ctx.id, ctx.contract);
        println!("Review the proposed configuration below:");
        println!("{}", serde_json::to_string_pretty(&input.contract)?);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// ocr2:accept_proposal

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AcceptProposalInput {
    pub proposal_id: String,
    /// hex digest of the reviewed config
    pub digest: String,
    pub offchain_config: Value,
    pub secret: String,
    pub random_secret: String,
}

#[derive(Clone, Debug, Serialize)]
pub struct AcceptProposalPayload {
    pub id: String,
    /// base64 digest, as the contract expects it
    pub digest: String,
}

#[derive(Clone, Copy, Default)]
pub struct AcceptProposal;

#[async_trait]
impl Instruction for AcceptProposal {
    type UserInput = AcceptProposalInput;
    type ContractInput = AcceptProposalPayload;

    fn spec(&self) -> InstructionSpec {
        InstructionSpec {
            category: "OCR",
            kind: ContractKind::Ocr2,
            function: "accept_proposal",
            examples: &[
                "chainops ocr2:accept_proposal --network=<NETWORK> --configProposal=<PROPOSAL_ID> --digest=<DIGEST> --secret=<SECRET> --randomSecret=<SECRET> <CONTRACT_ADDRESS>",
            ],
        }
    }

    async fn make_user_input(
        &self,
        flags: &Flags,
        args: &[String],
    ) -> Result<Self::UserInput, OpsError> {
        if let Some(input) = flags.input_override()? {
            return Ok(input);
        }
        let secret = flags
            .str("secret")
            .ok_or_else(|| OpsError::Configuration("--secret flag is required".into()))?;
        let random_secret = flags
            .str("randomSecret")
            .ok_or_else(|| OpsError::Configuration("--randomSecret flag is required".into()))?;

        let offchain_config = if let Some(rdd) = rdd_from_flags(flags)? {
            let contract = args.first().map(String::as_str).unwrap_or_default();
            serde_json::to_value(&rdd.contract(contract)?.config)?
        } else {
            flags.get("offchainConfig").cloned().unwrap_or(Value::Null)
        };

        Ok(AcceptProposalInput {
            proposal_id: flags
                .str("proposalId")
                .or_else(|| flags.str("configProposal"))
                .or_else(|| flags.str("id"))
                .unwrap_or_default(),
            digest: flags.str("digest").unwrap_or_default(),
            offchain_config,
            secret,
            random_secret,
        })
    }

    fn validations(&self) -> &'static [&'static str] {
        &[
            "validProposalId",
            "validDigest",
            "validRandomSecret",
            "validOffchainConfig",
        ]
    }

    async fn validate(
        &self,
        name: &str,
        user: &Self::UserInput,
        ctx: &ExecutionContext,
    ) -> Result<(), String> {
        match name {
            "validProposalId" => {
                if user.proposal_id.is_empty() {
                    return Err("config proposal id is required".into());
                }
                Ok(())
            }
            "validDigest" => {
                if user.digest.is_empty() {
                    return Err("config digest is required".into());
                }
                Ok(())
            }
            "validRandomSecret" => {
                if user.random_secret.is_empty() {
                    return Err(
                        "secret generated at proposing offchain config is required".into()
                    );
                }
                Ok(())
            }
            "validOffchainConfig" => {
                // regenerate the blob from the provided secrets and compare
                // with the one stored in the proposal
                let generated =
                    offchain_config_b64(&user.offchain_config, &user.secret, &user.random_secret);
                let proposal = ctx
                    .client()
                    .query(
                        &ctx.contract,
                        &json!({"proposal": {"id": user.proposal_id}}),
                    )
                    .await
                    .map_err(|e| e.to_string())?;
                let stored = proposal["offchain_config"].as_str().unwrap_or_default();
                if generated != stored {
                    return Err(format!(
                        "offchain config generated is different from the one proposed (local blob fingerprint {})",
                        config_digest_hex(generated.as_bytes())
                    ));
                }
                Ok(())
            }
            other => Err(format!("unknown validator {}", other)),
        }
    }

    async fn make_contract_input(
        &self,
        user: &Self::UserInput,
        _ctx: &ExecutionContext,
    ) -> Result<Self::ContractInput, OpsError> {
        let digest = hex::decode(&user.digest).map_err(|e| {
            OpsError::Configuration(format!("digest {} is not valid hex: {}", user.digest, e))
        })?;
        Ok(AcceptProposalPayload {
            id: user.proposal_id.clone(),
            digest: BASE64.encode(digest),
        })
    }

    async fn after_execute(
        &self,
        _ctx: &ExecutionContext,
        _input: &Input<Self::UserInput, Self::ContractInput>,
        response: &TxResult,
    ) -> Result<Option<Value>, OpsError> {
        log::info!("Config proposal accepted on tx {}", response.tx_hash);
        let digest = response.event_attribute("wasm-set_config", "latest_config_digest");
        if digest.is_none() {
            log::error!("Could not retrieve the new config digest from tx events");
        }
        Ok(digest.map(|d| json!({ "digest": d })))
    }

    fn overrides_after_execute(&self) -> bool {
        true
    }
}

// ---------------------------------------------------------------------------
// ocr2:withdraw_funds

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct WithdrawFundsInput {
    pub amount: Option<String>,
    pub recipient: Option<String>,
    #[serde(default)]
    pub all: bool,
}

#[derive(Clone, Debug, Serialize)]
pub struct WithdrawFundsPayload {
    pub amount: String,
    pub recipient: String,
}

#[derive(Clone, Copy, Default)]
pub struct WithdrawFunds;

#[async_trait]
impl Instruction for WithdrawFunds {
    type UserInput = WithdrawFundsInput;
    type ContractInput = WithdrawFundsPayload;

    fn spec(&self) -> InstructionSpec {
        InstructionSpec {
            category: "OCR",
            kind: ContractKind::Ocr2,
            function: "withdraw_funds",
            examples: &[
                "chainops ocr2:withdraw_funds --network=<NETWORK> --all --recipient=<RECIPIENT_ADDRESS> <CONTRACT_ADDRESS>",
                "chainops ocr2:withdraw_funds --network=<NETWORK> --amount=<AMOUNT> <CONTRACT_ADDRESS>",
            ],
        }
    }

    async fn make_user_input(
        &self,
        flags: &Flags,
        _args: &[String],
    ) -> Result<Self::UserInput, OpsError> {
        if let Some(input) = flags.input_override()? {
            return Ok(input);
        }
        Ok(WithdrawFundsInput {
            amount: flags.str("amount"),
            recipient: flags.str("recipient"),
            all: flags.bool("all"),
        })
    }

    fn validations(&self) -> &'static [&'static str] {
        &["validRecipient", "validAmount", "requireAmount"]
    }

    async fn validate(
        &self,
        name: &str,
        user: &Self::UserInput,
        _ctx: &ExecutionContext,
    ) -> Result<(), String> {
        match name {
            "validRecipient" => match &user.recipient {
                Some(recipient) if !is_valid_address(recipient) => {
                    Err(format!("invalid recipient address {}", recipient))
                }
                _ => Ok(()),
            },
            "validAmount" => match &user.amount {
                Some(amount) if amount.parse::<u128>().is_err() => {
                    Err(format!("invalid input amount {}", amount))
                }
                _ => Ok(()),
            },
            "requireAmount" => {
                if !user.all && user.amount.is_none() {
                    return Err("an amount is required".into());
                }
                Ok(())
            }
            other => Err(format!("unknown validator {}", other)),
        }
    }

    async fn make_contract_input(
        &self,
        user: &Self::UserInput,
        ctx: &ExecutionContext,
    ) -> Result<Self::ContractInput, OpsError> {
        // --all resolves the amount from the live balance at build time
        let amount = if user.all {
            let available = ctx
                .client()
                .query(&ctx.contract, &json!({"link_available_for_payment": {}}))
                .await?;
            available["amount"]
                .as_str()
                .map(str::to_string)
                .ok_or_else(|| {
                    OpsError::Configuration(
                        "link_available_for_payment returned no amount".into(),
                    )
                })?
        } else {
            user.amount.clone().unwrap_or_default()
        };
        Ok(WithdrawFundsPayload {
            amount,
            recipient: user
                .recipient
                .clone()
                .unwrap_or_else(|| ctx.signer.clone()),
        })
    }

    async fn before_execute(
        &self,
        ctx: &ExecutionContext,
        input: &Input<Self::UserInput, Self::ContractInput>,
        _signer: &str,
    ) -> Result<(), OpsError> {
        println!(
            "Withdrawing feed:\n  - Amount: {}\n  - Recipient: {}",
            input.contract.amount,
            ctx.style(&input.contract.recipient)
        );
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// ocr2:inspect

#[derive(Clone, Debug, Serialize)]
pub struct Ocr2Expected {
    pub f: u32,
    pub transmitters: Vec<String>,
}

#[derive(Clone, Debug, Serialize)]
pub struct Ocr2Onchain {
    pub f: u32,
    pub transmitters: Vec<String>,
}

#[derive(Clone, Copy, Default)]
pub struct Ocr2Inspect;

#[async_trait]
impl InspectInstruction for Ocr2Inspect {
    type Expected = Ocr2Expected;
    type Onchain = Ocr2Onchain;

    fn spec(&self) -> InstructionSpec {
        InstructionSpec {
            category: "OCR",
            kind: ContractKind::Ocr2,
            function: "inspect",
            examples: &[
                "chainops ocr2:inspect --network=<NETWORK> --rdd=<RDD_PATH> <CONTRACT_ADDRESS>",
            ],
        }
    }

    fn queries(&self) -> Vec<Value> {
        vec![json!({"transmitters": {}}), json!({"latest_config_details": {}})]
    }

    async fn make_expected(
        &self,
        flags: &Flags,
        args: &[String],
        _env: &CommandEnv,
    ) -> Result<Self::Expected, OpsError> {
        if let Some(rdd) = rdd_from_flags(flags)? {
            let contract = args.first().map(String::as_str).unwrap_or_default();
            let oracles = rdd.oracle_set(contract)?;
            return Ok(Ocr2Expected {
                f: oracles.f,
                transmitters: oracles.transmitters,
            });
        }
        Ok(Ocr2Expected {
            f: flags.u64("f").unwrap_or(0) as u32,
            transmitters: flags.list("transmitters"),
        })
    }

    fn make_onchain(&self, results: &[Value]) -> Result<Self::Onchain, OpsError> {
        let transmitters = results
            .first()
            .and_then(|r| r["addresses"].as_array())
            .map(|addresses| {
                addresses
                    .iter()
                    .filter_map(|a| a.as_str().map(str::to_string))
                    .collect()
            })
            .unwrap_or_default();
        let f = results
            .get(1)
            .and_then(|r| r["f"].as_u64())
            .unwrap_or_default() as u32;
        Ok(Ocr2Onchain { f, transmitters })
    }

    fn inspect(&self, expected: &Self::Expected, onchain: &Self::Onchain) -> Inspection {
        let mut inspection = Inspection::new();
        inspection.check("f", expected.f, onchain.f);
        inspection.check("transmitters", &expected.transmitters, &onchain.transmitters);
        inspection
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::mock::MockClient;
    use crate::config::NetworkConfig;
    use crate::instruction::command::{Command, CompiledCommand};
    use std::sync::Arc;

    fn env_with(client: Arc<MockClient>) -> CommandEnv {
        CommandEnv::new(client, NetworkConfig::local("wasm1operator"))
    }

    fn four_signers() -> String {
        (1..=4)
            .map(|i| format!("{:064x}", i))
            .collect::<Vec<_>>()
            .join(",")
    }

    #[tokio::test]
    async fn test_propose_config_builds_base64_signers() {
        let client = Arc::new(MockClient::new());
        let flags = Flags::from_pairs(&[
            "--f=1",
            "--proposalId=14",
            &format!("--signers={}", four_signers()),
            "--transmitters=wasm1t0,wasm1t1,wasm1t2,wasm1t3",
            "--payees=wasm1p0,wasm1p1,wasm1p2,wasm1p3",
        ])
        .unwrap();
        let mut command = CompiledCommand::new(
            ProposeConfig,
            env_with(client),
            flags,
            vec!["wasm1aggregator".into()],
        );
        command.build().await.unwrap();

        let msgs = command.raw_messages("wasm1operator").await.unwrap();
        let msg = match &msgs[0] {
            crate::chain::msg::CosmosMsg::ExecuteContract { msg, .. } => msg.clone(),
            other => panic!("unexpected message {:?}", other),
        };
        let payload = &msg["propose_config"];
        assert_eq!(payload["f"], 1);
        assert_eq!(payload["signers"].as_array().unwrap().len(), 4);
        // hex decoded then base64 encoded
        let first = payload["signers"][0].as_str().unwrap();
        assert_eq!(BASE64.decode(first).unwrap().len(), 32);
    }

    #[tokio::test]
    async fn test_propose_config_rejects_insufficient_oracles() {
        let client = Arc::new(MockClient::new());
        let flags = Flags::from_pairs(&[
            "--f=1",
            "--proposalId=14",
            "--signers=aa,bb,cc",
            "--transmitters=t0,t1,t2",
            "--payees=p0,p1,p2",
        ])
        .unwrap();
        let mut command = CompiledCommand::new(
            ProposeConfig,
            env_with(client),
            flags,
            vec!["wasm1aggregator".into()],
        );
        let err = command.build().await.unwrap_err();
        match err {
            OpsError::Validation(failures) => {
                assert!(failures.iter().any(|f| f.name == "fOracles"));
            }
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_withdraw_all_uses_live_balance() {
        let client = Arc::new(MockClient::new());
        client.stub_query(
            "wasm1aggregator",
            json!({"link_available_for_payment": {}}),
            json!({"amount": "987654"}),
        );
        let flags = Flags::from_pairs(&["--all", "--recipient=wasm1hft9sxhx7d7furw9y0rjxu4hfsm76ehkman78g"]).unwrap();
        let mut command = CompiledCommand::new(
            WithdrawFunds,
            env_with(client),
            flags,
            vec!["wasm1aggregator".into()],
        );
        command.build().await.unwrap();

        let msgs = command.raw_messages("wasm1operator").await.unwrap();
        let msg = match &msgs[0] {
            crate::chain::msg::CosmosMsg::ExecuteContract { msg, .. } => msg.clone(),
            other => panic!("unexpected message {:?}", other),
        };
        assert_eq!(msg["withdraw_funds"]["amount"], "987654");
    }

    #[tokio::test]
    async fn test_accept_proposal_validates_offchain_config() {
        let client = Arc::new(MockClient::new());
        let config = json!({"deltaProgressNanoseconds": 8000000000u64});
        client.stub_query(
            "wasm1aggregator",
            json!({"proposal": {"id": "4"}}),
            json!({
                "offchain_config": offchain_config_b64(&config, "good-secret", "random"),
            }),
        );

        let flags = Flags::from_pairs(&[
            "--proposalId=4",
            "--digest=00aabb",
            "--secret=wrong-secret",
            "--randomSecret=random",
            &format!("--offchainConfig={}", config),
        ])
        .unwrap();
        let mut command = CompiledCommand::new(
            AcceptProposal,
            env_with(client.clone()),
            flags,
            vec!["wasm1aggregator".into()],
        );

        let err = command.build().await.unwrap_err();
        match err {
            OpsError::Validation(failures) => {
                assert!(failures.iter().any(|f| f.name == "validOffchainConfig"));
            }
            other => panic!("expected validation error, got {:?}", other),
        }
        assert_eq!(client.broadcast_count(), 0);
    }
}
