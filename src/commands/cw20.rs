//! cw20 token commands

use crate::chain::address::is_valid_address;
use crate::error::OpsError;
use crate::instruction::context::ExecutionContext;
use crate::instruction::definition::{Instruction, InstructionSpec};
use crate::instruction::flags::Flags;
use crate::registry::ContractKind;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// The token contract tracks 18 decimal places
pub const TOKEN_DECIMALS: u32 = 18;

/// Scale a whole-token amount to the base unit the contract expects
pub fn scale_amount(amount: &str) -> Result<String, OpsError> {
    let tokens: u128 = amount
        .parse()
        .map_err(|_| OpsError::Configuration(format!("invalid token amount {}", amount)))?;
    let scaled = tokens
        .checked_mul(10u128.pow(TOKEN_DECIMALS))
        .ok_or_else(|| OpsError::Configuration(format!("token amount {} overflows", amount)))?;
    Ok(scaled.to_string())
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TokenTransferInput {
    pub recipient: String,
    /// Whole tokens; scaled at contract-input time
    pub amount: String,
}

#[derive(Clone, Debug, Serialize)]
pub struct MintPayload {
    pub recipient: String,
    pub amount: String,
}

#[derive(Clone, Copy, Default)]
pub struct Mint;

#[async_trait]
impl Instruction for Mint {
    type UserInput = TokenTransferInput;
    type ContractInput = MintPayload;

    fn spec(&self) -> InstructionSpec {
        InstructionSpec {
            category: "Token",
            kind: ContractKind::Cw20Base,
            function: "mint",
            examples: &[
                "chainops cw20_base:mint --network=<NETWORK> --to=<RECIPIENT> --amount=<AMOUNT> <CONTRACT_ADDRESS>",
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
        Ok(TokenTransferInput {
            recipient: flags
                .str("to")
                .or_else(|| flags.str("recipient"))
                .unwrap_or_default(),
            amount: flags.str("amount").unwrap_or_default(),
        })
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
        validate_transfer(name, user)
    }

    async fn make_contract_input(
        &self,
        user: &Self::UserInput,
        _ctx: &ExecutionContext,
    ) -> Result<Self::ContractInput, OpsError> {
        Ok(MintPayload {
            recipient: user.recipient.clone(),
            amount: scale_amount(&user.amount)?,
        })
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct TransferPayload {
    pub recipient: String,
    pub amount: String,
}

#[derive(Clone, Copy, Default)]
pub struct Transfer;

#[async_trait]
impl Instruction for Transfer {
    type UserInput = TokenTransferInput;
    type ContractInput = TransferPayload;

    fn spec(&self) -> InstructionSpec {
        InstructionSpec {
            category: "Token",
            kind: ContractKind::Cw20Base,
            function: "transfer",
            examples: &[
                "chainops cw20_base:transfer --network=<NETWORK> --to=<RECIPIENT> --amount=<AMOUNT> <CONTRACT_ADDRESS>",
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
        Ok(TokenTransferInput {
            recipient: flags
                .str("to")
                .or_else(|| flags.str("recipient"))
                .unwrap_or_default(),
            amount: flags.str("amount").unwrap_or_default(),
        })
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
        validate_transfer(name, user)
    }

    async fn make_contract_input(
        &self,
        user: &Self::UserInput,
        _ctx: &ExecutionContext,
    ) -> Result<Self::ContractInput, OpsError> {
        Ok(TransferPayload {
            recipient: user.recipient.clone(),
            amount: scale_amount(&user.amount)?,
        })
    }
}

fn validate_transfer(name: &str, user: &TokenTransferInput) -> Result<(), String> {
    match name {
        "validRecipient" => {
            if !is_valid_address(&user.recipient) {
                return Err(format!("invalid recipient address {}", user.recipient));
            }
            Ok(())
        }
        "validAmount" => {
            if user.amount.parse::<u128>().is_err() {
                return Err(format!("invalid input amount {}", user.amount));
            }
            Ok(())
        }
        other => Err(format!("unknown validator {}", other)),
    }
}
