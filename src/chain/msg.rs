//! Transaction message types
//!
//! `CosmosMsg` is the raw form a command builds; `Cw3Msg` is the normalized
//! form a cw3 multisig contract stores inside a proposal. The multisig
//! mismatch guard compares proposals in the normalized form, so normalization
//! must be deterministic: JSON payloads are canonicalized (sorted keys)
//! before base64 encoding.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A coin amount; `amount` is a decimal string as the chain represents it
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Coin {
    pub denom: String,
    pub amount: String,
}

impl Coin {
    pub fn new(denom: impl Into<String>, amount: impl Into<String>) -> Self {
        Self {
            denom: denom.into(),
            amount: amount.into(),
        }
    }
}

/// A raw message as built by a command, before signing
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CosmosMsg {
    ExecuteContract {
        sender: String,
        contract: String,
        msg: Value,
        funds: Vec<Coin>,
    },
    BankSend {
        from_address: String,
        to_address: String,
        amount: Vec<Coin>,
    },
}

impl CosmosMsg {
    pub fn execute(sender: impl Into<String>, contract: impl Into<String>, msg: Value) -> Self {
        CosmosMsg::ExecuteContract {
            sender: sender.into(),
            contract: contract.into(),
            msg,
            funds: Vec::new(),
        }
    }

    pub fn bank_send(
        from: impl Into<String>,
        to: impl Into<String>,
        amount: Vec<Coin>,
    ) -> Self {
        CosmosMsg::BankSend {
            from_address: from.into(),
            to_address: to.into(),
            amount,
        }
    }

    /// Normalize into the representation a cw3 proposal stores
    pub fn to_cw3(&self) -> Cw3Msg {
        match self {
            CosmosMsg::ExecuteContract {
                contract,
                msg,
                funds,
                ..
            } => Cw3Msg::Wasm(WasmMsg::Execute {
                contract_addr: contract.clone(),
                msg: BASE64.encode(canonical_json(msg)),
                funds: funds.clone(),
            }),
            CosmosMsg::BankSend {
                to_address, amount, ..
            } => Cw3Msg::Bank(BankMsg::Send {
                to_address: to_address.clone(),
                amount: amount.clone(),
            }),
        }
    }
}

/// Normalize a full message list; order is preserved
pub fn to_cw3_msgs(msgs: &[CosmosMsg]) -> Vec<Cw3Msg> {
    msgs.iter().map(CosmosMsg::to_cw3).collect()
}

/// A message in the form a cw3 multisig proposal stores it
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Cw3Msg {
    Wasm(WasmMsg),
    Bank(BankMsg),
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum WasmMsg {
    Execute {
        contract_addr: String,
        /// base64-encoded canonical JSON payload
        msg: String,
        funds: Vec<Coin>,
    },
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum BankMsg {
    Send {
        to_address: String,
        amount: Vec<Coin>,
    },
}

impl Cw3Msg {
    /// Decode the wasm payload back into JSON, if this is a wasm execute
    pub fn decode_wasm_payload(&self) -> Option<Value> {
        match self {
            Cw3Msg::Wasm(WasmMsg::Execute { msg, .. }) => BASE64
                .decode(msg)
                .ok()
                .and_then(|raw| serde_json::from_slice(&raw).ok()),
            Cw3Msg::Bank(_) => None,
        }
    }
}

/// Serialize a JSON value with object keys in sorted order.
///
/// `serde_json::Value` maps are BTree-backed, so re-parsing and serializing
/// any value yields sorted keys. This keeps the base64 payloads stable across
/// rebuilds of the same logical message.
pub fn canonical_json(value: &Value) -> String {
    // Maps are already sorted; serialization is deterministic.
    value.to_string()
}
