//! Chain client interface
//!
//! Narrow boundary to the wire-level blockchain client. Everything the rest
//! of the crate needs from the chain goes through this trait: read-only
//! queries, gas simulation, and transaction broadcast. Signing lives behind
//! the implementation.

use crate::chain::msg::CosmosMsg;
use crate::error::ChainError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A single event attribute emitted by the chain
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Attribute {
    pub key: String,
    pub value: String,
}

/// An event emitted during transaction execution
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Event {
    /// Event type, e.g. `wasm` or `wasm-set_config`
    pub kind: String,
    pub attributes: Vec<Attribute>,
}

impl Event {
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            attributes: Vec::new(),
        }
    }

    pub fn attr(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.push(Attribute {
            key: key.into(),
            value: value.into(),
        });
        self
    }

    /// First attribute value with the given key
    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|a| a.key == key)
            .map(|a| a.value.as_str())
    }

    /// All attribute values with the given key, in emission order
    pub fn attributes(&self, key: &str) -> Vec<&str> {
        self.attributes
            .iter()
            .filter(|a| a.key == key)
            .map(|a| a.value.as_str())
            .collect()
    }
}

/// Result of a broadcast transaction
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TxResult {
    pub tx_hash: String,
    pub height: u64,
    pub gas_used: u64,
    pub events: Vec<Event>,
}

impl TxResult {
    /// First event of the given kind
    pub fn event(&self, kind: &str) -> Option<&Event> {
        self.events.iter().find(|e| e.kind == kind)
    }

    /// First value of `key` within the first event of `kind`
    pub fn event_attribute(&self, kind: &str, key: &str) -> Option<&str> {
        self.event(kind).and_then(|e| e.attribute(key))
    }
}

/// Result of contract instantiation
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Instantiated {
    pub address: String,
    pub tx_hash: String,
}

/// On-chain metadata for a deployed contract
#[derive(Clone, Debug, Serialize, Deserialize, Default)]
pub struct ContractInfo {
    pub address: String,
    pub code_id: u64,
    pub label: String,
    /// Message the contract was instantiated with
    pub init_msg: Value,
}

/// The chain client boundary
#[async_trait]
pub trait ChainClient: Send + Sync {
    /// Smart-query a contract; read-only
    async fn query(&self, contract: &str, msg: &Value) -> Result<Value, ChainError>;

    /// Fetch contract metadata, including its instantiate message
    async fn contract_info(&self, contract: &str) -> Result<ContractInfo, ChainError>;

    /// Dry-run the messages and return the estimated gas. Never mutates state.
    async fn simulate(&self, sender: &str, msgs: &[CosmosMsg]) -> Result<u64, ChainError>;

    /// Sign and broadcast the messages as a single transaction
    async fn sign_and_broadcast(
        &self,
        sender: &str,
        msgs: &[CosmosMsg],
    ) -> Result<TxResult, ChainError>;

    /// Store a wasm blob on chain, returning its code id
    async fn upload(&self, sender: &str, wasm: &[u8]) -> Result<u64, ChainError>;

    /// Instantiate a stored code id into a new contract
    async fn instantiate(
        &self,
        sender: &str,
        code_id: u64,
        label: &str,
        msg: &Value,
    ) -> Result<Instantiated, ChainError>;
}
