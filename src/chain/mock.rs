//! Mock chain client
//!
//! Canned query responses, recorded broadcasts, and scriptable simulation
//! failures. Used by unit tests and by the end-to-end scenarios; lives in
//! the crate (not behind `cfg(test)`) so integration tests can drive it.

use crate::chain::client::{ChainClient, ContractInfo, Event, Instantiated, TxResult};
use crate::chain::msg::{canonical_json, CosmosMsg};
use crate::error::ChainError;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Mutex;

#[derive(Default)]
struct MockState {
    /// Keyed by `contract|canonical-query`
    queries: HashMap<String, Value>,
    contract_infos: HashMap<String, ContractInfo>,
    broadcasts: Vec<(String, Vec<CosmosMsg>)>,
    tx_results: Vec<TxResult>,
    simulate_failure: Option<String>,
    broadcast_failure: Option<String>,
    next_code_id: u64,
    uploads: Vec<usize>,
}

/// In-memory `ChainClient` for tests and offline rehearsal
#[derive(Default)]
pub struct MockClient {
    state: Mutex<MockState>,
}

impl MockClient {
    pub fn new() -> Self {
        Self::default()
    }

    fn query_key(contract: &str, msg: &Value) -> String {
        format!("{}|{}", contract, canonical_json(msg))
    }

    /// Register a canned response for a smart query
    pub fn stub_query(&self, contract: &str, msg: Value, response: Value) {
        let mut state = self.state.lock().unwrap();
        state.queries.insert(Self::query_key(contract, &msg), response);
    }

    pub fn stub_contract_info(&self, contract: &str, info: ContractInfo) {
        let mut state = self.state.lock().unwrap();
        state.contract_infos.insert(contract.to_string(), info);
    }

    /// Queue a transaction result; consumed in order by broadcasts
    pub fn push_tx_result(&self, result: TxResult) {
        self.state.lock().unwrap().tx_results.push(result);
    }

    /// Make every simulation fail with the given chain error
    pub fn fail_simulation(&self, reason: &str) {
        self.state.lock().unwrap().simulate_failure = Some(reason.to_string());
    }

    /// Make every broadcast fail with the given chain error
    pub fn fail_broadcast(&self, reason: &str) {
        self.state.lock().unwrap().broadcast_failure = Some(reason.to_string());
    }

    /// Broadcasts recorded so far, in submission order
    pub fn broadcasts(&self) -> Vec<(String, Vec<CosmosMsg>)> {
        self.state.lock().unwrap().broadcasts.clone()
    }

    pub fn broadcast_count(&self) -> usize {
        self.state.lock().unwrap().broadcasts.len()
    }

    /// Sizes of the wasm blobs stored so far, in upload order
    pub fn uploads(&self) -> Vec<usize> {
        self.state.lock().unwrap().uploads.clone()
    }

    fn default_tx_result() -> TxResult {
        TxResult {
            tx_hash: "MOCKTX".to_string(),
            height: 1,
            gas_used: 50_000,
            events: vec![Event::new("wasm")],
        }
    }
}

#[async_trait]
impl ChainClient for MockClient {
    async fn query(&self, contract: &str, msg: &Value) -> Result<Value, ChainError> {
        let state = self.state.lock().unwrap();
        state
            .queries
            .get(&Self::query_key(contract, msg))
            .cloned()
            .ok_or_else(|| {
                ChainError::new(format!(
                    "no stubbed response for query {} on {}",
                    canonical_json(msg),
                    contract
                ))
            })
    }

    async fn contract_info(&self, contract: &str) -> Result<ContractInfo, ChainError> {
        let state = self.state.lock().unwrap();
        state
            .contract_infos
            .get(contract)
            .cloned()
            .ok_or_else(|| ChainError::new(format!("no contract info for {}", contract)))
    }

    async fn simulate(&self, _sender: &str, msgs: &[CosmosMsg]) -> Result<u64, ChainError> {
        let state = self.state.lock().unwrap();
        if let Some(reason) = &state.simulate_failure {
            return Err(ChainError::new(reason.clone()));
        }
        // deterministic estimate scaled by message count
        Ok(40_000 * msgs.len() as u64)
    }

    async fn sign_and_broadcast(
        &self,
        sender: &str,
        msgs: &[CosmosMsg],
    ) -> Result<TxResult, ChainError> {
        let mut state = self.state.lock().unwrap();
        if let Some(reason) = &state.broadcast_failure {
            return Err(ChainError::new(reason.clone()));
        }
        state.broadcasts.push((sender.to_string(), msgs.to_vec()));
        if state.tx_results.is_empty() {
            Ok(Self::default_tx_result())
        } else {
            Ok(state.tx_results.remove(0))
        }
    }

    async fn upload(&self, _sender: &str, wasm: &[u8]) -> Result<u64, ChainError> {
        let mut state = self.state.lock().unwrap();
        state.next_code_id += 1;
        state.uploads.push(wasm.len());
        Ok(state.next_code_id)
    }

    async fn instantiate(
        &self,
        _sender: &str,
        code_id: u64,
        label: &str,
        _msg: &Value,
    ) -> Result<Instantiated, ChainError> {
        Ok(Instantiated {
            address: format!("wasm1contract{}{}", code_id, label.len()),
            tx_hash: "MOCKTX".to_string(),
        })
    }
}
