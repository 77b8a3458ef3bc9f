//! LCD (REST) chain client
//!
//! Straightforward I/O plumbing against a Cosmos LCD endpoint. Wire-level
//! details stay in here; the rest of the crate only sees the `ChainClient`
//! trait.

use crate::chain::client::{Attribute, ChainClient, ContractInfo, Event, Instantiated, TxResult};
use crate::chain::msg::{canonical_json, CosmosMsg};
use crate::chain::signer::LocalSigner;
use crate::config::NetworkConfig;
use crate::error::ChainError;
use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde_json::{json, Value};

/// Chain client over a Cosmos LCD endpoint
pub struct LcdClient {
    http: reqwest::Client,
    node_url: String,
    chain_id: String,
    denom: String,
    gas_price: f64,
    signer: Option<LocalSigner>,
}

impl LcdClient {
    pub fn new(config: &NetworkConfig) -> Result<Self, ChainError> {
        let signer = match &config.signing_key_file {
            Some(path) => Some(
                LocalSigner::from_key_file(path)
                    .map_err(|e| ChainError::new(e.to_string()))?,
            ),
            None => None,
        };
        Ok(Self {
            http: reqwest::Client::new(),
            node_url: config.node_url.trim_end_matches('/').to_string(),
            chain_id: config.chain_id.clone(),
            denom: config.denom.clone(),
            gas_price: config.default_gas_price,
            signer,
        })
    }

    async fn get(&self, path: &str) -> Result<Value, ChainError> {
        let url = format!("{}{}", self.node_url, path);
        let response = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| ChainError::new(format!("GET {}: {}", url, e)))?;
        let status = response.status();
        let body: Value = response
            .json()
            .await
            .map_err(|e| ChainError::new(format!("GET {}: invalid JSON: {}", url, e)))?;
        if !status.is_success() {
            let message = body["message"].as_str().unwrap_or("unknown error");
            return Err(ChainError::new(format!("{}: {}", status, message)));
        }
        Ok(body)
    }

    async fn post(&self, path: &str, body: &Value) -> Result<Value, ChainError> {
        let url = format!("{}{}", self.node_url, path);
        let response = self
            .http
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(|e| ChainError::new(format!("POST {}: {}", url, e)))?;
        let status = response.status();
        let body: Value = response
            .json()
            .await
            .map_err(|e| ChainError::new(format!("POST {}: invalid JSON: {}", url, e)))?;
        if !status.is_success() {
            let message = body["message"].as_str().unwrap_or("unknown error");
            return Err(ChainError::new(format!("{}: {}", status, message)));
        }
        Ok(body)
    }

    /// JSON sign-doc covering the message list; signed as a single unit
    fn sign_doc(&self, sender: &str, msgs: &[CosmosMsg]) -> Result<Value, ChainError> {
        Ok(json!({
            "chain_id": self.chain_id,
            "sender": sender,
            "msgs": serde_json::to_value(msgs)?,
            "fee": { "denom": self.denom, "gas_price": self.gas_price },
        }))
    }

    fn tx_body(&self, sender: &str, msgs: &[CosmosMsg]) -> Result<Value, ChainError> {
        let doc = self.sign_doc(sender, msgs)?;
        let payload = canonical_json(&doc);
        let signature = match &self.signer {
            Some(signer) => {
                let sig = signer
                    .sign(payload.as_bytes())
                    .map_err(|e| ChainError::new(e.to_string()))?;
                hex::encode(sig)
            }
            None => {
                return Err(ChainError::new(
                    "no signing key configured (set signing_key_file in the network config)",
                ))
            }
        };
        Ok(json!({
            "tx_bytes": BASE64.encode(payload),
            "signature": signature,
            "mode": "BROADCAST_MODE_SYNC",
        }))
    }

    fn parse_events(raw: &Value) -> Vec<Event> {
        raw.as_array()
            .map(|events| {
                events
                    .iter()
                    .map(|e| Event {
                        kind: e["type"].as_str().unwrap_or_default().to_string(),
                        attributes: e["attributes"]
                            .as_array()
                            .map(|attrs| {
                                attrs
                                    .iter()
                                    .map(|a| Attribute {
                                        key: a["key"].as_str().unwrap_or_default().to_string(),
                                        value: a["value"]
                                            .as_str()
                                            .unwrap_or_default()
                                            .to_string(),
                                    })
                                    .collect()
                            })
                            .unwrap_or_default(),
                    })
                    .collect()
            })
            .unwrap_or_default()
    }

    fn parse_tx_response(body: &Value) -> Result<TxResult, ChainError> {
        let response = &body["tx_response"];
        let code = response["code"].as_u64().unwrap_or(0);
        if code != 0 {
            return Err(ChainError::new(format!(
                "transaction failed with code {}: {}",
                code,
                response["raw_log"].as_str().unwrap_or("no log")
            )));
        }
        Ok(TxResult {
            tx_hash: response["txhash"].as_str().unwrap_or_default().to_string(),
            height: response["height"]
                .as_str()
                .and_then(|h| h.parse().ok())
                .or_else(|| response["height"].as_u64())
                .unwrap_or(0),
            gas_used: response["gas_used"]
                .as_str()
                .and_then(|g| g.parse().ok())
                .or_else(|| response["gas_used"].as_u64())
                .unwrap_or(0),
            events: Self::parse_events(&response["events"]),
        })
    }
}

#[async_trait]
impl ChainClient for LcdClient {
    async fn query(&self, contract: &str, msg: &Value) -> Result<Value, ChainError> {
        let encoded = BASE64.encode(canonical_json(msg));
        let body = self
            .get(&format!(
                "/cosmwasm/wasm/v1/contract/{}/smart/{}",
                contract, encoded
            ))
            .await?;
        Ok(body["data"].clone())
    }

    async fn contract_info(&self, contract: &str) -> Result<ContractInfo, ChainError> {
        let body = self
            .get(&format!("/cosmwasm/wasm/v1/contract/{}", contract))
            .await?;
        let info = &body["contract_info"];
        Ok(ContractInfo {
            address: contract.to_string(),
            code_id: info["code_id"]
                .as_str()
                .and_then(|c| c.parse().ok())
                .or_else(|| info["code_id"].as_u64())
                .unwrap_or(0),
            label: info["label"].as_str().unwrap_or_default().to_string(),
            init_msg: info["init_msg"].clone(),
        })
    }

    async fn simulate(&self, sender: &str, msgs: &[CosmosMsg]) -> Result<u64, ChainError> {
        let doc = self.sign_doc(sender, msgs)?;
        let body = self
            .post(
                "/cosmos/tx/v1beta1/simulate",
                &json!({ "tx_bytes": BASE64.encode(canonical_json(&doc)) }),
            )
            .await?;
        body["gas_info"]["gas_used"]
            .as_str()
            .and_then(|g| g.parse().ok())
            .or_else(|| body["gas_info"]["gas_used"].as_u64())
            .ok_or_else(|| ChainError::new("simulate: missing gas_info in response"))
    }

    async fn sign_and_broadcast(
        &self,
        sender: &str,
        msgs: &[CosmosMsg],
    ) -> Result<TxResult, ChainError> {
        let body = self.tx_body(sender, msgs)?;
        let response = self.post("/cosmos/tx/v1beta1/txs", &body).await?;
        Self::parse_tx_response(&response)
    }

    async fn upload(&self, sender: &str, wasm: &[u8]) -> Result<u64, ChainError> {
        let body = self
            .post(
                "/cosmwasm/wasm/v1/code",
                &json!({ "sender": sender, "wasm_byte_code": BASE64.encode(wasm) }),
            )
            .await?;
        let result = Self::parse_tx_response(&body)?;
        result
            .event_attribute("store_code", "code_id")
            .and_then(|id| id.parse().ok())
            .ok_or_else(|| ChainError::new("upload: no code_id in store_code event"))
    }

    async fn instantiate(
        &self,
        sender: &str,
        code_id: u64,
        label: &str,
        msg: &Value,
    ) -> Result<Instantiated, ChainError> {
        let body = self
            .post(
                "/cosmwasm/wasm/v1/instantiate",
                &json!({
                    "sender": sender,
                    "code_id": code_id.to_string(),
                    "label": label,
                    "msg": msg,
                }),
            )
            .await?;
        let result = Self::parse_tx_response(&body)?;
        let address = result
            .event_attribute("instantiate", "_contract_address")
            .ok_or_else(|| ChainError::new("instantiate: no contract address in events"))?
            .to_string();
        Ok(Instantiated {
            address,
            tx_hash: result.tx_hash,
        })
    }
}
