//! Native token wallet commands
//!
//! `wallet:send` is written against the command protocol directly rather
//! than through the instruction compiler: it produces a bank message, not a
//! contract execution, so there is no contract input to map.

use crate::chain::address::is_valid_address;
use crate::chain::client::TxResult;
use crate::chain::msg::{Coin, CosmosMsg};
use crate::error::OpsError;
use crate::instruction::command::{confirm, Command, CommandResult};
use crate::instruction::context::CommandEnv;
use crate::instruction::flags::Flags;
use async_trait::async_trait;
use serde_json::Value;

/// The native denom tracks 6 decimal places
pub const NATIVE_DECIMALS: u32 = 6;

fn scale_native(amount: &str) -> Result<String, OpsError> {
    let tokens: u128 = amount
        .parse()
        .map_err(|_| OpsError::Configuration(format!("invalid native amount {}", amount)))?;
    let scaled = tokens
        .checked_mul(10u128.pow(NATIVE_DECIMALS))
        .ok_or_else(|| OpsError::Configuration(format!("native amount {} overflows", amount)))?;
    Ok(scaled.to_string())
}

pub struct WalletSend {
    env: CommandEnv,
    flags: Flags,
    built: Option<(String, Coin)>,
}

impl WalletSend {
    pub fn new(env: CommandEnv, flags: Flags, _args: Vec<String>) -> Self {
        Self {
            env,
            flags,
            built: None,
        }
    }

    fn built(&self) -> Result<&(String, Coin), OpsError> {
        self.built
            .as_ref()
            .ok_or_else(|| OpsError::Configuration("command has not been built".into()))
    }
}

#[async_trait]
impl Command for WalletSend {
    fn id(&self) -> String {
        "wallet:send".to_string()
    }

    async fn build(&mut self) -> Result<(), OpsError> {
        let destination = self
            .flags
            .str("to")
            .ok_or_else(|| OpsError::Configuration("--to flag is required".into()))?;
        if !is_valid_address(&destination) {
            return Err(OpsError::Configuration(format!(
                "invalid destination address {}",
                destination
            )));
        }
        let amount = self
            .flags
            .str("amount")
            .ok_or_else(|| OpsError::Configuration("--amount flag is required".into()))?;
        let coin = Coin::new(self.env.config.denom.clone(), scale_native(&amount)?);
        self.built = Some((destination, coin));
        Ok(())
    }

    async fn raw_messages(&self, sender: &str) -> Result<Vec<CosmosMsg>, OpsError> {
        let (destination, coin) = self.built()?;
        Ok(vec![CosmosMsg::bank_send(
            sender,
            destination.clone(),
            vec![coin.clone()],
        )])
    }

    async fn before_execute(&self, signer: &str) -> Result<(), OpsError> {
        let (destination, coin) = self.built()?;
        println!(
            "Sending {}{} from {} to {}",
            coin.amount,
            coin.denom,
            self.env.style(signer),
            self.env.style(destination),
        );
        Ok(())
    }

    async fn after_execute(&self, _response: &TxResult) -> Result<Option<Value>, OpsError> {
        Ok(None)
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

        let destination = self.built()?.0.clone();
        Ok(CommandResult {
            tx: Some(response),
            contract: destination,
            data: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::mock::MockClient;
    use crate::config::NetworkConfig;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_send_builds_scaled_bank_message() {
        let client = Arc::new(MockClient::new());
        let env = CommandEnv::new(client.clone(), NetworkConfig::local("wasm1operator"));
        let flags = Flags::from_pairs(&[
            "--to=wasm1hft9sxhx7d7furw9y0rjxu4hfsm76ehkman78g",
            "--amount=25",
            "--yes",
        ])
        .unwrap();

        let mut command = WalletSend::new(env, flags, Vec::new());
        command.execute().await.unwrap();

        let broadcasts = client.broadcasts();
        assert_eq!(broadcasts.len(), 1);
        match &broadcasts[0].1[0] {
            CosmosMsg::BankSend {
                from_address,
                to_address,
                amount,
            } => {
                assert_eq!(from_address, "wasm1operator");
                assert_eq!(to_address, "wasm1hft9sxhx7d7furw9y0rjxu4hfsm76ehkman78g");
                assert_eq!(amount[0], Coin::new("ucosm", "25000000"));
            }
            other => panic!("unexpected message {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_send_requires_valid_destination() {
        let env = CommandEnv::new(
            Arc::new(MockClient::new()),
            NetworkConfig::local("wasm1operator"),
        );
        let flags = Flags::from_pairs(&["--to=oops", "--amount=1"]).unwrap();
        let mut command = WalletSend::new(env, flags, Vec::new());
        assert!(command.build().await.is_err());
    }
}
