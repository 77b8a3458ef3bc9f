//! Execution context
//!
//! `CommandEnv` is the long-lived environment assembled once at startup
//! (chain client, network config, address book). `ExecutionContext` is the
//! short-lived per-build view handed to instruction hooks; it lives for one
//! `execute()` call.

use crate::addressbook::AddressBook;
use crate::chain::client::ChainClient;
use crate::config::NetworkConfig;
use crate::instruction::flags::Flags;
use std::sync::Arc;

/// Shared environment threaded into every command
#[derive(Clone)]
pub struct CommandEnv {
    pub client: Arc<dyn ChainClient>,
    pub config: NetworkConfig,
    pub address_book: Arc<AddressBook>,
}

impl CommandEnv {
    pub fn new(client: Arc<dyn ChainClient>, config: NetworkConfig) -> Self {
        let address_book = Arc::new(AddressBook::new());
        address_book.populate(&config);
        Self {
            client,
            config,
            address_book,
        }
    }

    /// Pretty-print an address with its label when known
    pub fn style(&self, address: &str) -> String {
        self.address_book.style(&self.config.chain_id, address)
    }
}

/// Per-build context; created in `build`, dropped when `execute` returns
#[derive(Clone)]
pub struct ExecutionContext {
    /// Command identifier, `<kind>:<function>`
    pub id: String,
    /// Target contract address
    pub contract: String,
    /// Signer account address
    pub signer: String,
    pub env: CommandEnv,
    pub flags: Flags,
}

impl ExecutionContext {
    pub fn client(&self) -> &dyn ChainClient {
        self.env.client.as_ref()
    }

    pub fn style(&self, address: &str) -> String {
        self.env.style(address)
    }
}
