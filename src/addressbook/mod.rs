//! Address label cache
//!
//! Process-wide registry mapping known addresses to human labels for
//! pretty-printing. Keyed by chain id, populated lazily once per chain id,
//! append-only afterwards: entries are never removed or overwritten
//! mid-process, so read-mostly access under an `RwLock` is safe.

use crate::chain::address::abbreviate;
use crate::config::NetworkConfig;
use std::collections::HashMap;
use std::sync::RwLock;

#[derive(Default)]
pub struct AddressBook {
    /// chain id -> (address -> label)
    labels: RwLock<HashMap<String, HashMap<String, String>>>,
}

impl AddressBook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed labels for a chain id from the network config. First writer per
    /// chain id wins; later calls for the same chain id are no-ops.
    pub fn populate(&self, config: &NetworkConfig) {
        let mut labels = self.labels.write().unwrap();
        if labels.contains_key(&config.chain_id) {
            return;
        }
        let mut entries = HashMap::new();
        entries.insert(config.signer.clone(), "operator".to_string());
        if let Some(multisig) = &config.multisig {
            entries.insert(multisig.clone(), "multisig".to_string());
        }
        if let Some(group) = &config.group {
            entries.insert(group.clone(), "multisig-group".to_string());
        }
        labels.insert(config.chain_id.clone(), entries);
    }

    /// Add a label; existing entries are kept (append-only)
    pub fn insert(&self, chain_id: &str, address: &str, label: &str) {
        let mut labels = self.labels.write().unwrap();
        labels
            .entry(chain_id.to_string())
            .or_default()
            .entry(address.to_string())
            .or_insert_with(|| label.to_string());
    }

    pub fn label(&self, chain_id: &str, address: &str) -> Option<String> {
        let labels = self.labels.read().unwrap();
        labels.get(chain_id)?.get(address).cloned()
    }

    /// Render an address for operator output, attaching its label if known
    pub fn style(&self, chain_id: &str, address: &str) -> String {
        match self.label(chain_id, address) {
            Some(label) => format!("{} ({})", abbreviate(address), label),
            None => address.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_populate_once_per_chain_id() {
        let book = AddressBook::new();
        let mut config = NetworkConfig::local("wasm1operatorxxxxxxxxxxxxxxxxxxxxxxxxxxx");
        config.multisig = Some("wasm1multisigxxxxxxxxxxxxxxxxxxxxxxxxxxx".to_string());
        book.populate(&config);

        assert_eq!(
            book.label(&config.chain_id, &config.signer).as_deref(),
            Some("operator")
        );

        // second populate with different data must not overwrite
        config.signer = "wasm1otherxxxxxxxxxxxxxxxxxxxxxxxxxxxxxx".to_string();
        book.populate(&config);
        assert_eq!(book.label(&config.chain_id, &config.signer), None);
    }

    #[test]
    fn test_insert_is_append_only() {
        let book = AddressBook::new();
        book.insert("chain-1", "wasm1abc", "first");
        book.insert("chain-1", "wasm1abc", "second");
        assert_eq!(book.label("chain-1", "wasm1abc").as_deref(), Some("first"));
    }

    #[test]
    fn test_style_falls_back_to_plain_address() {
        let book = AddressBook::new();
        assert_eq!(book.style("chain-1", "wasm1unknown"), "wasm1unknown");
    }
}
