//! Chain client boundary
//!
//! The wire-level blockchain client is an external collaborator: this module
//! defines the narrow interface the rest of the crate consumes, the message
//! types that cross it, and two implementations (a REST client and a mock
//! for tests and offline rehearsal).

pub mod address;
pub mod client;
pub mod mock;
pub mod msg;
pub mod rpc;
pub mod signer;

pub use address::is_valid_address;
pub use client::{ChainClient, ContractInfo, Event, Instantiated, TxResult};
pub use mock::MockClient;
pub use msg::{BankMsg, Coin, CosmosMsg, Cw3Msg, WasmMsg};
pub use rpc::LcdClient;
