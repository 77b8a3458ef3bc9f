//! chainops: operator CLI for CosmWasm contract management
//!
//! Compiles declarative contract instructions into runnable commands with a
//! fixed lifecycle (build, simulate, confirm, submit, postprocess), fans them
//! out over multiple contracts, routes them through cw3 multisig governance,
//! and checks deployed contract state against reference data.

pub mod addressbook;
pub mod chain;
pub mod cli;
pub mod commands;
pub mod config;
pub mod encoding;
pub mod error;
pub mod instruction;
pub mod multisig;
pub mod rdd;
pub mod registry;

pub use config::NetworkConfig;
pub use error::{OpsError, ValidationFailure};
pub use instruction::{Command, CommandEnv, CommandResult, Flags, Instruction};
