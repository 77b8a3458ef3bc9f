//! Command-line interface
//!
//! One positional command identifier, free-form `--key=value` instruction
//! flags, and positional contract addresses. Reserved flags (`--network`,
//! `--networksDir`, `--report`) are consumed here; everything else is passed
//! through to the command untouched.

use crate::chain::rpc::LcdClient;
use crate::commands;
use crate::config::NetworkConfig;
use crate::error::OpsError;
use crate::instruction::command::CommandResult;
use crate::instruction::context::CommandEnv;
use crate::instruction::flags::Flags;
use crate::instruction::report::ExecutionReport;
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;

pub const DEFAULT_NETWORKS_DIR: &str = "networks";

#[derive(Parser, Debug)]
#[command(
    name = "chainops",
    version,
    about = "Operator CLI for CosmWasm contract management",
    after_help = "Run `chainops help` for the command catalog."
)]
pub struct Cli {
    /// Command identifier, `<kind>:<function>[:batch][:multisig]`
    pub command: String,

    /// Instruction flags (`--key=value`) and positional contract addresses
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    pub rest: Vec<String>,
}

impl Cli {
    /// Split the free-form tail into flag pairs and positional arguments
    pub fn split_rest(&self) -> (Vec<String>, Vec<String>) {
        self.rest
            .iter()
            .cloned()
            .partition(|item| item.starts_with('-'))
    }
}

fn print_catalog() {
    println!("Available commands:\n");
    for spec in commands::known_commands() {
        println!("  {} ({})", spec.id(), spec.category);
        for example in spec.examples {
            println!("      {}", example);
        }
    }
    println!("\n  wallet:send (Wallet)");
    println!("  <kind>:upload / <kind>:deploy (Deployment)");
    println!("\nModifiers: append :batch to fan out over several targets,");
    println!(":multisig to route the transaction through cw3 governance.");
}

/// Run one command against an already-assembled environment. Used by the
/// binary and by the end-to-end tests, which inject a mock client here.
pub async fn execute(
    id: &str,
    env: &CommandEnv,
    flags: &Flags,
    args: &[String],
    report_path: Option<&PathBuf>,
) -> Result<CommandResult, OpsError> {
    let mut command = commands::make_command(id, env, flags, args)?;
    let result = command.execute().await?;
    if let Some(path) = report_path {
        ExecutionReport::new(id, &env.config, &result).write(path)?;
    }
    Ok(result)
}

/// Full entry point: parse argv, load the network config, build the chain
/// client and dispatch
pub async fn run(cli: Cli) -> Result<(), OpsError> {
    if cli.command == "help" {
        print_catalog();
        return Ok(());
    }
    if let Some(kind) = cli.command.strip_suffix(":help") {
        println!("Commands for {}:\n", kind);
        for spec in commands::known_commands() {
            if spec.kind.id() == kind {
                println!("  {} ({})", spec.id(), spec.category);
                for example in spec.examples {
                    println!("      {}", example);
                }
            }
        }
        return Ok(());
    }

    let (pairs, args) = cli.split_rest();
    let mut flags = Flags::from_pairs(&pairs)?;

    let network = flags.str("network").ok_or_else(|| {
        OpsError::Configuration("--network flag is required".into())
    })?;
    let networks_dir = flags
        .str("networksDir")
        .unwrap_or_else(|| DEFAULT_NETWORKS_DIR.to_string());
    let report_path = flags.str("report").map(PathBuf::from);
    flags.remove("network");
    flags.remove("networksDir");
    flags.remove("report");

    let config = NetworkConfig::load(&PathBuf::from(networks_dir), &network)?;
    log::info!(
        "Operator {} on {} ({})",
        config.signer,
        config.name,
        config.chain_id
    );

    let client = LcdClient::new(&config)?;
    let env = CommandEnv::new(Arc::new(client), config);

    let result = execute(&cli.command, &env, &flags, &args, report_path.as_ref()).await?;
    if let Some(tx) = &result.tx {
        log::info!("Done. Tx hash: {}", tx.tx_hash);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rest_splits_flags_from_targets() {
        let cli = Cli::parse_from([
            "chainops",
            "cw20_base:mint",
            "--network=testnet",
            "--amount=10",
            "wasm1token0",
            "wasm1token1",
        ]);
        assert_eq!(cli.command, "cw20_base:mint");
        let (pairs, args) = cli.split_rest();
        assert_eq!(pairs, vec!["--network=testnet", "--amount=10"]);
        assert_eq!(args, vec!["wasm1token0", "wasm1token1"]);
    }

    #[test]
    fn test_flags_after_targets_still_collected() {
        let cli = Cli::parse_from(["chainops", "ocr2:inspect", "wasm1agg", "--network=local"]);
        let (pairs, args) = cli.split_rest();
        assert_eq!(pairs, vec!["--network=local"]);
        assert_eq!(args, vec!["wasm1agg"]);
    }
}
