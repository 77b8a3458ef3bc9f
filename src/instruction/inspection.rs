//! Inspection compiler
//!
//! Wraps a set of read-only queries into a single comparison command:
//! on-chain state versus an expectation built from flags or an RDD file.
//! Inspection commands never produce a transaction; the verdict is exactly
//! the result of the comparison.

use crate::chain::client::TxResult;
use crate::chain::msg::CosmosMsg;
use crate::error::OpsError;
use crate::instruction::command::{Command, CommandResult};
use crate::instruction::context::CommandEnv;
use crate::instruction::definition::InstructionSpec;
use crate::instruction::flags::Flags;
use async_trait::async_trait;
use futures::future::try_join_all;
use serde::Serialize;
use serde_json::Value;

/// One field-level comparison
#[derive(Clone, Debug, Serialize)]
pub struct DiffEntry {
    pub field: String,
    pub expected: Value,
    pub onchain: Value,
    pub matches: bool,
}

/// Pass/fail verdict plus the per-field diff
#[derive(Clone, Debug, Default, Serialize)]
pub struct Inspection {
    pub pass: bool,
    pub diffs: Vec<DiffEntry>,
}

impl Inspection {
    pub fn new() -> Self {
        Self {
            pass: true,
            diffs: Vec::new(),
        }
    }

    /// Compare one field; any mismatch flips the verdict to fail
    pub fn check<E: Serialize, O: Serialize>(&mut self, field: &str, expected: E, onchain: O) {
        let expected = serde_json::to_value(expected).unwrap_or(Value::Null);
        let onchain = serde_json::to_value(onchain).unwrap_or(Value::Null);
        let matches = expected == onchain;
        self.pass &= matches;
        self.diffs.push(DiffEntry {
            field: field.to_string(),
            expected,
            onchain,
            matches,
        });
    }

    fn print(&self) {
        for entry in &self.diffs {
            if entry.matches {
                println!("  {} {}", console::style("✔").green(), entry.field);
            } else {
                println!(
                    "  {} {}: expected {}, onchain {}",
                    console::style("✘").red(),
                    entry.field,
                    entry.expected,
                    entry.onchain
                );
            }
        }
        if self.pass {
            println!("{}", console::style("Inspection passed").green().bold());
        } else {
            println!("{}", console::style("Inspection failed").red().bold());
        }
    }
}

/// A read-only comparison over one contract
#[async_trait]
pub trait InspectInstruction: Send + Sync + 'static {
    type Expected: Serialize + Send + Sync;
    type Onchain: Serialize + Send + Sync;

    fn spec(&self) -> InstructionSpec;

    /// Query messages to run against the target contract, all read-only
    fn queries(&self) -> Vec<Value>;

    /// Expectation from user input (flags or RDD file)
    async fn make_expected(
        &self,
        flags: &Flags,
        args: &[String],
        env: &CommandEnv,
    ) -> Result<Self::Expected, OpsError>;

    /// Assemble the query results, in `queries()` order, into one record
    fn make_onchain(&self, results: &[Value]) -> Result<Self::Onchain, OpsError>;

    fn inspect(&self, expected: &Self::Expected, onchain: &Self::Onchain) -> Inspection;
}

/// Compiled inspection command; implements the command protocol but can
/// never submit
pub struct InspectionCommand<I: InspectInstruction> {
    instruction: I,
    env: CommandEnv,
    flags: Flags,
    args: Vec<String>,
}

impl<I: InspectInstruction> InspectionCommand<I> {
    pub fn new(instruction: I, env: CommandEnv, flags: Flags, args: Vec<String>) -> Self {
        Self {
            instruction,
            env,
            flags,
            args,
        }
    }
}

#[async_trait]
impl<I: InspectInstruction> Command for InspectionCommand<I> {
    fn id(&self) -> String {
        self.instruction.spec().id()
    }

    async fn build(&mut self) -> Result<(), OpsError> {
        Ok(())
    }

    async fn raw_messages(&self, _sender: &str) -> Result<Vec<CosmosMsg>, OpsError> {
        Err(OpsError::UnsupportedOperation(format!(
            "{} is read-only and does not produce a transaction",
            self.id()
        )))
    }

    async fn before_execute(&self, _signer: &str) -> Result<(), OpsError> {
        Ok(())
    }

    async fn after_execute(&self, _response: &TxResult) -> Result<Option<Value>, OpsError> {
        Ok(None)
    }

    async fn execute(&mut self) -> Result<CommandResult, OpsError> {
        let contract = self.args.first().cloned().ok_or_else(|| {
            OpsError::Configuration(format!("{}: target contract address required", self.id()))
        })?;

        let expected = self
            .instruction
            .make_expected(&self.flags, &self.args, &self.env)
            .await?;

        log::info!("Fetching contract information...");
        let queries = self.instruction.queries();
        let results = try_join_all(
            queries
                .iter()
                .map(|query| self.env.client.query(&contract, query)),
        )
        .await?;

        let onchain = self.instruction.make_onchain(&results)?;
        let inspection = self.instruction.inspect(&expected, &onchain);
        inspection.print();

        Ok(CommandResult {
            tx: None,
            contract,
            data: Some(serde_json::json!({
                "pass": inspection.pass,
                "expected": serde_json::to_value(&expected)?,
                "onchain": serde_json::to_value(&onchain)?,
                "diff": serde_json::to_value(&inspection.diffs)?,
            })),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verdict_reflects_comparison() {
        let mut inspection = Inspection::new();
        inspection.check("f", 1, 1);
        inspection.check("transmitters", vec!["a", "b"], vec!["a", "b"]);
        assert!(inspection.pass);

        inspection.check("payees", vec!["x"], vec!["y"]);
        assert!(!inspection.pass);
        assert_eq!(inspection.diffs.len(), 3);
        assert!(!inspection.diffs[2].matches);
    }
}
