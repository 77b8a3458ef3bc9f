//! Error taxonomy for the operator CLI
//!
//! Every error kind an operator can hit maps to one variant here. Recoverable
//! kinds (configuration, validation, simulation) mean "fix the input and run
//! again"; submission errors are terminal for the invocation because an
//! on-chain transaction must never be blindly resubmitted.

use thiserror::Error;

/// A single named validator that rejected the user input
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationFailure {
    /// Name of the validator (matches the `--skip <name>` flag)
    pub name: String,
    /// Human-readable reason
    pub message: String,
}

impl ValidationFailure {
    pub fn new(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            message: message.into(),
        }
    }
}

fn format_failures(failures: &[ValidationFailure]) -> String {
    failures
        .iter()
        .map(|f| format!("\n  - {}: {}", f.name, f.message))
        .collect()
}

/// Raw error reported by the chain client boundary
#[derive(Error, Debug, Clone)]
#[error("{0}")]
pub struct ChainError(pub String);

impl ChainError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

impl From<serde_json::Error> for ChainError {
    fn from(e: serde_json::Error) -> Self {
        Self(e.to_string())
    }
}

/// All errors surfaced to the CLI boundary
#[derive(Error, Debug)]
pub enum OpsError {
    /// Bad or missing flags, env vars or files, detected before any chain call
    #[error("configuration error: {0}")]
    Configuration(String),

    /// One or more named validators rejected the input; all failures reported
    #[error("validation failed:{}", format_failures(.0))]
    Validation(Vec<ValidationFailure>),

    /// Dry-run gas estimation rejected the message
    #[error("simulation failed: {0}")]
    Simulation(String),

    /// Multisig: the rebuilt transaction diverges from the stored proposal
    #[error("proposal mismatch: {0}")]
    ProposalMismatch(String),

    /// Broadcast or signing failed, or the chain rejected the transaction
    #[error("submission failed: {0}")]
    Submission(String),

    /// Operation not available for this command family
    #[error("unsupported operation: {0}")]
    UnsupportedOperation(String),

    /// Operator declined the confirmation prompt
    #[error("aborted by operator")]
    Aborted,

    /// Read-only chain access failed outside of simulation/submission
    #[error("chain error: {0}")]
    Chain(#[from] ChainError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

impl OpsError {
    /// Short kind tag used by the CLI when printing errors
    pub fn kind(&self) -> &'static str {
        match self {
            OpsError::Configuration(_) => "configuration",
            OpsError::Validation(_) => "validation",
            OpsError::Simulation(_) => "simulation",
            OpsError::ProposalMismatch(_) => "proposal-mismatch",
            OpsError::Submission(_) => "submission",
            OpsError::UnsupportedOperation(_) => "unsupported-operation",
            OpsError::Aborted => "aborted",
            OpsError::Chain(_) => "chain",
            OpsError::Io(_) => "io",
            OpsError::Json(_) => "json",
        }
    }
}
