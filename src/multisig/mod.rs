//! Multisig governance
//!
//! Proposal state derivation and the wrapper that routes any command's
//! transaction through a cw3 propose/approve/execute flow.

pub mod state;
pub mod wrapper;

pub use state::{
    fetch_proposal_state, next_action, render_state, MultisigInfo, ProposalAction, ProposalInfo,
    ProposalState, ProposalStatus,
};
pub use wrapper::{MultisigCommand, DEFAULT_VOTING_PERIOD_SECS};
