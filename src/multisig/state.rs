//! Multisig proposal state
//!
//! Derived fresh from chain state on every invocation, never persisted.
//! `next_action` is a pure function of the on-chain proposal status and of
//! whether a proposal id was supplied at all.

use crate::chain::client::ChainClient;
use crate::chain::msg::Cw3Msg;
use crate::error::OpsError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// Status of a proposal as the cw3 contract reports it
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProposalStatus {
    Pending,
    Open,
    Passed,
    Rejected,
    Executed,
}

/// What this tool would do next against the proposal
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ProposalAction {
    Create,
    Approve,
    Execute,
    None,
}

/// No proposal id creates; open and pending approve; passed executes;
/// rejected and executed leave nothing to do
pub fn next_action(status: Option<ProposalStatus>) -> ProposalAction {
    match status {
        None => ProposalAction::Create,
        Some(ProposalStatus::Pending) | Some(ProposalStatus::Open) => ProposalAction::Approve,
        Some(ProposalStatus::Passed) => ProposalAction::Execute,
        Some(ProposalStatus::Rejected) | Some(ProposalStatus::Executed) => ProposalAction::None,
    }
}

#[derive(Clone, Debug)]
pub struct MultisigInfo {
    pub address: String,
    pub threshold: u64,
    pub owners: Vec<String>,
    pub max_voting_period_secs: u64,
    pub admin: String,
    pub group_address: String,
}

#[derive(Clone, Debug)]
pub struct ProposalInfo {
    pub id: Option<u64>,
    pub next_action: ProposalAction,
    pub current_status: Option<ProposalStatus>,
    /// Messages stored in the proposal, in normalized form
    pub data: Vec<Cw3Msg>,
    /// Owners that voted yes
    pub approvers: Vec<String>,
    pub expires_at: Option<DateTime<Utc>>,
}

#[derive(Clone, Debug)]
pub struct ProposalState {
    pub multisig: MultisigInfo,
    pub proposal: ProposalInfo,
}

impl ProposalState {
    pub fn approvals_left(&self) -> u64 {
        self.multisig
            .threshold
            .saturating_sub(self.proposal.approvers.len() as u64)
    }
}

fn parse_status(raw: &Value) -> Result<ProposalStatus, OpsError> {
    serde_json::from_value(raw.clone()).map_err(|_| {
        OpsError::Configuration(format!("unknown proposal status reported by chain: {}", raw))
    })
}

/// Read the multisig and (if an id was given) the proposal, fresh from chain
pub async fn fetch_proposal_state(
    client: &dyn ChainClient,
    multisig: &str,
    proposal_id: Option<u64>,
) -> Result<ProposalState, OpsError> {
    // query values must outlive the joined futures borrowing them
    let voters_query = json!({"list_voters": {}});
    let threshold_query = json!({"threshold": {}});
    let (info, voters, threshold) = futures::try_join!(
        client.contract_info(multisig),
        client.query(multisig, &voters_query),
        client.query(multisig, &threshold_query),
    )?;

    let group_address = info.init_msg["group_addr"]
        .as_str()
        .unwrap_or_default()
        .to_string();
    let admin = client
        .query(&group_address, &json!({"admin": {}}))
        .await?["admin"]
        .as_str()
        .unwrap_or_default()
        .to_string();

    let multisig_info = MultisigInfo {
        address: multisig.to_string(),
        threshold: threshold["absolute_count"]["weight"].as_u64().unwrap_or(0),
        owners: voters["voters"]
            .as_array()
            .map(|members| {
                members
                    .iter()
                    .filter_map(|m| m["addr"].as_str().map(str::to_string))
                    .collect()
            })
            .unwrap_or_default(),
        max_voting_period_secs: info.init_msg["max_voting_period"]["time"]
            .as_u64()
            .unwrap_or(0),
        admin,
        group_address,
    };

    let Some(id) = proposal_id else {
        return Ok(ProposalState {
            multisig: multisig_info,
            proposal: ProposalInfo {
                id: None,
                next_action: ProposalAction::Create,
                current_status: None,
                data: Vec::new(),
                approvers: Vec::new(),
                expires_at: None,
            },
        });
    };

    let proposal_query = json!({"proposal": {"proposal_id": id}});
    let votes_query = json!({"list_votes": {"proposal_id": id}});
    let (proposal, votes) = futures::try_join!(
        client.query(multisig, &proposal_query),
        client.query(multisig, &votes_query),
    )?;

    let status = parse_status(&proposal["status"])?;
    let data: Vec<Cw3Msg> = serde_json::from_value(proposal["msgs"].clone()).map_err(|e| {
        OpsError::Configuration(format!("cannot parse proposal {} messages: {}", id, e))
    })?;
    let approvers = votes["votes"]
        .as_array()
        .map(|votes| {
            votes
                .iter()
                .filter(|v| v["vote"] == "yes")
                .filter_map(|v| v["voter"].as_str().map(str::to_string))
                .collect()
        })
        .unwrap_or_default();
    let expires_at = proposal["expires"]["at_time"]
        .as_str()
        .and_then(|nanos| nanos.parse::<i64>().ok())
        .map(DateTime::from_timestamp_nanos);

    Ok(ProposalState {
        multisig: multisig_info,
        proposal: ProposalInfo {
            id: Some(id),
            next_action: next_action(Some(status)),
            current_status: Some(status),
            data,
            approvers,
            expires_at,
        },
    })
}

/// Operator-facing summary of the multisig and proposal state
pub fn render_state(state: &ProposalState, style: impl Fn(&str) -> String) -> String {
    let owners = state
        .multisig
        .owners
        .iter()
        .map(|o| format!("\n      - {}", style(o)))
        .collect::<String>();
    let mut message = format!(
        "Multisig State ({}):\n  - Threshold: {}\n  - Total Owners: {}\n  - Owners List:{}\n  - Admin: {}\n  - Group Contract: {}\n",
        state.multisig.address,
        state.multisig.threshold,
        state.multisig.owners.len(),
        owners,
        style(&state.multisig.admin),
        style(&state.multisig.group_address),
    );

    message.push_str(&format!(
        "Proposal State:\n  - Next Action: {:?}\n",
        state.proposal.next_action
    ));
    let Some(id) = state.proposal.id else {
        return message;
    };

    let approvers = state
        .proposal
        .approvers
        .iter()
        .map(|a| format!("\n      - {}", style(a)))
        .collect::<String>();
    message.push_str(&format!(
        "  - Multisig Proposal ID: {}\n  - Total Approvers: {}\n  - Approvers List:{}\n",
        id,
        state.proposal.approvers.len(),
        approvers,
    ));
    if let Some(expires_at) = state.proposal.expires_at {
        message.push_str(&format!("  - Approvals expire at {}\n", expires_at));
    }
    message
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::client::ContractInfo;
    use crate::chain::mock::MockClient;

    #[test]
    fn test_next_action_table() {
        assert_eq!(next_action(None), ProposalAction::Create);
        assert_eq!(
            next_action(Some(ProposalStatus::Pending)),
            ProposalAction::Approve
        );
        assert_eq!(
            next_action(Some(ProposalStatus::Open)),
            ProposalAction::Approve
        );
        assert_eq!(
            next_action(Some(ProposalStatus::Passed)),
            ProposalAction::Execute
        );
        assert_eq!(
            next_action(Some(ProposalStatus::Rejected)),
            ProposalAction::None
        );
        assert_eq!(
            next_action(Some(ProposalStatus::Executed)),
            ProposalAction::None
        );
    }

    pub fn stub_multisig(client: &MockClient, multisig: &str, group: &str) {
        client.stub_contract_info(
            multisig,
            ContractInfo {
                address: multisig.to_string(),
                code_id: 1,
                label: "cw3".to_string(),
                init_msg: json!({
                    "group_addr": group,
                    "max_voting_period": {"time": 604800},
                }),
            },
        );
        client.stub_query(
            multisig,
            json!({"list_voters": {}}),
            json!({"voters": [
                {"addr": "wasm1owner0", "weight": 1},
                {"addr": "wasm1owner1", "weight": 1},
                {"addr": "wasm1owner2", "weight": 1},
            ]}),
        );
        client.stub_query(
            multisig,
            json!({"threshold": {}}),
            json!({"absolute_count": {"weight": 2, "total_weight": 3}}),
        );
        client.stub_query(group, json!({"admin": {}}), json!({"admin": "wasm1admin"}));
    }

    #[tokio::test]
    async fn test_fetch_without_proposal_id() {
        let client = MockClient::new();
        stub_multisig(&client, "wasm1msig", "wasm1group");

        let state = fetch_proposal_state(&client, "wasm1msig", None).await.unwrap();
        assert_eq!(state.proposal.next_action, ProposalAction::Create);
        assert_eq!(state.multisig.threshold, 2);
        assert_eq!(state.multisig.owners.len(), 3);
        assert_eq!(state.multisig.max_voting_period_secs, 604800);
        assert_eq!(state.multisig.admin, "wasm1admin");
    }

    #[tokio::test]
    async fn test_fetch_open_proposal() {
        let client = MockClient::new();
        stub_multisig(&client, "wasm1msig", "wasm1group");
        client.stub_query(
            "wasm1msig",
            json!({"proposal": {"proposal_id": 7}}),
            json!({
                "id": 7,
                "status": "open",
                "msgs": [],
                "expires": {"at_time": "1700000000000000000"},
            }),
        );
        client.stub_query(
            "wasm1msig",
            json!({"list_votes": {"proposal_id": 7}}),
            json!({"votes": [
                {"voter": "wasm1owner0", "vote": "yes"},
                {"voter": "wasm1owner1", "vote": "no"},
            ]}),
        );

        let state = fetch_proposal_state(&client, "wasm1msig", Some(7)).await.unwrap();
        assert_eq!(state.proposal.next_action, ProposalAction::Approve);
        assert_eq!(state.proposal.approvers, vec!["wasm1owner0"]);
        assert_eq!(state.approvals_left(), 1);
        assert!(state.proposal.expires_at.is_some());

        let rendered = render_state(&state, |a| a.to_string());
        assert!(rendered.contains("Next Action: Approve"));
        assert!(rendered.contains("Multisig Proposal ID: 7"));
    }
}
