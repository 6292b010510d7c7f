//! DAO governance tools backed by the `cast` command-line client.
//!
//! Proposals are read and written through a single governance contract. Writes need a
//! signing key, taken from the environment when the tool runs.

use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::Arc;

use super::process::{ProcessInvocation, ProcessRunner, ProcessToolExecutor};
use super::{ToolDescriptor, ToolHandler};
use crate::config::ChainSettings;
use crate::models::tool::Tool;

const CREATE_PROPOSAL_SIGNATURE: &str = "createProposal(string,uint256)";
const VOTE_SIGNATURE: &str = "vote(uint256,bool)";
const PROPOSAL_COUNT_SIGNATURE: &str = "proposalCount()(uint256)";
const PROPOSAL_SIGNATURE: &str = "proposals(uint256)(address,string,uint256,uint256,uint256,bool)";

/// Shared state for the DAO tools
struct DaoContract {
    settings: ChainSettings,
    executor: ProcessToolExecutor,
}

impl DaoContract {
    fn send_argv(&self, signature: &str, args: &[String], private_key: &str) -> Vec<String> {
        let mut argv = vec![
            self.settings.cast_binary.clone(),
            "send".to_string(),
            self.settings.contract_address.clone(),
            signature.to_string(),
        ];
        argv.extend(args.iter().cloned());
        argv.extend([
            "--private-key".to_string(),
            private_key.to_string(),
            "--rpc-url".to_string(),
            self.settings.rpc_url.clone(),
        ]);
        argv
    }

    fn call_argv(&self, signature: &str, args: &[String]) -> Vec<String> {
        let mut argv = vec![
            self.settings.cast_binary.clone(),
            "call".to_string(),
            self.settings.contract_address.clone(),
            signature.to_string(),
        ];
        argv.extend(args.iter().cloned());
        argv.extend(["--rpc-url".to_string(), self.settings.rpc_url.clone()]);
        argv
    }

    /// Submit a transaction and describe the outcome
    async fn send(&self, operation: &str, success: &str, signature: &str, args: Vec<String>) -> String {
        let result = self
            .executor
            .run_with_credential(operation, &self.settings.private_key_var, |key| {
                self.send_argv(signature, &args, key)
            })
            .await;

        match result {
            Ok(invocation) => with_exit_note(
                format!("{} Transaction details: {}", success, invocation.stdout),
                &invocation,
            ),
            Err(failure) => failure,
        }
    }
}

fn with_exit_note(text: String, invocation: &ProcessInvocation) -> String {
    match invocation.exit_note() {
        Some(note) => format!("{}\n{}", text, note),
        None => text,
    }
}

/// `cast` prints decoded integers as `3` or, for large values, `3000 [3e3]`
fn parse_count(output: &str) -> Option<u64> {
    output.split_whitespace().next()?.parse().ok()
}

struct CreateProposal(Arc<DaoContract>);

#[async_trait]
impl ToolHandler for CreateProposal {
    async fn call(&self, arguments: Value) -> String {
        let name = arguments["proposalName"].as_str().unwrap_or_default().to_string();
        tracing::info!("Creating proposal: {:?}", name);
        let duration = self.0.settings.proposal_duration_secs.to_string();
        self.0
            .send(
                "Create proposal",
                "Proposal created successfully.",
                CREATE_PROPOSAL_SIGNATURE,
                vec![name, duration],
            )
            .await
    }
}

struct VoteOnProposal(Arc<DaoContract>);

/// Proposal ids are positive; whole floats such as `2.0` count
fn proposal_id(value: &Value) -> Option<String> {
    let id = match value.as_u64() {
        Some(id) => id,
        None => {
            let id = value.as_f64().filter(|n| n.fract() == 0.0 && *n >= 1.0)?;
            id as u64
        }
    };
    (id >= 1).then(|| id.to_string())
}

#[async_trait]
impl ToolHandler for VoteOnProposal {
    async fn call(&self, arguments: Value) -> String {
        let Some(proposal_id) = proposal_id(&arguments["proposalId"]) else {
            return format!("Vote failed: invalid proposalId {}", arguments["proposalId"]);
        };
        let support = arguments["support"].as_bool().unwrap_or_default().to_string();
        tracing::info!(proposal_id = %proposal_id, support = %support, "Voting on proposal");
        self.0
            .send(
                "Vote",
                "Voted successfully.",
                VOTE_SIGNATURE,
                vec![proposal_id, support],
            )
            .await
    }
}

struct GetAllProposals(Arc<DaoContract>);

#[async_trait]
impl ToolHandler for GetAllProposals {
    async fn call(&self, _arguments: Value) -> String {
        const OPERATION: &str = "Get all proposals";
        let contract = &self.0;

        let count_output = match contract
            .executor
            .run(OPERATION, contract.call_argv(PROPOSAL_COUNT_SIGNATURE, &[]))
            .await
        {
            Ok(invocation) => invocation,
            Err(failure) => return failure,
        };
        let Some(count) = parse_count(&count_output.stdout) else {
            let output = if count_output.stdout.trim().is_empty() {
                count_output.stderr.trim()
            } else {
                count_output.stdout.trim()
            };
            return format!(
                "{} failed: could not read proposal count: {}",
                OPERATION, output
            );
        };
        if count == 0 {
            return "No proposals found.".to_string();
        }

        let limit = count.min(contract.settings.max_proposals);
        let mut proposals = String::new();
        for id in 1..=limit {
            match contract
                .executor
                .run(
                    OPERATION,
                    contract.call_argv(PROPOSAL_SIGNATURE, &[id.to_string()]),
                )
                .await
            {
                Ok(invocation) => proposals.push_str(&invocation.stdout),
                Err(failure) => {
                    proposals.push_str(&failure);
                    proposals.push('\n');
                }
            }
        }

        let mut result = proposals.trim().to_string();
        if limit < count {
            result.push_str(&format!(
                "\n(showing the first {} of {} proposals)",
                limit, count
            ));
        }
        result
    }
}

/// The DAO tools, sharing one contract binding and process executor
pub fn dao_tools(settings: &ChainSettings, runner: Arc<dyn ProcessRunner>) -> Vec<ToolDescriptor> {
    let contract = Arc::new(DaoContract {
        settings: settings.clone(),
        executor: ProcessToolExecutor::new(runner, settings.timeout()),
    });

    vec![
        ToolDescriptor::new(
            Tool::new(
                "create_proposal",
                "Creates a new DAO proposal with a given name.",
                json!({
                    "type": "object",
                    "required": ["proposalName"],
                    "properties": {
                        "proposalName": {
                            "type": "string",
                            "description": "The name or title for the new DAO proposal."
                        }
                    }
                }),
            ),
            CreateProposal(contract.clone()),
        ),
        ToolDescriptor::new(
            Tool::new(
                "get_all_proposals",
                "Fetches all DAO proposals. Return only information about relevant proposals \
                that the user is asking. Each proposal will look like this:\n\
                <Proposal creator>\n<Proposal name>\n<deadline_unix>\n<votes_for>\n\
                <votes_against>\n<executed_bool>",
                json!({
                    "type": "object",
                    "required": [],
                    "properties": {}
                }),
            ),
            GetAllProposals(contract.clone()),
        ),
        ToolDescriptor::new(
            Tool::new(
                "vote_on_proposal",
                "Casts a vote on a DAO proposal. If you are not provided the proposal ID, you can \
                use the get_all_proposals tool to fetch all proposals. The first proposal has ID 1, \
                second has ID 2, and so on.",
                json!({
                    "type": "object",
                    "required": ["proposalId", "support"],
                    "properties": {
                        "proposalId": {
                            "type": "integer",
                            "minimum": 1,
                            "description": "The ID of the proposal to vote on."
                        },
                        "support": {
                            "type": "boolean",
                            "description": "True to vote in favor, false to vote against."
                        }
                    }
                }),
            ),
            VoteOnProposal(contract),
        ),
    ]
}
