//! The supervision gate: an approval check interposed before every tool
//! invocation and every user-facing response.
//!
//! The gate is a first-class collaborator the environment calls explicitly,
//! exactly once per action, synchronously, before any state mutation. Two
//! scopes exist: `Action` (stricter, anything that can mutate state or reach
//! the user) and `Read` (lighter, pure queries and `think`). The gate sees
//! the visible call arguments and conversation context, never the snapshot.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::types::Message;

/// Which supervision configuration reviews a call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GateScope {
    /// Mutating tools and user-facing responses.
    Action,
    /// Read-only tools.
    Read,
}

/// The outcome of a supervision check.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "decision")]
pub enum GateDecision {
    Approve,
    Reject { reason: String },
}

/// Everything the gate may inspect about a pending call.
///
/// The snapshot is deliberately absent: tools receive the live snapshot, the
/// gate never does.
#[derive(Debug, Clone, Serialize)]
pub struct GateContext<'a> {
    pub scope: GateScope,
    /// Tool name, or the `respond` sentinel for user-facing responses.
    pub action_name: &'a str,
    /// The declared, visible call arguments.
    pub arguments: &'a Map<String, Value>,
    /// Dialogue turns so far.
    pub conversation: &'a [Message],
}

/// Per-domain policy material the gate is constructed with.
///
/// Passed explicitly at startup rather than read from module state, so two
/// environments with different domains can coexist in one process.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatePolicy {
    /// Domain label, e.g. `"retail"`.
    pub domain: String,
    /// Long-form policy document the supervision service reviews against.
    pub wiki: String,
    /// Short rule statements.
    pub rules: Vec<String>,
}

/// Synchronous approval check consulted before each action executes.
pub trait SupervisionGate: Send + Sync {
    fn review(&self, context: &GateContext<'_>) -> GateDecision;
}

// ---------------------------------------------------------------------------
// Implementations
// ---------------------------------------------------------------------------

/// A gate that approves everything. Useful for unsupervised baselines and
/// tests.
#[derive(Debug, Clone, Default)]
pub struct LenientGate;

impl SupervisionGate for LenientGate {
    fn review(&self, _context: &GateContext<'_>) -> GateDecision {
        GateDecision::Approve
    }
}

/// A gate backed by an external approval service over HTTP.
///
/// Expected endpoint: `POST {base_url}/review` with a JSON body carrying the
/// scope, action name, visible arguments, conversation, and the domain
/// policy; returns JSON matching [`GateDecision`].
pub struct RemoteGate {
    base_url: String,
    policy: GatePolicy,
    http: reqwest::blocking::Client,
}

impl RemoteGate {
    pub fn new(base_url: &str, policy: GatePolicy) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            policy,
            http: reqwest::blocking::Client::new(),
        }
    }
}

impl SupervisionGate for RemoteGate {
    fn review(&self, context: &GateContext<'_>) -> GateDecision {
        let body = serde_json::json!({
            "scope": context.scope,
            "action_name": context.action_name,
            "arguments": context.arguments,
            "conversation": context.conversation,
            "policy": self.policy,
        });

        let result = self
            .http
            .post(format!("{}/review", self.base_url))
            .json(&body)
            .send()
            .and_then(|resp| resp.json::<GateDecision>());

        match result {
            Ok(decision) => decision,
            Err(err) => {
                // An unreachable supervisor must not silently wave actions
                // through.
                tracing::warn!(error = %err, "supervision service unreachable, rejecting");
                GateDecision::Reject {
                    reason: format!("supervision service unavailable: {err}"),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lenient_gate_approves_both_scopes() {
        let gate = LenientGate;
        let arguments = Map::new();
        let conversation: Vec<Message> = Vec::new();

        for scope in [GateScope::Action, GateScope::Read] {
            let decision = gate.review(&GateContext {
                scope,
                action_name: "get_user_details",
                arguments: &arguments,
                conversation: &conversation,
            });
            assert_eq!(decision, GateDecision::Approve);
        }
    }

    #[test]
    fn decision_serialization_shape() {
        let approve = serde_json::to_value(GateDecision::Approve).unwrap();
        assert_eq!(approve["decision"], "approve");

        let reject: GateDecision =
            serde_json::from_str(r#"{"decision": "reject", "reason": "policy"}"#).unwrap();
        assert_eq!(
            reject,
            GateDecision::Reject {
                reason: "policy".into()
            }
        );
    }
}
