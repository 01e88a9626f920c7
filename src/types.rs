//! Core data types shared across the harness: tasks, actions, environment
//! responses, and per-episode result records.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Reserved action name for a user-facing response (as opposed to a tool call).
pub const RESPOND_ACTION_NAME: &str = "respond";

/// Marker string in a user-simulator reply that ends the episode.
pub const STOP_MARKER: &str = "###STOP###";

// ---------------------------------------------------------------------------
// Actions and tasks
// ---------------------------------------------------------------------------

/// A single agent action: either a tool call or a `respond` to the user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Action {
    /// Tool name, or [`RESPOND_ACTION_NAME`].
    pub name: String,
    /// Argument name -> value. For `respond`, the `content` key holds the text.
    #[serde(default)]
    pub arguments: Map<String, Value>,
}

impl Action {
    /// Construct a tool-call action.
    pub fn tool(name: impl Into<String>, arguments: Map<String, Value>) -> Self {
        Self {
            name: name.into(),
            arguments,
        }
    }

    /// Construct a `respond` action with the given content.
    pub fn respond(content: impl Into<String>) -> Self {
        let mut arguments = Map::new();
        arguments.insert("content".to_string(), Value::String(content.into()));
        Self {
            name: RESPOND_ACTION_NAME.to_string(),
            arguments,
        }
    }

    /// Whether this is a user-facing response rather than a tool call.
    pub fn is_respond(&self) -> bool {
        self.name == RESPOND_ACTION_NAME
    }

    /// The `content` argument as a string, if present.
    pub fn content(&self) -> Option<&str> {
        self.arguments.get("content").and_then(Value::as_str)
    }
}

/// One evaluation task: an instruction for the user simulator plus the
/// authored ground truth (correct action sequence and/or expected outputs).
///
/// Immutable once loaded from the task catalog.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    /// Stable identifier within the catalog.
    pub id: String,
    /// Natural-language instruction given to the user simulator.
    pub instruction: String,
    /// Ground-truth action sequence that produces the correct end state.
    #[serde(default)]
    pub actions: Vec<Action>,
    /// Expected output substrings. Non-empty selects output-match scoring;
    /// empty selects state-hash scoring.
    #[serde(default)]
    pub outputs: Vec<String>,
}

// ---------------------------------------------------------------------------
// Environment responses
// ---------------------------------------------------------------------------

/// Where an observation came from: the user simulator or a named tool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "name")]
pub enum ObservationSource {
    User,
    Tool(String),
}

/// Auxiliary info attached to every environment response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnvInfo {
    /// The id of the task this episode is bound to.
    pub task_id: String,
    /// Which collaborator produced the observation.
    pub source: ObservationSource,
    /// Present only on the terminal step.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reward_info: Option<crate::env::reward::RewardResult>,
    /// Accumulated user-simulator cost, present only on the terminal step.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_cost: Option<f64>,
}

/// The result of one `step` call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnvResponse {
    /// Observation text shown to the agent.
    pub observation: String,
    /// 0.0 except on the terminal step, where the episode reward lands.
    pub reward: f64,
    /// Whether the episode has terminated.
    pub done: bool,
    pub info: EnvInfo,
}

/// The result of a `reset` call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResetResponse {
    /// The initial user utterance.
    pub observation: String,
    pub info: EnvInfo,
}

// ---------------------------------------------------------------------------
// Episode records
// ---------------------------------------------------------------------------

/// A single dialogue turn recorded into the trajectory.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    /// `"assistant"`, `"user"`, `"tool"`, or `"supervisor"`.
    pub role: String,
    pub content: String,
}

impl Message {
    pub fn new(role: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: role.into(),
            content: content.into(),
        }
    }
}

/// The per-episode record serialized into the checkpoint log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EpisodeResult {
    /// Unique id for this episode run (UUID v4).
    pub episode_id: String,
    pub task_id: String,
    /// Binary episode reward.
    pub reward: f64,
    /// Free-form detail: reward info on success paths, error detail on
    /// infrastructure failures.
    pub info: Value,
    /// The dialogue turns of the episode (empty on infrastructure failure).
    pub messages: Vec<Message>,
    /// Zero-based trial index.
    pub trial: usize,
    /// UTC completion timestamp.
    pub finished_at: chrono::DateTime<chrono::Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn respond_action_carries_content() {
        let action = Action::respond("Your order has been cancelled.");
        assert!(action.is_respond());
        assert_eq!(action.content(), Some("Your order has been cancelled."));
    }

    #[test]
    fn action_round_trips_through_json() {
        let mut args = Map::new();
        args.insert("order_id".into(), Value::String("W1001".into()));
        let action = Action::tool("cancel_pending_order", args);

        let text = serde_json::to_string(&action).unwrap();
        let back: Action = serde_json::from_str(&text).unwrap();
        assert_eq!(back, action);
        assert!(!back.is_respond());
    }

    #[test]
    fn task_defaults_to_state_hash_mode_fields() {
        let task: Task = serde_json::from_str(
            r#"{"id": "t0", "instruction": "Cancel order W1001."}"#,
        )
        .unwrap();
        assert!(task.actions.is_empty());
        assert!(task.outputs.is_empty());
    }
}
