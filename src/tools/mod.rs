//! Tool capability interface and the static tool registry.
//!
//! Tools are registered explicitly at environment construction from an
//! enumerated list; lookups are exact-match and case-sensitive. Whether a
//! tool can mutate the snapshot is declared metadata ([`Tool::mutates_state`])
//! rather than something inferred from its name, and it selects which
//! supervision scope the gate applies.

pub mod gate;

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use anyhow::Result;
use serde_json::{Map, Value};

/// A tool the agent can invoke against the database snapshot.
///
/// Implementations receive the live snapshot plus their declared arguments and
/// return an observation string. Errors are caught by the environment and
/// surfaced as observations; they never terminate the episode.
pub trait Tool: Send + Sync {
    /// The action name the agent uses to invoke this tool.
    fn name(&self) -> &str;

    /// JSON function schema describing the tool to the calling agent.
    fn info(&self) -> Value;

    /// Whether invoking this tool can change the snapshot. Pure queries and
    /// the no-op `think` tool return `false` and are reviewed under the
    /// lighter read-level supervision scope.
    fn mutates_state(&self) -> bool;

    fn invoke(&self, data: &mut Value, arguments: &Map<String, Value>) -> Result<String>;
}

/// Name -> tool mapping plus the set of terminating tool names.
///
/// A terminating tool ends the episode when invoked successfully.
#[derive(Clone)]
pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn Tool>>,
    terminating: HashSet<String>,
}

impl ToolRegistry {
    /// Build a registry from an enumerated tool list.
    pub fn new(tools: Vec<Arc<dyn Tool>>) -> Self {
        let tools = tools
            .into_iter()
            .map(|tool| (tool.name().to_string(), tool))
            .collect();
        Self {
            tools,
            terminating: HashSet::new(),
        }
    }

    /// Mark the named tools as terminating for this domain.
    pub fn with_terminating(mut self, names: impl IntoIterator<Item = String>) -> Self {
        self.terminating = names.into_iter().collect();
        self
    }

    /// Exact-match, case-sensitive lookup.
    pub fn get(&self, name: &str) -> Option<&Arc<dyn Tool>> {
        self.tools.get(name)
    }

    pub fn is_terminating(&self, name: &str) -> bool {
        self.terminating.contains(name)
    }

    /// Function schemas for every registered tool, for the calling agent.
    pub fn tool_infos(&self) -> Vec<Value> {
        self.tools.values().map(|tool| tool.info()).collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    struct EchoTool;

    impl Tool for EchoTool {
        fn name(&self) -> &str {
            "echo"
        }

        fn info(&self) -> Value {
            json!({
                "type": "function",
                "function": {
                    "name": "echo",
                    "description": "Echo the message argument back.",
                    "parameters": {
                        "type": "object",
                        "properties": {"message": {"type": "string"}},
                        "required": ["message"],
                    },
                },
            })
        }

        fn mutates_state(&self) -> bool {
            false
        }

        fn invoke(&self, _data: &mut Value, arguments: &Map<String, Value>) -> Result<String> {
            Ok(arguments
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string())
        }
    }

    #[test]
    fn lookup_is_case_sensitive() {
        let registry = ToolRegistry::new(vec![Arc::new(EchoTool)]);
        assert!(registry.get("echo").is_some());
        assert!(registry.get("Echo").is_none());
    }

    #[test]
    fn terminating_set_is_explicit() {
        let registry = ToolRegistry::new(vec![Arc::new(EchoTool)])
            .with_terminating(["echo".to_string()]);
        assert!(registry.is_terminating("echo"));
        assert!(!registry.is_terminating("other"));
    }

    #[test]
    fn tool_infos_exposes_schemas() {
        let registry = ToolRegistry::new(vec![Arc::new(EchoTool)]);
        let infos = registry.tool_infos();
        assert_eq!(infos.len(), 1);
        assert_eq!(infos[0]["function"]["name"], "echo");
    }
}
