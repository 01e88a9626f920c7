use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Complete configuration for an evaluation run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvalConfig {
    pub run: RunConfig,
    pub user: UserConfig,
    pub gate: GateConfig,
}

/// Batch-run parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunConfig {
    /// Number of trials per task (default: 1).
    pub trials: usize,
    /// Hard cap on agent actions per episode (default: 30).
    pub max_steps: usize,
    /// Episodes allowed to run concurrently (default: 1).
    pub max_concurrency: usize,
    /// Shuffle task order within each trial (default: false).
    pub shuffle: bool,
    /// Checkpoint log path; `None` disables checkpointing.
    pub checkpoint_path: Option<PathBuf>,
}

/// Which user simulator to attach to each episode.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "mode")]
pub enum UserConfig {
    /// Canned opening utterance and replies; offline runs and tests.
    Scripted {
        opening: String,
        #[serde(default)]
        replies: Vec<String>,
    },
    /// A user simulator service over HTTP.
    Remote { base_url: String },
}

/// Which supervision gate to construct.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "mode")]
pub enum GateConfig {
    /// Approve everything (unsupervised baseline).
    Lenient,
    /// An approval service over HTTP, reviewing against the domain policy.
    Remote { base_url: String },
}

impl Default for EvalConfig {
    fn default() -> Self {
        Self {
            run: RunConfig {
                trials: 1,
                max_steps: 30,
                max_concurrency: 1,
                shuffle: false,
                checkpoint_path: None,
            },
            user: UserConfig::Scripted {
                opening: "Hi, I need some help with my account.".into(),
                replies: Vec::new(),
            },
            gate: GateConfig::Lenient,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_round_trips_through_json() {
        let config = EvalConfig::default();
        let text = serde_json::to_string_pretty(&config).unwrap();
        let back: EvalConfig = serde_json::from_str(&text).unwrap();
        assert_eq!(back.run.max_steps, 30);
        assert!(matches!(back.gate, GateConfig::Lenient));
    }

    #[test]
    fn remote_gate_config_parses() {
        let config: GateConfig = serde_json::from_str(
            r#"{"mode": "remote", "base_url": "http://localhost:8080"}"#,
        )
        .unwrap();
        assert!(matches!(config, GateConfig::Remote { .. }));
    }
}
