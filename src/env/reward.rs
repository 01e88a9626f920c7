//! Reward result types for the two scoring modes.
//!
//! A task with expected output strings is scored by output matching; a task
//! without them is scored by comparing the canonical hash of the final
//! snapshot against the hash produced by replaying the ground-truth action
//! sequence. Either way the reward is binary: 1.0 or 0.0, never partial.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::types::Action;

/// Mode-specific scoring detail.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RewardInfo {
    /// Output-match mode: per-expected-output found map. `r_outputs` is 1.0
    /// iff every output was found.
    Outputs {
        r_outputs: f64,
        outputs: BTreeMap<String, bool>,
    },
    /// State-hash mode: whether the agent's final snapshot hash matched the
    /// ground-truth hash, plus that hash for debugging.
    Actions {
        r_actions: bool,
        gt_data_hash: String,
    },
}

/// The outcome of reward calculation for one episode.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RewardResult {
    /// 1.0 or 0.0.
    pub reward: f64,
    pub info: RewardInfo,
    /// The task's ground-truth actions with `respond` actions filtered out,
    /// returned in both modes for scoring transparency.
    pub actions: Vec<Action>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn info_serializes_untagged() {
        let outputs = RewardInfo::Outputs {
            r_outputs: 1.0,
            outputs: BTreeMap::from([("$14.99".to_string(), true)]),
        };
        let value = serde_json::to_value(&outputs).unwrap();
        assert_eq!(value["r_outputs"], 1.0);
        assert_eq!(value["outputs"]["$14.99"], true);

        let actions = RewardInfo::Actions {
            r_actions: false,
            gt_data_hash: "abc123".into(),
        };
        let value = serde_json::to_value(&actions).unwrap();
        assert_eq!(value["r_actions"], false);
        assert_eq!(value["gt_data_hash"], "abc123");
    }
}
