//! The episode state machine.
//!
//! An [`Env`] binds one task to one exclusively-owned database snapshot and
//! drives the episode: `respond` actions go to the user simulator, tool
//! actions go through the supervision gate and then the registry, everything
//! else becomes a synthetic "unknown action" observation. When the episode
//! terminates the reward engine scores it against the task's ground truth.

use std::sync::Arc;

use anyhow::{bail, Context, Result};
use rand::Rng;
use serde_json::Value;

use crate::env::reward::{RewardInfo, RewardResult};
use crate::env::user::UserSimulator;
use crate::hash::hash_value;
use crate::tools::gate::{GateContext, GateDecision, GateScope, SupervisionGate};
use crate::tools::ToolRegistry;
use crate::types::{
    Action, EnvInfo, EnvResponse, Message, ObservationSource, ResetResponse, Task, STOP_MARKER,
};

/// Zero-argument loader producing a fresh snapshot on every call.
///
/// Invoked at construction, at reset, and inside state-hash reward
/// calculation; it must return logically equivalent fresh data each time.
pub type SnapshotLoader = Arc<dyn Fn() -> Value + Send + Sync>;

/// One task episode against one mutable snapshot.
pub struct Env {
    loader: SnapshotLoader,
    registry: ToolRegistry,
    tasks: Arc<Vec<Task>>,
    task_index: usize,
    task: Task,
    data: Value,
    user: Box<dyn UserSimulator>,
    gate: Arc<dyn SupervisionGate>,
    actions: Vec<Action>,
    messages: Vec<Message>,
    /// Set while replaying ground truth inside reward calculation, so a
    /// replayed terminal action cannot recursively trigger another reward
    /// calculation.
    replaying: bool,
}

impl Env {
    /// Construct an environment bound to one task, in the running state.
    ///
    /// `task_index: None` samples uniformly from `0..tasks.len()` (exclusive
    /// upper bound).
    pub fn new(
        loader: SnapshotLoader,
        registry: ToolRegistry,
        tasks: Arc<Vec<Task>>,
        user: Box<dyn UserSimulator>,
        gate: Arc<dyn SupervisionGate>,
        task_index: Option<usize>,
    ) -> Result<Self> {
        if tasks.is_empty() {
            bail!("task catalog is empty");
        }
        let task_index = match task_index {
            Some(index) => {
                if index >= tasks.len() {
                    bail!("task index {index} out of range (have {} tasks)", tasks.len());
                }
                index
            }
            None => rand::thread_rng().gen_range(0..tasks.len()),
        };
        let task = tasks[task_index].clone();
        let data = loader();

        Ok(Self {
            loader,
            registry,
            tasks,
            task_index,
            task,
            data,
            user,
            gate,
            actions: Vec::new(),
            messages: Vec::new(),
            replaying: false,
        })
    }

    /// Reinitialize the snapshot, select a task, clear the trajectory, and
    /// obtain the opening user utterance.
    pub fn reset(&mut self, task_index: Option<usize>) -> Result<ResetResponse> {
        self.task_index = match task_index {
            Some(index) => {
                if index >= self.tasks.len() {
                    bail!(
                        "task index {index} out of range (have {} tasks)",
                        self.tasks.len()
                    );
                }
                index
            }
            None => rand::thread_rng().gen_range(0..self.tasks.len()),
        };
        self.task = self.tasks[self.task_index].clone();
        self.data = (self.loader)();
        self.actions.clear();
        self.messages.clear();

        let observation = self
            .user
            .reset(&self.task.instruction)
            .context("user simulator failed to reset")?;
        self.messages.push(Message::new("user", observation.clone()));

        tracing::debug!(task_id = %self.task.id, task_index = self.task_index, "env reset");

        Ok(ResetResponse {
            observation,
            info: EnvInfo {
                task_id: self.task.id.clone(),
                source: ObservationSource::User,
                reward_info: None,
                user_cost: None,
            },
        })
    }

    /// Execute one action. Never fails: tool errors, gate rejections, and
    /// unknown action names all become observation strings.
    pub fn step(&mut self, action: Action) -> EnvResponse {
        self.actions.push(action.clone());

        let mut done = false;
        let mut reward = 0.0;
        let source;
        let observation;

        if action.is_respond() {
            let content = action.content().unwrap_or_default().to_string();
            let decision = self.gate.review(&GateContext {
                scope: GateScope::Action,
                action_name: &action.name,
                arguments: &action.arguments,
                conversation: &self.messages,
            });
            self.messages.push(Message::new("assistant", content.clone()));

            let speaker;
            observation = match decision {
                GateDecision::Approve => {
                    speaker = "user";
                    match self.user.step(&content) {
                        Ok(reply) => reply,
                        Err(err) => format!("Error: {err:#}"),
                    }
                }
                GateDecision::Reject { reason } => {
                    speaker = "supervisor";
                    tracing::info!(%reason, "response rejected by supervisor");
                    format!("Response rejected by supervisor: {reason}")
                }
            };
            done = observation.contains(STOP_MARKER);
            self.messages.push(Message::new(speaker, observation.clone()));
            source = ObservationSource::User;
        } else if let Some(tool) = self.registry.get(&action.name).cloned() {
            let scope = if tool.mutates_state() {
                GateScope::Action
            } else {
                GateScope::Read
            };
            // The gate sees the visible arguments and the conversation so
            // far, never the snapshot.
            let decision = self.gate.review(&GateContext {
                scope,
                action_name: &action.name,
                arguments: &action.arguments,
                conversation: &self.messages,
            });
            self.messages.push(Message::new(
                "assistant",
                format!(
                    "{}({})",
                    action.name,
                    serde_json::to_string(&action.arguments).unwrap_or_default()
                ),
            ));

            observation = match decision {
                GateDecision::Approve => {
                    match tool.invoke(&mut self.data, &action.arguments) {
                        Ok(obs) => {
                            tracing::debug!(tool = %action.name, "tool invoked");
                            obs
                        }
                        Err(err) => {
                            tracing::warn!(tool = %action.name, error = %err, "tool error");
                            format!("Error: {err:#}")
                        }
                    }
                }
                GateDecision::Reject { reason } => {
                    tracing::info!(tool = %action.name, %reason, "tool call rejected by supervisor");
                    format!("Tool call rejected by supervisor: {reason}")
                }
            };
            self.messages.push(Message::new("tool", observation.clone()));
            if self.registry.is_terminating(&action.name) {
                done = true;
            }
            source = ObservationSource::Tool(action.name.clone());
        } else {
            self.messages.push(Message::new(
                "assistant",
                format!(
                    "{}({})",
                    action.name,
                    serde_json::to_string(&action.arguments).unwrap_or_default()
                ),
            ));
            observation = format!("Unknown action {}", action.name);
            tracing::warn!(action = %action.name, "unknown action");
            self.messages
                .push(Message::new("tool", observation.clone()));
            source = ObservationSource::Tool(action.name.clone());
        }

        let mut info = EnvInfo {
            task_id: self.task.id.clone(),
            source,
            reward_info: None,
            user_cost: None,
        };

        if done && !self.replaying {
            let reward_result = self.calculate_reward();
            reward = reward_result.reward;
            info.reward_info = Some(reward_result);
            info.user_cost = Some(self.user.total_cost());
        }

        EnvResponse {
            observation,
            reward,
            done,
            info,
        }
    }

    /// Canonical hash of the current snapshot.
    pub fn data_hash(&self) -> String {
        hash_value(&self.data)
    }

    /// Score the finished episode against the task's ground truth.
    ///
    /// Output-match mode runs when the task declares expected outputs; state-
    /// hash mode otherwise. State-hash mode discards the post-episode
    /// snapshot after hashing it, reloads a pristine one, and replays the
    /// ground-truth actions through the same step path.
    pub fn calculate_reward(&mut self) -> RewardResult {
        let data_hash = self.data_hash();
        let mut reward = 1.0;
        let filtered_actions: Vec<Action> = self
            .task
            .actions
            .iter()
            .filter(|action| !action.is_respond())
            .cloned()
            .collect();

        let info = if !self.task.outputs.is_empty() {
            let mut r_outputs = 1.0;
            let mut outputs = std::collections::BTreeMap::new();
            for expected in &self.task.outputs {
                let needle = expected.to_lowercase();
                let found = self.actions.iter().any(|action| {
                    action.is_respond()
                        && action
                            .content()
                            .map(|content| {
                                content.to_lowercase().replace(',', "").contains(&needle)
                            })
                            .unwrap_or(false)
                });
                if !found {
                    r_outputs = 0.0;
                    reward = 0.0;
                }
                outputs.insert(expected.clone(), found);
            }
            RewardInfo::Outputs { r_outputs, outputs }
        } else {
            // Replay ground truth against a pristine snapshot and compare
            // final-state hashes. The replay runs through `step`, so the
            // recorded trajectory is set aside first; replayed turns must
            // never end up in the episode record.
            self.data = (self.loader)();
            let ground_truth = self.task.actions.clone();
            let saved_actions = std::mem::take(&mut self.actions);
            let saved_messages = std::mem::take(&mut self.messages);
            self.replaying = true;
            for action in ground_truth {
                if !self.registry.is_terminating(&action.name) {
                    let _ = self.step(action);
                }
            }
            self.replaying = false;
            self.actions = saved_actions;
            self.messages = saved_messages;
            let gt_data_hash = self.data_hash();
            let r_actions = data_hash == gt_data_hash;
            if !r_actions {
                reward = 0.0;
            }
            RewardInfo::Actions {
                r_actions,
                gt_data_hash,
            }
        };

        RewardResult {
            reward,
            info,
            actions: filtered_actions,
        }
    }

    pub fn task(&self) -> &Task {
        &self.task
    }

    pub fn task_index(&self) -> usize {
        self.task_index
    }

    /// Actions the agent has taken so far this episode.
    pub fn actions(&self) -> &[Action] {
        &self.actions
    }

    /// Dialogue turns recorded so far this episode.
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Function schemas of every registered tool, for the calling agent.
    pub fn tool_infos(&self) -> Vec<Value> {
        self.registry.tool_infos()
    }
}
