//! Episode orchestration: drives agents through isolated environments, one
//! blocking worker per episode, and records every completion in the
//! checkpoint log.
//!
//! Episodes never share state: each worker builds its own [`Env`] (and with
//! it, its own snapshot) from the factory. Any failure outside the
//! environment's own error containment (a panic, a user-simulator outage, a
//! broken factory) is caught here and recorded as a zero-reward result with
//! error detail, without disturbing other running episodes.

pub mod checkpoint;
pub mod metrics;

pub use checkpoint::CheckpointLog;
pub use metrics::{compute as compute_metrics, Metrics};

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{anyhow, Result};
use rand::seq::SliceRandom;
use serde_json::json;
use tokio::sync::Semaphore;
use uuid::Uuid;

use crate::env::Env;
use crate::types::{Action, EpisodeResult};

/// The agent seam: given the latest observation, choose the next action.
///
/// Implementations typically wrap an LLM; tests use scripted agents.
pub trait AgentPolicy: Send {
    fn next_action(&mut self, observation: &str) -> Result<Action>;
}

/// An agent that replays a fixed action script, then keeps responding with a
/// closing message. Replaying a task's own ground truth through this agent is
/// the oracle check that the harness scores a correct episode as 1.0.
pub struct ReplayAgent {
    script: std::collections::VecDeque<Action>,
    final_response: String,
}

impl ReplayAgent {
    pub fn new(script: Vec<Action>) -> Self {
        Self {
            script: script.into(),
            final_response: "Is there anything else I can help you with?".to_string(),
        }
    }

    /// Override the closing message (e.g. to state a task's expected outputs).
    pub fn with_final_response(mut self, text: impl Into<String>) -> Self {
        self.final_response = text.into();
        self
    }
}

impl AgentPolicy for ReplayAgent {
    fn next_action(&mut self, _observation: &str) -> Result<Action> {
        Ok(self
            .script
            .pop_front()
            .unwrap_or_else(|| Action::respond(self.final_response.clone())))
    }
}

/// Builds an isolated environment bound to the given task index.
pub type EnvFactory = Arc<dyn Fn(Option<usize>) -> Result<Env> + Send + Sync>;

/// Builds a fresh agent for one episode of the given task index.
pub type AgentFactory = Arc<dyn Fn(usize) -> Box<dyn AgentPolicy> + Send + Sync>;

/// Options for a batch run.
#[derive(Debug, Clone)]
pub struct RunOptions {
    /// Task catalog indices to run.
    pub task_indices: Vec<usize>,
    /// Number of trials per task.
    pub trials: usize,
    /// Hard cap on agent actions per episode.
    pub max_steps: usize,
    /// Number of episodes allowed to run concurrently.
    pub max_concurrency: usize,
    /// Shuffle task order within each trial.
    pub shuffle: bool,
    /// Checkpoint log path; `None` disables checkpointing.
    pub checkpoint_path: Option<PathBuf>,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            task_indices: Vec::new(),
            trials: 1,
            max_steps: 30,
            max_concurrency: 1,
            shuffle: false,
            checkpoint_path: None,
        }
    }
}

/// Run every requested (task, trial) pair to completion and return the
/// episode records, also appending each to the checkpoint log as it finishes.
pub async fn run_tasks(
    env_factory: EnvFactory,
    agent_factory: AgentFactory,
    options: RunOptions,
) -> Result<Vec<EpisodeResult>> {
    let checkpoint = options.checkpoint_path.as_ref().map(CheckpointLog::new);
    let semaphore = Arc::new(Semaphore::new(options.max_concurrency.max(1)));
    let mut handles = Vec::new();

    for trial in 0..options.trials {
        let mut indices = options.task_indices.clone();
        if options.shuffle {
            indices.shuffle(&mut rand::thread_rng());
        }

        for index in indices {
            let semaphore = Arc::clone(&semaphore);
            let env_factory = Arc::clone(&env_factory);
            let agent_factory = Arc::clone(&agent_factory);
            let checkpoint = checkpoint.clone();
            let max_steps = options.max_steps;

            handles.push(tokio::spawn(async move {
                // Permit bounds how many blocking workers run at once.
                let _permit = semaphore.acquire_owned().await.ok();

                let joined = tokio::task::spawn_blocking(move || {
                    let record = run_episode(
                        env_factory.as_ref(),
                        agent_factory.as_ref(),
                        index,
                        trial,
                        max_steps,
                    );
                    if let Some(log) = &checkpoint {
                        if let Err(err) = log.append(&record) {
                            tracing::error!(error = %err, "failed to append checkpoint record");
                        }
                    }
                    record
                })
                .await;

                // A panicked episode still yields a record.
                joined.unwrap_or_else(|join_err| {
                    failure_record(index, trial, anyhow!("episode worker panicked: {join_err}"))
                })
            }));
        }
    }

    let mut results = Vec::with_capacity(handles.len());
    for handle in handles {
        match handle.await {
            Ok(record) => results.push(record),
            Err(join_err) => {
                return Err(anyhow!("episode task aborted: {join_err}"));
            }
        }
    }
    Ok(results)
}

/// Run one episode to completion, containing every episode-level failure.
fn run_episode(
    env_factory: &(dyn Fn(Option<usize>) -> Result<Env> + Send + Sync),
    agent_factory: &(dyn Fn(usize) -> Box<dyn AgentPolicy> + Send + Sync),
    task_index: usize,
    trial: usize,
    max_steps: usize,
) -> EpisodeResult {
    match try_episode(env_factory, agent_factory, task_index, trial, max_steps) {
        Ok(record) => {
            tracing::info!(
                task_id = %record.task_id,
                trial,
                reward = record.reward,
                steps = record.messages.len(),
                "episode finished"
            );
            record
        }
        Err(err) => {
            tracing::error!(task_index, trial, error = %err, "episode failed");
            failure_record(task_index, trial, err)
        }
    }
}

fn try_episode(
    env_factory: &(dyn Fn(Option<usize>) -> Result<Env> + Send + Sync),
    agent_factory: &(dyn Fn(usize) -> Box<dyn AgentPolicy> + Send + Sync),
    task_index: usize,
    trial: usize,
    max_steps: usize,
) -> Result<EpisodeResult> {
    let mut env = env_factory(Some(task_index))?;
    let mut agent = agent_factory(task_index);

    let reset = env.reset(Some(task_index))?;
    let task_id = env.task().id.clone();
    let mut observation = reset.observation;

    let mut reward = 0.0;
    let mut info = json!({"error": format!("step limit {max_steps} reached")});

    for _ in 0..max_steps {
        let action = agent.next_action(&observation)?;
        let response = env.step(action);
        observation = response.observation;
        if response.done {
            reward = response.reward;
            info = json!({
                "reward_info": response.info.reward_info,
                "user_cost": response.info.user_cost,
            });
            break;
        }
    }

    Ok(EpisodeResult {
        episode_id: Uuid::new_v4().to_string(),
        task_id,
        reward,
        info,
        messages: env.messages().to_vec(),
        trial,
        finished_at: chrono::Utc::now(),
    })
}

fn failure_record(task_index: usize, trial: usize, err: anyhow::Error) -> EpisodeResult {
    EpisodeResult {
        episode_id: Uuid::new_v4().to_string(),
        task_id: format!("task_index_{task_index}"),
        reward: 0.0,
        info: json!({"error": format!("{err:#}")}),
        messages: Vec::new(),
        trial,
        finished_at: chrono::Utc::now(),
    }
}
