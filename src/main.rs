//! Gauntlet: evaluation harness for tool-using conversational agents.
//!
//! Subcommands:
//!
//! - `run`     -- Run tasks from the retail catalog and checkpoint results
//! - `tasks`   -- List the task catalog
//! - `metrics` -- Compute average reward and pass^k from a checkpoint file

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use gauntlet::config::{EvalConfig, GateConfig, UserConfig};
use gauntlet::env::{Env, RemoteUser, ScriptedUser, UserSimulator};
use gauntlet::retail;
use gauntlet::runner::{
    self, AgentFactory, AgentPolicy, CheckpointLog, EnvFactory, ReplayAgent, RunOptions,
};
use gauntlet::tools::gate::{LenientGate, RemoteGate, SupervisionGate};

// ---------------------------------------------------------------------------
// CLI definition
// ---------------------------------------------------------------------------

/// Gauntlet: evaluation harness for tool-using conversational agents.
#[derive(Parser)]
#[command(name = "gauntlet", version, about)]
struct Cli {
    /// Path to a JSON configuration file (uses defaults if not provided).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run tasks against the retail domain with the ground-truth replay agent.
    Run {
        /// Task catalog indices to run (all tasks if omitted).
        #[arg(long, num_args = 1..)]
        tasks: Option<Vec<usize>>,

        /// Number of trials per task (overrides the config).
        #[arg(long)]
        trials: Option<usize>,

        /// Number of episodes to run concurrently (overrides the config).
        #[arg(long)]
        concurrency: Option<usize>,

        /// Path to the checkpoint log (overrides the config).
        #[arg(long)]
        checkpoint: Option<PathBuf>,
    },

    /// List the task catalog.
    Tasks,

    /// Compute metrics from a checkpoint file.
    Metrics {
        /// Path to the checkpoint log.
        #[arg(default_value = "results/checkpoint.json")]
        path: PathBuf,
    },
}

// ---------------------------------------------------------------------------
// Entrypoint
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> Result<()> {
    // Initialise tracing (reads RUST_LOG env var, defaults to info).
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config from {}", path.display()))?;
            serde_json::from_str::<EvalConfig>(&text)
                .with_context(|| format!("Failed to parse config from {}", path.display()))?
        }
        None => EvalConfig::default(),
    };

    match cli.command {
        Commands::Run {
            tasks,
            trials,
            concurrency,
            checkpoint,
        } => cmd_run(&config, tasks, trials, concurrency, checkpoint).await,
        Commands::Tasks => cmd_tasks(),
        Commands::Metrics { path } => cmd_metrics(&path),
    }
}

// ---------------------------------------------------------------------------
// Command handlers
// ---------------------------------------------------------------------------

async fn cmd_run(
    config: &EvalConfig,
    tasks: Option<Vec<usize>>,
    trials: Option<usize>,
    concurrency: Option<usize>,
    checkpoint: Option<PathBuf>,
) -> Result<()> {
    let catalog = retail::tasks();
    let task_indices = tasks.unwrap_or_else(|| (0..catalog.len()).collect());
    for &index in &task_indices {
        if index >= catalog.len() {
            anyhow::bail!("task index {index} out of range (have {} tasks)", catalog.len());
        }
    }

    let options = resolve_run_options(config, task_indices, trials, concurrency, checkpoint);

    if let Some(path) = &options.checkpoint_path {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
    }

    tracing::info!(
        tasks = options.task_indices.len(),
        trials = options.trials,
        "starting run"
    );

    let env_factory = build_env_factory(config);
    let agent_factory = oracle_agent_factory();

    let results = runner::run_tasks(env_factory, agent_factory, options).await?;

    for result in &results {
        println!(
            "{} task={} trial={} reward={}",
            if result.reward >= 1.0 { "PASS" } else { "FAIL" },
            result.task_id,
            result.trial,
            result.reward,
        );
    }

    if let Some(metrics) = runner::compute_metrics(&results) {
        println!();
        println!("Average reward: {:.4}", metrics.average_reward);
        for (k, pass) in metrics.pass_hat_k.iter().enumerate() {
            println!("pass^{}: {:.4}", k + 1, pass);
        }
    }

    Ok(())
}

fn cmd_tasks() -> Result<()> {
    for (index, task) in retail::tasks().iter().enumerate() {
        let mode = if task.outputs.is_empty() {
            "state-hash"
        } else {
            "output-match"
        };
        println!("[{index}] {} ({mode})", task.id);
        println!("    {}", task.instruction);
    }
    Ok(())
}

fn cmd_metrics(path: &PathBuf) -> Result<()> {
    let records = CheckpointLog::new(path).read()?;
    match runner::compute_metrics(&records) {
        Some(metrics) => {
            println!("Episodes: {}", records.len());
            println!("Average reward: {:.4}", metrics.average_reward);
            for (k, pass) in metrics.pass_hat_k.iter().enumerate() {
                println!("pass^{}: {:.4}", k + 1, pass);
            }
        }
        None => println!("No records in {}", path.display()),
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Collaborator construction
// ---------------------------------------------------------------------------

/// Batch options: the config supplies defaults, CLI flags override them.
fn resolve_run_options(
    config: &EvalConfig,
    task_indices: Vec<usize>,
    trials: Option<usize>,
    concurrency: Option<usize>,
    checkpoint: Option<PathBuf>,
) -> RunOptions {
    let checkpoint_path = checkpoint
        .or_else(|| config.run.checkpoint_path.clone())
        .unwrap_or_else(|| PathBuf::from("results/checkpoint.json"));

    RunOptions {
        task_indices,
        trials: trials.unwrap_or(config.run.trials),
        max_steps: config.run.max_steps,
        max_concurrency: concurrency.unwrap_or(config.run.max_concurrency),
        shuffle: config.run.shuffle,
        checkpoint_path: Some(checkpoint_path),
    }
}

fn build_env_factory(config: &EvalConfig) -> EnvFactory {
    let user_config = config.user.clone();
    let gate_config = config.gate.clone();

    Arc::new(move |task_index| {
        let user: Box<dyn UserSimulator> = match &user_config {
            UserConfig::Scripted { opening, replies } => {
                Box::new(ScriptedUser::new(opening.clone(), replies.clone()))
            }
            UserConfig::Remote { base_url } => Box::new(RemoteUser::new(base_url)),
        };
        let gate: Arc<dyn SupervisionGate> = match &gate_config {
            GateConfig::Lenient => Arc::new(LenientGate),
            GateConfig::Remote { base_url } => {
                Arc::new(RemoteGate::new(base_url, retail::policy()))
            }
        };

        Env::new(
            retail::loader(),
            retail::registry(),
            Arc::new(retail::tasks()),
            user,
            gate,
            task_index,
        )
    })
}

/// The ground-truth replay agent: replays the task's documented action
/// sequence, then closes the conversation stating any expected outputs.
fn oracle_agent_factory() -> AgentFactory {
    Arc::new(|task_index| {
        let task = &retail::tasks()[task_index];
        let mut agent = ReplayAgent::new(task.actions.clone());
        if !task.outputs.is_empty() {
            agent = agent.with_final_response(task.outputs.join(" "));
        }
        Box::new(agent) as Box<dyn AgentPolicy>
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_supplies_run_defaults() {
        let mut config = EvalConfig::default();
        config.run.trials = 3;
        config.run.max_concurrency = 4;
        config.run.checkpoint_path = Some(PathBuf::from("out/run.json"));

        let options = resolve_run_options(&config, vec![0, 1], None, None, None);
        assert_eq!(options.trials, 3);
        assert_eq!(options.max_concurrency, 4);
        assert_eq!(options.checkpoint_path, Some(PathBuf::from("out/run.json")));
    }

    #[test]
    fn flags_override_the_config() {
        let mut config = EvalConfig::default();
        config.run.trials = 3;
        config.run.checkpoint_path = Some(PathBuf::from("out/run.json"));

        let options = resolve_run_options(
            &config,
            vec![0],
            Some(5),
            Some(8),
            Some(PathBuf::from("elsewhere.json")),
        );
        assert_eq!(options.trials, 5);
        assert_eq!(options.max_concurrency, 8);
        assert_eq!(
            options.checkpoint_path,
            Some(PathBuf::from("elsewhere.json"))
        );
    }
}
