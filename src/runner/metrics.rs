//! Aggregate metrics over completed episode records: average reward and the
//! pass^k estimator (the probability that all of k i.i.d. trials of a task
//! succeed, averaged over tasks).

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::types::EpisodeResult;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Metrics {
    pub average_reward: f64,
    /// `pass_hat_k[i]` is the pass^(i+1) estimate.
    pub pass_hat_k: Vec<f64>,
}

fn is_successful(reward: f64) -> bool {
    (1.0 - 1e-6..=1.0 + 1e-6).contains(&reward)
}

/// n choose k as a float; 0.0 when k > n.
fn comb(n: usize, k: usize) -> f64 {
    if k > n {
        return 0.0;
    }
    (0..k).fold(1.0, |acc, i| acc * (n - i) as f64 / (i + 1) as f64)
}

/// Compute metrics over a set of episode records spanning one or more trials.
pub fn compute(results: &[EpisodeResult]) -> Option<Metrics> {
    if results.is_empty() {
        return None;
    }

    let average_reward =
        results.iter().map(|r| r.reward).sum::<f64>() / results.len() as f64;

    let num_trials = results
        .iter()
        .map(|r| r.trial)
        .collect::<std::collections::BTreeSet<_>>()
        .len();

    // Per-task success counts across trials.
    let mut successes_per_task: BTreeMap<&str, usize> = BTreeMap::new();
    for result in results {
        *successes_per_task.entry(result.task_id.as_str()).or_default() +=
            usize::from(is_successful(result.reward));
    }

    let num_tasks = successes_per_task.len();
    let pass_hat_k = (1..=num_trials)
        .map(|k| {
            let sum: f64 = successes_per_task
                .values()
                .map(|&c| comb(c, k) / comb(num_trials, k))
                .sum();
            sum / num_tasks as f64
        })
        .collect();

    Some(Metrics {
        average_reward,
        pass_hat_k,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(task_id: &str, trial: usize, reward: f64) -> EpisodeResult {
        EpisodeResult {
            episode_id: uuid::Uuid::new_v4().to_string(),
            task_id: task_id.to_string(),
            reward,
            info: json!({}),
            messages: vec![],
            trial,
            finished_at: chrono::Utc::now(),
        }
    }

    #[test]
    fn comb_matches_known_values() {
        assert_eq!(comb(4, 2), 6.0);
        assert_eq!(comb(5, 0), 1.0);
        assert_eq!(comb(3, 5), 0.0);
    }

    #[test]
    fn single_trial_pass_1_is_success_rate() {
        let results = vec![
            record("a", 0, 1.0),
            record("b", 0, 0.0),
            record("c", 0, 1.0),
            record("d", 0, 0.0),
        ];
        let metrics = compute(&results).unwrap();
        assert!((metrics.average_reward - 0.5).abs() < 1e-9);
        assert_eq!(metrics.pass_hat_k.len(), 1);
        assert!((metrics.pass_hat_k[0] - 0.5).abs() < 1e-9);
    }

    #[test]
    fn flaky_task_lowers_pass_2() {
        // Task "a" passes both trials, task "b" passes one of two.
        let results = vec![
            record("a", 0, 1.0),
            record("a", 1, 1.0),
            record("b", 0, 1.0),
            record("b", 1, 0.0),
        ];
        let metrics = compute(&results).unwrap();
        // pass^1 = (2/2 + 1/2) / 2 = 0.75
        assert!((metrics.pass_hat_k[0] - 0.75).abs() < 1e-9);
        // pass^2 = (1 + 0) / 2 = 0.5
        assert!((metrics.pass_hat_k[1] - 0.5).abs() < 1e-9);
    }

    #[test]
    fn empty_results_yield_none() {
        assert!(compute(&[]).is_none());
    }
}
