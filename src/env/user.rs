//! User simulator collaborators.
//!
//! The environment delivers `respond` actions to a [`UserSimulator`] and
//! treats a reply containing [`STOP_MARKER`](crate::types::STOP_MARKER) as
//! the end of the episode. This module provides a scripted simulator for
//! tests and offline runs, and an HTTP-backed one for a live simulator
//! service.

use std::collections::VecDeque;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::types::STOP_MARKER;

/// The user side of the conversation, from the environment's perspective.
pub trait UserSimulator: Send {
    /// Start a new conversation for the given task instruction and return the
    /// user's opening utterance.
    fn reset(&mut self, instruction: &str) -> Result<String>;

    /// Deliver the agent's response and return the user's reply.
    fn step(&mut self, content: &str) -> Result<String>;

    /// Accumulated cost of the simulation so far (0.0 for scripted users).
    fn total_cost(&self) -> f64;
}

// ---------------------------------------------------------------------------
// Scripted user for tests and offline runs
// ---------------------------------------------------------------------------

/// A user that replays a canned opening utterance and reply sequence.
///
/// When the replies run out, every further reply is the stop marker, so a
/// scripted episode always terminates once the agent keeps responding.
#[derive(Debug, Clone)]
pub struct ScriptedUser {
    opening: String,
    replies: VecDeque<String>,
}

impl ScriptedUser {
    pub fn new(opening: impl Into<String>, replies: Vec<String>) -> Self {
        Self {
            opening: opening.into(),
            replies: replies.into_iter().collect(),
        }
    }
}

impl UserSimulator for ScriptedUser {
    fn reset(&mut self, instruction: &str) -> Result<String> {
        tracing::debug!(instruction, "scripted user reset");
        Ok(self.opening.clone())
    }

    fn step(&mut self, _content: &str) -> Result<String> {
        Ok(self
            .replies
            .pop_front()
            .unwrap_or_else(|| STOP_MARKER.to_string()))
    }

    fn total_cost(&self) -> f64 {
        0.0
    }
}

// ---------------------------------------------------------------------------
// HTTP-backed user simulator
// ---------------------------------------------------------------------------

/// JSON response from the user-simulator service.
#[derive(Debug, Deserialize)]
struct UserReply {
    observation: String,
    #[serde(default)]
    cost: f64,
}

/// A user simulator running behind an HTTP service.
///
/// Expected endpoints:
/// - `POST {base_url}/reset` -- body: `{"instruction": "..."}`
/// - `POST {base_url}/step`  -- body: `{"content": "..."}`
///
/// Both return JSON matching [`UserReply`].
pub struct RemoteUser {
    base_url: String,
    http: reqwest::blocking::Client,
    total_cost: f64,
}

impl RemoteUser {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            http: reqwest::blocking::Client::new(),
            total_cost: 0.0,
        }
    }
}

impl UserSimulator for RemoteUser {
    fn reset(&mut self, instruction: &str) -> Result<String> {
        self.total_cost = 0.0;

        let body = serde_json::json!({ "instruction": instruction });
        let reply: UserReply = self
            .http
            .post(format!("{}/reset", self.base_url))
            .json(&body)
            .send()
            .context("failed to reach user simulator on reset")?
            .json()
            .context("failed to parse user simulator reset response")?;

        self.total_cost += reply.cost;
        Ok(reply.observation)
    }

    fn step(&mut self, content: &str) -> Result<String> {
        let body = serde_json::json!({ "content": content });
        let reply: UserReply = self
            .http
            .post(format!("{}/step", self.base_url))
            .json(&body)
            .send()
            .context("failed to reach user simulator on step")?
            .json()
            .context("failed to parse user simulator step response")?;

        self.total_cost += reply.cost;
        Ok(reply.observation)
    }

    fn total_cost(&self) -> f64 {
        self.total_cost
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scripted_user_replays_then_stops() {
        let mut user = ScriptedUser::new(
            "Hi, I'd like to cancel my order.",
            vec!["Yes, please cancel it.".to_string()],
        );

        let opening = user.reset("Cancel order W1001.").unwrap();
        assert_eq!(opening, "Hi, I'd like to cancel my order.");

        let reply = user.step("I can cancel order W1001. Confirm?").unwrap();
        assert_eq!(reply, "Yes, please cancel it.");

        let reply = user.step("Done, your order is cancelled.").unwrap();
        assert!(reply.contains(STOP_MARKER));
        assert_eq!(user.total_cost(), 0.0);
    }
}
