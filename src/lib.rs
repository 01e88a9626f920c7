//! Gauntlet: an evaluation harness for tool-using conversational agents.
//!
//! An agent is dropped into an episode against a task (e.g. a retail
//! customer-service scenario): it calls tools that read and mutate an
//! in-memory database snapshot, talks to a simulated user, and every action
//! passes through a supervision gate before it may execute. When the episode
//! ends, the reward engine scores it with no human in the loop -- either by
//! matching expected output strings against the agent's responses, or by
//! comparing a canonical hash of the final snapshot against the hash produced
//! by replaying the task's ground-truth action sequence.

pub mod config;
pub mod env;
pub mod hash;
pub mod retail;
pub mod runner;
pub mod tools;
pub mod types;
