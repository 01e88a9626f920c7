//! Episode environment: snapshot ownership, the step/reset state machine,
//! the user simulator seam, and the reward engine.

pub mod environment;
pub mod reward;
pub mod user;

pub use environment::{Env, SnapshotLoader};
pub use reward::{RewardInfo, RewardResult};
pub use user::{RemoteUser, ScriptedUser, UserSimulator};
