//! The retail customer-service domain: embedded snapshot data, the tool set,
//! the task catalog, and the domain gate policy.

pub mod data;
pub mod tasks;
pub mod tools;

pub use data::{loader, sample_data};
pub use tasks::{policy, tasks};
pub use tools::registry;

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use serde_json::{Map, Value};

    use crate::env::{Env, RewardInfo, ScriptedUser};
    use crate::tools::gate::LenientGate;
    use crate::types::Action;

    fn retail_env(task_index: usize) -> Env {
        Env::new(
            super::loader(),
            super::registry(),
            Arc::new(super::tasks()),
            Box::new(ScriptedUser::new("Hi, I need some help with my orders.", vec![])),
            Arc::new(LenientGate),
            Some(task_index),
        )
        .unwrap()
    }

    fn string_args(pairs: &[(&str, &str)]) -> Map<String, Value> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), Value::String(v.to_string())))
            .collect()
    }

    #[test]
    fn cancelling_the_right_order_passes() {
        let mut env = retail_env(0);
        env.reset(Some(0)).unwrap();

        // A different tool order than the ground-truth script, but the same
        // end state.
        env.step(Action::tool(
            "get_user_details",
            string_args(&[("user_id", "mia_li_3668")]),
        ));
        env.step(Action::tool(
            "cancel_pending_order",
            string_args(&[("order_id", "#W1001")]),
        ));

        let response = env.step(Action::respond("Your order #W1001 is cancelled."));
        assert!(response.done);
        assert_eq!(response.reward, 1.0);
    }

    #[test]
    fn cancelling_the_wrong_order_fails() {
        let mut env = retail_env(0);
        env.reset(Some(0)).unwrap();

        env.step(Action::tool(
            "cancel_pending_order",
            string_args(&[("order_id", "#W2001")]),
        ));

        let response = env.step(Action::respond("Your order is cancelled."));
        assert!(response.done);
        assert_eq!(response.reward, 0.0);
        match response.info.reward_info.unwrap().info {
            RewardInfo::Actions { r_actions, .. } => assert!(!r_actions),
            other => panic!("expected action info, got {other:?}"),
        }
    }

    #[test]
    fn doing_nothing_on_a_mutation_task_fails() {
        let mut env = retail_env(0);
        env.reset(Some(0)).unwrap();

        let response = env.step(Action::respond("I cannot help with that."));
        assert!(response.done);
        assert_eq!(response.reward, 0.0);
    }

    #[test]
    fn address_move_task_requires_both_updates() {
        let mut env = retail_env(1);
        env.reset(Some(1)).unwrap();

        env.step(Action::tool(
            "update_user_address",
            string_args(&[
                ("user_id", "ethan_moore_2139"),
                ("address1", "9 Cedar Court"),
                ("city", "Salem"),
                ("state", "OR"),
                ("zip", "97301"),
            ]),
        ));
        // Forgets to move the pending order.
        let response = env.step(Action::respond("All done!"));
        assert!(response.done);
        assert_eq!(response.reward, 0.0);
    }

    #[test]
    fn reporting_the_delivered_total_passes() {
        let mut env = retail_env(2);
        env.reset(Some(2)).unwrap();

        env.step(Action::tool(
            "get_order_details",
            string_args(&[("order_id", "#W1002")]),
        ));
        let response = env.step(Action::respond(
            "You paid $84.98 in total for order #W1002.",
        ));
        assert!(response.done);
        assert_eq!(response.reward, 1.0);
        match response.info.reward_info.unwrap().info {
            RewardInfo::Outputs { r_outputs, outputs } => {
                assert_eq!(r_outputs, 1.0);
                assert!(outputs["84.98"]);
            }
            other => panic!("expected output info, got {other:?}"),
        }
    }

    #[test]
    fn transfer_tool_terminates_the_episode() {
        let mut env = retail_env(0);
        env.reset(Some(0)).unwrap();

        let response = env.step(Action::tool(
            "transfer_to_human_agent",
            string_args(&[("summary", "User needs help beyond my tools.")]),
        ));
        assert!(response.done);
        assert_eq!(response.observation, "Transfer successful");
        // The snapshot was never mutated, so the cancel task's ground truth
        // does not match.
        assert_eq!(response.reward, 0.0);
    }
}
