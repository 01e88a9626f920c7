//! Retail tool implementations.
//!
//! Each tool declares its name, a JSON function schema for the calling agent,
//! and whether it mutates the snapshot. Mutating tools are reviewed under the
//! stricter action-level supervision scope; reads and `think` under the
//! lighter read-level scope.

use std::sync::Arc;

use anyhow::{bail, Context, Result};
use serde_json::{json, Map, Value};

use crate::tools::{Tool, ToolRegistry};

fn string_arg<'a>(arguments: &'a Map<String, Value>, name: &str) -> Result<&'a str> {
    arguments
        .get(name)
        .and_then(Value::as_str)
        .with_context(|| format!("missing argument {name}"))
}

fn order_mut<'a>(data: &'a mut Value, order_id: &str) -> Result<&'a mut Value> {
    let order = data
        .get_mut("orders")
        .and_then(|orders| orders.get_mut(order_id));
    match order {
        Some(order) => Ok(order),
        None => bail!("order {order_id} not found"),
    }
}

// ---------------------------------------------------------------------------
// Read-only tools
// ---------------------------------------------------------------------------

pub struct FindUserIdByEmail;

impl Tool for FindUserIdByEmail {
    fn name(&self) -> &str {
        "find_user_id_by_email"
    }

    fn info(&self) -> Value {
        json!({
            "type": "function",
            "function": {
                "name": "find_user_id_by_email",
                "description": "Find the user id associated with an email address.",
                "parameters": {
                    "type": "object",
                    "properties": {
                        "email": {"type": "string", "description": "The user's email address."}
                    },
                    "required": ["email"]
                }
            }
        })
    }

    fn mutates_state(&self) -> bool {
        false
    }

    fn invoke(&self, data: &mut Value, arguments: &Map<String, Value>) -> Result<String> {
        let email = string_arg(arguments, "email")?;
        let users = data
            .get("users")
            .and_then(Value::as_object)
            .context("snapshot has no users table")?;
        for (user_id, user) in users {
            if user.get("email").and_then(Value::as_str) == Some(email) {
                return Ok(user_id.clone());
            }
        }
        bail!("user with email {email} not found")
    }
}

pub struct GetUserDetails;

impl Tool for GetUserDetails {
    fn name(&self) -> &str {
        "get_user_details"
    }

    fn info(&self) -> Value {
        json!({
            "type": "function",
            "function": {
                "name": "get_user_details",
                "description": "Get a user's profile, address, and order ids.",
                "parameters": {
                    "type": "object",
                    "properties": {
                        "user_id": {"type": "string", "description": "The user id, e.g. mia_li_3668."}
                    },
                    "required": ["user_id"]
                }
            }
        })
    }

    fn mutates_state(&self) -> bool {
        false
    }

    fn invoke(&self, data: &mut Value, arguments: &Map<String, Value>) -> Result<String> {
        let user_id = string_arg(arguments, "user_id")?;
        match data.get("users").and_then(|users| users.get(user_id)) {
            Some(user) => Ok(serde_json::to_string(user)?),
            None => bail!("user {user_id} not found"),
        }
    }
}

pub struct GetOrderDetails;

impl Tool for GetOrderDetails {
    fn name(&self) -> &str {
        "get_order_details"
    }

    fn info(&self) -> Value {
        json!({
            "type": "function",
            "function": {
                "name": "get_order_details",
                "description": "Get an order's status, items, address, and total.",
                "parameters": {
                    "type": "object",
                    "properties": {
                        "order_id": {"type": "string", "description": "The order id, e.g. #W1001."}
                    },
                    "required": ["order_id"]
                }
            }
        })
    }

    fn mutates_state(&self) -> bool {
        false
    }

    fn invoke(&self, data: &mut Value, arguments: &Map<String, Value>) -> Result<String> {
        let order_id = string_arg(arguments, "order_id")?;
        match data.get("orders").and_then(|orders| orders.get(order_id)) {
            Some(order) => Ok(serde_json::to_string(order)?),
            None => bail!("order {order_id} not found"),
        }
    }
}

/// A no-op scratch-pad tool; never touches the snapshot.
pub struct Think;

impl Tool for Think {
    fn name(&self) -> &str {
        "think"
    }

    fn info(&self) -> Value {
        json!({
            "type": "function",
            "function": {
                "name": "think",
                "description": "Record a thought without taking any action.",
                "parameters": {
                    "type": "object",
                    "properties": {
                        "thought": {"type": "string"}
                    },
                    "required": ["thought"]
                }
            }
        })
    }

    fn mutates_state(&self) -> bool {
        false
    }

    fn invoke(&self, _data: &mut Value, _arguments: &Map<String, Value>) -> Result<String> {
        Ok(String::new())
    }
}

// ---------------------------------------------------------------------------
// Mutating tools
// ---------------------------------------------------------------------------

pub struct UpdateUserAddress;

impl Tool for UpdateUserAddress {
    fn name(&self) -> &str {
        "update_user_address"
    }

    fn info(&self) -> Value {
        json!({
            "type": "function",
            "function": {
                "name": "update_user_address",
                "description": "Update a user's default delivery address.",
                "parameters": {
                    "type": "object",
                    "properties": {
                        "user_id": {"type": "string"},
                        "address1": {"type": "string"},
                        "city": {"type": "string"},
                        "state": {"type": "string"},
                        "zip": {"type": "string"}
                    },
                    "required": ["user_id", "address1", "city", "state", "zip"]
                }
            }
        })
    }

    fn mutates_state(&self) -> bool {
        true
    }

    fn invoke(&self, data: &mut Value, arguments: &Map<String, Value>) -> Result<String> {
        let user_id = string_arg(arguments, "user_id")?.to_string();
        let address = json!({
            "address1": string_arg(arguments, "address1")?,
            "city": string_arg(arguments, "city")?,
            "state": string_arg(arguments, "state")?,
            "zip": string_arg(arguments, "zip")?,
        });
        match data.get_mut("users").and_then(|users| users.get_mut(&user_id)) {
            Some(user) => {
                user["address"] = address;
                Ok(serde_json::to_string(user)?)
            }
            None => bail!("user {user_id} not found"),
        }
    }
}

pub struct ModifyPendingOrderAddress;

impl Tool for ModifyPendingOrderAddress {
    fn name(&self) -> &str {
        "modify_pending_order_address"
    }

    fn info(&self) -> Value {
        json!({
            "type": "function",
            "function": {
                "name": "modify_pending_order_address",
                "description": "Change the delivery address of a pending order.",
                "parameters": {
                    "type": "object",
                    "properties": {
                        "order_id": {"type": "string"},
                        "address1": {"type": "string"},
                        "city": {"type": "string"},
                        "state": {"type": "string"},
                        "zip": {"type": "string"}
                    },
                    "required": ["order_id", "address1", "city", "state", "zip"]
                }
            }
        })
    }

    fn mutates_state(&self) -> bool {
        true
    }

    fn invoke(&self, data: &mut Value, arguments: &Map<String, Value>) -> Result<String> {
        let order_id = string_arg(arguments, "order_id")?.to_string();
        let address = json!({
            "address1": string_arg(arguments, "address1")?,
            "city": string_arg(arguments, "city")?,
            "state": string_arg(arguments, "state")?,
            "zip": string_arg(arguments, "zip")?,
        });
        let order = order_mut(data, &order_id)?;
        if order.get("status").and_then(Value::as_str) != Some("pending") {
            bail!("order {order_id} is not pending");
        }
        order["address"] = address;
        Ok(serde_json::to_string(order)?)
    }
}

pub struct CancelPendingOrder;

impl Tool for CancelPendingOrder {
    fn name(&self) -> &str {
        "cancel_pending_order"
    }

    fn info(&self) -> Value {
        json!({
            "type": "function",
            "function": {
                "name": "cancel_pending_order",
                "description": "Cancel a pending order. Requires explicit user confirmation beforehand.",
                "parameters": {
                    "type": "object",
                    "properties": {
                        "order_id": {"type": "string"}
                    },
                    "required": ["order_id"]
                }
            }
        })
    }

    fn mutates_state(&self) -> bool {
        true
    }

    fn invoke(&self, data: &mut Value, arguments: &Map<String, Value>) -> Result<String> {
        let order_id = string_arg(arguments, "order_id")?.to_string();
        let order = order_mut(data, &order_id)?;
        if order.get("status").and_then(Value::as_str) != Some("pending") {
            bail!("order {order_id} is not pending");
        }
        order["status"] = json!("cancelled");
        Ok(serde_json::to_string(order)?)
    }
}

/// Escalation tool; terminating in the retail registry.
pub struct TransferToHumanAgent;

impl Tool for TransferToHumanAgent {
    fn name(&self) -> &str {
        "transfer_to_human_agent"
    }

    fn info(&self) -> Value {
        json!({
            "type": "function",
            "function": {
                "name": "transfer_to_human_agent",
                "description": "Transfer the conversation to a human agent with a summary.",
                "parameters": {
                    "type": "object",
                    "properties": {
                        "summary": {"type": "string"}
                    },
                    "required": ["summary"]
                }
            }
        })
    }

    fn mutates_state(&self) -> bool {
        true
    }

    fn invoke(&self, _data: &mut Value, arguments: &Map<String, Value>) -> Result<String> {
        let _ = string_arg(arguments, "summary")?;
        Ok("Transfer successful".to_string())
    }
}

/// The retail tool registry with its terminating-tool set.
pub fn registry() -> ToolRegistry {
    ToolRegistry::new(vec![
        Arc::new(FindUserIdByEmail),
        Arc::new(GetUserDetails),
        Arc::new(GetOrderDetails),
        Arc::new(Think),
        Arc::new(UpdateUserAddress),
        Arc::new(ModifyPendingOrderAddress),
        Arc::new(CancelPendingOrder),
        Arc::new(TransferToHumanAgent),
    ])
    .with_terminating(["transfer_to_human_agent".to_string()])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::retail::data::sample_data;

    fn args(pairs: &[(&str, &str)]) -> Map<String, Value> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), Value::String(v.to_string())))
            .collect()
    }

    #[test]
    fn find_user_by_email() {
        let mut data = sample_data();
        let id = FindUserIdByEmail
            .invoke(&mut data, &args(&[("email", "mia.li@example.com")]))
            .unwrap();
        assert_eq!(id, "mia_li_3668");

        let err = FindUserIdByEmail
            .invoke(&mut data, &args(&[("email", "nobody@example.com")]))
            .unwrap_err();
        assert!(err.to_string().contains("not found"));
    }

    #[test]
    fn cancel_requires_pending_status() {
        let mut data = sample_data();
        let obs = CancelPendingOrder
            .invoke(&mut data, &args(&[("order_id", "#W1001")]))
            .unwrap();
        assert!(obs.contains("cancelled"));
        assert_eq!(data["orders"]["#W1001"]["status"], "cancelled");

        // Delivered orders cannot be cancelled.
        let err = CancelPendingOrder
            .invoke(&mut data, &args(&[("order_id", "#W1002")]))
            .unwrap_err();
        assert!(err.to_string().contains("not pending"));
    }

    #[test]
    fn modify_address_only_touches_the_order() {
        let mut data = sample_data();
        ModifyPendingOrderAddress
            .invoke(
                &mut data,
                &args(&[
                    ("order_id", "#W2001"),
                    ("address1", "9 Cedar Court"),
                    ("city", "Salem"),
                    ("state", "OR"),
                    ("zip", "97301"),
                ]),
            )
            .unwrap();
        assert_eq!(data["orders"]["#W2001"]["address"]["city"], "Salem");
        // The user's default address is untouched.
        assert_eq!(data["users"]["ethan_moore_2139"]["address"]["city"], "Portland");
    }

    #[test]
    fn think_is_a_no_op() {
        let mut data = sample_data();
        let before = crate::hash::hash_value(&data);
        let obs = Think
            .invoke(&mut data, &args(&[("thought", "check the status first")]))
            .unwrap();
        assert!(obs.is_empty());
        assert_eq!(crate::hash::hash_value(&data), before);
    }

    #[test]
    fn registry_declares_metadata() {
        let registry = registry();
        assert_eq!(registry.len(), 8);
        assert!(registry.is_terminating("transfer_to_human_agent"));
        assert!(!registry.get("get_user_details").unwrap().mutates_state());
        assert!(registry.get("cancel_pending_order").unwrap().mutates_state());
    }
}
