//! Embedded retail snapshot data and the loader over it.
//!
//! The loader returns a fresh copy on every call so each episode (and each
//! ground-truth replay inside reward calculation) starts from the same
//! pristine baseline.

use std::sync::Arc;

use serde_json::{json, Value};

use crate::env::SnapshotLoader;

/// A fresh retail snapshot: users, orders, and products.
pub fn sample_data() -> Value {
    json!({
        "users": {
            "mia_li_3668": {
                "name": {"first_name": "Mia", "last_name": "Li"},
                "email": "mia.li@example.com",
                "address": {
                    "address1": "123 Elm Street",
                    "city": "San Francisco",
                    "state": "CA",
                    "zip": "94016"
                },
                "orders": ["#W1001", "#W1002"]
            },
            "ethan_moore_2139": {
                "name": {"first_name": "Ethan", "last_name": "Moore"},
                "email": "ethan.moore@example.com",
                "address": {
                    "address1": "44 Birch Avenue",
                    "city": "Portland",
                    "state": "OR",
                    "zip": "97035"
                },
                "orders": ["#W2001"]
            }
        },
        "orders": {
            "#W1001": {
                "order_id": "#W1001",
                "user_id": "mia_li_3668",
                "status": "pending",
                "address": {
                    "address1": "123 Elm Street",
                    "city": "San Francisco",
                    "state": "CA",
                    "zip": "94016"
                },
                "items": [
                    {
                        "item_id": "item_7310",
                        "name": "Wireless Headphones",
                        "price": 69.99,
                        "quantity": 1
                    },
                    {
                        "item_id": "item_2402",
                        "name": "Stainless Water Bottle",
                        "price": 24.99,
                        "quantity": 1
                    }
                ],
                "total": 94.98
            },
            "#W1002": {
                "order_id": "#W1002",
                "user_id": "mia_li_3668",
                "status": "delivered",
                "address": {
                    "address1": "123 Elm Street",
                    "city": "San Francisco",
                    "state": "CA",
                    "zip": "94016"
                },
                "items": [
                    {
                        "item_id": "item_5113",
                        "name": "Running Jacket",
                        "price": 59.99,
                        "quantity": 1
                    },
                    {
                        "item_id": "item_2402",
                        "name": "Stainless Water Bottle",
                        "price": 24.99,
                        "quantity": 1
                    }
                ],
                "total": 84.98
            },
            "#W2001": {
                "order_id": "#W2001",
                "user_id": "ethan_moore_2139",
                "status": "pending",
                "address": {
                    "address1": "44 Birch Avenue",
                    "city": "Portland",
                    "state": "OR",
                    "zip": "97035"
                },
                "items": [
                    {
                        "item_id": "item_9029",
                        "name": "Mechanical Keyboard",
                        "price": 129.99,
                        "quantity": 1
                    }
                ],
                "total": 129.99
            }
        },
        "products": {
            "p_100": {"product_id": "p_100", "name": "Wireless Headphones", "price": 69.99},
            "p_101": {"product_id": "p_101", "name": "Stainless Water Bottle", "price": 24.99},
            "p_102": {"product_id": "p_102", "name": "Running Jacket", "price": 59.99},
            "p_103": {"product_id": "p_103", "name": "Mechanical Keyboard", "price": 129.99}
        }
    })
}

/// Snapshot loader handing out a fresh copy per call.
pub fn loader() -> SnapshotLoader {
    Arc::new(sample_data)
}
