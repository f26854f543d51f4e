//! # Handlers
//!
//! Thin glue: extract, call the service, wrap the result.

pub mod games;
pub mod purchases;

use serde_json::{json, Value};

use crate::extract::ApiJson;

pub async fn health() -> ApiJson<Value> {
    ApiJson(json!({ "status": "ok" }))
}
