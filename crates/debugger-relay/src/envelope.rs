//! Relay envelopes
//!
//! Inbound messages are JSON objects with a `method` and usually an `id`;
//! replies carry `replyID` and an optional `result`.

use std::collections::HashMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Methods the relay handles itself; everything else goes to the bridge
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RelayMethod {
    PrepareJsRuntime,
    ExecuteApplicationScript,
    Bridge(String),
}

impl RelayMethod {
    pub fn from_name(name: &str) -> Self {
        match name {
            "prepareJSRuntime" => RelayMethod::PrepareJsRuntime,
            "executeApplicationScript" => RelayMethod::ExecuteApplicationScript,
            other => RelayMethod::Bridge(other.to_string()),
        }
    }
}

/// One inbound message
#[derive(Debug, Clone, PartialEq)]
pub struct RelayEnvelope {
    pub method: String,
    pub id: Option<Value>,
    /// The whole message object
    pub payload: Value,
}

impl RelayEnvelope {
    /// Parse a text frame. `Ok(None)` means valid JSON without a method.
    pub fn parse(text: &str) -> Result<Option<Self>, serde_json::Error> {
        let payload: Value = serde_json::from_str(text)?;
        let method = payload
            .get("method")
            .and_then(Value::as_str)
            .filter(|m| !m.is_empty())
            .map(str::to_string);

        Ok(method.map(|method| Self {
            method,
            id: payload.get("id").cloned(),
            payload,
        }))
    }

    pub fn method(&self) -> RelayMethod {
        RelayMethod::from_name(&self.method)
    }

    /// Positional arguments for a bridge call
    pub fn arguments(&self) -> Vec<Value> {
        self.payload
            .get("arguments")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default()
    }
}

/// Payload of `executeApplicationScript`
#[derive(Debug, Clone, Deserialize)]
pub struct ExecuteScriptParams {
    pub url: String,
    /// Global name -> JSON text
    #[serde(default)]
    pub inject: HashMap<String, String>,
}

/// Outbound reply
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Acknowledgment {
    #[serde(rename = "replyID", skip_serializing_if = "Option::is_none")]
    pub reply_id: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
}
