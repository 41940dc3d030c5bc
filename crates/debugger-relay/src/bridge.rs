//! Bridge registry
//!
//! Methods the runtime exposes to remote callers, looked up by name.

use std::collections::HashMap;
use std::fmt;
use serde_json::{json, Value};

/// Bridge errors
#[derive(Debug, thiserror::Error)]
pub enum BridgeError {
    #[error("Bridge is not installed")]
    Unavailable,
    #[error("Bridge has no method {0}")]
    UnknownMethod(String),
    #[error("Bridge method {method} failed: {message}")]
    Invocation { method: String, message: String },
}

type BridgeHandler = Box<dyn Fn(&[Value]) -> Result<Value, BridgeError> + Send + Sync>;

/// Reply used when a bridge call produced nothing usable: five empty queues
pub fn empty_queue() -> Value {
    json!([[], [], [], [], []])
}

/// Name -> handler table
#[derive(Default)]
pub struct BridgeRegistry {
    handlers: HashMap<String, BridgeHandler>,
}

impl BridgeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler, replacing any previous one with the same name
    pub fn register<F>(&mut self, name: impl Into<String>, handler: F) -> &mut Self
    where
        F: Fn(&[Value]) -> Result<Value, BridgeError> + Send + Sync + 'static,
    {
        self.handlers.insert(name.into(), Box::new(handler));
        self
    }

    pub fn contains(&self, name: &str) -> bool {
        self.handlers.contains_key(name)
    }

    pub fn invoke(&self, name: &str, args: &[Value]) -> Result<Value, BridgeError> {
        let handler = self
            .handlers
            .get(name)
            .ok_or_else(|| BridgeError::UnknownMethod(name.to_string()))?;
        handler(args)
    }
}

impl fmt::Debug for BridgeRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<&String> = self.handlers.keys().collect();
        names.sort();
        f.debug_struct("BridgeRegistry").field("methods", &names).finish()
    }
}
