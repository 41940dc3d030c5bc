//! Envelope dispatch
//!
//! Routes each inbound envelope to its handler and sends at most one reply
//! through the connection it arrived on.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use serde_json::Value;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use rn_droid_core::config::RelayConfig;

use crate::bridge::empty_queue;
use crate::envelope::{Acknowledgment, ExecuteScriptParams, RelayEnvelope, RelayMethod};
use crate::runtime::{ScriptError, ScriptRuntime};

/// Whether a failed `executeApplicationScript` is still acknowledged
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ScriptAckPolicy {
    /// Reply only once the script was imported; failures leave the request open
    #[default]
    AckOnSuccess,
    /// Reply whether or not the import worked
    AlwaysAck,
}

impl ScriptAckPolicy {
    pub fn from_config(config: &RelayConfig) -> Self {
        if config.ack_failed_scripts {
            ScriptAckPolicy::AlwaysAck
        } else {
            ScriptAckPolicy::AckOnSuccess
        }
    }

    fn acknowledges_failure(self) -> bool {
        self == ScriptAckPolicy::AlwaysAck
    }
}

/// Reply slot for one request, bound to the connection it came from.
///
/// `send` consumes the responder, so a request is answered at most once.
#[derive(Debug)]
pub struct Responder {
    outbound: mpsc::UnboundedSender<String>,
    reply_id: Option<Value>,
}

impl Responder {
    pub fn new(outbound: mpsc::UnboundedSender<String>, reply_id: Option<Value>) -> Self {
        Self { outbound, reply_id }
    }

    /// Queue the reply; returns false if the connection is already gone
    pub fn send(self, result: Option<Value>) -> bool {
        let ack = Acknowledgment {
            reply_id: self.reply_id,
            result,
        };
        let text = match serde_json::to_string(&ack) {
            Ok(text) => text,
            Err(err) => {
                warn!("Cannot encode reply: {}", err);
                return false;
            }
        };

        if self.outbound.send(text).is_err() {
            debug!("Connection closed before reply {:?}, dropping it", ack.reply_id);
            return false;
        }
        true
    }
}

/// Routes envelopes to the built-in handlers or the bridge
pub struct Dispatcher {
    runtime: Arc<ScriptRuntime>,
    script_policy: ScriptAckPolicy,
}

impl Dispatcher {
    pub fn new(runtime: Arc<ScriptRuntime>) -> Self {
        Self {
            runtime,
            script_policy: ScriptAckPolicy::default(),
        }
    }

    pub fn with_script_policy(mut self, policy: ScriptAckPolicy) -> Self {
        self.script_policy = policy;
        self
    }

    pub fn runtime(&self) -> &Arc<ScriptRuntime> {
        &self.runtime
    }

    /// Handle one envelope. Everything except the script import finishes
    /// before this returns; the import runs on its own task.
    pub fn dispatch(&self, envelope: RelayEnvelope, responder: Responder) {
        match envelope.method() {
            RelayMethod::PrepareJsRuntime => {
                info!("Relay got prepareJSRuntime");
                responder.send(None);
            }
            RelayMethod::ExecuteApplicationScript => {
                info!("Relay got executeApplicationScript");
                self.execute_application_script(envelope, responder);
            }
            RelayMethod::Bridge(method) => self.call_bridge(&method, &envelope, responder),
        }
    }

    fn execute_application_script(&self, envelope: RelayEnvelope, responder: Responder) {
        let prepared = serde_json::from_value::<ExecuteScriptParams>(envelope.payload)
            .map_err(|e| ScriptError::InvalidPayload(e.to_string()))
            .and_then(|params| {
                self.runtime.inject(&params.inject)?;
                Ok(params.url)
            });

        let url = match prepared {
            Ok(url) => url,
            Err(err) => {
                self.script_failed(&err, responder);
                return;
            }
        };

        let runtime = Arc::clone(&self.runtime);
        let policy = self.script_policy;
        tokio::spawn(async move {
            match runtime.import_script(&url).await {
                Ok(_) => {
                    responder.send(None);
                }
                Err(err) => {
                    warn!("Script {} failed: {}", url, err);
                    if policy.acknowledges_failure() {
                        responder.send(None);
                    }
                }
            }
        });
    }

    fn script_failed(&self, err: &ScriptError, responder: Responder) {
        warn!("executeApplicationScript failed: {}", err);
        if self.script_policy.acknowledges_failure() {
            responder.send(None);
        }
    }

    fn call_bridge(&self, method: &str, envelope: &RelayEnvelope, responder: Responder) {
        let args = envelope.arguments();
        let outcome = catch_unwind(AssertUnwindSafe(|| self.runtime.call_bridge(method, &args)));

        let value = match outcome {
            Ok(Ok(value)) => value,
            Ok(Err(err)) => {
                debug!("Bridge call {} answered with empty queue: {}", method, err);
                empty_queue()
            }
            Err(_) => {
                warn!("Bridge method {} panicked", method);
                empty_queue()
            }
        };

        // A handler that returns nothing leaves `result` out of the reply.
        if value.is_null() {
            responder.send(None);
            return;
        }
        let text = serde_json::to_string(&value).unwrap_or_else(|_| empty_queue().to_string());
        responder.send(Some(Value::String(text)));
    }
}
