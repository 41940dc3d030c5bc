//! Debugger Relay
//!
//! Connects to the packager's debugger proxy and answers its requests on
//! behalf of the app's script runtime.

pub mod bridge;
pub mod dispatch;
pub mod envelope;
pub mod relay;
pub mod runtime;

pub use bridge::{empty_queue, BridgeError, BridgeRegistry};
pub use dispatch::{Dispatcher, Responder, ScriptAckPolicy};
pub use envelope::{Acknowledgment, ExecuteScriptParams, RelayEnvelope, RelayMethod};
pub use relay::{DebuggerRelay, RelayError, RelayHandle, RelayOptions, RelayState, DEFAULT_RECONNECT_DELAY};
pub use runtime::{ScriptDownloader, ScriptError, ScriptImporter, ScriptRuntime};
