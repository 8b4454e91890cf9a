//! Ports (hexagonal boundaries) of the bridge.
//!
//! - Inbound: what drives the bridge (engine callbacks, correlated calls)
//! - Outbound: what the bridge drives (the engine channel, the script engine)

pub mod inbound;
pub mod outbound;

pub use inbound::{EngineCallbacks, RpcInvoker};
pub use outbound::{ChannelError, EngineBundle, EngineChannel, EngineError, ScriptEngine};
