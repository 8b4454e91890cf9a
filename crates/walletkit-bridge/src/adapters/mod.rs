//! Adapters: instruction codec, readiness gate, in-process engine worker.

pub mod command;
pub mod engine;
pub mod readiness;

pub use command::{EngineInstruction, InstructionError, PayloadEncoding, RenderedInstruction};
pub use engine::EngineWorker;
pub use readiness::{Readiness, ReadinessGate};
