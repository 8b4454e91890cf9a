//! Cross-crate flows through the public bridge API.

pub mod call_flows;
pub mod engine_flows;
pub mod init_flows;
