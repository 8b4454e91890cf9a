//! # WalletKit Test Suite
//!
//! ## Structure
//!
//! ```text
//! tests/src/
//! ├── fixtures.rs        # Bridge + harness builders, shared timeouts
//! ├── engine.rs          # Scripted in-process wallet engine
//! └── integration/
//!     ├── init_flows.rs      # Auto-init: exactly once, retry after failure
//!     ├── call_flows.rs      # Correlation under concurrency and reordering
//!     ├── event_flows.rs     # Fan-out, dynamic handlers, request objects
//!     └── engine_flows.rs    # Full round trips through the engine thread
//! ```
//!
//! ## Running Tests
//!
//! ```bash
//! cargo test -p walletkit-tests
//! cargo test -p walletkit-tests integration::event_flows
//! cargo bench -p walletkit-tests
//! ```

#![allow(dead_code)]

pub mod engine;
pub mod fixtures;
pub mod integration;
