//! # Omega Testing Utils
//!
//! Shared testing utilities for the Omega connector crates.
//!
//! ## Features
//!
//! - **Mock Senders**: scripted in-memory Alpha endpoints
//! - **Mock Handlers**: compensation handler that records commands
//! - **Test Data Builders**: `TxEventBuilder` with unique ids
//! - **Helpers**: polling helpers for background tasks
//!
//! ## Usage
//!
//! ```toml
//! [dev-dependencies]
//! omega-testing-utils = { path = "../testing-utils" }
//! ```

pub mod builders;
pub mod helpers;
pub mod mocks;

pub use builders::*;
pub use helpers::*;
pub use mocks::*;
