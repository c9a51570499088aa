//! services/runner/src/lib.rs
//!
//! Library surface of the test runner: configuration, errors, the
//! adapters that implement the core ports, and the session flows.

pub mod adapters;
pub mod config;
pub mod error;
pub mod flow;
