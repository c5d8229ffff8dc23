//! Integration test utilities for the invite lifecycle
//!
//! Builds a complete in-process world: the in-memory store, a manual clock,
//! an in-process change feed, and the services on top.

pub mod fixtures;
pub mod helpers;

pub use fixtures::*;
pub use helpers::*;
