//! Shared utilities for edgeinsight integration tests.
//!
//! - `TestHarness` wires an orchestrator to an in-memory store with scripted
//!   collaborators
//! - builders for model answers and fetched files

pub mod builders;
pub mod harness;

pub use builders::*;
pub use harness::{
    wait_for_terminal, FakeFetcher, FaultyStore, FetchBehavior, ScriptedModel, TestHarness,
};
