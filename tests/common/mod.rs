//! Common test infrastructure
//!
//! Fixtures and scripted collaborators shared by the end-to-end pipeline
//! tests. Tests should only import from this module, not from internal
//! submodules.

mod analyzer;
mod constants;
mod fixtures;

pub use analyzer::{CannedProvider, ScriptedAnalyzer};
pub use constants::*;
pub use fixtures::{quick_settings, raw_review, seeded_store, TestRun};
