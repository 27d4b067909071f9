#![allow(unused_imports, dead_code)]
//! Shared test utilities for integration tests.
//!
//! # Modules
//!
//! - `mocks`: In-memory [`PtbClient`](sui_ptb_composer::PtbClient) with scripted chain state
//! - `fixtures`: Reports, templates and argument bags for the offramp scenarios
//! - `assertions`: Assertion helpers with descriptive failure messages

pub mod assertions;
pub mod fixtures;
pub mod mocks;

pub use assertions::{assert_dependencies_ordered, assert_error_contains, assert_ok};
pub use mocks::{MockPtbClient, RecordedCall};
