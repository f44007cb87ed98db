//! Cross-module tests.
//!
//! - `determinism.rs`: parallel runs produce the same tables as sequential ones
//! - `integration.rs`: full pipelines over on-disk batches
//! - `helpers.rs`: fixture writers shared with the unit tests

pub(crate) mod helpers;
