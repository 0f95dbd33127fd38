#![forbid(unsafe_code)]

//! Reference fixtures and test support for Vigil.
//!
//! [`fixtures`] builds the reference world used throughout the end-to-end
//! suite: the `elements`, `season`, `person` and `community` models with
//! their seed data, plus view groups covering each dependency policy.
//! [`logging`] installs a `tracing` subscriber for tests.

pub mod fixtures;
pub mod logging;

pub use fixtures::{CallCounter, HandlerCalls, Reference};
pub use logging::init_test_logging;
