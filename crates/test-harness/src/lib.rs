//! Test harness for the conversion pipeline.
//!
//! Provides a scripted driver for conversions, mesh oracles that collect
//! verdicts instead of panicking, and assertion helpers with diagnostics.
//!
//! # Key Components
//!
//! - [`ModelBuilder`]: fluent API for converting named shapes and checking them
//! - [`oracle`]: verification functions returning pass/fail verdicts
//! - [`fixtures`]: shape documents exercising edge cases
//! - [`helpers`]: error type and mesh math
//! - [`assertions`]: rich assertion helpers with diagnostics

pub mod assertions;
pub mod fixtures;
pub mod helpers;
pub mod oracle;
pub mod workflow;

pub use helpers::HarnessError;
pub use oracle::OracleVerdict;
pub use workflow::ModelBuilder;
