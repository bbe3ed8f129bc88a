//! Shared test utilities for KeyPilot.
//!
//! # Modules
//!
//! - [`mod@must`] - Unwrap helpers with good error messages and `#[track_caller]`
//! - [`mock`] - Recording device port for engine tests
//! - [`fixtures`] - Profile fixtures for common scenarios
//! - [`prelude`] - Convenience re-exports
//!
//! # Usage
//!
//! ```toml
//! [dev-dependencies]
//! keypilot-test-helpers = { workspace = true }
//! ```
//!
//! ```rust,ignore
//! use keypilot_test_helpers::prelude::*;
//! ```

#![deny(unsafe_op_in_unsafe_fn)]
#![allow(clippy::unwrap_used, clippy::panic)]

pub mod must;
pub mod prelude;

#[cfg(feature = "mock")]
pub mod mock;

#[cfg(feature = "fixtures")]
pub mod fixtures;

pub use must::*;
