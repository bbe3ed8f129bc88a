//! Centralized error types for KeyPilot
//!
//! This crate provides the error taxonomy shared by the profile repository,
//! the device sync port and the profile switching engine.
//!
//! # Architecture
//!
//! - [`common`]: Top-level error type, categories and severity levels
//! - [`device`]: Errors raised while writing a configuration to the device
//! - [`engine`]: Errors from the switching engine handle
//! - [`profile`]: Repository persistence and profile resolution errors
//!
//! # Propagation
//!
//! Upload errors never escape the switching engine as fatal conditions: they
//! become the engine's `last_error` state. Repository persistence errors are
//! reported to the caller, but the in-memory mutation they accompany stays
//! applied for the rest of the session.
//!
//! # Example
//!
//! ```
//! use keypilot_errors::prelude::*;
//!
//! let err = UploadError::from_tool_failure(1, "error: No device found");
//! assert!(matches!(err, UploadError::DeviceNotConnected));
//! assert_eq!(err.severity(), ErrorSeverity::Warning);
//! ```

#![deny(unsafe_op_in_unsafe_fn, clippy::unwrap_used)]
#![warn(missing_docs, rust_2018_idioms)]

pub mod common;
pub mod device;
pub mod engine;
pub mod prelude;
pub mod profile;

pub use common::{ErrorCategory, ErrorSeverity, KeyPilotError};
pub use device::UploadError;
pub use engine::SwitcherError;
pub use profile::{RepositoryError, ResolutionError};

/// A specialized `Result` type for KeyPilot operations.
pub type Result<T> = std::result::Result<T, KeyPilotError>;
