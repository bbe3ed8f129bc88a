//! Prelude module for convenient error handling imports.
//!
//! # Example
//!
//! ```
//! use keypilot_errors::prelude::*;
//!
//! fn load() -> Result<()> {
//!     Err(RepositoryError::not_found("abc").into())
//! }
//!
//! assert!(matches!(load(), Err(KeyPilotError::Repository(_))));
//! ```

pub use crate::{
    Result,
    common::{ErrorCategory, ErrorSeverity, KeyPilotError},
    device::UploadError,
    engine::SwitcherError,
    profile::{RepositoryError, ResolutionError},
};
