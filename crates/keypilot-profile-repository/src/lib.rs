//! Profile storage and management for KeyPilot
//!
//! This crate provides the ordered profile collection the switching engine
//! resolves against, together with its persistence:
//! - Lookup by application identifier (first match in stored order)
//! - Lookup of the default profile, with "at most one default" enforced on
//!   every mutation
//! - Full-document persistence after every mutation, written atomically
//! - Seeding with a built-in profile set when the document is empty
//!
//! # Architecture
//!
//! - [`repository`]: Core `ProfileRepository` struct and operations
//! - [`storage`]: The `ProfileStore` trait, the atomic JSON file store and an
//!   in-memory store
//!
//! # Error Recovery
//!
//! - File writes go to a temp file first and are renamed into place
//! - A document that fails to parse is moved aside before re-seeding
//! - Persistence failures are reported but never roll back the in-memory
//!   mutation (fail-open)
//!
//! # Example
//!
//! ```no_run
//! use keypilot_profile_repository::prelude::*;
//!
//! # fn example() -> Result<(), RepositoryError> {
//! let store = JsonFileStore::new("/home/me/.config/keypilot/profiles.json");
//! let mut repo = ProfileRepository::open(store)?;
//!
//! let writer = Profile::new("Writer").with_applications(["app.writer"]);
//! repo.add(writer)?;
//!
//! let resolved = repo
//!     .find_by_application_id("app.writer")
//!     .or_else(|| repo.find_default());
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_op_in_unsafe_fn, clippy::unwrap_used)]
#![warn(missing_docs, rust_2018_idioms)]

pub mod prelude;
pub mod repository;
pub mod storage;

pub use keypilot_errors::RepositoryError;
pub use repository::{ProfileRepository, SharedRepository};
pub use storage::{JsonFileStore, MemoryStore, ProfileStore};

/// Result type for repository operations
pub type Result<T> = std::result::Result<T, RepositoryError>;
