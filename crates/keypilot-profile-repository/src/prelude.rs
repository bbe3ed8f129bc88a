//! Convenience re-exports for common types

pub use crate::repository::{ProfileRepository, SharedRepository};
pub use crate::storage::{JsonFileStore, MemoryStore, ProfileStore};
pub use keypilot_errors::RepositoryError;

pub use keypilot_profile::{KeyMapping, Profile, ProfileId};
