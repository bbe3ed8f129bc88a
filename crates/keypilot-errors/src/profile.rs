//! Profile repository and resolution error types.

use crate::common::ErrorSeverity;

/// Profile repository errors.
///
/// # Fail-open persistence
///
/// [`RepositoryError::PersistFailed`] is returned *after* the in-memory
/// mutation has been applied. Callers must treat it as "the change is live for
/// this session but was not written to disk", never as "nothing happened".
///
/// # Examples
///
/// ```
/// use keypilot_errors::{RepositoryError, ErrorSeverity};
///
/// let err = RepositoryError::not_found("6f1c0d1e");
/// assert_eq!(err.severity(), ErrorSeverity::Warning);
/// assert!(!err.is_persistence_failure());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RepositoryError {
    /// No profile with this identifier exists
    #[error("Profile not found: {0}")]
    ProfileNotFound(String),

    /// A profile with this identifier already exists
    #[error("Profile already exists: {0}")]
    DuplicateId(String),

    /// Writing the profile document failed; the in-memory change stands
    #[error("Failed to persist profiles to {path}: {reason}")]
    PersistFailed {
        /// Target document path
        path: String,
        /// Failure reason
        reason: String,
    },

    /// Reading or parsing the profile document failed
    #[error("Failed to load profiles from {path}: {reason}")]
    LoadFailed {
        /// Source document path
        path: String,
        /// Failure reason
        reason: String,
    },
}

impl RepositoryError {
    /// Create a not-found error.
    pub fn not_found(id: impl Into<String>) -> Self {
        Self::ProfileNotFound(id.into())
    }

    /// Create a persistence error.
    pub fn persist_failed(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::PersistFailed {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Create a load error.
    pub fn load_failed(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::LoadFailed {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Get the error severity.
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            RepositoryError::ProfileNotFound(_) => ErrorSeverity::Warning,
            RepositoryError::DuplicateId(_) => ErrorSeverity::Warning,
            RepositoryError::PersistFailed { .. } => ErrorSeverity::Error,
            RepositoryError::LoadFailed { .. } => ErrorSeverity::Error,
        }
    }

    /// True when the in-memory state changed but could not be written.
    pub fn is_persistence_failure(&self) -> bool {
        matches!(self, RepositoryError::PersistFailed { .. })
    }
}

/// Profile resolution errors.
///
/// Resolution misses are expected (most applications have no profile and
/// there may be no default); they are logged, never shown to the user.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ResolutionError {
    /// Neither a specific nor a default profile matched the application
    #[error("No profile matched application '{0}' and no default is set")]
    NoProfileMatched(String),
}
