//! Errors raised by the profile switching engine handle.

use crate::common::ErrorSeverity;

/// The engine task could not answer a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum SwitcherError {
    /// The engine task has exited
    #[error("Profile switcher is no longer running")]
    Stopped,

    /// The engine accepted the request but exited before answering
    #[error("Profile switcher dropped the reply channel")]
    ReplyDropped,
}

impl SwitcherError {
    /// Get the error severity.
    pub fn severity(&self) -> ErrorSeverity {
        ErrorSeverity::Error
    }
}
