//! Common error types and utilities used across all KeyPilot crates.
//!
//! This module provides the top-level error enum that can wrap all sub-errors,
//! along with error classification and severity levels.

use core::fmt;

use crate::{RepositoryError, ResolutionError, SwitcherError, UploadError};

/// Top-level error type that can wrap all KeyPilot sub-errors.
#[derive(Debug, thiserror::Error)]
pub enum KeyPilotError {
    /// Device upload errors
    #[error("Upload error: {0}")]
    Upload(#[from] UploadError),

    /// Profile repository errors
    #[error("Repository error: {0}")]
    Repository(#[from] RepositoryError),

    /// Profile resolution errors
    #[error("Resolution error: {0}")]
    Resolution(#[from] ResolutionError),

    /// Switching engine errors
    #[error("Switcher error: {0}")]
    Switcher(#[from] SwitcherError),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[source] std::io::Error),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),
}

impl KeyPilotError {
    /// Get the error category for classification.
    pub fn category(&self) -> ErrorCategory {
        match self {
            KeyPilotError::Upload(_) => ErrorCategory::Device,
            KeyPilotError::Repository(_) => ErrorCategory::Repository,
            KeyPilotError::Resolution(_) => ErrorCategory::Resolution,
            KeyPilotError::Switcher(_) => ErrorCategory::Engine,
            KeyPilotError::Io(_) => ErrorCategory::IO,
            KeyPilotError::Config(_) => ErrorCategory::Config,
        }
    }

    /// Get the error severity level.
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            KeyPilotError::Upload(e) => e.severity(),
            KeyPilotError::Repository(e) => e.severity(),
            KeyPilotError::Resolution(_) => ErrorSeverity::Info,
            KeyPilotError::Switcher(e) => e.severity(),
            KeyPilotError::Io(_) => ErrorSeverity::Error,
            KeyPilotError::Config(_) => ErrorSeverity::Critical,
        }
    }

    /// Check if this error is recoverable.
    pub fn is_recoverable(&self) -> bool {
        self.severity() < ErrorSeverity::Critical
    }

    /// Create a configuration error with a message.
    pub fn config(msg: impl Into<String>) -> Self {
        KeyPilotError::Config(msg.into())
    }
}

impl From<std::io::Error> for KeyPilotError {
    fn from(e: std::io::Error) -> Self {
        KeyPilotError::Io(e)
    }
}

/// Error category for classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ErrorCategory {
    /// Device and upload errors
    Device = 0,
    /// Profile repository errors
    Repository = 1,
    /// Profile resolution errors
    Resolution = 2,
    /// Configuration errors
    Config = 3,
    /// I/O errors
    IO = 4,
    /// Switching engine errors
    Engine = 5,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorCategory::Device => write!(f, "Device"),
            ErrorCategory::Repository => write!(f, "Repository"),
            ErrorCategory::Resolution => write!(f, "Resolution"),
            ErrorCategory::Config => write!(f, "Config"),
            ErrorCategory::IO => write!(f, "IO"),
            ErrorCategory::Engine => write!(f, "Engine"),
        }
    }
}

/// Error severity level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
pub enum ErrorSeverity {
    /// Informational, no action required
    Info = 0,
    /// Warning, may require attention
    Warning = 1,
    /// Error, operation failed
    Error = 2,
    /// Critical, the process cannot continue as configured
    Critical = 3,
}

impl fmt::Display for ErrorSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorSeverity::Info => write!(f, "INFO"),
            ErrorSeverity::Warning => write!(f, "WARN"),
            ErrorSeverity::Error => write!(f, "ERROR"),
            ErrorSeverity::Critical => write!(f, "CRITICAL"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_category_display() {
        assert_eq!(ErrorCategory::Device.to_string(), "Device");
        assert_eq!(ErrorCategory::Repository.to_string(), "Repository");
        assert_eq!(ErrorCategory::Resolution.to_string(), "Resolution");
    }

    #[test]
    fn test_error_severity_ordering() {
        assert!(ErrorSeverity::Critical > ErrorSeverity::Error);
        assert!(ErrorSeverity::Error > ErrorSeverity::Warning);
        assert!(ErrorSeverity::Warning > ErrorSeverity::Info);
    }

    #[test]
    fn test_keypilot_error_category() {
        let err: KeyPilotError = UploadError::DeviceNotConnected.into();
        assert_eq!(err.category(), ErrorCategory::Device);

        let err = KeyPilotError::config("bad debounce");
        assert_eq!(err.category(), ErrorCategory::Config);
        assert!(!err.is_recoverable());
    }

    #[test]
    fn test_keypilot_error_is_std_error() {
        let err: KeyPilotError = UploadError::DeviceNotConnected.into();
        let _: &dyn std::error::Error = &err;
    }
}
