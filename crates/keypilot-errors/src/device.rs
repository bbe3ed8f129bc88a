//! Device upload error types.
//!
//! These are the failures a device sync port can report for a single
//! `upload` attempt. They are `Clone` so the switching engine can keep the
//! latest one in its observable state and hand copies to waiting callers.

use crate::common::ErrorSeverity;

/// Diagnostic substrings that mark a tool failure as "device not connected".
///
/// Matched case-insensitively against the tool's stderr. This is a heuristic,
/// not a structured signal from the tool.
pub const DISCONNECTED_MARKERS: &[&str] = &["no device", "not found", "usb"];

/// Failure of a single upload attempt.
///
/// # Examples
///
/// ```
/// use keypilot_errors::{UploadError, ErrorSeverity};
///
/// let err = UploadError::from_tool_failure(2, "USB transfer failed");
/// assert!(matches!(err, UploadError::DeviceNotConnected));
///
/// let err = UploadError::from_tool_failure(2, "invalid key 'foo'");
/// assert_eq!(err.severity(), ErrorSeverity::Error);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum UploadError {
    /// The external sync tool is missing or not executable
    #[error("ch57x-keyboard-tool not found at: {0}")]
    ToolUnavailable(String),

    /// The tool ran but could not reach the device
    #[error("Keyboard not connected")]
    DeviceNotConnected,

    /// The tool exited unsuccessfully for another reason
    #[error("Upload failed (exit {code}): {message}")]
    ProcessFailure {
        /// Process exit code, `-1` when terminated by a signal
        code: i32,
        /// Diagnostic text captured from the tool
        message: String,
    },

    /// The upload did not finish within its time bound
    #[error("Upload timed out after {timeout_ms}ms")]
    Timeout {
        /// The bound that was exceeded
        timeout_ms: u64,
    },

    /// Preparing or spawning the upload failed locally
    #[error("Upload I/O error: {0}")]
    Io(String),
}

impl UploadError {
    /// Classify a non-zero tool exit using its diagnostic output.
    pub fn from_tool_failure(code: i32, stderr: &str) -> Self {
        let lowered = stderr.to_lowercase();
        if DISCONNECTED_MARKERS
            .iter()
            .any(|marker| lowered.contains(marker))
        {
            return UploadError::DeviceNotConnected;
        }

        UploadError::ProcessFailure {
            code,
            message: stderr.trim().to_string(),
        }
    }

    /// Get the error severity.
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            UploadError::ToolUnavailable(_) => ErrorSeverity::Critical,
            UploadError::DeviceNotConnected => ErrorSeverity::Warning,
            UploadError::ProcessFailure { .. } => ErrorSeverity::Error,
            UploadError::Timeout { .. } => ErrorSeverity::Warning,
            UploadError::Io(_) => ErrorSeverity::Error,
        }
    }

    /// Whether retrying without user action could plausibly succeed.
    ///
    /// The engine never retries on its own; the daemon records this on the
    /// failed-switch log line.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            UploadError::DeviceNotConnected | UploadError::Timeout { .. } | UploadError::Io(_)
        )
    }
}

impl From<std::io::Error> for UploadError {
    fn from(e: std::io::Error) -> Self {
        UploadError::Io(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disconnected_markers_are_case_insensitive() {
        for stderr in ["No Device present", "HID path NOT FOUND", "libusb: busy"] {
            assert_eq!(
                UploadError::from_tool_failure(1, stderr),
                UploadError::DeviceNotConnected,
                "stderr {stderr:?} should classify as disconnected"
            );
        }
    }

    #[test]
    fn test_other_failures_keep_code_and_message() {
        let err = UploadError::from_tool_failure(3, "  parse error at line 4\n");
        assert_eq!(
            err,
            UploadError::ProcessFailure {
                code: 3,
                message: "parse error at line 4".to_string(),
            }
        );
        assert!(err.to_string().contains("exit 3"));
    }

    #[test]
    fn test_transient_classification() {
        assert!(UploadError::DeviceNotConnected.is_transient());
        assert!(UploadError::Timeout { timeout_ms: 5000 }.is_transient());
        assert!(!UploadError::ToolUnavailable("/usr/bin/x".into()).is_transient());
    }
}
