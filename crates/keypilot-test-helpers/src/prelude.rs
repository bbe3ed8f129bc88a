//! Convenience re-exports for common test utilities.
//!
//! ```rust,ignore
//! use keypilot_test_helpers::prelude::*;
//! ```

pub use crate::must::{must, must_async, must_some};

#[cfg(feature = "fixtures")]
pub use crate::fixtures::{
    EDITOR_APP, ProfileSet, UNMATCHED_APP, WRITER_APP, editor_mapping, editor_profile,
    general_mapping, general_profile, writer_mapping, writer_profile,
};

#[cfg(feature = "mock")]
pub use crate::mock::RecordingDevicePort;

pub type TestResult = Result<(), Box<dyn std::error::Error>>;
