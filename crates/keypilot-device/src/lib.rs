//! Device synchronization for KeyPilot
//!
//! The switching engine talks to the macro pad only through
//! [`DeviceSyncPort`]. The production implementation, [`ToolDeviceSync`],
//! renders a [`KeyMapping`] into the declarative document understood by
//! `ch57x-keyboard-tool` and runs the tool as a child process.
//!
//! # Modules
//!
//! - [`document`]: serde model of the tool's configuration document
//! - [`tool`]: the `ch57x-keyboard-tool` backed port

#![deny(unsafe_op_in_unsafe_fn, clippy::unwrap_used)]
#![warn(rust_2018_idioms)]

pub mod document;
pub mod tool;

use std::sync::Arc;

use async_trait::async_trait;
use keypilot_errors::UploadError;
use keypilot_profile::KeyMapping;

pub use document::{DeviceConfig, Knob, Layer, Orientation, render_config};
pub use tool::{TOOL_NAME, ToolDeviceSync};

/// Write access to the physical device.
///
/// One call is one attempt; implementations never retry on their own.
#[async_trait]
pub trait DeviceSyncPort: Send + Sync {
    /// Write `mapping` to the device.
    async fn upload(&self, mapping: &KeyMapping) -> Result<(), UploadError>;

    /// Dry-run `mapping` through the device tool without writing it.
    ///
    /// Every failure, including a missing tool, is reported as `false`.
    async fn validate(&self, mapping: &KeyMapping) -> bool;
}

/// Shared handle to a port, as held by the engine and its upload tasks.
pub type SharedDevicePort = Arc<dyn DeviceSyncPort>;

#[async_trait]
impl<T: DeviceSyncPort + ?Sized> DeviceSyncPort for Arc<T> {
    async fn upload(&self, mapping: &KeyMapping) -> Result<(), UploadError> {
        (**self).upload(mapping).await
    }

    async fn validate(&self, mapping: &KeyMapping) -> bool {
        (**self).validate(mapping).await
    }
}
