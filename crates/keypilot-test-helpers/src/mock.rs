//! Mock implementations for testing.

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use keypilot_device::DeviceSyncPort;
use keypilot_errors::UploadError;
use keypilot_profile::KeyMapping;
use parking_lot::Mutex;

/// Device port that records every call instead of touching hardware.
///
/// Clones share state: hand one clone to the engine and keep another for
/// assertions. Outcomes are scripted per call with [`push_outcome`]; once the
/// script runs out every upload succeeds.
///
/// [`push_outcome`]: RecordingDevicePort::push_outcome
#[derive(Debug, Clone, Default)]
pub struct RecordingDevicePort {
    inner: Arc<Inner>,
}

#[derive(Debug, Default)]
struct Inner {
    uploads: Mutex<Vec<KeyMapping>>,
    completed: AtomicUsize,
    validations: Mutex<Vec<KeyMapping>>,
    outcomes: Mutex<VecDeque<Result<(), UploadError>>>,
    delay: Mutex<Option<Duration>>,
    reject_validation: AtomicBool,
}

impl RecordingDevicePort {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every upload takes `delay` (tokio time, so paused-clock tests can
    /// step through it).
    pub fn with_delay(delay: Duration) -> Self {
        let port = Self::default();
        port.set_delay(Some(delay));
        port
    }

    pub fn set_delay(&self, delay: Option<Duration>) {
        *self.inner.delay.lock() = delay;
    }

    /// Queue the outcome of the next unscripted upload.
    pub fn push_outcome(&self, outcome: Result<(), UploadError>) {
        self.inner.outcomes.lock().push_back(outcome);
    }

    /// Make the next upload fail with `error`.
    pub fn fail_next(&self, error: UploadError) {
        self.push_outcome(Err(error));
    }

    pub fn set_reject_validation(&self, reject: bool) {
        self.inner.reject_validation.store(reject, Ordering::SeqCst);
    }

    /// Mappings passed to `upload`, in call order, including attempts that
    /// have not finished yet.
    pub fn uploads(&self) -> Vec<KeyMapping> {
        self.inner.uploads.lock().clone()
    }

    pub fn upload_count(&self) -> usize {
        self.inner.uploads.lock().len()
    }

    /// Uploads that have returned, successfully or not.
    pub fn completed_count(&self) -> usize {
        self.inner.completed.load(Ordering::SeqCst)
    }

    pub fn last_upload(&self) -> Option<KeyMapping> {
        self.inner.uploads.lock().last().cloned()
    }

    pub fn validation_count(&self) -> usize {
        self.inner.validations.lock().len()
    }

    pub fn clear(&self) {
        self.inner.uploads.lock().clear();
        self.inner.validations.lock().clear();
        self.inner.completed.store(0, Ordering::SeqCst);
    }
}

#[async_trait]
impl DeviceSyncPort for RecordingDevicePort {
    async fn upload(&self, mapping: &KeyMapping) -> Result<(), UploadError> {
        self.inner.uploads.lock().push(mapping.clone());
        let outcome = self.inner.outcomes.lock().pop_front().unwrap_or(Ok(()));
        let delay = *self.inner.delay.lock();

        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        self.inner.completed.fetch_add(1, Ordering::SeqCst);
        outcome
    }

    async fn validate(&self, mapping: &KeyMapping) -> bool {
        self.inner.validations.lock().push(mapping.clone());
        !self.inner.reject_validation.load(Ordering::SeqCst)
    }
}
