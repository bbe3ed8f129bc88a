//! Observable synchronization state and activation events

use keypilot_errors::UploadError;
use keypilot_profile::{Profile, ProfileId};

use crate::focus::FocusEvent;

/// Where the current activation cycle stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SyncPhase {
    /// Nothing attempted yet.
    #[default]
    Idle,
    /// A focus-driven switch is waiting out the debounce window.
    Debouncing,
    /// An upload is running.
    Uploading,
    /// The last attempt succeeded or was already in effect.
    Synced,
    /// The last attempt failed; see [`SyncState::last_error`].
    Failed,
}

/// Snapshot of the engine's state, published after every transition.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncState {
    /// Profile considered in effect. May differ from the last one written.
    pub active_profile: Option<Profile>,
    /// Profile last confirmed written to the device.
    pub last_synced_profile_id: Option<ProfileId>,
    pub upload_in_flight: bool,
    /// Description of the latest upload failure. Cleared when a new attempt
    /// starts.
    pub last_error: Option<String>,
    pub manual_override_active: bool,
    pub auto_switch_enabled: bool,
    pub phase: SyncPhase,
    pub current_focus: Option<FocusEvent>,
    /// Target of the armed debounce timer, if any.
    pub pending_profile_id: Option<ProfileId>,
}

impl SyncState {
    pub fn active_profile_id(&self) -> Option<ProfileId> {
        self.active_profile.as_ref().map(|p| p.id)
    }

    /// True when the active profile is also the one last written.
    pub fn is_synced(&self) -> bool {
        self.active_profile_id().is_some() && self.active_profile_id() == self.last_synced_profile_id
    }
}

/// Why an activation was requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActivationTrigger {
    /// Debounced focus change.
    Focus,
    /// Engine start, for the initially focused application.
    Startup,
    /// The default profile was changed.
    DefaultChanged,
    /// The manual override was lifted.
    OverrideCleared,
    /// A user picked the profile.
    Manual,
    /// Non-manual activation requested through the handle.
    Requested,
    /// Explicit re-upload of the active profile.
    ForceReupload,
    /// An edited profile was saved.
    Save,
}

impl ActivationTrigger {
    /// Automatic requests may be coalesced and are suppressed by a manual
    /// override.
    pub fn is_automatic(self) -> bool {
        matches!(
            self,
            Self::Focus | Self::Startup | Self::DefaultChanged | Self::OverrideCleared
        )
    }
}

/// Result of one activation request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActivationOutcome {
    /// Already in effect on the device; nothing was written.
    Skipped,
    Uploaded,
    Failed(UploadError),
}

impl ActivationOutcome {
    pub fn is_success(&self) -> bool {
        !matches!(self, Self::Failed(_))
    }
}

/// Broadcast after every completed activation request.
#[derive(Debug, Clone)]
pub struct SwitchEvent {
    pub profile_id: ProfileId,
    pub profile_name: String,
    pub trigger: ActivationTrigger,
    pub outcome: ActivationOutcome,
    /// Upload duration; zero for skipped activations.
    pub switch_time_ms: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_state_is_idle_and_unsynced() {
        let state = SyncState::default();
        assert_eq!(state.phase, SyncPhase::Idle);
        assert!(!state.is_synced());
        assert!(!state.upload_in_flight);
    }

    #[test]
    fn test_is_synced_compares_active_and_last_synced() {
        let profile = Profile::new("Writer");
        let mut state = SyncState {
            active_profile: Some(profile.clone()),
            ..SyncState::default()
        };
        assert!(!state.is_synced());

        state.last_synced_profile_id = Some(profile.id);
        assert!(state.is_synced());
    }

    #[test]
    fn test_trigger_classification() {
        assert!(ActivationTrigger::Focus.is_automatic());
        assert!(ActivationTrigger::OverrideCleared.is_automatic());
        assert!(!ActivationTrigger::Manual.is_automatic());
        assert!(!ActivationTrigger::Requested.is_automatic());
        assert!(!ActivationTrigger::ForceReupload.is_automatic());
        assert!(!ActivationTrigger::Save.is_automatic());
    }

    #[test]
    fn test_outcome_success() {
        assert!(ActivationOutcome::Skipped.is_success());
        assert!(ActivationOutcome::Uploaded.is_success());
        assert!(!ActivationOutcome::Failed(UploadError::DeviceNotConnected).is_success());
    }
}
