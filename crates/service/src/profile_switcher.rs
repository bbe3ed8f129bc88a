//! Profile Resolution & Sync Engine
//!
//! Keeps the macro pad's configuration in step with the focused application.
//! The engine is a single tokio task that owns all synchronization state and
//! is reached through a cloneable [`SwitcherHandle`].
//!
//! Per activation cycle:
//! `Idle -> Debouncing -> Uploading -> {Synced | Failed}`
//!
//! - Focus changes resolve to the first profile listing the application, or
//!   the default profile, and are debounced (last event wins)
//! - A manual activation pins its profile until the override is cleared
//! - A profile already written to the device (same id and same mapping) is
//!   not uploaded again
//! - Uploads run in their own task with a timeout; at most one is in flight
//!   and later requests queue behind it

use std::collections::VecDeque;
use std::time::Duration;

use keypilot_device::SharedDevicePort;
use keypilot_errors::{ResolutionError, SwitcherError, UploadError};
use keypilot_profile::{MappingFingerprint, Profile, ProfileId};
use keypilot_profile_repository::SharedRepository;
use tokio::sync::{broadcast, mpsc, oneshot, watch};
use tokio::time::{Instant, sleep_until, timeout};
use tracing::{debug, info, trace, warn};

use crate::focus::{FocusEvent, FocusEventSource};
use crate::sync_state::{ActivationOutcome, ActivationTrigger, SwitchEvent, SyncPhase, SyncState};

/// Default focus debounce window.
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(300);
/// Default bound on a single upload.
pub const DEFAULT_UPLOAD_TIMEOUT: Duration = Duration::from_secs(5);

const COMMAND_CHANNEL_CAPACITY: usize = 64;
const EVENT_CHANNEL_CAPACITY: usize = 64;

/// Engine tuning.
#[derive(Debug, Clone)]
pub struct SwitcherConfig {
    pub debounce: Duration,
    pub upload_timeout: Duration,
    pub auto_switch_enabled: bool,
    /// Activate the profile for the initially focused application (or the
    /// default) as soon as the engine starts.
    pub activate_on_start: bool,
}

impl Default for SwitcherConfig {
    fn default() -> Self {
        Self {
            debounce: DEFAULT_DEBOUNCE,
            upload_timeout: DEFAULT_UPLOAD_TIMEOUT,
            auto_switch_enabled: true,
            activate_on_start: true,
        }
    }
}

#[derive(Debug)]
enum SwitcherMessage {
    FocusChanged(FocusEvent),
    Activate {
        profile: Profile,
        manual: bool,
        reply: oneshot::Sender<ActivationOutcome>,
    },
    DefaultProfileChanged,
    ClearManualOverride,
    ForceReupload {
        reply: oneshot::Sender<ActivationOutcome>,
    },
    UploadOnSave {
        profile: Profile,
        reply: oneshot::Sender<ActivationOutcome>,
    },
    SetAutoSwitch {
        enabled: bool,
    },
    Shutdown {
        reply: oneshot::Sender<()>,
    },
}

/// Handle to a running engine.
#[derive(Clone)]
pub struct SwitcherHandle {
    tx: mpsc::Sender<SwitcherMessage>,
    state: watch::Receiver<SyncState>,
    events: broadcast::Sender<SwitchEvent>,
    port: SharedDevicePort,
}

impl std::fmt::Debug for SwitcherHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SwitcherHandle")
            .field("running", &self.is_running())
            .finish_non_exhaustive()
    }
}

impl SwitcherHandle {
    async fn send(&self, message: SwitcherMessage) -> Result<(), SwitcherError> {
        self.tx
            .send(message)
            .await
            .map_err(|_closed| SwitcherError::Stopped)
    }

    async fn request<F>(&self, build: F) -> Result<ActivationOutcome, SwitcherError>
    where
        F: FnOnce(oneshot::Sender<ActivationOutcome>) -> SwitcherMessage,
    {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.send(build(reply_tx)).await?;
        reply_rx
            .await
            .map_err(|_dropped| SwitcherError::ReplyDropped)
    }

    /// Report a focus change.
    pub async fn focus_changed(&self, event: FocusEvent) -> Result<(), SwitcherError> {
        self.send(SwitcherMessage::FocusChanged(event)).await
    }

    /// Activate `profile` now, bypassing resolution. With `manual` set, the
    /// profile is pinned until [`clear_manual_override`] is called.
    ///
    /// [`clear_manual_override`]: SwitcherHandle::clear_manual_override
    pub async fn activate_profile(
        &self,
        profile: Profile,
        manual: bool,
    ) -> Result<ActivationOutcome, SwitcherError> {
        self.request(|reply| SwitcherMessage::Activate {
            profile,
            manual,
            reply,
        })
        .await
    }

    /// The default profile changed: drop the override and the sync record,
    /// then re-evaluate.
    pub async fn on_default_profile_changed(&self) -> Result<(), SwitcherError> {
        self.send(SwitcherMessage::DefaultProfileChanged).await
    }

    pub async fn clear_manual_override(&self) -> Result<(), SwitcherError> {
        self.send(SwitcherMessage::ClearManualOverride).await
    }

    /// Upload the active profile again even if it is already on the device.
    pub async fn force_reupload(&self) -> Result<ActivationOutcome, SwitcherError> {
        self.request(|reply| SwitcherMessage::ForceReupload { reply })
            .await
    }

    /// Upload an edited profile unconditionally. It only counts as synced if
    /// it is the active profile.
    pub async fn upload_on_save(&self, profile: Profile) -> Result<ActivationOutcome, SwitcherError> {
        self.request(|reply| SwitcherMessage::UploadOnSave { profile, reply })
            .await
    }

    pub async fn set_auto_switch_enabled(&self, enabled: bool) -> Result<(), SwitcherError> {
        self.send(SwitcherMessage::SetAutoSwitch { enabled }).await
    }

    /// Dry-run the profile's mapping through the device port. Touches no
    /// engine state.
    pub async fn validate(&self, profile: &Profile) -> bool {
        let valid = self.port.validate(&profile.key_mapping).await;
        debug!(profile_id = %profile.id, valid, "Validated profile mapping");
        valid
    }

    /// Latest published state.
    pub fn state(&self) -> SyncState {
        self.state.borrow().clone()
    }

    /// Receiver notified on every state transition.
    pub fn subscribe(&self) -> watch::Receiver<SyncState> {
        self.state.clone()
    }

    /// Stream of completed activations.
    pub fn events(&self) -> broadcast::Receiver<SwitchEvent> {
        self.events.subscribe()
    }

    pub fn is_running(&self) -> bool {
        !self.tx.is_closed()
    }

    /// Stop the engine. Waits for an in-flight upload; queued requests are
    /// dropped.
    pub async fn shutdown(&self) -> Result<(), SwitcherError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.send(SwitcherMessage::Shutdown { reply: reply_tx }).await?;
        reply_rx.await.map_err(|_dropped| SwitcherError::ReplyDropped)
    }
}

/// Builder for the engine task.
pub struct ProfileSwitcher {
    repository: SharedRepository,
    port: SharedDevicePort,
    focus: Option<Box<dyn FocusEventSource>>,
    config: SwitcherConfig,
}

impl ProfileSwitcher {
    pub fn new(repository: SharedRepository, port: SharedDevicePort, config: SwitcherConfig) -> Self {
        Self {
            repository,
            port,
            focus: None,
            config,
        }
    }

    /// Attach the focus source the engine owns and stops on shutdown.
    pub fn with_focus_source(mut self, source: impl FocusEventSource + 'static) -> Self {
        self.focus = Some(Box::new(source));
        self
    }

    /// Spawn the engine task on the current runtime.
    pub fn spawn(self) -> SwitcherHandle {
        let (tx, rx) = mpsc::channel(COMMAND_CHANNEL_CAPACITY);
        let initial = SyncState {
            auto_switch_enabled: self.config.auto_switch_enabled,
            ..SyncState::default()
        };
        let (state_tx, state_rx) = watch::channel(initial.clone());
        let (events_tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        let (results_tx, results_rx) = mpsc::unbounded_channel();

        let actor = SwitcherActor {
            repository: self.repository,
            port: self.port.clone(),
            focus: self.focus,
            config: self.config,
            rx,
            state: initial,
            state_tx,
            events_tx: events_tx.clone(),
            synced: None,
            settled_phase: SyncPhase::Idle,
            pending: None,
            in_flight: None,
            queue: VecDeque::new(),
            results_tx,
            results_rx,
        };
        tokio::spawn(actor.run());

        SwitcherHandle {
            tx,
            state: state_rx,
            events: events_tx,
            port: self.port,
        }
    }
}

/// What was last confirmed written to the device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct SyncedMapping {
    profile_id: ProfileId,
    fingerprint: MappingFingerprint,
}

#[derive(Debug)]
struct PendingSwitch {
    deadline: Instant,
    profile: Profile,
}

#[derive(Debug)]
struct ActivationRequest {
    profile: Profile,
    trigger: ActivationTrigger,
    reply: Option<oneshot::Sender<ActivationOutcome>>,
}

#[derive(Debug)]
struct InFlight {
    request: ActivationRequest,
    fingerprint: MappingFingerprint,
    started: Instant,
}

type UploadResult = Result<(), UploadError>;

struct SwitcherActor {
    repository: SharedRepository,
    port: SharedDevicePort,
    focus: Option<Box<dyn FocusEventSource>>,
    config: SwitcherConfig,
    rx: mpsc::Receiver<SwitcherMessage>,
    state: SyncState,
    state_tx: watch::Sender<SyncState>,
    events_tx: broadcast::Sender<SwitchEvent>,
    synced: Option<SyncedMapping>,
    /// Phase shown when nothing is debouncing or uploading.
    settled_phase: SyncPhase,
    pending: Option<PendingSwitch>,
    in_flight: Option<InFlight>,
    queue: VecDeque<ActivationRequest>,
    results_tx: mpsc::UnboundedSender<UploadResult>,
    results_rx: mpsc::UnboundedReceiver<UploadResult>,
}

impl SwitcherActor {
    async fn run(mut self) {
        info!(
            debounce_ms = duration_ms(self.config.debounce),
            upload_timeout_ms = duration_ms(self.config.upload_timeout),
            auto_switch = self.config.auto_switch_enabled,
            "Profile switcher started"
        );

        if self.config.activate_on_start {
            self.activate_initial();
        }

        loop {
            let deadline = self.pending.as_ref().map(|p| p.deadline);
            tokio::select! {
                biased;
                message = self.rx.recv() => match message {
                    Some(SwitcherMessage::Shutdown { reply }) => {
                        self.shutdown().await;
                        if reply.send(()).is_err() {
                            debug!("Shutdown requester went away");
                        }
                        break;
                    }
                    Some(message) => self.handle_message(message),
                    None => {
                        self.shutdown().await;
                        break;
                    }
                },
                Some(result) = self.results_rx.recv() => self.finish_upload(result),
                () = wait_for_deadline(deadline) => self.fire_debounce(),
                event = next_focus(&mut self.focus) => match event {
                    Some(event) => self.handle_focus(event),
                    None => {
                        info!("Focus source closed");
                        self.focus = None;
                    }
                },
            }
        }

        debug!("Profile switcher loop exited");
    }

    fn handle_message(&mut self, message: SwitcherMessage) {
        match message {
            SwitcherMessage::FocusChanged(event) => self.handle_focus(event),
            SwitcherMessage::Activate {
                profile,
                manual,
                reply,
            } => {
                let trigger = if manual {
                    ActivationTrigger::Manual
                } else {
                    ActivationTrigger::Requested
                };
                self.submit(ActivationRequest {
                    profile,
                    trigger,
                    reply: Some(reply),
                });
            }
            SwitcherMessage::DefaultProfileChanged => self.on_default_profile_changed(),
            SwitcherMessage::ClearManualOverride => self.clear_manual_override(),
            SwitcherMessage::ForceReupload { reply } => self.force_reupload(reply),
            SwitcherMessage::UploadOnSave { profile, reply } => self.submit(ActivationRequest {
                profile,
                trigger: ActivationTrigger::Save,
                reply: Some(reply),
            }),
            SwitcherMessage::SetAutoSwitch { enabled } => self.set_auto_switch(enabled),
            // Handled by the run loop.
            SwitcherMessage::Shutdown { reply } => {
                if reply.send(()).is_err() {
                    debug!("Shutdown requester went away");
                }
            }
        }
    }

    fn suppressed(&self) -> bool {
        self.state.manual_override_active || !self.state.auto_switch_enabled
    }

    /// First profile listing `application_id`, else the default. The flag is
    /// true for a direct match.
    fn resolve(&self, application_id: &str) -> Option<(Profile, bool)> {
        let repository = self.repository.read();
        if let Some(profile) = repository.find_by_application_id(application_id) {
            return Some((profile.clone(), true));
        }
        repository.find_default().map(|profile| (profile.clone(), false))
    }

    fn activate_initial(&mut self) {
        let focus = self.focus.as_ref().and_then(|source| source.current());
        if let Some(event) = &focus {
            self.state.current_focus = Some(event.clone());
        }

        let target = match &focus {
            Some(event) => self.resolve(&event.application_id).map(|(p, _)| p),
            None => self.repository.read().find_default().cloned(),
        };

        match target {
            Some(profile) => {
                info!(
                    app_id = ?focus.as_ref().map(|e| e.application_id.as_str()),
                    profile_id = %profile.id,
                    profile_name = %profile.name,
                    "Activating initial profile"
                );
                self.submit(ActivationRequest {
                    profile,
                    trigger: ActivationTrigger::Startup,
                    reply: None,
                });
            }
            None => {
                info!("No matching or default profile at startup");
                self.publish();
            }
        }
    }

    fn handle_focus(&mut self, event: FocusEvent) {
        debug!(
            app_id = %event.application_id,
            app_name = ?event.display_name,
            "Focus changed"
        );
        self.state.current_focus = Some(event.clone());

        if self.suppressed() {
            debug!(
                auto_switch = self.state.auto_switch_enabled,
                manual_override = self.state.manual_override_active,
                "Skipping automatic switch"
            );
            self.publish();
            return;
        }

        let Some((profile, matched)) = self.resolve(&event.application_id) else {
            debug!(
                error = %ResolutionError::NoProfileMatched(event.application_id.clone()),
                "Nothing to activate for focused application"
            );
            self.publish();
            return;
        };

        debug!(
            app_id = %event.application_id,
            profile_id = %profile.id,
            profile_name = %profile.name,
            matched,
            "Resolved profile for focused application"
        );
        self.arm_debounce(profile);
    }

    fn arm_debounce(&mut self, profile: Profile) {
        self.state.pending_profile_id = Some(profile.id);
        self.pending = Some(PendingSwitch {
            deadline: Instant::now() + self.config.debounce,
            profile,
        });
        self.refresh_phase();
        self.publish();
    }

    fn cancel_debounce(&mut self) {
        if self.pending.take().is_some() {
            trace!("Pending switch cancelled");
        }
        self.state.pending_profile_id = None;
    }

    fn fire_debounce(&mut self) {
        let Some(pending) = self.pending.take() else {
            return;
        };
        self.state.pending_profile_id = None;

        if self.suppressed() {
            debug!(profile_id = %pending.profile.id, "Pending switch dropped, automatic switching suppressed");
            self.refresh_phase();
            self.publish();
            return;
        }

        self.submit(ActivationRequest {
            profile: pending.profile,
            trigger: ActivationTrigger::Focus,
            reply: None,
        });
    }

    fn on_default_profile_changed(&mut self) {
        info!("Default profile changed, re-evaluating");
        self.state.manual_override_active = false;
        self.synced = None;
        self.state.last_synced_profile_id = None;
        self.cancel_debounce();

        if let Some(event) = self.state.current_focus.clone() {
            let has_specific = self
                .repository
                .read()
                .find_by_application_id(&event.application_id)
                .is_some();
            if has_specific {
                self.handle_focus(event);
                return;
            }
        }

        let default = self.repository.read().find_default().cloned();
        match default {
            Some(profile) => self.submit(ActivationRequest {
                profile,
                trigger: ActivationTrigger::DefaultChanged,
                reply: None,
            }),
            None => {
                debug!("No default profile, nothing to activate");
                self.refresh_phase();
                self.publish();
            }
        }
    }

    fn clear_manual_override(&mut self) {
        if self.state.manual_override_active {
            info!("Manual override cleared");
        }
        self.state.manual_override_active = false;

        let target = self
            .state
            .current_focus
            .as_ref()
            .filter(|_| self.state.auto_switch_enabled)
            .and_then(|event| self.resolve(&event.application_id));

        match target {
            Some((profile, _)) => self.submit(ActivationRequest {
                profile,
                trigger: ActivationTrigger::OverrideCleared,
                reply: None,
            }),
            None => self.publish(),
        }
    }

    fn set_auto_switch(&mut self, enabled: bool) {
        info!(enabled, "Automatic switching toggled");
        self.state.auto_switch_enabled = enabled;
        if enabled {
            self.clear_manual_override();
        } else {
            self.cancel_debounce();
            self.refresh_phase();
            self.publish();
        }
    }

    fn force_reupload(&mut self, reply: oneshot::Sender<ActivationOutcome>) {
        let Some(active) = self.state.active_profile.clone() else {
            debug!("No active profile to re-upload");
            if reply.send(ActivationOutcome::Skipped).is_err() {
                debug!("Re-upload requester went away");
            }
            return;
        };

        // Pick up edits made since the profile was activated.
        let profile = self.repository.read().get(active.id).cloned().unwrap_or(active);
        self.submit(ActivationRequest {
            profile,
            trigger: ActivationTrigger::ForceReupload,
            reply: Some(reply),
        });
    }

    fn submit(&mut self, request: ActivationRequest) {
        if self.in_flight.is_none() {
            self.execute(request);
            return;
        }

        if request.trigger.is_automatic() {
            let before = self.queue.len();
            self.queue.retain(|queued| !queued.trigger.is_automatic());
            if self.queue.len() < before {
                trace!("Queued automatic activation replaced");
            }
        }
        debug!(
            profile_id = %request.profile.id,
            trigger = ?request.trigger,
            "Upload in flight, queuing activation"
        );
        self.queue.push_back(request);
    }

    fn is_synced(&self, profile: &Profile) -> bool {
        self.synced
            == Some(SyncedMapping {
                profile_id: profile.id,
                fingerprint: profile.key_mapping.fingerprint(),
            })
    }

    fn execute(&mut self, request: ActivationRequest) {
        match request.trigger {
            ActivationTrigger::Save => {
                self.start_upload(request);
                return;
            }
            ActivationTrigger::Focus if self.suppressed() => {
                debug!(profile_id = %request.profile.id, "Queued switch dropped, automatic switching suppressed");
                return;
            }
            ActivationTrigger::ForceReupload => {
                if self.synced.map(|s| s.profile_id) == Some(request.profile.id) {
                    self.synced = None;
                    self.state.last_synced_profile_id = None;
                }
            }
            _ => {}
        }

        if self.is_synced(&request.profile) {
            debug!(
                profile_id = %request.profile.id,
                profile_name = %request.profile.name,
                "Profile already on device, skipping upload"
            );
            self.state.active_profile = Some(request.profile.clone());
            self.settled_phase = SyncPhase::Synced;
            self.refresh_phase();
            self.publish();
            self.complete(
                &request.profile,
                request.trigger,
                ActivationOutcome::Skipped,
                request.reply,
                0,
            );
            return;
        }

        if request.trigger == ActivationTrigger::Manual {
            self.state.manual_override_active = true;
            self.cancel_debounce();
            let before = self.queue.len();
            self.queue.retain(|queued| !queued.trigger.is_automatic());
            info!(
                profile_id = %request.profile.id,
                profile_name = %request.profile.name,
                dropped = before.saturating_sub(self.queue.len()),
                "Manual override engaged"
            );
        }

        self.state.active_profile = Some(request.profile.clone());
        self.start_upload(request);
    }

    fn start_upload(&mut self, request: ActivationRequest) {
        let fingerprint = request.profile.key_mapping.fingerprint();
        self.state.upload_in_flight = true;
        self.state.last_error = None;

        info!(
            profile_id = %request.profile.id,
            profile_name = %request.profile.name,
            trigger = ?request.trigger,
            "Uploading profile"
        );

        let port = self.port.clone();
        let mapping = request.profile.key_mapping.clone();
        let upload_timeout = self.config.upload_timeout;
        let results = self.results_tx.clone();
        tokio::spawn(async move {
            let result = match timeout(upload_timeout, port.upload(&mapping)).await {
                Ok(result) => result,
                Err(_elapsed) => Err(UploadError::Timeout {
                    timeout_ms: duration_ms(upload_timeout),
                }),
            };
            if results.send(result).is_err() {
                debug!("Profile switcher gone before upload finished");
            }
        });

        self.in_flight = Some(InFlight {
            request,
            fingerprint,
            started: Instant::now(),
        });
        self.refresh_phase();
        self.publish();
    }

    fn finish_upload(&mut self, result: UploadResult) {
        let Some(InFlight {
            request,
            fingerprint,
            started,
        }) = self.in_flight.take()
        else {
            warn!("Upload result without an upload in flight");
            return;
        };
        let switch_time_ms = duration_ms(started.elapsed());
        let ActivationRequest {
            profile,
            trigger,
            reply,
        } = request;

        let outcome = match result {
            Ok(()) => {
                let counts_as_sync = trigger != ActivationTrigger::Save
                    || self.state.active_profile_id() == Some(profile.id);
                if counts_as_sync {
                    self.synced = Some(SyncedMapping {
                        profile_id: profile.id,
                        fingerprint,
                    });
                    self.state.last_synced_profile_id = Some(profile.id);
                    self.state.active_profile = Some(profile.clone());
                    self.settled_phase = SyncPhase::Synced;
                } else {
                    // The device now holds a mapping that is not the active one.
                    self.synced = None;
                    self.state.last_synced_profile_id = None;
                }
                info!(
                    profile_id = %profile.id,
                    profile_name = %profile.name,
                    switch_time_ms,
                    synced = counts_as_sync,
                    "Profile uploaded"
                );
                ActivationOutcome::Uploaded
            }
            Err(error) => {
                warn!(
                    profile_id = %profile.id,
                    profile_name = %profile.name,
                    switch_time_ms,
                    error = %error,
                    "Profile upload failed"
                );
                self.state.last_error = Some(error.to_string());
                self.settled_phase = SyncPhase::Failed;
                ActivationOutcome::Failed(error)
            }
        };

        self.state.upload_in_flight = false;
        self.refresh_phase();
        self.publish();
        self.complete(&profile, trigger, outcome, reply, switch_time_ms);

        while self.in_flight.is_none() {
            let Some(next) = self.queue.pop_front() else {
                break;
            };
            self.execute(next);
        }
    }

    fn complete(
        &self,
        profile: &Profile,
        trigger: ActivationTrigger,
        outcome: ActivationOutcome,
        reply: Option<oneshot::Sender<ActivationOutcome>>,
        switch_time_ms: u64,
    ) {
        let event = SwitchEvent {
            profile_id: profile.id,
            profile_name: profile.name.clone(),
            trigger,
            outcome: outcome.clone(),
            switch_time_ms,
        };
        if self.events_tx.send(event).is_err() {
            trace!("No switch event subscribers");
        }
        if let Some(reply) = reply
            && reply.send(outcome).is_err()
        {
            debug!(profile_id = %profile.id, "Activation requester went away");
        }
    }

    fn refresh_phase(&mut self) {
        self.state.phase = if self.in_flight.is_some() {
            SyncPhase::Uploading
        } else if self.pending.is_some() {
            SyncPhase::Debouncing
        } else {
            self.settled_phase
        };
    }

    fn publish(&self) {
        self.state_tx.send_replace(self.state.clone());
    }

    async fn shutdown(&mut self) {
        info!("Profile switcher shutting down");
        if let Some(mut source) = self.focus.take() {
            source.stop();
        }
        self.cancel_debounce();
        if !self.queue.is_empty() {
            debug!(dropped = self.queue.len(), "Dropping queued activations");
            self.queue.clear();
        }

        if self.in_flight.is_some() {
            debug!("Waiting for in-flight upload");
            if let Some(result) = self.results_rx.recv().await {
                self.finish_upload(result);
            }
        }
    }
}

async fn wait_for_deadline(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

async fn next_focus(source: &mut Option<Box<dyn FocusEventSource>>) -> Option<FocusEvent> {
    match source {
        Some(source) => source.next_event().await,
        None => std::future::pending().await,
    }
}

fn duration_ms(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

/// Spawn an engine that owns `focus`.
pub fn spawn_switcher(
    repository: SharedRepository,
    port: SharedDevicePort,
    focus: impl FocusEventSource + 'static,
    config: SwitcherConfig,
) -> SwitcherHandle {
    ProfileSwitcher::new(repository, port, config)
        .with_focus_source(focus)
        .spawn()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::focus::ChannelFocusSource;
    use std::sync::Arc;
    use keypilot_profile_repository::ProfileRepository;
    use keypilot_test_helpers::prelude::*;

    fn quiet_config() -> SwitcherConfig {
        SwitcherConfig {
            activate_on_start: false,
            ..SwitcherConfig::default()
        }
    }

    #[test]
    fn test_duration_ms_saturates() {
        assert_eq!(duration_ms(Duration::from_millis(300)), 300);
        assert_eq!(duration_ms(Duration::MAX), u64::MAX);
    }

    #[tokio::test(start_paused = true)]
    async fn test_initial_state_mirrors_config() {
        let repository = must(ProfileRepository::in_memory(ProfileSet::new().to_vec())).shared();
        let port = RecordingDevicePort::new();
        let config = SwitcherConfig {
            auto_switch_enabled: false,
            ..quiet_config()
        };
        let handle = ProfileSwitcher::new(repository, Arc::new(port), config).spawn();

        let state = handle.state();
        assert!(!state.auto_switch_enabled);
        assert_eq!(state.phase, SyncPhase::Idle);
        must(handle.shutdown().await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_handle_reports_stopped_after_shutdown() {
        let repository = must(ProfileRepository::in_memory(ProfileSet::new().to_vec())).shared();
        let (_sender, source) = ChannelFocusSource::channel();
        let handle = spawn_switcher(
            repository,
            Arc::new(RecordingDevicePort::new()),
            source,
            quiet_config(),
        );

        must(handle.shutdown().await);
        tokio::task::yield_now().await;

        assert!(!handle.is_running());
        assert_eq!(
            handle.clear_manual_override().await,
            Err(SwitcherError::Stopped)
        );
    }
}
