//! Daemon wiring and lifecycle
//!
//! Builds the repository, device port, focus source and engine from a
//! [`KeyPilotConfig`], logs engine transitions and stops on a termination
//! signal.

use std::sync::Arc;

use anyhow::{Context, Result};
use keypilot_device::{SharedDevicePort, ToolDeviceSync};
use keypilot_errors::KeyPilotError;
use keypilot_profile_repository::{JsonFileStore, ProfileRepository, SharedRepository};
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::config::KeyPilotConfig;
use crate::focus::{ChannelFocusSource, CommandFocusSource, FocusSender};
use crate::profile_switcher::{ProfileSwitcher, SwitcherHandle};
use crate::sync_state::{ActivationOutcome, SwitchEvent, SyncState};

/// Daemon that owns the engine for the lifetime of the process
#[derive(Debug, Clone)]
pub struct KeyPilotDaemon {
    config: KeyPilotConfig,
}

/// Engine and helpers started by [`KeyPilotDaemon::start`]
#[derive(Debug)]
pub struct RunningDaemon {
    switcher: SwitcherHandle,
    repository: SharedRepository,
    focus_feed: Option<FocusSender>,
    monitor: JoinHandle<()>,
}

impl KeyPilotDaemon {
    pub fn new(config: KeyPilotConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &KeyPilotConfig {
        &self.config
    }

    /// Open (and seed if needed) the profile document named by the config
    pub fn open_repository(&self) -> Result<SharedRepository> {
        let path = self.config.profiles_path()?;
        let repository = ProfileRepository::open(JsonFileStore::new(&path))
            .with_context(|| format!("Failed to open profiles at {}", path.display()))?;
        Ok(repository.shared())
    }

    /// Port driving the configuration tool
    pub fn device_port(&self) -> ToolDeviceSync {
        let port = ToolDeviceSync::new(self.config.tool_path.clone());
        if !port.is_available() {
            warn!(
                tool = %port.tool_path().display(),
                "Device tool not found; uploads will fail until it is installed"
            );
        }
        port
    }

    /// Wire everything together and spawn the engine
    pub async fn start(&self) -> Result<RunningDaemon> {
        self.config.validate().context("Invalid configuration")?;

        let repository = self.open_repository()?;
        let port: SharedDevicePort = Arc::new(self.device_port());
        let builder =
            ProfileSwitcher::new(repository.clone(), port, self.config.switcher_config());

        let (builder, focus_feed) = match &self.config.focus.command {
            Some(argv) => {
                let source = CommandFocusSource::new(argv.clone(), self.config.poll_interval())
                    .primed()
                    .await;
                (builder.with_focus_source(source), None)
            }
            None => {
                info!("No focus command configured; focus changes must be fed in-process");
                let (sender, source) = ChannelFocusSource::channel();
                (builder.with_focus_source(source), Some(sender))
            }
        };

        let switcher = builder.spawn();
        let monitor = tokio::spawn(log_transitions(switcher.subscribe(), switcher.events()));

        info!(
            profiles = repository.read().len(),
            auto_switch = self.config.auto_switch_enabled,
            "KeyPilot daemon started"
        );

        Ok(RunningDaemon {
            switcher,
            repository,
            focus_feed,
            monitor,
        })
    }

    /// Run until SIGINT/SIGTERM (Ctrl+C on Windows)
    pub async fn run(self) -> Result<()> {
        let running = self.start().await?;
        wait_for_shutdown_signal().await?;
        running.stop().await
    }
}

impl RunningDaemon {
    pub fn switcher(&self) -> &SwitcherHandle {
        &self.switcher
    }

    pub fn repository(&self) -> &SharedRepository {
        &self.repository
    }

    /// In-process focus feed, present when no focus command is configured
    pub fn focus_feed(&self) -> Option<&FocusSender> {
        self.focus_feed.as_ref()
    }

    /// Shut the engine down and wait for the transition logger
    pub async fn stop(self) -> Result<()> {
        self.switcher
            .shutdown()
            .await
            .context("Failed to stop profile switcher")?;
        if let Err(e) = self.monitor.await {
            error!(error = %e, "Transition logger failed");
        }
        info!("KeyPilot daemon stopped");
        Ok(())
    }
}

/// Log state transitions and completed switches until the engine exits.
async fn log_transitions(
    mut state: watch::Receiver<SyncState>,
    mut events: broadcast::Receiver<SwitchEvent>,
) {
    let mut last_phase = state.borrow().phase;
    loop {
        tokio::select! {
            changed = state.changed() => {
                if changed.is_err() {
                    break;
                }
                let snapshot = state.borrow_and_update().clone();
                if snapshot.phase != last_phase {
                    debug!(
                        from = ?last_phase,
                        to = ?snapshot.phase,
                        active = ?snapshot.active_profile.as_ref().map(|p| p.name.as_str()),
                        pending = ?snapshot.pending_profile_id,
                        "Sync phase changed"
                    );
                    last_phase = snapshot.phase;
                }
            }
            event = events.recv() => match event {
                Ok(event) => log_switch(&event),
                Err(broadcast::error::RecvError::Lagged(missed)) => {
                    warn!(missed, "Transition logger fell behind");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            },
        }
    }
    debug!("Transition logger stopped");
}

fn log_switch(event: &SwitchEvent) {
    match &event.outcome {
        ActivationOutcome::Skipped => debug!(
            profile_id = %event.profile_id,
            profile_name = %event.profile_name,
            trigger = ?event.trigger,
            "Profile already active"
        ),
        ActivationOutcome::Uploaded => info!(
            profile_id = %event.profile_id,
            profile_name = %event.profile_name,
            trigger = ?event.trigger,
            switch_time_ms = event.switch_time_ms,
            "Profile switched"
        ),
        ActivationOutcome::Failed(e) => {
            let classified = KeyPilotError::from(e.clone());
            warn!(
                profile_id = %event.profile_id,
                profile_name = %event.profile_name,
                trigger = ?event.trigger,
                category = %classified.category(),
                severity = %classified.severity(),
                recoverable = classified.is_recoverable(),
                transient = e.is_transient(),
                error = %e,
                "Profile switch failed"
            );
        }
    }
}

/// Wait for a platform termination signal
pub async fn wait_for_shutdown_signal() -> Result<()> {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        let mut sigterm =
            signal(SignalKind::terminate()).context("Failed to register SIGTERM handler")?;
        let mut sigint =
            signal(SignalKind::interrupt()).context("Failed to register SIGINT handler")?;
        let mut sighup =
            signal(SignalKind::hangup()).context("Failed to register SIGHUP handler")?;

        tokio::select! {
            _ = sigterm.recv() => info!("Received SIGTERM"),
            _ = sigint.recv() => info!("Received SIGINT"),
            _ = sighup.recv() => info!("Received SIGHUP"),
        }
    }

    #[cfg(not(unix))]
    {
        tokio::signal::ctrl_c()
            .await
            .context("Error waiting for Ctrl+C")?;
        info!("Received Ctrl+C");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sync_state::SyncPhase;
    use keypilot_errors::{ErrorCategory, UploadError};
    use keypilot_test_helpers::must;
    use std::time::Duration;
    use tempfile::TempDir;

    fn test_config(dir: &TempDir) -> KeyPilotConfig {
        KeyPilotConfig {
            tool_path: Some(dir.path().join("missing-tool")),
            profiles_path: Some(dir.path().join("profiles.json")),
            ..KeyPilotConfig::default()
        }
    }

    #[tokio::test]
    async fn test_start_seeds_profiles_and_reports_missing_tool() {
        let dir = must(TempDir::new());
        let daemon = KeyPilotDaemon::new(test_config(&dir));

        let running = must(daemon.start().await);
        assert!(dir.path().join("profiles.json").exists());
        assert!(running.focus_feed().is_some());
        assert_eq!(running.repository().read().len(), 3);

        let mut state = running.switcher().subscribe();
        let failed = must(
            tokio::time::timeout(
                Duration::from_secs(5),
                state.wait_for(|s| s.phase == SyncPhase::Failed),
            )
            .await,
        );
        let failed = must(failed).clone();
        assert_eq!(
            failed.active_profile.map(|p| p.name),
            Some("Default".to_string())
        );
        assert!(
            failed
                .last_error
                .is_some_and(|e| e.contains("missing-tool"))
        );

        must(running.stop().await);
    }

    #[test]
    fn test_failed_switch_classification() {
        let unplugged = UploadError::DeviceNotConnected;
        let classified = KeyPilotError::from(unplugged.clone());
        assert_eq!(classified.category(), ErrorCategory::Device);
        assert!(classified.is_recoverable());
        assert!(unplugged.is_transient());

        let missing = UploadError::ToolUnavailable("/opt/missing-tool".to_string());
        let classified = KeyPilotError::from(missing.clone());
        assert_eq!(classified.category(), ErrorCategory::Device);
        assert!(!classified.is_recoverable());
        assert!(!missing.is_transient());
    }

    #[tokio::test]
    async fn test_start_rejects_invalid_config() {
        let dir = must(TempDir::new());
        let config = KeyPilotConfig {
            debounce_ms: 0,
            ..test_config(&dir)
        };

        assert!(matches!(KeyPilotDaemon::new(config).start().await, Err(_)));
    }
}
