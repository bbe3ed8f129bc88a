//! Focus Event Sources
//!
//! The engine learns which application has focus through
//! [`FocusEventSource`]. Two implementations are provided:
//! - [`ChannelFocusSource`]: fed in-process through a [`FocusSender`]
//! - [`CommandFocusSource`]: polls an external command (for example
//!   `xdotool getactivewindow getwindowclassname`) and reports changes

use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::process::Command;
use tokio::sync::mpsc;
use tokio::time::{Interval, MissedTickBehavior, interval};
use tracing::{debug, info, warn};

/// Focus moved to an application.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FocusEvent {
    /// Identifier matched against profiles (bundle ID, WM class, ...).
    pub application_id: String,
    /// Human-readable application name, when the source knows it.
    pub display_name: Option<String>,
}

impl FocusEvent {
    pub fn new(application_id: impl Into<String>) -> Self {
        Self {
            application_id: application_id.into(),
            display_name: None,
        }
    }

    pub fn with_display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = Some(name.into());
        self
    }
}

/// Stream of focus changes owned by the engine.
///
/// `next_event` must be cancel safe: the engine polls it inside `select!`.
#[async_trait]
pub trait FocusEventSource: Send {
    /// Application focused right now, if known.
    fn current(&self) -> Option<FocusEvent>;

    /// Wait for the next focus change. `None` means the source is closed.
    async fn next_event(&mut self) -> Option<FocusEvent>;

    /// Stop delivering events. Later calls to `next_event` return `None`.
    fn stop(&mut self);
}

/// In-process focus source, for tests and embedding hosts.
#[derive(Debug)]
pub struct ChannelFocusSource {
    receiver: mpsc::UnboundedReceiver<FocusEvent>,
    current: Arc<Mutex<Option<FocusEvent>>>,
    stopped: bool,
}

/// Sending half of a [`ChannelFocusSource`].
#[derive(Debug, Clone)]
pub struct FocusSender {
    sender: mpsc::UnboundedSender<FocusEvent>,
    current: Arc<Mutex<Option<FocusEvent>>>,
}

impl ChannelFocusSource {
    /// Create a connected sender/source pair.
    pub fn channel() -> (FocusSender, Self) {
        Self::with_initial(None)
    }

    /// Pair whose `current()` starts out as `initial`.
    pub fn with_initial(initial: Option<FocusEvent>) -> (FocusSender, Self) {
        let (sender, receiver) = mpsc::unbounded_channel();
        let current = Arc::new(Mutex::new(initial));
        (
            FocusSender {
                sender,
                current: current.clone(),
            },
            Self {
                receiver,
                current,
                stopped: false,
            },
        )
    }
}

impl FocusSender {
    /// Deliver a focus change. Returns `false` once the source has stopped.
    pub fn send(&self, event: FocusEvent) -> bool {
        *self.current.lock() = Some(event.clone());
        self.sender.send(event).is_ok()
    }

    /// Shorthand for an event without a display name.
    pub fn focus(&self, application_id: impl Into<String>) -> bool {
        self.send(FocusEvent::new(application_id))
    }
}

#[async_trait]
impl FocusEventSource for ChannelFocusSource {
    fn current(&self) -> Option<FocusEvent> {
        self.current.lock().clone()
    }

    async fn next_event(&mut self) -> Option<FocusEvent> {
        if self.stopped {
            return None;
        }
        self.receiver.recv().await
    }

    fn stop(&mut self) {
        self.stopped = true;
        self.receiver.close();
    }
}

/// Polls an external command and emits an event whenever its trimmed stdout
/// changes.
///
/// Command failures and empty output are logged and skipped; the previous
/// focus stays current.
#[derive(Debug)]
pub struct CommandFocusSource {
    argv: Vec<String>,
    ticker: Interval,
    last: Option<FocusEvent>,
    stopped: bool,
}

impl CommandFocusSource {
    /// `argv[0]` is the program, the rest are its arguments.
    pub fn new(argv: Vec<String>, poll_interval: Duration) -> Self {
        let mut ticker = interval(poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        info!(command = ?argv, ?poll_interval, "Polling focus command");
        Self {
            argv,
            ticker,
            last: None,
            stopped: false,
        }
    }

    /// Run the command once so `current()` is populated before the engine
    /// starts.
    pub async fn primed(mut self) -> Self {
        self.last = run_focus_command(&self.argv).await;
        self
    }
}

async fn run_focus_command(argv: &[String]) -> Option<FocusEvent> {
    let (program, args) = argv.split_first()?;
    let output = match Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stderr(Stdio::null())
        .kill_on_drop(true)
        .output()
        .await
    {
        Ok(output) => output,
        Err(e) => {
            warn!(program = %program, error = %e, "Failed to run focus command");
            return None;
        }
    };

    if !output.status.success() {
        debug!(program = %program, status = %output.status, "Focus command failed");
        return None;
    }

    let application_id = String::from_utf8_lossy(&output.stdout).trim().to_string();
    if application_id.is_empty() {
        return None;
    }
    Some(FocusEvent::new(application_id))
}

#[async_trait]
impl FocusEventSource for CommandFocusSource {
    fn current(&self) -> Option<FocusEvent> {
        self.last.clone()
    }

    async fn next_event(&mut self) -> Option<FocusEvent> {
        loop {
            if self.stopped || self.argv.is_empty() {
                return None;
            }
            self.ticker.tick().await;

            let Some(event) = run_focus_command(&self.argv).await else {
                continue;
            };
            if self.last.as_ref() != Some(&event) {
                self.last = Some(event.clone());
                return Some(event);
            }
        }
    }

    fn stop(&mut self) {
        self.stopped = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_channel_source_delivers_in_order() {
        let (sender, mut source) = ChannelFocusSource::channel();
        assert!(source.current().is_none());

        assert!(sender.focus("app.one"));
        assert!(sender.send(FocusEvent::new("app.two").with_display_name("Two")));

        assert_eq!(source.next_event().await, Some(FocusEvent::new("app.one")));
        assert_eq!(
            source.next_event().await.map(|e| e.display_name),
            Some(Some("Two".to_string()))
        );
        assert_eq!(
            source.current().map(|e| e.application_id),
            Some("app.two".to_string())
        );
    }

    #[tokio::test]
    async fn test_channel_source_stop_closes_stream() {
        let (sender, mut source) = ChannelFocusSource::channel();
        source.stop();

        assert!(!sender.focus("app.late"));
        assert_eq!(source.next_event().await, None);
    }

    #[tokio::test]
    async fn test_closed_sender_ends_stream() {
        let (sender, mut source) = ChannelFocusSource::channel();
        drop(sender);
        assert_eq!(source.next_event().await, None);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_command_source_reports_trimmed_output() {
        let source = CommandFocusSource::new(
            vec!["echo".to_string(), "  app.echo  ".to_string()],
            Duration::from_millis(5),
        )
        .primed()
        .await;

        assert_eq!(source.current(), Some(FocusEvent::new("app.echo")));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_command_source_skips_failing_command() {
        let source = CommandFocusSource::new(vec!["false".to_string()], Duration::from_millis(5))
            .primed()
            .await;
        assert!(source.current().is_none());
    }

    #[tokio::test]
    async fn test_empty_command_is_closed() {
        let mut source = CommandFocusSource::new(Vec::new(), Duration::from_millis(5));
        assert_eq!(source.next_event().await, None);
    }
}
