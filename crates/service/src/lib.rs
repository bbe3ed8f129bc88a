//! KeyPilot service - focus-driven profile switching for the macro pad
//!
//! - [`profile_switcher`]: the resolution and sync engine
//! - [`focus`]: where focus changes come from
//! - [`sync_state`]: what observers see
//! - [`config`] and [`daemon`]: process wiring for `keypilotd`

pub mod config;
pub mod daemon;
pub mod focus;
pub mod profile_switcher;
pub mod sync_state;

pub use config::{FocusConfig, KeyPilotConfig};
pub use daemon::{KeyPilotDaemon, RunningDaemon};
pub use focus::{ChannelFocusSource, CommandFocusSource, FocusEvent, FocusEventSource, FocusSender};
pub use profile_switcher::{ProfileSwitcher, SwitcherConfig, SwitcherHandle, spawn_switcher};
pub use sync_state::{ActivationOutcome, ActivationTrigger, SwitchEvent, SyncPhase, SyncState};
