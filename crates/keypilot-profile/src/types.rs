//! Profile type definitions

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

/// Stable profile identifier, assigned at creation and never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProfileId(Uuid);

impl ProfileId {
    /// Generate a fresh identifier.
    pub fn new_v4() -> Self {
        Self(Uuid::new_v4())
    }

    /// Wrap an existing UUID.
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl fmt::Display for ProfileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for ProfileId {
    type Err = ProfileIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s.trim())
            .map(Self)
            .map_err(|_| ProfileIdError(s.to_string()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Invalid profile ID: {0}")]
pub struct ProfileIdError(pub String);

/// Action assignment for one row of three buttons and one rotary knob.
///
/// Every field is either empty (unassigned) or an action token such as
/// `cmd-shift-b`, `volumeup`, `click(left)` or `<110>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct KeyMapping {
    pub button1: String,
    pub button2: String,
    pub button3: String,
    #[serde(rename = "knobCCW")]
    pub knob_ccw: String,
    #[serde(rename = "knobPress")]
    pub knob_press: String,
    #[serde(rename = "knobCW")]
    pub knob_cw: String,
}

/// Content hash of a [`KeyMapping`], used to tell whether the device already
/// holds a given configuration.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct MappingFingerprint([u8; 32]);

impl fmt::Debug for MappingFingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MappingFingerprint(")?;
        for byte in self.0.iter().take(6) {
            write!(f, "{byte:02x}")?;
        }
        write!(f, "..)")
    }
}

impl KeyMapping {
    pub fn new(
        buttons: [&str; 3],
        knob_ccw: impl Into<String>,
        knob_press: impl Into<String>,
        knob_cw: impl Into<String>,
    ) -> Self {
        let [button1, button2, button3] = buttons;
        Self {
            button1: button1.to_string(),
            button2: button2.to_string(),
            button3: button3.to_string(),
            knob_ccw: knob_ccw.into(),
            knob_press: knob_press.into(),
            knob_cw: knob_cw.into(),
        }
    }

    /// The six fields in device order, paired with their document names.
    pub fn fields(&self) -> [(&'static str, &str); 6] {
        [
            ("button1", self.button1.as_str()),
            ("button2", self.button2.as_str()),
            ("button3", self.button3.as_str()),
            ("knobCCW", self.knob_ccw.as_str()),
            ("knobPress", self.knob_press.as_str()),
            ("knobCW", self.knob_cw.as_str()),
        ]
    }

    pub fn is_empty(&self) -> bool {
        self.fields().iter().all(|(_, value)| value.is_empty())
    }

    /// Stable content hash over all six fields.
    pub fn fingerprint(&self) -> MappingFingerprint {
        let mut hasher = Sha256::new();
        for (name, value) in self.fields() {
            hasher.update(name.as_bytes());
            hasher.update([0u8]);
            hasher.update(value.as_bytes());
            hasher.update([0xffu8]);
        }
        MappingFingerprint(hasher.finalize().into())
    }
}

/// A named configuration for the device, optionally bound to applications
/// and optionally marked as the fallback default.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    pub id: ProfileId,
    pub name: String,
    #[serde(default = "default_icon")]
    pub icon: String,
    /// Application identifiers (bundle IDs, WM classes, ...) this profile
    /// applies to. Matching is exact and case-sensitive.
    #[serde(default, alias = "bundleIdentifiers")]
    pub application_identifiers: Vec<String>,
    #[serde(default)]
    pub is_default: bool,
    #[serde(default)]
    pub key_mapping: KeyMapping,
}

pub const DEFAULT_ICON: &str = "⌨️";

fn default_icon() -> String {
    DEFAULT_ICON.to_string()
}

impl Profile {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: ProfileId::new_v4(),
            name: name.into(),
            icon: default_icon(),
            application_identifiers: Vec::new(),
            is_default: false,
            key_mapping: KeyMapping::default(),
        }
    }

    pub fn with_icon(mut self, icon: impl Into<String>) -> Self {
        self.icon = icon.into();
        self
    }

    pub fn with_applications<I, S>(mut self, apps: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.application_identifiers = apps.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_mapping(mut self, mapping: KeyMapping) -> Self {
        self.key_mapping = mapping;
        self
    }

    pub fn as_default(mut self) -> Self {
        self.is_default = true;
        self
    }

    pub fn matches_application(&self, application_id: &str) -> bool {
        self.application_identifiers
            .iter()
            .any(|candidate| candidate == application_id)
    }
}
