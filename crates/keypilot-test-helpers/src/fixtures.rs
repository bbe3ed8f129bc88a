//! Profile fixtures for common test scenarios.

use keypilot_profile::{KeyMapping, Profile};

pub const WRITER_APP: &str = "app.writer";
pub const EDITOR_APP: &str = "app.editor";
pub const UNMATCHED_APP: &str = "app.unmatched";

pub fn writer_mapping() -> KeyMapping {
    KeyMapping::new(["cmd-b", "cmd-i", "cmd-u"], "left", "space", "right")
}

pub fn editor_mapping() -> KeyMapping {
    KeyMapping::new(["cmd-s", "cmd-f", "cmd-shift-f"], "up", "enter", "down")
}

pub fn general_mapping() -> KeyMapping {
    KeyMapping::new(["cmd-c", "cmd-v", "cmd-z"], "volumedown", "mute", "volumeup")
}

/// Profile bound to [`WRITER_APP`].
pub fn writer_profile() -> Profile {
    Profile::new("Writer")
        .with_icon("✍️")
        .with_applications([WRITER_APP])
        .with_mapping(writer_mapping())
}

/// Profile bound to [`EDITOR_APP`].
pub fn editor_profile() -> Profile {
    Profile::new("Editor")
        .with_applications([EDITOR_APP])
        .with_mapping(editor_mapping())
}

/// Default profile with no bindings.
pub fn general_profile() -> Profile {
    Profile::new("General")
        .as_default()
        .with_mapping(general_mapping())
}

/// The writer/editor/general set used by most engine scenarios.
#[derive(Debug, Clone)]
pub struct ProfileSet {
    pub writer: Profile,
    pub editor: Profile,
    pub general: Profile,
}

impl ProfileSet {
    pub fn new() -> Self {
        Self {
            writer: writer_profile(),
            editor: editor_profile(),
            general: general_profile(),
        }
    }

    /// Profiles in repository order.
    pub fn to_vec(&self) -> Vec<Profile> {
        vec![
            self.writer.clone(),
            self.editor.clone(),
            self.general.clone(),
        ]
    }

    /// Same set with no default profile.
    pub fn without_default(mut self) -> Self {
        self.general.is_default = false;
        self
    }
}

impl Default for ProfileSet {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_has_single_default() {
        let set = ProfileSet::new();
        assert_eq!(set.to_vec().iter().filter(|p| p.is_default).count(), 1);
        assert_eq!(
            set.without_default()
                .to_vec()
                .iter()
                .filter(|p| p.is_default)
                .count(),
            0
        );
    }

    #[test]
    fn test_mappings_are_distinct() {
        assert_ne!(writer_mapping(), editor_mapping());
        assert_ne!(writer_mapping(), general_mapping());
    }
}
