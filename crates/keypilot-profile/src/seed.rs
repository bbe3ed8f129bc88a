//! Built-in profiles used to seed an empty repository.

use crate::{KeyMapping, Profile};

/// The starter set: two application profiles and one default.
///
/// Exactly one returned profile has `is_default` set.
pub fn seed_profiles() -> Vec<Profile> {
    vec![
        Profile::new("Whispering")
            .with_icon("🎤")
            .with_applications(["app.whispering"])
            .with_mapping(KeyMapping::new(
                ["f13", "f19", "f20"],
                "volumedown",
                "mute",
                "volumeup",
            )),
        Profile::new("Final Cut Pro")
            .with_icon("🎬")
            .with_applications(["com.apple.FinalCut"])
            .with_mapping(KeyMapping::new(
                ["cmd-b", "cmd-leftbracket", "cmd-rightbracket"],
                "left",
                "space",
                "right",
            )),
        Profile::new("Default")
            .with_icon("⌨️")
            .as_default()
            .with_mapping(KeyMapping::new(
                ["cmd-c", "cmd-v", "cmd-z"],
                "volumedown",
                "mute",
                "volumeup",
            )),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seed_has_exactly_one_default() {
        let profiles = seed_profiles();
        assert_eq!(profiles.iter().filter(|p| p.is_default).count(), 1);
    }

    #[test]
    fn test_seed_mappings_are_valid() {
        for profile in seed_profiles() {
            assert!(
                profile.key_mapping.invalid_fields().is_empty(),
                "seed profile {} has invalid fields",
                profile.name
            );
        }
    }

    #[test]
    fn test_seed_ids_are_unique() {
        let profiles = seed_profiles();
        let mut ids: Vec<_> = profiles.iter().map(|p| p.id).collect();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), profiles.len());
    }
}
