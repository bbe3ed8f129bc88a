//! Integration tests for profile repository

use std::fs;

use keypilot_profile_repository::prelude::*;
use proptest::prelude::*;
use tempfile::TempDir;
use tracing_test::traced_test;

fn must<T, E: std::fmt::Debug>(r: std::result::Result<T, E>) -> T {
    match r {
        Ok(v) => v,
        Err(e) => panic!("unexpected Err: {e:?}"),
    }
}

fn create_test_repository() -> (ProfileRepository, JsonFileStore, TempDir) {
    let temp_dir = must(TempDir::new());
    let store = JsonFileStore::new(temp_dir.path().join("profiles.json"));
    let repo = must(ProfileRepository::open(store.clone()));
    (repo, store, temp_dir)
}

fn create_test_profile(name: &str, app: &str) -> Profile {
    Profile::new(name)
        .with_applications([app])
        .with_mapping(KeyMapping::new(["a", "b", "c"], "left", "space", "right"))
}

mod repository_lifecycle {
    use super::*;

    #[test]
    fn test_first_open_writes_seed_document() {
        let (repo, store, _temp_dir) = create_test_repository();

        assert!(store.path().exists());
        assert_eq!(repo.len(), 3);
        assert!(repo.find_by_application_id("app.whispering").is_some());
        assert!(repo.find_by_application_id("com.apple.FinalCut").is_some());
        assert_eq!(
            repo.find_default().map(|p| p.name.as_str()),
            Some("Default")
        );
    }

    #[test]
    fn test_changes_survive_reopen() {
        let (mut repo, store, _temp_dir) = create_test_repository();

        let profile = create_test_profile("Editor", "app.editor");
        let id = profile.id;
        must(repo.add(profile));
        must(repo.set_default(id));
        drop(repo);

        let reopened = must(ProfileRepository::open(store));
        assert_eq!(reopened.len(), 4);
        assert_eq!(reopened.find_default().map(|p| p.id), Some(id));
        assert_eq!(
            reopened.profiles().last().map(|p| p.name.as_str()),
            Some("Editor")
        );
    }

    #[test]
    fn test_deleting_everything_reseeds_on_next_open() {
        let (mut repo, store, _temp_dir) = create_test_repository();

        let ids: Vec<_> = repo.profiles().iter().map(|p| p.id).collect();
        for id in ids {
            must(repo.delete(id));
        }
        assert!(repo.is_empty());
        drop(repo);

        let reopened = must(ProfileRepository::open(store));
        assert_eq!(reopened.len(), 3);
    }
}

mod recovery {
    use super::*;

    #[test]
    #[traced_test]
    fn test_corrupt_document_is_preserved_and_reseeded() {
        let temp_dir = must(TempDir::new());
        let store = JsonFileStore::new(temp_dir.path().join("profiles.json"));
        must(fs::write(store.path(), "[{\"id\": 42"));

        let repo = must(ProfileRepository::open(store.clone()));

        assert_eq!(repo.len(), 3);
        assert!(store.quarantine_path().exists());
        assert!(logs_contain("corrupt"));
    }

    #[test]
    fn test_legacy_bundle_identifier_documents_load() {
        let temp_dir = must(TempDir::new());
        let store = JsonFileStore::new(temp_dir.path().join("profiles.json"));
        let legacy = r#"[
          {
            "id": "5f0a6a3e-3b1c-4a53-9a8e-0f5f0f2d9c11",
            "name": "Final Cut Pro",
            "icon": "🎬",
            "bundleIdentifiers": ["com.apple.FinalCut"],
            "isDefault": true,
            "keyMapping": {
              "button1": "cmd-b", "button2": "cmd-leftbracket", "button3": "cmd-rightbracket",
              "knobCCW": "left", "knobPress": "space", "knobCW": "right"
            }
          }
        ]"#;
        must(fs::write(store.path(), legacy));

        let repo = must(ProfileRepository::open(store));
        assert_eq!(repo.len(), 1);
        assert_eq!(
            repo.find_by_application_id("com.apple.FinalCut")
                .map(|p| p.key_mapping.knob_press.as_str()),
            Some("space")
        );
    }
}

#[derive(Debug, Clone)]
enum Mutation {
    Add { default: bool },
    SetDefault(usize),
    Update { index: usize, default: bool },
    Delete(usize),
}

fn mutation_strategy() -> impl Strategy<Value = Mutation> {
    prop_oneof![
        any::<bool>().prop_map(|default| Mutation::Add { default }),
        (0usize..8).prop_map(Mutation::SetDefault),
        (0usize..8, any::<bool>()).prop_map(|(index, default)| Mutation::Update { index, default }),
        (0usize..8).prop_map(Mutation::Delete),
    ]
}

proptest! {
    #[test]
    fn prop_at_most_one_default_after_any_mutation_sequence(
        mutations in proptest::collection::vec(mutation_strategy(), 1..24)
    ) {
        let mut repo = must(ProfileRepository::in_memory(Vec::new()));

        for mutation in mutations {
            let ids: Vec<ProfileId> = repo.profiles().iter().map(|p| p.id).collect();
            let pick = |i: usize| ids.get(i % ids.len().max(1)).copied();
            match mutation {
                Mutation::Add { default } => {
                    let mut profile = Profile::new("Generated");
                    profile.is_default = default;
                    must(repo.add(profile));
                }
                Mutation::SetDefault(i) => {
                    if let Some(id) = pick(i) {
                        must(repo.set_default(id));
                    }
                }
                Mutation::Update { index, default } => {
                    if let Some(mut profile) = pick(index).and_then(|id| repo.get(id).cloned()) {
                        profile.is_default = default;
                        must(repo.update(profile));
                    }
                }
                Mutation::Delete(i) => {
                    if let Some(id) = pick(i) {
                        must(repo.delete(id));
                    }
                }
            }
            prop_assert!(repo.default_count() <= 1);
        }
    }
}
