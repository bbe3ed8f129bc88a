//! Profile repository core implementation

use std::collections::HashSet;
use std::sync::Arc;

use keypilot_errors::RepositoryError;
use keypilot_profile::{Profile, ProfileId, seed_profiles};
use parking_lot::RwLock;
use tracing::{debug, info, warn};

use crate::storage::{MemoryStore, ProfileStore};

/// Repository shared between the switching engine and whatever edits
/// profiles. Never hold the guard across an `.await`.
pub type SharedRepository = Arc<RwLock<ProfileRepository>>;

/// Ordered profile collection backed by a [`ProfileStore`].
///
/// Every mutation rewrites the whole document. A failed write is returned as
/// [`RepositoryError::PersistFailed`] but the in-memory change stays applied.
pub struct ProfileRepository {
    profiles: Vec<Profile>,
    store: Box<dyn ProfileStore>,
}

impl std::fmt::Debug for ProfileRepository {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProfileRepository")
            .field("profiles", &self.profiles.len())
            .field("store", &self.store.location())
            .finish()
    }
}

impl ProfileRepository {
    /// Load the collection from `store`, seeding it when empty.
    ///
    /// # Error Recovery
    ///
    /// - A document with several defaults keeps only the first one
    /// - Profiles repeating an earlier id are dropped
    /// - Either repair, and seeding, is written back; a failed write-back is
    ///   logged and the loaded collection is still used
    pub fn open(store: impl ProfileStore + 'static) -> Result<Self, RepositoryError> {
        let loaded = store.load()?;
        let mut repo = Self {
            profiles: Vec::new(),
            store: Box::new(store),
        };

        if loaded.is_empty() {
            info!(store = %repo.store.location(), "No stored profiles, seeding built-in set");
            repo.profiles = seed_profiles();
            repo.write_back_after_open();
            return Ok(repo);
        }

        let (profiles, repaired) = normalize(loaded);
        repo.profiles = profiles;
        if repaired {
            repo.write_back_after_open();
        }

        info!(
            store = %repo.store.location(),
            count = repo.profiles.len(),
            "Profile repository opened"
        );
        Ok(repo)
    }

    /// Repository over a fresh [`MemoryStore`] holding `profiles` (seeded
    /// when empty).
    pub fn in_memory(profiles: Vec<Profile>) -> Result<Self, RepositoryError> {
        Self::open(MemoryStore::with_profiles(profiles))
    }

    /// Wrap into the lock used by the switching engine.
    pub fn shared(self) -> SharedRepository {
        Arc::new(RwLock::new(self))
    }

    fn write_back_after_open(&self) {
        if let Err(e) = self.store.save(&self.profiles) {
            warn!(error = %e, "Failed to write back profile document");
        }
    }

    fn persist(&self) -> Result<(), RepositoryError> {
        self.store.save(&self.profiles).inspect_err(|e| {
            warn!(error = %e, "Profile change kept in memory but not persisted");
        })
    }

    /// All profiles in stored order.
    pub fn profiles(&self) -> &[Profile] {
        &self.profiles
    }

    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }

    pub fn get(&self, id: ProfileId) -> Option<&Profile> {
        self.profiles.iter().find(|p| p.id == id)
    }

    /// First profile with exactly this name.
    pub fn find_by_name(&self, name: &str) -> Option<&Profile> {
        self.profiles.iter().find(|p| p.name == name)
    }

    /// First profile, in stored order, that lists `application_id`.
    pub fn find_by_application_id(&self, application_id: &str) -> Option<&Profile> {
        self.profiles
            .iter()
            .find(|p| p.matches_application(application_id))
    }

    /// The profile flagged as default, if any.
    pub fn find_default(&self) -> Option<&Profile> {
        self.profiles.iter().find(|p| p.is_default)
    }

    pub fn default_count(&self) -> usize {
        self.profiles.iter().filter(|p| p.is_default).count()
    }

    /// Append a profile. A default profile takes the flag from every other
    /// profile.
    pub fn add(&mut self, profile: Profile) -> Result<(), RepositoryError> {
        if self.get(profile.id).is_some() {
            return Err(RepositoryError::DuplicateId(profile.id.to_string()));
        }

        if profile.is_default {
            self.clear_default_except(profile.id);
        }
        info!(profile_id = %profile.id, name = %profile.name, "Adding profile");
        self.profiles.push(profile);
        self.persist()
    }

    /// Replace the stored profile with the same id, keeping its position.
    pub fn update(&mut self, profile: Profile) -> Result<(), RepositoryError> {
        let Some(index) = self.profiles.iter().position(|p| p.id == profile.id) else {
            return Err(RepositoryError::not_found(profile.id.to_string()));
        };

        if profile.is_default {
            self.clear_default_except(profile.id);
        }
        debug!(profile_id = %profile.id, "Updating profile");
        if let Some(slot) = self.profiles.get_mut(index) {
            *slot = profile;
        }
        self.persist()
    }

    /// Remove a profile. Removing the default leaves the repository without
    /// one.
    pub fn delete(&mut self, id: ProfileId) -> Result<Profile, RepositoryError> {
        let Some(index) = self.profiles.iter().position(|p| p.id == id) else {
            return Err(RepositoryError::not_found(id.to_string()));
        };

        let removed = self.profiles.remove(index);
        info!(profile_id = %id, name = %removed.name, "Deleted profile");
        self.persist().map(|()| removed)
    }

    /// Make `id` the only default profile.
    pub fn set_default(&mut self, id: ProfileId) -> Result<(), RepositoryError> {
        if self.get(id).is_none() {
            return Err(RepositoryError::not_found(id.to_string()));
        }

        for profile in &mut self.profiles {
            profile.is_default = profile.id == id;
        }
        info!(profile_id = %id, "Default profile changed");
        self.persist()
    }

    fn clear_default_except(&mut self, keep: ProfileId) {
        for profile in self.profiles.iter_mut().filter(|p| p.id != keep) {
            profile.is_default = false;
        }
    }
}

/// Enforce unique ids and at most one default. Returns whether anything
/// changed.
fn normalize(loaded: Vec<Profile>) -> (Vec<Profile>, bool) {
    let mut repaired = false;
    let mut seen = HashSet::with_capacity(loaded.len());
    let mut has_default = false;
    let mut profiles = Vec::with_capacity(loaded.len());

    for mut profile in loaded {
        if !seen.insert(profile.id) {
            warn!(profile_id = %profile.id, name = %profile.name, "Dropping profile with duplicate id");
            repaired = true;
            continue;
        }
        if profile.is_default {
            if has_default {
                warn!(profile_id = %profile.id, "Clearing extra default flag");
                profile.is_default = false;
                repaired = true;
            }
            has_default = true;
        }
        profiles.push(profile);
    }

    (profiles, repaired)
}

#[cfg(test)]
mod tests {
    use super::*;
    use keypilot_profile::KeyMapping;
    use keypilot_test_helpers::{must, must_some};

    fn writer() -> Profile {
        Profile::new("Writer")
            .with_applications(["app.writer"])
            .with_mapping(KeyMapping::new(["cmd-b", "cmd-i", "cmd-u"], "", "", ""))
    }

    fn create_test_repo() -> (ProfileRepository, MemoryStore) {
        let store = MemoryStore::with_profiles(vec![
            writer(),
            Profile::new("Fallback").as_default(),
        ]);
        let repo = must(ProfileRepository::open(store.clone()));
        (repo, store)
    }

    #[test]
    fn test_empty_store_is_seeded_and_persisted() {
        let store = MemoryStore::new();
        let repo = must(ProfileRepository::open(store.clone()));

        assert_eq!(repo.len(), 3);
        assert_eq!(repo.default_count(), 1);
        assert_eq!(store.persisted().len(), 3);
    }

    #[test]
    fn test_find_by_application_uses_stored_order() {
        let first = Profile::new("First").with_applications(["shared.app"]);
        let second = Profile::new("Second").with_applications(["shared.app"]);
        let first_id = first.id;
        let repo = must(ProfileRepository::in_memory(vec![first, second]));

        let found = must_some(repo.find_by_application_id("shared.app"), "shared app should resolve");
        assert_eq!(found.id, first_id);
        assert!(repo.find_by_application_id("unknown.app").is_none());
    }

    #[test]
    fn test_add_default_clears_previous_default() {
        let (mut repo, _store) = create_test_repo();
        let new_default = Profile::new("New").as_default();
        let id = new_default.id;

        must(repo.add(new_default));

        assert_eq!(repo.default_count(), 1);
        assert_eq!(must_some(repo.find_default(), "default profile").id, id);
    }

    #[test]
    fn test_add_duplicate_id_is_rejected() {
        let (mut repo, _store) = create_test_repo();
        let existing = must_some(repo.profiles().first(), "seeded profile").clone();

        let result = repo.add(existing);
        assert!(matches!(result, Err(RepositoryError::DuplicateId(_))));
        assert_eq!(repo.len(), 2);
    }

    #[test]
    fn test_update_keeps_position_and_persists() {
        let (mut repo, store) = create_test_repo();
        let mut changed = must_some(repo.profiles().first(), "seeded profile").clone();
        changed.name = "Renamed".to_string();

        must(repo.update(changed));

        assert_eq!(repo.profiles().first().map(|p| p.name.as_str()), Some("Renamed"));
        assert_eq!(store.persisted().first().map(|p| p.name.clone()), Some("Renamed".to_string()));
    }

    #[test]
    fn test_update_unknown_is_not_found() {
        let (mut repo, store) = create_test_repo();
        let saves_before = store.save_count();

        let result = repo.update(Profile::new("Ghost"));
        assert!(matches!(result, Err(RepositoryError::ProfileNotFound(_))));
        assert_eq!(store.save_count(), saves_before);
    }

    #[test]
    fn test_set_default_unknown_changes_nothing() {
        let (mut repo, _store) = create_test_repo();
        let default_before = must_some(repo.find_default(), "default profile").id;

        let result = repo.set_default(ProfileId::new_v4());
        assert!(matches!(result, Err(RepositoryError::ProfileNotFound(_))));
        assert_eq!(must_some(repo.find_default(), "default profile").id, default_before);
    }

    #[test]
    fn test_delete_default_leaves_no_default() {
        let (mut repo, _store) = create_test_repo();
        let default_id = must_some(repo.find_default(), "default profile").id;

        let removed = must(repo.delete(default_id));
        assert_eq!(removed.id, default_id);
        assert!(repo.find_default().is_none());
    }

    #[test]
    fn test_persist_failure_keeps_in_memory_change() {
        let (mut repo, store) = create_test_repo();
        store.set_fail_saves(true);

        let added = Profile::new("Unsaved");
        let id = added.id;
        let result = repo.add(added);

        assert!(matches!(result, Err(RepositoryError::PersistFailed { .. })));
        assert!(repo.get(id).is_some());
        assert!(store.persisted().iter().all(|p| p.id != id));
    }

    #[test]
    fn test_open_normalizes_multiple_defaults() {
        let first = Profile::new("A").as_default();
        let first_id = first.id;
        let store = MemoryStore::with_profiles(vec![first, Profile::new("B").as_default()]);

        let repo = must(ProfileRepository::open(store.clone()));

        assert_eq!(repo.default_count(), 1);
        assert_eq!(must_some(repo.find_default(), "default profile").id, first_id);
        assert_eq!(store.persisted().iter().filter(|p| p.is_default).count(), 1);
    }

    #[test]
    fn test_open_drops_duplicate_ids() {
        let original = Profile::new("Original");
        let mut copy = Profile::new("Copy");
        copy.id = original.id;

        let repo = must(ProfileRepository::in_memory(vec![original, copy]));
        assert_eq!(repo.len(), 1);
        assert_eq!(repo.profiles().first().map(|p| p.name.as_str()), Some("Original"));
    }
}
