//! Profile persistence boundary.
//!
//! Repositories store whole profile documents and guard writes with the
//! profile's `version`: `replace` only succeeds when the stored version still
//! equals the version the caller read.

use crate::{Error, Profile, Result, UserId};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

/// Storage contract required by the profile service
pub trait ProfileRepository: Send + Sync {
    /// Fetch the stored profile, if any
    fn load(&self, user_id: &UserId) -> Result<Option<Profile>>;

    /// Store a new profile.
    ///
    /// Fails with `ConcurrentModification` if a document already exists.
    fn insert(&self, profile: &Profile) -> Result<()>;

    /// Overwrite the stored profile if its version is still `expected_version`.
    ///
    /// Fails with `ConcurrentModification` otherwise.
    fn replace(&self, profile: &Profile, expected_version: u64) -> Result<()>;
}

impl<R: ProfileRepository + ?Sized> ProfileRepository for std::sync::Arc<R> {
    fn load(&self, user_id: &UserId) -> Result<Option<Profile>> {
        (**self).load(user_id)
    }

    fn insert(&self, profile: &Profile) -> Result<()> {
        (**self).insert(profile)
    }

    fn replace(&self, profile: &Profile, expected_version: u64) -> Result<()> {
        (**self).replace(profile, expected_version)
    }
}

/// In-process repository backed by a mutex-guarded map
#[derive(Debug, Default)]
pub struct MemoryRepository {
    profiles: Mutex<HashMap<UserId, Profile>>,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.lock().map(|p| p.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> Result<MutexGuard<'_, HashMap<UserId, Profile>>> {
        self.profiles
            .lock()
            .map_err(|_| Error::RepositoryUnavailable("profile map lock poisoned".into()))
    }
}

impl ProfileRepository for MemoryRepository {
    fn load(&self, user_id: &UserId) -> Result<Option<Profile>> {
        Ok(self.lock()?.get(user_id).cloned())
    }

    fn insert(&self, profile: &Profile) -> Result<()> {
        let mut profiles = self.lock()?;
        if profiles.contains_key(&profile.user_id) {
            return Err(Error::ConcurrentModification {
                user_id: profile.user_id.to_string(),
                expected: profile.version,
            });
        }
        profiles.insert(profile.user_id.clone(), profile.clone());
        Ok(())
    }

    fn replace(&self, profile: &Profile, expected_version: u64) -> Result<()> {
        let mut profiles = self.lock()?;
        match profiles.get_mut(&profile.user_id) {
            Some(stored) if stored.version == expected_version => {
                *stored = profile.clone();
                Ok(())
            }
            _ => Err(Error::ConcurrentModification {
                user_id: profile.user_id.to_string(),
                expected: expected_version,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::get_default_catalog;
    use chrono::Utc;

    fn profile(id: &str) -> Profile {
        Profile::new(UserId::parse(id).unwrap(), get_default_catalog(), Utc::now())
    }

    #[test]
    fn test_insert_then_load() {
        let repo = MemoryRepository::new();
        let p = profile("a");
        assert!(repo.load(&p.user_id).unwrap().is_none());

        repo.insert(&p).unwrap();
        assert_eq!(repo.load(&p.user_id).unwrap(), Some(p));
        assert_eq!(repo.len(), 1);
    }

    #[test]
    fn test_double_insert_conflicts() {
        let repo = MemoryRepository::new();
        let p = profile("a");
        repo.insert(&p).unwrap();
        assert!(matches!(
            repo.insert(&p),
            Err(Error::ConcurrentModification { .. })
        ));
    }

    #[test]
    fn test_replace_checks_version() {
        let repo = MemoryRepository::new();
        let mut p = profile("a");
        repo.insert(&p).unwrap();

        p.experience = 10;
        p.version = 1;
        repo.replace(&p, 0).unwrap();

        // A writer still holding version 0 loses
        let mut stale = p.clone();
        stale.experience = 99;
        stale.version = 1;
        assert!(matches!(
            repo.replace(&stale, 0),
            Err(Error::ConcurrentModification { expected: 0, .. })
        ));
        assert_eq!(repo.load(&p.user_id).unwrap().unwrap().experience, 10);
    }

    #[test]
    fn test_replace_missing_conflicts() {
        let repo = MemoryRepository::new();
        assert!(repo.replace(&profile("ghost"), 0).is_err());
    }
}
