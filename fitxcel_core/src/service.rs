//! Profile service: the operations callers use.
//!
//! Every operation is a read-then-conditional-write against the repository.
//! Mutations are computed on a copy of the profile that was read and written
//! back with `replace(next, read_version)`. If another writer got there first
//! the whole read-mutate-write is repeated on fresh data, up to
//! `max_attempts` times, so a reward is never applied twice.

use crate::progression::LevelCurve;
use crate::{
    stats, Config, LevelProgress, Profile, ProfileRepository, Result, TaskCatalog, TaskId,
    TaskView, UserId,
};
use chrono::Utc;
use std::time::Duration;

pub struct ProfileService<R> {
    repo: R,
    catalog: TaskCatalog,
    curve: LevelCurve,
    max_attempts: u32,
    retry_backoff: Duration,
}

impl<R: ProfileRepository> ProfileService<R> {
    /// Service with the default level curve and retry budget
    pub fn new(repo: R, catalog: TaskCatalog) -> Self {
        Self {
            repo,
            catalog,
            curve: LevelCurve::default(),
            max_attempts: 5,
            retry_backoff: Duration::from_millis(10),
        }
    }

    /// Service configured from `config`, including its custom tasks
    pub fn from_config(repo: R, config: &Config) -> Result<Self> {
        config.validate()?;
        Ok(Self::new(repo, config.catalog()?)
            .with_curve(config.progression.curve()?)
            .with_retry(config.store.max_attempts, config.store.retry_backoff()))
    }

    /// Replace the level curve; build it with `LevelCurve::new`
    pub fn with_curve(mut self, curve: LevelCurve) -> Self {
        self.curve = curve;
        self
    }

    pub fn with_retry(mut self, max_attempts: u32, backoff: Duration) -> Self {
        self.max_attempts = max_attempts.max(1);
        self.retry_backoff = backoff;
        self
    }

    pub fn repository(&self) -> &R {
        &self.repo
    }

    pub fn catalog(&self) -> &TaskCatalog {
        &self.catalog
    }

    pub fn curve(&self) -> &LevelCurve {
        &self.curve
    }

    /// Load the profile, creating or repairing it as needed
    pub fn get_or_create(&self, user_id: &UserId) -> Result<Profile> {
        self.retrying("get_or_create", user_id, || self.try_get_or_create(user_id))
    }

    /// Complete a task and apply its XP reward
    pub fn grant_task_completion(&self, user_id: &UserId, task_id: TaskId) -> Result<Profile> {
        self.update("grant_task_completion", user_id, |profile| {
            let (next, _granted) = self.catalog.complete_task(profile, task_id, &self.curve)?;
            Ok(Some(next))
        })
    }

    /// Spend one level point on the named stat
    pub fn spend_level_point(&self, user_id: &UserId, stat_name: &str) -> Result<Profile> {
        self.update("spend_level_point", user_id, |profile| {
            stats::upgrade(profile, stat_name).map(Some)
        })
    }

    /// Apply a bonus XP grant not tied to a task.
    ///
    /// Non-positive amounts leave the profile untouched and write nothing.
    pub fn grant_xp(&self, user_id: &UserId, amount: i64) -> Result<Profile> {
        self.update("grant_xp", user_id, |profile| {
            if amount <= 0 {
                tracing::debug!("Ignoring non-positive XP grant of {}", amount);
                return Ok(None);
            }
            let mut next = profile.clone();
            next.set_xp_state(self.curve.apply_xp(profile.xp_state(), amount));
            Ok(Some(next))
        })
    }

    /// The profile's tasks with names, rewards and completion state
    pub fn task_board(&self, user_id: &UserId) -> Result<Vec<TaskView>> {
        let profile = self.get_or_create(user_id)?;
        Ok(self.catalog.task_board(&profile))
    }

    /// Threshold and remaining XP for the profile's current level
    pub fn progress(&self, profile: &Profile) -> LevelProgress {
        self.curve.progress(profile.xp_state())
    }

    fn try_get_or_create(&self, user_id: &UserId) -> Result<Profile> {
        match self.repo.load(user_id)? {
            None => {
                let profile = Profile::new(user_id.clone(), &self.catalog, Utc::now());
                self.repo.insert(&profile)?;
                tracing::info!("Created profile for {}", user_id);
                Ok(profile)
            }
            Some(mut profile) => {
                let read_version = profile.version;
                let mut repaired = self.catalog.backfill(&mut profile);
                if repaired {
                    tracing::info!("Repaired task list for {}", user_id);
                }

                // Stored XP may predate a change of level curve
                let stored = profile.xp_state();
                let resolved = self.curve.normalize(stored);
                if resolved != stored {
                    tracing::warn!(
                        "Re-resolved XP of {} against the level curve: level {} -> {}",
                        user_id,
                        stored.level,
                        resolved.level
                    );
                    profile.set_xp_state(resolved);
                    repaired = true;
                }

                if repaired {
                    stamp(&mut profile, read_version);
                    self.repo.replace(&profile, read_version)?;
                }
                Ok(profile)
            }
        }
    }

    /// Read-mutate-conditional-write with retry.
    ///
    /// `mutate` sees the freshly read profile on every attempt and returns
    /// `None` when there is nothing to write.
    fn update<F>(&self, op: &str, user_id: &UserId, mutate: F) -> Result<Profile>
    where
        F: Fn(&Profile) -> Result<Option<Profile>>,
    {
        self.retrying(op, user_id, || {
            let current = self.try_get_or_create(user_id)?;
            match mutate(&current)? {
                None => Ok(current),
                Some(mut next) => {
                    stamp(&mut next, current.version);
                    self.repo.replace(&next, current.version)?;
                    Ok(next)
                }
            }
        })
    }

    fn retrying<T, F>(&self, op: &str, user_id: &UserId, attempt_fn: F) -> Result<T>
    where
        F: Fn() -> Result<T>,
    {
        let mut attempt = 1;
        loop {
            match attempt_fn() {
                Ok(value) => return Ok(value),
                Err(e) if e.is_retryable() && attempt < self.max_attempts => {
                    tracing::warn!(
                        "{} for {} failed (attempt {}/{}): {}. Retrying.",
                        op,
                        user_id,
                        attempt,
                        self.max_attempts,
                        e
                    );
                    std::thread::sleep(self.backoff(attempt));
                    attempt += 1;
                }
                Err(e) => {
                    if e.is_retryable() {
                        tracing::error!(
                            "{} for {} gave up after {} attempts: {}",
                            op,
                            user_id,
                            attempt,
                            e
                        );
                    }
                    return Err(e);
                }
            }
        }
    }
}

impl<R> ProfileService<R> {
    /// Linear backoff before retry `attempt + 1`
    fn backoff(&self, attempt: u32) -> Duration {
        self.retry_backoff.saturating_mul(attempt)
    }
}

/// Mark a profile as the successor of `read_version`
fn stamp(profile: &mut Profile, read_version: u64) {
    profile.version = read_version + 1;
    profile.updated_at = Utc::now();
}

impl<R> std::fmt::Debug for ProfileService<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProfileService")
            .field("curve", &self.curve)
            .field("tasks", &self.catalog.tasks.len())
            .field("max_attempts", &self.max_attempts)
            .finish()
    }
}
