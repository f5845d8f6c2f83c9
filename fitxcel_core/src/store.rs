//! File-backed profile documents with locking.
//!
//! Each profile lives in `<root>/<user_id>.json`. A sibling `<user_id>.lock`
//! file is locked exclusively for every compare-and-swap and shared for reads,
//! so the version check and the write happen as one unit across processes.
//! Documents are replaced by writing a temp file and renaming it over the old
//! one, so readers never observe a partial write.

use crate::{Error, Profile, ProfileRepository, Result, UserId};
use fs2::FileExt;
use std::fs::{File, OpenOptions};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tempfile::NamedTempFile;

const LOCK_POLL_INTERVAL: Duration = Duration::from_millis(5);

/// JSON document store, one file per user
#[derive(Clone, Debug)]
pub struct JsonFileRepository {
    root: PathBuf,
    lock_timeout: Duration,
}

/// Holds a per-user lock until dropped
struct LockGuard {
    file: File,
}

impl Drop for LockGuard {
    fn drop(&mut self) {
        let _ = FileExt::unlock(&self.file);
    }
}

fn unavailable(context: &str, path: &Path, e: impl std::fmt::Display) -> Error {
    Error::RepositoryUnavailable(format!("{} {:?}: {}", context, path, e))
}

impl JsonFileRepository {
    /// Create a repository rooted at `root` (created on first write)
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            lock_timeout: Duration::from_secs(2),
        }
    }

    pub fn with_lock_timeout(mut self, timeout: Duration) -> Self {
        self.lock_timeout = timeout;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn document_path(&self, user_id: &UserId) -> PathBuf {
        self.root.join(format!("{}.json", user_id))
    }

    fn lock_path(&self, user_id: &UserId) -> PathBuf {
        self.root.join(format!("{}.lock", user_id))
    }

    /// Take the per-user lock, polling until `lock_timeout` elapses
    fn acquire(&self, user_id: &UserId, exclusive: bool) -> Result<LockGuard> {
        std::fs::create_dir_all(&self.root)
            .map_err(|e| unavailable("Unable to create profile directory", &self.root, e))?;

        let path = self.lock_path(user_id);
        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .truncate(false)
            .open(&path)
            .map_err(|e| unavailable("Unable to open lock file", &path, e))?;

        // No deadline when the timeout overflows the clock
        let deadline = Instant::now().checked_add(self.lock_timeout);
        loop {
            let attempt = if exclusive {
                FileExt::try_lock_exclusive(&file)
            } else {
                FileExt::try_lock_shared(&file)
            };
            match attempt {
                Ok(()) => return Ok(LockGuard { file }),
                Err(e) if deadline.is_some_and(|d| Instant::now() >= d) => {
                    tracing::warn!("Timed out waiting for lock {:?}: {}", path, e);
                    return Err(unavailable("Timed out locking", &path, e));
                }
                Err(_) => std::thread::sleep(LOCK_POLL_INTERVAL),
            }
        }
    }

    /// Read the stored document; caller holds the lock
    fn read_document(&self, user_id: &UserId) -> Result<Option<Profile>> {
        let path = self.document_path(user_id);
        if !path.exists() {
            return Ok(None);
        }

        let mut contents = String::new();
        File::open(&path)
            .and_then(|f| std::io::BufReader::new(f).read_to_string(&mut contents))
            .map_err(|e| unavailable("Failed to read profile", &path, e))?;

        match serde_json::from_str::<Profile>(&contents) {
            Ok(profile) => Ok(Some(profile)),
            Err(e) => {
                tracing::warn!("Failed to parse profile {:?}: {}", path, e);
                Err(Error::CorruptDocument {
                    user_id: user_id.to_string(),
                    reason: e.to_string(),
                })
            }
        }
    }

    /// Atomically write the document; caller holds the exclusive lock
    fn write_document(&self, profile: &Profile) -> Result<()> {
        let path = self.document_path(&profile.user_id);
        let temp = NamedTempFile::new_in(&self.root)
            .map_err(|e| unavailable("Unable to create temp file in", &self.root, e))?;

        {
            let mut writer = std::io::BufWriter::new(temp.as_file());
            let contents = serde_json::to_string(profile)?;
            writer
                .write_all(contents.as_bytes())
                .and_then(|_| writer.flush())
                .map_err(|e| unavailable("Failed to write profile", &path, e))?;
        }

        temp.as_file()
            .sync_all()
            .map_err(|e| unavailable("Failed to sync profile", &path, e))?;
        temp.persist(&path)
            .map_err(|e| unavailable("Failed to replace profile", &path, e.error))?;

        tracing::debug!(
            "Saved profile {} (version {}) to {:?}",
            profile.user_id,
            profile.version,
            path
        );
        Ok(())
    }
}

impl ProfileRepository for JsonFileRepository {
    fn load(&self, user_id: &UserId) -> Result<Option<Profile>> {
        if !self.document_path(user_id).exists() {
            return Ok(None);
        }
        let _guard = self.acquire(user_id, false)?;
        self.read_document(user_id)
    }

    fn insert(&self, profile: &Profile) -> Result<()> {
        let _guard = self.acquire(&profile.user_id, true)?;
        if self.document_path(&profile.user_id).exists() {
            return Err(Error::ConcurrentModification {
                user_id: profile.user_id.to_string(),
                expected: profile.version,
            });
        }
        self.write_document(profile)
    }

    fn replace(&self, profile: &Profile, expected_version: u64) -> Result<()> {
        let _guard = self.acquire(&profile.user_id, true)?;
        let stored = self.read_document(&profile.user_id)?;
        match stored {
            Some(current) if current.version == expected_version => self.write_document(profile),
            _ => Err(Error::ConcurrentModification {
                user_id: profile.user_id.to_string(),
                expected: expected_version,
            }),
        }
    }
}
