//! Core domain types for the FitXcel progression system.
//!
//! This module defines the fundamental types used throughout the system:
//! - User identifiers and the fixed stat set
//! - Task definitions and per-profile completion records
//! - The persisted profile aggregate

use crate::{Error, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Stable identifier of a task definition
pub type TaskId = u32;

/// Starting value of every stat on a new profile
pub const DEFAULT_STAT_VALUE: u32 = 10;

// ============================================================================
// Identifiers
// ============================================================================

/// Opaque user identifier issued by the authentication collaborator.
///
/// Restricted to ASCII alphanumerics, `-` and `_` (max 64 chars) so it can be
/// used directly as a storage key or file name.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct UserId(String);

impl UserId {
    pub fn parse(raw: &str) -> Result<Self> {
        let valid = !raw.is_empty()
            && raw.len() <= 64
            && raw
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        if valid {
            Ok(Self(raw.to_string()))
        } else {
            Err(Error::InvalidUserId(raw.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for UserId {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        UserId::parse(&value)
    }
}

impl From<UserId> for String {
    fn from(id: UserId) -> Self {
        id.0
    }
}

// ============================================================================
// Stats
// ============================================================================

/// Character attribute that level points can be spent on
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stat {
    Strength,
    Stamina,
    Agility,
}

impl Stat {
    pub const ALL: [Stat; 3] = [Stat::Strength, Stat::Stamina, Stat::Agility];

    pub fn as_str(&self) -> &'static str {
        match self {
            Stat::Strength => "strength",
            Stat::Stamina => "stamina",
            Stat::Agility => "agility",
        }
    }
}

impl fmt::Display for Stat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Stat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "strength" => Ok(Stat::Strength),
            "stamina" => Ok(Stat::Stamina),
            "agility" => Ok(Stat::Agility),
            _ => Err(Error::InvalidStat(s.to_string())),
        }
    }
}

/// Stat values of a profile
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stats {
    pub strength: u32,
    pub stamina: u32,
    pub agility: u32,
}

impl Default for Stats {
    fn default() -> Self {
        Self {
            strength: DEFAULT_STAT_VALUE,
            stamina: DEFAULT_STAT_VALUE,
            agility: DEFAULT_STAT_VALUE,
        }
    }
}

impl Stats {
    pub fn get(&self, stat: Stat) -> u32 {
        match stat {
            Stat::Strength => self.strength,
            Stat::Stamina => self.stamina,
            Stat::Agility => self.agility,
        }
    }

    pub fn get_mut(&mut self, stat: Stat) -> &mut u32 {
        match stat {
            Stat::Strength => &mut self.strength,
            Stat::Stamina => &mut self.stamina,
            Stat::Agility => &mut self.agility,
        }
    }
}

// ============================================================================
// Tasks
// ============================================================================

/// A completable fitness task (shared, read-only)
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskDefinition {
    pub id: TaskId,
    pub name: String,
    pub xp_reward: u32,
}

/// Per-profile completion state of one task
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskRecord {
    pub task_id: TaskId,
    pub done: bool,
}

/// The ordered set of task definitions known to the system
#[derive(Clone, Debug)]
pub struct TaskCatalog {
    pub tasks: Vec<TaskDefinition>,
}

/// A task record joined with its definition, for display
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct TaskView {
    pub id: TaskId,
    pub name: String,
    pub xp_reward: u32,
    pub done: bool,
}

// ============================================================================
// Profile
// ============================================================================

/// The (experience, level, level points) triple that XP grants act on
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct XpState {
    pub experience: u64,
    pub level: u32,
    pub level_points: u32,
}

impl Default for XpState {
    fn default() -> Self {
        Self {
            experience: 0,
            level: 1,
            level_points: 0,
        }
    }
}

/// A user's persisted progression document
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    pub user_id: UserId,
    pub experience: u64,
    pub level: u32,
    pub level_points: u32,
    #[serde(default)]
    pub stats: Stats,
    #[serde(default)]
    pub tasks: Vec<TaskRecord>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Optimistic concurrency token, bumped on every persisted mutation
    #[serde(default)]
    pub version: u64,
}

impl Profile {
    /// Build a fresh level-1 profile with every catalog task incomplete
    pub fn new(user_id: UserId, catalog: &TaskCatalog, now: DateTime<Utc>) -> Self {
        let start = XpState::default();
        Self {
            user_id,
            experience: start.experience,
            level: start.level,
            level_points: start.level_points,
            stats: Stats::default(),
            tasks: catalog.fresh_records(),
            created_at: now,
            updated_at: now,
            version: 0,
        }
    }

    pub fn xp_state(&self) -> XpState {
        XpState {
            experience: self.experience,
            level: self.level,
            level_points: self.level_points,
        }
    }

    pub fn set_xp_state(&mut self, state: XpState) {
        self.experience = state.experience;
        self.level = state.level;
        self.level_points = state.level_points;
    }

    pub fn task(&self, task_id: TaskId) -> Option<&TaskRecord> {
        self.tasks.iter().find(|t| t.task_id == task_id)
    }
}

/// Read-only summary of where a profile sits within its current level
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct LevelProgress {
    pub level: u32,
    pub experience: u64,
    pub threshold: u64,
    pub remaining: u64,
}
