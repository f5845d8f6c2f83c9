//! Default task catalog and task completion rules.
//!
//! This module provides the built-in starter tasks and the guard that lets a
//! task's reward be claimed exactly once per profile.

use crate::progression::LevelCurve;
use crate::types::*;
use crate::{Error, Result};
use once_cell::sync::Lazy;
use std::collections::HashSet;

/// Cached default catalog - built once and reused across all operations
static DEFAULT_CATALOG: Lazy<TaskCatalog> = Lazy::new(build_default_catalog_internal);

/// Get a reference to the cached default catalog
pub fn get_default_catalog() -> &'static TaskCatalog {
    &DEFAULT_CATALOG
}

/// Builds the default catalog with the built-in starter tasks
///
/// **Note**: prefer `get_default_catalog()` when no custom tasks are needed.
pub fn build_default_catalog() -> TaskCatalog {
    build_default_catalog_internal()
}

/// The canonical starter tasks seeded into every new profile
pub fn default_tasks() -> Vec<TaskDefinition> {
    vec![
        TaskDefinition {
            id: 1,
            name: "Complete 10 push-ups".into(),
            xp_reward: 50,
        },
        TaskDefinition {
            id: 2,
            name: "Run for 15 minutes".into(),
            xp_reward: 50,
        },
        TaskDefinition {
            id: 3,
            name: "Stretch for 5 minutes".into(),
            xp_reward: 30,
        },
    ]
}

fn build_default_catalog_internal() -> TaskCatalog {
    TaskCatalog {
        tasks: default_tasks(),
    }
}

impl TaskCatalog {
    /// Catalog with extra tasks appended after the built-in ones
    pub fn with_custom(custom: impl IntoIterator<Item = TaskDefinition>) -> Self {
        let mut catalog = build_default_catalog();
        catalog.tasks.extend(custom);
        catalog
    }

    pub fn definition(&self, task_id: TaskId) -> Option<&TaskDefinition> {
        self.tasks.iter().find(|t| t.id == task_id)
    }

    /// Incomplete records for every task, in catalog order
    pub fn fresh_records(&self) -> Vec<TaskRecord> {
        self.tasks
            .iter()
            .map(|t| TaskRecord {
                task_id: t.id,
                done: false,
            })
            .collect()
    }

    /// Add incomplete records for catalog tasks the profile doesn't know yet.
    ///
    /// Existing records are never touched. Returns true if anything was added.
    pub fn backfill(&self, profile: &mut Profile) -> bool {
        let known: HashSet<TaskId> = profile.tasks.iter().map(|t| t.task_id).collect();
        let missing: Vec<TaskRecord> = self
            .fresh_records()
            .into_iter()
            .filter(|r| !known.contains(&r.task_id))
            .collect();

        if missing.is_empty() {
            return false;
        }

        tracing::debug!(
            "Backfilling {} task records for {}",
            missing.len(),
            profile.user_id
        );
        profile.tasks.extend(missing);
        true
    }

    /// Mark a task done and apply its reward.
    ///
    /// Works on a copy so a failure leaves `profile` untouched; the caller
    /// persists the returned profile as one write.
    pub fn complete_task(
        &self,
        profile: &Profile,
        task_id: TaskId,
        curve: &LevelCurve,
    ) -> Result<(Profile, u32)> {
        let record = profile
            .task(task_id)
            .ok_or(Error::TaskNotFound(task_id))?;
        if record.done {
            return Err(Error::TaskAlreadyCompleted(task_id));
        }
        let reward = self
            .definition(task_id)
            .ok_or(Error::TaskNotFound(task_id))?
            .xp_reward;

        let mut updated = profile.clone();
        for record in updated.tasks.iter_mut().filter(|t| t.task_id == task_id) {
            record.done = true;
        }
        let next = curve.apply_xp(updated.xp_state(), i64::from(reward));
        updated.set_xp_state(next);

        tracing::info!(
            "Task {} completed by {}: +{} XP",
            task_id,
            profile.user_id,
            reward
        );
        Ok((updated, reward))
    }

    /// Join a profile's records with their definitions.
    ///
    /// Records whose task is no longer in the catalog are skipped.
    pub fn task_board(&self, profile: &Profile) -> Vec<TaskView> {
        profile
            .tasks
            .iter()
            .filter_map(|record| {
                self.definition(record.task_id).map(|def| TaskView {
                    id: def.id,
                    name: def.name.clone(),
                    xp_reward: def.xp_reward,
                    done: record.done,
                })
            })
            .collect()
    }

    /// Validate the catalog for consistency
    ///
    /// Returns a list of validation errors, or empty Vec if valid.
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        let mut seen = HashSet::new();

        if self.tasks.is_empty() {
            errors.push("Catalog has no tasks".to_string());
        }

        for task in &self.tasks {
            if !seen.insert(task.id) {
                errors.push(format!("Duplicate task id {}", task.id));
            }
            if task.name.trim().is_empty() {
                errors.push(format!("Task {} has empty name", task.id));
            }
            if task.xp_reward == 0 {
                errors.push(format!("Task {} has zero XP reward", task.id));
            }
        }

        errors
    }
}
