#![forbid(unsafe_code)]

//! Core domain model and business logic for the FitXcel progression system.
//!
//! This crate provides:
//! - Domain types (profiles, stats, tasks)
//! - Level curve math and multi-level XP resolution
//! - Task catalog with once-only completion
//! - Stat allocation from level points
//! - Profile repositories (in-memory, JSON files) with versioned writes
//! - The profile service tying it together with bounded conflict retry

pub mod types;
pub mod error;
pub mod catalog;
pub mod config;
pub mod logging;
pub mod progression;
pub mod stats;
pub mod repository;
pub mod store;
pub mod service;

// Re-export commonly used types
pub use error::{Error, Result};
pub use types::*;
pub use catalog::{build_default_catalog, default_tasks, get_default_catalog};
pub use config::Config;
pub use progression::LevelCurve;
pub use repository::{MemoryRepository, ProfileRepository};
pub use store::JsonFileRepository;
pub use service::ProfileService;
