//! Progression engine for a rural-education game platform.
//!
//! Players earn XP by completing game sessions. XP drives their level, daily
//! streaks and per-subject mastery, which in turn unlock further games and
//! achievements. Everything is persisted in SQLite through [`Database`].

pub mod achievements;
pub mod catalog;
pub mod config;
pub mod content;
pub mod db;
pub mod error;
pub mod models;
pub mod progress;
pub mod unlock;
pub mod xp;

pub use achievements::AchievementEvaluator;
pub use config::Config;
pub use db::Database;
pub use error::{ContentError, ProgressError, Result};
pub use progress::{ProgressTracker, SessionResult};
