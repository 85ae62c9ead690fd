use std::path::PathBuf;

pub const DEFAULT_DB_NAME: &str = "shiksha.db";
pub const DEFAULT_FAVORITE_WINDOW_DAYS: i64 = 7;

const DB_ENV: &str = "SHIKSHA_DB";
const FAVORITE_WINDOW_ENV: &str = "SHIKSHA_FAVORITE_WINDOW_DAYS";

/// Process-level settings, read once by the entry point and handed to the
/// components that need them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub db_path: PathBuf,
    /// Trailing window used to pick a player's favourite subject.
    pub favorite_window_days: i64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from(DEFAULT_DB_NAME),
            favorite_window_days: DEFAULT_FAVORITE_WINDOW_DAYS,
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        let favorite_window_days = std::env::var(FAVORITE_WINDOW_ENV)
            .ok()
            .and_then(|v| v.trim().parse::<i64>().ok())
            .filter(|days| *days > 0)
            .unwrap_or(DEFAULT_FAVORITE_WINDOW_DAYS);

        Self {
            db_path: db_path_from_env(),
            favorite_window_days,
        }
    }
}

fn db_path_from_env() -> PathBuf {
    if let Ok(path) = std::env::var(DB_ENV) {
        return PathBuf::from(path);
    }

    let config_dir = dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("shiksha");

    std::fs::create_dir_all(&config_dir).ok();
    config_dir.join(DEFAULT_DB_NAME)
}
