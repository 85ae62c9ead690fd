//! Game unlock checks.
//!
//! Unlocking is fail-closed: whenever the player's standing cannot be
//! established the game stays locked.

use std::collections::BTreeMap;

use rusqlite::Connection;
use tracing::{error, warn};

use crate::db::{self, Database};
use crate::error::Result;
use crate::models::{GameDefinition, PlayerStats, Subject, UnlockRequirements};

/// Whether `stats` and `mastery` satisfy every key present in
/// `requirements`. An empty requirement set always unlocks.
pub fn is_unlocked(
    requirements: &UnlockRequirements,
    stats: &PlayerStats,
    mastery: &BTreeMap<Subject, f64>,
) -> bool {
    if let Some(level) = requirements.level {
        if stats.level() < level {
            return false;
        }
    }

    if let Some(games) = requirements.games_completed {
        if stats.games_completed < games {
            return false;
        }
    }

    requirements
        .subject_mastery
        .iter()
        .all(|(subject, minimum)| match mastery.get(subject) {
            Some(percentage) => percentage >= minimum,
            None => false,
        })
}

/// Unlock status of `game` for `player_id`, read through `conn`.
/// A missing stats row only unlocks games without requirements.
pub(crate) fn game_unlocked(conn: &Connection, player_id: i64, game: &GameDefinition) -> Result<bool> {
    if game.unlock_requirements.is_empty() {
        return Ok(true);
    }

    let Some(stats) = db::load_player_stats(conn, player_id)? else {
        warn!(player_id, game_id = %game.id, "no stats row, keeping game locked");
        return Ok(false);
    };
    let mastery = db::load_mastery_map(conn, player_id)?;

    Ok(is_unlocked(&game.unlock_requirements, &stats, &mastery))
}

/// Store-backed check. Any failure to load the game or the player's
/// standing reports the game as locked.
pub fn check_game_unlock(db: &Database, player_id: i64, game_id: &str) -> bool {
    let conn = db.conn();

    let game = match db::load_game(&conn, game_id) {
        Ok(Some(game)) => game,
        Ok(None) => {
            warn!(player_id, game_id, "unlock check for unknown game");
            return false;
        }
        Err(e) => {
            error!(player_id, game_id, error = %e, "failed to load game for unlock check");
            return false;
        }
    };

    match game_unlocked(&conn, player_id, &game) {
        Ok(unlocked) => unlocked,
        Err(e) => {
            error!(player_id, game_id, error = %e, "unlock check failed, treating game as locked");
            false
        }
    }
}
