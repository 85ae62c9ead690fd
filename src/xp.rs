//! XP rewards and level derivation.
//!
//! Everything here is pure: the same inputs always produce the same XP.

use crate::models::{Difficulty, LevelInfo};

pub const XP_PER_LEVEL: i64 = 100;

const SCORE_BONUS_RATE: f64 = 0.5;
const TIME_BONUS_RATE: f64 = 0.25;
const HINT_PENALTY_RATE: f64 = 0.05;

/// XP earned for one completed game session.
///
/// The running total starts at `base_xp`, gains a score bonus (up to 50%)
/// and a speed bonus (up to 25%, only when there is a time limit), loses 5%
/// per hint, and is then scaled by the difficulty multiplier. Each step
/// truncates toward zero. A completed session always earns at least 1 XP.
/// An unknown difficulty (`None`) scales by 1.0.
pub fn compute_xp(
    base_xp: i64,
    score: i64,
    time_spent_secs: i64,
    time_limit_secs: i64,
    hints_used: i64,
    difficulty: Option<Difficulty>,
) -> i64 {
    let base = base_xp as f64;
    let mut total = base_xp;

    total += (base * (score as f64 / 100.0) * SCORE_BONUS_RATE) as i64;

    if time_limit_secs > 0 {
        let remaining = (time_limit_secs - time_spent_secs) as f64;
        let time_ratio = (remaining / time_limit_secs as f64).max(0.0);
        total += (base * time_ratio * TIME_BONUS_RATE) as i64;
    }

    total -= (base * hints_used as f64 * HINT_PENALTY_RATE) as i64;

    let multiplier = difficulty.map_or(1.0, |d| d.xp_multiplier());
    let total = (total as f64 * multiplier) as i64;

    total.max(1)
}

pub fn level_for_points(total_points: i64) -> i64 {
    total_points.max(0) / XP_PER_LEVEL + 1
}

pub fn level_info(total_points: i64) -> LevelInfo {
    let total_points = total_points.max(0);
    let current_level_xp = total_points % XP_PER_LEVEL;
    LevelInfo {
        level: level_for_points(total_points),
        current_level_xp,
        xp_to_next_level: XP_PER_LEVEL - current_level_xp,
        total_xp: total_points,
    }
}
