//! Achievement evaluation.
//!
//! After any change to a player's standing the evaluator checks every active
//! rule the player has not yet earned and records the ones now satisfied.
//! Each unlock and its XP reward are committed together in one transaction;
//! the `UNIQUE (player_id, achievement_id)` constraint decides races between
//! concurrent evaluators.

use std::collections::BTreeMap;

use chrono::Utc;
use rusqlite::{params, Connection};
use tracing::{debug, error, info, warn};

use crate::db::{self, Database};
use crate::error::Result;
use crate::models::{AchievementRequirement, AchievementRule, PlayerStats, Subject};

/// Everything a requirement can be checked against.
#[derive(Debug, Clone)]
struct PlayerSnapshot {
    stats: PlayerStats,
    mastery: BTreeMap<Subject, f64>,
    subject_games: BTreeMap<Subject, i64>,
    perfect_scores: i64,
    fastest_completion_secs: Option<i64>,
}

impl PlayerSnapshot {
    fn load(conn: &Connection, player_id: i64) -> Result<Option<Self>> {
        let Some(stats) = db::load_player_stats(conn, player_id)? else {
            return Ok(None);
        };

        let mastery = db::load_mastery_map(conn, player_id)?;

        let mut stmt = conn.prepare(
            r#"
            SELECT g.subject, COUNT(*)
            FROM game_progress gp
            JOIN games g ON g.id = gp.game_id
            WHERE gp.player_id = ?1
            GROUP BY g.subject
            "#,
        )?;
        let mut subject_games = BTreeMap::new();
        let rows = stmt.query_map(params![player_id], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
        })?;
        for row in rows {
            let (subject, count) = row?;
            if let Some(subject) = Subject::from_str(&subject) {
                subject_games.insert(subject, count);
            }
        }

        let (perfect_scores, fastest_completion_secs) = conn.query_row(
            r#"
            SELECT COALESCE(SUM(CASE WHEN score = 100 THEN 1 ELSE 0 END), 0),
                   MIN(time_spent_secs)
            FROM game_progress
            WHERE player_id = ?1
            "#,
            params![player_id],
            |row| Ok((row.get::<_, i64>(0)?, row.get::<_, Option<i64>>(1)?)),
        )?;

        Ok(Some(Self {
            stats,
            mastery,
            subject_games,
            perfect_scores,
            fastest_completion_secs,
        }))
    }
}

fn requirement_met(requirement: &AchievementRequirement, snapshot: &PlayerSnapshot) -> bool {
    match requirement {
        AchievementRequirement::GamesCompleted { value } => snapshot.stats.games_completed >= *value,
        AchievementRequirement::Level { value } => snapshot.stats.level() >= *value,
        AchievementRequirement::Streak { value } => snapshot.stats.current_streak >= *value,
        AchievementRequirement::PerfectScore { value } => snapshot.perfect_scores >= *value,
        AchievementRequirement::SubjectMastery { subject, value } => snapshot
            .mastery
            .get(subject)
            .is_some_and(|percentage| percentage >= value),
        AchievementRequirement::SubjectGames { subject, value } => {
            snapshot.subject_games.get(subject).copied().unwrap_or(0) >= *value
        }
        AchievementRequirement::SpeedCompletion { value } => snapshot
            .fastest_completion_secs
            .is_some_and(|secs| secs <= *value),
        AchievementRequirement::Unsupported => false,
    }
}

#[derive(Clone)]
pub struct AchievementEvaluator {
    db: Database,
}

impl AchievementEvaluator {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Unlocks every rule the player now satisfies and returns the newly
    /// unlocked ones. Rules already held are never returned twice.
    ///
    /// Rewards can raise the player's level, which may satisfy further
    /// rules, so evaluation repeats until a pass unlocks nothing. A rule
    /// whose write is refused by a constraint is skipped and the rest still
    /// run. Any other store failure ends evaluation, keeping whatever was
    /// committed before it.
    pub fn evaluate(&self, player_id: i64) -> Vec<AchievementRule> {
        let mut unlocked = Vec::new();

        loop {
            let satisfied = match self.satisfied_rules(player_id) {
                Ok(rules) => rules,
                Err(e) => {
                    error!(player_id, error = %e, "failed to load achievement state");
                    break;
                }
            };

            let mut progressed = false;
            for rule in satisfied {
                match self.unlock(player_id, &rule) {
                    Ok(true) => {
                        info!(player_id, achievement = %rule.id, xp = rule.xp_reward, "achievement unlocked");
                        unlocked.push(rule);
                        progressed = true;
                    }
                    Ok(false) => {
                        debug!(player_id, achievement = %rule.id, "achievement already unlocked");
                    }
                    Err(e) if e.is_constraint_violation() => {
                        warn!(player_id, achievement = %rule.id, error = %e, "achievement rejected by store, skipping");
                    }
                    Err(e) => {
                        error!(player_id, achievement = %rule.id, error = %e, "failed to record achievement");
                        return unlocked;
                    }
                }
            }

            if !progressed {
                break;
            }
        }

        unlocked
    }

    // Active, not-yet-unlocked rules whose requirement holds right now
    fn satisfied_rules(&self, player_id: i64) -> Result<Vec<AchievementRule>> {
        let conn = self.db.conn();

        let Some(snapshot) = PlayerSnapshot::load(&conn, player_id)? else {
            warn!(player_id, "no stats row, skipping achievement evaluation");
            return Ok(Vec::new());
        };

        let mut satisfied = Vec::new();
        for row in db::load_candidate_rules(&conn, player_id)? {
            let rule_id = row.id().to_string();
            let rule = match row.into_rule() {
                Ok(rule) => rule,
                Err(e) => {
                    warn!(achievement = %rule_id, error = %e, "skipping rule with malformed requirement");
                    continue;
                }
            };

            if requirement_met(&rule.requirement, &snapshot) {
                satisfied.push(rule);
            }
        }

        Ok(satisfied)
    }

    /// Records the unlock and credits its reward. Returns `false` when the
    /// row already existed, in which case nothing is credited.
    fn unlock(&self, player_id: i64, rule: &AchievementRule) -> Result<bool> {
        self.db.transaction(|tx| {
            let now = Utc::now().to_rfc3339();
            let inserted = tx.execute(
                r#"
                INSERT OR IGNORE INTO player_achievements (player_id, achievement_id, unlocked_at)
                VALUES (?1, ?2, ?3)
                "#,
                params![player_id, rule.id, now],
            )?;
            if inserted == 0 {
                return Ok(false);
            }

            tx.execute(
                r#"
                UPDATE player_stats
                SET total_points = total_points + ?1, updated_at = ?2
                WHERE player_id = ?3
                "#,
                params![rule.xp_reward, now, player_id],
            )?;
            Ok(true)
        })
    }
}
