//! Game sessions and completion bookkeeping.

use chrono::{DateTime, Duration, NaiveDate, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, info, warn};

use crate::achievements::AchievementEvaluator;
use crate::config::DEFAULT_FAVORITE_WINDOW_DAYS;
use crate::db::{self, Database};
use crate::error::{ProgressError, Result};
use crate::models::{AnalyticsEventKind, CompletionOutcome, Subject};
use crate::unlock;
use crate::xp;

/// What the client reports when a game ends.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SessionResult {
    pub score: i64,
    pub time_spent_secs: i64,
    pub hints_used: i64,
    pub mistakes: i64,
    #[serde(default)]
    pub game_state: serde_json::Value,
}

impl SessionResult {
    fn validate(&self) -> Result<()> {
        if !(0..=100).contains(&self.score) {
            return Err(ProgressError::InvalidInput(format!(
                "score must be between 0 and 100, got {}",
                self.score
            )));
        }
        if self.time_spent_secs < 0 {
            return Err(ProgressError::InvalidInput(
                "time spent cannot be negative".into(),
            ));
        }
        if self.hints_used < 0 || self.mistakes < 0 {
            return Err(ProgressError::InvalidInput(
                "hint and mistake counts cannot be negative".into(),
            ));
        }
        Ok(())
    }
}

#[derive(Clone)]
pub struct ProgressTracker {
    db: Database,
    evaluator: AchievementEvaluator,
    favorite_window_days: i64,
}

impl ProgressTracker {
    pub fn new(db: Database) -> Self {
        Self {
            evaluator: AchievementEvaluator::new(db.clone()),
            db,
            favorite_window_days: DEFAULT_FAVORITE_WINDOW_DAYS,
        }
    }

    pub fn with_favorite_window(mut self, days: i64) -> Self {
        self.favorite_window_days = days.max(1);
        self
    }

    /// Opens a session on an active game the player has unlocked.
    pub fn start_session(&self, player_id: i64, game_id: &str) -> Result<i64> {
        let session_id = self.db.transaction(|tx| {
            if db::load_player(tx, player_id)?.is_none() {
                return Err(ProgressError::PlayerNotFound(player_id));
            }

            let game = db::load_game(tx, game_id)?
                .filter(|g| g.is_active)
                .ok_or_else(|| ProgressError::GameNotFound(game_id.to_string()))?;

            if !unlock::game_unlocked(tx, player_id, &game)? {
                return Err(ProgressError::GameLocked(game_id.to_string()));
            }

            let now = Utc::now().to_rfc3339();
            tx.execute(
                r#"
                INSERT INTO game_sessions (player_id, game_id, started_at, last_activity)
                VALUES (?1, ?2, ?3, ?3)
                "#,
                params![player_id, game_id, now],
            )?;
            let session_id = tx.last_insert_rowid();
            db::record_event(
                tx,
                player_id,
                game_id,
                session_id,
                AnalyticsEventKind::GameStart,
                &json!({}),
                &now,
            )?;
            Ok(session_id)
        })?;

        info!(player_id, game_id, session_id, "session started");
        Ok(session_id)
    }

    /// Saves in-flight score and state on an active session.
    pub fn checkpoint_session(
        &self,
        player_id: i64,
        session_id: i64,
        score: i64,
        game_state: &serde_json::Value,
    ) -> Result<()> {
        if !(0..=100).contains(&score) {
            return Err(ProgressError::InvalidInput(format!(
                "score must be between 0 and 100, got {score}"
            )));
        }

        let state = serde_json::to_string(game_state)?;
        let rows = self.db.execute(
            r#"
            UPDATE game_sessions
            SET current_score = ?1, game_state = ?2, last_activity = ?3
            WHERE id = ?4 AND player_id = ?5 AND is_active = 1
            "#,
            params![score, state, Utc::now().to_rfc3339(), session_id, player_id],
        )?;

        if rows == 0 {
            return Err(ProgressError::InvalidSession(session_id));
        }
        debug!(player_id, session_id, score, "session checkpoint saved");
        Ok(())
    }

    /// Closes an active session, records the attempt, updates the player's
    /// stats and mastery, then evaluates achievements.
    ///
    /// A session can be completed once. When two callers race on the same
    /// session exactly one succeeds; the other gets
    /// [`ProgressError::InvalidSession`].
    pub fn complete_session(
        &self,
        player_id: i64,
        session_id: i64,
        result: &SessionResult,
    ) -> Result<CompletionOutcome> {
        self.complete_session_at(player_id, session_id, result, Utc::now())
    }

    pub(crate) fn complete_session_at(
        &self,
        player_id: i64,
        session_id: i64,
        result: &SessionResult,
        now: DateTime<Utc>,
    ) -> Result<CompletionOutcome> {
        result.validate()?;

        let recorded = self
            .db
            .transaction(|tx| self.record_completion(tx, player_id, session_id, result, now))?;

        info!(
            player_id,
            session_id,
            game_id = %recorded.game_id,
            score = result.score,
            xp = recorded.xp_earned,
            "session completed"
        );

        let new_achievements = self.evaluator.evaluate(player_id);

        let level_after = match self.db.get_player_stats(player_id) {
            Ok(Some(stats)) => stats.level(),
            Ok(None) => recorded.level_after,
            Err(e) => {
                warn!(player_id, error = %e, "could not reload stats after completion");
                recorded.level_after
            }
        };

        if level_after > recorded.level_before {
            info!(player_id, level = level_after, "level up");
        }

        Ok(CompletionOutcome {
            progress_id: recorded.progress_id,
            xp_earned: recorded.xp_earned,
            new_achievements,
            level_before: recorded.level_before,
            level_after,
        })
    }

    fn record_completion(
        &self,
        conn: &Connection,
        player_id: i64,
        session_id: i64,
        result: &SessionResult,
        now: DateTime<Utc>,
    ) -> Result<RecordedCompletion> {
        let session = db::load_session(conn, session_id)?
            .filter(|s| s.player_id == player_id && s.is_active)
            .ok_or(ProgressError::InvalidSession(session_id))?;

        let game = db::load_game(conn, &session.game_id)?
            .ok_or_else(|| ProgressError::GameNotFound(session.game_id.clone()))?;

        let stats = db::load_player_stats(conn, player_id)?
            .ok_or(ProgressError::PlayerNotFound(player_id))?;

        let timestamp = now.to_rfc3339();
        let state = serde_json::to_string(&result.game_state)?;

        // Only one caller can flip the session closed
        let closed = conn.execute(
            r#"
            UPDATE game_sessions
            SET is_active = 0, ended_at = ?1, last_activity = ?1, current_score = ?2, game_state = ?3
            WHERE id = ?4 AND player_id = ?5 AND is_active = 1
            "#,
            params![timestamp, result.score, state, session_id, player_id],
        )?;
        if closed == 0 {
            return Err(ProgressError::InvalidSession(session_id));
        }

        let xp_earned = xp::compute_xp(
            game.base_xp_reward,
            result.score,
            result.time_spent_secs,
            game.time_estimate_secs,
            result.hints_used,
            Some(game.difficulty),
        );

        conn.execute(
            r#"
            INSERT INTO game_progress
                (player_id, game_id, session_id, score, time_spent_secs, hints_used, mistakes,
                 xp_earned, completed_at, game_state)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            "#,
            params![
                player_id,
                game.id,
                session_id,
                result.score,
                result.time_spent_secs,
                result.hints_used,
                result.mistakes,
                xp_earned,
                timestamp,
                state
            ],
        )?;
        let progress_id = conn.last_insert_rowid();

        let today = now.date_naive();
        let last_day = stats
            .last_active_day
            .as_deref()
            .and_then(|d| NaiveDate::parse_from_str(d, "%Y-%m-%d").ok());
        let current_streak = advance_streak(stats.current_streak, last_day, today);
        let longest_streak = stats.longest_streak.max(current_streak);
        let favorite = favorite_subject(conn, player_id, now - Duration::days(self.favorite_window_days))?;
        let total_points = stats.total_points + xp_earned;

        conn.execute(
            r#"
            UPDATE player_stats
            SET total_points = ?1,
                games_completed = games_completed + 1,
                current_streak = ?2,
                longest_streak = ?3,
                favorite_subject = ?4,
                last_active_day = ?5,
                updated_at = ?6
            WHERE player_id = ?7
            "#,
            params![
                total_points,
                current_streak,
                longest_streak,
                favorite.map(|s| s.as_str()),
                today.format("%Y-%m-%d").to_string(),
                timestamp,
                player_id
            ],
        )?;

        update_subject_mastery(conn, player_id, game.subject, &timestamp)?;

        db::record_event(
            conn,
            player_id,
            &game.id,
            session_id,
            AnalyticsEventKind::GameComplete,
            &json!({
                "score": result.score,
                "xp_earned": xp_earned,
                "time_spent_secs": result.time_spent_secs,
            }),
            &timestamp,
        )?;

        Ok(RecordedCompletion {
            game_id: game.id,
            progress_id,
            xp_earned,
            level_before: stats.level(),
            level_after: xp::level_for_points(total_points),
        })
    }
}

struct RecordedCompletion {
    game_id: String,
    progress_id: i64,
    xp_earned: i64,
    level_before: i64,
    level_after: i64,
}

/// Streak after activity on `today`. Same day keeps it, the following day
/// extends it, anything else starts over at 1.
fn advance_streak(current: i64, last_day: Option<NaiveDate>, today: NaiveDate) -> i64 {
    match last_day {
        Some(day) if day == today => current.max(1),
        Some(day) if day.succ_opt() == Some(today) => current + 1,
        _ => 1,
    }
}

// Most played subject since `since`; ties go to the most recently played
fn favorite_subject(conn: &Connection, player_id: i64, since: DateTime<Utc>) -> Result<Option<Subject>> {
    let subject: Option<String> = conn
        .query_row(
            r#"
            SELECT g.subject
            FROM game_progress gp
            JOIN games g ON g.id = gp.game_id
            WHERE gp.player_id = ?1 AND gp.completed_at >= ?2
            GROUP BY g.subject
            ORDER BY COUNT(*) DESC, MAX(gp.completed_at) DESC, MAX(gp.id) DESC
            LIMIT 1
            "#,
            params![player_id, since.to_rfc3339()],
            |row| row.get(0),
        )
        .optional()?;

    Ok(subject.as_deref().and_then(Subject::from_str))
}

/// Recomputes one subject's mastery row from the full attempt history.
/// Mastery is the mean of the player's best score on each game played in
/// the subject.
fn update_subject_mastery(conn: &Connection, player_id: i64, subject: Subject, timestamp: &str) -> Result<()> {
    let (games_completed, total_xp, average_score) = conn.query_row(
        r#"
        SELECT COUNT(*), COALESCE(SUM(gp.xp_earned), 0), COALESCE(AVG(gp.score), 0)
        FROM game_progress gp
        JOIN games g ON g.id = gp.game_id
        WHERE gp.player_id = ?1 AND g.subject = ?2
        "#,
        params![player_id, subject.as_str()],
        |row| Ok((row.get::<_, i64>(0)?, row.get::<_, i64>(1)?, row.get::<_, f64>(2)?)),
    )?;

    let mastery_percentage: f64 = conn.query_row(
        r#"
        SELECT COALESCE(AVG(best), 0)
        FROM (
            SELECT MAX(gp.score) AS best
            FROM game_progress gp
            JOIN games g ON g.id = gp.game_id
            WHERE gp.player_id = ?1 AND g.subject = ?2
            GROUP BY gp.game_id
        )
        "#,
        params![player_id, subject.as_str()],
        |row| row.get(0),
    )?;

    conn.execute(
        r#"
        INSERT INTO subject_mastery
            (player_id, subject, games_completed, total_xp, average_score, mastery_percentage, updated_at)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
        ON CONFLICT(player_id, subject) DO UPDATE SET
            games_completed = excluded.games_completed,
            total_xp = excluded.total_xp,
            average_score = excluded.average_score,
            mastery_percentage = excluded.mastery_percentage,
            updated_at = excluded.updated_at
        "#,
        params![
            player_id,
            subject.as_str(),
            games_completed,
            total_xp,
            average_score,
            mastery_percentage,
            timestamp
        ],
    )?;

    Ok(())
}
