use std::collections::BTreeMap;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use chrono::Utc;
use rand::Rng;
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Params, Row, Transaction, TransactionBehavior};
use serde::de::DeserializeOwned;

use crate::error::{ProgressError, Result};
use crate::models::{
    AchievementCategory, AchievementRule, AnalyticsEvent, AnalyticsEventKind, Difficulty, GameDefinition, GameDetails, GameFilter,
    GameWithProgress, LeaderboardEntry, Player, PlayerAchievement, PlayerStats, ProgressRecord,
    Rarity, SessionRecord, Subject, SubjectMastery, UnlockedAchievement,
};
use crate::unlock;
use crate::xp;

/// Handle on the progression store.
///
/// Cloning is cheap and every clone talks to the same connection, so one
/// handle can be shared between request threads. Statements are serialised
/// by the mutex; multi-statement work goes through [`Database::transaction`].
#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let conn = Connection::open(path)?;
        conn.pragma_update(None, "foreign_keys", "ON")?;
        conn.busy_timeout(Duration::from_secs(5))?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn init(&self) -> Result<()> {
        self.conn().execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS players (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL,
                grade INTEGER NOT NULL DEFAULT 8,
                created_at TEXT NOT NULL DEFAULT (datetime('now'))
            );

            CREATE TABLE IF NOT EXISTS player_stats (
                player_id INTEGER PRIMARY KEY,
                total_points INTEGER NOT NULL DEFAULT 0 CHECK(total_points >= 0),
                current_streak INTEGER NOT NULL DEFAULT 0,
                longest_streak INTEGER NOT NULL DEFAULT 0,
                games_completed INTEGER NOT NULL DEFAULT 0,
                favorite_subject TEXT,
                last_active_day TEXT,
                updated_at TEXT NOT NULL DEFAULT (datetime('now')),
                FOREIGN KEY (player_id) REFERENCES players(id) ON DELETE CASCADE
            );

            CREATE TABLE IF NOT EXISTS games (
                id TEXT PRIMARY KEY,
                title TEXT NOT NULL,
                subject TEXT NOT NULL CHECK(subject IN ('science', 'technology', 'engineering', 'english', 'maths', 'odissi')),
                class_level INTEGER NOT NULL,
                difficulty TEXT NOT NULL CHECK(difficulty IN ('BEGINNER', 'INTERMEDIATE', 'ADVANCED')),
                time_estimate_secs INTEGER NOT NULL DEFAULT 0,
                xp_reward INTEGER NOT NULL,
                unlock_requirements TEXT NOT NULL DEFAULT '{}',
                is_active INTEGER NOT NULL DEFAULT 1,
                created_at TEXT NOT NULL DEFAULT (datetime('now')),
                updated_at TEXT NOT NULL DEFAULT (datetime('now'))
            );

            CREATE TABLE IF NOT EXISTS game_sessions (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                player_id INTEGER NOT NULL,
                game_id TEXT NOT NULL,
                started_at TEXT NOT NULL,
                last_activity TEXT NOT NULL,
                ended_at TEXT,
                is_active INTEGER NOT NULL DEFAULT 1,
                current_score INTEGER NOT NULL DEFAULT 0,
                game_state TEXT NOT NULL DEFAULT '{}',
                FOREIGN KEY (player_id) REFERENCES players(id) ON DELETE CASCADE,
                FOREIGN KEY (game_id) REFERENCES games(id) ON DELETE CASCADE
            );

            -- One row per completed attempt; best scores are aggregated
            CREATE TABLE IF NOT EXISTS game_progress (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                player_id INTEGER NOT NULL,
                game_id TEXT NOT NULL,
                session_id INTEGER NOT NULL,
                score INTEGER NOT NULL CHECK(score BETWEEN 0 AND 100),
                time_spent_secs INTEGER NOT NULL,
                hints_used INTEGER NOT NULL DEFAULT 0,
                mistakes INTEGER NOT NULL DEFAULT 0,
                xp_earned INTEGER NOT NULL,
                completed_at TEXT NOT NULL,
                game_state TEXT NOT NULL DEFAULT '{}',
                FOREIGN KEY (player_id) REFERENCES players(id) ON DELETE CASCADE,
                FOREIGN KEY (game_id) REFERENCES games(id) ON DELETE CASCADE,
                FOREIGN KEY (session_id) REFERENCES game_sessions(id) ON DELETE CASCADE
            );

            CREATE TABLE IF NOT EXISTS achievements (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                description TEXT NOT NULL,
                category TEXT NOT NULL CHECK(category IN ('academic', 'persistence', 'mastery', 'social', 'cultural')),
                rarity TEXT NOT NULL CHECK(rarity IN ('common', 'rare', 'epic', 'legendary')),
                xp_reward INTEGER NOT NULL CHECK(xp_reward >= 0),
                requirement TEXT NOT NULL,
                is_active INTEGER NOT NULL DEFAULT 1,
                created_at TEXT NOT NULL DEFAULT (datetime('now'))
            );

            CREATE TABLE IF NOT EXISTS player_achievements (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                player_id INTEGER NOT NULL,
                achievement_id TEXT NOT NULL,
                unlocked_at TEXT NOT NULL,
                UNIQUE (player_id, achievement_id),
                FOREIGN KEY (player_id) REFERENCES players(id) ON DELETE CASCADE,
                FOREIGN KEY (achievement_id) REFERENCES achievements(id) ON DELETE CASCADE
            );

            CREATE TABLE IF NOT EXISTS subject_mastery (
                player_id INTEGER NOT NULL,
                subject TEXT NOT NULL,
                games_completed INTEGER NOT NULL DEFAULT 0,
                total_xp INTEGER NOT NULL DEFAULT 0,
                average_score REAL NOT NULL DEFAULT 0,
                mastery_percentage REAL NOT NULL DEFAULT 0,
                updated_at TEXT NOT NULL,
                PRIMARY KEY (player_id, subject),
                FOREIGN KEY (player_id) REFERENCES players(id) ON DELETE CASCADE
            );

            CREATE TABLE IF NOT EXISTS analytics_events (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                player_id INTEGER NOT NULL,
                game_id TEXT NOT NULL,
                session_id INTEGER NOT NULL,
                event_type TEXT NOT NULL CHECK(event_type IN ('game_start', 'game_complete')),
                event_data TEXT NOT NULL DEFAULT '{}',
                created_at TEXT NOT NULL,
                FOREIGN KEY (player_id) REFERENCES players(id) ON DELETE CASCADE
            );

            CREATE INDEX IF NOT EXISTS idx_stats_points ON player_stats(total_points);
            CREATE INDEX IF NOT EXISTS idx_games_subject ON games(subject, class_level);
            CREATE INDEX IF NOT EXISTS idx_sessions_player ON game_sessions(player_id);
            CREATE INDEX IF NOT EXISTS idx_progress_player_game ON game_progress(player_id, game_id);
            CREATE INDEX IF NOT EXISTS idx_progress_completed ON game_progress(player_id, completed_at);
            CREATE INDEX IF NOT EXISTS idx_player_achievements_player ON player_achievements(player_id);
            CREATE INDEX IF NOT EXISTS idx_events_player ON analytics_events(player_id, created_at);
            "#,
        )?;

        Ok(())
    }

    /// Locks the shared connection. A poisoned lock is recovered: every
    /// multi-statement write runs in a transaction, so a panicking holder
    /// cannot leave half-applied state behind.
    pub(crate) fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // Generic store access
    pub fn query_rows<T, P, F>(&self, sql: &str, params: P, f: F) -> Result<Vec<T>>
    where
        P: Params,
        F: FnMut(&Row<'_>) -> rusqlite::Result<T>,
    {
        let conn = self.conn();
        let mut stmt = conn.prepare(sql)?;
        let rows = stmt.query_map(params, f)?;
        let out = rows.collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(out)
    }

    pub fn execute<P: Params>(&self, sql: &str, params: P) -> Result<usize> {
        Ok(self.conn().execute(sql, params)?)
    }

    /// Runs `f` inside an immediate transaction. Commits when `f` returns
    /// `Ok`; any error rolls every statement in `f` back.
    pub fn transaction<T, E, F>(&self, f: F) -> std::result::Result<T, E>
    where
        F: FnOnce(&Transaction<'_>) -> std::result::Result<T, E>,
        E: From<rusqlite::Error>,
    {
        let mut conn = self.conn();
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let value = f(&tx)?;
        tx.commit()?;
        Ok(value)
    }

    // Player operations
    pub fn add_player(&self, name: &str, grade: i32) -> Result<i64> {
        self.transaction(|tx| {
            tx.execute(
                "INSERT INTO players (name, grade, created_at) VALUES (?1, ?2, ?3)",
                params![name, grade, Utc::now().to_rfc3339()],
            )?;
            let player_id = tx.last_insert_rowid();
            tx.execute(
                "INSERT INTO player_stats (player_id) VALUES (?1)",
                params![player_id],
            )?;
            Ok(player_id)
        })
    }

    pub fn get_player(&self, id: i64) -> Result<Option<Player>> {
        load_player(&self.conn(), id)
    }

    pub fn list_players(&self) -> Result<Vec<Player>> {
        self.query_rows(
            "SELECT id, name, grade, created_at FROM players ORDER BY name",
            [],
            player_from_row,
        )
    }

    pub fn get_player_stats(&self, player_id: i64) -> Result<Option<PlayerStats>> {
        load_player_stats(&self.conn(), player_id)
    }

    pub fn list_subject_mastery(&self, player_id: i64) -> Result<Vec<SubjectMastery>> {
        self.query_rows(
            r#"
            SELECT player_id, subject, games_completed, total_xp, average_score,
                   mastery_percentage, updated_at
            FROM subject_mastery
            WHERE player_id = ?1
            ORDER BY subject
            "#,
            params![player_id],
            |row| {
                Ok(SubjectMastery {
                    player_id: row.get(0)?,
                    subject: parse_column(row, 1, Subject::from_str)?,
                    games_completed: row.get(2)?,
                    total_xp: row.get(3)?,
                    average_score: row.get(4)?,
                    mastery_percentage: row.get(5)?,
                    updated_at: row.get(6)?,
                })
            },
        )
    }

    // Game operations
    /// Inserts a game definition. Returns `false` if the id already exists.
    pub fn add_game(&self, game: &GameDefinition) -> Result<bool> {
        let requirements = serde_json::to_string(&game.unlock_requirements)?;
        let inserted = self.conn().execute(
            r#"
            INSERT OR IGNORE INTO games
                (id, title, subject, class_level, difficulty, time_estimate_secs,
                 xp_reward, unlock_requirements, is_active)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            "#,
            params![
                game.id,
                game.title,
                game.subject.as_str(),
                game.class_level,
                game.difficulty.as_str(),
                game.time_estimate_secs,
                game.base_xp_reward,
                requirements,
                game.is_active
            ],
        )?;
        Ok(inserted > 0)
    }

    pub fn get_game(&self, id: &str) -> Result<Option<GameDefinition>> {
        load_game(&self.conn(), id)
    }

    pub fn list_games(&self, filter: &GameFilter) -> Result<Vec<GameDefinition>> {
        let sql = format!(
            r#"
            SELECT {GAME_COLUMNS}
            FROM games
            WHERE (?1 IS NULL OR subject = ?1)
              AND (?2 IS NULL OR class_level = ?2)
              AND (?3 IS NULL OR difficulty = ?3)
            ORDER BY class_level, difficulty, title
            "#
        );
        let (subject, class_level, difficulty) = filter_params(filter);
        self.query_rows(&sql, params![subject, class_level, difficulty], game_from_row)
    }

    pub fn set_game_active(&self, id: &str, active: bool) -> Result<bool> {
        let rows = self.conn().execute(
            "UPDATE games SET is_active = ?1, updated_at = ?2 WHERE id = ?3",
            params![active, Utc::now().to_rfc3339(), id],
        )?;
        Ok(rows > 0)
    }

    /// Active games with the player's attempts, best score and unlock status.
    pub fn list_games_for_player(
        &self,
        player_id: i64,
        filter: &GameFilter,
    ) -> Result<Vec<GameWithProgress>> {
        let conn = self.conn();
        let stats = load_player_stats(&conn, player_id)?;
        let mastery = load_mastery_map(&conn, player_id)?;

        let sql = format!(
            r#"
            SELECT {}, COUNT(gp.id), MAX(gp.score)
            FROM games g
            LEFT JOIN game_progress gp ON gp.game_id = g.id AND gp.player_id = ?4
            WHERE g.is_active = 1
              AND (?1 IS NULL OR g.subject = ?1)
              AND (?2 IS NULL OR g.class_level = ?2)
              AND (?3 IS NULL OR g.difficulty = ?3)
            GROUP BY g.id
            ORDER BY g.class_level, g.difficulty, g.title
            "#,
            prefixed_game_columns("g")
        );
        let (subject, class_level, difficulty) = filter_params(filter);
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(params![subject, class_level, difficulty, player_id], |row| {
            Ok((game_from_row(row)?, row.get::<_, i64>(9)?, row.get::<_, Option<i64>>(10)?))
        })?;

        let mut games = Vec::new();
        for row in rows {
            let (game, attempts, best_score) = row?;
            let is_unlocked = match &stats {
                Some(stats) => unlock::is_unlocked(&game.unlock_requirements, stats, &mastery),
                None => game.unlock_requirements.is_empty(),
            };
            games.push(GameWithProgress {
                game,
                is_unlocked,
                attempts,
                best_score,
            });
        }

        Ok(games)
    }

    /// An active game with the player's aggregates and last
    /// [`RECENT_ATTEMPTS`] attempts. `None` when the game is missing or
    /// retired.
    pub fn game_details(&self, player_id: i64, game_id: &str) -> Result<Option<GameDetails>> {
        let conn = self.conn();
        let Some(game) = load_game(&conn, game_id)?.filter(|g| g.is_active) else {
            return Ok(None);
        };

        let (total_attempts, average_score, best_score, total_time_spent_secs) = conn.query_row(
            r#"
            SELECT COUNT(*), AVG(score), MAX(score), COALESCE(SUM(time_spent_secs), 0)
            FROM game_progress
            WHERE player_id = ?1 AND game_id = ?2
            "#,
            params![player_id, game_id],
            |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, Option<f64>>(1)?,
                    row.get::<_, Option<i64>>(2)?,
                    row.get::<_, i64>(3)?,
                ))
            },
        )?;

        let is_unlocked = unlock::game_unlocked(&conn, player_id, &game)?;
        let recent_attempts = load_progress(&conn, player_id, Some(game_id), RECENT_ATTEMPTS)?;

        Ok(Some(GameDetails {
            game,
            is_unlocked,
            total_attempts,
            average_score,
            best_score,
            total_time_spent_secs,
            recent_attempts,
        }))
    }

    /// Stochastic pick of the next game to play among the unlocked ones.
    /// Unplayed games and games with low best scores are favoured.
    pub fn recommend_next_game(&self, player_id: i64) -> Result<Option<GameWithProgress>> {
        let candidates: Vec<GameWithProgress> = self
            .list_games_for_player(player_id, &GameFilter::default())?
            .into_iter()
            .filter(|g| g.is_unlocked)
            .collect();

        if candidates.is_empty() {
            return Ok(None);
        }

        let weights: Vec<f64> = candidates
            .iter()
            .map(|g| recommendation_weight(g.best_score))
            .collect();
        let total_weight: f64 = weights.iter().sum();
        let point = rand::thread_rng().gen::<f64>() * total_weight;

        let index = pick_weighted(&weights, point);
        Ok(candidates.into_iter().nth(index))
    }

    // Achievement rule operations
    /// Inserts an achievement rule. Returns `false` if the id already exists.
    pub fn add_achievement(&self, rule: &AchievementRule) -> Result<bool> {
        if rule.xp_reward < 0 {
            return Err(ProgressError::InvalidInput(format!(
                "achievement '{}' has a negative xp reward ({})",
                rule.id, rule.xp_reward
            )));
        }
        let requirement = serde_json::to_string(&rule.requirement)?;
        let inserted = self.conn().execute(
            r#"
            INSERT OR IGNORE INTO achievements
                (id, name, description, category, rarity, xp_reward, requirement, is_active)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
            params![
                rule.id,
                rule.name,
                rule.description,
                rule.category.as_str(),
                rule.rarity.as_str(),
                rule.xp_reward,
                requirement,
                rule.is_active
            ],
        )?;
        Ok(inserted > 0)
    }

    pub fn list_achievement_rules(&self) -> Result<Vec<AchievementRule>> {
        let sql = format!("SELECT {RULE_COLUMNS} FROM achievements ORDER BY category, rarity, name");
        let rows = self.query_rows(&sql, [], RuleRow::from_row)?;
        let rules = rows
            .into_iter()
            .map(RuleRow::into_rule)
            .collect::<serde_json::Result<Vec<_>>>()?;
        Ok(rules)
    }

    /// Every active rule with the player's unlock timestamp, if any.
    pub fn list_player_achievements(&self, player_id: i64) -> Result<Vec<PlayerAchievement>> {
        let sql = format!(
            r#"
            SELECT {}, pa.unlocked_at
            FROM achievements a
            LEFT JOIN player_achievements pa
                ON pa.achievement_id = a.id AND pa.player_id = ?1
            WHERE a.is_active = 1
            ORDER BY a.category, a.rarity, a.name
            "#,
            prefixed_rule_columns("a")
        );
        let rows = self.query_rows(&sql, params![player_id], |row| {
            Ok((RuleRow::from_row(row)?, row.get::<_, Option<String>>(8)?))
        })?;

        let mut achievements = Vec::with_capacity(rows.len());
        for (rule, unlocked_at) in rows {
            achievements.push(PlayerAchievement {
                rule: rule.into_rule()?,
                unlocked_at,
            });
        }
        Ok(achievements)
    }

    pub fn list_unlocked(&self, player_id: i64) -> Result<Vec<UnlockedAchievement>> {
        self.query_rows(
            r#"
            SELECT player_id, achievement_id, unlocked_at
            FROM player_achievements
            WHERE player_id = ?1
            ORDER BY unlocked_at DESC, achievement_id
            "#,
            params![player_id],
            |row| {
                Ok(UnlockedAchievement {
                    player_id: row.get(0)?,
                    achievement_id: row.get(1)?,
                    unlocked_at: row.get(2)?,
                })
            },
        )
    }

    // Session and progress history
    pub fn get_session(&self, session_id: i64) -> Result<Option<SessionRecord>> {
        load_session(&self.conn(), session_id)
    }

    pub fn list_progress(
        &self,
        player_id: i64,
        game_id: Option<&str>,
        limit: usize,
    ) -> Result<Vec<ProgressRecord>> {
        load_progress(&self.conn(), player_id, game_id, limit)
    }

    // Leaderboard
    /// Analytics events for a player, newest first.
    pub fn list_events(&self, player_id: i64, limit: usize) -> Result<Vec<AnalyticsEvent>> {
        self.query_rows(
            r#"
            SELECT id, player_id, game_id, session_id, event_type, event_data, created_at
            FROM analytics_events
            WHERE player_id = ?1
            ORDER BY created_at DESC, id DESC
            LIMIT ?2
            "#,
            params![player_id, limit as i64],
            |row| {
                let data: String = row.get(5)?;
                Ok(AnalyticsEvent {
                    id: row.get(0)?,
                    player_id: row.get(1)?,
                    game_id: row.get(2)?,
                    session_id: row.get(3)?,
                    kind: parse_column(row, 4, AnalyticsEventKind::from_str)?,
                    data: json_column(5, &data)?,
                    created_at: row.get(6)?,
                })
            },
        )
    }

    pub fn leaderboard(&self, grade: Option<i32>, limit: usize) -> Result<Vec<LeaderboardEntry>> {
        let rows = self.query_rows(
            r#"
            SELECT p.id, p.name, s.total_points, s.games_completed, s.current_streak
            FROM player_stats s
            JOIN players p ON p.id = s.player_id
            WHERE (?1 IS NULL OR p.grade = ?1)
            ORDER BY s.total_points DESC, p.name
            LIMIT ?2
            "#,
            params![grade, limit as i64],
            |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, i64>(2)?,
                    row.get::<_, i64>(3)?,
                    row.get::<_, i64>(4)?,
                ))
            },
        )?;

        Ok(rows
            .into_iter()
            .enumerate()
            .map(
                |(i, (player_id, name, total_points, games_completed, current_streak))| {
                    LeaderboardEntry {
                        rank: i as i64 + 1,
                        player_id,
                        name,
                        level: xp::level_for_points(total_points),
                        total_points,
                        games_completed,
                        current_streak,
                    }
                },
            )
            .collect())
    }

    /// 1-based rank by total points; ties share the better rank.
    pub fn player_rank(&self, player_id: i64) -> Result<Option<i64>> {
        let conn = self.conn();
        let Some(stats) = load_player_stats(&conn, player_id)? else {
            return Ok(None);
        };

        let higher: i64 = conn.query_row(
            "SELECT COUNT(*) FROM player_stats WHERE total_points > ?1",
            params![stats.total_points],
            |row| row.get(0),
        )?;
        Ok(Some(higher + 1))
    }
}

// Shared loaders, usable on a plain connection or inside a transaction

/// Attempts returned with [`Database::game_details`].
pub const RECENT_ATTEMPTS: usize = 10;

const GAME_COLUMNS: &str =
    "id, title, subject, class_level, difficulty, time_estimate_secs, xp_reward, unlock_requirements, is_active";

const RULE_COLUMNS: &str =
    "id, name, description, category, rarity, xp_reward, requirement, is_active";

fn prefixed_game_columns(alias: &str) -> String {
    prefixed(GAME_COLUMNS, alias)
}

fn prefixed_rule_columns(alias: &str) -> String {
    prefixed(RULE_COLUMNS, alias)
}

fn prefixed(columns: &str, alias: &str) -> String {
    columns
        .split(',')
        .map(|c| format!("{alias}.{}", c.trim()))
        .collect::<Vec<_>>()
        .join(", ")
}

pub(crate) fn load_player(conn: &Connection, id: i64) -> Result<Option<Player>> {
    Ok(conn
        .query_row(
            "SELECT id, name, grade, created_at FROM players WHERE id = ?1",
            params![id],
            player_from_row,
        )
        .optional()?)
}

pub(crate) fn load_player_stats(conn: &Connection, player_id: i64) -> Result<Option<PlayerStats>> {
    Ok(conn
        .query_row(
            r#"
            SELECT player_id, total_points, current_streak, longest_streak, games_completed,
                   favorite_subject, last_active_day
            FROM player_stats
            WHERE player_id = ?1
            "#,
            params![player_id],
            |row| {
                let favorite: Option<String> = row.get(5)?;
                Ok(PlayerStats {
                    player_id: row.get(0)?,
                    total_points: row.get(1)?,
                    current_streak: row.get(2)?,
                    longest_streak: row.get(3)?,
                    games_completed: row.get(4)?,
                    favorite_subject: favorite.as_deref().and_then(Subject::from_str),
                    last_active_day: row.get(6)?,
                })
            },
        )
        .optional()?)
}

pub(crate) fn load_game(conn: &Connection, id: &str) -> Result<Option<GameDefinition>> {
    let sql = format!("SELECT {GAME_COLUMNS} FROM games WHERE id = ?1");
    Ok(conn.query_row(&sql, params![id], game_from_row).optional()?)
}

pub(crate) fn load_session(conn: &Connection, id: i64) -> Result<Option<SessionRecord>> {
    Ok(conn
        .query_row(
            r#"
            SELECT id, player_id, game_id, started_at, last_activity, ended_at, is_active,
                   current_score, game_state
            FROM game_sessions
            WHERE id = ?1
            "#,
            params![id],
            |row| {
                let state: String = row.get(8)?;
                Ok(SessionRecord {
                    id: row.get(0)?,
                    player_id: row.get(1)?,
                    game_id: row.get(2)?,
                    started_at: row.get(3)?,
                    last_activity: row.get(4)?,
                    ended_at: row.get(5)?,
                    is_active: row.get(6)?,
                    current_score: row.get(7)?,
                    game_state: json_column(8, &state)?,
                })
            },
        )
        .optional()?)
}

/// Completed attempts, newest first.
pub(crate) fn load_progress(
    conn: &Connection,
    player_id: i64,
    game_id: Option<&str>,
    limit: usize,
) -> Result<Vec<ProgressRecord>> {
    let mut stmt = conn.prepare(
        r#"
        SELECT id, player_id, game_id, session_id, score, time_spent_secs, hints_used,
               mistakes, xp_earned, completed_at, game_state
        FROM game_progress
        WHERE player_id = ?1 AND (?2 IS NULL OR game_id = ?2)
        ORDER BY completed_at DESC, id DESC
        LIMIT ?3
        "#,
    )?;
    let rows = stmt.query_map(params![player_id, game_id, limit as i64], |row| {
        let state: String = row.get(10)?;
        Ok(ProgressRecord {
            id: row.get(0)?,
            player_id: row.get(1)?,
            game_id: row.get(2)?,
            session_id: row.get(3)?,
            score: row.get(4)?,
            time_spent_secs: row.get(5)?,
            hints_used: row.get(6)?,
            mistakes: row.get(7)?,
            xp_earned: row.get(8)?,
            completed_at: row.get(9)?,
            game_state: json_column(10, &state)?,
        })
    })?;
    let records = rows.collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(records)
}

/// Appends an analytics event on `conn`, normally inside the transaction
/// that made the change being logged.
pub(crate) fn record_event(
    conn: &Connection,
    player_id: i64,
    game_id: &str,
    session_id: i64,
    kind: AnalyticsEventKind,
    data: &serde_json::Value,
    timestamp: &str,
) -> Result<()> {
    conn.execute(
        r#"
        INSERT INTO analytics_events (player_id, game_id, session_id, event_type, event_data, created_at)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6)
        "#,
        params![
            player_id,
            game_id,
            session_id,
            kind.as_str(),
            serde_json::to_string(data)?,
            timestamp
        ],
    )?;
    Ok(())
}

/// Mastery percentage per subject the player has played.
pub(crate) fn load_mastery_map(conn: &Connection, player_id: i64) -> Result<BTreeMap<Subject, f64>> {
    let mut stmt = conn
        .prepare("SELECT subject, mastery_percentage FROM subject_mastery WHERE player_id = ?1")?;
    let rows = stmt.query_map(params![player_id], |row| {
        Ok((parse_column(row, 0, Subject::from_str)?, row.get::<_, f64>(1)?))
    })?;
    let map = rows.collect::<rusqlite::Result<BTreeMap<_, _>>>()?;
    Ok(map)
}

/// Raw achievement row. The requirement stays as text so one malformed rule
/// can be skipped without failing the whole load.
pub(crate) struct RuleRow {
    id: String,
    name: String,
    description: String,
    category: AchievementCategory,
    rarity: Rarity,
    xp_reward: i64,
    requirement: String,
    is_active: bool,
}

impl RuleRow {
    pub(crate) fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            name: row.get(1)?,
            description: row.get(2)?,
            category: parse_column(row, 3, AchievementCategory::from_str)?,
            rarity: parse_column(row, 4, Rarity::from_str)?,
            xp_reward: row.get(5)?,
            requirement: row.get(6)?,
            is_active: row.get(7)?,
        })
    }

    pub(crate) fn id(&self) -> &str {
        &self.id
    }

    pub(crate) fn into_rule(self) -> serde_json::Result<AchievementRule> {
        Ok(AchievementRule {
            requirement: serde_json::from_str(&self.requirement)?,
            id: self.id,
            name: self.name,
            description: self.description,
            category: self.category,
            rarity: self.rarity,
            xp_reward: self.xp_reward,
            is_active: self.is_active,
        })
    }
}

/// Active rules the player has not unlocked yet.
pub(crate) fn load_candidate_rules(conn: &Connection, player_id: i64) -> Result<Vec<RuleRow>> {
    let sql = format!(
        r#"
        SELECT {}
        FROM achievements a
        LEFT JOIN player_achievements pa
            ON pa.achievement_id = a.id AND pa.player_id = ?1
        WHERE pa.player_id IS NULL AND a.is_active = 1
        ORDER BY a.id
        "#,
        prefixed_rule_columns("a")
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params![player_id], RuleRow::from_row)?;
    let rules = rows.collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(rules)
}

fn filter_params(filter: &GameFilter) -> (Option<&'static str>, Option<i32>, Option<&'static str>) {
    (
        filter.subject.map(|s| s.as_str()),
        filter.class_level,
        filter.difficulty.map(|d| d.as_str()),
    )
}

fn player_from_row(row: &Row<'_>) -> rusqlite::Result<Player> {
    Ok(Player {
        id: row.get(0)?,
        name: row.get(1)?,
        grade: row.get(2)?,
        created_at: row.get(3)?,
    })
}

fn game_from_row(row: &Row<'_>) -> rusqlite::Result<GameDefinition> {
    let requirements: String = row.get(7)?;
    Ok(GameDefinition {
        id: row.get(0)?,
        title: row.get(1)?,
        subject: parse_column(row, 2, Subject::from_str)?,
        class_level: row.get(3)?,
        difficulty: parse_column(row, 4, Difficulty::from_str)?,
        time_estimate_secs: row.get(5)?,
        base_xp_reward: row.get(6)?,
        unlock_requirements: json_column(7, &requirements)?,
        is_active: row.get(8)?,
    })
}

fn parse_column<T>(row: &Row<'_>, idx: usize, parse: fn(&str) -> Option<T>) -> rusqlite::Result<T> {
    let raw: String = row.get(idx)?;
    parse(&raw).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            idx,
            Type::Text,
            format!("unrecognised value '{raw}'").into(),
        )
    })
}

// Blank text is corrupt, not an empty object
fn json_column<T: DeserializeOwned>(idx: usize, raw: &str) -> rusqlite::Result<T> {
    serde_json::from_str(raw)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn recommendation_weight(best_score: Option<i64>) -> f64 {
    match best_score {
        None => 150.0,
        Some(score) => (110 - score.clamp(0, 100)) as f64,
    }
}

fn pick_weighted(weights: &[f64], mut point: f64) -> usize {
    for (i, weight) in weights.iter().enumerate() {
        point -= weight;
        if point <= 0.0 {
            return i;
        }
    }
    weights.len().saturating_sub(1)
}
