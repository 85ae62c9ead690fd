//! Default achievements and starter games.

use std::collections::BTreeMap;

use serde::Serialize;
use tracing::info;

use crate::db::Database;
use crate::error::Result;
use crate::models::{
    AchievementCategory, AchievementRequirement, AchievementRule, Difficulty, GameDefinition,
    Rarity, Subject, UnlockRequirements,
};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SeedReport {
    pub achievements_added: usize,
    pub games_added: usize,
}

/// Inserts the default catalog. Rows that already exist are left alone, so
/// seeding can be repeated safely.
pub fn seed(db: &Database) -> Result<SeedReport> {
    let mut report = SeedReport::default();

    for rule in default_achievements() {
        if db.add_achievement(&rule)? {
            report.achievements_added += 1;
        }
    }
    for game in starter_games() {
        if db.add_game(&game)? {
            report.games_added += 1;
        }
    }

    info!(
        achievements = report.achievements_added,
        games = report.games_added,
        "catalog seeded"
    );
    Ok(report)
}

fn achievement(
    id: &str,
    name: &str,
    description: &str,
    category: AchievementCategory,
    rarity: Rarity,
    xp_reward: i64,
    requirement: AchievementRequirement,
) -> AchievementRule {
    AchievementRule {
        id: id.to_string(),
        name: name.to_string(),
        description: description.to_string(),
        category,
        rarity,
        requirement,
        xp_reward,
        is_active: true,
    }
}

pub fn default_achievements() -> Vec<AchievementRule> {
    use AchievementCategory::*;
    use AchievementRequirement as Req;

    vec![
        achievement(
            "first_game",
            "First Steps",
            "Complete your first game",
            Academic,
            Rarity::Common,
            50,
            Req::GamesCompleted { value: 1 },
        ),
        achievement(
            "perfect_score",
            "Perfectionist",
            "Score 100% on any game",
            Academic,
            Rarity::Rare,
            100,
            Req::PerfectScore { value: 1 },
        ),
        achievement(
            "week_streak",
            "Dedicated Learner",
            "Play games for 7 consecutive days",
            Persistence,
            Rarity::Epic,
            200,
            Req::Streak { value: 7 },
        ),
        achievement(
            "math_master",
            "Mathematics Master",
            "Achieve 90% mastery in Mathematics",
            Mastery,
            Rarity::Epic,
            300,
            Req::SubjectMastery {
                subject: Subject::Maths,
                value: 90.0,
            },
        ),
        achievement(
            "science_explorer",
            "Science Explorer",
            "Complete 10 science games",
            Academic,
            Rarity::Rare,
            150,
            Req::SubjectGames {
                subject: Subject::Science,
                value: 10,
            },
        ),
        achievement(
            "cultural_ambassador",
            "Cultural Ambassador",
            "Master Odia culture and traditions",
            Cultural,
            Rarity::Legendary,
            500,
            Req::SubjectMastery {
                subject: Subject::Odissi,
                value: 95.0,
            },
        ),
        achievement(
            "speed_demon",
            "Speed Demon",
            "Complete a game in record time",
            Academic,
            Rarity::Rare,
            120,
            Req::SpeedCompletion { value: 30 },
        ),
        achievement(
            "tech_wizard",
            "Technology Wizard",
            "Excel in technology games",
            Mastery,
            Rarity::Epic,
            300,
            Req::SubjectMastery {
                subject: Subject::Technology,
                value: 85.0,
            },
        ),
        achievement(
            "engineering_genius",
            "Engineering Genius",
            "Master engineering concepts",
            Mastery,
            Rarity::Legendary,
            400,
            Req::SubjectMastery {
                subject: Subject::Engineering,
                value: 90.0,
            },
        ),
        achievement(
            "level_five",
            "Rising Star",
            "Reach level 5",
            Persistence,
            Rarity::Rare,
            100,
            Req::Level { value: 5 },
        ),
    ]
}

#[allow(clippy::too_many_arguments)]
fn starter_game(
    id: &str,
    title: &str,
    subject: Subject,
    class_level: i32,
    difficulty: Difficulty,
    minutes: i64,
    base_xp_reward: i64,
    unlock_requirements: UnlockRequirements,
) -> GameDefinition {
    GameDefinition {
        id: id.to_string(),
        title: title.to_string(),
        subject,
        class_level,
        base_xp_reward,
        difficulty,
        time_estimate_secs: minutes * 60,
        unlock_requirements,
        is_active: true,
    }
}

pub fn starter_games() -> Vec<GameDefinition> {
    let open = UnlockRequirements::default;

    vec![
        starter_game(
            "math-drag-drop-algebra",
            "Algebra Drag & Drop",
            Subject::Maths,
            8,
            Difficulty::Beginner,
            15,
            120,
            open(),
        ),
        starter_game(
            "science-chemistry-lab",
            "Virtual Chemistry Lab",
            Subject::Science,
            10,
            Difficulty::Intermediate,
            20,
            140,
            UnlockRequirements {
                level: Some(5),
                games_completed: Some(3),
                ..Default::default()
            },
        ),
        starter_game(
            "odia-festival-memory",
            "Odisha Festival Memory Game",
            Subject::Odissi,
            8,
            Difficulty::Beginner,
            18,
            130,
            open(),
        ),
        starter_game(
            "tech-circuit-builder",
            "Electronic Circuit Builder",
            Subject::Technology,
            8,
            Difficulty::Beginner,
            15,
            120,
            open(),
        ),
        starter_game(
            "eng-bridge-builder",
            "Bridge Engineering Challenge",
            Subject::Engineering,
            11,
            Difficulty::Intermediate,
            22,
            170,
            UnlockRequirements {
                level: Some(15),
                games_completed: None,
                subject_mastery: BTreeMap::from([(Subject::Maths, 60.0)]),
            },
        ),
        starter_game(
            "english-grammar-quest",
            "Grammar Adventure Quest",
            Subject::English,
            7,
            Difficulty::Beginner,
            15,
            110,
            open(),
        ),
    ]
}
