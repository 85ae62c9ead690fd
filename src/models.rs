use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::xp;

// Curriculum subjects offered on the platform
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Subject {
    Science,
    Technology,
    Engineering,
    English,
    Maths,
    Odissi,
}

impl Subject {
    pub const ALL: [Subject; 6] = [
        Subject::Science,
        Subject::Technology,
        Subject::Engineering,
        Subject::English,
        Subject::Maths,
        Subject::Odissi,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Subject::Science => "science",
            Subject::Technology => "technology",
            Subject::Engineering => "engineering",
            Subject::English => "english",
            Subject::Maths => "maths",
            Subject::Odissi => "odissi",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "science" => Some(Subject::Science),
            "technology" | "tech" => Some(Subject::Technology),
            "engineering" => Some(Subject::Engineering),
            "english" => Some(Subject::English),
            "maths" | "math" | "mathematics" => Some(Subject::Maths),
            "odissi" | "odia" => Some(Subject::Odissi),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Subject::Science => "Science",
            Subject::Technology => "Technology",
            Subject::Engineering => "Engineering",
            Subject::English => "English",
            Subject::Maths => "Mathematics",
            Subject::Odissi => "Odia Culture",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Difficulty {
    Beginner,
    Intermediate,
    Advanced,
}

impl Difficulty {
    pub fn as_str(&self) -> &'static str {
        match self {
            Difficulty::Beginner => "BEGINNER",
            Difficulty::Intermediate => "INTERMEDIATE",
            Difficulty::Advanced => "ADVANCED",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "BEGINNER" => Some(Difficulty::Beginner),
            "INTERMEDIATE" => Some(Difficulty::Intermediate),
            "ADVANCED" => Some(Difficulty::Advanced),
            _ => None,
        }
    }

    pub fn xp_multiplier(&self) -> f64 {
        match self {
            Difficulty::Beginner => 1.0,
            Difficulty::Intermediate => 1.3,
            Difficulty::Advanced => 1.6,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Player {
    pub id: i64,
    pub name: String,
    pub grade: i32,
    pub created_at: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerStats {
    pub player_id: i64,
    pub total_points: i64,
    pub current_streak: i64,
    pub longest_streak: i64,
    pub games_completed: i64,
    pub favorite_subject: Option<Subject>,
    pub last_active_day: Option<String>,
}

impl PlayerStats {
    pub fn new(player_id: i64) -> Self {
        Self {
            player_id,
            total_points: 0,
            current_streak: 0,
            longest_streak: 0,
            games_completed: 0,
            favorite_subject: None,
            last_active_day: None,
        }
    }

    // Level is always derived from points so it can never drift from them
    pub fn level(&self) -> i64 {
        xp::level_for_points(self.total_points)
    }

    pub fn level_info(&self) -> LevelInfo {
        xp::level_info(self.total_points)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelInfo {
    pub level: i64,
    pub current_level_xp: i64,
    pub xp_to_next_level: i64,
    pub total_xp: i64,
}

/// Gate on a game. Every present key must hold. Unrecognised keys are a
/// parse error so a misspelled gate never reads as an open game.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UnlockRequirements {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level: Option<i64>,
    #[serde(
        default,
        alias = "gamesCompleted",
        skip_serializing_if = "Option::is_none"
    )]
    pub games_completed: Option<i64>,
    #[serde(
        default,
        alias = "subjectMastery",
        skip_serializing_if = "BTreeMap::is_empty"
    )]
    pub subject_mastery: BTreeMap<Subject, f64>,
}

impl UnlockRequirements {
    pub fn is_empty(&self) -> bool {
        self.level.is_none() && self.games_completed.is_none() && self.subject_mastery.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameDefinition {
    pub id: String,
    pub title: String,
    pub subject: Subject,
    pub class_level: i32,
    pub base_xp_reward: i64,
    pub difficulty: Difficulty,
    pub time_estimate_secs: i64,
    pub unlock_requirements: UnlockRequirements,
    pub is_active: bool,
}

// A game together with one player's standing on it
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameWithProgress {
    pub game: GameDefinition,
    pub is_unlocked: bool,
    pub attempts: i64,
    pub best_score: Option<i64>,
}

/// Catalog filter. Absent fields match every game.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GameFilter {
    pub subject: Option<Subject>,
    pub class_level: Option<i32>,
    pub difficulty: Option<Difficulty>,
}

impl GameFilter {
    pub fn subject(subject: Subject) -> Self {
        Self {
            subject: Some(subject),
            ..Default::default()
        }
    }
}

/// One game with a player's full record on it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameDetails {
    pub game: GameDefinition,
    pub is_unlocked: bool,
    pub total_attempts: i64,
    pub average_score: Option<f64>,
    pub best_score: Option<i64>,
    pub total_time_spent_secs: i64,
    pub recent_attempts: Vec<ProgressRecord>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionRecord {
    pub id: i64,
    pub player_id: i64,
    pub game_id: String,
    pub started_at: String,
    pub last_activity: String,
    pub ended_at: Option<String>,
    pub is_active: bool,
    pub current_score: i64,
    pub game_state: serde_json::Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressRecord {
    pub id: i64,
    pub player_id: i64,
    pub game_id: String,
    pub session_id: i64,
    pub score: i64,
    pub time_spent_secs: i64,
    pub hints_used: i64,
    pub mistakes: i64,
    pub xp_earned: i64,
    pub completed_at: String,
    pub game_state: serde_json::Value,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalyticsEventKind {
    GameStart,
    GameComplete,
}

impl AnalyticsEventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AnalyticsEventKind::GameStart => "game_start",
            AnalyticsEventKind::GameComplete => "game_complete",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "game_start" => Some(AnalyticsEventKind::GameStart),
            "game_complete" => Some(AnalyticsEventKind::GameComplete),
            _ => None,
        }
    }
}

/// One row of the learning-analytics log, written alongside the session
/// change it describes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalyticsEvent {
    pub id: i64,
    pub player_id: i64,
    pub game_id: String,
    pub session_id: i64,
    pub kind: AnalyticsEventKind,
    pub data: serde_json::Value,
    pub created_at: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubjectMastery {
    pub player_id: i64,
    pub subject: Subject,
    pub games_completed: i64,
    pub total_xp: i64,
    pub average_score: f64,
    pub mastery_percentage: f64,
    pub updated_at: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AchievementCategory {
    Academic,
    Persistence,
    Mastery,
    Social,
    Cultural,
}

impl AchievementCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            AchievementCategory::Academic => "academic",
            AchievementCategory::Persistence => "persistence",
            AchievementCategory::Mastery => "mastery",
            AchievementCategory::Social => "social",
            AchievementCategory::Cultural => "cultural",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "academic" => Some(AchievementCategory::Academic),
            "persistence" => Some(AchievementCategory::Persistence),
            "mastery" => Some(AchievementCategory::Mastery),
            "social" => Some(AchievementCategory::Social),
            "cultural" => Some(AchievementCategory::Cultural),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Rarity {
    Common,
    Rare,
    Epic,
    Legendary,
}

impl Rarity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Rarity::Common => "common",
            Rarity::Rare => "rare",
            Rarity::Epic => "epic",
            Rarity::Legendary => "legendary",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "common" => Some(Rarity::Common),
            "rare" => Some(Rarity::Rare),
            "epic" => Some(Rarity::Epic),
            "legendary" => Some(Rarity::Legendary),
            _ => None,
        }
    }
}

/// What a player must have done to earn an achievement.
///
/// Stored as JSON such as `{"type": "streak", "value": 7}` and parsed once
/// when the rule is loaded. Kinds this build does not know about load as
/// [`AchievementRequirement::Unsupported`] and never match.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AchievementRequirement {
    GamesCompleted { value: i64 },
    Level { value: i64 },
    Streak { value: i64 },
    /// Number of completions with a score of 100.
    PerfectScore { value: i64 },
    SubjectMastery { subject: Subject, value: f64 },
    SubjectGames { subject: Subject, value: i64 },
    /// A completion finished within `value` seconds.
    SpeedCompletion { value: i64 },
    #[serde(other)]
    Unsupported,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AchievementRule {
    pub id: String,
    pub name: String,
    pub description: String,
    pub category: AchievementCategory,
    pub rarity: Rarity,
    pub requirement: AchievementRequirement,
    pub xp_reward: i64,
    pub is_active: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnlockedAchievement {
    pub player_id: i64,
    pub achievement_id: String,
    pub unlocked_at: String,
}

// An achievement rule with one player's unlock status
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerAchievement {
    pub rule: AchievementRule,
    pub unlocked_at: Option<String>,
}

impl PlayerAchievement {
    pub fn is_unlocked(&self) -> bool {
        self.unlocked_at.is_some()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LeaderboardEntry {
    pub rank: i64,
    pub player_id: i64,
    pub name: String,
    pub level: i64,
    pub total_points: i64,
    pub games_completed: i64,
    pub current_streak: i64,
}

/// Result of finishing a game session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionOutcome {
    pub progress_id: i64,
    pub xp_earned: i64,
    pub new_achievements: Vec<AchievementRule>,
    pub level_before: i64,
    pub level_after: i64,
}

impl CompletionOutcome {
    pub fn leveled_up(&self) -> bool {
        self.level_after > self.level_before
    }
}

// JSON output wrapper for CLI
#[derive(Debug, Serialize)]
pub struct JsonOutput<T: Serialize> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<String>,
}

impl<T: Serialize> JsonOutput<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn err(msg: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(msg.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    mod subject_tests {
        use super::*;

        #[test]
        fn as_str_round_trips_through_from_str() {
            for subject in Subject::ALL {
                assert_eq!(Subject::from_str(subject.as_str()), Some(subject));
            }
        }

        #[test]
        fn from_str_accepts_aliases() {
            assert_eq!(Subject::from_str("Math"), Some(Subject::Maths));
            assert_eq!(Subject::from_str("odia"), Some(Subject::Odissi));
            assert_eq!(Subject::from_str("history"), None);
        }

        #[test]
        fn serializes_lowercase() {
            let json = serde_json::to_string(&Subject::Maths).unwrap();
            assert_eq!(json, "\"maths\"");
        }
    }

    mod difficulty_tests {
        use super::*;

        #[test]
        fn multipliers() {
            assert_eq!(Difficulty::Beginner.xp_multiplier(), 1.0);
            assert_eq!(Difficulty::Intermediate.xp_multiplier(), 1.3);
            assert_eq!(Difficulty::Advanced.xp_multiplier(), 1.6);
        }

        #[test]
        fn from_str_is_case_insensitive() {
            assert_eq!(Difficulty::from_str("advanced"), Some(Difficulty::Advanced));
            assert_eq!(Difficulty::from_str("EXPERT"), None);
        }

        #[test]
        fn serializes_screaming_case() {
            let json = serde_json::to_string(&Difficulty::Intermediate).unwrap();
            assert_eq!(json, "\"INTERMEDIATE\"");
        }
    }

    mod analytics_kind_tests {
        use super::*;

        #[test]
        fn names_match_stored_values() {
            for kind in [AnalyticsEventKind::GameStart, AnalyticsEventKind::GameComplete] {
                assert_eq!(AnalyticsEventKind::from_str(kind.as_str()), Some(kind));
                let json = serde_json::to_string(&kind).unwrap();
                assert_eq!(json, format!("\"{}\"", kind.as_str()));
            }
            assert_eq!(AnalyticsEventKind::from_str("level_up"), None);
        }
    }

    mod player_stats_tests {
        use super::*;

        #[test]
        fn level_is_derived_from_points() {
            let mut stats = PlayerStats::new(1);
            assert_eq!(stats.level(), 1);
            stats.total_points = 99;
            assert_eq!(stats.level(), 1);
            stats.total_points = 100;
            assert_eq!(stats.level(), 2);
            stats.total_points = 450;
            assert_eq!(stats.level(), 5);
        }
    }

    mod unlock_requirements_tests {
        use super::*;

        #[test]
        fn empty_object_parses_to_empty() {
            let req: UnlockRequirements = serde_json::from_str("{}").unwrap();
            assert!(req.is_empty());
        }

        #[test]
        fn parses_snake_and_camel_keys() {
            let snake: UnlockRequirements =
                serde_json::from_str(r#"{"level": 5, "games_completed": 3}"#).unwrap();
            assert_eq!(snake.level, Some(5));
            assert_eq!(snake.games_completed, Some(3));

            let camel: UnlockRequirements = serde_json::from_str(
                r#"{"gamesCompleted": 2, "subjectMastery": {"maths": 60}}"#,
            )
            .unwrap();
            assert_eq!(camel.games_completed, Some(2));
            assert_eq!(camel.subject_mastery.get(&Subject::Maths), Some(&60.0));
        }

        #[test]
        fn misspelled_key_is_rejected() {
            let result: Result<UnlockRequirements, _> =
                serde_json::from_str(r#"{"levle": 50, "games_complete": 99}"#);
            assert!(result.is_err());

            let result: Result<UnlockRequirements, _> =
                serde_json::from_str(r#"{"level": 5, "subject_master": {"maths": 60}}"#);
            assert!(result.is_err());
        }

        #[test]
        fn unknown_subject_is_rejected() {
            let result: Result<UnlockRequirements, _> =
                serde_json::from_str(r#"{"subject_mastery": {"history": 50}}"#);
            assert!(result.is_err());
        }

        #[test]
        fn serializes_without_absent_keys() {
            let req = UnlockRequirements {
                level: Some(3),
                ..Default::default()
            };
            assert_eq!(serde_json::to_string(&req).unwrap(), r#"{"level":3}"#);
        }
    }

    mod requirement_tests {
        use super::*;

        #[test]
        fn parses_known_kinds() {
            let req: AchievementRequirement =
                serde_json::from_str(r#"{"type": "streak", "value": 7}"#).unwrap();
            assert_eq!(req, AchievementRequirement::Streak { value: 7 });

            let req: AchievementRequirement = serde_json::from_str(
                r#"{"type": "subject_mastery", "subject": "maths", "value": 90}"#,
            )
            .unwrap();
            assert_eq!(
                req,
                AchievementRequirement::SubjectMastery {
                    subject: Subject::Maths,
                    value: 90.0
                }
            );
        }

        #[test]
        fn unknown_kind_is_unsupported() {
            let req: AchievementRequirement =
                serde_json::from_str(r#"{"type": "peer_help", "value": 5}"#).unwrap();
            assert_eq!(req, AchievementRequirement::Unsupported);
        }

        #[test]
        fn missing_value_is_an_error() {
            let result: Result<AchievementRequirement, _> =
                serde_json::from_str(r#"{"type": "level"}"#);
            assert!(result.is_err());
        }
    }

    mod outcome_tests {
        use super::*;

        #[test]
        fn leveled_up_compares_levels() {
            let mut outcome = CompletionOutcome {
                progress_id: 1,
                xp_earned: 10,
                new_achievements: vec![],
                level_before: 1,
                level_after: 1,
            };
            assert!(!outcome.leveled_up());
            outcome.level_after = 2;
            assert!(outcome.leveled_up());
        }
    }

    mod json_output_tests {
        use super::*;

        #[test]
        fn ok_with_number() {
            let output = JsonOutput::ok(42);
            assert!(output.success);
            assert_eq!(output.data, Some(42));
            assert!(output.error.is_none());
        }

        #[test]
        fn err_with_string() {
            let output = JsonOutput::<()>::err("something went wrong");
            assert!(!output.success);
            assert!(output.data.is_none());
            assert_eq!(output.error, Some("something went wrong".to_string()));
        }

        #[test]
        fn serializes_correctly() {
            let output = JsonOutput::ok(vec![1, 2, 3]);
            let json = serde_json::to_string(&output).unwrap();
            assert_eq!(json, r#"{"success":true,"data":[1,2,3],"error":null}"#);
        }
    }
}
