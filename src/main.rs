mod tui;

use clap::{Parser, Subcommand};
use serde::Serialize;

use shiksha::catalog;
use shiksha::models::{
    Difficulty, GameDefinition, GameFilter, JsonOutput, Subject, UnlockRequirements,
};
use shiksha::{Config, Database, ProgressTracker, SessionResult};

#[derive(Parser)]
#[command(name = "shiksha")]
#[command(about = "Progression engine for learning games: XP, streaks, mastery and achievements")]
#[command(version)]
struct Cli {
    /// Output as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Enable debug logging
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the database
    Init {
        /// Also insert the default achievements and starter games
        #[arg(long)]
        seed: bool,
    },

    /// Manage players
    #[command(subcommand)]
    Player(PlayerCommands),

    /// Manage the game catalog
    #[command(subcommand)]
    Game(GameCommands),

    /// List achievements, or one player's unlock status
    Achievements {
        /// Player ID
        #[arg(long, short)]
        player: Option<i64>,
    },

    /// Play through game sessions
    #[command(subcommand)]
    Session(SessionCommands),

    /// Show a player's level, streaks and mastery
    Stats {
        /// Player ID
        player: i64,
    },

    /// Show the points leaderboard
    Leaderboard {
        /// Only include players in this grade
        #[arg(long, short)]
        grade: Option<i32>,

        /// Number of entries to show
        #[arg(long, short, default_value_t = 10)]
        limit: usize,
    },

    /// Show a player's session start and completion log
    Events {
        /// Player ID
        player: i64,

        /// Number of events to show
        #[arg(long, short, default_value_t = 20)]
        limit: usize,
    },

    /// Suggest the next game to play (stochastic selection)
    Next {
        /// Player ID
        player: i64,
    },

    /// Launch interactive terminal UI for a player
    Tui {
        /// Player ID
        player: i64,
    },
}

#[derive(Subcommand)]
enum PlayerCommands {
    /// Register a new player
    Add {
        /// Player name
        name: String,

        /// Class level
        #[arg(long, short, default_value_t = 8)]
        grade: i32,
    },

    /// Show player details
    Show {
        /// Player ID
        id: i64,
    },

    /// List all players
    List,
}

#[derive(Subcommand)]
enum GameCommands {
    /// List games
    List {
        /// Show unlock status and best scores for this player
        #[arg(long, short)]
        player: Option<i64>,

        /// Filter by subject
        #[arg(long, short)]
        subject: Option<String>,

        /// Filter by class level
        #[arg(long, short)]
        class_level: Option<i32>,

        /// Filter by difficulty: beginner/intermediate/advanced
        #[arg(long, short)]
        difficulty: Option<String>,

        /// Only games for the player's own grade
        #[arg(long, requires = "player", conflicts_with = "class_level")]
        my_grade: bool,
    },

    /// Show game details
    Show {
        /// Game ID
        id: String,

        /// Include this player's attempts and scores
        #[arg(long, short)]
        player: Option<i64>,
    },

    /// Add a game to the catalog
    Add {
        /// Game ID (slug)
        id: String,

        /// Display title
        #[arg(long, short)]
        title: String,

        /// Subject
        #[arg(long, short)]
        subject: String,

        /// Class level
        #[arg(long, short, default_value_t = 8)]
        class_level: i32,

        /// Difficulty: beginner/intermediate/advanced
        #[arg(long, short, default_value = "beginner")]
        difficulty: String,

        /// Base XP reward
        #[arg(long, short, default_value_t = 100)]
        xp: i64,

        /// Expected play time in minutes
        #[arg(long, short, default_value_t = 15)]
        minutes: i64,

        /// Unlock requirements as JSON, e.g. '{"level": 5}'
        #[arg(long, short)]
        requires: Option<String>,
    },
}

#[derive(Subcommand)]
enum SessionCommands {
    /// Start a session on a game
    Start {
        /// Player ID
        player: i64,

        /// Game ID
        game: String,
    },

    /// Save in-flight progress
    Checkpoint {
        /// Player ID
        player: i64,

        /// Session ID
        session: i64,

        /// Current score (0-100)
        #[arg(long, short)]
        score: i64,

        /// Game state as JSON
        #[arg(long)]
        state: Option<String>,
    },

    /// Finish a session and record the result
    Complete {
        /// Player ID
        player: i64,

        /// Session ID
        session: i64,

        /// Final score (0-100)
        #[arg(long, short)]
        score: i64,

        /// Time spent in seconds
        #[arg(long, short)]
        time: i64,

        /// Hints used
        #[arg(long, default_value_t = 0)]
        hints: i64,

        /// Mistakes made
        #[arg(long, short, default_value_t = 0)]
        mistakes: i64,

        /// Final game state as JSON
        #[arg(long)]
        state: Option<String>,
    },
}

fn main() {
    let cli = Cli::parse();

    let log_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    let json = cli.json;
    if let Err(e) = run(cli) {
        if json {
            println!(
                "{}",
                serde_json::to_string(&JsonOutput::<()>::err(e.to_string()))
                    .unwrap_or_else(|_| String::from("{\"success\":false}"))
            );
        } else {
            eprintln!("Error: {}", e);
        }
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::from_env();
    let db = Database::open(&config.db_path)?;
    let tracker = ProgressTracker::new(db.clone()).with_favorite_window(config.favorite_window_days);

    match cli.command {
        Commands::Init { seed } => {
            db.init()?;
            let report = if seed { Some(catalog::seed(&db)?) } else { None };
            if cli.json {
                print_json(&report)?;
            } else {
                println!("Database initialized at: {}", config.db_path.display());
                if let Some(report) = report {
                    println!(
                        "Seeded {} achievements and {} games.",
                        report.achievements_added, report.games_added
                    );
                }
            }
        }

        Commands::Player(player_cmd) => match player_cmd {
            PlayerCommands::Add { name, grade } => {
                let id = db.add_player(&name, grade)?;
                if cli.json {
                    print_json(serde_json::json!({ "id": id, "name": name }))?;
                } else {
                    println!("Added player '{}' with ID: {}", name, id);
                }
            }

            PlayerCommands::Show { id } => {
                let player = db
                    .get_player(id)?
                    .ok_or_else(|| format!("Player {} not found", id))?;
                let stats = db.get_player_stats(id)?;
                if cli.json {
                    print_json(serde_json::json!({ "player": player, "stats": stats }))?;
                } else {
                    println!("Player: {}", player.name);
                    println!("ID: {}", player.id);
                    println!("Grade: {}", player.grade);
                    println!("Joined: {}", player.created_at);
                    if let Some(stats) = stats {
                        println!("Level: {} ({} XP)", stats.level(), stats.total_points);
                    }
                }
            }

            PlayerCommands::List => {
                let players = db.list_players()?;
                if cli.json {
                    print_json(&players)?;
                } else if players.is_empty() {
                    println!("No players found.");
                } else {
                    println!("{:<5} {:<30} GRADE", "ID", "NAME");
                    println!("{}", "-".repeat(45));
                    for player in players {
                        println!("{:<5} {:<30} {}", player.id, truncate(&player.name, 28), player.grade);
                    }
                }
            }
        },

        Commands::Game(game_cmd) => match game_cmd {
            GameCommands::List {
                player,
                subject,
                class_level,
                difficulty,
                my_grade,
            } => {
                let mut filter = GameFilter {
                    subject: subject.as_deref().map(parse_subject).transpose()?,
                    class_level,
                    difficulty: difficulty.as_deref().map(parse_difficulty).transpose()?,
                };
                if let (true, Some(player_id)) = (my_grade, player) {
                    let profile = db
                        .get_player(player_id)?
                        .ok_or_else(|| format!("Player {} not found", player_id))?;
                    filter.class_level = Some(profile.grade);
                }

                match player {
                    Some(player_id) => {
                        let games = db.list_games_for_player(player_id, &filter)?;
                        if cli.json {
                            print_json(&games)?;
                        } else if games.is_empty() {
                            println!("No games found.");
                        } else {
                            println!(
                                "{:<26} {:<30} {:<12} {:<8} {:<6} BEST",
                                "ID", "TITLE", "SUBJECT", "STATUS", "PLAYS"
                            );
                            println!("{}", "-".repeat(92));
                            for g in games {
                                println!(
                                    "{:<26} {:<30} {:<12} {:<8} {:<6} {}",
                                    truncate(&g.game.id, 24),
                                    truncate(&g.game.title, 28),
                                    g.game.subject.as_str(),
                                    if g.is_unlocked { "open" } else { "locked" },
                                    g.attempts,
                                    g.best_score.map_or("-".to_string(), |s| s.to_string())
                                );
                            }
                        }
                    }
                    None => {
                        let games = db.list_games(&filter)?;
                        if cli.json {
                            print_json(&games)?;
                        } else if games.is_empty() {
                            println!("No games found.");
                        } else {
                            println!(
                                "{:<26} {:<30} {:<12} {:<6} {:<13} XP",
                                "ID", "TITLE", "SUBJECT", "CLASS", "DIFFICULTY"
                            );
                            println!("{}", "-".repeat(95));
                            for g in games {
                                println!(
                                    "{:<26} {:<30} {:<12} {:<6} {:<13} {}",
                                    truncate(&g.id, 24),
                                    truncate(&g.title, 28),
                                    g.subject.as_str(),
                                    g.class_level,
                                    g.difficulty.as_str(),
                                    g.base_xp_reward
                                );
                            }
                        }
                    }
                }
            }

            GameCommands::Show {
                id,
                player: Some(player_id),
            } => {
                let details = db
                    .game_details(player_id, &id)?
                    .ok_or_else(|| format!("Game '{}' not found", id))?;
                if cli.json {
                    print_json(&details)?;
                } else {
                    let game = &details.game;
                    println!("Game: {} ({})", game.title, game.id);
                    println!("Subject: {}", game.subject.label());
                    println!("Status: {}", if details.is_unlocked { "unlocked" } else { "locked" });
                    println!("Attempts: {}", details.total_attempts);
                    println!(
                        "Average score: {}",
                        details.average_score.map_or("-".to_string(), |s| format!("{:.1}", s))
                    );
                    println!(
                        "Best score: {}",
                        details.best_score.map_or("-".to_string(), |s| s.to_string())
                    );
                    println!("Time played: {} min", details.total_time_spent_secs / 60);

                    if !details.recent_attempts.is_empty() {
                        println!();
                        println!("{:<27} {:<6} {:<7} XP", "COMPLETED", "SCORE", "SECS");
                        println!("{}", "-".repeat(50));
                        for attempt in &details.recent_attempts {
                            println!(
                                "{:<27} {:<6} {:<7} {}",
                                truncate(&attempt.completed_at, 25),
                                attempt.score,
                                attempt.time_spent_secs,
                                attempt.xp_earned
                            );
                        }
                    }
                }
            }

            GameCommands::Show { id, player: None } => {
                let game = db
                    .get_game(&id)?
                    .ok_or_else(|| format!("Game '{}' not found", id))?;
                if cli.json {
                    print_json(&game)?;
                } else {
                    println!("Game: {}", game.title);
                    println!("ID: {}", game.id);
                    println!("Subject: {}", game.subject.label());
                    println!("Class: {}", game.class_level);
                    println!("Difficulty: {}", game.difficulty.as_str());
                    println!("Base XP: {}", game.base_xp_reward);
                    println!("Estimated time: {} min", game.time_estimate_secs / 60);
                    println!("Active: {}", if game.is_active { "yes" } else { "no" });
                    if game.unlock_requirements.is_empty() {
                        println!("Requirements: none");
                    } else {
                        println!(
                            "Requirements: {}",
                            serde_json::to_string(&game.unlock_requirements)?
                        );
                    }
                }
            }

            GameCommands::Add {
                id,
                title,
                subject,
                class_level,
                difficulty,
                xp,
                minutes,
                requires,
            } => {
                let unlock_requirements: UnlockRequirements = match requires {
                    Some(raw) => serde_json::from_str(&raw)
                        .map_err(|e| format!("Invalid requirements JSON: {}", e))?,
                    None => UnlockRequirements::default(),
                };
                let game = GameDefinition {
                    id,
                    title,
                    subject: parse_subject(&subject)?,
                    class_level,
                    base_xp_reward: xp,
                    difficulty: parse_difficulty(&difficulty)?,
                    time_estimate_secs: minutes * 60,
                    unlock_requirements,
                    is_active: true,
                };

                if !db.add_game(&game)? {
                    return Err(format!("Game '{}' already exists", game.id).into());
                }
                if cli.json {
                    print_json(&game)?;
                } else {
                    println!("Added game '{}' ({}).", game.title, game.id);
                }
            }
        },

        Commands::Achievements { player } => match player {
            Some(player_id) => {
                let achievements = db.list_player_achievements(player_id)?;
                if cli.json {
                    print_json(&achievements)?;
                } else if achievements.is_empty() {
                    println!("No achievements defined. Run `shiksha init --seed`.");
                } else {
                    let earned = achievements.iter().filter(|a| a.is_unlocked()).count();
                    println!("Unlocked {}/{}", earned, achievements.len());
                    println!();
                    for a in achievements {
                        let mark = if a.is_unlocked() { "[x]" } else { "[ ]" };
                        println!(
                            "{} {:<24} {:<10} {:>4} XP  {}",
                            mark,
                            truncate(&a.rule.name, 22),
                            a.rule.rarity.as_str(),
                            a.rule.xp_reward,
                            a.rule.description
                        );
                    }
                }
            }
            None => {
                let rules = db.list_achievement_rules()?;
                if cli.json {
                    print_json(&rules)?;
                } else if rules.is_empty() {
                    println!("No achievements defined. Run `shiksha init --seed`.");
                } else {
                    println!("{:<22} {:<24} {:<12} {:<10} XP", "ID", "NAME", "CATEGORY", "RARITY");
                    println!("{}", "-".repeat(75));
                    for rule in rules {
                        println!(
                            "{:<22} {:<24} {:<12} {:<10} {}",
                            truncate(&rule.id, 20),
                            truncate(&rule.name, 22),
                            rule.category.as_str(),
                            rule.rarity.as_str(),
                            rule.xp_reward
                        );
                    }
                }
            }
        },

        Commands::Session(session_cmd) => match session_cmd {
            SessionCommands::Start { player, game } => {
                let session_id = tracker.start_session(player, &game)?;
                if cli.json {
                    print_json(serde_json::json!({ "session_id": session_id }))?;
                } else {
                    println!("Started session {} on '{}'.", session_id, game);
                    println!();
                    println!("When finished, record the result with:");
                    println!(
                        "  shiksha session complete {} {} --score <0-100> --time <secs>",
                        player, session_id
                    );
                }
            }

            SessionCommands::Checkpoint {
                player,
                session,
                score,
                state,
            } => {
                let state = parse_state(state.as_deref())?;
                tracker.checkpoint_session(player, session, score, &state)?;
                if cli.json {
                    print_json(())?;
                } else {
                    println!("Checkpoint saved for session {}.", session);
                }
            }

            SessionCommands::Complete {
                player,
                session,
                score,
                time,
                hints,
                mistakes,
                state,
            } => {
                let result = SessionResult {
                    score,
                    time_spent_secs: time,
                    hints_used: hints,
                    mistakes,
                    game_state: parse_state(state.as_deref())?,
                };
                let outcome = tracker.complete_session(player, session, &result)?;

                if cli.json {
                    print_json(&outcome)?;
                } else {
                    println!("Session {} complete: +{} XP", session, outcome.xp_earned);
                    if outcome.leveled_up() {
                        println!(
                            "Level up! {} -> {}",
                            outcome.level_before, outcome.level_after
                        );
                    }
                    for achievement in &outcome.new_achievements {
                        println!(
                            "Achievement unlocked: {} (+{} XP)",
                            achievement.name, achievement.xp_reward
                        );
                    }
                }
            }
        },

        Commands::Stats { player } => {
            let profile = db
                .get_player(player)?
                .ok_or_else(|| format!("Player {} not found", player))?;
            let stats = db
                .get_player_stats(player)?
                .ok_or_else(|| format!("No stats recorded for player {}", player))?;
            let level = stats.level_info();
            let rank = db.player_rank(player)?;
            let mastery = db.list_subject_mastery(player)?;

            if cli.json {
                print_json(serde_json::json!({
                    "player": profile,
                    "stats": stats,
                    "level": level,
                    "rank": rank,
                    "mastery": mastery
                }))?;
            } else {
                println!("=== {} ===", profile.name);
                println!(
                    "Level {} ({}/{} XP to next, {} total)",
                    level.level,
                    level.current_level_xp,
                    level.current_level_xp + level.xp_to_next_level,
                    level.total_xp
                );
                if let Some(rank) = rank {
                    println!("Rank: #{}", rank);
                }
                println!("Games completed: {}", stats.games_completed);
                println!(
                    "Streak: {} day(s) (longest {})",
                    stats.current_streak, stats.longest_streak
                );
                println!(
                    "Favourite subject: {}",
                    stats.favorite_subject.map_or("-", |s| s.label())
                );
                if !mastery.is_empty() {
                    println!();
                    println!("{:<14} {:<7} {:<9} MASTERY", "SUBJECT", "GAMES", "AVG");
                    println!("{}", "-".repeat(40));
                    for m in mastery {
                        println!(
                            "{:<14} {:<7} {:<9.1} {:.1}%",
                            m.subject.label(),
                            m.games_completed,
                            m.average_score,
                            m.mastery_percentage
                        );
                    }
                }
            }
        }

        Commands::Leaderboard { grade, limit } => {
            let entries = db.leaderboard(grade, limit)?;
            if cli.json {
                print_json(&entries)?;
            } else if entries.is_empty() {
                println!("No players found.");
            } else {
                println!("{:<5} {:<24} {:<6} {:<8} {:<6} STREAK", "RANK", "NAME", "LEVEL", "POINTS", "GAMES");
                println!("{}", "-".repeat(60));
                for e in entries {
                    println!(
                        "{:<5} {:<24} {:<6} {:<8} {:<6} {}",
                        e.rank,
                        truncate(&e.name, 22),
                        e.level,
                        e.total_points,
                        e.games_completed,
                        e.current_streak
                    );
                }
            }
        }

        Commands::Events { player, limit } => {
            let events = db.list_events(player, limit)?;
            if cli.json {
                print_json(&events)?;
            } else if events.is_empty() {
                println!("No events recorded.");
            } else {
                println!("{:<27} {:<15} {:<24} {:<8} DATA", "WHEN", "EVENT", "GAME", "SESSION");
                println!("{}", "-".repeat(90));
                for e in events {
                    println!(
                        "{:<27} {:<15} {:<24} {:<8} {}",
                        truncate(&e.created_at, 25),
                        e.kind.as_str(),
                        truncate(&e.game_id, 22),
                        e.session_id,
                        e.data
                    );
                }
            }
        }

        Commands::Next { player } => {
            if let Some(pick) = db.recommend_next_game(player)? {
                if cli.json {
                    print_json(&pick)?;
                } else {
                    println!("=== Next Game ===");
                    println!();
                    println!("Game: {} ({})", pick.game.title, pick.game.id);
                    println!("Subject: {}", pick.game.subject.label());
                    println!(
                        "Played: {} time(s), best score {}",
                        pick.attempts,
                        pick.best_score.map_or("-".to_string(), |s| s.to_string())
                    );
                    println!();
                    println!("Start it with:");
                    println!("  shiksha session start {} {}", player, pick.game.id);
                }
            } else if cli.json {
                print_json(())?;
            } else {
                println!("No unlocked games available. Add some games first!");
            }
        }

        Commands::Tui { player } => {
            tui::run(db, player)?;
        }
    }

    Ok(())
}

fn print_json<T: Serialize>(data: T) -> Result<(), serde_json::Error> {
    println!("{}", serde_json::to_string(&JsonOutput::ok(data))?);
    Ok(())
}

fn parse_subject(s: &str) -> Result<Subject, String> {
    Subject::from_str(s).ok_or_else(|| {
        let known: Vec<_> = Subject::ALL.iter().map(|s| s.as_str()).collect();
        format!("Invalid subject '{}'. Use: {}", s, known.join(", "))
    })
}

fn parse_difficulty(s: &str) -> Result<Difficulty, String> {
    Difficulty::from_str(s).ok_or_else(|| {
        format!(
            "Invalid difficulty '{}'. Use: beginner, intermediate, or advanced",
            s
        )
    })
}

fn parse_state(raw: Option<&str>) -> Result<serde_json::Value, String> {
    match raw {
        Some(raw) => serde_json::from_str(raw).map_err(|e| format!("Invalid state JSON: {}", e)),
        None => Ok(serde_json::json!({})),
    }
}

fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    mod truncate_tests {
        use super::*;

        #[test]
        fn truncate_short_string() {
            assert_eq!(truncate("hello", 10), "hello");
        }

        #[test]
        fn truncate_exact_length() {
            assert_eq!(truncate("hello", 5), "hello");
        }

        #[test]
        fn truncate_long_string() {
            assert_eq!(truncate("hello world", 8), "hello...");
        }

        #[test]
        fn truncate_multibyte() {
            assert_eq!(truncate("\u{14c}dish\u{101} festivals", 8), "\u{14c}dish...");
        }
    }

    mod parse_helper_tests {
        use super::*;

        #[test]
        fn subject_aliases() {
            assert_eq!(parse_subject("math").unwrap(), Subject::Maths);
            let err = parse_subject("history").unwrap_err();
            assert!(err.contains("science"));
        }

        #[test]
        fn difficulty_names() {
            assert_eq!(parse_difficulty("advanced").unwrap(), Difficulty::Advanced);
            assert!(parse_difficulty("expert").unwrap_err().contains("beginner"));
        }

        #[test]
        fn state_defaults_to_empty_object() {
            assert_eq!(parse_state(None).unwrap(), serde_json::json!({}));
            assert_eq!(
                parse_state(Some(r#"{"level": 2}"#)).unwrap(),
                serde_json::json!({"level": 2})
            );
            assert!(parse_state(Some("{oops")).is_err());
        }
    }

    mod cli_parsing_tests {
        use super::*;

        #[test]
        fn parse_init_command() {
            let cli = Cli::try_parse_from(["shiksha", "init"]).unwrap();
            assert!(!cli.json);
            assert!(matches!(cli.command, Commands::Init { seed: false }));
        }

        #[test]
        fn parse_init_with_seed_and_json() {
            let cli = Cli::try_parse_from(["shiksha", "--json", "init", "--seed"]).unwrap();
            assert!(cli.json);
            assert!(matches!(cli.command, Commands::Init { seed: true }));
        }

        #[test]
        fn parse_verbose_after_subcommand() {
            let cli = Cli::try_parse_from(["shiksha", "player", "list", "-v"]).unwrap();
            assert!(cli.verbose);
        }

        #[test]
        fn parse_player_add_default_grade() {
            let cli = Cli::try_parse_from(["shiksha", "player", "add", "Asha"]).unwrap();
            match cli.command {
                Commands::Player(PlayerCommands::Add { name, grade }) => {
                    assert_eq!(name, "Asha");
                    assert_eq!(grade, 8);
                }
                _ => panic!("Expected Player Add command"),
            }
        }

        #[test]
        fn parse_player_add_with_grade() {
            let cli = Cli::try_parse_from(["shiksha", "player", "add", "Asha", "-g", "6"]).unwrap();
            match cli.command {
                Commands::Player(PlayerCommands::Add { grade, .. }) => assert_eq!(grade, 6),
                _ => panic!("Expected Player Add command"),
            }
        }

        #[test]
        fn parse_game_list_for_player() {
            let cli = Cli::try_parse_from([
                "shiksha", "game", "list", "--player", "3", "--subject", "maths",
            ])
            .unwrap();
            match cli.command {
                Commands::Game(GameCommands::List {
                    player,
                    subject,
                    class_level,
                    difficulty,
                    my_grade,
                }) => {
                    assert_eq!(player, Some(3));
                    assert_eq!(subject, Some("maths".to_string()));
                    assert!(class_level.is_none());
                    assert!(difficulty.is_none());
                    assert!(!my_grade);
                }
                _ => panic!("Expected Game List command"),
            }
        }

        #[test]
        fn parse_game_list_with_class_and_difficulty() {
            let cli = Cli::try_parse_from([
                "shiksha", "game", "list", "-c", "7", "-d", "advanced",
            ])
            .unwrap();
            match cli.command {
                Commands::Game(GameCommands::List {
                    class_level,
                    difficulty,
                    ..
                }) => {
                    assert_eq!(class_level, Some(7));
                    assert_eq!(difficulty, Some("advanced".to_string()));
                }
                _ => panic!("Expected Game List command"),
            }
        }

        #[test]
        fn parse_game_list_my_grade_needs_player() {
            assert!(Cli::try_parse_from(["shiksha", "game", "list", "--my-grade"]).is_err());
            assert!(
                Cli::try_parse_from(["shiksha", "game", "list", "--my-grade", "-p", "1", "-c", "6"])
                    .is_err()
            );
            let cli =
                Cli::try_parse_from(["shiksha", "game", "list", "--my-grade", "-p", "1"]).unwrap();
            assert!(matches!(
                cli.command,
                Commands::Game(GameCommands::List { my_grade: true, player: Some(1), .. })
            ));
        }

        #[test]
        fn parse_game_show_for_player() {
            let cli = Cli::try_parse_from(["shiksha", "game", "show", "sci-water-cycle", "-p", "2"])
                .unwrap();
            match cli.command {
                Commands::Game(GameCommands::Show { id, player }) => {
                    assert_eq!(id, "sci-water-cycle");
                    assert_eq!(player, Some(2));
                }
                _ => panic!("Expected Game Show command"),
            }
        }

        #[test]
        fn parse_game_add_defaults() {
            let cli = Cli::try_parse_from([
                "shiksha",
                "game",
                "add",
                "math-fractions",
                "--title",
                "Fraction Pizza",
                "--subject",
                "maths",
            ])
            .unwrap();
            match cli.command {
                Commands::Game(GameCommands::Add {
                    id,
                    difficulty,
                    xp,
                    minutes,
                    requires,
                    ..
                }) => {
                    assert_eq!(id, "math-fractions");
                    assert_eq!(difficulty, "beginner");
                    assert_eq!(xp, 100);
                    assert_eq!(minutes, 15);
                    assert!(requires.is_none());
                }
                _ => panic!("Expected Game Add command"),
            }
        }

        #[test]
        fn parse_session_start() {
            let cli = Cli::try_parse_from(["shiksha", "session", "start", "1", "tech-circuit-builder"])
                .unwrap();
            match cli.command {
                Commands::Session(SessionCommands::Start { player, game }) => {
                    assert_eq!(player, 1);
                    assert_eq!(game, "tech-circuit-builder");
                }
                _ => panic!("Expected Session Start command"),
            }
        }

        #[test]
        fn parse_session_complete() {
            let cli = Cli::try_parse_from([
                "shiksha", "session", "complete", "1", "9", "--score", "85", "--time", "420",
                "--hints", "2",
            ])
            .unwrap();
            match cli.command {
                Commands::Session(SessionCommands::Complete {
                    player,
                    session,
                    score,
                    time,
                    hints,
                    mistakes,
                    state,
                }) => {
                    assert_eq!(player, 1);
                    assert_eq!(session, 9);
                    assert_eq!(score, 85);
                    assert_eq!(time, 420);
                    assert_eq!(hints, 2);
                    assert_eq!(mistakes, 0);
                    assert!(state.is_none());
                }
                _ => panic!("Expected Session Complete command"),
            }
        }

        #[test]
        fn parse_session_complete_requires_score() {
            let result = Cli::try_parse_from(["shiksha", "session", "complete", "1", "9", "--time", "60"]);
            assert!(result.is_err());
        }

        #[test]
        fn parse_session_checkpoint() {
            let cli = Cli::try_parse_from([
                "shiksha",
                "session",
                "checkpoint",
                "1",
                "9",
                "-s",
                "40",
                "--state",
                "{\"step\": 2}",
            ])
            .unwrap();
            match cli.command {
                Commands::Session(SessionCommands::Checkpoint { score, state, .. }) => {
                    assert_eq!(score, 40);
                    assert_eq!(state, Some("{\"step\": 2}".to_string()));
                }
                _ => panic!("Expected Session Checkpoint command"),
            }
        }

        #[test]
        fn parse_achievements_for_player() {
            let cli = Cli::try_parse_from(["shiksha", "achievements", "-p", "4"]).unwrap();
            assert!(matches!(cli.command, Commands::Achievements { player: Some(4) }));
        }

        #[test]
        fn parse_leaderboard_defaults() {
            let cli = Cli::try_parse_from(["shiksha", "leaderboard"]).unwrap();
            match cli.command {
                Commands::Leaderboard { grade, limit } => {
                    assert!(grade.is_none());
                    assert_eq!(limit, 10);
                }
                _ => panic!("Expected Leaderboard command"),
            }
        }

        #[test]
        fn parse_leaderboard_with_grade() {
            let cli = Cli::try_parse_from(["shiksha", "leaderboard", "--grade", "9", "-l", "3"]).unwrap();
            match cli.command {
                Commands::Leaderboard { grade, limit } => {
                    assert_eq!(grade, Some(9));
                    assert_eq!(limit, 3);
                }
                _ => panic!("Expected Leaderboard command"),
            }
        }

        #[test]
        fn parse_events_with_limit() {
            let cli = Cli::try_parse_from(["shiksha", "events", "5"]).unwrap();
            assert!(matches!(cli.command, Commands::Events { player: 5, limit: 20 }));

            let cli = Cli::try_parse_from(["shiksha", "events", "5", "-l", "3"]).unwrap();
            assert!(matches!(cli.command, Commands::Events { player: 5, limit: 3 }));
        }

        #[test]
        fn parse_stats_next_and_tui() {
            let cli = Cli::try_parse_from(["shiksha", "stats", "2"]).unwrap();
            assert!(matches!(cli.command, Commands::Stats { player: 2 }));

            let cli = Cli::try_parse_from(["shiksha", "next", "2"]).unwrap();
            assert!(matches!(cli.command, Commands::Next { player: 2 }));

            let cli = Cli::try_parse_from(["shiksha", "tui", "2"]).unwrap();
            assert!(matches!(cli.command, Commands::Tui { player: 2 }));
        }

        #[test]
        fn parse_stats_requires_player() {
            assert!(Cli::try_parse_from(["shiksha", "stats"]).is_err());
        }
    }
}
