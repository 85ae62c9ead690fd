mod ui;
mod widgets;

use std::io;
use std::time::Duration;

use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};

use shiksha::models::{
    GameFilter, GameWithProgress, Player, PlayerAchievement, PlayerStats, ProgressRecord, Subject,
    SubjectMastery,
};
use shiksha::Database;

const RECENT_LIMIT: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum View {
    Dashboard,
    Games,
    GameDetail,
    Achievements,
}

impl View {
    fn next(&self) -> Self {
        match self {
            View::Dashboard => View::Games,
            View::Games => View::Achievements,
            View::GameDetail => View::Games,
            View::Achievements => View::Dashboard,
        }
    }

    fn prev(&self) -> Self {
        match self {
            View::Dashboard => View::Achievements,
            View::Games => View::Dashboard,
            View::GameDetail => View::Games,
            View::Achievements => View::Games,
        }
    }
}

pub struct StatefulList<T> {
    pub items: Vec<T>,
    pub selected: Option<usize>,
}

impl<T> StatefulList<T> {
    fn with_items(items: Vec<T>) -> Self {
        let selected = if items.is_empty() { None } else { Some(0) };
        Self { items, selected }
    }

    fn next(&mut self) {
        if self.items.is_empty() {
            return;
        }
        let i = match self.selected {
            Some(i) if i + 1 < self.items.len() => i + 1,
            _ => 0,
        };
        self.selected = Some(i);
    }

    fn previous(&mut self) {
        if self.items.is_empty() {
            return;
        }
        let i = match self.selected {
            Some(0) | None => self.items.len() - 1,
            Some(i) => i - 1,
        };
        self.selected = Some(i);
    }

    fn first(&mut self) {
        if !self.items.is_empty() {
            self.selected = Some(0);
        }
    }

    fn last(&mut self) {
        if !self.items.is_empty() {
            self.selected = Some(self.items.len() - 1);
        }
    }

    fn selected_item(&self) -> Option<&T> {
        self.selected.and_then(|i| self.items.get(i))
    }
}

pub struct App {
    db: Database,
    pub view: View,
    pub player: Player,
    pub stats: PlayerStats,
    pub rank: Option<i64>,
    pub mastery: Vec<SubjectMastery>,
    pub recent: Vec<ProgressRecord>,
    pub games: StatefulList<GameWithProgress>,
    pub achievements: StatefulList<PlayerAchievement>,
    pub selected_game: Option<GameWithProgress>,
    pub selected_game_attempts: Vec<ProgressRecord>,
    pub filter_subject: Option<Subject>,
    pub filter_input: String,
    pub filter_mode: bool,
    pub status: Option<String>,
    pub should_quit: bool,
}

impl App {
    pub fn new(db: Database, player_id: i64) -> Result<Self, Box<dyn std::error::Error>> {
        let player = db
            .get_player(player_id)?
            .ok_or_else(|| format!("Player {} not found", player_id))?;
        let stats = db
            .get_player_stats(player_id)?
            .unwrap_or_else(|| PlayerStats::new(player_id));

        Ok(Self {
            view: View::Dashboard,
            rank: db.player_rank(player_id)?,
            mastery: db.list_subject_mastery(player_id)?,
            recent: db.list_progress(player_id, None, RECENT_LIMIT)?,
            games: StatefulList::with_items(
                db.list_games_for_player(player_id, &GameFilter::default())?,
            ),
            achievements: StatefulList::with_items(db.list_player_achievements(player_id)?),
            db,
            player,
            stats,
            selected_game: None,
            selected_game_attempts: Vec::new(),
            filter_subject: None,
            filter_input: String::new(),
            filter_mode: false,
            status: None,
            should_quit: false,
        })
    }

    pub fn refresh_data(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        let player_id = self.player.id;
        if let Some(stats) = self.db.get_player_stats(player_id)? {
            self.stats = stats;
        }
        self.rank = self.db.player_rank(player_id)?;
        self.mastery = self.db.list_subject_mastery(player_id)?;
        self.recent = self.db.list_progress(player_id, None, RECENT_LIMIT)?;
        self.games = StatefulList::with_items(
            self.db
                .list_games_for_player(player_id, &self.game_filter())?,
        );
        self.achievements =
            StatefulList::with_items(self.db.list_player_achievements(player_id)?);
        self.status = None;
        Ok(())
    }

    fn game_filter(&self) -> GameFilter {
        GameFilter {
            subject: self.filter_subject,
            ..Default::default()
        }
    }

    fn apply_filter(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        let input = self.filter_input.trim();
        if input.is_empty() {
            self.filter_subject = None;
        } else {
            match Subject::from_str(input) {
                Some(subject) => self.filter_subject = Some(subject),
                None => {
                    self.status = Some(format!("Unknown subject: {}", input));
                    return Ok(());
                }
            }
        }
        self.status = None;
        self.games = StatefulList::with_items(
            self.db
                .list_games_for_player(self.player.id, &self.game_filter())?,
        );
        Ok(())
    }

    fn select_game(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        if let Some(game) = self.games.selected_item() {
            self.selected_game_attempts =
                self.db
                    .list_progress(self.player.id, Some(game.game.id.as_str()), RECENT_LIMIT)?;
            self.selected_game = Some(game.clone());
            self.view = View::GameDetail;
        }
        Ok(())
    }

    fn close_game(&mut self) {
        self.view = View::Games;
        self.selected_game = None;
    }

    fn handle_key(
        &mut self,
        key: KeyCode,
        modifiers: KeyModifiers,
    ) -> Result<(), Box<dyn std::error::Error>> {
        if self.filter_mode {
            match key {
                KeyCode::Esc => {
                    self.filter_mode = false;
                    self.filter_input.clear();
                }
                KeyCode::Enter => {
                    self.filter_mode = false;
                    self.apply_filter()?;
                }
                KeyCode::Backspace => {
                    self.filter_input.pop();
                }
                KeyCode::Char(c) => {
                    self.filter_input.push(c);
                }
                _ => {}
            }
            return Ok(());
        }

        match key {
            KeyCode::Char('q') => self.should_quit = true,

            KeyCode::Char('r') if modifiers.contains(KeyModifiers::CONTROL) => {
                self.refresh_data()?;
            }

            // Subject filter on the games list
            KeyCode::Char('/') if self.view == View::Games => {
                self.filter_mode = true;
                self.filter_input.clear();
            }

            KeyCode::Esc => match self.view {
                View::GameDetail => self.close_game(),
                View::Games if self.filter_subject.is_some() => {
                    self.filter_input.clear();
                    self.apply_filter()?;
                }
                _ => {}
            },

            KeyCode::Char('h') | KeyCode::Left => match self.view {
                View::GameDetail => self.close_game(),
                _ => self.view = self.view.prev(),
            },
            KeyCode::Char('l') | KeyCode::Right => match self.view {
                View::Games => self.select_game()?,
                _ => self.view = self.view.next(),
            },

            KeyCode::Tab => {
                if modifiers.contains(KeyModifiers::SHIFT) {
                    self.view = self.view.prev();
                } else {
                    self.view = self.view.next();
                }
            }
            KeyCode::BackTab => {
                self.view = self.view.prev();
            }

            KeyCode::Char('j') | KeyCode::Down => match self.view {
                View::Games => self.games.next(),
                View::Achievements => self.achievements.next(),
                _ => {}
            },
            KeyCode::Char('k') | KeyCode::Up => match self.view {
                View::Games => self.games.previous(),
                View::Achievements => self.achievements.previous(),
                _ => {}
            },

            KeyCode::Char('g') => match self.view {
                View::Games => self.games.first(),
                View::Achievements => self.achievements.first(),
                _ => {}
            },
            KeyCode::Char('G') => match self.view {
                View::Games => self.games.last(),
                View::Achievements => self.achievements.last(),
                _ => {}
            },

            KeyCode::Enter if self.view == View::Games => self.select_game()?,

            _ => {}
        }
        Ok(())
    }
}

pub fn run(db: Database, player_id: i64) -> Result<(), Box<dyn std::error::Error>> {
    // Load before touching the terminal so a bad player id prints normally
    let mut app = App::new(db, player_id)?;

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = run_app(&mut terminal, &mut app);

    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    result
}

fn run_app(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut App,
) -> Result<(), Box<dyn std::error::Error>> {
    loop {
        terminal.draw(|f| ui::draw(f, app))?;

        if event::poll(Duration::from_millis(100))? {
            if let Event::Key(key) = event::read()? {
                app.handle_key(key.code, key.modifiers)?;
            }
        }

        if app.should_quit {
            return Ok(());
        }
    }
}
