use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, Paragraph, Wrap},
    Frame,
};

use super::format_date;
use crate::tui::App;
use shiksha::models::UnlockRequirements;

pub fn draw(f: &mut Frame, app: &App, area: Rect) {
    let Some(entry) = &app.selected_game else {
        let msg = Paragraph::new("No game selected")
            .block(Block::default().borders(Borders::ALL).title(" Game "));
        f.render_widget(msg, area);
        return;
    };

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(9), // Info + requirements
            Constraint::Min(0),    // Attempts
        ])
        .split(area);

    let top_chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(55), Constraint::Percentage(45)])
        .split(chunks[0]);

    let game = &entry.game;
    let label = |s: &str| Span::styled(s.to_string(), Style::default().fg(Color::Gray));

    let info = vec![
        Line::from(vec![Span::styled(
            game.title.clone(),
            Style::default()
                .fg(Color::White)
                .add_modifier(Modifier::BOLD),
        )]),
        Line::from(vec![
            label("Subject: "),
            Span::styled(game.subject.label(), Style::default().fg(Color::Cyan)),
            label("  Class: "),
            Span::raw(game.class_level.to_string()),
        ]),
        Line::from(vec![
            label("Difficulty: "),
            Span::styled(game.difficulty.as_str(), Style::default().fg(Color::Yellow)),
            label("  Base XP: "),
            Span::raw(game.base_xp_reward.to_string()),
        ]),
        Line::from(vec![
            label("Estimate: "),
            Span::raw(format!("{} min", game.time_estimate_secs / 60)),
        ]),
        Line::from(vec![
            label("Plays: "),
            Span::raw(entry.attempts.to_string()),
            label("  Best: "),
            Span::styled(
                entry
                    .best_score
                    .map(|s| s.to_string())
                    .unwrap_or_else(|| "-".to_string()),
                Style::default().fg(Color::Green),
            ),
        ]),
    ];

    let info_block = Block::default()
        .borders(Borders::ALL)
        .title(format!(" {} ", game.id))
        .title_style(Style::default().fg(Color::Cyan));
    f.render_widget(
        Paragraph::new(info).block(info_block).wrap(Wrap { trim: true }),
        top_chunks[0],
    );

    let (status, status_color) = if entry.is_unlocked {
        ("Unlocked", Color::Green)
    } else {
        ("Locked", Color::Red)
    };
    let mut requirements = vec![Line::from(Span::styled(
        status,
        Style::default()
            .fg(status_color)
            .add_modifier(Modifier::BOLD),
    ))];
    requirements.extend(requirement_lines(&game.unlock_requirements));

    let req_block = Block::default()
        .borders(Borders::ALL)
        .title(" Requirements ")
        .title_style(Style::default().fg(Color::Yellow));
    f.render_widget(Paragraph::new(requirements).block(req_block), top_chunks[1]);

    let attempts: Vec<ListItem> = app
        .selected_game_attempts
        .iter()
        .map(|record| {
            ListItem::new(Line::from(vec![
                Span::styled(
                    format!("{:<10}", format_date(&record.completed_at)),
                    Style::default().fg(Color::DarkGray),
                ),
                Span::styled(
                    format!("score {:>3}", record.score),
                    Style::default().fg(Color::White),
                ),
                Span::styled(
                    format!("  {:>4}s", record.time_spent_secs),
                    Style::default().fg(Color::Gray),
                ),
                Span::styled(
                    format!("  hints {}  mistakes {}", record.hints_used, record.mistakes),
                    Style::default().fg(Color::DarkGray),
                ),
                Span::styled(
                    format!("  +{} XP", record.xp_earned),
                    Style::default().fg(Color::Cyan),
                ),
            ]))
        })
        .collect();

    let attempts_block = Block::default()
        .borders(Borders::ALL)
        .title(" Attempts ")
        .title_style(Style::default().fg(Color::Magenta));
    f.render_widget(List::new(attempts).block(attempts_block), chunks[1]);
}

fn requirement_lines(req: &UnlockRequirements) -> Vec<Line<'static>> {
    if req.is_empty() {
        return vec![Line::from("Open to everyone")];
    }

    let mut lines = Vec::new();
    if let Some(level) = req.level {
        lines.push(Line::from(format!("Reach level {}", level)));
    }
    if let Some(games) = req.games_completed {
        lines.push(Line::from(format!("Complete {} games", games)));
    }
    for (subject, pct) in &req.subject_mastery {
        lines.push(Line::from(format!("{} mastery {:.0}%", subject.label(), pct)));
    }
    lines
}
