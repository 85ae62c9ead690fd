use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, ListState, Paragraph},
    Frame,
};

use crate::truncate;
use crate::tui::App;

pub fn draw(f: &mut Frame, app: &App, area: Rect) {
    let title = if let Some(subject) = app.filter_subject {
        format!(" Games (subject: {}) ", subject.label())
    } else {
        " Games ".to_string()
    };

    let block = Block::default()
        .borders(Borders::ALL)
        .title(title)
        .title_style(Style::default().fg(Color::Cyan));
    let inner = block.inner(area);
    f.render_widget(block, area);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(1), Constraint::Min(0)])
        .split(inner);

    let header_style = Style::default()
        .fg(Color::DarkGray)
        .add_modifier(Modifier::BOLD);
    let header = Line::from(vec![
        Span::styled(format!("  {:<32}", "Title"), header_style),
        Span::styled(format!("{:<14}", "Subject"), header_style),
        Span::styled(format!("{:<14}", "Difficulty"), header_style),
        Span::styled(format!("{:<8}", "Status"), header_style),
        Span::styled(format!("{:>6}", "Plays"), header_style),
        Span::styled(format!("{:>6}", "Best"), header_style),
    ]);
    f.render_widget(Paragraph::new(header), chunks[0]);

    let items: Vec<ListItem> = app
        .games
        .items
        .iter()
        .map(|g| {
            let (status, status_color) = if g.is_unlocked {
                ("open", Color::Green)
            } else {
                ("locked", Color::Red)
            };
            let title_color = if g.is_unlocked {
                Color::White
            } else {
                Color::DarkGray
            };
            let best = g
                .best_score
                .map(|s| s.to_string())
                .unwrap_or_else(|| "-".to_string());

            ListItem::new(Line::from(vec![
                Span::styled(
                    format!("{:<32}", truncate(&g.game.title, 30)),
                    Style::default().fg(title_color),
                ),
                Span::styled(
                    format!("{:<14}", g.game.subject.label()),
                    Style::default().fg(Color::Cyan),
                ),
                Span::styled(
                    format!("{:<14}", g.game.difficulty.as_str()),
                    Style::default().fg(Color::Yellow),
                ),
                Span::styled(
                    format!("{:<8}", status),
                    Style::default().fg(status_color),
                ),
                Span::styled(
                    format!("{:>6}", g.attempts),
                    Style::default().fg(Color::White),
                ),
                Span::styled(format!("{:>6}", best), Style::default().fg(Color::Green)),
            ]))
        })
        .collect();

    let list = List::new(items)
        .highlight_style(
            Style::default()
                .bg(Color::DarkGray)
                .add_modifier(Modifier::BOLD),
        )
        .highlight_symbol("> ");

    let mut state = ListState::default();
    state.select(app.games.selected);

    f.render_stateful_widget(list, chunks[1], &mut state);
}
