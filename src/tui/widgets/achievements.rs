use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, ListState, Paragraph, Wrap},
    Frame,
};

use super::format_date;
use crate::truncate;
use crate::tui::App;
use shiksha::models::Rarity;

fn rarity_color(rarity: Rarity) -> Color {
    match rarity {
        Rarity::Common => Color::White,
        Rarity::Rare => Color::Blue,
        Rarity::Epic => Color::Magenta,
        Rarity::Legendary => Color::Yellow,
    }
}

pub fn draw(f: &mut Frame, app: &App, area: Rect) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(0), Constraint::Length(4)])
        .split(area);

    let unlocked = app
        .achievements
        .items
        .iter()
        .filter(|a| a.is_unlocked())
        .count();

    let items: Vec<ListItem> = app
        .achievements
        .items
        .iter()
        .map(|a| {
            let (mark, mark_color) = if a.is_unlocked() {
                ("✓ ", Color::Green)
            } else {
                ("· ", Color::DarkGray)
            };
            let when = a
                .unlocked_at
                .as_deref()
                .map(format_date)
                .unwrap_or_default();

            ListItem::new(Line::from(vec![
                Span::styled(mark, Style::default().fg(mark_color)),
                Span::styled(
                    format!("{:<24}", truncate(&a.rule.name, 22)),
                    Style::default().fg(rarity_color(a.rule.rarity)),
                ),
                Span::styled(
                    format!("{:<12}", a.rule.category.as_str()),
                    Style::default().fg(Color::Cyan),
                ),
                Span::styled(
                    format!("{:<10}", a.rule.rarity.as_str()),
                    Style::default().fg(rarity_color(a.rule.rarity)),
                ),
                Span::styled(
                    format!("{:>5} XP  ", a.rule.xp_reward),
                    Style::default().fg(Color::Yellow),
                ),
                Span::styled(when, Style::default().fg(Color::DarkGray)),
            ]))
        })
        .collect();

    let block = Block::default()
        .borders(Borders::ALL)
        .title(format!(
            " Achievements ({}/{}) ",
            unlocked,
            app.achievements.items.len()
        ))
        .title_style(Style::default().fg(Color::Yellow));

    let list = List::new(items)
        .block(block)
        .highlight_style(
            Style::default()
                .bg(Color::DarkGray)
                .add_modifier(Modifier::BOLD),
        )
        .highlight_symbol("> ");

    let mut state = ListState::default();
    state.select(app.achievements.selected);
    f.render_stateful_widget(list, chunks[0], &mut state);

    let description = app
        .achievements
        .selected
        .and_then(|i| app.achievements.items.get(i))
        .map(|a| a.rule.description.clone())
        .unwrap_or_default();

    let detail = Paragraph::new(description)
        .block(Block::default().borders(Borders::ALL).title(" Description "))
        .wrap(Wrap { trim: true });
    f.render_widget(detail, chunks[1]);
}
