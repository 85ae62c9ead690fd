use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Gauge, List, ListItem, Paragraph},
    Frame,
};

use super::{format_date, progress_bar};
use crate::truncate;
use crate::tui::App;

pub fn draw(f: &mut Frame, app: &App, area: Rect) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Level gauge
            Constraint::Length(8), // Stats + mastery row
            Constraint::Min(0),    // Recent attempts
        ])
        .split(area);

    let top_chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(40), Constraint::Percentage(60)])
        .split(chunks[1]);

    draw_level(f, app, chunks[0]);
    draw_stats(f, app, top_chunks[0]);
    draw_mastery(f, app, top_chunks[1]);
    draw_recent(f, app, chunks[2]);
}

fn draw_level(f: &mut Frame, app: &App, area: Rect) {
    let info = app.stats.level_info();
    let span = (info.current_level_xp + info.xp_to_next_level).max(1);
    let ratio = (info.current_level_xp as f64 / span as f64).clamp(0.0, 1.0);

    let gauge = Gauge::default()
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(format!(" Level {} ", info.level))
                .title_style(Style::default().fg(Color::Yellow)),
        )
        .gauge_style(Style::default().fg(Color::Yellow).bg(Color::Black))
        .ratio(ratio)
        .label(format!(
            "{} XP, {} to next level",
            info.total_xp, info.xp_to_next_level
        ));

    f.render_widget(gauge, area);
}

fn stat_line(label: &str, value: String, color: Color) -> Line<'static> {
    Line::from(vec![
        Span::styled(format!("{}: ", label), Style::default().fg(Color::Gray)),
        Span::styled(value, Style::default().fg(color)),
    ])
}

fn draw_stats(f: &mut Frame, app: &App, area: Rect) {
    let stats = &app.stats;

    let rank = app
        .rank
        .map(|r| format!("#{}", r))
        .unwrap_or_else(|| "-".to_string());
    let favorite = stats
        .favorite_subject
        .map(|s| s.label().to_string())
        .unwrap_or_else(|| "-".to_string());

    let text = vec![
        Line::from(vec![
            Span::styled("Grade: ", Style::default().fg(Color::Gray)),
            Span::styled(
                format!("{}", app.player.grade),
                Style::default()
                    .fg(Color::White)
                    .add_modifier(Modifier::BOLD),
            ),
        ]),
        stat_line("Rank", rank, Color::Magenta),
        stat_line(
            "Games",
            format!("{}", stats.games_completed),
            Color::White,
        ),
        stat_line(
            "Streak",
            format!("{} (best {})", stats.current_streak, stats.longest_streak),
            if stats.current_streak > 0 {
                Color::Green
            } else {
                Color::White
            },
        ),
        stat_line("Favourite", favorite, Color::Cyan),
    ];

    let block = Block::default()
        .borders(Borders::ALL)
        .title(" Stats ")
        .title_style(Style::default().fg(Color::Cyan));

    let paragraph = Paragraph::new(text).block(block);
    f.render_widget(paragraph, area);
}

fn draw_mastery(f: &mut Frame, app: &App, area: Rect) {
    let items: Vec<ListItem> = app
        .mastery
        .iter()
        .map(|m| {
            ListItem::new(Line::from(vec![
                Span::styled(
                    format!("{:<14}", m.subject.label()),
                    Style::default().fg(Color::White),
                ),
                Span::styled(
                    progress_bar(m.mastery_percentage, 10),
                    Style::default().fg(Color::Green),
                ),
                Span::styled(
                    format!(" {:>5.1}%", m.mastery_percentage),
                    Style::default().fg(Color::Yellow),
                ),
                Span::styled(
                    format!("  {} played", m.games_completed),
                    Style::default().fg(Color::DarkGray),
                ),
            ]))
        })
        .collect();

    let block = Block::default()
        .borders(Borders::ALL)
        .title(" Subject Mastery ")
        .title_style(Style::default().fg(Color::Green));

    let list = List::new(items).block(block);
    f.render_widget(list, area);
}

fn draw_recent(f: &mut Frame, app: &App, area: Rect) {
    let titles = app
        .games
        .items
        .iter()
        .map(|g| (g.game.id.as_str(), g.game.title.as_str()))
        .collect::<std::collections::HashMap<_, _>>();

    let items: Vec<ListItem> = app
        .recent
        .iter()
        .map(|record| {
            let title = titles
                .get(record.game_id.as_str())
                .copied()
                .unwrap_or(record.game_id.as_str());
            let score_color = match record.score {
                100 => Color::Green,
                s if s >= 60 => Color::Yellow,
                _ => Color::Red,
            };

            ListItem::new(Line::from(vec![
                Span::styled(
                    format!("{:<10}", format_date(&record.completed_at)),
                    Style::default().fg(Color::DarkGray),
                ),
                Span::styled(
                    format!("{:<30}", truncate(title, 28)),
                    Style::default().fg(Color::White),
                ),
                Span::styled(
                    format!("{:>4}", record.score),
                    Style::default().fg(score_color),
                ),
                Span::styled(
                    format!("  +{} XP", record.xp_earned),
                    Style::default().fg(Color::Cyan),
                ),
            ]))
        })
        .collect();

    let block = Block::default()
        .borders(Borders::ALL)
        .title(" Recent Attempts ")
        .title_style(Style::default().fg(Color::Magenta));

    let list = List::new(items).block(block);
    f.render_widget(list, area);
}
