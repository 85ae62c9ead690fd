pub mod achievements;
pub mod dashboard;
pub mod game_detail;
pub mod games;

use chrono::DateTime;

fn progress_bar(percentage: f64, width: usize) -> String {
    let filled = ((percentage.clamp(0.0, 100.0) / 100.0) * width as f64).round() as usize;
    format!("{}{}", "█".repeat(filled), "░".repeat(width - filled))
}

fn format_date(date_str: &str) -> String {
    if let Ok(dt) = DateTime::parse_from_rfc3339(date_str) {
        dt.format("%b %d").to_string()
    } else {
        date_str.chars().take(10).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn progress_bar_scales_to_width() {
        assert_eq!(progress_bar(0.0, 5), "░░░░░");
        assert_eq!(progress_bar(50.0, 4), "██░░");
        assert_eq!(progress_bar(100.0, 5), "█████");
        assert_eq!(progress_bar(250.0, 3), "███");
    }

    #[test]
    fn format_date_falls_back_to_prefix() {
        assert_eq!(format_date("2024-03-05T10:00:00+00:00"), "Mar 05");
        assert_eq!(format_date("2024-03-05 10:00:00"), "2024-03-05");
    }
}
