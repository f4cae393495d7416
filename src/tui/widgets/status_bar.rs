use ratatui::Frame;
use ratatui::layout::Rect;
use ratatui::style::{Modifier, Style};
use ratatui::widgets::Paragraph;

use crate::Config;
use crate::tui::widgets::color::{get_contrast_text_color, parse_color};
use crate::tui::widgets::truncate;

const SEPARATOR: &str = " • ";

/// What the one-line status bar shows, most urgent first
pub enum StatusLine<'a> {
    Message(&'a str),
    Error(&'a str),
    Hints(&'a [String]),
}

pub fn render_status_bar(f: &mut Frame, area: Rect, line: StatusLine<'_>, config: &Config) {
    let theme = config.get_active_theme();
    let fg_color = parse_color(&theme.fg);
    let bg_color = parse_color(&theme.bg);
    let highlight_bg = parse_color(&theme.highlight_bg);
    let width = area.width as usize;

    let (content, style) = match line {
        StatusLine::Message(msg) => (
            truncate(msg, width),
            Style::default()
                .fg(get_contrast_text_color(highlight_bg))
                .bg(highlight_bg)
                .add_modifier(Modifier::BOLD),
        ),
        StatusLine::Error(msg) => (
            truncate(&format!("{} (Esc to dismiss)", msg), width),
            Style::default()
                .fg(parse_color(&theme.error_fg))
                .bg(bg_color)
                .add_modifier(Modifier::BOLD),
        ),
        StatusLine::Hints(hints) => (fit_hints(hints, width), Style::default().fg(fg_color).bg(bg_color)),
    };

    f.render_widget(Paragraph::new(content).style(style), area);
}

/// Join as many hints as fit in `max_width`, ending with "..." when some were dropped
pub fn fit_hints(hints: &[String], max_width: usize) -> String {
    let mut text = String::new();
    for (i, hint) in hints.iter().enumerate() {
        let extra = if i == 0 { 0 } else { SEPARATOR.chars().count() };
        if text.chars().count() + extra + hint.chars().count() > max_width {
            if text.is_empty() {
                return truncate(hint, max_width);
            }
            if text.chars().count() + 3 > max_width {
                return truncate(&text, max_width);
            }
            text.push_str("...");
            return text;
        }
        if i > 0 {
            text.push_str(SEPARATOR);
        }
        text.push_str(hint);
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hints() -> Vec<String> {
        vec!["q: Quit".to_string(), "n: New".to_string(), "e: Edit".to_string()]
    }

    #[test]
    fn all_hints_fit() {
        assert_eq!(fit_hints(&hints(), 80), "q: Quit • n: New • e: Edit");
    }

    #[test]
    fn overflowing_hints_end_with_ellipsis() {
        assert_eq!(fit_hints(&hints(), 20), "q: Quit • n: New...");
    }

    #[test]
    fn single_long_hint_is_truncated() {
        assert_eq!(fit_hints(&hints(), 5), "q:...");
    }
}
