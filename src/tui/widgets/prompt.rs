use ratatui::Frame;
use ratatui::layout::{Alignment, Rect};
use ratatui::style::Style;
use ratatui::text::Line;
use ratatui::widgets::{Block, Borders, Clear, Paragraph};

use crate::Config;
use crate::tui::app::PromptState;
use crate::tui::widgets::color::parse_color;
use crate::tui::widgets::popup_area;

/// Name input overlay for tags and categories
pub fn render_prompt(f: &mut Frame, area: Rect, prompt: &PromptState, config: &Config) {
    let theme = config.get_active_theme();
    let fg_color = parse_color(&theme.fg);
    let bg_color = parse_color(&theme.bg);

    let popup = popup_area(area, 50, 25);
    f.render_widget(Clear, popup);

    let block = Block::default()
        .borders(Borders::ALL)
        .title(prompt.target.title())
        .title_alignment(Alignment::Center)
        .style(Style::default().fg(fg_color).bg(bg_color));
    let inner = block.inner(popup);
    f.render_widget(block, popup);

    let width = inner.width.saturating_sub(2) as usize;
    let (text, col) = prompt.input.visible(width);
    let lines = vec![
        Line::from("Name:"),
        Line::from(format!("  {}", text)),
        Line::default(),
        Line::from("Enter: Save • Esc: Cancel"),
    ];
    f.render_widget(Paragraph::new(lines), inner);

    let x = inner.x + 2 + col as u16;
    let y = inner.y + 1;
    if x < inner.x + inner.width && y < inner.y + inner.height {
        f.set_cursor_position((x, y));
    }
}
