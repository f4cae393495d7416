use ratatui::Frame;
use ratatui::layout::Rect;
use ratatui::style::Style;
use ratatui::widgets::{Block, Borders, Paragraph, Wrap};

use crate::Config;
use crate::tui::widgets::color::parse_color;
use crate::utils::format_key_binding_for_display;

/// One-line summary of the active filters and the server sort order
pub fn render_filters_box(f: &mut Frame, area: Rect, summary: &str, sort_label: &str, config: &Config) {
    let theme = config.get_active_theme();
    let fg_color = parse_color(&theme.fg);
    let bg_color = parse_color(&theme.bg);

    let title = format!(
        "{}: Filters | {}: Sort",
        format_key_binding_for_display(&config.key_bindings.filter),
        format_key_binding_for_display(&config.key_bindings.sort),
    );
    let text = format!("{}  [Sort: {}]", summary, sort_label);

    let paragraph = Paragraph::new(text)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(title)
                .style(Style::default().fg(fg_color).bg(bg_color)),
        )
        .style(Style::default().fg(fg_color))
        .wrap(Wrap { trim: true });

    f.render_widget(paragraph, area);
}
