use ratatui::Frame;
use ratatui::layout::{Alignment, Rect};
use ratatui::style::Style;
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Clear, Paragraph, Wrap};

use crate::Config;
use crate::tui::app::DeleteTarget;
use crate::tui::widgets::color::{get_contrast_text_color, parse_color};
use crate::tui::widgets::popup_area;

pub fn render_confirm_delete(f: &mut Frame, area: Rect, target: &DeleteTarget, selection: usize, config: &Config) {
    let theme = config.get_active_theme();
    let fg_color = parse_color(&theme.fg);
    let bg_color = parse_color(&theme.bg);
    let highlight_bg = parse_color(&theme.highlight_bg);
    let highlight_fg = get_contrast_text_color(highlight_bg);
    let normal = Style::default().fg(fg_color).bg(bg_color);

    let popup = popup_area(area, 50, 35);
    f.render_widget(Clear, popup);

    let (kind, name) = target.describe();
    let mut lines = vec![
        Line::from(Span::styled(format!("Delete this {}?", kind), normal)),
        Line::default(),
        Line::from(Span::styled(name.to_string(), normal)),
        Line::default(),
    ];
    if matches!(target, DeleteTarget::Task { has_subtasks: true, .. }) {
        lines.push(Line::from(Span::styled("It has sub-tasks. Keep them as top-level tasks?", normal)));
        lines.push(Line::default());
    }

    for (index, choice) in target.choices().iter().enumerate() {
        let selected = index == selection;
        let prefix = if selected { "> " } else { "  " };
        let style = if selected {
            Style::default().fg(highlight_fg).bg(highlight_bg)
        } else {
            normal
        };
        lines.push(Line::from(Span::styled(format!("{}{}", prefix, choice.label()), style)));
    }

    lines.push(Line::default());
    lines.push(Line::from(Span::styled("↑↓: Choose • Enter: Confirm • Esc: Cancel", normal)));

    let paragraph = Paragraph::new(lines)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title("Confirm Delete")
                .title_alignment(Alignment::Center)
                .style(normal),
        )
        .style(normal)
        .wrap(Wrap { trim: true })
        .alignment(Alignment::Center);

    f.render_widget(paragraph, popup);
}
