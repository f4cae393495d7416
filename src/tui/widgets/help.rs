use ratatui::Frame;
use ratatui::layout::{Alignment, Rect};
use ratatui::style::Style;
use ratatui::widgets::{Block, Borders, Clear, Paragraph, Wrap};

use crate::Config;
use crate::tui::widgets::color::parse_color;
use crate::tui::widgets::popup_area;
use crate::utils::format_key_binding_for_display as key;

pub fn render_help(f: &mut Frame, area: Rect, config: &Config) {
    let theme = config.get_active_theme();
    let fg_color = parse_color(&theme.fg);
    let bg_color = parse_color(&theme.bg);

    let popup = popup_area(area, 60, 80);
    f.render_widget(Clear, popup);

    let paragraph = Paragraph::new(build_help_text(config))
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title("Help - Key Bindings")
                .title_alignment(Alignment::Center)
                .style(Style::default().fg(fg_color).bg(bg_color)),
        )
        .style(Style::default().fg(fg_color).bg(bg_color))
        .wrap(Wrap { trim: false });

    f.render_widget(paragraph, popup);
}

pub fn build_help_text(config: &Config) -> String {
    let kb = &config.key_bindings;
    let mut text = String::new();

    text.push_str("Navigation:\n");
    text.push_str(&format!("  {} / {}: Switch tabs\n", key(&kb.tab_left), key(&kb.tab_right)));
    text.push_str(&format!("  {} / {} or ↑/↓: Move in list\n", key(&kb.list_up), key(&kb.list_down)));
    text.push_str(&format!("  {}: Expand/collapse sub-tasks\n", key(&kb.expand)));
    text.push_str("  PgUp/PgDn: Scroll details\n\n");

    text.push_str("Tasks:\n");
    text.push_str(&format!("  {}: New task\n", key(&kb.new)));
    text.push_str(&format!("  {}: New sub-task of selected\n", key(&kb.new_subtask)));
    text.push_str(&format!("  {}: Edit selected\n", key(&kb.edit)));
    text.push_str(&format!("  {}: Delete selected\n", key(&kb.delete)));
    text.push_str(&format!("  {}: Toggle complete\n", key(&kb.toggle_complete)));
    text.push_str(&format!("  {}: Quick search\n", key(&kb.search)));
    text.push_str(&format!("  {}: Filters\n", key(&kb.filter)));
    text.push_str(&format!("  {} / {}: Sort key / order\n", key(&kb.sort), key(&kb.sort_order)));
    text.push_str(&format!("  {}: Reload\n\n", key(&kb.reload)));

    text.push_str("Categories & Tags:\n");
    text.push_str(&format!("  {}: New\n", key(&kb.new)));
    text.push_str(&format!("  {}: Rename\n", key(&kb.edit)));
    text.push_str(&format!("  {}: Delete\n\n", key(&kb.delete)));

    text.push_str("Form:\n");
    text.push_str("  Tab/Enter, Shift+Tab: Next/previous field\n");
    text.push_str(&format!("  {}: Save\n", key(&kb.save)));
    text.push_str("  Esc: Cancel\n\n");

    text.push_str("General:\n");
    text.push_str("  Esc: Dismiss error\n");
    text.push_str(&format!("  {}: Show/hide help\n", key(&kb.help)));
    text.push_str(&format!("  {}: Quit\n", key(&kb.quit)));

    text
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn help_lists_configured_keys() {
        let mut config = Config::default();
        config.key_bindings.new_subtask = "Ctrl+a".to_string();
        let text = build_help_text(&config);
        assert!(text.contains("New sub-task of selected"));
        assert!(text.contains(&format!("{}: New sub-task", key("Ctrl+a"))));
    }
}
