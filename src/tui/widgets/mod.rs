pub mod color;
pub mod confirm_delete;
pub mod editor;
pub mod filter_modal;
pub mod filters_box;
pub mod form;
pub mod help;
pub mod item_view;
pub mod organizer_list;
pub mod prompt;
pub mod status_bar;
pub mod tabs;
pub mod task_list;

use ratatui::layout::{Constraint, Flex, Layout, Rect};

/// Centered rect taking a percentage of `area`, for modal overlays
pub fn popup_area(area: Rect, percent_x: u16, percent_y: u16) -> Rect {
    let vertical = Layout::vertical([Constraint::Percentage(percent_y)]).flex(Flex::Center);
    let horizontal = Layout::horizontal([Constraint::Percentage(percent_x)]).flex(Flex::Center);
    let [area] = vertical.areas(area);
    let [area] = horizontal.areas(area);
    area
}

/// Cut `text` to `max` characters, marking the cut with "..."
pub fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let mut cut: String = text.chars().take(max.saturating_sub(3)).collect();
    cut.push_str("...");
    cut
}
