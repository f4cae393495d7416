use ratatui::layout::{Constraint, Direction, Layout as RatLayout, Rect};

/// Screen regions inside the outer border
pub struct Layout {
    pub inner_area: Rect,
    pub tabs_area: Rect,
    /// Task, category or tag list
    pub list_area: Rect,
    /// Details of the selected row, or the task form
    pub detail_area: Rect,
    pub filters_area: Rect,
    pub status_area: Rect,
}

impl Layout {
    /// Smallest usable terminal, borders excluded: a 25 column list plus a
    /// narrow detail pane, and tabs, one content line, filters and status
    pub const MIN_WIDTH: u16 = 38;
    pub const MIN_HEIGHT: u16 = 10;

    /// Lists get `list_width_percent` of the width, clamped to at least 25
    /// columns and at most 60%; the detail pane always keeps 10 columns
    pub fn calculate(size: Rect, list_width_percent: u16) -> Self {
        let width = size.width.max(Self::MIN_WIDTH + 2);
        let height = size.height.max(Self::MIN_HEIGHT + 2);
        let size = Rect::new(size.x, size.y, width, height);

        let inner_area = Rect::new(
            size.x + 1,
            size.y + 1,
            size.width.saturating_sub(2),
            size.height.saturating_sub(2),
        );

        let requested = (inner_area.width * list_width_percent) / 100;
        let max_width = (inner_area.width * 60) / 100;
        let list_width = requested
            .max(25)
            .min(max_width.max(25))
            .min(inner_area.width.saturating_sub(10));

        let vertical = RatLayout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(1), // Tabs
                Constraint::Min(1),    // List + detail
                Constraint::Length(3), // Filters summary
                Constraint::Length(1), // Status
            ])
            .split(inner_area);

        let horizontal = RatLayout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Length(list_width), Constraint::Min(1)])
            .split(vertical[1]);

        Self {
            inner_area,
            tabs_area: vertical[0],
            list_area: horizontal[0],
            detail_area: horizontal[1],
            filters_area: vertical[2],
            status_area: vertical[3],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_content_between_list_and_detail() {
        let layout = Layout::calculate(Rect::new(0, 0, 102, 40), 40);
        assert_eq!(layout.inner_area.width, 100);
        assert_eq!(layout.list_area.width, 40);
        assert_eq!(layout.detail_area.width, 60);
        assert_eq!(layout.tabs_area.height, 1);
        assert_eq!(layout.filters_area.height, 3);
        assert_eq!(layout.status_area.height, 1);
    }

    #[test]
    fn list_width_is_clamped() {
        let narrow = Layout::calculate(Rect::new(0, 0, 102, 40), 5);
        assert_eq!(narrow.list_area.width, 25);
        let wide = Layout::calculate(Rect::new(0, 0, 102, 40), 95);
        assert_eq!(wide.list_area.width, 60);
    }

    #[test]
    fn tiny_terminals_use_the_minimum_size() {
        let layout = Layout::calculate(Rect::new(0, 0, 10, 5), 40);
        assert_eq!(layout.inner_area.width, Layout::MIN_WIDTH);
        assert_eq!(layout.inner_area.height, Layout::MIN_HEIGHT);
        assert!(layout.detail_area.width >= 10);
    }
}
