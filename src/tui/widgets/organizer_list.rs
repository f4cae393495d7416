use ratatui::Frame;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::Style;
use ratatui::widgets::{Block, Borders, List, ListItem, ListState, StatefulWidget};

use crate::Config;
use crate::models::{CategoryId, TagId};
use crate::store::{OrganizerState, TaskState};
use crate::tui::app::Tab;
use crate::tui::widgets::color::{get_contrast_text_color, parse_color};
use crate::tui::widgets::task_list::render_list_scrollbar;
use crate::tui::widgets::truncate;

/// Tasks (parents and sub-tasks) filed under a category
pub fn category_usage(tasks: &TaskState, category: CategoryId) -> usize {
    tasks.tasks.values().filter(|t| t.category == Some(category)).count()
}

/// Tasks carrying a tag
pub fn tag_usage(tasks: &TaskState, tag: TagId) -> usize {
    tasks.tasks.values().filter(|t| t.tags.contains(&tag)).count()
}

/// Category or tag list, depending on `tab`
pub fn render_organizer_list(
    f: &mut Frame,
    area: Rect,
    tab: Tab,
    organizers: &OrganizerState,
    tasks: &TaskState,
    list_state: &mut ListState,
    config: &Config,
) {
    let max_width = area.width.saturating_sub(4) as usize;
    let theme = config.get_active_theme();
    let highlight_bg = parse_color(&theme.highlight_bg);
    let highlight_fg = if theme.highlight_fg.is_empty() {
        get_contrast_text_color(highlight_bg)
    } else {
        parse_color(&theme.highlight_fg)
    };

    let labels: Vec<String> = match tab {
        Tab::Categories => organizers
            .categories
            .iter()
            .map(|c| {
                let workload = if c.as_workload { "" } else { " (no workload)" };
                format!("{} [{}]{}", c.name, category_usage(tasks, c.id), workload)
            })
            .collect(),
        Tab::Tags => organizers
            .tags
            .iter()
            .map(|t| format!("#{} [{}]", t.name, tag_usage(tasks, t.id)))
            .collect(),
        Tab::Tasks => Vec::new(),
    };
    let total = labels.len();
    let items: Vec<ListItem> = labels.iter().map(|l| ListItem::new(truncate(l, max_width))).collect();

    let areas = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Min(1), Constraint::Length(1)])
        .split(area);

    let loading = if organizers.loading { " loading..." } else { "" };
    let title = format!("{} ({}){}", tab.title(), total, loading);
    let list = List::new(items)
        .block(Block::default().borders(Borders::ALL).title(title))
        .style(Style::default().fg(parse_color(&theme.fg)))
        .highlight_style(Style::default().fg(highlight_fg).bg(highlight_bg));

    StatefulWidget::render(list, areas[0], f.buffer_mut(), list_state);
    render_list_scrollbar(f, areas[0], areas[1], total, list_state.selected().unwrap_or(0));
}
