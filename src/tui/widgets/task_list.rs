use std::collections::HashSet;

use ratatui::Frame;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Modifier, Style};
use ratatui::widgets::{
    Block, Borders, List, ListItem, ListState, Scrollbar, ScrollbarOrientation, ScrollbarState, StatefulWidget,
};

use crate::Config;
use crate::models::TaskId;
use crate::store::TaskState;
use crate::tui::app::TaskRow;
use crate::tui::widgets::color::{get_contrast_text_color, parse_color};
use crate::tui::widgets::truncate;
use crate::utils;
use crate::view::local_due_date;

/// List line for one row: expand marker, completion box, title, due date
pub fn row_label(state: &TaskState, row: TaskRow, expanded: bool, today: chrono::NaiveDate) -> String {
    let Some(task) = state.task(row.id) else {
        return String::new();
    };
    let marker = match (row.depth, task.has_subtasks, expanded) {
        (0, true, true) => "▾ ",
        (0, true, false) => "▸ ",
        (0, false, _) => "  ",
        _ => "    ",
    };
    let check = if task.completed { "[x]" } else { "[ ]" };
    let due = match (task.due_date.as_ref(), local_due_date(task)) {
        (Some(due), Some(day)) if !task.completed && day < today => format!(" (overdue {})", utils::format_due(due)),
        (Some(due), _) => format!(" ({})", utils::format_due(due)),
        _ => String::new(),
    };
    let count = if row.depth == 0 && task.has_subtasks {
        format!(" [{}]", task.sub_tasks.len())
    } else {
        String::new()
    };
    format!("{}{} {}{}{}", marker, check, task.title, count, due)
}

/// Counts shown in the list title: visible parents, all parents, open, done
pub fn list_title(state: &TaskState, visible_parents: usize) -> String {
    let data = &state.data;
    let loading = if state.loading { " loading..." } else { "" };
    format!(
        "Tasks {} of {} | {} open, {} done{}",
        visible_parents, data.parent_count, data.incomplete_count, data.complete_count, loading
    )
}

pub fn render_task_list(
    f: &mut Frame,
    area: Rect,
    state: &TaskState,
    rows: &[TaskRow],
    expanded: &HashSet<TaskId>,
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
    let muted = parse_color(&theme.muted_fg);
    let today = utils::today();

    let items: Vec<ListItem> = rows
        .iter()
        .map(|row| {
            let label = truncate(&row_label(state, *row, expanded.contains(&row.id), today), max_width);
            let done = state.task(row.id).is_some_and(|t| t.completed);
            let style = if done {
                Style::default().fg(muted).add_modifier(Modifier::CROSSED_OUT)
            } else {
                Style::default()
            };
            ListItem::new(label).style(style)
        })
        .collect();

    let list_areas = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Min(1), Constraint::Length(1)])
        .split(area);
    let list_area = list_areas[0];
    let scrollbar_area = list_areas[1];

    let visible_parents = rows.iter().filter(|r| r.depth == 0).count();
    let total_rows = items.len();
    let list = List::new(items)
        .block(Block::default().borders(Borders::ALL).title(list_title(state, visible_parents)))
        .style(Style::default().fg(parse_color(&theme.fg)))
        .highlight_style(Style::default().fg(highlight_fg).bg(highlight_bg));

    StatefulWidget::render(list, list_area, f.buffer_mut(), list_state);
    render_list_scrollbar(f, list_area, scrollbar_area, total_rows, list_state.selected().unwrap_or(0));
}

/// Scrollbar beside a bordered list when it has more rows than fit
pub fn render_list_scrollbar(f: &mut Frame, list_area: Rect, scrollbar_area: Rect, total: usize, selected: usize) {
    let visible = list_area.height.saturating_sub(2) as usize;
    if total <= visible || visible == 0 || scrollbar_area.width == 0 {
        return;
    }
    let inner = Rect::new(scrollbar_area.x, list_area.y + 1, scrollbar_area.width, visible as u16);
    let position = selected.saturating_sub(visible - 1);
    let mut scrollbar_state = ScrollbarState::new(total)
        .viewport_content_length(visible)
        .position(position);
    let scrollbar = Scrollbar::default()
        .orientation(ScrollbarOrientation::VerticalRight)
        .begin_symbol(Some("↑"))
        .end_symbol(Some("↓"))
        .track_symbol(Some("│"))
        .thumb_symbol("█");
    f.render_stateful_widget(scrollbar, inner, &mut scrollbar_state);
}
