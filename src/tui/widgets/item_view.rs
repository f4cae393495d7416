use std::cmp;

use ratatui::Frame;
use ratatui::layout::{Constraint, Direction, Layout as RatLayout, Rect};
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span, Text};
use ratatui::widgets::{Block, Borders, Paragraph, Scrollbar, ScrollbarOrientation, ScrollbarState, Wrap};

use crate::Config;
use crate::models::{Category, Tag, Task};
use crate::store::{OrganizerState, TaskState};
use crate::tui::widgets::color::parse_color;
use crate::tui::widgets::organizer_list::{category_usage, tag_usage};
use crate::utils;
use crate::view::format_duration;

/// What the detail pane is showing
pub enum Detail<'a> {
    Task(&'a Task),
    Category(&'a Category),
    Tag(&'a Tag),
    Empty(&'static str),
}

/// Label/value pairs for a task; labels are bolded when rendered
pub fn task_fields(task: &Task, tasks: &TaskState, organizers: &OrganizerState) -> Vec<(&'static str, String)> {
    let mut fields = vec![("Title", task.title.clone())];
    let status = match task.completed_at {
        Some(at) if task.completed => format!("Complete ({})", utils::format_due(&at)),
        _ if task.completed => "Complete".to_string(),
        _ => "Incomplete".to_string(),
    };
    fields.push(("Status", status));

    if let Some(due) = task.due_date.as_ref() {
        fields.push(("Due", utils::format_due(due)));
    }
    if let Some(estimate) = task.estimated_time {
        fields.push(("Estimate", format_duration(estimate)));
    }

    let category = task
        .category
        .and_then(|id| organizers.category(id).map(|c| c.name.clone()))
        .or_else(|| task.category_name.clone());
    if let Some(name) = category {
        fields.push(("Category", name));
    }

    let mut tags = organizers.tag_names(&task.tags);
    if tags.len() != task.tags.len() {
        tags = task.tag_names.clone();
    }
    if !tags.is_empty() {
        fields.push(("Tags", tags.join(", ")));
    }

    if let Some(parent) = task.parent_task {
        let title = tasks
            .task(parent)
            .map(|p| p.title.clone())
            .unwrap_or_else(|| format!("#{}", parent));
        fields.push(("Sub-task of", title));
    }
    if task.has_subtasks {
        let children = tasks.subtasks_of(task.id);
        let done = children.iter().filter(|c| c.completed).count();
        fields.push(("Sub-tasks", format!("{} of {} done", done, children.len())));
    }
    if let Some(created) = task.created_at.as_ref() {
        fields.push(("Created", utils::format_due(created)));
    }
    fields
}

fn field_line(label: &str, value: String, label_style: Style) -> Line<'static> {
    Line::from(vec![
        Span::styled(format!("{}: ", label), label_style),
        Span::raw(value),
    ])
}

fn detail_text(detail: &Detail<'_>, tasks: &TaskState, organizers: &OrganizerState) -> Text<'static> {
    let bold = Style::default().add_modifier(Modifier::BOLD);
    let mut lines: Vec<Line> = Vec::new();
    match detail {
        Detail::Task(task) => {
            for (label, value) in task_fields(task, tasks, organizers) {
                lines.push(field_line(label, value, bold));
            }
            if let Some(description) = task.description.as_deref().filter(|d| !d.trim().is_empty()) {
                lines.push(Line::default());
                lines.push(Line::from(Span::styled("Description", bold)));
                lines.extend(description.lines().map(|l| Line::from(l.to_string())));
            }
            if task.has_subtasks {
                lines.push(Line::default());
                for child in tasks.subtasks_of(task.id) {
                    let check = if child.completed { "[x]" } else { "[ ]" };
                    lines.push(Line::from(format!("  {} {}", check, child.title)));
                }
            }
        }
        Detail::Category(category) => {
            lines.push(field_line("Name", category.name.clone(), bold));
            if let Some(description) = category.description.as_deref() {
                lines.push(field_line("Description", description.to_string(), bold));
            }
            let workload = if category.as_workload { "yes" } else { "no" };
            lines.push(field_line("Counts as workload", workload.to_string(), bold));
            lines.push(field_line("Tasks", category_usage(tasks, category.id).to_string(), bold));
        }
        Detail::Tag(tag) => {
            lines.push(field_line("Name", tag.name.clone(), bold));
            lines.push(field_line("Tasks", tag_usage(tasks, tag.id).to_string(), bold));
        }
        Detail::Empty(message) => lines.push(Line::from(*message)),
    }
    Text::from(lines)
}

pub fn render_item_view(
    f: &mut Frame,
    area: Rect,
    detail: Detail<'_>,
    tasks: &TaskState,
    organizers: &OrganizerState,
    config: &Config,
    scroll_offset: usize,
) {
    if area.width < 2 || area.height < 2 {
        return;
    }

    let horizontal = RatLayout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Min(1), Constraint::Length(1)])
        .split(area);
    let content_area = horizontal[0];
    let scrollbar_area = horizontal[1];

    let title = match detail {
        Detail::Task(task) if task.is_subtask() => "Sub-task",
        Detail::Task(_) => "Task",
        Detail::Category(_) => "Category",
        Detail::Tag(_) => "Tag",
        Detail::Empty(_) => "Details",
    };

    let text = detail_text(&detail, tasks, organizers);
    let viewport_height = area.height.saturating_sub(2) as usize;
    let total_lines = text.lines.len();
    let scroll_offset = cmp::min(scroll_offset, total_lines.saturating_sub(viewport_height));
    let end = cmp::min(scroll_offset + viewport_height, total_lines);
    let visible = Text::from(text.lines[scroll_offset..end].to_vec());

    let paragraph = Paragraph::new(visible)
        .block(Block::default().borders(Borders::ALL).title(title))
        .style(Style::default().fg(parse_color(&config.get_active_theme().fg)))
        .wrap(Wrap { trim: false });
    f.render_widget(paragraph, content_area);

    if total_lines > viewport_height {
        let inner = Rect::new(
            scrollbar_area.x,
            content_area.y + 1,
            scrollbar_area.width,
            content_area.height.saturating_sub(2),
        );
        let mut scrollbar_state = ScrollbarState::new(total_lines)
            .viewport_content_length(viewport_height)
            .position(scroll_offset);
        let scrollbar = Scrollbar::default()
            .orientation(ScrollbarOrientation::VerticalRight)
            .begin_symbol(Some("↑"))
            .end_symbol(Some("↓"))
            .track_symbol(Some("│"))
            .thumb_symbol("█");
        f.render_stateful_widget(scrollbar, inner, &mut scrollbar_state);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{OrganizerAction, OrganizerStore};
    use chrono::TimeDelta;

    #[test]
    fn task_fields_use_organizer_names() {
        let mut organizers = OrganizerStore::new();
        organizers.dispatch(OrganizerAction::SetTags(vec![Tag {
            id: 4,
            name: "home".into(),
        }]));
        organizers.dispatch(OrganizerAction::SetCategories(vec![Category {
            id: 2,
            name: "Chores".into(),
            description: None,
            as_workload: true,
        }]));

        let mut task = Task::new(1, "Mow lawn");
        task.category = Some(2);
        task.tags = vec![4];
        task.estimated_time = Some(TimeDelta::minutes(90));

        let fields = task_fields(&task, &TaskState::init(), organizers.state());
        assert_eq!(
            fields,
            vec![
                ("Title", "Mow lawn".to_string()),
                ("Status", "Incomplete".to_string()),
                ("Estimate", "1hr 30min".to_string()),
                ("Category", "Chores".to_string()),
                ("Tags", "home".to_string()),
            ]
        );
    }

    #[test]
    fn unknown_tags_fall_back_to_server_names() {
        let mut task = Task::new(1, "Mow lawn");
        task.tags = vec![4];
        task.tag_names = vec!["garden".into()];
        task.category = Some(9);
        task.category_name = Some("Outside".into());

        let fields = task_fields(&task, &TaskState::init(), &OrganizerState::default());
        assert!(fields.contains(&("Tags", "garden".to_string())));
        assert!(fields.contains(&("Category", "Outside".to_string())));
    }
}
