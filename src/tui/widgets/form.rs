use ratatui::Frame;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Modifier, Style};
use ratatui::text::Line;
use ratatui::widgets::{Block, Borders, Paragraph};

use crate::Config;
use crate::store::{OrganizerState, TaskState};
use crate::tui::app::{FormField, TaskForm};
use crate::tui::widgets::color::{get_contrast_text_color, parse_color};
use crate::tui::widgets::editor::Editor;
use crate::tui::widgets::truncate;

/// Form title: create, create under a parent, or edit
pub fn form_title(form: &TaskForm, tasks: &TaskState) -> String {
    match (form.editing, form.parent_task) {
        (Some(_), _) => "Edit task".to_string(),
        (None, Some(parent)) => {
            let name = tasks
                .task(parent)
                .map(|p| p.title.clone())
                .unwrap_or_else(|| format!("#{}", parent));
            format!("New sub-task of \"{}\"", name)
        }
        (None, None) => "New task".to_string(),
    }
}

fn field_value(form: &TaskForm, field: FormField, organizers: &OrganizerState) -> Option<String> {
    match field {
        FormField::Category => Some(
            form.category
                .map(|id| {
                    organizers
                        .category(id)
                        .map(|c| c.name.clone())
                        .unwrap_or_else(|| format!("#{}", id))
                })
                .unwrap_or_else(|| "(none)".to_string()),
        ),
        FormField::Completed => Some(if form.completed { "[x] yes" } else { "[ ] no" }.to_string()),
        _ => None,
    }
}

fn field_editor(form: &TaskForm, field: FormField) -> Option<&Editor> {
    match field {
        FormField::Title => Some(&form.title),
        FormField::Description => Some(&form.description),
        FormField::DueDate => Some(&form.due_date),
        FormField::Estimate => Some(&form.estimate),
        FormField::Tags => Some(&form.tags),
        FormField::Category | FormField::Completed => None,
    }
}

pub fn render_task_form(
    f: &mut Frame,
    area: Rect,
    form: &TaskForm,
    tasks: &TaskState,
    organizers: &OrganizerState,
    config: &Config,
) {
    let theme = config.get_active_theme();
    let fg_color = parse_color(&theme.fg);
    let bg_color = parse_color(&theme.bg);
    let highlight_bg = parse_color(&theme.highlight_bg);
    let highlight_fg = get_contrast_text_color(highlight_bg);

    let block = Block::default()
        .borders(Borders::ALL)
        .title(form_title(form, tasks))
        .style(Style::default().fg(fg_color).bg(bg_color));
    let inner = block.inner(area);
    f.render_widget(block, area);

    let mut constraints: Vec<Constraint> = FormField::ALL.iter().map(|_| Constraint::Length(2)).collect();
    constraints.push(Constraint::Min(0));
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints(constraints)
        .split(inner);

    let width = inner.width.saturating_sub(2) as usize;
    for (field, row) in FormField::ALL.iter().zip(rows.iter()) {
        let active = *field == form.current_field;
        let label_style = if active {
            Style::default().fg(highlight_fg).bg(highlight_bg).add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(fg_color).add_modifier(Modifier::BOLD)
        };
        let prefix = if active { "> " } else { "  " };

        let (value, cursor) = match field_editor(form, *field) {
            Some(editor) => {
                let (text, col) = editor.visible(width);
                (text, Some(col))
            }
            None => (truncate(&field_value(form, *field, organizers).unwrap_or_default(), width), None),
        };

        let lines = vec![
            Line::styled(format!("{}{}", prefix, field.label()), label_style),
            Line::from(format!("  {}", value)),
        ];
        f.render_widget(Paragraph::new(lines), *row);

        if let (true, Some(col)) = (active, cursor) {
            let x = row.x + 2 + col as u16;
            let y = row.y + 1;
            if x < row.x + row.width && y < row.y + row.height {
                f.set_cursor_position((x, y));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn title_reflects_form_purpose() {
        let tasks = TaskState::init();
        assert_eq!(form_title(&TaskForm::new(None), &tasks), "New task");
        assert_eq!(form_title(&TaskForm::new(Some(3)), &tasks), "New sub-task of \"#3\"");

        let mut editing = TaskForm::new(None);
        editing.editing = Some(1);
        assert_eq!(form_title(&editing, &tasks), "Edit task");
    }

    #[test]
    fn choice_fields_render_their_values() {
        let mut form = TaskForm::new(None);
        let organizers = OrganizerState::default();
        assert_eq!(field_value(&form, FormField::Category, &organizers).as_deref(), Some("(none)"));
        form.completed = true;
        assert_eq!(field_value(&form, FormField::Completed, &organizers).as_deref(), Some("[x] yes"));
        assert!(field_value(&form, FormField::Title, &organizers).is_none());
    }
}
