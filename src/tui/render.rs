use ratatui::Frame;
use ratatui::layout::Alignment;
use ratatui::style::Style;
use ratatui::widgets::{Block, Borders};

use crate::tui::app::{Mode, Tab};
use crate::tui::widgets::{
    color::parse_color,
    confirm_delete::render_confirm_delete,
    filter_modal::render_filter_modal,
    filters_box::render_filters_box,
    form::render_task_form,
    help::render_help,
    item_view::{Detail, render_item_view},
    organizer_list::render_organizer_list,
    prompt::render_prompt,
    status_bar::{StatusLine, render_status_bar},
    tabs::render_tabs,
    task_list::render_task_list,
};
use crate::tui::{App, Layout};
use crate::utils::format_key_binding_for_display as key;

pub fn render(f: &mut Frame, app: &mut App, layout: &Layout) {
    let theme = app.config.get_active_theme();
    let outer_block = Block::default()
        .borders(Borders::ALL)
        .title("taskdeck")
        .title_alignment(Alignment::Center)
        .style(Style::default().fg(parse_color(&theme.fg)).bg(parse_color(&theme.bg)));
    f.render_widget(outer_block, f.area());

    let rows = app.task_rows();
    let counts = [
        rows.iter().filter(|r| r.depth == 0).count(),
        app.manager.organizers().categories.len(),
        app.manager.organizers().tags.len(),
    ];
    render_tabs(f, layout.tabs_area, app.ui.current_tab, counts, &app.config);

    match app.ui.current_tab {
        Tab::Tasks => render_task_list(
            f,
            layout.list_area,
            app.manager.state(),
            &rows,
            &app.ui.expanded,
            &mut app.ui.list_state,
            &app.config,
        ),
        tab => render_organizer_list(
            f,
            layout.list_area,
            tab,
            app.manager.organizers(),
            app.manager.state(),
            &mut app.ui.list_state,
            &app.config,
        ),
    }

    match (&app.ui.mode, &app.form.task_form) {
        (Mode::Form, Some(form)) => render_task_form(
            f,
            layout.detail_area,
            form,
            app.manager.state(),
            app.manager.organizers(),
            &app.config,
        ),
        _ => {
            let detail = if let Some(task) = app.selected_task() {
                Detail::Task(task)
            } else if let Some(category) = app.selected_category() {
                Detail::Category(category)
            } else if let Some(tag) = app.selected_tag() {
                Detail::Tag(tag)
            } else {
                Detail::Empty(empty_message(app))
            };
            render_item_view(
                f,
                layout.detail_area,
                detail,
                app.manager.state(),
                app.manager.organizers(),
                &app.config,
                app.ui.detail_scroll,
            );
        }
    }

    let mut summary = app.filter_summary();
    if app.ui.mode == Mode::Search {
        summary = format!("Search: {}▏", app.search.input.text());
    }
    render_filters_box(f, layout.filters_area, &summary, &app.sort_label(), &app.config);

    let hints = key_hints(app);
    let status = match (app.status.message.as_deref(), app.error_message()) {
        (Some(message), _) => StatusLine::Message(message),
        (None, Some(error)) => StatusLine::Error(error),
        (None, None) => StatusLine::Hints(&hints),
    };
    render_status_bar(f, layout.status_area, status, &app.config);

    match app.ui.mode {
        Mode::Help => render_help(f, f.area(), &app.config),
        Mode::Filter => {
            if let Some(state) = app.filter.form_state.as_ref() {
                render_filter_modal(f, f.area(), state, app.manager.organizers(), &app.config);
            }
        }
        _ => {}
    }

    if let Some(prompt) = app.modals.prompt.as_ref() {
        render_prompt(f, f.area(), prompt, &app.config);
    }
    if let Some(target) = app.modals.delete_confirmation.as_ref() {
        render_confirm_delete(f, f.area(), target, app.modals.delete_modal_selection, &app.config);
    }
}

fn empty_message(app: &App) -> &'static str {
    match app.ui.current_tab {
        _ if app.is_loading() => "Loading...",
        Tab::Tasks if app.filter.active.is_active() => "No tasks match the current filters",
        Tab::Tasks => "No tasks yet",
        Tab::Categories => "No categories yet",
        Tab::Tags => "No tags yet",
    }
}

fn key_hints(app: &App) -> Vec<String> {
    let kb = &app.config.key_bindings;
    match app.ui.mode {
        Mode::Help => vec![format!("Esc or {}: Close help", key(&kb.help))],
        Mode::Search => vec!["Enter: Keep search".to_string(), "Esc: Clear search".to_string()],
        Mode::Filter => vec![
            "Tab: Next field".to_string(),
            "Enter: Apply".to_string(),
            "Esc: Cancel".to_string(),
        ],
        Mode::Form => vec![
            "Tab/Enter: Next field".to_string(),
            "Shift+Tab: Previous field".to_string(),
            format!("{}: Save", key(&kb.save)),
            "Esc: Cancel".to_string(),
        ],
        Mode::View => {
            let mut hints = vec![format!("{}: Quit", key(&kb.quit)), format!("{}: New", key(&kb.new))];
            if app.ui.current_tab == Tab::Tasks {
                hints.push(format!("{}: Sub-task", key(&kb.new_subtask)));
                hints.push(format!("{}: Edit", key(&kb.edit)));
                hints.push(format!("{}: Delete", key(&kb.delete)));
                hints.push(format!("{}: Done", key(&kb.toggle_complete)));
                hints.push(format!("{}: Expand", key(&kb.expand)));
                hints.push(format!("{}: Search", key(&kb.search)));
                hints.push(format!("{}: Filters", key(&kb.filter)));
                hints.push(format!("{}/{}: Sort", key(&kb.sort), key(&kb.sort_order)));
            } else {
                hints.push(format!("{}: Rename", key(&kb.edit)));
                hints.push(format!("{}: Delete", key(&kb.delete)));
            }
            hints.push(format!("{}: Reload", key(&kb.reload)));
            hints.push(format!("{}: Help", key(&kb.help)));
            hints
        }
    }
}
