use std::io;
use std::time::Duration;

use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::execute;
use crossterm::terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode, size as terminal_size};
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use ratatui::layout::Rect;

use crate::tui::App;
use crate::tui::app::{FilterField, FormField, Mode, Tab};
use crate::tui::error::TuiError;
use crate::tui::layout::Layout;
use crate::utils::{ParsedKeyBinding, parse_key_binding};

/// Puts the terminal back (raw mode off, main screen) when dropped, including
/// during a panic unwind
struct TerminalGuard {
    raw_mode_enabled: bool,
    alternate_screen_enabled: bool,
}

impl TerminalGuard {
    fn new() -> Result<Self, TuiError> {
        enable_raw_mode()?;
        let mut guard = Self {
            raw_mode_enabled: true,
            alternate_screen_enabled: false,
        };
        execute!(io::stdout(), EnterAlternateScreen)?;
        guard.alternate_screen_enabled = true;
        Ok(guard)
    }

    /// Restore now and report errors; the drop afterwards does nothing
    fn restore(&mut self) -> Result<(), TuiError> {
        if self.raw_mode_enabled {
            disable_raw_mode()?;
            self.raw_mode_enabled = false;
        }
        if self.alternate_screen_enabled {
            execute!(io::stdout(), LeaveAlternateScreen)?;
            self.alternate_screen_enabled = false;
        }
        Ok(())
    }
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        // already unwinding or exiting; nothing useful to do with an error here
        if self.raw_mode_enabled {
            let _ = disable_raw_mode();
        }
        if self.alternate_screen_enabled {
            let _ = execute!(io::stdout(), LeaveAlternateScreen);
        }
    }
}

pub async fn run_event_loop(mut app: App) -> Result<(), TuiError> {
    let (width, height) = terminal_size()?;
    let min_width = Layout::MIN_WIDTH + 2;
    let min_height = Layout::MIN_HEIGHT + 2;
    if width < min_width || height < min_height {
        return Err(TuiError::RenderError(format!(
            "Terminal size too small. Current: {}x{}, Minimum required: {}x{}. Please resize your terminal window.",
            width, height, min_width, min_height
        )));
    }

    let mut guard = TerminalGuard::new()?;
    let backend = CrosstermBackend::new(io::stdout());
    let mut terminal = Terminal::new(backend)?;

    if !app.manager.api().is_logged_in() {
        app.set_status_message("Not logged in. Run `tdk login <username>` first.");
    }
    draw(&mut terminal, &mut app)?;
    app.reload().await;
    tracing::info!(tasks = app.manager.state().tasks.len(), "tui started");

    loop {
        app.check_status_message_timeout();
        draw(&mut terminal, &mut app)?;

        if event::poll(Duration::from_millis(16))? {
            match event::read()? {
                // Press only; Windows also reports releases
                Event::Key(key_event) if key_event.kind == KeyEventKind::Press => {
                    if handle_key_event(&mut app, key_event).await? {
                        break;
                    }
                }
                Event::Resize(_, _) => {
                    // picked up by the next draw
                }
                _ => {}
            }
        }
    }

    guard.restore()?;
    tracing::info!("tui stopped");
    Ok(())
}

fn draw(terminal: &mut Terminal<CrosstermBackend<io::Stdout>>, app: &mut App) -> Result<(), TuiError> {
    let size = terminal.size()?;
    let area = Rect::new(0, 0, size.width, size.height);
    terminal.draw(|f| {
        let layout = Layout::calculate(area, app.config.sidebar_width_percent);
        crate::tui::render::render(f, app, &layout);
    })?;
    Ok(())
}

fn binding(key_str: &str) -> Result<ParsedKeyBinding, TuiError> {
    parse_key_binding(key_str).map_err(TuiError::KeyBindingError)
}

fn matches_key_event(key_event: KeyEvent, key_str: &str) -> Result<bool, TuiError> {
    Ok(binding(key_str)?.matches(key_event.code, key_event.modifiers))
}

/// Returns `true` when the user asked to quit
pub async fn handle_key_event(app: &mut App, key_event: KeyEvent) -> Result<bool, TuiError> {
    if app.modals.delete_confirmation.is_some() {
        handle_delete_confirmation(app, key_event).await;
        return Ok(false);
    }
    if app.modals.prompt.is_some() {
        handle_prompt(app, key_event).await;
        return Ok(false);
    }

    match app.ui.mode {
        Mode::Help => handle_help_mode(app, key_event),
        Mode::Search => {
            handle_search_mode(app, key_event);
            Ok(false)
        }
        Mode::Form => handle_form_mode(app, key_event).await,
        Mode::Filter => {
            handle_filter_mode(app, key_event);
            Ok(false)
        }
        Mode::View => handle_global_key_bindings(app, key_event).await,
    }
}

async fn handle_delete_confirmation(app: &mut App, key_event: KeyEvent) {
    match key_event.code {
        KeyCode::Up | KeyCode::Char('k') => app.move_delete_selection(false),
        KeyCode::Down | KeyCode::Char('j') => app.move_delete_selection(true),
        KeyCode::Enter => app.confirm_delete().await,
        KeyCode::Esc => app.cancel_delete(),
        _ => {}
    }
}

async fn handle_prompt(app: &mut App, key_event: KeyEvent) {
    if key_event.code == KeyCode::Enter {
        app.submit_prompt().await;
        return;
    }
    if key_event.code == KeyCode::Esc {
        app.cancel_prompt();
        return;
    }
    if let Some(prompt) = app.modals.prompt.as_mut() {
        edit_text(&mut prompt.input, key_event);
    }
}

/// Shared single-line editing keys; `false` when the key was not an edit
fn edit_text(editor: &mut crate::tui::widgets::editor::Editor, key_event: KeyEvent) -> bool {
    match key_event.code {
        KeyCode::Char(c) if !key_event.modifiers.contains(KeyModifiers::CONTROL) => editor.insert_char(c),
        KeyCode::Backspace => editor.delete_char(),
        KeyCode::Delete => editor.delete_forward(),
        KeyCode::Left => editor.move_cursor_left(),
        KeyCode::Right => editor.move_cursor_right(),
        KeyCode::Home => editor.move_cursor_home(),
        KeyCode::End => editor.move_cursor_end(),
        _ => return false,
    }
    true
}

fn handle_help_mode(app: &mut App, key_event: KeyEvent) -> Result<bool, TuiError> {
    if key_event.code == KeyCode::Esc || matches_key_event(key_event, &app.config.key_bindings.help)? {
        app.exit_help_mode();
    }
    Ok(false)
}

fn handle_search_mode(app: &mut App, key_event: KeyEvent) {
    match key_event.code {
        KeyCode::Enter => app.exit_search_mode(true),
        KeyCode::Esc => app.exit_search_mode(false),
        _ => {
            if edit_text(&mut app.search.input, key_event) {
                app.update_search();
            }
        }
    }
}

async fn handle_form_mode(app: &mut App, key_event: KeyEvent) -> Result<bool, TuiError> {
    if matches_key_event(key_event, &app.config.key_bindings.save)? {
        app.save_form().await;
        return Ok(false);
    }

    let Some(current_field) = app.form.task_form.as_ref().map(|f| f.current_field) else {
        app.cancel_form();
        return Ok(false);
    };

    match key_event.code {
        KeyCode::Esc => app.cancel_form(),
        KeyCode::Tab | KeyCode::Enter | KeyCode::Down => app.navigate_form_field(true),
        KeyCode::BackTab | KeyCode::Up => app.navigate_form_field(false),
        KeyCode::Left if current_field == FormField::Category => app.cycle_form_category(false),
        KeyCode::Right if current_field == FormField::Category => app.cycle_form_category(true),
        KeyCode::Char(' ') if current_field == FormField::Completed => {
            if let Some(form) = app.form.task_form.as_mut() {
                form.completed = !form.completed;
            }
        }
        _ => {
            if let Some(editor) = app.form.task_form.as_mut().and_then(|f| f.current_editor_mut()) {
                edit_text(editor, key_event);
            }
        }
    }
    Ok(false)
}

fn handle_filter_mode(app: &mut App, key_event: KeyEvent) {
    let field = app.filter.form_state.as_ref().map(|s| s.current_field);
    let on_list = matches!(field, Some(FilterField::Categories | FilterField::Tags));
    match key_event.code {
        KeyCode::Esc => app.exit_filter_mode(),
        KeyCode::Enter => app.apply_filters(),
        KeyCode::Tab => app.navigate_filter_field(true),
        KeyCode::BackTab => app.navigate_filter_field(false),
        KeyCode::Left if !on_list => app.cycle_filter_value(false),
        KeyCode::Right if !on_list => app.cycle_filter_value(true),
        KeyCode::Up | KeyCode::Char('k') => app.move_filter_cursor(false),
        KeyCode::Down | KeyCode::Char('j') => app.move_filter_cursor(true),
        KeyCode::Char(' ') => app.toggle_filter_item(),
        KeyCode::Char('c') => app.clear_filter_form(),
        _ => {}
    }
}

async fn handle_global_key_bindings(app: &mut App, key_event: KeyEvent) -> Result<bool, TuiError> {
    let kb = app.config.key_bindings.clone();

    if matches_key_event(key_event, &kb.quit)? {
        return Ok(true);
    }
    if key_event.code == KeyCode::Esc {
        app.dismiss_error();
        return Ok(false);
    }
    if matches_key_event(key_event, &kb.help)? {
        app.enter_help_mode();
        return Ok(false);
    }
    if matches_key_event(key_event, &kb.tab_left)? {
        app.switch_tab(app.ui.current_tab.left());
        return Ok(false);
    }
    if matches_key_event(key_event, &kb.tab_right)? {
        app.switch_tab(app.ui.current_tab.right());
        return Ok(false);
    }
    if key_event.code == KeyCode::Up || matches_key_event(key_event, &kb.list_up)? {
        app.move_selection_up();
        return Ok(false);
    }
    if key_event.code == KeyCode::Down || matches_key_event(key_event, &kb.list_down)? {
        app.move_selection_down();
        return Ok(false);
    }
    match key_event.code {
        KeyCode::PageUp => {
            app.scroll_detail_up();
            return Ok(false);
        }
        KeyCode::PageDown => {
            app.scroll_detail_down();
            return Ok(false);
        }
        _ => {}
    }
    if matches_key_event(key_event, &kb.reload)? {
        app.reload().await;
        return Ok(false);
    }
    if matches_key_event(key_event, &kb.delete)? {
        app.request_delete();
        return Ok(false);
    }

    if app.ui.current_tab != Tab::Tasks {
        if matches_key_event(key_event, &kb.new)? {
            app.open_prompt(false);
        } else if matches_key_event(key_event, &kb.edit)? {
            app.open_prompt(true);
        }
        return Ok(false);
    }

    if matches_key_event(key_event, &kb.new)? {
        app.open_new_task_form(false);
    } else if matches_key_event(key_event, &kb.new_subtask)? {
        app.open_new_task_form(true);
    } else if matches_key_event(key_event, &kb.edit)? {
        app.open_edit_form();
    } else if matches_key_event(key_event, &kb.toggle_complete)? {
        app.toggle_selected().await;
    } else if matches_key_event(key_event, &kb.expand)? {
        app.toggle_expanded();
    } else if matches_key_event(key_event, &kb.search)? {
        app.enter_search_mode();
    } else if matches_key_event(key_event, &kb.filter)? {
        app.enter_filter_mode();
    } else if matches_key_event(key_event, &kb.sort)? {
        app.cycle_sort().await;
    } else if matches_key_event(key_event, &kb.sort_order)? {
        app.toggle_sort_order().await;
    }
    Ok(false)
}
