use std::collections::HashSet;
use std::time::Instant;

use ratatui::widgets::ListState;

use crate::draft::{self, DraftError, TaskDraft};
use crate::models::{Category, CategoryId, CategoryInput, Tag, TagId, Task, TaskId, TAGGED_ONLY, hms};
use crate::store::OrganizerState;
use crate::tui::widgets::editor::Editor;
use crate::utils;
use crate::view::{self, DueFilter, SortRequest, StatusFilter, TaskFilter};
use crate::{Config, TaskManager};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tab {
    Tasks,
    Categories,
    Tags,
}

impl Tab {
    pub const ALL: [Tab; 3] = [Tab::Tasks, Tab::Categories, Tab::Tags];

    pub fn title(&self) -> &'static str {
        match self {
            Tab::Tasks => "Tasks",
            Tab::Categories => "Categories",
            Tab::Tags => "Tags",
        }
    }

    pub fn index(&self) -> usize {
        match self {
            Tab::Tasks => 0,
            Tab::Categories => 1,
            Tab::Tags => 2,
        }
    }

    /// Tab to the left; the first tab stays put
    pub fn left(&self) -> Self {
        match self {
            Tab::Tasks | Tab::Categories => Tab::Tasks,
            Tab::Tags => Tab::Categories,
        }
    }

    /// Tab to the right; the last tab stays put
    pub fn right(&self) -> Self {
        match self {
            Tab::Tasks => Tab::Categories,
            Tab::Categories | Tab::Tags => Tab::Tags,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    View,
    Search,
    Help,
    Form,
    Filter,
}

/// One line of the task list: a visible parent or a child of an expanded one
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TaskRow {
    pub id: TaskId,
    pub depth: u16,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormField {
    Title,
    Description,
    DueDate,
    Estimate,
    Category,
    Tags,
    Completed,
}

impl FormField {
    pub const ALL: [FormField; 7] = [
        FormField::Title,
        FormField::Description,
        FormField::DueDate,
        FormField::Estimate,
        FormField::Category,
        FormField::Tags,
        FormField::Completed,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            FormField::Title => "Title",
            FormField::Description => "Description",
            FormField::DueDate => "Due date (YYYY-MM-DD)",
            FormField::Estimate => "Estimate (minutes, HH:MM or HH:MM:SS)",
            FormField::Category => "Category (←/→ to change)",
            FormField::Tags => "Tags (comma separated)",
            FormField::Completed => "Completed (Space to toggle)",
        }
    }

    fn position(&self) -> usize {
        Self::ALL.iter().position(|f| f == self).unwrap_or(0)
    }

    pub fn next(&self) -> Self {
        Self::ALL[(self.position() + 1) % Self::ALL.len()]
    }

    pub fn prev(&self) -> Self {
        Self::ALL[(self.position() + Self::ALL.len() - 1) % Self::ALL.len()]
    }
}

/// Editable copy of a task. Text fields stay raw until save so a half-typed
/// date is not an error while the user is still typing.
#[derive(Debug, Clone)]
pub struct TaskForm {
    pub current_field: FormField,
    pub title: Editor,
    pub description: Editor,
    pub due_date: Editor,
    pub estimate: Editor,
    pub tags: Editor,
    pub category: Option<CategoryId>,
    pub completed: bool,
    pub parent_task: Option<TaskId>,
    pub editing: Option<TaskId>,
}

impl TaskForm {
    pub fn new(parent: Option<TaskId>) -> Self {
        Self {
            current_field: FormField::Title,
            title: Editor::new(),
            description: Editor::new(),
            due_date: Editor::new(),
            estimate: Editor::new(),
            tags: Editor::new(),
            category: None,
            completed: false,
            parent_task: parent,
            editing: None,
        }
    }

    pub fn from_task(task: &Task, organizers: &OrganizerState) -> Self {
        let draft = TaskDraft::from_task(task);
        let mut tag_names = organizers.tag_names(&task.tags);
        if tag_names.len() != task.tags.len() {
            tag_names = task.tag_names.clone();
        }
        Self {
            current_field: FormField::Title,
            title: Editor::from_string(&draft.title),
            description: Editor::from_string(draft.description.unwrap_or_default()),
            due_date: Editor::from_string(
                draft.due_date.map(|d| d.format("%Y-%m-%d").to_string()).unwrap_or_default(),
            ),
            estimate: Editor::from_string(draft.estimated_time.map(hms::format).unwrap_or_default()),
            tags: Editor::from_string(tag_names.join(", ")),
            category: draft.category,
            completed: draft.completed,
            parent_task: draft.parent_task,
            editing: Some(task.id),
        }
    }

    pub fn current_editor_mut(&mut self) -> Option<&mut Editor> {
        match self.current_field {
            FormField::Title => Some(&mut self.title),
            FormField::Description => Some(&mut self.description),
            FormField::DueDate => Some(&mut self.due_date),
            FormField::Estimate => Some(&mut self.estimate),
            FormField::Tags => Some(&mut self.tags),
            FormField::Category | FormField::Completed => None,
        }
    }

    /// Step through "no category" and each category in list order
    pub fn cycle_category(&mut self, categories: &[Category], forward: bool) {
        if categories.is_empty() {
            self.category = None;
            return;
        }
        // slot 0 is "none", slot i is categories[i - 1]
        let slots = categories.len() + 1;
        let current = self
            .category
            .and_then(|id| categories.iter().position(|c| c.id == id))
            .map(|i| i + 1)
            .unwrap_or(0);
        let next = if forward {
            (current + 1) % slots
        } else {
            (current + slots - 1) % slots
        };
        self.category = if next == 0 { None } else { Some(categories[next - 1].id) };
    }

    /// Tag names typed into the form, trimmed and de-duplicated
    pub fn tag_names(&self) -> Vec<String> {
        let mut names: Vec<String> = Vec::new();
        for name in self.tags.text().split(',').map(str::trim).filter(|n| !n.is_empty()) {
            if !names.iter().any(|n| n.eq_ignore_ascii_case(name)) {
                names.push(name.to_string());
            }
        }
        names
    }

    /// Form contents as a draft; `tags` are the already resolved tag ids
    pub fn to_draft(&self, tags: Vec<TagId>) -> Result<TaskDraft, DraftError> {
        let description = self.description.text();
        let draft = TaskDraft {
            title: self.title.text(),
            description: (!description.trim().is_empty()).then_some(description),
            due_date: draft::parse_due(&self.due_date.text())?,
            completed: self.completed,
            category: self.category,
            tags,
            parent_task: self.parent_task,
            estimated_time: draft::parse_estimate(&self.estimate.text())?,
        };
        draft.validate()?;
        Ok(draft)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterField {
    Status,
    Due,
    Categories,
    Tags,
}

impl FilterField {
    pub fn next(&self) -> Self {
        match self {
            FilterField::Status => FilterField::Due,
            FilterField::Due => FilterField::Categories,
            FilterField::Categories => FilterField::Tags,
            FilterField::Tags => FilterField::Status,
        }
    }

    pub fn prev(&self) -> Self {
        match self {
            FilterField::Status => FilterField::Tags,
            FilterField::Due => FilterField::Status,
            FilterField::Categories => FilterField::Due,
            FilterField::Tags => FilterField::Categories,
        }
    }
}

/// Working copy of the filters while the modal is open
#[derive(Debug, Clone)]
pub struct FilterFormState {
    pub current_field: FilterField,
    pub filter: TaskFilter,
    pub category_cursor: usize,
    /// 0 is the "tagged only" row, i is tags[i - 1]
    pub tag_cursor: usize,
}

impl FilterFormState {
    fn new(filter: &TaskFilter) -> Self {
        Self {
            current_field: FilterField::Status,
            filter: filter.clone(),
            category_cursor: 0,
            tag_cursor: 0,
        }
    }

    fn cycle_status(&mut self, forward: bool) {
        self.filter.status = cycle(&StatusFilter::ALL, self.filter.status, forward);
    }

    fn cycle_due(&mut self, forward: bool) {
        self.filter.due = cycle(&DueFilter::ALL, self.filter.due, forward);
    }
}

fn cycle<T: Copy + PartialEq>(options: &[T], current: T, forward: bool) -> T {
    let len = options.len();
    let index = options.iter().position(|o| *o == current).unwrap_or(0);
    let next = if forward { (index + 1) % len } else { (index + len - 1) % len };
    options[next]
}

#[derive(Debug, Clone, PartialEq)]
pub enum DeleteTarget {
    Task {
        id: TaskId,
        title: String,
        has_subtasks: bool,
    },
    Tag(Tag),
    Category(Category),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteChoice {
    KeepSubtasks,
    DeleteSubtasks,
    Delete,
    Cancel,
}

impl DeleteChoice {
    pub fn label(&self) -> &'static str {
        match self {
            DeleteChoice::KeepSubtasks => "Delete, keep sub-tasks",
            DeleteChoice::DeleteSubtasks => "Delete with sub-tasks",
            DeleteChoice::Delete => "Delete",
            DeleteChoice::Cancel => "Cancel",
        }
    }
}

impl DeleteTarget {
    /// Choices offered in the confirm modal; sub-task handling only when there are sub-tasks
    pub fn choices(&self) -> &'static [DeleteChoice] {
        match self {
            DeleteTarget::Task { has_subtasks: true, .. } => &[
                DeleteChoice::KeepSubtasks,
                DeleteChoice::DeleteSubtasks,
                DeleteChoice::Cancel,
            ],
            _ => &[DeleteChoice::Delete, DeleteChoice::Cancel],
        }
    }

    pub fn describe(&self) -> (&'static str, &str) {
        match self {
            DeleteTarget::Task { title, .. } => ("task", title),
            DeleteTarget::Tag(tag) => ("tag", &tag.name),
            DeleteTarget::Category(category) => ("category", &category.name),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptTarget {
    NewTag,
    RenameTag(TagId),
    NewCategory,
    RenameCategory(CategoryId),
}

impl PromptTarget {
    pub fn title(&self) -> &'static str {
        match self {
            PromptTarget::NewTag => "New tag",
            PromptTarget::RenameTag(_) => "Rename tag",
            PromptTarget::NewCategory => "New category",
            PromptTarget::RenameCategory(_) => "Rename category",
        }
    }
}

/// Name input for creating or renaming a tag or category
#[derive(Debug, Clone)]
pub struct PromptState {
    pub target: PromptTarget,
    pub input: Editor,
}

#[derive(Debug, Clone)]
pub struct UiState {
    pub current_tab: Tab,
    pub mode: Mode,
    pub selected_index: usize,
    pub list_state: ListState,
    pub detail_scroll: usize,
    pub expanded: HashSet<TaskId>,
}

impl Default for UiState {
    fn default() -> Self {
        Self {
            current_tab: Tab::Tasks,
            mode: Mode::View,
            selected_index: 0,
            list_state: ListState::default(),
            detail_scroll: 0,
            expanded: HashSet::new(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct FilterState {
    pub active: TaskFilter,
    pub form_state: Option<FilterFormState>,
}

#[derive(Debug, Clone, Default)]
pub struct ModalState {
    pub delete_confirmation: Option<DeleteTarget>,
    pub delete_modal_selection: usize,
    pub prompt: Option<PromptState>,
}

#[derive(Debug, Clone, Default)]
pub struct StatusState {
    pub message: Option<String>,
    pub message_time: Option<Instant>,
}

#[derive(Debug, Clone, Default)]
pub struct SearchState {
    pub input: Editor,
}

#[derive(Debug, Clone, Default)]
pub struct FormState {
    pub task_form: Option<TaskForm>,
}

pub struct App {
    pub config: Config,
    pub manager: TaskManager,

    pub ui: UiState,
    pub filter: FilterState,
    pub modals: ModalState,
    pub status: StatusState,
    pub search: SearchState,
    pub form: FormState,
}

impl App {
    pub fn new(config: Config, manager: TaskManager) -> Self {
        let mut app = Self {
            config,
            manager,
            ui: UiState::default(),
            filter: FilterState::default(),
            modals: ModalState::default(),
            status: StatusState::default(),
            search: SearchState::default(),
            form: FormState::default(),
        };
        app.sync_list_state();
        app
    }

    // ---- derived views ----

    /// Task list rows: visible parents in store order, children under expanded ones
    pub fn task_rows(&self) -> Vec<TaskRow> {
        let state = self.manager.state();
        let mut rows = Vec::new();
        for id in view::filter_tasks(state, &self.filter.active, utils::today()) {
            rows.push(TaskRow { id, depth: 0 });
            if self.ui.expanded.contains(&id) {
                rows.extend(
                    state
                        .subtasks_of(id)
                        .into_iter()
                        .map(|child| TaskRow { id: child.id, depth: 1 }),
                );
            }
        }
        rows
    }

    pub fn row_count(&self) -> usize {
        match self.ui.current_tab {
            Tab::Tasks => self.task_rows().len(),
            Tab::Categories => self.manager.organizers().categories.len(),
            Tab::Tags => self.manager.organizers().tags.len(),
        }
    }

    pub fn selected_task(&self) -> Option<&Task> {
        if self.ui.current_tab != Tab::Tasks {
            return None;
        }
        let row = self.task_rows().get(self.ui.selected_index).copied()?;
        self.manager.state().task(row.id)
    }

    pub fn selected_category(&self) -> Option<&Category> {
        if self.ui.current_tab != Tab::Categories {
            return None;
        }
        self.manager.organizers().categories.get(self.ui.selected_index)
    }

    pub fn selected_tag(&self) -> Option<&Tag> {
        if self.ui.current_tab != Tab::Tags {
            return None;
        }
        self.manager.organizers().tags.get(self.ui.selected_index)
    }

    /// The store error to show, task store first
    pub fn error_message(&self) -> Option<&str> {
        let tasks = self.manager.state().error.as_str();
        let organizers = self.manager.organizers().error.as_str();
        [tasks, organizers].into_iter().find(|e| !e.is_empty())
    }

    pub fn is_loading(&self) -> bool {
        self.manager.state().loading || self.manager.organizers().loading
    }

    pub fn sort_label(&self) -> String {
        self.manager
            .sort()
            .map(|s| s.label())
            .unwrap_or_else(|| "Server default".to_string())
    }

    pub fn filter_summary(&self) -> String {
        self.filter.active.summary(self.manager.organizers())
    }

    // ---- selection ----

    pub fn sync_list_state(&mut self) {
        let count = self.row_count();
        if count == 0 {
            self.ui.selected_index = 0;
            self.ui.list_state.select(None);
        } else {
            self.ui.selected_index = self.ui.selected_index.min(count - 1);
            self.ui.list_state.select(Some(self.ui.selected_index));
        }
    }

    pub fn move_selection_up(&mut self) {
        if self.ui.selected_index > 0 {
            self.ui.selected_index -= 1;
            self.ui.detail_scroll = 0;
        }
        self.sync_list_state();
    }

    pub fn move_selection_down(&mut self) {
        if self.ui.selected_index + 1 < self.row_count() {
            self.ui.selected_index += 1;
            self.ui.detail_scroll = 0;
        }
        self.sync_list_state();
    }

    pub fn switch_tab(&mut self, tab: Tab) {
        if self.ui.current_tab != tab {
            self.ui.current_tab = tab;
            self.ui.selected_index = 0;
            self.ui.detail_scroll = 0;
        }
        self.sync_list_state();
    }

    /// Expand or collapse the selected parent; on a child row, collapse its parent
    pub fn toggle_expanded(&mut self) {
        let Some(task) = self.selected_task() else {
            return;
        };
        let (id, parent, has_subtasks) = (task.id, task.parent_task, task.has_subtasks);
        match parent {
            Some(parent) => {
                self.ui.expanded.remove(&parent);
                self.select_task(parent);
            }
            None if has_subtasks => {
                if !self.ui.expanded.remove(&id) {
                    self.ui.expanded.insert(id);
                }
            }
            None => {}
        }
        self.sync_list_state();
    }

    fn select_task(&mut self, id: TaskId) {
        if let Some(index) = self.task_rows().iter().position(|r| r.id == id) {
            self.ui.selected_index = index;
        }
    }

    pub fn scroll_detail_up(&mut self) {
        self.ui.detail_scroll = self.ui.detail_scroll.saturating_sub(1);
    }

    pub fn scroll_detail_down(&mut self) {
        self.ui.detail_scroll += 1;
    }

    // ---- status ----

    pub fn set_status_message(&mut self, message: impl Into<String>) {
        self.status.message = Some(message.into());
        self.status.message_time = Some(Instant::now());
    }

    pub fn clear_status_message(&mut self) {
        self.status.message = None;
        self.status.message_time = None;
    }

    /// Status messages clear themselves after 3 seconds
    pub fn check_status_message_timeout(&mut self) {
        const STATUS_MESSAGE_TIMEOUT_SECS: u64 = 3;
        if let Some(time) = self.status.message_time {
            if time.elapsed().as_secs() >= STATUS_MESSAGE_TIMEOUT_SECS {
                self.clear_status_message();
            }
        }
    }

    pub fn dismiss_error(&mut self) {
        self.manager.clear_error();
        self.clear_status_message();
    }

    // ---- quick search ----

    pub fn enter_search_mode(&mut self) {
        self.ui.mode = Mode::Search;
        self.search.input = Editor::from_string(&self.filter.active.search);
    }

    /// Re-filter after every keystroke
    pub fn update_search(&mut self) {
        self.filter.active.search = self.search.input.text();
        self.ui.selected_index = 0;
        self.sync_list_state();
    }

    /// Leave search; `keep` false also clears the query
    pub fn exit_search_mode(&mut self, keep: bool) {
        if !keep {
            self.search.input.clear();
            self.update_search();
        }
        self.ui.mode = Mode::View;
    }

    // ---- filter modal ----

    pub fn enter_filter_mode(&mut self) {
        self.filter.form_state = Some(FilterFormState::new(&self.filter.active));
        self.ui.mode = Mode::Filter;
    }

    pub fn exit_filter_mode(&mut self) {
        self.filter.form_state = None;
        self.ui.mode = Mode::View;
    }

    pub fn apply_filters(&mut self) {
        if let Some(state) = self.filter.form_state.take() {
            self.filter.active = state.filter;
            tracing::debug!(filter = ?self.filter.active, "filters applied");
        }
        self.ui.mode = Mode::View;
        self.ui.selected_index = 0;
        self.sync_list_state();
    }

    pub fn clear_filter_form(&mut self) {
        if let Some(state) = self.filter.form_state.as_mut() {
            state.filter.clear();
        }
    }

    pub fn navigate_filter_field(&mut self, forward: bool) {
        if let Some(state) = self.filter.form_state.as_mut() {
            state.current_field = if forward {
                state.current_field.next()
            } else {
                state.current_field.prev()
            };
        }
    }

    /// Left/right changes the value of the status and due fields
    pub fn cycle_filter_value(&mut self, forward: bool) {
        if let Some(state) = self.filter.form_state.as_mut() {
            match state.current_field {
                FilterField::Status => state.cycle_status(forward),
                FilterField::Due => state.cycle_due(forward),
                FilterField::Categories | FilterField::Tags => {}
            }
        }
    }

    /// Up/down moves within the category and tag checklists
    pub fn move_filter_cursor(&mut self, down: bool) {
        let category_rows = self.manager.organizers().categories.len();
        let tag_rows = self.manager.organizers().tags.len() + 1;
        let Some(state) = self.filter.form_state.as_mut() else {
            return;
        };
        let (cursor, rows) = match state.current_field {
            FilterField::Categories => (&mut state.category_cursor, category_rows),
            FilterField::Tags => (&mut state.tag_cursor, tag_rows),
            FilterField::Status => return state.cycle_status(down),
            FilterField::Due => return state.cycle_due(down),
        };
        if down {
            if *cursor + 1 < rows {
                *cursor += 1;
            }
        } else {
            *cursor = cursor.saturating_sub(1);
        }
    }

    /// Space toggles the category or tag under the cursor
    pub fn toggle_filter_item(&mut self) {
        let category_ids: Vec<CategoryId> = self.manager.organizers().categories.iter().map(|c| c.id).collect();
        let tag_ids: Vec<TagId> = self.manager.organizers().tags.iter().map(|t| t.id).collect();
        let Some(state) = self.filter.form_state.as_mut() else {
            return;
        };
        match state.current_field {
            FilterField::Categories => {
                if let Some(id) = category_ids.get(state.category_cursor) {
                    state.filter.toggle_category(*id);
                }
            }
            FilterField::Tags => match state.tag_cursor {
                0 => state.filter.toggle_tagged_only(),
                n => {
                    if let Some(id) = tag_ids.get(n - 1) {
                        state.filter.toggle_tag(*id);
                    }
                }
            },
            FilterField::Status => state.cycle_status(true),
            FilterField::Due => state.cycle_due(true),
        }
    }

    // ---- help ----

    pub fn enter_help_mode(&mut self) {
        self.ui.mode = Mode::Help;
    }

    pub fn exit_help_mode(&mut self) {
        self.ui.mode = Mode::View;
    }

    // ---- task form ----

    /// Open a blank form; `as_subtask` links it to the selected parent
    pub fn open_new_task_form(&mut self, as_subtask: bool) {
        let parent = if as_subtask {
            match self.selected_task() {
                Some(task) => Some(task.parent_task.unwrap_or(task.id)),
                None => {
                    self.set_status_message("Select a parent task first");
                    return;
                }
            }
        } else {
            None
        };
        self.manager.show_new_task_form(parent);
        self.form.task_form = Some(TaskForm::new(parent));
        self.ui.mode = Mode::Form;
    }

    pub fn open_edit_form(&mut self) {
        let Some(task) = self.selected_task() else {
            return;
        };
        let form = TaskForm::from_task(task, self.manager.organizers());
        let id = task.id;
        self.manager.edit_task(id);
        self.form.task_form = Some(form);
        self.ui.mode = Mode::Form;
    }

    pub fn cancel_form(&mut self) {
        self.manager.cancel_form();
        self.close_form();
    }

    fn close_form(&mut self) {
        self.form.task_form = None;
        self.ui.mode = Mode::View;
        self.sync_list_state();
    }

    pub fn navigate_form_field(&mut self, forward: bool) {
        if let Some(form) = self.form.task_form.as_mut() {
            form.current_field = if forward {
                form.current_field.next()
            } else {
                form.current_field.prev()
            };
        }
    }

    pub fn cycle_form_category(&mut self, forward: bool) {
        let categories = self.manager.organizers().categories.clone();
        if let Some(form) = self.form.task_form.as_mut() {
            form.cycle_category(&categories, forward);
        }
    }

    /// Resolve typed tag names to ids, creating tags that do not exist yet.
    /// `None` when a create failed; the error is already in the organizer store.
    async fn resolve_tags(&mut self, names: &[String]) -> Option<Vec<TagId>> {
        let mut ids = Vec::with_capacity(names.len());
        for name in names {
            let existing = self.manager.organizers().tag_by_name(name).map(|t| t.id);
            let id = match existing {
                Some(id) => id,
                None => self.manager.create_tag(name).await.ok()?.id,
            };
            ids.push(id);
        }
        Some(ids)
    }

    /// Save the open form through the store; the form closes once the store
    /// reports it hidden
    pub async fn save_form(&mut self) {
        let Some(form) = self.form.task_form.clone() else {
            return;
        };
        let Some(tags) = self.resolve_tags(&form.tag_names()).await else {
            return;
        };
        let draft = match form.to_draft(tags) {
            Ok(draft) => draft,
            Err(err) => {
                self.set_status_message(err.to_string());
                return;
            }
        };
        if self.manager.submit_form(&draft).await.is_ok() {
            self.set_status_message(if form.editing.is_some() { "Task saved" } else { "Task created" });
        }
        if !self.manager.state().show_form {
            if let Some(parent) = form.parent_task {
                self.ui.expanded.insert(parent);
            }
            self.close_form();
        }
    }

    // ---- task actions ----

    pub async fn toggle_selected(&mut self) {
        let Some(id) = self.selected_task().map(|t| t.id) else {
            return;
        };
        if self.manager.toggle_completion(id).await.is_ok() {
            let done = self.manager.state().task(id).is_some_and(|t| t.completed);
            self.set_status_message(if done { "Marked complete" } else { "Marked incomplete" });
        }
        self.sync_list_state();
    }

    pub async fn reload(&mut self) {
        self.manager.load_all().await;
        self.prune_expanded();
        self.sync_list_state();
    }

    fn prune_expanded(&mut self) {
        let state = self.manager.state();
        self.ui.expanded.retain(|id| state.task(*id).is_some_and(|t| t.has_subtasks));
    }

    /// Re-fetch with the next sort key, keeping the order
    pub async fn cycle_sort(&mut self) {
        let current = self.manager.sort().unwrap_or_default();
        let next = SortRequest::new(current.sort_by.next(), current.order);
        self.apply_sort(next).await;
    }

    pub async fn toggle_sort_order(&mut self) {
        let current = self.manager.sort().unwrap_or_default();
        let next = SortRequest::new(current.sort_by, current.order.toggle());
        self.apply_sort(next).await;
    }

    async fn apply_sort(&mut self, sort: SortRequest) {
        if self.manager.get_tasks(Some(sort)).await.is_ok() {
            self.set_status_message(format!("Sorted by {}", sort.label()));
        }
        self.sync_list_state();
    }

    // ---- delete ----

    pub fn request_delete(&mut self) {
        let target = match self.ui.current_tab {
            Tab::Tasks => self.selected_task().map(|task| DeleteTarget::Task {
                id: task.id,
                title: task.title.clone(),
                has_subtasks: task.has_subtasks,
            }),
            Tab::Categories => self.selected_category().cloned().map(DeleteTarget::Category),
            Tab::Tags => self.selected_tag().cloned().map(DeleteTarget::Tag),
        };
        if target.is_some() {
            self.modals.delete_confirmation = target;
            self.modals.delete_modal_selection = 0;
        }
    }

    pub fn move_delete_selection(&mut self, down: bool) {
        let Some(target) = self.modals.delete_confirmation.as_ref() else {
            return;
        };
        let len = target.choices().len();
        let current = self.modals.delete_modal_selection;
        self.modals.delete_modal_selection = if down { (current + 1) % len } else { (current + len - 1) % len };
    }

    pub fn cancel_delete(&mut self) {
        self.modals.delete_confirmation = None;
        self.modals.delete_modal_selection = 0;
    }

    pub async fn confirm_delete(&mut self) {
        let Some(target) = self.modals.delete_confirmation.take() else {
            return;
        };
        let choice = target
            .choices()
            .get(self.modals.delete_modal_selection)
            .copied()
            .unwrap_or(DeleteChoice::Cancel);
        self.modals.delete_modal_selection = 0;

        let deleted = match (&target, choice) {
            (_, DeleteChoice::Cancel) => return,
            (DeleteTarget::Task { id, .. }, choice) => {
                let with_subtasks = choice == DeleteChoice::DeleteSubtasks;
                let ok = self.manager.delete_task(*id, with_subtasks).await.is_ok();
                if ok {
                    self.ui.expanded.remove(id);
                }
                ok
            }
            (DeleteTarget::Tag(tag), _) => self.manager.delete_tag(tag.id).await.is_ok(),
            (DeleteTarget::Category(category), _) => self.manager.delete_category(category.id).await.is_ok(),
        };
        if deleted {
            let (kind, name) = target.describe();
            self.set_status_message(format!("Deleted {} \"{}\"", kind, name));
        }
        self.sync_list_state();
    }

    // ---- tag / category prompt ----

    pub fn open_prompt(&mut self, rename: bool) {
        let (target, current) = match (self.ui.current_tab, rename) {
            (Tab::Tags, false) => (PromptTarget::NewTag, String::new()),
            (Tab::Categories, false) => (PromptTarget::NewCategory, String::new()),
            (Tab::Tags, true) => match self.selected_tag() {
                Some(tag) => (PromptTarget::RenameTag(tag.id), tag.name.clone()),
                None => return,
            },
            (Tab::Categories, true) => match self.selected_category() {
                Some(category) => (PromptTarget::RenameCategory(category.id), category.name.clone()),
                None => return,
            },
            (Tab::Tasks, _) => return,
        };
        self.modals.prompt = Some(PromptState {
            target,
            input: Editor::from_string(current),
        });
    }

    pub fn cancel_prompt(&mut self) {
        self.modals.prompt = None;
    }

    pub async fn submit_prompt(&mut self) {
        let Some(prompt) = self.modals.prompt.take() else {
            return;
        };
        let name = prompt.input.text().trim().to_string();
        if name.is_empty() {
            self.set_status_message("Name is required");
            self.modals.prompt = Some(prompt);
            return;
        }

        let saved = match prompt.target {
            PromptTarget::NewTag => self.manager.create_tag(&name).await.is_ok(),
            PromptTarget::RenameTag(id) => self.manager.rename_tag(id, &name).await.is_ok(),
            PromptTarget::NewCategory => {
                let input = CategoryInput {
                    name: name.clone(),
                    description: None,
                    as_workload: true,
                };
                self.manager.create_category(&input).await.is_ok()
            }
            PromptTarget::RenameCategory(id) => {
                let Some(existing) = self.manager.organizers().category(id).cloned() else {
                    return;
                };
                let input = CategoryInput {
                    name: name.clone(),
                    description: existing.description,
                    as_workload: existing.as_workload,
                };
                self.manager.update_category(id, &input).await.is_ok()
            }
        };
        if saved {
            self.set_status_message(format!("Saved \"{}\"", name));
        }
        self.sync_list_state();
    }
}
