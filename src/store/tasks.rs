//! Normalized task cache and its reducer.
//!
//! `TaskState` mirrors what the API has confirmed: a map of every loaded
//! task plus the aggregate view (`TaskData`) that the list screens render
//! from. Transitions go through [`apply`], a pure function of the previous
//! state and one [`TaskAction`]; nothing here performs I/O.

use std::collections::BTreeMap;

use crate::models::{DeleteResponse, Task, TaskData, TaskId, TaskListResponse};

#[derive(Debug, Clone, PartialEq)]
pub struct TaskState {
    pub tasks: BTreeMap<TaskId, Task>,
    pub data: TaskData,
    pub loading: bool,
    pub error: String,
    pub show_form: bool,
    pub editing_task: Option<TaskId>,
    pub linking_parent: Option<TaskId>,
}

impl TaskState {
    /// Empty store, flagged as loading until the first bulk load lands
    pub fn init() -> Self {
        Self {
            tasks: BTreeMap::new(),
            data: TaskData::default(),
            loading: true,
            error: String::new(),
            show_form: false,
            editing_task: None,
            linking_parent: None,
        }
    }

    pub fn task(&self, id: TaskId) -> Option<&Task> {
        self.tasks.get(&id)
    }

    /// Children of `id` in the parent's `sub_tasks` order
    pub fn subtasks_of(&self, id: TaskId) -> Vec<&Task> {
        self.tasks
            .get(&id)
            .map(|parent| {
                parent
                    .sub_tasks
                    .iter()
                    .filter_map(|child| self.tasks.get(child))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Parent ids in display order: incomplete list first, then complete
    pub fn parent_ids(&self) -> impl Iterator<Item = TaskId> + '_ {
        self.data
            .incomplete_tasks
            .iter()
            .chain(self.data.complete_tasks.iter())
            .copied()
    }

    /// The task the form is editing, if any
    pub fn editing(&self) -> Option<&Task> {
        self.editing_task.and_then(|id| self.tasks.get(&id))
    }
}

impl Default for TaskState {
    fn default() -> Self {
        Self::init()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum TaskAction {
    SetLoading(bool),
    SetError(String),
    /// Open the creation form, optionally scoped to a parent for sub-task creation
    ShowForm(Option<TaskId>),
    HideForm,
    SetEditingTask(TaskId),
    SetTasks(TaskListResponse),
    AddTask(Task),
    UpdateTask(Task),
    DeleteTask {
        id: TaskId,
        keep_subtasks: bool,
        outcome: DeleteResponse,
    },
}

impl TaskAction {
    pub fn name(&self) -> &'static str {
        match self {
            TaskAction::SetLoading(_) => "SET_LOADING",
            TaskAction::SetError(_) => "SET_ERROR",
            TaskAction::ShowForm(_) => "SHOW_FORM",
            TaskAction::HideForm => "HIDE_FORM",
            TaskAction::SetEditingTask(_) => "SET_EDITING_TASK",
            TaskAction::SetTasks(_) => "SET_TASKS",
            TaskAction::AddTask(_) => "ADD_TASK",
            TaskAction::UpdateTask(_) => "UPDATE_TASK",
            TaskAction::DeleteTask { .. } => "DELETE_TASK",
        }
    }
}

/// Compute the next state from `state` and `action`
pub fn apply(mut state: TaskState, action: TaskAction) -> TaskState {
    match action {
        TaskAction::SetLoading(loading) => {
            state.loading = loading;
        }
        TaskAction::SetError(error) => {
            state.error = error;
            state.loading = false;
        }
        TaskAction::ShowForm(parent) => {
            state.show_form = true;
            state.editing_task = None;
            state.linking_parent = parent;
        }
        TaskAction::HideForm => close_form(&mut state),
        TaskAction::SetEditingTask(id) => {
            state.show_form = true;
            state.editing_task = Some(id);
            state.linking_parent = None;
        }
        TaskAction::SetTasks(payload) => {
            state.tasks = payload.tasks;
            state.data = payload.data;
            state.loading = false;
            state.error.clear();
        }
        TaskAction::AddTask(task) => {
            if task.is_subtask() {
                add_subtask(&mut state, task);
            } else {
                add_parent_task(&mut state, task);
            }
            close_form(&mut state);
        }
        TaskAction::UpdateTask(task) => {
            update_task(&mut state, task);
            close_form(&mut state);
        }
        TaskAction::DeleteTask {
            id,
            keep_subtasks,
            outcome,
        } => {
            let Some(task) = state.tasks.remove(&id) else {
                tracing::warn!(task_id = id, "delete for a task that is not loaded, ignoring");
                return state;
            };
            match task.parent_task {
                Some(parent) => delete_subtask(&mut state, id, parent),
                None => delete_parent_task(&mut state, &task, keep_subtasks, outcome),
            }
            if state.editing_task == Some(id) {
                close_form(&mut state);
            }
        }
    }
    state
}

fn close_form(state: &mut TaskState) {
    state.show_form = false;
    state.editing_task = None;
    state.linking_parent = None;
}

fn add_parent_task(state: &mut TaskState, task: Task) {
    let data = &mut state.data;
    data.total_count += 1;
    data.parent_count += 1;
    if task.completed {
        data.complete_count += 1;
        data.complete_tasks.insert(0, task.id);
    } else {
        data.incomplete_count += 1;
        data.incomplete_tasks.insert(0, task.id);
    }
    state.tasks.insert(task.id, task);
}

fn add_subtask(state: &mut TaskState, task: Task) {
    let parent_id = task.parent_task;
    match parent_id.and_then(|pid| state.tasks.get_mut(&pid)) {
        Some(parent) => {
            parent.has_subtasks = true;
            parent.sub_tasks.push(task.id);
        }
        None => {
            // the store must be loaded before a sub-task can be added
            tracing::error!(task_id = task.id, parent = ?parent_id, "sub-task added before its parent was loaded");
        }
    }
    state.data.total_count += 1;
    state.tasks.insert(task.id, task);
}

fn update_task(state: &mut TaskState, task: Task) {
    let Some(previous) = state.tasks.get(&task.id) else {
        tracing::warn!(task_id = task.id, "update for a task that is not loaded, ignoring");
        return;
    };

    if !task.is_subtask() && previous.completed != task.completed {
        let data = &mut state.data;
        let id = task.id;
        if task.completed {
            data.incomplete_tasks.retain(|t| *t != id);
            data.complete_tasks.insert(0, id);
            data.incomplete_count = data.incomplete_count.saturating_sub(1);
            data.complete_count += 1;
        } else {
            data.complete_tasks.retain(|t| *t != id);
            data.incomplete_tasks.insert(0, id);
            data.complete_count = data.complete_count.saturating_sub(1);
            data.incomplete_count += 1;
        }
    }

    state.tasks.insert(task.id, task);
}

fn delete_subtask(state: &mut TaskState, id: TaskId, parent_id: TaskId) {
    if let Some(parent) = state.tasks.get_mut(&parent_id) {
        parent.sub_tasks.retain(|child| *child != id);
        parent.has_subtasks = !parent.sub_tasks.is_empty();
    }
    state.data.total_count = state.data.total_count.saturating_sub(1);
}

fn delete_parent_task(state: &mut TaskState, task: &Task, keep_subtasks: bool, outcome: DeleteResponse) {
    let data = &mut state.data;
    data.total_count = data.total_count.saturating_sub(1);
    data.parent_count = data.parent_count.saturating_sub(1);

    if let Some(pos) = data.complete_tasks.iter().position(|t| *t == task.id) {
        data.complete_tasks.remove(pos);
        data.complete_count = data.complete_count.saturating_sub(1);
    } else if let Some(pos) = data.incomplete_tasks.iter().position(|t| *t == task.id) {
        data.incomplete_tasks.remove(pos);
        data.incomplete_count = data.incomplete_count.saturating_sub(1);
    }

    if !task.has_subtasks {
        return;
    }

    if keep_subtasks {
        promote_subtasks(state, outcome);
    } else {
        delete_all_subtasks(state, &outcome.deleted_subtasks);
    }
}

/// Merge sub-tasks the server turned into parents after their parent was deleted
fn promote_subtasks(state: &mut TaskState, outcome: DeleteResponse) {
    let data = &mut state.data;
    data.parent_count += outcome.sub_count;
    data.incomplete_count += outcome.incomplete_count;
    data.complete_count += outcome.complete_count;
    data.incomplete_tasks.extend(outcome.incomplete_tasks);
    data.complete_tasks.extend(outcome.complete_tasks);
    state.tasks.extend(outcome.tasks);
}

fn delete_all_subtasks(state: &mut TaskState, ids: &[TaskId]) {
    for id in ids {
        state.tasks.remove(id);
    }
    state.data.total_count = state.data.total_count.saturating_sub(ids.len());
}

/// Owner of a `TaskState` that applies dispatched actions in order
#[derive(Debug, Default)]
pub struct TaskStore {
    state: TaskState,
}

impl TaskStore {
    pub fn new() -> Self {
        Self {
            state: TaskState::init(),
        }
    }

    pub fn state(&self) -> &TaskState {
        &self.state
    }

    pub fn dispatch(&mut self, action: TaskAction) {
        tracing::debug!(action = action.name(), "task store dispatch");
        let state = std::mem::take(&mut self.state);
        self.state = apply(state, action);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parent(id: TaskId, completed: bool) -> Task {
        let mut task = Task::new(id, format!("Task {}", id));
        task.completed = completed;
        task
    }

    fn child(id: TaskId, owner: TaskId, completed: bool) -> Task {
        let mut task = parent(id, completed);
        task.parent_task = Some(owner);
        task
    }

    /// The stored task with its completion flipped, as the API would return it
    fn toggled(state: &TaskState, id: TaskId) -> Task {
        let mut task = state.task(id).cloned().unwrap();
        task.completed = !task.completed;
        task
    }

    fn run(actions: Vec<TaskAction>) -> TaskState {
        actions.into_iter().fold(TaskState::init(), apply)
    }

    /// Aggregate and parent/child invariants that must hold after any dispatch sequence
    fn assert_consistent(state: &TaskState) {
        let d = &state.data;
        assert_eq!(d.incomplete_count + d.complete_count, d.parent_count, "completion split");
        let subtasks = state.tasks.values().filter(|t| t.is_subtask()).count();
        assert_eq!(d.parent_count + subtasks, d.total_count, "parent + sub-task total");
        assert_eq!(d.total_count, state.tasks.len(), "total matches map");
        assert_eq!(d.incomplete_tasks.len(), d.incomplete_count);
        assert_eq!(d.complete_tasks.len(), d.complete_count);

        for task in state.tasks.values() {
            let listed = d.incomplete_tasks.contains(&task.id) as usize
                + d.complete_tasks.contains(&task.id) as usize;
            match task.parent_task {
                Some(p) => {
                    assert_eq!(listed, 0, "sub-task {} listed at top level", task.id);
                    let owner = state.tasks.get(&p).expect("parent loaded");
                    assert!(owner.sub_tasks.contains(&task.id));
                }
                None => assert_eq!(listed, 1, "parent {} listed once", task.id),
            }
        }
    }

    #[test]
    fn init_is_empty_and_loading() {
        let state = TaskState::init();
        assert!(state.tasks.is_empty());
        assert!(state.loading);
        assert_eq!(state.data, TaskData::default());
        assert!(!state.show_form);
    }

    #[test]
    fn add_parent_task_counts_as_incomplete() {
        let state = run(vec![TaskAction::AddTask(Task::new(1, "A"))]);
        assert_eq!(state.data.total_count, 1);
        assert_eq!(state.data.parent_count, 1);
        assert_eq!(state.data.incomplete_count, 1);
        assert_eq!(state.data.incomplete_tasks, vec![1]);
        assert!(state.data.complete_tasks.is_empty());
        assert_consistent(&state);
    }

    #[test]
    fn add_prepends_most_recent_first() {
        let state = run(vec![
            TaskAction::AddTask(parent(1, false)),
            TaskAction::AddTask(parent(2, false)),
            TaskAction::AddTask(parent(3, true)),
        ]);
        assert_eq!(state.data.incomplete_tasks, vec![2, 1]);
        assert_eq!(state.data.complete_tasks, vec![3]);
        assert_consistent(&state);
    }

    #[test]
    fn add_subtask_links_parent() {
        let state = run(vec![
            TaskAction::AddTask(parent(1, false)),
            TaskAction::AddTask(child(2, 1, false)),
        ]);
        let owner = state.task(1).unwrap();
        assert!(owner.has_subtasks);
        assert_eq!(owner.sub_tasks, vec![2]);
        assert_eq!(state.data.total_count, 2);
        assert_eq!(state.data.parent_count, 1);
        assert_eq!(state.data.incomplete_tasks, vec![1]);
        assert_consistent(&state);
    }

    #[test]
    fn add_closes_the_form() {
        let state = run(vec![
            TaskAction::AddTask(parent(1, false)),
            TaskAction::ShowForm(Some(1)),
            TaskAction::AddTask(child(2, 1, false)),
        ]);
        assert!(!state.show_form);
        assert_eq!(state.linking_parent, None);
        assert_eq!(state.editing_task, None);
    }

    #[test]
    fn toggle_completion_moves_between_lists() {
        let mut done = parent(1, false);
        done.completed = true;
        let state = run(vec![
            TaskAction::AddTask(parent(2, true)),
            TaskAction::AddTask(parent(1, false)),
            TaskAction::UpdateTask(done),
        ]);
        assert!(state.data.incomplete_tasks.is_empty());
        assert_eq!(state.data.complete_tasks, vec![1, 2]);
        assert_eq!(state.data.incomplete_count, 0);
        assert_eq!(state.data.complete_count, 2);
        assert_consistent(&state);

        let state = apply(state, TaskAction::UpdateTask(parent(1, false)));
        assert_eq!(state.data.incomplete_tasks, vec![1]);
        assert_eq!(state.data.complete_tasks, vec![2]);
        assert_consistent(&state);
    }

    #[test]
    fn update_without_completion_change_keeps_aggregates() {
        let state = run(vec![
            TaskAction::AddTask(parent(1, false)),
            TaskAction::AddTask(parent(2, false)),
        ]);
        let before = state.data.clone();
        let mut renamed = parent(1, false);
        renamed.title = "Renamed".to_string();
        let state = apply(state, TaskAction::UpdateTask(renamed));
        assert_eq!(state.data, before);
        assert_eq!(state.task(1).unwrap().title, "Renamed");
    }

    #[test]
    fn subtask_of_unloaded_parent_is_kept_without_panicking() {
        let state = run(vec![
            TaskAction::AddTask(parent(1, false)),
            TaskAction::AddTask(child(5, 9, false)),
        ]);
        assert!(state.task(5).is_some());
        assert_eq!(state.data.total_count, 2);
        assert_eq!(state.data.parent_count, 1);
        assert_eq!(state.data.incomplete_tasks, vec![1]);
        assert!(state.task(1).is_some_and(|t| t.sub_tasks.is_empty()));
    }

    #[test]
    fn subtask_completion_never_touches_aggregates() {
        let state = run(vec![
            TaskAction::AddTask(parent(1, false)),
            TaskAction::AddTask(child(2, 1, false)),
        ]);
        let before = state.data.clone();
        let state = apply(state, TaskAction::UpdateTask(child(2, 1, true)));
        assert_eq!(state.data, before);
        assert!(state.task(2).unwrap().completed);
        assert_consistent(&state);
    }

    #[test]
    fn update_of_unknown_task_is_ignored() {
        let state = run(vec![TaskAction::AddTask(parent(1, false))]);
        let state = apply(state, TaskAction::UpdateTask(parent(9, true)));
        assert!(state.task(9).is_none());
        assert_consistent(&state);
    }

    #[test]
    fn delete_subtask_unlinks_parent() {
        let state = run(vec![
            TaskAction::AddTask(parent(1, false)),
            TaskAction::AddTask(child(2, 1, false)),
            TaskAction::DeleteTask {
                id: 2,
                keep_subtasks: true,
                outcome: DeleteResponse::default(),
            },
        ]);
        let owner = state.task(1).unwrap();
        assert!(owner.sub_tasks.is_empty());
        assert!(!owner.has_subtasks);
        assert_eq!(state.data.total_count, 1);
        assert_consistent(&state);
    }

    #[test]
    fn delete_parent_keeping_subtasks_promotes_them() {
        let state = run(vec![
            TaskAction::AddTask(parent(1, false)),
            TaskAction::AddTask(child(2, 1, false)),
            TaskAction::AddTask(child(3, 1, false)),
        ]);
        let outcome = DeleteResponse {
            tasks: [(2, parent(2, false)), (3, parent(3, false))].into_iter().collect(),
            sub_count: 2,
            incomplete_count: 2,
            complete_count: 0,
            incomplete_tasks: vec![2, 3],
            complete_tasks: vec![],
            deleted_subtasks: vec![],
        };
        let state = apply(
            state,
            TaskAction::DeleteTask {
                id: 1,
                keep_subtasks: true,
                outcome,
            },
        );
        assert!(state.task(1).is_none());
        assert!(state.task(2).unwrap().parent_task.is_none());
        assert_eq!(state.data.parent_count, 2);
        assert_eq!(state.data.incomplete_count, 2);
        assert_eq!(state.data.incomplete_tasks, vec![2, 3]);
        assert_eq!(state.data.total_count, 2);
        assert_consistent(&state);
    }

    #[test]
    fn delete_parent_discarding_subtasks_removes_them() {
        let state = run(vec![
            TaskAction::AddTask(parent(5, true)),
            TaskAction::AddTask(parent(1, false)),
            TaskAction::AddTask(child(2, 1, true)),
            TaskAction::AddTask(child(3, 1, false)),
            TaskAction::DeleteTask {
                id: 1,
                keep_subtasks: false,
                outcome: DeleteResponse {
                    deleted_subtasks: vec![2, 3],
                    ..DeleteResponse::default()
                },
            },
        ]);
        assert_eq!(state.tasks.keys().copied().collect::<Vec<_>>(), vec![5]);
        assert_eq!(state.data.total_count, 1);
        assert_eq!(state.data.parent_count, 1);
        assert_eq!(state.data.complete_tasks, vec![5]);
        assert_consistent(&state);
    }

    #[test]
    fn delete_completed_parent_leaves_incomplete_list() {
        let state = run(vec![
            TaskAction::AddTask(parent(1, true)),
            TaskAction::AddTask(parent(2, false)),
            TaskAction::DeleteTask {
                id: 1,
                keep_subtasks: true,
                outcome: DeleteResponse::default(),
            },
        ]);
        assert!(state.data.complete_tasks.is_empty());
        assert_eq!(state.data.complete_count, 0);
        assert_eq!(state.data.incomplete_tasks, vec![2]);
        assert_consistent(&state);
    }

    #[test]
    fn delete_of_edited_task_closes_form() {
        let state = run(vec![
            TaskAction::AddTask(parent(1, false)),
            TaskAction::SetEditingTask(1),
            TaskAction::DeleteTask {
                id: 1,
                keep_subtasks: true,
                outcome: DeleteResponse::default(),
            },
        ]);
        assert!(!state.show_form);
        assert_eq!(state.editing_task, None);
    }

    #[test]
    fn set_tasks_is_idempotent() {
        let mut payload = TaskListResponse::default();
        payload.tasks.insert(1, parent(1, false));
        payload.tasks.insert(2, parent(2, true));
        payload.data = TaskData {
            total_count: 2,
            parent_count: 2,
            incomplete_count: 1,
            complete_count: 1,
            incomplete_tasks: vec![1],
            complete_tasks: vec![2],
        };

        let once = apply(
            TaskState::init(),
            TaskAction::SetTasks(payload.clone()),
        );
        let twice = apply(once.clone(), TaskAction::SetTasks(payload));
        assert_eq!(once, twice);
        assert!(!once.loading);
        assert_consistent(&once);
    }

    #[test]
    fn set_tasks_clears_error() {
        let state = run(vec![
            TaskAction::SetError("Failed to load tasks. Please try again.".into()),
            TaskAction::SetLoading(true),
            TaskAction::SetTasks(TaskListResponse::default()),
        ]);
        assert!(state.error.is_empty());
        assert!(!state.loading);
    }

    #[test]
    fn set_error_keeps_tasks() {
        let state = run(vec![
            TaskAction::AddTask(parent(1, false)),
            TaskAction::SetLoading(true),
            TaskAction::SetError("boom".into()),
        ]);
        assert_eq!(state.error, "boom");
        assert!(!state.loading);
        assert_eq!(state.tasks.len(), 1);
        assert_consistent(&state);
    }

    #[test]
    fn form_intents_only_touch_ui_fields() {
        let state = run(vec![TaskAction::AddTask(parent(1, false))]);
        let data = state.data.clone();

        let state = apply(state, TaskAction::ShowForm(Some(1)));
        assert!(state.show_form);
        assert_eq!(state.linking_parent, Some(1));
        assert_eq!(state.editing_task, None);

        let state = apply(state, TaskAction::SetEditingTask(1));
        assert!(state.show_form);
        assert_eq!(state.editing_task, Some(1));
        assert_eq!(state.linking_parent, None);
        assert_eq!(state.editing().map(|t| t.id), Some(1));

        let state = apply(state, TaskAction::HideForm);
        assert!(!state.show_form);
        assert_eq!(state.editing_task, None);
        assert_eq!(state.linking_parent, None);
        assert_eq!(state.data, data);
    }

    #[test]
    fn mixed_sequence_keeps_invariants() {
        let mut state = TaskState::init();
        let step = |state: TaskState, action: TaskAction| {
            let next = apply(state, action);
            assert_consistent(&next);
            next
        };

        state = step(state, TaskAction::AddTask(parent(1, false)));
        state = step(state, TaskAction::AddTask(parent(2, false)));
        state = step(state, TaskAction::AddTask(child(3, 1, false)));
        state = step(state, TaskAction::AddTask(child(4, 1, true)));
        state = step(state, TaskAction::AddTask(child(5, 2, false)));
        let done = toggled(&state, 2);
        state = step(state, TaskAction::UpdateTask(done));
        state = step(
            state,
            TaskAction::DeleteTask {
                id: 4,
                keep_subtasks: true,
                outcome: DeleteResponse::default(),
            },
        );
        state = step(state, TaskAction::AddTask(parent(6, true)));
        state = step(
            state,
            TaskAction::DeleteTask {
                id: 2,
                keep_subtasks: false,
                outcome: DeleteResponse {
                    deleted_subtasks: vec![5],
                    ..DeleteResponse::default()
                },
            },
        );
        let reopened = toggled(&state, 6);
        state = step(state, TaskAction::UpdateTask(reopened));

        assert_eq!(state.data.incomplete_tasks, vec![6, 1]);
        assert!(state.data.complete_tasks.is_empty());
        assert_eq!(
            state.subtasks_of(1).iter().map(|t| t.id).collect::<Vec<_>>(),
            vec![3]
        );
    }

    #[test]
    fn store_dispatch_applies_in_order() {
        let mut store = TaskStore::new();
        store.dispatch(TaskAction::AddTask(parent(1, false)));
        store.dispatch(TaskAction::UpdateTask(parent(1, true)));
        assert_eq!(store.state().data.complete_tasks, vec![1]);
        assert_eq!(store.state().parent_ids().collect::<Vec<_>>(), vec![1]);
    }
}
