//! The calling layer between the API client and the stores.
//!
//! Each operation performs one request and turns the outcome into a store
//! dispatch: the confirmed entity on success, `SetError` with a user-facing
//! message on failure. The error is also returned so command-line callers
//! can exit non-zero; the TUI only reads the store.

use thiserror::Error;

use crate::api::{ApiClient, ApiError};
use crate::draft::{DraftError, TaskDraft, TaskPatch};
use crate::models::{Category, CategoryId, CategoryInput, Tag, TagId, TagInput, Task, TaskId};
use crate::store::{OrganizerAction, OrganizerState, OrganizerStore, TaskAction, TaskState, TaskStore};
use crate::view::SortRequest;

pub const LOAD_TASKS_FAILED: &str = "Failed to load tasks. Please try again.";
pub const LOAD_SUBTASKS_FAILED: &str = "Failed to load subtasks. Please try again.";
pub const SAVE_TASK_FAILED: &str = "Failed to save task. Please try again.";
pub const DELETE_TASK_FAILED: &str = "Failed to delete task. Please try again.";
pub const TOGGLE_FAILED: &str = "Failed to update task completion status. Please try again.";
pub const LOAD_ORGANIZERS_FAILED: &str = "Failed to load tags/categories. Please try again.";
pub const SAVE_ORGANIZER_FAILED: &str = "Failed to save tag/category. Please try again.";
pub const DELETE_ORGANIZER_FAILED: &str = "Failed to delete tag/category. Please try again.";

#[derive(Debug, Error)]
pub enum ManagerError {
    #[error(transparent)]
    Api(#[from] ApiError),
    #[error(transparent)]
    Draft(#[from] DraftError),
    #[error("Task {0} is not loaded")]
    UnknownTask(TaskId),
}

pub struct TaskManager {
    api: ApiClient,
    tasks: TaskStore,
    organizers: OrganizerStore,
    sort: Option<SortRequest>,
}

impl TaskManager {
    pub fn new(api: ApiClient) -> Self {
        Self {
            api,
            tasks: TaskStore::new(),
            organizers: OrganizerStore::new(),
            sort: None,
        }
    }

    pub fn with_sort(mut self, sort: Option<SortRequest>) -> Self {
        self.sort = sort;
        self
    }

    pub fn state(&self) -> &TaskState {
        self.tasks.state()
    }

    pub fn organizers(&self) -> &OrganizerState {
        self.organizers.state()
    }

    pub fn sort(&self) -> Option<SortRequest> {
        self.sort
    }

    pub fn api(&self) -> &ApiClient {
        &self.api
    }

    pub fn api_mut(&mut self) -> &mut ApiClient {
        &mut self.api
    }

    fn task_failed(&mut self, err: ApiError, fallback: &str) -> ManagerError {
        let message = err.user_message(fallback);
        tracing::warn!(error = %err, "{}", message);
        self.tasks.dispatch(TaskAction::SetError(message));
        ManagerError::Api(err)
    }

    fn organizer_failed(&mut self, err: ApiError, fallback: &str) -> ManagerError {
        let message = err.user_message(fallback);
        tracing::warn!(error = %err, "{}", message);
        self.organizers.dispatch(OrganizerAction::SetError(message));
        ManagerError::Api(err)
    }

    // ---- tasks ----

    /// Bulk load; `sort` is remembered for later reloads
    pub async fn get_tasks(&mut self, sort: Option<SortRequest>) -> Result<(), ManagerError> {
        self.sort = sort;
        self.tasks.dispatch(TaskAction::SetLoading(true));
        match self.api.tasks(sort).await {
            Ok(list) => {
                self.tasks.dispatch(TaskAction::SetTasks(list));
                Ok(())
            }
            Err(err) => Err(self.task_failed(err, LOAD_TASKS_FAILED)),
        }
    }

    /// Reload with the last sort order
    pub async fn reload(&mut self) -> Result<(), ManagerError> {
        self.get_tasks(self.sort).await
    }

    /// Fetch a parent's sub-tasks for display; the store is left as is
    pub async fn subtasks(&mut self, parent: TaskId) -> Result<Vec<Task>, ManagerError> {
        self.tasks.dispatch(TaskAction::SetLoading(true));
        match self.api.subtasks(parent).await {
            Ok(children) => {
                self.tasks.dispatch(TaskAction::SetLoading(false));
                Ok(children)
            }
            Err(err) => Err(self.task_failed(err, LOAD_SUBTASKS_FAILED)),
        }
    }

    pub async fn create_task(&mut self, draft: &TaskDraft) -> Result<TaskId, ManagerError> {
        let payload = match draft.create_payload() {
            Ok(payload) => payload,
            Err(err) => {
                self.tasks.dispatch(TaskAction::SetError(err.to_string()));
                return Err(err.into());
            }
        };
        match self.api.create_task(&payload).await {
            Ok(task) => {
                let id = task.id;
                tracing::info!(task_id = id, parent = ?task.parent_task, "task created");
                self.tasks.dispatch(TaskAction::AddTask(task));
                Ok(id)
            }
            Err(err) => Err(self.task_failed(err, SAVE_TASK_FAILED)),
        }
    }

    pub async fn update_task(&mut self, id: TaskId, patch: &TaskPatch) -> Result<(), ManagerError> {
        match self.api.update_task(id, patch).await {
            Ok(task) => {
                self.tasks.dispatch(TaskAction::UpdateTask(task));
                Ok(())
            }
            Err(err) => Err(self.task_failed(err, SAVE_TASK_FAILED)),
        }
    }

    /// Save the open form: update when editing (only changed fields, nothing
    /// sent when unchanged), otherwise create under the form's parent if any
    pub async fn submit_form(&mut self, draft: &TaskDraft) -> Result<(), ManagerError> {
        let original = self.state().editing().cloned();
        match original {
            Some(original) => {
                let patch = match draft.changes_from(&original) {
                    Ok(patch) => patch,
                    Err(err) => {
                        self.tasks.dispatch(TaskAction::SetError(err.to_string()));
                        return Err(err.into());
                    }
                };
                if patch.is_empty() {
                    self.tasks.dispatch(TaskAction::HideForm);
                    return Ok(());
                }
                self.update_task(original.id, &patch).await
            }
            None => {
                let mut draft = draft.clone();
                if draft.parent_task.is_none() {
                    draft.parent_task = self.state().linking_parent;
                }
                self.create_task(&draft).await.map(|_| ())
            }
        }
    }

    pub async fn toggle_completion(&mut self, id: TaskId) -> Result<(), ManagerError> {
        let Some(current) = self.state().task(id).map(|t| t.completed) else {
            return Err(ManagerError::UnknownTask(id));
        };
        match self.api.update_task(id, &TaskPatch::completion(!current)).await {
            Ok(task) => {
                self.tasks.dispatch(TaskAction::UpdateTask(task));
                Ok(())
            }
            Err(err) => Err(self.task_failed(err, TOGGLE_FAILED)),
        }
    }

    /// Delete a task; with `delete_subtasks` false its sub-tasks are promoted
    pub async fn delete_task(&mut self, id: TaskId, delete_subtasks: bool) -> Result<(), ManagerError> {
        let keep_subtasks = !delete_subtasks;
        match self.api.delete_task(id, keep_subtasks).await {
            Ok(outcome) => {
                tracing::info!(task_id = id, keep_subtasks, "task deleted");
                self.tasks.dispatch(TaskAction::DeleteTask {
                    id,
                    keep_subtasks,
                    outcome,
                });
                Ok(())
            }
            Err(err) => Err(self.task_failed(err, DELETE_TASK_FAILED)),
        }
    }

    // ---- UI intents ----

    pub fn show_new_task_form(&mut self, parent: Option<TaskId>) {
        self.tasks.dispatch(TaskAction::ShowForm(parent));
    }

    pub fn edit_task(&mut self, id: TaskId) {
        self.tasks.dispatch(TaskAction::SetEditingTask(id));
    }

    pub fn cancel_form(&mut self) {
        self.tasks.dispatch(TaskAction::HideForm);
    }

    pub fn clear_error(&mut self) {
        self.tasks.dispatch(TaskAction::SetError(String::new()));
        self.organizers.dispatch(OrganizerAction::SetError(String::new()));
    }

    // ---- tags & categories ----

    pub async fn get_tags(&mut self) -> Result<(), ManagerError> {
        self.organizers.dispatch(OrganizerAction::SetLoading(true));
        match self.api.tags().await {
            Ok(tags) => {
                self.organizers.dispatch(OrganizerAction::SetTags(tags));
                Ok(())
            }
            Err(err) => Err(self.organizer_failed(err, LOAD_ORGANIZERS_FAILED)),
        }
    }

    pub async fn get_categories(&mut self) -> Result<(), ManagerError> {
        self.organizers.dispatch(OrganizerAction::SetLoading(true));
        match self.api.categories().await {
            Ok(categories) => {
                self.organizers.dispatch(OrganizerAction::SetCategories(categories));
                Ok(())
            }
            Err(err) => Err(self.organizer_failed(err, LOAD_ORGANIZERS_FAILED)),
        }
    }

    pub async fn create_tag(&mut self, name: &str) -> Result<Tag, ManagerError> {
        let input = TagInput {
            name: name.trim().to_string(),
        };
        match self.api.create_tag(&input).await {
            Ok(tag) => {
                self.organizers.dispatch(OrganizerAction::AddTag(tag.clone()));
                Ok(tag)
            }
            Err(err) => Err(self.organizer_failed(err, SAVE_ORGANIZER_FAILED)),
        }
    }

    pub async fn rename_tag(&mut self, id: TagId, name: &str) -> Result<(), ManagerError> {
        let input = TagInput {
            name: name.trim().to_string(),
        };
        match self.api.update_tag(id, &input).await {
            Ok(tag) => {
                self.organizers.dispatch(OrganizerAction::UpdateTag(tag));
                Ok(())
            }
            Err(err) => Err(self.organizer_failed(err, SAVE_ORGANIZER_FAILED)),
        }
    }

    pub async fn delete_tag(&mut self, id: TagId) -> Result<(), ManagerError> {
        match self.api.delete_tag(id).await {
            Ok(()) => {
                self.organizers.dispatch(OrganizerAction::RemoveTag(id));
                Ok(())
            }
            Err(err) => Err(self.organizer_failed(err, DELETE_ORGANIZER_FAILED)),
        }
    }

    pub async fn create_category(&mut self, input: &CategoryInput) -> Result<Category, ManagerError> {
        match self.api.create_category(input).await {
            Ok(category) => {
                self.organizers.dispatch(OrganizerAction::AddCategory(category.clone()));
                Ok(category)
            }
            Err(err) => Err(self.organizer_failed(err, SAVE_ORGANIZER_FAILED)),
        }
    }

    pub async fn update_category(&mut self, id: CategoryId, input: &CategoryInput) -> Result<(), ManagerError> {
        match self.api.update_category(id, input).await {
            Ok(category) => {
                self.organizers.dispatch(OrganizerAction::UpdateCategory(category));
                Ok(())
            }
            Err(err) => Err(self.organizer_failed(err, SAVE_ORGANIZER_FAILED)),
        }
    }

    pub async fn delete_category(&mut self, id: CategoryId) -> Result<(), ManagerError> {
        match self.api.delete_category(id).await {
            Ok(()) => {
                self.organizers.dispatch(OrganizerAction::RemoveCategory(id));
                Ok(())
            }
            Err(err) => Err(self.organizer_failed(err, DELETE_ORGANIZER_FAILED)),
        }
    }

    /// Tasks, tags and categories; every failure is already in the stores
    pub async fn load_all(&mut self) {
        let _ = self.reload().await;
        let _ = self.get_tags().await;
        let _ = self.get_categories().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ApiConfig;
    use serde_json::json;
    use wiremock::matchers::{body_json, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn manager(server: &MockServer) -> TaskManager {
        let config = ApiConfig {
            base_url: server.uri(),
            timeout_secs: 5,
        };
        TaskManager::new(ApiClient::new(&config, None).unwrap())
    }

    async fn mount_list(server: &MockServer) {
        Mock::given(method("GET"))
            .and(path("/tasks/"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": {
                    "tasks": {
                        "1": { "id": 1, "title": "Parent", "has_subtasks": true, "sub_tasks": [2] },
                        "2": { "id": 2, "title": "Child", "parent_task": 1 },
                        "3": { "id": 3, "title": "Done", "completed": true }
                    },
                    "total_count": 3, "parent_count": 2,
                    "incomplete_count": 1, "complete_count": 1,
                    "incomplete_tasks": [1], "complete_tasks": [3]
                }
            })))
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn get_tasks_fills_the_store() {
        let server = MockServer::start().await;
        mount_list(&server).await;
        let mut manager = manager(&server);
        assert!(manager.state().loading);

        manager.get_tasks(None).await.unwrap();
        let state = manager.state();
        assert!(!state.loading);
        assert_eq!(state.tasks.len(), 3);
        assert_eq!(state.parent_ids().collect::<Vec<_>>(), vec![1, 3]);
    }

    #[tokio::test]
    async fn failed_load_sets_user_message() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/tasks/"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let mut manager = manager(&server);
        assert!(manager.get_tasks(None).await.is_err());
        assert_eq!(manager.state().error, LOAD_TASKS_FAILED);
        assert!(!manager.state().loading);

        manager.clear_error();
        assert!(manager.state().error.is_empty());
    }

    #[tokio::test]
    async fn slow_server_times_out_as_load_failure() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/tasks/"))
            .respond_with(ResponseTemplate::new(200).set_delay(std::time::Duration::from_secs(3)))
            .mount(&server)
            .await;

        let config = ApiConfig {
            base_url: server.uri(),
            timeout_secs: 1,
        };
        let mut manager = TaskManager::new(ApiClient::new(&config, None).unwrap());

        let err = manager.get_tasks(None).await.unwrap_err();
        assert!(matches!(err, ManagerError::Api(ApiError::Timeout)), "got {:?}", err);
        assert_eq!(manager.state().error, LOAD_TASKS_FAILED);
        assert!(!manager.state().loading);
    }

    #[tokio::test]
    async fn toggle_sends_negated_flag_and_applies_reply() {
        let server = MockServer::start().await;
        mount_list(&server).await;
        Mock::given(method("PATCH"))
            .and(path("/tasks/1/"))
            .and(body_json(json!({ "completed": true })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": { "id": 1, "title": "Parent", "completed": true, "has_subtasks": true, "sub_tasks": [2] }
            })))
            .expect(1)
            .mount(&server)
            .await;

        let mut manager = manager(&server);
        manager.get_tasks(None).await.unwrap();
        manager.toggle_completion(1).await.unwrap();
        assert_eq!(manager.state().data.complete_tasks, vec![1, 3]);
        assert!(manager.state().data.incomplete_tasks.is_empty());
    }

    #[tokio::test]
    async fn toggle_failure_keeps_task_and_reports() {
        let server = MockServer::start().await;
        mount_list(&server).await;
        Mock::given(method("PATCH"))
            .respond_with(ResponseTemplate::new(502))
            .mount(&server)
            .await;

        let mut manager = manager(&server);
        manager.get_tasks(None).await.unwrap();
        assert!(manager.toggle_completion(1).await.is_err());
        assert_eq!(manager.state().error, TOGGLE_FAILED);
        assert!(!manager.state().task(1).unwrap().completed);
        assert!(matches!(
            manager.toggle_completion(42).await,
            Err(ManagerError::UnknownTask(42))
        ));
    }

    #[tokio::test]
    async fn delete_with_subtasks_discards_them() {
        let server = MockServer::start().await;
        mount_list(&server).await;
        Mock::given(method("DELETE"))
            .and(path("/tasks/1/"))
            .and(query_param("keep_subtasks", "false"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": { "deleted_subtasks": [2] }
            })))
            .expect(1)
            .mount(&server)
            .await;

        let mut manager = manager(&server);
        manager.get_tasks(None).await.unwrap();
        manager.delete_task(1, true).await.unwrap();
        let state = manager.state();
        assert!(state.task(1).is_none());
        assert!(state.task(2).is_none());
        assert_eq!(state.data.total_count, 1);
        assert_eq!(state.data.parent_count, 1);
    }

    #[tokio::test]
    async fn submit_form_creates_subtask_under_linking_parent() {
        let server = MockServer::start().await;
        mount_list(&server).await;
        Mock::given(method("POST"))
            .and(path("/tasks/"))
            .and(body_json(json!({ "title": "Second child", "completed": false, "parent_task": 1 })))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({
                "data": { "id": 4, "title": "Second child", "parent_task": 1 }
            })))
            .expect(1)
            .mount(&server)
            .await;

        let mut manager = manager(&server);
        manager.get_tasks(None).await.unwrap();
        manager.show_new_task_form(Some(1));
        let draft = TaskDraft {
            title: "Second child".into(),
            ..TaskDraft::default()
        };
        manager.submit_form(&draft).await.unwrap();

        let state = manager.state();
        assert!(!state.show_form);
        assert_eq!(state.task(1).unwrap().sub_tasks, vec![2, 4]);
        assert_eq!(state.data.total_count, 4);
    }

    #[tokio::test]
    async fn unchanged_edit_sends_nothing() {
        let server = MockServer::start().await;
        mount_list(&server).await;
        Mock::given(method("PATCH"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let mut manager = manager(&server);
        manager.get_tasks(None).await.unwrap();
        manager.edit_task(3);
        let draft = TaskDraft::from_task(manager.state().task(3).unwrap());
        manager.submit_form(&draft).await.unwrap();
        assert!(!manager.state().show_form);
    }

    #[tokio::test]
    async fn blank_title_never_reaches_the_server() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(201))
            .expect(0)
            .mount(&server)
            .await;

        let mut manager = manager(&server);
        manager.show_new_task_form(None);
        let result = manager.submit_form(&TaskDraft::default()).await;
        assert!(matches!(result, Err(ManagerError::Draft(DraftError::EmptyTitle))));
        assert_eq!(manager.state().error, "Title is required");
        assert!(manager.state().show_form);
    }

    #[tokio::test]
    async fn organizers_load_and_fail_separately() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/tags/"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": [{ "id": 2, "name": "work" }, { "id": 1, "name": "home" }]
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/categories/"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let mut manager = manager(&server);
        manager.get_tags().await.unwrap();
        assert!(manager.get_categories().await.is_err());
        let organizers = manager.organizers();
        assert_eq!(organizers.tags.iter().map(|t| t.id).collect::<Vec<_>>(), vec![1, 2]);
        assert_eq!(organizers.error, LOAD_ORGANIZERS_FAILED);
    }
}
