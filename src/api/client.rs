//! HTTP client for the task API.
//!
//! Every authenticated call goes through [`ApiClient::execute`]: one
//! attempt, and when the server rejects the access token (401 or 403) a
//! single refresh followed by a single replay. The replay is tracked by an
//! explicit [`RequestContext`] rather than by a flag on the request.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::api::error::ApiError;
use crate::api::session::Session;
use crate::config::ApiConfig;
use crate::draft::TaskPatch;
use crate::models::{
    Category, CategoryId, CategoryInput, DeleteResponse, Registration, Tag, TagId, TagInput, Task,
    TaskId, TaskListResponse, TokenPair,
};
use crate::view::SortRequest;

/// Per-call retry state
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RequestContext {
    pub retried: bool,
}

enum Attempt {
    Done { status: StatusCode, body: String },
    AuthExpired,
}

/// A request that can be replayed after a token refresh
#[derive(Debug, Clone)]
struct Request {
    method: Method,
    path: String,
    query: Vec<(&'static str, String)>,
    body: Option<serde_json::Value>,
}

impl Request {
    fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            body: None,
        }
    }

    fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    fn post(path: impl Into<String>, body: &impl Serialize) -> Result<Self, ApiError> {
        Self::new(Method::POST, path).json(body)
    }

    fn patch(path: impl Into<String>, body: &impl Serialize) -> Result<Self, ApiError> {
        Self::new(Method::PATCH, path).json(body)
    }

    fn json(mut self, body: &impl Serialize) -> Result<Self, ApiError> {
        self.body = Some(serde_json::to_value(body)?);
        Ok(self)
    }

    fn query(mut self, key: &'static str, value: impl ToString) -> Self {
        self.query.push((key, value.to_string()));
        self
    }
}

/// `{ "data": ..., "message": ... }`
#[derive(Deserialize)]
struct Envelope<T> {
    data: Option<T>,
    #[serde(default)]
    message: Option<String>,
}

/// `{ "message": ..., "errors": {...} }`, plus the `detail`/`error` keys the auth views use
#[derive(Deserialize, Default)]
struct ErrorBody {
    message: Option<String>,
    detail: Option<String>,
    error: Option<String>,
    errors: Option<BTreeMap<String, serde_json::Value>>,
}

pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    session_path: Option<PathBuf>,
    session: Option<Session>,
}

impl ApiClient {
    /// Build a client; a stored session at `session_path` is picked up
    pub fn new(config: &ApiConfig, session_path: Option<PathBuf>) -> Result<Self, ApiError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(ApiError::Network)?;
        let session = session_path.as_deref().and_then(Session::load);
        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            session_path,
            session,
        })
    }

    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    pub fn is_logged_in(&self) -> bool {
        self.session.is_some()
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    fn persist(&self) -> Result<(), ApiError> {
        if let (Some(path), Some(session)) = (&self.session_path, &self.session) {
            session.save(path)?;
        }
        Ok(())
    }

    /// One try; an auth rejection is reported instead of read
    async fn attempt(&self, request: &Request) -> Result<Attempt, ApiError> {
        let mut builder = self.http.request(request.method.clone(), self.url(&request.path));
        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }
        if let Some(session) = &self.session {
            builder = builder.bearer_auth(&session.access);
        }

        let response = builder.send().await?;
        let status = response.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Ok(Attempt::AuthExpired);
        }
        let body = response.text().await?;
        Ok(Attempt::Done { status, body })
    }

    async fn execute(&mut self, request: Request) -> Result<(StatusCode, String), ApiError> {
        let mut ctx = RequestContext::default();
        loop {
            match self.attempt(&request).await? {
                Attempt::Done { status, body } => {
                    tracing::debug!(method = %request.method, path = %request.path, status = status.as_u16(), "api response");
                    return Ok((status, body));
                }
                Attempt::AuthExpired if !ctx.retried => {
                    ctx.retried = true;
                    tracing::info!(path = %request.path, "access token rejected, refreshing");
                    match self.refresh().await {
                        Ok(()) => continue,
                        Err(ApiError::NotLoggedIn) => return Err(ApiError::NotLoggedIn),
                        Err(err) => {
                            tracing::warn!("token refresh failed: {err}");
                            return Err(ApiError::Unauthorized);
                        }
                    }
                }
                Attempt::AuthExpired => {
                    tracing::warn!(path = %request.path, "still unauthorized after refresh");
                    return Err(ApiError::Unauthorized);
                }
            }
        }
    }

    async fn call<T: DeserializeOwned>(&mut self, request: Request) -> Result<Option<T>, ApiError> {
        let (status, body) = self.execute(request).await?;
        decode(status, &body)
    }

    async fn call_required<T: DeserializeOwned>(&mut self, request: Request) -> Result<T, ApiError> {
        self.call(request)
            .await?
            .ok_or_else(|| ApiError::Decode("response has no data".to_string()))
    }

    /// Unauthenticated POST with no refresh handling
    async fn post_public(&self, path: &str, body: &impl Serialize) -> Result<(StatusCode, String), ApiError> {
        let response = self.http.post(self.url(path)).json(body).send().await?;
        let status = response.status();
        let body = response.text().await?;
        Ok((status, body))
    }

    // ---- auth ----

    #[tracing::instrument(skip_all)]
    pub async fn login(&mut self, username: &str, password: &str) -> Result<&Session, ApiError> {
        let body = serde_json::json!({ "username": username, "password": password });
        let (status, text) = self.post_public("auth/", &body).await?;
        if status == StatusCode::UNAUTHORIZED {
            // bad credentials are a form error, not an expired session
            return Err(error_from(StatusCode::BAD_REQUEST, &text));
        }
        if !status.is_success() {
            return Err(error_from(status, &text));
        }

        let pair: TokenPair = serde_json::from_str(&text)?;
        let refresh = pair
            .refresh
            .ok_or_else(|| ApiError::Decode("login response has no refresh token".to_string()))?;
        tracing::info!(username, "logged in");
        let session = self.session.insert(Session {
            username: username.to_string(),
            access: pair.access,
            refresh,
        });
        if let Some(path) = &self.session_path {
            session.save(path)?;
        }
        Ok(session)
    }

    /// Trade the refresh token for a new access token and persist it
    #[tracing::instrument(skip_all)]
    pub async fn refresh(&mut self) -> Result<(), ApiError> {
        let Some(refresh) = self.session.as_ref().map(|s| s.refresh.clone()) else {
            return Err(ApiError::NotLoggedIn);
        };
        let (status, text) = self
            .post_public("auth/refresh/", &serde_json::json!({ "refresh": refresh }))
            .await?;
        if !status.is_success() {
            return Err(error_from(status, &text));
        }

        let pair: TokenPair = serde_json::from_str(&text)?;
        if let Some(session) = self.session.as_mut() {
            session.access = pair.access;
            if let Some(rotated) = pair.refresh {
                session.refresh = rotated;
            }
        }
        tracing::info!("access token refreshed");
        self.persist()
    }

    /// Tell the server, then forget the session whatever it answered
    #[tracing::instrument(skip_all)]
    pub async fn logout(&mut self) -> Result<(), ApiError> {
        if let Some(session) = &self.session {
            let body = serde_json::json!({ "refresh": session.refresh });
            match self.post_public("logout/", &body).await {
                Ok((status, _)) if status.is_success() => {}
                Ok((status, _)) => tracing::warn!(status = status.as_u16(), "logout rejected by server"),
                Err(err) => tracing::warn!("logout request failed: {err}"),
            }
        }
        self.session = None;
        if let Some(path) = &self.session_path {
            Session::clear(path)?;
        }
        Ok(())
    }

    #[tracing::instrument(skip_all)]
    pub async fn register(&self, registration: &Registration) -> Result<(), ApiError> {
        let (status, text) = self.post_public("register/", registration).await?;
        decode::<serde_json::Value>(status, &text).map(|_| ())
    }

    // ---- tasks ----

    #[tracing::instrument(skip_all)]
    pub async fn tasks(&mut self, sort: Option<SortRequest>) -> Result<TaskListResponse, ApiError> {
        let mut request = Request::get("tasks/");
        if let Some(sort) = sort {
            for (key, value) in sort.query() {
                request = request.query(key, value);
            }
        }
        self.call_required(request).await
    }

    pub async fn task(&mut self, id: TaskId) -> Result<Task, ApiError> {
        self.call_required(Request::get(format!("tasks/{}/", id))).await
    }

    pub async fn subtasks(&mut self, parent: TaskId) -> Result<Vec<Task>, ApiError> {
        self.call_required(Request::get(format!("tasks/{}/subtasks/", parent)))
            .await
    }

    pub async fn top_level_tasks(&mut self) -> Result<Vec<Task>, ApiError> {
        self.call_required(Request::get("tasks/top-level/")).await
    }

    #[tracing::instrument(skip_all)]
    pub async fn create_task(&mut self, payload: &TaskPatch) -> Result<Task, ApiError> {
        self.call_required(Request::post("tasks/", payload)?).await
    }

    #[tracing::instrument(skip_all, fields(task_id = id))]
    pub async fn update_task(&mut self, id: TaskId, patch: &TaskPatch) -> Result<Task, ApiError> {
        self.call_required(Request::patch(format!("tasks/{}/", id), patch)?)
            .await
    }

    /// A 204 or an empty body decodes to the default response
    #[tracing::instrument(skip_all, fields(task_id = id))]
    pub async fn delete_task(&mut self, id: TaskId, keep_subtasks: bool) -> Result<DeleteResponse, ApiError> {
        let request = Request::delete(format!("tasks/{}/", id)).query("keep_subtasks", keep_subtasks);
        Ok(self.call(request).await?.unwrap_or_default())
    }

    // ---- tags & categories ----

    pub async fn tags(&mut self) -> Result<Vec<Tag>, ApiError> {
        self.call_required(Request::get("tags/")).await
    }

    pub async fn create_tag(&mut self, input: &TagInput) -> Result<Tag, ApiError> {
        self.call_required(Request::post("tags/", input)?).await
    }

    pub async fn update_tag(&mut self, id: TagId, input: &TagInput) -> Result<Tag, ApiError> {
        self.call_required(Request::patch(format!("tags/{}/", id), input)?)
            .await
    }

    pub async fn delete_tag(&mut self, id: TagId) -> Result<(), ApiError> {
        self.call::<serde_json::Value>(Request::delete(format!("tags/{}/", id)))
            .await
            .map(|_| ())
    }

    pub async fn categories(&mut self) -> Result<Vec<Category>, ApiError> {
        self.call_required(Request::get("categories/")).await
    }

    pub async fn create_category(&mut self, input: &CategoryInput) -> Result<Category, ApiError> {
        self.call_required(Request::post("categories/", input)?).await
    }

    pub async fn update_category(&mut self, id: CategoryId, input: &CategoryInput) -> Result<Category, ApiError> {
        self.call_required(Request::patch(format!("categories/{}/", id), input)?)
            .await
    }

    pub async fn delete_category(&mut self, id: CategoryId) -> Result<(), ApiError> {
        self.call::<serde_json::Value>(Request::delete(format!("categories/{}/", id)))
            .await
            .map(|_| ())
    }
}

fn decode<T: DeserializeOwned>(status: StatusCode, body: &str) -> Result<Option<T>, ApiError> {
    if !status.is_success() {
        return Err(error_from(status, body));
    }
    if body.trim().is_empty() {
        return Ok(None);
    }
    let envelope: Envelope<T> = serde_json::from_str(body)?;
    if let Some(message) = &envelope.message {
        tracing::trace!(%message, "api message");
    }
    Ok(envelope.data)
}

fn error_from(status: StatusCode, body: &str) -> ApiError {
    let parsed: ErrorBody = serde_json::from_str(body).unwrap_or_default();
    let message = parsed
        .message
        .or(parsed.detail)
        .or(parsed.error)
        .unwrap_or_else(|| status.canonical_reason().unwrap_or("request failed").to_string());

    if status == StatusCode::BAD_REQUEST {
        ApiError::Validation {
            message,
            fields: parsed.errors.map(flatten_field_errors).unwrap_or_default(),
        }
    } else {
        ApiError::Server {
            status: status.as_u16(),
            message,
        }
    }
}

fn flatten_field_errors(errors: BTreeMap<String, serde_json::Value>) -> BTreeMap<String, Vec<String>> {
    errors
        .into_iter()
        .map(|(field, value)| {
            let messages = match value {
                serde_json::Value::Array(items) => items.into_iter().map(value_text).collect(),
                other => vec![value_text(other)],
            };
            (field, messages)
        })
        .collect()
}

fn value_text(value: serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s,
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::session::session_file_path;
    use serde_json::json;
    use tempfile::TempDir;
    use wiremock::matchers::{body_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config(server: &MockServer) -> ApiConfig {
        ApiConfig {
            base_url: format!("{}/api/", server.uri()),
            timeout_secs: 5,
        }
    }

    fn logged_in(dir: &TempDir, access: &str) -> PathBuf {
        let path = session_file_path(dir.path());
        Session {
            username: "ada".into(),
            access: access.into(),
            refresh: "ref-1".into(),
        }
        .save(&path)
        .unwrap();
        path
    }

    fn task_json(id: i64, title: &str) -> serde_json::Value {
        json!({ "id": id, "title": title, "completed": false, "tags": [] })
    }

    #[tokio::test]
    async fn unwraps_data_envelope_and_sends_bearer() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/tasks/"))
            .and(header("authorization", "Bearer acc-1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": {
                    "tasks": { "1": task_json(1, "A") },
                    "total_count": 1, "parent_count": 1,
                    "incomplete_count": 1, "complete_count": 0,
                    "incomplete_tasks": [1], "complete_tasks": []
                },
                "message": "Tasks retrieved successfully"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let dir = TempDir::new().unwrap();
        let mut client = ApiClient::new(&config(&server), Some(logged_in(&dir, "acc-1"))).unwrap();
        let list = client.tasks(None).await.unwrap();
        assert_eq!(list.data.incomplete_tasks, vec![1]);
        assert_eq!(list.tasks[&1].title, "A");
    }

    #[tokio::test]
    async fn sends_sort_parameters() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/tasks/"))
            .and(query_param("sort_by", "estimated_time"))
            .and(query_param("order", "desc"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "data": {} })))
            .expect(1)
            .mount(&server)
            .await;

        let mut client = ApiClient::new(&config(&server), None).unwrap();
        let sort = SortRequest::new(crate::view::SortKey::EstimatedTime, crate::view::SortOrder::Desc);
        let list = client.tasks(Some(sort)).await.unwrap();
        assert!(list.tasks.is_empty());
    }

    #[tokio::test]
    async fn refreshes_once_and_replays() {
        let server = MockServer::start().await;
        Mock::given(method("PATCH"))
            .and(path("/api/tasks/4/"))
            .and(header("authorization", "Bearer stale"))
            .respond_with(ResponseTemplate::new(401))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/api/auth/refresh/"))
            .and(body_json(json!({ "refresh": "ref-1" })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "access": "fresh" })))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("PATCH"))
            .and(path("/api/tasks/4/"))
            .and(header("authorization", "Bearer fresh"))
            .and(body_json(json!({ "completed": true })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": { "id": 4, "title": "Done", "completed": true }
            })))
            .expect(1)
            .mount(&server)
            .await;

        let dir = TempDir::new().unwrap();
        let session_path = logged_in(&dir, "stale");
        let mut client = ApiClient::new(&config(&server), Some(session_path.clone())).unwrap();
        let task = client.update_task(4, &TaskPatch::completion(true)).await.unwrap();
        assert!(task.completed);

        let stored = Session::load(&session_path).unwrap();
        assert_eq!(stored.access, "fresh");
        assert_eq!(stored.refresh, "ref-1");
    }

    #[tokio::test]
    async fn second_rejection_is_terminal() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/tags/"))
            .respond_with(ResponseTemplate::new(403))
            .expect(2)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/api/auth/refresh/"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "access": "fresh" })))
            .expect(1)
            .mount(&server)
            .await;

        let dir = TempDir::new().unwrap();
        let mut client = ApiClient::new(&config(&server), Some(logged_in(&dir, "stale"))).unwrap();
        let err = client.tags().await.unwrap_err();
        assert!(matches!(err, ApiError::Unauthorized));
    }

    #[tokio::test]
    async fn failed_refresh_is_unauthorized() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/categories/"))
            .respond_with(ResponseTemplate::new(401))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/api/auth/refresh/"))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({ "error": "Token is invalid or expired" })))
            .expect(1)
            .mount(&server)
            .await;

        let dir = TempDir::new().unwrap();
        let mut client = ApiClient::new(&config(&server), Some(logged_in(&dir, "stale"))).unwrap();
        let err = client.categories().await.unwrap_err();
        assert!(matches!(err, ApiError::Unauthorized));
    }

    #[tokio::test]
    async fn rejection_without_session_is_not_logged_in() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/tasks/"))
            .respond_with(ResponseTemplate::new(401))
            .expect(1)
            .mount(&server)
            .await;

        let mut client = ApiClient::new(&config(&server), None).unwrap();
        assert!(matches!(client.tasks(None).await, Err(ApiError::NotLoggedIn)));
    }

    #[tokio::test]
    async fn validation_errors_carry_field_messages() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/tasks/"))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({
                "message": "Failed to create task",
                "errors": { "title": ["This field may not be blank."] }
            })))
            .mount(&server)
            .await;

        let mut client = ApiClient::new(&config(&server), None).unwrap();
        let err = client.create_task(&TaskPatch::default()).await.unwrap_err();
        assert_eq!(err.user_message("fallback"), "Failed to create task");
        assert_eq!(err.field_errors(), vec!["title: This field may not be blank."]);
    }

    #[tokio::test]
    async fn server_errors_keep_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/tasks/9/"))
            .respond_with(ResponseTemplate::new(404).set_body_json(json!({ "message": "Task not found" })))
            .mount(&server)
            .await;

        let mut client = ApiClient::new(&config(&server), None).unwrap();
        match client.task(9).await {
            Err(ApiError::Server { status, message }) => {
                assert_eq!(status, 404);
                assert_eq!(message, "Task not found");
            }
            other => panic!("unexpected: {:?}", other.map(|t| t.id)),
        }
    }

    #[tokio::test]
    async fn delete_passes_keep_flag_and_accepts_no_content() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path("/api/tasks/3/"))
            .and(query_param("keep_subtasks", "false"))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        let mut client = ApiClient::new(&config(&server), None).unwrap();
        let outcome = client.delete_task(3, false).await.unwrap();
        assert_eq!(outcome, DeleteResponse::default());
    }

    #[tokio::test]
    async fn login_stores_session_and_logout_clears_it() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/auth/"))
            .and(body_json(json!({ "username": "ada", "password": "pw" })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "access": "a1", "refresh": "r1" })))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/api/logout/"))
            .respond_with(ResponseTemplate::new(500))
            .expect(1)
            .mount(&server)
            .await;

        let dir = TempDir::new().unwrap();
        let session_path = session_file_path(dir.path());
        let mut client = ApiClient::new(&config(&server), Some(session_path.clone())).unwrap();
        assert!(!client.is_logged_in());

        client.login("ada", "pw").await.unwrap();
        assert_eq!(Session::load(&session_path).map(|s| s.refresh), Some("r1".to_string()));

        client.logout().await.unwrap();
        assert!(!client.is_logged_in());
        assert!(!session_path.exists());
    }

    #[tokio::test]
    async fn bad_credentials_are_a_validation_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/auth/"))
            .respond_with(ResponseTemplate::new(401).set_body_json(json!({
                "detail": "No active account found with the given credentials"
            })))
            .mount(&server)
            .await;

        let mut client = ApiClient::new(&config(&server), None).unwrap();
        let err = client.login("ada", "nope").await.unwrap_err();
        assert_eq!(
            err.user_message("Login failed"),
            "No active account found with the given credentials"
        );
    }
}
