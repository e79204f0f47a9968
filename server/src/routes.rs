//! HTTP route handlers for the Todos server.
//!
//! This module maps form posts and page reads onto the list/todo store:
//!
//! - `GET /lists` - Overview of every list
//! - `POST /lists` - Create a list
//! - `GET /lists/{list_id}` - One list with its live todos
//! - `GET /lists/{list_id}/edit` - One list with its trash
//! - `POST /lists/{list_id}` - Rename a list
//! - `POST /lists/{list_id}/destroy` - Delete a list
//! - `POST /lists/{list_id}/todos` - Add a todo
//! - `POST /lists/{list_id}/todos/{todo_id}/{trash,restore,mark}` - Todo changes
//! - `POST /lists/{list_id}/complete` - Complete every live todo
//! - `POST /lists/{list_id}/emptytrash` - Purge trashed todos
//! - `GET /health` - Health check endpoint
//!
//! # Sessions
//!
//! Every request loads its [`Session`] from the `todos.session` cookie (or
//! starts an empty one), performs at most one mutation, and writes the
//! session back before responding. A fresh session that is still empty is
//! dropped instead, so visitors only get a cookie once there is state to keep.
//!
//! # Responses
//!
//! Pages are JSON view models. Successful form posts answer with a
//! `303 See Other` redirect. Requests sent by script
//! (`X-Requested-With: XMLHttpRequest`) get `204 No Content` for row removals
//! and `200` with a location body when the page should navigate.
//!
//! # Example
//!
//! ```rust,no_run
//! use todos_server::config::Config;
//! use todos_server::routes::{create_router, AppState};
//!
//! #[tokio::main]
//! async fn main() {
//!     let state = AppState::new(Config::default());
//!     let app = create_router(state);
//!
//!     let listener = tokio::net::TcpListener::bind("0.0.0.0:4567").await.unwrap();
//!     axum::serve(listener, app).await.unwrap();
//! }
//! ```

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Redirect, Response},
    routing::{get, post},
    Form, Json, Router,
};
use serde::{Deserialize, Serialize};
use tokio::time::Instant;
use tower_http::trace::TraceLayer;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::error::TodoError;
use crate::session::SessionStore;
use crate::store::Session;
use crate::types::{Flash, ListId, TodoId};
use crate::view::{project_lists, project_todos, ListSummary, TodoView};

// ============================================================================
// Constants
// ============================================================================

/// Name of the cookie carrying the session token.
pub const SESSION_COOKIE: &str = "todos.session";

/// Header set by scripts submitting forms in the background.
const HEADER_REQUESTED_WITH: &str = "x-requested-with";

/// Value of [`HEADER_REQUESTED_WITH`] for script-driven requests.
const XHR_REQUESTED_WITH: &str = "XMLHttpRequest";

/// Path of the lists overview.
const LISTS_PATH: &str = "/lists";

// ============================================================================
// Application State
// ============================================================================

/// Shared application state for all route handlers.
#[derive(Clone)]
pub struct AppState {
    /// Server configuration.
    pub config: Arc<Config>,

    /// Per-visitor list state.
    pub sessions: Arc<SessionStore>,

    /// Server start time for uptime calculation.
    pub start_time: Instant,
}

impl AppState {
    /// Creates application state with a session store sized from `config`.
    #[must_use]
    pub fn new(config: Config) -> Self {
        let sessions = SessionStore::new(config.session_store_config());
        Self::with_sessions(config, sessions)
    }

    /// Creates application state around an existing session store.
    #[must_use]
    pub fn with_sessions(config: Config, sessions: SessionStore) -> Self {
        Self {
            config: Arc::new(config),
            sessions: Arc::new(sessions),
            start_time: Instant::now(),
        }
    }
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("config", &self.config)
            .field("sessions", &self.sessions)
            .field("start_time", &self.start_time)
            .finish()
    }
}

// ============================================================================
// Router
// ============================================================================

/// Creates the application router with all routes configured.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(get_root))
        .route("/lists", get(get_lists).post(post_lists))
        .route("/lists/{list_id}", get(get_list).post(post_list))
        .route("/lists/{list_id}/edit", get(get_edit_list))
        .route("/lists/{list_id}/destroy", post(post_destroy_list))
        .route("/lists/{list_id}/todos", post(post_todos))
        .route(
            "/lists/{list_id}/todos/{todo_id}/trash",
            post(post_trash_todo),
        )
        .route(
            "/lists/{list_id}/todos/{todo_id}/restore",
            post(post_restore_todo),
        )
        .route("/lists/{list_id}/todos/{todo_id}/mark", post(post_mark_todo))
        .route("/lists/{list_id}/complete", post(post_complete_all))
        .route("/lists/{list_id}/emptytrash", post(post_empty_trash))
        .route("/health", get(get_health))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// ============================================================================
// Error Response Types
// ============================================================================

/// JSON error response body.
#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    code: Option<String>,
}

impl ErrorResponse {
    fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            code: None,
        }
    }

    fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }
}

impl From<&TodoError> for ErrorResponse {
    fn from(err: &TodoError) -> Self {
        Self::new(err.to_string()).with_code(err.code())
    }
}

// ============================================================================
// Session Plumbing
// ============================================================================

/// The session a request works on, plus how to hand it back.
struct SessionContext {
    token: String,
    session: Session,
    is_new: bool,
}

impl SessionContext {
    /// Loads the session named by the request cookie, or starts an empty one
    /// under a fresh token when the cookie is absent, unknown, or expired.
    fn open(state: &AppState, headers: &HeaderMap) -> Self {
        if let Some(token) = session_token(headers) {
            if let Some(session) = state.sessions.get(token) {
                return Self {
                    token: token.to_string(),
                    session,
                    is_new: false,
                };
            }
            debug!("Session cookie did not match a live session");
        }

        Self {
            token: SessionStore::generate_token(),
            session: Session::new(),
            is_new: true,
        }
    }

    /// Writes the session back and attaches the cookie for new sessions.
    ///
    /// A new session with no lists and no pending flash is not stored and
    /// gets no cookie.
    fn commit(self, state: &AppState, mut response: Response) -> Response {
        if self.is_new && self.session == Session::default() {
            return response;
        }

        if let Err(err) = state.sessions.set(&self.token, self.session) {
            warn!(error = %err, "Failed to store session");
            return (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(ErrorResponse::new("session store unavailable").with_code("session_capacity")),
            )
                .into_response();
        }

        if self.is_new {
            match HeaderValue::from_str(&session_cookie(&self.token, state.config.secure_cookie)) {
                Ok(value) => {
                    response.headers_mut().append(header::SET_COOKIE, value);
                }
                Err(err) => warn!(error = %err, "Failed to build session cookie"),
            }
        }

        response
    }

    /// Records a success flash and redirects.
    fn redirect_with_success(
        mut self,
        state: &AppState,
        message: impl Into<String>,
        to: &str,
    ) -> Response {
        self.session.set_flash(Flash::success(message));
        self.commit(state, Redirect::to(to).into_response())
    }

    /// Answers a failed validation or lookup without mutating anything.
    ///
    /// Validation errors come back as `422` so the form can be re-presented.
    /// A missing list or todo sends plain form posts somewhere that still
    /// exists, with an error flash; script requests get `404`.
    fn reject(mut self, state: &AppState, headers: &HeaderMap, err: TodoError) -> Response {
        if err.is_validation() {
            debug!(code = err.code(), "Rejected invalid name");
            let response =
                (StatusCode::UNPROCESSABLE_ENTITY, Json(ErrorResponse::from(&err))).into_response();
            return self.commit(state, response);
        }

        info!(code = err.code(), "Lookup failed");
        if is_xhr(headers) {
            let response = (StatusCode::NOT_FOUND, Json(ErrorResponse::from(&err))).into_response();
            return self.commit(state, response);
        }

        let to = match err {
            TodoError::TodoNotFound { list_id, .. } => list_path(list_id),
            _ => LISTS_PATH.to_string(),
        };
        self.session.set_flash(Flash::error(err.to_string()));
        self.commit(state, Redirect::to(&to).into_response())
    }
}

/// Extracts the session token from the `Cookie` header, if present.
fn session_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|cookies| cookies.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == SESSION_COOKIE)
        .map(|(_, token)| token)
        .filter(|token| !token.is_empty())
}

/// Builds the `Set-Cookie` value for a session token.
fn session_cookie(token: &str, secure: bool) -> String {
    let mut cookie = format!("{SESSION_COOKIE}={token}; Path=/; HttpOnly; SameSite=Lax");
    if secure {
        cookie.push_str("; Secure");
    }
    cookie
}

/// Returns `true` if the request was sent by script rather than a plain form.
fn is_xhr(headers: &HeaderMap) -> bool {
    headers
        .get(HEADER_REQUESTED_WITH)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v == XHR_REQUESTED_WITH)
}

fn list_path(list_id: ListId) -> String {
    format!("{LISTS_PATH}/{list_id}")
}

// ============================================================================
// Request and Page Types
// ============================================================================

/// Form body carrying a list name.
#[derive(Debug, Deserialize)]
pub struct ListNameForm {
    pub list_name: String,
}

/// Form body carrying a todo name.
#[derive(Debug, Deserialize)]
pub struct TodoForm {
    pub todo: String,
}

/// Form body for marking a todo; `completed` is the string `"true"` or not.
#[derive(Debug, Deserialize)]
pub struct MarkForm {
    #[serde(default)]
    pub completed: String,
}

/// Body of `GET /lists`.
#[derive(Debug, Serialize, Deserialize)]
pub struct ListsPage {
    pub lists: Vec<ListSummaryBody>,
    pub flash: Option<Flash>,
}

/// Wire form of a [`ListSummary`].
#[derive(Debug, Serialize, Deserialize)]
pub struct ListSummaryBody {
    pub name: String,
    pub id: ListId,
    pub remaining_count: usize,
    pub total_count: usize,
    pub is_complete: bool,
    #[serde(default)]
    pub status_tag: Option<String>,
}

impl From<ListSummary> for ListSummaryBody {
    fn from(summary: ListSummary) -> Self {
        Self {
            name: summary.name,
            id: summary.id,
            remaining_count: summary.remaining_count,
            total_count: summary.total_count,
            is_complete: summary.is_complete,
            status_tag: summary.status_tag.map(|tag| tag.as_str().to_string()),
        }
    }
}

/// Wire form of a [`TodoView`].
#[derive(Debug, Serialize, Deserialize)]
pub struct TodoBody {
    pub name: String,
    pub id: TodoId,
    pub completed: bool,
    #[serde(default)]
    pub status_tag: Option<String>,
}

impl From<TodoView> for TodoBody {
    fn from(view: TodoView) -> Self {
        Self {
            name: view.name,
            id: view.id,
            completed: view.completed,
            status_tag: view.status_tag.map(|tag| tag.as_str().to_string()),
        }
    }
}

/// Body of `GET /lists/{list_id}`.
#[derive(Debug, Serialize, Deserialize)]
pub struct ListPage {
    pub id: ListId,
    pub name: String,
    pub is_complete: bool,
    pub todos: Vec<TodoBody>,
    pub trashed_count: usize,
    pub flash: Option<Flash>,
}

/// Body of `GET /lists/{list_id}/edit`.
#[derive(Debug, Serialize, Deserialize)]
pub struct EditListPage {
    pub id: ListId,
    pub name: String,
    pub trashed: Vec<TodoBody>,
    pub flash: Option<Flash>,
}

// ============================================================================
// Pages
// ============================================================================

/// GET / - Redirects to the lists overview.
async fn get_root() -> Redirect {
    Redirect::to(LISTS_PATH)
}

/// GET /lists - Every list, incomplete ones first.
async fn get_lists(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let mut ctx = SessionContext::open(&state, &headers);

    let page = ListsPage {
        lists: project_lists(ctx.session.lists())
            .into_iter()
            .map(ListSummaryBody::from)
            .collect(),
        flash: ctx.session.take_flash(),
    };

    ctx.commit(&state, Json(page).into_response())
}

/// GET /lists/{list_id} - One list with its live todos.
async fn get_list(
    State(state): State<AppState>,
    Path(list_id): Path<ListId>,
    headers: HeaderMap,
) -> Response {
    let mut ctx = SessionContext::open(&state, &headers);

    let list = match ctx.session.find_list(list_id) {
        Ok(list) => list,
        Err(err) => return ctx.reject(&state, &headers, err),
    };
    let mut page = ListPage {
        id: list.id,
        name: list.name.clone(),
        is_complete: list.is_complete(),
        todos: project_todos(list, false)
            .into_iter()
            .map(TodoBody::from)
            .collect(),
        trashed_count: list.trashed_count(),
        flash: None,
    };
    page.flash = ctx.session.take_flash();

    ctx.commit(&state, Json(page).into_response())
}

/// GET /lists/{list_id}/edit - One list with its trashed todos.
async fn get_edit_list(
    State(state): State<AppState>,
    Path(list_id): Path<ListId>,
    headers: HeaderMap,
) -> Response {
    let mut ctx = SessionContext::open(&state, &headers);

    let list = match ctx.session.find_list(list_id) {
        Ok(list) => list,
        Err(err) => return ctx.reject(&state, &headers, err),
    };
    let mut page = EditListPage {
        id: list.id,
        name: list.name.clone(),
        trashed: project_todos(list, true)
            .into_iter()
            .map(TodoBody::from)
            .collect(),
        flash: None,
    };
    page.flash = ctx.session.take_flash();

    ctx.commit(&state, Json(page).into_response())
}

// ============================================================================
// List Mutations
// ============================================================================

/// POST /lists - Create a list.
///
/// # Responses
///
/// - `303 See Other` to `/lists` on success
/// - `422 Unprocessable Entity` for an invalid or duplicate name
async fn post_lists(
    State(state): State<AppState>,
    headers: HeaderMap,
    Form(form): Form<ListNameForm>,
) -> Response {
    let mut ctx = SessionContext::open(&state, &headers);

    match ctx.session.create_list(form.list_name.trim()) {
        Ok(list) => {
            info!(list_id = list.id, "List created");
            ctx.redirect_with_success(&state, "The list has been created.", LISTS_PATH)
        }
        Err(err) => ctx.reject(&state, &headers, err),
    }
}

/// POST /lists/{list_id} - Rename a list.
async fn post_list(
    State(state): State<AppState>,
    Path(list_id): Path<ListId>,
    headers: HeaderMap,
    Form(form): Form<ListNameForm>,
) -> Response {
    let mut ctx = SessionContext::open(&state, &headers);

    match ctx.session.rename_list(list_id, form.list_name.trim()) {
        Ok(()) => {
            info!(list_id, "List renamed");
            ctx.redirect_with_success(
                &state,
                "The list name has been updated.",
                &list_path(list_id),
            )
        }
        Err(err) => ctx.reject(&state, &headers, err),
    }
}

/// POST /lists/{list_id}/destroy - Delete a list.
///
/// Deleting a list that does not exist is not an error.
///
/// # Responses
///
/// - script request: `200 OK` with body `/lists`
/// - form post: `303 See Other` to `/lists`
async fn post_destroy_list(
    State(state): State<AppState>,
    Path(list_id): Path<ListId>,
    headers: HeaderMap,
) -> Response {
    let mut ctx = SessionContext::open(&state, &headers);

    if ctx.session.delete_list(list_id).is_some() {
        info!(list_id, "List deleted");
    } else {
        debug!(list_id, "Delete requested for missing list");
    }

    if is_xhr(&headers) {
        ctx.commit(&state, LISTS_PATH.into_response())
    } else {
        ctx.redirect_with_success(&state, "The list has been deleted.", LISTS_PATH)
    }
}

/// POST /lists/{list_id}/complete - Complete every live todo.
async fn post_complete_all(
    State(state): State<AppState>,
    Path(list_id): Path<ListId>,
    headers: HeaderMap,
) -> Response {
    let mut ctx = SessionContext::open(&state, &headers);

    let changed = match ctx.session.find_list_mut(list_id) {
        Ok(list) => list.complete_all(),
        Err(err) => return ctx.reject(&state, &headers, err),
    };

    info!(list_id, changed, "All todos completed");
    ctx.redirect_with_success(
        &state,
        "All todos have been marked as completed.",
        &list_path(list_id),
    )
}

/// POST /lists/{list_id}/emptytrash - Permanently drop trashed todos.
async fn post_empty_trash(
    State(state): State<AppState>,
    Path(list_id): Path<ListId>,
    headers: HeaderMap,
) -> Response {
    let mut ctx = SessionContext::open(&state, &headers);

    let removed = match ctx.session.find_list_mut(list_id) {
        Ok(list) => list.empty_trash(),
        Err(err) => return ctx.reject(&state, &headers, err),
    };

    info!(list_id, removed, "Trash emptied");
    ctx.redirect_with_success(
        &state,
        "Trashed todos have been deleted forever.",
        &list_path(list_id),
    )
}

// ============================================================================
// Todo Mutations
// ============================================================================

/// POST /lists/{list_id}/todos - Add a todo.
async fn post_todos(
    State(state): State<AppState>,
    Path(list_id): Path<ListId>,
    headers: HeaderMap,
    Form(form): Form<TodoForm>,
) -> Response {
    let mut ctx = SessionContext::open(&state, &headers);

    let added = ctx
        .session
        .find_list_mut(list_id)
        .and_then(|list| list.add_todo(form.todo.trim()).map(|todo| todo.id));

    match added {
        Ok(todo_id) => {
            info!(list_id, todo_id, "Todo added");
            ctx.redirect_with_success(&state, "The todo has been added.", &list_path(list_id))
        }
        Err(err) => ctx.reject(&state, &headers, err),
    }
}

/// POST /lists/{list_id}/todos/{todo_id}/trash - Move a todo to the trash.
///
/// # Responses
///
/// - script request: `204 No Content`
/// - form post: `303 See Other` to the list
async fn post_trash_todo(
    State(state): State<AppState>,
    Path((list_id, todo_id)): Path<(ListId, TodoId)>,
    headers: HeaderMap,
) -> Response {
    let mut ctx = SessionContext::open(&state, &headers);

    let result = ctx
        .session
        .find_list_mut(list_id)
        .and_then(|list| list.trash_todo(todo_id));
    if let Err(err) = result {
        return ctx.reject(&state, &headers, err);
    }

    info!(list_id, todo_id, "Todo trashed");
    if is_xhr(&headers) {
        ctx.commit(&state, StatusCode::NO_CONTENT.into_response())
    } else {
        ctx.redirect_with_success(&state, "The todo has been trashed.", &list_path(list_id))
    }
}

/// POST /lists/{list_id}/todos/{todo_id}/restore - Take a todo out of the
/// trash.
///
/// # Responses
///
/// - script request: `204 No Content`
/// - form post: `303 See Other` to the list's edit page
async fn post_restore_todo(
    State(state): State<AppState>,
    Path((list_id, todo_id)): Path<(ListId, TodoId)>,
    headers: HeaderMap,
) -> Response {
    let mut ctx = SessionContext::open(&state, &headers);

    let result = ctx
        .session
        .find_list_mut(list_id)
        .and_then(|list| list.restore_todo(todo_id));
    if let Err(err) = result {
        return ctx.reject(&state, &headers, err);
    }

    info!(list_id, todo_id, "Todo restored");
    if is_xhr(&headers) {
        ctx.commit(&state, StatusCode::NO_CONTENT.into_response())
    } else {
        let to = format!("{}/edit", list_path(list_id));
        ctx.redirect_with_success(&state, "The todo has been restored.", &to)
    }
}

/// POST /lists/{list_id}/todos/{todo_id}/mark - Set a todo's completion.
async fn post_mark_todo(
    State(state): State<AppState>,
    Path((list_id, todo_id)): Path<(ListId, TodoId)>,
    headers: HeaderMap,
    Form(form): Form<MarkForm>,
) -> Response {
    let mut ctx = SessionContext::open(&state, &headers);
    let completed = form.completed == "true";

    let result = ctx
        .session
        .find_list_mut(list_id)
        .and_then(|list| list.mark_todo(todo_id, completed));
    if let Err(err) = result {
        return ctx.reject(&state, &headers, err);
    }

    info!(list_id, todo_id, completed, "Todo marked");
    let message = if completed {
        "The todo has been marked as completed."
    } else {
        "The todo has been marked as not completed."
    };
    ctx.redirect_with_success(&state, message, &list_path(list_id))
}

// ============================================================================
// GET /health - Health Check
// ============================================================================

/// Response body for health check endpoint.
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Server status (always "ok" if responding).
    pub status: String,

    /// Number of sessions currently held.
    pub sessions: usize,

    /// Server uptime in seconds.
    pub uptime_seconds: u64,
}

/// GET /health - Health check endpoint. Does not touch any session.
async fn get_health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        sessions: state.sessions.session_count(),
        uptime_seconds: state.start_time.elapsed().as_secs(),
    })
}

// ============================================================================
// Tests
// ============================================================================
