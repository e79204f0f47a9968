//! End-to-end list lifecycle through the HTTP router.
//!
//! These tests drive the router in-process the way a browser would: the first
//! response that leaves state behind hands out a session cookie, and every
//! later request sends it back.
//! They verify that:
//! - Lists and todos survive across requests within one session
//! - Sessions are isolated from one another
//! - Ids are never reused after deletion

use axum::body::Body;
use axum::http::{header, Request, Response, StatusCode};
use axum::Router;
use serde::de::DeserializeOwned;
use tower::ServiceExt;

use todos_server::config::Config;
use todos_server::routes::{create_router, AppState, EditListPage, ListPage, ListsPage};
use todos_server::types::{Flash, FlashLevel};

// ============================================================================
// Test Helpers
// ============================================================================

/// A browser stand-in that remembers its session cookie.
struct Client {
    app: Router,
    cookie: Option<String>,
}

impl Client {
    fn new(app: Router) -> Self {
        Self { app, cookie: None }
    }

    async fn send(&mut self, builder: axum::http::request::Builder, body: Body) -> Response<Body> {
        let builder = match &self.cookie {
            Some(cookie) => builder.header(header::COOKIE, cookie),
            None => builder,
        };
        let response = self
            .app
            .clone()
            .oneshot(builder.body(body).unwrap())
            .await
            .unwrap();

        if let Some(set_cookie) = response.headers().get(header::SET_COOKIE) {
            let pair = set_cookie.to_str().unwrap().split(';').next().unwrap();
            self.cookie = Some(pair.to_string());
        }
        response
    }

    async fn get(&mut self, uri: &str) -> Response<Body> {
        self.send(Request::builder().uri(uri), Body::empty()).await
    }

    async fn post(&mut self, uri: &str, form: &str) -> Response<Body> {
        let builder = Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded");
        self.send(builder, Body::from(form.to_string())).await
    }

    async fn xhr_post(&mut self, uri: &str) -> Response<Body> {
        let builder = Request::builder()
            .method("POST")
            .uri(uri)
            .header("X-Requested-With", "XMLHttpRequest");
        self.send(builder, Body::empty()).await
    }

    async fn page<T: DeserializeOwned>(&mut self, uri: &str) -> T {
        let response = self.get(uri).await;
        assert_eq!(response.status(), StatusCode::OK, "GET {uri}");
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&body).unwrap()
    }
}

fn location(response: &Response<Body>) -> &str {
    response
        .headers()
        .get(header::LOCATION)
        .unwrap()
        .to_str()
        .unwrap()
}

fn app() -> Router {
    create_router(AppState::new(Config::default()))
}

// ============================================================================
// Test Cases
// ============================================================================

#[tokio::test]
async fn full_list_lifecycle() {
    let mut client = Client::new(app());

    let lists: ListsPage = client.page("/lists").await;
    assert!(lists.lists.is_empty());
    assert!(client.cookie.is_none(), "an empty visit should not set a cookie");

    // Create a list.
    let response = client.post("/lists", "list_name=Groceries").await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/lists");
    assert!(client.cookie.is_some(), "creating a list should set a cookie");

    let lists: ListsPage = client.page("/lists").await;
    assert_eq!(lists.lists.len(), 1);
    assert_eq!(lists.lists[0].id, 1);
    assert_eq!(lists.flash, Some(Flash::success("The list has been created.")));

    // Add todos and complete one.
    client.post("/lists/1/todos", "todo=Milk").await;
    client.post("/lists/1/todos", "todo=Eggs").await;
    let response = client.post("/lists/1/todos/1/mark", "completed=true").await;
    assert_eq!(location(&response), "/lists/1");

    let page: ListPage = client.page("/lists/1").await;
    let names: Vec<_> = page.todos.iter().map(|t| t.name.as_str()).collect();
    assert_eq!(names, vec!["Eggs", "Milk"]);
    assert!(!page.is_complete);
    assert_eq!(
        page.flash.map(|f| f.message),
        Some("The todo has been marked as completed.".to_string())
    );

    // Trash a todo from script, then look at the edit page.
    let response = client.xhr_post("/lists/1/todos/2/trash").await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let page: ListPage = client.page("/lists/1").await;
    assert_eq!(page.trashed_count, 1);
    assert!(page.is_complete, "only completed todos remain outside the trash");

    let edit: EditListPage = client.page("/lists/1/edit").await;
    assert_eq!(edit.trashed.len(), 1);
    assert_eq!(edit.trashed[0].name, "Eggs");

    // Restore, complete everything, then trash and purge.
    let response = client.post("/lists/1/todos/2/restore", "").await;
    assert_eq!(location(&response), "/lists/1/edit");
    client.post("/lists/1/complete", "").await;

    let lists: ListsPage = client.page("/lists").await;
    assert!(lists.lists[0].is_complete);
    assert_eq!(lists.lists[0].status_tag.as_deref(), Some("complete"));

    client.post("/lists/1/todos/1/trash", "").await;
    let response = client.post("/lists/1/emptytrash", "").await;
    assert_eq!(location(&response), "/lists/1");
    let page: ListPage = client.page("/lists/1").await;
    assert_eq!(page.trashed_count, 0);
    assert_eq!(page.todos.len(), 1);

    // Rename, then delete by script.
    let response = client.post("/lists/1", "list_name=Market").await;
    assert_eq!(location(&response), "/lists/1");
    let page: ListPage = client.page("/lists/1").await;
    assert_eq!(page.name, "Market");

    let response = client.xhr_post("/lists/1/destroy").await;
    assert_eq!(response.status(), StatusCode::OK);
    let lists: ListsPage = client.page("/lists").await;
    assert!(lists.lists.is_empty());
}

#[tokio::test]
async fn list_ids_are_not_reused_after_deletion() {
    let mut client = Client::new(app());

    client.post("/lists", "list_name=A").await;
    client.post("/lists", "list_name=B").await;
    client.post("/lists/2/destroy", "").await;
    client.post("/lists", "list_name=C").await;

    let lists: ListsPage = client.page("/lists").await;
    let ids: Vec<_> = lists.lists.iter().map(|l| l.id).collect();
    assert_eq!(ids, vec![1, 3]);
}

#[tokio::test]
async fn sessions_are_isolated() {
    let app = app();
    let mut alice = Client::new(app.clone());
    let mut bob = Client::new(app);

    alice.post("/lists", "list_name=Groceries").await;
    let bobs: ListsPage = bob.page("/lists").await;
    assert!(bobs.lists.is_empty());

    // Same name in another session is not a duplicate.
    let response = bob.post("/lists", "list_name=Groceries").await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_ne!(alice.cookie, bob.cookie);
}

#[tokio::test]
async fn missing_list_sets_error_flash() {
    let mut client = Client::new(app());

    let response = client.get("/lists/5").await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/lists");

    let lists: ListsPage = client.page("/lists").await;
    let flash = lists.flash.unwrap();
    assert_eq!(flash.level, FlashLevel::Error);
    assert_eq!(flash.message, "The specified list was not found.");
}

#[tokio::test]
async fn rejected_names_leave_state_unchanged() {
    let mut client = Client::new(app());
    client.post("/lists", "list_name=Groceries").await;
    client.post("/lists", "list_name=Chores").await;

    let response = client.post("/lists/2", "list_name=Groceries").await;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let long = format!("list_name={}", "a".repeat(101));
    let response = client.post("/lists", &long).await;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let lists: ListsPage = client.page("/lists").await;
    let names: Vec<_> = lists.lists.iter().map(|l| l.name.as_str()).collect();
    assert_eq!(names, vec!["Groceries", "Chores"]);
}
