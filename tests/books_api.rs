//! End-to-end behaviour of the books API through the full router stack.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use axum::{
    body::{to_bytes, Body},
    http::{header, Request, StatusCode},
    Router,
};
use bookshelf::books::{BookStore, BooksModule, Clock, IdGenerator};
use bookshelf_kernel::{settings::Settings, ModuleRegistry};
use serde_json::{json, Value};
use time::{macros::datetime, Duration, OffsetDateTime};
use tower::ServiceExt;

#[derive(Default)]
struct SequentialIds(AtomicUsize);

impl IdGenerator for SequentialIds {
    fn generate(&self) -> String {
        format!("id-{}", self.0.fetch_add(1, Ordering::SeqCst) + 1)
    }
}

struct TickingClock(Mutex<OffsetDateTime>);

impl Clock for TickingClock {
    fn now(&self) -> OffsetDateTime {
        let mut now = self.0.lock().unwrap();
        let current = *now;
        *now += Duration::minutes(1);
        current
    }
}

struct TestApp {
    router: Router,
    store: Arc<BookStore>,
}

impl TestApp {
    fn new() -> Self {
        let store = Arc::new(BookStore::with_collaborators(
            SequentialIds::default(),
            TickingClock(Mutex::new(datetime!(2024-06-01 12:00 UTC))),
        ));

        let mut registry = ModuleRegistry::new();
        registry.register(Arc::new(BooksModule::with_store(store.clone())));
        let router = bookshelf_http::build_router(&registry, &Settings::default());

        Self { router, store }
    }

    async fn send(&self, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let body = match body {
            Some(value) => Body::from(value.to_string()),
            None => Body::empty(),
        };
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .body(body)
            .unwrap();

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            "application/json; charset=utf-8"
        );
        assert_eq!(response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");

        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }

    async fn create(&self, book: Value) -> String {
        let (status, body) = self.send("POST", "/books", Some(book)).await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        body["data"]["bookId"].as_str().unwrap().to_string()
    }
}

fn full_book(name: &str, page_count: u32, read_page: u32, reading: bool) -> Value {
    json!({
        "name": name,
        "year": 2010,
        "author": "John Doe",
        "summary": "Lorem ipsum dolor sit amet",
        "publisher": "Dicoding Indonesia",
        "pageCount": page_count,
        "readPage": read_page,
        "reading": reading
    })
}

#[tokio::test]
async fn create_then_read_returns_input_plus_generated_fields() {
    let app = TestApp::new();
    let id = app.create(full_book("Dune", 412, 100, true)).await;

    let (status, body) = app.send("GET", &format!("/books/{id}"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "success");

    let book = &body["data"]["book"];
    assert_eq!(
        book,
        &json!({
            "id": id,
            "name": "Dune",
            "year": 2010,
            "author": "John Doe",
            "summary": "Lorem ipsum dolor sit amet",
            "publisher": "Dicoding Indonesia",
            "pageCount": 412,
            "readPage": 100,
            "finished": false,
            "reading": true,
            "insertedAt": "2024-06-01T12:00:00Z",
            "updatedAt": "2024-06-01T12:00:00Z"
        })
    );
}

#[tokio::test]
async fn invalid_creates_do_not_grow_the_store() {
    let app = TestApp::new();

    let (status, body) = app
        .send("POST", "/books", Some(full_book("", 10, 0, false)))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["status"], "fail");

    let (status, _) = app
        .send("POST", "/books", Some(full_book("Dune", 10, 11, false)))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    assert!(app.store.is_empty());
}

#[tokio::test]
async fn malformed_json_is_rejected_without_crashing() {
    let app = TestApp::new();
    let request = Request::builder()
        .method("POST")
        .uri("/books")
        .body(Body::from("{\"name\": "))
        .unwrap();

    let response = app.router.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let (status, _) = app
        .send("POST", "/books", Some(json!({"name": "A", "pageCount": -1})))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(app.store.is_empty());

    // the server keeps serving afterwards
    app.create(full_book("Still alive", 1, 1, false)).await;
}

#[tokio::test]
async fn finished_filter_returns_only_completed_books() {
    let app = TestApp::new();
    let a = app
        .create(json!({"name": "A", "pageCount": 100, "readPage": 100}))
        .await;
    app.create(json!({"name": "B", "pageCount": 100, "readPage": 50}))
        .await;

    let (status, body) = app.send("GET", "/books?finished=1", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        json!({
            "status": "success",
            "data": { "books": [ { "id": a, "name": "A", "publisher": null } ] }
        })
    );
}

#[tokio::test]
async fn name_and_reading_filters_combine() {
    let app = TestApp::new();
    app.create(full_book("War and Peace", 1225, 10, true)).await;
    app.create(full_book("The Art of WAR", 90, 90, false)).await;
    app.create(full_book("Peace Talks", 300, 20, true)).await;

    let (_, body) = app.send("GET", "/books?name=war", None).await;
    assert_eq!(body["data"]["books"].as_array().unwrap().len(), 2);

    let (_, body) = app.send("GET", "/books?name=war&reading=1", None).await;
    let books = body["data"]["books"].as_array().unwrap();
    assert_eq!(books.len(), 1);
    assert_eq!(books[0]["name"], "War and Peace");

    let (_, body) = app.send("GET", "/books?reading=0", None).await;
    let books = body["data"]["books"].as_array().unwrap();
    assert_eq!(books.len(), 1);
    assert_eq!(books[0]["name"], "The Art of WAR");

    let (_, body) = app.send("GET", "/books", None).await;
    assert_eq!(body["data"]["books"].as_array().unwrap().len(), 3);
}

#[tokio::test]
async fn update_merges_provided_fields_only() {
    let app = TestApp::new();
    let id = app.create(full_book("Dune", 412, 100, true)).await;
    let (_, before) = app.send("GET", &format!("/books/{id}"), None).await;

    let (status, body) = app
        .send(
            "PUT",
            &format!("/books/{id}"),
            Some(json!({"name": "Dune", "author": "Frank Herbert"})),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        json!({"status": "success", "message": "book updated successfully"})
    );

    let (_, after) = app.send("GET", &format!("/books/{id}"), None).await;
    let (before, after) = (&before["data"]["book"], &after["data"]["book"]);
    assert_eq!(after["id"], before["id"]);
    assert_eq!(after["insertedAt"], before["insertedAt"]);
    assert_ne!(after["updatedAt"], before["updatedAt"]);
    assert_eq!(after["author"], "Frank Herbert");
    assert_eq!(after["name"], "Dune");
    assert_eq!(after["publisher"], before["publisher"]);
    assert_eq!(after["readPage"], 100);
}

#[tokio::test]
async fn invalid_update_leaves_record_unchanged() {
    let app = TestApp::new();
    let id = app.create(full_book("Dune", 412, 100, true)).await;
    let (_, before) = app.send("GET", &format!("/books/{id}"), None).await;

    let (status, body) = app
        .send("PUT", &format!("/books/{id}"), Some(json!({"author": "X"})))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "failed to update book: name required");

    let (status, body) = app
        .send(
            "PUT",
            &format!("/books/{id}"),
            Some(json!({"name": "Dune", "pageCount": 5, "readPage": 6})),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        body["message"],
        "failed to update book: readPage exceeds pageCount"
    );

    let (_, after) = app.send("GET", &format!("/books/{id}"), None).await;
    assert_eq!(after, before);
}

#[tokio::test]
async fn update_reports_missing_id_before_malformed_body() {
    let app = TestApp::new();
    let put = |uri: String| {
        Request::builder()
            .method("PUT")
            .uri(uri)
            .body(Body::from("{bad"))
            .unwrap()
    };

    let response = app
        .router
        .clone()
        .oneshot(put("/books/missing".to_string()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["message"], "failed to update book: id not found");

    let id = app.create(full_book("Dune", 412, 100, true)).await;
    let response = app
        .router
        .clone()
        .oneshot(put(format!("/books/{id}")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn delete_removes_one_book() {
    let app = TestApp::new();
    let a = app.create(full_book("A", 1, 0, false)).await;
    app.create(full_book("B", 1, 0, false)).await;

    let (status, body) = app.send("DELETE", &format!("/books/{a}"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "book deleted successfully");
    assert_eq!(app.store.len(), 1);

    let (status, _) = app.send("GET", &format!("/books/{a}"), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = app.send("DELETE", &format!("/books/{a}"), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn unknown_paths_and_methods_get_json_errors() {
    let app = TestApp::new();

    let (status, body) = app.send("GET", "/authors", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body, json!({"status": "fail", "message": "page not found"}));

    let (status, body) = app.send("PATCH", "/books", None).await;
    assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
    assert_eq!(body["status"], "fail");
}

#[tokio::test]
async fn options_is_an_empty_preflight() {
    let app = TestApp::new();
    let (status, body) = app.send("OPTIONS", "/books/anything", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, Value::Null);
}

#[tokio::test]
async fn openapi_document_lists_book_routes() {
    let app = TestApp::new();
    let (status, body) = app.send("GET", "/docs/openapi.json", None).await;

    assert_eq!(status, StatusCode::OK);
    assert!(body["paths"]["/books"]["post"].is_object());
    assert!(body["paths"]["/books/{id}"]["delete"].is_object());
    assert!(body["components"]["schemas"]["Book"].is_object());
}
