//! HTTP handlers for the books module.

use std::sync::Arc;

use axum::{
    extract::{
        rejection::{PathRejection, QueryRejection},
        Path, Query, State,
    },
    routing::get,
    Router,
};
use bookshelf_http::{ApiResponse, AppError, AppResult, JsonBody};
use serde::{Deserialize, Serialize};

use super::error::BookError;
use super::models::{Book, BookFilter, BookInput, BookSummary, ListBooksQuery};
use super::store::BookStore;

type SharedStore = Arc<BookStore>;

/// `/books` and `/books/{id}`; segments after the id are ignored.
pub fn router(store: SharedStore) -> Router {
    Router::new()
        .route("/books", get(list_books).post(create_book))
        .route(
            "/books/{id}",
            get(get_book).put(update_book).delete(delete_book),
        )
        .route(
            "/books/{id}/{*rest}",
            get(get_book).put(update_book).delete(delete_book),
        )
        .with_state(store)
}

#[derive(Debug, Deserialize)]
struct BookPath {
    id: String,
}

#[derive(Debug, Serialize)]
struct BooksData {
    books: Vec<BookSummary>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CreatedData {
    book_id: String,
}

#[derive(Debug, Serialize)]
struct BookData {
    book: Book,
}

/// Map a store failure to a response, worded for the attempted action.
fn failure(action: &str, err: BookError) -> AppError {
    match err {
        BookError::Validation(e) => AppError::validation(format!("failed to {action} book: {e}")),
        BookError::NotFound { .. } => {
            AppError::not_found(format!("failed to {action} book: id not found"))
        }
        err @ BookError::IdExhausted { .. } => AppError::Internal(err.into()),
    }
}

fn book_id(path: Result<Path<BookPath>, PathRejection>) -> AppResult<String> {
    path.map(|Path(BookPath { id })| id)
        .map_err(|rejection| AppError::bad_request(rejection.body_text()))
}

async fn list_books(
    State(store): State<SharedStore>,
    query: Result<Query<Vec<(String, String)>>, QueryRejection>,
) -> AppResult<ApiResponse<BooksData>> {
    let Query(pairs) = query.map_err(|rejection| AppError::bad_request(rejection.body_text()))?;
    let filter = BookFilter::from(ListBooksQuery::from_pairs(pairs));

    Ok(ApiResponse::ok(BooksData {
        books: store.list(&filter),
    }))
}

async fn create_book(
    State(store): State<SharedStore>,
    JsonBody(input): JsonBody<BookInput>,
) -> AppResult<ApiResponse<CreatedData>> {
    let book_id = store.create(input).map_err(|e| failure("add", e))?;

    Ok(ApiResponse::created(CreatedData { book_id }).with_message("book added successfully"))
}

async fn get_book(
    State(store): State<SharedStore>,
    path: Result<Path<BookPath>, PathRejection>,
) -> AppResult<ApiResponse<BookData>> {
    let id = book_id(path)?;
    let book = store.get(&id).map_err(|e| match e {
        BookError::NotFound { .. } => AppError::not_found("book not found"),
        other => failure("read", other),
    })?;

    Ok(ApiResponse::ok(BookData { book }))
}

async fn update_book(
    State(store): State<SharedStore>,
    path: Result<Path<BookPath>, PathRejection>,
    body: Result<JsonBody<BookInput>, AppError>,
) -> AppResult<ApiResponse> {
    let id = book_id(path)?;
    let input = match body {
        Ok(JsonBody(input)) => input,
        Err(rejection) => {
            // an unknown id outranks an unreadable body
            store.get(&id).map_err(|e| failure("update", e))?;
            return Err(rejection);
        }
    };
    store.update(&id, input).map_err(|e| failure("update", e))?;

    Ok(ApiResponse::message("book updated successfully"))
}

async fn delete_book(
    State(store): State<SharedStore>,
    path: Result<Path<BookPath>, PathRejection>,
) -> AppResult<ApiResponse> {
    let id = book_id(path)?;
    store.delete(&id).map_err(|e| failure("delete", e))?;

    Ok(ApiResponse::message("book deleted successfully"))
}
