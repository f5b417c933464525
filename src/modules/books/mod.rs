pub mod error;
pub mod models;
pub mod routes;
pub mod store;

use std::sync::Arc;

use async_trait::async_trait;
use axum::Router;
use bookshelf_kernel::{InitCtx, Module};

pub use error::{BookError, ValidationError};
pub use models::{Book, BookFilter, BookInput, BookSummary};
pub use store::{BookStore, Clock, IdGenerator, SystemClock, UuidIds};

/// Book collection: CRUD over an in-memory [`BookStore`].
pub struct BooksModule {
    store: Arc<BookStore>,
}

impl BooksModule {
    pub fn new() -> Self {
        Self::with_store(Arc::new(BookStore::new()))
    }

    pub fn with_store(store: Arc<BookStore>) -> Self {
        Self { store }
    }
}

impl Default for BooksModule {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Module for BooksModule {
    fn name(&self) -> &'static str {
        "books"
    }

    async fn init(&self, ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        tracing::info!(
            module = self.name(),
            environment = ?ctx.settings.environment,
            "books module initialized"
        );
        Ok(())
    }

    fn routes(&self) -> Router {
        routes::router(self.store.clone())
    }

    fn openapi(&self) -> Option<serde_json::Value> {
        Some(openapi_fragment())
    }

    async fn start(&self, _ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        tracing::info!(module = self.name(), "books module started");
        Ok(())
    }

    async fn stop(&self) -> anyhow::Result<()> {
        tracing::info!(
            module = self.name(),
            discarded = self.store.len(),
            "books module stopped"
        );
        Ok(())
    }
}

/// Create a new instance of the books module
pub fn create_module() -> Arc<dyn Module> {
    Arc::new(BooksModule::new())
}

fn openapi_fragment() -> serde_json::Value {
    let fail = |description: &str| {
        serde_json::json!({
            "description": description,
            "content": {
                "application/json": {
                    "schema": { "$ref": "#/components/schemas/ErrorResponse" }
                }
            }
        })
    };
    let id_param = serde_json::json!({
        "name": "id",
        "in": "path",
        "required": true,
        "schema": { "type": "string" }
    });
    let flag_param = |name: &str| {
        serde_json::json!({
            "name": name,
            "in": "query",
            "required": false,
            "schema": { "type": "string", "enum": ["0", "1"] }
        })
    };
    let input_body = serde_json::json!({
        "required": true,
        "content": {
            "application/json": {
                "schema": { "$ref": "#/components/schemas/BookInput" }
            }
        }
    });

    serde_json::json!({
        "paths": {
            "/books": {
                "get": {
                    "summary": "List books",
                    "tags": ["Books"],
                    "parameters": [
                        {
                            "name": "name",
                            "in": "query",
                            "required": false,
                            "schema": { "type": "string" }
                        },
                        flag_param("reading"),
                        flag_param("finished")
                    ],
                    "responses": {
                        "200": { "description": "Matching books as id/name/publisher" }
                    }
                },
                "post": {
                    "summary": "Add a book",
                    "tags": ["Books"],
                    "requestBody": input_body.clone(),
                    "responses": {
                        "201": { "description": "Book added; data.bookId holds the new id" },
                        "400": fail("Missing name, readPage beyond pageCount, or malformed body")
                    }
                }
            },
            "/books/{id}": {
                "get": {
                    "summary": "Get a book",
                    "tags": ["Books"],
                    "parameters": [id_param.clone()],
                    "responses": {
                        "200": {
                            "description": "The full book record",
                            "content": {
                                "application/json": {
                                    "schema": { "$ref": "#/components/schemas/Book" }
                                }
                            }
                        },
                        "404": fail("Book not found")
                    }
                },
                "put": {
                    "summary": "Update a book",
                    "tags": ["Books"],
                    "parameters": [id_param.clone()],
                    "requestBody": input_body,
                    "responses": {
                        "200": { "description": "Book updated" },
                        "400": fail("Missing name, readPage beyond pageCount, or malformed body"),
                        "404": fail("Book not found")
                    }
                },
                "delete": {
                    "summary": "Delete a book",
                    "tags": ["Books"],
                    "parameters": [id_param],
                    "responses": {
                        "200": { "description": "Book deleted" },
                        "404": fail("Book not found")
                    }
                }
            }
        },
        "components": {
            "schemas": {
                "Book": {
                    "type": "object",
                    "properties": {
                        "id": { "type": "string" },
                        "name": { "type": "string" },
                        "year": { "type": "integer" },
                        "author": { "type": "string" },
                        "summary": { "type": "string" },
                        "publisher": { "type": "string" },
                        "pageCount": { "type": "integer", "minimum": 0 },
                        "readPage": { "type": "integer", "minimum": 0 },
                        "finished": { "type": "boolean" },
                        "reading": { "type": "boolean" },
                        "insertedAt": { "type": "string", "format": "date-time" },
                        "updatedAt": { "type": "string", "format": "date-time" }
                    },
                    "required": [
                        "id", "name", "pageCount", "readPage", "finished",
                        "reading", "insertedAt", "updatedAt"
                    ]
                },
                "BookInput": {
                    "type": "object",
                    "properties": {
                        "name": { "type": "string", "minLength": 1 },
                        "year": { "type": "integer" },
                        "author": { "type": "string" },
                        "summary": { "type": "string" },
                        "publisher": { "type": "string" },
                        "pageCount": { "type": "integer", "minimum": 0 },
                        "readPage": { "type": "integer", "minimum": 0 },
                        "reading": { "type": "boolean" }
                    },
                    "required": ["name"]
                }
            }
        }
    })
}
