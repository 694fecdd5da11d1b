pub mod handlers;
pub mod models;
pub mod repository;
pub mod routes;

use std::sync::Arc;

use async_trait::async_trait;
use axum::Router;
use bookstore_db::Database;
use bookstore_kernel::{InitCtx, Migration, Module};
use serde_json::json;
use utoipa::PartialSchema;

use handlers::SharedRepository;
use models::{BookResponse, CreateBookRequest, UpdateBookRequest};
use repository::SqlBookRepository;

pub(crate) const BOOKS_MIGRATION: Migration = Migration {
    id: "001_create_books",
    mysql: &[r#"
        CREATE TABLE IF NOT EXISTS books (
            id         BIGINT       NOT NULL AUTO_INCREMENT,
            title      VARCHAR(255) NOT NULL,
            author     VARCHAR(255) NOT NULL,
            price      VARCHAR(64)  NOT NULL,
            created_at VARCHAR(40)  NOT NULL,
            updated_at VARCHAR(40)  NOT NULL,
            deleted_at VARCHAR(40)  NULL,
            PRIMARY KEY (id),
            INDEX idx_books_deleted_at (deleted_at)
        ) CHARACTER SET utf8mb4
        "#],
    sqlite: &[
        r#"
        CREATE TABLE IF NOT EXISTS books (
            id         INTEGER PRIMARY KEY AUTOINCREMENT,
            title      TEXT NOT NULL,
            author     TEXT NOT NULL,
            price      TEXT NOT NULL,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            deleted_at TEXT NULL
        )
        "#,
        "CREATE INDEX IF NOT EXISTS idx_books_deleted_at ON books (deleted_at)",
    ],
};

/// Books module: CRUD over the single Book resource
pub struct BooksModule {
    repository: SharedRepository,
}

impl BooksModule {
    pub fn new(repository: SharedRepository) -> Self {
        Self { repository }
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
        routes::router(self.repository.clone())
    }

    fn openapi(&self) -> Option<serde_json::Value> {
        let error_response = |description: &str| {
            json!({
                "description": description,
                "content": {
                    "application/json": {
                        "schema": { "$ref": "#/components/schemas/ErrorResponse" }
                    }
                }
            })
        };
        let book_response = |description: &str| {
            json!({
                "description": description,
                "content": {
                    "application/json": {
                        "schema": { "$ref": "#/components/schemas/BookResponse" }
                    }
                }
            })
        };
        let id_parameter = json!({
            "name": "id",
            "in": "path",
            "required": true,
            "description": "Book ID",
            "schema": { "type": "integer", "format": "int64", "minimum": 0 }
        });
        let request_body = |schema: &str| {
            json!({
                "required": true,
                "content": {
                    "application/json": {
                        "schema": { "$ref": format!("#/components/schemas/{}", schema) }
                    }
                }
            })
        };

        Some(json!({
            "paths": {
                "/books": {
                    "get": {
                        "summary": "Get all books",
                        "tags": ["Books"],
                        "responses": {
                            "200": {
                                "description": "List of books",
                                "content": {
                                    "application/json": {
                                        "schema": {
                                            "type": "array",
                                            "items": { "$ref": "#/components/schemas/BookResponse" }
                                        }
                                    }
                                }
                            },
                            "500": error_response("Internal server error")
                        }
                    },
                    "post": {
                        "summary": "Create a new book",
                        "tags": ["Books"],
                        "requestBody": request_body("CreateBookRequest"),
                        "responses": {
                            "200": book_response("Created book"),
                            "400": error_response("Invalid book data"),
                            "409": error_response("Book already has an id"),
                            "500": error_response("Internal server error")
                        }
                    }
                },
                "/books/{id}": {
                    "get": {
                        "summary": "Get a book by ID",
                        "tags": ["Books"],
                        "parameters": [id_parameter.clone()],
                        "responses": {
                            "200": book_response("Book details"),
                            "400": error_response("Invalid ID"),
                            "404": error_response("Book not found"),
                            "500": error_response("Internal server error")
                        }
                    },
                    "put": {
                        "summary": "Update a book",
                        "tags": ["Books"],
                        "parameters": [id_parameter.clone()],
                        "requestBody": request_body("UpdateBookRequest"),
                        "responses": {
                            "200": book_response("Updated book"),
                            "400": error_response("Invalid ID or book data"),
                            "404": error_response("Book not found"),
                            "500": error_response("Internal server error")
                        }
                    },
                    "delete": {
                        "summary": "Delete a book",
                        "tags": ["Books"],
                        "parameters": [id_parameter],
                        "responses": {
                            "200": book_response("Deleted book"),
                            "400": error_response("Invalid ID"),
                            "404": error_response("Book not found"),
                            "500": error_response("Internal server error")
                        }
                    }
                }
            },
            "components": {
                "schemas": {
                    "BookResponse": schema_json::<BookResponse>(),
                    "CreateBookRequest": schema_json::<CreateBookRequest>(),
                    "UpdateBookRequest": schema_json::<UpdateBookRequest>()
                }
            }
        }))
    }

    fn migrations(&self) -> Vec<Migration> {
        vec![BOOKS_MIGRATION]
    }

    async fn start(&self, _ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        tracing::info!(module = self.name(), "books module started");
        Ok(())
    }

    async fn stop(&self) -> anyhow::Result<()> {
        tracing::info!(module = self.name(), "books module stopped");
        Ok(())
    }
}

fn schema_json<T: PartialSchema>() -> serde_json::Value {
    serde_json::to_value(T::schema()).unwrap_or_default()
}

/// Create the books module over the shared database
pub fn create_module(db: Database) -> Arc<dyn Module> {
    Arc::new(BooksModule::new(Arc::new(SqlBookRepository::new(db))))
}
