//! Resource handlers translating HTTP requests into gateway calls.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    Json,
};
use bookstore_http::{AppError, JsonBody};
use serde_json::json;

use super::models::{
    parse_book_id, BookId, BookResponse, CreateBookRequest, FieldError, UpdateBookRequest,
};
use super::repository::{BookRepository, BookStoreError};

/// Gateway shared by every handler.
pub type SharedRepository = Arc<dyn BookRepository>;

impl From<BookStoreError> for AppError {
    fn from(error: BookStoreError) -> Self {
        match error {
            BookStoreError::NotFound(_) => AppError::not_found(error.to_string()),
            BookStoreError::Conflict(id) => {
                AppError::conflict(vec![json!({ "field": "id", "value": id })], error.to_string())
            }
            other => AppError::Internal(anyhow::Error::new(other)),
        }
    }
}

fn validation_error(errors: Vec<FieldError>) -> AppError {
    let details = errors
        .iter()
        .map(|error| json!({ "field": error.field, "error": error.error }))
        .collect();
    AppError::validation(details, "book request failed validation")
}

fn book_id(raw: &str) -> Result<BookId, AppError> {
    parse_book_id(raw).map_err(|error| AppError::bad_request(error.to_string()))
}

/// `GET /books`
pub async fn list_books(
    State(repository): State<SharedRepository>,
) -> Result<Json<Vec<BookResponse>>, AppError> {
    let books = repository.get_all_books().await?;
    Ok(Json(books.into_iter().map(BookResponse::from).collect()))
}

/// `GET /books/{id}`
pub async fn get_book(
    State(repository): State<SharedRepository>,
    Path(raw_id): Path<String>,
) -> Result<Json<BookResponse>, AppError> {
    let id = book_id(&raw_id)?;
    let book = repository.get_book_by_id(id).await?;
    Ok(Json(book.into()))
}

/// `POST /books`
pub async fn create_book(
    State(repository): State<SharedRepository>,
    JsonBody(request): JsonBody<CreateBookRequest>,
) -> Result<Json<BookResponse>, AppError> {
    let errors = request.validate();
    if !errors.is_empty() {
        return Err(validation_error(errors));
    }

    let book = repository.create_book(request.into_book()).await?;
    tracing::info!(book_id = book.id, "book created");
    Ok(Json(book.into()))
}

/// `PUT /books/{id}`
pub async fn update_book(
    State(repository): State<SharedRepository>,
    Path(raw_id): Path<String>,
    JsonBody(request): JsonBody<UpdateBookRequest>,
) -> Result<Json<BookResponse>, AppError> {
    let id = book_id(&raw_id)?;

    let errors = request.validate();
    if !errors.is_empty() {
        return Err(validation_error(errors));
    }

    let book = repository.update_book(id, request.into()).await?;
    tracing::info!(book_id = book.id, "book updated");
    Ok(Json(book.into()))
}

/// `DELETE /books/{id}`
pub async fn delete_book(
    State(repository): State<SharedRepository>,
    Path(raw_id): Path<String>,
) -> Result<Json<BookResponse>, AppError> {
    let id = book_id(&raw_id)?;
    let book = repository.delete_book(id).await?;
    tracing::info!(book_id = book.id, "book deleted");
    Ok(Json(book.into()))
}
