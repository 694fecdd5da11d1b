use axum::{routing::get, Router};

use super::handlers::{self, SharedRepository};

/// Route table for the Books module.
pub fn router(repository: SharedRepository) -> Router {
    Router::new()
        .route(
            "/books",
            get(handlers::list_books).post(handlers::create_book),
        )
        .route(
            "/books/{id}",
            get(handlers::get_book)
                .put(handlers::update_book)
                .delete(handlers::delete_book),
        )
        .with_state(repository)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use async_trait::async_trait;
    use axum::{
        body::{to_bytes, Body},
        http::{header, Method, Request, StatusCode},
    };
    use bookstore_db::Database;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use super::*;
    use crate::modules::books::models::{Book, BookId, BookPatch};
    use crate::modules::books::repository::{BookRepository, BookStoreError, SqlBookRepository};
    use crate::modules::books::BOOKS_MIGRATION;

    async fn app() -> Router {
        let db = Database::in_memory().await.unwrap();
        db.migrate(&[("books".to_string(), BOOKS_MIGRATION)])
            .await
            .unwrap();
        router(Arc::new(SqlBookRepository::new(db)))
    }

    async fn send(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let request = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(body) => request
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string())),
            None => request.body(Body::empty()),
        }
        .unwrap();

        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, json)
    }

    #[tokio::test]
    async fn book_lifecycle() {
        let app = app().await;

        let (status, created) = send(
            &app,
            Method::POST,
            "/books",
            Some(json!({"title": "Dune", "author": "Herbert", "price": "$9.99"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(created["id"], 1);
        assert_eq!(created["title"], "Dune");
        assert_eq!(created["author"], "Herbert");
        assert_eq!(created["price"], "$9.99");
        assert!(!created["created_at"].as_str().unwrap().is_empty());
        assert!(!created["updated_at"].as_str().unwrap().is_empty());
        assert!(created.get("deleted_at").is_none());

        let (status, fetched) = send(&app, Method::GET, "/books/1", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(fetched, created);

        let (status, updated) = send(
            &app,
            Method::PUT,
            "/books/1",
            Some(json!({"price": "$12.00"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(updated["title"], "Dune");
        assert_eq!(updated["author"], "Herbert");
        assert_eq!(updated["price"], "$12.00");

        let (status, deleted) = send(&app, Method::DELETE, "/books/1", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(deleted, updated);

        let (status, body) = send(&app, Method::GET, "/books/1", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"]["code"], "not_found");

        let (status, list) = send(&app, Method::GET, "/books", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(list, json!([]));
    }

    #[tokio::test]
    async fn list_returns_json_array() {
        let app = app().await;
        for title in ["Dune", "Emma"] {
            send(
                &app,
                Method::POST,
                "/books",
                Some(json!({"title": title, "author": "Someone", "price": "$1.00"})),
            )
            .await;
        }

        let response = app
            .clone()
            .oneshot(Request::builder().uri("/books").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            "application/json"
        );

        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let list: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(list[0]["title"], "Dune");
        assert_eq!(list[1]["title"], "Emma");
    }

    #[tokio::test]
    async fn invalid_ids_are_bad_requests() {
        let app = app().await;

        for (method, body) in [
            (Method::GET, None),
            (Method::PUT, Some(json!({"price": "$1.00"}))),
            (Method::DELETE, None),
        ] {
            let (status, body) = send(&app, method, "/books/abc", body).await;
            assert_eq!(status, StatusCode::BAD_REQUEST);
            assert_eq!(body["error"]["code"], "bad_request");
            assert!(body["error"]["message"].as_str().unwrap().contains("abc"));
        }

        let (status, _) = send(&app, Method::GET, "/books/-1", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn hexadecimal_ids_are_accepted() {
        let app = app().await;
        send(
            &app,
            Method::POST,
            "/books",
            Some(json!({"title": "Dune", "author": "Herbert", "price": "$9.99"})),
        )
        .await;

        let (status, body) = send(&app, Method::GET, "/books/0x1", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["id"], 1);
    }

    #[tokio::test]
    async fn missing_books_are_not_found() {
        let app = app().await;

        for method in [Method::GET, Method::DELETE] {
            let (status, _) = send(&app, method, "/books/999999", None).await;
            assert_eq!(status, StatusCode::NOT_FOUND);
        }

        let (status, _) = send(
            &app,
            Method::PUT,
            "/books/999999",
            Some(json!({"price": "$1.00"})),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn malformed_bodies_are_bad_requests() {
        let app = app().await;

        let request = Request::builder()
            .method(Method::POST)
            .uri("/books")
            .body(Body::from("{not json"))
            .unwrap();
        let response = app.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let (status, body) = send(&app, Method::POST, "/books", Some(json!({"title": "Dune"}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "invalid_body_data");

        let (status, body) = send(
            &app,
            Method::POST,
            "/books",
            Some(json!({"title": "", "author": "Herbert", "price": "$9.99"})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "validation_error");
        assert_eq!(body["error"]["details"][0]["field"], "title");

        let (_, list) = send(&app, Method::GET, "/books", None).await;
        assert_eq!(list, json!([]));
    }

    #[tokio::test]
    async fn explicit_empty_update_is_rejected() {
        let app = app().await;
        send(
            &app,
            Method::POST,
            "/books",
            Some(json!({"title": "Dune", "author": "Herbert", "price": "$9.99"})),
        )
        .await;

        let (status, body) = send(&app, Method::PUT, "/books/1", Some(json!({"author": ""}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["details"][0]["field"], "author");

        let (_, book) = send(&app, Method::GET, "/books/1", None).await;
        assert_eq!(book["author"], "Herbert");
    }

    #[tokio::test]
    async fn preassigned_id_conflicts() {
        let app = app().await;

        let (status, body) = send(
            &app,
            Method::POST,
            "/books",
            Some(json!({"id": 7, "title": "Dune", "author": "Herbert", "price": "$9.99"})),
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["error"]["code"], "conflict");
        assert_eq!(body["error"]["details"][0]["value"], 7);

        let (status, created) = send(
            &app,
            Method::POST,
            "/books",
            Some(json!({"id": 0, "title": "Dune", "author": "Herbert", "price": "$9.99"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(created["id"], 1);
    }

    struct BrokenRepository;

    #[async_trait]
    impl BookRepository for BrokenRepository {
        async fn create_book(&self, _book: Book) -> Result<Book, BookStoreError> {
            Err(BookStoreError::Storage(sqlx::Error::PoolTimedOut))
        }

        async fn get_all_books(&self) -> Result<Vec<Book>, BookStoreError> {
            Err(BookStoreError::Storage(sqlx::Error::PoolTimedOut))
        }

        async fn get_book_by_id(&self, _id: BookId) -> Result<Book, BookStoreError> {
            Err(BookStoreError::Storage(sqlx::Error::PoolTimedOut))
        }

        async fn update_book(&self, _id: BookId, _patch: BookPatch) -> Result<Book, BookStoreError> {
            Err(BookStoreError::Storage(sqlx::Error::PoolTimedOut))
        }

        async fn delete_book(&self, _id: BookId) -> Result<Book, BookStoreError> {
            Err(BookStoreError::Storage(sqlx::Error::PoolTimedOut))
        }
    }

    #[tokio::test]
    async fn storage_failures_are_internal_errors() {
        let app = router(Arc::new(BrokenRepository));

        let (status, body) = send(&app, Method::GET, "/books", None).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"]["code"], "internal_error");
        assert!(body["error"]["message"]
            .as_str()
            .unwrap()
            .starts_with("storage error"));

        let (status, _) = send(
            &app,
            Method::POST,
            "/books",
            Some(json!({"title": "Dune", "author": "Herbert", "price": "$9.99"})),
        )
        .await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);

        let (status, _) = send(&app, Method::DELETE, "/books/1", None).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    }
}
