//! Persistence gateway for books.
//!
//! Soft-deleted rows carry a non-null `deleted_at` and are filtered out of
//! every read, update and delete.

use async_trait::async_trait;
use bookstore_db::Database;
use bookstore_kernel::settings::DatabaseDriver;
use sqlx::{any::AnyRow, Row};
use thiserror::Error;
use time::{format_description::well_known::Rfc3339, OffsetDateTime};

use super::models::{Book, BookId, BookPatch};

#[derive(Debug, Error)]
pub enum BookStoreError {
    #[error("book {0} not found")]
    NotFound(BookId),

    #[error("book already exists with id {0}")]
    Conflict(BookId),

    #[error("storage error: {0}")]
    Storage(#[from] sqlx::Error),

    #[error("book {id} has an unreadable {field}: {reason}")]
    CorruptRecord {
        id: i64,
        field: &'static str,
        reason: String,
    },
}

/// Typed CRUD operations over the book table.
#[async_trait]
pub trait BookRepository: Send + Sync {
    /// Insert a new book; fails with `Conflict` if it already has an id.
    async fn create_book(&self, book: Book) -> Result<Book, BookStoreError>;

    /// All live books in insertion order.
    async fn get_all_books(&self) -> Result<Vec<Book>, BookStoreError>;

    async fn get_book_by_id(&self, id: BookId) -> Result<Book, BookStoreError>;

    /// Apply the non-empty fields of `patch` and return the updated book.
    async fn update_book(&self, id: BookId, patch: BookPatch) -> Result<Book, BookStoreError>;

    /// Soft-delete a book and return it as it was before deletion.
    async fn delete_book(&self, id: BookId) -> Result<Book, BookStoreError>;
}

/// [`BookRepository`] backed by the shared SQL [`Database`].
#[derive(Clone)]
pub struct SqlBookRepository {
    db: Database,
}

impl SqlBookRepository {
    pub fn new(db: Database) -> Self {
        Self { db }
    }
}

/// Ids beyond the storage integer range cannot exist.
fn storage_id(id: BookId) -> Option<i64> {
    i64::try_from(id).ok().filter(|id| *id > 0)
}

fn timestamp_text(timestamp: OffsetDateTime) -> Result<String, BookStoreError> {
    timestamp
        .format(&Rfc3339)
        .map_err(|error| BookStoreError::Storage(sqlx::Error::Encode(Box::new(error))))
}

fn parse_timestamp(id: i64, field: &'static str, text: &str) -> Result<OffsetDateTime, BookStoreError> {
    OffsetDateTime::parse(text, &Rfc3339).map_err(|error| BookStoreError::CorruptRecord {
        id,
        field,
        reason: error.to_string(),
    })
}

fn book_from_row(row: &AnyRow) -> Result<Book, BookStoreError> {
    let id: i64 = row.try_get("id")?;
    let created_at: String = row.try_get("created_at")?;
    let updated_at: String = row.try_get("updated_at")?;
    let deleted_at: Option<String> = row.try_get("deleted_at")?;

    Ok(Book {
        id: BookId::try_from(id).map_err(|error| BookStoreError::CorruptRecord {
            id,
            field: "id",
            reason: error.to_string(),
        })?,
        title: row.try_get("title")?,
        author: row.try_get("author")?,
        price: row.try_get("price")?,
        created_at: parse_timestamp(id, "created_at", &created_at)?,
        updated_at: parse_timestamp(id, "updated_at", &updated_at)?,
        deleted_at: deleted_at
            .map(|text| parse_timestamp(id, "deleted_at", &text))
            .transpose()?,
    })
}

#[async_trait]
impl BookRepository for SqlBookRepository {
    async fn create_book(&self, mut book: Book) -> Result<Book, BookStoreError> {
        if book.is_persisted() {
            tracing::warn!(book_id = book.id, "refusing to create an already persisted book");
            return Err(BookStoreError::Conflict(book.id));
        }

        let now = OffsetDateTime::now_utc();
        let stamp = timestamp_text(now)?;

        let inserted_id: i64 = match self.db.driver() {
            // The Any driver only reports last_insert_id for MySQL.
            DatabaseDriver::Sqlite => {
                sqlx::query_scalar(
                    "INSERT INTO books (title, author, price, created_at, updated_at) \
                     VALUES (?, ?, ?, ?, ?) RETURNING id",
                )
                .bind(book.title.as_str())
                .bind(book.author.as_str())
                .bind(book.price.as_str())
                .bind(stamp.as_str())
                .bind(stamp.as_str())
                .fetch_one(self.db.pool())
                .await?
            }
            DatabaseDriver::Mysql => {
                let result = sqlx::query(
                    "INSERT INTO books (title, author, price, created_at, updated_at) \
                     VALUES (?, ?, ?, ?, ?)",
                )
                .bind(book.title.as_str())
                .bind(book.author.as_str())
                .bind(book.price.as_str())
                .bind(stamp.as_str())
                .bind(stamp.as_str())
                .execute(self.db.pool())
                .await?;

                result.last_insert_id().ok_or_else(|| {
                    sqlx::Error::Protocol("driver did not report the inserted row id".to_string())
                })?
            }
        };

        book.id = BookId::try_from(inserted_id).map_err(|error| BookStoreError::CorruptRecord {
            id: inserted_id,
            field: "id",
            reason: error.to_string(),
        })?;
        book.created_at = now;
        book.updated_at = now;
        book.deleted_at = None;

        tracing::debug!(book_id = book.id, "book inserted");
        Ok(book)
    }

    async fn get_all_books(&self) -> Result<Vec<Book>, BookStoreError> {
        let rows = sqlx::query(
            "SELECT id, title, author, price, created_at, updated_at, deleted_at \
             FROM books WHERE deleted_at IS NULL ORDER BY id",
        )
        .fetch_all(self.db.pool())
        .await?;

        let books = rows
            .iter()
            .map(book_from_row)
            .collect::<Result<Vec<_>, _>>()?;

        tracing::debug!(count = books.len(), "books listed");
        Ok(books)
    }

    async fn get_book_by_id(&self, id: BookId) -> Result<Book, BookStoreError> {
        let Some(key) = storage_id(id) else {
            tracing::warn!(book_id = id, "book not found");
            return Err(BookStoreError::NotFound(id));
        };

        let row = sqlx::query(
            "SELECT id, title, author, price, created_at, updated_at, deleted_at \
             FROM books WHERE id = ? AND deleted_at IS NULL",
        )
        .bind(key)
        .fetch_optional(self.db.pool())
        .await?;

        match row {
            Some(row) => book_from_row(&row),
            None => {
                tracing::warn!(book_id = id, "book not found");
                Err(BookStoreError::NotFound(id))
            }
        }
    }

    async fn update_book(&self, id: BookId, patch: BookPatch) -> Result<Book, BookStoreError> {
        let mut book = self.get_book_by_id(id).await?;

        if !patch.apply_to(&mut book) {
            tracing::debug!(book_id = id, "empty patch, nothing to update");
            return Ok(book);
        }

        let now = OffsetDateTime::now_utc();
        let stamp = timestamp_text(now)?;

        let result = sqlx::query(
            "UPDATE books SET title = ?, author = ?, price = ?, updated_at = ? \
             WHERE id = ? AND deleted_at IS NULL",
        )
        .bind(book.title.as_str())
        .bind(book.author.as_str())
        .bind(book.price.as_str())
        .bind(stamp.as_str())
        .bind(book.id as i64)
        .execute(self.db.pool())
        .await?;

        // Deleted by a concurrent request between the read and the write.
        if result.rows_affected() == 0 {
            tracing::warn!(book_id = id, "book vanished before update");
            return Err(BookStoreError::NotFound(id));
        }

        book.updated_at = now;
        tracing::debug!(book_id = id, "book updated");
        Ok(book)
    }

    async fn delete_book(&self, id: BookId) -> Result<Book, BookStoreError> {
        let book = self.get_book_by_id(id).await?;
        let stamp = timestamp_text(OffsetDateTime::now_utc())?;

        let result = sqlx::query("UPDATE books SET deleted_at = ? WHERE id = ? AND deleted_at IS NULL")
            .bind(stamp.as_str())
            .bind(book.id as i64)
            .execute(self.db.pool())
            .await?;

        // Only one of several concurrent deletes can flip the marker.
        if result.rows_affected() == 0 {
            tracing::warn!(book_id = id, "book already deleted");
            return Err(BookStoreError::NotFound(id));
        }

        tracing::debug!(book_id = id, "book soft-deleted");
        Ok(book)
    }
}
