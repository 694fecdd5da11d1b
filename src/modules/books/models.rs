use serde::{Deserialize, Serialize};
use thiserror::Error;
use time::OffsetDateTime;
use utoipa::ToSchema;

/// Storage-assigned book identifier; `0` means "not yet persisted".
pub type BookId = u64;

pub const MAX_TITLE_CHARS: usize = 255;
pub const MAX_AUTHOR_CHARS: usize = 255;
pub const MAX_PRICE_CHARS: usize = 64;

/// A book record as owned by the persistence gateway.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Book {
    pub id: BookId,
    pub title: String,
    pub author: String,
    /// Formatted price such as `$15.99`; never interpreted numerically.
    pub price: String,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
    pub deleted_at: Option<OffsetDateTime>,
}

impl Book {
    /// Unpersisted book; storage assigns the id and timestamps on insert.
    pub fn new(
        title: impl Into<String>,
        author: impl Into<String>,
        price: impl Into<String>,
    ) -> Self {
        let now = OffsetDateTime::now_utc();
        Self {
            id: 0,
            title: title.into(),
            author: author.into(),
            price: price.into(),
            created_at: now,
            updated_at: now,
            deleted_at: None,
        }
    }

    pub fn is_persisted(&self) -> bool {
        self.id != 0
    }
}

/// Book as returned to clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct BookResponse {
    /// Unique identifier for the book
    #[schema(example = 1)]
    pub id: BookId,
    /// Title of the book
    #[schema(example = "The Great Gatsby")]
    pub title: String,
    /// Author of the book
    #[schema(example = "F. Scott Fitzgerald")]
    pub author: String,
    /// Price of the book
    #[schema(example = "$15.99")]
    pub price: String,
    /// When the book was created
    #[serde(with = "time::serde::rfc3339")]
    #[schema(value_type = String, format = DateTime)]
    pub created_at: OffsetDateTime,
    /// When the book was last updated
    #[serde(with = "time::serde::rfc3339")]
    #[schema(value_type = String, format = DateTime)]
    pub updated_at: OffsetDateTime,
}

impl From<Book> for BookResponse {
    fn from(book: Book) -> Self {
        Self {
            id: book.id,
            title: book.title,
            author: book.author,
            price: book.price,
            created_at: book.created_at,
            updated_at: book.updated_at,
        }
    }
}

/// A single rejected field of a write request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldError {
    pub field: &'static str,
    pub error: &'static str,
}

fn check_field(
    errors: &mut Vec<FieldError>,
    field: &'static str,
    value: &str,
    max_chars: usize,
) {
    if value.trim().is_empty() {
        errors.push(FieldError {
            field,
            error: "required",
        });
    } else if value.chars().count() > max_chars {
        errors.push(FieldError {
            field,
            error: "too_long",
        });
    }
}

/// Request body for creating a book.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CreateBookRequest {
    /// Must be absent or 0; a book that already has an id cannot be created again
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<BookId>,
    /// Title of the book
    #[schema(example = "The Great Gatsby")]
    pub title: String,
    /// Author of the book
    #[schema(example = "F. Scott Fitzgerald")]
    pub author: String,
    /// Price of the book
    #[schema(example = "$15.99")]
    pub price: String,
}

impl CreateBookRequest {
    pub fn validate(&self) -> Vec<FieldError> {
        let mut errors = Vec::new();
        check_field(&mut errors, "title", &self.title, MAX_TITLE_CHARS);
        check_field(&mut errors, "author", &self.author, MAX_AUTHOR_CHARS);
        check_field(&mut errors, "price", &self.price, MAX_PRICE_CHARS);
        errors
    }

    pub fn into_book(self) -> Book {
        let mut book = Book::new(self.title, self.author, self.price);
        book.id = self.id.unwrap_or(0);
        book
    }
}

/// Request body for a partial update; omitted or `null` fields are kept.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct UpdateBookRequest {
    /// New title of the book
    #[serde(default)]
    pub title: Option<String>,
    /// New author of the book
    #[serde(default)]
    pub author: Option<String>,
    /// New price of the book
    #[serde(default)]
    pub price: Option<String>,
}

impl UpdateBookRequest {
    /// Provided fields follow the create rules, so an explicit empty string
    /// is rejected rather than mistaken for "not provided".
    pub fn validate(&self) -> Vec<FieldError> {
        let mut errors = Vec::new();
        if let Some(title) = &self.title {
            check_field(&mut errors, "title", title, MAX_TITLE_CHARS);
        }
        if let Some(author) = &self.author {
            check_field(&mut errors, "author", author, MAX_AUTHOR_CHARS);
        }
        if let Some(price) = &self.price {
            check_field(&mut errors, "price", price, MAX_PRICE_CHARS);
        }
        errors
    }
}

/// Partial update understood by the persistence gateway.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BookPatch {
    pub title: Option<String>,
    pub author: Option<String>,
    pub price: Option<String>,
}

impl BookPatch {
    /// Copy every present, non-empty field onto `book`.
    ///
    /// Returns whether any field was applied.
    pub fn apply_to(self, book: &mut Book) -> bool {
        let mut applied = false;
        for (value, target) in [
            (self.title, &mut book.title),
            (self.author, &mut book.author),
            (self.price, &mut book.price),
        ] {
            if let Some(value) = value.filter(|v| !v.is_empty()) {
                *target = value;
                applied = true;
            }
        }
        applied
    }
}

impl From<UpdateBookRequest> for BookPatch {
    fn from(request: UpdateBookRequest) -> Self {
        Self {
            title: request.title,
            author: request.author,
            price: request.price,
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum BookIdError {
    #[error("invalid book id {0:?}: expected a non-negative integer")]
    Invalid(String),
    #[error("invalid book id {0:?}: number too large")]
    Overflow(String),
}

/// Parse a path identifier.
///
/// Accepts decimal digits or `0x`/`0o`/`0b` prefixed hexadecimal, octal and
/// binary, with an optional leading `+`. A bare leading `0` stays decimal and
/// `_` digit separators are not accepted.
pub fn parse_book_id(raw: &str) -> Result<BookId, BookIdError> {
    let unsigned = raw.strip_prefix('+').unwrap_or(raw);
    let (radix, digits) = match unsigned.get(..2) {
        Some("0x" | "0X") => (16, &unsigned[2..]),
        Some("0o" | "0O") => (8, &unsigned[2..]),
        Some("0b" | "0B") => (2, &unsigned[2..]),
        _ => (10, unsigned),
    };

    if digits.is_empty() || !digits.chars().all(|c| c.is_digit(radix)) {
        return Err(BookIdError::Invalid(raw.to_string()));
    }

    BookId::from_str_radix(digits, radix).map_err(|_| BookIdError::Overflow(raw.to_string()))
}
