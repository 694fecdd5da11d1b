//! JSON request body decoding.
//!
//! Unlike `axum::Json`, [`JsonBody`] does not insist on a
//! `Content-Type: application/json` header: any body that parses as the target
//! shape is accepted. Failures are reported as [`DecodeError`] and render as
//! `400 Bad Request`.

use axum::{
    body::Bytes,
    extract::{FromRequest, Request},
};
use serde::de::DeserializeOwned;
use serde_json::error::Category;
use thiserror::Error;

use crate::error::AppError;

/// The request body is not valid JSON or does not match the target shape.
#[derive(Debug, Error)]
#[error("invalid request body: {source}")]
pub struct DecodeError {
    #[from]
    source: serde_json::Error,
}

impl DecodeError {
    /// Short classification of the failure: `syntax`, `data`, `eof` or `io`.
    pub fn kind(&self) -> &'static str {
        match self.source.classify() {
            Category::Io => "io",
            Category::Syntax => "syntax",
            Category::Data => "data",
            Category::Eof => "eof",
        }
    }

    /// One-based line of the failure, when known.
    pub fn line(&self) -> Option<usize> {
        Some(self.source.line()).filter(|line| *line > 0)
    }

    /// One-based column of the failure, when known.
    pub fn column(&self) -> Option<usize> {
        Some(self.source.column()).filter(|column| *column > 0)
    }
}

/// Decode a complete JSON document into `T`.
///
/// Trailing non-whitespace after the document is an error.
pub fn decode_json<T: DeserializeOwned>(body: &[u8]) -> Result<T, DecodeError> {
    Ok(serde_json::from_slice(body)?)
}

/// Extractor that buffers the whole body and decodes it with [`decode_json`].
#[derive(Debug, Clone)]
pub struct JsonBody<T>(pub T);

impl<T, S> FromRequest<S> for JsonBody<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let bytes = Bytes::from_request(req, state)
            .await
            .map_err(|rejection| AppError::bad_request(rejection.body_text()))?;

        Ok(JsonBody(decode_json(&bytes)?))
    }
}
