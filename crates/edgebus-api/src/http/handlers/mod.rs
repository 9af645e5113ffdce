//! HTTP request handlers.

pub mod ingest;

use axum::http::Uri;

use crate::http::error::AppError;

/// Fallback for unknown routes.
pub async fn not_found(uri: Uri) -> AppError {
    AppError::NotFound(format!("no route for {}", uri.path()))
}
