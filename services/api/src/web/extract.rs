//! services/api/src/web/extract.rs
//!
//! Request extractors whose rejections render through `ApiError`, so a
//! malformed body or query answers with the same JSON error shape as every
//! other failure.

use crate::error::ApiError;
use axum::extract::{FromRequest, FromRequestParts};

/// `axum::Json` with a JSON `{error}` body on rejection.
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct ApiJson<T>(pub T);

/// `axum::extract::Query` with a JSON `{error}` body on rejection.
#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(ApiError))]
pub struct ApiQuery<T>(pub T);
