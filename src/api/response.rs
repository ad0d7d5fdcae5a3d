//! Uniform success envelope for API responses.

use axum::Json;
use serde::Serialize;

/// `{status: "success", message, data}` wrapper used by every endpoint.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub status: &'static str,
    pub message: String,
    pub data: Option<T>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn success(message: impl Into<String>, data: T) -> Json<Self> {
        Json(Self {
            status: "success",
            message: message.into(),
            data: Some(data),
        })
    }
}

impl ApiResponse<()> {
    /// Success with no payload (e.g. deletions).
    pub fn message(message: impl Into<String>) -> Json<Self> {
        Json(Self {
            status: "success",
            message: message.into(),
            data: None,
        })
    }
}
