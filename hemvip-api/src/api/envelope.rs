//! Uniform response envelope: `{success, data, message}`

use axum::Json;
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct Envelope<T> {
    pub success: bool,
    pub data: T,
    pub message: String,
}

impl<T> Envelope<T> {
    pub fn failure(data: T, message: impl Into<String>) -> Self {
        Self {
            success: false,
            data,
            message: message.into(),
        }
    }
}

/// Successful envelope with `data`
pub fn success<T: Serialize>(data: T, message: impl Into<String>) -> Json<Envelope<T>> {
    Json(Envelope {
        success: true,
        data,
        message: message.into(),
    })
}

/// Empty `{}` payload for operations with nothing to return
#[derive(Debug, Default, Serialize)]
pub struct Empty {}
