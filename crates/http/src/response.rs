//! Success envelope shared by every module.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

/// `{"status": "success", "message"?: ..., "data"?: ...}`
#[derive(Debug, Serialize)]
pub struct Envelope<T> {
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

/// A successful response: status code plus envelope.
#[derive(Debug)]
pub struct ApiResponse<T = ()> {
    status: StatusCode,
    message: Option<String>,
    data: Option<T>,
}

impl<T: Serialize> ApiResponse<T> {
    /// 200 carrying `data`
    pub fn ok(data: T) -> Self {
        Self {
            status: StatusCode::OK,
            message: None,
            data: Some(data),
        }
    }

    /// 201 carrying `data`
    pub fn created(data: T) -> Self {
        Self {
            status: StatusCode::CREATED,
            message: None,
            data: Some(data),
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }
}

impl ApiResponse<()> {
    /// 200 with a message and no data
    pub fn message(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::OK,
            message: Some(message.into()),
            data: None,
        }
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        let body = Envelope {
            status: "success",
            message: self.message,
            data: self.data,
        };
        (self.status, Json(body)).into_response()
    }
}
