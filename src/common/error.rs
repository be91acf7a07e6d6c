use axum::{
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use bytes::Bytes;
use thiserror::Error;
use tracing::error;

use crate::common::response::ApiError;
use crate::modules::transcode::{JobError, StoreError};
use crate::vast::XmlError;

#[derive(Debug, Error)]
pub enum AppError {
    /// The ad server answered with something other than 200; relayed as is.
    #[error("ad server returned {status}")]
    Upstream {
        status: StatusCode,
        body: Bytes,
        content_type: Option<HeaderValue>,
    },

    #[error("failed to fetch ad document: {0}")]
    Fetch(#[source] reqwest::Error),

    #[error("failed to decompress ad document: {0}")]
    Decompress(#[source] std::io::Error),

    #[error("failed to decode ad document: {0}")]
    Decode(#[source] XmlError),

    #[error("failed to encode ad document: {0}")]
    Encode(#[source] XmlError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Job(#[from] JobError),

    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Internal(String),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Upstream { status, .. } => *status,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        match self {
            AppError::Upstream {
                status,
                body,
                content_type,
            } => {
                let mut response = (status, body).into_response();
                if let Some(content_type) = content_type {
                    response.headers_mut().insert(header::CONTENT_TYPE, content_type);
                }
                response
            }
            other => {
                if status.is_server_error() {
                    error!(error = %other, "request failed");
                }
                ApiError(other.to_string(), status).into_response()
            }
        }
    }
}
