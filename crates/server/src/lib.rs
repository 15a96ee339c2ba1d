//! Climate Agent Server
//!
//! HTTP endpoints and SSE streaming for the query pipeline.

pub mod http;
pub mod metrics;
pub mod state;
pub mod streaming;

pub use http::create_router;
pub use metrics::init_metrics;
pub use state::AppState;

use thiserror::Error;

/// Server errors
#[derive(Error, Debug)]
pub enum ServerError {
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<ServerError> for axum::http::StatusCode {
    fn from(err: ServerError) -> Self {
        match err {
            ServerError::InvalidRequest(_) => axum::http::StatusCode::BAD_REQUEST,
            ServerError::Internal(_) => axum::http::StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}
