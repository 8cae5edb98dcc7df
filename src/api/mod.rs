//! HTTP API module
//!
//! Translates JSON requests into timer and task list calls. The timer is a
//! cloneable engine handle; the task list sits behind an async mutex.

pub mod server;
mod tasks;
mod timer;

pub use server::{router, shutdown, start, ServerHandle};

use std::sync::Arc;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;
use tokio::sync::Mutex;

use crate::tasks::{StoreError, TaskError, TaskManager};
use crate::timer::TimerEngine;

/// State shared by all request handlers
#[derive(Clone)]
pub struct AppState {
    pub timer: TimerEngine,
    pub tasks: Arc<Mutex<TaskManager>>,
}

impl AppState {
    pub fn new(timer: TimerEngine, tasks: TaskManager) -> Self {
        Self {
            timer,
            tasks: Arc::new(Mutex::new(tasks)),
        }
    }
}

/// Errors surfaced to HTTP clients
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    InvalidInput(String),

    #[error(transparent)]
    Task(#[from] TaskError),

    #[error("no task repository is configured")]
    NoRepository,

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("task worker failed: {0}")]
    Worker(#[from] tokio::task::JoinError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match &self {
            ApiError::InvalidInput(_) | ApiError::Task(_) => (
                StatusCode::BAD_REQUEST,
                json!({ "status": "error", "message": self.to_string() }),
            ),
            ApiError::NoRepository => (
                StatusCode::BAD_REQUEST,
                json!({ "status": "no-repository" }),
            ),
            ApiError::Store(_) | ApiError::Worker(_) => {
                tracing::error!("Task request failed: {}", self);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({ "status": "error", "message": self.to_string() }),
                )
            }
        };
        (status, Json(body)).into_response()
    }
}
