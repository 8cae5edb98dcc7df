//! API server module
//!
//! Builds the router and runs it on a local port until shut down.

use anyhow::Result;
use axum::routing::{get, post};
use axum::Router;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::info;

use super::{tasks, timer, AppState};
use crate::timer::TimerEngine;

/// Handle to control the running server
pub struct ServerHandle {
    shutdown_tx: Option<oneshot::Sender<()>>,
    addr: SocketAddr,
    task: JoinHandle<()>,
}

impl ServerHandle {
    /// Get the address the server is listening on
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Shutdown the server gracefully and wait for in-flight requests
    pub async fn shutdown(mut self) -> Result<()> {
        if let Some(tx) = self.shutdown_tx.take() {
            // Ignore error if receiver is already dropped
            let _ = tx.send(());
        }
        self.task.await?;
        Ok(())
    }
}

/// Build the router with every route
pub fn router(state: AppState) -> Router {
    Router::new()
        // Timer
        .route("/update_durations", post(timer::update_durations))
        .route("/toggle_timer", post(timer::toggle_timer))
        .route("/reset_timer", post(timer::reset_timer))
        .route("/reset_durations", post(timer::reset_durations))
        .route("/prev_state", post(timer::prev_state))
        .route("/next_state", post(timer::next_state))
        .route("/get_state", get(timer::get_state).post(timer::get_state))
        // Tasks
        .route("/add_task", post(tasks::add_task))
        .route("/tasks", get(tasks::list_tasks))
        .route("/db_rows", get(tasks::db_rows))
        .route("/sort_priority", get(tasks::sort_priority))
        .route("/sort_due_date", get(tasks::sort_due_date))
        .route("/filter_priority", get(tasks::filter_priority))
        .route(
            "/reload_tasks",
            get(tasks::reload_tasks).post(tasks::reload_tasks),
        )
        .route("/complete_task", post(tasks::complete_task))
        .route("/delete_task", post(tasks::delete_task))
        .with_state(state)
}

/// Start the API server on 127.0.0.1
///
/// # Arguments
/// * `port` - Port to listen on, 0 for any free port
/// * `state` - Timer and task list shared with the handlers
///
/// # Returns
/// A `ServerHandle` that can be used to shut down the server
pub async fn start(port: u16, state: AppState) -> Result<ServerHandle> {
    let app = router(state);

    let addr = SocketAddr::from(([127, 0, 0, 1], port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    let bound_addr = listener.local_addr()?;

    info!("API server listening on http://{}", bound_addr);

    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();

    let task = tokio::spawn(async move {
        let result = axum::serve(listener, app)
            .with_graceful_shutdown(async {
                shutdown_rx.await.ok();
                info!("API server shutting down");
            })
            .await;
        if let Err(e) = result {
            tracing::error!("API server error: {}", e);
        }
    });

    Ok(ServerHandle {
        shutdown_tx: Some(shutdown_tx),
        addr: bound_addr,
        task,
    })
}

/// Drain the server, then stop the timer
///
/// The server goes first so no request can restart the timer after it has
/// been stopped.
pub async fn shutdown(server: ServerHandle, timer: &TimerEngine, grace: Duration) -> Result<()> {
    server.shutdown().await?;
    timer.shutdown(grace).await;
    Ok(())
}
