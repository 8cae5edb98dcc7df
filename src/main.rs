use anyhow::Result;

use pomodesk::api::{self, AppState};
use pomodesk::config::{self, Config};
use pomodesk::logging;
use pomodesk::tasks::{SqliteTaskRepository, TaskManager};
use pomodesk::timer::engine::DEFAULT_TICK_INTERVAL;
use pomodesk::timer::TimerEngine;

#[tokio::main]
async fn main() -> Result<()> {
    // Ensure config directory exists (creates logs dir too)
    config::ensure_directories()?;

    // Initialize logging BEFORE any tracing calls
    let (log_file_info, _guard) = logging::init_logging(&config::logs_dir())?;

    let config = Config::load()?;

    if let Ok(count) =
        logging::cleanup_old_logs_with_retention(&config::logs_dir(), config.log_retention_days)
    {
        if count > 0 {
            tracing::info!("Cleaned up {} old log files", count);
        }
    }

    tracing::info!("Logging to: {}", log_file_info.path.display());

    let tasks = open_task_manager(&config);
    let timer = TimerEngine::with_options(
        config.durations(),
        DEFAULT_TICK_INTERVAL,
        config.auto_continue,
    );

    let server = api::start(config.port, AppState::new(timer.clone(), tasks)).await?;

    shutdown_signal().await;
    tracing::info!("Shutting down");

    api::shutdown(server, &timer, config.shutdown_grace()).await?;

    Ok(())
}

/// Build the task manager, falling back to memory only if the database is unavailable
fn open_task_manager(config: &Config) -> TaskManager {
    if !config.persist_tasks {
        tracing::info!("Task persistence disabled");
        return TaskManager::new();
    }

    match SqliteTaskRepository::open(&config.database_path) {
        Ok(repo) => {
            let mut manager = TaskManager::with_repository(Box::new(repo));
            match manager.reload() {
                Some(Ok(count)) => tracing::info!(
                    "Loaded {} tasks from {}",
                    count,
                    config.database_path.display()
                ),
                Some(Err(e)) => tracing::warn!("Failed to load stored tasks: {}", e),
                None => {}
            }
            manager
        }
        Err(e) => {
            tracing::error!("Running without task persistence: {}", e);
            TaskManager::new()
        }
    }
}

/// Wait for Ctrl-C or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}
