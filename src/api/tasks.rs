//! Task list routes
//!
//! Task manager calls may hit SQLite, so they run on the blocking pool while
//! holding the list lock.

use axum::extract::{Query, State};
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};

use super::{ApiError, AppState};
use crate::tasks::{parse_due_date, Priority, Task, TaskManager};

/// Trim a title and reject blank ones
fn normalize_title(title: &str) -> Result<String, ApiError> {
    let title = title.trim();
    if title.is_empty() {
        return Err(ApiError::InvalidInput("title must not be empty".to_string()));
    }
    Ok(title.to_string())
}

/// Body of POST /add_task
#[derive(Debug, Deserialize)]
pub struct AddTaskRequest {
    pub title: String,
    #[serde(default)]
    pub priority: Option<String>,
    #[serde(default)]
    pub due_date: Option<String>,
}

impl AddTaskRequest {
    fn into_task(self) -> Result<Task, ApiError> {
        let title = normalize_title(&self.title)?;

        let priority = match self.priority.as_deref() {
            Some(p) => p.parse::<Priority>()?,
            None => Priority::default(),
        };

        // An empty string means "no due date", as sent by an empty form field
        let due_date = match self.due_date.as_deref().map(str::trim) {
            Some(d) if !d.is_empty() => Some(parse_due_date(d)?),
            _ => None,
        };

        Ok(Task::new(title, priority, due_date))
    }
}

/// Body of POST /complete_task and POST /delete_task
#[derive(Debug, Deserialize)]
pub struct TitleRequest {
    pub title: String,
}

impl TitleRequest {
    fn into_title(self) -> Result<String, ApiError> {
        normalize_title(&self.title)
    }
}

/// Query of GET /filter_priority
#[derive(Debug, Deserialize)]
pub struct PriorityQuery {
    pub priority: String,
}

/// Run `f` against the task manager on the blocking pool
async fn with_tasks<T, F>(state: &AppState, f: F) -> Result<T, ApiError>
where
    F: FnOnce(&mut TaskManager) -> T + Send + 'static,
    T: Send + 'static,
{
    let mut manager = state.tasks.clone().lock_owned().await;
    let result = tokio::task::spawn_blocking(move || f(&mut manager)).await?;
    Ok(result)
}

/// POST /add_task
pub(super) async fn add_task(
    State(state): State<AppState>,
    Json(request): Json<AddTaskRequest>,
) -> Result<Json<Value>, ApiError> {
    let task = request.into_task()?;
    let saved_id = with_tasks(&state, move |tasks| tasks.add(task)).await?;
    Ok(Json(json!({ "status": "ok", "saved_id": saved_id })))
}

/// GET /tasks
pub(super) async fn list_tasks(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    let (tasks, degraded) =
        with_tasks(&state, |tasks| (tasks.stored_tasks(), tasks.is_degraded())).await?;
    Ok(Json(json!({ "tasks": tasks, "degraded": degraded })))
}

/// GET /db_rows
pub(super) async fn db_rows(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    let rows = with_tasks(&state, |tasks| tasks.rows())
        .await?
        .ok_or(ApiError::NoRepository)??;
    Ok(Json(json!({ "rows": rows })))
}

/// GET /sort_priority
pub(super) async fn sort_priority(State(state): State<AppState>) -> Json<Value> {
    state.tasks.lock().await.sort_priority();
    Json(json!({ "status": "sorted" }))
}

/// GET /sort_due_date
pub(super) async fn sort_due_date(State(state): State<AppState>) -> Json<Value> {
    state.tasks.lock().await.sort_by_due_date();
    Json(json!({ "status": "sorted" }))
}

/// GET /filter_priority?priority=High
pub(super) async fn filter_priority(
    State(state): State<AppState>,
    Query(query): Query<PriorityQuery>,
) -> Result<Json<Value>, ApiError> {
    let priority = query.priority.parse::<Priority>()?;
    let tasks = state.tasks.lock().await.filter_priority(priority);
    Ok(Json(json!({ "tasks": tasks })))
}

/// GET|POST /reload_tasks
pub(super) async fn reload_tasks(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    let count = with_tasks(&state, |tasks| tasks.reload())
        .await?
        .ok_or(ApiError::NoRepository)??;
    tracing::info!(count, "Reloaded tasks from repository");
    Ok(Json(json!({ "status": "reloaded", "count": count })))
}

/// POST /complete_task
pub(super) async fn complete_task(
    State(state): State<AppState>,
    Json(request): Json<TitleRequest>,
) -> Result<Json<Value>, ApiError> {
    let title = request.into_title()?;
    with_tasks(&state, move |tasks| tasks.mark_complete(&title)).await?;
    Ok(Json(json!({ "status": "completed" })))
}

/// POST /delete_task
pub(super) async fn delete_task(
    State(state): State<AppState>,
    Json(request): Json<TitleRequest>,
) -> Result<Json<Value>, ApiError> {
    let title = request.into_title()?;
    with_tasks(&state, move |tasks| tasks.delete(&title)).await?;
    Ok(Json(json!({ "status": "deleted" })))
}

#[cfg(test)]
mod tests {
    use super::super::test_support::send;
    use super::super::{router, AppState};
    use crate::tasks::{SqliteTaskRepository, TaskManager};
    use crate::timer::TimerEngine;
    use axum::http::StatusCode;
    use axum::Router;
    use serde_json::{json, Value};

    fn memory_app() -> Router {
        router(AppState::new(TimerEngine::default(), TaskManager::new()))
    }

    fn sqlite_app() -> Router {
        let repo = SqliteTaskRepository::open_in_memory().unwrap();
        router(AppState::new(
            TimerEngine::default(),
            TaskManager::with_repository(Box::new(repo)),
        ))
    }

    async fn add(app: &Router, body: Value) -> (StatusCode, Value) {
        send(app, "POST", "/add_task", Some(body)).await
    }

    fn titles(body: &Value) -> Vec<String> {
        body["tasks"]
            .as_array()
            .unwrap()
            .iter()
            .map(|t| t["title"].as_str().unwrap().to_string())
            .collect()
    }

    #[tokio::test]
    async fn test_add_and_list_tasks() {
        let app = sqlite_app();

        let (status, body) = add(
            &app,
            json!({ "title": "Write docs", "priority": "High", "due_date": "2026-11-01" }),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
        assert_eq!(body["saved_id"], 1);

        let (status, body) = send(&app, "GET", "/tasks", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["degraded"], false);
        assert_eq!(
            body["tasks"],
            json!([{
                "title": "Write docs",
                "priority": "High",
                "due_date": "2026-11-01",
                "completed": false
            }])
        );
    }

    #[tokio::test]
    async fn test_add_task_defaults() {
        let app = memory_app();

        let (status, body) = add(&app, json!({ "title": "Plain", "due_date": "" })).await;
        assert_eq!(status, StatusCode::OK);
        assert!(body["saved_id"].is_null());

        let (_, body) = send(&app, "GET", "/tasks", None).await;
        assert_eq!(body["tasks"][0]["priority"], "Medium");
        assert!(body["tasks"][0]["due_date"].is_null());
    }

    #[tokio::test]
    async fn test_add_task_rejects_bad_input() {
        let app = memory_app();

        let (status, body) = add(&app, json!({ "title": "X", "priority": "Urgent" })).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["status"], "error");

        let (status, _) = add(&app, json!({ "title": "X", "due_date": "someday" })).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = add(&app, json!({ "title": "   " })).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = add(&app, json!({ "priority": "Low" })).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

        let (_, body) = send(&app, "GET", "/tasks", None).await;
        assert!(body["tasks"].as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_sort_priority_route() {
        let app = memory_app();
        add(&app, json!({ "title": "low", "priority": "Low" })).await;
        add(&app, json!({ "title": "high", "priority": "High" })).await;
        add(&app, json!({ "title": "medium" })).await;

        let (status, body) = send(&app, "GET", "/sort_priority", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({ "status": "sorted" }));

        let (_, body) = send(&app, "GET", "/tasks", None).await;
        assert_eq!(titles(&body), vec!["high", "medium", "low"]);
    }

    #[tokio::test]
    async fn test_sort_due_date_route() {
        let app = memory_app();
        add(&app, json!({ "title": "none" })).await;
        add(&app, json!({ "title": "later", "due_date": "2026-12-24" })).await;
        add(&app, json!({ "title": "sooner", "due_date": "2026-10-20T09:00:00" })).await;

        let (status, _) = send(&app, "GET", "/sort_due_date", None).await;
        assert_eq!(status, StatusCode::OK);

        let (_, body) = send(&app, "GET", "/tasks", None).await;
        assert_eq!(titles(&body), vec!["sooner", "later", "none"]);
    }

    #[tokio::test]
    async fn test_filter_priority_route() {
        let app = memory_app();
        add(&app, json!({ "title": "a", "priority": "High" })).await;
        add(&app, json!({ "title": "b", "priority": "Low" })).await;

        let (status, body) = send(&app, "GET", "/filter_priority?priority=High", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(titles(&body), vec!["a"]);

        let (status, _) = send(&app, "GET", "/filter_priority?priority=Huge", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = send(&app, "GET", "/filter_priority", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_complete_and_delete_routes() {
        let app = sqlite_app();
        add(&app, json!({ "title": "finish" })).await;
        add(&app, json!({ "title": "drop" })).await;

        let (status, body) = send(
            &app,
            "POST",
            "/complete_task",
            Some(json!({ "title": "finish" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({ "status": "completed" }));

        let (status, body) =
            send(&app, "POST", "/delete_task", Some(json!({ "title": "drop" }))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({ "status": "deleted" }));

        let (_, body) = send(&app, "GET", "/db_rows", None).await;
        let rows = body["rows"].as_array().unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["title"], "finish");
        assert_eq!(rows[0]["completed"], true);
        assert_eq!(rows[0]["id"], 1);
    }

    #[tokio::test]
    async fn test_title_routes_trim_and_reject_blank() {
        let app = sqlite_app();
        add(&app, json!({ "title": " Write " })).await;

        let (status, _) = send(
            &app,
            "POST",
            "/complete_task",
            Some(json!({ "title": "  Write  " })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let (_, body) = send(&app, "GET", "/tasks", None).await;
        assert_eq!(body["tasks"][0]["title"], "Write");
        assert_eq!(body["tasks"][0]["completed"], true);

        for uri in ["/complete_task", "/delete_task"] {
            let (status, body) = send(&app, "POST", uri, Some(json!({ "title": "  " }))).await;
            assert_eq!(status, StatusCode::BAD_REQUEST);
            assert_eq!(body["status"], "error");
        }

        let (status, _) =
            send(&app, "POST", "/delete_task", Some(json!({ "title": "Write " }))).await;
        assert_eq!(status, StatusCode::OK);
        let (_, body) = send(&app, "GET", "/tasks", None).await;
        assert!(body["tasks"].as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_concurrent_adds_are_all_kept() {
        let app = sqlite_app();

        let requests = (0..20).map(|i| {
            let app = app.clone();
            tokio::spawn(async move {
                send(&app, "POST", "/add_task", Some(json!({ "title": format!("task-{i}") }))).await
            })
        });
        for request in requests.collect::<Vec<_>>() {
            let (status, _) = request.await.unwrap();
            assert_eq!(status, StatusCode::OK);
        }

        let (_, body) = send(&app, "GET", "/db_rows", None).await;
        assert_eq!(body["rows"].as_array().unwrap().len(), 20);
    }

    #[tokio::test]
    async fn test_reload_tasks() {
        let app = sqlite_app();
        add(&app, json!({ "title": "one" })).await;
        add(&app, json!({ "title": "two" })).await;

        for method in ["GET", "POST"] {
            let (status, body) = send(&app, method, "/reload_tasks", None).await;
            assert_eq!(status, StatusCode::OK);
            assert_eq!(body, json!({ "status": "reloaded", "count": 2 }));
        }
    }

    #[tokio::test]
    async fn test_routes_without_repository() {
        let app = memory_app();

        let (status, body) = send(&app, "POST", "/reload_tasks", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, json!({ "status": "no-repository" }));

        let (status, _) = send(&app, "GET", "/db_rows", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }
}
