//! Timer routes

use axum::extract::State;
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::debug;

use super::{ApiError, AppState};
use crate::timer::{DurationUpdate, TimerSnapshot};

/// Body of POST /update_durations; minutes per phase
#[derive(Debug, Default, Deserialize)]
pub struct UpdateDurationsRequest {
    #[serde(default)]
    pub work: Option<i64>,
    #[serde(default)]
    pub small_break: Option<i64>,
    #[serde(default)]
    pub long_break: Option<i64>,
}

impl UpdateDurationsRequest {
    fn into_update(self) -> Result<DurationUpdate, ApiError> {
        Ok(DurationUpdate {
            work_minutes: positive_minutes("work", self.work)?,
            short_break_minutes: positive_minutes("small_break", self.small_break)?,
            long_break_minutes: positive_minutes("long_break", self.long_break)?,
        })
    }
}

fn positive_minutes(field: &str, value: Option<i64>) -> Result<Option<u32>, ApiError> {
    match value {
        None => Ok(None),
        Some(v) if v > 0 => u32::try_from(v)
            .map(Some)
            .map_err(|_| ApiError::InvalidInput(format!("{} is too large", field))),
        Some(v) => Err(ApiError::InvalidInput(format!(
            "{} must be a positive number of minutes, got {}",
            field, v
        ))),
    }
}

/// POST /update_durations
pub(super) async fn update_durations(
    State(state): State<AppState>,
    Json(request): Json<UpdateDurationsRequest>,
) -> Result<Json<Value>, ApiError> {
    let update = request.into_update()?;
    state.timer.update_durations(update);
    Ok(Json(json!({ "status": "success" })))
}

/// POST /toggle_timer
pub(super) async fn toggle_timer(State(state): State<AppState>) -> Json<Value> {
    let status = if state.timer.toggle() {
        "started"
    } else {
        "stopped"
    };
    debug!(status, "Toggled timer");
    Json(json!({ "status": status }))
}

/// POST /reset_timer
pub(super) async fn reset_timer(State(state): State<AppState>) -> Json<TimerSnapshot> {
    state.timer.reset_timer();
    Json(state.timer.snapshot())
}

/// POST /reset_durations
pub(super) async fn reset_durations(State(state): State<AppState>) -> Json<Value> {
    let durations = state.timer.reset_durations();
    Json(json!({
        "status": "success",
        "work": durations.work_minutes,
        "small_break": durations.short_break_minutes,
        "long_break": durations.long_break_minutes,
    }))
}

/// POST /prev_state
pub(super) async fn prev_state(State(state): State<AppState>) -> Json<TimerSnapshot> {
    state.timer.stop_and_join().await;
    Json(state.timer.prev_state())
}

/// POST /next_state
pub(super) async fn next_state(State(state): State<AppState>) -> Json<TimerSnapshot> {
    state.timer.stop_and_join().await;
    Json(state.timer.next_state())
}

/// GET|POST /get_state
pub(super) async fn get_state(State(state): State<AppState>) -> Json<TimerSnapshot> {
    Json(state.timer.snapshot())
}
