//! HTTP endpoint handlers

use std::sync::Arc;
use axum::{extract::State, response::Json};
use tracing::{debug, info};

use crate::state::{AppState, TimerCommand};
use super::responses::{ApiResponse, HealthResponse, StatusResponse, TimerView};

fn control(state: &AppState, command: TimerCommand) -> Json<ApiResponse> {
    let outcome = state.apply(command);
    if !outcome.applied {
        debug!("{} endpoint ignored, timer is {}", command, outcome.status.action);
        return Json(ApiResponse::ignored(
            format!("Timer cannot {} while {}", command, outcome.status.action.as_str()),
            &outcome.status,
        ));
    }

    info!("{} endpoint called - timer is now {}", command, outcome.status.action);
    Json(ApiResponse::applied(
        format!("Timer {} applied", command),
        &outcome.status,
    ))
}

/// Handle POST /start - Start or restart the timer
pub async fn start_handler(State(state): State<Arc<AppState>>) -> Json<ApiResponse> {
    control(&state, TimerCommand::Start)
}

/// Handle POST /pause - Pause the running timer
pub async fn pause_handler(State(state): State<Arc<AppState>>) -> Json<ApiResponse> {
    control(&state, TimerCommand::Pause)
}

/// Handle POST /resume - Resume a paused timer
pub async fn resume_handler(State(state): State<Arc<AppState>>) -> Json<ApiResponse> {
    control(&state, TimerCommand::Resume)
}

/// Handle POST /stop - Stop the timer for good
pub async fn stop_handler(State(state): State<Arc<AppState>>) -> Json<ApiResponse> {
    control(&state, TimerCommand::Stop)
}

/// Handle GET /status - Return current timer and server status
pub async fn status_handler(State(state): State<Arc<AppState>>) -> Json<StatusResponse> {
    let timer = state.timer.status();
    let (last_action, last_action_time) = state.get_last_action();

    Json(StatusResponse {
        timer: TimerView::from(&timer),
        completions: state.completions.count(),
        last_completed_at: state.completions.last_completed_at(),
        uptime: state.get_uptime(),
        port: state.port,
        host: state.host.clone(),
        last_action,
        last_action_time,
    })
}

/// Handle GET /health - Health check endpoint
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse::ok())
}
