//! HTTP control surface tests

use std::{sync::Arc, time::Duration};
use axum::{
    body::{to_bytes, Body},
    http::{Method, Request, StatusCode},
    Router,
};
use serde_json::Value;
use tower::ServiceExt;

use thrimer::{
    create_router,
    state::AppState,
    timer::{ManualScheduler, Timer},
};

fn app(repeats: bool) -> (Router, Arc<AppState>, ManualScheduler) {
    let scheduler = ManualScheduler::new();
    let timer = Timer::builder(Duration::from_secs(5))
        .repeats(repeats)
        .autostart(false)
        .scheduler(Arc::new(scheduler.clone()))
        .build()
        .unwrap();
    let state = Arc::new(AppState::new(20554, "127.0.0.1".to_string(), timer));
    (create_router(Arc::clone(&state)), state, scheduler)
}

async fn call(router: &Router, method: Method, uri: &str) -> (StatusCode, Value) {
    let response = router
        .clone()
        .oneshot(
            Request::builder()
                .method(method)
                .uri(uri)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    let status = response.status();
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&body).unwrap())
}

#[tokio::test]
async fn health_reports_ok() {
    let (router, _state, _scheduler) = app(false);
    let (status, body) = call(&router, Method::GET, "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn start_then_status_shows_running_timer() {
    let (router, _state, _scheduler) = app(false);

    let (status, body) = call(&router, Method::POST, "/start").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "applied");
    assert_eq!(body["timer"]["action"], "start");
    assert_eq!(body["timer"]["running"], true);

    let (_, body) = call(&router, Method::GET, "/status").await;
    assert_eq!(body["timer"]["running"], true);
    assert_eq!(body["timer"]["duration_seconds"], 5.0);
    assert!(body["timer"]["time_remaining_seconds"].is_number());
    assert_eq!(body["last_action"], "start");
    assert_eq!(body["port"], 20554);
}

#[tokio::test]
async fn pause_and_resume_round_trip() {
    let (router, _state, scheduler) = app(false);
    call(&router, Method::POST, "/start").await;

    let (_, body) = call(&router, Method::POST, "/pause").await;
    assert_eq!(body["status"], "applied");
    assert_eq!(body["timer"]["action"], "pause");
    assert_eq!(body["timer"]["paused"], true);
    assert!(body["timer"]["paused_elapsed_seconds"].is_number());
    assert_eq!(body["timer"]["time_remaining_seconds"], Value::Null);
    assert_eq!(scheduler.live(), 0);

    let (_, body) = call(&router, Method::POST, "/resume").await;
    assert_eq!(body["status"], "applied");
    assert_eq!(body["timer"]["running"], true);
    assert_eq!(scheduler.live(), 1);
}

#[tokio::test]
async fn inapplicable_commands_are_ignored() {
    let (router, _state, _scheduler) = app(false);

    let (status, body) = call(&router, Method::POST, "/pause").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ignored");
    assert_eq!(body["timer"]["action"], "idle");

    let (_, body) = call(&router, Method::POST, "/resume").await;
    assert_eq!(body["status"], "ignored");
}

#[tokio::test]
async fn second_pause_is_ignored() {
    let (router, state, _scheduler) = app(false);
    call(&router, Method::POST, "/start").await;

    let (_, first) = call(&router, Method::POST, "/pause").await;
    let (_, second) = call(&router, Method::POST, "/pause").await;
    assert_eq!(first["status"], "applied");
    assert_eq!(second["status"], "ignored");
    assert_eq!(second["timer"]["action"], "pause");
    assert_eq!(state.get_last_action().0.as_deref(), Some("pause"));
}

#[tokio::test]
async fn completions_are_counted_in_status() {
    let (router, _state, scheduler) = app(true);
    call(&router, Method::POST, "/start").await;

    scheduler.fire();
    scheduler.fire();

    let (_, body) = call(&router, Method::GET, "/status").await;
    assert_eq!(body["completions"], 2);
    assert!(body["last_completed_at"].is_string());
    assert_eq!(body["timer"]["running"], true);
}

#[tokio::test]
async fn stop_is_terminal_over_http() {
    let (router, state, scheduler) = app(false);
    call(&router, Method::POST, "/start").await;

    let (_, body) = call(&router, Method::POST, "/stop").await;
    assert_eq!(body["status"], "applied");
    assert_eq!(body["timer"]["action"], "stop");
    assert_eq!(body["timer"]["stopped"], true);

    let (_, body) = call(&router, Method::POST, "/start").await;
    assert_eq!(body["status"], "ignored");
    assert_eq!(body["timer"]["running"], false);

    let (_, body) = call(&router, Method::POST, "/stop").await;
    assert_eq!(body["status"], "ignored");

    assert!(state.timer.is_stopped());
    assert_eq!(scheduler.live(), 0);
}
