use std::sync::Arc;

use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Path, Query, State,
    },
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{delete, get},
    Json, Router,
};
use chrono::DateTime;
use serde::{Deserialize, Serialize};
use tower_http::cors::CorsLayer;
use tracing::info;

use crate::assistant::Assistant;
use crate::error::AlarmError;
use crate::scheduler::{Alarm, AlarmId};

/// Error code for requests carrying invalid parameters.
pub const ERRCODE_INVALID_PARAMETERS: &str = "INVALID_PARAMETERS";

#[derive(Clone)]
pub struct AppState {
    assistant: Arc<Assistant>,
}

impl AppState {
    pub fn new(assistant: Arc<Assistant>) -> Self {
        Self { assistant }
    }
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/alarms", get(list_alarms).post(set_alarm))
        .route("/alarms/{id}", delete(delete_alarm))
        .route(
            "/notifications",
            get(list_notifications).delete(remove_notification),
        )
        .layer(CorsLayer::very_permissive())
        .with_state(state)
}

/// `{"status": "success"|"error", "data": ...}`
#[derive(Debug, Serialize)]
pub struct Envelope<T> {
    status: &'static str,
    data: T,
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    error: &'static str,
    details: String,
}

fn success<T: Serialize>(data: T) -> Json<Envelope<T>> {
    Json(Envelope {
        status: "success",
        data,
    })
}

fn bad_request(details: impl Into<String>) -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(Envelope {
            status: "error",
            data: ErrorBody {
                error: ERRCODE_INVALID_PARAMETERS,
                details: details.into(),
            },
        }),
    )
        .into_response()
}

#[derive(Debug, Deserialize)]
struct ScheduleReq {
    /// Unix seconds, UTC.
    time: i64,
    title: String,
    #[serde(default)]
    include_news: bool,
    #[serde(default)]
    include_weather: bool,
}

#[derive(Debug, Serialize)]
struct ScheduleResp {
    alarm_id: AlarmId,
}

async fn set_alarm(
    State(state): State<AppState>,
    payload: Result<Json<ScheduleReq>, JsonRejection>,
) -> Response {
    let req = match payload {
        Ok(Json(req)) => req,
        Err(rejection) => return bad_request(rejection.body_text()),
    };
    info!(target: "api", endpoint = "/alarms", method = "POST", ?req, "api call");

    let Some(fire_at) = DateTime::from_timestamp(req.time, 0) else {
        return bad_request("The alarm time is out of range.");
    };
    if req.title.trim().is_empty() {
        return bad_request("The alarm title must not be empty.");
    }

    let alarm_id = state.assistant.schedule_alarm(
        fire_at,
        req.title.trim(),
        req.include_news,
        req.include_weather,
    );
    success(ScheduleResp { alarm_id }).into_response()
}

async fn list_alarms(State(state): State<AppState>) -> Json<Envelope<Vec<Alarm>>> {
    success(state.assistant.pending_alarms())
}

async fn delete_alarm(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    info!(target: "api", endpoint = "/alarms/{id}", method = "DELETE", %id, "api call");

    match state.assistant.cancel_alarm(&AlarmId::from(id)) {
        Ok(()) => success(()).into_response(),
        Err(AlarmError::NotFound(_)) => bad_request("The alarm does not exist."),
    }
}

#[derive(Debug, Deserialize)]
struct ListQuery {
    #[serde(default)]
    refresh: bool,
}

async fn list_notifications(
    State(state): State<AppState>,
    query: Result<Query<ListQuery>, QueryRejection>,
) -> Response {
    let q = match query {
        Ok(Query(q)) => q,
        Err(rejection) => return bad_request(rejection.body_text()),
    };
    info!(target: "api", endpoint = "/notifications", method = "GET", refresh = q.refresh, "api call");
    success(state.assistant.list_notifications(q.refresh).await).into_response()
}

#[derive(Debug, Deserialize)]
struct RemoveQuery {
    title: String,
}

async fn remove_notification(
    State(state): State<AppState>,
    query: Result<Query<RemoveQuery>, QueryRejection>,
) -> Response {
    let q = match query {
        Ok(Query(q)) => q,
        Err(rejection) => return bad_request(rejection.body_text()),
    };
    info!(target: "api", endpoint = "/notifications", method = "DELETE", title = %q.title, "api call");
    state.assistant.remove_notification(&q.title).await;
    success(()).into_response()
}
