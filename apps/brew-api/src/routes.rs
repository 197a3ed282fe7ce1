use std::collections::BTreeMap;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use brew_engine::{
	BehaviorProfile, Error as EngineError, ExperimentDescriptor, FeedbackAction, RecommendRequest,
	RecommendResponse,
};
use brew_store::EventType;

use crate::state::AppState;

pub fn router(state: AppState) -> Router {
	Router::new()
		.route("/health", get(health))
		.route("/v1/recommend", post(recommend))
		.route("/v1/behavior/record", post(record_behavior))
		.route("/v1/behavior/{user_id}", get(behavior_profile))
		.route("/v1/session/feedback", post(session_feedback))
		.route("/v1/experiments", get(experiments))
		.route("/v1/personas", get(personas))
		.with_state(state)
}

async fn health() -> StatusCode {
	StatusCode::OK
}

async fn recommend(
	State(state): State<AppState>,
	Json(payload): Json<RecommendRequest>,
) -> Result<Json<RecommendResponse>, ApiError> {
	// A failed warm-up is retried here; until it succeeds this answers 502.
	state.engine.ensure_ready().await?;

	let response = state.engine.recommend(payload).await?;
	Ok(Json(response))
}

#[derive(Debug, Deserialize)]
struct RecordBehaviorRequest {
	user_id: String,
	sku: String,
	event: String,
	at: Option<i64>,
}

#[derive(Debug, Serialize)]
struct RecordBehaviorResponse {
	recorded: bool,
}

async fn record_behavior(
	State(state): State<AppState>,
	Json(payload): Json<RecordBehaviorRequest>,
) -> Result<Json<RecordBehaviorResponse>, ApiError> {
	let event = match payload.event.as_str() {
		"order" => EventType::Order,
		"click" => EventType::Click,
		"like" => EventType::Like,
		"dislike" => EventType::Dislike,
		other =>
			return Err(json_error(
				StatusCode::BAD_REQUEST,
				"invalid_event",
				format!("Unknown event type {other:?}."),
			)),
	};
	let at = match payload.at {
		Some(unix) => OffsetDateTime::from_unix_timestamp(unix).map_err(|_| {
			json_error(StatusCode::BAD_REQUEST, "invalid_event", "Invalid timestamp.")
		})?,
		None => OffsetDateTime::now_utc(),
	};

	state.engine.record_event(&payload.user_id, &payload.sku, event, at)?;
	Ok(Json(RecordBehaviorResponse { recorded: true }))
}

async fn behavior_profile(
	State(state): State<AppState>,
	Path(user_id): Path<String>,
) -> Result<Json<BehaviorProfile>, ApiError> {
	let profile = state.engine.behavior_profile(&user_id)?;
	Ok(Json(profile))
}

#[derive(Debug, Deserialize)]
struct SessionFeedbackRequest {
	session_id: String,
	sku: String,
	action: FeedbackAction,
}

#[derive(Debug, Serialize)]
struct SessionFeedbackResponse {
	applied: bool,
}

async fn session_feedback(
	State(state): State<AppState>,
	Json(payload): Json<SessionFeedbackRequest>,
) -> Result<Json<SessionFeedbackResponse>, ApiError> {
	state.engine.session_feedback(&payload.session_id, &payload.sku, payload.action)?;
	Ok(Json(SessionFeedbackResponse { applied: true }))
}

#[derive(Debug, Serialize)]
struct ExperimentsResponse {
	experiments: Vec<ExperimentDescriptor>,
}

async fn experiments(State(state): State<AppState>) -> Json<ExperimentsResponse> {
	Json(ExperimentsResponse { experiments: state.engine.experiments.list_active() })
}

#[derive(Debug, Serialize)]
struct PersonasResponse {
	personas: BTreeMap<String, brew_config::Persona>,
}

async fn personas(State(state): State<AppState>) -> Json<PersonasResponse> {
	Json(PersonasResponse {
		personas: state
			.engine
			.cfg
			.personas
			.iter()
			.map(|(name, persona)| (name.clone(), persona.clone()))
			.collect(),
	})
}

#[derive(Debug, Serialize)]
struct ErrorBody {
	error_code: String,
	message: String,
}

#[derive(Debug)]
pub struct ApiError {
	status: StatusCode,
	error_code: String,
	message: String,
}

fn json_error(status: StatusCode, code: &str, message: impl Into<String>) -> ApiError {
	ApiError { status, error_code: code.to_string(), message: message.into() }
}

impl From<EngineError> for ApiError {
	fn from(err: EngineError) -> Self {
		match &err {
			EngineError::Configuration { .. } =>
				json_error(StatusCode::SERVICE_UNAVAILABLE, "configuration", err.to_string()),
			EngineError::InvalidRequest { .. } =>
				json_error(StatusCode::BAD_REQUEST, "invalid_request", err.to_string()),
			EngineError::InvalidEvent { .. } =>
				json_error(StatusCode::BAD_REQUEST, "invalid_event", err.to_string()),
			EngineError::NotFound(_) =>
				json_error(StatusCode::NOT_FOUND, "not_found", err.to_string()),
			EngineError::GenerationFailed { .. } =>
				json_error(StatusCode::BAD_GATEWAY, "generation_failed", err.to_string()),
			EngineError::Storage(_) =>
				json_error(StatusCode::INTERNAL_SERVER_ERROR, "storage", err.to_string()),
		}
	}
}

impl IntoResponse for ApiError {
	fn into_response(self) -> Response {
		let body = ErrorBody { error_code: self.error_code, message: self.message };
		(self.status, Json(body)).into_response()
	}
}
