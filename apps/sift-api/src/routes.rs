use std::convert::Infallible;

use axum::{
	Json, Router,
	extract::{Path, State},
	http::StatusCode,
	response::{
		IntoResponse, Response,
		sse::{Event, KeepAlive, Sse},
	},
	routing::{get, post},
};
use serde::Serialize;
use tokio::sync::mpsc;
use tokio_stream::{Stream, StreamExt, wrappers::ReceiverStream};
use tokio_util::sync::CancellationToken;

use sift_service::{
	DeleteResponse, ResumeProfile, SearchRequest, SearchResponse, ServiceError, ShortlistRequest,
};

use crate::state::AppState;

const EVENT_CHANNEL_CAPACITY: usize = 64;

pub fn router(state: AppState) -> Router {
	Router::new()
		.route("/health", get(health))
		.route("/search", post(search))
		.route("/shortlist", post(shortlist))
		.route("/resume/{id}", get(resume_profile).delete(delete_resume))
		.with_state(state)
}

async fn health() -> Json<serde_json::Value> {
	Json(serde_json::json!({ "status": "ok" }))
}

async fn search(
	State(state): State<AppState>,
	Json(payload): Json<SearchRequest>,
) -> Result<Json<SearchResponse>, ApiError> {
	let response = state.service.search(payload).await?;
	Ok(Json(response))
}

/// The agentic pipeline runs in its own task; this handler just bridges
/// the bounded event channel onto the SSE response. Dropping the
/// response body closes the channel, which cancels the pipeline and its
/// in-flight provider calls.
async fn shortlist(
	State(state): State<AppState>,
	Json(payload): Json<ShortlistRequest>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
	let (tx, rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
	let cancel = CancellationToken::new();
	let service = state.service.clone();
	let pipeline_cancel = cancel.clone();
	tokio::spawn(async move {
		service.shortlist(payload, tx, pipeline_cancel).await;
	});

	let stream = ReceiverStream::new(rx).map(|event| {
		let sse_event = Event::default().event(event.name());
		Ok(match sse_event.json_data(&event) {
			Ok(with_data) => with_data,
			Err(_) => Event::default().event("error").data("Event serialization failed."),
		})
	});
	Sse::new(stream).keep_alive(KeepAlive::default())
}

async fn resume_profile(
	State(state): State<AppState>,
	Path(id): Path<String>,
) -> Result<Json<ResumeProfile>, ApiError> {
	let response = state.service.resume_profile(&id).await?;
	Ok(Json(response))
}

async fn delete_resume(
	State(state): State<AppState>,
	Path(id): Path<String>,
) -> Result<Json<DeleteResponse>, ApiError> {
	let response = state.service.delete_resume(&id).await?;
	Ok(Json(response))
}

#[derive(Debug, Serialize)]
struct ErrorBody {
	error_code: String,
	message: String,
}

#[derive(Debug)]
pub struct ApiError {
	status: StatusCode,
	error_code: &'static str,
	message: String,
}

impl From<ServiceError> for ApiError {
	fn from(err: ServiceError) -> Self {
		let (status, error_code) = match &err {
			ServiceError::InvalidQuery { .. } => (StatusCode::BAD_REQUEST, "invalid_query"),
			ServiceError::NotFound { .. } => (StatusCode::NOT_FOUND, "not_found"),
			ServiceError::UpstreamUnavailable { .. } => {
				(StatusCode::BAD_GATEWAY, "upstream_unavailable")
			},
			ServiceError::Internal { .. } => (StatusCode::INTERNAL_SERVER_ERROR, "internal"),
		};
		Self { status, error_code, message: err.to_string() }
	}
}

impl IntoResponse for ApiError {
	fn into_response(self) -> Response {
		let body = ErrorBody { error_code: self.error_code.to_string(), message: self.message };
		(self.status, Json(body)).into_response()
	}
}
