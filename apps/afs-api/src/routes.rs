use axum::{
	Json, Router,
	extract::{State, rejection::JsonRejection},
	http::StatusCode,
	response::{IntoResponse, Response},
	routing::{get, post},
};
use serde::Serialize;
use serde_json::{Map, Value};

use crate::state::AppState;
use afs_service::{Error, SearchRequest, SearchResponse};

pub fn router(state: AppState) -> Router {
	Router::new()
		.route("/health", get(health))
		.route("/v1/search/adaptive-fusion", post(search))
		.route("/v1/search/adaptive-fusion/presets", get(presets))
		.with_state(state)
}

async fn health() -> StatusCode {
	StatusCode::OK
}

async fn search(
	State(state): State<AppState>,
	payload: Result<Json<SearchRequest>, JsonRejection>,
) -> Result<Json<SearchResponse>, ApiError> {
	let Json(payload) = payload
		.map_err(|err| ApiError::new(StatusCode::BAD_REQUEST, "INVALID_REQUEST", err.body_text()))?;
	let response = state.service.search(payload).await?;

	Ok(Json(response))
}

async fn presets() -> Result<Json<Value>, ApiError> {
	let mut out = Map::new();

	for preset in afs_domain::presets::presets() {
		let value = serde_json::to_value(&preset).map_err(|err| {
			ApiError::new(StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR", err.to_string())
		})?;

		out.insert(preset.key.to_string(), value);
	}

	Ok(Json(serde_json::json!({ "presets": out })))
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
impl ApiError {
	fn new(status: StatusCode, error_code: impl Into<String>, message: impl Into<String>) -> Self {
		Self { status, error_code: error_code.into(), message: message.into() }
	}
}
impl From<Error> for ApiError {
	fn from(err: Error) -> Self {
		let (status, code) = match &err {
			Error::InvalidRequest { .. } => (StatusCode::BAD_REQUEST, "INVALID_REQUEST"),
			Error::Timeout { .. } => (StatusCode::GATEWAY_TIMEOUT, "SEARCH_TIMEOUT"),
			Error::Retrieval { .. } => (StatusCode::BAD_GATEWAY, "RETRIEVAL_FAILED"),
			Error::Provider { .. } => (StatusCode::INTERNAL_SERVER_ERROR, "PROVIDER_ERROR"),
			Error::Storage { .. } | Error::Qdrant { .. } =>
				(StatusCode::INTERNAL_SERVER_ERROR, "STORAGE_ERROR"),
		};

		if status.is_server_error() {
			tracing::error!(error = %err, error_code = code, "Search request failed.");
		}

		Self::new(status, code, err.to_string())
	}
}
impl IntoResponse for ApiError {
	fn into_response(self) -> Response {
		let body = ErrorBody { error_code: self.error_code, message: self.message };

		(self.status, Json(body)).into_response()
	}
}
