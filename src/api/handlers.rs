//! Route handlers.

// crates.io
use axum::{
	Json,
	extract::{Path, Query, State, rejection::JsonRejection},
	http::StatusCode,
	response::{IntoResponse, Redirect, Response},
};
// self
use crate::{
	_prelude::*,
	api::{
		ApiError, AppState, CallbackMode, DebugTokensBody, Envelope, NotFoundBody, TokenStatusBody,
		status_for,
	},
	error::ExchangeError,
	flows::{ExchangeOutcome, PublishOutcome, PublishRequest},
};

/// Query string delivered to the callback by the vendor.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct CallbackQuery {
	/// Authorization code.
	pub code: Option<String>,
	/// Opaque state issued by `/auth/login`.
	pub state: Option<String>,
	/// Set when the user declined or the vendor refused.
	pub error: Option<String>,
	/// Human-readable companion of `error`.
	pub error_description: Option<String>,
}

/// `GET /`
pub async fn liveness() -> &'static str {
	"TikTok relay is running."
}

/// `GET /auth/login`
pub async fn login(State(state): State<AppState>) -> Redirect {
	let session = state.relay.start_authorization();

	Redirect::to(session.authorize_url.as_str())
}

/// `GET /auth/callback`
pub async fn callback(State(state): State<AppState>, Query(query): Query<CallbackQuery>) -> Response {
	let result = run_callback(&state, query).await;

	match (&state.callback_mode, result) {
		(CallbackMode::PlainText, Ok(outcome)) => (StatusCode::OK, success_text(&outcome)).into_response(),
		(CallbackMode::PlainText, Err(e)) =>
			(status_for(&e), format!("Authorization failed: {e}")).into_response(),
		(CallbackMode::Redirect { frontend_url }, Ok(outcome)) => {
			let mut target = frontend_url.clone();

			target
				.query_pairs_mut()
				.append_pair("auth", "success")
				.append_pair("open_id", outcome.record.subject.as_ref());

			Redirect::to(target.as_str()).into_response()
		},
		(CallbackMode::Redirect { frontend_url }, Err(e)) => {
			let mut target = frontend_url.clone();

			target.query_pairs_mut().append_pair("auth", "error").append_pair("message", &e.to_string());

			Redirect::to(target.as_str()).into_response()
		},
	}
}

async fn run_callback(state: &AppState, query: CallbackQuery) -> Result<ExchangeOutcome> {
	if let Some(error) = query.error.filter(|e| !e.is_empty()) {
		let message = query.error_description.filter(|d| !d.is_empty()).unwrap_or(error);

		tracing::warn!(message = %message, "Vendor denied the authorization request.");

		return Err(ExchangeError::Denied { message }.into());
	}

	let code = query.code.filter(|c| !c.is_empty()).ok_or(Error::MissingParameter("code"))?;

	state.relay.exchange_code(&code, query.state.as_deref()).await
}

fn success_text(outcome: &ExchangeOutcome) -> String {
	let record = &outcome.record;

	format!(
		"Authorization successful.\nopen_id: {}\nscope: {}\nexpires_in: {}s\n{}\n",
		record.subject,
		record.scope,
		record.seconds_remaining_at(OffsetDateTime::now_utc()),
		outcome.profile.note(),
	)
}

/// `GET /api/token-status/{open_id}`
pub async fn token_status(
	State(state): State<AppState>,
	Path(open_id): Path<String>,
) -> Result<Response, ApiError> {
	let report = state.relay.token_status(&open_id).await?;

	if !report.found {
		return Ok((StatusCode::NOT_FOUND, Json(NotFoundBody::unknown_subject())).into_response());
	}

	Ok(Json(TokenStatusBody::from(report)).into_response())
}

/// `POST /api/post-to-tiktok`
pub async fn publish(
	State(state): State<AppState>,
	body: Result<Json<PublishRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
	let request = match body {
		Ok(Json(request)) => request,
		Err(rejection) => {
			let error = serde_json::json!({
				"code": "invalid_body",
				"message": rejection.body_text(),
			});

			return Ok((StatusCode::BAD_REQUEST, Json(Envelope::error(error))).into_response());
		},
	};

	match state.relay.publish(request).await? {
		PublishOutcome::Accepted(data) => Ok(Json(Envelope::data(data)).into_response()),
		PublishOutcome::Rejected { status, body } => {
			let status = StatusCode::from_u16(status).unwrap_or(StatusCode::BAD_GATEWAY);

			Ok((status, Json(Envelope::error(body))).into_response())
		},
	}
}

/// `GET /api/debug/tokens`
pub async fn debug_tokens(State(state): State<AppState>) -> Result<Json<DebugTokensBody>, ApiError> {
	let tokens = state.relay.token_presence().await?;

	Ok(Json(DebugTokensBody { success: true, count: tokens.len(), tokens }))
}
