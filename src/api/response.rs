//! Response bodies and the error-to-HTTP mapping.

// crates.io
use axum::{
	Json,
	http::StatusCode,
	response::{IntoResponse, Response},
};
// self
use crate::{
	_prelude::*,
	auth::ScopeSet,
	error::ExchangeError,
	flows::{TokenPresence, TokenStatusReport},
};

/// `GET /api/token-status/{open_id}` body for a known subject.
#[derive(Clone, Debug, Serialize)]
pub struct TokenStatusBody {
	/// Always true.
	pub success: bool,
	/// Whether the stored token is still valid.
	pub authenticated: bool,
	/// Expiry instant.
	#[serde(with = "time::serde::rfc3339::option")]
	pub expires_at: Option<OffsetDateTime>,
	/// Seconds until expiry.
	pub expires_in: i64,
	/// Granted scopes.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub scope: Option<ScopeSet>,
}
impl From<TokenStatusReport> for TokenStatusBody {
	fn from(report: TokenStatusReport) -> Self {
		Self {
			success: true,
			authenticated: report.valid,
			expires_at: report.expires_at,
			expires_in: report.seconds_remaining,
			scope: report.scope,
		}
	}
}

/// Body for lookups that found nothing.
#[derive(Clone, Debug, Serialize)]
pub struct NotFoundBody {
	/// Always false.
	pub success: bool,
	/// Always false.
	pub authenticated: bool,
	/// Human-readable explanation.
	pub message: String,
}
impl NotFoundBody {
	/// Body for an unknown subject.
	pub fn unknown_subject() -> Self {
		Self {
			success: false,
			authenticated: false,
			message: "No token found for this user; complete authorization first.".into(),
		}
	}
}

/// `GET /api/debug/tokens` body.
#[derive(Clone, Debug, Serialize)]
pub struct DebugTokensBody {
	/// Always true.
	pub success: bool,
	/// Number of stored subjects.
	pub count: usize,
	/// Presence flags per subject.
	pub tokens: Vec<TokenPresence>,
}

/// `{success, data}` / `{success: false, error}` envelope used by the publish proxy.
#[derive(Clone, Debug, Serialize)]
pub struct Envelope {
	/// Whether the call succeeded.
	pub success: bool,
	/// Success payload.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub data: Option<serde_json::Value>,
	/// Failure payload.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub error: Option<serde_json::Value>,
}
impl Envelope {
	/// Success envelope.
	pub fn data(data: serde_json::Value) -> Self {
		Self { success: true, data: Some(data), error: None }
	}

	/// Failure envelope.
	pub fn error(error: serde_json::Value) -> Self {
		Self { success: false, data: None, error: Some(error) }
	}
}

/// Relay error rendered as a JSON response.
#[derive(Debug)]
pub struct ApiError(pub Error);
impl From<Error> for ApiError {
	fn from(e: Error) -> Self {
		Self(e)
	}
}
impl IntoResponse for ApiError {
	fn into_response(self) -> Response {
		let status = status_for(&self.0);

		if status.is_server_error() {
			tracing::error!(error = %self.0, "Request failed.");
		}

		let body = serde_json::json!({ "code": error_code(&self.0), "message": self.0.to_string() });

		(status, Json(Envelope::error(body))).into_response()
	}
}

/// HTTP status for a relay error.
pub fn status_for(err: &Error) -> StatusCode {
	match err {
		Error::MissingParameter(_) => StatusCode::BAD_REQUEST,
		Error::Exchange(ExchangeError::Transport { .. }) => StatusCode::BAD_GATEWAY,
		Error::Exchange(_) => StatusCode::BAD_REQUEST,
		Error::Unauthenticated | Error::TokenExpired { .. } => StatusCode::UNAUTHORIZED,
		Error::InsufficientScope { .. } => StatusCode::FORBIDDEN,
		Error::UpstreamUnavailable { .. } => StatusCode::INTERNAL_SERVER_ERROR,
		Error::MalformedUpstreamResponse { .. } => StatusCode::BAD_GATEWAY,
		Error::Config(_) | Error::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
	}
}

/// Stable machine-readable code for a relay error.
pub fn error_code(err: &Error) -> &'static str {
	match err {
		Error::MissingParameter(_) => "missing_parameter",
		Error::Exchange(_) => "exchange_error",
		Error::Unauthenticated => "unauthenticated",
		Error::TokenExpired { .. } => "token_expired",
		Error::InsufficientScope { .. } => "insufficient_scope",
		Error::UpstreamUnavailable { .. } => "upstream_unavailable",
		Error::MalformedUpstreamResponse { .. } => "malformed_upstream_response",
		Error::Config(_) => "config_error",
		Error::Storage(_) => "storage_error",
	}
}
