//! Relay-level error types shared across flows, stores, and the HTTP surface.

// self
use crate::_prelude::*;

/// Relay-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Canonical relay error exposed by public APIs.
#[derive(Debug, ThisError)]
pub enum Error {
	/// A required request parameter was absent or blank.
	#[error("Missing required parameter: {0}.")]
	MissingParameter(&'static str),
	/// The authorization code could not be exchanged for a token.
	#[error(transparent)]
	Exchange(#[from] ExchangeError),
	/// No token record exists for the subject.
	#[error("No token is stored for this user; authorize first.")]
	Unauthenticated,
	/// The stored token reached its expiry instant.
	#[error("The stored access token has expired; authorize again.")]
	TokenExpired {
		/// Expiry instant of the stale record.
		expired_at: OffsetDateTime,
	},
	/// The stored token lacks the capability required by the operation.
	#[error("Token lacks the required scope: {required}.")]
	InsufficientScope {
		/// Scope the operation requires.
		required: &'static str,
	},
	/// The vendor could not be reached.
	#[error("Vendor API is unavailable.")]
	UpstreamUnavailable {
		/// Underlying transport failure.
		#[source]
		source: BoxError,
	},
	/// The vendor answered with a body the relay cannot interpret.
	#[error("Vendor returned a malformed response from {endpoint}.")]
	MalformedUpstreamResponse {
		/// Logical endpoint name.
		endpoint: &'static str,
		/// HTTP status code, when available.
		status: Option<u16>,
		/// Structured parsing failure.
		#[source]
		source: serde_path_to_error::Error<serde_json::Error>,
	},

	/// Local configuration problem.
	#[error(transparent)]
	Config(#[from] ConfigError),
	/// Storage-layer failure.
	#[error("{0}")]
	Storage(
		#[from]
		#[source]
		crate::store::StoreError,
	),
}
impl Error {
	/// Wraps a transport failure as [`Error::UpstreamUnavailable`].
	pub fn upstream_unavailable(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::UpstreamUnavailable { source: Box::new(src) }
	}
}

/// Failures raised while exchanging an authorization code.
#[derive(Debug, ThisError)]
pub enum ExchangeError {
	/// The token request never produced an HTTP response.
	#[error("Token endpoint could not be reached.")]
	Transport {
		/// Underlying transport failure.
		#[source]
		source: BoxError,
	},
	/// The vendor refused the exchange.
	#[error("Token endpoint rejected the exchange: {message}.")]
	Rejected {
		/// HTTP status code returned by the vendor.
		status: u16,
		/// Vendor-supplied description (or a generic fallback).
		message: String,
	},
	/// The user or the vendor denied consent before a code was issued.
	#[error("Authorization was denied: {message}.")]
	Denied {
		/// Vendor-supplied `error_description` (or the raw `error` code).
		message: String,
	},
	/// The callback `state` did not match a pending authorization session.
	#[error("Authorization state is unknown or expired.")]
	StateMismatch,
	/// The response parsed but carried no access token.
	#[error("Token endpoint response is missing access_token.")]
	MissingAccessToken,
	/// The response parsed but carried no subject identifier.
	#[error("Token endpoint response is missing open_id.")]
	MissingSubject,
	/// The response omitted `expires_in` or returned a non-positive value.
	#[error("Token endpoint returned an invalid expires_in.")]
	InvalidLifetime,
	/// The returned subject or scope failed validation.
	#[error("Token endpoint returned an invalid {field}.")]
	InvalidField {
		/// Offending response field.
		field: &'static str,
		/// Validation failure.
		#[source]
		source: BoxError,
	},
}
impl ExchangeError {
	/// Wraps a transport-specific network error.
	pub fn transport(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::Transport { source: Box::new(src) }
	}

	/// Wraps a field validation failure.
	pub fn invalid_field(
		field: &'static str,
		src: impl 'static + Send + Sync + std::error::Error,
	) -> Self {
		Self::InvalidField { field, source: Box::new(src) }
	}
}

/// Configuration and validation failures raised while assembling the relay.
#[derive(Debug, ThisError)]
pub enum ConfigError {
	/// HTTP client could not be constructed.
	#[error("HTTP client could not be constructed.")]
	HttpClientBuild {
		/// Underlying transport builder failure.
		#[source]
		source: BoxError,
	},
	/// A configured URL cannot be parsed.
	#[error("Configured {name} URL is invalid.")]
	InvalidUrl {
		/// Configuration entry name.
		name: &'static str,
		/// Underlying parsing failure.
		#[source]
		source: url::ParseError,
	},
	/// Vendor descriptor failed validation.
	#[error(transparent)]
	Descriptor(#[from] crate::vendor::VendorDescriptorError),
	/// Configured scopes cannot be normalized.
	#[error("Configured scopes are invalid.")]
	InvalidScope(#[from] crate::auth::ScopeValidationError),
	/// Listener could not be bound.
	#[error("Unable to bind the HTTP listener.")]
	Bind(#[from] std::io::Error),
}
impl ConfigError {
	/// Wraps a transport's builder failure inside [`ConfigError`].
	pub fn http_client_build(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::HttpClientBuild { source: Box::new(src) }
	}
}
impl From<ReqwestError> for ConfigError {
	fn from(e: ReqwestError) -> Self {
		Self::http_client_build(e)
	}
}
