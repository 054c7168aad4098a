//! Authorization-code exchange and token response normalization.
//!
//! The token endpoint has answered in two layouts over its lifetime: the payload nested
//! under `data` (with `error_code`/`description` beside the token fields) and a flat
//! RFC 6749 style body (with `error`/`error_description` on failure). Both are decoded
//! through [`TokenEnvelope`] and normalized by [`normalize_token_response`]; the nested
//! form wins whenever a `data` object is present.

// self
use crate::{
	_prelude::*,
	auth::{ScopeSet, SubjectId, TokenRecord, TokenRecordBuilderError},
	error::ExchangeError,
	flows::{PendingSession, ProfileOutcome, Relay},
	http::VendorResponse,
	obs::{self, FlowKind, FlowOutcome, FlowSpan},
};

const ENDPOINT: &str = "token";

/// Token fields as reported by the vendor, before validation.
#[derive(Clone, Default, Deserialize)]
pub struct TokenPayload {
	/// Bearer credential.
	pub access_token: Option<String>,
	/// Refresh credential.
	pub refresh_token: Option<String>,
	/// Subject identifier.
	pub open_id: Option<String>,
	/// Access token lifetime in seconds.
	pub expires_in: Option<i64>,
	/// Refresh token lifetime in seconds.
	pub refresh_expires_in: Option<i64>,
	/// Granted scopes, comma- or space-separated.
	pub scope: Option<String>,
	/// RFC 6749 error code.
	pub error: Option<String>,
	/// RFC 6749 error description.
	pub error_description: Option<String>,
	/// Numeric error code used by the nested layout (`0` means success).
	pub error_code: Option<i64>,
	/// Human-readable description used by the nested layout.
	pub description: Option<String>,
}
impl TokenPayload {
	/// Returns the vendor's failure message when the payload reports an error.
	pub fn vendor_error(&self) -> Option<String> {
		let flat = self.error.as_deref().filter(|code| !code.is_empty() && *code != "ok");
		let nested = self.error_code.filter(|code| *code != 0);

		if flat.is_none() && nested.is_none() {
			return None;
		}

		let message = self
			.error_description
			.clone()
			.or_else(|| self.description.clone())
			.filter(|text| !text.is_empty())
			.or_else(|| flat.map(str::to_owned))
			.unwrap_or_else(|| format!("error_code {}", nested.unwrap_or_default()));

		Some(message)
	}
}
impl Debug for TokenPayload {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("TokenPayload")
			.field("access_token", &self.access_token.as_ref().map(|_| "<redacted>"))
			.field("refresh_token", &self.refresh_token.as_ref().map(|_| "<redacted>"))
			.field("open_id", &self.open_id)
			.field("expires_in", &self.expires_in)
			.field("refresh_expires_in", &self.refresh_expires_in)
			.field("scope", &self.scope)
			.field("error", &self.error)
			.field("error_code", &self.error_code)
			.finish()
	}
}

/// The two response layouts, tried in declaration order.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum TokenEnvelope {
	/// Payload nested under `data`.
	Nested {
		/// Inner payload.
		data: TokenPayload,
	},
	/// Payload at the top level.
	Flat(TokenPayload),
}
impl TokenEnvelope {
	/// Unwraps either layout into its payload.
	pub fn into_payload(self) -> TokenPayload {
		match self {
			TokenEnvelope::Nested { data } => data,
			TokenEnvelope::Flat(payload) => payload,
		}
	}
}

/// Validated token grant extracted from a successful exchange.
#[derive(Clone)]
pub struct TokenGrant {
	/// Subject that authorized the relay.
	pub subject: SubjectId,
	/// Bearer credential.
	pub access_token: String,
	/// Refresh credential, if issued.
	pub refresh_token: Option<String>,
	/// Access token lifetime.
	pub expires_in: Duration,
	/// Refresh token lifetime, if declared.
	pub refresh_expires_in: Option<Duration>,
	/// Granted scopes.
	pub scope: ScopeSet,
}
impl TokenGrant {
	/// Converts the grant into a record issued at `issued_at`.
	pub fn into_record(self, issued_at: OffsetDateTime) -> Result<TokenRecord> {
		let mut builder = TokenRecord::builder(self.subject, self.scope)
			.access_token(self.access_token)
			.issued_at(issued_at)
			.expires_in(self.expires_in);

		if let Some(refresh) = self.refresh_token {
			builder = builder.refresh_token(refresh);
		}
		if let Some(lifetime) = self.refresh_expires_in {
			builder = builder.refresh_expires_in(lifetime);
		}

		builder.build().map_err(|e| {
			let e = match e {
				TokenRecordBuilderError::MissingAccessToken => ExchangeError::MissingAccessToken,
				TokenRecordBuilderError::MissingExpiry
				| TokenRecordBuilderError::NonFutureExpiry
				| TokenRecordBuilderError::LifetimeOutOfRange => ExchangeError::InvalidLifetime,
			};

			e.into()
		})
	}
}
impl Debug for TokenGrant {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("TokenGrant")
			.field("subject", &self.subject)
			.field("expires_in", &self.expires_in)
			.field("scope", &self.scope)
			.finish()
	}
}

/// Result of a completed callback exchange.
#[derive(Clone, Debug)]
pub struct ExchangeOutcome {
	/// Record written to the store.
	pub record: TokenRecord,
	/// Profile enrichment result.
	pub profile: ProfileOutcome,
}

/// Turns a token endpoint response into a validated [`TokenGrant`].
pub fn normalize_token_response(response: &VendorResponse) -> Result<TokenGrant> {
	if !response.is_success() {
		let message = response
			.decode::<TokenEnvelope>(ENDPOINT)
			.ok()
			.and_then(|envelope| envelope.into_payload().vendor_error())
			.unwrap_or_else(|| format!("HTTP {}", response.status));

		return Err(ExchangeError::Rejected { status: response.status, message }.into());
	}

	let payload = response.decode::<TokenEnvelope>(ENDPOINT)?.into_payload();

	if let Some(message) = payload.vendor_error() {
		return Err(ExchangeError::Rejected { status: response.status, message }.into());
	}

	let access_token = payload
		.access_token
		.filter(|token| !token.is_empty())
		.ok_or(ExchangeError::MissingAccessToken)?;
	let subject = payload.open_id.ok_or(ExchangeError::MissingSubject)?;
	let subject =
		SubjectId::new(subject).map_err(|e| ExchangeError::invalid_field("open_id", e))?;
	let expires_in = payload
		.expires_in
		.filter(|secs| *secs > 0)
		.map(Duration::seconds)
		.ok_or(ExchangeError::InvalidLifetime)?;
	let refresh_expires_in =
		payload.refresh_expires_in.filter(|secs| *secs > 0).map(Duration::seconds);
	let scope = payload.scope.as_deref().map(ScopeSet::parse).unwrap_or_default();

	Ok(TokenGrant {
		subject,
		access_token,
		refresh_token: payload.refresh_token.filter(|token| !token.is_empty()),
		expires_in,
		refresh_expires_in,
		scope,
	})
}

impl Relay {
	/// Exchanges an authorization code, stores the token, and enriches it with the profile.
	///
	/// `state` is checked against pending sessions (see [`Relay::resolve_state`]). Nothing
	/// is written to the store unless the exchange succeeds; a profile failure never fails
	/// the exchange.
	pub async fn exchange_code(&self, code: &str, state: Option<&str>) -> Result<ExchangeOutcome> {
		const KIND: FlowKind = FlowKind::Exchange;

		let span = FlowSpan::new(KIND, "exchange_code");

		obs::record_flow_outcome(KIND, FlowOutcome::Attempt);

		let result = span
			.instrument(async move {
				if code.is_empty() {
					return Err(Error::MissingParameter("code"));
				}

				let session = self.resolve_state(state)?;
				let record = self.request_token(code, session.as_ref()).await?;

				self.store.put(record.clone()).await?;

				tracing::info!(
					subject = %record.subject,
					scope = %record.scope,
					expires_at = %record.expires_at,
					"Token stored."
				);

				let profile = self.profile_for(&record).await;

				Ok(ExchangeOutcome { record, profile })
			})
			.await;

		match &result {
			Ok(_) => obs::record_flow_outcome(KIND, FlowOutcome::Success),
			Err(err) => {
				obs::record_flow_outcome(KIND, FlowOutcome::Failure);
				tracing::warn!(error = %err, "Authorization code exchange failed.");
			},
		}

		result
	}

	async fn request_token(
		&self,
		code: &str,
		session: Option<&PendingSession>,
	) -> Result<TokenRecord> {
		let credentials = &self.credentials;
		let mut form = vec![
			(self.descriptor.quirks.client_id_param.as_str(), credentials.client_key.as_str()),
			("client_secret", credentials.client_secret.as_str()),
			("code", code),
			("grant_type", "authorization_code"),
			("redirect_uri", credentials.redirect_uri.as_str()),
		];

		if let Some(verifier) = session.and_then(|s| s.code_verifier.as_deref()) {
			form.push(("code_verifier", verifier));
		}

		let response = self
			.http_client
			.post_form(&self.descriptor.endpoints.token, &form)
			.await
			.map_err(ExchangeError::transport)?;

		if let Some(retry_after) = response.retry_after {
			tracing::debug!(status = response.status, retry_after = %retry_after, "Token endpoint sent Retry-After.");
		}

		let issued_at = OffsetDateTime::now_utc();

		normalize_token_response(&response)?.into_record(issued_at)
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	fn response(status: u16, body: &str) -> VendorResponse {
		VendorResponse { status, retry_after: None, body: body.as_bytes().to_vec() }
	}

	#[test]
	fn nested_and_flat_layouts_normalize_identically() {
		let nested = response(
			200,
			r#"{"data":{"access_token":"T1","open_id":"U1","expires_in":3600,"scope":"video.publish","error_code":0,"description":""},"message":"success"}"#,
		);
		let flat = response(
			200,
			r#"{"access_token":"T1","open_id":"U1","expires_in":3600,"scope":"video.publish","token_type":"Bearer"}"#,
		);

		for grant in [nested, flat].iter().map(normalize_token_response) {
			let grant = grant.expect("Both layouts should normalize.");

			assert_eq!(grant.access_token, "T1");
			assert_eq!(grant.subject.as_ref(), "U1");
			assert_eq!(grant.expires_in, Duration::hours(1));
			assert!(grant.scope.contains("video.publish"));
		}
	}

	#[test]
	fn nested_layout_wins_when_both_are_present() {
		let both = response(
			200,
			r#"{"access_token":"outer","open_id":"U0","expires_in":60,"data":{"access_token":"inner","open_id":"U1","expires_in":120}}"#,
		);
		let grant = normalize_token_response(&both).expect("Nested payload should be used.");

		assert_eq!(grant.access_token, "inner");
		assert_eq!(grant.subject.as_ref(), "U1");
	}

	#[test]
	fn vendor_errors_are_rejections() {
		let nested = response(
			200,
			r#"{"data":{"captcha":"","description":"Authorization code is expired.","error_code":10007},"message":"error"}"#,
		);
		let err = normalize_token_response(&nested).expect_err("Nested error must be rejected.");

		assert!(matches!(
			err,
			Error::Exchange(ExchangeError::Rejected { status: 200, ref message })
				if message == "Authorization code is expired."
		));

		let flat = response(
			400,
			r#"{"error":"invalid_grant","error_description":"Code has been used.","log_id":"x"}"#,
		);
		let err = normalize_token_response(&flat).expect_err("HTTP 400 must be rejected.");

		assert!(matches!(
			err,
			Error::Exchange(ExchangeError::Rejected { status: 400, ref message })
				if message == "Code has been used."
		));

		let html = response(503, "<html>down</html>");
		let err = normalize_token_response(&html).expect_err("HTTP 503 must be rejected.");

		assert!(matches!(err, Error::Exchange(ExchangeError::Rejected { status: 503, .. })));
	}

	#[test]
	fn incomplete_payloads_fail_validation() {
		let no_token = response(200, r#"{"open_id":"U1","expires_in":3600}"#);

		assert!(matches!(
			normalize_token_response(&no_token),
			Err(Error::Exchange(ExchangeError::MissingAccessToken))
		));

		let no_subject = response(200, r#"{"access_token":"T1","expires_in":3600}"#);

		assert!(matches!(
			normalize_token_response(&no_subject),
			Err(Error::Exchange(ExchangeError::MissingSubject))
		));

		let no_lifetime = response(200, r#"{"access_token":"T1","open_id":"U1","expires_in":0}"#);

		assert!(matches!(
			normalize_token_response(&no_lifetime),
			Err(Error::Exchange(ExchangeError::InvalidLifetime))
		));
	}

	#[test]
	fn unrepresentable_lifetimes_are_invalid() {
		let issued_at = OffsetDateTime::now_utc();
		let huge_access = response(
			200,
			r#"{"access_token":"T1","open_id":"U1","expires_in":9223372036854775807,"scope":"video.publish"}"#,
		);
		let grant = normalize_token_response(&huge_access).expect("Positive lifetimes should parse.");

		assert!(matches!(
			grant.into_record(issued_at),
			Err(Error::Exchange(ExchangeError::InvalidLifetime))
		));

		let huge_refresh = response(
			200,
			r#"{"access_token":"T1","open_id":"U1","expires_in":3600,"refresh_token":"R1","refresh_expires_in":9223372036854775807}"#,
		);
		let grant = normalize_token_response(&huge_refresh).expect("Positive lifetimes should parse.");

		assert!(matches!(
			grant.into_record(issued_at),
			Err(Error::Exchange(ExchangeError::InvalidLifetime))
		));
	}

	#[test]
	fn malformed_bodies_are_reported_with_endpoint() {
		let not_json = response(200, "Access Token: T1");

		assert!(matches!(
			normalize_token_response(&not_json),
			Err(Error::MalformedUpstreamResponse { endpoint: "token", .. })
		));
	}
}
