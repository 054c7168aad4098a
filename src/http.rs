//! Outbound transport for vendor calls.
//!
//! Every vendor request goes through [`ReqwestHttpClient`], which resolves to a
//! [`VendorResponse`] as soon as an HTTP status is known. Transport failures stay as
//! [`ReqwestError`] so each flow can classify them (an exchange failure and a publish
//! failure surface differently).

// std
use std::{ops::Deref, time::Duration as StdDuration};
// crates.io
use reqwest::{
	header::{AUTHORIZATION, HeaderMap, RETRY_AFTER},
	redirect::Policy,
};
use serde::de::DeserializeOwned;
use time::format_description::well_known::Rfc2822;
// self
use crate::{_prelude::*, auth::TokenSecret, error::ConfigError};

/// Status, hints, and raw body of a completed vendor call.
#[derive(Clone, Debug)]
pub struct VendorResponse {
	/// HTTP status code.
	pub status: u16,
	/// Retry-After hint expressed as a relative duration.
	pub retry_after: Option<Duration>,
	/// Raw response body.
	pub body: Vec<u8>,
}
impl VendorResponse {
	/// Returns true for 2xx statuses.
	pub fn is_success(&self) -> bool {
		(200..300).contains(&self.status)
	}

	/// Decodes the body as JSON, reporting the failing path on error.
	pub fn decode<T>(&self, endpoint: &'static str) -> Result<T>
	where
		T: DeserializeOwned,
	{
		let de = &mut serde_json::Deserializer::from_slice(&self.body);

		serde_path_to_error::deserialize(de).map_err(|source| Error::MalformedUpstreamResponse {
			endpoint,
			status: Some(self.status),
			source,
		})
	}

	/// Returns the body as JSON, or as a JSON string when it is not valid JSON.
	pub fn json_or_text(&self) -> serde_json::Value {
		serde_json::from_slice(&self.body).unwrap_or_else(|_| {
			serde_json::Value::String(String::from_utf8_lossy(&self.body).into_owned())
		})
	}
}

/// Thin wrapper around [`ReqwestClient`] so shared HTTP behavior lives in one place.
///
/// Vendor endpoints answer directly, so [`ReqwestHttpClient::build`] disables redirect
/// following.
#[derive(Clone, Default)]
pub struct ReqwestHttpClient(pub ReqwestClient);
impl ReqwestHttpClient {
	/// Wraps an existing reqwest [`ReqwestClient`].
	pub fn with_client(client: ReqwestClient) -> Self {
		Self(client)
	}

	/// Builds the production client with an overall request deadline.
	pub fn build(timeout: StdDuration) -> Result<Self, ConfigError> {
		let client = ReqwestClient::builder()
			.redirect(Policy::none())
			.timeout(timeout)
			.user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
			.build()?;

		Ok(Self(client))
	}

	/// Sends an `application/x-www-form-urlencoded` POST.
	pub async fn post_form(
		&self,
		url: &Url,
		form: &[(&str, &str)],
	) -> Result<VendorResponse, ReqwestError> {
		let request = self.0.post(url.clone()).form(form);

		Self::complete(request).await
	}

	/// Sends a bearer-authenticated GET with query parameters.
	pub async fn get_authorized(
		&self,
		url: &Url,
		token: &TokenSecret,
		query: &[(&str, &str)],
	) -> Result<VendorResponse, ReqwestError> {
		let request = self.0.get(url.clone()).header(AUTHORIZATION, token.bearer()).query(query);

		Self::complete(request).await
	}

	/// Sends a bearer-authenticated JSON POST.
	pub async fn post_json_authorized<B>(
		&self,
		url: &Url,
		token: &TokenSecret,
		body: &B,
	) -> Result<VendorResponse, ReqwestError>
	where
		B: ?Sized + Serialize,
	{
		let request = self.0.post(url.clone()).header(AUTHORIZATION, token.bearer()).json(body);

		Self::complete(request).await
	}

	async fn complete(request: reqwest::RequestBuilder) -> Result<VendorResponse, ReqwestError> {
		let response = request.send().await?;
		let status = response.status().as_u16();
		let retry_after = parse_retry_after(response.headers());
		let body = response.bytes().await?.to_vec();

		Ok(VendorResponse { status, retry_after, body })
	}
}
impl AsRef<ReqwestClient> for ReqwestHttpClient {
	fn as_ref(&self) -> &ReqwestClient {
		&self.0
	}
}
impl Deref for ReqwestHttpClient {
	type Target = ReqwestClient;

	fn deref(&self) -> &Self::Target {
		&self.0
	}
}
impl Debug for ReqwestHttpClient {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str("ReqwestHttpClient(..)")
	}
}

fn parse_retry_after(headers: &HeaderMap) -> Option<Duration> {
	let value = headers.get(RETRY_AFTER)?;
	let raw = value.to_str().ok()?.trim();

	if let Ok(secs) = raw.parse::<u64>() {
		return Some(Duration::seconds(i64::try_from(secs).ok()?));
	}
	if let Ok(moment) = OffsetDateTime::parse(raw, &Rfc2822) {
		let delta = moment - OffsetDateTime::now_utc();

		if delta.is_positive() {
			return Some(delta);
		}
	}

	None
}
