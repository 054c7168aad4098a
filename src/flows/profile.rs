//! Optional profile enrichment after a successful exchange.

// self
use crate::{
	_prelude::*,
	auth::{TokenRecord, USER_INFO_BASIC},
	flows::Relay,
	obs::{self, FlowKind, FlowOutcome, FlowSpan},
};

const ENDPOINT: &str = "user_info";

/// Fields requested from the user-info endpoint.
pub const PROFILE_FIELDS: &str = "open_id,union_id,avatar_url,display_name";

/// Basic profile data.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
	/// Subject identifier echoed by the vendor.
	pub open_id: Option<String>,
	/// Cross-app identifier.
	pub union_id: Option<String>,
	/// Avatar image URL.
	pub avatar_url: Option<String>,
	/// Display name.
	pub display_name: Option<String>,
}

/// Result of the profile enrichment step.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ProfileOutcome {
	/// The token was not granted the basic-profile scope.
	Skipped,
	/// Profile fetched successfully.
	Fetched(UserProfile),
	/// The fetch failed; the message is advisory only.
	Failed(String),
}
impl ProfileOutcome {
	/// Short human-readable note for callback responses.
	pub fn note(&self) -> String {
		match self {
			ProfileOutcome::Skipped => "Profile not requested (user.info.basic not granted).".into(),
			ProfileOutcome::Fetched(profile) => match profile.display_name.as_deref() {
				Some(name) => format!("Signed in as {name}."),
				None => "Profile fetched.".into(),
			},
			ProfileOutcome::Failed(message) => format!("Profile unavailable: {message}."),
		}
	}
}

#[derive(Debug, Deserialize)]
struct ProfileData {
	#[serde(default)]
	user: Option<UserProfile>,
}

#[derive(Debug, Deserialize)]
struct ProfileError {
	#[serde(default)]
	code: String,
	#[serde(default)]
	message: String,
}
impl ProfileError {
	fn is_error(&self) -> bool {
		!self.code.is_empty() && self.code != "ok"
	}

	fn into_message(self) -> String {
		if self.message.is_empty() { self.code } else { self.message }
	}
}

/// Flat fallback; a bare object only counts as a profile when it names the subject.
#[derive(Debug, Deserialize)]
struct FlatProfile {
	open_id: String,
	#[serde(flatten)]
	rest: UserProfile,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ProfileEnvelope {
	Nested {
		data: ProfileData,
		#[serde(default)]
		error: Option<ProfileError>,
	},
	Flat(FlatProfile),
}
impl ProfileEnvelope {
	fn into_profile(self) -> Result<UserProfile, String> {
		match self {
			ProfileEnvelope::Nested { error: Some(error), .. } if error.is_error() =>
				Err(error.into_message()),
			ProfileEnvelope::Nested { data: ProfileData { user: Some(user) }, .. } => Ok(user),
			ProfileEnvelope::Nested { .. } => Err("user-info response carried no user".into()),
			ProfileEnvelope::Flat(FlatProfile { open_id, rest }) =>
				Ok(UserProfile { open_id: Some(open_id), ..rest }),
		}
	}
}

impl Relay {
	/// Fetches the basic profile with the record's access token.
	pub async fn fetch_profile(&self, record: &TokenRecord) -> Result<UserProfile, String> {
		let response = self
			.http_client
			.get_authorized(
				&self.descriptor.endpoints.user_info,
				&record.access_token,
				&[("fields", PROFILE_FIELDS)],
			)
			.await
			.map_err(|e| format!("user-info request failed: {e}"))?;

		if !response.is_success() {
			let message = response
				.decode::<ProfileEnvelope>(ENDPOINT)
				.ok()
				.and_then(|envelope| match envelope {
					ProfileEnvelope::Nested { error: Some(error), .. } => Some(error.message),
					_ => None,
				})
				.filter(|message| !message.is_empty())
				.unwrap_or_else(|| format!("HTTP {}", response.status));

			return Err(message);
		}

		response.decode::<ProfileEnvelope>(ENDPOINT).map_err(|e| e.to_string())?.into_profile()
	}

	/// Runs the profile fetch when the scope allows it, swallowing failures.
	pub async fn profile_for(&self, record: &TokenRecord) -> ProfileOutcome {
		const KIND: FlowKind = FlowKind::Profile;

		if !record.scope.contains(USER_INFO_BASIC) {
			return ProfileOutcome::Skipped;
		}

		let span = FlowSpan::new(KIND, "profile_for");

		obs::record_flow_outcome(KIND, FlowOutcome::Attempt);

		match span.instrument(self.fetch_profile(record)).await {
			Ok(profile) => {
				obs::record_flow_outcome(KIND, FlowOutcome::Success);

				ProfileOutcome::Fetched(profile)
			},
			Err(message) => {
				obs::record_flow_outcome(KIND, FlowOutcome::Failure);
				tracing::warn!(subject = %record.subject, error = %message, "Profile fetch failed.");

				ProfileOutcome::Failed(message)
			},
		}
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	fn decode(body: &str) -> Result<UserProfile, String> {
		serde_json::from_str::<ProfileEnvelope>(body)
			.map_err(|e| e.to_string())
			.and_then(ProfileEnvelope::into_profile)
	}

	#[test]
	fn nested_user_is_extracted() {
		let profile = decode(
			r#"{"data":{"user":{"open_id":"U1","display_name":"Ada"}},"error":{"code":"ok","message":""}}"#,
		)
		.expect("Nested profile should decode.");

		assert_eq!(profile.display_name.as_deref(), Some("Ada"));
	}

	#[test]
	fn empty_data_with_error_code_is_a_failure() {
		let err = decode(r#"{"data":{},"error":{"code":"scope_not_authorized","message":""}}"#)
			.expect_err("Vendor error code should fail the fetch.");

		assert_eq!(err, "scope_not_authorized");

		decode(r#"{"data":{},"error":{"code":"ok"}}"#).expect_err("Missing user should fail the fetch.");
	}

	#[test]
	fn flat_fallback_requires_open_id() {
		let profile = decode(r#"{"open_id":"U1","avatar_url":"https://a/x.png"}"#)
			.expect("Flat profile with open_id should decode.");

		assert_eq!(profile.open_id.as_deref(), Some("U1"));
		assert_eq!(profile.avatar_url.as_deref(), Some("https://a/x.png"));
		assert!(decode(r#"{"display_name":"Ada"}"#).is_err());
		assert!(decode("{}").is_err());
	}
}
