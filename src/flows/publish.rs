//! Publish proxy: validates the stored token and initiates a pull-from-URL direct post.

// self
use crate::{
	_prelude::*,
	auth::{SubjectId, TokenRecord, VIDEO_PUBLISH},
	flows::Relay,
	obs::{self, FlowKind, FlowOutcome, FlowSpan},
};

/// Audience levels accepted by the publish endpoint.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PrivacyLevel {
	/// Visible to everyone.
	PublicToEveryone,
	/// Visible to mutual followers.
	MutualFollowFriends,
	/// Visible to followers.
	FollowerOfCreator,
	/// Visible to the creator only.
	SelfOnly,
}
impl PrivacyLevel {
	/// The most restrictive level; unaudited clients may only post with it.
	pub const MOST_RESTRICTIVE: Self = Self::SelfOnly;

	/// Returns the wire identifier.
	pub const fn as_str(self) -> &'static str {
		match self {
			PrivacyLevel::PublicToEveryone => "PUBLIC_TO_EVERYONE",
			PrivacyLevel::MutualFollowFriends => "MUTUAL_FOLLOW_FRIENDS",
			PrivacyLevel::FollowerOfCreator => "FOLLOWER_OF_CREATOR",
			PrivacyLevel::SelfOnly => "SELF_ONLY",
		}
	}
}
impl Display for PrivacyLevel {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}
impl FromStr for PrivacyLevel {
	type Err = String;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s.trim().to_ascii_uppercase().as_str() {
			"PUBLIC_TO_EVERYONE" => Ok(Self::PublicToEveryone),
			"MUTUAL_FOLLOW_FRIENDS" => Ok(Self::MutualFollowFriends),
			"FOLLOWER_OF_CREATOR" => Ok(Self::FollowerOfCreator),
			"SELF_ONLY" => Ok(Self::SelfOnly),
			other => Err(format!("unknown privacy level `{other}`")),
		}
	}
}

/// How the caller's `privacy_level` is treated.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PrivacyPolicy {
	/// Ignore the caller and always post as [`PrivacyLevel::MOST_RESTRICTIVE`].
	#[default]
	ForceMostRestrictive,
	/// Use the caller's level when it is recognized, else the most restrictive one.
	HonorCaller,
}
impl PrivacyPolicy {
	/// Resolves the level to send for an optional caller-supplied value.
	pub fn resolve(self, requested: Option<&str>) -> PrivacyLevel {
		match (self, requested) {
			(PrivacyPolicy::ForceMostRestrictive, _) | (PrivacyPolicy::HonorCaller, None) =>
				PrivacyLevel::MOST_RESTRICTIVE,
			(PrivacyPolicy::HonorCaller, Some(raw)) => raw.parse().unwrap_or_else(|e| {
				tracing::warn!(error = %e, "Falling back to the most restrictive privacy level.");

				PrivacyLevel::MOST_RESTRICTIVE
			}),
		}
	}
}

/// Publish request accepted by the proxy.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct PublishRequest {
	/// Subject whose stored token authorizes the post.
	pub open_id: Option<String>,
	/// Publicly reachable media URL the vendor pulls from.
	pub video_url: Option<String>,
	/// Post title.
	pub title: Option<String>,
	/// Post description.
	pub description: Option<String>,
	/// Requested privacy level (subject to [`PrivacyPolicy`]).
	pub privacy_level: Option<String>,
}
impl PublishRequest {
	/// Caption sent as `post_info.title`: title and description separated by a blank line.
	pub fn caption(&self) -> String {
		[self.title.as_deref(), self.description.as_deref()]
			.into_iter()
			.flatten()
			.map(str::trim)
			.filter(|part| !part.is_empty())
			.collect::<Vec<_>>()
			.join("\n\n")
	}
}

/// Body sent to the publish-init endpoint.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct PublishInit {
	/// Post metadata.
	pub post_info: PostInfo,
	/// Media source.
	pub source_info: SourceInfo,
}

/// `post_info` block of [`PublishInit`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct PostInfo {
	/// Caption.
	pub title: String,
	/// Audience.
	pub privacy_level: PrivacyLevel,
	/// Disables duets.
	pub disable_duet: bool,
	/// Disables comments.
	pub disable_comment: bool,
	/// Disables stitches.
	pub disable_stitch: bool,
}

/// `source_info` block of [`PublishInit`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SourceInfo {
	/// Always `PULL_FROM_URL`.
	pub source: &'static str,
	/// Media URL.
	pub video_url: String,
}

/// What the vendor answered to a publish-init call.
#[derive(Clone, Debug, PartialEq)]
pub enum PublishOutcome {
	/// 2xx; the job-initiation payload, verbatim.
	Accepted(serde_json::Value),
	/// Non-2xx; the vendor status and body, verbatim.
	Rejected {
		/// Vendor HTTP status.
		status: u16,
		/// Vendor body.
		body: serde_json::Value,
	},
}

impl Relay {
	/// Validates the stored token for `request.open_id` and initiates a publish job.
	///
	/// Validation failures never reach the vendor.
	pub async fn publish(&self, request: PublishRequest) -> Result<PublishOutcome> {
		const KIND: FlowKind = FlowKind::Publish;

		let span = FlowSpan::new(KIND, "publish");

		obs::record_flow_outcome(KIND, FlowOutcome::Attempt);

		let result = span
			.instrument(async move {
				let (record, video_url) = self.authorize_publish(&request).await?;
				let body = PublishInit {
					post_info: PostInfo {
						title: request.caption(),
						privacy_level: self.privacy_policy.resolve(request.privacy_level.as_deref()),
						disable_duet: false,
						disable_comment: false,
						disable_stitch: false,
					},
					source_info: SourceInfo { source: "PULL_FROM_URL", video_url },
				};

				tracing::info!(
					subject = %record.subject,
					privacy_level = %body.post_info.privacy_level,
					"Initiating publish."
				);

				let response = self
					.http_client
					.post_json_authorized(
						&self.descriptor.endpoints.publish_init,
						&record.access_token,
						&body,
					)
					.await
					.map_err(Error::upstream_unavailable)?;
				let payload = response.json_or_text();

				if response.is_success() {
					Ok(PublishOutcome::Accepted(payload))
				} else {
					tracing::warn!(status = response.status, "Vendor rejected the publish request.");

					Ok(PublishOutcome::Rejected { status: response.status, body: payload })
				}
			})
			.await;

		match &result {
			Ok(PublishOutcome::Accepted(_)) => obs::record_flow_outcome(KIND, FlowOutcome::Success),
			_ => obs::record_flow_outcome(KIND, FlowOutcome::Failure),
		}

		result
	}

	/// Runs the local checks in order: parameters, presence, expiry, scope.
	async fn authorize_publish(&self, request: &PublishRequest) -> Result<(TokenRecord, String)> {
		let open_id = non_blank(request.open_id.as_deref()).ok_or(Error::MissingParameter("open_id"))?;
		let video_url =
			non_blank(request.video_url.as_deref()).ok_or(Error::MissingParameter("video_url"))?;
		let Ok(subject) = SubjectId::new(open_id) else {
			return Err(Error::Unauthenticated);
		};
		let record = self.store.get(&subject).await?.ok_or(Error::Unauthenticated)?;

		if record.is_expired_at(OffsetDateTime::now_utc()) {
			return Err(Error::TokenExpired { expired_at: record.expires_at });
		}
		if !record.scope.contains(VIDEO_PUBLISH) {
			return Err(Error::InsufficientScope { required: VIDEO_PUBLISH });
		}

		Ok((record, video_url.to_owned()))
	}
}

fn non_blank(value: Option<&str>) -> Option<&str> {
	value.map(str::trim).filter(|value| !value.is_empty())
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn forced_policy_ignores_caller() {
		let policy = PrivacyPolicy::ForceMostRestrictive;

		assert_eq!(policy.resolve(Some("PUBLIC_TO_EVERYONE")), PrivacyLevel::SelfOnly);
		assert_eq!(policy.resolve(None), PrivacyLevel::SelfOnly);
	}

	#[test]
	fn honoring_policy_parses_and_falls_back() {
		let policy = PrivacyPolicy::HonorCaller;

		assert_eq!(policy.resolve(Some("public_to_everyone")), PrivacyLevel::PublicToEveryone);
		assert_eq!(policy.resolve(Some("friends")), PrivacyLevel::SelfOnly);
		assert_eq!(policy.resolve(None), PrivacyLevel::SelfOnly);
	}

	#[test]
	fn caption_joins_present_parts() {
		let mut request = PublishRequest {
			title: Some("Launch".into()),
			description: Some("  #rust  ".into()),
			..Default::default()
		};

		assert_eq!(request.caption(), "Launch\n\n#rust");

		request.title = None;

		assert_eq!(request.caption(), "#rust");

		request.description = Some("   ".into());

		assert_eq!(request.caption(), "");
	}

	#[test]
	fn init_body_matches_wire_layout() {
		let body = PublishInit {
			post_info: PostInfo {
				title: "t".into(),
				privacy_level: PrivacyLevel::SelfOnly,
				disable_duet: false,
				disable_comment: false,
				disable_stitch: false,
			},
			source_info: SourceInfo { source: "PULL_FROM_URL", video_url: "http://x/v.mp4".into() },
		};
		let json = serde_json::to_value(&body).expect("Publish body should serialize.");

		assert_eq!(json["post_info"]["privacy_level"], "SELF_ONLY");
		assert_eq!(json["source_info"]["source"], "PULL_FROM_URL");
		assert_eq!(json["source_info"]["video_url"], "http://x/v.mp4");
	}
}
