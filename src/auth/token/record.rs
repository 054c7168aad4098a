//! Token record struct, lifecycle helpers, and builder.

// self
use crate::{
	_prelude::*,
	auth::{ScopeSet, SubjectId, token::secret::TokenSecret},
};

/// Current lifecycle status for a token record.
///
/// Expiry is observed lazily; nothing sweeps expired records out of the store.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum TokenStatus {
	/// Token is usable.
	Active,
	/// Token reached its expiry instant.
	Expired,
}

/// Errors produced by [`TokenRecordBuilder`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ThisError)]
pub enum TokenRecordBuilderError {
	/// Issued when no access token value was provided.
	#[error("Access token is required.")]
	MissingAccessToken,
	/// Issued when no expiry (absolute or relative) was configured.
	#[error("Expiry must be supplied via expires_at or expires_in.")]
	MissingExpiry,
	/// Issued when the expiry is not strictly after the issued-at instant.
	#[error("Expiry must be strictly after the issued-at instant.")]
	NonFutureExpiry,
	/// Issued when a lifetime pushes an instant past the representable range.
	#[error("Lifetime is out of range.")]
	LifetimeOutOfRange,
}

/// Token issued to one subject by a successful code exchange.
#[derive(Clone, Serialize, Deserialize)]
pub struct TokenRecord {
	/// Subject (vendor `open_id`) owning the token.
	pub subject: SubjectId,
	/// Scopes granted with this token.
	pub scope: ScopeSet,
	/// Bearer credential; callers must avoid logging it.
	pub access_token: TokenSecret,
	/// Refresh credential, if the vendor issued one.
	pub refresh_token: Option<TokenSecret>,
	/// Instant the exchange response was accepted.
	pub issued_at: OffsetDateTime,
	/// `issued_at` plus the declared lifetime.
	pub expires_at: OffsetDateTime,
	/// Expiry of the refresh credential, when the vendor declared one.
	pub refresh_expires_at: Option<OffsetDateTime>,
}
impl TokenRecord {
	/// Returns a builder for the provided subject and granted scopes.
	pub fn builder(subject: SubjectId, scope: ScopeSet) -> TokenRecordBuilder {
		TokenRecordBuilder::new(subject, scope)
	}

	/// Computes the lifecycle status at a given instant.
	pub fn status_at(&self, instant: OffsetDateTime) -> TokenStatus {
		if instant >= self.expires_at { TokenStatus::Expired } else { TokenStatus::Active }
	}

	/// Convenience helper that checks the status using the current UTC instant.
	pub fn status(&self) -> TokenStatus {
		self.status_at(OffsetDateTime::now_utc())
	}

	/// Returns `true` if the record has expired at the provided instant.
	pub fn is_expired_at(&self, instant: OffsetDateTime) -> bool {
		matches!(self.status_at(instant), TokenStatus::Expired)
	}

	/// Returns `true` if the record is expired relative to the current clock.
	pub fn is_expired(&self) -> bool {
		matches!(self.status(), TokenStatus::Expired)
	}

	/// Whole seconds left before expiry, clamped at zero.
	pub fn seconds_remaining_at(&self, instant: OffsetDateTime) -> i64 {
		(self.expires_at - instant).whole_seconds().max(0)
	}
}
impl Debug for TokenRecord {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("TokenRecord")
			.field("subject", &self.subject)
			.field("scope", &self.scope)
			.field("access_token", &"<redacted>")
			.field("refresh_token", &self.refresh_token.as_ref().map(|_| "<redacted>"))
			.field("issued_at", &self.issued_at)
			.field("expires_at", &self.expires_at)
			.field("refresh_expires_at", &self.refresh_expires_at)
			.finish()
	}
}

/// Builder for [`TokenRecord`].
#[derive(Clone, Debug)]
pub struct TokenRecordBuilder {
	subject: SubjectId,
	scope: ScopeSet,
	access_token: Option<TokenSecret>,
	refresh_token: Option<TokenSecret>,
	issued_at: Option<OffsetDateTime>,
	expires_at: Option<OffsetDateTime>,
	expires_in: Option<Duration>,
	refresh_expires_in: Option<Duration>,
}
impl TokenRecordBuilder {
	fn new(subject: SubjectId, scope: ScopeSet) -> Self {
		Self {
			subject,
			scope,
			access_token: None,
			refresh_token: None,
			issued_at: None,
			expires_at: None,
			expires_in: None,
			refresh_expires_in: None,
		}
	}

	/// Sets the issued-at instant.
	pub fn issued_at(mut self, instant: OffsetDateTime) -> Self {
		self.issued_at = Some(instant);

		self
	}

	/// Sets an absolute expiry instant.
	pub fn expires_at(mut self, instant: OffsetDateTime) -> Self {
		self.expires_at = Some(instant);

		self
	}

	/// Sets a relative expiry duration from the issued instant.
	pub fn expires_in(mut self, duration: Duration) -> Self {
		self.expires_in = Some(duration);

		self
	}

	/// Sets the refresh credential lifetime relative to the issued instant.
	pub fn refresh_expires_in(mut self, duration: Duration) -> Self {
		self.refresh_expires_in = Some(duration);

		self
	}

	/// Provides the access token value.
	pub fn access_token(mut self, token: impl Into<String>) -> Self {
		self.access_token = Some(TokenSecret::new(token));

		self
	}

	/// Provides the refresh token value.
	pub fn refresh_token(mut self, token: impl Into<String>) -> Self {
		self.refresh_token = Some(TokenSecret::new(token));

		self
	}

	/// Consumes the builder and produces a [`TokenRecord`].
	pub fn build(self) -> Result<TokenRecord, TokenRecordBuilderError> {
		let access_token = self.access_token.ok_or(TokenRecordBuilderError::MissingAccessToken)?;
		let issued_at = self.issued_at.unwrap_or_else(OffsetDateTime::now_utc);
		let expires_at = match (self.expires_at, self.expires_in) {
			(Some(instant), _) => instant,
			(None, Some(delta)) =>
				issued_at.checked_add(delta).ok_or(TokenRecordBuilderError::LifetimeOutOfRange)?,
			(None, None) => return Err(TokenRecordBuilderError::MissingExpiry),
		};

		if expires_at <= issued_at {
			return Err(TokenRecordBuilderError::NonFutureExpiry);
		}

		let refresh_expires_at = self
			.refresh_expires_in
			.map(|delta| issued_at.checked_add(delta).ok_or(TokenRecordBuilderError::LifetimeOutOfRange))
			.transpose()?;

		Ok(TokenRecord {
			subject: self.subject,
			scope: self.scope,
			access_token,
			refresh_token: self.refresh_token,
			issued_at,
			expires_at,
			refresh_expires_at,
		})
	}
}
