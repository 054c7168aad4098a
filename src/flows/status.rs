//! Read-only status views over the token store.

// self
use crate::{
	_prelude::*,
	auth::{ScopeSet, SubjectId, TokenRecord},
	flows::Relay,
};

/// Status of the token stored for one subject.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct TokenStatusReport {
	/// Whether a record exists.
	pub found: bool,
	/// Whether the record exists and has not expired.
	pub valid: bool,
	/// Expiry instant of the record.
	#[serde(with = "time::serde::rfc3339::option")]
	pub expires_at: Option<OffsetDateTime>,
	/// Whole seconds until expiry, zero once expired.
	pub seconds_remaining: i64,
	/// Granted scopes.
	pub scope: Option<ScopeSet>,
}
impl TokenStatusReport {
	/// Report for a subject with no stored record.
	pub fn not_found() -> Self {
		Self { found: false, valid: false, expires_at: None, seconds_remaining: 0, scope: None }
	}

	/// Report computed from `record` at `now`.
	pub fn from_record(record: &TokenRecord, now: OffsetDateTime) -> Self {
		Self {
			found: true,
			valid: !record.is_expired_at(now),
			expires_at: Some(record.expires_at),
			seconds_remaining: record.seconds_remaining_at(now),
			scope: Some(record.scope.clone()),
		}
	}
}

/// Credential-free summary of one stored record, used by the debug dump.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct TokenPresence {
	/// Subject identifier.
	pub open_id: SubjectId,
	/// Always true for stored records; kept so the dump is self-describing.
	pub has_access_token: bool,
	/// Whether a refresh credential was issued.
	pub has_refresh_token: bool,
	/// Expiry instant.
	#[serde(with = "time::serde::rfc3339")]
	pub expires_at: OffsetDateTime,
	/// Whether the record is expired.
	pub expired: bool,
	/// Granted scopes.
	pub scope: ScopeSet,
}

impl Relay {
	/// Computes the status for `subject` without touching the record.
	///
	/// Unknown and syntactically invalid subjects both report `found = false`.
	pub async fn token_status(&self, subject: &str) -> Result<TokenStatusReport> {
		let Ok(subject) = SubjectId::new(subject) else {
			return Ok(TokenStatusReport::not_found());
		};
		let now = OffsetDateTime::now_utc();

		Ok(self
			.store
			.get(&subject)
			.await?
			.map(|record| TokenStatusReport::from_record(&record, now))
			.unwrap_or_else(TokenStatusReport::not_found))
	}

	/// Lists every stored record with presence flags only.
	pub async fn token_presence(&self) -> Result<Vec<TokenPresence>> {
		let now = OffsetDateTime::now_utc();
		let records = self.store.snapshot().await?;

		Ok(records
			.into_iter()
			.map(|record| TokenPresence {
				has_access_token: !record.access_token.expose().is_empty(),
				has_refresh_token: record.refresh_token.is_some(),
				expires_at: record.expires_at,
				expired: record.is_expired_at(now),
				scope: record.scope,
				open_id: record.subject,
			})
			.collect())
	}
}
