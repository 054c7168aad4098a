//! Consent-screen redirects and the pending-session registry that guards the callback.

// crates.io
use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use rand::{Rng, distr::Alphanumeric};
use sha2::{Digest, Sha256};
// self
use crate::{
	_prelude::*,
	error::ExchangeError,
	flows::Relay,
	obs::{self, FlowKind, FlowOutcome},
};

const STATE_LEN: usize = 32;
const PKCE_VERIFIER_LEN: usize = 64;

/// How long a pending session accepts its callback.
pub const SESSION_TTL: Duration = Duration::minutes(10);
/// Upper bound on live pending sessions; the oldest one is evicted beyond it.
pub const MAX_PENDING_SESSIONS: usize = 1_024;

/// Authorization handshake returned by [`Relay::start_authorization`].
#[derive(Clone)]
pub struct AuthorizationSession {
	/// Opaque state value that must round-trip via the callback.
	pub state: String,
	/// Consent-screen URL the end user should be redirected to.
	pub authorize_url: Url,
	/// PKCE challenge, when the relay runs with PKCE enabled.
	pub code_challenge: Option<String>,
}
impl Debug for AuthorizationSession {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("AuthorizationSession")
			.field("state", &self.state)
			.field("authorize_url", &self.authorize_url.as_str())
			.field("code_challenge", &self.code_challenge)
			.finish()
	}
}

/// State remembered between the redirect and the callback.
#[derive(Clone)]
pub struct PendingSession {
	/// PKCE verifier to send with the exchange.
	pub code_verifier: Option<String>,
	/// When the session was created.
	pub created_at: OffsetDateTime,
}
impl PendingSession {
	fn is_live_at(&self, now: OffsetDateTime) -> bool {
		now - self.created_at < SESSION_TTL
	}
}
impl Debug for PendingSession {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("PendingSession")
			.field("code_verifier", &self.code_verifier.as_ref().map(|_| "<redacted>"))
			.field("created_at", &self.created_at)
			.finish()
	}
}

/// In-memory map of outstanding `state` values.
///
/// Entries are single-use and pruned lazily whenever a new session is registered. At most
/// [`MAX_PENDING_SESSIONS`] are kept; registering past the bound evicts the oldest session.
#[derive(Clone, Debug, Default)]
pub struct SessionRegistry(Arc<Mutex<HashMap<String, PendingSession>>>);
impl SessionRegistry {
	/// Registers a new pending session.
	pub fn insert(&self, state: String, session: PendingSession) {
		let mut guard = self.0.lock();
		let now = session.created_at;

		guard.retain(|_, pending| pending.is_live_at(now));

		while guard.len() >= MAX_PENDING_SESSIONS {
			let Some(oldest) = guard
				.iter()
				.min_by_key(|(_, pending)| pending.created_at)
				.map(|(state, _)| state.clone())
			else {
				break;
			};

			tracing::debug!("Pending session limit reached; evicting the oldest session.");
			guard.remove(&oldest);
		}

		guard.insert(state, session);
	}

	/// Removes and returns the session for `state` when it is still live.
	pub fn take(&self, state: &str, now: OffsetDateTime) -> Option<PendingSession> {
		self.0.lock().remove(state).filter(|session| session.is_live_at(now))
	}

	/// Number of registered sessions, including ones that expired but were not pruned yet.
	pub fn len(&self) -> usize {
		self.0.lock().len()
	}

	/// Returns true when no sessions are registered.
	pub fn is_empty(&self) -> bool {
		self.0.lock().is_empty()
	}
}

impl Relay {
	/// Builds the consent-screen URL and registers its `state` for the callback.
	pub fn start_authorization(&self) -> AuthorizationSession {
		let state = random_string(STATE_LEN);
		let code_verifier = self.pkce.then(|| random_string(PKCE_VERIFIER_LEN));
		let code_challenge = code_verifier.as_deref().map(compute_pkce_challenge);
		let authorize_url = self.build_authorize_url(&state, code_challenge.as_deref());

		self.sessions.insert(
			state.clone(),
			PendingSession { code_verifier, created_at: OffsetDateTime::now_utc() },
		);
		obs::record_flow_outcome(FlowKind::Authorize, FlowOutcome::Success);
		tracing::debug!(pkce = self.pkce, "Authorization session registered.");

		AuthorizationSession { state, authorize_url, code_challenge }
	}

	/// Resolves the callback `state` into its pending session.
	///
	/// A missing `state` is accepted so direct callbacks (without a prior `/auth/login`)
	/// keep working; a present but unknown or expired `state` is rejected.
	pub fn resolve_state(&self, state: Option<&str>) -> Result<Option<PendingSession>> {
		match state.filter(|value| !value.is_empty()) {
			None => Ok(None),
			Some(value) => self
				.sessions
				.take(value, OffsetDateTime::now_utc())
				.map(Some)
				.ok_or_else(|| ExchangeError::StateMismatch.into()),
		}
	}

	fn build_authorize_url(&self, state: &str, code_challenge: Option<&str>) -> Url {
		let mut url = self.descriptor.endpoints.authorize.clone();
		let mut pairs = url.query_pairs_mut();

		pairs.append_pair(&self.descriptor.quirks.client_id_param, &self.credentials.client_key);
		pairs.append_pair("response_type", "code");

		if let Some(scope) = self.requested_scope.join(self.descriptor.quirks.scope_delimiter) {
			pairs.append_pair("scope", &scope);
		}

		pairs.append_pair("redirect_uri", self.credentials.redirect_uri.as_str());
		pairs.append_pair("state", state);

		if let Some(challenge) = code_challenge {
			pairs.append_pair("code_challenge", challenge);
			pairs.append_pair("code_challenge_method", "S256");
		}

		drop(pairs);

		url
	}
}

fn random_string(len: usize) -> String {
	rand::rng().sample_iter(Alphanumeric).take(len).map(char::from).collect()
}

fn compute_pkce_challenge(verifier: &str) -> String {
	let digest = Sha256::digest(verifier.as_bytes());

	URL_SAFE_NO_PAD.encode(digest)
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn pkce_challenge_matches_rfc7636_vector() {
		assert_eq!(
			compute_pkce_challenge("dBjftJeZ4CVP-mB92K27uhbUJU1p1r_wW1gFWFOEjXk"),
			"E9Melhoa2OwvFrEMTJguCHaoeK1t8URWbuGJSstw-cM"
		);
	}

	#[test]
	fn sessions_are_single_use_and_expire() {
		let registry = SessionRegistry::default();
		let now = OffsetDateTime::now_utc();

		registry.insert("live".into(), PendingSession { code_verifier: None, created_at: now });
		registry.insert(
			"stale".into(),
			PendingSession { code_verifier: None, created_at: now - Duration::hours(1) },
		);

		assert!(registry.take("live", now).is_some());
		assert!(registry.take("live", now).is_none(), "Sessions must be consumed once.");
		assert!(registry.take("stale", now).is_none(), "Expired sessions must be rejected.");
		assert!(registry.is_empty());
	}

	#[test]
	fn registering_prunes_expired_sessions() {
		let registry = SessionRegistry::default();
		let now = OffsetDateTime::now_utc();

		registry.insert(
			"old".into(),
			PendingSession { code_verifier: None, created_at: now - Duration::hours(1) },
		);
		registry.insert("new".into(), PendingSession { code_verifier: None, created_at: now });

		assert_eq!(registry.len(), 1);
	}

	#[test]
	fn registry_is_bounded_and_evicts_oldest() {
		let registry = SessionRegistry::default();
		let start = OffsetDateTime::now_utc();

		for i in 0..=MAX_PENDING_SESSIONS {
			registry.insert(format!("state-{i}"), PendingSession {
				code_verifier: None,
				created_at: start + Duration::milliseconds(i as i64),
			});
		}

		let now = start + Duration::seconds(1);

		assert_eq!(registry.len(), MAX_PENDING_SESSIONS);
		assert!(registry.take("state-0", now).is_none(), "Oldest session should be evicted.");
		assert!(registry.take(&format!("state-{MAX_PENDING_SESSIONS}"), now).is_some());
	}
}
