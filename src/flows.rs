//! Relay flows: authorization start, code exchange, profile enrichment, publish proxy, and
//! status queries.

pub mod authorize;
pub mod exchange;
pub mod profile;
pub mod publish;
pub mod status;

pub use authorize::*;
pub use exchange::*;
pub use profile::*;
pub use publish::*;
pub use status::*;

// self
use crate::{
	_prelude::*,
	auth::{ScopeSet, USER_INFO_BASIC, VIDEO_PUBLISH},
	http::ReqwestHttpClient,
	store::TokenStore,
	vendor::VendorDescriptor,
};

/// Client credentials and the pre-registered callback target.
#[derive(Clone)]
pub struct RelayCredentials {
	/// Vendor-issued client key.
	pub client_key: String,
	/// Vendor-issued client secret.
	pub client_secret: String,
	/// Callback URI; must exactly match the value registered with the vendor.
	pub redirect_uri: Url,
}
impl RelayCredentials {
	/// Bundles the client credentials with the registered redirect URI.
	pub fn new(
		client_key: impl Into<String>,
		client_secret: impl Into<String>,
		redirect_uri: Url,
	) -> Self {
		Self { client_key: client_key.into(), client_secret: client_secret.into(), redirect_uri }
	}
}
impl Debug for RelayCredentials {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("RelayCredentials")
			.field("client_key", &self.client_key)
			.field("client_secret", &"<redacted>")
			.field("redirect_uri", &self.redirect_uri.as_str())
			.finish()
	}
}

/// Binds the vendor descriptor, credentials, transport, and token store together.
///
/// Handlers hold the relay behind an [`Arc`]; every operation takes `&self`, and the only
/// shared mutable state lives in the injected [`TokenStore`] and the pending
/// [`SessionRegistry`].
#[derive(Clone)]
pub struct Relay {
	/// HTTP client used for every outbound vendor request.
	pub http_client: ReqwestHttpClient,
	/// Token store that keeps issued tokens per subject.
	pub store: Arc<dyn TokenStore>,
	/// Vendor endpoints and quirks.
	pub descriptor: VendorDescriptor,
	/// Client credentials and redirect target.
	pub credentials: RelayCredentials,
	/// Scopes requested on the consent screen.
	pub requested_scope: ScopeSet,
	/// How the publish proxy picks the privacy level.
	pub privacy_policy: PrivacyPolicy,
	/// Whether new authorization sessions carry a PKCE challenge.
	pub pkce: bool,
	/// Pending authorization sessions keyed by `state`.
	pub sessions: SessionRegistry,
}
impl Relay {
	/// Creates a relay with the default production transport.
	pub fn new(
		store: Arc<dyn TokenStore>,
		descriptor: VendorDescriptor,
		credentials: RelayCredentials,
	) -> Self {
		Self::with_http_client(store, descriptor, credentials, ReqwestHttpClient::default())
	}

	/// Creates a relay that reuses the caller-provided transport.
	pub fn with_http_client(
		store: Arc<dyn TokenStore>,
		descriptor: VendorDescriptor,
		credentials: RelayCredentials,
		http_client: ReqwestHttpClient,
	) -> Self {
		let requested_scope =
			ScopeSet::new([USER_INFO_BASIC, VIDEO_PUBLISH]).unwrap_or_default();

		Self {
			http_client,
			store,
			descriptor,
			credentials,
			requested_scope,
			privacy_policy: PrivacyPolicy::default(),
			pkce: false,
			sessions: SessionRegistry::default(),
		}
	}

	/// Overrides the scopes requested on the consent screen.
	pub fn with_requested_scope(mut self, scope: ScopeSet) -> Self {
		self.requested_scope = scope;

		self
	}

	/// Overrides the publish privacy policy.
	pub fn with_privacy_policy(mut self, policy: PrivacyPolicy) -> Self {
		self.privacy_policy = policy;

		self
	}

	/// Enables or disables PKCE for new authorization sessions.
	pub fn with_pkce(mut self, enabled: bool) -> Self {
		self.pkce = enabled;

		self
	}
}
impl Debug for Relay {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("Relay")
			.field("descriptor", &self.descriptor)
			.field("credentials", &self.credentials)
			.field("requested_scope", &self.requested_scope)
			.field("privacy_policy", &self.privacy_policy)
			.field("pkce", &self.pkce)
			.finish()
	}
}
