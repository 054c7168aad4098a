//! Runtime configuration: CLI flags, each also readable from the environment.
//!
//! [`RelayConfig::load`] reads an optional `.env` file first, so local deployments can keep
//! credentials out of the shell history.

// std
use std::{net::SocketAddr, time::Duration as StdDuration};
// crates.io
use clap::{Parser, ValueEnum};
// self
use crate::{
	_prelude::*,
	api::CallbackMode,
	auth::ScopeSet,
	error::ConfigError,
	flows::{PrivacyPolicy, Relay, RelayCredentials},
	http::ReqwestHttpClient,
	store::{MemoryStore, TokenStore},
	vendor::{TIKTOK_API_BASE, TIKTOK_AUTH_BASE, VendorDescriptor},
};

/// Privacy policy choices exposed on the command line.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum PrivacyPolicyArg {
	/// Always post as `SELF_ONLY`.
	#[default]
	ForceMostRestrictive,
	/// Honor the caller's `privacy_level`.
	HonorCaller,
}
impl From<PrivacyPolicyArg> for PrivacyPolicy {
	fn from(value: PrivacyPolicyArg) -> Self {
		match value {
			PrivacyPolicyArg::ForceMostRestrictive => PrivacyPolicy::ForceMostRestrictive,
			PrivacyPolicyArg::HonorCaller => PrivacyPolicy::HonorCaller,
		}
	}
}

/// Relay configuration.
#[derive(Clone, Parser)]
#[command(name = "tiktok-relay", version, about)]
pub struct RelayConfig {
	/// Vendor-issued client key.
	#[arg(long, env = "TIKTOK_CLIENT_KEY")]
	pub client_key: String,
	/// Vendor-issued client secret.
	#[arg(long, env = "TIKTOK_CLIENT_SECRET", hide_env_values = true)]
	pub client_secret: String,
	/// Callback URI registered with the vendor; must match exactly.
	#[arg(long, env = "TIKTOK_REDIRECT_URI")]
	pub redirect_uri: String,
	/// Frontend to redirect to after the callback; plain-text responses when unset.
	#[arg(long, env = "FRONTEND_URL")]
	pub frontend_url: Option<String>,
	/// Listening port.
	#[arg(long, env = "PORT", default_value_t = 3000)]
	pub port: u16,
	/// Listening address.
	#[arg(long, env = "HOST", default_value = "0.0.0.0")]
	pub host: String,
	/// Scopes requested on the consent screen.
	#[arg(long, env = "TIKTOK_SCOPES", default_value = "user.info.basic,video.publish")]
	pub scopes: String,
	/// How the publish proxy treats the caller's privacy level.
	#[arg(long, env = "TIKTOK_PRIVACY_POLICY", value_enum, default_value_t)]
	pub privacy_policy: PrivacyPolicyArg,
	/// Deadline for every outbound vendor request, in seconds.
	#[arg(long, env = "TIKTOK_REQUEST_TIMEOUT_SECS", default_value_t = 30)]
	pub request_timeout_secs: u64,
	/// Attach a PKCE challenge to new authorization sessions.
	#[arg(long, env = "TIKTOK_PKCE")]
	pub pkce: bool,
	/// Serve `/api/debug/tokens`.
	#[arg(long, env = "RELAY_DEBUG_ENDPOINTS")]
	pub debug_endpoints: bool,
	/// Base URL of the token, user-info, and publish APIs.
	#[arg(long, env = "TIKTOK_API_BASE", default_value = TIKTOK_API_BASE)]
	pub api_base: String,
	/// Base URL of the consent screen.
	#[arg(long, env = "TIKTOK_AUTH_BASE", default_value = TIKTOK_AUTH_BASE)]
	pub auth_base: String,
}
impl RelayConfig {
	/// Loads `.env` (when present) and parses the process arguments.
	pub fn load() -> Self {
		match dotenvy::dotenv() {
			Err(e) if !e.not_found() => tracing::warn!(error = %e, "Ignoring unreadable .env file."),
			_ => {},
		}

		Self::parse()
	}

	/// Socket address to bind.
	pub fn listen_addr(&self) -> Result<SocketAddr, ConfigError> {
		format!("{}:{}", self.host, self.port)
			.parse()
			.map_err(|e| ConfigError::Bind(std::io::Error::new(std::io::ErrorKind::InvalidInput, e)))
	}

	/// Vendor descriptor for the configured hosts.
	pub fn descriptor(&self) -> Result<VendorDescriptor, ConfigError> {
		let api = parse_url("api_base", &self.api_base)?;
		let auth = parse_url("auth_base", &self.auth_base)?;

		Ok(VendorDescriptor::from_bases(&api, &auth)?)
	}

	/// Callback response mode derived from `frontend_url`.
	pub fn callback_mode(&self) -> Result<CallbackMode, ConfigError> {
		match self.frontend_url.as_deref().filter(|url| !url.is_empty()) {
			None => Ok(CallbackMode::PlainText),
			Some(raw) => Ok(CallbackMode::Redirect { frontend_url: parse_url("frontend_url", raw)? }),
		}
	}

	/// Assembles a relay backed by a fresh in-memory store.
	pub fn build_relay(&self) -> Result<Relay, ConfigError> {
		let store: Arc<dyn TokenStore> = Arc::new(MemoryStore::default());
		let credentials = RelayCredentials::new(
			self.client_key.clone(),
			self.client_secret.clone(),
			parse_url("redirect_uri", &self.redirect_uri)?,
		);
		let http_client =
			ReqwestHttpClient::build(StdDuration::from_secs(self.request_timeout_secs))?;
		let scope = ScopeSet::from_str(&self.scopes)?;

		Ok(Relay::with_http_client(store, self.descriptor()?, credentials, http_client)
			.with_requested_scope(scope)
			.with_privacy_policy(self.privacy_policy.into())
			.with_pkce(self.pkce))
	}
}
impl Debug for RelayConfig {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("RelayConfig")
			.field("client_key", &self.client_key)
			.field("client_secret", &"<redacted>")
			.field("redirect_uri", &self.redirect_uri)
			.field("frontend_url", &self.frontend_url)
			.field("host", &self.host)
			.field("port", &self.port)
			.field("scopes", &self.scopes)
			.field("privacy_policy", &self.privacy_policy)
			.field("request_timeout_secs", &self.request_timeout_secs)
			.field("pkce", &self.pkce)
			.field("debug_endpoints", &self.debug_endpoints)
			.finish()
	}
}

fn parse_url(name: &'static str, raw: &str) -> Result<Url, ConfigError> {
	Url::parse(raw).map_err(|source| ConfigError::InvalidUrl { name, source })
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	fn parse(extra: &[&str]) -> RelayConfig {
		let base = [
			"tiktok-relay",
			"--client-key",
			"ck",
			"--client-secret",
			"cs",
			"--redirect-uri",
			"https://relay.example.com/auth/callback",
		];

		RelayConfig::try_parse_from(base.iter().chain(extra)).expect("Arguments should parse.")
	}

	#[test]
	fn flags_build_a_relay_with_defaults() {
		let config = parse(&[]);

		assert_eq!(config.port, 3000);
		assert_eq!(config.privacy_policy, PrivacyPolicyArg::ForceMostRestrictive);
		assert_eq!(config.callback_mode().expect("Mode should resolve."), CallbackMode::PlainText);

		let relay = config.build_relay().expect("Relay should build from defaults.");

		assert!(relay.requested_scope.contains("video.publish"));
		assert_eq!(relay.privacy_policy, PrivacyPolicy::ForceMostRestrictive);
		assert!(!format!("{config:?}").contains("\"cs\""));
	}

	#[test]
	fn frontend_url_switches_to_redirect_mode() {
		let config = parse(&[
			"--frontend-url",
			"https://app.example.com/done",
			"--privacy-policy",
			"honor-caller",
		]);

		assert!(matches!(
			config.callback_mode().expect("Mode should resolve."),
			CallbackMode::Redirect { .. }
		));
		assert_eq!(PrivacyPolicy::from(config.privacy_policy), PrivacyPolicy::HonorCaller);
	}

	#[test]
	fn invalid_urls_are_reported() {
		let config = parse(&["--api-base", "not a url"]);

		assert!(matches!(config.descriptor(), Err(ConfigError::InvalidUrl { name: "api_base", .. })));
	}
}
