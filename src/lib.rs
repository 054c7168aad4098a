//! Single-process OAuth 2.0 relay for TikTok Login Kit and the Content Posting API.
//!
//! The relay exchanges authorization codes, keeps the resulting tokens in an injected
//! [`store::TokenStore`], reports token status, and proxies publish requests with a
//! privacy-safe default.

#![deny(clippy::all, missing_docs)]
#![cfg_attr(not(test), deny(unused_crate_dependencies))]

pub mod api;
pub mod auth;
pub mod config;
pub mod error;
pub mod flows;
pub mod http;
pub mod obs;
pub mod store;
pub mod vendor;
#[cfg(any(test, feature = "test"))]
pub mod _preludet {
	//! Convenience re-exports and helpers for integration tests; enabled via `cfg(test)` or the
	//! `test` crate feature.

	pub use crate::_prelude::*;

	// self
	use crate::{
		flows::{PrivacyPolicy, Relay, RelayCredentials},
		http::ReqwestHttpClient,
		store::{MemoryStore, TokenStore},
		vendor::VendorDescriptor,
	};

	/// Client key used by test relays.
	pub const TEST_CLIENT_KEY: &str = "client-key-it";
	/// Client secret used by test relays.
	pub const TEST_CLIENT_SECRET: &str = "client-secret-it";
	/// Registered redirect URI used by test relays.
	pub const TEST_REDIRECT_URI: &str = "https://relay.example.com/auth/callback";

	/// Builds a reqwest HTTP client that accepts the self-signed certificates produced by
	/// `httpmock` during tests.
	pub fn test_reqwest_http_client() -> ReqwestHttpClient {
		let client = ReqwestClient::builder()
			.danger_accept_invalid_certs(true)
			.danger_accept_invalid_hostnames(true)
			.build()
			.expect("Failed to build insecure Reqwest client for tests.");

		ReqwestHttpClient::with_client(client)
	}

	/// Builds a descriptor whose API endpoints all live under `api_base` (typically a mock
	/// server URL).
	pub fn test_descriptor(api_base: &str) -> VendorDescriptor {
		let api = Url::parse(api_base).expect("Mock API base should parse successfully.");
		let auth = Url::parse("https://www.tiktok.com/")
			.expect("Authorize base should parse successfully.");

		VendorDescriptor::from_bases(&api, &auth).expect("Test descriptor should build.")
	}

	/// Constructs a [`Relay`] backed by an in-memory store and the insecure test transport.
	pub fn build_test_relay(descriptor: VendorDescriptor) -> (Relay, Arc<MemoryStore>) {
		build_test_relay_with_policy(descriptor, PrivacyPolicy::default())
	}

	/// Same as [`build_test_relay`] with an explicit privacy policy.
	pub fn build_test_relay_with_policy(
		descriptor: VendorDescriptor,
		policy: PrivacyPolicy,
	) -> (Relay, Arc<MemoryStore>) {
		let store_backend = Arc::new(MemoryStore::default());
		let store: Arc<dyn TokenStore> = store_backend.clone();
		let redirect_uri =
			Url::parse(TEST_REDIRECT_URI).expect("Test redirect URI should parse successfully.");
		let credentials = RelayCredentials::new(TEST_CLIENT_KEY, TEST_CLIENT_SECRET, redirect_uri);
		let relay = Relay::with_http_client(store, descriptor, credentials, test_reqwest_http_client())
			.with_privacy_policy(policy);

		(relay, store_backend)
	}
}

mod _prelude {
	pub use std::{
		collections::{BTreeMap, HashMap},
		error::Error as StdError,
		fmt::{Debug, Display, Formatter, Result as FmtResult},
		future::Future,
		pin::Pin,
		str::FromStr,
		sync::Arc,
	};

	pub use parking_lot::{Mutex, RwLock};
	pub use reqwest::{Client as ReqwestClient, Error as ReqwestError};
	pub use serde::{Deserialize, Serialize};
	pub use thiserror::Error as ThisError;
	pub use time::{Duration, OffsetDateTime};
	pub use url::Url;

	pub use crate::error::{Error, Result};
}

pub use reqwest;
pub use url;
