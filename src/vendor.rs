//! Vendor descriptor: the endpoints and wire quirks of the platform the relay fronts.
//!
//! The descriptor is pure data. Flows read endpoint URLs and quirks from it so tests (and
//! sandbox deployments) can point the relay at a different host without touching flow code.

/// Builder API for assembling vendor descriptors.
pub mod builder;

pub use builder::*;

// self
use crate::_prelude::*;

/// Production host serving the token, user-info, and publish APIs.
pub const TIKTOK_API_BASE: &str = "https://open.tiktokapis.com/";
/// Production host serving the consent screen.
pub const TIKTOK_AUTH_BASE: &str = "https://www.tiktok.com/";

const AUTHORIZE_PATH: &str = "v2/auth/authorize/";
const TOKEN_PATH: &str = "v2/oauth/token/";
const USER_INFO_PATH: &str = "v2/user/info/";
const PUBLISH_INIT_PATH: &str = "v2/post/publish/video/init/";

/// Endpoint set declared by a vendor descriptor.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VendorEndpoints {
	/// Consent screen the end user is redirected to.
	pub authorize: Url,
	/// Code-for-token exchange endpoint.
	pub token: Url,
	/// Basic profile endpoint.
	pub user_info: Url,
	/// Direct-post initialization endpoint.
	pub publish_init: Url,
}

/// Wire-level differences from plain RFC 6749 behavior.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VendorQuirks {
	/// Character used to join scopes in the authorize URL.
	pub scope_delimiter: char,
	/// Form/query parameter that carries the client identifier.
	pub client_id_param: String,
}
impl Default for VendorQuirks {
	fn default() -> Self {
		Self { scope_delimiter: ',', client_id_param: "client_key".into() }
	}
}

/// Immutable vendor descriptor consumed by flows.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VendorDescriptor {
	/// Endpoint definitions.
	pub endpoints: VendorEndpoints,
	/// Vendor-specific quirks.
	pub quirks: VendorQuirks,
}
impl VendorDescriptor {
	/// Creates a new builder.
	pub fn builder() -> VendorDescriptorBuilder {
		VendorDescriptorBuilder::default()
	}

	/// Descriptor for the production TikTok hosts.
	pub fn tiktok() -> Result<Self, VendorDescriptorError> {
		let api = Url::parse(TIKTOK_API_BASE).map_err(VendorDescriptorError::invalid_base)?;
		let auth = Url::parse(TIKTOK_AUTH_BASE).map_err(VendorDescriptorError::invalid_base)?;

		Self::from_bases(&api, &auth)
	}

	/// Lays the standard v2 paths out under the provided API and consent-screen bases.
	pub fn from_bases(api: &Url, auth: &Url) -> Result<Self, VendorDescriptorError> {
		let join = |base: &Url, path: &str| base.join(path).map_err(VendorDescriptorError::invalid_base);

		Self::builder()
			.authorize_endpoint(join(auth, AUTHORIZE_PATH)?)
			.token_endpoint(join(api, TOKEN_PATH)?)
			.user_info_endpoint(join(api, USER_INFO_PATH)?)
			.publish_init_endpoint(join(api, PUBLISH_INIT_PATH)?)
			.build()
	}
}
