// self
use tiktok_relay::{
	_preludet::*,
	vendor::{VendorDescriptor, VendorDescriptorError, VendorQuirks},
};

fn url(raw: &str) -> Url {
	Url::parse(raw).expect("URL fixture should parse.")
}

#[test]
fn sandbox_bases_keep_the_v2_layout() {
	let descriptor = VendorDescriptor::from_bases(
		&url("https://sandbox.example.com/tiktok/"),
		&url("https://consent.example.com/"),
	)
	.expect("Sandbox descriptor should build.");

	assert_eq!(descriptor.endpoints.token.as_str(), "https://sandbox.example.com/tiktok/v2/oauth/token/");
	assert_eq!(descriptor.endpoints.user_info.as_str(), "https://sandbox.example.com/tiktok/v2/user/info/");
	assert_eq!(descriptor.endpoints.authorize.as_str(), "https://consent.example.com/v2/auth/authorize/");
}

#[test]
fn plain_http_is_only_allowed_on_loopback() {
	assert!(VendorDescriptor::from_bases(&url("http://localhost:8080/"), &url("http://127.0.0.1/")).is_ok());

	let err = VendorDescriptor::from_bases(&url("http://open.example.com/"), &url("https://a.example.com/"))
		.expect_err("Remote plain HTTP should be rejected.");

	assert!(matches!(err, VendorDescriptorError::InsecureEndpoint { endpoint: "token", .. }));
}

#[test]
fn builder_requires_every_endpoint() {
	let err = VendorDescriptor::builder()
		.authorize_endpoint(url("https://www.tiktok.com/v2/auth/authorize/"))
		.token_endpoint(url("https://open.tiktokapis.com/v2/oauth/token/"))
		.user_info_endpoint(url("https://open.tiktokapis.com/v2/user/info/"))
		.build()
		.expect_err("Missing publish endpoint should fail.");

	assert_eq!(err, VendorDescriptorError::MissingEndpoint("publish_init"));
}

#[test]
fn control_character_delimiters_are_rejected() {
	let err = VendorDescriptor::builder()
		.authorize_endpoint(url("https://www.tiktok.com/v2/auth/authorize/"))
		.token_endpoint(url("https://open.tiktokapis.com/v2/oauth/token/"))
		.user_info_endpoint(url("https://open.tiktokapis.com/v2/user/info/"))
		.publish_init_endpoint(url("https://open.tiktokapis.com/v2/post/publish/video/init/"))
		.quirks(VendorQuirks { scope_delimiter: '\n', ..Default::default() })
		.build()
		.expect_err("Control delimiter should fail.");

	assert_eq!(err, VendorDescriptorError::InvalidScopeDelimiter { delimiter: '\n' });
}

#[test]
fn descriptor_round_trips_through_json() {
	let descriptor = VendorDescriptor::tiktok().expect("Production descriptor should build.");
	let json = serde_json::to_string(&descriptor).expect("Descriptor should serialize.");
	let back: VendorDescriptor = serde_json::from_str(&json).expect("Descriptor should deserialize.");

	assert_eq!(back, descriptor);
}
