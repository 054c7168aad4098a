// crates.io
use axum::{
	Router,
	body::{self, Body},
	http::{Request, StatusCode, header},
};
use httpmock::prelude::*;
use tower::ServiceExt;
// self
use tiktok_relay::{
	_preludet::*,
	api::{self, AppState, CallbackMode},
	auth::{ScopeSet, SubjectId, TokenRecord},
	flows::Relay,
	store::{MemoryStore, TokenStore},
};

const TOKEN_PATH: &str = "/v2/oauth/token/";

fn app(relay: Relay, mode: CallbackMode, debug: bool) -> Router {
	api::router(AppState::new(relay, mode), debug)
}

async fn seed(store: &MemoryStore, scope: &str) {
	let record = TokenRecord::builder(
		SubjectId::new("U1").expect("Subject fixture should be valid."),
		ScopeSet::parse(scope),
	)
	.access_token("access-secret")
	.refresh_token("refresh-secret")
	.expires_in(Duration::hours(1))
	.build()
	.expect("Record fixture should build.");

	store.put(record).await.expect("Seeding the store should succeed.");
}

async fn send(router: Router, request: Request<Body>) -> (StatusCode, String) {
	let response = router.oneshot(request).await.expect("Router should answer.");
	let status = response.status();
	let bytes =
		body::to_bytes(response.into_body(), usize::MAX).await.expect("Body should be readable.");

	(status, String::from_utf8(bytes.to_vec()).expect("Body should be UTF-8."))
}

fn get(uri: &str) -> Request<Body> {
	Request::get(uri).body(Body::empty()).expect("Request fixture should build.")
}

fn post_json(uri: &str, body: &str) -> Request<Body> {
	Request::post(uri)
		.header(header::CONTENT_TYPE, "application/json")
		.body(Body::from(body.to_owned()))
		.expect("Request fixture should build.")
}

fn json(body: &str) -> serde_json::Value {
	serde_json::from_str(body).expect("Body should be JSON.")
}

#[tokio::test]
async fn liveness_answers_text() {
	let (relay, _) = build_test_relay(test_descriptor("http://127.0.0.1:9/"));
	let (status, body) = send(app(relay, CallbackMode::PlainText, false), get("/")).await;

	assert_eq!(status, StatusCode::OK);
	assert!(body.contains("running"));
}

#[tokio::test]
async fn login_redirects_to_consent_screen() {
	let (relay, _) = build_test_relay(test_descriptor("http://127.0.0.1:9/"));
	let response = app(relay.clone(), CallbackMode::PlainText, false)
		.oneshot(get("/auth/login"))
		.await
		.expect("Router should answer.");

	assert_eq!(response.status(), StatusCode::SEE_OTHER);

	let location = response
		.headers()
		.get(header::LOCATION)
		.and_then(|value| value.to_str().ok())
		.expect("Redirect should carry a location.");
	let location = Url::parse(location).expect("Location should be a URL.");
	let query = location.query_pairs().into_owned().collect::<HashMap<_, _>>();

	assert_eq!(location.path(), "/v2/auth/authorize/");
	assert_eq!(query.get("client_key").map(String::as_str), Some(TEST_CLIENT_KEY));
	assert_eq!(query.get("scope").map(String::as_str), Some("user.info.basic,video.publish"));
	assert_eq!(query.get("redirect_uri").map(String::as_str), Some(TEST_REDIRECT_URI));
	assert!(query.contains_key("state"));
	assert_eq!(relay.sessions.len(), 1);
}

#[tokio::test]
async fn token_status_reports_known_and_unknown_subjects() {
	let (relay, store) = build_test_relay(test_descriptor("http://127.0.0.1:9/"));

	seed(&store, "video.publish").await;

	let router = app(relay, CallbackMode::PlainText, false);
	let (status, body) = send(router.clone(), get("/api/token-status/U1")).await;
	let body = json(&body);

	assert_eq!(status, StatusCode::OK);
	assert_eq!(body["success"], true);
	assert_eq!(body["authenticated"], true);
	assert_eq!(body["scope"], serde_json::json!(["video.publish"]));
	assert!(body["expires_in"].as_i64().is_some_and(|secs| secs > 3_500));
	assert!(body["expires_at"].is_string());

	let (status, body) = send(router, get("/api/token-status/U404")).await;
	let body = json(&body);

	assert_eq!(status, StatusCode::NOT_FOUND);
	assert_eq!(body["success"], false);
	assert_eq!(body["authenticated"], false);
	assert!(body["message"].is_string());
}

#[tokio::test]
async fn publish_errors_map_to_statuses() {
	let server = MockServer::start_async().await;
	let (relay, store) = build_test_relay(test_descriptor(&server.base_url()));

	seed(&store, "user.info.basic").await;

	let router = app(relay, CallbackMode::PlainText, false);
	let cases = [
		("{not json", StatusCode::BAD_REQUEST),
		("{\"video_url\":\"http://x/v.mp4\"}", StatusCode::BAD_REQUEST),
		("{\"open_id\":\"U404\",\"video_url\":\"http://x/v.mp4\"}", StatusCode::UNAUTHORIZED),
		("{\"open_id\":\"U1\",\"video_url\":\"http://x/v.mp4\"}", StatusCode::FORBIDDEN),
	];

	for (payload, expected) in cases {
		let (status, body) = send(router.clone(), post_json("/api/post-to-tiktok", payload)).await;
		let body = json(&body);

		assert_eq!(status, expected, "Unexpected status for {payload}.");
		assert_eq!(body["success"], false);
		assert!(body["error"].is_object());
	}
}

#[tokio::test]
async fn publish_mirrors_vendor_status() {
	let server = MockServer::start_async().await;
	let (relay, store) = build_test_relay(test_descriptor(&server.base_url()));

	seed(&store, "video.publish").await;
	server
		.mock_async(|when, then| {
			when.method(POST).path("/v2/post/publish/video/init/");
			then.status(429).header("content-type", "application/json").body(
				"{\"error\":{\"code\":\"rate_limit_exceeded\"}}",
			);
		})
		.await;

	let (status, body) = send(
		app(relay, CallbackMode::PlainText, false),
		post_json("/api/post-to-tiktok", "{\"open_id\":\"U1\",\"video_url\":\"http://x/v.mp4\"}"),
	)
	.await;
	let body = json(&body);

	assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
	assert_eq!(body["success"], false);
	assert_eq!(body["error"]["error"]["code"], "rate_limit_exceeded");
}

#[tokio::test]
async fn plain_text_callback_never_echoes_tokens() {
	let server = MockServer::start_async().await;
	let (relay, _) = build_test_relay(test_descriptor(&server.base_url()));

	server
		.mock_async(|when, then| {
			when.method(POST).path(TOKEN_PATH);
			then.status(200).header("content-type", "application/json").body(
				"{\"access_token\":\"T1-secret\",\"refresh_token\":\"R1-secret\",\"open_id\":\"U1\",\"expires_in\":3600,\"scope\":\"video.publish\"}",
			);
		})
		.await;

	let (status, body) =
		send(app(relay, CallbackMode::PlainText, false), get("/auth/callback?code=abc123")).await;

	assert_eq!(status, StatusCode::OK);
	assert!(body.contains("U1"));
	assert!(body.contains("video.publish"));
	assert!(!body.contains("T1-secret") && !body.contains("R1-secret"));
}

#[tokio::test]
async fn plain_text_callback_reports_missing_code() {
	let (relay, _) = build_test_relay(test_descriptor("http://127.0.0.1:9/"));
	let (status, body) =
		send(app(relay, CallbackMode::PlainText, false), get("/auth/callback")).await;

	assert_eq!(status, StatusCode::BAD_REQUEST);
	assert!(body.starts_with("Authorization failed"));
}

#[tokio::test]
async fn redirect_callback_carries_the_outcome() {
	let server = MockServer::start_async().await;
	let (relay, _) = build_test_relay(test_descriptor(&server.base_url()));
	let mode = CallbackMode::Redirect {
		frontend_url: Url::parse("https://app.example.com/done").expect("Frontend URL should parse."),
	};

	server
		.mock_async(|when, then| {
			when.method(POST).path(TOKEN_PATH);
			then.status(200).header("content-type", "application/json").body(
				"{\"access_token\":\"T1\",\"open_id\":\"U1\",\"expires_in\":3600,\"scope\":\"video.publish\"}",
			);
		})
		.await;

	let router = app(relay, mode, false);
	let location = |response: &axum::response::Response| {
		let raw = response
			.headers()
			.get(header::LOCATION)
			.and_then(|value| value.to_str().ok())
			.expect("Redirect should carry a location.");

		Url::parse(raw).expect("Location should be a URL.")
	};
	let success = router
		.clone()
		.oneshot(get("/auth/callback?code=abc123"))
		.await
		.expect("Router should answer.");
	let target = location(&success);
	let query = target.query_pairs().into_owned().collect::<HashMap<_, _>>();

	assert_eq!(target.host_str(), Some("app.example.com"));
	assert_eq!(query.get("auth").map(String::as_str), Some("success"));
	assert_eq!(query.get("open_id").map(String::as_str), Some("U1"));

	let denied = router
		.oneshot(get("/auth/callback?error=access_denied&error_description=User%20cancelled"))
		.await
		.expect("Router should answer.");
	let query = location(&denied).query_pairs().into_owned().collect::<HashMap<_, _>>();

	assert_eq!(query.get("auth").map(String::as_str), Some("error"));
	assert!(query.get("message").is_some_and(|m| m.contains("User cancelled")));
}

#[tokio::test]
async fn debug_dump_is_opt_in_and_redacted() {
	let (relay, store) = build_test_relay(test_descriptor("http://127.0.0.1:9/"));

	seed(&store, "video.publish").await;

	let (status, _) =
		send(app(relay.clone(), CallbackMode::PlainText, false), get("/api/debug/tokens")).await;

	assert_eq!(status, StatusCode::NOT_FOUND);

	let (status, body) =
		send(app(relay, CallbackMode::PlainText, true), get("/api/debug/tokens")).await;

	assert_eq!(status, StatusCode::OK);
	assert!(!body.contains("access-secret") && !body.contains("refresh-secret"));

	let body = json(&body);

	assert_eq!(body["count"], 1);
	assert_eq!(body["tokens"][0]["open_id"], "U1");
	assert_eq!(body["tokens"][0]["has_access_token"], true);
	assert_eq!(body["tokens"][0]["has_refresh_token"], true);
}
