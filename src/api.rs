//! HTTP surface binding the relay flows into request/response cycles.
//!
//! | route | handler |
//! |---|---|
//! | `GET /` | liveness text |
//! | `GET /auth/login` | redirect to the consent screen |
//! | `GET /auth/callback` | code exchange, answered per [`CallbackMode`] |
//! | `GET /api/token-status/{open_id}` | token status JSON |
//! | `POST /api/post-to-tiktok` | publish proxy |
//! | `GET /api/debug/tokens` | presence-only store dump, when enabled |

pub mod handlers;
pub mod response;

pub use response::*;

// std
use std::net::SocketAddr;
// crates.io
use axum::{
	Router,
	routing::{get, post},
};
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
// self
use crate::{_prelude::*, flows::Relay};

/// How the callback reports its result to the browser.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CallbackMode {
	/// Answer with a plain-text summary.
	PlainText,
	/// Redirect to the frontend with `auth=success|error` query parameters.
	Redirect {
		/// Frontend page receiving the result.
		frontend_url: Url,
	},
}

/// Shared state handed to every handler.
#[derive(Clone, Debug)]
pub struct AppState {
	/// Relay performing the vendor calls.
	pub relay: Arc<Relay>,
	/// Callback response mode.
	pub callback_mode: CallbackMode,
}
impl AppState {
	/// Wraps a relay for the router.
	pub fn new(relay: Relay, callback_mode: CallbackMode) -> Self {
		Self { relay: Arc::new(relay), callback_mode }
	}
}

/// Builds the router. The debug dump is only routed when `debug_endpoints` is set.
pub fn router(state: AppState, debug_endpoints: bool) -> Router {
	let mut router = Router::new()
		.route("/", get(handlers::liveness))
		.route("/auth/login", get(handlers::login))
		.route("/auth/callback", get(handlers::callback))
		.route("/api/token-status/:open_id", get(handlers::token_status))
		.route("/api/post-to-tiktok", post(handlers::publish));

	if debug_endpoints {
		router = router.route("/api/debug/tokens", get(handlers::debug_tokens));
	}

	router.layer(TraceLayer::new_for_http()).with_state(state)
}

/// Serves `router` on `addr` until Ctrl-C or, on Unix, `SIGTERM`.
pub async fn serve(addr: SocketAddr, router: Router) -> std::io::Result<()> {
	let listener = TcpListener::bind(addr).await?;

	tracing::info!(addr = %listener.local_addr()?, "Relay listening.");

	axum::serve(listener, router).with_graceful_shutdown(shutdown_signal()).await
}

async fn shutdown_signal() {
	let interrupt = async {
		if let Err(e) = tokio::signal::ctrl_c().await {
			tracing::error!(error = %e, "Unable to listen for Ctrl-C.");

			std::future::pending::<()>().await;
		}
	};
	#[cfg(unix)]
	let terminate = async {
		use tokio::signal::unix::{SignalKind, signal};

		match signal(SignalKind::terminate()) {
			Ok(mut stream) => {
				stream.recv().await;
			},
			Err(e) => {
				tracing::error!(error = %e, "Unable to listen for SIGTERM.");

				std::future::pending::<()>().await;
			},
		}
	};
	#[cfg(not(unix))]
	let terminate = std::future::pending::<()>();

	tokio::select! {
		_ = interrupt => tracing::info!("Received Ctrl-C; shutting down."),
		_ = terminate => tracing::info!("Received SIGTERM; shutting down."),
	}
}
