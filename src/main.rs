//! TikTok relay server binary.

// crates.io
use tiktok_relay::{
	api::{self, AppState},
	config::RelayConfig,
	obs::{self, DEFAULT_LOG_DIRECTIVES},
};

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
	obs::install(DEFAULT_LOG_DIRECTIVES)?;

	let config = RelayConfig::load();

	tracing::debug!(?config, "Configuration loaded.");

	let relay = config.build_relay()?;
	let state = AppState::new(relay, config.callback_mode()?);

	if config.debug_endpoints {
		tracing::warn!("Debug endpoints are enabled; do not expose this instance publicly.");
	}

	api::serve(config.listen_addr()?, api::router(state, config.debug_endpoints)).await?;

	Ok(())
}
