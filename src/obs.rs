//! Observability helpers for relay flows.
//!
//! Every flow runs inside a `tiktok_relay.flow` span carrying `flow` and `stage` fields.
//! Enable the `metrics` feature to increment the `tiktok_relay_flow_total` counter for every
//! attempt/success/failure, labeled by `flow` + `outcome`.

mod metrics;
mod tracing;

pub use metrics::*;
pub use tracing::*;

// crates.io
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};
// self
use crate::_prelude::*;

/// Filter used when `RUST_LOG` is unset.
pub const DEFAULT_LOG_DIRECTIVES: &str = "tiktok_relay=info,tower_http=info";

/// Relay flows observed by spans and metrics.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FlowKind {
	/// Building the consent-screen redirect.
	Authorize,
	/// Exchanging an authorization code.
	Exchange,
	/// Fetching the basic profile.
	Profile,
	/// Initiating a publish job.
	Publish,
}
impl FlowKind {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			FlowKind::Authorize => "authorize",
			FlowKind::Exchange => "exchange",
			FlowKind::Profile => "profile",
			FlowKind::Publish => "publish",
		}
	}
}
impl Display for FlowKind {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Outcome labels recorded for each attempt.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FlowOutcome {
	/// Entry to a relay flow.
	Attempt,
	/// Successful completion.
	Success,
	/// Failure propagated back to the caller.
	Failure,
}
impl FlowOutcome {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			FlowOutcome::Attempt => "attempt",
			FlowOutcome::Success => "success",
			FlowOutcome::Failure => "failure",
		}
	}
}
impl Display for FlowOutcome {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Installs the error report hooks and the global `tracing` subscriber.
///
/// `RUST_LOG` takes precedence over `default_directives`.
pub fn install(default_directives: &str) -> color_eyre::Result<()> {
	color_eyre::install()?;

	let filter = EnvFilter::try_from_default_env()
		.or_else(|_| EnvFilter::try_new(default_directives))?;

	tracing_subscriber::registry().with(filter).with(tracing_subscriber::fmt::layer()).try_init()?;

	Ok(())
}
