// self
use crate::obs::{FlowKind, FlowOutcome};

/// Counter incremented once per flow attempt, success, and failure.
pub const FLOW_COUNTER: &str = "tiktok_relay_flow_total";

/// Label pairs attached to [`FLOW_COUNTER`].
pub fn flow_labels(kind: FlowKind, outcome: FlowOutcome) -> [(&'static str, &'static str); 2] {
	[("flow", kind.as_str()), ("outcome", outcome.as_str())]
}

/// Counts a flow outcome on the global recorder; a no-op without the `metrics` feature.
pub fn record_flow_outcome(kind: FlowKind, outcome: FlowOutcome) {
	#[cfg(feature = "metrics")]
	metrics::counter!(FLOW_COUNTER, &flow_labels(kind, outcome)[..]).increment(1);

	#[cfg(not(feature = "metrics"))]
	let _ = flow_labels(kind, outcome);
}
