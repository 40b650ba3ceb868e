// self
use crate::obs::{OpOutcome, RelayOp};

/// Records an operation outcome via the global metrics recorder (when enabled).
pub fn record_op_outcome(op: RelayOp, outcome: OpOutcome) {
	#[cfg(feature = "metrics")]
	{
		metrics::counter!(
			"alarm_relay_op_total",
			"op" => op.as_str(),
			"outcome" => outcome.as_str()
		)
		.increment(1);
	}

	#[cfg(not(feature = "metrics"))]
	{
		let _ = (op, outcome);
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn record_op_outcome_noop_without_metrics() {
		record_op_outcome(RelayOp::Forward, OpOutcome::Failure);
	}
}
