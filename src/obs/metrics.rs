// self
use crate::obs::{Operation, Outcome};

/// Records an operation outcome via the global metrics recorder (when enabled).
pub fn record_outcome(op: Operation, outcome: Outcome) {
	#[cfg(feature = "metrics")]
	{
		metrics::counter!(
			"clob_transport_op_total",
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

/// Records how long an operation took via the global metrics recorder (when enabled).
pub fn record_duration(op: Operation, outcome: Outcome, seconds: f64) {
	#[cfg(feature = "metrics")]
	{
		metrics::histogram!(
			"clob_transport_op_seconds",
			"op" => op.as_str(),
			"outcome" => outcome.as_str()
		)
		.record(seconds);
	}

	#[cfg(not(feature = "metrics"))]
	{
		let _ = (op, outcome, seconds);
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn recorders_noop_without_metrics() {
		record_outcome(Operation::Acquire, Outcome::Failure);
		record_duration(Operation::Paginate, Outcome::Success, 0.25);
	}
}
