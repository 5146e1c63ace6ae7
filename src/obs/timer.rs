//! Scoped duration recording.

// std
use std::time::Instant;
// self
use crate::obs::{self, Operation, Outcome};

/// Records the duration of an operation when dropped, on every exit path.
///
/// The timer counts an [`Outcome::Attempt`] on creation. Unless [`OpTimer::succeed`] is
/// called before the guard goes out of scope, the operation is recorded as a failure,
/// so early returns through `?` are accounted for without extra bookkeeping.
#[derive(Debug)]
pub struct OpTimer {
	op: Operation,
	stage: &'static str,
	started: Instant,
	succeeded: bool,
}
impl OpTimer {
	/// Starts timing `op` at the given call site.
	pub fn start(op: Operation, stage: &'static str) -> Self {
		obs::record_outcome(op, Outcome::Attempt);

		Self { op, stage, started: Instant::now(), succeeded: false }
	}

	/// Marks the operation as successful.
	pub fn succeed(&mut self) {
		self.succeeded = true;
	}

	/// Returns the operation being timed.
	pub fn operation(&self) -> Operation {
		self.op
	}

	/// Outcome the guard will record if dropped now.
	pub fn outcome(&self) -> Outcome {
		if self.succeeded { Outcome::Success } else { Outcome::Failure }
	}
}
impl Drop for OpTimer {
	fn drop(&mut self) {
		let outcome = self.outcome();
		let elapsed = self.started.elapsed();

		obs::record_outcome(self.op, outcome);
		obs::record_duration(self.op, outcome, elapsed.as_secs_f64());

		#[cfg(feature = "tracing")]
		tracing::debug!(
			op = self.op.as_str(),
			stage = self.stage,
			outcome = outcome.as_str(),
			elapsed_ms = elapsed.as_millis() as u64,
			"Operation finished."
		);
		#[cfg(not(feature = "tracing"))]
		let _ = self.stage;
	}
}
