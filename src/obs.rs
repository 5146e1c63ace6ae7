//! Optional observability helpers for transport operations.
//!
//! # Feature Flags
//!
//! - Enable `tracing` to emit structured spans named `clob_transport.op` with the `op`
//!   (operation) and `stage` (call site) fields, plus warn/debug events for throttling,
//!   retries, and authentication rejections.
//! - Enable `metrics` to increment the `clob_transport_op_total` counter for every
//!   attempt/success/failure, labeled by `op` + `outcome`, and to record durations into the
//!   `clob_transport_op_seconds` histogram.
//!
//! Without either feature every helper compiles down to a no-op.

mod metrics;
mod timer;
mod tracing;

pub use metrics::*;
pub use timer::*;
pub use tracing::*;

// self
use crate::_prelude::*;

/// Transport operations observed by the crate.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Operation {
	/// Waiting for a rate-limit slot.
	Acquire,
	/// Delegating a request to the inner transport.
	Send,
	/// Replaying a request after a retryable failure.
	Retry,
	/// Attaching authentication headers.
	Sign,
	/// Validating an inbound or re-validated request.
	Validate,
	/// Fetching one page of a paginated collection.
	Paginate,
}
impl Operation {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			Operation::Acquire => "acquire",
			Operation::Send => "send",
			Operation::Retry => "retry",
			Operation::Sign => "sign",
			Operation::Validate => "validate",
			Operation::Paginate => "paginate",
		}
	}
}
impl Display for Operation {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Outcome labels recorded for each attempt.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Outcome {
	/// Entry to an operation.
	Attempt,
	/// Successful completion.
	Success,
	/// Failure propagated back to the caller.
	Failure,
}
impl Outcome {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			Outcome::Attempt => "attempt",
			Outcome::Success => "success",
			Outcome::Failure => "failure",
		}
	}
}
impl Display for Outcome {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}
