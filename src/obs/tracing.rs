// self
use crate::{_prelude::*, obs::Operation};

/// Future returned by [`OpSpan::instrument`]; the bare future when tracing is compiled out.
#[cfg(feature = "tracing")]
pub type InstrumentedOp<F> = tracing::instrument::Instrumented<F>;
/// Future returned by [`OpSpan::instrument`]; the bare future when tracing is compiled out.
#[cfg(not(feature = "tracing"))]
pub type InstrumentedOp<F> = F;

/// `clob_transport.op` span tagged with the operation and the stage or scheme label.
///
/// Async paths (sending, signing, paging) attach it through [`OpSpan::instrument`];
/// synchronous request validation enters it through [`OpSpan::entered`].
#[derive(Clone, Debug)]
pub struct OpSpan {
	#[cfg(feature = "tracing")]
	span: tracing::Span,
}
impl OpSpan {
	/// Opens a span for `op`; `label` is a stage name or an [`AuthScheme`](crate::auth::AuthScheme) label.
	pub fn new(op: Operation, label: &'static str) -> Self {
		#[cfg(feature = "tracing")]
		{
			let span = tracing::info_span!("clob_transport.op", op = op.as_str(), label);

			Self { span }
		}
		#[cfg(not(feature = "tracing"))]
		{
			let _ = (op, label);

			Self {}
		}
	}

	/// Enters the span until the returned guard drops. Only for code that never awaits.
	pub fn entered(self) -> OpSpanGuard {
		#[cfg(feature = "tracing")]
		{
			OpSpanGuard { _entered: self.span.entered() }
		}
		#[cfg(not(feature = "tracing"))]
		{
			let _ = self;

			OpSpanGuard {}
		}
	}

	/// Runs `fut` inside the span on every poll.
	pub fn instrument<Fut>(&self, fut: Fut) -> InstrumentedOp<Fut>
	where
		Fut: Future,
	{
		#[cfg(feature = "tracing")]
		{
			use tracing::Instrument;

			fut.instrument(self.span.clone())
		}
		#[cfg(not(feature = "tracing"))]
		{
			fut
		}
	}
}

/// Keeps an [`OpSpan`] entered for a synchronous validation pass.
#[must_use = "The span exits as soon as the guard is dropped."]
pub struct OpSpanGuard {
	#[cfg(feature = "tracing")]
	_entered: tracing::span::EnteredSpan,
}
impl Debug for OpSpanGuard {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str("OpSpanGuard(..)")
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn validation_span_guard_is_inert_without_a_subscriber() {
		let guard = OpSpan::new(Operation::Validate, "hmac").entered();

		assert_eq!(format!("{guard:?}"), "OpSpanGuard(..)");
	}

	#[tokio::test]
	async fn instrumented_page_fetch_yields_the_inner_output() {
		let span = OpSpan::new(Operation::Paginate, "fetch_all");
		let page = span.instrument(async { vec![1_u8, 2, 3] }).await;

		assert_eq!(page, [1, 2, 3]);
	}
}
