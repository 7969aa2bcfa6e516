// self
use crate::{
	_prelude::*,
	obs::{ServiceKind, Stage},
};

/// A span builder used by service pipelines.
#[derive(Clone, Debug)]
pub struct ExchangeSpan {
	#[cfg(feature = "tracing")]
	span: tracing::Span,
}
impl ExchangeSpan {
	/// Creates a new span tagged with the provided service kind + stage.
	pub fn new(kind: ServiceKind, stage: Stage) -> Self {
		#[cfg(feature = "tracing")]
		{
			let span =
				tracing::info_span!("oidc_rp.service", service = kind.as_str(), stage = stage.as_str());

			Self { span }
		}
		#[cfg(not(feature = "tracing"))]
		{
			let _ = (kind, stage);

			Self {}
		}
	}

	/// Enters the span for the rest of the pipeline.
	pub fn entered(self) -> ExchangeSpanGuard {
		#[cfg(feature = "tracing")]
		{
			ExchangeSpanGuard { guard: self.span.entered() }
		}
		#[cfg(not(feature = "tracing"))]
		{
			let _ = self;

			ExchangeSpanGuard {}
		}
	}
}

/// RAII guard returned by [`ExchangeSpan::entered`].
pub struct ExchangeSpanGuard {
	#[cfg(feature = "tracing")]
	#[allow(dead_code)]
	guard: tracing::span::EnteredSpan,
}
impl Debug for ExchangeSpanGuard {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str("ExchangeSpanGuard(..)")
	}
}

/// Emits a `warn` event describing why a response was discarded.
pub fn log_rejection(kind: ServiceKind, reason: &dyn Display) {
	#[cfg(feature = "tracing")]
	{
		tracing::warn!(service = kind.as_str(), %reason, "response rejected");
	}
	#[cfg(not(feature = "tracing"))]
	{
		let _ = (kind, reason);
	}
}

/// Emits a `debug` event when a verified response changes the service context.
pub fn log_commit(kind: ServiceKind, fields: &[&str]) {
	#[cfg(feature = "tracing")]
	{
		tracing::debug!(service = kind.as_str(), ?fields, "service context updated");
	}
	#[cfg(not(feature = "tracing"))]
	{
		let _ = (kind, fields);
	}
}
