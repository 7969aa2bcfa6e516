//! Optional observability helpers for service exchanges.
//!
//! # Feature Flags
//!
//! - Enable `tracing` to emit structured spans named `oidc_rp.service` with the `service` and
//!   `stage` fields, plus a `warn` event whenever a response is rejected.
//! - Enable `metrics` to increment the `oidc_rp_exchange_total` counter for every
//!   attempt/success/failure, labeled by `service`, `stage` and `outcome`.

mod metrics;
mod tracing;

pub use metrics::*;
pub use tracing::*;

// self
use crate::_prelude::*;

/// Services the engine knows how to drive.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ServiceKind {
	/// Authorization request and callback.
	Authorization,
	/// Token endpoint exchange.
	AccessToken,
	/// Dynamic client registration.
	Registration,
	/// Provider metadata discovery.
	ProviderInfoDiscovery,
}
impl ServiceKind {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			ServiceKind::Authorization => "authorization",
			ServiceKind::AccessToken => "access_token",
			ServiceKind::Registration => "registration",
			ServiceKind::ProviderInfoDiscovery => "provider_info_discovery",
		}
	}
}
impl Display for ServiceKind {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Pipeline halves.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Stage {
	/// Outbound request assembly.
	Build,
	/// Inbound response handling.
	Parse,
}
impl Stage {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			Stage::Build => "build",
			Stage::Parse => "parse",
		}
	}
}
impl Display for Stage {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Outcome labels recorded for each attempt.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ExchangeOutcome {
	/// Entry to a pipeline.
	Attempt,
	/// Successful completion.
	Success,
	/// Failure propagated back to the caller.
	Failure,
}
impl ExchangeOutcome {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			ExchangeOutcome::Attempt => "attempt",
			ExchangeOutcome::Success => "success",
			ExchangeOutcome::Failure => "failure",
		}
	}
}
impl Display for ExchangeOutcome {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}
