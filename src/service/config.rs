//! Declarative per-endpoint defaults.

// crates.io
use time::Duration;
// self
use crate::{
	_prelude::*,
	http::{ClientAuthMethod, HttpMethod, SerializationType},
	processor::{ProcessorChain, RequestArgumentProcessor},
};

/// How long a correlation entry waits for its callback by default.
pub const DEFAULT_SESSION_TTL: Duration = Duration::minutes(10);

/// Transport defaults and processor lists for one endpoint.
///
/// Callers can override the transport defaults per call through the `http_method`,
/// `authn_method` and `serialization_type` argument hints.
#[derive(Clone, Debug)]
pub struct ServiceConfig {
	/// Method used when the caller does not pick one.
	pub http_method: HttpMethod,
	/// Client authentication applied to outbound requests.
	pub client_auth_method: ClientAuthMethod,
	/// Body serialization for `POST` requests.
	pub serialization: SerializationType,
	/// Expected response representation.
	pub deserialization: SerializationType,
	/// Endpoint override; takes precedence over the context endpoint table.
	pub endpoint: Option<Url>,
	/// Lifetime of the correlation entry a correlated request leaves behind.
	pub session_ttl: Duration,
	/// Processors run before the request message is constructed.
	pub pre_construct: ProcessorChain,
	/// Processors run over the constructed message claims.
	pub post_construct: ProcessorChain,
}
impl ServiceConfig {
	/// Overrides the default HTTP method.
	pub fn with_http_method(mut self, method: HttpMethod) -> Self {
		self.http_method = method;

		self
	}

	/// Overrides the client authentication method.
	pub fn with_client_auth_method(mut self, method: ClientAuthMethod) -> Self {
		self.client_auth_method = method;

		self
	}

	/// Overrides the request body serialization.
	pub fn with_serialization(mut self, serialization: SerializationType) -> Self {
		self.serialization = serialization;

		self
	}

	/// Overrides the expected response representation.
	pub fn with_deserialization(mut self, deserialization: SerializationType) -> Self {
		self.deserialization = deserialization;

		self
	}

	/// Pins the endpoint URL.
	pub fn with_endpoint(mut self, url: Url) -> Self {
		self.endpoint = Some(url);

		self
	}

	/// Overrides how long correlation entries stay valid.
	pub fn with_session_ttl(mut self, ttl: Duration) -> Self {
		self.session_ttl = ttl;

		self
	}

	/// Appends a pre-construction processor.
	pub fn with_pre_construct(mut self, processor: impl RequestArgumentProcessor + 'static) -> Self {
		self.pre_construct = self.pre_construct.with(processor);

		self
	}

	/// Appends a post-construction processor.
	pub fn with_post_construct(
		mut self,
		processor: impl RequestArgumentProcessor + 'static,
	) -> Self {
		self.post_construct = self.post_construct.with(processor);

		self
	}
}
impl Default for ServiceConfig {
	fn default() -> Self {
		Self {
			http_method: HttpMethod::Get,
			client_auth_method: ClientAuthMethod::None,
			serialization: SerializationType::UrlEncoded,
			deserialization: SerializationType::Json,
			endpoint: None,
			session_ttl: DEFAULT_SESSION_TTL,
			pre_construct: ProcessorChain::new(),
			post_construct: ProcessorChain::new(),
		}
	}
}
