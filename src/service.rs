//! The protocol engine and its built-in endpoint instantiations.
//!
//! One generic [`Service`] drives every endpoint. Endpoint specifics live in a
//! [`ServiceDescriptor`]: where the endpoint URL comes from, the transport defaults and processor
//! lists, whether the exchange is correlated through the store, how the request message is
//! constructed, and what a verified response commits into the [`ServiceContext`].
//!
//! Outbound, [`Service::build_request`] turns caller arguments into [`HttpArguments`]. Inbound,
//! [`Service::parse_response`] decodes, verifies and (only then) commits; the verified message is
//! handed back wrapped in [`Verified`], which nothing outside the engine can construct.

pub mod access_token;
pub mod authorization;
pub mod config;
pub mod discovery;
pub mod registration;

pub use access_token::*;
pub use authorization::*;
pub use config::*;
pub use discovery::*;
pub use registration::*;

// std
use std::ops::Deref;
// self
use crate::{
	_prelude::*,
	context::{ContextSnapshot, ContextUpdate, EndpointName, ServiceContext},
	error::{ArgumentError, ConfigError, CorrelationError, VerificationError},
	http::{self, ClientAuthMethod, HttpArguments, HttpMethod, SerializationType},
	message::{Message, MessageError},
	obs::{self, ExchangeOutcome, ExchangeSpan, ServiceKind, Stage},
	store::{CorrelationStore, SessionData},
};

/// Argument hint selecting the HTTP method for one call.
pub const HTTP_METHOD_HINT: &str = "http_method";
/// Argument hint selecting the client authentication method for one call.
pub const AUTHN_METHOD_HINT: &str = "authn_method";
/// Argument hint selecting the body serialization for one call.
pub const SERIALIZATION_HINT: &str = "serialization_type";

/// Path appended to the issuer to locate provider metadata.
pub const WELL_KNOWN_PATH: &str = ".well-known/openid-configuration";

/// Builds the request message from finalized arguments.
pub type ConstructFn<Req> = fn(Claims) -> Result<Req, MessageError>;
/// Endpoint-specific handling of a verified response.
///
/// Receives the snapshot the response was verified against and the consumed session, if any,
/// and returns the (possibly transformed) response plus the context update to commit.
pub type PostParseFn<Resp> =
	fn(Resp, &ContextSnapshot, Option<&SessionData>) -> Result<(Resp, ContextUpdate)>;

/// Where a service finds its endpoint URL.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EndpointSource {
	/// Entry in the context endpoint table.
	Named(EndpointName),
	/// Well-known location derived from the issuer.
	WellKnown,
}

/// Everything that distinguishes one endpoint from another.
#[derive(Clone, Debug)]
pub struct ServiceDescriptor<Req, Resp> {
	/// Service label for errors, spans and metrics.
	pub kind: ServiceKind,
	/// Endpoint URL source.
	pub endpoint: EndpointSource,
	/// Transport defaults and processor lists.
	pub config: ServiceConfig,
	/// Whether requests open a correlation entry that the response must consume.
	pub correlated: bool,
	/// Request message construction.
	pub construct: ConstructFn<Req>,
	/// Verified response handling.
	pub post_parse: PostParseFn<Resp>,
}

/// A response that passed verification.
#[derive(Clone, Debug)]
pub struct Verified<Resp> {
	message: Resp,
	session: Option<SessionData>,
	state: Option<String>,
}
impl<Resp> Verified<Resp> {
	/// Borrows the verified message.
	pub fn message(&self) -> &Resp {
		&self.message
	}

	/// Session data consumed by this response, for correlated exchanges.
	pub fn session(&self) -> Option<&SessionData> {
		self.session.as_ref()
	}

	/// Correlation key the response was matched against.
	pub fn state(&self) -> Option<&str> {
		self.state.as_deref()
	}

	/// Unwraps the verified message.
	pub fn into_inner(self) -> Resp {
		self.message
	}
}
impl<Resp> Deref for Verified<Resp> {
	type Target = Resp;

	fn deref(&self) -> &Self::Target {
		&self.message
	}
}

/// Generic request/response engine for one endpoint.
#[derive(Clone, Debug)]
pub struct Service<Req, Resp> {
	descriptor: ServiceDescriptor<Req, Resp>,
	context: ServiceContext,
	store: Option<Arc<dyn CorrelationStore>>,
}
impl<Req, Resp> Service<Req, Resp>
where
	Req: Message,
	Resp: Message,
{
	/// Creates a service from an explicit descriptor.
	///
	/// Correlated descriptors need a store; the check is deferred to the first call so services
	/// can be assembled before one is available.
	pub fn with_descriptor(
		descriptor: ServiceDescriptor<Req, Resp>,
		context: ServiceContext,
		store: Option<Arc<dyn CorrelationStore>>,
	) -> Self {
		Self { descriptor, context, store }
	}

	/// Service label.
	pub fn kind(&self) -> ServiceKind {
		self.descriptor.kind
	}

	/// Effective endpoint configuration.
	pub fn config(&self) -> &ServiceConfig {
		&self.descriptor.config
	}

	/// Rewrites the endpoint configuration.
	pub fn configure(mut self, f: impl FnOnce(ServiceConfig) -> ServiceConfig) -> Self {
		self.descriptor.config = f(self.descriptor.config);

		self
	}

	/// Shared service context handle.
	pub fn context(&self) -> &ServiceContext {
		&self.context
	}

	/// Resolves the endpoint URL against `snapshot`.
	pub fn endpoint(&self, snapshot: &ContextSnapshot) -> Result<Url> {
		if let Some(url) = self.descriptor.config.endpoint.as_ref() {
			return Ok(url.clone());
		}

		match self.descriptor.endpoint {
			EndpointSource::Named(name) => snapshot
				.endpoint(name)
				.cloned()
				.ok_or(ConfigError::MissingEndpoint { endpoint: name.as_str() }.into()),
			EndpointSource::WellKnown => {
				let issuer = snapshot
					.issuer
					.as_deref()
					.ok_or(ConfigError::MissingContextValue { field: "issuer" })?;
				let url = format!("{}/{WELL_KNOWN_PATH}", issuer.trim_end_matches('/'));

				Ok(Url::parse(&url).map_err(|source| ConfigError::InvalidUrl { source })?)
			},
		}
	}

	/// Runs the processor chains and constructs the request message without shaping transport.
	pub fn construct_request(&self, mut args: Claims) -> Result<Req> {
		let snapshot = self.context.snapshot();

		TransportHints::take(&mut args, &self.descriptor.config)?;

		self.construct(args, &snapshot)
	}

	/// Builds the outbound request for `args`.
	pub fn build_request(&self, args: Claims) -> Result<HttpArguments> {
		let kind = self.descriptor.kind;
		let _guard = ExchangeSpan::new(kind, Stage::Build).entered();

		obs::record_exchange_outcome(kind, Stage::Build, ExchangeOutcome::Attempt);

		let result = self.build_request_inner(args);

		obs::record_exchange_outcome(kind, Stage::Build, outcome_of(&result));

		result
	}

	/// Parses, verifies and commits a response.
	///
	/// `format` defaults to the configured deserialization type. `state_key` names the
	/// correlation entry to consume; when omitted, the `state` echoed in the response is used.
	pub fn parse_response(
		&self,
		body: &str,
		format: Option<SerializationType>,
		state_key: Option<&str>,
	) -> Result<Verified<Resp>> {
		let kind = self.descriptor.kind;
		let _guard = ExchangeSpan::new(kind, Stage::Parse).entered();

		obs::record_exchange_outcome(kind, Stage::Parse, ExchangeOutcome::Attempt);

		let result = self.parse_response_inner(body, format, state_key);

		if let Err(e) = &result {
			obs::log_rejection(kind, e);
		}

		obs::record_exchange_outcome(kind, Stage::Parse, outcome_of(&result));

		result
	}

	fn build_request_inner(&self, mut args: Claims) -> Result<HttpArguments> {
		let snapshot = self.context.snapshot();
		let url = self.endpoint(&snapshot)?;
		let hints = TransportHints::take(&mut args, &self.descriptor.config)?;
		let store = self.correlation_store()?;
		let now = OffsetDateTime::now_utc();

		if hints.authn_method == ClientAuthMethod::ClientSecretPost && hints.method == HttpMethod::Get {
			return Err(ConfigError::SecretInQuery { service: self.descriptor.kind.as_str() }.into());
		}

		let mut request = self.construct(args, &snapshot)?;
		let basic = match hints.authn_method {
			ClientAuthMethod::None => None,
			ClientAuthMethod::ClientSecretBasic => Some(client_credentials(&snapshot, now)?),
			ClientAuthMethod::ClientSecretPost => {
				let (client_id, client_secret) = client_credentials(&snapshot, now)?;
				let claims = request.claims_mut();

				claims.insert("client_id".into(), Value::String(client_id.to_owned()));
				claims.insert("client_secret".into(), Value::String(client_secret.to_owned()));

				None
			},
		};
		let mut prepared = match hints.method {
			HttpMethod::Get => {
				let query = encode(&request, SerializationType::UrlEncoded)?;

				HttpArguments::get(with_query(url, &query))
			},
			HttpMethod::Post => {
				let content_type = hints.serialization.content_type()?;

				HttpArguments::post(url, encode(&request, hints.serialization)?, content_type)
			},
		};

		if let Some((client_id, client_secret)) = basic {
			prepared = prepared.with_basic_auth(client_id, client_secret)?;
		}
		if let Some(store) = store {
			let state = request
				.claims()
				.get("state")
				.and_then(Value::as_str)
				.ok_or(CorrelationError::MissingStateKey { service: self.descriptor.kind.as_str() })?;

			store.put(
				state,
				SessionData::from_request(request.claims()),
				now + self.descriptor.config.session_ttl,
			)?;

			prepared.state = Some(state.to_owned());
		}

		Ok(prepared)
	}

	fn parse_response_inner(
		&self,
		body: &str,
		format: Option<SerializationType>,
		state_key: Option<&str>,
	) -> Result<Verified<Resp>> {
		let snapshot = self.context.snapshot();
		let store = self.correlation_store()?;
		let format = format.unwrap_or(self.descriptor.config.deserialization);
		let decoded = match format {
			SerializationType::UrlEncoded =>
				http::url_info(body).map_or(Ok(None), |info| Resp::from_urlencoded(&info)),
			SerializationType::Json => Resp::from_json(body),
			other => return Err(Error::unsupported_format(other)),
		};
		let response = match decoded {
			Ok(Some(response)) => response,
			Ok(None) => return Err(self.abandon(store, state_key, Error::MissingResponse)),
			Err(e) =>
				return Err(self.abandon(store, state_key, VerificationError::Decode(e).into())),
		};
		let echoed = response.claims().get("state").and_then(Value::as_str);
		let key = match (state_key, echoed) {
			(Some(expected), Some(received)) if expected != received => {
				let e = CorrelationError::StateMismatch {
					expected: expected.to_owned(),
					received: received.to_owned(),
				};

				return Err(self.abandon(store, state_key, e.into()));
			},
			(Some(key), _) | (None, Some(key)) => Some(key.to_owned()),
			(None, None) => None,
		};

		if let Some(error) = response.error() {
			let e = Error::ErrorResponse {
				error: error.to_owned(),
				description: claim_string(response.claims(), "error_description"),
				uri: claim_string(response.claims(), "error_uri"),
			};

			return Err(self.abandon(store, key.as_deref(), e));
		}

		match response.verify(&snapshot.trust_claims()) {
			Ok(true) => {},
			Ok(false) =>
				return Err(self.abandon(store, key.as_deref(), VerificationError::Rejected.into())),
			Err(e) =>
				return Err(self.abandon(store, key.as_deref(), VerificationError::Faulted(e).into())),
		}

		let session = match store {
			Some(store) => {
				let key = key.as_deref().ok_or(CorrelationError::MissingStateKey {
					service: self.descriptor.kind.as_str(),
				})?;

				Some(
					store
						.take(key)?
						.ok_or_else(|| CorrelationError::UnknownState { key: key.to_owned() })?,
				)
			},
			None => None,
		};
		let (message, update) = (self.descriptor.post_parse)(response, &snapshot, session.as_ref())?;

		if !update.is_empty() {
			obs::log_commit(self.descriptor.kind, &update.fields());

			self.context.commit(update);
		}

		Ok(Verified { message, session, state: key })
	}

	fn construct(&self, mut args: Claims, snapshot: &ContextSnapshot) -> Result<Req> {
		let config = &self.descriptor.config;

		config.pre_construct.run(&mut args, snapshot)?;

		let request = (self.descriptor.construct)(args).map_err(ArgumentError::Construction)?;

		if config.post_construct.is_empty() {
			return Ok(request);
		}

		let mut claims = request.into_claims();

		config.post_construct.run(&mut claims, snapshot)?;

		Ok((self.descriptor.construct)(claims).map_err(ArgumentError::Construction)?)
	}

	fn correlation_store(&self) -> Result<Option<&dyn CorrelationStore>> {
		if !self.descriptor.correlated {
			return Ok(None);
		}

		match self.store.as_deref() {
			Some(store) => Ok(Some(store)),
			None => Err(ConfigError::MissingStore { service: self.descriptor.kind.as_str() }.into()),
		}
	}

	// Terminal failures drop the correlation entry so the same state cannot be replayed.
	fn abandon(&self, store: Option<&dyn CorrelationStore>, key: Option<&str>, error: Error) -> Error {
		if let (Some(store), Some(key)) = (store, key) {
			if let Err(e) = store.remove(key) {
				obs::log_rejection(self.descriptor.kind, &e);
			}
		}

		error
	}
}

#[derive(Clone, Copy, Debug)]
struct TransportHints {
	method: HttpMethod,
	authn_method: ClientAuthMethod,
	serialization: SerializationType,
}
impl TransportHints {
	// Hints are read (falling back to the config) and always stripped from the arguments.
	fn take(args: &mut Claims, config: &ServiceConfig) -> Result<Self> {
		let method = match args.remove(HTTP_METHOD_HINT) {
			Some(value) => hint_str(HTTP_METHOD_HINT, &value)?
				.parse::<HttpMethod>()
				.map_err(|value| ArgumentError::InvalidTransportHint { key: HTTP_METHOD_HINT, value })?,
			None => config.http_method,
		};
		let authn_method = match args.remove(AUTHN_METHOD_HINT) {
			Some(value) => hint_str(AUTHN_METHOD_HINT, &value)?
				.parse::<ClientAuthMethod>()
				.map_err(|value| ArgumentError::InvalidTransportHint { key: AUTHN_METHOD_HINT, value })?,
			None => config.client_auth_method,
		};
		let serialization = match args.remove(SERIALIZATION_HINT) {
			Some(value) => hint_str(SERIALIZATION_HINT, &value)?.parse::<SerializationType>()?,
			None => config.serialization,
		};

		Ok(Self { method, authn_method, serialization })
	}
}

fn hint_str<'a>(key: &'static str, value: &'a Value) -> Result<&'a str, ArgumentError> {
	value
		.as_str()
		.ok_or_else(|| ArgumentError::InvalidTransportHint { key, value: value.to_string() })
}

fn client_credentials(snapshot: &ContextSnapshot, now: OffsetDateTime) -> Result<(&str, &str)> {
	let client_id =
		snapshot.client_id.as_deref().ok_or(ConfigError::MissingContextValue { field: "client_id" })?;
	let client_secret = snapshot
		.client_secret
		.as_deref()
		.ok_or(ConfigError::MissingContextValue { field: "client_secret" })?;

	if snapshot.client_secret_expired_at(now) {
		return Err(ConfigError::ExpiredClientSecret.into());
	}

	Ok((client_id, client_secret))
}

fn encode<M>(message: &M, serialization: SerializationType) -> Result<String>
where
	M: Message,
{
	let encoded = match serialization {
		SerializationType::UrlEncoded => message.to_urlencoded(),
		SerializationType::Json => message.to_json(),
		other => return Err(Error::unsupported_format(other)),
	};

	Ok(encoded.map_err(ArgumentError::Construction)?)
}

fn with_query(mut url: Url, query: &str) -> Url {
	if query.is_empty() {
		return url;
	}

	let merged = match url.query() {
		Some(existing) if !existing.is_empty() => format!("{existing}&{query}"),
		_ => query.to_owned(),
	};

	url.set_query(Some(&merged));

	url
}

fn claim_string(claims: &Claims, name: &str) -> Option<String> {
	claims.get(name).and_then(Value::as_str).map(str::to_owned)
}

fn outcome_of<T>(result: &Result<T>) -> ExchangeOutcome {
	if result.is_ok() { ExchangeOutcome::Success } else { ExchangeOutcome::Failure }
}

#[cfg(test)]
mod tests {
	// crates.io
	use serde_json::json;
	// self
	use super::*;
	use crate::{_preludet::*, message::AuthorizationResponse};

	#[test]
	fn query_parameters_extend_existing_queries() {
		let url = with_query(url("https://op.example.com/authorize?tenant=a"), "scope=openid");

		assert_eq!(url.as_str(), "https://op.example.com/authorize?tenant=a&scope=openid");
		assert_eq!(with_query(url.clone(), "").as_str(), url.as_str());
	}

	#[test]
	fn transport_hints_fall_back_to_config_and_are_stripped() {
		let config = ServiceConfig::default();
		let mut args = Claims::from_iter([
			(HTTP_METHOD_HINT.into(), json!("post")),
			(SERIALIZATION_HINT.into(), json!("json")),
			("scope".into(), json!("openid")),
		]);
		let hints = TransportHints::take(&mut args, &config).expect("Hints should parse.");

		assert_eq!(hints.method, HttpMethod::Post);
		assert_eq!(hints.serialization, SerializationType::Json);
		assert_eq!(hints.authn_method, ClientAuthMethod::None);
		assert_eq!(args.len(), 1);

		let mut args = Claims::from_iter([(HTTP_METHOD_HINT.into(), json!("PUT"))]);
		let err = TransportHints::take(&mut args, &config).expect_err("PUT must be rejected.");

		assert!(matches!(
			err,
			Error::ArgumentProcessing(ArgumentError::InvalidTransportHint { key: HTTP_METHOD_HINT, .. })
		));
	}

	#[test]
	fn well_known_endpoint_derives_from_issuer() {
		let service = ProviderInfoDiscovery::new(test_context());
		let snapshot = service.context().snapshot();

		assert_eq!(
			service.endpoint(&snapshot).expect("Discovery URL should derive.").as_str(),
			"https://op.example.com/.well-known/openid-configuration"
		);
	}

	#[test]
	fn correlated_services_require_a_store() {
		let descriptor = Authorization::new(test_context(), test_store()).descriptor.clone();
		let service = Service::with_descriptor(descriptor, test_context(), None);
		let err = service.build_request(Claims::new()).expect_err("A missing store must be reported.");

		assert!(matches!(err, Error::Config(ConfigError::MissingStore { service: "authorization" })));
	}

	#[test]
	fn verified_responses_deref_to_the_message() {
		let verified = Verified {
			message: AuthorizationResponse::from_claims(Claims::from_iter([(
				"code".into(),
				json!("abc"),
			)])),
			session: None,
			state: Some("s".into()),
		};

		assert_eq!(verified.get_str("code"), Some("abc"));
		assert_eq!(verified.state(), Some("s"));
		assert!(verified.session().is_none());
	}
}
