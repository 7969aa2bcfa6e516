//! Dynamic client registration.

// self
use crate::{
	_prelude::*,
	context::{
		BehaviorChange, CREDENTIAL_CLAIMS, ClientCredentials, ContextSnapshot, ContextUpdate,
		EndpointName, ServiceContext,
	},
	error::VerificationError,
	http::{HttpMethod, SerializationType},
	message::{Message, MessageError, RegistrationRequest, RegistrationResponse},
	obs::ServiceKind,
	processor::{
		AddClientBehaviourPreference, AddJwksUriOrJwks, AddOidcResponseTypes,
		AddPostLogoutRedirectUris, AddRedirectUris, AddRequestUri,
	},
	service::{EndpointSource, Service, ServiceConfig, ServiceDescriptor},
	store::SessionData,
};

/// Authentication method recorded when the provider does not name one.
pub const DEFAULT_TOKEN_ENDPOINT_AUTH_METHOD: &str = "client_secret_basic";

/// Registration endpoint service.
///
/// A verified response replaces the client credentials and the stored registration record, and
/// overlays the registered metadata onto the negotiated behavior, in a single commit.
pub type Registration = Service<RegistrationRequest, RegistrationResponse>;
impl Registration {
	/// Creates the service with the default registration configuration.
	pub fn new(context: ServiceContext) -> Self {
		Self::with_descriptor(
			ServiceDescriptor {
				kind: ServiceKind::Registration,
				endpoint: EndpointSource::Named(EndpointName::Registration),
				config: ServiceConfig::default()
					.with_http_method(HttpMethod::Post)
					.with_serialization(SerializationType::Json)
					.with_deserialization(SerializationType::Json)
					.with_pre_construct(AddClientBehaviourPreference)
					.with_pre_construct(AddRedirectUris)
					.with_pre_construct(AddRequestUri::default())
					.with_pre_construct(AddPostLogoutRedirectUris)
					.with_pre_construct(AddJwksUriOrJwks)
					.with_post_construct(AddOidcResponseTypes),
				correlated: false,
				construct: RegistrationRequest::build,
				post_parse: commit_registration,
			},
			context,
			None,
		)
	}
}

fn commit_registration(
	mut response: RegistrationResponse,
	_: &ContextSnapshot,
	_: Option<&SessionData>,
) -> Result<(RegistrationResponse, ContextUpdate)> {
	response
		.claims_mut()
		.entry("token_endpoint_auth_method")
		.or_insert_with(|| Value::String(DEFAULT_TOKEN_ENDPOINT_AUTH_METHOD.into()));

	let claim = |name: &str| response.get_str(name).map(str::to_owned);
	let client_id = claim("client_id")
		.ok_or(VerificationError::Faulted(MessageError::MissingClaim { name: "client_id" }))?;
	let client = ClientCredentials {
		client_id,
		client_secret: claim("client_secret"),
		client_secret_expires_at: secret_expiry(response.claims())?,
		registration_access_token: claim("registration_access_token"),
	};
	let behavior = response
		.claims()
		.iter()
		.filter(|(name, _)| !CREDENTIAL_CLAIMS.contains(&name.as_str()))
		.map(|(name, value)| (name.clone(), value.clone()))
		.collect::<Claims>();

	let update = ContextUpdate {
		client: Some(client),
		registration_response: Some(response.claims().clone()),
		behavior: Some(BehaviorChange::Overlay(behavior)),
		..Default::default()
	};

	Ok((response, update))
}

// `0` means the secret never expires (RFC 7591 §3.2.1).
fn secret_expiry(claims: &Claims) -> Result<Option<OffsetDateTime>> {
	let invalid = || {
		VerificationError::Faulted(MessageError::InvalidClaim {
			name: "client_secret_expires_at".into(),
			expected: "a unix timestamp",
		})
	};

	match claims.get("client_secret_expires_at") {
		None => Ok(None),
		Some(value) => match value.as_i64().ok_or_else(invalid)? {
			0 => Ok(None),
			seconds => Ok(Some(OffsetDateTime::from_unix_timestamp(seconds).map_err(|_| invalid())?)),
		},
	}
}
