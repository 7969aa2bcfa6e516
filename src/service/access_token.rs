//! Token endpoint exchange.

// self
use crate::{
	_prelude::*,
	context::{ContextSnapshot, ContextUpdate, EndpointName, ServiceContext},
	http::{ClientAuthMethod, HttpMethod, SerializationType},
	message::{AccessTokenRequest, AccessTokenResponse, Message},
	obs::ServiceKind,
	processor::AddGrantType,
	service::{EndpointSource, Service, ServiceConfig, ServiceDescriptor},
	store::SessionData,
};

/// Token endpoint service.
///
/// Posts a URL-encoded body authenticated with `client_secret_basic` and expects JSON back.
pub type AccessToken = Service<AccessTokenRequest, AccessTokenResponse>;
impl AccessToken {
	/// Creates the service with the default token configuration.
	pub fn new(context: ServiceContext) -> Self {
		Self::with_descriptor(
			ServiceDescriptor {
				kind: ServiceKind::AccessToken,
				endpoint: EndpointSource::Named(EndpointName::Token),
				config: ServiceConfig::default()
					.with_http_method(HttpMethod::Post)
					.with_client_auth_method(ClientAuthMethod::ClientSecretBasic)
					.with_serialization(SerializationType::UrlEncoded)
					.with_deserialization(SerializationType::Json)
					.with_pre_construct(AddGrantType),
				correlated: false,
				construct: AccessTokenRequest::build,
				post_parse: keep_token_response,
			},
			context,
			None,
		)
	}
}

fn keep_token_response(
	response: AccessTokenResponse,
	_: &ContextSnapshot,
	_: Option<&SessionData>,
) -> Result<(AccessTokenResponse, ContextUpdate)> {
	Ok((response, ContextUpdate::default()))
}
