//! Authorization request and redirect callback.

// self
use crate::{
	_prelude::*,
	context::{ContextSnapshot, ContextUpdate, EndpointName, ServiceContext},
	http::{HttpMethod, SerializationType},
	message::{AuthorizationRequest, AuthorizationResponse, Message},
	obs::ServiceKind,
	processor::{AddClientId, AddNonce, AddOpenIdScope, AddRedirectUri, AddResponseType, AddState},
	service::{EndpointSource, Service, ServiceConfig, ServiceDescriptor, Verified},
	store::{CorrelationStore, SessionData},
};

/// Authorization endpoint service.
///
/// Requests travel as a `GET` query; the callback arrives URL-encoded in the redirect query or
/// fragment. Every request opens a correlation entry under its `state`, and the callback must
/// consume it.
pub type Authorization = Service<AuthorizationRequest, AuthorizationResponse>;
impl Authorization {
	/// Creates the service with the default authorization configuration.
	pub fn new(context: ServiceContext, store: Arc<dyn CorrelationStore>) -> Self {
		Self::with_descriptor(
			ServiceDescriptor {
				kind: ServiceKind::Authorization,
				endpoint: EndpointSource::Named(EndpointName::Authorization),
				config: ServiceConfig::default()
					.with_http_method(HttpMethod::Get)
					.with_serialization(SerializationType::UrlEncoded)
					.with_deserialization(SerializationType::UrlEncoded)
					.with_pre_construct(AddClientId)
					.with_pre_construct(AddRedirectUri)
					.with_pre_construct(AddResponseType)
					.with_pre_construct(AddOpenIdScope)
					.with_pre_construct(AddState)
					.with_pre_construct(AddNonce),
				correlated: true,
				construct: AuthorizationRequest::build,
				post_parse: keep_authorization_response,
			},
			context,
			Some(store),
		)
	}
}

impl Verified<AuthorizationResponse> {
	/// Arguments for the token request that redeems this response's `code`.
	///
	/// The `redirect_uri` is taken from the consumed session so it matches the original request.
	pub fn token_request_args(&self) -> Claims {
		let mut args = Claims::new();

		if let Some(code) = self.message.get_str("code") {
			args.insert("code".into(), Value::String(code.to_owned()));
		}
		if let Some(redirect_uri) = self.session.as_ref().and_then(|s| s.redirect_uri.as_deref()) {
			args.insert("redirect_uri".into(), Value::String(redirect_uri.to_owned()));
		}

		args
	}
}

fn keep_authorization_response(
	response: AuthorizationResponse,
	_: &ContextSnapshot,
	_: Option<&SessionData>,
) -> Result<(AuthorizationResponse, ContextUpdate)> {
	Ok((response, ContextUpdate::default()))
}
