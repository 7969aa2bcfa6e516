//! Provider configuration discovery.

// self
use crate::{
	_prelude::*,
	context::{self, BehaviorChange, ContextSnapshot, ContextUpdate, EndpointName, ServiceContext},
	error::VerificationError,
	http::{HttpMethod, SerializationType},
	message::{
		Message, MessageError, ProviderConfigurationRequest, ProviderConfigurationResponse,
	},
	obs::ServiceKind,
	service::{EndpointSource, Service, ServiceConfig, ServiceDescriptor},
	store::SessionData,
};

/// Discovery service for `{issuer}/.well-known/openid-configuration`.
///
/// A verified document must name exactly the configured issuer, which is kept as configured. Its
/// endpoints, the document itself and the behavior renegotiated against it are committed
/// together.
pub type ProviderInfoDiscovery = Service<ProviderConfigurationRequest, ProviderConfigurationResponse>;
impl ProviderInfoDiscovery {
	/// Creates the service with the default discovery configuration.
	pub fn new(context: ServiceContext) -> Self {
		Self::with_descriptor(
			ServiceDescriptor {
				kind: ServiceKind::ProviderInfoDiscovery,
				endpoint: EndpointSource::WellKnown,
				config: ServiceConfig::default()
					.with_http_method(HttpMethod::Get)
					.with_deserialization(SerializationType::Json),
				correlated: false,
				construct: ProviderConfigurationRequest::build,
				post_parse: commit_provider_info,
			},
			context,
			None,
		)
	}
}

fn commit_provider_info(
	response: ProviderConfigurationResponse,
	_: &ContextSnapshot,
	_: Option<&SessionData>,
) -> Result<(ProviderConfigurationResponse, ContextUpdate)> {
	let mut endpoints = HashMap::new();

	for name in EndpointName::ALL {
		let Some(value) = response.get_str(name.as_str()) else {
			continue;
		};
		let invalid = || {
			VerificationError::Faulted(MessageError::InvalidClaim {
				name: name.as_str().into(),
				expected: "an absolute HTTPS URL",
			})
		};
		let url = Url::parse(value).map_err(|_| invalid())?;

		context::builder::validate_secure(name.as_str(), &url).map_err(|_| invalid())?;
		endpoints.insert(name, url);
	}

	let update = ContextUpdate {
		behavior: Some(BehaviorChange::Renegotiate),
		provider_info: Some(response.claims().clone()),
		endpoints,
		..Default::default()
	};

	Ok((response, update))
}
