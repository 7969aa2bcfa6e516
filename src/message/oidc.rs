//! OpenID Connect and OAuth 2.0 messages used by the built-in services.

// self
use crate::{
	_prelude::*,
	message::{Claims, Message, ParamRule::*, ParamSpec, TrustClaims},
};

macro_rules! def_message {
	($name:ident, $doc:literal, trust = $trust:path, [$($spec:expr),* $(,)?]) => {
		#[doc = $doc]
		#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
		#[serde(transparent)]
		pub struct $name(Claims);
		impl $name {
			/// Returns a string parameter, if present.
			pub fn get_str(&self, name: &str) -> Option<&str> {
				self.0.get(name).and_then(Value::as_str)
			}
		}
		impl Message for $name {
			const NAME: &'static str = stringify!($name);

			fn schema() -> &'static [ParamSpec] {
				const SCHEMA: &[ParamSpec] = &[$($spec),*];

				SCHEMA
			}

			fn from_claims(claims: Claims) -> Self {
				Self(claims)
			}

			fn claims(&self) -> &Claims {
				&self.0
			}

			fn claims_mut(&mut self) -> &mut Claims {
				&mut self.0
			}

			fn into_claims(self) -> Claims {
				self.0
			}

			fn check_trust(claims: &Claims, trust: &TrustClaims) -> bool {
				$trust(claims, trust)
			}
		}
	};
}

def_message! {
	AuthorizationRequest,
	"Authentication request sent to the authorization endpoint.",
	trust = trust_nothing,
	[
		ParamSpec::required("response_type", SpaceSeparatedList),
		ParamSpec::required("client_id", SingleString),
		ParamSpec::required("redirect_uri", SingleString),
		ParamSpec::required("scope", SpaceSeparatedList),
		ParamSpec::optional("state", SingleString),
		ParamSpec::optional("nonce", SingleString),
		ParamSpec::optional("response_mode", SingleString),
		ParamSpec::optional("prompt", SpaceSeparatedList),
		ParamSpec::optional("display", SingleString),
		ParamSpec::optional("max_age", Integer),
		ParamSpec::optional("ui_locales", SpaceSeparatedList),
		ParamSpec::optional("login_hint", SingleString),
		ParamSpec::optional("acr_values", SpaceSeparatedList),
		ParamSpec::optional("claims", Object),
		ParamSpec::optional("request", SingleString),
		ParamSpec::optional("request_uri", SingleString),
	]
}

def_message! {
	AuthorizationResponse,
	"Authorization response delivered to the redirect URI.",
	trust = trust_issued_response,
	[
		ParamSpec::optional("code", SingleString),
		ParamSpec::optional("state", SingleString),
		ParamSpec::optional("access_token", SingleString),
		ParamSpec::optional("token_type", SingleString),
		ParamSpec::optional("expires_in", Integer),
		ParamSpec::optional("id_token", SingleString),
		ParamSpec::optional("scope", SpaceSeparatedList),
		ParamSpec::optional("iss", SingleString),
		ParamSpec::optional("client_id", SingleString),
		ParamSpec::optional("session_state", SingleString),
	]
}

def_message! {
	AccessTokenRequest,
	"Token request sent to the token endpoint.",
	trust = trust_nothing,
	[
		ParamSpec::required("grant_type", SingleString),
		ParamSpec::optional("code", SingleString),
		ParamSpec::optional("redirect_uri", SingleString),
		ParamSpec::optional("client_id", SingleString),
		ParamSpec::optional("client_secret", SingleString),
		ParamSpec::optional("code_verifier", SingleString),
		ParamSpec::optional("refresh_token", SingleString),
		ParamSpec::optional("scope", SpaceSeparatedList),
	]
}

def_message! {
	AccessTokenResponse,
	"Successful token endpoint response.",
	trust = trust_issued_response,
	[
		ParamSpec::required("access_token", SingleString),
		ParamSpec::required("token_type", SingleString),
		ParamSpec::optional("expires_in", Integer),
		ParamSpec::optional("refresh_token", SingleString),
		ParamSpec::optional("scope", SpaceSeparatedList),
		ParamSpec::optional("id_token", SingleString),
		ParamSpec::optional("state", SingleString),
	]
}

def_message! {
	RegistrationRequest,
	"Dynamic client registration request.",
	trust = trust_nothing,
	[
		ParamSpec::required("redirect_uris", StringList),
		ParamSpec::optional("response_types", StringList),
		ParamSpec::optional("grant_types", StringList),
		ParamSpec::optional("application_type", SingleString),
		ParamSpec::optional("contacts", StringList),
		ParamSpec::optional("client_name", SingleString),
		ParamSpec::optional("logo_uri", SingleString),
		ParamSpec::optional("client_uri", SingleString),
		ParamSpec::optional("policy_uri", SingleString),
		ParamSpec::optional("tos_uri", SingleString),
		ParamSpec::optional("jwks_uri", SingleString),
		ParamSpec::optional("jwks", Object),
		ParamSpec::optional("sector_identifier_uri", SingleString),
		ParamSpec::optional("subject_type", SingleString),
		ParamSpec::optional("id_token_signed_response_alg", SingleString),
		ParamSpec::optional("token_endpoint_auth_method", SingleString),
		ParamSpec::optional("default_max_age", Integer),
		ParamSpec::optional("require_auth_time", Boolean),
		ParamSpec::optional("default_acr_values", StringList),
		ParamSpec::optional("initiate_login_uri", SingleString),
		ParamSpec::optional("request_uris", StringList),
		ParamSpec::optional("post_logout_redirect_uris", StringList),
		ParamSpec::optional("scope", SpaceSeparatedList),
	]
}

def_message! {
	RegistrationResponse,
	"Client information returned by the registration endpoint.",
	trust = trust_registration,
	[
		ParamSpec::required("client_id", SingleString),
		ParamSpec::optional("client_secret", SingleString),
		ParamSpec::optional("registration_access_token", SingleString),
		ParamSpec::optional("registration_client_uri", SingleString),
		ParamSpec::optional("client_id_issued_at", Integer),
		ParamSpec::optional("client_secret_expires_at", Integer),
		ParamSpec::optional("redirect_uris", StringList),
		ParamSpec::optional("response_types", StringList),
		ParamSpec::optional("grant_types", StringList),
		ParamSpec::optional("application_type", SingleString),
		ParamSpec::optional("contacts", StringList),
		ParamSpec::optional("client_name", SingleString),
		ParamSpec::optional("jwks_uri", SingleString),
		ParamSpec::optional("jwks", Object),
		ParamSpec::optional("subject_type", SingleString),
		ParamSpec::optional("id_token_signed_response_alg", SingleString),
		ParamSpec::optional("token_endpoint_auth_method", SingleString),
		ParamSpec::optional("default_max_age", Integer),
		ParamSpec::optional("require_auth_time", Boolean),
		ParamSpec::optional("request_uris", StringList),
		ParamSpec::optional("post_logout_redirect_uris", StringList),
	]
}

def_message! {
	ProviderConfigurationRequest,
	"Empty request for the provider's well-known configuration document.",
	trust = trust_nothing,
	[]
}

def_message! {
	ProviderConfigurationResponse,
	"Provider metadata published at `/.well-known/openid-configuration`.",
	trust = trust_provider_configuration,
	[
		ParamSpec::required("issuer", SingleString),
		ParamSpec::required("authorization_endpoint", SingleString),
		ParamSpec::optional("token_endpoint", SingleString),
		ParamSpec::optional("userinfo_endpoint", SingleString),
		ParamSpec::required("jwks_uri", SingleString),
		ParamSpec::optional("registration_endpoint", SingleString),
		ParamSpec::optional("end_session_endpoint", SingleString),
		ParamSpec::optional("scopes_supported", StringList),
		ParamSpec::required("response_types_supported", StringList),
		ParamSpec::optional("response_modes_supported", StringList),
		ParamSpec::optional("grant_types_supported", StringList),
		ParamSpec::required("subject_types_supported", StringList),
		ParamSpec::required("id_token_signing_alg_values_supported", StringList),
		ParamSpec::optional("token_endpoint_auth_methods_supported", StringList),
		ParamSpec::optional("claims_supported", StringList),
		ParamSpec::optional("request_parameter_supported", Boolean),
		ParamSpec::optional("request_uri_parameter_supported", Boolean),
		ParamSpec::optional("require_request_uri_registration", Boolean),
	]
}

def_message! {
	ErrorResponse,
	"OAuth error response.",
	trust = trust_nothing,
	[
		ParamSpec::required("error", SingleString),
		ParamSpec::optional("error_description", SingleString),
		ParamSpec::optional("error_uri", SingleString),
		ParamSpec::optional("state", SingleString),
	]
}

fn trust_nothing(_: &Claims, _: &TrustClaims) -> bool {
	true
}

// `iss` (RFC 9207) and `client_id` are optional on the wire but must match when echoed. An
// `id_token` can only be trusted when key material for the issuer is available.
fn trust_issued_response(claims: &Claims, trust: &TrustClaims) -> bool {
	let echoed = |name: &str| claims.get(name).and_then(Value::as_str);

	if echoed("iss").is_some_and(|iss| !trust.issuer_matches(iss)) {
		return false;
	}
	if echoed("client_id").is_some_and(|client_id| trust.client_id.as_deref() != Some(client_id)) {
		return false;
	}
	if claims.contains_key("id_token") {
		return match (trust.issuer.as_deref(), trust.key_jar.as_ref()) {
			(Some(issuer), Some(jar)) => jar.has_keys_for(issuer),
			_ => false,
		};
	}

	true
}

// RFC 7591: `client_secret_expires_at` is mandatory whenever a secret is issued.
fn trust_registration(claims: &Claims, _: &TrustClaims) -> bool {
	!claims.contains_key("client_secret") || claims.contains_key("client_secret_expires_at")
}

fn trust_provider_configuration(claims: &Claims, trust: &TrustClaims) -> bool {
	claims.get("issuer").and_then(Value::as_str).is_some_and(|issuer| trust.issuer_matches(issuer))
}
