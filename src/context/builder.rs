//! Builder that validates and assembles a [`ServiceContext`](crate::context::ServiceContext).

// self
use crate::{
	_prelude::*,
	context::{
		ContextError, ContextSnapshot, EndpointName, KeyJarHandle, ServiceContext,
		negotiate_behavior,
	},
};

/// Builder for [`ServiceContext`] values.
#[derive(Debug, Default)]
pub struct ServiceContextBuilder {
	/// Issuer identifier of the provider.
	pub issuer: Option<String>,
	/// Base URL of the relying party, used to derive request URIs.
	pub base_url: Option<String>,
	/// Pre-registered client identifier.
	pub client_id: Option<String>,
	/// Pre-registered client secret.
	pub client_secret: Option<String>,
	/// Redirect URIs registered for the client.
	pub redirect_uris: Vec<Url>,
	/// Post-logout redirect URIs registered for the client.
	pub post_logout_redirect_uris: Vec<Url>,
	/// Location of the client's published JWK set.
	pub jwks_uri: Option<Url>,
	/// Statically configured endpoints.
	pub endpoints: HashMap<EndpointName, Url>,
	/// Client registration preferences.
	pub client_preferences: Claims,
	/// Explicit behavior; negotiated from preferences when unset.
	pub behavior: Option<Claims>,
	/// Statically configured provider metadata.
	pub provider_info: Option<Claims>,
	/// Key material handle.
	pub key_jar: Option<KeyJarHandle>,
}
impl ServiceContextBuilder {
	/// Creates an empty builder.
	pub fn new() -> Self {
		Self::default()
	}

	/// Sets the issuer.
	pub fn issuer(mut self, issuer: impl Into<String>) -> Self {
		self.issuer = Some(issuer.into());

		self
	}

	/// Sets the relying party base URL.
	pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
		self.base_url = Some(base_url.into());

		self
	}

	/// Sets a pre-registered client identifier.
	pub fn client_id(mut self, client_id: impl Into<String>) -> Self {
		self.client_id = Some(client_id.into());

		self
	}

	/// Sets a pre-registered client secret.
	pub fn client_secret(mut self, client_secret: impl Into<String>) -> Self {
		self.client_secret = Some(client_secret.into());

		self
	}

	/// Appends a redirect URI.
	pub fn redirect_uri(mut self, url: Url) -> Self {
		self.redirect_uris.push(url);

		self
	}

	/// Appends a post-logout redirect URI.
	pub fn post_logout_redirect_uri(mut self, url: Url) -> Self {
		self.post_logout_redirect_uris.push(url);

		self
	}

	/// Sets the published JWK set location.
	pub fn jwks_uri(mut self, url: Url) -> Self {
		self.jwks_uri = Some(url);

		self
	}

	/// Configures a static endpoint.
	pub fn endpoint(mut self, name: EndpointName, url: Url) -> Self {
		self.endpoints.insert(name, url);

		self
	}

	/// Adds a single client preference.
	pub fn preference(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
		self.client_preferences.insert(key.into(), value.into());

		self
	}

	/// Overrides the negotiated behavior.
	pub fn behavior(mut self, behavior: Claims) -> Self {
		self.behavior = Some(behavior);

		self
	}

	/// Supplies provider metadata obtained out of band.
	pub fn provider_info(mut self, provider_info: Claims) -> Self {
		self.provider_info = Some(provider_info);

		self
	}

	/// Attaches the key material handle.
	pub fn key_jar(mut self, key_jar: KeyJarHandle) -> Self {
		self.key_jar = Some(key_jar);

		self
	}

	/// Consumes the builder and validates the resulting context.
	pub fn build(self) -> Result<ServiceContext, ContextError> {
		if let Some(issuer) = self.issuer.as_deref() {
			validate_issuer(issuer)?;
		}
		for (name, url) in &self.endpoints {
			validate_secure(name.as_str(), url)?;
		}
		for url in &self.redirect_uris {
			validate_secure("redirect_uri", url)?;

			if url.fragment().is_some() {
				return Err(ContextError::RedirectWithFragment { url: url.to_string() });
			}
		}
		for url in &self.post_logout_redirect_uris {
			validate_secure("post_logout_redirect_uri", url)?;
		}
		if let Some(url) = self.jwks_uri.as_ref() {
			validate_secure("jwks_uri", url)?;
		}

		let behavior = self.behavior.unwrap_or_else(|| {
			negotiate_behavior(&self.client_preferences, self.provider_info.as_ref())
		});
		let snapshot = ContextSnapshot {
			issuer: self.issuer,
			base_url: self.base_url,
			client_id: self.client_id,
			client_secret: self.client_secret,
			client_secret_expires_at: None,
			registration_access_token: None,
			registration_response: None,
			client_preferences: self.client_preferences,
			behavior,
			provider_info: self.provider_info,
			endpoints: self.endpoints,
			redirect_uris: self.redirect_uris,
			post_logout_redirect_uris: self.post_logout_redirect_uris,
			jwks_uri: self.jwks_uri,
			key_jar: self.key_jar,
		};

		Ok(ServiceContext::from_snapshot(snapshot))
	}
}

fn validate_issuer(issuer: &str) -> Result<(), ContextError> {
	let invalid = || ContextError::InvalidIssuer { issuer: issuer.to_owned() };
	let url = Url::parse(issuer).map_err(|_| invalid())?;

	if url.query().is_some() || url.fragment().is_some() {
		return Err(invalid());
	}

	validate_secure("issuer", &url)
}

// Loopback redirect targets are allowed over plain HTTP for native clients (RFC 8252).
pub(crate) fn validate_secure(field: &'static str, url: &Url) -> Result<(), ContextError> {
	let loopback = matches!(url.host_str(), Some("localhost" | "127.0.0.1" | "[::1]"));

	if url.scheme() == "https" || (url.scheme() == "http" && loopback) {
		Ok(())
	} else {
		Err(ContextError::InsecureUrl { field, url: url.to_string() })
	}
}

#[cfg(test)]
mod tests {
	// crates.io
	use serde_json::json;
	// self
	use super::*;
	use crate::_preludet::url;

	#[test]
	fn builder_rejects_insecure_urls() {
		let err = ServiceContextBuilder::new()
			.endpoint(EndpointName::Token, url("http://op.example.com/token"))
			.build()
			.expect_err("Plain HTTP endpoints must be rejected.");

		assert!(matches!(err, ContextError::InsecureUrl { field: "token_endpoint", .. }));

		ServiceContextBuilder::new()
			.redirect_uri(url("http://127.0.0.1:8080/cb"))
			.redirect_uri(url("http://localhost/cb"))
			.build()
			.expect("Loopback redirects may use plain HTTP.");
	}

	#[test]
	fn builder_rejects_bad_issuers_and_fragment_redirects() {
		for issuer in ["not a url", "https://op.example.com?tenant=a", "http://op.example.com"] {
			assert!(
				ServiceContextBuilder::new().issuer(issuer).build().is_err(),
				"Issuer `{issuer}` must be rejected."
			);
		}

		let err = ServiceContextBuilder::new()
			.redirect_uri(url("https://rp.example.com/cb#frag"))
			.build()
			.expect_err("Redirect URIs with fragments must be rejected.");

		assert!(matches!(err, ContextError::RedirectWithFragment { .. }));
	}

	#[test]
	fn behavior_defaults_to_negotiated_preferences() {
		let context = ServiceContextBuilder::new()
			.preference("response_types", json!(["code", "token"]))
			.provider_info(Claims::from_iter([(
				"response_types_supported".into(),
				json!(["code"]),
			)]))
			.build()
			.expect("Context should build.");

		assert_eq!(context.snapshot().behavior_list("response_types"), Some(vec!["code"]));
	}
}
