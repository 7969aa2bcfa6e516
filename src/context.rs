//! Long-lived relying-party state shared by every service.
//!
//! [`ServiceContext`] is a cheap-to-clone handle around an immutable [`ContextSnapshot`].
//! Request building reads a snapshot without holding any lock; the rare mutation path
//! (registration or discovery completion) goes through [`ServiceContext::commit`], which applies
//! a whole [`ContextUpdate`] inside one exclusive section and swaps in a new snapshot. Readers
//! therefore observe either the state before a commit or the state after it, never a mix.

pub mod behavior;
pub mod builder;
pub mod keys;

pub use behavior::*;
pub use builder::*;
pub use keys::*;

// crates.io
use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use sha2::{Digest, Sha256};
// self
use crate::{_prelude::*, message::TrustClaims};

/// Endpoints a provider can publish.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EndpointName {
	/// Authorization endpoint.
	Authorization,
	/// Token endpoint.
	Token,
	/// Dynamic registration endpoint.
	Registration,
	/// UserInfo endpoint.
	UserInfo,
	/// RP-initiated logout endpoint.
	EndSession,
	/// Token revocation endpoint.
	Revocation,
}
impl EndpointName {
	/// Every endpoint name, in metadata order.
	pub const ALL: [EndpointName; 6] = [
		EndpointName::Authorization,
		EndpointName::Token,
		EndpointName::Registration,
		EndpointName::UserInfo,
		EndpointName::EndSession,
		EndpointName::Revocation,
	];

	/// Provider metadata key advertising this endpoint.
	pub const fn as_str(self) -> &'static str {
		match self {
			EndpointName::Authorization => "authorization_endpoint",
			EndpointName::Token => "token_endpoint",
			EndpointName::Registration => "registration_endpoint",
			EndpointName::UserInfo => "userinfo_endpoint",
			EndpointName::EndSession => "end_session_endpoint",
			EndpointName::Revocation => "revocation_endpoint",
		}
	}
}
impl Display for EndpointName {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Errors raised while building a context or deriving values from it.
#[derive(Debug, PartialEq, Eq, ThisError)]
pub enum ContextError {
	/// Issuer is not an absolute HTTPS URL without query or fragment.
	#[error("Issuer `{issuer}` is not a valid issuer identifier.")]
	InvalidIssuer {
		/// Rejected issuer.
		issuer: String,
	},
	/// URL must use HTTPS (loopback HTTP is tolerated).
	#[error("The {field} must use HTTPS: {url}.")]
	InsecureUrl {
		/// Field that failed validation.
		field: &'static str,
		/// Rejected URL.
		url: String,
	},
	/// Redirect URIs must not carry a fragment.
	#[error("Redirect URI must not contain a fragment: {url}.")]
	RedirectWithFragment {
		/// Rejected URL.
		url: String,
	},
	/// Web name was empty.
	#[error("Web name cannot be empty.")]
	EmptyWebname,
	/// Web name does not live under the base URL.
	#[error("Web name does not match the base URL.")]
	WebnameMismatch,
	/// Context lacks a value the operation needs.
	#[error("Service context is missing `{field}`.")]
	Missing {
		/// Missing field.
		field: &'static str,
	},
}

/// Client credentials issued by a registration endpoint.
#[derive(Clone, PartialEq, Eq)]
pub struct ClientCredentials {
	/// Issued client identifier.
	pub client_id: String,
	/// Issued client secret.
	pub client_secret: Option<String>,
	/// Secret expiry; `None` means the secret does not expire.
	pub client_secret_expires_at: Option<OffsetDateTime>,
	/// Token for the client configuration endpoint.
	pub registration_access_token: Option<String>,
}
impl Debug for ClientCredentials {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("ClientCredentials")
			.field("client_id", &self.client_id)
			.field("client_secret_set", &self.client_secret.is_some())
			.field("client_secret_expires_at", &self.client_secret_expires_at)
			.field("registration_access_token_set", &self.registration_access_token.is_some())
			.finish()
	}
}

/// Immutable view of the relying-party state.
#[derive(Clone, Default)]
pub struct ContextSnapshot {
	/// Issuer identifier of the provider.
	pub issuer: Option<String>,
	/// Base URL of the relying party.
	pub base_url: Option<String>,
	/// Client identifier.
	pub client_id: Option<String>,
	/// Client secret.
	pub client_secret: Option<String>,
	/// Client secret expiry.
	pub client_secret_expires_at: Option<OffsetDateTime>,
	/// Registration access token.
	pub registration_access_token: Option<String>,
	/// Verified registration response.
	pub registration_response: Option<Claims>,
	/// Client registration preferences.
	pub client_preferences: Claims,
	/// Negotiated behavior.
	pub behavior: Claims,
	/// Verified provider metadata.
	pub provider_info: Option<Claims>,
	/// Endpoint table.
	pub endpoints: HashMap<EndpointName, Url>,
	/// Redirect URIs.
	pub redirect_uris: Vec<Url>,
	/// Post-logout redirect URIs.
	pub post_logout_redirect_uris: Vec<Url>,
	/// Published JWK set location.
	pub jwks_uri: Option<Url>,
	/// Key material handle.
	pub key_jar: Option<KeyJarHandle>,
}
impl ContextSnapshot {
	/// Looks up an endpoint by name.
	pub fn endpoint(&self, name: EndpointName) -> Option<&Url> {
		self.endpoints.get(&name)
	}

	/// String values of a list-valued behavior entry.
	pub fn behavior_list(&self, key: &str) -> Option<Vec<&str>> {
		match self.behavior.get(key)? {
			Value::Array(items) => Some(items.iter().filter_map(Value::as_str).collect()),
			Value::String(value) => Some(vec![value.as_str()]),
			_ => None,
		}
	}

	/// Trust claims injected into responses before verification.
	pub fn trust_claims(&self) -> TrustClaims {
		TrustClaims {
			client_id: self.client_id.clone(),
			issuer: self.issuer.clone(),
			key_jar: self.key_jar.clone(),
			should_verify: true,
		}
	}

	/// Returns `true` when the client secret has expired at `now`.
	pub fn client_secret_expired_at(&self, now: OffsetDateTime) -> bool {
		self.client_secret_expires_at.is_some_and(|expires_at| now >= expires_at)
	}

	/// Strips the base URL (and one leading `/`) from a web name.
	pub fn file_name_from_webname(&self, webname: &str) -> Result<String, ContextError> {
		if webname.is_empty() {
			return Err(ContextError::EmptyWebname);
		}

		let base_url = self.base_url.as_deref().ok_or(ContextError::Missing { field: "base_url" })?;
		let rest = webname.strip_prefix(base_url).ok_or(ContextError::WebnameMismatch)?;

		Ok(rest.strip_prefix('/').unwrap_or(rest).to_owned())
	}

	/// Derives issuer-specific request URIs below `path`.
	///
	/// The final segment is the URL-safe base64 SHA-256 digest of the issuer so request objects
	/// for different providers never share a location.
	pub fn generate_request_uris(&self, path: &str) -> Result<Vec<String>, ContextError> {
		let base_url = self.base_url.as_deref().ok_or(ContextError::Missing { field: "base_url" })?;
		let issuer = self.issuer.as_deref().ok_or(ContextError::Missing { field: "issuer" })?;
		let digest = URL_SAFE_NO_PAD.encode(Sha256::digest(issuer.as_bytes()));

		Ok(vec![format!("{}/{}/{}", base_url.trim_end_matches('/'), path.trim_matches('/'), digest)])
	}
}
impl Debug for ContextSnapshot {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("ContextSnapshot")
			.field("issuer", &self.issuer)
			.field("base_url", &self.base_url)
			.field("client_id", &self.client_id)
			.field("client_secret_set", &self.client_secret.is_some())
			.field("client_secret_expires_at", &self.client_secret_expires_at)
			.field("behavior", &self.behavior)
			.field("provider_info_set", &self.provider_info.is_some())
			.field("endpoints", &self.endpoints)
			.field("redirect_uris", &self.redirect_uris)
			.field("post_logout_redirect_uris", &self.post_logout_redirect_uris)
			.field("key_jar", &self.key_jar)
			.finish()
	}
}

/// Registration response claims that belong to the client credentials, never to the behavior.
pub const CREDENTIAL_CLAIMS: [&str; 3] =
	["client_secret", "registration_access_token", "client_secret_expires_at"];

/// How a commit changes the negotiated behavior.
///
/// Changes are resolved against the snapshot current at commit time, so concurrent commits
/// never drop each other's behavior entries.
#[derive(Clone, Debug, PartialEq)]
pub enum BehaviorChange {
	/// Sets the given entries, keeping every other entry in effect.
	Overlay(Claims),
	/// Narrows the behavior in effect against the provider metadata, then restores the
	/// metadata the provider accepted at registration.
	Renegotiate,
}
impl BehaviorChange {
	fn apply(self, snapshot: &mut ContextSnapshot) {
		match self {
			BehaviorChange::Overlay(entries) => snapshot.behavior.extend(entries),
			BehaviorChange::Renegotiate => {
				let mut behavior = negotiate_behavior(&snapshot.behavior, snapshot.provider_info.as_ref());

				if let Some(registered) = &snapshot.registration_response {
					behavior.extend(
						registered
							.iter()
							.filter(|(name, _)| !CREDENTIAL_CLAIMS.contains(&name.as_str()))
							.map(|(name, value)| (name.clone(), value.clone())),
					);
				}

				snapshot.behavior = behavior;
			},
		}
	}
}

/// Trust-relevant fields committed together after a verified response.
#[derive(Clone, Debug, Default)]
pub struct ContextUpdate {
	/// New client credentials; replaces every credential field at once.
	pub client: Option<ClientCredentials>,
	/// Verified registration response.
	pub registration_response: Option<Claims>,
	/// Change to the negotiated behavior, applied after every other field.
	pub behavior: Option<BehaviorChange>,
	/// Verified provider metadata.
	pub provider_info: Option<Claims>,
	/// Endpoints to add or replace.
	pub endpoints: HashMap<EndpointName, Url>,
}
impl ContextUpdate {
	/// Returns `true` when applying the update would change nothing.
	pub fn is_empty(&self) -> bool {
		self.fields().is_empty()
	}

	/// Names of the fields the update touches.
	pub fn fields(&self) -> Vec<&'static str> {
		[
			("client", self.client.is_some()),
			("registration_response", self.registration_response.is_some()),
			("behavior", self.behavior.is_some()),
			("provider_info", self.provider_info.is_some()),
			("endpoints", !self.endpoints.is_empty()),
		]
		.into_iter()
		.filter_map(|(name, set)| set.then_some(name))
		.collect()
	}

	fn apply(self, snapshot: &mut ContextSnapshot) {
		if let Some(client) = self.client {
			snapshot.client_id = Some(client.client_id);
			snapshot.client_secret = client.client_secret;
			snapshot.client_secret_expires_at = client.client_secret_expires_at;
			snapshot.registration_access_token = client.registration_access_token;
		}
		if let Some(response) = self.registration_response {
			snapshot.registration_response = Some(response);
		}
		if let Some(provider_info) = self.provider_info {
			snapshot.provider_info = Some(provider_info);
		}

		snapshot.endpoints.extend(self.endpoints);

		if let Some(change) = self.behavior {
			change.apply(snapshot);
		}
	}
}

/// Shared handle to the relying-party state.
#[derive(Clone, Debug)]
pub struct ServiceContext(Arc<RwLock<Arc<ContextSnapshot>>>);
impl ServiceContext {
	/// Creates a new builder.
	pub fn builder() -> ServiceContextBuilder {
		ServiceContextBuilder::new()
	}

	pub(crate) fn from_snapshot(snapshot: ContextSnapshot) -> Self {
		Self(Arc::new(RwLock::new(Arc::new(snapshot))))
	}

	/// Returns the current immutable snapshot.
	pub fn snapshot(&self) -> Arc<ContextSnapshot> {
		self.0.read().clone()
	}

	/// Applies `update` as one atomic step.
	///
	/// Concurrent commits are serialized and each one builds on the snapshot the previous one
	/// produced; concurrent readers keep whichever snapshot they already hold.
	pub fn commit(&self, update: ContextUpdate) {
		if update.is_empty() {
			return;
		}

		let mut guard = self.0.write();
		let mut next = ContextSnapshot::clone(&guard);

		update.apply(&mut next);

		*guard = Arc::new(next);
	}
}
impl Default for ServiceContext {
	fn default() -> Self {
		Self::from_snapshot(ContextSnapshot::default())
	}
}

#[cfg(test)]
mod tests {
	// crates.io
	use serde_json::json;
	// self
	use super::*;

	fn with_base(base_url: &str) -> ContextSnapshot {
		ContextSnapshot {
			base_url: Some(base_url.into()),
			issuer: Some("issuer".into()),
			..Default::default()
		}
	}

	#[test]
	fn file_name_from_webname_strips_base_url() {
		let snapshot = with_base("www.yahoo.com");

		assert_eq!(snapshot.file_name_from_webname("www.yahoo.com/1234"), Ok("1234".into()));
		assert_eq!(snapshot.file_name_from_webname("www.yahoo.com:1234"), Ok(":1234".into()));
		assert_eq!(snapshot.file_name_from_webname(""), Err(ContextError::EmptyWebname));
		assert_eq!(snapshot.file_name_from_webname("webName"), Err(ContextError::WebnameMismatch));
	}

	#[test]
	fn request_uris_live_under_the_base_url() {
		let snapshot = with_base("baseUrl");

		for path in ["/url", "url"] {
			let uris = snapshot.generate_request_uris(path).expect("Request URIs should derive.");

			assert_eq!(uris.len(), 1);
			assert!(uris[0].starts_with("baseUrl/url/"), "Unexpected request URI: {}.", uris[0]);
		}

		assert_eq!(
			ContextSnapshot::default().generate_request_uris("url"),
			Err(ContextError::Missing { field: "base_url" })
		);
	}

	#[test]
	fn commit_swaps_snapshots_atomically() {
		let context = ServiceContext::default();
		let before = context.snapshot();
		let mut update = ContextUpdate {
			client: Some(ClientCredentials {
				client_id: "client".into(),
				client_secret: Some("secret".into()),
				client_secret_expires_at: None,
				registration_access_token: None,
			}),
			behavior: Some(BehaviorChange::Overlay(Map::from_iter([(
				"response_types".into(),
				json!(["code"]),
			)]))),
			..Default::default()
		};

		update.endpoints.insert(
			EndpointName::Token,
			Url::parse("https://op.example.com/token").expect("Fixture URL should parse."),
		);
		context.commit(update);

		let after = context.snapshot();

		assert!(before.client_id.is_none(), "Earlier snapshots must stay untouched.");
		assert_eq!(after.client_id.as_deref(), Some("client"));
		assert_eq!(after.client_secret.as_deref(), Some("secret"));
		assert_eq!(after.behavior_list("response_types"), Some(vec!["code"]));
		assert!(after.endpoint(EndpointName::Token).is_some());
	}

	#[test]
	fn empty_updates_keep_the_current_snapshot() {
		let context = ServiceContext::default();
		let before = context.snapshot();

		context.commit(ContextUpdate::default());

		assert!(Arc::ptr_eq(&before, &context.snapshot()));
	}

	#[test]
	fn concurrent_overlays_keep_every_entry() {
		let context = ServiceContext::default();
		let handles = (0..16)
			.map(|i| {
				let context = context.clone();

				std::thread::spawn(move || {
					context.commit(ContextUpdate {
						behavior: Some(BehaviorChange::Overlay(Map::from_iter([(
							format!("entry_{i}"),
							json!(i),
						)]))),
						..Default::default()
					});
				})
			})
			.collect::<Vec<_>>();

		for handle in handles {
			handle.join().expect("Committing thread should not panic.");
		}

		assert_eq!(context.snapshot().behavior.len(), 16);
	}

	#[test]
	fn renegotiation_narrows_current_behavior_and_keeps_registered_metadata() {
		let context = ServiceContext::from_snapshot(ContextSnapshot {
			behavior: Map::from_iter([
				("response_types".into(), json!(["code", "token"])),
				("token_endpoint_auth_method".into(), json!("client_secret_post")),
			]),
			registration_response: Some(Map::from_iter([
				("client_secret".into(), json!("secret")),
				("token_endpoint_auth_method".into(), json!("client_secret_post")),
			])),
			..Default::default()
		});

		context.commit(ContextUpdate {
			provider_info: Some(Map::from_iter([(
				"response_types_supported".into(),
				json!(["code"]),
			)])),
			behavior: Some(BehaviorChange::Renegotiate),
			..Default::default()
		});

		let snapshot = context.snapshot();

		assert_eq!(snapshot.behavior_list("response_types"), Some(vec!["code"]));
		assert_eq!(
			snapshot.behavior.get("token_endpoint_auth_method"),
			Some(&json!("client_secret_post"))
		);
		assert!(!snapshot.behavior.contains_key("client_secret"));
	}

	#[test]
	fn secret_expiry_is_inclusive() {
		let expires_at = OffsetDateTime::UNIX_EPOCH + time::Duration::hours(1);
		let snapshot =
			ContextSnapshot { client_secret_expires_at: Some(expires_at), ..Default::default() };

		assert!(!snapshot.client_secret_expired_at(expires_at - time::Duration::seconds(1)));
		assert!(snapshot.client_secret_expired_at(expires_at));
		assert!(!ContextSnapshot::default().client_secret_expired_at(expires_at));
	}

	#[test]
	fn debug_output_hides_secrets() {
		let snapshot =
			ContextSnapshot { client_secret: Some("hunter2".into()), ..Default::default() };

		assert!(!format!("{snapshot:?}").contains("hunter2"));
	}
}
