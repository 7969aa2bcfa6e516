//! Correlation storage for multi-step exchanges.
//!
//! An authorization request leaves a [`SessionData`] record behind, keyed by its `state` value;
//! the matching callback consumes it. Every record carries an expiry so abandoned exchanges do
//! not accumulate; an expired record is indistinguishable from a missing one. Stores only need
//! to be safe for concurrent use. Records are never shared between keys.

pub mod memory;

pub use memory::MemoryStore;

// crates.io
use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
// self
use crate::_prelude::*;

/// Byte length of generated state keys before encoding.
pub const STATE_KEY_BYTES: usize = 32;

/// Storage backend contract for correlation records.
pub trait CorrelationStore
where
	Self: Debug + Send + Sync,
{
	/// Stores `session` under `key` until `expires_at`, replacing any previous record.
	fn put(
		&self,
		key: &str,
		session: SessionData,
		expires_at: OffsetDateTime,
	) -> Result<(), StoreError>;

	/// Returns a copy of the unexpired record stored under `key`.
	fn get(&self, key: &str) -> Result<Option<SessionData>, StoreError>;

	/// Drops the record stored under `key`; missing keys are ignored.
	fn remove(&self, key: &str) -> Result<(), StoreError>;

	/// Removes and returns the record stored under `key` in one step.
	///
	/// At most one caller observes `Some` for a given `put`, and never once the record expired.
	fn take(&self, key: &str) -> Result<Option<SessionData>, StoreError>;
}

/// Error type produced by [`CorrelationStore`] implementations.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ThisError)]
pub enum StoreError {
	/// Serialization failures surfaced by the backend.
	#[error("Serialization error: {message}.")]
	Serialization {
		/// Human-readable error payload.
		message: String,
	},
	/// Backend-level failure for the storage engine.
	#[error("Backend failure: {message}.")]
	Backend {
		/// Human-readable error payload.
		message: String,
	},
}

/// Per-exchange data recorded when an authorization request is built.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionData {
	/// Nonce sent with the request.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub nonce: Option<String>,
	/// Requested response type.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub response_type: Option<String>,
	/// Redirect URI the response will be delivered to.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub redirect_uri: Option<String>,
	/// Requested scope.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub scope: Option<String>,
	/// Any other request parameters worth remembering.
	#[serde(default, skip_serializing_if = "Map::is_empty")]
	pub extras: Claims,
}
impl SessionData {
	const RECORDED: [&'static str; 4] = ["nonce", "response_type", "redirect_uri", "scope"];

	/// Captures the correlation-relevant parameters of an outbound request.
	///
	/// `state` and client credentials are never recorded.
	pub fn from_request(claims: &Claims) -> Self {
		let text = |name: &str| claims.get(name).and_then(Value::as_str).map(str::to_owned);
		let extras = claims
			.iter()
			.filter(|(name, _)| {
				!Self::RECORDED.contains(&name.as_str())
					&& !matches!(name.as_str(), "state" | "client_id" | "client_secret")
			})
			.map(|(name, value)| (name.clone(), value.clone()))
			.collect();

		Self {
			nonce: text("nonce"),
			response_type: text("response_type"),
			redirect_uri: text("redirect_uri"),
			scope: text("scope"),
			extras,
		}
	}
}

/// Generates a fresh, unguessable state key.
pub fn new_state_key() -> String {
	URL_SAFE_NO_PAD.encode(rand::random::<[u8; STATE_KEY_BYTES]>())
}

#[cfg(test)]
mod tests {
	// crates.io
	use serde_json::json;
	// self
	use super::*;

	#[test]
	fn session_data_skips_state_and_credentials() {
		let request = json!({
			"state": "s",
			"nonce": "n",
			"client_id": "c",
			"response_type": "code",
			"scope": "openid",
			"redirect_uri": "https://rp.example.com/cb",
			"prompt": "login",
		});
		let Value::Object(request) = request else { unreachable!() };
		let session = SessionData::from_request(&request);

		assert_eq!(session.nonce.as_deref(), Some("n"));
		assert_eq!(session.scope.as_deref(), Some("openid"));
		assert_eq!(session.extras.len(), 1);
		assert_eq!(session.extras.get("prompt"), Some(&json!("login")));
	}

	#[test]
	fn state_keys_are_distinct_and_url_safe() {
		let first = new_state_key();
		let second = new_state_key();

		assert_ne!(first, second);
		assert_eq!(URL_SAFE_NO_PAD.decode(&first).map(|bytes| bytes.len()), Ok(STATE_KEY_BYTES));
	}

	#[test]
	fn session_data_can_be_serialized() {
		let session = SessionData { nonce: Some("n".into()), ..Default::default() };
		let payload =
			serde_json::to_string(&session).expect("Session data should serialize to JSON.");

		assert_eq!(payload, r#"{"nonce":"n"}"#);

		let round_trip: SessionData = serde_json::from_str(&payload)
			.expect("Serialized session data should deserialize from JSON.");

		assert_eq!(round_trip, session);
	}
}
