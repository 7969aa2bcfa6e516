//! The message contract consumed by the engine, plus schema-driven claim messages.
//!
//! [`Message`] is the seam between the protocol engine and per-message knowledge: building a
//! message from a claim mapping, moving it across the wire in URL-encoded or JSON form, and
//! verifying it once trust claims have been injected. The default method bodies implement the
//! contract on top of a static [`ParamSpec`] schema so concrete message types only declare their
//! parameters and trust check; implementors that need signature checking override
//! [`Message::verify`].

pub mod oidc;
pub mod param;

pub use oidc::*;
pub use param::*;

// crates.io
use url::form_urlencoded;
// self
use crate::{_prelude::*, context::KeyJarHandle};

/// Heterogeneous claim mapping used for request arguments and message bodies.
pub type Claims = Map<String, Value>;

/// Failures raised while building, encoding, decoding, or verifying a message.
#[derive(Debug, ThisError)]
pub enum MessageError {
	/// A required parameter is absent.
	#[error("Required parameter `{name}` is missing.")]
	MissingClaim {
		/// Parameter name.
		name: &'static str,
	},
	/// A parameter does not fit its declared shape.
	#[error("Parameter `{name}` must be {expected}.")]
	InvalidClaim {
		/// Parameter name.
		name: String,
		/// Expected shape.
		expected: &'static str,
	},
	/// A single-valued parameter appeared more than once in URL-encoded input.
	#[error("Parameter `{name}` appears more than once.")]
	DuplicateParameter {
		/// Parameter name.
		name: String,
	},
	/// JSON input is not an object.
	#[error("JSON message must be an object.")]
	NotAnObject,
	/// JSON input could not be parsed.
	#[error("JSON message is malformed.")]
	Json(#[source] serde_path_to_error::Error<serde_json::Error>),
	/// Message could not be rendered as JSON.
	#[error("Message could not be serialized.")]
	Serialize(#[source] serde_json::Error),
}

/// Trust context injected into a response before verification.
#[derive(Clone, Debug, Default)]
pub struct TrustClaims {
	/// Client identifier the response must be addressed to.
	pub client_id: Option<String>,
	/// Issuer the response must come from.
	pub issuer: Option<String>,
	/// Key material available for signature checks.
	pub key_jar: Option<KeyJarHandle>,
	/// Whether trust checks must run.
	pub should_verify: bool,
}
impl TrustClaims {
	/// Returns `true` when an issuer is configured and `claimed` is identical to it.
	///
	/// Issuer identifiers compare as exact strings; `https://op.example.com/` does not match
	/// `https://op.example.com`.
	pub fn issuer_matches(&self, claimed: &str) -> bool {
		self.issuer.as_deref() == Some(claimed)
	}
}

/// Protocol message contract.
pub trait Message
where
	Self: Sized + Clone + Debug + Send + Sync,
{
	/// Stable message name used in logs.
	const NAME: &'static str;

	/// Declared parameters.
	fn schema() -> &'static [ParamSpec];

	/// Wraps claims that already passed normalization.
	fn from_claims(claims: Claims) -> Self;

	/// Borrows the message claims.
	fn claims(&self) -> &Claims;

	/// Mutably borrows the message claims.
	fn claims_mut(&mut self) -> &mut Claims;

	/// Consumes the message and returns its claims.
	fn into_claims(self) -> Claims;

	/// Message-specific trust check run after structural verification.
	fn check_trust(claims: &Claims, trust: &TrustClaims) -> bool;

	/// Builds a message from a claim mapping, rejecting missing or malformed parameters.
	fn build(claims: Claims) -> Result<Self, MessageError> {
		let claims = normalize(Self::schema(), claims)?;

		check_required(Self::schema(), &claims)?;

		Ok(Self::from_claims(claims))
	}

	/// Serializes the message as `application/x-www-form-urlencoded`.
	fn to_urlencoded(&self) -> Result<String, MessageError> {
		let schema = Self::schema();
		let mut serializer = form_urlencoded::Serializer::new(String::new());

		for (name, value) in self.claims() {
			for encoded in rule_for(schema, name).encode(value) {
				serializer.append_pair(name, &encoded);
			}
		}

		Ok(serializer.finish())
	}

	/// Serializes the message as JSON.
	fn to_json(&self) -> Result<String, MessageError> {
		serde_json::to_string(self.claims()).map_err(MessageError::Serialize)
	}

	/// Parses URL-encoded parameters; `Ok(None)` when no parameters are present.
	fn from_urlencoded(input: &str) -> Result<Option<Self>, MessageError> {
		let mut grouped = BTreeMap::<String, Vec<String>>::new();

		for (name, value) in form_urlencoded::parse(input.trim().as_bytes()) {
			grouped.entry(name.into_owned()).or_default().push(value.into_owned());
		}

		if grouped.is_empty() {
			return Ok(None);
		}

		let schema = Self::schema();
		let mut claims = Claims::new();

		for (name, values) in grouped {
			let value = rule_for(schema, &name).decode(&name, values)?;

			claims.insert(name, value);
		}

		Ok(Some(Self::from_claims(claims)))
	}

	/// Parses a JSON object; `Ok(None)` for empty input or `null`.
	fn from_json(input: &str) -> Result<Option<Self>, MessageError> {
		let input = input.trim();

		if input.is_empty() {
			return Ok(None);
		}

		let mut deserializer = serde_json::Deserializer::from_str(input);
		let value: Value =
			serde_path_to_error::deserialize(&mut deserializer).map_err(MessageError::Json)?;

		match value {
			Value::Null => Ok(None),
			Value::Object(claims) => Ok(Some(Self::from_claims(normalize(Self::schema(), claims)?))),
			_ => Err(MessageError::NotAnObject),
		}
	}

	/// Embedded OAuth error code, if the message carries one.
	fn error(&self) -> Option<&str> {
		self.claims().get("error").and_then(Value::as_str)
	}

	/// Verifies the message against injected trust claims.
	///
	/// Structural problems raise an error; a failed trust check returns `Ok(false)`.
	fn verify(&self, trust: &TrustClaims) -> Result<bool, MessageError> {
		let schema = Self::schema();

		check_required(schema, self.claims())?;

		for (name, value) in self.claims() {
			let rule = rule_for(schema, name);

			if !rule.accepts(value) {
				return Err(MessageError::InvalidClaim { name: name.clone(), expected: rule.describe() });
			}
		}

		if !trust.should_verify {
			return Ok(true);
		}

		Ok(Self::check_trust(self.claims(), trust))
	}
}

fn normalize(schema: &[ParamSpec], claims: Claims) -> Result<Claims, MessageError> {
	let mut normalized = Claims::new();

	for (name, value) in claims {
		if value.is_null() {
			continue;
		}

		let rule = rule_for(schema, &name);
		let value = rule
			.normalize(value)
			.ok_or_else(|| MessageError::InvalidClaim { name: name.clone(), expected: rule.describe() })?;

		normalized.insert(name, value);
	}

	Ok(normalized)
}

fn check_required(schema: &[ParamSpec], claims: &Claims) -> Result<(), MessageError> {
	match schema.iter().find(|spec| spec.required && !claims.contains_key(spec.name)) {
		Some(spec) => Err(MessageError::MissingClaim { name: spec.name }),
		None => Ok(()),
	}
}
