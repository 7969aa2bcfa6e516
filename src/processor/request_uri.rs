//! Request URI defaulting for registration.

// self
use crate::{
	_prelude::*,
	context::{ContextError, ContextSnapshot},
	error::ArgumentError,
	message::ParamRule,
	processor::RequestArgumentProcessor,
};

/// Directory below the base URL that holds request objects.
pub const DEFAULT_REQUESTS_DIR: &str = "requests";

/// Fills `request_uris` with the issuer-specific request URI below the relying party's base URL.
///
/// Clients without a base URL publish no request objects, so nothing is added for them.
#[derive(Clone, Copy, Debug)]
pub struct AddRequestUri {
	/// Path segment below the base URL.
	pub requests_dir: &'static str,
}
impl Default for AddRequestUri {
	fn default() -> Self {
		Self { requests_dir: DEFAULT_REQUESTS_DIR }
	}
}
impl RequestArgumentProcessor for AddRequestUri {
	fn name(&self) -> &'static str {
		"AddRequestUri"
	}

	fn verifications(&self) -> &'static [(&'static str, ParamRule)] {
		&[("request_uris", ParamRule::StringList)]
	}

	fn process(&self, args: &mut Claims, context: &ContextSnapshot) -> Result<(), ArgumentError> {
		if args.contains_key("request_uris") || context.base_url.is_none() {
			return Ok(());
		}

		let uris = context.generate_request_uris(self.requests_dir).map_err(|e| match e {
			ContextError::Missing { field } =>
				ArgumentError::MissingContext { processor: self.name(), key: field },
			_ => ArgumentError::MissingContext { processor: self.name(), key: "request_uris" },
		})?;

		args.insert("request_uris".into(), Value::Array(uris.into_iter().map(Value::String).collect()));

		Ok(())
	}
}

#[cfg(test)]
mod tests {
	// crates.io
	use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
	use serde_json::json;
	use sha2::{Digest, Sha256};
	// self
	use super::*;

	fn context(base_url: Option<&str>, issuer: Option<&str>) -> ContextSnapshot {
		ContextSnapshot {
			base_url: base_url.map(Into::into),
			issuer: issuer.map(Into::into),
			..Default::default()
		}
	}

	#[test]
	fn request_uri_is_derived_from_base_url_and_issuer() {
		let mut args = Claims::new();

		AddRequestUri::default()
			.process(&mut args, &context(Some("https://rp.example.com/"), Some("https://op.example.com")))
			.expect("AddRequestUri should succeed.");

		let digest = URL_SAFE_NO_PAD.encode(Sha256::digest(b"https://op.example.com"));

		assert_eq!(
			args.get("request_uris"),
			Some(&json!([format!("https://rp.example.com/requests/{digest}")]))
		);
	}

	#[test]
	fn clients_without_a_base_url_are_skipped() {
		let mut args = Claims::new();

		AddRequestUri::default()
			.process(&mut args, &context(None, Some("https://op.example.com")))
			.expect("A missing base URL is not an error.");

		assert!(args.is_empty());
	}

	#[test]
	fn caller_values_are_kept() {
		let mut args = Claims::from_iter([("request_uris".into(), json!(["https://rp.example.com/r"]))]);

		AddRequestUri::default()
			.process(&mut args, &context(Some("https://rp.example.com"), Some("https://op.example.com")))
			.expect("AddRequestUri should succeed.");

		assert_eq!(args.get("request_uris"), Some(&json!(["https://rp.example.com/r"])));
	}

	#[test]
	fn missing_issuer_names_the_processor() {
		let err = AddRequestUri::default()
			.process(&mut Claims::new(), &context(Some("https://rp.example.com"), None))
			.expect_err("An issuer is needed to derive request URIs.");

		assert!(matches!(
			err,
			ArgumentError::MissingContext { processor: "AddRequestUri", key: "issuer" }
		));
	}
}
