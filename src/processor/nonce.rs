//! Random value processors.

// crates.io
use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
// self
use crate::{
	_prelude::*,
	context::ContextSnapshot,
	error::ArgumentError,
	message::ParamRule,
	processor::RequestArgumentProcessor,
	store,
};

/// Byte length of generated nonces before encoding.
pub const NONCE_BYTES: usize = 32;

/// Adds a 256-bit random `nonce` when the caller did not supply one.
#[derive(Clone, Copy, Debug, Default)]
pub struct AddNonce;
impl RequestArgumentProcessor for AddNonce {
	fn name(&self) -> &'static str {
		"AddNonce"
	}

	fn verifications(&self) -> &'static [(&'static str, ParamRule)] {
		&[("response_type", ParamRule::SpaceSeparatedList)]
	}

	fn process(&self, args: &mut Claims, _: &ContextSnapshot) -> Result<(), ArgumentError> {
		if !args.contains_key("nonce") {
			args.insert("nonce".into(), Value::String(new_nonce()));
		}

		Ok(())
	}
}

/// Adds a fresh correlation key under `state`.
#[derive(Clone, Copy, Debug, Default)]
pub struct AddState;
impl RequestArgumentProcessor for AddState {
	fn name(&self) -> &'static str {
		"AddState"
	}

	fn verifications(&self) -> &'static [(&'static str, ParamRule)] {
		&[("state", ParamRule::SingleString)]
	}

	fn process(&self, args: &mut Claims, _: &ContextSnapshot) -> Result<(), ArgumentError> {
		if !args.contains_key("state") {
			args.insert("state".into(), Value::String(store::new_state_key()));
		}

		Ok(())
	}
}

fn new_nonce() -> String {
	URL_SAFE_NO_PAD.encode(rand::random::<[u8; NONCE_BYTES]>())
}

#[cfg(test)]
mod tests {
	// std
	use std::collections::HashSet;
	// crates.io
	use serde_json::json;
	// self
	use super::*;

	#[test]
	fn existing_nonce_is_left_unchanged() {
		let mut args = Claims::from_iter([("nonce".into(), json!("caller-nonce"))]);

		AddNonce.process(&mut args, &ContextSnapshot::default()).expect("AddNonce should succeed.");

		assert_eq!(args.get("nonce"), Some(&json!("caller-nonce")));
		assert_eq!(args.len(), 1);
	}

	#[test]
	fn generated_nonce_decodes_to_32_bytes() {
		let mut args = Claims::new();

		AddNonce.process(&mut args, &ContextSnapshot::default()).expect("AddNonce should succeed.");

		let nonce = args.get("nonce").and_then(Value::as_str).expect("Nonce should be a string.");
		let decoded = URL_SAFE_NO_PAD.decode(nonce).expect("Nonce should be URL-safe base64.");

		assert_eq!(decoded.len(), NONCE_BYTES);
		assert!(!nonce.contains(['+', '/', '=']));
	}

	#[test]
	fn generated_nonces_do_not_repeat() {
		let nonces = (0..10_000).map(|_| new_nonce()).collect::<HashSet<_>>();

		assert_eq!(nonces.len(), 10_000);
	}

	#[test]
	fn state_is_added_once() {
		let context = ContextSnapshot::default();
		let mut args = Claims::new();

		AddState.process(&mut args, &context).expect("AddState should succeed.");

		let first = args.get("state").cloned().expect("State should be generated.");

		AddState.process(&mut args, &context).expect("AddState should succeed.");

		assert_eq!(args.get("state"), Some(&first));
	}
}
