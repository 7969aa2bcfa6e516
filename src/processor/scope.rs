//! Scope normalization.

// self
use crate::{
	_prelude::*,
	context::ContextSnapshot,
	error::ArgumentError,
	message::ParamRule,
	processor::{OverwritePolicy, RequestArgumentProcessor},
};

/// Normalizes `scope` so it always requests `openid`.
///
/// Caller order is preserved, duplicates are dropped, and `openid` is prepended when missing.
#[derive(Clone, Copy, Debug, Default)]
pub struct AddOpenIdScope;
impl RequestArgumentProcessor for AddOpenIdScope {
	fn name(&self) -> &'static str {
		"AddOpenIdScope"
	}

	fn policy(&self) -> OverwritePolicy {
		OverwritePolicy::AlwaysReplace
	}

	fn verifications(&self) -> &'static [(&'static str, ParamRule)] {
		&[("scope", ParamRule::SpaceSeparatedList)]
	}

	fn process(&self, args: &mut Claims, _: &ContextSnapshot) -> Result<(), ArgumentError> {
		let requested = args
			.get("scope")
			.and_then(|value| ParamRule::SpaceSeparatedList.normalize(value.clone()))
			.and_then(|value| value.as_str().map(str::to_owned))
			.unwrap_or_default();
		let mut tokens = Vec::<&str>::new();

		if !requested.split_whitespace().any(|token| token == "openid") {
			tokens.push("openid");
		}
		for token in requested.split_whitespace() {
			if !tokens.contains(&token) {
				tokens.push(token);
			}
		}

		args.insert("scope".into(), Value::String(tokens.join(" ")));

		Ok(())
	}
}

#[cfg(test)]
mod tests {
	// crates.io
	use serde_json::json;
	// self
	use super::*;

	fn scope_of(input: Option<Value>) -> Value {
		let mut args = Claims::new();

		if let Some(value) = input {
			args.insert("scope".into(), value);
		}

		AddOpenIdScope
			.process(&mut args, &ContextSnapshot::default())
			.expect("AddOpenIdScope should succeed.");

		args.remove("scope").expect("Scope should always be set.")
	}

	#[test]
	fn openid_is_always_requested() {
		assert_eq!(scope_of(None), json!("openid"));
		assert_eq!(scope_of(Some(json!("email"))), json!("openid email"));
		assert_eq!(scope_of(Some(json!("openid info"))), json!("openid info"));
		assert_eq!(scope_of(Some(json!(["email", "openid", "email"]))), json!("email openid"));
	}
}
