//! Response-type defaulting.

// crates.io
use serde_json::json;
// self
use crate::{
	_prelude::*,
	context::ContextSnapshot,
	error::ArgumentError,
	message::ParamRule,
	processor::RequestArgumentProcessor,
};

/// Fills `response_type` with the first negotiated response type.
///
/// Leaves the mapping untouched when the behavior declares no response types.
#[derive(Clone, Copy, Debug, Default)]
pub struct AddResponseType;
impl RequestArgumentProcessor for AddResponseType {
	fn name(&self) -> &'static str {
		"AddResponseType"
	}

	fn verifications(&self) -> &'static [(&'static str, ParamRule)] {
		&[("response_type", ParamRule::SpaceSeparatedList)]
	}

	fn process(&self, args: &mut Claims, context: &ContextSnapshot) -> Result<(), ArgumentError> {
		if args.contains_key("response_type") {
			return Ok(());
		}

		let first = context
			.behavior_list("response_types")
			.and_then(|types| types.first().map(|value| (*value).to_owned()));

		if let Some(response_type) = first {
			args.insert("response_type".into(), Value::String(response_type));
		}

		Ok(())
	}
}

/// Fills a registration request's `response_types` from the client preferences.
#[derive(Clone, Copy, Debug, Default)]
pub struct AddOidcResponseTypes;
impl RequestArgumentProcessor for AddOidcResponseTypes {
	fn name(&self) -> &'static str {
		"AddOidcResponseTypes"
	}

	fn verifications(&self) -> &'static [(&'static str, ParamRule)] {
		&[("response_types", ParamRule::StringList)]
	}

	fn process(&self, args: &mut Claims, context: &ContextSnapshot) -> Result<(), ArgumentError> {
		if args.contains_key("response_types") {
			return Ok(());
		}

		let preferred = context
			.client_preferences
			.get("response_types")
			.and_then(|value| ParamRule::StringList.normalize(value.clone()))
			.unwrap_or_else(|| json!(["code"]));

		args.insert("response_types".into(), preferred);

		Ok(())
	}
}
