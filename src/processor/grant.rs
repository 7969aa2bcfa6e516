//! Grant type defaults for token requests.

// self
use crate::{
	_prelude::*,
	context::ContextSnapshot,
	error::ArgumentError,
	message::ParamRule,
	processor::RequestArgumentProcessor,
};

/// Defaults `grant_type` to the authorization-code grant.
#[derive(Clone, Copy, Debug, Default)]
pub struct AddGrantType;
impl RequestArgumentProcessor for AddGrantType {
	fn name(&self) -> &'static str {
		"AddGrantType"
	}

	fn verifications(&self) -> &'static [(&'static str, ParamRule)] {
		&[("grant_type", ParamRule::SingleString)]
	}

	fn process(&self, args: &mut Claims, _: &ContextSnapshot) -> Result<(), ArgumentError> {
		args.entry("grant_type").or_insert_with(|| Value::String("authorization_code".into()));

		Ok(())
	}
}
