//! Parameter shape rules shared by message schemas and request-argument processors.

// self
use crate::{_prelude::*, message::MessageError};

/// Shape expectation for a single protocol parameter.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ParamRule {
	/// One string value.
	SingleString,
	/// Space-separated list of strings (`scope`, `response_type`); canonical form is one string.
	SpaceSeparatedList,
	/// List of strings (`redirect_uris`); canonical form is a JSON array.
	StringList,
	/// Integer value (`expires_in`, `max_age`).
	Integer,
	/// Boolean value.
	Boolean,
	/// JSON object (`claims`, `jwks`).
	Object,
	/// Any value; unknown parameters fall back to this rule.
	Any,
}
impl ParamRule {
	/// Human-readable description used in error messages.
	pub const fn describe(self) -> &'static str {
		match self {
			ParamRule::SingleString => "a single string",
			ParamRule::SpaceSeparatedList => "an optional space-separated list of strings",
			ParamRule::StringList => "a list of strings",
			ParamRule::Integer => "an integer",
			ParamRule::Boolean => "a boolean",
			ParamRule::Object => "a JSON object",
			ParamRule::Any => "any value",
		}
	}

	/// Returns `true` when `value` can be brought into this rule's canonical form.
	pub fn accepts(self, value: &Value) -> bool {
		self.normalize(value.clone()).is_some()
	}

	/// Converts `value` into the canonical form, or `None` when the shape does not fit.
	pub fn normalize(self, value: Value) -> Option<Value> {
		match (self, value) {
			(ParamRule::Any, value) => Some(value),
			(ParamRule::SingleString, Value::String(s)) => Some(Value::String(s)),
			(ParamRule::SingleString, Value::Number(n)) => Some(Value::String(n.to_string())),
			(ParamRule::SpaceSeparatedList, Value::String(s)) => Some(Value::String(s)),
			(ParamRule::SpaceSeparatedList, Value::Array(items)) =>
				strings(items).map(|items| Value::String(items.join(" "))),
			(ParamRule::StringList, Value::String(s)) => Some(Value::Array(vec![Value::String(s)])),
			(ParamRule::StringList, Value::Array(items)) =>
				strings(items).map(|items| items.into_iter().map(Value::String).collect()),
			(ParamRule::Integer, Value::Number(n)) if n.is_i64() || n.is_u64() =>
				Some(Value::Number(n)),
			(ParamRule::Integer, Value::String(s)) => s.trim().parse::<i64>().ok().map(Value::from),
			(ParamRule::Boolean, Value::Bool(b)) => Some(Value::Bool(b)),
			(ParamRule::Boolean, Value::String(s)) => match s.as_str() {
				"true" => Some(Value::Bool(true)),
				"false" => Some(Value::Bool(false)),
				_ => None,
			},
			(ParamRule::Object, Value::Object(map)) => Some(Value::Object(map)),
			(ParamRule::Object, Value::String(s)) => match serde_json::from_str(&s) {
				Ok(Value::Object(map)) => Some(Value::Object(map)),
				_ => None,
			},
			_ => None,
		}
	}

	/// Renders a canonical value as one or more URL-encoding pair values.
	pub(crate) fn encode(self, value: &Value) -> Vec<String> {
		match value {
			Value::Null => Vec::new(),
			Value::String(s) => vec![s.clone()],
			Value::Bool(b) => vec![b.to_string()],
			Value::Number(n) => vec![n.to_string()],
			Value::Array(items) if self == ParamRule::SpaceSeparatedList => {
				let joined = items.iter().flat_map(|item| self.encode(item)).collect::<Vec<_>>();

				vec![joined.join(" ")]
			},
			Value::Array(items) if items.iter().all(is_scalar) =>
				items.iter().flat_map(|item| self.encode(item)).collect(),
			other => vec![other.to_string()],
		}
	}

	/// Rebuilds a canonical value from the pair values collected for `name`.
	pub(crate) fn decode(self, name: &str, mut values: Vec<String>) -> Result<Value, MessageError> {
		match self {
			ParamRule::StringList => Ok(values.into_iter().map(Value::String).collect()),
			ParamRule::Any if values.len() > 1 =>
				Ok(values.into_iter().map(Value::String).collect()),
			_ if values.len() > 1 => Err(MessageError::DuplicateParameter { name: name.into() }),
			rule => {
				let raw = values.pop().unwrap_or_default();

				rule.normalize(Value::String(raw)).ok_or_else(|| MessageError::InvalidClaim {
					name: name.into(),
					expected: rule.describe(),
				})
			},
		}
	}
}

/// Declared parameter of a message schema.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ParamSpec {
	/// Parameter name.
	pub name: &'static str,
	/// Shape rule.
	pub rule: ParamRule,
	/// Whether the parameter must be present.
	pub required: bool,
}
impl ParamSpec {
	/// Declares an optional parameter.
	pub const fn optional(name: &'static str, rule: ParamRule) -> Self {
		Self { name, rule, required: false }
	}

	/// Declares a required parameter.
	pub const fn required(name: &'static str, rule: ParamRule) -> Self {
		Self { name, rule, required: true }
	}
}

/// Looks up the rule for `name`, falling back to [`ParamRule::Any`].
pub(crate) fn rule_for(schema: &[ParamSpec], name: &str) -> ParamRule {
	schema.iter().find(|spec| spec.name == name).map(|spec| spec.rule).unwrap_or(ParamRule::Any)
}

fn strings(items: Vec<Value>) -> Option<Vec<String>> {
	items
		.into_iter()
		.map(|item| match item {
			Value::String(s) => Some(s),
			_ => None,
		})
		.collect()
}

fn is_scalar(value: &Value) -> bool {
	matches!(value, Value::String(_) | Value::Number(_) | Value::Bool(_))
}
