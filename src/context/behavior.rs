//! Negotiates the client behavior actually in effect for a provider.

// self
use crate::_prelude::*;

/// Client preference keys paired with the provider metadata that constrains them.
const PREFERENCE_CAPABILITIES: &[(&str, &str)] = &[
	("response_types", "response_types_supported"),
	("grant_types", "grant_types_supported"),
	("scope", "scopes_supported"),
	("subject_type", "subject_types_supported"),
	("token_endpoint_auth_method", "token_endpoint_auth_methods_supported"),
	("id_token_signed_response_alg", "id_token_signing_alg_values_supported"),
	("userinfo_signed_response_alg", "userinfo_signing_alg_values_supported"),
	("request_object_signing_alg", "request_object_signing_alg_values_supported"),
];

/// Discovery defaults for capabilities a provider may leave out of its metadata.
const CAPABILITY_DEFAULTS: &[(&str, &[&str])] = &[
	("grant_types_supported", &["authorization_code", "implicit"]),
	("token_endpoint_auth_methods_supported", &["client_secret_basic"]),
];

/// Merges client preferences with provider capabilities.
///
/// Preferences whose capability the provider advertises (or has a discovery default for) are
/// narrowed to the supported values; list preferences keep their order, `scope` keeps the
/// supported tokens, and a single value is dropped when unsupported. Everything else passes
/// through unchanged. Without provider metadata the preferences are returned as-is.
pub fn negotiate_behavior(preferences: &Claims, provider_info: Option<&Claims>) -> Claims {
	let Some(provider_info) = provider_info else {
		return preferences.clone();
	};
	let mut behavior = Claims::new();

	for (key, preferred) in preferences {
		let Some(supported) = capability_for(key, provider_info) else {
			behavior.insert(key.clone(), preferred.clone());

			continue;
		};

		if let Some(value) = narrow(key, preferred, &supported) {
			behavior.insert(key.clone(), value);
		}
	}

	behavior
}

fn capability_for(key: &str, provider_info: &Claims) -> Option<Vec<String>> {
	let (_, capability) = PREFERENCE_CAPABILITIES.iter().find(|(pref, _)| *pref == key)?;

	if let Some(Value::Array(values)) = provider_info.get(*capability) {
		return Some(values.iter().filter_map(Value::as_str).map(str::to_owned).collect());
	}

	CAPABILITY_DEFAULTS
		.iter()
		.find(|(name, _)| name == capability)
		.map(|(_, values)| values.iter().map(|value| (*value).to_owned()).collect())
}

fn narrow(key: &str, preferred: &Value, supported: &[String]) -> Option<Value> {
	match preferred {
		Value::Array(items) => {
			let kept = items
				.iter()
				.filter(|item| item.as_str().is_some_and(|value| is_supported(value, supported)))
				.cloned()
				.collect::<Vec<_>>();

			(!kept.is_empty()).then_some(Value::Array(kept))
		},
		Value::String(value) if key == "scope" => {
			let kept = value
				.split_whitespace()
				.filter(|token| supported.iter().any(|s| s == token))
				.collect::<Vec<_>>();

			(!kept.is_empty()).then(|| Value::String(kept.join(" ")))
		},
		Value::String(value) => is_supported(value, supported).then(|| preferred.clone()),
		_ => Some(preferred.clone()),
	}
}

// Response types compare as token sets: `id_token code` matches `code id_token`.
fn is_supported(value: &str, supported: &[String]) -> bool {
	let mut wanted = value.split_whitespace().collect::<Vec<_>>();

	wanted.sort_unstable();

	supported.iter().any(|candidate| {
		let mut offered = candidate.split_whitespace().collect::<Vec<_>>();

		offered.sort_unstable();

		offered == wanted
	})
}

#[cfg(test)]
mod tests {
	// crates.io
	use serde_json::json;
	// self
	use super::*;

	fn claims(value: Value) -> Claims {
		match value {
			Value::Object(map) => map,
			_ => panic!("Claim fixtures must be JSON objects."),
		}
	}

	#[test]
	fn preferences_pass_through_without_provider_metadata() {
		let preferences = claims(json!({ "response_types": ["code"], "client_name": "rp" }));

		assert_eq!(negotiate_behavior(&preferences, None), preferences);
	}

	#[test]
	fn provider_capabilities_narrow_preferences() {
		let preferences = claims(json!({
			"response_types": ["code", "id_token code", "token"],
			"scope": "openid email phone",
			"token_endpoint_auth_method": "private_key_jwt",
			"client_name": "rp",
		}));
		let provider = claims(json!({
			"response_types_supported": ["code", "code id_token"],
			"scopes_supported": ["openid", "email"],
		}));
		let behavior = negotiate_behavior(&preferences, Some(&provider));

		assert_eq!(behavior.get("response_types"), Some(&json!(["code", "id_token code"])));
		assert_eq!(behavior.get("scope"), Some(&json!("openid email")));
		// Defaults to `client_secret_basic` when the provider is silent.
		assert!(!behavior.contains_key("token_endpoint_auth_method"));
		assert_eq!(behavior.get("client_name"), Some(&json!("rp")));
	}
}
