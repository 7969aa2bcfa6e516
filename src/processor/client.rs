//! Processors that copy client registration data out of the service context.

// self
use crate::{
	_prelude::*,
	context::ContextSnapshot,
	error::ArgumentError,
	message::ParamRule,
	processor::RequestArgumentProcessor,
};

/// Fills `client_id` from the context.
#[derive(Clone, Copy, Debug, Default)]
pub struct AddClientId;
impl RequestArgumentProcessor for AddClientId {
	fn name(&self) -> &'static str {
		"AddClientId"
	}

	fn verifications(&self) -> &'static [(&'static str, ParamRule)] {
		&[("client_id", ParamRule::SingleString)]
	}

	fn process(&self, args: &mut Claims, context: &ContextSnapshot) -> Result<(), ArgumentError> {
		if args.contains_key("client_id") {
			return Ok(());
		}

		let client_id = context
			.client_id
			.as_deref()
			.ok_or(ArgumentError::MissingContext { processor: self.name(), key: "client_id" })?;

		args.insert("client_id".into(), Value::String(client_id.to_owned()));

		Ok(())
	}
}

/// Copies client preferences into a registration request.
#[derive(Clone, Copy, Debug, Default)]
pub struct AddClientBehaviourPreference;
impl RequestArgumentProcessor for AddClientBehaviourPreference {
	fn name(&self) -> &'static str {
		"AddClientBehaviourPreference"
	}

	fn process(&self, args: &mut Claims, context: &ContextSnapshot) -> Result<(), ArgumentError> {
		for (key, value) in &context.client_preferences {
			args.entry(key.as_str()).or_insert_with(|| value.clone());
		}

		Ok(())
	}
}

/// Publishes the client's keys: `jwks_uri` when configured, else the key jar's public set.
#[derive(Clone, Copy, Debug, Default)]
pub struct AddJwksUriOrJwks;
impl RequestArgumentProcessor for AddJwksUriOrJwks {
	fn name(&self) -> &'static str {
		"AddJwksUriOrJwks"
	}

	fn verifications(&self) -> &'static [(&'static str, ParamRule)] {
		&[("jwks_uri", ParamRule::SingleString), ("jwks", ParamRule::Object)]
	}

	fn process(&self, args: &mut Claims, context: &ContextSnapshot) -> Result<(), ArgumentError> {
		if args.contains_key("jwks_uri") || args.contains_key("jwks") {
			return Ok(());
		}

		if let Some(url) = context.jwks_uri.as_ref() {
			args.insert("jwks_uri".into(), Value::String(url.to_string()));
		} else if let Some(jwks) = context.key_jar.as_ref().and_then(|jar| jar.public_jwks()) {
			args.insert("jwks".into(), jwks);
		}

		Ok(())
	}
}

#[cfg(test)]
mod tests {
	// crates.io
	use serde_json::json;
	// self
	use super::*;
	use crate::context::{KeyJar, KeyJarHandle};

	#[derive(Debug)]
	struct PublishingJar;
	impl KeyJar for PublishingJar {
		fn has_keys_for(&self, _: &str) -> bool {
			true
		}

		fn public_jwks(&self) -> Option<Value> {
			Some(json!({ "keys": [] }))
		}
	}

	#[test]
	fn client_id_requires_context() {
		let err = AddClientId
			.process(&mut Claims::new(), &ContextSnapshot::default())
			.expect_err("Missing client_id must be reported.");

		assert!(matches!(err, ArgumentError::MissingContext { processor: "AddClientId", .. }));

		let context = ContextSnapshot { client_id: Some("client".into()), ..Default::default() };
		let mut args = Claims::new();

		AddClientId.process(&mut args, &context).expect("AddClientId should succeed.");

		assert_eq!(args.get("client_id"), Some(&json!("client")));
	}

	#[test]
	fn preferences_fill_only_absent_keys() {
		let context = ContextSnapshot {
			client_preferences: Claims::from_iter([
				("client_name".into(), json!("rp")),
				("application_type".into(), json!("web")),
			]),
			..Default::default()
		};
		let mut args = Claims::from_iter([("client_name".into(), json!("caller"))]);

		AddClientBehaviourPreference
			.process(&mut args, &context)
			.expect("AddClientBehaviourPreference should succeed.");

		assert_eq!(args.get("client_name"), Some(&json!("caller")));
		assert_eq!(args.get("application_type"), Some(&json!("web")));
	}

	#[test]
	fn jwks_uri_wins_over_key_jar() {
		let jar: KeyJarHandle = Arc::new(PublishingJar);
		let mut context = ContextSnapshot { key_jar: Some(jar), ..Default::default() };
		let mut args = Claims::new();

		AddJwksUriOrJwks.process(&mut args, &context).expect("AddJwksUriOrJwks should succeed.");

		assert_eq!(args.get("jwks"), Some(&json!({ "keys": [] })));

		context.jwks_uri =
			Some(Url::parse("https://rp.example.com/jwks").expect("Fixture URL should parse."));

		let mut args = Claims::new();

		AddJwksUriOrJwks.process(&mut args, &context).expect("AddJwksUriOrJwks should succeed.");

		assert_eq!(args.get("jwks_uri"), Some(&json!("https://rp.example.com/jwks")));
		assert!(!args.contains_key("jwks"));
	}
}
