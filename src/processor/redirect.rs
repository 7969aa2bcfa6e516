//! Redirect URI processors.

// self
use crate::{
	_prelude::*,
	context::ContextSnapshot,
	error::ArgumentError,
	message::ParamRule,
	processor::RequestArgumentProcessor,
};

/// Fills `redirect_uri` with the first configured redirect URI.
#[derive(Clone, Copy, Debug, Default)]
pub struct AddRedirectUri;
impl RequestArgumentProcessor for AddRedirectUri {
	fn name(&self) -> &'static str {
		"AddRedirectUri"
	}

	fn verifications(&self) -> &'static [(&'static str, ParamRule)] {
		&[("redirect_uri", ParamRule::SingleString)]
	}

	fn process(&self, args: &mut Claims, context: &ContextSnapshot) -> Result<(), ArgumentError> {
		if args.contains_key("redirect_uri") {
			return Ok(());
		}

		let url = context
			.redirect_uris
			.first()
			.ok_or(ArgumentError::MissingContext { processor: self.name(), key: "redirect_uri" })?;

		args.insert("redirect_uri".into(), Value::String(url.to_string()));

		Ok(())
	}
}

/// Fills `redirect_uris` with every configured redirect URI.
#[derive(Clone, Copy, Debug, Default)]
pub struct AddRedirectUris;
impl RequestArgumentProcessor for AddRedirectUris {
	fn name(&self) -> &'static str {
		"AddRedirectUris"
	}

	fn verifications(&self) -> &'static [(&'static str, ParamRule)] {
		&[("redirect_uris", ParamRule::StringList)]
	}

	fn process(&self, args: &mut Claims, context: &ContextSnapshot) -> Result<(), ArgumentError> {
		if args.contains_key("redirect_uris") {
			return Ok(());
		}
		if context.redirect_uris.is_empty() {
			return Err(ArgumentError::MissingContext {
				processor: self.name(),
				key: "redirect_uris",
			});
		}

		args.insert("redirect_uris".into(), url_list(&context.redirect_uris));

		Ok(())
	}
}

/// Copies the configured post-logout redirect URIs when there are any.
#[derive(Clone, Copy, Debug, Default)]
pub struct AddPostLogoutRedirectUris;
impl RequestArgumentProcessor for AddPostLogoutRedirectUris {
	fn name(&self) -> &'static str {
		"AddPostLogoutRedirectUris"
	}

	fn verifications(&self) -> &'static [(&'static str, ParamRule)] {
		&[("post_logout_redirect_uris", ParamRule::StringList)]
	}

	fn process(&self, args: &mut Claims, context: &ContextSnapshot) -> Result<(), ArgumentError> {
		if !args.contains_key("post_logout_redirect_uris")
			&& !context.post_logout_redirect_uris.is_empty()
		{
			args.insert(
				"post_logout_redirect_uris".into(),
				url_list(&context.post_logout_redirect_uris),
			);
		}

		Ok(())
	}
}

fn url_list(urls: &[Url]) -> Value {
	urls.iter().map(|url| Value::String(url.to_string())).collect()
}

#[cfg(test)]
mod tests {
	// crates.io
	use serde_json::json;
	// self
	use super::*;

	fn context() -> ContextSnapshot {
		ContextSnapshot {
			redirect_uris: vec![
				Url::parse("https://rp.example.com/cb").expect("Fixture URL should parse."),
				Url::parse("https://rp.example.com/alt").expect("Fixture URL should parse."),
			],
			post_logout_redirect_uris: vec![
				Url::parse("https://rp.example.com/bye").expect("Fixture URL should parse."),
			],
			..Default::default()
		}
	}

	#[test]
	fn redirect_processors_copy_from_context() {
		let context = context();
		let mut args = Claims::new();

		AddRedirectUri.process(&mut args, &context).expect("AddRedirectUri should succeed.");
		AddRedirectUris.process(&mut args, &context).expect("AddRedirectUris should succeed.");

		assert_eq!(args.get("redirect_uri"), Some(&json!("https://rp.example.com/cb")));
		assert_eq!(
			args.get("redirect_uris"),
			Some(&json!(["https://rp.example.com/cb", "https://rp.example.com/alt"]))
		);
	}

	#[test]
	fn missing_redirect_uris_name_the_processor() {
		let err = AddRedirectUri
			.process(&mut Claims::new(), &ContextSnapshot::default())
			.expect_err("An empty context must be reported.");

		assert!(matches!(
			err,
			ArgumentError::MissingContext { processor: "AddRedirectUri", key: "redirect_uri" }
		));
	}

	#[test]
	fn post_logout_uris_are_copied_only_when_configured() {
		let mut args = Claims::new();

		AddPostLogoutRedirectUris
			.process(&mut args, &ContextSnapshot::default())
			.expect("AddPostLogoutRedirectUris should succeed.");

		assert!(args.is_empty());

		AddPostLogoutRedirectUris
			.process(&mut args, &context())
			.expect("AddPostLogoutRedirectUris should succeed.");

		assert_eq!(args.get("post_logout_redirect_uris"), Some(&json!(["https://rp.example.com/bye"])));

		let mut args = Claims::from_iter([("post_logout_redirect_uris".into(), json!(["mine"]))]);

		AddPostLogoutRedirectUris
			.process(&mut args, &context())
			.expect("AddPostLogoutRedirectUris should succeed.");

		assert_eq!(args.get("post_logout_redirect_uris"), Some(&json!(["mine"])));
	}
}
