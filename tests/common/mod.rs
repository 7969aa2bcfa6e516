#![allow(dead_code)]

// std
use std::sync::Arc;
// crates.io
use serde_json::{Map, Value};
// self
use oidc_rp::{
	context::{EndpointName, KeyJar, ServiceContext, ServiceContextBuilder},
	message::Claims,
	url::Url,
};

pub const ISSUER: &str = "https://op.example.com";
pub const CLIENT_ID: &str = "client-it";
pub const CLIENT_SECRET: &str = "secret-it";
pub const REDIRECT_URI: &str = "https://rp.example.com/cb";

#[derive(Debug)]
pub struct IssuerKeyJar;
impl KeyJar for IssuerKeyJar {
	fn has_keys_for(&self, owner: &str) -> bool {
		owner == ISSUER
	}
}

pub fn url(value: &str) -> Url {
	Url::parse(value).expect("URL fixture should parse successfully.")
}

pub fn claims(value: Value) -> Claims {
	match value {
		Value::Object(map) => map,
		_ => Map::new(),
	}
}

/// Builder for a client that is registered at the fixture provider, minus its credentials.
pub fn unregistered() -> ServiceContextBuilder {
	ServiceContext::builder()
		.issuer(ISSUER)
		.redirect_uri(url(REDIRECT_URI))
		.preference("response_types", serde_json::json!(["code"]))
		.endpoint(EndpointName::Authorization, url("https://op.example.com/authorize"))
		.endpoint(EndpointName::Token, url("https://op.example.com/token"))
		.endpoint(EndpointName::Registration, url("https://op.example.com/register"))
		.key_jar(Arc::new(IssuerKeyJar))
}

pub fn registered() -> ServiceContext {
	unregistered()
		.client_id(CLIENT_ID)
		.client_secret(CLIENT_SECRET)
		.build()
		.expect("Registered fixture context should build successfully.")
}
