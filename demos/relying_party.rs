//! Walks a relying party through discovery, registration, authorization and the code exchange
//! against canned provider responses, printing what a real transport would send.

// std
use std::sync::Arc;
// crates.io
use color_eyre::Result;
use serde_json::json;
// self
use oidc_rp::{
	context::ServiceContext,
	http::HttpArguments,
	service::{AccessToken, Authorization, ProviderInfoDiscovery, Registration},
	store::MemoryStore,
	url::Url,
};

const ISSUER: &str = "https://provider.example.com";

fn main() -> Result<()> {
	color_eyre::install()?;

	let context = ServiceContext::builder()
		.issuer(ISSUER)
		.redirect_uri(Url::parse("https://app.example.com/oauth/callback")?)
		.preference("response_types", json!(["code"]))
		.preference("client_name", "demo-rp")
		.build()?;
	let discovery = ProviderInfoDiscovery::new(context.clone());

	show("discovery", &discovery.build_request(Default::default())?);
	discovery.parse_response(
		&json!({
			"issuer": ISSUER,
			"authorization_endpoint": "https://provider.example.com/authorize",
			"token_endpoint": "https://provider.example.com/token",
			"registration_endpoint": "https://provider.example.com/register",
			"jwks_uri": "https://provider.example.com/jwks",
			"response_types_supported": ["code", "id_token"],
			"subject_types_supported": ["public"],
			"id_token_signing_alg_values_supported": ["RS256"],
		})
		.to_string(),
		None,
		None,
	)?;

	let registration = Registration::new(context.clone());

	show("registration", &registration.build_request(Default::default())?);
	registration.parse_response(
		r#"{"client_id":"demo-client","client_secret":"demo-secret","client_secret_expires_at":0}"#,
		None,
		None,
	)?;

	let store = Arc::new(MemoryStore::new());
	let authorization = Authorization::new(context.clone(), store);
	let request = authorization.build_request(Default::default())?;

	show("authorization", &request);

	// Simulate the browser coming back to the redirect URI.
	let state = request.state.unwrap_or_default();
	let callback =
		format!("https://app.example.com/oauth/callback?code=demo-code&state={state}");
	let verified = authorization.parse_response(&callback, None, None)?;
	let token = AccessToken::new(context.clone());

	show("token", &token.build_request(verified.token_request_args())?);

	let tokens = token.parse_response(
		r#"{"access_token":"demo-access","token_type":"Bearer","expires_in":3600}"#,
		None,
		None,
	)?;

	println!("Access token: {}.", tokens.get_str("access_token").unwrap_or_default());
	println!("Final context: {:?}.", context.snapshot());

	Ok(())
}

fn show(label: &str, request: &HttpArguments) {
	println!("[{label}] {} {}", request.method, request.url);

	if let Some(body) = request.body.as_deref() {
		println!("[{label}] body: {body}");
	}
}
