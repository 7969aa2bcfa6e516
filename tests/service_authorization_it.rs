mod common;

// std
use std::sync::Arc;
// crates.io
use serde_json::json;
use time::Duration;
// self
use common::*;
use oidc_rp::{
	context::ServiceContext,
	error::{ConfigError, CorrelationError, Error, VerificationError},
	http::{FORM_CONTENT_TYPE, HttpMethod},
	service::Authorization,
	store::{CorrelationStore, MemoryStore},
};

fn service(store: &Arc<MemoryStore>) -> Authorization {
	Authorization::new(registered(), store.clone())
}

fn callback(query: &str) -> String {
	format!("{REDIRECT_URI}?{query}")
}

#[test]
fn get_request_carries_parameters_in_the_query() {
	let store = Arc::new(MemoryStore::new());
	let service =
		service(&store).configure(|config| config.with_endpoint(url("https://www.example.com/authorize")));
	let request = service
		.build_request(claims(json!({
			"redirect_uri": "https://example.com/cb",
			"scope": "openid info",
		})))
		.expect("Authorization request should build.");
	let query = request.url.query().expect("GET requests carry a query.");

	assert_eq!(request.method, HttpMethod::Get);
	assert!(request.url.as_str().starts_with("https://www.example.com/authorize"));
	assert!(query.contains("scope=openid+info"), "Unexpected query: {query}.");
	assert!(query.contains("redirect_uri=https%3A%2F%2Fexample.com%2Fcb"), "Unexpected query: {query}.");
	assert!(query.contains("response_type=code"));
	assert!(query.contains(&format!("client_id={CLIENT_ID}")));
	assert!(request.body.is_none());

	let state = request.state.expect("Authorization requests open a correlation entry.");
	let session = store
		.get(&state)
		.expect("Store lookup should succeed.")
		.expect("Session should be recorded under the state.");

	assert!(session.nonce.is_some());
	assert_eq!(session.redirect_uri.as_deref(), Some("https://example.com/cb"));
	assert_eq!(session.scope.as_deref(), Some("openid info"));
}

#[test]
fn explicit_post_hint_overrides_the_default_method() {
	let store = Arc::new(MemoryStore::new());
	let request = service(&store)
		.build_request(claims(json!({ "http_method": "POST" })))
		.expect("Authorization request should build.");
	let body = request.body.as_deref().expect("POST requests carry a body.");

	assert_eq!(request.method, HttpMethod::Post);
	assert_eq!(request.content_type(), Some(FORM_CONTENT_TYPE));
	assert!(request.url.query().is_none());
	assert!(body.contains("scope=openid"));
	assert!(!body.contains("http_method"), "Transport hints must not reach the wire.");
}

#[test]
fn missing_endpoint_is_a_configuration_error() {
	let context = ServiceContext::builder()
		.issuer(ISSUER)
		.client_id(CLIENT_ID)
		.redirect_uri(url(REDIRECT_URI))
		.build()
		.expect("Context without endpoints should build.");
	let store = Arc::new(MemoryStore::new());
	let err = Authorization::new(context, store.clone())
		.build_request(Default::default())
		.expect_err("Missing endpoint must be rejected.");

	assert!(matches!(
		err,
		Error::Config(ConfigError::MissingEndpoint { endpoint: "authorization_endpoint" })
	));
	assert!(store.is_empty(), "Failed builds must not open correlation entries.");
}

#[test]
fn missing_client_id_names_the_processor() {
	let context = unregistered().build().expect("Unregistered context should build.");
	let err = Authorization::new(context, Arc::new(MemoryStore::new()))
		.build_request(Default::default())
		.expect_err("Missing client_id must be rejected.");

	assert!(err.to_string().contains("AddClientId"), "Unexpected error: {err}.");
}

#[test]
fn callback_is_verified_and_consumes_the_session_once() {
	let store = Arc::new(MemoryStore::new());
	let service = service(&store);
	let request = service.build_request(Default::default()).expect("Request should build.");
	let state = request.state.expect("State should be recorded.");
	let body = callback(&format!("code=abc&state={state}&iss=https%3A%2F%2Fop.example.com"));
	let verified = service.parse_response(&body, None, None).expect("Callback should verify.");

	assert_eq!(verified.get_str("code"), Some("abc"));
	assert_eq!(verified.state(), Some(state.as_str()));
	assert!(verified.session().and_then(|session| session.nonce.as_ref()).is_some());
	assert_eq!(verified.token_request_args().get("code"), Some(&json!("abc")));
	assert!(store.is_empty());

	let err = service
		.parse_response(&body, None, None)
		.expect_err("A replayed callback must be rejected.");

	assert!(matches!(err, Error::Correlation(CorrelationError::UnknownState { .. })));
}

#[test]
fn failed_verification_discards_the_session() {
	let store = Arc::new(MemoryStore::new());
	let service = service(&store);
	let state = service
		.build_request(Default::default())
		.expect("Request should build.")
		.state
		.expect("State should be recorded.");
	let body = callback(&format!("code=abc&state={state}&iss=https%3A%2F%2Fevil.example.com"));
	let err = service.parse_response(&body, None, None).expect_err("Foreign issuer must be rejected.");

	assert!(matches!(err, Error::Verification(VerificationError::Rejected)));
	assert!(store.is_empty(), "Rejected exchanges must not stay replayable.");
}

#[test]
fn provider_errors_surface_as_typed_errors() {
	let store = Arc::new(MemoryStore::new());
	let service = service(&store);
	let state = service
		.build_request(Default::default())
		.expect("Request should build.")
		.state
		.expect("State should be recorded.");
	let body = callback(&format!("error=access_denied&error_description=nope&state={state}"));
	let err = service.parse_response(&body, None, None).expect_err("Errors are never data.");

	assert!(matches!(
		err,
		Error::ErrorResponse { ref error, ref description, .. }
			if error == "access_denied" && description.as_deref() == Some("nope")
	));
	assert!(store.is_empty());
}

#[test]
fn absent_parameters_are_a_missing_response() {
	let store = Arc::new(MemoryStore::new());
	let service = service(&store);

	for body in ["", "   ", REDIRECT_URI] {
		let err = service.parse_response(body, None, None).expect_err("No parameters, no response.");

		assert!(matches!(err, Error::MissingResponse), "Unexpected error for `{body}`: {err}.");
	}
}

#[test]
fn mismatched_state_is_rejected() {
	let store = Arc::new(MemoryStore::new());
	let service = service(&store);
	let state = service
		.build_request(Default::default())
		.expect("Request should build.")
		.state
		.expect("State should be recorded.");
	let err = service
		.parse_response(&callback("code=abc&state=other"), None, Some(&state))
		.expect_err("State mismatch must be rejected.");

	assert!(matches!(err, Error::Correlation(CorrelationError::StateMismatch { .. })));
	assert!(store.is_empty());
}

#[test]
fn expired_sessions_cannot_be_consumed() {
	let store = Arc::new(MemoryStore::new());
	let service = service(&store).configure(|config| config.with_session_ttl(Duration::ZERO));
	let state = service
		.build_request(Default::default())
		.expect("Request should build.")
		.state
		.expect("State should be recorded.");
	let body = callback(&format!("code=abc&state={state}&iss=https%3A%2F%2Fop.example.com"));
	let err = service.parse_response(&body, None, None).expect_err("Expired sessions must be refused.");

	assert!(matches!(err, Error::Correlation(CorrelationError::UnknownState { ref key }) if *key == state));
	assert!(store.is_empty());
}

#[test]
fn abandoned_requests_do_not_grow_the_store() {
	let store = Arc::new(MemoryStore::new());
	let service = service(&store).configure(|config| config.with_session_ttl(Duration::ZERO));

	for _ in 0..5_000 {
		service.build_request(Default::default()).expect("Request should build.");
	}

	assert!(store.len() <= 16, "Abandoned sessions piled up: {}.", store.len());
}

#[test]
fn client_secret_post_is_refused_over_get() {
	let store = Arc::new(MemoryStore::new());
	let err = service(&store)
		.build_request(claims(json!({ "authn_method": "client_secret_post" })))
		.expect_err("Secrets must never travel in a query string.");

	assert!(matches!(err, Error::Config(ConfigError::SecretInQuery { service: "authorization" })));
	assert!(store.is_empty());
}
