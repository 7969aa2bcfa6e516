//! Transport-facing value types produced and consumed by the engine.
//!
//! The engine never opens a socket. [`HttpArguments`] describes the request a caller must send
//! and can be converted into an [`oauth2::HttpRequest`] so any `oauth2`-compatible transport can
//! dispatch it. [`url_info`] performs the inverse shaping for redirect callbacks, picking the
//! protocol parameters out of a full callback URL.

// crates.io
use base64::{Engine as _, engine::general_purpose::STANDARD};
use oauth2::http::{
	HeaderMap, HeaderValue, Method,
	header::{AUTHORIZATION, CONTENT_TYPE},
};
use url::form_urlencoded;
// self
use crate::{_prelude::*, error::ConfigError};

/// Content type attached to URL-encoded bodies.
pub const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";
/// Content type attached to JSON bodies.
pub const JSON_CONTENT_TYPE: &str = "application/json";

/// HTTP methods the engine emits.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
	#[default]
	/// Parameters travel in the query string.
	Get,
	/// Parameters travel in the body.
	Post,
}
impl HttpMethod {
	/// Returns the canonical method token.
	pub const fn as_str(self) -> &'static str {
		match self {
			HttpMethod::Get => "GET",
			HttpMethod::Post => "POST",
		}
	}
}
impl Display for HttpMethod {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}
impl FromStr for HttpMethod {
	type Err = String;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		if s.eq_ignore_ascii_case("GET") {
			Ok(HttpMethod::Get)
		} else if s.eq_ignore_ascii_case("POST") {
			Ok(HttpMethod::Post)
		} else {
			Err(s.to_owned())
		}
	}
}
impl From<HttpMethod> for Method {
	fn from(value: HttpMethod) -> Self {
		match value {
			HttpMethod::Get => Method::GET,
			HttpMethod::Post => Method::POST,
		}
	}
}

/// Wire representations of protocol messages.
///
/// Only [`UrlEncoded`](Self::UrlEncoded) and [`Json`](Self::Json) are handled by the engine;
/// [`Jwt`](Self::Jwt) is recognized so configurations can name it, and is rejected with
/// [`Error::UnsupportedFormat`] wherever it reaches a serializer.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SerializationType {
	#[default]
	/// `application/x-www-form-urlencoded`.
	UrlEncoded,
	/// `application/json`.
	Json,
	/// Signed request objects.
	Jwt,
}
impl SerializationType {
	/// Returns the stable label for the serialization type.
	pub const fn as_str(self) -> &'static str {
		match self {
			SerializationType::UrlEncoded => "urlencoded",
			SerializationType::Json => "json",
			SerializationType::Jwt => "jwt",
		}
	}

	/// Content type for bodies in this representation, if the engine can produce them.
	pub fn content_type(self) -> Result<&'static str> {
		match self {
			SerializationType::UrlEncoded => Ok(FORM_CONTENT_TYPE),
			SerializationType::Json => Ok(JSON_CONTENT_TYPE),
			other => Err(Error::unsupported_format(other)),
		}
	}
}
impl Display for SerializationType {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}
impl FromStr for SerializationType {
	type Err = Error;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		let lowered = s.to_ascii_lowercase().replace(['-', '_'], "");

		match lowered.as_str() {
			"urlencoded" => Ok(SerializationType::UrlEncoded),
			"json" => Ok(SerializationType::Json),
			"jwt" => Ok(SerializationType::Jwt),
			_ => Err(Error::UnsupportedFormat { format: s.to_owned() }),
		}
	}
}

/// Client authentication methods applied when assembling a request.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClientAuthMethod {
	#[default]
	/// No client authentication.
	None,
	/// HTTP Basic with `client_id`/`client_secret`.
	ClientSecretBasic,
	/// Body parameters for `client_id`/`client_secret`.
	ClientSecretPost,
}
impl ClientAuthMethod {
	/// Returns the registration metadata identifier for the method.
	pub const fn as_str(self) -> &'static str {
		match self {
			ClientAuthMethod::None => "none",
			ClientAuthMethod::ClientSecretBasic => "client_secret_basic",
			ClientAuthMethod::ClientSecretPost => "client_secret_post",
		}
	}
}
impl Display for ClientAuthMethod {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}
impl FromStr for ClientAuthMethod {
	type Err = String;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s {
			"" | "none" | "NONE" => Ok(ClientAuthMethod::None),
			"client_secret_basic" | "CLIENT_SECRET_BASIC" => Ok(ClientAuthMethod::ClientSecretBasic),
			"client_secret_post" | "CLIENT_SECRET_POST" => Ok(ClientAuthMethod::ClientSecretPost),
			other => Err(other.to_owned()),
		}
	}
}

/// Fully shaped outbound request handed to the caller's transport.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HttpArguments {
	/// HTTP method.
	pub method: HttpMethod,
	/// Target URL; carries the encoded parameters for `GET`.
	pub url: Url,
	/// Serialized body for `POST`.
	pub body: Option<String>,
	/// Headers the caller must send.
	pub headers: HeaderMap,
	/// Correlation key recorded for this exchange, when the service opened one.
	pub state: Option<String>,
}
impl HttpArguments {
	pub(crate) fn get(url: Url) -> Self {
		Self { method: HttpMethod::Get, url, body: None, headers: HeaderMap::new(), state: None }
	}

	pub(crate) fn post(url: Url, body: String, content_type: &'static str) -> Self {
		let mut headers = HeaderMap::new();

		headers.insert(CONTENT_TYPE, HeaderValue::from_static(content_type));

		Self { method: HttpMethod::Post, url, body: Some(body), headers, state: None }
	}

	pub(crate) fn with_basic_auth(mut self, client_id: &str, client_secret: &str) -> Result<Self> {
		let value = basic_authorization(client_id, client_secret);
		let value = HeaderValue::from_str(&value)
			.map_err(|_| ConfigError::InvalidHeader { name: "authorization" })?;

		self.headers.insert(AUTHORIZATION, value);

		Ok(self)
	}

	/// Returns the `Content-Type` header, if one was attached.
	pub fn content_type(&self) -> Option<&str> {
		self.headers.get(CONTENT_TYPE).and_then(|value| value.to_str().ok())
	}

	/// Converts the arguments into an [`oauth2::HttpRequest`] ready for dispatch.
	pub fn into_http_request(self) -> Result<oauth2::HttpRequest> {
		let mut builder =
			oauth2::http::Request::builder().method(Method::from(self.method)).uri(self.url.as_str());

		if let Some(headers) = builder.headers_mut() {
			*headers = self.headers;
		}

		let body = self.body.map(String::into_bytes).unwrap_or_default();

		Ok(builder.body(body).map_err(ConfigError::from)?)
	}
}

/// Picks the protocol parameters out of a response or callback.
///
/// Full URLs yield their query component, or the fragment when the query is empty. Input that
/// does not parse as an absolute URL is treated as a bare encoded body. Returns `None` when no
/// parameters are present at all.
pub fn url_info(input: &str) -> Option<String> {
	let trimmed = input.trim();

	if trimmed.is_empty() {
		return None;
	}

	let info = match Url::parse(trimmed) {
		Ok(url) if url.has_host() || url.query().is_some() || url.fragment().is_some() => url
			.query()
			.filter(|query| !query.is_empty())
			.or_else(|| url.fragment())
			.map(str::to_owned),
		_ => Some(trimmed.trim_start_matches(['?', '#']).to_owned()),
	};

	info.filter(|value| !value.is_empty())
}

fn basic_authorization(client_id: &str, client_secret: &str) -> String {
	let id: String = form_urlencoded::byte_serialize(client_id.as_bytes()).collect();
	let secret: String = form_urlencoded::byte_serialize(client_secret.as_bytes()).collect();

	format!("Basic {}", STANDARD.encode(format!("{id}:{secret}")))
}
