//! Engine-level error types shared across services, processors, and stores.

// self
use crate::{_prelude::*, http::SerializationType};

/// Engine-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Canonical engine error exposed by public APIs.
///
/// Every variant is fatal to the call that produced it; the engine never retries and never
/// commits context updates once one of these has been raised.
#[derive(Debug, ThisError)]
pub enum Error {
	/// Required endpoint or context value is missing before a request can be built.
	#[error(transparent)]
	Config(#[from] ConfigError),
	/// Caller-supplied or synthesized arguments failed validation.
	#[error(transparent)]
	ArgumentProcessing(#[from] ArgumentError),
	/// Serialization type outside of URL-encoded and JSON.
	#[error("Serialization type `{format}` is not supported.")]
	UnsupportedFormat {
		/// Rejected serialization type label.
		format: String,
	},
	/// Response failed self-verification.
	#[error(transparent)]
	Verification(#[from] VerificationError),
	/// Deserialization produced no usable message.
	#[error("Response is missing or carries no protocol parameters.")]
	MissingResponse,
	/// Provider answered with an embedded OAuth error.
	#[error("Provider returned error `{error}`.")]
	ErrorResponse {
		/// OAuth `error` code.
		error: String,
		/// Optional `error_description`.
		description: Option<String>,
		/// Optional `error_uri`.
		uri: Option<String>,
	},
	/// Correlation state for the exchange is unknown or already consumed.
	#[error(transparent)]
	Correlation(#[from] CorrelationError),
	/// Correlation store failure.
	#[error("{0}")]
	Storage(
		#[from]
		#[source]
		crate::store::StoreError,
	),
}
impl Error {
	/// Builds an [`Error::UnsupportedFormat`] for the provided serialization type.
	pub fn unsupported_format(format: SerializationType) -> Self {
		Self::UnsupportedFormat { format: format.as_str().into() }
	}
}

/// Configuration failures raised before a request can be built.
#[derive(Debug, ThisError)]
pub enum ConfigError {
	/// No endpoint URL is configured for the service.
	#[error("No endpoint is configured for `{endpoint}`.")]
	MissingEndpoint {
		/// Endpoint name that could not be resolved.
		endpoint: &'static str,
	},
	/// Context lacks a value the service needs.
	#[error("Service context is missing `{field}`.")]
	MissingContextValue {
		/// Context field name.
		field: &'static str,
	},
	/// A URL derived from context values could not be parsed.
	#[error("Derived URL is invalid.")]
	InvalidUrl {
		/// Underlying parsing failure.
		#[source]
		source: url::ParseError,
	},
	/// HTTP request conversion failed.
	#[error(transparent)]
	HttpRequest(#[from] oauth2::http::Error),
	/// Header value contains characters HTTP does not allow.
	#[error("Header `{name}` has an invalid value.")]
	InvalidHeader {
		/// Header name.
		name: &'static str,
	},
	/// `client_secret_post` was combined with `GET`, which would put the secret in a URL.
	#[error("Service `{service}` cannot send the client secret in a GET query.")]
	SecretInQuery {
		/// Service label.
		service: &'static str,
	},
	/// The registered client secret is past its expiry.
	#[error("Client secret has expired; register the client again.")]
	ExpiredClientSecret,
	/// A correlated service was created without a correlation store.
	#[error("Service `{service}` needs a correlation store.")]
	MissingStore {
		/// Service label.
		service: &'static str,
	},
}

/// Argument-processing failures raised by the outbound pipeline.
#[derive(Debug, ThisError)]
pub enum ArgumentError {
	/// A present argument violated the shape a processor declared for it.
	#[error("Processor `{processor}` rejected `{key}`: expected {rule}.")]
	InvalidParameter {
		/// Processor that declared the rule.
		processor: &'static str,
		/// Offending argument key.
		key: String,
		/// Human-readable rule description.
		rule: &'static str,
	},
	/// A processor needed context that the service context does not hold.
	#[error("Processor `{processor}` needs `{key}` but the service context does not provide it.")]
	MissingContext {
		/// Failing processor.
		processor: &'static str,
		/// Argument key the processor was filling.
		key: &'static str,
	},
	/// A transport hint in the arguments could not be interpreted.
	#[error("Transport hint `{key}` has an invalid value: {value}.")]
	InvalidTransportHint {
		/// Hint key.
		key: &'static str,
		/// Rejected value.
		value: String,
	},
	/// Message construction rejected the finalized mapping.
	#[error("Request message could not be constructed.")]
	Construction(#[source] crate::message::MessageError),
}

/// Verification failures raised by the inbound pipeline.
#[derive(Debug, ThisError)]
pub enum VerificationError {
	/// Message self-verification returned a negative result.
	#[error("Verification of the response failed.")]
	Rejected,
	/// Message self-verification raised an error.
	#[error("Verification of the response raised an error.")]
	Faulted(#[source] crate::message::MessageError),
	/// Response could not be decoded.
	#[error("Response could not be decoded.")]
	Decode(#[source] crate::message::MessageError),
}

/// Correlation failures for multi-step exchanges.
#[derive(Debug, ThisError)]
pub enum CorrelationError {
	/// The service requires a state key but none was supplied.
	#[error("Service `{service}` requires a state key.")]
	MissingStateKey {
		/// Service label.
		service: &'static str,
	},
	/// The response echoed a different state than the caller expected.
	#[error("Response state `{received}` does not match the expected state `{expected}`.")]
	StateMismatch {
		/// State key supplied by the caller.
		expected: String,
		/// State echoed in the response.
		received: String,
	},
	/// No session is stored under the key, or it was already consumed.
	#[error("No pending session for state `{key}`.")]
	UnknownState {
		/// State key that failed to resolve.
		key: String,
	},
}
