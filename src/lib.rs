//! Transport-agnostic OpenID Connect relying-party engine with per-endpoint request pipelines,
//! session correlation and verify-before-trust response handling.

#![deny(clippy::all, missing_docs, unused_crate_dependencies)]

pub mod context;
pub mod error;
pub mod http;
pub mod message;
pub mod obs;
pub mod processor;
pub mod service;
pub mod store;
#[cfg(any(test, feature = "test"))]
pub mod _preludet {
	//! Convenience re-exports and fixtures for tests; enabled via `cfg(test)` or the `test`
	//! crate feature.

	pub use crate::_prelude::*;

	// self
	use crate::{
		context::{KeyJar, ServiceContext},
		store::MemoryStore,
	};

	/// Issuer used by the test fixtures.
	pub const TEST_ISSUER: &str = "https://op.example.com";
	/// Client identifier used by the test fixtures.
	pub const TEST_CLIENT_ID: &str = "client-test";
	/// Client secret used by the test fixtures.
	pub const TEST_CLIENT_SECRET: &str = "secret-test";

	/// Key jar that only reports a fixed owner and never exposes public keys.
	#[derive(Debug, Default)]
	pub struct StaticKeyJar;
	impl KeyJar for StaticKeyJar {
		fn has_keys_for(&self, owner: &str) -> bool {
			owner == TEST_ISSUER
		}
	}

	/// Parses a URL fixture.
	pub fn url(value: &str) -> Url {
		Url::parse(value).expect("URL fixture should parse successfully.")
	}

	/// Builds a registered client context that points at the fixture provider.
	pub fn test_context() -> ServiceContext {
		ServiceContext::builder()
			.issuer(TEST_ISSUER)
			.client_id(TEST_CLIENT_ID)
			.client_secret(TEST_CLIENT_SECRET)
			.redirect_uri(url("https://rp.example.com/cb"))
			.preference("response_types", serde_json::json!(["code"]))
			.endpoint(
				crate::context::EndpointName::Authorization,
				url("https://op.example.com/authorize"),
			)
			.endpoint(crate::context::EndpointName::Token, url("https://op.example.com/token"))
			.endpoint(
				crate::context::EndpointName::Registration,
				url("https://op.example.com/register"),
			)
			.key_jar(Arc::new(StaticKeyJar))
			.build()
			.expect("Test context should build successfully.")
	}

	/// Builds an empty in-memory correlation store.
	pub fn test_store() -> Arc<MemoryStore> {
		Arc::new(MemoryStore::default())
	}
}

mod _prelude {
	pub use std::{
		collections::{BTreeMap, HashMap, hash_map::DefaultHasher},
		error::Error as StdError,
		fmt::{Debug, Display, Formatter, Result as FmtResult},
		hash::{Hash, Hasher},
		str::FromStr,
		sync::Arc,
	};

	pub use parking_lot::{Mutex, RwLock};
	pub use serde::{Deserialize, Serialize};
	pub use serde_json::{Map, Value};
	pub use thiserror::Error as ThisError;
	pub use time::OffsetDateTime;
	pub use url::Url;

	pub use crate::{
		error::{Error, Result},
		message::Claims,
	};
}

pub use oauth2;
pub use url;
#[cfg(test)] use color_eyre as _;
