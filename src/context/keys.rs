//! Caller-owned key material seam.

// self
use crate::_prelude::*;

/// Shared handle to caller-owned key material.
pub type KeyJarHandle = Arc<dyn KeyJar>;

/// Opaque key store consulted during verification and registration.
///
/// The engine never inspects keys itself. It only asks whether material exists for an owner
/// (typically the issuer) and, when registering, whether a public JWK set should be published.
pub trait KeyJar
where
	Self: Debug + Send + Sync,
{
	/// Returns `true` when keys for `owner` are available.
	fn has_keys_for(&self, owner: &str) -> bool;

	/// Public JWK set to publish during registration, if any.
	fn public_jwks(&self) -> Option<Value> {
		None
	}
}
