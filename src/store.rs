//! Credential persistence contracts and built-in store implementations.
//!
//! The layout mirrors the browser-storage contract the broker replaces: at most one
//! token string under the fixed `access_token` key and one boolean under the fixed
//! `remember_session` key.

pub mod file;
pub mod memory;

pub use file::FileCredentialStore;
pub use memory::MemoryCredentialStore;

// self
use crate::_prelude::*;

/// Fixed storage key holding the bearer token.
pub const ACCESS_TOKEN_KEY: &str = "access_token";
/// Fixed storage key holding the remembered-session flag.
pub const REMEMBER_SESSION_KEY: &str = "remember_session";

/// Boxed future returned by [`CredentialStore`] operations.
pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, StoreError>> + 'a + Send>>;

/// Persistence contract for session credentials.
pub trait CredentialStore
where
	Self: Send + Sync,
{
	/// Returns the stored access token, if any.
	fn access_token(&self) -> StoreFuture<'_, Option<TokenSecret>>;

	/// Stores or replaces the access token.
	fn store_access_token(&self, token: TokenSecret) -> StoreFuture<'_, ()>;

	/// Returns the remembered-session flag.
	fn remembered(&self) -> StoreFuture<'_, bool>;

	/// Sets the remembered-session flag.
	fn set_remembered(&self, remembered: bool) -> StoreFuture<'_, ()>;

	/// Removes the token and resets the remembered-session flag.
	fn clear(&self) -> StoreFuture<'_, ()>;
}

/// Error type produced by [`CredentialStore`] implementations.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ThisError)]
pub enum StoreError {
	/// Serialization failures surfaced by the backend.
	#[error("Serialization error: {message}.")]
	Serialization {
		/// Human-readable error payload.
		message: String,
	},
	/// Backend-level failure for the storage engine.
	#[error("Backend failure: {message}.")]
	Backend {
		/// Human-readable error payload.
		message: String,
	},
}

/// Redacted token wrapper keeping sensitive material out of logs.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenSecret(String);
impl TokenSecret {
	/// Wraps a new secret string.
	pub fn new(value: impl Into<String>) -> Self {
		Self(value.into())
	}

	/// Returns the inner token value. Callers must avoid logging this string.
	pub fn expose(&self) -> &str {
		&self.0
	}
}
impl AsRef<str> for TokenSecret {
	fn as_ref(&self) -> &str {
		self.expose()
	}
}
impl Debug for TokenSecret {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_tuple("TokenSecret").field(&"<redacted>").finish()
	}
}
impl Display for TokenSecret {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str("<redacted>")
	}
}

/// Serialized shape shared by the built-in stores.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub(crate) struct CredentialSnapshot {
	/// Stored bearer token under the fixed `access_token` key.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub(crate) access_token: Option<TokenSecret>,
	/// Remembered-session flag under the fixed `remember_session` key.
	#[serde(default)]
	pub(crate) remember_session: bool,
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn secret_formatters_redact() {
		let secret = TokenSecret::new("super-secret");

		assert_eq!(format!("{secret:?}"), "TokenSecret(\"<redacted>\")");
		assert_eq!(format!("{secret}"), "<redacted>");
		assert_eq!(secret.expose(), "super-secret");
	}

	#[test]
	fn snapshot_serializes_under_fixed_keys() {
		let snapshot = CredentialSnapshot {
			access_token: Some(TokenSecret::new("abc")),
			remember_session: true,
		};
		let payload = serde_json::to_value(&snapshot)
			.expect("Credential snapshot should serialize to JSON.");

		assert_eq!(payload.get(ACCESS_TOKEN_KEY), Some(&serde_json::json!("abc")));
		assert_eq!(payload.get(REMEMBER_SESSION_KEY), Some(&serde_json::json!(true)));
	}
}
