//! Thread-safe in-memory [`CredentialStore`] for tests and headless embeddings.

// self
use crate::{
	_prelude::*,
	store::{CredentialSnapshot, CredentialStore, StoreFuture, TokenSecret},
};

/// Keeps credentials in-process; nothing survives the application's lifetime.
#[derive(Clone, Debug, Default)]
pub struct MemoryCredentialStore(Arc<RwLock<CredentialSnapshot>>);
impl CredentialStore for MemoryCredentialStore {
	fn access_token(&self) -> StoreFuture<'_, Option<TokenSecret>> {
		let inner = self.0.clone();

		Box::pin(async move { Ok(inner.read().access_token.clone()) })
	}

	fn store_access_token(&self, token: TokenSecret) -> StoreFuture<'_, ()> {
		let inner = self.0.clone();

		Box::pin(async move {
			inner.write().access_token = Some(token);

			Ok(())
		})
	}

	fn remembered(&self) -> StoreFuture<'_, bool> {
		let inner = self.0.clone();

		Box::pin(async move { Ok(inner.read().remember_session) })
	}

	fn set_remembered(&self, remembered: bool) -> StoreFuture<'_, ()> {
		let inner = self.0.clone();

		Box::pin(async move {
			inner.write().remember_session = remembered;

			Ok(())
		})
	}

	fn clear(&self) -> StoreFuture<'_, ()> {
		let inner = self.0.clone();

		Box::pin(async move {
			*inner.write() = CredentialSnapshot::default();

			Ok(())
		})
	}
}
