//! Client-side session broker for REST backends: bearer credential attachment,
//! single-flight refresh with FIFO retry queuing, and a TTL-bounded response cache
//! in one crate built for browser-style API clients.

#![deny(clippy::all, missing_docs, unused_crate_dependencies)]

pub mod api;
pub mod cache;
pub mod error;
pub mod http;
pub mod obs;
pub mod session;
pub mod store;
#[cfg(all(any(test, feature = "test"), feature = "reqwest"))]
pub mod _preludet {
	//! Convenience re-exports and helpers for integration tests; enabled via `cfg(test)` or the
	//! `test` crate feature.

	pub use crate::_prelude::*;

	// self
	use crate::{
		http::ReqwestHttpClient,
		session::{Navigator, SessionConfig, SessionCoordinator},
		store::{CredentialStore, MemoryCredentialStore, TokenSecret},
	};

	/// Coordinator type alias used by reqwest-backed integration tests.
	pub type ReqwestTestCoordinator = SessionCoordinator<ReqwestHttpClient>;

	/// Navigator that records assignments instead of driving a real location bar.
	#[derive(Debug, Default)]
	pub struct RecordingNavigator {
		path: Mutex<String>,
		assignments: Mutex<Vec<String>>,
	}
	impl RecordingNavigator {
		/// Creates a navigator that reports the provided current path.
		pub fn with_path(path: impl Into<String>) -> Self {
			Self { path: Mutex::new(path.into()), assignments: Mutex::new(Vec::new()) }
		}

		/// Returns every location assigned so far, oldest first.
		pub fn assignments(&self) -> Vec<String> {
			self.assignments.lock().clone()
		}

		/// Returns the most recently assigned location, if any.
		pub fn last_assignment(&self) -> Option<String> {
			self.assignments.lock().last().cloned()
		}
	}
	impl Navigator for RecordingNavigator {
		fn current_path(&self) -> String {
			self.path.lock().clone()
		}

		fn assign(&self, location: &str) {
			self.assignments.lock().push(location.to_owned());
		}
	}

	/// Builds a coordinator backed by an in-memory credential store and a recording
	/// navigator, returning all three so tests can inspect side effects.
	pub fn build_test_coordinator(
		base_url: &str,
	) -> (ReqwestTestCoordinator, Arc<MemoryCredentialStore>, Arc<RecordingNavigator>) {
		let credentials = Arc::new(MemoryCredentialStore::default());
		let navigator = Arc::new(RecordingNavigator::with_path("/dashboard"));
		let config = SessionConfig::new(
			Url::parse(base_url).expect("Test base URL should parse successfully."),
		);
		let coordinator = SessionCoordinator::with_http_client(
			credentials.clone() as Arc<dyn CredentialStore>,
			navigator.clone() as Arc<dyn Navigator>,
			config,
			ReqwestHttpClient::default(),
		);

		(coordinator, credentials, navigator)
	}

	/// Seeds an access token into the provided store.
	pub async fn seed_token(store: &MemoryCredentialStore, token: &str) {
		store
			.store_access_token(TokenSecret::new(token))
			.await
			.expect("Seeding a token into the memory store should succeed.");
	}
}

mod _prelude {
	pub use std::{
		collections::{BTreeMap, HashMap},
		error::Error as StdError,
		fmt::{Debug, Display, Formatter, Result as FmtResult},
		future::Future,
		pin::Pin,
		sync::Arc,
	};

	pub use parking_lot::{Mutex, RwLock};
	#[cfg(feature = "reqwest")]
	pub use reqwest::{Client as ReqwestClient, Error as ReqwestError};
	pub use serde::{Deserialize, Serialize};
	pub use thiserror::Error as ThisError;
	pub use time::{Duration, OffsetDateTime};
	pub use url::Url;

	pub use crate::error::{Error, Result};
}

#[cfg(feature = "reqwest")] pub use reqwest;
pub use url;
#[cfg(all(test, feature = "reqwest"))] use {httpmock as _, session_broker as _};
