//! Session coordination: credential attachment, single-flight refresh, and retries.

pub mod refresh;
pub mod routes;

mod dispatch;

pub use refresh::RefreshMetrics;
pub use routes::*;

// crates.io
use tokio::sync::oneshot;
// self
use crate::{
	_prelude::*,
	http::SessionHttpClient,
	session::refresh::RefreshFailure,
	store::CredentialStore,
};
#[cfg(feature = "reqwest")] use crate::http::ReqwestHttpClient;

#[cfg(feature = "reqwest")]
/// Coordinator specialized for the crate's default reqwest transport.
pub type ReqwestCoordinator = SessionCoordinator<ReqwestHttpClient>;

/// Completion handle held by one request paused behind an in-flight refresh.
pub(crate) type RefreshWaiter = oneshot::Sender<Result<(), RefreshFailure>>;

/// Shared refresh state: the in-flight flag plus the FIFO queue of paused requests.
///
/// Check-then-set of the flag always happens while the surrounding lock is held, so
/// at most one refresh exchange can be outstanding at a time.
#[derive(Debug, Default)]
pub(crate) struct RefreshState {
	pub(crate) in_flight: bool,
	pub(crate) waiters: Vec<RefreshWaiter>,
}

/// Endpoint layout the coordinator operates against.
#[derive(Clone, Debug)]
pub struct SessionConfig {
	/// Base URL all request paths are resolved against.
	pub base_url: Url,
	/// Path of the credential-refresh endpoint, called with an empty body.
	pub refresh_path: String,
	/// Login entry point used when a failed refresh forces navigation.
	pub login_path: String,
}
impl SessionConfig {
	/// Default login entry point.
	pub const DEFAULT_LOGIN_PATH: &'static str = "/login";
	/// Default refresh endpoint of the backing API.
	pub const DEFAULT_REFRESH_PATH: &'static str = "/api/auth/refresh-jwt";

	/// Parses `base_url` and creates a config with the default refresh and login paths.
	pub fn parse(base_url: &str) -> Result<Self> {
		let base_url = Url::parse(base_url)
			.map_err(|source| crate::error::ConfigError::InvalidBaseUrl { source })?;

		Ok(Self::new(base_url))
	}

	/// Creates a config with the default refresh and login paths.
	pub fn new(base_url: Url) -> Self {
		Self {
			base_url,
			refresh_path: Self::DEFAULT_REFRESH_PATH.into(),
			login_path: Self::DEFAULT_LOGIN_PATH.into(),
		}
	}

	/// Overrides the refresh endpoint path.
	pub fn with_refresh_path(mut self, path: impl Into<String>) -> Self {
		self.refresh_path = path.into();

		self
	}

	/// Overrides the login entry point.
	pub fn with_login_path(mut self, path: impl Into<String>) -> Self {
		self.login_path = path.into();

		self
	}
}

/// Coordinates authenticated API calls against a single backend.
///
/// The coordinator owns the transport, credential store, navigator, and refresh
/// state so every outbound request carries current credentials and a
/// credential-expiry response triggers exactly one refresh exchange no matter how
/// many requests are in flight. It is an explicitly constructed object; create one
/// per backend at the application's composition root instead of relying on
/// module-level singletons.
pub struct SessionCoordinator<C>
where
	C: ?Sized + SessionHttpClient,
{
	/// HTTP transport used for every outbound request.
	pub http_client: Arc<C>,
	/// Credential store consulted before each dispatch.
	pub credentials: Arc<dyn CredentialStore>,
	/// Navigation sink used for redirects and login bounces.
	pub navigator: Arc<dyn Navigator>,
	/// Endpoint layout.
	pub config: SessionConfig,
	/// Shared counters for refresh exchanges.
	pub refresh_metrics: Arc<RefreshMetrics>,
	pub(crate) refresh_state: Arc<Mutex<RefreshState>>,
}
impl<C> SessionCoordinator<C>
where
	C: ?Sized + SessionHttpClient,
{
	/// Creates a coordinator that reuses the caller-provided transport.
	pub fn with_http_client(
		credentials: Arc<dyn CredentialStore>,
		navigator: Arc<dyn Navigator>,
		config: SessionConfig,
		http_client: impl Into<Arc<C>>,
	) -> Self {
		Self {
			http_client: http_client.into(),
			credentials,
			navigator,
			config,
			refresh_metrics: Default::default(),
			refresh_state: Default::default(),
		}
	}

	/// Replaces the navigator (defaults to [`NoopNavigator`] in the reqwest constructor).
	pub fn with_navigator(mut self, navigator: Arc<dyn Navigator>) -> Self {
		self.navigator = navigator;

		self
	}
}
#[cfg(feature = "reqwest")]
impl SessionCoordinator<ReqwestHttpClient> {
	/// Creates a coordinator with a default reqwest transport and a no-op navigator.
	///
	/// Use [`SessionCoordinator::with_navigator`] to wire a real location sink when the
	/// embedding can perform navigation.
	pub fn new(credentials: Arc<dyn CredentialStore>, config: SessionConfig) -> Self {
		Self::with_http_client(
			credentials,
			Arc::new(NoopNavigator),
			config,
			ReqwestHttpClient::default(),
		)
	}
}
impl<C> Clone for SessionCoordinator<C>
where
	C: ?Sized + SessionHttpClient,
{
	fn clone(&self) -> Self {
		Self {
			http_client: self.http_client.clone(),
			credentials: self.credentials.clone(),
			navigator: self.navigator.clone(),
			config: self.config.clone(),
			refresh_metrics: self.refresh_metrics.clone(),
			refresh_state: self.refresh_state.clone(),
		}
	}
}
impl<C> Debug for SessionCoordinator<C>
where
	C: ?Sized + SessionHttpClient,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("SessionCoordinator")
			.field("config", &self.config)
			.field("refresh_in_flight", &self.refresh_state.lock().in_flight)
			.finish()
	}
}
