//! Single-flight credential refresh with a FIFO queue of pending requests.
//!
//! The coordinator routes every credential-expiry (HTTP 401) response through
//! [`SessionCoordinator::refresh_and_retry`]. The first request to observe the expiry
//! becomes the refresher: it flips the shared in-flight flag and issues the refresh
//! exchange. Every other request that expires while the flag is set parks a oneshot
//! completion handle on the pending queue instead of starting a second exchange.
//! When the exchange resolves, queued handles are released in FIFO enqueue order and
//! each request re-issues its own call exactly once; when it fails, all queued
//! handles are rejected, stored credentials are cleared, and navigation bounces to
//! the login entry point unless the current path is unauthenticated-allowed.

mod metrics;

pub use metrics::RefreshMetrics;

// crates.io
use serde_json::Value;
use tokio::sync::oneshot;
// self
use crate::{
	_prelude::*,
	api::{ApiRequest, ApiResponse},
	http::SessionHttpClient,
	obs::{self, FlowKind, FlowOutcome, FlowSpan},
	session::{
		SessionCoordinator,
		dispatch::{decode_payload, extract_message},
		routes,
	},
	store::TokenSecret,
};

/// Cheap, cloneable summary of a failed refresh exchange, fanned out to every
/// queued waiter.
#[derive(Clone, Debug)]
pub(crate) struct RefreshFailure {
	pub(crate) message: String,
}

enum RefreshRole {
	/// This request owns the refresh exchange.
	Refresher,
	/// This request parked behind an exchange already in flight.
	Waiter(oneshot::Receiver<Result<(), RefreshFailure>>),
}

impl<C> SessionCoordinator<C>
where
	C: ?Sized + SessionHttpClient,
{
	/// Runs the refresh protocol for a request that just received a 401, then
	/// re-issues the request exactly once.
	pub(crate) async fn refresh_and_retry(&self, mut request: ApiRequest) -> Result<ApiResponse> {
		const KIND: FlowKind = FlowKind::Refresh;

		let span = FlowSpan::new(KIND, "refresh_and_retry");

		obs::record_flow_outcome(KIND, FlowOutcome::Attempt);

		// One retry per original request, whether it ends up refreshing or waiting.
		request.retried = true;

		let result = span
			.instrument(async move {
				match self.claim_role() {
					RefreshRole::Waiter(receiver) => match receiver.await {
						Ok(Ok(())) => self.execute_boxed(request).await,
						Ok(Err(failure)) =>
							Err(Error::RefreshFailed { message: failure.message }),
						Err(_) => Err(Error::RefreshFailed {
							message: "Refresh exchange was abandoned before resolving".into(),
						}),
					},
					RefreshRole::Refresher => self.drive_refresh(request).await,
				}
			})
			.await;

		match &result {
			Ok(_) => obs::record_flow_outcome(KIND, FlowOutcome::Success),
			Err(_) => obs::record_flow_outcome(KIND, FlowOutcome::Failure),
		}

		result
	}

	/// Decides between refresher and waiter under one synchronous lock, so the
	/// check-then-set of the in-flight flag is atomic with respect to other callers.
	fn claim_role(&self) -> RefreshRole {
		let mut state = self.refresh_state.lock();

		if state.in_flight {
			let (sender, receiver) = oneshot::channel();

			state.waiters.push(sender);

			RefreshRole::Waiter(receiver)
		} else {
			state.in_flight = true;

			RefreshRole::Refresher
		}
	}

	async fn drive_refresh(&self, request: ApiRequest) -> Result<ApiResponse> {
		self.refresh_metrics.record_attempt();

		let outcome = self.refresh_exchange().await;
		// Drain under the same lock that clears the flag so no waiter enqueues into a
		// queue that has already been taken.
		let waiters = {
			let mut state = self.refresh_state.lock();

			state.in_flight = false;

			std::mem::take(&mut state.waiters)
		};

		match outcome {
			Ok(()) => {
				self.refresh_metrics.record_success();

				// FIFO release; each waiter re-issues its own request independently.
				for waiter in waiters {
					let _ = waiter.send(Ok(()));
				}

				self.execute_boxed(request).await
			},
			Err(err) => {
				self.refresh_metrics.record_failure();

				let failure = RefreshFailure { message: err.to_string() };

				// The refresh error is what callers must see; a failing store cannot mask it.
				if let Err(e) = self.credentials.clear().await {
					obs::record_flow_warning(
						FlowKind::Refresh,
						&format!("Failed to clear stored credentials: {e}"),
					);
				}

				for waiter in waiters {
					let _ = waiter.send(Err(failure.clone()));
				}
				if !routes::is_unauthenticated_path(&self.navigator.current_path()) {
					self.navigator.assign(&self.config.login_path);
				}

				Err(Error::RefreshFailed { message: failure.message })
			},
		}
	}

	/// Calls the refresh endpoint with an empty body, relying on the session cookie,
	/// and stores a renewed token when the response carries one.
	async fn refresh_exchange(&self) -> Result<()> {
		let request = ApiRequest::post(self.config.refresh_path.clone());
		let raw = self.dispatch(&request).await?;

		if !raw.is_success() {
			let payload = decode_payload(&raw).unwrap_or(Value::Null);

			return Err(Error::Api {
				status: raw.status,
				message: extract_message(&payload, "Session could not be renewed"),
			});
		}

		let payload = decode_payload(&raw)?;

		if let Some(token) = payload.get("access_token").and_then(Value::as_str) {
			self.credentials.store_access_token(TokenSecret::new(token)).await?;
		}

		Ok(())
	}

	/// Boxed re-entry into the dispatch pipeline; breaks the otherwise recursive
	/// future type between `execute` and `refresh_and_retry`.
	fn execute_boxed(
		&self,
		request: ApiRequest,
	) -> Pin<Box<dyn Future<Output = Result<ApiResponse>> + Send + '_>> {
		Box::pin(self.execute(request))
	}
}
