//! Request preparation and response handling for the coordinator.

// crates.io
use serde_json::Value;
// self
use crate::{
	_prelude::*,
	api::{ApiRequest, ApiResponse, Method, RequestBody},
	error::{ConfigError, TransportError},
	http::{PreparedBody, PreparedRequest, RawResponse, SessionHttpClient},
	obs::{self, FlowKind, FlowOutcome, FlowSpan},
	session::SessionCoordinator,
	store::TokenSecret,
};

const AUTHORIZATION: &str = "authorization";
const BEARER_PREFIX: &str = "Bearer ";
pub(crate) const STATUS_UNAUTHORIZED: u16 = 401;

impl<C> SessionCoordinator<C>
where
	C: ?Sized + SessionHttpClient,
{
	/// Performs an API call with credentials attached.
	///
	/// Successful responses pass through unchanged. A credential-expiry response
	/// (HTTP 401) triggers the single-flight refresh protocol before the request is
	/// retried exactly once; a transport failure surfaces as
	/// [`Error::Transport`](crate::error::Error::Transport) and is never retried.
	pub async fn request(&self, request: ApiRequest) -> Result<ApiResponse> {
		const KIND: FlowKind = FlowKind::Dispatch;

		let span = FlowSpan::new(KIND, "request");

		obs::record_flow_outcome(KIND, FlowOutcome::Attempt);

		let result = span.instrument(self.execute(request)).await;

		match &result {
			Ok(_) => obs::record_flow_outcome(KIND, FlowOutcome::Success),
			Err(_) => obs::record_flow_outcome(KIND, FlowOutcome::Failure),
		}

		result
	}

	pub(crate) async fn execute(&self, request: ApiRequest) -> Result<ApiResponse> {
		let raw = self.dispatch(&request).await?;
		let payload = match decode_payload(&raw) {
			Ok(payload) => payload,
			Err(err) if raw.is_success() => return Err(err),
			// Non-JSON error bodies (proxy HTML, plain text) still map to a status error.
			Err(_) => Value::Null,
		};

		if let Some(location) = redirect_instruction(&payload) {
			self.navigator.assign(&location);

			return Err(Error::Redirected { location });
		}
		if raw.status == STATUS_UNAUTHORIZED {
			if request.retried {
				return Err(Error::Unauthorized {
					message: extract_message(&payload, "Session is no longer valid"),
				});
			}

			return self.refresh_and_retry(request).await;
		}
		if !raw.is_success() {
			return Err(Error::Api {
				status: raw.status,
				message: extract_message(&payload, "An error occurred"),
			});
		}

		self.capture_rotated_token(&raw).await?;

		Ok(ApiResponse { status: raw.status, payload })
	}

	/// Resolves, serializes, and executes one request without any retry handling.
	pub(crate) async fn dispatch(&self, request: &ApiRequest) -> Result<RawResponse> {
		let prepared = self.prepare(request).await?;

		self.http_client
			.execute(prepared)
			.await
			.map_err(|e| Error::from(TransportError::network(e)))
	}

	async fn prepare(&self, request: &ApiRequest) -> Result<PreparedRequest> {
		let url = self.config.base_url.join(&request.path).map_err(|source| {
			ConfigError::InvalidPath { path: request.path.clone(), source }
		})?;
		let mut headers = request.options.headers.clone();

		headers.entry("accept".into()).or_insert_with(|| "application/json".into());

		// GETs must never be served from intermediary HTTP caches; the response cache
		// is the only memoization layer.
		if request.method == Method::Get {
			headers
				.entry("cache-control".into())
				.or_insert_with(|| "no-cache, no-store, must-revalidate".into());
			headers.entry("pragma".into()).or_insert_with(|| "no-cache".into());
			headers.entry("expires".into()).or_insert_with(|| "0".into());
		}
		// Caller-supplied Authorization overrides win over the stored token.
		let token = if headers.contains_key(AUTHORIZATION) {
			None
		} else {
			self.credentials.access_token().await?
		};

		if let Some(token) = token {
			headers.insert(AUTHORIZATION.into(), format!("{BEARER_PREFIX}{}", token.expose()));
		}

		let body = match &request.body {
			RequestBody::Empty => PreparedBody::Empty,
			RequestBody::Json(payload) => PreparedBody::Json(
				serde_json::to_vec(payload)
					.map_err(|source| ConfigError::BodySerialization { source })?,
			),
			RequestBody::Multipart(parts) => PreparedBody::Multipart(parts.clone()),
		};

		Ok(PreparedRequest { method: request.method, url, headers, body })
	}

	async fn capture_rotated_token(&self, raw: &RawResponse) -> Result<()> {
		if let Some(value) = raw.headers.get(AUTHORIZATION) {
			let token = value.strip_prefix(BEARER_PREFIX).unwrap_or(value);

			if !token.is_empty() {
				self.credentials.store_access_token(TokenSecret::new(token)).await?;
			}
		}

		Ok(())
	}
}

/// Decodes a response body as JSON; an empty body decodes to [`Value::Null`].
pub(crate) fn decode_payload(raw: &RawResponse) -> Result<Value> {
	if raw.body.is_empty() {
		return Ok(Value::Null);
	}

	let mut deserializer = serde_json::Deserializer::from_slice(&raw.body);

	serde_path_to_error::deserialize(&mut deserializer)
		.map_err(|source| Error::ResponseParse { source, status: raw.status })
}

/// Pulls a human-readable message out of an error payload's `error`/`message` fields.
pub(crate) fn extract_message(payload: &Value, fallback: &str) -> String {
	payload
		.get("error")
		.or_else(|| payload.get("message"))
		.and_then(Value::as_str)
		.map(str::to_owned)
		.unwrap_or_else(|| fallback.to_owned())
}

/// Detects a server-declared redirect instruction (`{"redirect": true, "location": ..}`).
fn redirect_instruction(payload: &Value) -> Option<String> {
	if payload.get("redirect").and_then(Value::as_bool) == Some(true) {
		payload.get("location").and_then(Value::as_str).map(str::to_owned)
	} else {
		None
	}
}
