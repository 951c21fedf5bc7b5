//! Transport primitives for the session broker.
//!
//! The module exposes [`SessionHttpClient`] so downstream crates can integrate custom
//! HTTP stacks. The coordinator resolves URLs, merges headers, and serializes bodies
//! before handing a [`PreparedRequest`] to the transport; implementations only execute
//! the exchange and hand back a [`RawResponse`] with lowercase header names.

// std
use std::ops::Deref;
// self
use crate::{
	_prelude::*,
	api::{FormPart, Method, is_success},
};

/// Boxed future returned by [`SessionHttpClient::execute`].
pub type TransportFuture<'a, E> = Pin<Box<dyn Future<Output = Result<RawResponse, E>> + 'a + Send>>;

/// Abstraction over HTTP transports capable of executing prepared API calls.
///
/// The trait acts as the broker's only dependency on an HTTP stack. Implementations
/// must be `Send + Sync + 'static` so a single transport can be shared across
/// coordinator instances, and the futures they return must be `Send` so coordinator
/// futures can hop executors.
pub trait SessionHttpClient
where
	Self: 'static + Send + Sync,
{
	/// Concrete error emitted by the underlying transport when no response arrives.
	type TransportError: 'static + Send + Sync + StdError;

	/// Executes the prepared request and returns the raw response.
	///
	/// Implementations must resolve with a [`RawResponse`] for every response the
	/// server produced, including 4xx/5xx; only transport-level failures (DNS, TCP,
	/// TLS, IO) map to `Self::TransportError`.
	fn execute(&self, request: PreparedRequest) -> TransportFuture<'_, Self::TransportError>;
}

/// Fully resolved request handed to the transport.
#[derive(Clone, Debug)]
pub struct PreparedRequest {
	/// HTTP method.
	pub method: Method,
	/// Absolute request URL.
	pub url: Url,
	/// Merged headers with lowercase names, sorted for determinism.
	pub headers: BTreeMap<String, String>,
	/// Serialized request payload.
	pub body: PreparedBody,
}

/// Request payload after coordinator-side serialization.
#[derive(Clone, Debug)]
pub enum PreparedBody {
	/// No body.
	Empty,
	/// Serialized JSON bytes sent as `application/json`.
	Json(Vec<u8>),
	/// Multipart parts encoded by the transport as `multipart/form-data`.
	Multipart(Vec<FormPart>),
}

/// Raw response surfaced by the transport before JSON decoding.
#[derive(Clone, Debug)]
pub struct RawResponse {
	/// HTTP status code.
	pub status: u16,
	/// Response headers with lowercase names; repeated headers keep the last value.
	pub headers: BTreeMap<String, String>,
	/// Raw response body.
	pub body: Vec<u8>,
}
impl RawResponse {
	/// Returns true for 2xx statuses.
	pub const fn is_success(&self) -> bool {
		is_success(self.status)
	}
}

/// Thin wrapper around [`ReqwestClient`] so shared HTTP behavior lives in one place.
///
/// The broker never follows server-declared redirect instructions through the
/// transport; redirect payloads are handled by the coordinator, so a default client
/// is sufficient. Cookie-based sessions should configure the wrapped client with a
/// cookie store before handing it over.
#[cfg(feature = "reqwest")]
#[derive(Clone, Default)]
pub struct ReqwestHttpClient(pub ReqwestClient);
#[cfg(feature = "reqwest")]
impl ReqwestHttpClient {
	/// Builds a fresh client, surfacing builder failures as configuration errors.
	pub fn new() -> Result<Self, crate::error::ConfigError> {
		Ok(Self(ReqwestClient::builder().build()?))
	}

	/// Wraps an existing [`ReqwestClient`].
	pub fn with_client(client: ReqwestClient) -> Self {
		Self(client)
	}
}
#[cfg(feature = "reqwest")]
impl AsRef<ReqwestClient> for ReqwestHttpClient {
	fn as_ref(&self) -> &ReqwestClient {
		&self.0
	}
}
#[cfg(feature = "reqwest")]
impl Deref for ReqwestHttpClient {
	type Target = ReqwestClient;

	fn deref(&self) -> &Self::Target {
		&self.0
	}
}
#[cfg(feature = "reqwest")]
impl SessionHttpClient for ReqwestHttpClient {
	type TransportError = ReqwestError;

	fn execute(&self, request: PreparedRequest) -> TransportFuture<'_, Self::TransportError> {
		let client = self.0.clone();

		Box::pin(async move {
			let method = match request.method {
				Method::Get => reqwest::Method::GET,
				Method::Post => reqwest::Method::POST,
				Method::Put => reqwest::Method::PUT,
				Method::Patch => reqwest::Method::PATCH,
				Method::Delete => reqwest::Method::DELETE,
			};
			let mut builder = client.request(method, request.url);

			for (name, value) in &request.headers {
				builder = builder.header(name, value);
			}

			builder = match request.body {
				PreparedBody::Empty => builder,
				PreparedBody::Json(bytes) =>
					builder.header("content-type", "application/json").body(bytes),
				PreparedBody::Multipart(parts) => {
					let mut form = reqwest::multipart::Form::new();

					for part in parts {
						let mut piece = reqwest::multipart::Part::bytes(part.bytes);

						if let Some(file_name) = part.file_name {
							piece = piece.file_name(file_name);
						}
						if let Some(mime_type) = &part.mime_type {
							piece = piece.mime_str(mime_type)?;
						}

						form = form.part(part.name, piece);
					}

					builder.multipart(form)
				},
			};

			let response = builder.send().await?;
			let status = response.status().as_u16();
			let headers = response
				.headers()
				.iter()
				.filter_map(|(name, value)| {
					value.to_str().ok().map(|v| (name.as_str().to_owned(), v.to_owned()))
				})
				.collect();
			let body = response.bytes().await?.to_vec();

			Ok(RawResponse { status, headers, body })
		})
	}
}
