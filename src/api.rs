//! Request and response model shared by the session coordinator and the cache.

// self
use crate::_prelude::*;

/// HTTP methods supported by the broker.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Method {
	/// HTTP GET.
	Get,
	/// HTTP POST.
	Post,
	/// HTTP PUT.
	Put,
	/// HTTP PATCH.
	Patch,
	/// HTTP DELETE.
	Delete,
}
impl Method {
	/// Returns a stable label suitable for cache keys, spans, and logs.
	pub const fn as_str(self) -> &'static str {
		match self {
			Method::Get => "GET",
			Method::Post => "POST",
			Method::Put => "PUT",
			Method::Patch => "PATCH",
			Method::Delete => "DELETE",
		}
	}
}
impl Display for Method {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// One part of a `multipart/form-data` submission (evidence files and form fields).
#[derive(Clone, Debug)]
pub struct FormPart {
	/// Form field name.
	pub name: String,
	/// Original file name, when the part carries a file.
	pub file_name: Option<String>,
	/// MIME type of the part, when known.
	pub mime_type: Option<String>,
	/// Raw part contents.
	pub bytes: Vec<u8>,
}
impl FormPart {
	/// Creates a plain text field part.
	pub fn field(name: impl Into<String>, value: impl Into<String>) -> Self {
		Self {
			name: name.into(),
			file_name: None,
			mime_type: None,
			bytes: value.into().into_bytes(),
		}
	}

	/// Creates a file part with the provided file name and MIME type.
	pub fn file(
		name: impl Into<String>,
		file_name: impl Into<String>,
		mime_type: impl Into<String>,
		bytes: Vec<u8>,
	) -> Self {
		Self {
			name: name.into(),
			file_name: Some(file_name.into()),
			mime_type: Some(mime_type.into()),
			bytes,
		}
	}
}

/// Request payload accepted by the coordinator.
#[derive(Clone, Debug, Default)]
pub enum RequestBody {
	/// No body.
	#[default]
	Empty,
	/// JSON payload sent as `application/json`.
	Json(serde_json::Value),
	/// Multipart payload sent as `multipart/form-data`.
	Multipart(Vec<FormPart>),
}

/// Per-call options that affect the response (header overrides).
///
/// Headers live in a sorted map so logically identical options always produce the
/// same cache key regardless of insertion order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RequestOptions {
	/// Header overrides applied on top of the coordinator's defaults.
	pub headers: BTreeMap<String, String>,
}
impl RequestOptions {
	/// Creates empty options.
	pub fn new() -> Self {
		Self::default()
	}

	/// Adds or replaces a header override. Names are normalized to lowercase.
	pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
		self.headers.insert(name.into().to_ascii_lowercase(), value.into());

		self
	}

	/// Returns true when no overrides are present.
	pub fn is_empty(&self) -> bool {
		self.headers.is_empty()
	}
}

/// One outbound API call, before credential attachment and URL resolution.
#[derive(Clone, Debug)]
pub struct ApiRequest {
	/// HTTP method.
	pub method: Method,
	/// Path relative to the configured base URL.
	pub path: String,
	/// Request payload.
	pub body: RequestBody,
	/// Per-call header overrides.
	pub options: RequestOptions,
	/// Marks a request that already went through the refresh-retry cycle once.
	pub(crate) retried: bool,
}
impl ApiRequest {
	/// Creates a request for the provided method and path.
	pub fn new(method: Method, path: impl Into<String>) -> Self {
		Self {
			method,
			path: path.into(),
			body: RequestBody::Empty,
			options: RequestOptions::default(),
			retried: false,
		}
	}

	/// Creates a GET request.
	pub fn get(path: impl Into<String>) -> Self {
		Self::new(Method::Get, path)
	}

	/// Creates a POST request.
	pub fn post(path: impl Into<String>) -> Self {
		Self::new(Method::Post, path)
	}

	/// Creates a PUT request.
	pub fn put(path: impl Into<String>) -> Self {
		Self::new(Method::Put, path)
	}

	/// Creates a PATCH request.
	pub fn patch(path: impl Into<String>) -> Self {
		Self::new(Method::Patch, path)
	}

	/// Creates a DELETE request.
	pub fn delete(path: impl Into<String>) -> Self {
		Self::new(Method::Delete, path)
	}

	/// Attaches a JSON payload.
	pub fn with_json(mut self, payload: serde_json::Value) -> Self {
		self.body = RequestBody::Json(payload);

		self
	}

	/// Attaches a multipart payload (evidence-file submissions).
	pub fn with_multipart(mut self, parts: Vec<FormPart>) -> Self {
		self.body = RequestBody::Multipart(parts);

		self
	}

	/// Replaces the per-call options.
	pub fn with_options(mut self, options: RequestOptions) -> Self {
		self.options = options;

		self
	}

	/// Adds or replaces a single header override.
	pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
		self.options = self.options.with_header(name, value);

		self
	}
}

/// JSON-decoded response returned to callers on success.
#[derive(Clone, Debug)]
pub struct ApiResponse {
	/// HTTP status code.
	pub status: u16,
	/// Decoded JSON payload; an empty body decodes to [`serde_json::Value::Null`].
	pub payload: serde_json::Value,
}

/// Returns true for 2xx statuses.
pub(crate) const fn is_success(status: u16) -> bool {
	200 <= status && status < 300
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn builders_populate_requests() {
		let request = ApiRequest::post("/api/violations")
			.with_json(serde_json::json!({ "unit": "4B" }))
			.with_header("X-Client", "test");

		assert_eq!(request.method, Method::Post);
		assert_eq!(request.path, "/api/violations");
		assert!(matches!(request.body, RequestBody::Json(_)));
		assert_eq!(request.options.headers.get("x-client").map(String::as_str), Some("test"));
		assert!(!request.retried);
	}

	#[test]
	fn options_normalize_header_names() {
		let a = RequestOptions::new().with_header("X-Page", "2").with_header("X-Sort", "date");
		let b = RequestOptions::new().with_header("x-sort", "date").with_header("x-page", "2");

		assert_eq!(a, b);
	}

	#[test]
	fn success_statuses_cover_2xx_only() {
		assert!(is_success(200));
		assert!(is_success(299));
		assert!(!is_success(199));
		assert!(!is_success(301));
		assert!(!is_success(401));
	}
}
