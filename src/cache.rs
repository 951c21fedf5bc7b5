//! Time-bounded in-memory response cache for repeated reads of the same resource.
//!
//! Entries live for a caller-supplied TTL; once `now - fetched_at` reaches the TTL an
//! entry is indistinguishable from absent and the next read refetches. Explicit
//! invalidation and TTL expiry are the only two ways an entry stops being served.
//! There is no size bound and no background sweep; a session-scoped cache stays small
//! enough that unbounded growth is acceptable.

// crates.io
use serde_json::Value;
use sha2::{Digest, Sha256};
// self
use crate::{
	_prelude::*,
	api::{ApiRequest, Method, RequestOptions},
	error::ConfigError,
	http::SessionHttpClient,
	obs::{self, FlowKind, FlowOutcome, FlowSpan},
	session::SessionCoordinator,
};

/// Default entry lifetime when callers have no stronger requirement.
pub const DEFAULT_TTL: Duration = Duration::minutes(5);

/// Structured cache key: method + normalized absolute URL + a fingerprint of the
/// option fields that affect the response.
///
/// Two calls with identical method, URL, and options always map to the same key; any
/// difference in method, query string, or header overrides yields a distinct key.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct CacheKey {
	method: Method,
	url: String,
	options_fingerprint: String,
}
impl CacheKey {
	/// Builds a key for the provided method, resolved URL, and options.
	pub fn new(method: Method, url: &Url, options: &RequestOptions) -> Self {
		Self {
			method,
			url: url.to_string(),
			options_fingerprint: fingerprint_options(options),
		}
	}
}

/// SHA-256 over the sorted option fields, length-prefixed so field boundaries never
/// collide (`("a", "bc")` and `("ab", "c")` hash differently).
fn fingerprint_options(options: &RequestOptions) -> String {
	let mut hasher = Sha256::new();

	for (name, value) in &options.headers {
		hasher.update((name.len() as u64).to_le_bytes());
		hasher.update(name.as_bytes());
		hasher.update((value.len() as u64).to_le_bytes());
		hasher.update(value.as_bytes());
	}

	format!("{:x}", hasher.finalize())
}

#[derive(Clone, Debug)]
struct CacheEntry {
	payload: Value,
	fetched_at: OffsetDateTime,
}

/// Process-lifetime memoization layer for GET-style reads.
///
/// Construct one instance at the application's composition root and share it by
/// reference; the map is never persisted across process restarts.
#[derive(Debug, Default)]
pub struct ResponseCache {
	entries: RwLock<HashMap<CacheKey, CacheEntry>>,
}
impl ResponseCache {
	/// Creates an empty cache.
	pub fn new() -> Self {
		Self::default()
	}

	/// Serves a live entry for `key`, or delegates to `fetch` and memoizes the result.
	///
	/// A failed fetch leaves no trace in the cache; the error propagates unchanged and
	/// the next read for the same key retries the network.
	pub async fn fetch_with<F, Fut>(&self, key: CacheKey, ttl: Duration, fetch: F) -> Result<Value>
	where
		F: FnOnce() -> Fut,
		Fut: Future<Output = Result<Value>>,
	{
		const KIND: FlowKind = FlowKind::CachedFetch;

		let span = FlowSpan::new(KIND, "fetch_with");

		obs::record_flow_outcome(KIND, FlowOutcome::Attempt);

		let result = span
			.instrument(async move {
				if let Some(payload) = self.lookup(&key, ttl, OffsetDateTime::now_utc()) {
					return Ok(payload);
				}

				let payload = fetch().await?;

				self.store_at(key, payload.clone(), OffsetDateTime::now_utc());

				Ok(payload)
			})
			.await;

		match &result {
			Ok(_) => obs::record_flow_outcome(KIND, FlowOutcome::Success),
			Err(_) => obs::record_flow_outcome(KIND, FlowOutcome::Failure),
		}

		result
	}

	/// Warms the cache for a key that will be read soon.
	pub async fn prefetch<F, Fut>(&self, key: CacheKey, ttl: Duration, fetch: F) -> Result<()>
	where
		F: FnOnce() -> Fut,
		Fut: Future<Output = Result<Value>>,
	{
		self.fetch_with(key, ttl, fetch).await.map(drop)
	}

	/// Removes the entry for `key`, if present. Idempotent.
	pub fn invalidate(&self, key: &CacheKey) {
		self.entries.write().remove(key);
	}

	/// Removes all entries unconditionally.
	pub fn clear(&self) {
		self.entries.write().clear();
	}

	/// Returns the number of stored entries, expired ones included.
	pub fn len(&self) -> usize {
		self.entries.read().len()
	}

	/// Returns true when no entries are stored.
	pub fn is_empty(&self) -> bool {
		self.entries.read().is_empty()
	}

	/// Returns the live payload for `key` at `now`, dropping an expired entry on read.
	fn lookup(&self, key: &CacheKey, ttl: Duration, now: OffsetDateTime) -> Option<Value> {
		let mut entries = self.entries.write();

		match entries.get(key) {
			Some(entry) if now - entry.fetched_at < ttl => Some(entry.payload.clone()),
			Some(_) => {
				// Expired entries are indistinguishable from absent.
				entries.remove(key);

				None
			},
			None => None,
		}
	}

	fn store_at(&self, key: CacheKey, payload: Value, now: OffsetDateTime) {
		self.entries.write().insert(key, CacheEntry { payload, fetched_at: now });
	}
}

impl<C> SessionCoordinator<C>
where
	C: ?Sized + SessionHttpClient,
{
	/// Routes a GET through the response cache, returning the memoized payload when a
	/// live entry exists and delegating to [`SessionCoordinator::request`] otherwise.
	pub async fn get_cached(
		&self,
		cache: &ResponseCache,
		path: &str,
		options: RequestOptions,
		ttl: Duration,
	) -> Result<Value> {
		let key = self.cache_key(Method::Get, path, &options)?;

		cache
			.fetch_with(key, ttl, || async {
				let request = ApiRequest::get(path).with_options(options);

				self.request(request).await.map(|response| response.payload)
			})
			.await
	}

	/// Warms the cache slot a later [`SessionCoordinator::get_cached`] call will read.
	pub async fn prefetch_get(
		&self,
		cache: &ResponseCache,
		path: &str,
		options: RequestOptions,
		ttl: Duration,
	) -> Result<()> {
		self.get_cached(cache, path, options, ttl).await.map(drop)
	}

	/// Drops the cache slot a [`SessionCoordinator::get_cached`] call would read.
	pub fn invalidate_get(
		&self,
		cache: &ResponseCache,
		path: &str,
		options: &RequestOptions,
	) -> Result<()> {
		cache.invalidate(&self.cache_key(Method::Get, path, options)?);

		Ok(())
	}

	fn cache_key(&self, method: Method, path: &str, options: &RequestOptions) -> Result<CacheKey> {
		let url = self
			.config
			.base_url
			.join(path)
			.map_err(|source| ConfigError::InvalidPath { path: path.to_owned(), source })?;

		Ok(CacheKey::new(method, &url, options))
	}
}
