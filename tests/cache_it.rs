#![cfg(feature = "reqwest")]

// std
use std::time::Duration as StdDuration;
// crates.io
use httpmock::prelude::*;
// self
use session_broker::{
	_preludet::*,
	api::RequestOptions,
	cache::ResponseCache,
	error::Error,
};

/// Repeated reads within the TTL are served from memory; once the TTL elapses the
/// next read goes back to the network.
#[tokio::test]
async fn cached_reads_expire_with_the_ttl() {
	let server = MockServer::start_async().await;
	let (coordinator, _, _) = build_test_coordinator(&server.base_url());
	let cache = ResponseCache::new();
	let mock = server
		.mock_async(|when, then| {
			when.method(GET).path("/api/units");
			then.status(200)
				.header("content-type", "application/json")
				.body("{\"units\":[{\"number\":\"4B\"}]}");
		})
		.await;
	let ttl = Duration::milliseconds(300);

	let first = coordinator
		.get_cached(&cache, "/api/units", RequestOptions::new(), ttl)
		.await
		.expect("The first read should reach the network.");
	let second = coordinator
		.get_cached(&cache, "/api/units", RequestOptions::new(), ttl)
		.await
		.expect("The second read should be served from the cache.");

	assert_eq!(first, second);

	mock.assert_async().await;

	tokio::time::sleep(StdDuration::from_millis(400)).await;

	coordinator
		.get_cached(&cache, "/api/units", RequestOptions::new(), ttl)
		.await
		.expect("The read after expiry should refetch.");

	mock.assert_calls_async(2).await;
}

/// Explicit invalidation overrides a still-live TTL; the next read refetches.
#[tokio::test]
async fn invalidation_overrides_a_live_ttl() {
	let server = MockServer::start_async().await;
	let (coordinator, _, _) = build_test_coordinator(&server.base_url());
	let cache = ResponseCache::new();
	let mock = server
		.mock_async(|when, then| {
			when.method(GET).path("/api/violations");
			then.status(200)
				.header("content-type", "application/json")
				.body("{\"violations\":[]}");
		})
		.await;
	let ttl = Duration::minutes(5);
	let options = RequestOptions::new();

	coordinator
		.get_cached(&cache, "/api/violations", options.clone(), ttl)
		.await
		.expect("The first read should reach the network.");
	coordinator
		.invalidate_get(&cache, "/api/violations", &options)
		.expect("Invalidation should resolve the cache key.");
	coordinator
		.get_cached(&cache, "/api/violations", options, ttl)
		.await
		.expect("The read after invalidation should refetch.");

	mock.assert_calls_async(2).await;
}

/// A failed fetch is never memoized; the next read for the same key retries the
/// network and can succeed.
#[tokio::test]
async fn failures_are_not_cached() {
	let server = MockServer::start_async().await;
	let (coordinator, _, _) = build_test_coordinator(&server.base_url());
	let cache = ResponseCache::new();
	let mut failing = server
		.mock_async(|when, then| {
			when.method(GET).path("/api/units");
			then.status(500)
				.header("content-type", "application/json")
				.body("{\"error\":\"Database unavailable\"}");
		})
		.await;
	let ttl = Duration::minutes(5);

	let err = coordinator
		.get_cached(&cache, "/api/units", RequestOptions::new(), ttl)
		.await
		.expect_err("The failing read should propagate its error.");

	assert!(
		matches!(&err, Error::Api { status: 500, message } if message == "Database unavailable")
	);
	assert!(cache.is_empty(), "A failed fetch must leave no cache entry.");

	failing.delete_async().await;

	let recovered = server
		.mock_async(|when, then| {
			when.method(GET).path("/api/units");
			then.status(200).header("content-type", "application/json").body("{\"units\":[]}");
		})
		.await;
	let payload = coordinator
		.get_cached(&cache, "/api/units", RequestOptions::new(), ttl)
		.await
		.expect("The retry after the backend recovers should succeed.");

	recovered.assert_async().await;

	assert_eq!(payload["units"], serde_json::json!([]));
	assert_eq!(cache.len(), 1);
}

/// Different header overrides key separate slots; clearing drops them all.
#[tokio::test]
async fn option_variants_key_separate_slots() {
	let server = MockServer::start_async().await;
	let (coordinator, _, _) = build_test_coordinator(&server.base_url());
	let cache = ResponseCache::new();
	let mock = server
		.mock_async(|when, then| {
			when.method(GET).path("/api/units");
			then.status(200).header("content-type", "application/json").body("{\"units\":[]}");
		})
		.await;
	let ttl = Duration::minutes(5);

	coordinator
		.get_cached(&cache, "/api/units", RequestOptions::new(), ttl)
		.await
		.expect("The plain read should succeed.");
	coordinator
		.get_cached(
			&cache,
			"/api/units",
			RequestOptions::new().with_header("x-page", "2"),
			ttl,
		)
		.await
		.expect("The paged read should succeed.");

	mock.assert_calls_async(2).await;

	assert_eq!(cache.len(), 2);

	cache.clear();

	assert!(cache.is_empty());
}

/// Prefetching warms the slot so the following read never touches the network.
#[tokio::test]
async fn prefetch_warms_the_following_read() {
	let server = MockServer::start_async().await;
	let (coordinator, _, _) = build_test_coordinator(&server.base_url());
	let cache = ResponseCache::new();
	let mock = server
		.mock_async(|when, then| {
			when.method(GET).path("/api/settings");
			then.status(200)
				.header("content-type", "application/json")
				.body("{\"late_fee\":25}");
		})
		.await;
	let ttl = Duration::minutes(5);

	coordinator
		.prefetch_get(&cache, "/api/settings", RequestOptions::new(), ttl)
		.await
		.expect("Prefetching should reach the network once.");

	let payload = coordinator
		.get_cached(&cache, "/api/settings", RequestOptions::new(), ttl)
		.await
		.expect("The read after a prefetch should be served from the cache.");

	mock.assert_async().await;

	assert_eq!(payload["late_fee"], serde_json::json!(25));
}
