#![cfg(feature = "reqwest")]

// crates.io
use httpmock::prelude::*;
// self
use session_broker::{
	_preludet::*,
	api::{ApiRequest, FormPart},
	error::Error,
	session::{SessionConfig, SessionCoordinator},
	store::MemoryCredentialStore,
};

#[tokio::test]
async fn get_passes_through_and_attaches_bearer() {
	let server = MockServer::start_async().await;
	let (coordinator, credentials, _) = build_test_coordinator(&server.base_url());

	seed_token(&credentials, "seed-token").await;

	let mock = server
		.mock_async(|when, then| {
			when.method(GET)
				.path("/api/units")
				.header("authorization", "Bearer seed-token")
				.header("cache-control", "no-cache, no-store, must-revalidate")
				.header("pragma", "no-cache");
			then.status(200)
				.header("content-type", "application/json")
				.body("{\"units\":[{\"number\":\"4B\"}]}");
		})
		.await;
	let response = coordinator
		.request(ApiRequest::get("/api/units"))
		.await
		.expect("GET through the coordinator should pass through unchanged.");

	mock.assert_async().await;

	assert_eq!(response.status, 200);
	assert_eq!(response.payload["units"][0]["number"], serde_json::json!("4B"));
}

#[tokio::test]
async fn post_sends_json_payload() {
	let server = MockServer::start_async().await;
	let (coordinator, _, _) = build_test_coordinator(&server.base_url());
	let mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/api/violations").header("content-type", "application/json");
			then.status(201)
				.header("content-type", "application/json")
				.body("{\"id\":7}");
		})
		.await;
	let response = coordinator
		.request(
			ApiRequest::post("/api/violations")
				.with_json(serde_json::json!({ "unit": "4B", "category": "noise" })),
		)
		.await
		.expect("POST with a JSON body should succeed.");

	mock.assert_async().await;

	assert_eq!(response.status, 201);
	assert_eq!(response.payload["id"], serde_json::json!(7));
}

#[tokio::test]
async fn multipart_uploads_reach_the_backend() {
	let server = MockServer::start_async().await;
	let (coordinator, _, _) = build_test_coordinator(&server.base_url());
	let mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/api/violations/9/evidence");
			then.status(201)
				.header("content-type", "application/json")
				.body("{\"stored\":true}");
		})
		.await;
	let parts = vec![
		FormPart::file("evidence", "front-door.jpg", "image/jpeg", vec![0xFF, 0xD8, 0xFF]),
		FormPart::field("note", "front door damage"),
	];
	let response = coordinator
		.request(ApiRequest::post("/api/violations/9/evidence").with_multipart(parts))
		.await
		.expect("Multipart evidence upload should succeed.");

	mock.assert_async().await;

	assert_eq!(response.payload["stored"], serde_json::json!(true));
}

#[tokio::test]
async fn non_credential_failures_extract_messages() {
	let server = MockServer::start_async().await;
	let (coordinator, _, _) = build_test_coordinator(&server.base_url());
	let mock = server
		.mock_async(|when, then| {
			when.method(GET).path("/api/units/404");
			then.status(404)
				.header("content-type", "application/json")
				.body("{\"error\":\"Unit not found\"}");
		})
		.await;
	let err = coordinator
		.request(ApiRequest::get("/api/units/404"))
		.await
		.expect_err("A 404 should surface as an API error.");

	mock.assert_async().await;

	assert!(matches!(&err, Error::Api { status: 404, message } if message == "Unit not found"));
}

#[tokio::test]
async fn non_json_error_bodies_still_map_to_status() {
	let server = MockServer::start_async().await;
	let (coordinator, _, _) = build_test_coordinator(&server.base_url());
	let mock = server
		.mock_async(|when, then| {
			when.method(GET).path("/api/units");
			then.status(502).header("content-type", "text/html").body("<html>bad gateway</html>");
		})
		.await;
	let err = coordinator
		.request(ApiRequest::get("/api/units"))
		.await
		.expect_err("A 502 with an HTML body should surface as an API error.");

	mock.assert_async().await;

	assert!(matches!(err, Error::Api { status: 502, .. }));
}

#[tokio::test]
async fn connectivity_failures_are_not_retried() {
	// Nothing listens on this port; the connection is refused immediately.
	let (coordinator, _, _) = build_test_coordinator("http://127.0.0.1:9");
	let err = coordinator
		.request(ApiRequest::get("/api/units"))
		.await
		.expect_err("A refused connection should surface as a transport error.");

	assert!(matches!(err, Error::Transport(_)));
}

#[tokio::test]
async fn server_declared_redirects_short_circuit() {
	let server = MockServer::start_async().await;
	let (coordinator, _, navigator) = build_test_coordinator(&server.base_url());
	let mock = server
		.mock_async(|when, then| {
			when.method(GET).path("/api/settings");
			then.status(200)
				.header("content-type", "application/json")
				.body("{\"redirect\":true,\"location\":\"/maintenance\"}");
		})
		.await;
	let err = coordinator
		.request(ApiRequest::get("/api/settings"))
		.await
		.expect_err("A redirect instruction should short-circuit normal resolution.");

	mock.assert_async().await;

	assert!(matches!(&err, Error::Redirected { location } if location == "/maintenance"));
	assert_eq!(navigator.assignments(), vec!["/maintenance".to_owned()]);
}

#[tokio::test]
async fn rotated_tokens_from_response_headers_are_stored() {
	let server = MockServer::start_async().await;
	let (coordinator, credentials, _) = build_test_coordinator(&server.base_url());

	seed_token(&credentials, "stale-token").await;

	let mock = server
		.mock_async(|when, then| {
			when.method(GET).path("/api/profile");
			then.status(200)
				.header("content-type", "application/json")
				.header("authorization", "Bearer rotated-token")
				.body("{}");
		})
		.await;

	coordinator
		.request(ApiRequest::get("/api/profile"))
		.await
		.expect("The rotating GET should succeed.");

	mock.assert_async().await;

	let stored = stored_token(&credentials).await;

	assert_eq!(stored.as_deref(), Some("rotated-token"));
}

async fn stored_token(credentials: &MemoryCredentialStore) -> Option<String> {
	use session_broker::store::CredentialStore;

	credentials
		.access_token()
		.await
		.expect("Reading the memory store should succeed.")
		.map(|secret| secret.expose().to_owned())
}

#[tokio::test]
async fn header_overrides_replace_defaults() {
	let server = MockServer::start_async().await;
	let credentials = Arc::new(MemoryCredentialStore::default());
	let config = SessionConfig::new(
		Url::parse(&server.base_url()).expect("Mock base URL should parse successfully."),
	);
	let coordinator = SessionCoordinator::new(credentials.clone(), config);

	seed_token(&credentials, "stored-token").await;

	let mock = server
		.mock_async(|when, then| {
			when.method(GET).path("/api/export").header("authorization", "Bearer override");
			then.status(200).header("content-type", "application/json").body("{}");
		})
		.await;

	coordinator
		.request(ApiRequest::get("/api/export").with_header("Authorization", "Bearer override"))
		.await
		.expect("The override header should reach the backend untouched.");

	mock.assert_async().await;
}
