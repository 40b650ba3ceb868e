// crates.io
use httpmock::prelude::*;
// self
use alarm_relay::{
	_preludet::*,
	config::{RelayConfig, TargetId},
	error::AcquisitionError,
	token::Token,
};

fn target_id(id: &str) -> TargetId {
	TargetId::new(id).expect("Target identifier should be valid for manager tests.")
}

fn config_for(server: &MockServer, id: &str) -> RelayConfig {
	RelayConfig::new([test_target(id, &server.base_url(), &server.url("/token"))])
}

#[tokio::test]
async fn second_call_within_validity_reuses_the_cached_token() {
	let server = MockServer::start_async().await;
	let manager = build_test_manager(config_for(&server, "woke"));
	let mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/token");
			then.status(200).header("content-type", "application/json").body(
				"{\"access_token\":\"cached\",\"token_type\":\"bearer\",\"expires_in\":3599}",
			);
		})
		.await;
	let first = manager
		.get_valid_token(&target_id("woke"))
		.await
		.expect("Initial token call should succeed.");
	let second = manager
		.get_valid_token(&target_id("woke"))
		.await
		.expect("Cached token call should succeed.");

	assert_eq!(first.access_token.expose(), "cached");
	assert_eq!(second.access_token.expose(), "cached");

	mock.assert_calls_async(1).await;
}

#[tokio::test]
async fn token_exchange_posts_the_expected_form_fields() {
	let server = MockServer::start_async().await;
	let manager = build_test_manager(config_for(&server, "woke"));
	let mock = server
		.mock_async(|when, then| {
			when.method(POST)
				.path("/token")
				.header("content-type", "application/x-www-form-urlencoded")
				.header("accept", "application/json")
				.body_includes("grant_type=client_credentials")
				.body_includes("client_id=test-client")
				.body_includes("client_secret=test-secret")
				.body_includes("resource=api%3A%2F%2Fwoke");
			then.status(200).header("content-type", "application/json").body(
				"{\"access_token\":\"form-ok\",\"token_type\":\"bearer\",\"expires_in\":900}",
			);
		})
		.await;
	let token = manager
		.get_valid_token(&target_id("woke"))
		.await
		.expect("Exchange with matching form fields should succeed.");

	assert_eq!(token.access_token.expose(), "form-ok");

	mock.assert_calls_async(1).await;
}

#[tokio::test]
async fn concurrent_callers_share_one_identity_provider_call() {
	let server = MockServer::start_async().await;
	let manager = build_test_manager(config_for(&server, "woke"));
	let mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/token");
			then.status(200)
				.header("content-type", "application/json")
				.body(
					"{\"access_token\":\"guarded\",\"token_type\":\"bearer\",\"expires_in\":900}",
				)
				.delay(std::time::Duration::from_millis(200));
		})
		.await;
	let id = target_id("woke");
	let (first, second, third, fourth) = tokio::join!(
		manager.get_valid_token(&id),
		manager.get_valid_token(&id),
		manager.get_valid_token(&id),
		manager.get_valid_token(&id),
	);

	for token in [first, second, third, fourth] {
		let token: Token = token.expect("Every concurrent caller should receive the token.");

		assert_eq!(token.access_token.expose(), "guarded");
	}

	mock.assert_calls_async(1).await;
}

#[tokio::test]
async fn concurrent_callers_share_the_same_failure() {
	let server = MockServer::start_async().await;
	let manager = build_test_manager(config_for(&server, "woke"));
	let mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/token");
			then.status(500)
				.body("identity provider on fire")
				.delay(std::time::Duration::from_millis(200));
		})
		.await;
	let id = target_id("woke");
	let (first, second) = tokio::join!(
		manager.get_valid_token(&id),
		manager.get_valid_token(&id),
	);

	for outcome in [first, second] {
		let error = outcome.expect_err("Every concurrent caller should observe the failure.");

		assert!(error.to_string().contains("500"));
	}

	mock.assert_calls_async(1).await;
}

#[tokio::test]
async fn failed_acquisition_is_retried_immediately_on_the_next_call() {
	let server = MockServer::start_async().await;
	let manager = build_test_manager(config_for(&server, "woke"));
	let mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/token");
			then.status(503).body("try later");
		})
		.await;

	manager
		.get_valid_token(&target_id("woke"))
		.await
		.expect_err("First call should surface the provider rejection.");
	manager
		.get_valid_token(&target_id("woke"))
		.await
		.expect_err("Second call should surface the provider rejection.");

	// No backoff state between calls.
	mock.assert_calls_async(2).await;
}

#[tokio::test]
async fn numeric_string_expires_in_is_tolerated() {
	let server = MockServer::start_async().await;
	let manager = build_test_manager(config_for(&server, "woke"));

	server
		.mock_async(|when, then| {
			when.method(POST).path("/token");
			then.status(200)
				.header("content-type", "application/json")
				.body("{\"access_token\":\"T\",\"token_type\":\"bearer\",\"expires_in\":\"3599\"}");
		})
		.await;

	let token = manager
		.get_valid_token(&target_id("woke"))
		.await
		.expect("Numeric-string expires_in should be accepted.");

	assert_eq!(token.access_token.expose(), "T");
	assert_eq!(token.expires_at - token.issued_at, Duration::seconds(3599));
}

#[tokio::test]
async fn provider_rejection_carries_status_and_body_snippet() {
	let server = MockServer::start_async().await;
	let manager = build_test_manager(config_for(&server, "woke"));

	server
		.mock_async(|when, then| {
			when.method(POST).path("/token");
			then.status(401).body("{\"error\":\"invalid_client\"}");
		})
		.await;

	let error = manager
		.get_valid_token(&target_id("woke"))
		.await
		.expect_err("Provider rejection should fail the call.");

	assert!(matches!(
		error,
		Error::Acquisition(AcquisitionError::Rejected { status: 401, .. })
	));
	assert!(error.to_string().contains("invalid_client"));
}
