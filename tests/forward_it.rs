// crates.io
use httpmock::prelude::*;
// self
use alarm_relay::{
	_preludet::*,
	config::{HttpSettings, RelayConfig, TargetId},
	error::{AcquisitionError, ForwardError},
	forward::DownstreamRequest,
};

const TOKEN_BODY: &str =
	"{\"access_token\":\"T\",\"token_type\":\"bearer\",\"expires_in\":\"3599\"}";

fn target_id(id: &str) -> TargetId {
	TargetId::new(id).expect("Target identifier should be valid for forwarder tests.")
}

fn config_for(server: &MockServer, id: &str) -> RelayConfig {
	RelayConfig::new([test_target(id, &server.base_url(), &server.url("/token"))])
}

#[tokio::test]
async fn forwarded_calls_carry_bearer_and_identification_headers() {
	let server = MockServer::start_async().await;
	let forwarder = build_test_forwarder(config_for(&server, "woke"));
	let token_mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/token");
			then.status(200).header("content-type", "application/json").body(TOKEN_BODY);
		})
		.await;
	let alarms_mock = server
		.mock_async(|when, then| {
			when.method(GET)
				.path("/api/clock/alarms")
				.header("authorization", "Bearer T")
				.header("identification-id", "1234");
			then.status(200)
				.header("content-type", "application/json")
				.body("{\"alarm1\":\"07:00\"}");
		})
		.await;
	let first = forwarder
		.forward(&target_id("woke"), DownstreamRequest::get("/api/clock/alarms"))
		.await
		.expect("First forwarded call should succeed.");
	let second = forwarder
		.forward(&target_id("woke"), DownstreamRequest::get("/api/clock/alarms"))
		.await
		.expect("Second forwarded call should succeed.");

	assert_eq!(first.status, 200);
	assert_eq!(second.status, 200);
	assert_eq!(first.body, b"{\"alarm1\":\"07:00\"}");

	// Two downstream calls, one token-endpoint call.
	token_mock.assert_calls_async(1).await;
	alarms_mock.assert_calls_async(2).await;
}

#[tokio::test]
async fn acquisition_failure_short_circuits_before_the_downstream_call() {
	let server = MockServer::start_async().await;
	let forwarder = build_test_forwarder(config_for(&server, "woke"));

	server
		.mock_async(|when, then| {
			when.method(POST).path("/token");
			then.status(500).body("identity provider on fire");
		})
		.await;

	let alarms_mock = server
		.mock_async(|when, then| {
			when.method(GET).path("/api/clock/alarms");
			then.status(200).body("{}");
		})
		.await;
	let error = forwarder
		.forward(&target_id("woke"), DownstreamRequest::get("/api/clock/alarms"))
		.await
		.expect_err("Forward should fail when no token is obtainable.");

	assert!(matches!(
		error,
		Error::Forward(ForwardError::AuthFailure {
			source: AcquisitionError::Rejected { status: 500, .. },
		})
	));

	alarms_mock.assert_calls_async(0).await;
}

#[tokio::test]
async fn downstream_rejections_preserve_status_and_body() {
	let server = MockServer::start_async().await;
	let forwarder = build_test_forwarder(config_for(&server, "woke"));

	server
		.mock_async(|when, then| {
			when.method(POST).path("/token");
			then.status(200).header("content-type", "application/json").body(TOKEN_BODY);
		})
		.await;
	server
		.mock_async(|when, then| {
			when.method(GET).path("/api/clock/alarms");
			then.status(500).body("{\"error\":\"clock melted\"}");
		})
		.await;

	let error = forwarder
		.forward(&target_id("woke"), DownstreamRequest::get("/api/clock/alarms"))
		.await
		.expect_err("Downstream 500 should fail the forward.");

	match error {
		Error::Forward(ForwardError::DownstreamError { status, body }) => {
			assert_eq!(status, 500);
			assert_eq!(body, "{\"error\":\"clock melted\"}");
		},
		other => panic!("Expected a downstream error, got: {other:?}"),
	}
}

#[tokio::test]
async fn downstream_timeouts_surface_as_unreachable() {
	let server = MockServer::start_async().await;
	let config = config_for(&server, "woke").with_http(
		HttpSettings::default()
			.with_request_timeout(std::time::Duration::from_millis(250)),
	);
	let forwarder = build_test_forwarder(config);

	server
		.mock_async(|when, then| {
			when.method(POST).path("/token");
			then.status(200).header("content-type", "application/json").body(TOKEN_BODY);
		})
		.await;
	server
		.mock_async(|when, then| {
			when.method(GET).path("/api/clock/alarms");
			then.status(200).body("{}").delay(std::time::Duration::from_secs(2));
		})
		.await;

	let error = forwarder
		.forward(&target_id("woke"), DownstreamRequest::get("/api/clock/alarms"))
		.await
		.expect_err("A downstream stall should fail within the configured window.");

	assert!(matches!(error, Error::Forward(ForwardError::Unreachable { .. })));
}

#[tokio::test]
async fn oversized_downstream_bodies_are_rejected() {
	let server = MockServer::start_async().await;
	let mut config = config_for(&server, "woke");

	config.targets[0] = config.targets[0].clone().with_max_body_bytes(64);

	let forwarder = build_test_forwarder(config);

	server
		.mock_async(|when, then| {
			when.method(POST).path("/token");
			then.status(200).header("content-type", "application/json").body(TOKEN_BODY);
		})
		.await;
	server
		.mock_async(|when, then| {
			when.method(GET).path("/api/clock/alarms");
			then.status(200).body("x".repeat(512));
		})
		.await;

	let error = forwarder
		.forward(&target_id("woke"), DownstreamRequest::get("/api/clock/alarms"))
		.await
		.expect_err("A body beyond the cap should fail the forward.");

	assert!(matches!(
		error,
		Error::Forward(ForwardError::BodyTooLarge { limit: 64 })
	));
}

#[tokio::test]
async fn post_bodies_are_forwarded_verbatim() {
	let server = MockServer::start_async().await;
	let forwarder = build_test_forwarder(config_for(&server, "woke"));

	server
		.mock_async(|when, then| {
			when.method(POST).path("/token");
			then.status(200).header("content-type", "application/json").body(TOKEN_BODY);
		})
		.await;

	let alarms_mock = server
		.mock_async(|when, then| {
			when.method(POST)
				.path("/api/clock/alarms")
				.header("content-type", "application/json")
				.body("{\"year\":1972,\"month\":10,\"day\":10,\"hour\":10,\"message\":\"Hi\"}");
			then.status(200)
				.header("content-type", "application/json")
				.body("{\"alarm1\":\"10:00\"}");
		})
		.await;
	let body = b"{\"year\":1972,\"month\":10,\"day\":10,\"hour\":10,\"message\":\"Hi\"}".to_vec();
	let request = DownstreamRequest::post("/api/clock/alarms", body)
		.with_header("Content-Type", "application/json");
	let response = forwarder
		.forward(&target_id("woke"), request)
		.await
		.expect("Verbatim POST should succeed.");

	assert_eq!(response.status, 200);

	alarms_mock.assert_calls_async(1).await;
}
