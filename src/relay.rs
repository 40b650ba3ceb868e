//! Caller-facing adapter: domain payloads and the relay entry points.
//!
//! The adapter owns the trivial mapping around the authenticated core: it encodes
//! [`AlarmRequest`] bodies, decodes [`WokeResponse`] payloads, stamps the caller's
//! identification number, and shapes downstream rejections into a response the
//! caller can render. Wire field names stay camelCase to match the alarm API.

// self
use crate::_prelude::*;
#[cfg(feature = "reqwest")]
use crate::{
	config::{RelayConfig, TargetId},
	error::ForwardError,
	forward::{DownstreamRequest, Forwarder},
	http,
	token::{acquirer::ReqwestAcquirer, manager::TokenManager},
};

/// Downstream path serving both alarm reads and writes.
pub const ALARMS_PATH: &str = "/api/clock/alarms";

/// Alarm creation payload, forwarded byte-for-byte as the downstream body.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlarmRequest {
	/// Alarm year.
	pub year: i32,
	/// Alarm month.
	pub month: i32,
	/// Alarm day.
	pub day: i32,
	/// Alarm hour.
	pub hour: i32,
	/// Free-form alarm message.
	pub message: String,
}

/// Alarm API response payload as rendered back to the caller.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WokeResponse {
	/// First configured alarm.
	pub alarm1: Option<String>,
	/// Second configured alarm.
	pub alarm2: Option<String>,
	/// Third configured alarm.
	pub alarm3: Option<String>,
	/// Caller identification echoed back by the adapter.
	#[serde(rename = "identificationNumber")]
	pub identification_number: Option<String>,
	/// Error detail when the downstream rejected the request.
	pub error: Option<String>,
}
impl WokeResponse {
	/// Shapes a downstream rejection into a caller-visible error payload carrying
	/// the original status code and provider-supplied detail.
	pub fn from_downstream_failure(status: u16, body: &str, identification_no: &str) -> Self {
		Self {
			identification_number: Some(identification_no.to_owned()),
			error: Some(format!("Downstream returned status {status}: {body}")),
			..Self::default()
		}
	}
}

#[cfg(feature = "reqwest")]
/// Caller-facing relay over the authenticated forwarder.
#[derive(Debug)]
pub struct AlarmRelay {
	forwarder: Forwarder,
}
#[cfg(feature = "reqwest")]
impl AlarmRelay {
	/// Builds the relay: one shared HTTP client feeding both the token exchange
	/// and the downstream forwarder, with the token cache created empty.
	pub fn new(config: RelayConfig) -> Result<Self> {
		let config = Arc::new(config);
		let client = http::build_client(&config.http)?;
		let acquirer = Arc::new(ReqwestAcquirer::with_client(client.clone()));
		let tokens = Arc::new(TokenManager::new(config.clone(), acquirer));

		Ok(Self { forwarder: Forwarder::new(config, client, tokens) })
	}

	/// Builds the relay over a caller-provided token manager, for setups that tune
	/// the safety margin or substitute the acquirer.
	pub fn with_token_manager(config: RelayConfig, tokens: Arc<TokenManager>) -> Result<Self> {
		let config = Arc::new(config);
		let client = http::build_client(&config.http)?;

		Ok(Self { forwarder: Forwarder::new(config, client, tokens) })
	}

	/// Fetches the configured alarms from the target.
	pub async fn get_alarms(
		&self,
		target: &TargetId,
		identification_no: &str,
	) -> Result<WokeResponse> {
		let request = DownstreamRequest::get(ALARMS_PATH);

		self.exchange(target, request, identification_no).await
	}

	/// Creates an alarm on the target, forwarding the payload verbatim.
	pub async fn add_alarm(
		&self,
		target: &TargetId,
		identification_no: &str,
		alarm: &AlarmRequest,
	) -> Result<WokeResponse> {
		let body =
			serde_json::to_vec(alarm).map_err(|source| Error::PayloadEncode { source })?;
		let request = DownstreamRequest::post(ALARMS_PATH, body)
			.with_header("Content-Type", "application/json");

		self.exchange(target, request, identification_no).await
	}

	async fn exchange(
		&self,
		target: &TargetId,
		request: DownstreamRequest,
		identification_no: &str,
	) -> Result<WokeResponse> {
		match self.forwarder.forward(target, request).await {
			Ok(response) => {
				let mut woke = decode_woke(&response.body)?;

				woke.identification_number = Some(identification_no.to_owned());

				Ok(woke)
			},
			Err(Error::Forward(ForwardError::DownstreamError { status, body })) =>
				Ok(WokeResponse::from_downstream_failure(status, &body, identification_no)),
			Err(other) => Err(other),
		}
	}
}

#[cfg(feature = "reqwest")]
fn decode_woke(body: &[u8]) -> Result<WokeResponse> {
	let mut deserializer = serde_json::Deserializer::from_slice(body);

	serde_path_to_error::deserialize(&mut deserializer)
		.map_err(|source| Error::PayloadDecode { source })
}
