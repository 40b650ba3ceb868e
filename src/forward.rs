//! Authenticated forwarding toward the downstream alarm API.
//!
//! A forward call walks `Idle -> TokenPending -> TokenReady|TokenFailed` and, once
//! a token is in hand, `RequestSent -> Completed|TimedOut|TransportError`. Token
//! failure short-circuits before any downstream traffic. Exactly one downstream
//! attempt is made per call; retry policy belongs to the caller.

// self
use crate::{_prelude::*, error::ConfigError};

/// Header naming the fixed per-target identification value.
pub const IDENTIFICATION_HEADER: &str = "Identification-Id";

/// HTTP method of a downstream request.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Method {
	/// `GET` request.
	Get,
	/// `POST` request.
	Post,
}
impl Method {
	/// Returns the canonical method token.
	pub const fn as_str(self) -> &'static str {
		match self {
			Method::Get => "GET",
			Method::Post => "POST",
		}
	}
}
impl Display for Method {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// One downstream request; created per call and discarded afterwards.
#[derive(Clone, Debug)]
pub struct DownstreamRequest {
	/// HTTP method.
	pub method: Method,
	/// Path joined onto the target base URL.
	pub path: String,
	/// Additional headers beyond the authentication pair.
	pub headers: Vec<(String, String)>,
	/// Optional request body, forwarded verbatim.
	pub body: Option<Vec<u8>>,
}
impl DownstreamRequest {
	/// Creates a bodyless `GET` request.
	pub fn get(path: impl Into<String>) -> Self {
		Self { method: Method::Get, path: path.into(), headers: Vec::new(), body: None }
	}

	/// Creates a `POST` request carrying the provided body verbatim.
	pub fn post(path: impl Into<String>, body: Vec<u8>) -> Self {
		Self { method: Method::Post, path: path.into(), headers: Vec::new(), body: Some(body) }
	}

	/// Appends a header to the request.
	pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
		self.headers.push((name.into(), value.into()));

		self
	}
}

/// Downstream response with the body buffered up to the per-target cap.
#[derive(Clone, Debug)]
pub struct DownstreamResponse {
	/// HTTP status code.
	pub status: u16,
	/// Response headers with UTF-8-representable values.
	pub headers: Vec<(String, String)>,
	/// Response body, unparsed at this layer.
	pub body: Vec<u8>,
}

#[cfg(feature = "reqwest")] pub use forwarder::Forwarder;
#[cfg(feature = "reqwest")]
mod forwarder {
	// crates.io
	use reqwest::header::AUTHORIZATION;
	// self
	use super::*;
	use crate::{
		config::{RelayConfig, TargetId},
		error::ForwardError,
		obs::{self, OpOutcome, OpSpan, RelayOp},
		token::manager::TokenManager,
	};

	/// Attaches a valid token to downstream requests and maps transport outcomes.
	pub struct Forwarder {
		config: Arc<RelayConfig>,
		client: ReqwestClient,
		tokens: Arc<TokenManager>,
	}
	impl Forwarder {
		/// Creates a forwarder over a shared client and token manager.
		pub fn new(
			config: Arc<RelayConfig>,
			client: ReqwestClient,
			tokens: Arc<TokenManager>,
		) -> Self {
			Self { config, client, tokens }
		}

		/// Forwards one request to the target with a fresh or cached token attached.
		pub async fn forward(
			&self,
			target: &TargetId,
			request: DownstreamRequest,
		) -> Result<DownstreamResponse> {
			const KIND: RelayOp = RelayOp::Forward;

			let span = OpSpan::new(KIND, "forward");

			obs::record_op_outcome(KIND, OpOutcome::Attempt);

			let result = span.instrument(self.forward_inner(target, request)).await;

			match &result {
				Ok(_) => obs::record_op_outcome(KIND, OpOutcome::Success),
				Err(_) => obs::record_op_outcome(KIND, OpOutcome::Failure),
			}

			result
		}

		async fn forward_inner(
			&self,
			target: &TargetId,
			request: DownstreamRequest,
		) -> Result<DownstreamResponse> {
			let target_config = self
				.config
				.target(target)
				.ok_or_else(|| ConfigError::UnknownTarget { target: target.to_string() })?;
			let token = match self.tokens.get_valid_token(target).await {
				Ok(token) => token,
				Err(Error::Acquisition(source)) =>
					return Err(ForwardError::AuthFailure { source }.into()),
				Err(other) => return Err(other),
			};
			let url = joined_url(&target_config.base_url, &request.path)?;
			let method = match request.method {
				Method::Get => reqwest::Method::GET,
				Method::Post => reqwest::Method::POST,
			};
			let mut builder = self
				.client
				.request(method, url)
				.header(AUTHORIZATION, format!("Bearer {}", token.access_token.expose()))
				.header(IDENTIFICATION_HEADER, target_config.identification_id.as_str());

			for (name, value) in &request.headers {
				builder = builder.header(name.as_str(), value.as_str());
			}
			if let Some(body) = request.body {
				builder = builder.body(body);
			}

			let response = builder.send().await.map_err(classify_transport_error)?;
			let status = response.status().as_u16();
			let headers = response
				.headers()
				.iter()
				.filter_map(|(name, value)| {
					value.to_str().ok().map(|value| (name.to_string(), value.to_owned()))
				})
				.collect();
			let body = read_body_capped(response, target_config.max_body_bytes).await?;

			if !(200..300).contains(&status) {
				return Err(ForwardError::DownstreamError {
					status,
					body: String::from_utf8_lossy(&body).into_owned(),
				}
				.into());
			}

			Ok(DownstreamResponse { status, headers, body })
		}
	}
	impl Debug for Forwarder {
		fn fmt(&self, f: &mut Formatter) -> FmtResult {
			f.debug_struct("Forwarder").field("targets", &self.config.targets.len()).finish()
		}
	}

	async fn read_body_capped(mut response: reqwest::Response, limit: usize) -> Result<Vec<u8>> {
		let mut body = Vec::new();

		while let Some(chunk) = response.chunk().await.map_err(classify_transport_error)? {
			if body.len() + chunk.len() > limit {
				return Err(ForwardError::BodyTooLarge { limit }.into());
			}

			body.extend_from_slice(&chunk);
		}

		Ok(body)
	}

	fn classify_transport_error(error: ReqwestError) -> Error {
		// Timeouts and connection failures both mean "downstream unreachable";
		// everything else at this layer is still a transport-class failure.
		ForwardError::unreachable(error).into()
	}
}

fn joined_url(base: &Url, path: &str) -> Result<Url, ConfigError> {
	let mut raw = base.as_str().trim_end_matches('/').to_owned();

	if !path.starts_with('/') {
		raw.push('/');
	}

	raw.push_str(path);

	Url::parse(&raw).map_err(|source| ConfigError::InvalidPath { source })
}
