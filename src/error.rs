//! Relay-level error types shared across token acquisition, caching, and forwarding.

// self
use crate::_prelude::*;

/// Relay-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Canonical relay error exposed by public APIs.
#[derive(Debug, ThisError)]
pub enum Error {
	/// Local configuration problem.
	#[error(transparent)]
	Config(#[from] ConfigError),
	/// Identity provider rejected the token request or was unreachable.
	#[error(transparent)]
	Acquisition(#[from] AcquisitionError),
	/// Downstream forwarding failure.
	#[error(transparent)]
	Forward(#[from] ForwardError),

	/// Downstream response payload could not be decoded.
	#[error("Downstream response payload is malformed.")]
	PayloadDecode {
		/// Structured parsing failure.
		#[source]
		source: serde_path_to_error::Error<serde_json::Error>,
	},
	/// Domain payload could not be encoded for forwarding.
	#[error("Request payload could not be encoded.")]
	PayloadEncode {
		/// Serialization failure.
		#[source]
		source: serde_json::Error,
	},
}

/// Configuration and construction failures raised by the relay.
#[derive(Debug, ThisError)]
pub enum ConfigError {
	/// HTTP client could not be constructed.
	#[error("HTTP client could not be constructed.")]
	HttpClientBuild {
		/// Underlying transport builder failure.
		#[source]
		source: BoxError,
	},
	/// No target with the requested identifier is configured.
	#[error("No downstream target named `{target}` is configured.")]
	UnknownTarget {
		/// Requested target identifier string.
		target: String,
	},
	/// Target identifier failed validation.
	#[error(transparent)]
	InvalidTargetId(#[from] crate::config::TargetIdError),
	/// Base URL and request path cannot be combined into a valid URL.
	#[error("Request path cannot be joined onto the target base URL.")]
	InvalidPath {
		/// Underlying parsing failure.
		#[source]
		source: url::ParseError,
	},
}
impl ConfigError {
	/// Wraps a transport's builder failure inside [`ConfigError`].
	pub fn http_client_build(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::HttpClientBuild { source: Box::new(src) }
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for ConfigError {
	fn from(e: ReqwestError) -> Self {
		Self::http_client_build(e)
	}
}

/// Token acquisition failures raised by the identity-provider exchange.
///
/// Every variant is cheaply cloneable so a single in-flight acquisition can hand
/// the same outcome to every caller waiting on it.
#[derive(Clone, Debug, ThisError)]
pub enum AcquisitionError {
	/// Identity provider answered with a non-2xx status.
	#[error("Identity provider rejected the token request with status {status}: {body_snippet}")]
	Rejected {
		/// HTTP status code returned by the token endpoint.
		status: u16,
		/// Leading bytes of the response body, capped for log safety.
		body_snippet: String,
	},
	/// Token endpoint responded with a body that could not be parsed.
	#[error("Token endpoint returned a malformed response body.")]
	ResponseParse {
		/// Structured parsing failure.
		#[source]
		source: Arc<serde_path_to_error::Error<serde_json::Error>>,
		/// HTTP status code carried by the malformed response.
		status: u16,
	},
	/// Token endpoint response carried a missing, non-numeric, or non-positive `expires_in`.
	#[error("Token endpoint returned an unusable expires_in value.")]
	InvalidExpiresIn,
	/// Network failure while calling the token endpoint.
	#[error("Network error occurred while calling the token endpoint.")]
	Transport {
		/// Transport-specific network error.
		#[source]
		source: Arc<dyn std::error::Error + Send + Sync>,
	},
}
impl AcquisitionError {
	/// Wraps a transport-specific network error.
	pub fn transport(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::Transport { source: Arc::new(src) }
	}
}

/// Authenticated-forwarding failures raised toward the downstream API.
#[derive(Debug, ThisError)]
pub enum ForwardError {
	/// No valid token could be obtained; the downstream call was never attempted.
	#[error("No valid token could be obtained for the downstream call.")]
	AuthFailure {
		/// Acquisition failure that blocked the call.
		#[source]
		source: AcquisitionError,
	},
	/// Downstream API answered with a non-2xx status; body preserved verbatim.
	#[error("Downstream API returned status {status}.")]
	DownstreamError {
		/// HTTP status code returned downstream.
		status: u16,
		/// Response body as received, so callers can surface provider detail.
		body: String,
	},
	/// Downstream response body exceeded the configured in-memory limit.
	#[error("Downstream response exceeded the in-memory limit of {limit} bytes.")]
	BodyTooLarge {
		/// Configured per-target body cap in bytes.
		limit: usize,
	},
	/// Timeout or connection failure toward the downstream API.
	#[error("Downstream API is unreachable.")]
	Unreachable {
		/// Transport-specific network error.
		#[source]
		source: BoxError,
	},
}
impl ForwardError {
	/// Wraps a transport-specific network error.
	pub fn unreachable(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::Unreachable { source: Box::new(src) }
	}
}
