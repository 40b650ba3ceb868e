//! Startup configuration for the relay: target identities, credential sets, and
//! transport settings.
//!
//! Everything here is resolved once by the surrounding bootstrap and never mutated
//! afterwards. The relay core branches on these structs only, never on ambient
//! environment state; in particular the outbound proxy is an explicit optional
//! field instead of a deployment-profile string.

// std
use std::{borrow::Borrow, ops::Deref, time::Duration as StdDuration};
// self
use crate::{_prelude::*, token::TokenSecret};

/// Default connect timeout applied to both outbound clients.
pub const DEFAULT_CONNECT_TIMEOUT: StdDuration = StdDuration::from_secs(60);
/// Default end-to-end request timeout applied to both outbound clients.
pub const DEFAULT_REQUEST_TIMEOUT: StdDuration = StdDuration::from_secs(60);
/// Default cap on buffered downstream response bodies.
pub const DEFAULT_MAX_BODY_BYTES: usize = 16 * 1024 * 1024;

/// Validation failures for [`TargetId`] values.
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
pub enum TargetIdError {
	/// Identifier was empty.
	#[error("Target identifier must not be empty.")]
	Empty,
	/// Identifier contained a character outside `[A-Za-z0-9._-]`.
	#[error("Target identifier contains an invalid character: `{character}`.")]
	InvalidCharacter {
		/// Offending character.
		character: char,
	},
}

/// Identifier of a configured downstream target.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TargetId(String);
impl TargetId {
	/// Creates a new identifier after validation.
	pub fn new(value: impl AsRef<str>) -> Result<Self, TargetIdError> {
		let view = value.as_ref();

		validate_view(view)?;

		Ok(Self(view.to_owned()))
	}
}
impl Deref for TargetId {
	type Target = str;

	fn deref(&self) -> &Self::Target {
		&self.0
	}
}
impl AsRef<str> for TargetId {
	fn as_ref(&self) -> &str {
		&self.0
	}
}
impl Borrow<str> for TargetId {
	fn borrow(&self) -> &str {
		&self.0
	}
}
impl From<TargetId> for String {
	fn from(value: TargetId) -> Self {
		value.0
	}
}
impl TryFrom<String> for TargetId {
	type Error = TargetIdError;

	fn try_from(value: String) -> Result<Self, Self::Error> {
		validate_view(&value)?;

		Ok(Self(value))
	}
}
impl FromStr for TargetId {
	type Err = TargetIdError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		Self::new(s)
	}
}
impl Debug for TargetId {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		write!(f, "TargetId({})", self.0)
	}
}
impl Display for TargetId {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(&self.0)
	}
}

fn validate_view(view: &str) -> Result<(), TargetIdError> {
	if view.is_empty() {
		return Err(TargetIdError::Empty);
	}
	if let Some(character) =
		view.chars().find(|c| !c.is_ascii_alphanumeric() && !matches!(c, '.' | '_' | '-'))
	{
		return Err(TargetIdError::InvalidCharacter { character });
	}

	Ok(())
}

/// Client-credentials material for one downstream target.
///
/// Loaded once at startup and never mutated. Both targets of the original
/// deployment share one client id/secret pair but carry distinct `resource`
/// identifiers, so the set is stored per target rather than globally.
#[derive(Clone, Debug)]
pub struct CredentialSet {
	/// OAuth 2.0 client identifier.
	pub client_id: String,
	/// OAuth 2.0 client secret.
	pub client_secret: TokenSecret,
	/// Identity-provider token endpoint.
	pub token_endpoint: Url,
	/// Resource identifier sent as the nonstandard `resource` form field.
	pub resource: String,
}
impl CredentialSet {
	/// Creates a credential set for the provided endpoint and resource.
	pub fn new(
		client_id: impl Into<String>,
		client_secret: impl Into<String>,
		token_endpoint: Url,
		resource: impl Into<String>,
	) -> Self {
		Self {
			client_id: client_id.into(),
			client_secret: TokenSecret::new(client_secret),
			token_endpoint,
			resource: resource.into(),
		}
	}
}

/// Outbound HTTP proxy coordinates, applied only when present.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProxySettings {
	/// Proxy host name.
	pub host: String,
	/// Proxy port.
	pub port: u16,
}
impl ProxySettings {
	/// Renders the proxy as an `http://host:port` URL string.
	pub fn url(&self) -> String {
		format!("http://{}:{}", self.host, self.port)
	}
}

/// Transport settings shared by the token and downstream clients.
#[derive(Clone, Debug)]
pub struct HttpSettings {
	/// TCP connect timeout.
	pub connect_timeout: StdDuration,
	/// End-to-end request timeout covering read and write.
	pub request_timeout: StdDuration,
	/// Optional outbound proxy; `None` disables proxying entirely.
	pub proxy: Option<ProxySettings>,
}
impl HttpSettings {
	/// Overrides the connect timeout.
	pub fn with_connect_timeout(mut self, timeout: StdDuration) -> Self {
		self.connect_timeout = timeout;

		self
	}

	/// Overrides the end-to-end request timeout.
	pub fn with_request_timeout(mut self, timeout: StdDuration) -> Self {
		self.request_timeout = timeout;

		self
	}

	/// Routes both outbound clients through the provided proxy.
	pub fn with_proxy(mut self, proxy: ProxySettings) -> Self {
		self.proxy = Some(proxy);

		self
	}
}
impl Default for HttpSettings {
	fn default() -> Self {
		Self {
			connect_timeout: DEFAULT_CONNECT_TIMEOUT,
			request_timeout: DEFAULT_REQUEST_TIMEOUT,
			proxy: None,
		}
	}
}

/// Configuration for one downstream target.
#[derive(Clone, Debug)]
pub struct TargetConfig {
	/// Target identifier used as the cache key.
	pub id: TargetId,
	/// Downstream API base URL.
	pub base_url: Url,
	/// Credential set used to authenticate toward this target.
	pub credentials: CredentialSet,
	/// Fixed `Identification-Id` header value attached to every forwarded call.
	pub identification_id: String,
	/// Cap on buffered downstream response bodies, in bytes.
	pub max_body_bytes: usize,
}
impl TargetConfig {
	/// Creates a target configuration with default body limits.
	pub fn new(id: TargetId, base_url: Url, credentials: CredentialSet) -> Self {
		Self {
			id,
			base_url,
			credentials,
			identification_id: "1234".into(),
			max_body_bytes: DEFAULT_MAX_BODY_BYTES,
		}
	}

	/// Overrides the fixed identification header value.
	pub fn with_identification_id(mut self, value: impl Into<String>) -> Self {
		self.identification_id = value.into();

		self
	}

	/// Overrides the buffered-body cap.
	pub fn with_max_body_bytes(mut self, limit: usize) -> Self {
		self.max_body_bytes = limit;

		self
	}
}

/// Complete relay configuration: all targets plus shared transport settings.
#[derive(Clone, Debug, Default)]
pub struct RelayConfig {
	/// Configured downstream targets.
	pub targets: Vec<TargetConfig>,
	/// Transport settings shared by both outbound clients.
	pub http: HttpSettings,
}
impl RelayConfig {
	/// Creates a configuration from the provided targets with default transport settings.
	pub fn new(targets: impl IntoIterator<Item = TargetConfig>) -> Self {
		Self { targets: targets.into_iter().collect(), http: HttpSettings::default() }
	}

	/// Overrides the shared transport settings.
	pub fn with_http(mut self, http: HttpSettings) -> Self {
		self.http = http;

		self
	}

	/// Looks up the configuration for a target identifier.
	pub fn target(&self, id: &TargetId) -> Option<&TargetConfig> {
		self.targets.iter().find(|target| &target.id == id)
	}
}
