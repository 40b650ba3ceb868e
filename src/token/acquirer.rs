//! Client-credentials token exchange against the identity provider.
//!
//! The acquirer is stateless: one form-encoded POST per call, no retries, no
//! caching. Retry and reuse policy live in [`crate::token::manager`]. The token
//! endpoint takes a nonstandard `resource` form field and may return `expires_in`
//! as either a JSON number or a numeric string, so the exchange is a direct form
//! POST instead of a generic OAuth client.

// self
use crate::{_prelude::*, config::CredentialSet, error::AcquisitionError, token::Token};

/// Cap applied to error-body snippets carried inside [`AcquisitionError::Rejected`].
const BODY_SNIPPET_MAX: usize = 256;

/// Boxed future returned by [`TokenAcquirer`] implementations.
pub type AcquireFuture<'a> =
	Pin<Box<dyn Future<Output = Result<Token, AcquisitionError>> + 'a + Send>>;

/// Contract for performing one client-credentials exchange.
///
/// Implementations must be safe to invoke concurrently for different targets and
/// must perform no side effects beyond the single network call.
pub trait TokenAcquirer
where
	Self: Send + Sync,
{
	/// Exchanges the credential set for a fresh token.
	fn acquire<'a>(&'a self, credentials: &'a CredentialSet) -> AcquireFuture<'a>;
}

/// Wire shape of a successful token-endpoint response.
///
/// Only the fields the relay consumes are modeled; `token_type` and the rest of
/// the provider payload are ignored.
#[derive(Debug, Deserialize)]
struct TokenEndpointResponse {
	access_token: String,
	expires_in: ExpiresIn,
}

/// `expires_in` as issued by the provider; numeric-as-string tolerated.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ExpiresIn {
	Seconds(i64),
	Text(String),
}
impl ExpiresIn {
	fn into_duration(self) -> Result<Duration, AcquisitionError> {
		let seconds = match self {
			Self::Seconds(seconds) => seconds,
			Self::Text(text) =>
				text.trim().parse::<i64>().map_err(|_| AcquisitionError::InvalidExpiresIn)?,
		};

		if seconds <= 0 {
			return Err(AcquisitionError::InvalidExpiresIn);
		}

		Ok(Duration::seconds(seconds))
	}
}

fn parse_token_response(body: &[u8], status: u16) -> Result<(String, Duration), AcquisitionError> {
	let mut deserializer = serde_json::Deserializer::from_slice(body);
	let parsed: TokenEndpointResponse = serde_path_to_error::deserialize(&mut deserializer)
		.map_err(|source| AcquisitionError::ResponseParse { source: Arc::new(source), status })?;
	let expires_in = parsed.expires_in.into_duration()?;

	Ok((parsed.access_token, expires_in))
}

fn body_snippet(body: &[u8]) -> String {
	let view = String::from_utf8_lossy(body);

	view.chars().take(BODY_SNIPPET_MAX).collect()
}

#[cfg(feature = "reqwest")] pub use reqwest_acquirer::ReqwestAcquirer;
#[cfg(feature = "reqwest")]
mod reqwest_acquirer {
	// crates.io
	use reqwest::header::ACCEPT;
	// self
	use super::*;

	/// Reqwest-backed [`TokenAcquirer`].
	///
	/// The wrapped client should be built by [`crate::http::build_client`] so the
	/// exchange shares the relay's timeout and proxy settings.
	#[derive(Clone, Default)]
	pub struct ReqwestAcquirer(ReqwestClient);
	impl ReqwestAcquirer {
		/// Wraps an existing reqwest client.
		pub fn with_client(client: ReqwestClient) -> Self {
			Self(client)
		}

		async fn acquire_now(
			client: ReqwestClient,
			credentials: &CredentialSet,
		) -> Result<Token, AcquisitionError> {
			// `.form` sets `Content-Type: application/x-www-form-urlencoded`.
			let response = client
				.post(credentials.token_endpoint.clone())
				.header(ACCEPT, "application/json")
				.form(&[
					("grant_type", "client_credentials"),
					("client_id", credentials.client_id.as_str()),
					("client_secret", credentials.client_secret.expose()),
					("resource", credentials.resource.as_str()),
				])
				.send()
				.await
				.map_err(AcquisitionError::transport)?;
			let status = response.status().as_u16();
			let body = response.bytes().await.map_err(AcquisitionError::transport)?;

			if !(200..300).contains(&status) {
				return Err(AcquisitionError::Rejected {
					status,
					body_snippet: body_snippet(&body),
				});
			}

			let issued_at = OffsetDateTime::now_utc();
			let (access_token, expires_in) = parse_token_response(&body, status)?;

			Ok(Token::from_expires_in(access_token, issued_at, expires_in))
		}
	}
	impl TokenAcquirer for ReqwestAcquirer {
		fn acquire<'a>(&'a self, credentials: &'a CredentialSet) -> AcquireFuture<'a> {
			let client = self.0.clone();

			Box::pin(Self::acquire_now(client, credentials))
		}
	}
}
