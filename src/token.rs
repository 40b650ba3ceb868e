//! Access-token record and lifecycle helpers.

pub mod acquirer;
pub mod manager;

mod secret;

pub use secret::TokenSecret;

// self
use crate::_prelude::*;

/// Current lifecycle status for a token at a given instant.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TokenStatus {
	/// Token is currently valid.
	Active,
	/// Token reached or passed its expiry instant.
	Expired,
}

/// Access token issued by the identity provider for one downstream target.
///
/// Replaced wholesale on every refresh; the manager never mutates a record in
/// place and never shares one across targets.
#[derive(Clone)]
pub struct Token {
	/// Opaque access token; callers must avoid logging it.
	pub access_token: TokenSecret,
	/// Instant the token was received.
	pub issued_at: OffsetDateTime,
	/// Absolute expiry computed from the issuance `expires_in`.
	pub expires_at: OffsetDateTime,
}
impl Token {
	/// Builds a token from a relative `expires_in` duration received at issuance.
	pub fn from_expires_in(
		access_token: impl Into<String>,
		issued_at: OffsetDateTime,
		expires_in: Duration,
	) -> Self {
		Self {
			access_token: TokenSecret::new(access_token),
			issued_at,
			expires_at: issued_at + expires_in,
		}
	}

	/// Computes the lifecycle status at a given instant.
	pub fn status_at(&self, instant: OffsetDateTime) -> TokenStatus {
		if instant >= self.expires_at { TokenStatus::Expired } else { TokenStatus::Active }
	}

	/// Returns `true` if the token has expired at the provided instant.
	pub fn is_expired_at(&self, instant: OffsetDateTime) -> bool {
		matches!(self.status_at(instant), TokenStatus::Expired)
	}

	/// Returns `true` if the token is still usable at `instant` once the clock-skew
	/// safety margin has been subtracted from its expiry.
	pub fn is_fresh_at(&self, instant: OffsetDateTime, safety_margin: Duration) -> bool {
		instant < self.expires_at - safety_margin
	}
}
impl Debug for Token {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("Token")
			.field("access_token", &"<redacted>")
			.field("issued_at", &self.issued_at)
			.field("expires_at", &self.expires_at)
			.finish()
	}
}
