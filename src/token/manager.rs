//! Per-target token cache with singleflight refresh.
//!
//! Steady-state reads return the cached token from a shared read lock without
//! touching the network. When the cached token is missing or inside the safety
//! margin, exactly one caller per target performs the exchange while concurrent
//! callers wait on the same flight and receive its outcome, success or failure
//! alike. Failed attempts leave no backoff state behind; the next caller is free
//! to retry immediately.

// std
use std::sync::atomic::{AtomicU64, Ordering};
// self
use crate::{
	_prelude::*,
	config::{RelayConfig, TargetId},
	error::{AcquisitionError, ConfigError},
	obs::{self, OpOutcome, OpSpan, RelayOp},
	token::{Token, acquirer::TokenAcquirer},
};

/// Default clock-skew buffer subtracted from a token's expiry.
pub const DEFAULT_SAFETY_MARGIN: Duration = Duration::seconds(5);

/// Per-target refresh coordination state.
///
/// `attempts` counts completed acquisition flights. A caller snapshots it before
/// awaiting the flight lock; if the count moved while it waited, a flight it
/// piggy-backed on has resolved and its outcome sits in the slot.
#[derive(Debug, Default)]
struct FlightEntry {
	attempts: AtomicU64,
	slot: AsyncMutex<Option<Result<Token, AcquisitionError>>>,
}

/// Serves cached tokens and coordinates refreshes per downstream target.
pub struct TokenManager {
	config: Arc<RelayConfig>,
	acquirer: Arc<dyn TokenAcquirer>,
	safety_margin: Duration,
	cache: RwLock<HashMap<TargetId, Token>>,
	flights: Mutex<HashMap<TargetId, Arc<FlightEntry>>>,
}
impl TokenManager {
	/// Creates a manager over the provided configuration and acquirer.
	pub fn new(config: Arc<RelayConfig>, acquirer: Arc<dyn TokenAcquirer>) -> Self {
		Self {
			config,
			acquirer,
			safety_margin: DEFAULT_SAFETY_MARGIN,
			cache: RwLock::new(HashMap::new()),
			flights: Mutex::new(HashMap::new()),
		}
	}

	/// Overrides the clock-skew safety margin (defaults to 5 seconds).
	pub fn with_safety_margin(mut self, margin: Duration) -> Self {
		self.safety_margin = if margin.is_negative() { Duration::ZERO } else { margin };

		self
	}

	/// Returns a valid token for the target, refreshing it when required.
	///
	/// The fast path is a shared read of the cache; different targets never block
	/// each other, and a refresh for one target leaves still-valid tokens for the
	/// others untouched.
	pub async fn get_valid_token(&self, target: &TargetId) -> Result<Token> {
		const KIND: RelayOp = RelayOp::TokenAcquire;

		let span = OpSpan::new(KIND, "get_valid_token");

		obs::record_op_outcome(KIND, OpOutcome::Attempt);

		let result = span.instrument(self.get_valid_token_inner(target)).await;

		match &result {
			Ok(_) => obs::record_op_outcome(KIND, OpOutcome::Success),
			Err(_) => obs::record_op_outcome(KIND, OpOutcome::Failure),
		}

		result
	}

	async fn get_valid_token_inner(&self, target: &TargetId) -> Result<Token> {
		if let Some(token) = self.cached_fresh(target, OffsetDateTime::now_utc()) {
			return Ok(token);
		}

		let credentials = self
			.config
			.target(target)
			.ok_or_else(|| ConfigError::UnknownTarget { target: target.to_string() })?
			.credentials
			.clone();
		let entry = self.flight_entry(target);
		let seen = entry.attempts.load(Ordering::Acquire);
		let mut slot = entry.slot.lock().await;

		// A flight that finished while we waited may have repopulated the cache.
		if let Some(token) = self.cached_fresh(target, OffsetDateTime::now_utc()) {
			return Ok(token);
		}
		if entry.attempts.load(Ordering::Acquire) != seen
			&& let Some(outcome) = slot.as_ref()
		{
			return outcome.clone().map_err(Error::from);
		}

		// This caller owns the flight; everyone else for this target waits on it.
		let outcome = self.acquirer.acquire(&credentials).await;

		match &outcome {
			Ok(token) => {
				self.cache.write().insert(target.clone(), token.clone());
			},
			Err(_) => {
				// A token past its expiry must never outlive a failed refresh.
				let now = OffsetDateTime::now_utc();
				let mut cache = self.cache.write();

				if cache.get(target).is_some_and(|token| token.is_expired_at(now)) {
					cache.remove(target);
				}
			},
		}

		*slot = Some(outcome.clone());
		entry.attempts.fetch_add(1, Ordering::AcqRel);

		outcome.map_err(Error::from)
	}

	fn cached_fresh(&self, target: &TargetId, now: OffsetDateTime) -> Option<Token> {
		self.cache
			.read()
			.get(target)
			.filter(|token| token.is_fresh_at(now, self.safety_margin))
			.cloned()
	}

	fn flight_entry(&self, target: &TargetId) -> Arc<FlightEntry> {
		let mut flights = self.flights.lock();

		flights.entry(target.clone()).or_default().clone()
	}
}
impl Debug for TokenManager {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("TokenManager")
			.field("safety_margin", &self.safety_margin)
			.field("cached_targets", &self.cache.read().len())
			.finish()
	}
}
