//! Authenticated alarm-API relay—client-credentials token caching, singleflight
//! refresh, and bounded-timeout forwarding toward fixed downstream targets.

#![deny(clippy::all, missing_docs, unused_crate_dependencies)]

pub mod config;
pub mod error;
pub mod forward;
pub mod http;
pub mod obs;
pub mod relay;
pub mod token;
#[cfg(feature = "reqwest")]
pub mod _preludet {
	//! Convenience helpers for the crate's own integration tests; not part of the
	//! stable API surface.

	pub use crate::_prelude::*;

	// self
	use crate::{
		config::{CredentialSet, RelayConfig, TargetConfig, TargetId},
		forward::Forwarder,
		http,
		relay::AlarmRelay,
		token::{acquirer::ReqwestAcquirer, manager::TokenManager},
	};

	/// Builds a target configuration pointed at test-controlled endpoints.
	pub fn test_target(id: &str, base_url: &str, token_endpoint: &str) -> TargetConfig {
		let id = TargetId::new(id).expect("Test target identifier should be valid.");
		let credentials = CredentialSet::new(
			"test-client",
			"test-secret",
			Url::parse(token_endpoint).expect("Test token endpoint should parse."),
			format!("api://{id}"),
		);

		TargetConfig::new(
			id,
			Url::parse(base_url).expect("Test base URL should parse."),
			credentials,
		)
	}

	/// Builds a token manager wired to a reqwest acquirer for integration tests.
	pub fn build_test_manager(config: RelayConfig) -> TokenManager {
		let config = Arc::new(config);
		let client =
			http::build_client(&config.http).expect("Test HTTP client should build.");

		TokenManager::new(config, Arc::new(ReqwestAcquirer::with_client(client)))
	}

	/// Builds a forwarder over a fresh manager and shared client for integration tests.
	pub fn build_test_forwarder(config: RelayConfig) -> Forwarder {
		let config = Arc::new(config);
		let client =
			http::build_client(&config.http).expect("Test HTTP client should build.");
		let acquirer = Arc::new(ReqwestAcquirer::with_client(client.clone()));
		let tokens = Arc::new(TokenManager::new(config.clone(), acquirer));

		Forwarder::new(config, client, tokens)
	}

	/// Builds the caller-facing relay for end-to-end integration tests.
	pub fn build_test_relay(config: RelayConfig) -> AlarmRelay {
		AlarmRelay::new(config).expect("Test relay should build.")
	}
}

mod _prelude {
	pub use std::{
		collections::HashMap,
		fmt::{Debug, Display, Formatter, Result as FmtResult},
		future::Future,
		pin::Pin,
		str::FromStr,
		sync::Arc,
	};

	pub use async_lock::Mutex as AsyncMutex;
	pub use parking_lot::{Mutex, RwLock};
	#[cfg(feature = "reqwest")]
	pub use reqwest::{Client as ReqwestClient, Error as ReqwestError};
	pub use serde::{Deserialize, Serialize};
	pub use thiserror::Error as ThisError;
	pub use time::{Duration, OffsetDateTime};
	pub use url::Url;

	pub use crate::error::{Error, Result};
}

#[cfg(feature = "reqwest")] pub use reqwest;
pub use url;
#[cfg(test)] use {httpmock as _, tokio as _};
