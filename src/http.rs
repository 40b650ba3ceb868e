//! Shared outbound HTTP client construction.
//!
//! Both the token exchange and the downstream forwarder reuse one client so the
//! connect/read/write timeouts and the optional proxy apply uniformly, matching
//! the single connector the deployment tunes. Redirect following stays disabled;
//! the token endpoint returns results directly and the alarm API never redirects.

// self
#[cfg(feature = "reqwest")]
use crate::{_prelude::*, config::HttpSettings, error::ConfigError};

/// Builds the shared [`ReqwestClient`] from transport settings.
#[cfg(feature = "reqwest")]
pub fn build_client(settings: &HttpSettings) -> Result<ReqwestClient, ConfigError> {
	let mut builder = ReqwestClient::builder()
		.connect_timeout(settings.connect_timeout)
		.timeout(settings.request_timeout)
		.redirect(reqwest::redirect::Policy::none());

	if let Some(proxy) = &settings.proxy {
		builder = builder.proxy(reqwest::Proxy::all(proxy.url())?);
	}

	builder.build().map_err(ConfigError::from)
}

#[cfg(all(test, feature = "reqwest"))]
mod tests {
	// std
	use std::time::Duration as StdDuration;
	// self
	use super::*;
	use crate::config::ProxySettings;

	#[test]
	fn client_builds_with_custom_timeouts() {
		let settings = HttpSettings::default()
			.with_connect_timeout(StdDuration::from_millis(250))
			.with_request_timeout(StdDuration::from_secs(2));

		build_client(&settings).expect("Client should build from plain timeout settings.");
	}

	#[test]
	fn client_builds_with_proxy_configured() {
		let settings = HttpSettings::default()
			.with_proxy(ProxySettings { host: "internet.dorf.com".into(), port: 83 });

		build_client(&settings).expect("Client should build with a proxy configured.");
	}
}
