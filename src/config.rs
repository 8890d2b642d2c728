//! Backend location, fixed at build time.

use thiserror::Error;
use url::Url;

/// Used when `TOPOLOGY_API_URL` is not set at build time.
pub const DEFAULT_API_URL: &str = "http://localhost:5000/api";

#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum ConfigError {
	#[error("invalid API base URL `{url}`: {reason}")]
	InvalidBaseUrl { url: String, reason: String },
	#[error("unsupported scheme `{0}` in API base URL")]
	UnsupportedScheme(String),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ApiConfig {
	base_url: String,
}

impl ApiConfig {
	pub fn from_env() -> Result<Self, ConfigError> {
		Self::new(option_env!("TOPOLOGY_API_URL").unwrap_or(DEFAULT_API_URL))
	}

	/// Accepts an absolute `http(s)` URL or a same-origin path such as
	/// `/api`. A trailing slash is dropped.
	pub fn new(raw: &str) -> Result<Self, ConfigError> {
		let base_url = raw.trim().trim_end_matches('/');
		if base_url.starts_with('/') {
			return Ok(Self {
				base_url: base_url.to_owned(),
			});
		}

		let parsed = Url::parse(base_url).map_err(|err| ConfigError::InvalidBaseUrl {
			url: raw.to_owned(),
			reason: err.to_string(),
		})?;
		match parsed.scheme() {
			"http" | "https" => Ok(Self {
				base_url: base_url.to_owned(),
			}),
			other => Err(ConfigError::UnsupportedScheme(other.to_owned())),
		}
	}

	pub fn base_url(&self) -> &str {
		&self.base_url
	}

	pub fn topology_url(&self) -> String {
		format!("{}/topology", self.base_url())
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn default_points_at_local_backend() {
		let config = ApiConfig::new(DEFAULT_API_URL).unwrap();
		assert_eq!(config.topology_url(), "http://localhost:5000/api/topology");
	}

	#[test]
	fn trailing_slash_is_trimmed() {
		assert_eq!(ApiConfig::new("https://pve.example/api/").unwrap().base_url(), "https://pve.example/api");
		assert_eq!(ApiConfig::new("/api/").unwrap().topology_url(), "/api/topology");
	}

	#[test]
	fn rejects_garbage_and_foreign_schemes() {
		assert!(matches!(ApiConfig::new("not a url"), Err(ConfigError::InvalidBaseUrl { .. })));
		assert_eq!(
			ApiConfig::new("ftp://pve.example/api"),
			Err(ConfigError::UnsupportedScheme("ftp".into()))
		);
	}
}
