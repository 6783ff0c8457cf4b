//! Application configuration.
//!
//! Defaults can be overridden from the page URL, e.g.
//! `/?addr=http://dgraph:8080&nodes=500&label=title`.

use log::warn;
use serde::{Deserialize, Serialize};

/// Endpoint used when none is configured.
pub const DEFAULT_ENDPOINT: &str = "http://localhost:8080";
/// Maximum number of nodes materialized before the user asks for more.
pub const DEFAULT_NODE_CAP: usize = 250;
/// Attribute-name pattern used to pick a node's display label.
pub const DEFAULT_LABEL_PATTERN: &str = "Name";

/// Settings shared by every frame.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
	/// Base URL of the database endpoint.
	pub endpoint_url: String,
	/// Node budget for a non-expanding drain.
	pub node_cap: usize,
	/// Label pattern used when a frame doesn't carry its own.
	pub label_pattern: String,
}

impl Default for AppConfig {
	fn default() -> Self {
		Self {
			endpoint_url: DEFAULT_ENDPOINT.into(),
			node_cap: DEFAULT_NODE_CAP,
			label_pattern: DEFAULT_LABEL_PATTERN.into(),
		}
	}
}

impl AppConfig {
	/// Build a config from the query string of `href`, falling back to
	/// defaults for anything missing or unparsable.
	pub fn from_url(href: &str) -> Self {
		let mut config = Self::default();
		let url = match reqwest::Url::parse(href) {
			Ok(url) => url,
			Err(err) => {
				warn!("ignoring unparsable page url {href:?}: {err}");
				return config;
			}
		};

		for (key, value) in url.query_pairs() {
			match key.as_ref() {
				"addr" if !value.is_empty() => {
					config.endpoint_url = value.trim_end_matches('/').to_string();
				}
				"nodes" => match value.parse::<usize>() {
					Ok(cap) if cap > 0 => config.node_cap = cap,
					_ => warn!("ignoring invalid node cap {value:?}"),
				},
				"label" if !value.is_empty() => config.label_pattern = value.into_owned(),
				_ => {}
			}
		}
		config
	}

	/// Read the config from the current browser location.
	pub fn from_location() -> Self {
		web_sys::window()
			.and_then(|window| window.location().href().ok())
			.map(|href| Self::from_url(&href))
			.unwrap_or_default()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn defaults_without_query() {
		assert_eq!(
			AppConfig::from_url("http://localhost:8000/"),
			AppConfig::default()
		);
	}

	#[test]
	fn query_overrides() {
		let config = AppConfig::from_url(
			"http://localhost:8000/?addr=http%3A%2F%2Fdgraph%3A9080%2F&nodes=40&label=title",
		);
		assert_eq!(config.endpoint_url, "http://dgraph:9080");
		assert_eq!(config.node_cap, 40);
		assert_eq!(config.label_pattern, "title");
	}

	#[test]
	fn bad_values_keep_defaults() {
		let config = AppConfig::from_url("http://localhost:8000/?nodes=0&addr=");
		assert_eq!(config, AppConfig::default());

		assert_eq!(AppConfig::from_url("not a url"), AppConfig::default());
	}

	#[test]
	fn deserializes_with_missing_fields() {
		let config: AppConfig = serde_json::from_str(r#"{"node_cap": 10}"#).unwrap();
		assert_eq!(config.node_cap, 10);
		assert_eq!(config.endpoint_url, DEFAULT_ENDPOINT);
	}
}
