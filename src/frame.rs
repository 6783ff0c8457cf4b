//! Frames: user-visible query slots.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};

/// What kind of request a frame sends.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FrameAction {
	/// Read-only query; results are rendered as a graph.
	#[default]
	Query,
	/// Data mutation.
	Mutation,
	/// Schema alteration.
	Alter,
}

impl FrameAction {
	/// Endpoint path segment the action is sent to.
	pub fn path(self) -> &'static str {
		match self {
			FrameAction::Query => "query",
			FrameAction::Mutation => "mutate",
			FrameAction::Alter => "alter",
		}
	}

	/// Parse the lowercase name used in the UI.
	pub fn parse(s: &str) -> Option<Self> {
		match s {
			"query" => Some(FrameAction::Query),
			"mutation" => Some(FrameAction::Mutation),
			"alter" => Some(FrameAction::Alter),
			_ => None,
		}
	}
}

impl fmt::Display for FrameAction {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(match self {
			FrameAction::Query => "query",
			FrameAction::Mutation => "mutation",
			FrameAction::Alter => "alter",
		})
	}
}

/// Display-related frame settings.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FrameMeta {
	/// Collapsed frames don't fetch and hold no results.
	#[serde(default)]
	pub collapsed: bool,
	/// Attribute-name pattern for node labels.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub regex_str: Option<String>,
}

/// Server/network split of the last request's latency.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameTiming {
	/// Time spent parsing, processing and encoding on the server.
	pub server_latency_ns: u64,
	/// Remaining wall-clock time.
	pub network_latency_ns: u64,
}

impl fmt::Display for FrameTiming {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(
			f,
			"server {:.1}ms, network {:.1}ms",
			self.server_latency_ns as f64 / 1e6,
			self.network_latency_ns as f64 / 1e6
		)
	}
}

fn first_version() -> u64 {
	1
}

/// Versions start at 1; a zero from outside would never be fetched.
fn positive_version<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
	Ok(u64::deserialize(deserializer)?.max(first_version()))
}

/// A logical query slot owned by the frame list.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Frame {
	/// Unique identifier.
	pub id: String,
	/// Query run on the first fetch.
	pub query: String,
	/// Query run on later fetches.
	#[serde(default)]
	pub extra_query: String,
	/// Request kind.
	#[serde(default)]
	pub action: FrameAction,
	/// Display settings.
	#[serde(default)]
	pub meta: FrameMeta,
	/// Bumped by the owner whenever fresh data is wanted.
	#[serde(default = "first_version", deserialize_with = "positive_version")]
	pub version: u64,
	/// Latency of the last completed request.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub timing: Option<FrameTiming>,
}

impl Frame {
	/// New expanded frame at version 1. The query doubles as the refresh query.
	pub fn new(id: impl Into<String>, query: impl Into<String>, action: FrameAction) -> Self {
		let query = query.into();
		Self {
			id: id.into(),
			extra_query: query.clone(),
			query,
			action,
			meta: FrameMeta::default(),
			version: first_version(),
			timing: None,
		}
	}

	/// Use a different query for refreshes.
	pub fn with_extra_query(mut self, extra_query: impl Into<String>) -> Self {
		self.extra_query = extra_query.into();
		self
	}

	/// Use a custom label pattern.
	pub fn with_label_pattern(mut self, pattern: impl Into<String>) -> Self {
		self.meta.regex_str = Some(pattern.into());
		self
	}

	/// Ask for fresh data.
	pub fn bump_version(&mut self) {
		self.version += 1;
	}

	/// Flip the collapsed flag.
	pub fn toggle_collapsed(&mut self) {
		self.meta.collapsed = !self.meta.collapsed;
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn version_defaults_once_on_ingest() {
		let frame: Frame = serde_json::from_str(r#"{"id": "f1", "query": "{ q() }"}"#).unwrap();
		assert_eq!(frame.version, 1);
		assert_eq!(frame.action, FrameAction::Query);
		assert!(!frame.meta.collapsed);
		assert_eq!(frame.extra_query, "");
	}

	#[test]
	fn zero_version_is_raised_to_one() {
		let frame: Frame =
			serde_json::from_str(r#"{"id": "f1", "query": "{ q() }", "version": 0}"#).unwrap();
		assert_eq!(frame.version, 1);
	}

	#[test]
	fn meta_uses_camel_case() {
		let frame: Frame = serde_json::from_str(
			r#"{"id": "f", "query": "q", "action": "mutation", "version": 4,
			    "meta": {"collapsed": true, "regexStr": "title"}}"#,
		)
		.unwrap();
		assert_eq!(frame.action, FrameAction::Mutation);
		assert_eq!(frame.version, 4);
		assert_eq!(frame.meta.regex_str.as_deref(), Some("title"));
		assert!(frame.meta.collapsed);
	}

	#[test]
	fn bump_and_toggle() {
		let mut frame = Frame::new("f", "q", FrameAction::Query).with_extra_query("q2");
		frame.bump_version();
		frame.toggle_collapsed();
		assert_eq!(frame.version, 2);
		assert!(frame.meta.collapsed);
		assert_eq!(frame.extra_query, "q2");
	}

	#[test]
	fn action_names() {
		assert_eq!(FrameAction::parse("alter"), Some(FrameAction::Alter));
		assert_eq!(FrameAction::parse("drop"), None);
		assert_eq!(FrameAction::Mutation.path(), "mutate");
		assert_eq!(FrameAction::Mutation.to_string(), "mutation");
	}
}
