//! Picking a display label out of an attribute bag.

use log::warn;
use regex::Regex;
use serde_json::Value;

use super::Attributes;
use crate::config::DEFAULT_LABEL_PATTERN;
use crate::error::LabelPatternError;

/// Matches attribute names against a label pattern.
#[derive(Clone, Debug)]
pub struct LabelMatcher {
	pattern: Regex,
}

impl LabelMatcher {
	/// Compile `pattern`.
	pub fn new(pattern: &str) -> Result<Self, LabelPatternError> {
		let pattern = Regex::new(pattern).map_err(|source| LabelPatternError {
			pattern: pattern.to_string(),
			source,
		})?;
		Ok(Self { pattern })
	}

	/// Compile `pattern`, using the default pattern if it is invalid.
	pub fn or_default(pattern: &str) -> Self {
		match Self::new(pattern) {
			Ok(matcher) => matcher,
			Err(err) => {
				warn!("{err}; using `{DEFAULT_LABEL_PATTERN}`");
				Self::default()
			}
		}
	}

	/// The source pattern.
	pub fn as_str(&self) -> &str {
		self.pattern.as_str()
	}

	/// Value of the first attribute whose name matches.
	pub fn extract(&self, attributes: &Attributes) -> Option<String> {
		attributes
			.iter()
			.filter(|(key, _)| self.pattern.is_match(key))
			.find_map(|(_, value)| scalar_text(value))
	}
}

impl Default for LabelMatcher {
	fn default() -> Self {
		Self {
			pattern: Regex::new(DEFAULT_LABEL_PATTERN).expect("default label pattern compiles"),
		}
	}
}

fn scalar_text(value: &Value) -> Option<String> {
	match value {
		Value::String(s) if !s.is_empty() => Some(s.clone()),
		Value::Number(n) => Some(n.to_string()),
		Value::Bool(b) => Some(b.to_string()),
		_ => None,
	}
}
