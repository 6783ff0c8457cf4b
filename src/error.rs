//! Error types shared by the transport and the graph assembler.

/// Fixed suffix appended to failures where no connection could be made.
pub const CONNECT_FAILURE_SUFFIX: &str = "Could not connect to the server";

/// Failure of a single call to the query transport.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
	/// No response at all: connection refused, DNS failure, CORS rejection.
	#[error("{0}")]
	Unreachable(String),

	/// The server answered, but not with a successful JSON body.
	#[error("server responded with status {status}")]
	Http {
		/// HTTP status code of the response.
		status: u16,
		/// Response body as text.
		body: String,
	},
}

impl TransportError {
	/// True when the endpoint could not be reached at all.
	pub fn is_unreachable(&self) -> bool {
		matches!(self, TransportError::Unreachable(_))
	}

	/// Message shown to the user for this failure.
	pub fn user_message(&self) -> String {
		match self {
			TransportError::Unreachable(cause) => format!("{cause}: {CONNECT_FAILURE_SUFFIX}"),
			TransportError::Http { body, .. } => body.clone(),
		}
	}
}

/// A label pattern that does not compile as a regular expression.
#[derive(Debug, thiserror::Error)]
#[error("invalid label pattern `{pattern}`: {source}")]
pub struct LabelPatternError {
	/// The rejected pattern.
	pub pattern: String,
	/// Underlying regex error.
	#[source]
	pub source: regex::Error,
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn unreachable_message_carries_suffix() {
		let err = TransportError::Unreachable("Failed to fetch".into());
		assert!(err.is_unreachable());
		assert_eq!(
			err.user_message(),
			"Failed to fetch: Could not connect to the server"
		);
	}

	#[test]
	fn http_failure_surfaces_body() {
		let err = TransportError::Http {
			status: 400,
			body: "bad request".into(),
		};
		assert!(!err.is_unreachable());
		assert_eq!(err.user_message(), "bad request");
		assert_eq!(err.to_string(), "server responded with status 400");
	}
}
