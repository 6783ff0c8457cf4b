//! The seam between a frame and the database endpoint.

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::TransportError;
use crate::frame::FrameAction;

/// One entry of a response's `errors` list.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ServerError {
	/// Human-readable message.
	#[serde(default)]
	pub message: String,
	/// Everything else the server sent along.
	#[serde(flatten)]
	pub details: Map<String, Value>,
}

/// Structured body returned by the endpoint.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryResponse {
	/// Result blocks for queries, status object for mutations and alters.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub data: Option<Value>,
	/// Server-side errors.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub errors: Option<Vec<ServerError>>,
	/// Latency and transaction details.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub extensions: Option<Value>,
}

impl QueryResponse {
	/// Response carrying only `data`.
	pub fn with_data(data: Value) -> Self {
		Self {
			data: Some(data),
			..Self::default()
		}
	}

	/// Response carrying a single error.
	pub fn with_error(message: impl Into<String>) -> Self {
		Self {
			errors: Some(vec![ServerError {
				message: message.into(),
				details: Map::new(),
			}]),
			..Self::default()
		}
	}

	/// Message of the first server error, if any.
	pub fn first_error(&self) -> Option<&str> {
		self.errors
			.as_ref()?
			.first()
			.map(|error| error.message.as_str())
	}

	/// True when `data` holds something other than null or an empty container.
	pub fn has_data(&self) -> bool {
		match &self.data {
			None | Some(Value::Null) => false,
			Some(Value::Object(map)) => !map.is_empty(),
			Some(Value::Array(items)) => !items.is_empty(),
			Some(Value::String(s)) => !s.is_empty(),
			Some(_) => true,
		}
	}

	/// `data.message`, as sent back by mutations and alters.
	pub fn message(&self) -> Option<&str> {
		self.data.as_ref()?.get("message")?.as_str()
	}

	/// Sum of the server's parsing, processing and encoding time.
	pub fn server_latency_ns(&self) -> Option<u64> {
		let latency = self.extensions.as_ref()?.get("server_latency")?.as_object()?;
		Some(
			["parsing_ns", "processing_ns", "encoding_ns"]
				.iter()
				.filter_map(|key| latency.get(*key).and_then(Value::as_u64))
				.sum(),
		)
	}
}

/// Executes frame requests against an endpoint.
///
/// Futures are `!Send`: everything runs on the browser's single thread.
#[async_trait(?Send)]
pub trait QueryTransport {
	/// Run `query` as `action`. `commit_immediately = false` requests a
	/// read-only debug run that the caller does not version-track.
	async fn execute(
		&self,
		endpoint: &str,
		query: &str,
		action: FrameAction,
		commit_immediately: bool,
	) -> Result<QueryResponse, TransportError>;
}

/// Transport over the endpoint's HTTP API.
#[derive(Clone, Debug, Default)]
pub struct HttpTransport {
	client: reqwest::Client,
}

impl HttpTransport {
	/// Transport with a fresh client.
	pub fn new() -> Self {
		Self::default()
	}
}

fn request_url(endpoint: &str, action: FrameAction, commit_immediately: bool) -> String {
	let base = format!("{}/{}", endpoint.trim_end_matches('/'), action.path());
	if action == FrameAction::Query && !commit_immediately {
		format!("{base}?debug=true")
	} else {
		base
	}
}

fn content_type(action: FrameAction) -> &'static str {
	match action {
		FrameAction::Query => "application/dql",
		FrameAction::Mutation => "application/rdf",
		FrameAction::Alter => "text/plain",
	}
}

#[async_trait(?Send)]
impl QueryTransport for HttpTransport {
	async fn execute(
		&self,
		endpoint: &str,
		query: &str,
		action: FrameAction,
		commit_immediately: bool,
	) -> Result<QueryResponse, TransportError> {
		let mut request = self
			.client
			.post(request_url(endpoint, action, commit_immediately))
			.header(CONTENT_TYPE, content_type(action))
			.body(query.to_string());
		if action == FrameAction::Mutation && commit_immediately {
			request = request.header("X-Dgraph-CommitNow", "true");
		}

		let response = request
			.send()
			.await
			.map_err(|err| TransportError::Unreachable(err.to_string()))?;
		let status = response.status();
		let body = response
			.text()
			.await
			.map_err(|err| TransportError::Unreachable(err.to_string()))?;

		if !status.is_success() {
			return Err(TransportError::Http {
				status: status.as_u16(),
				body,
			});
		}
		serde_json::from_str(&body).map_err(|_| TransportError::Http {
			status: status.as_u16(),
			body,
		})
	}
}

#[cfg(test)]
mod tests {
	use serde_json::json;

	use super::*;

	#[test]
	fn urls_per_action() {
		assert_eq!(
			request_url("http://db:8080/", FrameAction::Query, true),
			"http://db:8080/query"
		);
		assert_eq!(
			request_url("http://db:8080", FrameAction::Query, false),
			"http://db:8080/query?debug=true"
		);
		assert_eq!(
			request_url("http://db:8080", FrameAction::Mutation, false),
			"http://db:8080/mutate"
		);
		assert_eq!(
			request_url("http://db:8080", FrameAction::Alter, true),
			"http://db:8080/alter"
		);
	}

	#[test]
	fn parses_query_response() {
		let response: QueryResponse = serde_json::from_value(json!({
			"data": {"q": [{"uid": "0x1"}]},
			"extensions": {"server_latency": {"parsing_ns": 10, "processing_ns": 20, "encoding_ns": 5}}
		}))
		.unwrap();
		assert!(response.has_data());
		assert_eq!(response.first_error(), None);
		assert_eq!(response.server_latency_ns(), Some(35));
	}

	#[test]
	fn parses_error_response() {
		let response: QueryResponse = serde_json::from_value(json!({
			"errors": [{"message": "syntax error", "extensions": {"code": "ErrorInvalidRequest"}}]
		}))
		.unwrap();
		assert_eq!(response.first_error(), Some("syntax error"));
		assert!(response.errors.unwrap()[0].details.contains_key("extensions"));
	}

	#[test]
	fn empty_data_is_not_data() {
		assert!(!QueryResponse::with_data(json!({})).has_data());
		assert!(!QueryResponse::with_data(Value::Null).has_data());
		assert!(!QueryResponse::default().has_data());
		assert!(QueryResponse::with_data(json!({"q": []})).has_data());
	}

	#[test]
	fn empty_error_list_is_not_an_error() {
		let response = QueryResponse {
			errors: Some(Vec::new()),
			..QueryResponse::default()
		};
		assert_eq!(response.first_error(), None);
	}

	#[test]
	fn mutation_message() {
		let response = QueryResponse::with_data(json!({"code": "Success", "message": "Done"}));
		assert_eq!(response.message(), Some("Done"));
		assert_eq!(response.server_latency_ns(), None);
	}
}
