use super::transport::QueryResponse;
use crate::frame::FrameTiming;
use crate::graph::GraphSnapshot;

/// Shown when a query succeeded but produced nothing to draw.
pub const EMPTY_RESULT_MESSAGE: &str = "Your query did not return any results";
/// Shown for mutations and alters whose response carries no message.
pub const DEFAULT_MUTATION_MESSAGE: &str = "Done";

/// What a frame currently displays. Exactly one is active.
#[derive(Clone, Debug, Default, PartialEq)]
pub enum FrameOutcome {
	/// Nothing received yet.
	#[default]
	Loading,
	/// A non-empty graph.
	Graph(GraphSnapshot),
	/// Informational message: empty results, mutation status.
	Success(String),
	/// Query error or transport failure.
	Error(String),
}

/// Coarse position in the fetch cycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
	/// Never fetched, or reset.
	Idle,
	/// A request newer than the last accepted response is outstanding.
	Pending,
	/// The latest request has been answered.
	Settled,
}

/// Per-frame execution bookkeeping.
///
/// `received_version <= requested_version` always holds; both only grow
/// until the owning controller is reset.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ExecutionState {
	requested_version: u64,
	received_version: u64,
	outcome: FrameOutcome,
	raw_response: Option<QueryResponse>,
	timing: Option<FrameTiming>,
}

impl ExecutionState {
	/// Highest version a fetch was issued for; 0 if none.
	pub fn requested_version(&self) -> u64 {
		self.requested_version
	}

	/// Highest version whose response was accepted; 0 if none.
	pub fn received_version(&self) -> u64 {
		self.received_version
	}

	/// The active outcome.
	pub fn outcome(&self) -> &FrameOutcome {
		&self.outcome
	}

	/// Last accepted (or previewed) raw response.
	pub fn raw_response(&self) -> Option<&QueryResponse> {
		self.raw_response.as_ref()
	}

	/// Latency of the last response that reported server timing.
	pub fn timing(&self) -> Option<FrameTiming> {
		self.timing
	}

	/// Current graph, if the outcome is one.
	pub fn graph(&self) -> Option<&GraphSnapshot> {
		match &self.outcome {
			FrameOutcome::Graph(snapshot) => Some(snapshot),
			_ => None,
		}
	}

	/// Where the frame is in its fetch cycle.
	pub fn phase(&self) -> Phase {
		if self.requested_version == 0 {
			Phase::Idle
		} else if self.requested_version > self.received_version {
			Phase::Pending
		} else {
			Phase::Settled
		}
	}

	/// Whether a response for `version` would still be accepted.
	pub fn accepts(&self, version: u64) -> bool {
		version > self.received_version
	}

	pub(crate) fn mark_requested(&mut self, version: u64) {
		self.requested_version = self.requested_version.max(version);
	}

	pub(crate) fn accept(&mut self, version: u64) {
		debug_assert!(self.accepts(version));
		debug_assert!(version <= self.requested_version);
		self.received_version = version;
	}

	pub(crate) fn settle(&mut self, outcome: FrameOutcome) {
		self.outcome = outcome;
	}

	pub(crate) fn set_raw_response(&mut self, response: QueryResponse) {
		self.raw_response = Some(response);
	}

	pub(crate) fn set_timing(&mut self, timing: FrameTiming) {
		self.timing = Some(timing);
	}
}
