//! Versioned execution of frame queries.

mod controller;
mod state;
mod transport;

pub use controller::{
	ConnectivityReporter, FrameController, FrameHooks, LogTelemetry, TelemetrySink,
};
pub use state::{
	DEFAULT_MUTATION_MESSAGE, EMPTY_RESULT_MESSAGE, ExecutionState, FrameOutcome, Phase,
};
pub use transport::{HttpTransport, QueryResponse, QueryTransport, ServerError};
