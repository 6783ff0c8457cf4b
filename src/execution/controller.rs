use std::cell::RefCell;
use std::rc::Rc;

use futures::FutureExt;
use futures::future::LocalBoxFuture;
use log::{debug, error, warn};

use super::state::{
	DEFAULT_MUTATION_MESSAGE, EMPTY_RESULT_MESSAGE, ExecutionState, FrameOutcome,
};
use super::transport::{QueryResponse, QueryTransport};
use crate::config::AppConfig;
use crate::error::TransportError;
use crate::frame::{Frame, FrameAction, FrameTiming};
use crate::graph::{GraphAssembler, GraphSnapshot};

/// Receives the global connection state.
pub trait ConnectivityReporter {
	/// `true` after an accepted response, `false` after a failed connection.
	fn on_update_connected_state(&self, connected: bool);
}

impl<F: Fn(bool)> ConnectivityReporter for F {
	fn on_update_connected_state(&self, connected: bool) {
		self(connected)
	}
}

/// Receives transport failures for diagnostics.
pub trait TelemetrySink {
	/// Called when the endpoint could not be reached.
	fn capture_failure(&self, error: &TransportError);
}

impl<F: Fn(&TransportError)> TelemetrySink for F {
	fn capture_failure(&self, error: &TransportError) {
		self(error)
	}
}

/// Telemetry through the `log` facade.
#[derive(Clone, Copy, Debug, Default)]
pub struct LogTelemetry;

impl TelemetrySink for LogTelemetry {
	fn capture_failure(&self, error: &TransportError) {
		error!("transport failure: {error}");
	}
}

/// Collaborators notified by a controller.
#[derive(Clone)]
pub struct FrameHooks {
	connectivity: Rc<dyn ConnectivityReporter>,
	telemetry: Rc<dyn TelemetrySink>,
}

impl FrameHooks {
	/// Hooks from a reporter and a sink.
	pub fn new(
		connectivity: impl ConnectivityReporter + 'static,
		telemetry: impl TelemetrySink + 'static,
	) -> Self {
		Self {
			connectivity: Rc::new(connectivity),
			telemetry: Rc::new(telemetry),
		}
	}

	/// Hooks that only log.
	pub fn silent() -> Self {
		Self::new(|_: bool| {}, LogTelemetry)
	}

	/// Unreachable endpoints go to telemetry and flip connectivity off,
	/// whether or not the failed request still matters to the frame.
	fn report_failure(&self, error: &TransportError) {
		if error.is_unreachable() {
			self.telemetry.capture_failure(error);
			self.connectivity.on_update_connected_state(false);
		}
	}
}

/// Identifies one issued fetch. Compared against the session on completion.
struct Ticket {
	epoch: u64,
	version: u64,
	action: FrameAction,
	label_pattern: String,
	started_ms: f64,
}

enum Settlement {
	Dropped,
	Accepted,
	Failed(TransportError),
}

/// Everything a reset throws away.
struct Session {
	epoch: u64,
	state: ExecutionState,
	assembler: GraphAssembler,
	label_pattern: String,
}

impl Session {
	fn new(epoch: u64, config: &AppConfig) -> Self {
		Self {
			epoch,
			state: ExecutionState::default(),
			assembler: GraphAssembler::new(config.node_cap),
			label_pattern: config.label_pattern.clone(),
		}
	}

	fn settle(&mut self, ticket: &Ticket, result: Result<QueryResponse, TransportError>) -> Settlement {
		if ticket.epoch != self.epoch {
			debug!("dropping response for version {} issued before reset", ticket.version);
			return Settlement::Dropped;
		}
		if !self.state.accepts(ticket.version) {
			debug!(
				"dropping stale response for version {} (already have {})",
				ticket.version,
				self.state.received_version()
			);
			return Settlement::Dropped;
		}

		self.state.accept(ticket.version);
		match result {
			Ok(response) => {
				if let Some(timing) = timing_since(&response, ticket.started_ms) {
					self.state.set_timing(timing);
				}
				self.state.set_raw_response(response.clone());
				let outcome = self.classify(ticket, response);
				self.state.settle(outcome);
				Settlement::Accepted
			}
			Err(error) => {
				self.state.settle(FrameOutcome::Error(error.user_message()));
				Settlement::Failed(error)
			}
		}
	}

	fn classify(&mut self, ticket: &Ticket, response: QueryResponse) -> FrameOutcome {
		if let Some(message) = response.first_error() {
			return FrameOutcome::Error(message.to_string());
		}
		if ticket.action != FrameAction::Query {
			let message = response.message().unwrap_or(DEFAULT_MUTATION_MESSAGE);
			return FrameOutcome::Success(message.to_string());
		}

		let data = match &response.data {
			Some(data) if response.has_data() => data.clone(),
			_ => return FrameOutcome::Success(EMPTY_RESULT_MESSAGE.into()),
		};
		self.label_pattern = ticket.label_pattern.clone();
		self.assembler.enqueue(data);
		self.assembler.drain(false, &self.label_pattern);
		self.snapshot(response)
	}

	fn snapshot(&self, raw_response: QueryResponse) -> FrameOutcome {
		match GraphSnapshot::build(self.assembler.current_graph(), raw_response) {
			Some(snapshot) => FrameOutcome::Graph(snapshot),
			None => FrameOutcome::Success(EMPTY_RESULT_MESSAGE.into()),
		}
	}
}

#[cfg(target_arch = "wasm32")]
fn now_ms() -> f64 {
	js_sys::Date::now()
}

#[cfg(not(target_arch = "wasm32"))]
fn now_ms() -> f64 {
	use std::time::{SystemTime, UNIX_EPOCH};

	SystemTime::now()
		.duration_since(UNIX_EPOCH)
		.map(|elapsed| elapsed.as_secs_f64() * 1e3)
		.unwrap_or_default()
}

fn timing_since(response: &QueryResponse, started_ms: f64) -> Option<FrameTiming> {
	let server_latency_ns = response.server_latency_ns()?;
	let total_ns = ((now_ms() - started_ms).max(0.0) * 1e6) as u64;
	Some(FrameTiming {
		server_latency_ns,
		network_latency_ns: total_ns.saturating_sub(server_latency_ns),
	})
}

/// Runs one frame's fetches and keeps its graph.
///
/// Fetches are returned as futures for the caller to spawn. Several may be
/// outstanding at once; a response is only accepted if its version is
/// strictly greater than the last accepted one and it was issued since the
/// last [`reset`](Self::reset).
pub struct FrameController<T> {
	transport: Rc<T>,
	hooks: FrameHooks,
	config: AppConfig,
	session: Rc<RefCell<Session>>,
}

impl<T: QueryTransport + 'static> FrameController<T> {
	/// Idle controller.
	pub fn new(transport: Rc<T>, hooks: FrameHooks, config: AppConfig) -> Self {
		let session = Session::new(0, &config);
		Self {
			transport,
			hooks,
			config,
			session: Rc::new(RefCell::new(session)),
		}
	}

	/// Copy of the current execution state.
	pub fn state(&self) -> ExecutionState {
		self.session.borrow().state.clone()
	}

	/// Fetch if `frame` wants a version that hasn't been requested yet.
	///
	/// The first fetch runs `frame.query`; later ones run `frame.extra_query`,
	/// or `frame.query` again when no refresh query is set.
	pub fn decide_and_fetch(&self, frame: &Frame) -> Option<LocalBoxFuture<'static, ()>> {
		let requested = self.session.borrow().state.requested_version();
		if requested >= frame.version {
			return None;
		}
		if frame.meta.collapsed || frame.query.trim().is_empty() {
			return None;
		}

		let query = if requested == 0 || frame.extra_query.trim().is_empty() {
			&frame.query
		} else {
			&frame.extra_query
		};
		Some(self.execute(query, frame.action, frame.version, self.label_pattern(frame)))
	}

	/// Record `version` as requested and return the fetch that settles it.
	pub fn execute(
		&self,
		query: &str,
		action: FrameAction,
		version: u64,
		label_pattern: &str,
	) -> LocalBoxFuture<'static, ()> {
		let ticket = {
			let mut session = self.session.borrow_mut();
			session.state.mark_requested(version);
			Ticket {
				epoch: session.epoch,
				version,
				action,
				label_pattern: label_pattern.to_string(),
				started_ms: now_ms(),
			}
		};
		debug!("fetching version {version} ({action})");

		let transport = Rc::clone(&self.transport);
		let session = Rc::clone(&self.session);
		let hooks = self.hooks.clone();
		let endpoint = self.config.endpoint_url.clone();
		let query = query.to_string();

		async move {
			let result = transport.execute(&endpoint, &query, action, true).await;
			if let Err(error) = &result {
				hooks.report_failure(error);
			}
			let settlement = session.borrow_mut().settle(&ticket, result);
			match settlement {
				Settlement::Dropped => {}
				Settlement::Accepted => {
					debug!("accepted response for version {}", ticket.version);
					hooks.connectivity.on_update_connected_state(true);
				}
				Settlement::Failed(error) => {
					warn!("version {} failed: {error}", ticket.version);
				}
			}
		}
		.boxed_local()
	}

	/// Back to idle with a fresh assembler. Outstanding fetches are ignored
	/// when they land.
	pub fn reset(&self) {
		let mut session = self.session.borrow_mut();
		let epoch = session.epoch + 1;
		*session = Session::new(epoch, &self.config);
		debug!("frame reset (epoch {epoch})");
	}

	/// Materialize every pending node of the current graph.
	pub fn expand(&self) {
		let mut guard = self.session.borrow_mut();
		let session = &mut *guard;
		let Some(current) = session.state.graph() else {
			debug!("nothing to expand");
			return;
		};
		let raw_response = current.raw_response.clone();

		session.assembler.drain(true, &session.label_pattern);
		let outcome = session.snapshot(raw_response);
		session.state.settle(outcome);
	}

	/// Swap the current graph for a copy with the other view mode.
	pub fn toggle_tree_view(&self) {
		let mut session = self.session.borrow_mut();
		let Some(current) = session.state.graph() else {
			return;
		};
		let toggled = current.with_tree_view(!current.tree_view);
		session.state.settle(FrameOutcome::Graph(toggled));
	}

	/// Fetch `frame.query` in debug mode for the raw JSON view. Leaves
	/// versions and outcome alone.
	pub fn preview_raw(&self, frame: &Frame) -> Option<LocalBoxFuture<'static, ()>> {
		if frame.action != FrameAction::Query || frame.query.trim().is_empty() {
			return None;
		}

		let epoch = self.session.borrow().epoch;
		let started_ms = now_ms();
		let transport = Rc::clone(&self.transport);
		let session = Rc::clone(&self.session);
		let hooks = self.hooks.clone();
		let endpoint = self.config.endpoint_url.clone();
		let query = frame.query.clone();

		Some(
			async move {
				let response = match transport
					.execute(&endpoint, &query, FrameAction::Query, false)
					.await
				{
					Ok(response) => response,
					Err(error) => {
						warn!("raw preview failed: {error}");
						hooks.report_failure(&error);
						return;
					}
				};
				let mut session = session.borrow_mut();
				if session.epoch != epoch {
					return;
				}
				if let Some(timing) = timing_since(&response, started_ms) {
					session.state.set_timing(timing);
				}
				session.state.set_raw_response(response);
			}
			.boxed_local(),
		)
	}

	fn label_pattern<'a>(&'a self, frame: &'a Frame) -> &'a str {
		frame
			.meta
			.regex_str
			.as_deref()
			.filter(|pattern| !pattern.is_empty())
			.unwrap_or(&self.config.label_pattern)
	}
}
