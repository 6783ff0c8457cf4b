//! Scripted transport and executor shared by the integration tests.

#![allow(dead_code)]

use std::cell::RefCell;
use std::rc::Rc;

use async_trait::async_trait;
use frame_graph::config::AppConfig;
use frame_graph::error::TransportError;
use frame_graph::execution::{FrameController, FrameHooks, QueryResponse, QueryTransport};
use frame_graph::frame::FrameAction;
use futures::channel::oneshot;
use futures::executor::LocalPool;
use futures::future::LocalBoxFuture;
use futures::task::LocalSpawnExt;

type Reply = Result<QueryResponse, TransportError>;

/// A request seen by the transport.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Call {
	pub query: String,
	pub action: FrameAction,
	pub commit_immediately: bool,
}

/// Transport whose calls stay pending until the test answers them.
#[derive(Default)]
pub struct ScriptedTransport {
	calls: RefCell<Vec<Call>>,
	replies: RefCell<Vec<Option<oneshot::Sender<Reply>>>>,
}

impl ScriptedTransport {
	pub fn calls(&self) -> Vec<Call> {
		self.calls.borrow().clone()
	}

	fn answer(&self, call: usize, reply: Reply) {
		let sender = self.replies.borrow_mut()[call]
			.take()
			.expect("call already answered");
		let _ = sender.send(reply);
	}
}

#[async_trait(?Send)]
impl QueryTransport for ScriptedTransport {
	async fn execute(
		&self,
		_endpoint: &str,
		query: &str,
		action: FrameAction,
		commit_immediately: bool,
	) -> Result<QueryResponse, TransportError> {
		let (sender, receiver) = oneshot::channel();
		self.calls.borrow_mut().push(Call {
			query: query.to_string(),
			action,
			commit_immediately,
		});
		self.replies.borrow_mut().push(Some(sender));
		receiver
			.await
			.unwrap_or_else(|_| Err(TransportError::Unreachable("reply dropped".into())))
	}
}

/// Controller wired to a scripted transport and recording hooks.
pub struct Harness {
	pub pool: LocalPool,
	pub transport: Rc<ScriptedTransport>,
	pub controller: FrameController<ScriptedTransport>,
	pub connected: Rc<RefCell<Vec<bool>>>,
	pub failures: Rc<RefCell<Vec<TransportError>>>,
}

impl Harness {
	pub fn new() -> Self {
		Self::with_config(AppConfig::default())
	}

	pub fn with_config(config: AppConfig) -> Self {
		let transport = Rc::new(ScriptedTransport::default());
		let connected = Rc::new(RefCell::new(Vec::new()));
		let failures = Rc::new(RefCell::new(Vec::new()));

		let hooks = {
			let connected = Rc::clone(&connected);
			let failures = Rc::clone(&failures);
			FrameHooks::new(
				move |up: bool| connected.borrow_mut().push(up),
				move |error: &TransportError| failures.borrow_mut().push(error.clone()),
			)
		};

		Self {
			pool: LocalPool::new(),
			controller: FrameController::new(Rc::clone(&transport), hooks, config),
			transport,
			connected,
			failures,
		}
	}

	/// Start a fetch, if any, and let it reach the transport.
	pub fn spawn(&mut self, fetch: Option<LocalBoxFuture<'static, ()>>) -> bool {
		let Some(fetch) = fetch else {
			return false;
		};
		self.pool
			.spawner()
			.spawn_local(fetch)
			.expect("spawn fetch");
		self.pool.run_until_stalled();
		true
	}

	/// Answer the `call`-th request and run until idle.
	pub fn reply(&mut self, call: usize, reply: Reply) {
		self.transport.answer(call, reply);
		self.pool.run_until_stalled();
	}
}
