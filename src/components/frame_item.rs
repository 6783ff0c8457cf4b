use std::rc::Rc;

use futures::future::LocalBoxFuture;
use leptos::prelude::*;
use leptos::task::spawn_local;
use log::debug;
use serde_json::Value;

use super::force_graph::ForceGraphCanvas;
use crate::AppContext;
use crate::execution::{
	ExecutionState, FrameController, FrameHooks, FrameOutcome, HttpTransport, LogTelemetry,
	QueryTransport,
};
use crate::frame::Frame;
use crate::graph::{Attributes, GraphSnapshot, Node};

fn scalar_text(value: &Value) -> String {
	match value {
		Value::String(s) => s.clone(),
		other => other.to_string(),
	}
}

fn attribute_rows(attributes: &Attributes) -> impl IntoView + use<> {
	attributes
		.iter()
		.map(|(key, value)| {
			view! {
				<tr>
					<th>{key.clone()}</th>
					<td>{scalar_text(value)}</td>
				</tr>
			}
		})
		.collect_view()
}

fn node_panel(node: Node) -> impl IntoView {
	view! {
		<aside class="node-panel">
			<h4>{node.label}</h4>
			<p class="node-id">{node.id}</p>
			<table>{attribute_rows(&node.attributes)}</table>
		</aside>
	}
}

/// Indented list of nodes with their outgoing edges.
fn tree_view(snapshot: &GraphSnapshot) -> impl IntoView + use<> {
	let items = snapshot
		.nodes
		.iter()
		.map(|node| {
			let children = snapshot
				.edges_from(&node.id)
				.map(|edge| {
					let target = snapshot
						.node(&edge.target)
						.map_or_else(|| edge.target.clone(), |n| n.label.clone());
					view! { <li>{format!("{} → {target}", edge.label)}</li> }
				})
				.collect_view();
			view! {
				<li>
					<span class="tree-label">{node.label.clone()}</span>
					<ul>{children}</ul>
				</li>
			}
		})
		.collect_view();
	view! { <ul class="tree-view">{items}</ul> }
}

#[component]
fn GraphView(
	snapshot: GraphSnapshot,
	on_expand: Callback<()>,
	on_toggle_tree: Callback<()>,
) -> impl IntoView {
	let selected = RwSignal::new(None::<String>);
	let remaining = snapshot.remaining_nodes;
	let tree_view_on = snapshot.tree_view;
	let summary = format!("{} nodes, {} edges", snapshot.num_nodes, snapshot.num_edges);
	let legend = snapshot
		.plot_axis
		.iter()
		.map(|label| view! { <span class="legend-chip">{label.clone()}</span> })
		.collect_view();

	let body = if tree_view_on {
		tree_view(&snapshot).into_any()
	} else {
		let lookup = snapshot.clone();
		let details = move || {
			let id = selected.get()?;
			lookup.node(&id).cloned().map(node_panel)
		};
		view! {
			<div class="graph-body">
				<ForceGraphCanvas
					data=Signal::stored(snapshot)
					on_select=Callback::new(move |id| selected.set(id))
				/>
				{details}
			</div>
		}
		.into_any()
	};

	view! {
		<div class="graph-view">
			<div class="graph-toolbar">
				<span class="graph-summary">{summary}</span>
				<Show when=move || { remaining > 0 }>
					<button on:click=move |_| on_expand.run(())>
						{format!("Expand ({remaining} more)")}
					</button>
				</Show>
				<button on:click=move |_| on_toggle_tree.run(())>
					{if tree_view_on { "Graph" } else { "Tree" }}
				</button>
			</div>
			<div class="legend">{legend}</div>
			{body}
		</div>
	}
}

/// Handles a settled fetch writes back into.
struct FrameSync<T> {
	controller: StoredValue<FrameController<T>, LocalStorage>,
	frame: RwSignal<Frame>,
	view_state: RwSignal<ExecutionState>,
}

impl<T> Clone for FrameSync<T> {
	fn clone(&self) -> Self {
		*self
	}
}

impl<T> Copy for FrameSync<T> {}

impl<T: QueryTransport + 'static> FrameSync<T> {
	/// Copy the controller state into the view. `false` once the row has
	/// been disposed.
	fn refresh(self) -> bool {
		let Some(state) = self.controller.try_with_value(FrameController::state) else {
			return false;
		};
		if let Some(timing) = state.timing()
			&& self
				.frame
				.try_with_untracked(|f| f.timing != Some(timing))
				.unwrap_or(false)
		{
			self.frame.try_update(|f| f.timing = Some(timing));
		}
		self.view_state.try_set(state).is_none()
	}
}

/// One frame of the frame list and the controller that feeds it.
#[component]
pub fn FrameItem(
	frame: RwSignal<Frame>,
	#[prop(into)] on_discard: Callback<String>,
) -> impl IntoView {
	let ctx = expect_context::<AppContext>();
	let connected = ctx.connected;
	let hooks = FrameHooks::new(move |up: bool| connected.set(up), LogTelemetry);
	let controller = StoredValue::new_local(FrameController::new(
		Rc::new(HttpTransport::new()),
		hooks,
		ctx.config.clone(),
	));
	let view_state = RwSignal::new(ExecutionState::default());
	let show_raw = RwSignal::new(false);

	let sync = FrameSync {
		controller,
		frame,
		view_state,
	};
	let refresh = move || {
		sync.refresh();
	};
	let run = move |fetch: Option<LocalBoxFuture<'static, ()>>| {
		let Some(fetch) = fetch else {
			return;
		};
		refresh();
		spawn_local(async move {
			fetch.await;
			if !sync.refresh() {
				debug!("frame discarded before its fetch settled");
			}
		});
	};

	Effect::new(move |_| {
		let current = frame.get();
		if current.meta.collapsed {
			controller.with_value(FrameController::reset);
			refresh();
			return;
		}
		run(controller.with_value(|c| c.decide_and_fetch(&current)));
	});

	let graph = Memo::new(move |_| view_state.with(|s| s.graph().cloned()));
	let notice = Memo::new(move |_| {
		view_state.with(|s| match s.outcome() {
			FrameOutcome::Graph(_) => None,
			other => Some(other.clone()),
		})
	});

	let on_expand = Callback::new(move |_| {
		controller.with_value(FrameController::expand);
		refresh();
	});
	let on_toggle_tree = Callback::new(move |_| {
		controller.with_value(FrameController::toggle_tree_view);
		refresh();
	});
	let on_toggle_raw = move |_| {
		let opening = !show_raw.get_untracked();
		show_raw.set(opening);
		if opening {
			run(frame.with_untracked(|f| controller.with_value(|c| c.preview_raw(f))));
		}
	};

	let body = move || match graph.get() {
		Some(snapshot) => {
			view! { <GraphView snapshot on_expand on_toggle_tree /> }.into_any()
		}
		None => match notice.get() {
			Some(FrameOutcome::Success(message)) => {
				view! { <p class="frame-success">{message}</p> }.into_any()
			}
			Some(FrameOutcome::Error(message)) => {
				view! { <p class="frame-error">{message}</p> }.into_any()
			}
			_ => view! { <p class="frame-loading">"Loading..."</p> }.into_any(),
		},
	};

	let raw_json = move || {
		view_state.with(|s| {
			s.raw_response()
				.and_then(|raw| serde_json::to_string_pretty(raw).ok())
				.unwrap_or_default()
		})
	};

	let title = move || frame.with(|f| f.query.lines().next().unwrap_or_default().to_string());
	let action = move || frame.with(|f| f.action.to_string());
	let timing = move || frame.with(|f| f.timing.map(|t| t.to_string()).unwrap_or_default());
	let collapsed = move || frame.with(|f| f.meta.collapsed);

	view! {
		<article class="frame">
			<header class="frame-header">
				<span class="frame-action">{action}</span>
				<code class="frame-title">{title}</code>
				<span class="frame-timing">{timing}</span>
				<button on:click=move |_| frame.update(Frame::toggle_collapsed)>
					{move || if collapsed() { "Expand" } else { "Collapse" }}
				</button>
				<button on:click=move |_| frame.update(Frame::bump_version)>"Refresh"</button>
				<button on:click=on_toggle_raw>"JSON"</button>
				<button on:click=move |_| {
					on_discard.run(frame.with_untracked(|f| f.id.clone()))
				}>"Discard"</button>
			</header>
			<Show when=move || !collapsed()>
				<Show
					when=move || show_raw.get()
					fallback=body
				>
					<pre class="frame-raw">{raw_json}</pre>
				</Show>
			</Show>
		</article>
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::config::AppConfig;
	use crate::frame::FrameAction;

	#[test]
	fn refresh_after_discard_is_a_no_op() {
		let owner = Owner::new();
		let row = owner.child();
		let sync = row.with(|| FrameSync {
			controller: StoredValue::new_local(FrameController::new(
				Rc::new(HttpTransport::new()),
				FrameHooks::silent(),
				AppConfig::default(),
			)),
			frame: RwSignal::new(Frame::new("f1", "{ q() }", FrameAction::Query)),
			view_state: RwSignal::new(ExecutionState::default()),
		});

		assert!(sync.refresh());
		row.unset();
		assert!(!sync.refresh());
	}
}
