use std::cell::{Cell, RefCell};
use std::rc::Rc;

use leptos::prelude::*;
use wasm_bindgen::prelude::*;
use web_sys::{CanvasRenderingContext2d, HtmlCanvasElement, MouseEvent, WheelEvent};

use super::render;
use super::state::CanvasState;
use crate::graph::GraphSnapshot;

/// Self-rescheduling `requestAnimationFrame` callback.
#[derive(Default)]
struct FrameLoop {
	callback: RefCell<Option<Closure<dyn FnMut()>>>,
	pending: Cell<Option<i32>>,
}

impl FrameLoop {
	fn is_running(&self) -> bool {
		self.callback.borrow().is_some()
	}

	fn request(&self) {
		let Some(window) = web_sys::window() else {
			return;
		};
		if let Some(cb) = self.callback.borrow().as_ref() {
			self.pending
				.set(window.request_animation_frame(cb.as_ref().unchecked_ref()).ok());
		}
	}

	/// Cancel the queued frame and drop the callback, which holds this loop.
	fn stop(&self) {
		if let (Some(window), Some(id)) = (web_sys::window(), self.pending.take()) {
			let _ = window.cancel_animation_frame(id);
		}
		self.callback.borrow_mut().take();
	}
}

fn local_point(canvas_ref: NodeRef<leptos::html::Canvas>, ev: &MouseEvent) -> Option<(f64, f64)> {
	let canvas: HtmlCanvasElement = canvas_ref.get()?.into();
	let rect = canvas.get_bounding_client_rect();
	Some((
		ev.client_x() as f64 - rect.left(),
		ev.client_y() as f64 - rect.top(),
	))
}

/// Force-directed rendering of a graph snapshot.
///
/// Drag nodes to pin them, drag the background to pan, scroll to zoom.
/// Clicking a node reports its id through `on_select`; clicking the
/// background reports `None`.
#[component]
pub fn ForceGraphCanvas(
	#[prop(into)] data: Signal<GraphSnapshot>,
	#[prop(default = 480.0)] height: f64,
	#[prop(optional, into)] on_select: Option<Callback<Option<String>>>,
) -> impl IntoView {
	let canvas_ref = NodeRef::<leptos::html::Canvas>::new();
	let state: Rc<RefCell<Option<CanvasState>>> = Rc::new(RefCell::new(None));
	let frame_loop = Rc::new(FrameLoop::default());

	let (state_init, loop_init) = (state.clone(), frame_loop.clone());
	let loop_handle = StoredValue::new_local(frame_loop);
	Effect::new(move |_| {
		let snapshot = data.get();
		let Some(canvas) = canvas_ref.get() else {
			return;
		};
		let canvas: HtmlCanvasElement = canvas.into();
		let width = canvas
			.parent_element()
			.map(|parent| parent.client_width() as f64)
			.filter(|w| *w > 0.0)
			.unwrap_or(800.0);
		canvas.set_width(width as u32);
		canvas.set_height(height as u32);
		*state_init.borrow_mut() = Some(CanvasState::new(&snapshot, width, height));

		if loop_init.is_running() {
			return;
		}
		let Some(ctx) = canvas
			.get_context("2d")
			.ok()
			.flatten()
			.and_then(|ctx| ctx.dyn_into::<CanvasRenderingContext2d>().ok())
		else {
			log::warn!("canvas has no 2d context");
			return;
		};

		let (state_tick, loop_next) = (state_init.clone(), loop_init.clone());
		*loop_init.callback.borrow_mut() = Some(Closure::new(move || {
			if let Some(ref mut s) = *state_tick.borrow_mut() {
				s.tick(0.016);
				render::render(s, &ctx);
			}
			loop_next.request();
		}));
		loop_init.request();
	});

	on_cleanup(move || {
		loop_handle.try_with_value(|frame_loop| frame_loop.stop());
	});

	let state_down = state.clone();
	let on_mousedown = move |ev: MouseEvent| {
		let Some((x, y)) = local_point(canvas_ref, &ev) else {
			return;
		};
		if let Some(ref mut s) = *state_down.borrow_mut() {
			s.press(x, y);
		}
	};

	let state_move = state.clone();
	let on_mousemove = move |ev: MouseEvent| {
		let Some((x, y)) = local_point(canvas_ref, &ev) else {
			return;
		};
		if let Some(ref mut s) = *state_move.borrow_mut() {
			s.move_to(x, y);
		}
	};

	let state_up = state.clone();
	let on_mouseup = move |_: MouseEvent| {
		let selection = state_up.borrow_mut().as_mut().and_then(CanvasState::release);
		if let (Some(selection), Some(on_select)) = (selection, on_select) {
			on_select.run(selection);
		}
	};

	let state_leave = state.clone();
	let on_mouseleave = move |_: MouseEvent| {
		if let Some(ref mut s) = *state_leave.borrow_mut() {
			s.leave();
		}
	};

	let state_wheel = state;
	let on_wheel = move |ev: WheelEvent| {
		ev.prevent_default();
		let Some((x, y)) = local_point(canvas_ref, &ev) else {
			return;
		};
		if let Some(ref mut s) = *state_wheel.borrow_mut() {
			s.zoom_at(x, y, ev.delta_y());
		}
	};

	view! {
		<canvas
			node_ref=canvas_ref
			class="force-graph-canvas"
			on:mousedown=on_mousedown
			on:mousemove=on_mousemove
			on:mouseup=on_mouseup
			on:mouseleave=on_mouseleave
			on:wheel=on_wheel
			style="display: block; cursor: grab;"
		/>
	}
}
