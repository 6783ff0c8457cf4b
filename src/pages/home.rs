use leptos::ev::SubmitEvent;
use leptos::prelude::*;

use crate::AppContext;
use crate::components::frame_item::FrameItem;
use crate::frame::{Frame, FrameAction};

#[component]
fn ConnectionIndicator() -> impl IntoView {
	let connected = expect_context::<AppContext>().connected;
	view! {
		<span class="connection" class:offline=move || !connected.get()>
			{move || if connected.get() { "Connected" } else { "Disconnected" }}
		</span>
	}
}

/// Query editor over the frame list.
#[component]
pub fn Home() -> impl IntoView {
	let endpoint = expect_context::<AppContext>().config.endpoint_url.clone();
	let query = RwSignal::new(String::new());
	let action = RwSignal::new(FrameAction::Query);
	let frames = RwSignal::new(Vec::<RwSignal<Frame>>::new());
	let next_id = StoredValue::new(0u64);

	let on_submit = move |ev: SubmitEvent| {
		ev.prevent_default();
		let text = query.get_untracked();
		if text.trim().is_empty() {
			return;
		}
		let id = next_id.with_value(|n| *n + 1);
		next_id.set_value(id);
		let frame = Frame::new(format!("frame-{id}"), text, action.get_untracked());
		log::debug!("new frame {} ({})", frame.id, frame.action);
		frames.update(|list| list.insert(0, RwSignal::new(frame)));
	};

	let on_discard = Callback::new(move |id: String| {
		frames.update(|list| list.retain(|frame| frame.with_untracked(|f| f.id != id)));
	});

	let on_action = move |ev| {
		if let Some(parsed) = FrameAction::parse(&event_target_value(&ev)) {
			action.set(parsed);
		}
	};

	view! {
		<ErrorBoundary fallback=|errors| {
			view! {
				<h1>"Uh oh! Something went wrong!"</h1>

				<p>"Errors: "</p>
				<ul>
					{move || {
						errors
							.get()
							.into_iter()
							.map(|(_, e)| view! { <li>{e.to_string()}</li> })
							.collect_view()
					}}
				</ul>
			}
		}>
			<header class="topbar">
				<h1>"Frame Graph"</h1>
				<code class="endpoint">{endpoint}</code>
				<ConnectionIndicator />
			</header>

			<form class="editor" on:submit=on_submit>
				<select on:change=on_action>
					<option value="query" selected=true>"query"</option>
					<option value="mutation">"mutation"</option>
					<option value="alter">"alter"</option>
				</select>
				<textarea
					rows=6
					placeholder="{ q(func: has(name)) { uid name } }"
					prop:value=move || query.get()
					on:input=move |ev| query.set(event_target_value(&ev))
				/>
				<button type="submit">"Run"</button>
			</form>

			<section class="frames">
				<For
					each=move || frames.get()
					key=|frame| frame.with_untracked(|f| f.id.clone())
					let(frame)
				>
					<FrameItem frame on_discard />
				</For>
			</section>
		</ErrorBoundary>
	}
}
