//! Query frames against a graph database endpoint and draw the results.
//!
//! Each frame owns a [`execution::FrameController`] that fetches on version
//! bumps, drops out-of-order responses and feeds an incremental
//! [`graph::GraphAssembler`]. The Leptos app on top renders the frame list.

use leptos::prelude::*;
use leptos_meta::*;
use leptos_router::components::*;
use leptos_router::path;
use log::{Level, info};

pub mod config;
pub mod error;
pub mod execution;
pub mod frame;
pub mod graph;

mod components;
mod pages;

use crate::config::AppConfig;
use crate::pages::home::Home;
use crate::pages::not_found::NotFound;

/// Initialize logging and panic hooks for the WASM target.
pub fn init_logging() {
	let _ = console_log::init_with_level(Level::Debug);
	console_error_panic_hook::set_once();
	info!("Logging initialized");
}

/// Shared by every frame on the page.
#[derive(Clone, Debug)]
pub struct AppContext {
	/// Endpoint and assembly settings.
	pub config: AppConfig,
	/// Whether the last request that settled reached the endpoint.
	pub connected: RwSignal<bool>,
}

/// An app router which renders the frame list and handles 404's
#[component]
pub fn App() -> impl IntoView {
	provide_meta_context();

	let config = AppConfig::from_location();
	info!("using endpoint {}", config.endpoint_url);
	provide_context(AppContext {
		config,
		connected: RwSignal::new(true),
	});

	view! {
		<Html attr:lang="en" attr:dir="ltr" attr:data-theme="dark" />
		<Title text="Frame Graph" />
		<Meta charset="UTF-8" />
		<Meta name="viewport" content="width=device-width, initial-scale=1.0" />

		<Router>
			<Routes fallback=|| view! { <NotFound /> }>
				<Route path=path!("/") view=Home />
			</Routes>
		</Router>
	}
}
