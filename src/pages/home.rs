use std::sync::Arc;

use leptos::prelude::*;
use web_sys::MouseEvent;

use crate::components::topology::{InspectorPanel, Selection, TopologyCanvas, TopologySnapshot, legend};
use crate::config::ApiConfig;
use crate::poller::{BrowserScheduler, HttpSnapshotSource, PollEvent, PollState, Poller, RefreshInterval};

/// Header counters and the cluster name.
#[component]
fn SummaryBar(snapshot: Arc<TopologySnapshot>) -> impl IntoView {
	let summary = snapshot.summary();
	let cluster = snapshot.cluster_name().map(str::to_owned);

	view! {
		<div class="summary">
			{cluster.map(|name| view! { <span class="summary-item cluster-name">{name}</span> })}
			<span class="summary-item">
				<strong>"Nodes:"</strong>" "{summary.total_nodes}
			</span>
			<span class="summary-item">
				<strong>"VMs:"</strong>" "{summary.total_vms}
			</span>
			<span class="summary-item">
				<strong>"Networks:"</strong>" "{summary.total_networks}
			</span>
			{(summary.total_sdn > 0)
				.then(|| {
					view! {
						<span class="summary-item">
							<strong>"SDN:"</strong>" "{summary.total_sdn}
						</span>
					}
				})}
		</div>
	}
}

#[component]
fn Legend() -> impl IntoView {
	view! {
		<div class="legend">
			<h4>"Legend"</h4>
			<div class="legend-items">
				{legend()
					.into_iter()
					.map(|(name, color)| {
						view! {
							<div class="legend-item">
								<span class="legend-color" style=format!("background-color: {color};")></span>
								{name}
							</div>
						}
					})
					.collect_view()}
			</div>
		</div>
	}
}

#[component]
fn TopologyPage(config: ApiConfig) -> impl IntoView {
	let poller = Poller::new(HttpSnapshotSource::new(&config), BrowserScheduler);
	let poll_state = RwSignal::new(poller.state());
	let snapshot = RwSignal::new(poller.snapshot());
	let selection = RwSignal::new(Selection::None);

	poller.subscribe(move |event| match event {
		PollEvent::State(state) => poll_state.set(state),
		PollEvent::Snapshot(next) => snapshot.set(Some(next)),
	});
	poller.start();
	let poller = StoredValue::new_local(poller);
	on_cleanup(move || {
		poller.try_with_value(|poller| poller.dispose());
	});

	let loading = move || poll_state.with(PollState::is_loading);
	let auto_refresh = move || poll_state.with(|state| state.auto_refresh);
	let refresh = move |_: MouseEvent| {
		poller.try_with_value(|poller| poller.refresh());
	};

	view! {
		<div class="app">
			<header class="app-header">
				<div class="header-content">
					<h1>"Proxmox Network Topology"</h1>
					{move || snapshot.get().map(|snapshot| view! { <SummaryBar snapshot=snapshot /> })}
				</div>
				<div class="controls">
					<button class="refresh-button" on:click=refresh disabled=loading>
						{move || if loading() { "Loading..." } else { "Refresh" }}
					</button>
					<label class="auto-refresh-control">
						<input
							type="checkbox"
							prop:checked=auto_refresh
							on:change=move |ev| {
								let enabled = event_target_checked(&ev);
								poller.try_with_value(|poller| poller.set_auto_refresh(enabled));
							}
						/>
						"Auto-refresh"
					</label>
					<Show when=auto_refresh>
						<select
							class="refresh-interval"
							prop:value=move || poll_state.with(|state| state.interval.as_secs().to_string())
							on:change=move |ev| {
								let picked = event_target_value(&ev)
									.parse::<u64>()
									.ok()
									.and_then(RefreshInterval::from_secs);
								if let Some(interval) = picked {
									poller.try_with_value(|poller| poller.set_interval(interval));
								}
							}
						>
							{RefreshInterval::ALL
								.into_iter()
								.map(|interval| {
									view! {
										<option value=interval.as_secs().to_string()>{interval.label()}</option>
									}
								})
								.collect_view()}
						</select>
					</Show>
				</div>
			</header>

			<main class="app-main">
				<Show when=move || loading() && snapshot.with(Option::is_none)>
					<div class="loading-container">
						<div class="spinner"></div>
						<p>"Loading topology data..."</p>
					</div>
				</Show>
				{move || {
					poll_state
						.with(|state| state.last_error.clone())
						.map(|message| {
							view! {
								<div class="error-container">
									<h2>"Error"</h2>
									<p>{message}</p>
									<button on:click=refresh>"Retry"</button>
								</div>
							}
						})
				}}
				<Show when=move || snapshot.with(Option::is_some)>
					<div class="topology-view">
						<div class="topology-canvas-container">
							<TopologyCanvas snapshot=snapshot selection=selection />
						</div>
						<InspectorPanel selection=selection />
					</div>
				</Show>
			</main>

			<footer class="app-footer">
				<Legend />
			</footer>
		</div>
	}
}

/// Topology page, or the configuration problem that prevents it.
#[component]
pub fn Home() -> impl IntoView {
	view! {
		<ErrorBoundary fallback=|errors| {
			view! {
				<div class="error-container">
					<h2>"Configuration error"</h2>
					<ul>
						{move || {
							errors
								.get()
								.into_iter()
								.map(|(_, e)| view! { <li>{e.to_string()}</li> })
								.collect_view()
						}}
					</ul>
				</div>
			}
		}>
			{ApiConfig::from_env()
				.inspect_err(|err| log::error!("{err}"))
				.map(|config| view! { <TopologyPage config=config /> })}
		</ErrorBoundary>
	}
}

#[cfg(all(test, target_arch = "wasm32"))]
mod tests {
	use serde_json::json;
	use wasm_bindgen::JsCast;
	use wasm_bindgen_test::*;

	use super::*;
	use crate::components::topology::build;

	wasm_bindgen_test_configure!(run_in_browser);

	#[wasm_bindgen_test]
	fn summary_labels_vm_count() {
		let document = web_sys::window().and_then(|window| window.document()).unwrap();
		let host: web_sys::HtmlElement = document.create_element("div").unwrap().unchecked_into();
		document.body().unwrap().append_child(&host).unwrap();

		let raw = serde_json::from_value(json!({
			"nodes": [],
			"edges": [],
			"summary": {"total_nodes": 2, "total_vms": 7, "total_networks": 3, "total_sdn": 0}
		}))
		.unwrap();
		let snapshot = Arc::new(build(raw).unwrap());
		let _mounted = leptos::mount::mount_to(host.clone(), move || view! { <SummaryBar snapshot=snapshot /> });

		let text = host.text_content().unwrap_or_default();
		assert!(text.contains("VMs: 7"), "{text}");
		assert!(!text.contains("CTs"), "{text}");
		assert!(!text.contains("SDN"), "{text}");
	}
}
