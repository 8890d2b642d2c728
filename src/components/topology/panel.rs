use leptos::prelude::*;

use super::inspector::{self, InspectorRow, RowValue};
use super::selection::Selection;
use super::types::ElementKind;

fn row_view(row: InspectorRow) -> AnyView {
	match row.value {
		RowValue::Text(text) => view! {
			<p class="inspector-row">
				<strong>{row.label}":"</strong>" "{text}
			</p>
		}
		.into_any(),
		RowValue::Status { text, healthy } => {
			let style = if healthy {
				"color: green; margin-left: 5px;"
			} else {
				"color: red; margin-left: 5px;"
			};
			view! {
				<p class="inspector-row">
					<strong>{row.label}":"</strong>
					<span class="status" style=style>{text}</span>
				</p>
			}
			.into_any()
		}
		RowValue::List(items) => view! {
			<div class="inspector-row">
				<strong>{row.label}":"</strong>
				<ul>{items.into_iter().map(|item| view! { <li>{item}</li> }).collect_view()}</ul>
			</div>
		}
		.into_any(),
	}
}

/// Side panel describing the selected node or edge. Renders nothing when
/// the selection is empty.
#[component]
pub fn InspectorPanel(#[prop(into)] selection: Signal<Selection>) -> impl IntoView {
	move || {
		selection.with(|current| current.element().cloned()).map(|element| {
			let rows = inspector::rows(&element);
			let extras = inspector::extra_attributes(&element.attributes);
			let title = element.title().to_owned();
			let class = match element.kind {
				ElementKind::Node => "inspector-panel node-details",
				ElementKind::Edge => "inspector-panel edge-details",
			};
			view! {
				<aside class=class>
					<h3>{title}</h3>
					<div class="inspector-rows">{rows.into_iter().map(row_view).collect_view()}</div>
					{(!extras.is_empty()).then(|| view! {
						<details class="inspector-extra">
							<summary>"Other attributes"</summary>
							<dl>
								{extras
									.into_iter()
									.map(|(key, value)| view! { <dt>{key}</dt><dd>{value}</dd> })
									.collect_view()}
							</dl>
						</details>
					})}
				</aside>
			}
		})
	}
}
