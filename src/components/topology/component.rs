use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Arc;

use leptos::prelude::*;
use web_sys::{MouseEvent, WheelEvent};

use super::layout::LayoutOptions;
use super::selection::{Selection, SelectionManager};
use super::surface::{self, SelectionListener, SurfaceHandle};
use super::types::TopologySnapshot;

fn same_snapshot(a: &Option<Arc<TopologySnapshot>>, b: &Option<Arc<TopologySnapshot>>) -> bool {
	match (a, b) {
		(Some(a), Some(b)) => Arc::ptr_eq(a, b),
		(None, None) => true,
		_ => false,
	}
}

/// Canvas that renders the current snapshot and reports clicks into
/// `selection`.
///
/// Each new snapshot disposes the previous graph instance before a fresh one
/// is built, so at most one instance is alive at any time.
#[component]
pub fn TopologyCanvas(
	#[prop(into)] snapshot: Signal<Option<Arc<TopologySnapshot>>>,
	selection: RwSignal<Selection>,
	#[prop(optional)] options: Option<LayoutOptions>,
) -> impl IntoView {
	let canvas_ref = NodeRef::<leptos::html::Canvas>::new();
	let instance = StoredValue::new_local(None::<SurfaceHandle>);
	let manager = Rc::new(RefCell::new(SelectionManager::new()));
	let options = options.unwrap_or_default();

	Effect::new(move |rendered: Option<Option<Arc<TopologySnapshot>>>| {
		let rendered = rendered.flatten();
		let current = snapshot.get();
		let Some(canvas) = canvas_ref.get() else {
			return rendered;
		};
		if same_snapshot(&rendered, &current) {
			return rendered;
		}

		instance.update_value(|slot| {
			if let Some(previous) = slot.take() {
				previous.dispose();
			}
		});

		let Some(current) = current else {
			let cleared = manager.borrow_mut().snapshot_replaced().clone();
			selection.set(cleared);
			return None;
		};

		let on_select: SelectionListener = Rc::new(move |next: &Selection| selection.set(next.clone()));
		match surface::initialize(canvas, current.clone(), options.clone(), manager.clone(), on_select) {
			Ok(handle) => {
				instance.set_value(Some(handle));
				Some(current)
			}
			Err(err) => {
				log::error!("topology surface not created: {err}");
				None
			}
		}
	});

	on_cleanup(move || {
		instance.try_update_value(|slot| {
			if let Some(handle) = slot.take() {
				handle.dispose();
			}
		});
	});

	let offset = move |ev: &MouseEvent| {
		canvas_ref.get().map(|canvas| {
			let rect = canvas.get_bounding_client_rect();
			(
				ev.client_x() as f64 - rect.left(),
				ev.client_y() as f64 - rect.top(),
			)
		})
	};
	let with_surface = move |f: &dyn Fn(&SurfaceHandle)| {
		instance.try_with_value(|slot| {
			if let Some(handle) = slot.as_ref().filter(|handle| handle.is_alive()) {
				f(handle);
			}
		});
	};

	let on_mousedown = move |ev: MouseEvent| {
		if let Some((x, y)) = offset(&ev) {
			with_surface(&|s: &SurfaceHandle| s.pointer_down(x, y));
		}
	};
	let on_mousemove = move |ev: MouseEvent| {
		if let Some((x, y)) = offset(&ev) {
			with_surface(&|s: &SurfaceHandle| s.pointer_move(x, y));
		}
	};
	let on_mouseup = move |ev: MouseEvent| {
		if let Some((x, y)) = offset(&ev) {
			with_surface(&|s: &SurfaceHandle| s.pointer_up(x, y));
		}
	};
	let on_mouseleave = move |_: MouseEvent| with_surface(&|s: &SurfaceHandle| s.pointer_leave());
	let on_wheel = move |ev: WheelEvent| {
		ev.prevent_default();
		let mouse: &MouseEvent = &ev;
		if let Some((x, y)) = offset(mouse) {
			let delta = ev.delta_y();
			with_surface(&|s: &SurfaceHandle| s.wheel(x, y, delta));
		}
	};

	view! {
		<canvas
			node_ref=canvas_ref
			class="topology-canvas"
			on:mousedown=on_mousedown
			on:mousemove=on_mousemove
			on:mouseup=on_mouseup
			on:mouseleave=on_mouseleave
			on:wheel=on_wheel
			style="display: block; cursor: grab;"
		/>
	}
}
