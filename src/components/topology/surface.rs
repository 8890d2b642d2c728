//! The live, disposable graph instance behind the canvas.
//!
//! [`initialize`] builds one instance for one snapshot and returns the only
//! handle to it. [`SurfaceHandle::dispose`] tears it down: the pending
//! animation frame is cancelled, the resize listener removed and the layout
//! stopped. Input forwarded to a disposed handle is ignored.

use std::cell::{Cell, RefCell, RefMut};
use std::rc::Rc;
use std::sync::Arc;

use thiserror::Error;
use wasm_bindgen::prelude::*;
use web_sys::{CanvasRenderingContext2d, HtmlCanvasElement, Window};

use super::layout::LayoutOptions;
use super::render;
use super::selection::{Selection, SelectionManager};
use super::state::SurfaceState;
use super::types::TopologySnapshot;

#[derive(Debug, Error)]
pub enum SurfaceError {
	#[error("no browser window available")]
	NoWindow,
	#[error("canvas 2d context unavailable")]
	NoContext,
}

/// Called with the new selection after every change.
pub type SelectionListener = Rc<dyn Fn(&Selection)>;

struct SurfaceInner {
	alive: Cell<bool>,
	state: RefCell<SurfaceState>,
	canvas: HtmlCanvasElement,
	window: Window,
	frame: RefCell<Option<Closure<dyn FnMut()>>>,
	frame_id: Cell<Option<i32>>,
	resize: RefCell<Option<Closure<dyn FnMut()>>>,
	selection: Rc<RefCell<SelectionManager>>,
	on_select: SelectionListener,
}

/// Owning handle for one rendered graph.
pub struct SurfaceHandle {
	inner: Rc<SurfaceInner>,
}

fn measure(canvas: &HtmlCanvasElement) -> (f64, f64) {
	let parent = canvas.parent_element();
	let width = parent
		.as_ref()
		.map(|p| p.client_width() as f64)
		.filter(|w| *w > 0.0)
		.unwrap_or(800.0);
	let height = parent
		.as_ref()
		.map(|p| p.client_height() as f64)
		.filter(|h| *h > 0.0)
		.unwrap_or(600.0);
	(width, height)
}

/// Builds a rendered graph for `snapshot` on `canvas` and starts its layout.
///
/// The shared selection manager is reset, since nothing selected on an
/// earlier snapshot may survive into this one.
pub fn initialize(
	canvas: HtmlCanvasElement,
	snapshot: Arc<TopologySnapshot>,
	options: LayoutOptions,
	selection: Rc<RefCell<SelectionManager>>,
	on_select: SelectionListener,
) -> Result<SurfaceHandle, SurfaceError> {
	let window = web_sys::window().ok_or(SurfaceError::NoWindow)?;
	let ctx: CanvasRenderingContext2d = canvas
		.get_context("2d")
		.ok()
		.flatten()
		.and_then(|ctx| ctx.dyn_into().ok())
		.ok_or(SurfaceError::NoContext)?;

	let (width, height) = measure(&canvas);
	canvas.set_width(width as u32);
	canvas.set_height(height as u32);

	let cleared = selection.borrow_mut().snapshot_replaced().clone();
	on_select(&cleared);

	let (nodes, edges) = (snapshot.nodes().len(), snapshot.edges().len());
	let inner = Rc::new(SurfaceInner {
		alive: Cell::new(true),
		state: RefCell::new(SurfaceState::new(snapshot, options, width, height)),
		canvas,
		window,
		frame: RefCell::new(None),
		frame_id: Cell::new(None),
		resize: RefCell::new(None),
		selection,
		on_select,
	});

	let weak = Rc::downgrade(&inner);
	let resize = Closure::<dyn FnMut()>::new(move || {
		if let Some(inner) = weak.upgrade() {
			inner.fit_canvas();
		}
	});
	if let Err(err) = inner
		.window
		.add_event_listener_with_callback("resize", resize.as_ref().unchecked_ref())
	{
		log::warn!("resize listener not attached: {err:?}");
	}
	*inner.resize.borrow_mut() = Some(resize);

	let weak = Rc::downgrade(&inner);
	*inner.frame.borrow_mut() = Some(Closure::new(move || {
		if let Some(inner) = weak.upgrade() {
			inner.on_frame(&ctx);
		}
	}));
	inner.request_frame();

	log::info!("topology surface initialised: {nodes} nodes, {edges} edges");
	Ok(SurfaceHandle { inner })
}

impl SurfaceInner {
	fn live_state(&self) -> Option<RefMut<'_, SurfaceState>> {
		self.alive.get().then(|| self.state.borrow_mut())
	}

	fn request_frame(&self) {
		if let Some(cb) = self.frame.borrow().as_ref() {
			match self.window.request_animation_frame(cb.as_ref().unchecked_ref()) {
				Ok(id) => self.frame_id.set(Some(id)),
				Err(err) => log::error!("animation frame not scheduled: {err:?}"),
			}
		}
	}

	fn on_frame(&self, ctx: &CanvasRenderingContext2d) {
		self.frame_id.set(None);
		let Some(mut state) = self.live_state() else {
			return;
		};
		state.tick(js_sys::Date::now());
		render::render(&state, ctx);
		drop(state);
		self.request_frame();
	}

	fn fit_canvas(&self) {
		let (width, height) = measure(&self.canvas);
		if let Some(mut state) = self.live_state() {
			self.canvas.set_width(width as u32);
			self.canvas.set_height(height as u32);
			state.resize(width, height);
		}
	}
}

impl SurfaceHandle {
	pub fn is_alive(&self) -> bool {
		self.inner.alive.get()
	}

	pub fn pointer_down(&self, x: f64, y: f64) {
		if let Some(mut state) = self.inner.live_state() {
			state.pointer_down(x, y);
		}
	}

	pub fn pointer_move(&self, x: f64, y: f64) {
		if let Some(mut state) = self.inner.live_state() {
			state.pointer_move(x, y);
		}
	}

	/// Finishes a press; a tap updates the selection.
	pub fn pointer_up(&self, x: f64, y: f64) {
		let Some(mut state) = self.inner.live_state() else {
			return;
		};
		let Some(target) = state.pointer_up(x, y) else {
			return;
		};

		let selection = {
			let mut manager = self.inner.selection.borrow_mut();
			match state.element_for(target) {
				Some(element) => manager.click_element(element),
				None => manager.click_background(),
			};
			manager.current().clone()
		};
		state.sync_selection(&selection);
		drop(state);
		(self.inner.on_select)(&selection);
	}

	pub fn pointer_leave(&self) {
		if let Some(mut state) = self.inner.live_state() {
			state.pointer_leave();
		}
	}

	pub fn wheel(&self, x: f64, y: f64, delta_y: f64) {
		if let Some(mut state) = self.inner.live_state() {
			state.wheel(x, y, delta_y);
		}
	}

	/// Releases everything this instance holds. Idempotent.
	pub fn dispose(&self) {
		let inner = &self.inner;
		if !inner.alive.replace(false) {
			return;
		}
		if let Some(id) = inner.frame_id.take() {
			let _ = inner.window.cancel_animation_frame(id);
		}
		if let Some(cb) = inner.resize.borrow_mut().take() {
			let _ = inner
				.window
				.remove_event_listener_with_callback("resize", cb.as_ref().unchecked_ref());
		}
		inner.frame.borrow_mut().take();
		inner.state.borrow_mut().dispose();
		log::debug!("topology surface disposed");
	}
}

impl Drop for SurfaceHandle {
	fn drop(&mut self) {
		self.dispose();
	}
}

#[cfg(all(test, target_arch = "wasm32"))]
mod tests {
	use serde_json::json;
	use wasm_bindgen_test::*;

	use super::*;
	use crate::components::topology::builder::build;

	wasm_bindgen_test_configure!(run_in_browser);

	fn canvas() -> HtmlCanvasElement {
		web_sys::window()
			.and_then(|window| window.document())
			.and_then(|document| document.create_element("canvas").ok())
			.and_then(|element| element.dyn_into().ok())
			.unwrap()
	}

	fn snapshot(value: serde_json::Value) -> Arc<TopologySnapshot> {
		Arc::new(build(serde_json::from_value(value).unwrap()).unwrap())
	}

	fn pair() -> Arc<TopologySnapshot> {
		snapshot(json!({
			"nodes": [{"id": "pve1", "type": "physical_node"}, {"id": "vmbr0", "type": "bridge"}],
			"edges": [{"source": "pve1", "target": "vmbr0", "type": "physical_connection"}]
		}))
	}

	/// Records every selection the surface reports.
	fn recorder() -> (SelectionListener, Rc<RefCell<Vec<Selection>>>) {
		let seen = Rc::new(RefCell::new(Vec::new()));
		let sink = seen.clone();
		(Rc::new(move |selection: &Selection| sink.borrow_mut().push(selection.clone())), seen)
	}

	fn node_on_screen(handle: &SurfaceHandle, slot: usize) -> (f64, f64) {
		let state = handle.inner.state.borrow();
		let (x, y) = state.layout.position(slot);
		(x * state.transform.k + state.transform.x, y * state.transform.k + state.transform.y)
	}

	fn tap(handle: &SurfaceHandle, (x, y): (f64, f64)) {
		handle.pointer_down(x, y);
		handle.pointer_up(x, y);
	}

	#[wasm_bindgen_test]
	fn tap_selects_until_disposed() {
		let manager = Rc::new(RefCell::new(SelectionManager::new()));
		let (on_select, seen) = recorder();
		let handle = initialize(canvas(), pair(), LayoutOptions::default(), manager.clone(), on_select).unwrap();
		assert!(handle.is_alive());
		assert_eq!(*seen.borrow(), vec![Selection::None]);

		let at = node_on_screen(&handle, 0);
		tap(&handle, at);
		assert_eq!(manager.borrow().current().id(), Some("pve1"));
		assert_eq!(seen.borrow().len(), 2);

		handle.dispose();
		handle.dispose();
		assert!(!handle.is_alive());
		assert!(handle.inner.frame.borrow().is_none());
		assert!(handle.inner.resize.borrow().is_none());
		assert_eq!(handle.inner.frame_id.get(), None);

		tap(&handle, (1.0, 1.0));
		handle.wheel(1.0, 1.0, 1.0);
		assert_eq!(manager.borrow().current().id(), Some("pve1"));
		assert_eq!(seen.borrow().len(), 2);
	}

	#[wasm_bindgen_test]
	fn replacement_leaves_one_live_instance() {
		let target = canvas();
		let manager = Rc::new(RefCell::new(SelectionManager::new()));
		let (on_select, seen) = recorder();

		let first = initialize(target.clone(), pair(), LayoutOptions::default(), manager.clone(), on_select.clone()).unwrap();
		let at = node_on_screen(&first, 1);
		tap(&first, at);
		assert_eq!(manager.borrow().current().id(), Some("vmbr0"));

		first.dispose();
		let next = snapshot(json!({"nodes": [{"id": "pve2", "type": "physical_node"}], "edges": []}));
		let second = initialize(target, next, LayoutOptions::default(), manager.clone(), on_select).unwrap();

		assert!(!first.is_alive());
		assert!(second.is_alive());
		assert_eq!(manager.borrow().current(), &Selection::None);
		assert_eq!(seen.borrow().last(), Some(&Selection::None));

		let reported = seen.borrow().len();
		tap(&first, at);
		assert_eq!(seen.borrow().len(), reported);

		let at = node_on_screen(&second, 0);
		tap(&second, at);
		assert_eq!(manager.borrow().current().id(), Some("pve2"));
	}

	#[wasm_bindgen_test]
	fn dropping_the_handle_releases_the_instance() {
		let manager = Rc::new(RefCell::new(SelectionManager::new()));
		let (on_select, _) = recorder();
		let handle = initialize(canvas(), pair(), LayoutOptions::default(), manager, on_select).unwrap();

		let inner = Rc::downgrade(&handle.inner);
		drop(handle);
		assert!(inner.upgrade().is_none());
	}
}
