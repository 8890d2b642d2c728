use std::sync::Arc;

use super::layout::{LayoutEngine, LayoutOptions, LayoutProgress, ViewTransform};
use super::selection::{SelectedElement, Selection};
use super::style::{EdgeStyle, NodeStyle};
use super::types::TopologySnapshot;

/// Extra screen-space slack when hit-testing edges.
pub const EDGE_HIT_TOLERANCE: f64 = 6.0;
/// Pointer travel below which a press/release pair counts as a tap.
pub const TAP_SLOP: f64 = 4.0;
pub const WHEEL_SENSITIVITY: f64 = 0.2;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HitTarget {
	Node(usize),
	Edge(usize),
	Background,
}

#[derive(Clone, Debug, Default)]
pub struct DragState {
	pub active: bool,
	pub node: Option<usize>,
	pub start_x: f64,
	pub start_y: f64,
	pub node_start_x: f64,
	pub node_start_y: f64,
}

#[derive(Clone, Debug, Default)]
pub struct PanState {
	pub active: bool,
	pub start_x: f64,
	pub start_y: f64,
	pub transform_start_x: f64,
	pub transform_start_y: f64,
}

#[derive(Clone, Debug, Default)]
struct Press {
	x: f64,
	y: f64,
	travelled: f64,
}

/// Everything one rendered graph instance needs: the snapshot it was built
/// from, resolved styles, the running layout and the view.
pub struct SurfaceState {
	pub snapshot: Arc<TopologySnapshot>,
	pub layout: LayoutEngine,
	pub node_styles: Vec<NodeStyle>,
	pub edge_styles: Vec<EdgeStyle>,
	pub transform: ViewTransform,
	pub drag: DragState,
	pub pan: PanState,
	pub width: f64,
	pub height: f64,
	/// Selection mirrored for drawing.
	pub selected: Selection,
	press: Option<Press>,
}

impl SurfaceState {
	pub fn new(snapshot: Arc<TopologySnapshot>, options: LayoutOptions, width: f64, height: f64) -> Self {
		let node_styles: Vec<_> = snapshot
			.nodes()
			.iter()
			.map(|node| NodeStyle::for_type(&node.kind))
			.collect();
		let edge_styles = snapshot.edges().iter().map(EdgeStyle::for_edge).collect();
		let sizes = node_styles.iter().map(|s| (s.width, s.height)).collect();
		let layout = LayoutEngine::new(&snapshot, sizes, options);
		let transform = layout.fit(width, height);

		Self {
			snapshot,
			layout,
			node_styles,
			edge_styles,
			transform,
			drag: DragState::default(),
			pan: PanState::default(),
			width,
			height,
			selected: Selection::None,
			press: None,
		}
	}

	pub fn screen_to_graph(&self, sx: f64, sy: f64) -> (f64, f64) {
		(
			(sx - self.transform.x) / self.transform.k,
			(sy - self.transform.y) / self.transform.k,
		)
	}

	/// Topmost node under the pointer. Shapes are approximated by their
	/// bounding ellipse, which is what the eye expects for every shape but
	/// the rectangle; rectangles use their box.
	pub fn node_at_position(&self, sx: f64, sy: f64) -> Option<usize> {
		let (gx, gy) = self.screen_to_graph(sx, sy);
		(0..self.node_styles.len()).rev().find(|&slot| {
			let style = &self.node_styles[slot];
			let (x, y) = self.layout.position(slot);
			let (dx, dy) = ((gx - x) / (style.width / 2.0), (gy - y) / (style.height / 2.0));
			match style.shape {
				super::style::NodeShape::RoundRectangle => dx.abs() <= 1.0 && dy.abs() <= 1.0,
				_ => dx * dx + dy * dy <= 1.0,
			}
		})
	}

	pub fn edge_at_position(&self, sx: f64, sy: f64) -> Option<usize> {
		let (gx, gy) = self.screen_to_graph(sx, sy);
		let tolerance = EDGE_HIT_TOLERANCE / self.transform.k;
		(0..self.edge_styles.len()).rev().find(|&slot| {
			let (a, b) = self.snapshot.endpoints(slot);
			if a == b {
				return false;
			}
			let reach = self.edge_styles[slot].width / 2.0 + tolerance;
			distance_to_segment((gx, gy), self.layout.position(a), self.layout.position(b)) <= reach
		})
	}

	/// Nodes win over edges, as they are drawn on top.
	pub fn hit(&self, sx: f64, sy: f64) -> HitTarget {
		if let Some(slot) = self.node_at_position(sx, sy) {
			HitTarget::Node(slot)
		} else if let Some(slot) = self.edge_at_position(sx, sy) {
			HitTarget::Edge(slot)
		} else {
			HitTarget::Background
		}
	}

	pub fn element_for(&self, target: HitTarget) -> Option<SelectedElement> {
		match target {
			HitTarget::Node(slot) => Some(SelectedElement::from_node(&self.snapshot.nodes()[slot])),
			HitTarget::Edge(slot) => Some(SelectedElement::from_edge(&self.snapshot.edges()[slot])),
			HitTarget::Background => None,
		}
	}

	/// Mirrors `selection` for drawing. Ids this snapshot does not hold
	/// draw as no selection.
	pub fn sync_selection(&mut self, selection: &Selection) {
		let known = selection
			.id()
			.is_some_and(|id| self.snapshot.node(id).is_some() || self.snapshot.edge(id).is_some());
		self.selected = if known { selection.clone() } else { Selection::None };
	}

	pub fn node_style(&self, slot: usize) -> NodeStyle {
		let base = self.node_styles[slot];
		if self.selected.is_selected(&self.snapshot.nodes()[slot].id) {
			base.selected()
		} else {
			base
		}
	}

	pub fn edge_style(&self, slot: usize) -> EdgeStyle {
		let base = self.edge_styles[slot];
		if self.selected.is_selected(&self.snapshot.edges()[slot].id) {
			base.selected()
		} else {
			base
		}
	}

	pub fn pointer_down(&mut self, x: f64, y: f64) {
		self.press = Some(Press { x, y, travelled: 0.0 });
		if let Some(slot) = self.node_at_position(x, y) {
			let (nx, ny) = self.layout.position(slot);
			self.drag = DragState {
				active: true,
				node: Some(slot),
				start_x: x,
				start_y: y,
				node_start_x: nx,
				node_start_y: ny,
			};
		} else {
			self.pan = PanState {
				active: true,
				start_x: x,
				start_y: y,
				transform_start_x: self.transform.x,
				transform_start_y: self.transform.y,
			};
		}
	}

	pub fn pointer_move(&mut self, x: f64, y: f64) {
		if let Some(press) = &mut self.press {
			press.travelled = press.travelled.max((x - press.x).hypot(y - press.y));
			if press.travelled < TAP_SLOP {
				return;
			}
		}

		if self.drag.active {
			if let Some(slot) = self.drag.node {
				let (dx, dy) = (
					(x - self.drag.start_x) / self.transform.k,
					(y - self.drag.start_y) / self.transform.k,
				);
				self.layout
					.set_position(slot, self.drag.node_start_x + dx, self.drag.node_start_y + dy);
			}
		} else if self.pan.active {
			self.transform.x = self.pan.transform_start_x + (x - self.pan.start_x);
			self.transform.y = self.pan.transform_start_y + (y - self.pan.start_y);
		}
	}

	/// Ends a press. Returns the tap target when the pointer barely moved.
	pub fn pointer_up(&mut self, x: f64, y: f64) -> Option<HitTarget> {
		let press = self.press.take();
		self.drag = DragState::default();
		self.pan = PanState::default();
		match press {
			Some(press) if press.travelled < TAP_SLOP => Some(self.hit(x, y)),
			_ => None,
		}
	}

	pub fn pointer_leave(&mut self) {
		self.press = None;
		self.drag = DragState::default();
		self.pan = PanState::default();
	}

	/// Zooms around the pointer; `delta_y > 0` zooms out.
	pub fn wheel(&mut self, x: f64, y: f64, delta_y: f64) {
		let options = self.layout.options();
		let step = 1.0 + WHEEL_SENSITIVITY * 0.5;
		let factor = if delta_y > 0.0 { 1.0 / step } else { step };
		let new_k = (self.transform.k * factor).clamp(options.min_zoom, options.max_zoom);
		let ratio = new_k / self.transform.k;
		self.transform.x = x - (x - self.transform.x) * ratio;
		self.transform.y = y - (y - self.transform.y) * ratio;
		self.transform.k = new_k;
	}

	/// Advances the layout by one batch. Fits the view once, when the
	/// layout freezes.
	pub fn tick(&mut self, now_ms: f64) {
		if !self.layout.is_running() {
			return;
		}
		match self.layout.advance(now_ms) {
			Ok(LayoutProgress::Frozen) => {
				self.transform = self.layout.fit(self.width, self.height);
			}
			Ok(LayoutProgress::Running | LayoutProgress::Idle) => {}
			// disposed underneath us; nothing left to do
			Err(_abort) => {}
		}
	}

	pub fn resize(&mut self, width: f64, height: f64) {
		self.width = width;
		self.height = height;
	}

	pub fn dispose(&mut self) {
		self.layout.dispose();
		self.pointer_leave();
	}
}

fn distance_to_segment(p: (f64, f64), a: (f64, f64), b: (f64, f64)) -> f64 {
	let (abx, aby) = (b.0 - a.0, b.1 - a.1);
	let len2 = abx * abx + aby * aby;
	let t = if len2 > 0.0 {
		(((p.0 - a.0) * abx + (p.1 - a.1) * aby) / len2).clamp(0.0, 1.0)
	} else {
		0.0
	};
	let (cx, cy) = (a.0 + t * abx, a.1 + t * aby);
	(p.0 - cx).hypot(p.1 - cy)
}
