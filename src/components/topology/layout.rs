//! Force-directed layout with a wall-clock budget.
//!
//! `force_graph` supplies charge repulsion and spring attraction. After every
//! simulation step a constraint pass pulls connected nodes toward the target
//! edge length and pushes overlapping nodes apart. When the budget runs out
//! (or the layout settles) positions freeze, disconnected components are
//! packed side by side, and the caller fits the view once.
//!
//! The engine never runs to completion in one call: [`LayoutEngine::advance`]
//! performs a small batch of steps and returns, so the owner can drive it
//! from an animation frame and drop it at any point.

use std::f64::consts::PI;

use force_graph::{DefaultNodeIdx, EdgeData, ForceGraph, NodeData, SimulationParameters};
use thiserror::Error;

use super::types::TopologySnapshot;

const DT: f32 = 0.016;
const MIN_SETTLE_STEPS: usize = 60;

#[derive(Clone, Debug, PartialEq)]
pub struct LayoutOptions {
	/// Target distance between connected node centres.
	pub edge_length: f64,
	/// Extra clearance kept between node borders.
	pub node_spacing: f64,
	/// Gap between bounding boxes of disconnected components.
	pub component_spacing: f64,
	/// Hard simulation budget; positions freeze afterwards.
	pub max_simulation_ms: f64,
	/// Viewport padding used by the fit step.
	pub padding: f64,
	pub min_zoom: f64,
	pub max_zoom: f64,
	pub steps_per_frame: usize,
	/// Largest per-step movement (px) still counted as settled.
	pub settle_threshold: f64,
	pub constraint_stiffness: f64,
}

impl Default for LayoutOptions {
	fn default() -> Self {
		Self {
			edge_length: 200.0,
			node_spacing: 100.0,
			component_spacing: 150.0,
			max_simulation_ms: 4000.0,
			padding: 50.0,
			min_zoom: 0.1,
			max_zoom: 3.0,
			steps_per_frame: 4,
			settle_threshold: 0.05,
			constraint_stiffness: 0.2,
		}
	}
}

/// Screen = graph * k + (x, y).
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ViewTransform {
	pub x: f64,
	pub y: f64,
	pub k: f64,
}

impl Default for ViewTransform {
	fn default() -> Self {
		Self { x: 0.0, y: 0.0, k: 1.0 }
	}
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Bounds {
	pub min_x: f64,
	pub min_y: f64,
	pub max_x: f64,
	pub max_y: f64,
}

impl Bounds {
	pub fn width(&self) -> f64 {
		self.max_x - self.min_x
	}

	pub fn height(&self) -> f64 {
		self.max_y - self.min_y
	}

	fn around(points: impl IntoIterator<Item = ((f64, f64), (f64, f64))>) -> Option<Self> {
		points.into_iter().fold(None, |acc, ((x, y), (w, h))| {
			let (hw, hh) = (w / 2.0, h / 2.0);
			let b = Bounds {
				min_x: x - hw,
				min_y: y - hh,
				max_x: x + hw,
				max_y: y + hh,
			};
			Some(match acc {
				None => b,
				Some(a) => Bounds {
					min_x: a.min_x.min(b.min_x),
					min_y: a.min_y.min(b.min_y),
					max_x: a.max_x.max(b.max_x),
					max_y: a.max_y.max(b.max_y),
				},
			})
		})
	}
}

/// Returned when a disposed layout is stepped. Expected after a snapshot
/// replacement; callers drop it silently.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("layout was disposed before completion")]
pub struct LayoutAbort;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LayoutProgress {
	Running,
	/// Positions froze during this call; fit the view now.
	Frozen,
	/// Already frozen earlier.
	Idle,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Phase {
	Running,
	Frozen,
	Disposed,
}

pub struct LayoutEngine {
	graph: ForceGraph<usize, ()>,
	handles: Vec<DefaultNodeIdx>,
	positions: Vec<(f64, f64)>,
	sizes: Vec<(f64, f64)>,
	edges: Vec<(usize, usize)>,
	components: Vec<usize>,
	pinned: Vec<bool>,
	options: LayoutOptions,
	started_at: Option<f64>,
	steps: usize,
	phase: Phase,
}

impl LayoutEngine {
	/// `sizes` holds the drawn (width, height) of each node, by slot.
	pub fn new(snapshot: &TopologySnapshot, sizes: Vec<(f64, f64)>, options: LayoutOptions) -> Self {
		let mut graph = ForceGraph::new(SimulationParameters {
			force_charge: 250.0,
			force_spring: 0.05,
			force_max: 100.0,
			node_speed: 3000.0,
			damping_factor: 0.9,
		});

		let components = snapshot.components();
		let positions = seed_positions(&components, &options);
		let handles: Vec<_> = positions
			.iter()
			.enumerate()
			.map(|(slot, &(x, y))| {
				graph.add_node(NodeData {
					x: x as f32,
					y: y as f32,
					mass: 10.0,
					is_anchor: false,
					user_data: slot,
				})
			})
			.collect();

		let edges: Vec<_> = (0..snapshot.edges().len())
			.map(|slot| snapshot.endpoints(slot))
			.filter(|(a, b)| a != b)
			.collect();
		for &(a, b) in &edges {
			graph.add_edge(handles[a], handles[b], EdgeData::default());
		}

		Self {
			graph,
			pinned: vec![false; handles.len()],
			handles,
			positions,
			sizes,
			edges,
			components,
			options,
			started_at: None,
			steps: 0,
			phase: Phase::Running,
		}
	}

	pub fn options(&self) -> &LayoutOptions {
		&self.options
	}

	pub fn position(&self, slot: usize) -> (f64, f64) {
		self.positions[slot]
	}

	pub fn positions(&self) -> &[(f64, f64)] {
		&self.positions
	}

	pub fn is_running(&self) -> bool {
		self.phase == Phase::Running
	}

	/// Runs one batch of steps. `now_ms` is any monotonic millisecond clock;
	/// the first call starts the budget.
	pub fn advance(&mut self, now_ms: f64) -> Result<LayoutProgress, LayoutAbort> {
		match self.phase {
			Phase::Disposed => return Err(LayoutAbort),
			Phase::Frozen => return Ok(LayoutProgress::Idle),
			Phase::Running => {}
		}

		let started = *self.started_at.get_or_insert(now_ms);
		if now_ms - started >= self.options.max_simulation_ms {
			log::debug!("layout budget exhausted after {} steps", self.steps);
			self.freeze();
			return Ok(LayoutProgress::Frozen);
		}

		let mut moved: f64 = 0.0;
		for _ in 0..self.options.steps_per_frame {
			moved = moved.max(self.step());
		}
		self.steps += self.options.steps_per_frame;

		if self.steps >= MIN_SETTLE_STEPS && moved < self.options.settle_threshold {
			log::debug!("layout settled after {} steps", self.steps);
			self.freeze();
			return Ok(LayoutProgress::Frozen);
		}
		Ok(LayoutProgress::Running)
	}

	/// Moves a node (dragging) and pins it for the rest of the simulation.
	pub fn set_position(&mut self, slot: usize, x: f64, y: f64) {
		if self.phase == Phase::Disposed {
			return;
		}
		self.positions[slot] = (x, y);
		self.pinned[slot] = true;
		let handle = self.handles[slot];
		self.graph.visit_nodes_mut(|node| {
			if node.index() == handle {
				node.data.x = x as f32;
				node.data.y = y as f32;
				node.data.is_anchor = true;
			}
		});
	}

	/// Stops the simulation for good. Later calls to `advance` fail with
	/// [`LayoutAbort`].
	pub fn dispose(&mut self) {
		self.phase = Phase::Disposed;
	}

	pub fn bounds(&self) -> Option<Bounds> {
		Bounds::around(self.positions().iter().copied().zip(self.sizes.iter().copied()))
	}

	/// Transform that centres the whole graph inside `width` × `height`.
	pub fn fit(&self, width: f64, height: f64) -> ViewTransform {
		match self.bounds() {
			Some(bounds) => fit_transform(bounds, width, height, &self.options),
			None => ViewTransform {
				x: width / 2.0,
				y: height / 2.0,
				k: 1.0,
			},
		}
	}

	fn step(&mut self) -> f64 {
		let before = self.positions.clone();
		self.graph.update(DT);

		let positions = &mut self.positions;
		self.graph.visit_nodes(|node| {
			positions[node.data.user_data] = (node.x() as f64, node.y() as f64);
		});
		apply_constraints(positions, &self.edges, &self.sizes, &self.pinned, &self.options);
		self.sync_graph();

		before
			.iter()
			.zip(&self.positions)
			.map(|(&(x0, y0), &(x1, y1))| ((x1 - x0).powi(2) + (y1 - y0).powi(2)).sqrt())
			.fold(0.0, f64::max)
	}

	fn freeze(&mut self) {
		pack_components(
			&mut self.positions,
			&self.components,
			&self.sizes,
			self.options.component_spacing,
		);
		self.sync_graph();
		self.phase = Phase::Frozen;
	}

	fn sync_graph(&mut self) {
		let positions = &self.positions;
		self.graph.visit_nodes_mut(|node| {
			let (x, y) = positions[node.data.user_data];
			node.data.x = x as f32;
			node.data.y = y as f32;
		});
	}
}

/// Deterministic start: each component on its own circle, circles in a row.
fn seed_positions(components: &[usize], options: &LayoutOptions) -> Vec<(f64, f64)> {
	let count = components.iter().max().map_or(0, |max| max + 1);
	let mut members: Vec<Vec<usize>> = vec![Vec::new(); count];
	for (slot, &component) in components.iter().enumerate() {
		members[component].push(slot);
	}

	let mut positions = vec![(0.0, 0.0); components.len()];
	let mut cursor = 0.0;
	for group in &members {
		let n = group.len() as f64;
		let radius = if group.len() > 1 {
			(n * options.node_spacing / (2.0 * PI)).max(options.edge_length / 2.0)
		} else {
			0.0
		};
		let cx = cursor + radius;
		for (i, &slot) in group.iter().enumerate() {
			let angle = i as f64 * 2.0 * PI / n;
			positions[slot] = (cx + radius * angle.cos(), radius * angle.sin());
		}
		cursor = cx + radius + options.component_spacing + options.node_spacing;
	}
	positions
}

/// One relaxation pass: edge-length springs, then pairwise minimum spacing.
pub(crate) fn apply_constraints(
	positions: &mut [(f64, f64)],
	edges: &[(usize, usize)],
	sizes: &[(f64, f64)],
	pinned: &[bool],
	options: &LayoutOptions,
) {
	let stiffness = options.constraint_stiffness;
	for &(a, b) in edges {
		let (dx, dy, d) = separation(positions, a, b);
		let correction = (d - options.edge_length) / d * stiffness;
		nudge(positions, pinned, a, b, dx * correction, dy * correction);
	}

	let radius = |slot: usize| sizes[slot].0.max(sizes[slot].1) / 2.0;
	for a in 0..positions.len() {
		for b in a + 1..positions.len() {
			let required = radius(a) + radius(b) + options.node_spacing;
			let (dx, dy, d) = separation(positions, a, b);
			if d < required {
				let correction = (d - required) / d * 0.5;
				nudge(positions, pinned, a, b, dx * correction, dy * correction);
			}
		}
	}
}

/// Vector from `a` to `b` and its length, never zero.
fn separation(positions: &[(f64, f64)], a: usize, b: usize) -> (f64, f64, f64) {
	let (dx, dy) = (positions[b].0 - positions[a].0, positions[b].1 - positions[a].1);
	let d = (dx * dx + dy * dy).sqrt();
	if d > 1e-6 {
		(dx, dy, d)
	} else {
		// coincident: split along a direction derived from the pair
		let angle = (a * 31 + b * 17) as f64;
		(angle.cos() * 1e-3, angle.sin() * 1e-3, 1e-3)
	}
}

/// Moves `a` by +(mx, my) and `b` by -(mx, my), halved between free nodes.
fn nudge(positions: &mut [(f64, f64)], pinned: &[bool], a: usize, b: usize, mx: f64, my: f64) {
	let share = match (pinned[a], pinned[b]) {
		(true, true) => return,
		(false, false) => 0.5,
		_ => 1.0,
	};
	if !pinned[a] {
		positions[a].0 += mx * share;
		positions[a].1 += my * share;
	}
	if !pinned[b] {
		positions[b].0 -= mx * share;
		positions[b].1 -= my * share;
	}
}

/// Shelf-packs component bounding boxes so that any two are at least
/// `spacing` apart.
pub(crate) fn pack_components(
	positions: &mut [(f64, f64)],
	components: &[usize],
	sizes: &[(f64, f64)],
	spacing: f64,
) {
	let count = components.iter().max().map_or(0, |max| max + 1);
	if count < 2 {
		return;
	}

	let bounds: Vec<Bounds> = (0..count)
		.filter_map(|component| {
			Bounds::around(
				(0..positions.len())
					.filter(|&slot| components[slot] == component)
					.map(|slot| (positions[slot], sizes[slot])),
			)
		})
		.collect();

	let mut order: Vec<usize> = (0..count).collect();
	let member_count = |c: usize| components.iter().filter(|&&x| x == c).count();
	order.sort_by_key(|&c| std::cmp::Reverse(member_count(c)));

	let area: f64 = bounds
		.iter()
		.map(|b| (b.width() + spacing) * (b.height() + spacing))
		.sum();
	let widest = bounds.iter().map(Bounds::width).fold(0.0, f64::max);
	let row_limit = widest.max(area.sqrt() * 1.2);

	let mut offsets = vec![(0.0, 0.0); count];
	let (mut cursor_x, mut cursor_y, mut row_height) = (0.0_f64, 0.0_f64, 0.0_f64);
	for c in order {
		let b = bounds[c];
		if cursor_x > 0.0 && cursor_x + b.width() > row_limit {
			cursor_x = 0.0;
			cursor_y += row_height + spacing;
			row_height = 0.0;
		}
		offsets[c] = (cursor_x - b.min_x, cursor_y - b.min_y);
		cursor_x += b.width() + spacing;
		row_height = row_height.max(b.height());
	}

	for (slot, position) in positions.iter_mut().enumerate() {
		let (ox, oy) = offsets[components[slot]];
		position.0 += ox;
		position.1 += oy;
	}
}

pub(crate) fn fit_transform(bounds: Bounds, width: f64, height: f64, options: &LayoutOptions) -> ViewTransform {
	let avail_w = (width - 2.0 * options.padding).max(1.0);
	let avail_h = (height - 2.0 * options.padding).max(1.0);
	let k = (avail_w / bounds.width().max(1.0))
		.min(avail_h / bounds.height().max(1.0))
		.clamp(options.min_zoom, options.max_zoom);
	let (cx, cy) = (
		(bounds.min_x + bounds.max_x) / 2.0,
		(bounds.min_y + bounds.max_y) / 2.0,
	);
	ViewTransform {
		x: width / 2.0 - cx * k,
		y: height / 2.0 - cy * k,
		k,
	}
}
