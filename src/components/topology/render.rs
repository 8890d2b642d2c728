use std::f64::consts::PI;

use wasm_bindgen::JsValue;
use web_sys::CanvasRenderingContext2d;

use super::state::SurfaceState;
use super::style::{ArrowShape, LineStyle, NodeShape, NodeStyle};

const BACKGROUND: &str = "#f5f5f5";
const LABEL_COLOR: &str = "#333";
const LABEL_OFFSET: f64 = -10.0;

pub fn render(state: &SurfaceState, ctx: &CanvasRenderingContext2d) {
	ctx.set_fill_style_str(BACKGROUND);
	ctx.fill_rect(0.0, 0.0, state.width, state.height);
	ctx.save();
	let _ = ctx.translate(state.transform.x, state.transform.y);
	let _ = ctx.scale(state.transform.k, state.transform.k);
	draw_edges(state, ctx);
	draw_nodes(state, ctx);
	ctx.restore();
}

/// Distance from a node centre to its outline along the unit direction.
fn boundary(style: &NodeStyle, ux: f64, uy: f64) -> f64 {
	let (rx, ry) = (style.width / 2.0, style.height / 2.0);
	1.0 / ((ux / rx).powi(2) + (uy / ry).powi(2)).sqrt()
}

fn set_dash(ctx: &CanvasRenderingContext2d, pattern: &[f64]) {
	let array = js_sys::Array::new();
	for &segment in pattern {
		array.push(&JsValue::from_f64(segment));
	}
	let _ = ctx.set_line_dash(&array);
}

fn draw_edges(state: &SurfaceState, ctx: &CanvasRenderingContext2d) {
	for (slot, edge) in state.snapshot.edges().iter().enumerate() {
		let (a, b) = state.snapshot.endpoints(slot);
		let ((x1, y1), (x2, y2)) = (state.layout.position(a), state.layout.position(b));
		let (dx, dy) = (x2 - x1, y2 - y1);
		let dist = (dx * dx + dy * dy).sqrt();
		if dist < 0.001 {
			continue;
		}

		let style = state.edge_style(slot);
		let (ux, uy) = (dx / dist, dy / dist);
		let start = boundary(&state.node_styles[a], ux, uy);
		let end = boundary(&state.node_styles[b], ux, uy);
		if start + end >= dist {
			continue;
		}
		let arrow_size = match style.arrow {
			ArrowShape::Triangle => 6.0 + style.width * 2.0,
			ArrowShape::None => 0.0,
		};
		let (sx, sy) = (x1 + ux * start, y1 + uy * start);
		let (tip_x, tip_y) = (x2 - ux * end, y2 - uy * end);
		let (ex, ey) = (tip_x - ux * arrow_size, tip_y - uy * arrow_size);

		if let Some(highlight) = style.highlight {
			set_dash(ctx, &[]);
			ctx.set_stroke_style_str(highlight);
			ctx.set_line_width(style.width + 6.0);
			ctx.begin_path();
			ctx.move_to(sx, sy);
			ctx.line_to(tip_x, tip_y);
			ctx.stroke();
		}

		match style.line_style {
			LineStyle::Solid => set_dash(ctx, &[]),
			LineStyle::Dashed => set_dash(ctx, &[8.0, 4.0]),
			LineStyle::Dotted => set_dash(ctx, &[2.0, 3.0]),
		}
		ctx.set_stroke_style_str(style.line_color);
		ctx.set_line_width(style.width);
		ctx.begin_path();
		ctx.move_to(sx, sy);
		ctx.line_to(ex, ey);
		ctx.stroke();
		set_dash(ctx, &[]);

		if style.arrow == ArrowShape::Triangle {
			let (px, py) = (-uy * arrow_size * 0.5, ux * arrow_size * 0.5);
			ctx.set_fill_style_str(style.line_color);
			ctx.begin_path();
			ctx.move_to(tip_x, tip_y);
			ctx.line_to(ex + px, ey + py);
			ctx.line_to(ex - px, ey - py);
			ctx.close_path();
			ctx.fill();
		}

		if !edge.label.is_empty() {
			// keep text upright
			let mut angle = dy.atan2(dx);
			if angle > PI / 2.0 || angle < -PI / 2.0 {
				angle += PI;
			}
			ctx.save();
			let _ = ctx.translate((x1 + x2) / 2.0, (y1 + y2) / 2.0);
			let _ = ctx.rotate(angle);
			ctx.set_font(&format!("{}px sans-serif", style.font_size));
			ctx.set_text_align("center");
			ctx.set_text_baseline("middle");
			ctx.set_fill_style_str(LABEL_COLOR);
			let _ = ctx.fill_text(&edge.label, 0.0, LABEL_OFFSET);
			ctx.restore();
		}
	}
}

fn trace_polygon(ctx: &CanvasRenderingContext2d, x: f64, y: f64, style: &NodeStyle, points: &[(f64, f64)]) {
	let (rx, ry) = (style.width / 2.0, style.height / 2.0);
	for (i, &(px, py)) in points.iter().enumerate() {
		let (qx, qy) = (x + px * rx, y + py * ry);
		if i == 0 {
			ctx.move_to(qx, qy);
		} else {
			ctx.line_to(qx, qy);
		}
	}
	ctx.close_path();
}

fn regular(count: usize, rotation: f64, inner: Option<f64>) -> Vec<(f64, f64)> {
	let total = if inner.is_some() { count * 2 } else { count };
	(0..total)
		.map(|i| {
			let angle = rotation + i as f64 * 2.0 * PI / total as f64;
			let r = match inner {
				Some(inner) if i % 2 == 1 => inner,
				_ => 1.0,
			};
			(r * angle.cos(), r * angle.sin())
		})
		.collect()
}

fn trace_shape(ctx: &CanvasRenderingContext2d, x: f64, y: f64, style: &NodeStyle) {
	ctx.begin_path();
	match style.shape {
		NodeShape::Ellipse => {
			let _ = ctx.ellipse(x, y, style.width / 2.0, style.height / 2.0, 0.0, 0.0, 2.0 * PI);
		}
		NodeShape::RoundRectangle => {
			let (hw, hh) = (style.width / 2.0, style.height / 2.0);
			let r = style.width.min(style.height) * 0.15;
			ctx.move_to(x - hw + r, y - hh);
			let _ = ctx.arc_to(x + hw, y - hh, x + hw, y + hh, r);
			let _ = ctx.arc_to(x + hw, y + hh, x - hw, y + hh, r);
			let _ = ctx.arc_to(x - hw, y + hh, x - hw, y - hh, r);
			let _ = ctx.arc_to(x - hw, y - hh, x + hw, y - hh, r);
			ctx.close_path();
		}
		NodeShape::Hexagon => trace_polygon(ctx, x, y, style, &regular(6, 0.0, None)),
		NodeShape::Diamond => {
			trace_polygon(ctx, x, y, style, &[(0.0, -1.0), (1.0, 0.0), (0.0, 1.0), (-1.0, 0.0)])
		}
		NodeShape::Triangle => {
			trace_polygon(ctx, x, y, style, &[(0.0, -1.0), (1.0, 1.0), (-1.0, 1.0)])
		}
		NodeShape::Star => trace_polygon(ctx, x, y, style, &regular(5, -PI / 2.0, Some(0.38))),
	}
}

fn draw_nodes(state: &SurfaceState, ctx: &CanvasRenderingContext2d) {
	for (slot, node) in state.snapshot.nodes().iter().enumerate() {
		let (x, y) = state.layout.position(slot);
		let style = state.node_style(slot);

		trace_shape(ctx, x, y, &style);
		ctx.set_fill_style_str(style.background);
		ctx.fill();
		ctx.set_stroke_style_str(style.border_color);
		ctx.set_line_width(style.border_width);
		ctx.stroke();

		let weight = if style.bold { "bold " } else { "" };
		ctx.set_font(&format!("{weight}{}px sans-serif", style.font_size));
		ctx.set_text_align("center");
		ctx.set_text_baseline("middle");
		let label = node.display_label();
		if let Some(outline) = style.text_outline {
			ctx.set_stroke_style_str(outline);
			ctx.set_line_width(2.0);
			let _ = ctx.stroke_text(label, x, y);
		}
		ctx.set_fill_style_str(style.text_color);
		let _ = ctx.fill_text(label, x, y);
	}
}
