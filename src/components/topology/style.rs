//! Fixed style table: element type → visual style.
//!
//! Lookups are total. Unknown types get the default entry. Edge styling has
//! one attribute rule on top of the type table: a `vlan` attribute makes the
//! line dashed, whatever the edge type says.

use super::types::{EdgeType, GraphEdge, NodeType};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NodeShape {
	RoundRectangle,
	Ellipse,
	Hexagon,
	Diamond,
	Triangle,
	Star,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct NodeStyle {
	pub shape: NodeShape,
	pub background: &'static str,
	pub width: f64,
	pub height: f64,
	pub border_width: f64,
	pub border_color: &'static str,
	pub text_color: &'static str,
	/// Outline drawn behind the label, used on filled dark shapes.
	pub text_outline: Option<&'static str>,
	pub bold: bool,
	pub font_size: f64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LineStyle {
	Solid,
	Dashed,
	Dotted,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ArrowShape {
	Triangle,
	None,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct EdgeStyle {
	pub line_color: &'static str,
	pub width: f64,
	pub line_style: LineStyle,
	pub arrow: ArrowShape,
	/// Underlay stroked beneath the line when the edge is selected.
	pub highlight: Option<&'static str>,
	pub font_size: f64,
}

/// Additive layer for the selected element.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SelectedLayer {
	pub border_width: f64,
	pub border_color: &'static str,
	pub background: &'static str,
}

pub const SELECTED: SelectedLayer = SelectedLayer {
	border_width: 4.0,
	border_color: "#ff0000",
	background: "#ffcccc",
};

const DEFAULT_NODE: NodeStyle = NodeStyle {
	shape: NodeShape::Ellipse,
	background: "#fff",
	width: 80.0,
	height: 80.0,
	border_width: 2.0,
	border_color: "#666",
	text_color: "#000",
	text_outline: None,
	bold: false,
	font_size: 12.0,
};

const DEFAULT_EDGE: EdgeStyle = EdgeStyle {
	line_color: "#999",
	width: 3.0,
	line_style: LineStyle::Solid,
	arrow: ArrowShape::Triangle,
	highlight: None,
	font_size: 10.0,
};

const VLAN_COLOR: &str = "#50E3C2";

impl NodeStyle {
	pub fn for_type(kind: &NodeType) -> Self {
		let (shape, background, width, height) = match kind {
			NodeType::PhysicalNode => {
				return Self {
					shape: NodeShape::RoundRectangle,
					background: "#4A90E2",
					width: 120.0,
					height: 100.0,
					text_color: "#fff",
					text_outline: Some("#4A90E2"),
					bold: true,
					..DEFAULT_NODE
				};
			}
			NodeType::Vm => (NodeShape::Ellipse, "#7ED321", 80.0, 80.0),
			NodeType::Container => (NodeShape::Hexagon, "#F5A623", 80.0, 80.0),
			NodeType::Bridge => (NodeShape::Diamond, "#BD10E0", 100.0, 100.0),
			NodeType::Vlan => (NodeShape::Triangle, VLAN_COLOR, 90.0, 90.0),
			NodeType::SdnVnet => (NodeShape::Star, "#FF6B6B", 100.0, 100.0),
			NodeType::Other(_) => return DEFAULT_NODE,
		};
		Self {
			shape,
			background,
			width,
			height,
			..DEFAULT_NODE
		}
	}

	/// Base style with the selection layer on top; shape, size and label
	/// styling are untouched.
	pub fn selected(self) -> Self {
		Self {
			border_width: SELECTED.border_width,
			border_color: SELECTED.border_color,
			background: SELECTED.background,
			..self
		}
	}
}

impl EdgeStyle {
	pub fn for_type(kind: &EdgeType) -> Self {
		match kind {
			EdgeType::PhysicalConnection => Self {
				line_color: "#4A90E2",
				width: 4.0,
				..DEFAULT_EDGE
			},
			EdgeType::NetworkConnection => Self {
				line_color: "#7ED321",
				width: 2.0,
				..DEFAULT_EDGE
			},
			EdgeType::Hosts => Self {
				line_color: "#ccc",
				width: 2.0,
				line_style: LineStyle::Dotted,
				arrow: ArrowShape::None,
				..DEFAULT_EDGE
			},
			EdgeType::Vlan | EdgeType::Other(_) => DEFAULT_EDGE,
		}
	}

	/// Type style with the `vlan` attribute rule applied.
	pub fn for_edge(edge: &GraphEdge) -> Self {
		let base = Self::for_type(&edge.kind);
		if edge.has_vlan() {
			Self {
				line_color: VLAN_COLOR,
				width: 2.0,
				line_style: LineStyle::Dashed,
				..base
			}
		} else {
			base
		}
	}

	pub fn selected(self) -> Self {
		Self {
			highlight: Some(SELECTED.background),
			..self
		}
	}
}

/// Legend rows, derived from the same table the canvas uses.
pub fn legend() -> Vec<(&'static str, &'static str)> {
	NodeType::KNOWN
		.iter()
		.map(|kind| {
			let name = match kind {
				NodeType::PhysicalNode => "Physical Node",
				NodeType::Vm => "VM",
				NodeType::Container => "Container",
				NodeType::Bridge => "Bridge",
				NodeType::Vlan => "VLAN",
				NodeType::SdnVnet => "SDN VNET",
				NodeType::Other(_) => "Other",
			};
			(name, NodeStyle::for_type(kind).background)
		})
		.collect()
}

#[cfg(test)]
mod tests {
	use serde_json::json;

	use super::*;
	use crate::components::topology::types::Attributes;

	fn edge(kind: &str, attributes: serde_json::Value) -> GraphEdge {
		let attributes: Attributes = serde_json::from_value(attributes).unwrap();
		GraphEdge {
			id: "a-b".into(),
			source: "a".into(),
			target: "b".into(),
			kind: EdgeType::parse(kind),
			label: kind.into(),
			attributes,
		}
	}

	#[test]
	fn node_lookup_is_total() {
		for kind in NodeType::KNOWN {
			assert_ne!(NodeStyle::for_type(&kind), DEFAULT_NODE, "{kind}");
		}
		assert_eq!(NodeStyle::for_type(&NodeType::parse("ceph_pool")), DEFAULT_NODE);
		assert_eq!(NodeStyle::for_type(&NodeType::parse("")), DEFAULT_NODE);
	}

	#[test]
	fn edge_lookup_is_total() {
		for raw in ["physical_connection", "network_connection", "vlan", "hosts", "???"] {
			let style = EdgeStyle::for_type(&EdgeType::parse(raw));
			assert!(style.width > 0.0);
		}
		assert_eq!(EdgeStyle::for_type(&EdgeType::parse("mystery")), DEFAULT_EDGE);
	}

	#[test]
	fn vlan_attribute_forces_dashed_line() {
		for raw in ["physical_connection", "network_connection", "vlan", "hosts", "other"] {
			let style = EdgeStyle::for_edge(&edge(raw, json!({"vlan": "20"})));
			assert_eq!(style.line_style, LineStyle::Dashed, "{raw}");
			assert_eq!(style.line_color, VLAN_COLOR);
		}
		// presence is what counts, even with a null value
		let style = EdgeStyle::for_edge(&edge("hosts", json!({"vlan": null})));
		assert_eq!(style.line_style, LineStyle::Dashed);
	}

	#[test]
	fn hosts_edge_is_dotted_without_arrow() {
		let style = EdgeStyle::for_edge(&edge("hosts", json!({})));
		assert_eq!(style.line_style, LineStyle::Dotted);
		assert_eq!(style.arrow, ArrowShape::None);
	}

	#[test]
	fn selection_layer_composes_with_base() {
		let base = NodeStyle::for_type(&NodeType::Bridge);
		let selected = base.selected();
		assert_eq!(selected.shape, NodeShape::Diamond);
		assert_eq!(selected.width, base.width);
		assert_eq!(selected.border_color, "#ff0000");
		assert_eq!(selected.background, "#ffcccc");

		let edge_base = EdgeStyle::for_edge(&edge("physical_connection", json!({})));
		let edge_selected = edge_base.selected();
		assert_eq!(edge_selected.line_color, edge_base.line_color);
		assert_eq!(edge_selected.highlight, Some("#ffcccc"));
	}

	#[test]
	fn legend_matches_canvas_colors() {
		let legend = legend();
		assert_eq!(legend.len(), 6);
		assert_eq!(legend[0], ("Physical Node", "#4A90E2"));
		assert_eq!(legend[5], ("SDN VNET", "#FF6B6B"));
	}
}
