use std::collections::HashMap;
use std::fmt;

use serde::Deserialize;
use serde_json::Value;

/// Open attribute bag carried by every node and edge.
pub type Attributes = serde_json::Map<String, Value>;

/// Snapshot payload as served by `GET {base}/topology`.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct RawSnapshot {
	/// Raw nodes in server order. Required: a body without it is not a
	/// snapshot.
	pub nodes: Vec<RawNode>,
	/// Raw edges in server order. Required, like `nodes`.
	pub edges: Vec<RawEdge>,
	/// Aggregate counts computed by the backend.
	#[serde(default)]
	pub summary: SummaryCounts,
	/// Cluster name, when the backend knows it.
	#[serde(default)]
	pub cluster_name: Option<String>,
}

/// A node exactly as received; everything but the core keys lands in `extra`.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct RawNode {
	#[serde(default)]
	pub id: Option<String>,
	#[serde(default)]
	pub label: Option<String>,
	#[serde(default, rename = "type")]
	pub kind: Option<String>,
	#[serde(flatten)]
	pub extra: Attributes,
}

/// An edge exactly as received.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct RawEdge {
	#[serde(default)]
	pub source: Option<String>,
	#[serde(default)]
	pub target: Option<String>,
	#[serde(default, rename = "type")]
	pub kind: Option<String>,
	#[serde(default)]
	pub label: Option<String>,
	#[serde(flatten)]
	pub extra: Attributes,
}

/// Header counters. Missing fields read as zero.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct SummaryCounts {
	pub total_nodes: u64,
	pub total_vms: u64,
	pub total_networks: u64,
	pub total_sdn: u64,
}

/// Node categories known to the style table.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum NodeType {
	PhysicalNode,
	Vm,
	Container,
	Bridge,
	Vlan,
	SdnVnet,
	/// Anything else the backend sends; styled with the default entry.
	Other(String),
}

impl NodeType {
	/// Every recognised node type, in legend order.
	pub const KNOWN: [NodeType; 6] = [
		NodeType::PhysicalNode,
		NodeType::Vm,
		NodeType::Container,
		NodeType::Bridge,
		NodeType::Vlan,
		NodeType::SdnVnet,
	];

	pub fn parse(raw: &str) -> Self {
		match raw {
			"physical_node" => Self::PhysicalNode,
			"vm" => Self::Vm,
			"container" => Self::Container,
			"bridge" => Self::Bridge,
			"vlan" => Self::Vlan,
			"sdn_vnet" => Self::SdnVnet,
			other => Self::Other(other.to_owned()),
		}
	}

	pub fn as_str(&self) -> &str {
		match self {
			Self::PhysicalNode => "physical_node",
			Self::Vm => "vm",
			Self::Container => "container",
			Self::Bridge => "bridge",
			Self::Vlan => "vlan",
			Self::SdnVnet => "sdn_vnet",
			Self::Other(raw) => raw,
		}
	}
}

impl fmt::Display for NodeType {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

/// Edge categories known to the style table.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum EdgeType {
	PhysicalConnection,
	NetworkConnection,
	Vlan,
	Hosts,
	Other(String),
}

impl EdgeType {
	pub fn parse(raw: &str) -> Self {
		match raw {
			"physical_connection" => Self::PhysicalConnection,
			"network_connection" => Self::NetworkConnection,
			"vlan" => Self::Vlan,
			"hosts" => Self::Hosts,
			other => Self::Other(other.to_owned()),
		}
	}

	pub fn as_str(&self) -> &str {
		match self {
			Self::PhysicalConnection => "physical_connection",
			Self::NetworkConnection => "network_connection",
			Self::Vlan => "vlan",
			Self::Hosts => "hosts",
			Self::Other(raw) => raw,
		}
	}
}

impl fmt::Display for EdgeType {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

/// Whether a graph element is a node or an edge.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ElementKind {
	Node,
	Edge,
}

#[derive(Clone, Debug, PartialEq)]
pub struct GraphNode {
	pub id: String,
	pub label: String,
	pub kind: NodeType,
	pub attributes: Attributes,
}

impl GraphNode {
	/// Label to draw; falls back to the id when the backend sent none.
	pub fn display_label(&self) -> &str {
		if self.label.is_empty() { &self.id } else { &self.label }
	}
}

#[derive(Clone, Debug, PartialEq)]
pub struct GraphEdge {
	/// Always `source-target`.
	pub id: String,
	pub source: String,
	pub target: String,
	pub kind: EdgeType,
	pub label: String,
	pub attributes: Attributes,
}

impl GraphEdge {
	/// VLAN-tagged edges are drawn dashed whatever their type.
	pub fn has_vlan(&self) -> bool {
		self.attributes.contains_key("vlan")
	}
}

/// A validated, immutable topology. Produced only by [`super::builder::build`].
#[derive(Clone, Debug)]
pub struct TopologySnapshot {
	pub(super) nodes: Vec<GraphNode>,
	pub(super) edges: Vec<GraphEdge>,
	pub(super) endpoints: Vec<(usize, usize)>,
	pub(super) node_slots: HashMap<String, usize>,
	pub(super) summary: SummaryCounts,
	pub(super) cluster_name: Option<String>,
}

impl TopologySnapshot {
	pub fn nodes(&self) -> &[GraphNode] {
		&self.nodes
	}

	pub fn edges(&self) -> &[GraphEdge] {
		&self.edges
	}

	pub fn summary(&self) -> SummaryCounts {
		self.summary
	}

	pub fn cluster_name(&self) -> Option<&str> {
		self.cluster_name.as_deref()
	}

	pub fn node(&self, id: &str) -> Option<&GraphNode> {
		self.node_slots.get(id).map(|&slot| &self.nodes[slot])
	}

	pub fn edge(&self, id: &str) -> Option<&GraphEdge> {
		self.edges.iter().find(|edge| edge.id == id)
	}

	/// Node slots `(source, target)` for the edge at `slot`.
	pub fn endpoints(&self, slot: usize) -> (usize, usize) {
		self.endpoints[slot]
	}

	/// Component id per node slot. Ids are dense, numbered in order of
	/// first appearance.
	pub fn components(&self) -> Vec<usize> {
		let mut parent: Vec<usize> = (0..self.nodes.len()).collect();
		for &(a, b) in &self.endpoints {
			let (ra, rb) = (find_root(&mut parent, a), find_root(&mut parent, b));
			if ra != rb {
				parent[ra.max(rb)] = ra.min(rb);
			}
		}

		let mut ids = HashMap::new();
		(0..self.nodes.len())
			.map(|i| {
				let root = find_root(&mut parent, i);
				let next = ids.len();
				*ids.entry(root).or_insert(next)
			})
			.collect()
	}
}

/// Union-find root of `i`, halving the path on the way up.
fn find_root(parent: &mut [usize], mut i: usize) -> usize {
	while parent[i] != i {
		parent[i] = parent[parent[i]];
		i = parent[i];
	}
	i
}
