//! Raw snapshot → validated [`TopologySnapshot`].
//!
//! The builder fails closed: a duplicate id or a dangling edge rejects the
//! whole snapshot instead of being dropped or merged.

use std::collections::HashMap;
use std::collections::hash_map::Entry;

use thiserror::Error;

use super::types::{EdgeType, GraphEdge, GraphNode, NodeType, RawSnapshot, TopologySnapshot};

/// Structural violations found while building a snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BuildError {
	#[error("node #{index} has no id")]
	MissingNodeId { index: usize },
	#[error("duplicate node id `{id}`")]
	DuplicateNodeId { id: String },
	#[error("duplicate edge id `{id}` (two edges share both endpoints)")]
	DuplicateEdgeId { id: String },
	#[error("edge `{edge}` references unknown node `{endpoint}`")]
	DanglingEdgeReference { edge: String, endpoint: String },
}

/// Validates `raw` and converts it into the typed graph model.
pub fn build(raw: RawSnapshot) -> Result<TopologySnapshot, BuildError> {
	let mut nodes = Vec::with_capacity(raw.nodes.len());
	let mut node_slots = HashMap::with_capacity(raw.nodes.len());

	for (index, node) in raw.nodes.into_iter().enumerate() {
		let Some(id) = node.id.filter(|id| !id.is_empty()) else {
			return Err(BuildError::MissingNodeId { index });
		};
		match node_slots.entry(id.clone()) {
			Entry::Occupied(_) => return Err(BuildError::DuplicateNodeId { id }),
			Entry::Vacant(slot) => {
				slot.insert(nodes.len());
			}
		}
		nodes.push(GraphNode {
			id,
			label: node.label.unwrap_or_default(),
			kind: NodeType::parse(node.kind.as_deref().unwrap_or_default()),
			attributes: node.extra,
		});
	}

	let mut edges = Vec::with_capacity(raw.edges.len());
	let mut endpoints = Vec::with_capacity(raw.edges.len());
	let mut edge_ids = HashMap::with_capacity(raw.edges.len());

	for edge in raw.edges {
		let id = format!(
			"{}-{}",
			edge.source.as_deref().unwrap_or_default(),
			edge.target.as_deref().unwrap_or_default()
		);

		// An absent endpoint never resolves, even if some node id is empty.
		let resolve = |endpoint: Option<&str>| {
			endpoint
				.and_then(|endpoint| node_slots.get(endpoint))
				.copied()
				.ok_or_else(|| BuildError::DanglingEdgeReference {
					edge: id.clone(),
					endpoint: endpoint.unwrap_or_default().to_owned(),
				})
		};
		let (from, to) = (resolve(edge.source.as_deref())?, resolve(edge.target.as_deref())?);
		let (source, target) = (edge.source.unwrap_or_default(), edge.target.unwrap_or_default());

		if edge_ids.insert(id.clone(), edges.len()).is_some() {
			return Err(BuildError::DuplicateEdgeId { id });
		}

		let kind_raw = edge.kind.unwrap_or_default();
		let label = match edge.label {
			Some(label) if !label.is_empty() => label,
			_ => kind_raw.clone(),
		};
		endpoints.push((from, to));
		edges.push(GraphEdge {
			id,
			source,
			target,
			kind: EdgeType::parse(&kind_raw),
			label,
			attributes: edge.extra,
		});
	}

	Ok(TopologySnapshot {
		nodes,
		edges,
		endpoints,
		node_slots,
		summary: raw.summary,
		cluster_name: raw.cluster_name,
	})
}

#[cfg(test)]
mod tests {
	use pretty_assertions::assert_eq;
	use serde_json::json;

	use super::*;

	fn raw(value: serde_json::Value) -> RawSnapshot {
		serde_json::from_value(value).unwrap()
	}

	#[test]
	fn builds_valid_snapshot_with_matching_counts() {
		let snapshot = build(raw(json!({
			"nodes": [
				{"id": "node-pve1", "label": "pve1", "type": "physical_node", "status": "online"},
				{"id": "network-vmbr0", "label": "vmbr0", "type": "bridge", "cidr": "10.0.0.0/24"},
				{"id": "vm-pve1-100", "label": "web", "type": "vm", "vmid": 100},
			],
			"edges": [
				{"source": "node-pve1", "target": "network-vmbr0", "type": "physical_connection"},
				{"source": "node-pve1", "target": "vm-pve1-100", "type": "hosts", "label": "hosts"},
				{"source": "vm-pve1-100", "target": "network-vmbr0", "type": "network_connection", "vlan": "20"},
			],
			"summary": {"total_nodes": 1, "total_vms": 1, "total_networks": 1, "total_sdn": 0}
		})))
		.unwrap();

		assert_eq!(snapshot.nodes().len(), 3);
		assert_eq!(snapshot.edges().len(), 3);
		assert_eq!(snapshot.summary().total_vms, 1);
		assert_eq!(snapshot.edges()[2].id, "vm-pve1-100-network-vmbr0");
		assert_eq!(snapshot.endpoints(2), (2, 1));
	}

	#[test]
	fn rejects_edges_sharing_both_endpoints() {
		let err = build(raw(json!({
			"nodes": [{"id": "a"}, {"id": "b"}],
			"edges": [
				{"source": "a", "target": "b", "type": "hosts"},
				{"source": "a", "target": "b", "type": "network_connection"},
			]
		})))
		.unwrap_err();

		assert_eq!(err, BuildError::DuplicateEdgeId { id: "a-b".into() });
	}

	#[test]
	fn reversed_edges_are_distinct() {
		let snapshot = build(raw(json!({
			"nodes": [{"id": "a"}, {"id": "b"}],
			"edges": [{"source": "a", "target": "b"}, {"source": "b", "target": "a"}]
		})))
		.unwrap();
		assert_eq!(snapshot.edges().len(), 2);
	}

	#[test]
	fn rejects_dangling_target() {
		let err = build(raw(json!({
			"nodes": [{"id": "a"}],
			"edges": [{"source": "a", "target": "ghost", "type": "hosts"}]
		})))
		.unwrap_err();

		assert_eq!(
			err,
			BuildError::DanglingEdgeReference {
				edge: "a-ghost".into(),
				endpoint: "ghost".into(),
			}
		);
	}

	#[test]
	fn missing_endpoint_is_dangling() {
		let err = build(raw(json!({
			"nodes": [{"id": "a"}],
			"edges": [{"source": "a"}]
		})))
		.unwrap_err();
		assert!(matches!(err, BuildError::DanglingEdgeReference { endpoint, .. } if endpoint.is_empty()));
	}

	#[test]
	fn missing_endpoint_never_matches_empty_id() {
		let err = build(raw(json!({
			"nodes": [{"id": ""}, {"id": "b"}],
			"edges": [{"target": "b"}]
		})))
		.unwrap_err();
		assert_eq!(err, BuildError::MissingNodeId { index: 0 });

		let err = build(raw(json!({
			"nodes": [{"id": "a"}, {"id": "b"}],
			"edges": [{"target": "b", "type": "hosts"}]
		})))
		.unwrap_err();
		assert_eq!(
			err,
			BuildError::DanglingEdgeReference {
				edge: "-b".into(),
				endpoint: String::new(),
			}
		);
	}

	#[test]
	fn rejects_duplicate_and_missing_node_ids() {
		let dup = build(raw(json!({"nodes": [{"id": "a"}, {"id": "a"}], "edges": []}))).unwrap_err();
		assert_eq!(dup, BuildError::DuplicateNodeId { id: "a".into() });

		let missing = build(raw(json!({"nodes": [{"id": "a"}, {"label": "nameless"}], "edges": []}))).unwrap_err();
		assert_eq!(missing, BuildError::MissingNodeId { index: 1 });

		let empty = build(raw(json!({"nodes": [{"id": "a"}, {"id": ""}], "edges": []}))).unwrap_err();
		assert_eq!(empty, BuildError::MissingNodeId { index: 1 });
	}

	#[test]
	fn keeps_extra_attributes_verbatim() {
		let snapshot = build(raw(json!({
			"nodes": [{
				"id": "vm-1", "type": "vm", "label": "db",
				"ips": ["10.0.0.5/24"], "mem": 4294967296u64, "custom_field": {"nested": true}
			}],
			"edges": []
		})))
		.unwrap();

		let node = snapshot.node("vm-1").unwrap();
		assert_eq!(node.kind, NodeType::Vm);
		assert_eq!(node.attributes["ips"], json!(["10.0.0.5/24"]));
		assert_eq!(node.attributes["custom_field"], json!({"nested": true}));
		assert!(!node.attributes.contains_key("id"));
		assert!(!node.attributes.contains_key("type"));
	}

	#[test]
	fn unknown_types_are_preserved() {
		let snapshot = build(raw(json!({
			"nodes": [{"id": "x", "type": "storage_pool"}, {"id": "y"}],
			"edges": [{"source": "x", "target": "y", "type": "replication"}]
		})))
		.unwrap();

		assert_eq!(snapshot.nodes()[0].kind, NodeType::Other("storage_pool".into()));
		assert_eq!(snapshot.nodes()[1].kind, NodeType::Other(String::new()));
		assert_eq!(snapshot.edges()[0].kind, EdgeType::Other("replication".into()));
	}

	#[test]
	fn edge_label_falls_back_to_type() {
		let snapshot = build(raw(json!({
			"nodes": [{"id": "a"}, {"id": "b"}, {"id": "c"}],
			"edges": [
				{"source": "a", "target": "b", "type": "physical_connection"},
				{"source": "a", "target": "c", "type": "network_connection", "label": "VLAN 20"},
			]
		})))
		.unwrap();

		assert_eq!(snapshot.edges()[0].label, "physical_connection");
		assert_eq!(snapshot.edges()[1].label, "VLAN 20");
	}

	#[test]
	fn partitions_connected_components() {
		let snapshot = build(raw(json!({
			"nodes": [{"id": "a"}, {"id": "b"}, {"id": "c"}, {"id": "d"}, {"id": "e"}],
			"edges": [{"source": "a", "target": "c"}, {"source": "d", "target": "b"}]
		})))
		.unwrap();

		assert_eq!(snapshot.components(), vec![0, 1, 0, 1, 2]);
	}

	#[test]
	fn build_is_deterministic() {
		let value = json!({
			"nodes": [{"id": "a", "type": "vm"}, {"id": "b", "type": "bridge"}],
			"edges": [{"source": "a", "target": "b", "vlan": 5}]
		});
		let first = build(raw(value.clone())).unwrap();
		let second = build(raw(value)).unwrap();
		assert_eq!(first.nodes(), second.nodes());
		assert_eq!(first.edges(), second.edges());
	}
}
