use super::types::{Attributes, ElementKind, GraphEdge, GraphNode};

/// Read-only copy of the element under inspection.
#[derive(Clone, Debug, PartialEq)]
pub struct SelectedElement {
	pub id: String,
	pub kind: ElementKind,
	pub label: String,
	/// Raw type string (`vm`, `hosts`, ...).
	pub type_name: String,
	pub attributes: Attributes,
}

impl SelectedElement {
	pub fn from_node(node: &GraphNode) -> Self {
		Self {
			id: node.id.clone(),
			kind: ElementKind::Node,
			label: node.label.clone(),
			type_name: node.kind.as_str().to_owned(),
			attributes: node.attributes.clone(),
		}
	}

	pub fn from_edge(edge: &GraphEdge) -> Self {
		Self {
			id: edge.id.clone(),
			kind: ElementKind::Edge,
			label: edge.label.clone(),
			type_name: edge.kind.as_str().to_owned(),
			attributes: edge.attributes.clone(),
		}
	}

	pub fn title(&self) -> &str {
		if self.label.is_empty() { &self.id } else { &self.label }
	}
}

#[derive(Clone, Debug, Default, PartialEq)]
pub enum Selection {
	#[default]
	None,
	Selected(SelectedElement),
}

impl Selection {
	pub fn element(&self) -> Option<&SelectedElement> {
		match self {
			Self::None => None,
			Self::Selected(element) => Some(element),
		}
	}

	pub fn id(&self) -> Option<&str> {
		self.element().map(|element| element.id.as_str())
	}

	pub fn is_selected(&self, id: &str) -> bool {
		self.id() == Some(id)
	}
}

/// Single-selection state machine.
///
/// Clicking an element selects it (a different element replaces the
/// current one; the same element stays selected), clicking the background
/// clears it, and replacing the snapshot clears it unconditionally.
#[derive(Debug, Default)]
pub struct SelectionManager {
	current: Selection,
}

impl SelectionManager {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn current(&self) -> &Selection {
		&self.current
	}

	pub fn click_element(&mut self, element: SelectedElement) -> &Selection {
		self.current = Selection::Selected(element);
		&self.current
	}

	pub fn click_background(&mut self) -> &Selection {
		self.current = Selection::None;
		&self.current
	}

	pub fn snapshot_replaced(&mut self) -> &Selection {
		if self.current != Selection::None {
			log::debug!("selection cleared by snapshot replacement");
		}
		self.current = Selection::None;
		&self.current
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::components::topology::types::{EdgeType, NodeType};

	fn node(id: &str) -> GraphNode {
		GraphNode {
			id: id.into(),
			label: id.into(),
			kind: NodeType::PhysicalNode,
			attributes: Attributes::new(),
		}
	}

	fn edge(source: &str, target: &str) -> GraphEdge {
		GraphEdge {
			id: format!("{source}-{target}"),
			source: source.into(),
			target: target.into(),
			kind: EdgeType::PhysicalConnection,
			label: String::new(),
			attributes: Attributes::new(),
		}
	}

	fn state(selection: &Selection) -> Option<(String, ElementKind)> {
		selection.element().map(|el| (el.id.clone(), el.kind))
	}

	#[test]
	fn node_background_edge_sequence() {
		let mut manager = SelectionManager::new();
		let mut seen = Vec::new();

		seen.push(state(manager.click_element(SelectedElement::from_node(&node("pve1")))));
		seen.push(state(manager.click_background()));
		seen.push(state(manager.click_element(SelectedElement::from_edge(&edge("pve1", "vmbr0")))));

		assert_eq!(
			seen,
			vec![
				Some(("pve1".to_owned(), ElementKind::Node)),
				None,
				Some(("pve1-vmbr0".to_owned(), ElementKind::Edge)),
			]
		);
	}

	#[test]
	fn clicking_again_replaces_instead_of_toggling() {
		let mut manager = SelectionManager::new();
		manager.click_element(SelectedElement::from_node(&node("a")));
		manager.click_element(SelectedElement::from_node(&node("a")));
		assert!(manager.current().is_selected("a"));

		manager.click_element(SelectedElement::from_node(&node("b")));
		assert!(manager.current().is_selected("b"));
		assert!(!manager.current().is_selected("a"));
	}

	#[test]
	fn snapshot_replacement_clears() {
		let mut manager = SelectionManager::new();
		manager.click_element(SelectedElement::from_node(&node("a")));
		assert_eq!(manager.snapshot_replaced(), &Selection::None);
		assert_eq!(manager.snapshot_replaced(), &Selection::None);
	}

	#[test]
	fn title_falls_back_to_id() {
		let element = SelectedElement::from_edge(&edge("a", "b"));
		assert_eq!(element.title(), "a-b");
	}
}
