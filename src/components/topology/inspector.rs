//! Inspector rows for the selected element.
//!
//! Rows come from an ordered rule table over the attribute bag. A rule
//! contributes a row only when its attribute is present and truthy.

use serde_json::Value;

use super::selection::SelectedElement;
use super::types::Attributes;

const BYTES_PER_GIB: f64 = 1024.0 * 1024.0 * 1024.0;

#[derive(Clone, Debug, PartialEq)]
pub enum RowValue {
	Text(String),
	/// `healthy` is true for `running` and `online`.
	Status { text: String, healthy: bool },
	List(Vec<String>),
}

#[derive(Clone, Debug, PartialEq)]
pub struct InspectorRow {
	pub label: &'static str,
	pub value: RowValue,
}

struct RowRule {
	key: &'static str,
	label: &'static str,
	predicate: fn(&Value) -> bool,
	render: fn(&Value) -> RowValue,
}

const RULES: &[RowRule] = &[
	RowRule { key: "status", label: "Status", predicate: truthy, render: status },
	RowRule { key: "vmid", label: "VM ID", predicate: truthy, render: text },
	RowRule { key: "node", label: "Host Node", predicate: truthy, render: text },
	RowRule { key: "cpu", label: "CPU", predicate: truthy, render: text },
	RowRule { key: "mem", label: "Memory", predicate: truthy, render: memory },
	RowRule { key: "vlan", label: "VLAN", predicate: truthy, render: text },
	RowRule { key: "vlan_id", label: "VLAN ID", predicate: truthy, render: text },
	RowRule { key: "cidr", label: "CIDR", predicate: truthy, render: text },
	RowRule { key: "gateway", label: "Gateway", predicate: truthy, render: text },
	RowRule { key: "ips", label: "IP Addresses", predicate: non_empty_list, render: list },
	RowRule { key: "mac", label: "MAC", predicate: truthy, render: text },
	RowRule { key: "interface", label: "Interface", predicate: truthy, render: text },
	RowRule { key: "bridge_vlan_aware", label: "VLAN Aware", predicate: truthy, render: yes_no },
];

/// Known rows, in display order. The `Type` row always comes first.
pub fn rows(element: &SelectedElement) -> Vec<InspectorRow> {
	let mut rows = vec![InspectorRow {
		label: "Type",
		value: RowValue::Text(element.type_name.clone()),
	}];
	rows.extend(RULES.iter().filter_map(|rule| {
		let value = element.attributes.get(rule.key)?;
		(rule.predicate)(value).then(|| InspectorRow {
			label: rule.label,
			value: (rule.render)(value),
		})
	}));
	rows
}

/// Attributes no rule covers, in key order.
pub fn extra_attributes(attributes: &Attributes) -> Vec<(String, String)> {
	attributes
		.iter()
		.filter(|(key, _)| RULES.iter().all(|rule| rule.key != key.as_str()))
		.map(|(key, value)| (key.clone(), display(value)))
		.collect()
}

/// `mem` bytes rendered as GiB with two decimals.
pub fn format_memory(bytes: f64) -> String {
	format!("{:.2} GB", bytes / BYTES_PER_GIB)
}

fn truthy(value: &Value) -> bool {
	match value {
		Value::Null => false,
		Value::Bool(b) => *b,
		Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0 && !f.is_nan()),
		Value::String(s) => !s.is_empty(),
		Value::Array(_) | Value::Object(_) => true,
	}
}

fn non_empty_list(value: &Value) -> bool {
	value.as_array().is_some_and(|items| !items.is_empty())
}

fn display(value: &Value) -> String {
	match value {
		Value::String(s) => s.clone(),
		Value::Array(items) => items.iter().map(display).collect::<Vec<_>>().join(", "),
		other => other.to_string(),
	}
}

fn text(value: &Value) -> RowValue {
	RowValue::Text(display(value))
}

fn status(value: &Value) -> RowValue {
	let text = display(value);
	let healthy = matches!(text.as_str(), "running" | "online");
	RowValue::Status { text, healthy }
}

fn memory(value: &Value) -> RowValue {
	match value.as_f64() {
		Some(bytes) => RowValue::Text(format_memory(bytes)),
		None => text(value),
	}
}

fn list(value: &Value) -> RowValue {
	let items = value.as_array().map(|items| items.iter().map(display).collect());
	RowValue::List(items.unwrap_or_default())
}

fn yes_no(value: &Value) -> RowValue {
	RowValue::Text(if truthy(value) { "Yes" } else { "No" }.to_owned())
}
