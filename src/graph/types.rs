use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::execution::QueryResponse;

/// Attribute bag of a node or edge, in first-seen key order.
pub type Attributes = Map<String, Value>;

/// A materialized entity.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Node {
	/// Dedup key: the entity's `uid`, or a path-derived key.
	pub id: String,
	/// Display label.
	pub label: String,
	/// Scalar fields of the entity.
	pub attributes: Attributes,
	/// Predicate the node was first reached through.
	pub group: Option<String>,
}

/// A relationship between two materialized nodes.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Edge {
	/// Id of the parent entity.
	pub source: String,
	/// Id of the child entity.
	pub target: String,
	/// Predicate name.
	pub label: String,
	/// Facets carried on the relationship.
	pub attributes: Attributes,
}

/// What the assembler has built so far.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CurrentGraph {
	/// Nodes in first-discovery order.
	pub nodes: Vec<Node>,
	/// Edges between materialized nodes.
	pub edges: Vec<Edge>,
	/// Distinct matched labels.
	pub labels: Vec<String>,
	/// Nodes discovered but held back by the cap.
	pub remaining_nodes: usize,
}

/// Immutable graph handed to the presentation layer.
#[derive(Clone, Debug, PartialEq)]
pub struct GraphSnapshot {
	/// Nodes in first-discovery order.
	pub nodes: Vec<Node>,
	/// Edges between those nodes.
	pub edges: Vec<Edge>,
	/// Always `nodes.len()`.
	pub num_nodes: usize,
	/// Always `edges.len()`.
	pub num_edges: usize,
	/// Distinct labels used for the legend.
	pub plot_axis: Vec<String>,
	/// Nodes that an expand would add.
	pub remaining_nodes: usize,
	/// Response the snapshot was built from.
	pub raw_response: QueryResponse,
	/// Show the tree view instead of the canvas.
	pub tree_view: bool,
}

impl GraphSnapshot {
	/// Freeze the assembler's current graph. `None` when it holds no nodes.
	pub fn build(graph: CurrentGraph, raw_response: QueryResponse) -> Option<Self> {
		if graph.nodes.is_empty() {
			return None;
		}
		Some(Self {
			num_nodes: graph.nodes.len(),
			num_edges: graph.edges.len(),
			nodes: graph.nodes,
			edges: graph.edges,
			plot_axis: graph.labels,
			remaining_nodes: graph.remaining_nodes,
			raw_response,
			tree_view: false,
		})
	}

	/// Copy of this snapshot with the view mode flipped.
	pub fn with_tree_view(&self, tree_view: bool) -> Self {
		Self {
			tree_view,
			..self.clone()
		}
	}

	/// Look up a node by id.
	pub fn node(&self, id: &str) -> Option<&Node> {
		self.nodes.iter().find(|node| node.id == id)
	}

	/// Outgoing edges of a node.
	pub fn edges_from<'a>(&'a self, id: &'a str) -> impl Iterator<Item = &'a Edge> + 'a {
		self.edges.iter().filter(move |edge| edge.source == id)
	}

	/// Distinct groups in first-seen order, for coloring.
	pub fn groups(&self) -> Vec<&str> {
		let mut groups: Vec<&str> = Vec::new();
		for group in self.nodes.iter().filter_map(|node| node.group.as_deref()) {
			if !groups.contains(&group) {
				groups.push(group);
			}
		}
		groups
	}
}
