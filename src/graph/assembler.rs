use std::collections::{HashMap, HashSet, VecDeque};

use indexmap::map::Entry;
use indexmap::{IndexMap, IndexSet};
use log::debug;
use serde_json::{Map, Value};

use super::label::LabelMatcher;
use super::types::{Attributes, CurrentGraph, Edge, Node};
use crate::config::DEFAULT_NODE_CAP;

/// Field holding an entity's intrinsic identifier.
const ID_FIELD: &str = "uid";
/// Separates a predicate from a facet name, as in `friend|since`.
const FACET_SEPARATOR: char = '|';

#[derive(Debug)]
struct PendingNode {
	attributes: Attributes,
	group: String,
}

/// Builds one deduplicated graph out of a queue of raw result payloads.
///
/// Payloads are only walked when [`drain`](Self::drain) is called. Entities
/// found past the node cap stay pending, in discovery order, until a full
/// drain materializes them.
#[derive(Debug)]
pub struct GraphAssembler {
	node_cap: usize,
	queue: VecDeque<Value>,
	pending: IndexMap<String, PendingNode>,
	nodes: Vec<Node>,
	node_index: HashMap<String, usize>,
	held_edges: Vec<Edge>,
	edges: Vec<Edge>,
	edge_keys: HashSet<(String, String, String)>,
	labels: IndexSet<String>,
}

impl Default for GraphAssembler {
	fn default() -> Self {
		Self::new(DEFAULT_NODE_CAP)
	}
}

impl GraphAssembler {
	/// Empty assembler that materializes at most `node_cap` nodes per
	/// non-expanding drain.
	pub fn new(node_cap: usize) -> Self {
		Self {
			node_cap,
			queue: VecDeque::new(),
			pending: IndexMap::new(),
			nodes: Vec::new(),
			node_index: HashMap::new(),
			held_edges: Vec::new(),
			edges: Vec::new(),
			edge_keys: HashSet::new(),
			labels: IndexSet::new(),
		}
	}

	/// Queue a payload for the next drain.
	pub fn enqueue(&mut self, payload: Value) {
		self.queue.push_back(payload);
	}

	/// Payloads not yet walked.
	pub fn queued(&self) -> usize {
		self.queue.len()
	}

	/// Walk every queued payload in order, then materialize pending nodes up
	/// to the cap, or all of them when `expand_fully` is set.
	pub fn drain(&mut self, expand_fully: bool, label_pattern: &str) {
		let matcher = LabelMatcher::or_default(label_pattern);
		while let Some(payload) = self.queue.pop_front() {
			self.walk_payload(&payload, &matcher);
		}
		self.materialize(expand_fully, &matcher);
		self.release_edges();
		debug!(
			"assembled {} nodes, {} edges, {} remaining",
			self.nodes.len(),
			self.edges.len(),
			self.pending.len()
		);
	}

	/// The graph built so far.
	pub fn current_graph(&self) -> CurrentGraph {
		CurrentGraph {
			nodes: self.nodes.clone(),
			edges: self.edges.clone(),
			labels: self.labels.iter().cloned().collect(),
			remaining_nodes: self.pending.len(),
		}
	}

	fn walk_payload(&mut self, payload: &Value, matcher: &LabelMatcher) {
		let Value::Object(blocks) = payload else {
			debug!("skipping payload that is not an object of result blocks");
			return;
		};
		for (block, value) in blocks {
			for (i, entity) in entities(value).into_iter().enumerate() {
				self.visit(entity, block, &format!("{block}[{i}]"), matcher);
			}
		}
	}

	fn visit(
		&mut self,
		entity: &Map<String, Value>,
		group: &str,
		path: &str,
		matcher: &LabelMatcher,
	) -> String {
		let id = entity_id(entity).unwrap_or_else(|| format!("_:{path}"));

		let mut attributes = Attributes::new();
		let mut relations = Vec::new();
		for (key, value) in entity {
			if key.contains(FACET_SEPARATOR) {
				continue;
			}
			let targets = entities(value);
			if targets.is_empty() {
				attributes.insert(key.clone(), value.clone());
			} else {
				relations.push((key, targets));
			}
		}
		self.discover(&id, group, attributes, matcher);

		for (predicate, targets) in relations {
			for (j, child) in targets.into_iter().enumerate() {
				let child_id = self.visit(child, predicate, &format!("{path}.{predicate}[{j}]"), matcher);
				self.link(&id, child_id, predicate, facets(child, predicate));
			}
		}
		id
	}

	fn discover(&mut self, id: &str, group: &str, attributes: Attributes, matcher: &LabelMatcher) {
		if let Some(&index) = self.node_index.get(id) {
			let node = &mut self.nodes[index];
			node.attributes.extend(attributes);
			let matched = matcher.extract(&node.attributes);
			if let Some(label) = &matched {
				self.labels.insert(label.clone());
			}
			node.label = matched.unwrap_or_else(|| node.id.clone());
			return;
		}

		match self.pending.entry(id.to_string()) {
			Entry::Occupied(mut entry) => entry.get_mut().attributes.extend(attributes),
			Entry::Vacant(entry) => {
				entry.insert(PendingNode {
					attributes,
					group: group.to_string(),
				});
			}
		}
	}

	fn link(&mut self, source: &str, target: String, predicate: &str, attributes: Attributes) {
		let key = (source.to_string(), target.clone(), predicate.to_string());
		if !self.edge_keys.insert(key) {
			return;
		}
		self.held_edges.push(Edge {
			source: source.to_string(),
			target,
			label: predicate.to_string(),
			attributes,
		});
	}

	fn materialize(&mut self, expand_fully: bool, matcher: &LabelMatcher) {
		let admit = if expand_fully {
			self.pending.len()
		} else {
			self.node_cap
				.saturating_sub(self.nodes.len())
				.min(self.pending.len())
		};

		let admitted: Vec<_> = self.pending.drain(..admit).collect();
		for (id, pending) in admitted {
			let matched = matcher.extract(&pending.attributes);
			if let Some(label) = &matched {
				self.labels.insert(label.clone());
			}
			self.node_index.insert(id.clone(), self.nodes.len());
			self.nodes.push(Node {
				label: matched.unwrap_or_else(|| id.clone()),
				id,
				attributes: pending.attributes,
				group: Some(pending.group),
			});
		}
	}

	fn release_edges(&mut self) {
		let held = std::mem::take(&mut self.held_edges);
		let (ready, held): (Vec<_>, Vec<_>) = held.into_iter().partition(|edge| {
			self.node_index.contains_key(&edge.source) && self.node_index.contains_key(&edge.target)
		});
		self.edges.extend(ready);
		self.held_edges = held;
	}
}

/// Entity objects held by a field: a single object, or the objects of an array.
fn entities(value: &Value) -> Vec<&Map<String, Value>> {
	match value {
		Value::Object(map) => vec![map],
		Value::Array(items) => items.iter().filter_map(Value::as_object).collect(),
		_ => Vec::new(),
	}
}

fn entity_id(entity: &Map<String, Value>) -> Option<String> {
	match entity.get(ID_FIELD)? {
		Value::String(uid) if !uid.is_empty() => Some(uid.clone()),
		Value::Number(uid) => Some(uid.to_string()),
		_ => None,
	}
}

fn facets(child: &Map<String, Value>, predicate: &str) -> Attributes {
	child
		.iter()
		.filter_map(|(key, value)| {
			let (owner, facet) = key.split_once(FACET_SEPARATOR)?;
			(owner == predicate).then(|| (facet.to_string(), value.clone()))
		})
		.collect()
}

#[cfg(test)]
mod tests {
	use serde_json::json;

	use super::*;

	fn drained(cap: usize, payloads: &[Value]) -> GraphAssembler {
		let mut assembler = GraphAssembler::new(cap);
		for payload in payloads {
			assembler.enqueue(payload.clone());
		}
		assembler.drain(false, "Name");
		assembler
	}

	fn ids(graph: &CurrentGraph) -> Vec<&str> {
		graph.nodes.iter().map(|node| node.id.as_str()).collect()
	}

	fn people(n: usize) -> Value {
		let people: Vec<Value> = (0..n)
			.map(|i| json!({"uid": format!("0x{i}"), "Name": format!("p{i}")}))
			.collect();
		json!({"q": people})
	}

	#[test]
	fn nodes_and_edges_from_nested_result() {
		let assembler = drained(
			10,
			&[json!({"me": [{
				"uid": "0x1",
				"Name": "Alice",
				"friend": [{"uid": "0x2", "Name": "Bob", "friend|since": 2019}]
			}]})],
		);
		let graph = assembler.current_graph();

		assert_eq!(ids(&graph), ["0x1", "0x2"]);
		assert_eq!(graph.nodes[0].label, "Alice");
		assert_eq!(graph.nodes[0].group.as_deref(), Some("me"));
		assert_eq!(graph.nodes[1].group.as_deref(), Some("friend"));
		assert!(!graph.nodes[1].attributes.contains_key("friend|since"));

		assert_eq!(graph.edges.len(), 1);
		let edge = &graph.edges[0];
		assert_eq!((edge.source.as_str(), edge.target.as_str()), ("0x1", "0x2"));
		assert_eq!(edge.label, "friend");
		assert_eq!(edge.attributes.get("since"), Some(&json!(2019)));
		assert_eq!(graph.labels, ["Alice", "Bob"]);
		assert_eq!(graph.remaining_nodes, 0);
	}

	#[test]
	fn same_entity_through_two_paths_is_one_node() {
		let assembler = drained(
			10,
			&[json!({
				"a": [{"uid": "0x1", "friend": {"uid": "0x3", "age": 30}}],
				"b": [{"uid": "0x2", "friend": [{"uid": "0x3", "age": 31, "Name": "Carol"}]}]
			})],
		);
		let graph = assembler.current_graph();

		assert_eq!(ids(&graph), ["0x1", "0x3", "0x2"]);
		let carol = &graph.nodes[1];
		assert_eq!(carol.attributes.get("age"), Some(&json!(31)));
		assert_eq!(carol.label, "Carol");
		assert_eq!(graph.edges.len(), 2);
	}

	#[test]
	fn cap_holds_back_nodes_until_expanded() {
		let mut assembler = drained(3, &[people(5)]);
		let graph = assembler.current_graph();
		assert_eq!(graph.nodes.len(), 3);
		assert_eq!(graph.remaining_nodes, 2);

		assembler.drain(true, "Name");
		let graph = assembler.current_graph();
		assert_eq!(ids(&graph), ["0x0", "0x1", "0x2", "0x3", "0x4"]);
		assert_eq!(graph.remaining_nodes, 0);
	}

	#[test]
	fn edges_to_held_back_nodes_wait_for_expand() {
		let mut assembler = drained(
			1,
			&[json!({"q": [{"uid": "0x1", "knows": [{"uid": "0x2"}]}]})],
		);
		let graph = assembler.current_graph();
		assert_eq!(ids(&graph), ["0x1"]);
		assert!(graph.edges.is_empty());

		assembler.drain(true, "Name");
		assert_eq!(assembler.current_graph().edges.len(), 1);
	}

	#[test]
	fn draining_again_changes_nothing() {
		let mut assembler = drained(3, &[people(5)]);
		let first = assembler.current_graph();
		assembler.drain(false, "Name");
		assert_eq!(assembler.current_graph(), first);
	}

	#[test]
	fn same_input_same_order() {
		let payload = json!({"q": [
			{"Name": "x", "rel": [{"Name": "y"}, {"uid": "0x9"}]},
			{"uid": "0x9", "Name": "z"}
		]});
		let a = drained(10, std::slice::from_ref(&payload)).current_graph();
		let b = drained(10, &[payload]).current_graph();
		assert_eq!(a, b);
		assert_eq!(ids(&a), ["_:q[0]", "_:q[0].rel[0]", "0x9"]);
	}

	#[test]
	fn later_payloads_merge_in_queue_order() {
		let mut assembler = drained(10, &[json!({"q": [{"uid": "0x1", "v": 1}]})]);
		assembler.enqueue(json!({"q": [{"uid": "0x1", "v": 2}, {"uid": "0x2"}]}));
		assembler.enqueue(json!({"q": [{"uid": "0x3"}]}));
		assert_eq!(assembler.queued(), 2);
		assembler.drain(false, "Name");

		let graph = assembler.current_graph();
		assert_eq!(ids(&graph), ["0x1", "0x2", "0x3"]);
		assert_eq!(graph.nodes[0].attributes.get("v"), Some(&json!(2)));
		assert_eq!(assembler.queued(), 0);
	}

	#[test]
	fn unlabelled_nodes_fall_back_to_id() {
		let graph = drained(10, &[json!({"q": [{"uid": "0x5", "age": 3}]})]).current_graph();
		assert_eq!(graph.nodes[0].label, "0x5");
		assert!(graph.labels.is_empty());
	}

	#[test]
	fn malformed_payloads_build_nothing() {
		let graph = drained(
			10,
			&[json!({"q": 5}), json!("text"), json!({"q": ["a", 1, null]})],
		)
		.current_graph();
		assert_eq!(graph, CurrentGraph::default());
	}

	#[test]
	fn custom_label_pattern() {
		let mut assembler = GraphAssembler::new(10);
		assembler.enqueue(json!({"q": [{"uid": "0x1", "Name": "n", "title": "t"}]}));
		assembler.drain(false, "^title$");
		assert_eq!(assembler.current_graph().nodes[0].label, "t");
	}
}
