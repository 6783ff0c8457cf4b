use std::collections::{HashMap, HashSet};
use std::f64::consts::PI;

use force_graph::{DefaultNodeIdx, EdgeData, ForceGraph, NodeData, SimulationParameters};

use crate::graph::GraphSnapshot;

const PALETTE: &[&str] = &[
	"#1f77b4", "#ff7f0e", "#2ca02c", "#d62728", "#9467bd", "#8c564b", "#e377c2", "#7f7f7f",
	"#bcbd22", "#17becf",
];
const MAX_LABEL_CHARS: usize = 20;

pub const NODE_RADIUS: f64 = 6.0;
pub const HIT_RADIUS: f64 = 12.0;
/// Pointer travel, in pixels, below which a press counts as a click.
const CLICK_SLOP: f64 = 3.0;

#[derive(Clone, Debug)]
pub struct NodeInfo {
	pub id: String,
	pub label: String,
	pub color: &'static str,
}

#[derive(Clone, Copy, Debug)]
pub struct Camera {
	pub x: f64,
	pub y: f64,
	pub k: f64,
}

#[derive(Clone, Copy, Debug, Default)]
enum Gesture {
	#[default]
	Idle,
	Panning {
		start: (f64, f64),
		origin: (f64, f64),
		moved: bool,
	},
	Dragging {
		node: DefaultNodeIdx,
		start: (f64, f64),
		origin: (f32, f32),
		moved: bool,
	},
}

/// Simulation plus view state for one rendered snapshot.
pub struct CanvasState {
	pub graph: ForceGraph<NodeInfo, ()>,
	pub camera: Camera,
	pub hovered: Option<DefaultNodeIdx>,
	pub selected: Option<DefaultNodeIdx>,
	pub width: f64,
	pub height: f64,
	gesture: Gesture,
	neighbors: HashMap<DefaultNodeIdx, HashSet<DefaultNodeIdx>>,
	edge_labels: HashMap<(DefaultNodeIdx, DefaultNodeIdx), String>,
}

fn shorten(label: &str) -> String {
	if label.chars().count() <= MAX_LABEL_CHARS {
		return label.to_string();
	}
	let head: String = label.chars().take(MAX_LABEL_CHARS - 3).collect();
	format!("{head}...")
}

impl CanvasState {
	pub fn new(snapshot: &GraphSnapshot, width: f64, height: f64) -> Self {
		let mut graph = ForceGraph::new(SimulationParameters {
			force_charge: 150.0,
			force_spring: 0.05,
			force_max: 100.0,
			node_speed: 3000.0,
			damping_factor: 0.9,
		});
		let groups = snapshot.groups();
		let mut by_id = HashMap::new();

		let count = snapshot.nodes.len().max(1) as f64;
		for (i, node) in snapshot.nodes.iter().enumerate() {
			let color = node
				.group
				.as_deref()
				.and_then(|group| groups.iter().position(|g| *g == group))
				.map_or(PALETTE[0], |index| PALETTE[index % PALETTE.len()]);
			// Seed on a circle around the origin; the camera starts centered on it.
			let angle = i as f64 * 2.0 * PI / count;
			let idx = graph.add_node(NodeData {
				x: (120.0 * angle.cos()) as f32,
				y: (120.0 * angle.sin()) as f32,
				mass: 10.0,
				is_anchor: false,
				user_data: NodeInfo {
					id: node.id.clone(),
					label: shorten(&node.label),
					color,
				},
			});
			by_id.insert(node.id.as_str(), idx);
		}

		let mut neighbors: HashMap<DefaultNodeIdx, HashSet<DefaultNodeIdx>> = HashMap::new();
		let mut edge_labels = HashMap::new();
		for edge in &snapshot.edges {
			let (Some(&source), Some(&target)) =
				(by_id.get(edge.source.as_str()), by_id.get(edge.target.as_str()))
			else {
				continue;
			};
			if source != target {
				graph.add_edge(source, target, EdgeData::default());
			}
			neighbors.entry(source).or_default().insert(target);
			neighbors.entry(target).or_default().insert(source);
			edge_labels
				.entry((source, target))
				.and_modify(|label: &mut String| {
					label.push_str(", ");
					label.push_str(&edge.label);
				})
				.or_insert_with(|| edge.label.clone());
		}

		Self {
			graph,
			camera: Camera {
				x: width / 2.0,
				y: height / 2.0,
				k: 1.0,
			},
			hovered: None,
			selected: None,
			width,
			height,
			gesture: Gesture::Idle,
			neighbors,
			edge_labels,
		}
	}

	fn to_graph_space(&self, sx: f64, sy: f64) -> (f64, f64) {
		(
			(sx - self.camera.x) / self.camera.k,
			(sy - self.camera.y) / self.camera.k,
		)
	}

	pub fn node_at(&self, sx: f64, sy: f64) -> Option<DefaultNodeIdx> {
		let (gx, gy) = self.to_graph_space(sx, sy);
		let mut found = None;
		self.graph.visit_nodes(|node| {
			let (dx, dy) = (node.x() as f64 - gx, node.y() as f64 - gy);
			if dx * dx + dy * dy < HIT_RADIUS * HIT_RADIUS {
				found = Some(node.index());
			}
		});
		found
	}

	fn node_id(&self, idx: DefaultNodeIdx) -> Option<String> {
		let mut id = None;
		self.graph.visit_nodes(|node| {
			if node.index() == idx {
				id = Some(node.data.user_data.id.clone());
			}
		});
		id
	}

	pub fn edge_label(&self, source: DefaultNodeIdx, target: DefaultNodeIdx) -> Option<&str> {
		self.edge_labels.get(&(source, target)).map(String::as_str)
	}

	/// Hovered node or one of its neighbors.
	pub fn is_highlighted(&self, idx: DefaultNodeIdx) -> bool {
		match self.hovered {
			Some(hovered) if hovered == idx => true,
			Some(hovered) => self
				.neighbors
				.get(&hovered)
				.is_some_and(|around| around.contains(&idx)),
			None => false,
		}
	}

	pub fn tick(&mut self, dt: f32) {
		self.graph.update(dt);
	}

	pub fn press(&mut self, x: f64, y: f64) {
		self.gesture = match self.node_at(x, y) {
			Some(node) => {
				let mut origin = (0.0, 0.0);
				self.graph.visit_nodes(|n| {
					if n.index() == node {
						origin = (n.x(), n.y());
					}
				});
				Gesture::Dragging {
					node,
					start: (x, y),
					origin,
					moved: false,
				}
			}
			None => Gesture::Panning {
				start: (x, y),
				origin: (self.camera.x, self.camera.y),
				moved: false,
			},
		};
	}

	pub fn move_to(&mut self, x: f64, y: f64) {
		if matches!(self.gesture, Gesture::Idle) {
			self.hovered = self.node_at(x, y);
			return;
		}
		let k = self.camera.k;
		match &mut self.gesture {
			Gesture::Idle => {}
			Gesture::Panning {
				start,
				origin,
				moved,
			} => {
				*moved |= (x - start.0).hypot(y - start.1) > CLICK_SLOP;
				self.camera.x = origin.0 + (x - start.0);
				self.camera.y = origin.1 + (y - start.1);
			}
			Gesture::Dragging {
				node,
				start,
				origin,
				moved,
			} => {
				*moved |= (x - start.0).hypot(y - start.1) > CLICK_SLOP;
				let (nx, ny) = (
					origin.0 + ((x - start.0) / k) as f32,
					origin.1 + ((y - start.1) / k) as f32,
				);
				let node = *node;
				self.graph.visit_nodes_mut(|n| {
					if n.index() == node {
						n.data.x = nx;
						n.data.y = ny;
						n.data.is_anchor = true;
					}
				});
			}
		}
	}

	/// End the gesture. Returns the new selection when it was a click.
	pub fn release(&mut self) -> Option<Option<String>> {
		match std::mem::take(&mut self.gesture) {
			Gesture::Dragging {
				node, moved: false, ..
			} => {
				self.selected = Some(node);
				Some(self.node_id(node))
			}
			Gesture::Panning { moved: false, .. } => {
				self.selected = None;
				Some(None)
			}
			_ => None,
		}
	}

	pub fn leave(&mut self) {
		self.gesture = Gesture::Idle;
		self.hovered = None;
	}

	pub fn zoom_at(&mut self, x: f64, y: f64, delta_y: f64) {
		let factor = if delta_y > 0.0 { 0.9 } else { 1.1 };
		let k = (self.camera.k * factor).clamp(0.1, 10.0);
		let ratio = k / self.camera.k;
		self.camera.x = x - (x - self.camera.x) * ratio;
		self.camera.y = y - (y - self.camera.y) * ratio;
		self.camera.k = k;
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn long_labels_are_shortened() {
		assert_eq!(shorten("short"), "short");
		let long = "a".repeat(30);
		let short = shorten(&long);
		assert_eq!(short.chars().count(), MAX_LABEL_CHARS);
		assert!(short.ends_with("..."));
	}
}
