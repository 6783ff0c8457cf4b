pub mod force_graph;
pub mod frame_item;
