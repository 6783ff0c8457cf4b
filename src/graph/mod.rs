//! Incremental assembly of query results into a node/edge graph.

mod assembler;
mod label;
mod types;

pub use assembler::GraphAssembler;
pub use label::LabelMatcher;
pub use types::{Attributes, CurrentGraph, Edge, GraphSnapshot, Node};
