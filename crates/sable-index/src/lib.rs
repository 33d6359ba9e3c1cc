//! # sable-index
//!
//! B+tree secondary indexes for SableDB.
//!
//! The tree maps string keys to the list of tuple ids carrying that key.
//! Nodes are owned by an arena and reference each other by [`node::NodeId`],
//! which keeps the structure free of reference cycles and gives
//! deterministic drop order. Leaves chain forward in ascending key order
//! for range scans.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod node;
pub mod tree;

pub use tree::BPlusTree;
