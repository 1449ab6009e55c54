// SPDX-License-Identifier: MIT OR Apache-2.0
//! Edge definitions for the graph.

use crate::node::NodeId;
use crate::port::PortKey;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Unique identifier for an edge
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EdgeId(pub String);

impl EdgeId {
    /// Create an edge ID from any string-like value
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }
}

impl From<&str> for EdgeId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl fmt::Display for EdgeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A connection from a node output to a node input
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Edge {
    /// Unique edge ID
    pub id: EdgeId,
    /// Source node ID
    pub source: NodeId,
    /// Source port key
    pub source_handle: PortKey,
    /// Target node ID
    pub target: NodeId,
    /// Target port key
    pub target_handle: PortKey,
}

impl Edge {
    /// Create a new edge
    pub fn new(
        id: impl Into<EdgeId>,
        source: impl Into<NodeId>,
        source_handle: PortKey,
        target: impl Into<NodeId>,
        target_handle: PortKey,
    ) -> Self {
        Self {
            id: id.into(),
            source: source.into(),
            source_handle,
            target: target.into(),
            target_handle,
        }
    }

    /// Check if this edge involves a specific node
    pub fn involves_node(&self, node_id: &NodeId) -> bool {
        self.source == *node_id || self.target == *node_id
    }

    /// Check if this edge feeds the given input port
    pub fn feeds(&self, node_id: &str, port: PortKey) -> bool {
        self.target.as_str() == node_id && self.target_handle == port
    }
}

/// Source of fresh edge IDs, owned by whoever builds graphs
pub trait EdgeIdGenerator {
    /// Produce the next unused edge ID
    fn next_id(&mut self) -> EdgeId;
}

/// Deterministic `edge-1`, `edge-2`, ... sequence
#[derive(Debug, Clone, Default)]
pub struct SequentialEdgeIds {
    issued: u64,
}

impl SequentialEdgeIds {
    /// Create a sequence starting at `edge-1`
    pub fn new() -> Self {
        Self::default()
    }
}

impl EdgeIdGenerator for SequentialEdgeIds {
    fn next_id(&mut self) -> EdgeId {
        self.issued += 1;
        EdgeId(format!("edge-{}", self.issued))
    }
}

/// Random IDs for interactively created edges
#[derive(Debug, Clone, Copy, Default)]
pub struct UuidEdgeIds;

impl EdgeIdGenerator for UuidEdgeIds {
    fn next_id(&mut self) -> EdgeId {
        EdgeId(format!("edge-{}", Uuid::new_v4()))
    }
}
