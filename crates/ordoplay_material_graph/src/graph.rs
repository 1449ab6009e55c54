// SPDX-License-Identifier: MIT OR Apache-2.0
//! Editable material graph and the immutable snapshots taken from it.

use crate::connection::{Edge, EdgeId, EdgeIdGenerator};
use crate::node::{MaterialNode, NodeId, NodeKind};
use crate::port::PortKey;
use crate::schema::ports_for_node;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Immutable compile input: ordered nodes and ordered edges
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphSnapshot {
    /// Nodes, in editor order
    pub nodes: Vec<MaterialNode>,
    /// Edges, in creation order
    pub edges: Vec<Edge>,
}

impl GraphSnapshot {
    /// Create a snapshot from node and edge lists
    pub fn new(nodes: Vec<MaterialNode>, edges: Vec<Edge>) -> Self {
        Self { nodes, edges }
    }

    /// Parse a snapshot from RON
    pub fn from_ron(source: &str) -> Result<Self, ron::error::SpannedError> {
        ron::from_str(source)
    }

    /// Serialize the snapshot to pretty-printed RON
    pub fn to_ron(&self) -> Result<String, ron::Error> {
        ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())
    }
}

/// A material graph being edited
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Graph {
    /// Graph name
    pub name: String,
    /// Nodes in the graph
    nodes: IndexMap<NodeId, MaterialNode>,
    /// Edges between nodes
    edges: IndexMap<EdgeId, Edge>,
}

impl Graph {
    /// Create a new empty graph
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            nodes: IndexMap::new(),
            edges: IndexMap::new(),
        }
    }

    /// Add a node to the graph, replacing any node with the same ID
    pub fn add_node(&mut self, node: MaterialNode) -> NodeId {
        let id = node.id.clone();
        self.nodes.insert(id.clone(), node);
        id
    }

    /// Remove a node and its edges
    pub fn remove_node(&mut self, node_id: &NodeId) -> Option<MaterialNode> {
        self.edges.retain(|_, e| !e.involves_node(node_id));
        self.nodes.shift_remove(node_id)
    }

    /// Get a node by ID
    pub fn node(&self, node_id: &NodeId) -> Option<&MaterialNode> {
        self.nodes.get(node_id)
    }

    /// Get a mutable node by ID
    pub fn node_mut(&mut self, node_id: &NodeId) -> Option<&mut MaterialNode> {
        self.nodes.get_mut(node_id)
    }

    /// Replace the body of a code node.
    ///
    /// Returns `false` if the node does not exist or is not a code node.
    pub fn update_code(&mut self, node_id: &NodeId, code: impl Into<String>) -> bool {
        match self.node_mut(node_id).map(|node| &mut node.kind) {
            Some(NodeKind::Code { source, .. }) => {
                *source = code.into();
                true
            }
            _ => false,
        }
    }

    /// Get all nodes
    pub fn nodes(&self) -> impl Iterator<Item = &MaterialNode> {
        self.nodes.values()
    }

    /// Get the number of nodes
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Connect an output port to an input port.
    ///
    /// Missing handles default to `out` on the source and `input` on the target.
    pub fn connect(
        &mut self,
        ids: &mut dyn EdgeIdGenerator,
        source: &NodeId,
        source_handle: Option<PortKey>,
        target: &NodeId,
        target_handle: Option<PortKey>,
    ) -> Result<EdgeId, ConnectionError> {
        let source_handle = source_handle.unwrap_or(PortKey::Out);
        let target_handle = target_handle.unwrap_or(PortKey::Input);

        let source_node = self
            .nodes
            .get(source)
            .ok_or_else(|| ConnectionError::NodeNotFound(source.clone()))?;
        let target_node = self
            .nodes
            .get(target)
            .ok_or_else(|| ConnectionError::NodeNotFound(target.clone()))?;

        let source_port = *ports_for_node(source_node)
            .output(source_handle)
            .ok_or_else(|| ConnectionError::PortNotFound(source.clone(), source_handle))?;
        let target_port = *ports_for_node(target_node)
            .input(target_handle)
            .ok_or_else(|| ConnectionError::PortNotFound(target.clone(), target_handle))?;

        if !source_port.socket_type.can_connect_to(target_port.socket_type) {
            return Err(ConnectionError::IncompatiblePorts);
        }

        if source == target {
            return Err(ConnectionError::SelfLoop);
        }

        // Inputs take a single edge; the resolver would only ever read the first
        if self.edges.values().any(|e| e.feeds(target.as_str(), target_handle)) {
            return Err(ConnectionError::PortAlreadyConnected(target.clone(), target_handle));
        }

        let edge = Edge::new(ids.next_id(), source.clone(), source_handle, target.clone(), target_handle);
        let id = edge.id.clone();
        self.edges.insert(id.clone(), edge);
        Ok(id)
    }

    /// Remove an edge
    pub fn disconnect(&mut self, edge_id: &EdgeId) -> Option<Edge> {
        self.edges.shift_remove(edge_id)
    }

    /// Get all edges
    pub fn edges(&self) -> impl Iterator<Item = &Edge> {
        self.edges.values()
    }

    /// Get the number of edges
    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Take an immutable snapshot for compilation
    pub fn snapshot(&self) -> GraphSnapshot {
        GraphSnapshot {
            nodes: self.nodes.values().cloned().collect(),
            edges: self.edges.values().cloned().collect(),
        }
    }
}

impl Default for Graph {
    fn default() -> Self {
        Self::new("New Material")
    }
}

/// Error when creating an edge
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConnectionError {
    /// Node not found
    #[error("Node not found: {0}")]
    NodeNotFound(NodeId),

    /// Port not found
    #[error("Node {0} has no `{1}` port")]
    PortNotFound(NodeId, PortKey),

    /// Incompatible socket types
    #[error("Incompatible port types")]
    IncompatiblePorts,

    /// Input port is already connected
    #[error("Port already connected: {0}.{1}")]
    PortAlreadyConnected(NodeId, PortKey),

    /// Self-loop not allowed
    #[error("Self-loop not allowed")]
    SelfLoop,
}
