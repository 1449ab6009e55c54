// SPDX-License-Identifier: MIT OR Apache-2.0
//! Structural sanitization of material graphs.
//!
//! This pass does no expression resolution. It guarantees that a graph has at
//! least one input and one output node, drops edges that point at unknown
//! nodes, and produces a stable node order for downstream consumers.

use crate::graph::GraphSnapshot;
use crate::node::NodeCategory;
use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// ID of the output node inserted when a graph has none
pub const FALLBACK_OUTPUT_ID: &str = "output-fallback";
/// ID of the input node inserted when a graph has none
pub const FALLBACK_INPUT_ID: &str = "input-fallback";

const FALLBACK_OUTPUT_LABEL: &str = "Fallback Output";
const FALLBACK_INPUT_LABEL: &str = "Fallback Input";

/// Coarse role of a node in the outline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OutlineKind {
    /// Source of values
    Input,
    /// Transformation of values
    Operator,
    /// Sink of values
    Output,
}

impl OutlineKind {
    fn rank(self) -> u8 {
        match self {
            Self::Input => 0,
            Self::Operator => 1,
            Self::Output => 2,
        }
    }
}

impl From<NodeCategory> for OutlineKind {
    fn from(category: NodeCategory) -> Self {
        match category {
            NodeCategory::Input => Self::Input,
            NodeCategory::Math | NodeCategory::Code => Self::Operator,
            NodeCategory::Output => Self::Output,
        }
    }
}

/// A node as seen by the normalizer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutlineNode {
    /// Node ID
    pub id: String,
    /// Display label
    pub label: String,
    /// Role
    pub kind: OutlineKind,
    /// Numeric parameters, carried through untouched
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<IndexMap<String, f32>>,
}

impl OutlineNode {
    /// Create a node without parameters
    pub fn new(id: impl Into<String>, label: impl Into<String>, kind: OutlineKind) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            kind,
            params: None,
        }
    }
}

/// A directed connection between two outline nodes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutlineEdge {
    /// Source node ID
    pub from: String,
    /// Target node ID
    pub to: String,
}

impl OutlineEdge {
    /// Create an edge
    pub fn new(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
        }
    }
}

/// Structural view of a material graph
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphOutline {
    /// Nodes
    pub nodes: Vec<OutlineNode>,
    /// Edges
    pub edges: Vec<OutlineEdge>,
}

impl From<&GraphSnapshot> for GraphOutline {
    fn from(snapshot: &GraphSnapshot) -> Self {
        Self {
            nodes: snapshot
                .nodes
                .iter()
                .map(|node| OutlineNode::new(node.id.as_str(), node.display_label(), node.category().into()))
                .collect(),
            edges: snapshot
                .edges
                .iter()
                .map(|edge| OutlineEdge::new(edge.source.as_str(), edge.target.as_str()))
                .collect(),
        }
    }
}

/// Messages produced by the normalizer
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalizeDiagnostics {
    /// What was repaired, in order
    pub messages: Vec<String>,
    /// Whether any synthetic node was inserted
    pub used_fallbacks: bool,
}

/// Output of [`normalize_graph`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizeResult {
    /// Repaired graph
    pub graph: GraphOutline,
    /// Repair report
    pub diagnostics: NormalizeDiagnostics,
    /// Node IDs ordered by role, then label
    pub ordered_node_ids: Vec<String>,
}

/// Repair a graph so it is structurally well formed
pub fn normalize_graph(input: &GraphOutline) -> NormalizeResult {
    let mut diagnostics = NormalizeDiagnostics::default();

    let mut nodes: IndexMap<&str, OutlineNode> = IndexMap::with_capacity(input.nodes.len() + 2);
    for node in &input.nodes {
        nodes.insert(node.id.as_str(), node.clone());
    }

    let has_kind = |kind: OutlineKind| input.nodes.iter().any(|node| node.kind == kind);

    if !has_kind(OutlineKind::Output) {
        nodes.insert(
            FALLBACK_OUTPUT_ID,
            OutlineNode::new(FALLBACK_OUTPUT_ID, FALLBACK_OUTPUT_LABEL, OutlineKind::Output),
        );
        diagnostics.messages.push("Inserted fallback output node.".to_string());
        diagnostics.used_fallbacks = true;
    }

    if !has_kind(OutlineKind::Input) {
        nodes.insert(
            FALLBACK_INPUT_ID,
            OutlineNode::new(FALLBACK_INPUT_ID, FALLBACK_INPUT_LABEL, OutlineKind::Input),
        );
        diagnostics.messages.push("Inserted fallback input node.".to_string());
        diagnostics.used_fallbacks = true;
    }

    for message in &diagnostics.messages {
        tracing::debug!("{message}");
    }

    let valid_ids: IndexSet<&str> = nodes.keys().copied().collect();
    let edges: Vec<OutlineEdge> = input
        .edges
        .iter()
        .filter(|edge| valid_ids.contains(edge.from.as_str()) && valid_ids.contains(edge.to.as_str()))
        .cloned()
        .collect();

    let dropped = input.edges.len() - edges.len();
    if dropped > 0 {
        tracing::debug!(dropped, "Dropped dangling edges");
    }

    let nodes: Vec<OutlineNode> = nodes.into_values().collect();
    let mut ordered: Vec<&OutlineNode> = nodes.iter().collect();
    ordered.sort_by(|left, right| stable_order(left, right));
    let ordered_node_ids = ordered.into_iter().map(|node| node.id.clone()).collect();

    NormalizeResult {
        graph: GraphOutline { nodes, edges },
        diagnostics,
        ordered_node_ids,
    }
}

fn stable_order(left: &OutlineNode, right: &OutlineNode) -> Ordering {
    left.kind
        .rank()
        .cmp(&right.kind.rank())
        .then_with(|| left.label.cmp(&right.label))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::{InputNodeType, MaterialNode, MathNodeType, OutputNodeType};
    use crate::port::SocketType;

    #[test]
    fn test_inserts_fallbacks_and_orders_nodes() {
        let graph = GraphOutline {
            nodes: vec![OutlineNode::new("op-1", "Multiply", OutlineKind::Operator)],
            edges: vec![],
        };

        let result = normalize_graph(&graph);

        assert_eq!(result.ordered_node_ids, ["input-fallback", "op-1", "output-fallback"]);
        assert_eq!(
            result.diagnostics,
            NormalizeDiagnostics {
                messages: vec![
                    "Inserted fallback output node.".to_string(),
                    "Inserted fallback input node.".to_string(),
                ],
                used_fallbacks: true,
            }
        );
        assert_eq!(result.graph.nodes.len(), 3);
    }

    #[test]
    fn test_filters_dangling_edges() {
        let graph = GraphOutline {
            nodes: vec![
                OutlineNode::new("input-1", "Albedo", OutlineKind::Input),
                OutlineNode::new("op-1", "Combine", OutlineKind::Operator),
                OutlineNode::new("output-1", "Surface", OutlineKind::Output),
            ],
            edges: vec![
                OutlineEdge::new("input-1", "op-1"),
                OutlineEdge::new("ghost", "output-1"),
            ],
        };

        let result = normalize_graph(&graph);

        assert_eq!(result.graph.edges, [OutlineEdge::new("input-1", "op-1")]);
        assert!(!result.diagnostics.used_fallbacks);
    }

    #[test]
    fn test_well_formed_graph_is_unchanged() {
        let graph = GraphOutline {
            nodes: vec![
                OutlineNode::new("out", "Surface", OutlineKind::Output),
                OutlineNode::new("b", "Beta", OutlineKind::Operator),
                OutlineNode::new("in", "Albedo", OutlineKind::Input),
                OutlineNode::new("a", "Alpha", OutlineKind::Operator),
            ],
            edges: vec![
                OutlineEdge::new("in", "a"),
                OutlineEdge::new("a", "b"),
                OutlineEdge::new("b", "out"),
            ],
        };

        let result = normalize_graph(&graph);

        assert_eq!(result.graph, graph);
        assert!(result.diagnostics.messages.is_empty());
        assert!(!result.diagnostics.used_fallbacks);
        assert_eq!(result.ordered_node_ids, ["in", "a", "b", "out"]);

        let again = normalize_graph(&result.graph);
        assert_eq!(again, result);
    }

    #[test]
    fn test_edge_order_is_preserved() {
        let graph = GraphOutline {
            nodes: vec![
                OutlineNode::new("i", "In", OutlineKind::Input),
                OutlineNode::new("o", "Out", OutlineKind::Output),
            ],
            edges: vec![
                OutlineEdge::new("i", "o"),
                OutlineEdge::new("i", "ghost"),
                OutlineEdge::new("o", "i"),
                OutlineEdge::new("ghost", "ghost"),
            ],
        };

        let result = normalize_graph(&graph);
        assert_eq!(
            result.graph.edges,
            [OutlineEdge::new("i", "o"), OutlineEdge::new("o", "i")]
        );
    }

    #[test]
    fn test_edges_to_fallback_nodes_survive() {
        let graph = GraphOutline {
            nodes: vec![OutlineNode::new("i", "In", OutlineKind::Input)],
            edges: vec![OutlineEdge::new("i", FALLBACK_OUTPUT_ID)],
        };

        let result = normalize_graph(&graph);
        assert_eq!(result.graph.edges.len(), 1);
        assert_eq!(result.diagnostics.messages, ["Inserted fallback output node."]);
    }

    #[test]
    fn test_outline_from_snapshot() {
        let snapshot = GraphSnapshot::new(
            vec![
                MaterialNode::input("t", "Time", InputNodeType::Time),
                MaterialNode::math("s", "Sine", MathNodeType::Sine),
                MaterialNode::code("c", "Code", "return primary;", SocketType::Vec3),
                MaterialNode::output("o", "Emissive", OutputNodeType::Emissive),
            ],
            vec![],
        );

        let outline = GraphOutline::from(&snapshot);
        let kinds: Vec<_> = outline.nodes.iter().map(|n| n.kind).collect();
        assert_eq!(
            kinds,
            [
                OutlineKind::Input,
                OutlineKind::Operator,
                OutlineKind::Operator,
                OutlineKind::Output
            ]
        );

        let result = normalize_graph(&outline);
        assert_eq!(result.ordered_node_ids, ["t", "c", "s", "o"]);
    }

    #[test]
    fn test_outline_prefers_node_labels() {
        let snapshot = GraphSnapshot::new(
            vec![
                MaterialNode::math("m", "Multiply", MathNodeType::Multiply).with_label("Attenuate"),
                MaterialNode::math("a", "Add", MathNodeType::Add),
                MaterialNode::input("t", "Time", InputNodeType::Time),
            ],
            vec![],
        );

        let outline = GraphOutline::from(&snapshot);
        assert_eq!(outline.nodes[0].label, "Attenuate");
        assert_eq!(outline.nodes[1].label, "Add");

        let result = normalize_graph(&outline);
        assert_eq!(result.ordered_node_ids, ["t", "a", "m", "output-fallback"]);
    }
}
