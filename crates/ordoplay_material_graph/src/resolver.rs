// SPDX-License-Identifier: MIT OR Apache-2.0
//! Resolution of node outputs into shader expressions.
//!
//! Resolution is a depth-first walk from whatever port is requested back
//! through the edges feeding it. Every resolved `(node, port)` pair is cached
//! for the lifetime of a [`ResolutionContext`], so a node feeding several
//! consumers yields one shared expression.

use crate::connection::Edge;
use crate::expr::{Builtin, CodeFunction, Expr, ExprError, ExprRef, Op};
use crate::graph::GraphSnapshot;
use crate::node::{InputNodeType, MaterialNode, MathNodeType, NodeId, NodeKind, OutputNodeType};
use crate::port::{parse_hex_color, Literal, PortKey, SocketType};
use crate::schema::{default_value_for_socket, math_ports};
use indexmap::IndexMap;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

/// Color used by color inputs with no (or an unreadable) color string, `#c7cad4`
pub const BASE_COLOR_DEFAULT: [f32; 3] = [199.0 / 255.0, 202.0 / 255.0, 212.0 / 255.0];

/// Primary operand of a code node with nothing connected
pub const CODE_PRIMARY_DEFAULT: [f32; 3] = [1.0, 0.8, 0.6];

/// Secondary operand of a code node with nothing connected
pub const CODE_SECONDARY_DEFAULT: [f32; 3] = [0.4, 0.5, 0.8];

type CacheKey<'a> = (&'a str, PortKey);

/// Per-compile memoization cache and lookup tables
#[derive(Debug)]
pub struct ResolutionContext<'a> {
    /// Nodes by ID, in snapshot order
    nodes: IndexMap<&'a str, &'a MaterialNode>,
    /// All edges, in snapshot order
    edges: &'a [Edge],
    /// Resolved ports, including ports that resolved to nothing
    cache: HashMap<CacheKey<'a>, Option<ExprRef>>,
    /// Ports currently being resolved further up the stack
    in_progress: HashSet<CacheKey<'a>>,
    /// Accumulated advisory messages
    diagnostics: Vec<String>,
}

impl<'a> ResolutionContext<'a> {
    /// Create a fresh context over a snapshot
    pub fn new(snapshot: &'a GraphSnapshot) -> Self {
        let mut nodes = IndexMap::with_capacity(snapshot.nodes.len());
        for node in &snapshot.nodes {
            // Duplicate IDs keep their first position but the last definition
            nodes.insert(node.id.as_str(), node);
        }

        Self {
            nodes,
            edges: &snapshot.edges,
            cache: HashMap::new(),
            in_progress: HashSet::new(),
            diagnostics: Vec::new(),
        }
    }

    /// Get a node by ID
    pub fn node(&self, node_id: &str) -> Option<&'a MaterialNode> {
        self.nodes.get(node_id).copied()
    }

    /// Get all nodes, in snapshot order
    pub fn nodes(&self) -> impl Iterator<Item = &'a MaterialNode> + '_ {
        self.nodes.values().copied()
    }

    /// First edge feeding the given input port
    pub fn incoming_edge(&self, node_id: &str, port: PortKey) -> Option<&'a Edge> {
        let edges = self.edges;
        edges.iter().find(|edge| edge.feeds(node_id, port))
    }

    /// Cached result for a port, if it was already resolved
    pub fn cached(&self, node_id: &'a str, port: PortKey) -> Option<&Option<ExprRef>> {
        self.cache.get(&(node_id, port))
    }

    /// Append an advisory message
    pub fn push_diagnostic(&mut self, message: impl Into<String>) {
        let message = message.into();
        tracing::warn!("{message}");
        self.diagnostics.push(message);
    }

    /// Messages accumulated so far
    pub fn diagnostics(&self) -> &[String] {
        &self.diagnostics
    }

    /// Consume the context, keeping its messages
    pub fn into_diagnostics(self) -> Vec<String> {
        self.diagnostics
    }
}

/// Error that aborts a compile pass
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ResolveError {
    /// A node output depends on itself
    #[error("cyclic graph: {node}.{port} depends on itself")]
    Cycle {
        /// Node at which the cycle was detected
        node: NodeId,
        /// Port at which the cycle was detected
        port: PortKey,
    },

    /// An input node stores an infinite or NaN value
    #[error("input {node} holds a non-finite value")]
    NonFiniteLiteral {
        /// Offending input node
        node: NodeId,
    },

    /// A channel fallback is infinite or NaN
    #[error("non-finite default for {}", .channel.display_name())]
    NonFiniteDefault {
        /// Channel whose fallback is unusable
        channel: OutputNodeType,
    },

    /// An expression could not be constructed
    #[error(transparent)]
    Expr(#[from] ExprError),
}

/// Resolve whatever feeds an input port.
///
/// When several edges target the same port, the first one in snapshot order
/// wins. Returns `None` if nothing is connected or the source is missing.
pub fn resolve_edge<'a>(
    ctx: &mut ResolutionContext<'a>,
    node_id: &str,
    port: PortKey,
) -> Result<Option<ExprRef>, ResolveError> {
    let Some(edge) = ctx.incoming_edge(node_id, port) else {
        return Ok(None);
    };
    resolve_node_output(ctx, edge.source.as_str(), edge.source_handle)
}

/// Resolve one output port of a node into an expression
pub fn resolve_node_output<'a>(
    ctx: &mut ResolutionContext<'a>,
    node_id: &'a str,
    port: PortKey,
) -> Result<Option<ExprRef>, ResolveError> {
    let key = (node_id, port);
    if let Some(cached) = ctx.cache.get(&key) {
        tracing::trace!(node = node_id, %port, "resolution cache hit");
        return Ok(cached.clone());
    }

    let Some(node) = ctx.node(node_id) else {
        tracing::debug!(node = node_id, "edge source does not exist");
        return Ok(None);
    };

    if !ctx.in_progress.insert(key) {
        return Err(ResolveError::Cycle {
            node: node.id.clone(),
            port,
        });
    }

    tracing::debug!(node = node_id, %port, "resolving node output");
    let result = match &node.kind {
        NodeKind::Input {
            input_type,
            value,
            color,
        } => resolve_input_node(node, *input_type, *value, color.as_deref(), port),
        NodeKind::Math { math_type } => resolve_math_node(ctx, node, *math_type, port),
        NodeKind::Code { source, .. } => resolve_code_node(ctx, node, source, port),
        NodeKind::Output { .. } => Ok(None),
    };
    ctx.in_progress.remove(&key);

    let result = result?;
    ctx.cache.insert(key, result.clone());
    Ok(result)
}

fn resolve_input_node(
    node: &MaterialNode,
    input_type: InputNodeType,
    value: Option<Literal>,
    color: Option<&str>,
    port: PortKey,
) -> Result<Option<ExprRef>, ResolveError> {
    if port != PortKey::Out {
        return Ok(None);
    }
    if value.is_some_and(|literal| !literal.is_finite()) {
        return Err(ResolveError::NonFiniteLiteral { node: node.id.clone() });
    }

    let expr = match input_type {
        InputNodeType::Float => match value {
            Some(Literal::Float(v)) => Expr::float(v),
            _ => Expr::float(1.0),
        },
        InputNodeType::Vec2 => match value {
            Some(Literal::Vec2([x, y])) => Expr::vec2(x, y),
            _ => Expr::vec2(0.0, 0.0),
        },
        InputNodeType::Vec3 => match value {
            Some(Literal::Vec3([x, y, z])) => Expr::vec3(x, y, z),
            _ => Expr::vec3(0.5, 0.5, 0.5),
        },
        InputNodeType::Color => {
            let parsed = color.and_then(|hex| {
                let rgb = parse_hex_color(hex);
                if rgb.is_none() {
                    tracing::warn!("Unreadable color {hex:?}, using the base color default");
                }
                rgb
            });
            let [r, g, b] = parsed.unwrap_or(BASE_COLOR_DEFAULT);
            Expr::vec3(r, g, b)
        }
        InputNodeType::Time => Expr::builtin(Builtin::Time),
        InputNodeType::Uv => Expr::builtin(Builtin::Uv),
        InputNodeType::NormalWorld => Expr::builtin(Builtin::NormalWorld),
        InputNodeType::PositionWorld => Expr::builtin(Builtin::PositionWorld),
        InputNodeType::ViewDirection => {
            let towards_camera = Expr::apply(
                Op::Sub,
                [
                    Expr::builtin(Builtin::CameraPosition),
                    Expr::builtin(Builtin::PositionWorld),
                ],
            );
            Expr::apply(Op::Normalize, [towards_camera])
        }
    };
    Ok(Some(expr))
}

/// Resolved operands of a math node, keyed by port
struct MathInputs(IndexMap<PortKey, ExprRef>);

impl MathInputs {
    fn get(&self, key: PortKey, socket_type: SocketType) -> ExprRef {
        self.0
            .get(&key)
            .cloned()
            .unwrap_or_else(|| default_literal(socket_type))
    }
}

fn default_literal(socket_type: SocketType) -> ExprRef {
    Expr::literal_for_socket(default_value_for_socket(socket_type), socket_type)
}

fn resolve_math_node<'a>(
    ctx: &mut ResolutionContext<'a>,
    node: &'a MaterialNode,
    math_type: MathNodeType,
    port: PortKey,
) -> Result<Option<ExprRef>, ResolveError> {
    if port != PortKey::Out {
        return Ok(None);
    }

    let (ports, _) = math_ports(math_type);
    let mut resolved = IndexMap::with_capacity(ports.len());
    for def in &ports {
        let value = resolve_edge(ctx, node.id.as_str(), def.key)?
            .unwrap_or_else(|| default_literal(def.socket_type));
        resolved.insert(def.key, value);
    }
    let inputs = MathInputs(resolved);

    use PortKey::{Factor, Input, Max, Min, Primary, Secondary};
    use SocketType::{Float, Vec3};

    let expr = match math_type {
        MathNodeType::Add => Expr::apply(Op::Add, [inputs.get(Primary, Vec3), inputs.get(Secondary, Vec3)]),
        MathNodeType::Multiply => {
            Expr::apply(Op::Mul, [inputs.get(Primary, Float), inputs.get(Secondary, Float)])
        }
        MathNodeType::Lerp => Expr::apply(
            Op::Mix,
            [
                inputs.get(Primary, Vec3),
                inputs.get(Secondary, Vec3),
                inputs.get(Factor, Float),
            ],
        ),
        MathNodeType::Clamp => Expr::apply(
            Op::Clamp,
            [inputs.get(Input, Float), inputs.get(Min, Float), inputs.get(Max, Float)],
        ),
        MathNodeType::Pow => Expr::apply(Op::Pow, [inputs.get(Primary, Float), inputs.get(Secondary, Float)]),
        MathNodeType::Smoothstep => Expr::apply(
            Op::Smoothstep,
            [inputs.get(Min, Float), inputs.get(Max, Float), inputs.get(Input, Float)],
        ),
        MathNodeType::Sine => Expr::apply(Op::Sin, [inputs.get(Input, Float)]),
        MathNodeType::Abs => Expr::apply(Op::Abs, [inputs.get(Input, Float)]),
    };
    Ok(Some(expr))
}

fn resolve_code_node<'a>(
    ctx: &mut ResolutionContext<'a>,
    node: &'a MaterialNode,
    source: &str,
    port: PortKey,
) -> Result<Option<ExprRef>, ResolveError> {
    if port != PortKey::Out {
        return Ok(None);
    }

    let [r, g, b] = CODE_PRIMARY_DEFAULT;
    let primary = resolve_edge(ctx, node.id.as_str(), PortKey::Primary)?.unwrap_or_else(|| Expr::vec3(r, g, b));
    let [r, g, b] = CODE_SECONDARY_DEFAULT;
    let secondary =
        resolve_edge(ctx, node.id.as_str(), PortKey::Secondary)?.unwrap_or_else(|| Expr::vec3(r, g, b));

    let function = CodeFunction::new(CodeFunction::name_for_node(node.id.as_str()), source)?;
    let factor = Expr::call(
        Arc::new(function),
        primary.clone(),
        secondary.clone(),
        Expr::builtin(Builtin::Uv),
    );

    // User code only steers the blend; it never replaces the operands' types
    Ok(Some(Expr::apply(Op::Mix, [primary, secondary, factor])))
}
