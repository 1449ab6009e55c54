// SPDX-License-Identifier: MIT OR Apache-2.0
//! Material graph compiler for `OrdoPlay` Editor.
//!
//! This crate turns an editable node graph into a renderable material:
//! - Typed sockets and per-node port schema
//! - Connection validation for editing
//! - Memoized expression resolution with cycle detection
//! - Material assembly with per-channel fallbacks
//! - Structural normalization for outline views
//! - WGSL generation
//!
//! ## Architecture
//!
//! A [`Graph`] is edited in place and compiled from an immutable
//! [`GraphSnapshot`]. Compilation never fails: problems are reported as
//! diagnostics next to the best material that could be built.

pub mod port;
pub mod node;
pub mod connection;
pub mod graph;
pub mod schema;
pub mod expr;
pub mod resolver;
pub mod compiler;
pub mod normalize;
pub mod wgsl;
pub mod template;
pub mod session;

pub use compiler::{
    compile_material_graph, compile_material_graph_with, CompileResult, FallbackMaterial, Material,
    MaterialDefaults, NodeMaterial,
};
pub use connection::{Edge, EdgeId, EdgeIdGenerator, SequentialEdgeIds, UuidEdgeIds};
pub use expr::{Expr, ExprRef};
pub use graph::{ConnectionError, Graph, GraphSnapshot};
pub use node::{MaterialNode, NodeId, NodeKind};
pub use normalize::{normalize_graph, GraphOutline, NormalizeResult};
pub use port::{PortKey, SocketType};
pub use session::{CompiledMaterialSlot, MaterialDisposer, MaterialSession};
pub use template::create_initial_graph;
pub use wgsl::emit_material;
