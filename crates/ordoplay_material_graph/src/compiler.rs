// SPDX-License-Identifier: MIT OR Apache-2.0
//! Material compilation: one expression per channel, plus diagnostics.

use crate::expr::{Expr, ExprRef};
use crate::graph::GraphSnapshot;
use crate::node::OutputNodeType;
use crate::port::{Literal, PortKey, SocketType};
use crate::resolver::{resolve_edge, ResolutionContext, ResolveError, BASE_COLOR_DEFAULT};
use serde::{Deserialize, Serialize};

/// Emissive color used when no emissive output exists, `#0d0f13`
pub const EMISSIVE_DEFAULT: [f32; 3] = [13.0 / 255.0, 15.0 / 255.0, 19.0 / 255.0];

/// Diagnostic reported when the whole pass is discarded
pub const COMPILE_FAILURE_MESSAGE: &str = "Failed to compile material graph";

/// Which faces a material renders
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Side {
    /// Front faces only
    Front,
    /// Back faces only
    Back,
    /// Both faces
    #[default]
    Double,
}

/// Fixed neutral material shown while the graph cannot compile
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FallbackMaterial {
    /// Albedo
    pub color: [f32; 3],
    /// Roughness
    pub roughness: f32,
    /// Metalness
    pub metalness: f32,
    /// Rendered faces
    pub side: Side,
}

impl Default for FallbackMaterial {
    fn default() -> Self {
        Self {
            color: BASE_COLOR_DEFAULT,
            roughness: 0.6,
            metalness: 0.1,
            side: Side::Double,
        }
    }
}

/// Fallback values for channels whose output node is missing or unconnected
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MaterialDefaults {
    /// Base color fallback
    pub base_color: [f32; 3],
    /// Emissive fallback
    pub emissive: [f32; 3],
    /// Roughness fallback
    pub roughness: f32,
    /// Metalness fallback
    pub metalness: f32,
    /// Normal fallback
    pub normal: [f32; 3],
    /// Opacity fallback
    pub opacity: f32,
    /// Material used when compilation fails outright
    pub fallback_material: FallbackMaterial,
}

impl Default for MaterialDefaults {
    fn default() -> Self {
        Self {
            base_color: BASE_COLOR_DEFAULT,
            emissive: EMISSIVE_DEFAULT,
            roughness: 0.55,
            metalness: 0.08,
            normal: [0.0, 0.0, 1.0],
            opacity: 1.0,
            fallback_material: FallbackMaterial::default(),
        }
    }
}

impl MaterialDefaults {
    /// Parse defaults from RON; omitted fields keep their default
    pub fn from_ron(source: &str) -> Result<Self, ron::error::SpannedError> {
        ron::from_str(source)
    }

    /// Fallback literal for a channel
    pub fn fallback_for(&self, channel: OutputNodeType) -> Literal {
        match channel {
            OutputNodeType::BaseColor => Literal::Vec3(self.base_color),
            OutputNodeType::Emissive => Literal::Vec3(self.emissive),
            OutputNodeType::Roughness => Literal::Float(self.roughness),
            OutputNodeType::Metalness => Literal::Float(self.metalness),
            OutputNodeType::Normal => Literal::Vec3(self.normal),
            OutputNodeType::Opacity => Literal::Float(self.opacity),
        }
    }
}

/// Socket type of a material channel
pub fn channel_socket(channel: OutputNodeType) -> SocketType {
    match channel {
        OutputNodeType::BaseColor | OutputNodeType::Emissive => SocketType::Color,
        OutputNodeType::Normal => SocketType::Vec3,
        OutputNodeType::Roughness | OutputNodeType::Metalness | OutputNodeType::Opacity => SocketType::Float,
    }
}

/// Physically based material driven by expressions
#[derive(Debug, Clone, PartialEq)]
pub struct NodeMaterial {
    /// Albedo expression
    pub base_color: ExprRef,
    /// Emission expression
    pub emissive: ExprRef,
    /// Roughness expression
    pub roughness: ExprRef,
    /// Metalness expression
    pub metalness: ExprRef,
    /// Normal expression
    pub normal: ExprRef,
    /// Opacity expression
    pub opacity: ExprRef,
    /// Rendered faces
    pub side: Side,
    /// Whether the material is alpha blended
    pub transparent: bool,
}

impl NodeMaterial {
    /// Expression wired to a channel
    pub fn channel(&self, channel: OutputNodeType) -> &ExprRef {
        match channel {
            OutputNodeType::BaseColor => &self.base_color,
            OutputNodeType::Emissive => &self.emissive,
            OutputNodeType::Roughness => &self.roughness,
            OutputNodeType::Metalness => &self.metalness,
            OutputNodeType::Normal => &self.normal,
            OutputNodeType::Opacity => &self.opacity,
        }
    }
}

/// Material description handed to the renderer
#[derive(Debug, Clone, PartialEq)]
pub enum Material {
    /// Compiled node material
    Node(NodeMaterial),
    /// Neutral material used after a failed compile
    Fallback(FallbackMaterial),
}

impl Material {
    /// Get the node material, if compilation succeeded
    pub fn as_node(&self) -> Option<&NodeMaterial> {
        match self {
            Self::Node(material) => Some(material),
            Self::Fallback(_) => None,
        }
    }

    /// Check if this is the failure fallback
    pub fn is_fallback(&self) -> bool {
        matches!(self, Self::Fallback(_))
    }
}

/// Result of compiling a graph snapshot
#[derive(Debug, Clone, PartialEq)]
pub struct CompileResult {
    /// Compiled material
    pub material: Material,
    /// Advisory messages; empty on a clean compile
    pub diagnostics: Vec<String>,
}

impl CompileResult {
    /// Check if the compile produced no diagnostics
    pub fn is_clean(&self) -> bool {
        self.diagnostics.is_empty()
    }
}

/// Resolve the expression for one material channel.
///
/// A channel without an output node silently takes `fallback`. An output node
/// whose input is unresolved also takes `fallback` and records a diagnostic.
pub fn resolve_output_node(
    ctx: &mut ResolutionContext<'_>,
    channel: OutputNodeType,
    socket_type: SocketType,
    fallback: Literal,
) -> Result<ExprRef, ResolveError> {
    let Some(target) = ctx.nodes().find(|node| node.output_channel() == Some(channel)) else {
        return Ok(Expr::literal_for_socket(fallback, socket_type));
    };

    match resolve_edge(ctx, target.id.as_str(), PortKey::Input)? {
        Some(incoming) => Ok(incoming),
        None => {
            let name = if target.title.trim().is_empty() {
                channel.display_name()
            } else {
                target.title.as_str()
            };
            ctx.push_diagnostic(format!("Missing input for {name}"));
            Ok(Expr::literal_for_socket(fallback, socket_type))
        }
    }
}

/// Compile a snapshot with the default channel fallbacks
pub fn compile_material_graph(snapshot: &GraphSnapshot) -> CompileResult {
    compile_material_graph_with(snapshot, &MaterialDefaults::default())
}

/// Compile a snapshot.
///
/// Any [`ResolveError`] discards the whole pass and yields the fallback
/// material with a single diagnostic.
pub fn compile_material_graph_with(snapshot: &GraphSnapshot, defaults: &MaterialDefaults) -> CompileResult {
    match assemble(snapshot, defaults) {
        Ok((material, diagnostics)) => {
            tracing::info!(
                nodes = snapshot.nodes.len(),
                edges = snapshot.edges.len(),
                diagnostics = diagnostics.len(),
                "Compiled material graph"
            );
            CompileResult {
                material: Material::Node(material),
                diagnostics,
            }
        }
        Err(err) => {
            tracing::warn!("{COMPILE_FAILURE_MESSAGE}: {err}");
            CompileResult {
                material: Material::Fallback(defaults.fallback_material.clone()),
                diagnostics: vec![format!("{COMPILE_FAILURE_MESSAGE}: {err}")],
            }
        }
    }
}

fn assemble(
    snapshot: &GraphSnapshot,
    defaults: &MaterialDefaults,
) -> Result<(NodeMaterial, Vec<String>), ResolveError> {
    let mut ctx = ResolutionContext::new(snapshot);
    let mut channel = |channel: OutputNodeType| {
        let fallback = defaults.fallback_for(channel);
        if !fallback.is_finite() {
            return Err(ResolveError::NonFiniteDefault { channel });
        }
        resolve_output_node(&mut ctx, channel, channel_socket(channel), fallback)
    };

    let base_color = channel(OutputNodeType::BaseColor)?;
    let emissive = channel(OutputNodeType::Emissive)?;
    let roughness = channel(OutputNodeType::Roughness)?;
    let metalness = channel(OutputNodeType::Metalness)?;
    let opacity = channel(OutputNodeType::Opacity)?;
    let normal = channel(OutputNodeType::Normal)?;

    let material = NodeMaterial {
        base_color,
        emissive,
        roughness,
        metalness,
        normal,
        opacity,
        side: Side::Double,
        transparent: true,
    };
    Ok((material, ctx.into_diagnostics()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::Edge;
    use crate::expr::Op;
    use crate::node::{InputNodeType, MaterialNode, MathNodeType};
    use std::sync::Arc;

    fn edge(id: &str, source: &str, target: &str, target_handle: PortKey) -> Edge {
        Edge::new(id, source, PortKey::Out, target, target_handle)
    }

    fn code_graph(source: &str) -> GraphSnapshot {
        GraphSnapshot::new(
            vec![
                MaterialNode::input("primary", "Primary Color", InputNodeType::Color).with_color("#ff0000"),
                MaterialNode::code("code", "CodeNode", source, SocketType::Vec3),
                MaterialNode::output("output-base", "Base Color", OutputNodeType::BaseColor),
                MaterialNode::output("output-emissive", "Emissive", OutputNodeType::Emissive),
            ],
            vec![
                edge("edge-primary", "primary", "code", PortKey::Primary),
                edge("edge-base", "code", "output-base", PortKey::Input),
                edge("edge-emissive", "code", "output-emissive", PortKey::Input),
            ],
        )
    }

    #[test]
    fn test_code_node_feeds_two_channels() {
        let result = compile_material_graph(&code_graph("return vec3(1.0);"));
        assert!(result.is_clean(), "{:?}", result.diagnostics);

        let material = result.material.as_node().unwrap();
        assert!(Arc::ptr_eq(&material.base_color, &material.emissive));

        let Expr::Op { op: Op::Mix, args } = &*material.base_color else {
            panic!("expected mix");
        };
        assert_eq!(*args[0], Expr::Vec3([1.0, 0.0, 0.0]));
        let Expr::Call { function, .. } = &*args[2] else {
            panic!("expected code call");
        };
        assert!(function.body().contains("return vec3(1.0);"));
    }

    #[test]
    fn test_compile_is_deterministic() {
        let snapshot = code_graph("return primary;");
        assert_eq!(compile_material_graph(&snapshot), compile_material_graph(&snapshot));
    }

    #[test]
    fn test_unconnected_output_reports_and_falls_back() {
        let snapshot = GraphSnapshot::new(
            vec![MaterialNode::output("rough", "Surface Roughness", OutputNodeType::Roughness)],
            vec![],
        );
        let result = compile_material_graph(&snapshot);

        assert_eq!(result.diagnostics, ["Missing input for Surface Roughness"]);
        let material = result.material.as_node().unwrap();
        assert_eq!(*material.roughness, Expr::Float(0.55));
    }

    #[test]
    fn test_blank_title_uses_channel_name() {
        let snapshot = GraphSnapshot::new(
            vec![MaterialNode::output("n", "", OutputNodeType::Normal)],
            vec![],
        );
        let result = compile_material_graph(&snapshot);
        assert_eq!(result.diagnostics, ["Missing input for Normal"]);
    }

    #[test]
    fn test_missing_output_nodes_are_silent() {
        let result = compile_material_graph(&GraphSnapshot::default());
        assert!(result.is_clean());

        let material = result.material.as_node().unwrap();
        assert_eq!(*material.base_color, Expr::Vec3(BASE_COLOR_DEFAULT));
        assert_eq!(*material.emissive, Expr::Vec3(EMISSIVE_DEFAULT));
        assert_eq!(*material.metalness, Expr::Float(0.08));
        assert_eq!(*material.opacity, Expr::Float(1.0));
        assert_eq!(*material.normal, Expr::Vec3([0.0, 0.0, 1.0]));
        assert_eq!(material.side, Side::Double);
        assert!(material.transparent);
    }

    #[test]
    fn test_first_output_node_per_channel_wins() {
        let snapshot = GraphSnapshot::new(
            vec![
                MaterialNode::input("f", "F", InputNodeType::Float).with_value(Literal::Float(0.3)),
                MaterialNode::output("first", "First", OutputNodeType::Opacity),
                MaterialNode::output("second", "Second", OutputNodeType::Opacity),
            ],
            vec![edge("e1", "f", "second", PortKey::Input)],
        );
        let result = compile_material_graph(&snapshot);

        assert_eq!(result.diagnostics, ["Missing input for First"]);
        assert_eq!(*result.material.as_node().unwrap().opacity, Expr::Float(1.0));
    }

    #[test]
    fn test_scalar_fallback_splats_for_color_channels() {
        let defaults = MaterialDefaults::default();
        let snapshot = GraphSnapshot::new(
            vec![
                MaterialNode::input("t", "Time", InputNodeType::Time),
                MaterialNode::math("s", "Sine", MathNodeType::Sine),
                MaterialNode::output("e", "Emissive", OutputNodeType::Emissive),
            ],
            vec![
                edge("e1", "t", "s", PortKey::Input),
                edge("e2", "s", "e", PortKey::Input),
            ],
        );
        let result = compile_material_graph_with(&snapshot, &defaults);
        assert!(result.is_clean());
        let emissive = &result.material.as_node().unwrap().emissive;
        assert!(matches!(&**emissive, Expr::Op { op: Op::Sin, .. }));
    }

    #[test]
    fn test_invalid_code_yields_fallback_material() {
        let result = compile_material_graph(&code_graph("return vec3(1.0);\n}"));

        assert!(result.material.is_fallback());
        assert_eq!(result.diagnostics.len(), 1);
        assert!(result.diagnostics[0].starts_with(COMPILE_FAILURE_MESSAGE));
        assert_eq!(result.material, Material::Fallback(FallbackMaterial::default()));
    }

    #[test]
    fn test_cycle_yields_fallback_material() {
        let snapshot = GraphSnapshot::new(
            vec![
                MaterialNode::math("a", "A", MathNodeType::Abs),
                MaterialNode::math("b", "B", MathNodeType::Sine),
                MaterialNode::output("o", "Roughness", OutputNodeType::Roughness),
            ],
            vec![
                edge("e1", "a", "b", PortKey::Input),
                edge("e2", "b", "a", PortKey::Input),
                edge("e3", "a", "o", PortKey::Input),
            ],
        );
        let result = compile_material_graph(&snapshot);

        assert!(result.material.is_fallback());
        assert_eq!(result.diagnostics.len(), 1);
        assert!(result.diagnostics[0].contains("cyclic graph"));
    }

    #[test]
    fn test_non_finite_input_yields_fallback_material() {
        let source = r#"(
            nodes: [
                (id: "f", title: "Roughness Value", kind: Input(input_type: float, value: Some(Float(inf)))),
                (id: "o", title: "Roughness", kind: Output(output_type: roughness)),
            ],
            edges: [
                (id: "e1", source: "f", source_handle: out, target: "o", target_handle: input),
            ],
        )"#;
        let snapshot = GraphSnapshot::from_ron(source).unwrap();
        let result = compile_material_graph(&snapshot);

        assert!(result.material.is_fallback());
        assert_eq!(
            result.diagnostics,
            ["Failed to compile material graph: input f holds a non-finite value"]
        );

        let nan = GraphSnapshot::new(
            vec![
                MaterialNode::input("v", "Offset", InputNodeType::Vec3).with_value(Literal::Vec3([0.0, f32::NAN, 0.0])),
                MaterialNode::output("o", "Normal", OutputNodeType::Normal),
            ],
            vec![edge("e1", "v", "o", PortKey::Input)],
        );
        assert!(compile_material_graph(&nan).material.is_fallback());
    }

    #[test]
    fn test_non_finite_default_yields_fallback_material() {
        let defaults = MaterialDefaults {
            opacity: f32::INFINITY,
            ..MaterialDefaults::default()
        };
        let result = compile_material_graph_with(&GraphSnapshot::default(), &defaults);

        assert!(result.material.is_fallback());
        assert_eq!(
            result.diagnostics,
            ["Failed to compile material graph: non-finite default for Opacity"]
        );
    }

    #[test]
    fn test_defaults_from_ron() {
        let defaults = MaterialDefaults::from_ron("(roughness: 0.9, opacity: 0.5)").unwrap();
        assert_eq!(defaults.roughness, 0.9);
        assert_eq!(defaults.opacity, 0.5);
        assert_eq!(defaults.metalness, 0.08);

        let result = compile_material_graph_with(&GraphSnapshot::default(), &defaults);
        assert_eq!(*result.material.as_node().unwrap().roughness, Expr::Float(0.9));
    }
}
