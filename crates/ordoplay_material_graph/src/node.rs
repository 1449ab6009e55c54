// SPDX-License-Identifier: MIT OR Apache-2.0
//! Node definitions for the material graph.

use crate::port::{Literal, SocketType};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Unique identifier for a node
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(pub String);

impl NodeId {
    /// Create a node ID from any string-like value
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow the ID as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for NodeId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for NodeId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Node category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodeCategory {
    /// Input nodes (constants, shading attributes)
    Input,
    /// Math operations
    Math,
    /// Material channel outputs
    Output,
    /// Inline user-authored shader code
    Code,
}

/// Input node variants
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum InputNodeType {
    /// Constant scalar
    Float,
    /// Constant 2D vector
    Vec2,
    /// Constant 3D vector
    Vec3,
    /// Constant color.
    ///
    /// Only `#rrggbb` and `#rgb` strings are read. Anything else, including
    /// CSS color names and `rgb()` notation, resolves to the base color
    /// default with a logged warning.
    Color,
    /// Elapsed time in seconds
    Time,
    /// Mesh texture coordinates
    Uv,
    /// World-space surface normal
    NormalWorld,
    /// World-space surface position
    PositionWorld,
    /// Normalized direction from the surface towards the camera
    ViewDirection,
}

/// Math node variants
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MathNodeType {
    /// Componentwise sum
    Add,
    /// Product
    Multiply,
    /// Linear interpolation
    Lerp,
    /// Clamp between bounds
    Clamp,
    /// Power
    Pow,
    /// Hermite interpolation between two edges
    Smoothstep,
    /// Sine of an angle in radians
    Sine,
    /// Absolute value
    Abs,
}

/// Material channel terminated by an output node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum OutputNodeType {
    /// Albedo
    BaseColor,
    /// Emitted light
    Emissive,
    /// Microfacet roughness
    Roughness,
    /// Metallic factor
    Metalness,
    /// Surface normal
    Normal,
    /// Opacity / alpha
    Opacity,
}

impl OutputNodeType {
    /// All channels, in material declaration order
    pub const ALL: [OutputNodeType; 6] = [
        Self::BaseColor,
        Self::Emissive,
        Self::Roughness,
        Self::Metalness,
        Self::Normal,
        Self::Opacity,
    ];

    /// Human-readable channel name
    pub fn display_name(self) -> &'static str {
        match self {
            Self::BaseColor => "Base Color",
            Self::Emissive => "Emissive",
            Self::Roughness => "Roughness",
            Self::Metalness => "Metalness",
            Self::Normal => "Normal",
            Self::Opacity => "Opacity",
        }
    }
}

/// Category-specific node data
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum NodeKind {
    /// Constant or shading attribute
    Input {
        /// Input variant
        input_type: InputNodeType,
        /// Literal value for constant inputs
        #[serde(default, skip_serializing_if = "Option::is_none")]
        value: Option<Literal>,
        /// Hex color string for color inputs
        #[serde(default, skip_serializing_if = "Option::is_none")]
        color: Option<String>,
    },
    /// Operator with a fixed port set
    Math {
        /// Operator variant
        math_type: MathNodeType,
    },
    /// Material channel output
    Output {
        /// Channel this node terminates
        output_type: OutputNodeType,
    },
    /// User shader code steering a blend between two inputs
    Code {
        /// Function body spliced into the shading template
        source: String,
        /// Declared output socket
        output_type: SocketType,
    },
}

/// A node instance in the graph
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaterialNode {
    /// Unique instance ID
    pub id: NodeId,
    /// Display title
    pub title: String,
    /// Optional short label
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    /// Position in the graph UI
    #[serde(default)]
    pub position: [f32; 2],
    /// Category-specific data
    pub kind: NodeKind,
}

impl MaterialNode {
    fn with_kind(id: impl Into<NodeId>, title: impl Into<String>, kind: NodeKind) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            label: None,
            position: [0.0, 0.0],
            kind,
        }
    }

    /// Create an input node
    pub fn input(id: impl Into<NodeId>, title: impl Into<String>, input_type: InputNodeType) -> Self {
        Self::with_kind(
            id,
            title,
            NodeKind::Input {
                input_type,
                value: None,
                color: None,
            },
        )
    }

    /// Create a math node
    pub fn math(id: impl Into<NodeId>, title: impl Into<String>, math_type: MathNodeType) -> Self {
        Self::with_kind(id, title, NodeKind::Math { math_type })
    }

    /// Create an output node
    pub fn output(id: impl Into<NodeId>, title: impl Into<String>, output_type: OutputNodeType) -> Self {
        Self::with_kind(id, title, NodeKind::Output { output_type })
    }

    /// Create a code node
    pub fn code(
        id: impl Into<NodeId>,
        title: impl Into<String>,
        source: impl Into<String>,
        output_type: SocketType,
    ) -> Self {
        Self::with_kind(
            id,
            title,
            NodeKind::Code {
                source: source.into(),
                output_type,
            },
        )
    }

    /// Set the literal value (input nodes only)
    pub fn with_value(mut self, literal: Literal) -> Self {
        if let NodeKind::Input { value, .. } = &mut self.kind {
            *value = Some(literal);
        }
        self
    }

    /// Set the hex color (input nodes only)
    pub fn with_color(mut self, hex: impl Into<String>) -> Self {
        if let NodeKind::Input { color, .. } = &mut self.kind {
            *color = Some(hex.into());
        }
        self
    }

    /// Set the label
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Set the position
    pub fn with_position(mut self, x: f32, y: f32) -> Self {
        self.position = [x, y];
        self
    }

    /// Label if set, title otherwise
    pub fn display_label(&self) -> &str {
        self.label.as_deref().unwrap_or(&self.title)
    }

    /// Get the node category
    pub fn category(&self) -> NodeCategory {
        match self.kind {
            NodeKind::Input { .. } => NodeCategory::Input,
            NodeKind::Math { .. } => NodeCategory::Math,
            NodeKind::Output { .. } => NodeCategory::Output,
            NodeKind::Code { .. } => NodeCategory::Code,
        }
    }

    /// Channel terminated by this node, if it is an output
    pub fn output_channel(&self) -> Option<OutputNodeType> {
        match self.kind {
            NodeKind::Output { output_type } => Some(output_type),
            _ => None,
        }
    }
}
