// SPDX-License-Identifier: MIT OR Apache-2.0
//! Port definitions for node inputs/outputs.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Data type that can flow through a material socket
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SocketType {
    /// Scalar value
    Float,
    /// 2D vector
    Vec2,
    /// 3D vector
    Vec3,
    /// RGB color (three components, like `Vec3`)
    Color,
}

impl SocketType {
    /// Get the color for this socket type (for UI)
    pub fn color(self) -> [u8; 3] {
        match self {
            Self::Float => [80, 200, 80],
            Self::Vec2 => [200, 200, 80],
            Self::Vec3 => [200, 150, 80],
            Self::Color => [255, 200, 100],
        }
    }

    /// Check if a value of this type can feed a socket of another type
    pub fn can_connect_to(self, other: SocketType) -> bool {
        if self == other {
            return true;
        }

        match (self, other) {
            // Scalars broadcast into any vector
            (Self::Float, _) => true,
            // Colors are plain three-component vectors
            (Self::Vec3, Self::Color) | (Self::Color, Self::Vec3) => true,
            _ => false,
        }
    }
}

/// Symbolic key of a port on a node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PortKey {
    /// First operand / primary color
    Primary,
    /// Second operand / secondary color
    Secondary,
    /// Interpolation factor
    Factor,
    /// Lower bound or first edge
    Min,
    /// Upper bound or second edge
    Max,
    /// Single value input
    Input,
    /// Texture coordinate input
    Uv,
    /// Direction input
    Direction,
    /// The node's output
    Out,
}

impl PortKey {
    /// The key as written in graph files and diagnostics
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Primary => "primary",
            Self::Secondary => "secondary",
            Self::Factor => "factor",
            Self::Min => "min",
            Self::Max => "max",
            Self::Input => "input",
            Self::Uv => "uv",
            Self::Direction => "direction",
            Self::Out => "out",
        }
    }
}

impl fmt::Display for PortKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Static description of one port exposed by a node variant
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PortDefinition {
    /// Port key used by edges
    pub key: PortKey,
    /// Display label
    pub label: &'static str,
    /// Socket type
    pub socket_type: SocketType,
}

impl PortDefinition {
    /// Create a new port definition
    pub const fn new(key: PortKey, label: &'static str, socket_type: SocketType) -> Self {
        Self {
            key,
            label,
            socket_type,
        }
    }
}

/// Literal value that can be stored on a node or substituted for a port
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Literal {
    /// Scalar
    Float(f32),
    /// 2D vector
    Vec2([f32; 2]),
    /// 3D vector
    Vec3([f32; 3]),
}

impl Literal {
    /// Whether every component is neither infinite nor NaN
    pub fn is_finite(&self) -> bool {
        match self {
            Self::Float(v) => v.is_finite(),
            Self::Vec2(v) => v.iter().all(|c| c.is_finite()),
            Self::Vec3(v) => v.iter().all(|c| c.is_finite()),
        }
    }
}

/// Parse a CSS-style hex color (`#rrggbb` or `#rgb`) into normalized RGB.
pub fn parse_hex_color(value: &str) -> Option<[f32; 3]> {
    let hex = value.trim().strip_prefix('#')?;
    if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }

    let channel = |digits: &str| u8::from_str_radix(digits, 16).ok().map(|v| f32::from(v) / 255.0);

    match hex.len() {
        6 => Some([
            channel(&hex[0..2])?,
            channel(&hex[2..4])?,
            channel(&hex[4..6])?,
        ]),
        3 => {
            let mut rgb = [0.0; 3];
            for (slot, c) in rgb.iter_mut().zip(hex.chars()) {
                *slot = channel(&format!("{c}{c}"))?;
            }
            Some(rgb)
        }
        _ => None,
    }
}
