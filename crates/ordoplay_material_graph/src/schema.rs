// SPDX-License-Identifier: MIT OR Apache-2.0
//! Port layout and default values for every material node variant.

use crate::node::{InputNodeType, MaterialNode, MathNodeType, NodeKind, OutputNodeType};
use crate::port::{Literal, PortDefinition, PortKey, SocketType};

/// Input and output ports exposed by a node
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodePorts {
    /// Input ports, in display order
    pub inputs: Vec<PortDefinition>,
    /// Output ports, in display order
    pub outputs: Vec<PortDefinition>,
}

impl NodePorts {
    /// Find an input port by key
    pub fn input(&self, key: PortKey) -> Option<&PortDefinition> {
        self.inputs.iter().find(|p| p.key == key)
    }

    /// Find an output port by key
    pub fn output(&self, key: PortKey) -> Option<&PortDefinition> {
        self.outputs.iter().find(|p| p.key == key)
    }
}

const fn port(key: PortKey, label: &'static str, socket_type: SocketType) -> PortDefinition {
    PortDefinition::new(key, label, socket_type)
}

const fn out(socket_type: SocketType) -> PortDefinition {
    port(PortKey::Out, "Out", socket_type)
}

/// Fixed inputs and output of a math operator
pub fn math_ports(math_type: MathNodeType) -> (Vec<PortDefinition>, PortDefinition) {
    use PortKey::{Factor, Input, Max, Min, Primary, Secondary};
    use SocketType::{Float, Vec3};

    match math_type {
        MathNodeType::Add => (
            vec![port(Primary, "A", Vec3), port(Secondary, "B", Vec3)],
            out(Vec3),
        ),
        MathNodeType::Multiply => (
            vec![port(Primary, "A", Float), port(Secondary, "B", Float)],
            out(Float),
        ),
        MathNodeType::Lerp => (
            vec![
                port(Primary, "A", Vec3),
                port(Secondary, "B", Vec3),
                port(Factor, "T", Float),
            ],
            out(Vec3),
        ),
        MathNodeType::Clamp => (
            vec![
                port(Input, "Value", Float),
                port(Min, "Min", Float),
                port(Max, "Max", Float),
            ],
            out(Float),
        ),
        MathNodeType::Pow => (
            vec![port(Primary, "Base", Float), port(Secondary, "Power", Float)],
            out(Float),
        ),
        MathNodeType::Smoothstep => (
            vec![
                port(Min, "Edge 0", Float),
                port(Max, "Edge 1", Float),
                port(Input, "Value", Float),
            ],
            out(Float),
        ),
        MathNodeType::Sine => (vec![port(Input, "Radians", Float)], out(Float)),
        MathNodeType::Abs => (vec![port(Input, "Value", Float)], out(Float)),
    }
}

/// The single input port of an output node
pub fn output_port(output_type: OutputNodeType) -> PortDefinition {
    match output_type {
        OutputNodeType::BaseColor => port(PortKey::Input, "Color", SocketType::Color),
        OutputNodeType::Emissive => port(PortKey::Input, "Emissive", SocketType::Color),
        OutputNodeType::Roughness => port(PortKey::Input, "Roughness", SocketType::Float),
        OutputNodeType::Metalness => port(PortKey::Input, "Metalness", SocketType::Float),
        OutputNodeType::Normal => port(PortKey::Input, "Normal", SocketType::Vec3),
        OutputNodeType::Opacity => port(PortKey::Input, "Opacity", SocketType::Float),
    }
}

/// Get the ports exposed by a node
pub fn ports_for_node(node: &MaterialNode) -> NodePorts {
    match &node.kind {
        NodeKind::Input { input_type, .. } => NodePorts {
            inputs: Vec::new(),
            outputs: vec![out(map_input_socket(*input_type))],
        },
        NodeKind::Math { math_type } => {
            let (inputs, output) = math_ports(*math_type);
            NodePorts {
                inputs,
                outputs: vec![output],
            }
        }
        NodeKind::Output { output_type } => NodePorts {
            inputs: vec![output_port(*output_type)],
            outputs: Vec::new(),
        },
        NodeKind::Code { output_type, .. } => NodePorts {
            inputs: vec![
                port(PortKey::Primary, "Primary", SocketType::Vec3),
                port(PortKey::Secondary, "Secondary", SocketType::Vec3),
            ],
            outputs: vec![out(*output_type)],
        },
    }
}

/// Socket type produced by an input node variant
pub fn map_input_socket(input_type: InputNodeType) -> SocketType {
    match input_type {
        InputNodeType::Float | InputNodeType::Time => SocketType::Float,
        InputNodeType::Vec2 | InputNodeType::Uv => SocketType::Vec2,
        InputNodeType::Vec3
        | InputNodeType::NormalWorld
        | InputNodeType::PositionWorld
        | InputNodeType::ViewDirection => SocketType::Vec3,
        InputNodeType::Color => SocketType::Color,
    }
}

/// Value substituted for an unconnected input of the given socket type
pub fn default_value_for_socket(socket_type: SocketType) -> Literal {
    match socket_type {
        SocketType::Float => Literal::Float(1.0),
        SocketType::Vec2 => Literal::Vec2([0.0, 0.0]),
        SocketType::Vec3 | SocketType::Color => Literal::Vec3([0.8, 0.82, 0.88]),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL_MATH: [MathNodeType; 8] = [
        MathNodeType::Add,
        MathNodeType::Multiply,
        MathNodeType::Lerp,
        MathNodeType::Clamp,
        MathNodeType::Pow,
        MathNodeType::Smoothstep,
        MathNodeType::Sine,
        MathNodeType::Abs,
    ];

    #[test]
    fn test_math_nodes_have_one_output() {
        for math_type in ALL_MATH {
            let node = MaterialNode::math("m", "Math", math_type);
            let ports = ports_for_node(&node);
            assert_eq!(ports.outputs.len(), 1, "{math_type:?}");
            assert_eq!(ports.outputs[0].key, PortKey::Out);
            assert!(!ports.inputs.is_empty(), "{math_type:?}");
        }
    }

    #[test]
    fn test_lerp_ports() {
        let ports = ports_for_node(&MaterialNode::math("m", "Blend", MathNodeType::Lerp));
        let keys: Vec<_> = ports.inputs.iter().map(|p| p.key).collect();
        assert_eq!(keys, [PortKey::Primary, PortKey::Secondary, PortKey::Factor]);
        assert_eq!(ports.input(PortKey::Factor).map(|p| p.socket_type), Some(SocketType::Float));
        assert_eq!(ports.output(PortKey::Out).map(|p| p.socket_type), Some(SocketType::Vec3));
    }

    #[test]
    fn test_smoothstep_edges_come_first() {
        let (inputs, _) = math_ports(MathNodeType::Smoothstep);
        let labels: Vec<_> = inputs.iter().map(|p| p.label).collect();
        assert_eq!(labels, ["Edge 0", "Edge 1", "Value"]);
    }

    #[test]
    fn test_output_nodes_have_single_input() {
        for channel in OutputNodeType::ALL {
            let ports = ports_for_node(&MaterialNode::output("o", "Out", channel));
            assert_eq!(ports.inputs.len(), 1);
            assert_eq!(ports.inputs[0].key, PortKey::Input);
            assert!(ports.outputs.is_empty());
        }
        assert_eq!(output_port(OutputNodeType::BaseColor).socket_type, SocketType::Color);
        assert_eq!(output_port(OutputNodeType::Normal).socket_type, SocketType::Vec3);
    }

    #[test]
    fn test_code_output_follows_declared_type() {
        let node = MaterialNode::code("c", "Code", "return primary;", SocketType::Color);
        let ports = ports_for_node(&node);
        assert_eq!(ports.outputs[0].socket_type, SocketType::Color);
        assert_eq!(ports.inputs.len(), 2);
    }

    #[test]
    fn test_input_sockets() {
        assert_eq!(map_input_socket(InputNodeType::Time), SocketType::Float);
        assert_eq!(map_input_socket(InputNodeType::Uv), SocketType::Vec2);
        assert_eq!(map_input_socket(InputNodeType::ViewDirection), SocketType::Vec3);
        assert_eq!(map_input_socket(InputNodeType::Color), SocketType::Color);

        let ports = ports_for_node(&MaterialNode::input("i", "UV", InputNodeType::Uv));
        assert!(ports.inputs.is_empty());
        assert_eq!(ports.outputs[0].socket_type, SocketType::Vec2);
    }

    #[test]
    fn test_socket_defaults() {
        assert_eq!(default_value_for_socket(SocketType::Float), Literal::Float(1.0));
        assert_eq!(default_value_for_socket(SocketType::Vec2), Literal::Vec2([0.0, 0.0]));
        assert_eq!(
            default_value_for_socket(SocketType::Color),
            default_value_for_socket(SocketType::Vec3)
        );
    }
}
