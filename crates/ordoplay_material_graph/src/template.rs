// SPDX-License-Identifier: MIT OR Apache-2.0
//! Starter graph shown when a new material is created.

use crate::connection::EdgeIdGenerator;
use crate::graph::{ConnectionError, Graph};
use crate::node::{InputNodeType, MaterialNode, MathNodeType, NodeId, OutputNodeType};
use crate::port::{PortKey, SocketType};

/// Body of the starter code node
pub const STARTER_CODE: &str = "let tint = normalize(primary + vec3(0.2, 0.1, 0.0));\nreturn tint * 0.9;";

/// Create the starter material graph.
///
/// A color and a code-node tint are blended by a sine wave over time; the
/// blend drives base color and the wave itself drives emission.
pub fn create_initial_graph(ids: &mut dyn EdgeIdGenerator) -> Result<Graph, ConnectionError> {
    let mut graph = Graph::new("New Material");

    let color = graph.add_node(
        MaterialNode::input("input-color", "Base Color", InputNodeType::Color)
            .with_color("#7dd3fc")
            .with_position(80.0, 80.0),
    );
    let time = graph.add_node(
        MaterialNode::input("input-time", "Time", InputNodeType::Time).with_position(80.0, 260.0),
    );
    let sine = graph.add_node(
        MaterialNode::math("wave-sine", "Sine Wave", MathNodeType::Sine).with_position(320.0, 260.0),
    );
    let lerp = graph.add_node(
        MaterialNode::math("lerp-hue", "Blend", MathNodeType::Lerp).with_position(560.0, 160.0),
    );
    let code = graph.add_node(
        MaterialNode::code("code-fragment", "CodeNode", STARTER_CODE, SocketType::Vec3)
            .with_position(320.0, 40.0),
    );
    let base = graph.add_node(
        MaterialNode::output("output-base", "Base Color", OutputNodeType::BaseColor)
            .with_position(840.0, 120.0),
    );
    let emissive = graph.add_node(
        MaterialNode::output("output-emissive", "Emissive", OutputNodeType::Emissive)
            .with_position(840.0, 240.0),
    );

    let links: [(&NodeId, &NodeId, PortKey); 6] = [
        (&time, &sine, PortKey::Input),
        (&sine, &lerp, PortKey::Factor),
        (&color, &lerp, PortKey::Primary),
        (&code, &lerp, PortKey::Secondary),
        (&lerp, &base, PortKey::Input),
        (&sine, &emissive, PortKey::Input),
    ];
    for (source, target, port) in links {
        graph.connect(ids, source, Some(PortKey::Out), target, Some(port))?;
    }

    Ok(graph)
}
