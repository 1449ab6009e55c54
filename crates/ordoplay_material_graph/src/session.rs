// SPDX-License-Identifier: MIT OR Apache-2.0
//! Ownership of the compiled material across recompiles.

use crate::compiler::{compile_material_graph_with, Material, MaterialDefaults};
use crate::graph::Graph;
use std::sync::Arc;

/// Releases renderer resources held by a material that is no longer shown
pub trait MaterialDisposer {
    /// Release the material's resources
    fn dispose(&mut self, material: &Material);
}

impl<F: FnMut(&Material)> MaterialDisposer for F {
    fn dispose(&mut self, material: &Material) {
        self(material);
    }
}

/// Holds the material currently handed to the renderer.
///
/// Installing a new material disposes the previous one unless both are the
/// same allocation.
#[derive(Debug, Default)]
pub struct CompiledMaterialSlot {
    current: Option<Arc<Material>>,
}

impl CompiledMaterialSlot {
    /// Create an empty slot
    pub fn new() -> Self {
        Self::default()
    }

    /// Material currently installed
    pub fn current(&self) -> Option<&Arc<Material>> {
        self.current.as_ref()
    }

    /// Install a material, returning whether a previous one was disposed
    pub fn install(&mut self, next: Arc<Material>, disposer: &mut dyn MaterialDisposer) -> bool {
        let previous = self.current.replace(next);
        match (previous, &self.current) {
            (Some(old), Some(new)) if !Arc::ptr_eq(&old, new) => {
                disposer.dispose(&old);
                true
            }
            _ => false,
        }
    }
}

/// A graph being edited together with its latest compiled material
pub struct MaterialSession<D: MaterialDisposer> {
    graph: Graph,
    defaults: MaterialDefaults,
    slot: CompiledMaterialSlot,
    diagnostics: Vec<String>,
    disposer: D,
}

impl<D: MaterialDisposer> MaterialSession<D> {
    /// Create a session; nothing is compiled until [`Self::recompile`]
    pub fn new(graph: Graph, disposer: D) -> Self {
        Self {
            graph,
            defaults: MaterialDefaults::default(),
            slot: CompiledMaterialSlot::new(),
            diagnostics: Vec::new(),
            disposer,
        }
    }

    /// Use custom channel fallbacks
    pub fn with_defaults(mut self, defaults: MaterialDefaults) -> Self {
        self.defaults = defaults;
        self
    }

    /// Graph being edited
    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    /// Mutable access for edits; call [`Self::recompile`] afterwards
    pub fn graph_mut(&mut self) -> &mut Graph {
        &mut self.graph
    }

    /// Compile a fresh snapshot of the graph and install the result
    pub fn recompile(&mut self) -> &[String] {
        let result = compile_material_graph_with(&self.graph.snapshot(), &self.defaults);
        if self.slot.install(Arc::new(result.material), &mut self.disposer) {
            tracing::debug!(graph = %self.graph.name, "Disposed previous material");
        }
        self.diagnostics = result.diagnostics;
        &self.diagnostics
    }

    /// Material currently installed
    pub fn material(&self) -> Option<&Arc<Material>> {
        self.slot.current()
    }

    /// Diagnostics of the last compile
    pub fn diagnostics(&self) -> &[String] {
        &self.diagnostics
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::FallbackMaterial;
    use crate::connection::SequentialEdgeIds;
    use crate::node::{MaterialNode, OutputNodeType};
    use crate::template::create_initial_graph;

    #[test]
    fn test_slot_disposes_replaced_material() {
        let mut disposed = Vec::new();
        let mut disposer = |m: &Material| disposed.push(m.clone());
        let mut slot = CompiledMaterialSlot::new();

        let first = Arc::new(Material::Fallback(FallbackMaterial::default()));
        assert!(!slot.install(first.clone(), &mut disposer));
        assert!(!slot.install(first.clone(), &mut disposer));

        let second = Arc::new(Material::Fallback(FallbackMaterial::default()));
        assert!(slot.install(second.clone(), &mut disposer));
        assert!(Arc::ptr_eq(slot.current().unwrap(), &second));

        drop(disposer);
        assert_eq!(disposed.len(), 1);
    }

    #[test]
    fn test_session_recompile() {
        let mut disposals = 0;
        let graph = create_initial_graph(&mut SequentialEdgeIds::new()).unwrap();
        let mut session = MaterialSession::new(graph, |_: &Material| disposals += 1);

        assert!(session.material().is_none());
        assert!(session.recompile().is_empty());
        assert!(session.material().is_some());

        session
            .graph_mut()
            .add_node(MaterialNode::output("rough", "Roughness", OutputNodeType::Roughness));
        assert_eq!(session.recompile(), ["Missing input for Roughness"]);
        assert_eq!(session.diagnostics().len(), 1);

        assert!(session.graph_mut().update_code(&"code-fragment".into(), "return (primary;"));
        session.recompile();
        assert!(session.material().unwrap().is_fallback());

        drop(session);
        assert_eq!(disposals, 2);
    }
}
