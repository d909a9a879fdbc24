//! Component dependency graph using `petgraph`.
//!
//! Built from the `dependencies.components` declarations of an image.
//! Every reference must name a component of the same image; cycles are
//! reported but tolerated, since components start independently.

use std::collections::BTreeMap;

use cellc_common::error::{CellError, Result};
use cellc_model::image::CellImage;
use petgraph::graph::{Graph, NodeIndex};

/// Directed graph of calls between the components of one image.
#[derive(Debug)]
pub struct ComponentGraph {
    graph: Graph<String, ()>,
}

impl ComponentGraph {
    /// Builds the graph of `image`.
    ///
    /// # Errors
    ///
    /// Returns a validation error if a component depends on a component
    /// the image does not declare.
    pub fn from_image(image: &CellImage) -> Result<Self> {
        let mut graph = Graph::new();
        let nodes: BTreeMap<&str, NodeIndex> = image
            .components()
            .iter()
            .map(|c| (c.name.as_str(), graph.add_node(c.name.clone())))
            .collect();

        for component in image.components() {
            let dependent = nodes[component.name.as_str()];
            for target in &component.depends_on {
                let Some(&dependency) = nodes.get(target.as_str()) else {
                    return Err(CellError::validation(format!(
                        "component \"{}\" depends on undefined component \"{target}\"",
                        component.name
                    )));
                };
                // Edges point from dependency to dependent so the
                // topological order starts with dependencies.
                let _ = graph.add_edge(dependency, dependent, ());
            }
        }
        Ok(Self { graph })
    }

    /// Returns a start order with dependencies first, or `None` if the
    /// graph has a cycle.
    pub fn start_order(&self) -> Option<Vec<String>> {
        petgraph::algo::toposort(&self.graph, None)
            .ok()
            .map(|indices| {
                indices
                    .iter()
                    .filter_map(|&idx| self.graph.node_weight(idx).cloned())
                    .collect()
            })
    }

    /// Logs a warning if the graph has a cycle. Returns whether it does.
    pub fn warn_on_cycles(&self) -> bool {
        let cyclic = petgraph::algo::is_cyclic_directed(&self.graph);
        if cyclic {
            tracing::warn!("cyclic dependency detected between components");
        }
        cyclic
    }
}
