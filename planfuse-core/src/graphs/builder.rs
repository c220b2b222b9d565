use super::graph::{ElementGraph, ElementNode, GraphEdge, GraphNode, ImageNode, RunInfo, CONTAINS};
use crate::types::EnrichedElement;
use std::collections::{HashMap, HashSet};
use tracing::{debug, info};

/// Builds image -> element graphs from enriched elements.
///
/// Element ids are `<image>_<semantic type>_<seq>`, where `seq` counts per semantic
/// type from 0. The counters belong to the builder, so ids stay unique across every
/// graph the same builder produces.
#[derive(Debug, Default)]
pub struct GraphBuilder {
    counters: HashMap<String, usize>,
}

impl GraphBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn build_graph(&mut self, elements: &[EnrichedElement]) -> ElementGraph {
        info!("🏗️  Building element graph from {} elements", elements.len());

        let mut graph = ElementGraph::new();
        let mut seen_images: HashSet<String> = HashSet::new();

        for element in elements {
            self.add_element(&mut graph, &mut seen_images, element);
        }

        info!(
            "✅ Graph built: {} nodes ({} images), {} edges",
            graph.nodes.len(),
            graph.image_count(),
            graph.edges.len()
        );
        graph
    }

    /// Build and stamp the run provenance.
    pub fn build_graph_with_run(
        &mut self,
        elements: &[EnrichedElement],
        run: RunInfo,
    ) -> ElementGraph {
        let mut graph = self.build_graph(elements);
        graph.run = Some(run);
        graph
    }

    // Element node first, then its image node on first sight, then the edge.
    fn add_element(
        &mut self,
        graph: &mut ElementGraph,
        seen_images: &mut HashSet<String>,
        element: &EnrichedElement,
    ) {
        let id = self.next_id(&element.image, &element.semantic_type);
        debug!("node {} ({})", id, element.semantic_class);

        graph.nodes.push(GraphNode::Element(ElementNode {
            id: id.clone(),
            image: element.image.clone(),
            semantic_class: element.semantic_class.clone(),
            semantic_type: element.semantic_type.clone(),
            ocr_text: element.ocr_text.clone(),
            confidence: element.confidence,
        }));

        if seen_images.insert(element.image.clone()) {
            graph.nodes.push(GraphNode::Image(ImageNode {
                id: element.image.clone(),
            }));
        }

        graph.edges.push(GraphEdge {
            source: element.image.clone(),
            target: id,
            relation: CONTAINS.to_string(),
        });
    }

    fn next_id(&mut self, image: &str, semantic_type: &str) -> String {
        let counter = self.counters.entry(semantic_type.to_string()).or_insert(0);
        let id = format!("{image}_{semantic_type}_{counter}");
        *counter += 1;
        id
    }
}
