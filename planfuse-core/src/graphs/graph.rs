use crate::error::PlanfuseError;
use crate::types::SCHEMA_VERSION;
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// Relation carried by every image -> element edge.
pub const CONTAINS: &str = "contains";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum GraphNode {
    Image(ImageNode),
    Element(ElementNode),
}

impl GraphNode {
    pub fn id(&self) -> &str {
        match self {
            GraphNode::Image(node) => &node.id,
            GraphNode::Element(node) => &node.id,
        }
    }

    pub fn as_element(&self) -> Option<&ElementNode> {
        match self {
            GraphNode::Element(node) => Some(node),
            GraphNode::Image(_) => None,
        }
    }
}

/// Source image; its id is the image name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageNode {
    pub id: String,
}

/// One semantically typed object instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ElementNode {
    pub id: String,
    pub image: String,
    #[serde(rename = "ifc_class")]
    pub semantic_class: String,
    #[serde(rename = "ifc_type")]
    pub semantic_type: String,
    #[serde(default)]
    pub ocr_text: String,
    pub confidence: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphEdge {
    pub source: String,
    pub target: String,
    pub relation: String,
}

/// Provenance of one pipeline run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunInfo {
    pub run_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub config_hash: String,
}

impl RunInfo {
    pub fn new(config_hash: String) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            created_at: Utc::now(),
            config_hash,
        }
    }
}

/// Image -> element graph. Node and edge order is creation order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ElementGraph {
    #[serde(default = "default_schema_version")]
    pub schema_version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub run: Option<RunInfo>,
    pub nodes: Vec<GraphNode>,
    #[serde(default)]
    pub edges: Vec<GraphEdge>,
}

fn default_schema_version() -> String {
    SCHEMA_VERSION.to_string()
}

impl Default for ElementGraph {
    fn default() -> Self {
        Self::new()
    }
}

impl ElementGraph {
    pub fn new() -> Self {
        Self {
            schema_version: default_schema_version(),
            run: None,
            nodes: Vec::new(),
            edges: Vec::new(),
        }
    }

    pub fn element_nodes(&self) -> impl Iterator<Item = &ElementNode> {
        self.nodes.iter().filter_map(GraphNode::as_element)
    }

    pub fn image_count(&self) -> usize {
        self.nodes
            .iter()
            .filter(|n| matches!(n, GraphNode::Image(_)))
            .count()
    }

    pub fn save_to_json(&self, path: &str) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json).with_context(|| format!("Failed to write graph to {path}"))?;
        Ok(())
    }

    /// Load a graph document. A top-level array of graph documents is merged in order.
    pub fn load_from_json(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read graph from {path}"))?;
        let value: Value = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse graph JSON {path}"))?;
        Self::from_value(value, path)
    }

    pub fn from_value(value: Value, document: &str) -> Result<Self> {
        match value {
            Value::Object(_) => Self::from_graph_object(value, document),
            Value::Array(graphs) => {
                let mut merged = ElementGraph::new();
                for graph in graphs {
                    let graph = Self::from_graph_object(graph, document)?;
                    merged.nodes.extend(graph.nodes);
                    merged.edges.extend(graph.edges);
                }
                Ok(merged)
            }
            _ => Err(PlanfuseError::structure(document, "a graph object with a 'nodes' array").into()),
        }
    }

    fn from_graph_object(value: Value, document: &str) -> Result<Self> {
        if !value.get("nodes").is_some_and(Value::is_array) {
            return Err(PlanfuseError::structure(document, "a 'nodes' array").into());
        }
        if value.get("edges").is_some_and(|edges| !edges.is_array()) {
            return Err(PlanfuseError::structure(document, "'edges' to be an array").into());
        }
        let graph = serde_json::from_value(value)
            .with_context(|| format!("Invalid graph document {document}"))?;
        Ok(graph)
    }
}
