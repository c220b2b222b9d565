// Planfuse Core Library
//
// Fuses per-image object detections with OCR text into semantically typed elements,
// links them into an image -> element graph and runs per-element rule checks.

pub mod config;
pub mod error;
pub mod export;
pub mod fusion;
pub mod geometry;
pub mod graphs;
pub mod processor;
pub mod rules;
pub mod semantics;
pub mod sources;
pub mod taxonomy;
pub mod text;
pub mod types;

// Re-export main types and functions for easy use
pub use config::PlanfuseConfig;
pub use error::PlanfuseError;
pub use graphs::{ElementGraph, GraphBuilder};
pub use processor::{BatchProcessor, PipelineStages, StepProfiler};
pub use rules::{RuleEngine, RuleResult};
pub use semantics::{MappingPolicy, SemanticMapper};
pub use sources::{AnnotationSource, DirectorySource};
pub use types::*;
