use crate::config::PlanfuseConfig;
use crate::fusion::{fuse_image, status_counts};
use crate::graphs::{ElementGraph, GraphBuilder, RunInfo};
use crate::rules::{RuleEngine, RuleResult};
use crate::semantics::SemanticMapper;
use crate::sources::{AnnotationSource, DirectorySource};
use crate::types::{EnrichedElement, FusedDetection, MatchStatus};
use anyhow::Result;
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tracing::{info, warn};

/// Captured outputs of every pipeline stage.
/// Used for testing and diagnostics: each boundary can be inspected on its own.
#[derive(Debug, Clone, Serialize)]
pub struct PipelineStages {
    pub fused: Vec<FusedDetection>,
    pub elements: Vec<EnrichedElement>,
    pub graph: ElementGraph,
    pub rule_results: Vec<RuleResult>,
    #[serde(skip)]
    pub batch: BatchSummary,
}

/// Which images made it through fusion and which were skipped (with the reason).
#[derive(Debug, Clone, Default)]
pub struct BatchSummary {
    pub processed: Vec<String>,
    pub skipped: Vec<(String, String)>,
}

#[derive(Debug, Clone)]
pub struct FusionOutput {
    pub rows: Vec<FusedDetection>,
    pub batch: BatchSummary,
}

impl FusionOutput {
    pub fn status_counts(&self) -> BTreeMap<(String, MatchStatus), usize> {
        status_counts(&self.rows)
    }
}

/// Simple profiler that collects timings for pipeline steps
pub struct StepProfiler {
    enabled: bool,
    timings: Vec<(String, Duration)>,
}

impl StepProfiler {
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled,
            timings: Vec::new(),
        }
    }

    pub fn time_step<F, R>(&mut self, step_name: &str, f: F) -> R
    where
        F: FnOnce() -> R,
    {
        if !self.enabled {
            return f();
        }

        let start = Instant::now();
        let result = f();
        let elapsed = start.elapsed();

        self.timings.push((step_name.to_string(), elapsed));
        info!("⏱️  {}: {:.0}ms", step_name, elapsed.as_millis());

        result
    }

    pub fn timings(&self) -> &[(String, Duration)] {
        &self.timings
    }

    pub fn print_summary(&self) {
        if !self.enabled || self.timings.is_empty() {
            return;
        }

        println!("\n📊 Performance Summary:");
        let total: Duration = self.timings.iter().map(|(_, d)| *d).sum();

        for (step, duration) in &self.timings {
            let percentage = if total.is_zero() {
                0.0
            } else {
                (duration.as_secs_f64() / total.as_secs_f64()) * 100.0
            };
            println!(
                "   {:.<35} {:.0}ms ({:.1}%)",
                step,
                duration.as_millis(),
                percentage
            );
        }
        println!("   {:.<35} {:.0}ms", "Total", total.as_millis());
    }
}

/// Runs the stages over a batch of images.
///
/// The graph builder lives as long as the processor, so element ids never repeat
/// across graphs built by the same processor.
pub struct BatchProcessor {
    source: Box<dyn AnnotationSource>,
    config: PlanfuseConfig,
    mapper: SemanticMapper,
    graph_builder: GraphBuilder,
    rule_engine: RuleEngine,
}

impl BatchProcessor {
    /// Create a processor with an injected annotation source
    pub fn new_with_source(source: Box<dyn AnnotationSource>, config: PlanfuseConfig) -> Self {
        Self {
            source,
            mapper: SemanticMapper::from_config(&config),
            graph_builder: GraphBuilder::new(),
            rule_engine: RuleEngine::from_config(&config.rules),
            config,
        }
    }

    /// Convenience constructor over a labels directory and an OCR directory
    pub fn new_from_dirs(
        labels_dir: impl Into<PathBuf>,
        ocr_dir: impl Into<PathBuf>,
        config: PlanfuseConfig,
    ) -> Self {
        let source = DirectorySource::new(labels_dir, ocr_dir, config.clone());
        Self::new_with_source(Box::new(source), config)
    }

    /// Fuse every image (or the first `limit`). Images that fail to load are skipped with a warning.
    pub fn fuse(&self, limit: Option<usize>) -> Result<FusionOutput> {
        let mut images = self.source.image_names()?;
        if let Some(limit) = limit {
            images.truncate(limit);
        }
        info!("🔍 Fusing detections and OCR for {} images", images.len());

        let mut rows = Vec::new();
        let mut batch = BatchSummary::default();
        for image in images {
            match self.source.load(&image) {
                Ok(annotations) => {
                    rows.extend(fuse_image(&annotations, &self.config));
                    batch.processed.push(image);
                }
                Err(e) => {
                    warn!("⚠️  Skipping {image}: {e:#}");
                    batch.skipped.push((image, format!("{e:#}")));
                }
            }
        }

        info!(
            "✅ {} detections fused from {} images ({} skipped)",
            rows.len(),
            batch.processed.len(),
            batch.skipped.len()
        );
        Ok(FusionOutput { rows, batch })
    }

    pub fn enrich(&self, rows: &[FusedDetection]) -> Vec<EnrichedElement> {
        let elements = self.mapper.map_all(rows);
        let conflicts = elements.iter().filter(|e| e.conflict).count();
        info!(
            "🏷️  {} of {} detections mapped ({} conflicts)",
            elements.len(),
            rows.len(),
            conflicts
        );
        elements
    }

    /// Build the element graph, stamped with this run's provenance.
    pub fn build_graph(&mut self, elements: &[EnrichedElement]) -> Result<ElementGraph> {
        let run = RunInfo::new(self.config.config_hash()?);
        Ok(self.graph_builder.build_graph_with_run(elements, run))
    }

    pub fn check(&self, graph: &ElementGraph) -> Vec<RuleResult> {
        self.rule_engine.evaluate(graph)
    }

    /// Run every stage and capture each boundary.
    pub fn run(&mut self, limit: Option<usize>, profiler: &mut StepProfiler) -> Result<PipelineStages> {
        let fusion = profiler.time_step("Fusion", || self.fuse(limit))?;
        let elements = profiler.time_step("Semantic mapping", || self.enrich(&fusion.rows));
        let graph = profiler.time_step("Graph building", || self.build_graph(&elements))?;
        let rule_results = profiler.time_step("Rule checks", || self.check(&graph));

        Ok(PipelineStages {
            fused: fusion.rows,
            elements,
            graph,
            rule_results,
            batch: fusion.batch,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PlanfuseError;
    use crate::geometry::PixelBox;
    use crate::types::{DetectionBox, ImageAnnotations, OcrReading};
    use std::collections::HashMap;

    struct MemorySource {
        images: HashMap<String, ImageAnnotations>,
        order: Vec<String>,
    }

    impl AnnotationSource for MemorySource {
        fn image_names(&self) -> Result<Vec<String>> {
            Ok(self.order.clone())
        }

        fn load(&self, image: &str) -> Result<ImageAnnotations> {
            self.images.get(image).cloned().ok_or_else(|| {
                PlanfuseError::MissingLabels {
                    image: image.to_string(),
                }
                .into()
            })
        }
    }

    fn plan(image: &str, class_id: u32, class_name: &str, conf: f64, text: &str) -> ImageAnnotations {
        ImageAnnotations {
            image: image.to_string(),
            width: 200,
            height: 200,
            detections: vec![DetectionBox {
                class_id,
                class_name: class_name.to_string(),
                bbox: PixelBox::new(10, 10, 50, 50),
                confidence: conf,
            }],
            readings: vec![OcrReading {
                polygon: vec![[12.0, 12.0], [48.0, 12.0], [48.0, 48.0], [12.0, 48.0]],
                text: text.to_string(),
                score: 0.9,
            }],
        }
    }

    fn processor() -> BatchProcessor {
        let images = vec![
            plan("a.png", 0, "exit", 0.9, "EXIT ROUTE"),
            plan("b.png", 1, "fire extinguisher", 0.4, "Fire extinguisher"),
        ];
        let mut order: Vec<String> = images.iter().map(|i| i.image.clone()).collect();
        order.insert(1, "missing.png".to_string());
        let source = MemorySource {
            images: images.into_iter().map(|i| (i.image.clone(), i)).collect(),
            order,
        };
        BatchProcessor::new_with_source(Box::new(source), PlanfuseConfig::default())
    }

    #[test]
    fn failing_image_is_skipped_not_fatal() {
        let fusion = processor().fuse(None).unwrap();
        assert_eq!(fusion.batch.processed, vec!["a.png", "b.png"]);
        assert_eq!(fusion.batch.skipped.len(), 1);
        assert_eq!(fusion.batch.skipped[0].0, "missing.png");
        assert_eq!(fusion.rows.len(), 2);
        assert!(fusion.rows.iter().all(|r| r.status == MatchStatus::Validated));
    }

    #[test]
    fn limit_truncates_batch() {
        let fusion = processor().fuse(Some(1)).unwrap();
        assert_eq!(fusion.batch.processed, vec!["a.png"]);
        assert!(fusion.batch.skipped.is_empty());
    }

    #[test]
    fn full_run_captures_every_stage() {
        let mut processor = processor();
        let mut profiler = StepProfiler::new(true);
        let stages = processor.run(None, &mut profiler).unwrap();

        assert_eq!(stages.elements.len(), 2);
        assert_eq!(stages.elements[0].confidence, 1.0);
        assert_eq!(stages.graph.image_count(), 2);
        assert_eq!(stages.graph.edges.len(), 2);
        assert!(stages.graph.run.is_some());
        assert_eq!(stages.rule_results.len(), 2);
        assert_eq!(stages.rule_results[0].passed_checks, vec!["Exit OCR OK".to_string()]);
        // 0.4 + 0.2 boost clears the 0.5 bar.
        assert_eq!(
            stages.rule_results[1].passed_checks,
            vec!["FireExtinguisher Confidence OK".to_string()]
        );
        assert_eq!(profiler.timings().len(), 4);
    }
}
