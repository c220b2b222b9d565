//! Pipeline boundary tests: run the whole batch over fixture files and check
//! the shape of every stage output.
//!
//! Fixtures are written to a temporary directory:
//!
//! - plan_a: a validated exit and a fire extinguisher with unusable OCR text
//! - plan_b: validated stairs and an unsure exit detector overridden by "STAIR" text
//! - plan_c: OCR document without a label file (skipped, not fatal)
//! - plan_d (added per test): label file without an OCR document (skipped)

use planfuse_core::export::{
    load_enriched_elements, load_fused_detections, save_json, write_element_table,
    write_fusion_summary, write_rule_summary, SUMMARY_COLUMNS,
};
use planfuse_core::graphs::GraphNode;
use planfuse_core::{
    BatchProcessor, ElementGraph, GraphBuilder, MatchStatus, PipelineStages, PlanfuseConfig,
    PlanfuseError, RuleEngine, SemanticMapper, StepProfiler,
};
use serde_json::{json, Value};
use std::path::Path;
use tempfile::TempDir;

// ============================================================================
// Fixture helpers
// ============================================================================

fn square(x1: f64, y1: f64, x2: f64, y2: f64) -> Value {
    json!([[x1, y1], [x2, y1], [x2, y2], [x1, y2]])
}

fn write_image(root: &Path, stem: &str, size: u32, labels: Option<&str>, regions: Value) {
    let doc = json!({
        "image": format!("{stem}.png"),
        "width": size,
        "height": size,
        "regions": regions,
    });
    std::fs::write(
        root.join("ocr").join(format!("{stem}.json")),
        serde_json::to_string_pretty(&doc).unwrap(),
    )
    .unwrap();
    if let Some(labels) = labels {
        std::fs::write(root.join("labels").join(format!("{stem}.txt")), labels).unwrap();
    }
}

fn fixture_dir() -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    std::fs::create_dir_all(dir.path().join("labels")).unwrap();
    std::fs::create_dir_all(dir.path().join("ocr")).unwrap();

    write_image(
        dir.path(),
        "plan_a",
        1000,
        Some("0 0.125 0.125 0.125 0.125 0.9\n0 0.5\n1 0.5 0.5 0.125 0.125 0.4\n"),
        json!([
            {"polygon": square(70.0, 70.0, 180.0, 180.0), "text": "EXIT ROUTE", "score": 0.95},
            {"polygon": square(440.0, 440.0, 560.0, 560.0), "text": "HYDRANT", "score": 0.9},
        ]),
    );
    write_image(
        dir.path(),
        "plan_b",
        500,
        Some("3 0.5 0.5 0.25 0.25 0.8\n0 0.125 0.125 0.125 0.125 0.3\n"),
        json!([
            {"polygon": square(200.0, 200.0, 300.0, 300.0), "text": "Stairs up", "score": 0.95},
            {"polygon": square(35.0, 35.0, 90.0, 90.0), "text": "STAIR", "score": 0.9},
        ]),
    );
    write_image(
        dir.path(),
        "plan_c",
        500,
        None,
        json!([{"polygon": square(0.0, 0.0, 10.0, 10.0), "text": "EXIT", "score": 0.9}]),
    );
    dir
}

fn run_pipeline(dir: &TempDir) -> PipelineStages {
    let mut processor = BatchProcessor::new_from_dirs(
        dir.path().join("labels"),
        dir.path().join("ocr"),
        PlanfuseConfig::default(),
    );
    processor
        .run(None, &mut StepProfiler::new(false))
        .expect("pipeline run")
}

fn path_str(dir: &TempDir, file: &str) -> String {
    dir.path().join(file).to_string_lossy().into_owned()
}

// ============================================================================
// Batch behaviour
// ============================================================================

mod batch {
    use super::*;

    #[test]
    fn images_without_labels_are_skipped() {
        let dir = fixture_dir();
        let stages = run_pipeline(&dir);

        assert_eq!(stages.batch.processed, vec!["plan_a.png", "plan_b.png"]);
        assert_eq!(stages.batch.skipped.len(), 1);
        assert_eq!(stages.batch.skipped[0].0, "plan_c.png");
        assert!(stages.batch.skipped[0].1.contains("plan_c.png"));
    }

    #[test]
    fn labels_without_ocr_document_are_skipped() {
        let dir = fixture_dir();
        std::fs::write(
            dir.path().join("labels/plan_d.txt"),
            "0 0.5 0.5 0.25 0.25 0.9\n",
        )
        .unwrap();
        let stages = run_pipeline(&dir);

        assert_eq!(stages.batch.processed, vec!["plan_a.png", "plan_b.png"]);
        let skipped: Vec<&str> = stages.batch.skipped.iter().map(|(name, _)| name.as_str()).collect();
        assert_eq!(skipped, vec!["plan_c.png", "plan_d"]);
        assert!(stages.batch.skipped[1].1.contains("no OCR document"));
        assert_eq!(stages.fused.len(), 4);
    }

    #[test]
    fn one_fused_row_per_valid_label_line() {
        let dir = fixture_dir();
        let stages = run_pipeline(&dir);

        let statuses: Vec<(&str, MatchStatus)> = stages
            .fused
            .iter()
            .map(|r| (r.class_name.as_str(), r.status))
            .collect();
        assert_eq!(
            statuses,
            vec![
                ("exit", MatchStatus::Validated),
                ("fire extinguisher", MatchStatus::NoText),
                ("stairs", MatchStatus::Validated),
                ("exit", MatchStatus::Conflict),
            ]
        );

        let no_text = &stages.fused[1];
        assert!(no_text.ocr_text_clean.is_empty());
        assert_eq!(no_text.best_overlap, 0.0);
        assert_eq!(no_text.ocr_score, None);
    }

    #[test]
    fn limit_keeps_first_images_in_name_order() {
        let dir = fixture_dir();
        let processor = BatchProcessor::new_from_dirs(
            dir.path().join("labels"),
            dir.path().join("ocr"),
            PlanfuseConfig::default(),
        );
        let fusion = processor.fuse(Some(1)).unwrap();
        assert_eq!(fusion.batch.processed, vec!["plan_a.png"]);
        assert_eq!(fusion.rows.len(), 2);
    }
}

// ============================================================================
// Semantics, graph and rules over the fixture batch
// ============================================================================

mod stages {
    use super::*;

    #[test]
    fn enrichment_boosts_overrides_and_keeps_detector_semantics() {
        let dir = fixture_dir();
        let stages = run_pipeline(&dir);
        let e = &stages.elements;

        assert_eq!(e.len(), 4);

        assert_eq!((e[0].semantic_class.as_str(), e[0].semantic_type.as_str()), ("Door", "EXIT"));
        assert_eq!(e[0].confidence, 1.0);

        assert_eq!(e[1].semantic_type, "FIREEXTINGUISHER");
        assert_eq!(e[1].confidence, 0.4);
        assert_eq!(e[1].ocr_confidence, 0.0);

        assert_eq!(e[2].semantic_type, "STAIR");
        assert_eq!(e[2].confidence, 1.0);

        assert_eq!(e[3].detector_class, "exit");
        assert_eq!(e[3].semantic_type, "STAIR");
        assert_eq!(e[3].confidence, 0.3);
        assert_eq!(e[3].ocr_confidence, 0.9);
        assert!(e.iter().all(|el| !el.conflict));
    }

    #[test]
    fn graph_has_one_image_node_per_image_and_one_edge_per_element() {
        let dir = fixture_dir();
        let graph = run_pipeline(&dir).graph;

        assert_eq!(graph.image_count(), 2);
        assert_eq!(graph.element_nodes().count(), 4);
        assert_eq!(graph.edges.len(), 4);

        let ids: Vec<&str> = graph.nodes.iter().map(GraphNode::id).collect();
        assert_eq!(
            ids,
            vec![
                "plan_a.png_EXIT_0",
                "plan_a.png",
                "plan_a.png_FIREEXTINGUISHER_0",
                "plan_b.png_STAIR_0",
                "plan_b.png",
                "plan_b.png_STAIR_1",
            ]
        );
        for node in graph.element_nodes() {
            let incoming = graph.edges.iter().filter(|e| e.target == node.id).count();
            assert_eq!(incoming, 1, "{} should have exactly one incoming edge", node.id);
        }
    }

    #[test]
    fn rule_results_cover_element_nodes_only() {
        let dir = fixture_dir();
        let results = run_pipeline(&dir).rule_results;

        assert_eq!(results.len(), 4);
        assert_eq!(results[0].passed_checks, vec!["Exit OCR OK"]);
        assert_eq!(results[1].failed_checks, vec!["FireExtinguisher Confidence TOO LOW"]);
        assert!(results[1].passed_checks.is_empty());
        assert!(results[2].passed_checks.is_empty() && results[2].failed_checks.is_empty());
        assert!(results[3].passed_checks.is_empty() && results[3].failed_checks.is_empty());
    }
}

// ============================================================================
// Output documents: schema contract
// ============================================================================

mod schema_contract {
    use super::*;

    #[test]
    fn graph_document_has_required_fields() {
        let dir = fixture_dir();
        let stages = run_pipeline(&dir);
        let graph_path = path_str(&dir, "graph.json");
        stages.graph.save_to_json(&graph_path).unwrap();

        let graph: Value =
            serde_json::from_str(&std::fs::read_to_string(&graph_path).unwrap()).unwrap();
        assert_eq!(graph["schema_version"], "0.1.0");
        assert!(graph["run"]["run_id"].is_string());
        assert!(graph["run"]["created_at"].is_string());
        assert_eq!(graph["run"]["config_hash"].as_str().unwrap().len(), 64);

        for (i, node) in graph["nodes"].as_array().unwrap().iter().enumerate() {
            assert!(node["id"].is_string(), "Node {i} missing id");
            match node["kind"].as_str() {
                Some("Image") => {}
                Some("Element") => {
                    for key in ["image", "ifc_class", "ifc_type", "ocr_text"] {
                        assert!(node[key].is_string(), "Node {i} missing {key}");
                    }
                    assert!(node["confidence"].is_number(), "Node {i} missing confidence");
                }
                other => panic!("Node {i} has unexpected kind {other:?}"),
            }
        }
        for edge in graph["edges"].as_array().unwrap() {
            assert_eq!(edge["relation"], "contains");
        }
    }

    #[test]
    fn summary_csv_has_fixed_columns() {
        let dir = fixture_dir();
        let stages = run_pipeline(&dir);
        let csv_path = path_str(&dir, "summary.csv");
        assert_eq!(write_fusion_summary(&stages.fused, &csv_path).unwrap(), 4);

        let csv = std::fs::read_to_string(&csv_path).unwrap();
        let mut lines = csv.lines();
        assert_eq!(lines.next().unwrap(), SUMMARY_COLUMNS.join(","));
        assert_eq!(
            lines.next().unwrap(),
            "plan_a.png,exit,0.900,validated,EXIT ROUTE,EXIT,0.774,62,62,125,125"
        );
        assert_eq!(csv.lines().count(), 5);
    }

    #[test]
    fn rule_summary_and_element_table() {
        let dir = fixture_dir();
        let stages = run_pipeline(&dir);

        let rules_path = path_str(&dir, "rule_summary.csv");
        write_rule_summary(&stages.rule_results, &rules_path).unwrap();
        let rules = std::fs::read_to_string(&rules_path).unwrap();
        assert!(rules.starts_with("image,id,type,passed_checks,failed_checks\n"));
        assert!(rules.contains("plan_a.png,plan_a.png_EXIT_0,EXIT,Exit OCR OK,\n"));

        let elements_path = path_str(&dir, "elements.csv");
        assert_eq!(write_element_table(&stages.graph, &elements_path).unwrap(), 4);
        let elements = std::fs::read_to_string(&elements_path).unwrap();
        assert!(elements.starts_with("id,image,ifc_class,ifc_type,ocr_text,confidence\n"));
        assert!(elements.contains("plan_b.png_STAIR_1,plan_b.png,Stair,STAIR,STAIRS,0.300"));
    }
}

// ============================================================================
// Stage-by-stage runs from saved outputs
// ============================================================================

mod staged_runs {
    use super::*;

    #[test]
    fn saved_outputs_feed_the_next_stage() {
        let dir = fixture_dir();
        let stages = run_pipeline(&dir);
        let config = PlanfuseConfig::default();

        let summary_path = path_str(&dir, "summary.json");
        save_json(&stages.fused, &summary_path).unwrap();
        let rows = load_fused_detections(&summary_path).unwrap();
        let elements = SemanticMapper::from_config(&config).map_all(&rows);
        assert_eq!(elements, stages.elements);

        let enrichment_path = path_str(&dir, "enrichment.json");
        save_json(&elements, &enrichment_path).unwrap();
        let elements = load_enriched_elements(&enrichment_path).unwrap();
        let graph = GraphBuilder::new().build_graph(&elements);

        let graph_path = path_str(&dir, "graph.json");
        graph.save_to_json(&graph_path).unwrap();
        let graph = ElementGraph::load_from_json(&graph_path).unwrap();
        let results = RuleEngine::from_config(&config.rules).evaluate(&graph);
        assert_eq!(results, stages.rule_results);
    }

    #[test]
    fn graph_without_nodes_aborts_the_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = path_str(&dir, "graph.json");
        std::fs::write(&path, r#"{"elements": []}"#).unwrap();

        let err = ElementGraph::load_from_json(&path).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<PlanfuseError>(),
            Some(PlanfuseError::Structure { .. })
        ));
    }

    #[test]
    fn fused_rows_load_from_per_image_object() {
        let dir = fixture_dir();
        let stages = run_pipeline(&dir);

        let mut by_image = serde_json::Map::new();
        for row in &stages.fused {
            let mut value = serde_json::to_value(row).unwrap();
            value.as_object_mut().unwrap().remove("image");
            by_image
                .entry(row.image.clone())
                .or_insert_with(|| Value::Array(Vec::new()))
                .as_array_mut()
                .unwrap()
                .push(value);
        }
        let path = path_str(&dir, "parsed_summary.json");
        std::fs::write(&path, Value::Object(by_image).to_string()).unwrap();

        let rows = load_fused_detections(&path).unwrap();
        assert_eq!(rows, stages.fused);
    }
}
