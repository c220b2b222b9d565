// All core functionality is in planfuse-core
// This CLI acts as a thin wrapper around the core library: it decides file names
// inside an output directory and prints what was written.

use anyhow::{Context, Result};
use planfuse_core::export::{
    save_json, write_element_table, write_enrichment, write_fusion_summary, write_rule_summary,
};
use planfuse_core::rules::save_rule_results;
use std::path::Path;

// Re-export core types for convenience
pub use planfuse_core::*;

pub const SUMMARY_CSV: &str = "summary.csv";
pub const SUMMARY_JSON: &str = "summary.json";
pub const ENRICHMENT_CSV: &str = "enrichment.csv";
pub const ENRICHMENT_JSON: &str = "enrichment.json";
pub const GRAPH_JSON: &str = "graph.json";
pub const ELEMENTS_CSV: &str = "elements.csv";
pub const RULE_RESULTS_JSON: &str = "rule_results.json";
pub const RULE_SUMMARY_CSV: &str = "rule_summary.csv";

fn output_path(dir: &str, file: &str) -> Result<String> {
    std::fs::create_dir_all(dir).with_context(|| format!("Failed to create output directory {dir}"))?;
    Ok(Path::new(dir).join(file).to_string_lossy().into_owned())
}

pub fn save_fusion(rows: &[FusedDetection], dir: &str) -> Result<()> {
    let csv_path = output_path(dir, SUMMARY_CSV)?;
    let count = write_fusion_summary(rows, &csv_path)?;
    println!("  💾 {csv_path} ({count} rows)");

    let json_path = output_path(dir, SUMMARY_JSON)?;
    save_json(rows, &json_path)?;
    println!("  💾 {json_path}");
    Ok(())
}

pub fn save_enrichment(elements: &[EnrichedElement], dir: &str) -> Result<()> {
    let csv_path = output_path(dir, ENRICHMENT_CSV)?;
    let count = write_enrichment(elements, &csv_path)?;
    println!("  💾 {csv_path} ({count} rows)");

    let json_path = output_path(dir, ENRICHMENT_JSON)?;
    save_json(elements, &json_path)?;
    println!("  💾 {json_path}");
    Ok(())
}

pub fn save_graph(graph: &ElementGraph, dir: &str) -> Result<()> {
    let graph_path = output_path(dir, GRAPH_JSON)?;
    graph.save_to_json(&graph_path)?;
    println!(
        "  💾 {graph_path} ({} nodes, {} edges)",
        graph.nodes.len(),
        graph.edges.len()
    );

    let csv_path = output_path(dir, ELEMENTS_CSV)?;
    let count = write_element_table(graph, &csv_path)?;
    println!("  💾 {csv_path} ({count} elements)");
    Ok(())
}

pub fn save_rule_report(results: &[RuleResult], dir: &str) -> Result<()> {
    let json_path = output_path(dir, RULE_RESULTS_JSON)?;
    save_rule_results(results, &json_path)?;
    println!("  💾 {json_path}");

    let csv_path = output_path(dir, RULE_SUMMARY_CSV)?;
    let count = write_rule_summary(results, &csv_path)?;
    println!("  💾 {csv_path} ({count} rows)");
    Ok(())
}
