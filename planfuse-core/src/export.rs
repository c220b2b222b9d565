// Tabular and JSON outputs, plus the loaders that read earlier stage outputs back in

use crate::error::PlanfuseError;
use crate::graphs::ElementGraph;
use crate::rules::{summary_rows, RuleResult};
use crate::types::{EnrichedElement, FusedDetection};
use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::fs::File;
use std::io::{BufWriter, Write};

pub const SUMMARY_COLUMNS: [&str; 11] = [
    "image", "cls", "conf", "status", "ocr_raw", "ocr_clean", "best_iou", "bbox_x", "bbox_y",
    "bbox_w", "bbox_h",
];

pub const ENRICHMENT_COLUMNS: [&str; 9] = [
    "image", "ifc_class", "ifc_type", "confidence", "det_class", "det_conf", "ocr_text",
    "ocr_conf", "conflict",
];

pub const ELEMENT_COLUMNS: [&str; 6] = ["id", "image", "ifc_class", "ifc_type", "ocr_text", "confidence"];

pub const RULE_SUMMARY_COLUMNS: [&str; 5] = ["image", "id", "type", "passed_checks", "failed_checks"];

/// Minimal RFC 4180 writer: fields are quoted only when they need to be.
pub struct CsvWriter<W: Write> {
    out: W,
}

impl<W: Write> CsvWriter<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn write_record<S: AsRef<str>>(&mut self, fields: &[S]) -> Result<()> {
        let line = fields
            .iter()
            .map(|f| escape_field(f.as_ref()))
            .collect::<Vec<_>>()
            .join(",");
        writeln!(self.out, "{line}")?;
        Ok(())
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

fn escape_field(field: &str) -> String {
    if field.contains([',', '"', '\r', '\n']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

fn fmt3(value: f64) -> String {
    format!("{value:.3}")
}

fn write_table<T>(
    path: &str,
    columns: &[&str],
    rows: impl IntoIterator<Item = T>,
    to_record: impl Fn(T) -> Vec<String>,
) -> Result<usize> {
    let file = File::create(path).with_context(|| format!("Failed to create {path}"))?;
    let mut writer = CsvWriter::new(BufWriter::new(file));
    writer.write_record(columns)?;

    let mut count = 0;
    for row in rows {
        writer.write_record(&to_record(row))?;
        count += 1;
    }
    writer.into_inner().flush()?;
    Ok(count)
}

pub fn fusion_summary_record(row: &FusedDetection) -> Vec<String> {
    vec![
        row.image.clone(),
        row.class_name.clone(),
        fmt3(row.confidence),
        row.status.to_string(),
        row.ocr_text_raw.clone(),
        row.ocr_text_clean.clone(),
        fmt3(row.best_overlap),
        row.bbox.x1.to_string(),
        row.bbox.y1.to_string(),
        row.bbox.width().to_string(),
        row.bbox.height().to_string(),
    ]
}

pub fn enrichment_record(element: &EnrichedElement) -> Vec<String> {
    vec![
        element.image.clone(),
        element.semantic_class.clone(),
        element.semantic_type.clone(),
        fmt3(element.confidence),
        element.detector_class.clone(),
        fmt3(element.detector_confidence),
        element.ocr_text.clone(),
        fmt3(element.ocr_confidence),
        element.conflict.to_string(),
    ]
}

pub fn write_fusion_summary(rows: &[FusedDetection], path: &str) -> Result<usize> {
    write_table(path, &SUMMARY_COLUMNS, rows, fusion_summary_record)
}

pub fn write_enrichment(elements: &[EnrichedElement], path: &str) -> Result<usize> {
    write_table(path, &ENRICHMENT_COLUMNS, elements, enrichment_record)
}

/// One row per element node of the graph.
pub fn write_element_table(graph: &ElementGraph, path: &str) -> Result<usize> {
    write_table(path, &ELEMENT_COLUMNS, graph.element_nodes(), |node| {
        vec![
            node.id.clone(),
            node.image.clone(),
            node.semantic_class.clone(),
            node.semantic_type.clone(),
            node.ocr_text.clone(),
            fmt3(node.confidence),
        ]
    })
}

pub fn write_rule_summary(results: &[RuleResult], path: &str) -> Result<usize> {
    write_table(path, &RULE_SUMMARY_COLUMNS, summary_rows(results), |row| {
        vec![
            row.image,
            row.id,
            row.semantic_type,
            row.passed_checks,
            row.failed_checks,
        ]
    })
}

pub fn save_json<T: Serialize + ?Sized>(value: &T, path: &str) -> Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    std::fs::write(path, json).with_context(|| format!("Failed to write {path}"))?;
    Ok(())
}

fn read_json(path: &str) -> Result<Value> {
    let content = std::fs::read_to_string(path).with_context(|| format!("Failed to read {path}"))?;
    serde_json::from_str(&content).with_context(|| format!("Failed to parse JSON {path}"))
}

/// Rows from either a top-level array or an `image -> [rows]` object.
/// With the object form, rows without an `image` field get the key.
fn rows_by_image<T: DeserializeOwned>(value: Value, document: &str, expected: &str) -> Result<Vec<T>> {
    let rows: Vec<Value> = match value {
        Value::Array(rows) => rows,
        Value::Object(by_image) => {
            let mut rows = Vec::new();
            for (image, image_rows) in by_image {
                let Value::Array(image_rows) = image_rows else {
                    return Err(PlanfuseError::structure(document, expected).into());
                };
                for mut row in image_rows {
                    if let Value::Object(fields) = &mut row {
                        fields
                            .entry("image")
                            .or_insert_with(|| Value::String(image.clone()));
                    }
                    rows.push(row);
                }
            }
            rows
        }
        _ => return Err(PlanfuseError::structure(document, expected).into()),
    };

    rows.into_iter()
        .enumerate()
        .map(|(i, row)| {
            serde_json::from_value(row).with_context(|| format!("Invalid row {i} in {document}"))
        })
        .collect()
}

pub fn load_fused_detections(path: &str) -> Result<Vec<FusedDetection>> {
    rows_by_image(
        read_json(path)?,
        path,
        "an array of fused detections or an image -> detections object",
    )
}

pub fn load_enriched_elements(path: &str) -> Result<Vec<EnrichedElement>> {
    rows_by_image(
        read_json(path)?,
        path,
        "an array of enriched elements or an image -> elements object",
    )
}
