// Detection/OCR fusion
//
// - matcher.rs: spatial matching of detection boxes to cleaned OCR regions
// - status.rs: validated / conflict / no_text labelling of each match

pub mod matcher;
pub mod status;

pub use matcher::{best_region, match_regions, RegionMatch};
pub use status::classify;

use crate::config::PlanfuseConfig;
use crate::types::{FusedDetection, ImageAnnotations, MatchStatus, OcrRegion};
use std::collections::BTreeMap;
use tracing::debug;

/// Fuse one image: clean its OCR readings, match every detection, classify each match.
/// Returns exactly one row per detection, in detection order.
pub fn fuse_image(annotations: &ImageAnnotations, config: &PlanfuseConfig) -> Vec<FusedDetection> {
    let regions: Vec<OcrRegion> = annotations
        .readings
        .iter()
        .cloned()
        .map(|reading| OcrRegion::from_reading(reading, config.matching.min_ocr_confidence))
        .collect();
    let usable = regions.iter().filter(|r| r.text_clean.is_some()).count();
    debug!(
        "{}: {} detections, {} of {} OCR regions usable",
        annotations.image,
        annotations.detections.len(),
        usable,
        regions.len()
    );

    let winners = match_regions(
        &annotations.detections,
        &regions,
        config.matching.overlap_threshold,
    );

    annotations
        .detections
        .iter()
        .zip(winners)
        .map(|(detection, winner)| {
            let result = classify(&config.taxonomy, &detection.class_name, winner);
            FusedDetection::new(&annotations.image, detection, result)
        })
        .collect()
}

/// Row counts per (detector class, status), sorted for stable printing.
pub fn status_counts(rows: &[FusedDetection]) -> BTreeMap<(String, MatchStatus), usize> {
    let mut counts = BTreeMap::new();
    for row in rows {
        *counts
            .entry((row.class_name.clone(), row.status))
            .or_insert(0) += 1;
    }
    counts
}
