use crate::geometry::{to_axis_aligned_box, PixelBox};
use crate::text::{clean_ocr_text, OcrKeyword};
use serde::{Deserialize, Serialize};
use std::fmt;

/// The schema version stamped on every graph output.
/// Bump this when the output shape changes.
pub const SCHEMA_VERSION: &str = "0.1.0";

// ===== COLLABORATOR INPUT =====

/// One object detection in pixel coordinates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectionBox {
    pub class_id: u32,
    pub class_name: String,
    #[serde(flatten)]
    pub bbox: PixelBox,
    /// Detector score in [0, 1]; 1.0 when the label file has none.
    pub confidence: f64,
}

/// One text region exactly as the OCR collaborator returns it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OcrReading {
    pub polygon: Vec<[f64; 2]>,
    pub text: String,
    pub score: f64,
}

/// One OCR text region after keyword cleaning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OcrRegion {
    pub polygon: Vec<[f64; 2]>,
    pub text_raw: String,
    /// `None` when the region failed the confidence floor or maps to no keyword.
    pub text_clean: Option<OcrKeyword>,
    pub score: f64,
}

impl OcrRegion {
    pub fn from_reading(reading: OcrReading, min_confidence: f64) -> Self {
        let text_clean = clean_ocr_text(&reading.text, reading.score, min_confidence);
        Self {
            polygon: reading.polygon,
            text_raw: reading.text,
            text_clean,
            score: reading.score,
        }
    }

    pub fn bounding_box(&self) -> Option<PixelBox> {
        to_axis_aligned_box(&self.polygon)
    }
}

/// Everything the collaborators produced for one image.
#[derive(Debug, Clone)]
pub struct ImageAnnotations {
    pub image: String,
    pub width: u32,
    pub height: u32,
    pub detections: Vec<DetectionBox>,
    pub readings: Vec<OcrReading>,
}

// ===== FUSION =====

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchStatus {
    Validated,
    Conflict,
    NoText,
}

impl MatchStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            MatchStatus::Validated => "validated",
            MatchStatus::Conflict => "conflict",
            MatchStatus::NoText => "no_text",
        }
    }

    /// Presentation convention for overlays: validated=green, conflict=orange, no_text=yellow.
    pub fn display_color(&self) -> [u8; 3] {
        match self {
            MatchStatus::Validated => [0, 255, 0],
            MatchStatus::Conflict => [255, 165, 0],
            MatchStatus::NoText => [255, 255, 0],
        }
    }
}

impl fmt::Display for MatchStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of matching one detection against the OCR regions of its image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchResult {
    pub status: MatchStatus,
    pub matched_text_raw: String,
    pub matched_text_clean: String,
    pub best_overlap: f64,
    /// Score of the winning region; the OCR-confidence signal for later stages.
    pub ocr_score: Option<f64>,
}

impl Default for MatchResult {
    fn default() -> Self {
        Self {
            status: MatchStatus::NoText,
            matched_text_raw: String::new(),
            matched_text_clean: String::new(),
            best_overlap: 0.0,
            ocr_score: None,
        }
    }
}

/// Flat per-detection fusion record (one row of the fusion summary).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FusedDetection {
    pub image: String,
    #[serde(rename = "cls")]
    pub class_name: String,
    #[serde(default)]
    pub class_id: u32,
    #[serde(rename = "conf")]
    pub confidence: f64,
    pub status: MatchStatus,
    #[serde(rename = "ocr_raw", default)]
    pub ocr_text_raw: String,
    #[serde(rename = "ocr_clean", default)]
    pub ocr_text_clean: String,
    #[serde(rename = "best_iou", default)]
    pub best_overlap: f64,
    #[serde(default)]
    pub ocr_score: Option<f64>,
    #[serde(flatten)]
    pub bbox: PixelBox,
}

impl FusedDetection {
    pub fn new(image: &str, detection: &DetectionBox, result: MatchResult) -> Self {
        Self {
            image: image.to_string(),
            class_name: detection.class_name.clone(),
            class_id: detection.class_id,
            confidence: detection.confidence,
            status: result.status,
            ocr_text_raw: result.matched_text_raw,
            ocr_text_clean: result.matched_text_clean,
            best_overlap: result.best_overlap,
            ocr_score: result.ocr_score,
            bbox: detection.bbox,
        }
    }

    /// The OCR text later stages should read: cleaned keyword first, raw text otherwise.
    pub fn ocr_text(&self) -> &str {
        if !self.ocr_text_clean.is_empty() {
            &self.ocr_text_clean
        } else {
            &self.ocr_text_raw
        }
    }
}

// ===== SEMANTICS =====

/// A detection with its resolved semantic type. Immutable once created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnrichedElement {
    pub image: String,
    #[serde(rename = "ifc_class")]
    pub semantic_class: String,
    #[serde(rename = "ifc_type")]
    pub semantic_type: String,
    pub confidence: f64,
    #[serde(rename = "det_class")]
    pub detector_class: String,
    #[serde(rename = "det_conf")]
    pub detector_confidence: f64,
    #[serde(default)]
    pub ocr_text: String,
    #[serde(rename = "ocr_conf", default)]
    pub ocr_confidence: f64,
    #[serde(default)]
    pub conflict: bool,
}
