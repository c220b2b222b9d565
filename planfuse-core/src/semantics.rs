// Semantic mapping: detector class + OCR text -> semantic class/type
//
// OCR text is corroborating evidence. Agreement boosts the detector's confidence;
// disagreement only overrides the detector when the detector is unsure and the OCR
// signal (when there is one) is strong. Everything else is kept as a flagged conflict.

use crate::config::PlanfuseConfig;
use crate::taxonomy::{SemanticPair, Taxonomy};
use crate::types::{EnrichedElement, FusedDetection};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Thresholds for resolving detector/text disagreements.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MappingPolicy {
    /// Detector confidence at or below which text may override the detector
    pub low_detector_confidence: f64,
    /// OCR confidence the text needs to override. `None` gates on the detector alone.
    pub high_ocr_confidence: Option<f64>,
    /// Added to the detector confidence when text agrees, capped at 1.0
    pub corroboration_boost: f64,
}

impl Default for MappingPolicy {
    fn default() -> Self {
        Self {
            low_detector_confidence: 0.45,
            high_ocr_confidence: Some(0.65),
            corroboration_boost: 0.2,
        }
    }
}

impl MappingPolicy {
    /// Detector-only variant: no OCR-confidence gate.
    pub fn detector_only() -> Self {
        Self {
            high_ocr_confidence: None,
            ..Self::default()
        }
    }

    /// Whether text-implied semantics may replace detector-implied semantics.
    /// The OCR gate only applies when both a threshold and a signal are present.
    pub fn allows_override(&self, detector_confidence: f64, ocr_confidence: Option<f64>) -> bool {
        if detector_confidence > self.low_detector_confidence {
            return false;
        }
        match (self.high_ocr_confidence, ocr_confidence) {
            (Some(min_ocr), Some(ocr)) => ocr >= min_ocr,
            _ => true,
        }
    }

    pub fn boosted(&self, detector_confidence: f64) -> f64 {
        (detector_confidence + self.corroboration_boost).min(1.0)
    }
}

/// How a detection's semantics were decided.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    /// No text-implied pair; detector semantics kept as-is
    DetectorOnly,
    /// Text agrees with the detector; confidence boosted
    Corroborated,
    /// Text disagrees and won
    Overridden,
    /// Text disagrees and lost; flagged
    Conflict,
}

/// One detection as the mapper sees it.
#[derive(Debug, Clone)]
pub struct MappingInput<'a> {
    pub image: &'a str,
    pub detector_class: &'a str,
    pub detector_confidence: f64,
    pub ocr_text: &'a str,
    pub ocr_confidence: Option<f64>,
}

impl<'a> From<&'a FusedDetection> for MappingInput<'a> {
    fn from(row: &'a FusedDetection) -> Self {
        let ocr_text = row.ocr_text();
        Self {
            image: &row.image,
            detector_class: &row.class_name,
            detector_confidence: row.confidence,
            ocr_text,
            ocr_confidence: if ocr_text.is_empty() { None } else { row.ocr_score },
        }
    }
}

pub struct SemanticMapper {
    taxonomy: Taxonomy,
    policy: MappingPolicy,
}

impl SemanticMapper {
    pub fn new(taxonomy: Taxonomy, policy: MappingPolicy) -> Self {
        Self { taxonomy, policy }
    }

    pub fn from_config(config: &PlanfuseConfig) -> Self {
        Self::new(config.taxonomy.clone(), config.mapping.clone())
    }

    /// Resolve one detection. `None` when the detector class has no semantic mapping.
    pub fn map(&self, input: &MappingInput<'_>) -> Option<(EnrichedElement, Resolution)> {
        let detector_class = input.detector_class.trim().to_lowercase();
        let Some(detector_pair) = self.taxonomy.detector_pair(&detector_class) else {
            debug!(
                "{}: no semantic mapping for detector class '{}', skipping",
                input.image, detector_class
            );
            return None;
        };

        let text_pair = self.taxonomy.text_pair(input.ocr_text);
        let (chosen, resolution) = self.resolve(detector_pair, text_pair, input);

        let confidence = match resolution {
            Resolution::Corroborated => self.policy.boosted(input.detector_confidence),
            _ => input.detector_confidence,
        };

        if matches!(resolution, Resolution::Overridden | Resolution::Conflict) {
            debug!(
                "{}: {} ({:.2}) vs text '{}' -> {:?}",
                input.image, detector_class, input.detector_confidence, input.ocr_text, resolution
            );
        }

        let element = EnrichedElement {
            image: input.image.to_string(),
            semantic_class: chosen.semantic_class.clone(),
            semantic_type: chosen.semantic_type.clone(),
            confidence,
            detector_class,
            detector_confidence: input.detector_confidence,
            ocr_text: input.ocr_text.to_string(),
            ocr_confidence: input.ocr_confidence.unwrap_or(0.0),
            conflict: resolution == Resolution::Conflict,
        };
        Some((element, resolution))
    }

    fn resolve<'t>(
        &self,
        detector_pair: &'t SemanticPair,
        text_pair: Option<&'t SemanticPair>,
        input: &MappingInput<'_>,
    ) -> (&'t SemanticPair, Resolution) {
        match text_pair {
            None => (detector_pair, Resolution::DetectorOnly),
            Some(text_pair) if text_pair == detector_pair => {
                (detector_pair, Resolution::Corroborated)
            }
            Some(text_pair) => {
                if self
                    .policy
                    .allows_override(input.detector_confidence, input.ocr_confidence)
                {
                    (text_pair, Resolution::Overridden)
                } else {
                    (detector_pair, Resolution::Conflict)
                }
            }
        }
    }

    /// Map every fused row. Rows with unmapped detector classes are dropped.
    pub fn map_all(&self, rows: &[FusedDetection]) -> Vec<EnrichedElement> {
        rows.iter()
            .filter_map(|row| self.map(&MappingInput::from(row)))
            .map(|(element, _)| element)
            .collect()
    }
}
