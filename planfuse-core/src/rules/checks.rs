use super::engine::{CheckOutcome, NodeRule};
use crate::graphs::ElementNode;

/// Fire extinguishers must be detected with at least `min_confidence`.
pub struct FireExtinguisherConfidenceRule {
    min_confidence: f64,
}

impl FireExtinguisherConfidenceRule {
    pub const NAME: &'static str = "FireExtinguisherConfidence";
    pub const SEMANTIC_TYPE: &'static str = "FIREEXTINGUISHER";

    pub fn new(min_confidence: f64) -> Self {
        Self { min_confidence }
    }
}

impl NodeRule for FireExtinguisherConfidenceRule {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn evaluate(&self, node: &ElementNode) -> Option<CheckOutcome> {
        if node.semantic_type != Self::SEMANTIC_TYPE {
            return None;
        }
        Some(if node.confidence >= self.min_confidence {
            CheckOutcome::Passed("FireExtinguisher Confidence OK".to_string())
        } else {
            CheckOutcome::Failed("FireExtinguisher Confidence TOO LOW".to_string())
        })
    }
}

/// Exits must carry OCR text that mentions the exit keyword (case-insensitive).
pub struct ExitOcrPresenceRule {
    keyword: String,
}

impl ExitOcrPresenceRule {
    pub const NAME: &'static str = "ExitOcrPresence";
    pub const SEMANTIC_TYPE: &'static str = "EXIT";

    pub fn new(keyword: &str) -> Self {
        Self {
            keyword: keyword.to_lowercase(),
        }
    }
}

impl NodeRule for ExitOcrPresenceRule {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn evaluate(&self, node: &ElementNode) -> Option<CheckOutcome> {
        if node.semantic_type != Self::SEMANTIC_TYPE {
            return None;
        }
        Some(if node.ocr_text.to_lowercase().contains(&self.keyword) {
            CheckOutcome::Passed("Exit OCR OK".to_string())
        } else {
            CheckOutcome::Failed("Exit OCR MISSING".to_string())
        })
    }
}
