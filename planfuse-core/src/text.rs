// OCR text normalization
//
// Three normal forms are used by the pipeline:
// - keyword cleaning: raw OCR string -> one of a fixed set of sign keywords (or nothing)
// - taxonomy form: lower-case ASCII words, used by the per-class keyword predicates
// - vocabulary form: upper-case, used to look text up in the multilingual vocabulary

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::LazyLock;

/// Default minimum OCR score for a region to be considered at all.
pub const DEFAULT_MIN_OCR_CONFIDENCE: f64 = 0.3;

/// The keyword set OCR regions are cleaned into before spatial matching.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OcrKeyword {
    #[serde(rename = "EXIT")]
    Exit,
    #[serde(rename = "STAIRS")]
    Stairs,
    #[serde(rename = "FIRE_EXTINGUISHER")]
    FireExtinguisher,
}

impl OcrKeyword {
    pub fn as_str(&self) -> &'static str {
        match self {
            OcrKeyword::Exit => "EXIT",
            OcrKeyword::Stairs => "STAIRS",
            OcrKeyword::FireExtinguisher => "FIRE_EXTINGUISHER",
        }
    }
}

impl fmt::Display for OcrKeyword {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Clean a raw OCR string into a sign keyword.
///
/// Returns `None` when `confidence < min_confidence` or when the text maps to no keyword.
/// The substring checks are ordered and only the first hit counts:
/// "EXIT", then "STAIR", then "EXT" or "FIRE".
pub fn clean_ocr_text(text: &str, confidence: f64, min_confidence: f64) -> Option<OcrKeyword> {
    if confidence < min_confidence {
        return None;
    }

    let text = text.trim().to_uppercase();
    if text.contains("EXIT") {
        Some(OcrKeyword::Exit)
    } else if text.contains("STAIR") {
        Some(OcrKeyword::Stairs)
    } else if text.contains("EXT") || text.contains("FIRE") {
        Some(OcrKeyword::FireExtinguisher)
    } else {
        None
    }
}

static NON_WORD_CHARS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[^a-z0-9 ]+").unwrap());

static WHITESPACE_RUNS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());

/// Lower-case, replace everything outside `[a-z0-9 ]` by a space, collapse whitespace, trim.
///
/// `"FIRE_EXTINGUISHER"` becomes `"fire extinguisher"`.
pub fn normalize_for_taxonomy(text: &str) -> String {
    let lowered = text.to_lowercase();
    let stripped = NON_WORD_CHARS.replace_all(&lowered, " ");
    WHITESPACE_RUNS
        .replace_all(&stripped, " ")
        .trim()
        .to_string()
}

/// True when the taxonomy-normalized text contains any of the expected keywords.
pub fn matches_expected_keyword(expected: &[String], normalized_text: &str) -> bool {
    expected
        .iter()
        .any(|keyword| normalized_text.contains(keyword.as_str()))
}

/// Upper-case and keep only letters, digits, whitespace, `/`, `-` and `→`.
///
/// Letters are kept in full Unicode so that e.g. "Feuerlöscher" survives.
pub fn normalize_for_vocabulary(text: &str) -> String {
    text.to_uppercase()
        .chars()
        .filter(|c| c.is_alphanumeric() || c.is_whitespace() || matches!(c, '/' | '-' | '→'))
        .collect()
}
