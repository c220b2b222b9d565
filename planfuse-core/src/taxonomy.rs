// Declarative mapping tables
//
// New semantic classes or languages are rows here or in the `taxonomy` config section.

use crate::text::{matches_expected_keyword, normalize_for_taxonomy, normalize_for_vocabulary};
use serde::{Deserialize, Serialize};

/// Target semantic class/type pair, e.g. `(Door, EXIT)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SemanticPair {
    pub semantic_class: String,
    pub semantic_type: String,
}

impl SemanticPair {
    pub fn new(semantic_class: &str, semantic_type: &str) -> Self {
        Self {
            semantic_class: semantic_class.to_string(),
            semantic_type: semantic_type.to_string(),
        }
    }
}

/// Detector class name -> semantic pair.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectorMapping {
    pub detector_class: String,
    #[serde(flatten)]
    pub target: SemanticPair,
}

/// One vocabulary key with its multilingual keywords and the pair it implies.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VocabularyEntry {
    pub key: String,
    /// Upper-case keywords, matched as substrings of the vocabulary-normalized text.
    pub keywords: Vec<String>,
    #[serde(flatten)]
    pub target: SemanticPair,
}

/// Keywords a detector class expects to see in its matched OCR text.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeywordPredicate {
    pub detector_class: String,
    /// Lower-case substrings; any one of them is enough.
    pub any_of: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Taxonomy {
    pub detector_map: Vec<DetectorMapping>,
    /// Ordered: the first entry with a matching keyword wins.
    pub vocabulary: Vec<VocabularyEntry>,
    pub keyword_predicates: Vec<KeywordPredicate>,
}

impl Default for Taxonomy {
    fn default() -> Self {
        let door = SemanticPair::new("Door", "EXIT");
        let stair = SemanticPair::new("Stair", "STAIR");
        let extinguisher = SemanticPair::new("FireSuppressionTerminal", "FIREEXTINGUISHER");
        let hydrant = SemanticPair::new("FireSuppressionTerminal", "HYDRANT");

        let detector = |class: &str, target: &SemanticPair| DetectorMapping {
            detector_class: class.to_string(),
            target: target.clone(),
        };
        let vocab = |key: &str, keywords: &[&str], target: &SemanticPair| VocabularyEntry {
            key: key.to_string(),
            keywords: keywords.iter().map(|k| k.to_string()).collect(),
            target: target.clone(),
        };
        let expects = |class: &str, any_of: &[&str]| KeywordPredicate {
            detector_class: class.to_string(),
            any_of: any_of.iter().map(|k| k.to_string()).collect(),
        };

        Self {
            detector_map: vec![
                detector("exit", &door),
                detector("stairs", &stair),
                detector("fire extinguisher", &extinguisher),
                detector("hydrant", &hydrant),
            ],
            vocabulary: vec![
                vocab("EXIT", &["EXIT", "AUSGANG", "NOTAUSGANG", "WAY OUT", "FLUCHTWEG"], &door),
                vocab("STAIRS", &["STAIR", "STAIRS", "TREP"], &stair),
                vocab(
                    "EXTINGUISHER",
                    &["FIRE EXTINGUISHER", "EXTINGUISHER", "FEUERLÖSCHER", "FEUERLOESCHER"],
                    &extinguisher,
                ),
                vocab("HYDRANT", &["HYDRANT", "WANDHYDRANT"], &hydrant),
            ],
            keyword_predicates: vec![
                expects("exit", &["exit"]),
                expects("stairs", &["stair"]),
                expects("fire extinguisher", &["extinguisher", "fire extinguisher"]),
                expects("hydrant", &["hydrant"]),
            ],
        }
    }
}

impl Taxonomy {
    /// Detector-implied pair for a (lower-case) detector class name.
    pub fn detector_pair(&self, detector_class: &str) -> Option<&SemanticPair> {
        self.detector_map
            .iter()
            .find(|m| m.detector_class == detector_class)
            .map(|m| &m.target)
    }

    /// Vocabulary entry whose keywords occur in `text`, if any.
    pub fn vocabulary_entry(&self, text: &str) -> Option<&VocabularyEntry> {
        let normalized = normalize_for_vocabulary(text);
        if normalized.trim().is_empty() {
            return None;
        }
        self.vocabulary.iter().find(|entry| {
            entry
                .keywords
                .iter()
                .any(|keyword| normalized.contains(keyword.as_str()))
        })
    }

    /// Text-implied pair for an OCR string, if the vocabulary recognizes it.
    pub fn text_pair(&self, text: &str) -> Option<&SemanticPair> {
        self.vocabulary_entry(text).map(|entry| &entry.target)
    }

    /// Whether `text` carries a keyword the detector class expects.
    /// Classes without a predicate never match.
    pub fn matches_expected_keyword(&self, detector_class: &str, text: &str) -> bool {
        let normalized = normalize_for_taxonomy(text);
        self.keyword_predicates
            .iter()
            .find(|p| p.detector_class == detector_class)
            .map(|p| matches_expected_keyword(&p.any_of, &normalized))
            .unwrap_or(false)
    }
}
