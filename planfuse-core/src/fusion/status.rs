use super::matcher::RegionMatch;
use crate::taxonomy::Taxonomy;
use crate::types::{MatchResult, MatchStatus};

/// Label a detection from its winning region.
///
/// - no region: `no_text`
/// - region text carries the keyword the class expects: `validated`
/// - otherwise: `conflict`
pub fn classify(
    taxonomy: &Taxonomy,
    class_name: &str,
    winner: Option<RegionMatch<'_>>,
) -> MatchResult {
    let Some(winner) = winner else {
        return MatchResult::default();
    };

    let clean = winner
        .region
        .text_clean
        .map(|k| k.as_str().to_string())
        .unwrap_or_default();

    let class_name = class_name.trim().to_lowercase();
    let status = if taxonomy.matches_expected_keyword(&class_name, &clean) {
        MatchStatus::Validated
    } else {
        MatchStatus::Conflict
    };

    MatchResult {
        status,
        matched_text_raw: winner.region.text_raw.clone(),
        matched_text_clean: clean,
        best_overlap: winner.overlap,
        ocr_score: Some(winner.region.score),
    }
}
