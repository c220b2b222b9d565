use crate::graphs::ElementNode;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Separator used when check lists are flattened into one table cell.
pub const CHECK_SEPARATOR: &str = ", ";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleResult {
    pub id: String,
    pub image: String,
    #[serde(rename = "type")]
    pub semantic_type: String,
    pub passed_checks: Vec<String>,
    pub failed_checks: Vec<String>,
}

impl RuleResult {
    pub fn for_node(node: &ElementNode) -> Self {
        Self {
            id: node.id.clone(),
            image: node.image.clone(),
            semantic_type: node.semantic_type.clone(),
            passed_checks: Vec::new(),
            failed_checks: Vec::new(),
        }
    }

    pub fn is_clean(&self) -> bool {
        self.failed_checks.is_empty()
    }
}

/// Flattened report row: `image, id, type, passed_checks, failed_checks`.
#[derive(Debug, Clone, PartialEq)]
pub struct RuleSummaryRow {
    pub image: String,
    pub id: String,
    pub semantic_type: String,
    pub passed_checks: String,
    pub failed_checks: String,
}

impl From<&RuleResult> for RuleSummaryRow {
    fn from(result: &RuleResult) -> Self {
        Self {
            image: result.image.clone(),
            id: result.id.clone(),
            semantic_type: result.semantic_type.clone(),
            passed_checks: result.passed_checks.join(CHECK_SEPARATOR),
            failed_checks: result.failed_checks.join(CHECK_SEPARATOR),
        }
    }
}

pub fn summary_rows(results: &[RuleResult]) -> Vec<RuleSummaryRow> {
    results.iter().map(RuleSummaryRow::from).collect()
}

/// Totals for the CLI summary.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RuleTotals {
    pub elements: usize,
    pub passed_checks: usize,
    pub failed_checks: usize,
    pub elements_with_failures: usize,
}

impl RuleTotals {
    pub fn from_results(results: &[RuleResult]) -> Self {
        results.iter().fold(Self::default(), |mut totals, r| {
            totals.elements += 1;
            totals.passed_checks += r.passed_checks.len();
            totals.failed_checks += r.failed_checks.len();
            if !r.is_clean() {
                totals.elements_with_failures += 1;
            }
            totals
        })
    }
}

pub fn save_rule_results(results: &[RuleResult], path: &str) -> Result<()> {
    let json = serde_json::to_string_pretty(results)?;
    std::fs::write(path, json).with_context(|| format!("Failed to write rule results to {path}"))?;
    Ok(())
}
