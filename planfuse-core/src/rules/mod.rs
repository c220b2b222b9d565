// Per-node rule evaluation over an element graph
// - engine.rs: RuleEngine, the NodeRule trait, config-driven pipeline
// - checks.rs: built-in rules
// - report.rs: RuleResult and the flattened summary table

pub mod checks;
pub mod engine;
pub mod report;

pub use checks::{ExitOcrPresenceRule, FireExtinguisherConfidenceRule};
pub use engine::{CheckOutcome, NodeRule, RuleEngine};
pub use report::{save_rule_results, summary_rows, RuleResult, RuleSummaryRow, RuleTotals};
