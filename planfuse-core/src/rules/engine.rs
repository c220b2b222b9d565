use super::checks::{ExitOcrPresenceRule, FireExtinguisherConfidenceRule};
use super::report::RuleResult;
use crate::config::RulesConfig;
use crate::graphs::{ElementGraph, ElementNode};
use tracing::{debug, info, warn};

/// Result of one applicable rule on one node; the label goes to the passed or failed list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckOutcome {
    Passed(String),
    Failed(String),
}

/// A per-node rule. Rules see one node's attributes only.
pub trait NodeRule {
    fn name(&self) -> &str;

    /// `None` when the rule does not apply to this node.
    fn evaluate(&self, node: &ElementNode) -> Option<CheckOutcome>;
}

pub struct RuleEngine {
    rules: Vec<Box<dyn NodeRule>>,
}

impl Default for RuleEngine {
    fn default() -> Self {
        Self::from_config(&RulesConfig::default())
    }
}

impl RuleEngine {
    pub fn new(rules: Vec<Box<dyn NodeRule>>) -> Self {
        Self { rules }
    }

    /// Build the rule pipeline from config, in config order.
    pub fn from_config(config: &RulesConfig) -> Self {
        let mut rules: Vec<Box<dyn NodeRule>> = Vec::new();

        for rule_config in &config.pipeline {
            if !rule_config.enabled {
                debug!("⏭️  Skipping disabled rule: {}", rule_config.name);
                continue;
            }
            match Self::rule_by_name(&rule_config.name, config) {
                Some(rule) => rules.push(rule),
                None => warn!("⚠️  Unknown rule: {}. Skipping...", rule_config.name),
            }
        }

        Self { rules }
    }

    fn rule_by_name(name: &str, config: &RulesConfig) -> Option<Box<dyn NodeRule>> {
        match name {
            FireExtinguisherConfidenceRule::NAME => Some(Box::new(
                FireExtinguisherConfidenceRule::new(config.fire_extinguisher_min_confidence),
            )),
            ExitOcrPresenceRule::NAME => {
                Some(Box::new(ExitOcrPresenceRule::new(&config.exit_keyword)))
            }
            _ => None,
        }
    }

    /// Add a rule after the configured ones.
    pub fn push_rule(&mut self, rule: Box<dyn NodeRule>) {
        self.rules.push(rule);
    }

    pub fn rule_names(&self) -> Vec<&str> {
        self.rules.iter().map(|r| r.name()).collect()
    }

    pub fn evaluate_node(&self, node: &ElementNode) -> RuleResult {
        let mut result = RuleResult::for_node(node);
        for rule in &self.rules {
            match rule.evaluate(node) {
                Some(CheckOutcome::Passed(label)) => result.passed_checks.push(label),
                Some(CheckOutcome::Failed(label)) => result.failed_checks.push(label),
                None => {}
            }
        }
        result
    }

    /// One result per element node, in node order. Image nodes are not evaluated.
    pub fn evaluate(&self, graph: &ElementGraph) -> Vec<RuleResult> {
        info!(
            "🔗 Running {} rules over {} nodes",
            self.rules.len(),
            graph.nodes.len()
        );
        let results: Vec<RuleResult> = graph
            .element_nodes()
            .map(|node| self.evaluate_node(node))
            .collect();

        let failing = results.iter().filter(|r| !r.failed_checks.is_empty()).count();
        info!("✅ {} elements checked, {} with failures", results.len(), failing);
        results
    }
}
