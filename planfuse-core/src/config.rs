use crate::semantics::MappingPolicy;
use crate::taxonomy::Taxonomy;
use crate::text::DEFAULT_MIN_OCR_CONFIDENCE;
use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::warn;

// Default value functions for serde
fn default_true() -> bool {
    true
}

fn default_class_names() -> Vec<String> {
    ["exit", "fire extinguisher", "hydrant", "stairs"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanfuseConfig {
    /// Detector class id -> class name. Ids past the end become `class_<id>`.
    #[serde(default = "default_class_names")]
    pub class_names: Vec<String>,
    #[serde(default)]
    pub matching: MatchingConfig,
    #[serde(default)]
    pub mapping: MappingPolicy,
    #[serde(default)]
    pub taxonomy: Taxonomy,
    #[serde(default)]
    pub rules: RulesConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchingConfig {
    /// A region must overlap a detection by strictly more than this to match it
    pub overlap_threshold: f64,
    /// OCR regions scoring below this are ignored
    pub min_ocr_confidence: f64,
}

impl Default for MatchingConfig {
    fn default() -> Self {
        Self {
            overlap_threshold: 0.3,
            min_ocr_confidence: DEFAULT_MIN_OCR_CONFIDENCE,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RulesConfig {
    /// Rules to run, in order
    #[serde(default = "default_rule_pipeline")]
    pub pipeline: Vec<RuleConfig>,
    /// Fire extinguishers below this confidence fail their check
    #[serde(default = "default_fire_extinguisher_min_confidence")]
    pub fire_extinguisher_min_confidence: f64,
    /// Lower-case text an exit's OCR text must contain
    #[serde(default = "default_exit_keyword")]
    pub exit_keyword: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleConfig {
    /// Name of the rule
    pub name: String,
    /// Whether this rule is enabled
    #[serde(default = "default_true")]
    pub enabled: bool,
}

fn default_rule_pipeline() -> Vec<RuleConfig> {
    vec![
        RuleConfig {
            name: "FireExtinguisherConfidence".to_string(),
            enabled: true,
        },
        RuleConfig {
            name: "ExitOcrPresence".to_string(),
            enabled: true,
        },
    ]
}

fn default_fire_extinguisher_min_confidence() -> f64 {
    0.5
}

fn default_exit_keyword() -> String {
    "exit".to_string()
}

impl Default for RulesConfig {
    fn default() -> Self {
        Self {
            pipeline: default_rule_pipeline(),
            fire_extinguisher_min_confidence: default_fire_extinguisher_min_confidence(),
            exit_keyword: default_exit_keyword(),
        }
    }
}

impl Default for PlanfuseConfig {
    fn default() -> Self {
        Self {
            class_names: default_class_names(),
            matching: MatchingConfig::default(),
            mapping: MappingPolicy::default(),
            taxonomy: Taxonomy::default(),
            rules: RulesConfig::default(),
        }
    }
}

impl PlanfuseConfig {
    /// Load config from a YAML file
    pub fn load_from_file(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {path}"))?;
        let config: PlanfuseConfig = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse config file {path}"))?;
        Ok(config)
    }

    /// Load config with fallback to default
    pub fn load_with_fallback(path: Option<&str>) -> Self {
        match path {
            Some(p) => Self::load_from_file(p).unwrap_or_else(|e| {
                warn!("Failed to load config from {p}, using defaults: {e:#}");
                Self::default()
            }),
            None => Self::default(),
        }
    }

    /// Detector class name for a class id.
    pub fn class_name(&self, class_id: u32) -> String {
        self.class_names
            .get(class_id as usize)
            .cloned()
            .unwrap_or_else(|| format!("class_{class_id}"))
    }

    /// Parse a comma-separated class list (`"exit,fire extinguisher,..."`).
    pub fn set_class_names_from_csv(&mut self, classes: &str) {
        self.class_names = classes
            .split(',')
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty())
            .collect();
    }

    /// SHA-256 over the serialized config, stamped on outputs for reproducibility.
    pub fn config_hash(&self) -> Result<String> {
        let config_json = serde_json::to_string(self)
            .map_err(|e| anyhow!("Failed to serialize config for hashing: {}", e))?;

        let mut hasher = Sha256::new();
        hasher.update(config_json.as_bytes());
        Ok(format!("{:x}", hasher.finalize()))
    }
}
