use thiserror::Error;

/// Errors callers may want to match on. Everything else travels as `anyhow::Error`.
#[derive(Debug, Error)]
pub enum PlanfuseError {
    /// A loaded document does not have the top-level shape a stage needs.
    /// Fatal for that load step: downstream stages cannot run on an unknown schema.
    #[error("unexpected structure in {document}: expected {expected}")]
    Structure { document: String, expected: String },

    #[error("no OCR document for image {image}")]
    MissingOcr { image: String },

    #[error("no detector labels for image {image}")]
    MissingLabels { image: String },

    #[error("unusable annotations for image {image}: {reason}")]
    InvalidAnnotation { image: String, reason: String },
}

impl PlanfuseError {
    pub fn structure(document: impl Into<String>, expected: impl Into<String>) -> Self {
        Self::Structure {
            document: document.into(),
            expected: expected.into(),
        }
    }
}
