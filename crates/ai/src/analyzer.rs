use gunshot_core::GUNSHOT_DETECTION;

use crate::binary::BinaryClassifier;
use crate::result::{AnalyzeError, Verdict};

/// Turns raw inference bytes into a verdict, keyed by model type.
///
/// Implementations must be stateless with respect to requests: one instance is
/// shared by every in-flight message.
pub trait Analyzer: Send + Sync + 'static {
    fn analyze(&self, model_type: &str, result: &[u8]) -> Result<Verdict, AnalyzeError>;
}

/// Analyzer that dispatches to a strategy per supported model.
#[derive(Debug, Copy, Clone, Default)]
pub struct ModelAnalyzer {
    gunshot: BinaryClassifier,
}

impl ModelAnalyzer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_gunshot_classifier(mut self, classifier: BinaryClassifier) -> Self {
        self.gunshot = classifier;
        self
    }
}

impl Analyzer for ModelAnalyzer {
    fn analyze(&self, model_type: &str, result: &[u8]) -> Result<Verdict, AnalyzeError> {
        match model_type {
            GUNSHOT_DETECTION => self.gunshot.classify(result),
            other => Err(AnalyzeError::UnknownModelType(other.to_string())),
        }
    }
}
