use crate::result::{AnalyzeError, Verdict};

/// Single-probability classifier output, e.g. `[0.83]`.
///
/// The verdict is positive only when the probability is strictly above the
/// threshold; a score equal to the threshold is negative.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct BinaryClassifier {
    threshold: f64,
}

impl Default for BinaryClassifier {
    fn default() -> Self {
        Self { threshold: 0.5 }
    }
}

impl BinaryClassifier {
    pub fn new(threshold: f64) -> Self {
        Self { threshold }
    }

    pub fn classify(&self, result: &[u8]) -> Result<Verdict, AnalyzeError> {
        let [probability]: [f64; 1] = serde_json::from_slice(result)?;
        tracing::debug!(probability, threshold = self.threshold, "binary classification");
        Ok(Verdict::new(probability > self.threshold, probability))
    }
}
