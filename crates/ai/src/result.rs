use thiserror::Error;

/// Outcome of analyzing one inference result.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Verdict {
    /// Whether the result is worth a notification.
    pub notify: bool,

    /// Model score the decision was based on.
    pub score: f64,
}

impl Verdict {
    pub fn new(notify: bool, score: f64) -> Self {
        Self { notify, score }
    }
}

#[derive(Debug, Error)]
pub enum AnalyzeError {
    #[error("unknown model type: {0}")]
    UnknownModelType(String),

    #[error("can't analyze result: {0}")]
    Parse(#[from] serde_json::Error),
}
