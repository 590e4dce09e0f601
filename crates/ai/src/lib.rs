//! `gunshot-ai`
//!
//! **Responsibility:** interpret raw inference output.
//!
//! This crate never talks to the inference service; it receives the bytes the
//! predictor returned and turns them into a notify/no-notify verdict.

pub mod analyzer;
pub mod binary;
pub mod result;

pub use analyzer::{Analyzer, ModelAnalyzer};
pub use binary::BinaryClassifier;
pub use result::{AnalyzeError, Verdict};
