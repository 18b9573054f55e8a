//! Golden test data and evaluation cases.
//!
//! A `Golden` is a curated question with its expected answer; running
//! the pipeline under test against a golden produces an
//! `EvaluationCase` holding everything the judged metrics need.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{EvalError, Result};

/// One curated question/expected-answer pair.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Golden {
    pub input: String,
    pub expected_output: String,
    /// Source passages the golden was authored (or synthesized) from.
    #[serde(default)]
    pub context: Vec<String>,
}

/// The pipeline-under-test's output for one golden question.
#[derive(Debug, Clone)]
pub struct GeneratedAnswer {
    pub answer: String,
    /// The formatted source lines the answer was grounded on.
    pub retrieval_context: Vec<String>,
}

/// A fully materialized case, ready for metric measurement.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluationCase {
    pub input: String,
    pub actual_output: String,
    pub expected_output: String,
    #[serde(default)]
    pub context: Vec<String>,
    pub retrieval_context: Vec<String>,
}

impl EvaluationCase {
    pub fn from_golden(golden: &Golden, generated: GeneratedAnswer) -> Self {
        Self {
            input: golden.input.clone(),
            actual_output: generated.answer,
            expected_output: golden.expected_output.clone(),
            context: golden.context.clone(),
            retrieval_context: generated.retrieval_context,
        }
    }
}

/// A caller-supplied judged criterion, loaded from a JSON side file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CustomMetricSpec {
    pub name: String,
    /// Natural-language criterion handed to the judge verbatim.
    pub description: String,
    #[serde(default = "default_custom_threshold")]
    pub threshold: f64,
}

fn default_custom_threshold() -> f64 {
    0.5
}

/// Read goldens from a JSONL file, one object per non-empty line.
pub fn read_test_cases(path: &Path) -> Result<Vec<Golden>> {
    if !path.exists() {
        return Err(EvalError::FileNotFound {
            path: path.to_path_buf(),
        });
    }
    let raw = std::fs::read_to_string(path)?;
    raw.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(|line| serde_json::from_str(line).map_err(EvalError::from))
        .collect()
}

/// Write goldens as JSONL, one object per line.
pub fn write_test_cases(path: &Path, goldens: &[Golden]) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let mut out = String::new();
    for golden in goldens {
        out.push_str(&serde_json::to_string(golden)?);
        out.push('\n');
    }
    std::fs::write(path, out)?;
    Ok(())
}

/// Read custom metric specs from a JSON array file.
pub fn read_custom_metrics(path: &Path) -> Result<Vec<CustomMetricSpec>> {
    if !path.exists() {
        return Err(EvalError::FileNotFound {
            path: path.to_path_buf(),
        });
    }
    let raw = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&raw)?)
}
