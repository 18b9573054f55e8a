//! Evaluation run configuration.
//!
//! All fields carry serde defaults so a partial JSON file (or none at
//! all) yields a usable configuration.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::Result;

/// Settings for one evaluation run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvalConfig {
    /// JSONL file of golden question/answer pairs.
    #[serde(default = "default_testdata_path")]
    pub testdata_path: PathBuf,
    /// Directory results are written into.
    #[serde(default = "default_results_dir")]
    pub results_dir: PathBuf,
    /// Optional JSON file of additional judged criteria.
    #[serde(default)]
    pub custom_metrics_path: Option<PathBuf>,
    /// Where synthesized goldens are written.
    #[serde(default = "default_synthetic_data_path")]
    pub synthetic_data_path: PathBuf,
    /// Maximum answer generations in flight at once.
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent: usize,
    /// Pause after each generation, for provider rate limits.
    #[serde(default = "default_throttle_secs")]
    pub throttle_secs: u64,
    /// Pass threshold applied to the built-in metrics.
    #[serde(default = "default_metric_threshold")]
    pub metric_threshold: f64,
    /// Result count requested from the pipeline under test.
    #[serde(default)]
    pub top: Option<usize>,
}

impl Default for EvalConfig {
    fn default() -> Self {
        Self {
            testdata_path: default_testdata_path(),
            results_dir: default_results_dir(),
            custom_metrics_path: None,
            synthetic_data_path: default_synthetic_data_path(),
            max_concurrent: default_max_concurrent(),
            throttle_secs: default_throttle_secs(),
            metric_threshold: default_metric_threshold(),
            top: None,
        }
    }
}

impl EvalConfig {
    /// Load from a JSON file; a missing file yields the defaults.
    pub fn from_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let raw = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }
}

fn default_testdata_path() -> PathBuf {
    PathBuf::from("evals/ground_truth.jsonl")
}

fn default_results_dir() -> PathBuf {
    PathBuf::from("evals/results")
}

fn default_synthetic_data_path() -> PathBuf {
    PathBuf::from("evals/synthetic.jsonl")
}

fn default_max_concurrent() -> usize {
    1
}

fn default_throttle_secs() -> u64 {
    30
}

fn default_metric_threshold() -> f64 {
    0.5
}
