//! Sourcerer evaluation: LLM-judged quality measurement for the
//! retrieval pipeline.
//!
//! A run reads golden question/answer pairs from a JSONL file, asks
//! the system under test to answer each one with bounded concurrency,
//! scores every answer against a fixed battery of judged metrics (plus
//! optional custom criteria), and writes a pretty-printed JSON report.

pub mod cases;
pub mod config;
pub mod error;
pub mod judge;
pub mod metrics;
pub mod runner;

pub use cases::{
    CustomMetricSpec, EvaluationCase, GeneratedAnswer, Golden, read_custom_metrics,
    read_test_cases, write_test_cases,
};
pub use config::EvalConfig;
pub use error::{EvalError, Result};
pub use judge::LlmJudge;
pub use metrics::{Metric, MetricScore, metric_battery};
pub use runner::{
    AnswerGenerator, ApproachGenerator, CaseResult, EvaluationPipeline, EvaluationReport,
    GoldenGenerator, RagEvaluator, save_results,
};

/// Install a formatted tracing subscriber honoring `RUST_LOG`.
///
/// Intended for evaluation binaries and harnesses; calling it twice is
/// harmless.
pub fn init_tracing() {
    use tracing_subscriber::EnvFilter;

    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .try_init();
}
