//! Evaluation runner: bounded-concurrency answer generation, metric
//! measurement, and result persistence.

use async_trait::async_trait;
use chrono::Utc;
use futures::future;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tracing::{error, info, warn};

use sourcerer_core::approaches::Approach;
use sourcerer_core::providers::{AuthClaims, SearchRequest};
use sourcerer_core::retrieval::Retriever;
use sourcerer_core::types::AnswerOutcome;
use sourcerer_core::RequestOverrides;

use crate::cases::{
    EvaluationCase, GeneratedAnswer, Golden, read_custom_metrics, read_test_cases,
    write_test_cases,
};
use crate::config::EvalConfig;
use crate::error::{EvalError, Result};
use crate::judge::LlmJudge;
use crate::metrics::{Metric, MetricScore, metric_battery};

/// Produces an answer for a golden question from the system under test.
///
/// Failures are arbitrary caller errors; the runner wraps them and
/// aborts the batch.
#[async_trait]
pub trait AnswerGenerator: Send + Sync {
    async fn answer(&self, question: &str) -> anyhow::Result<GeneratedAnswer>;
}

/// Synthesizes golden question/answer pairs from source passages, for
/// bootstrapping a test set when no hand-curated one exists.
#[async_trait]
pub trait GoldenGenerator: Send + Sync {
    async fn synthesize(&self, contexts: &[Vec<String>]) -> anyhow::Result<Vec<Golden>>;
}

/// Runs an orchestration approach as the system under test, taking its
/// answer text and grounding data points.
pub struct ApproachGenerator {
    approach: Arc<dyn Approach>,
    overrides: RequestOverrides,
}

impl ApproachGenerator {
    pub fn new(approach: Arc<dyn Approach>, overrides: RequestOverrides) -> Self {
        Self {
            approach,
            overrides,
        }
    }
}

#[async_trait]
impl AnswerGenerator for ApproachGenerator {
    async fn answer(&self, question: &str) -> anyhow::Result<GeneratedAnswer> {
        let messages = vec![sourcerer_core::ChatMessage::user(question)];
        let outcome = self
            .approach
            .run(&messages, &self.overrides, &AuthClaims::default(), false)
            .await?;
        match outcome {
            AnswerOutcome::Immediate(answer) => Ok(GeneratedAnswer {
                answer: answer
                    .message
                    .content
                    .as_text()
                    .unwrap_or_default()
                    .to_string(),
                retrieval_context: answer.context.data_points.text,
            }),
            AnswerOutcome::Streaming { .. } => {
                anyhow::bail!("evaluation requires non-streamed answers")
            }
        }
    }
}

/// One case's full result: the materialized case plus every metric.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct CaseResult {
    #[serde(flatten)]
    pub case: EvaluationCase,
    pub metrics: Vec<MetricScore>,
}

impl CaseResult {
    pub fn all_passed(&self) -> bool {
        self.metrics.iter().all(|m| m.passed)
    }
}

/// A finished run: per-case results in golden order, plus run metadata.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct EvaluationReport {
    pub metadata: ReportMetadata,
    pub results: Vec<CaseResult>,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct ReportMetadata {
    pub timestamp: String,
    pub num_cases: usize,
    pub judge_model: String,
}

/// Measures a batch of goldens against the metric battery.
pub struct RagEvaluator {
    judge: LlmJudge,
    metrics: Vec<Box<dyn Metric>>,
    max_concurrent: usize,
    throttle: Duration,
}

impl RagEvaluator {
    pub fn new(
        judge: LlmJudge,
        metrics: Vec<Box<dyn Metric>>,
        max_concurrent: usize,
        throttle: Duration,
    ) -> Self {
        Self {
            judge,
            metrics,
            max_concurrent: max_concurrent.max(1),
            throttle,
        }
    }

    /// Generate an answer for every golden, at most `max_concurrent` in
    /// flight, sleeping `throttle` after each generation while still
    /// holding its slot. Results come back in golden order; the first
    /// failure aborts the whole batch.
    pub async fn process_goldens(
        &self,
        generator: &dyn AnswerGenerator,
        goldens: &[Golden],
    ) -> Result<Vec<EvaluationCase>> {
        let semaphore = Arc::new(Semaphore::new(self.max_concurrent));
        let throttle = self.throttle;
        let tasks = goldens.iter().map(|golden| {
            let semaphore = Arc::clone(&semaphore);
            async move {
                let _permit = semaphore
                    .acquire()
                    .await
                    .map_err(|e| EvalError::Pipeline(e.to_string()))?;
                let generated = generator
                    .answer(&golden.input)
                    .await
                    .map_err(|e| EvalError::Pipeline(e.to_string()))?;
                if !throttle.is_zero() {
                    tokio::time::sleep(throttle).await;
                }
                Ok::<EvaluationCase, EvalError>(EvaluationCase::from_golden(golden, generated))
            }
        });
        future::try_join_all(tasks).await
    }

    /// Measure every metric for every case, cases admitted through the
    /// same concurrency gate as generation, metrics in battery order
    /// within a case. Results keep case order.
    pub async fn evaluate(&self, cases: Vec<EvaluationCase>) -> Result<Vec<CaseResult>> {
        let semaphore = Arc::new(Semaphore::new(self.max_concurrent));
        let tasks = cases.into_iter().map(|case| {
            let semaphore = Arc::clone(&semaphore);
            async move {
                let _permit = semaphore
                    .acquire()
                    .await
                    .map_err(|e| EvalError::Pipeline(e.to_string()))?;
                let mut scores = Vec::with_capacity(self.metrics.len());
                for metric in &self.metrics {
                    let score = metric.measure(&case, &self.judge).await?;
                    if !score.passed {
                        warn!(
                            metric = %score.name,
                            score = score.score,
                            threshold = score.threshold,
                            input = %case.input,
                            "Metric below threshold"
                        );
                    }
                    scores.push(score);
                }
                Ok::<CaseResult, EvalError>(CaseResult {
                    case,
                    metrics: scores,
                })
            }
        });
        future::try_join_all(tasks).await
    }

    pub fn judge(&self) -> &LlmJudge {
        &self.judge
    }
}

/// Persist a report as pretty-printed JSON under `results_dir`,
/// creating the directory as needed. Returns the written path.
pub fn save_results(report: &EvaluationReport, results_dir: &Path) -> Result<PathBuf> {
    std::fs::create_dir_all(results_dir)?;
    let filename = format!(
        "eval_{}.json",
        report.metadata.timestamp.replace([':', '.'], "-")
    );
    let path = results_dir.join(filename);
    let rendered = serde_json::to_string_pretty(report)?;
    std::fs::write(&path, rendered)?;
    Ok(path)
}

/// Passages sampled for golden synthesis when no `top` is configured.
const DEFAULT_SAMPLE_TOP: usize = 10;

/// End-to-end evaluation: load goldens and custom metrics, generate
/// answers, measure, and persist.
pub struct EvaluationPipeline {
    config: EvalConfig,
    evaluator: RagEvaluator,
}

impl EvaluationPipeline {
    pub fn new(config: EvalConfig, judge: LlmJudge) -> Result<Self> {
        let customs = match &config.custom_metrics_path {
            Some(path) => read_custom_metrics(path)?,
            None => Vec::new(),
        };
        let metrics = metric_battery(config.metric_threshold, &customs);
        let evaluator = RagEvaluator::new(
            judge,
            metrics,
            config.max_concurrent,
            Duration::from_secs(config.throttle_secs),
        );
        Ok(Self { config, evaluator })
    }

    /// Sample passages from the index and synthesize a golden set,
    /// persisting it to the configured synthetic data path.
    pub async fn synthesize_goldens(
        &self,
        retriever: &Retriever,
        generator: &dyn GoldenGenerator,
    ) -> Result<Vec<Golden>> {
        let documents = retriever
            .search(&SearchRequest {
                top: self.config.top.unwrap_or(DEFAULT_SAMPLE_TOP),
                query_text: Some("*".to_string()),
                ..Default::default()
            })
            .await
            .map_err(|e| EvalError::Core(e.into()))?;
        let contexts: Vec<Vec<String>> = documents
            .iter()
            .map(|doc| vec![doc.content.clone()])
            .collect();
        let goldens = generator
            .synthesize(&contexts)
            .await
            .map_err(|e| EvalError::Pipeline(e.to_string()))?;
        write_test_cases(&self.config.synthetic_data_path, &goldens)?;
        info!(
            num_goldens = goldens.len(),
            path = %self.config.synthetic_data_path.display(),
            "Synthesized golden set"
        );
        Ok(goldens)
    }

    /// Run the full pipeline over the configured test data file and
    /// write the report. Returns the report and the path it was saved
    /// to.
    pub async fn run(
        &self,
        generator: &dyn AnswerGenerator,
    ) -> Result<(EvaluationReport, PathBuf)> {
        let goldens = read_test_cases(&self.config.testdata_path)?;
        self.run_goldens(generator, &goldens).await
    }

    /// Synthesize a golden set from the index and evaluate it in the
    /// same run: sample, persist, generate answers, score, report.
    pub async fn run_synthesized(
        &self,
        retriever: &Retriever,
        golden_generator: &dyn GoldenGenerator,
        generator: &dyn AnswerGenerator,
    ) -> Result<(EvaluationReport, PathBuf)> {
        let goldens = self.synthesize_goldens(retriever, golden_generator).await?;
        self.run_goldens(generator, &goldens).await
    }

    /// Evaluate an in-memory golden set and write the report. A batch
    /// failure is logged here and re-raised to the caller.
    pub async fn run_goldens(
        &self,
        generator: &dyn AnswerGenerator,
        goldens: &[Golden],
    ) -> Result<(EvaluationReport, PathBuf)> {
        info!(
            num_goldens = goldens.len(),
            max_concurrent = self.config.max_concurrent,
            "Starting evaluation run"
        );

        let results = match self.score_goldens(generator, goldens).await {
            Ok(results) => results,
            Err(err) => {
                error!(error = %err, "Evaluation run failed");
                return Err(err);
            }
        };

        let report = EvaluationReport {
            metadata: ReportMetadata {
                timestamp: Utc::now().to_rfc3339(),
                num_cases: results.len(),
                judge_model: self.evaluator.judge().model_name().to_string(),
            },
            results,
        };
        let path = save_results(&report, &self.config.results_dir)?;
        info!(path = %path.display(), "Evaluation results saved");
        Ok((report, path))
    }

    async fn score_goldens(
        &self,
        generator: &dyn AnswerGenerator,
        goldens: &[Golden],
    ) -> Result<Vec<CaseResult>> {
        let cases = self.evaluator.process_goldens(generator, goldens).await?;
        self.evaluator.evaluate(cases).await
    }
}
