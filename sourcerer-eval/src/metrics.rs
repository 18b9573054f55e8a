//! Judged quality metrics.
//!
//! Every run measures the same five retrieval/answer metrics, in a
//! fixed order, optionally followed by caller-defined criteria loaded
//! from a side file. Each metric is one judge call.

use async_trait::async_trait;

use crate::cases::{CustomMetricSpec, EvaluationCase};
use crate::error::Result;
use crate::judge::LlmJudge;

/// One metric's outcome for one case.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct MetricScore {
    pub name: String,
    pub score: f64,
    pub threshold: f64,
    pub passed: bool,
}

/// A judged quality measure over an evaluation case.
#[async_trait]
pub trait Metric: Send + Sync {
    fn name(&self) -> &str;
    fn threshold(&self) -> f64;
    async fn measure(&self, case: &EvaluationCase, judge: &LlmJudge) -> Result<MetricScore>;
}

/// What case material a metric shows the judge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PayloadScope {
    /// Question, answer, expected answer, and retrieved sources.
    Full,
    /// Question and answer only; custom criteria judge the answer on
    /// its own terms, not against the expected output.
    AnswerOnly,
}

/// A metric scored by handing instructions and the case material to
/// the judge. All built-in metrics and custom criteria take this form.
pub struct JudgedMetric {
    name: String,
    instructions: String,
    threshold: f64,
    scope: PayloadScope,
}

impl JudgedMetric {
    pub fn new(
        name: impl Into<String>,
        instructions: impl Into<String>,
        threshold: f64,
    ) -> Self {
        Self {
            name: name.into(),
            instructions: instructions.into(),
            threshold,
            scope: PayloadScope::Full,
        }
    }

    pub fn from_spec(spec: &CustomMetricSpec) -> Self {
        Self {
            name: spec.name.clone(),
            instructions: format!("{}\n{SCORE_SUFFIX}", spec.description),
            threshold: spec.threshold,
            scope: PayloadScope::AnswerOnly,
        }
    }

    fn payload(&self, case: &EvaluationCase) -> String {
        match self.scope {
            PayloadScope::Full => format!(
                "Question:\n{}\n\nAnswer:\n{}\n\nExpected answer:\n{}\n\nRetrieved sources:\n{}",
                case.input,
                case.actual_output,
                case.expected_output,
                case.retrieval_context.join("\n"),
            ),
            PayloadScope::AnswerOnly => format!(
                "Question:\n{}\n\nAnswer:\n{}",
                case.input, case.actual_output,
            ),
        }
    }
}

#[async_trait]
impl Metric for JudgedMetric {
    fn name(&self) -> &str {
        &self.name
    }

    fn threshold(&self) -> f64 {
        self.threshold
    }

    async fn measure(&self, case: &EvaluationCase, judge: &LlmJudge) -> Result<MetricScore> {
        let score = judge.score(&self.instructions, &self.payload(case)).await?;
        Ok(MetricScore {
            name: self.name.clone(),
            score,
            threshold: self.threshold,
            passed: score >= self.threshold,
        })
    }
}

const SCORE_SUFFIX: &str = "Reply with a single number between 0 and 1, nothing else.";

/// The fixed battery plus any custom criteria, in measurement order.
pub fn metric_battery(threshold: f64, customs: &[CustomMetricSpec]) -> Vec<Box<dyn Metric>> {
    let mut battery: Vec<Box<dyn Metric>> = vec![
        Box::new(JudgedMetric::new(
            "Contextual Precision",
            format!(
                "Judge whether the retrieved sources that are relevant to answering the \
                 question are ranked above the irrelevant ones, using the expected answer to \
                 decide relevance. {SCORE_SUFFIX}"
            ),
            threshold,
        )),
        Box::new(JudgedMetric::new(
            "Contextual Recall",
            format!(
                "Judge how much of the expected answer can be attributed to facts present in \
                 the retrieved sources. {SCORE_SUFFIX}"
            ),
            threshold,
        )),
        Box::new(JudgedMetric::new(
            "Contextual Relevancy",
            format!(
                "Judge what fraction of the retrieved sources is relevant to the question. \
                 {SCORE_SUFFIX}"
            ),
            threshold,
        )),
        Box::new(JudgedMetric::new(
            "Answer Relevancy",
            format!(
                "Judge how directly the answer addresses the question, ignoring whether it is \
                 factually grounded. {SCORE_SUFFIX}"
            ),
            threshold,
        )),
        Box::new(JudgedMetric::new(
            "Faithfulness",
            format!(
                "Judge whether every claim in the answer is supported by the retrieved \
                 sources, with no contradictions or invented facts. {SCORE_SUFFIX}"
            ),
            threshold,
        )),
    ];
    battery.extend(
        customs
            .iter()
            .map(|spec| Box::new(JudgedMetric::from_spec(spec)) as Box<dyn Metric>),
    );
    battery
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use sourcerer_core::error::ProviderError;
    use sourcerer_core::providers::CompletionProvider;
    use sourcerer_core::types::{ChatMessage, CompletionRequest, CompletionResponse, StreamDelta};
    use std::sync::Arc;
    use tokio::sync::mpsc;

    struct FixedReply(&'static str);

    #[async_trait]
    impl CompletionProvider for FixedReply {
        async fn complete(
            &self,
            _request: CompletionRequest,
        ) -> std::result::Result<CompletionResponse, ProviderError> {
            Ok(CompletionResponse {
                message: ChatMessage::assistant(self.0),
                model: "judge".into(),
            })
        }

        async fn complete_streaming(
            &self,
            _request: CompletionRequest,
            _tx: mpsc::Sender<StreamDelta>,
        ) -> std::result::Result<(), ProviderError> {
            Ok(())
        }

        fn model_name(&self) -> &str {
            "judge"
        }
    }

    fn case() -> EvaluationCase {
        EvaluationCase {
            input: "What is the deductible?".into(),
            actual_output: "$500 [info1.txt]".into(),
            expected_output: "$500 [info1.txt]".into(),
            context: vec![],
            retrieval_context: vec!["info1.txt: In-network deductibles are $500.".into()],
        }
    }

    #[test]
    fn test_battery_order_is_fixed() {
        let customs = vec![CustomMetricSpec {
            name: "Tone".into(),
            description: "Is the answer professional?".into(),
            threshold: 0.7,
        }];
        let battery = metric_battery(0.5, &customs);
        let names: Vec<&str> = battery.iter().map(|m| m.name()).collect();
        assert_eq!(
            names,
            vec![
                "Contextual Precision",
                "Contextual Recall",
                "Contextual Relevancy",
                "Answer Relevancy",
                "Faithfulness",
                "Tone",
            ]
        );
        assert_eq!(battery[5].threshold(), 0.7);
    }

    #[tokio::test]
    async fn test_measure_passes_at_threshold() {
        let judge = LlmJudge::new(Arc::new(FixedReply("0.5")));
        let metric = JudgedMetric::new("Faithfulness", "judge it", 0.5);
        let score = metric.measure(&case(), &judge).await.unwrap();
        assert!(score.passed);
        assert_eq!(score.score, 0.5);
    }

    #[tokio::test]
    async fn test_measure_fails_below_threshold() {
        let judge = LlmJudge::new(Arc::new(FixedReply("0.2")));
        let metric = JudgedMetric::new("Faithfulness", "judge it", 0.5);
        let score = metric.measure(&case(), &judge).await.unwrap();
        assert!(!score.passed);
    }

    #[test]
    fn test_full_payload_includes_all_case_fields() {
        let metric = JudgedMetric::new("Faithfulness", "judge it", 0.5);
        let payload = metric.payload(&case());
        assert!(payload.contains("What is the deductible?"));
        assert!(payload.contains("Retrieved sources:"));
        assert!(payload.contains("info1.txt: In-network deductibles are $500."));
    }

    #[test]
    fn test_custom_criteria_judge_the_answer_only() {
        let metric = JudgedMetric::from_spec(&CustomMetricSpec {
            name: "Tone".into(),
            description: "Is the answer professional?".into(),
            threshold: 0.5,
        });
        let payload = metric.payload(&case());
        assert!(payload.contains("$500 [info1.txt]"));
        assert!(!payload.contains("Expected answer:"));
        assert!(!payload.contains("Retrieved sources:"));
    }
}
