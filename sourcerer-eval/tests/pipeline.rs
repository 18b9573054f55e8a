//! Full evaluation run against a real orchestration approach backed by
//! in-memory providers.

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::mpsc;

use sourcerer_core::approaches::{Approach, ChatReadRetrieveReadApproach};
use sourcerer_core::error::ProviderError;
use sourcerer_core::prompt::PromptPack;
use sourcerer_core::providers::{
    CompletionProvider, EmbeddingProvider, NoAuthFilter, SearchIndex, SearchRequest,
};
use sourcerer_core::retrieval::Retriever;
use sourcerer_core::types::{
    ChatMessage, CompletionRequest, CompletionResponse, ScoredDocument, StreamDelta,
};
use sourcerer_core::RequestOverrides;

use sourcerer_eval::{ApproachGenerator, EvalConfig, EvaluationPipeline, LlmJudge};

struct TinyIndex;

#[async_trait]
impl SearchIndex for TinyIndex {
    async fn search(&self, _request: &SearchRequest) -> Result<Vec<ScoredDocument>, ProviderError> {
        Ok(vec![
            ScoredDocument::new(
                "info1.txt",
                "info1.txt",
                "In-network deductibles are $500 for employee.",
            )
            .with_scores(0.9, Some(2.9)),
        ])
    }
}

struct TinyEmbeddings;

#[async_trait]
impl EmbeddingProvider for TinyEmbeddings {
    async fn embed(&self, _text: &str) -> Result<Vec<f32>, ProviderError> {
        Ok(vec![0.5; 4])
    }

    fn dimensions(&self) -> usize {
        4
    }
}

/// Answers questions when prompted to answer, scores 0.9 when prompted
/// to judge. Judging prompts end with the bare-number instruction.
struct DualModel;

#[async_trait]
impl CompletionProvider for DualModel {
    async fn complete(
        &self,
        request: CompletionRequest,
    ) -> Result<CompletionResponse, ProviderError> {
        let system = request.messages[0].content.as_text().unwrap_or_default();
        let reply = if system.contains("single number") {
            "0.9".to_string()
        } else {
            "The in-network deductible is $500 [info1.txt].".to_string()
        };
        Ok(CompletionResponse {
            message: ChatMessage::assistant(reply),
            model: "gpt-4o-mini".into(),
        })
    }

    async fn complete_streaming(
        &self,
        _request: CompletionRequest,
        _tx: mpsc::Sender<StreamDelta>,
    ) -> Result<(), ProviderError> {
        Ok(())
    }

    fn model_name(&self) -> &str {
        "gpt-4o-mini"
    }
}

#[tokio::test]
async fn test_evaluation_of_live_approach() {
    let dir = tempfile::tempdir().unwrap();
    let testdata = dir.path().join("ground_truth.jsonl");
    std::fs::write(
        &testdata,
        concat!(
            r#"{"input": "What is the deductible?", "expected_output": "$500 [info1.txt]"}"#,
            "\n",
            r#"{"input": "Is Overlake in-network?", "expected_output": "Yes [info2.pdf]"}"#,
            "\n",
        ),
    )
    .unwrap();
    let custom_metrics = dir.path().join("custom_metrics.json");
    std::fs::write(
        &custom_metrics,
        r#"[{"name": "Citation Format", "description": "Does every fact carry a bracketed source name?", "threshold": 0.6}]"#,
    )
    .unwrap();

    let config = EvalConfig {
        testdata_path: testdata,
        results_dir: dir.path().join("results"),
        custom_metrics_path: Some(custom_metrics),
        max_concurrent: 2,
        throttle_secs: 0,
        top: Some(5),
        ..Default::default()
    };

    let model: Arc<dyn CompletionProvider> = Arc::new(DualModel);
    let approach: Arc<dyn Approach> = Arc::new(ChatReadRetrieveReadApproach::new(
        Retriever::new(Arc::new(TinyIndex)),
        Arc::new(TinyEmbeddings),
        Arc::clone(&model),
        Arc::new(NoAuthFilter),
        "gpt-4o-mini",
        PromptPack::default(),
    ));
    let generator = ApproachGenerator::new(
        approach,
        RequestOverrides {
            top: config.top,
            ..Default::default()
        },
    );

    let pipeline = EvaluationPipeline::new(config, LlmJudge::new(model)).unwrap();
    let (report, path) = pipeline.run(&generator).await.unwrap();

    assert_eq!(report.metadata.num_cases, 2);
    assert_eq!(report.metadata.judge_model, "gpt-4o-mini");
    // Five built-in metrics plus the custom criterion, in order.
    let names: Vec<&str> = report.results[0]
        .metrics
        .iter()
        .map(|m| m.name.as_str())
        .collect();
    assert_eq!(
        names,
        vec![
            "Contextual Precision",
            "Contextual Recall",
            "Contextual Relevancy",
            "Answer Relevancy",
            "Faithfulness",
            "Citation Format",
        ]
    );
    assert!(report.results.iter().all(|r| r.all_passed()));
    // Cases come back in golden order with their grounding attached.
    assert_eq!(report.results[0].case.input, "What is the deductible?");
    assert!(
        report.results[0].case.retrieval_context[0].contains("info1.txt"),
    );
    assert!(path.exists());
}
