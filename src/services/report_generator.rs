//! Report Generation
//!
//! Turns a topic into a `Report` with one grounded, schema-constrained model
//! call. Progress is reported through a stage callback: `Researching` before
//! the request, `Analyzing` once it is dispatched, `Formatting` after the
//! response arrives. Failures are never retried here; the user resubmits.

use std::sync::Arc;

use politisight_core::{dedupe_sources, report_response_schema, Report, ReportPayload};
use politisight_llm::{LlmProvider, LlmRequestOptions, LlmResponse, Message};
use tracing::{debug, info, instrument, warn};

use crate::models::search::SearchStage;
use crate::services::prompt::{
    build_report_system_prompt, build_report_user_prompt, RECENT_TOPIC_LIMIT,
    REQUESTED_CHART_SECTIONS,
};
use crate::utils::error::GenerationError;

/// Sampling and grounding settings for report requests.
#[derive(Debug, Clone)]
pub struct GeneratorOptions {
    pub temperature: f32,
    pub model: Option<String>,
    pub enable_search: bool,
}

impl Default for GeneratorOptions {
    fn default() -> Self {
        Self {
            temperature: 0.2,
            model: None,
            enable_search: true,
        }
    }
}

/// Generates reports through an LLM provider.
pub struct ReportGenerator {
    provider: Arc<dyn LlmProvider>,
    options: GeneratorOptions,
}

impl ReportGenerator {
    pub fn new(provider: Arc<dyn LlmProvider>) -> Self {
        Self::with_options(provider, GeneratorOptions::default())
    }

    pub fn with_options(provider: Arc<dyn LlmProvider>, options: GeneratorOptions) -> Self {
        Self { provider, options }
    }

    /// Generate a report on `topic`.
    ///
    /// `recent_topics` only biases tone; at most the first three are used.
    /// The topic is assumed non-empty; callers validate it.
    #[instrument(skip(self, recent_topics, on_progress), fields(model = %self.provider.model()))]
    pub async fn generate<F>(
        &self,
        topic: &str,
        recent_topics: &[String],
        on_progress: F,
    ) -> Result<Report, GenerationError>
    where
        F: Fn(SearchStage) + Send + Sync,
    {
        let recent = &recent_topics[..recent_topics.len().min(RECENT_TOPIC_LIMIT)];
        let today = chrono::Local::now().format("%-d %B %Y").to_string();

        let system = build_report_system_prompt(&today);
        let messages = vec![Message::user(build_report_user_prompt(topic, recent))];
        let request_options = LlmRequestOptions {
            temperature_override: Some(self.options.temperature),
            model_override: self.options.model.clone(),
            response_schema: Some(report_response_schema()),
            enable_search: self.options.enable_search && self.provider.supports_native_search(),
        };

        on_progress(SearchStage::Researching);
        let request = self
            .provider
            .send_message(messages, Some(system), request_options);
        on_progress(SearchStage::Analyzing);

        let response = request.await.map_err(|e| {
            warn!(error = %e, "report_generator: request failed");
            GenerationError::from(e)
        })?;

        on_progress(SearchStage::Formatting);
        let report = build_report(&response)?;

        info!(
            report_id = %report.id,
            sections = report.sections.len(),
            sources = report.sources.len(),
            "report_generator: report ready"
        );
        Ok(report)
    }
}

/// Turn a provider response into a finished report with a fresh id and timestamp.
pub fn build_report(response: &LlmResponse) -> Result<Report, GenerationError> {
    let text = response.text().ok_or_else(|| {
        debug!(stop_reason = ?response.stop_reason, "report_generator: empty response");
        GenerationError::EmptyResponse
    })?;

    debug!(
        len = text.len(),
        preview = %text.chars().take(200).collect::<String>(),
        "report_generator: response text"
    );

    let json = strip_code_fences(text);
    let mut payload =
        ReportPayload::from_json(json).map_err(|e| GenerationError::Parse(e.to_string()))?;
    payload
        .validate()
        .map_err(|e| GenerationError::Parse(e.to_string()))?;

    let charts = payload.chart_section_count();
    if charts < REQUESTED_CHART_SECTIONS {
        warn!(
            charts,
            requested = REQUESTED_CHART_SECTIONS,
            "report_generator: fewer chart sections than requested"
        );
    }

    let sources = dedupe_sources(response.grounding.iter().cloned());
    Ok(payload.into_report(
        uuid::Uuid::new_v4().to_string(),
        chrono::Utc::now().timestamp_millis(),
        sources,
    ))
}

/// Strip a Markdown code fence the model may wrap its JSON in.
///
/// Text without a fence is returned trimmed.
pub fn strip_code_fences(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // Skip an optional language tag such as `json`
    let body = match rest.find('\n') {
        Some(nl) => &rest[nl + 1..],
        None => rest,
    };
    body.trim_end()
        .strip_suffix("```")
        .unwrap_or(body)
        .trim()
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use politisight_core::{GroundingSource, SectionType, UnifiedStreamEvent};
    use politisight_llm::{LlmError, LlmResult, ProviderConfig, StopReason, UsageStats};
    use std::sync::Mutex;
    use tokio::sync::mpsc;

    // ========================================================================
    // Mock LLM Provider
    // ========================================================================

    /// Returns one predefined response and records the request it saw.
    struct MockLlmProvider {
        response: Mutex<Option<LlmResult<LlmResponse>>>,
        seen: Mutex<Option<(Vec<Message>, Option<String>, LlmRequestOptions)>>,
        search: bool,
        config: ProviderConfig,
    }

    impl MockLlmProvider {
        fn new(response: LlmResult<LlmResponse>) -> Self {
            Self {
                response: Mutex::new(Some(response)),
                seen: Mutex::new(None),
                search: true,
                config: ProviderConfig::default(),
            }
        }

        fn with_text(text: &str, grounding: Vec<GroundingSource>) -> Self {
            Self::new(Ok(LlmResponse {
                content: Some(text.to_string()),
                grounding,
                stop_reason: StopReason::EndTurn,
                usage: UsageStats::default(),
                model: "mock-model".to_string(),
            }))
        }
    }

    #[async_trait]
    impl LlmProvider for MockLlmProvider {
        fn name(&self) -> &'static str {
            "mock"
        }

        fn model(&self) -> &str {
            "mock-model"
        }

        fn config(&self) -> &ProviderConfig {
            &self.config
        }

        fn supports_native_search(&self) -> bool {
            self.search
        }

        async fn send_message(
            &self,
            messages: Vec<Message>,
            system: Option<String>,
            request_options: LlmRequestOptions,
        ) -> LlmResult<LlmResponse> {
            *self.seen.lock().unwrap() = Some((messages, system, request_options));
            self.response.lock().unwrap().take().unwrap_or(Err(LlmError::Other {
                message: "No more mock responses available".to_string(),
            }))
        }

        async fn stream_message(
            &self,
            _messages: Vec<Message>,
            _system: Option<String>,
            _tx: mpsc::Sender<UnifiedStreamEvent>,
            _request_options: LlmRequestOptions,
        ) -> LlmResult<LlmResponse> {
            unimplemented!("MockLlmProvider does not support streaming")
        }

        async fn health_check(&self) -> LlmResult<()> {
            Ok(())
        }
    }

    const VALID_REPORT: &str = r#"{
        "title": "Bihar Assembly Outlook",
        "date": "October 2026",
        "executiveSummary": "A tight contest between the two alliances.",
        "keyInsights": [{"icon": "trend-up", "text": "NDA leads narrowly", "value": "+2%"}],
        "sections": [
            {"id": "s1", "title": "Overview", "type": "TEXT", "content": "Background."},
            {"id": "s2", "title": "Vote share", "type": "PIE_CHART", "content": "Shares.",
             "chartData": [{"name": "NDA", "value": 41}, {"name": "MGB", "value": 39}]}
        ]
    }"#;

    fn source(uri: &str, title: &str) -> GroundingSource {
        GroundingSource {
            title: title.to_string(),
            uri: uri.to_string(),
        }
    }

    // ========================================================================
    // Fence Stripping
    // ========================================================================

    #[test]
    fn test_strip_code_fences() {
        assert_eq!(strip_code_fences("```json\n{\"a\":1}\n```"), "{\"a\":1}");
        assert_eq!(strip_code_fences("```\n{\"a\":1}\n```\n"), "{\"a\":1}");
        assert_eq!(strip_code_fences("  {\"a\":1}  "), "{\"a\":1}");
        assert_eq!(strip_code_fences("```json\n{\"a\":1}"), "{\"a\":1}");
    }

    // ========================================================================
    // Generation
    // ========================================================================

    #[tokio::test]
    async fn test_generate_success() {
        let provider = Arc::new(MockLlmProvider::with_text(
            &format!("```json\n{}\n```", VALID_REPORT),
            vec![
                source("https://a.example", "T1"),
                source("https://b.example", "B"),
                source("https://a.example", "T2"),
            ],
        ));
        let generator = ReportGenerator::new(provider.clone());

        let stages = Mutex::new(Vec::new());
        let report = generator
            .generate("Bihar elections", &[], |stage| stages.lock().unwrap().push(stage))
            .await
            .unwrap();

        assert_eq!(report.title, "Bihar Assembly Outlook");
        assert!(!report.id.is_empty());
        assert!(report.created_at > 0);
        assert_eq!(report.sections[1].section_type, SectionType::PieChart);
        assert_eq!(
            report.sources,
            vec![source("https://a.example", "T2"), source("https://b.example", "B")]
        );
        assert_eq!(
            *stages.lock().unwrap(),
            vec![
                SearchStage::Researching,
                SearchStage::Analyzing,
                SearchStage::Formatting
            ]
        );
    }

    #[tokio::test]
    async fn test_generate_request_shape() {
        let provider = Arc::new(MockLlmProvider::with_text(VALID_REPORT, vec![]));
        let generator = ReportGenerator::new(provider.clone());
        let recent: Vec<String> = ["A", "B", "C", "D"].iter().map(|s| s.to_string()).collect();

        generator.generate("Kerala", &recent, |_| {}).await.unwrap();

        let (messages, system, options) = provider.seen.lock().unwrap().take().unwrap();
        assert_eq!(messages.len(), 1);
        assert!(messages[0].content.contains("\"C\""));
        assert!(!messages[0].content.contains("\"D\""));
        assert!(system.unwrap().contains("Today's date is"));
        assert!(options.enable_search);
        assert!(options.response_schema.is_some());
        assert_eq!(options.temperature_override, Some(0.2));
    }

    #[tokio::test]
    async fn test_search_off_without_native_support() {
        let provider = Arc::new(MockLlmProvider {
            search: false,
            ..MockLlmProvider::with_text(VALID_REPORT, vec![])
        });
        let generator = ReportGenerator::new(provider.clone());

        generator.generate("Kerala", &[], |_| {}).await.unwrap();

        let (_, _, options) = provider.seen.lock().unwrap().take().unwrap();
        assert!(!options.enable_search);
        assert!(options.response_schema.is_some());
    }

    #[tokio::test]
    async fn test_generate_missing_credential() {
        let provider = Arc::new(MockLlmProvider::new(Err(LlmError::MissingApiKey {
            provider: "gemini".to_string(),
        })));
        let generator = ReportGenerator::new(provider);

        let stages = Mutex::new(Vec::new());
        let err = generator
            .generate("x", &[], |stage| stages.lock().unwrap().push(stage))
            .await
            .unwrap_err();
        assert!(matches!(err, GenerationError::MissingCredential(_)));
        assert!(!stages.lock().unwrap().contains(&SearchStage::Formatting));
    }

    #[tokio::test]
    async fn test_generate_empty_response() {
        let provider = Arc::new(MockLlmProvider::with_text("   ", vec![]));
        let err = ReportGenerator::new(provider)
            .generate("x", &[], |_| {})
            .await
            .unwrap_err();
        assert_eq!(err, GenerationError::EmptyResponse);
    }

    #[tokio::test]
    async fn test_generate_unparseable_response() {
        let provider = Arc::new(MockLlmProvider::with_text("I cannot help with that.", vec![]));
        let err = ReportGenerator::new(provider)
            .generate("x", &[], |_| {})
            .await
            .unwrap_err();
        assert!(matches!(err, GenerationError::Parse(_)));
    }

    #[tokio::test]
    async fn test_generate_rejects_blank_summary() {
        let provider = Arc::new(MockLlmProvider::with_text(
            r#"{"title": "T", "date": "", "executiveSummary": " ", "keyInsights": [], "sections": []}"#,
            vec![],
        ));
        let err = ReportGenerator::new(provider)
            .generate("x", &[], |_| {})
            .await
            .unwrap_err();
        assert!(matches!(err, GenerationError::Parse(_)));
    }

    #[tokio::test]
    async fn test_generate_accepts_zero_chart_sections() {
        let provider = Arc::new(MockLlmProvider::with_text(
            r#"{"title": "T", "date": "", "executiveSummary": "S", "keyInsights": [],
                "sections": [{"title": "Only text", "type": "TEXT", "content": "..."}]}"#,
            vec![],
        ));
        let report = ReportGenerator::new(provider)
            .generate("x", &[], |_| {})
            .await
            .unwrap();
        assert_eq!(report.chart_sections().count(), 0);
        assert_eq!(report.sections[0].id, "section-1");
    }

    #[tokio::test]
    async fn test_generate_network_error() {
        let provider = Arc::new(MockLlmProvider::new(Err(LlmError::ServerError {
            message: "overloaded".to_string(),
            status: Some(503),
        })));
        let err = ReportGenerator::new(provider)
            .generate("x", &[], |_| {})
            .await
            .unwrap_err();
        assert!(matches!(err, GenerationError::Network(_)));
    }
}
