use std::sync::Arc;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::ModelBackend;
use crate::prompt;
use crate::{EventSink, Notice, PipelineError, PipelineEvent, notify};

/// Double-quoted substrings, used when the model's reply is not a JSON array.
static QUOTED_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r#""([^"]+)""#).unwrap());

/// Extracted queries shorter than this (after trimming) are dropped.
const MIN_EXTRACTED_CHARS: usize = 4;

/// User input for query generation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QueryRequest {
    pub topic: String,
    #[serde(default)]
    pub notes: Option<String>,
    /// Text extracted from uploaded documents.
    #[serde(default)]
    pub extracted_text: Option<String>,
    #[serde(default)]
    pub subject: Option<String>,
    #[serde(default)]
    pub paper_type: Option<String>,
}

/// Queries recovered from a model reply, tagged by how they were recovered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParsedQueries {
    /// The reply was a well-formed JSON array of strings.
    Structured(Vec<String>),
    /// The reply was not valid JSON; queries were pulled from quoted substrings.
    Extracted(Vec<String>),
}

impl ParsedQueries {
    pub fn queries(&self) -> &[String] {
        match self {
            ParsedQueries::Structured(q) | ParsedQueries::Extracted(q) => q,
        }
    }

    pub fn into_queries(self) -> Vec<String> {
        match self {
            ParsedQueries::Structured(q) | ParsedQueries::Extracted(q) => q,
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum QueryParseError {
    #[error("Ollama did not return valid queries.")]
    EmptyResponse,
    #[error("Ollama returned an empty query list.")]
    EmptyList,
    #[error("Ollama did not return valid queries (no quoted queries found).")]
    NoQuotedQueries,
}

/// Two-stage parse of a model reply into search queries.
///
/// First a typed decode as a JSON array of strings. If that fails, every
/// double-quoted substring longer than 3 characters (after trimming) is
/// taken, in order of appearance. Quoted text in a conversational preamble
/// is picked up too; callers cannot tell it apart from a real query.
pub fn parse_queries(raw: &str) -> Result<ParsedQueries, QueryParseError> {
    if raw.trim().is_empty() {
        return Err(QueryParseError::EmptyResponse);
    }

    match serde_json::from_str::<Vec<String>>(raw) {
        Ok(list) if list.is_empty() => Err(QueryParseError::EmptyList),
        Ok(list) => Ok(ParsedQueries::Structured(list)),
        Err(e) => {
            tracing::debug!(error = %e, "model reply is not a JSON string array, extracting quoted text");
            let extracted: Vec<String> = QUOTED_RE
                .captures_iter(raw)
                .filter_map(|c| c.get(1))
                .map(|m| m.as_str().trim())
                .filter(|q| q.chars().count() >= MIN_EXTRACTED_CHARS)
                .map(str::to_string)
                .collect();
            if extracted.is_empty() {
                Err(QueryParseError::NoQuotedQueries)
            } else {
                Ok(ParsedQueries::Extracted(extracted))
            }
        }
    }
}

/// Generates search queries from the user's topic, notes, and documents.
pub struct QueryGenerator {
    model: Arc<dyn ModelBackend>,
    model_id: String,
    context_chars: usize,
}

impl QueryGenerator {
    pub fn new(model: Arc<dyn ModelBackend>, model_id: impl Into<String>, context_chars: usize) -> Self {
        Self {
            model,
            model_id: model_id.into(),
            context_chars,
        }
    }

    pub fn prompt_for(&self, req: &QueryRequest) -> String {
        let context = prompt::context_block(
            &req.topic,
            req.notes.as_deref(),
            req.extracted_text.as_deref(),
            self.context_chars,
            "Key content extracted from uploaded documents (e.g., lecture notes, paper excerpts, book pages)",
        );
        prompt::query_prompt(
            &context,
            &prompt::subject_hint(req.subject.as_deref()),
            &prompt::paper_type_hint(req.paper_type.as_deref()),
        )
    }

    /// Ask the model for queries. One request, no retries.
    pub async fn generate(
        &self,
        req: &QueryRequest,
        events: &EventSink,
    ) -> Result<Vec<String>, PipelineError> {
        let prompt = self.prompt_for(req);

        events(PipelineEvent::Busy("Generating AI search queries...".to_string()));
        let reply = self.model.refine(&prompt, &self.model_id).await;
        events(PipelineEvent::Idle);

        let outcome = reply
            .map_err(|e| e.to_string())
            .and_then(|raw| parse_queries(&raw).map_err(|e| e.to_string()));

        match outcome {
            Ok(ParsedQueries::Structured(queries)) => {
                tracing::info!(count = queries.len(), "generated queries");
                notify(events, Notice::success("AI search queries generated."));
                Ok(queries)
            }
            Ok(ParsedQueries::Extracted(queries)) => {
                tracing::info!(count = queries.len(), "extracted queries from malformed reply");
                notify(
                    events,
                    Notice::success(format!(
                        "AI queries generated (extracted {}).",
                        queries.len()
                    )),
                );
                Ok(queries)
            }
            Err(message) => {
                let err = PipelineError::QueryGenerationFailed(message);
                tracing::warn!(error = %err, "query generation failed");
                notify(events, Notice::error(err.to_string()));
                Err(err)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::mock::{MockModel, MockReply};

    #[test]
    fn structured_array_is_returned_verbatim() {
        let raw = r#"["ti:(graph neural networks)", "cat:cs.LG AND ti:(GNN)"]"#;
        assert_eq!(
            parse_queries(raw).unwrap(),
            ParsedQueries::Structured(vec![
                "ti:(graph neural networks)".into(),
                "cat:cs.LG AND ti:(GNN)".into(),
            ])
        );
    }

    #[test]
    fn invalid_json_falls_back_to_quoted_substrings() {
        let raw = r#"Sure! Queries: "term one" "term two""#;
        assert_eq!(
            parse_queries(raw).unwrap(),
            ParsedQueries::Extracted(vec!["term one".into(), "term two".into()])
        );
    }

    #[test]
    fn fallback_drops_short_quotes_and_trims() {
        let raw = r#"Here: "ab", "  spaced query  ", "abc", "abcd""#;
        assert_eq!(
            parse_queries(raw).unwrap().into_queries(),
            vec!["spaced query".to_string(), "abcd".to_string()]
        );
    }

    #[test]
    fn fenced_json_uses_fallback() {
        let raw = "```json\n[\"deep learning theorem proving\", \"au:(Szegedy)\"]\n```";
        assert_eq!(
            parse_queries(raw).unwrap(),
            ParsedQueries::Extracted(vec![
                "deep learning theorem proving".into(),
                "au:(Szegedy)".into(),
            ])
        );
    }

    #[test]
    fn non_string_array_is_not_structured() {
        // Decodes as JSON but not as a list of strings: quoted fallback applies.
        let raw = r#"[{"q": "quantum error correction"}]"#;
        assert_eq!(
            parse_queries(raw).unwrap(),
            ParsedQueries::Extracted(vec!["quantum error correction".into()])
        );
    }

    #[test]
    fn both_stages_failing_is_an_error() {
        assert_eq!(
            parse_queries("I cannot help with that."),
            Err(QueryParseError::NoQuotedQueries)
        );
        assert_eq!(parse_queries("   "), Err(QueryParseError::EmptyResponse));
        assert_eq!(parse_queries("[]"), Err(QueryParseError::EmptyList));
    }

    fn generator(mock: Arc<MockModel>) -> QueryGenerator {
        QueryGenerator::new(mock, crate::DEFAULT_MODEL, 4000)
    }

    #[tokio::test]
    async fn graph_neural_networks_scenario() {
        let mock = Arc::new(MockModel::new(
            MockReply::text(r#"["ti:(graph neural networks)", "cat:cs.LG AND ti:(GNN)"]"#),
            MockReply::Missing,
        ));
        let req = QueryRequest {
            topic: "graph neural networks".into(),
            ..Default::default()
        };
        let queries = generator(mock.clone())
            .generate(&req, &crate::discard_events())
            .await
            .unwrap();

        assert_eq!(
            queries,
            vec!["ti:(graph neural networks)", "cat:cs.LG AND ti:(GNN)"]
        );
        assert_eq!(mock.refine_calls(), 1);
        let prompt = &mock.prompts()[0];
        assert!(prompt.contains("User's main topic/question: \"graph neural networks\""));
        assert!(!prompt.contains("Additional notes"));
        assert!(!prompt.contains("Key content extracted"));
    }

    #[tokio::test]
    async fn transport_failure_is_reported_and_not_retried() {
        let mock = Arc::new(MockModel::new(
            MockReply::Status {
                status: 500,
                message: "model not loaded".into(),
            },
            MockReply::Missing,
        ));
        let err = generator(mock.clone())
            .generate(
                &QueryRequest {
                    topic: "x".into(),
                    ..Default::default()
                },
                &crate::discard_events(),
            )
            .await
            .unwrap_err();
        assert_eq!(mock.refine_calls(), 1);
        assert_eq!(
            err.to_string(),
            "Failed to generate AI queries: Mock refine API error (500): model not loaded"
        );
    }

    #[tokio::test]
    async fn prompt_includes_notes_documents_and_hints() {
        let mock = Arc::new(MockModel::new(MockReply::text(r#"["a query"]"#), MockReply::Missing));
        let req = QueryRequest {
            topic: "primes".into(),
            notes: Some("twin prime conjecture".into()),
            extracted_text: Some("§".repeat(6000)),
            subject: Some("math".into()),
            paper_type: Some("survey".into()),
        };
        generator(mock.clone())
            .generate(&req, &crate::discard_events())
            .await
            .unwrap();
        let prompt = &mock.prompts()[0];
        assert!(prompt.contains("Additional notes/context from user: \"twin prime conjecture\""));
        assert_eq!(prompt.matches('§').count(), 4000);
        assert!(prompt.contains("cat:math.XX"));
        assert!(prompt.contains("primarily of type: survey"));
    }
}
