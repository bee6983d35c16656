use std::sync::Arc;

use crate::model::ModelBackend;
use crate::prompt;
use crate::queries::QueryRequest;
use crate::session::Session;
use crate::{EventSink, Notice, PipelineError, PipelineEvent, notify};

/// Generates one descriptive paragraph of the user's research intent, for
/// relevance scoring downstream.
pub struct VerboseQueryGenerator {
    model: Arc<dyn ModelBackend>,
    model_id: String,
    context_chars: usize,
}

impl VerboseQueryGenerator {
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
            "Key content extracted from uploaded documents",
        );
        prompt::verbose_prompt(&context, &prompt::verbose_subject_hint(req.subject.as_deref()))
    }

    /// Generate the paragraph and store it as the session's current verbose
    /// query. On failure the stored value is cleared and `None` is returned.
    pub async fn generate(
        &self,
        req: &QueryRequest,
        session: &mut Session,
        events: &EventSink,
    ) -> Option<String> {
        let prompt = self.prompt_for(req);

        events(PipelineEvent::Busy("Generating AI verbose query for BM25...".to_string()));
        let reply = self.model.refine(&prompt, &self.model_id).await;
        events(PipelineEvent::Idle);

        let outcome = match reply {
            Ok(text) if !text.trim().is_empty() => Ok(text),
            Ok(_) => Err("Ollama did not return a valid verbose query.".to_string()),
            Err(e) => Err(e.to_string()),
        };

        match outcome {
            Ok(text) => {
                tracing::info!(chars = text.len(), "generated verbose query");
                notify(events, Notice::success("AI verbose query for BM25 generated."));
                session.verbose_query = text.clone();
                Some(text)
            }
            Err(message) => {
                let err = PipelineError::VerboseQueryFailed(message);
                tracing::warn!(error = %err, "verbose query generation failed");
                notify(events, Notice::error(err.to_string()));
                session.verbose_query.clear();
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::mock::{MockModel, MockReply};

    fn req() -> QueryRequest {
        QueryRequest {
            topic: "sparse attention".into(),
            extracted_text: Some("z".repeat(7000)),
            subject: Some("cs".into()),
            paper_type: Some("survey".into()),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn success_replaces_current_value() {
        let mock = Arc::new(MockModel::new(
            MockReply::text("A detailed paragraph about sparse attention."),
            MockReply::Missing,
        ));
        let generator = VerboseQueryGenerator::new(mock.clone(), "gemma:3b", 5000);
        let mut session = Session::new();
        session.verbose_query = "stale".into();

        let out = generator
            .generate(&req(), &mut session, &crate::discard_events())
            .await;

        assert_eq!(out.as_deref(), Some("A detailed paragraph about sparse attention."));
        assert_eq!(session.verbose_query, "A detailed paragraph about sparse attention.");

        let prompt = &mock.prompts()[0];
        assert!(prompt.contains("DO NOT generate search queries"));
        assert!(prompt.contains("The user's primary subject focus is: cs."));
        assert!(!prompt.contains("primarily of type"));
        assert_eq!(prompt.matches('z').count() - prompt_template_z(), 5000);
    }

    /// `z` characters in the fixed template text.
    fn prompt_template_z() -> usize {
        prompt::verbose_prompt("", "").matches('z').count()
    }

    #[tokio::test]
    async fn failure_clears_current_value() {
        let mock = Arc::new(MockModel::new(
            MockReply::Status {
                status: 502,
                message: "bad gateway".into(),
            },
            MockReply::Missing,
        ));
        let generator = VerboseQueryGenerator::new(mock, "gemma:3b", 5000);
        let mut session = Session::new();
        session.verbose_query = "previous".into();

        let out = generator
            .generate(&req(), &mut session, &crate::discard_events())
            .await;

        assert!(out.is_none());
        assert!(session.verbose_query.is_empty());
    }

    #[tokio::test]
    async fn blank_reply_counts_as_failure() {
        let mock = Arc::new(MockModel::new(MockReply::text("  \n"), MockReply::Missing));
        let generator = VerboseQueryGenerator::new(mock, "gemma:3b", 5000);
        let mut session = Session::new();
        session.verbose_query = "previous".into();

        assert!(
            generator
                .generate(&req(), &mut session, &crate::discard_events())
                .await
                .is_none()
        );
        assert!(session.verbose_query.is_empty());
    }
}
