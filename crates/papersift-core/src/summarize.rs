use std::sync::Arc;

use futures_util::future::join_all;

use crate::model::ModelBackend;
use crate::{
    EventSink, Notice, PaperResult, PipelineError, PipelineEvent, SummarizedPaper, char_prefix,
    notify,
};

/// Returned for an empty abstract, without contacting the model.
pub const NO_ABSTRACT_PLACEHOLDER: &str = "No abstract to summarize.";

/// Keep the first `max_chars` characters, appending `...` if anything was cut.
pub fn truncate_with_ellipsis(s: &str, max_chars: usize) -> String {
    let prefix = char_prefix(s, max_chars);
    if prefix.len() < s.len() {
        format!("{}...", prefix)
    } else {
        s.to_string()
    }
}

/// Compresses paper abstracts with the model, one request per abstract.
pub struct AbstractSummarizer {
    model: Arc<dyn ModelBackend>,
    model_id: String,
    /// Abstracts at or below this many characters are not summarized.
    min_chars: usize,
    /// Length of the truncated fallback when the model fails.
    fallback_chars: usize,
}

impl AbstractSummarizer {
    pub fn new(
        model: Arc<dyn ModelBackend>,
        model_id: impl Into<String>,
        min_chars: usize,
        fallback_chars: usize,
    ) -> Self {
        Self {
            model,
            model_id: model_id.into(),
            min_chars,
            fallback_chars,
        }
    }

    /// Summarize one abstract. Never fails: on any error the abstract is
    /// truncated locally instead.
    pub async fn summarize(&self, abstract_text: &str, events: &EventSink) -> String {
        if abstract_text.is_empty() {
            return NO_ABSTRACT_PLACEHOLDER.to_string();
        }

        events(PipelineEvent::Busy("Summarizing abstract with AI...".to_string()));
        let reply = self.model.summarize(abstract_text, &self.model_id).await;
        events(PipelineEvent::Idle);

        let outcome = match reply {
            Ok(summary) if !summary.trim().is_empty() => Ok(summary),
            Ok(_) => Err("Ollama did not return a valid summary.".to_string()),
            Err(e) => Err(e.to_string()),
        };

        match outcome {
            Ok(summary) => {
                notify(events, Notice::success("Abstract summarized by AI."));
                summary
            }
            Err(message) => {
                let err = PipelineError::SummarizationFailed(message);
                tracing::warn!(error = %err, "falling back to truncated abstract");
                notify(events, Notice::error(err.to_string()));
                truncate_with_ellipsis(abstract_text, self.fallback_chars)
            }
        }
    }

    /// Attach a summary to every paper, with all model calls in flight at
    /// once. Output order matches input order.
    ///
    /// Abstracts longer than `min_chars` are summarized; shorter or missing
    /// ones are carried over unchanged.
    pub async fn summarize_all(
        &self,
        papers: Vec<PaperResult>,
        events: &EventSink,
    ) -> Vec<SummarizedPaper> {
        let pending = papers.into_iter().map(|paper| async move {
            let ai_summary = match paper.abstract_text.as_deref() {
                Some(a) if a.chars().count() > self.min_chars => {
                    Some(self.summarize(a, events).await)
                }
                other => other.map(str::to_string),
            };
            SummarizedPaper { paper, ai_summary }
        });
        join_all(pending).await
    }
}
