use std::sync::Arc;

use crate::model::ModelBackend;
use crate::queries::{QueryGenerator, QueryRequest};
use crate::render::{RenderedResults, ResultsRenderer};
use crate::session::Session;
use crate::sort::SortCriteria;
use crate::summarize::AbstractSummarizer;
use crate::upload::AddReport;
use crate::verbose::VerboseQueryGenerator;
use crate::{Config, EventSink, IncomingFile, PaperResult, TextExtractor, UploadedFile};

/// The assistant's components wired to one configuration and model backend.
///
/// Holds no per-user state; every operation takes the [`Session`] it acts on.
pub struct Pipeline {
    config: Config,
    extractor: TextExtractor,
    queries: QueryGenerator,
    verbose: VerboseQueryGenerator,
    renderer: ResultsRenderer,
}

impl Pipeline {
    pub fn new(config: Config, extractor: TextExtractor, model: Arc<dyn ModelBackend>) -> Self {
        let queries = QueryGenerator::new(model.clone(), &config.model, config.query_context_chars);
        let verbose =
            VerboseQueryGenerator::new(model.clone(), &config.model, config.verbose_context_chars);
        let summarizer = AbstractSummarizer::new(
            model,
            &config.model,
            config.summary_min_chars,
            config.abstract_display_chars,
        );
        let renderer = ResultsRenderer::new(summarizer, config.abstract_display_chars);
        Self {
            config,
            extractor,
            queries,
            verbose,
            renderer,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn extractor(&self) -> &TextExtractor {
        &self.extractor
    }

    pub async fn add_files(
        &self,
        session: &mut Session,
        files: Vec<IncomingFile>,
        events: &EventSink,
    ) -> AddReport {
        session.uploads.add_files(files, &self.extractor, events).await
    }

    pub fn remove_file(&self, session: &mut Session, index: usize) -> Option<UploadedFile> {
        let removed = session.uploads.remove_file(index);
        if let Some(f) = &removed {
            tracing::info!(file = %f.name, index, "file removed");
        }
        removed
    }

    /// Search queries for `req`. Empty when generation fails; the failure
    /// has already been reported as a notice.
    ///
    /// Without explicit `extracted_text`, the session's uploaded text is used.
    pub async fn generate_queries(
        &self,
        session: &Session,
        req: QueryRequest,
        events: &EventSink,
    ) -> Vec<String> {
        let req = with_uploaded_text(req, session);
        self.queries.generate(&req, events).await.unwrap_or_default()
    }

    pub async fn generate_verbose_query(
        &self,
        session: &mut Session,
        req: QueryRequest,
        events: &EventSink,
    ) -> Option<String> {
        let req = with_uploaded_text(req, session);
        self.verbose.generate(&req, session, events).await
    }

    /// Render `results` and keep the view on the session for toggles and sorts.
    pub async fn render_results(
        &self,
        session: &mut Session,
        results: Vec<PaperResult>,
        events: &EventSink,
    ) -> RenderedResults {
        let rendered = self.renderer.render(results, events).await;
        session.results = Some(rendered.view.clone());
        rendered
    }

    /// Toggle one card's expand state, returning its new markup.
    pub fn toggle_card(&self, session: &mut Session, index: usize) -> Option<String> {
        session.results.as_mut()?.toggle(index)
    }

    /// Re-sort the session's results and return the new markup. No model
    /// calls are made.
    pub fn sort_results(&self, session: &mut Session, criteria: SortCriteria) -> Option<String> {
        let view = session.results.as_mut()?;
        view.sort(criteria);
        tracing::debug!(%criteria, "results re-sorted");
        Some(view.html())
    }
}

fn with_uploaded_text(mut req: QueryRequest, session: &Session) -> QueryRequest {
    if req.extracted_text.is_none() && !session.uploads.is_empty() {
        req.extracted_text = Some(session.uploads.combined_text());
    }
    req
}
