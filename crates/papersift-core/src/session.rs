use crate::render::ResultsView;
use crate::upload::UploadManager;

/// Per-user working state: uploads, the current verbose query, and the
/// rendered results with their per-card view state.
#[derive(Debug, Default)]
pub struct Session {
    pub uploads: UploadManager,
    /// Latest verbose query; empty when none has been generated or the
    /// last attempt failed.
    pub verbose_query: String,
    pub results: Option<ResultsView>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }
}
