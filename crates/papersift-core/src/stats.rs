use std::collections::HashSet;

use chrono::Datelike;
use serde::Serialize;

use crate::PaperResult;
use crate::render::parse_published;

/// Summary figures shown above a result list.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultStats {
    pub total: usize,
    /// Mean publication year over papers with a parseable date, rounded.
    pub average_year: Option<i32>,
    /// Distinct non-empty `source` values.
    pub source_count: usize,
    /// Sum of known citation counts.
    pub total_citations: u64,
}

impl ResultStats {
    pub fn from_papers<'a>(papers: impl IntoIterator<Item = &'a PaperResult>) -> Self {
        let mut stats = ResultStats::default();
        let mut sources = HashSet::new();
        let mut years = Vec::new();

        for p in papers {
            stats.total += 1;
            if !p.source.is_empty() {
                sources.insert(p.source.as_str());
            }
            if let Some(date) = p.published_date.as_deref().and_then(parse_published) {
                years.push(date.year() as i64);
            }
            stats.total_citations += p.citations.unwrap_or(0);
        }

        stats.source_count = sources.len();
        if !years.is_empty() {
            let mean = years.iter().sum::<i64>() as f64 / years.len() as f64;
            stats.average_year = Some(mean.round() as i32);
        }
        stats
    }
}
