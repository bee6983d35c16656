use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime};

use crate::sort::SortCriteria;
use crate::stats::ResultStats;
use crate::summarize::{AbstractSummarizer, truncate_with_ellipsis};
use crate::{EventSink, PaperResult, SummarizedPaper};

pub const NO_RESULTS_HTML: &str =
    "<p class=\"message info\">No papers found matching your criteria.</p>";

const NO_ABSTRACT: &str = "No abstract available.";

/// Output of [`ResultsRenderer::render`].
#[derive(Debug, Clone)]
pub struct RenderedResults {
    pub html: String,
    /// Whether the results header (count, sort controls) should be shown.
    pub show_header: bool,
    /// Whether the export controls should be shown.
    pub show_export: bool,
    pub stats: ResultStats,
    /// Card state for later toggles and re-sorts.
    pub view: ResultsView,
}

/// Turns search results into summarized paper cards.
pub struct ResultsRenderer {
    summarizer: AbstractSummarizer,
    display_chars: usize,
}

impl ResultsRenderer {
    pub fn new(summarizer: AbstractSummarizer, display_chars: usize) -> Self {
        Self {
            summarizer,
            display_chars,
        }
    }

    /// Summarize every abstract concurrently, then render one card per
    /// result in input order.
    pub async fn render(&self, results: Vec<PaperResult>, events: &EventSink) -> RenderedResults {
        if results.is_empty() {
            tracing::info!("no results to render");
        } else {
            tracing::info!(count = results.len(), "rendering results");
        }
        let papers = self.summarizer.summarize_all(results, events).await;
        let view = ResultsView::new(papers, self.display_chars);
        RenderedResults {
            html: view.html(),
            show_header: !view.is_empty(),
            show_export: !view.is_empty(),
            stats: view.stats(),
            view,
        }
    }
}

/// Rendered papers plus per-card expand state.
///
/// Expand state is indexed by card position, so toggling card `i` never
/// affects another card.
#[derive(Debug, Clone, Default)]
pub struct ResultsView {
    papers: Vec<SummarizedPaper>,
    expanded: Vec<bool>,
    display_chars: usize,
}

impl ResultsView {
    pub fn new(papers: Vec<SummarizedPaper>, display_chars: usize) -> Self {
        let expanded = vec![false; papers.len()];
        Self {
            papers,
            expanded,
            display_chars,
        }
    }

    pub fn papers(&self) -> &[SummarizedPaper] {
        &self.papers
    }

    pub fn len(&self) -> usize {
        self.papers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.papers.is_empty()
    }

    pub fn is_expanded(&self, index: usize) -> bool {
        self.expanded.get(index).copied().unwrap_or(false)
    }

    /// Whether card `index` has a summary long enough to need a toggle.
    pub fn is_toggleable(&self, index: usize) -> bool {
        self.papers
            .get(index)
            .and_then(|p| p.ai_summary.as_deref())
            .is_some_and(|s| s.chars().count() > self.display_chars)
    }

    /// Flip card `index` between truncated and full summary and return its
    /// new markup. Cards without a toggle, and out-of-range indices, are
    /// left alone.
    pub fn toggle(&mut self, index: usize) -> Option<String> {
        if !self.is_toggleable(index) {
            return None;
        }
        self.expanded[index] = !self.expanded[index];
        self.render_card(index)
    }

    /// Reorder the cards. All cards collapse; summaries are reused.
    pub fn sort(&mut self, criteria: SortCriteria) {
        criteria.sort(&mut self.papers);
        self.expanded = vec![false; self.papers.len()];
    }

    pub fn stats(&self) -> ResultStats {
        ResultStats::from_papers(self.papers.iter().map(|p| &p.paper))
    }

    pub fn html(&self) -> String {
        if self.papers.is_empty() {
            return NO_RESULTS_HTML.to_string();
        }
        (0..self.papers.len())
            .filter_map(|i| self.render_card(i))
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn render_card(&self, index: usize) -> Option<String> {
        let sp = self.papers.get(index)?;
        let p = &sp.paper;
        let expanded = self.is_expanded(index);

        let authors = if p.authors.is_empty() {
            "N/A".to_string()
        } else {
            p.authors.join(", ")
        };
        let summary = match sp.ai_summary.as_deref() {
            Some(s) if !s.is_empty() => {
                if expanded {
                    s.to_string()
                } else {
                    truncate_with_ellipsis(s, self.display_chars)
                }
            }
            _ => NO_ABSTRACT.to_string(),
        };
        let citations = p
            .citations
            .map(|c| c.to_string())
            .unwrap_or_else(|| "N/A".to_string());

        let mut out = String::with_capacity(1024);
        out.push_str(&format!("<div class=\"paper-card\" data-index=\"{}\">\n", index));
        out.push_str("<div class=\"paper-header\">\n");
        out.push_str(&format!(
            "<h4 class=\"paper-title\"><a href=\"{}\" target=\"_blank\" rel=\"noopener noreferrer\">{}</a></h4>\n",
            html_escape(&p.url),
            html_escape(&p.title)
        ));
        out.push_str(&format!(
            "<span class=\"paper-source\">{}</span>\n",
            html_escape(&p.source)
        ));
        out.push_str("</div>\n");
        out.push_str(&format!(
            "<p class=\"paper-authors\">Authors: {}</p>\n",
            html_escape(&authors)
        ));
        out.push_str(&format!(
            "<div class=\"paper-abstract{}\">{}</div>\n",
            if expanded { " expanded" } else { "" },
            html_escape(&summary)
        ));
        if self.is_toggleable(index) {
            out.push_str(&format!(
                "<span class=\"abstract-toggle\" data-index=\"{}\">{}</span>\n",
                index,
                if expanded { "Read less" } else { "Read more" }
            ));
        }
        out.push_str("<div class=\"paper-meta\">\n");
        out.push_str(&format!(
            "<span>Published: {}</span>\n",
            html_escape(&format_date(p.published_date.as_deref()))
        ));
        out.push_str(&format!("<span>Citations: {}</span>\n", citations));
        out.push_str("<div class=\"paper-actions\">\n");
        if let Some(pdf) = p.pdf_url.as_deref().filter(|u| !u.is_empty()) {
            out.push_str(&format!(
                "<a href=\"{}\" class=\"action-btn\" target=\"_blank\" rel=\"noopener noreferrer\">PDF</a>\n",
                html_escape(pdf)
            ));
        }
        out.push_str(&format!(
            "<a href=\"{}\" class=\"action-btn\" target=\"_blank\" rel=\"noopener noreferrer\">Source Page</a>\n",
            html_escape(&p.url)
        ));
        out.push_str("</div>\n</div>\n</div>");
        Some(out)
    }
}

pub fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

/// Parse the date formats search backends return: RFC 3339 timestamps,
/// `YYYY-MM-DD` (optionally followed by a time), or a bare year.
pub fn parse_published(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.date_naive());
    }
    if let Ok(d) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return Some(d);
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S") {
        return Some(dt.date());
    }
    if let Some(d) = s
        .get(..10)
        .and_then(|prefix| NaiveDate::parse_from_str(prefix, "%Y-%m-%d").ok())
    {
        return Some(d);
    }
    if s.len() == 4 {
        return s.parse::<i32>().ok().and_then(|y| NaiveDate::from_ymd_opt(y, 1, 1));
    }
    None
}

/// `M/D/YYYY`, `N/A` when absent. Unparseable values are shown as given.
pub fn format_date(date: Option<&str>) -> String {
    match date.map(str::trim).filter(|d| !d.is_empty()) {
        None => "N/A".to_string(),
        Some(raw) => match parse_published(raw) {
            Some(d) => format!("{}/{}/{}", d.month(), d.day(), d.year()),
            None => raw.to_string(),
        },
    }
}
