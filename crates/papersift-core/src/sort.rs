use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::SummarizedPaper;
use crate::render::parse_published;

/// Ordering applied to rendered results.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortCriteria {
    /// Highest relevance score first.
    #[default]
    Relevance,
    /// Newest first.
    Date,
    /// Most cited first.
    Citations,
}

impl SortCriteria {
    pub fn as_str(self) -> &'static str {
        match self {
            SortCriteria::Relevance => "relevance",
            SortCriteria::Date => "date",
            SortCriteria::Citations => "citations",
        }
    }

    /// Stable sort; papers missing the sort key go last in their original order.
    pub fn sort(self, papers: &mut [SummarizedPaper]) {
        match self {
            SortCriteria::Relevance => papers.sort_by(|a, b| {
                desc_missing_last(a.paper.relevance_score, b.paper.relevance_score, |x, y| {
                    x.total_cmp(y)
                })
            }),
            SortCriteria::Date => papers.sort_by(|a, b| {
                let da = a.paper.published_date.as_deref().and_then(parse_published);
                let db = b.paper.published_date.as_deref().and_then(parse_published);
                desc_missing_last(da, db, Ord::cmp)
            }),
            SortCriteria::Citations => papers.sort_by(|a, b| {
                desc_missing_last(a.paper.citations, b.paper.citations, Ord::cmp)
            }),
        }
    }
}

fn desc_missing_last<T>(a: Option<T>, b: Option<T>, cmp: impl Fn(&T, &T) -> Ordering) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => cmp(&b, &a),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

impl fmt::Display for SortCriteria {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SortCriteria {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "relevance" => Ok(SortCriteria::Relevance),
            "date" => Ok(SortCriteria::Date),
            "citations" => Ok(SortCriteria::Citations),
            other => Err(format!("unknown sort criteria: {other}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::PaperResult;

    fn paper(title: &str, score: Option<f64>, date: Option<&str>, cites: Option<u64>) -> SummarizedPaper {
        SummarizedPaper {
            paper: PaperResult {
                title: title.into(),
                relevance_score: score,
                published_date: date.map(str::to_string),
                citations: cites,
                ..Default::default()
            },
            ai_summary: None,
        }
    }

    fn titles(papers: &[SummarizedPaper]) -> Vec<&str> {
        papers.iter().map(|p| p.paper.title.as_str()).collect()
    }

    #[test]
    fn relevance_puts_unscored_last() {
        let mut papers = vec![
            paper("none", None, None, None),
            paper("low", Some(0.2), None, None),
            paper("high", Some(3.5), None, None),
        ];
        SortCriteria::Relevance.sort(&mut papers);
        assert_eq!(titles(&papers), vec!["high", "low", "none"]);
    }

    #[test]
    fn date_is_newest_first_and_undated_last() {
        let mut papers = vec![
            paper("undated", None, None, None),
            paper("old", None, Some("2015-03-01"), None),
            paper("garbled", None, Some("sometime"), None),
            paper("new", None, Some("2023-11-20T08:00:00Z"), None),
        ];
        SortCriteria::Date.sort(&mut papers);
        assert_eq!(titles(&papers), vec!["new", "old", "undated", "garbled"]);
    }

    #[test]
    fn citations_sort_is_stable() {
        let mut papers = vec![
            paper("a", None, None, Some(10)),
            paper("b", None, None, None),
            paper("c", None, None, Some(10)),
            paper("d", None, None, Some(99)),
        ];
        SortCriteria::Citations.sort(&mut papers);
        assert_eq!(titles(&papers), vec!["d", "a", "c", "b"]);
    }

    #[test]
    fn parses_names() {
        assert_eq!("Date".parse::<SortCriteria>(), Ok(SortCriteria::Date));
        assert!("year".parse::<SortCriteria>().is_err());
    }
}
