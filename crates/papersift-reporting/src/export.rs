use std::collections::HashSet;
use std::fmt;
use std::io::Write;
use std::path::Path;
use std::str::FromStr;

use chrono::Datelike;
use papersift_core::SummarizedPaper;
use papersift_core::render::{format_date, parse_published};

/// Export format options.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Json,
    Csv,
    Bibtex,
}

impl ExportFormat {
    pub fn all() -> &'static [ExportFormat] {
        &[ExportFormat::Json, ExportFormat::Csv, ExportFormat::Bibtex]
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Json => "JSON",
            Self::Csv => "CSV",
            Self::Bibtex => "BibTeX",
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Csv => "csv",
            Self::Bibtex => "bib",
        }
    }

    pub fn mime_type(self) -> &'static str {
        match self {
            Self::Json => "application/json",
            Self::Csv => "text/csv; charset=utf-8",
            Self::Bibtex => "application/x-bibtex; charset=utf-8",
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for ExportFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "csv" => Ok(Self::Csv),
            "bibtex" | "bib" => Ok(Self::Bibtex),
            other => Err(format!("unsupported export format: {other}")),
        }
    }
}

pub fn export(papers: &[SummarizedPaper], format: ExportFormat) -> String {
    match format {
        ExportFormat::Json => export_json(papers),
        ExportFormat::Csv => export_csv(papers),
        ExportFormat::Bibtex => export_bibtex(papers),
    }
}

/// Export `papers` to the given path.
pub fn export_to_path(
    papers: &[SummarizedPaper],
    format: ExportFormat,
    path: &Path,
) -> Result<(), String> {
    let content = export(papers, format);
    let mut file =
        std::fs::File::create(path).map_err(|e| format!("Failed to create file: {}", e))?;
    file.write_all(content.as_bytes())
        .map_err(|e| format!("Failed to write: {}", e))?;
    Ok(())
}

pub fn export_json(papers: &[SummarizedPaper]) -> String {
    // Plain structs of strings and numbers always serialize.
    let mut out = serde_json::to_string_pretty(papers).unwrap_or_else(|_| "[]".to_string());
    out.push('\n');
    out
}

fn csv_escape(s: &str) -> String {
    if s.contains('"') || s.contains(',') || s.contains('\n') {
        format!("\"{}\"", s.replace('"', "\"\""))
    } else {
        s.to_string()
    }
}

pub fn export_csv(papers: &[SummarizedPaper]) -> String {
    let mut out = String::from("Title,Authors,Source,Published,Citations,URL,PDF URL,Summary\n");
    for sp in papers {
        let p = &sp.paper;
        let published = match p.published_date.as_deref() {
            Some(_) => format_date(p.published_date.as_deref()),
            None => String::new(),
        };
        let citations = p.citations.map(|c| c.to_string()).unwrap_or_default();
        out.push_str(&format!(
            "{},{},{},{},{},{},{},{}\n",
            csv_escape(&p.title),
            csv_escape(&p.authors.join("; ")),
            csv_escape(&p.source),
            csv_escape(&published),
            citations,
            csv_escape(&p.url),
            csv_escape(p.pdf_url.as_deref().unwrap_or("")),
            csv_escape(sp.ai_summary.as_deref().unwrap_or("")),
        ));
    }
    out
}

fn bib_escape(s: &str) -> String {
    s.replace('\\', "\\textbackslash{}")
        .replace('{', "\\{")
        .replace('}', "\\}")
}

/// Lowercase ASCII letters and digits of `s`.
fn key_part(s: &str) -> String {
    s.chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

/// `<surname><year><first title word>`, e.g. `vaswani2017attention`.
fn citation_key(sp: &SummarizedPaper) -> String {
    let p = &sp.paper;
    let surname = p
        .authors
        .first()
        .and_then(|a| a.split_whitespace().last())
        .map(key_part)
        .unwrap_or_default();
    let year = p
        .published_date
        .as_deref()
        .and_then(parse_published)
        .map(|d| d.year().to_string())
        .unwrap_or_default();
    let word = p
        .title
        .split_whitespace()
        .map(key_part)
        .find(|w| w.len() > 3)
        .unwrap_or_default();

    let key = format!("{surname}{year}{word}");
    if key.is_empty() { "paper".to_string() } else { key }
}

/// Bijective base-26 suffix: 1 is `a`, 26 is `z`, 27 is `aa`.
fn key_suffix(mut n: usize) -> String {
    let mut letters = Vec::new();
    while n > 0 {
        n -= 1;
        letters.push((b'a' + (n % 26) as u8) as char);
        n /= 26;
    }
    letters.iter().rev().collect()
}

pub fn export_bibtex(papers: &[SummarizedPaper]) -> String {
    let mut out = String::new();
    let mut used: HashSet<String> = HashSet::new();

    for sp in papers {
        let p = &sp.paper;
        let base = citation_key(sp);
        let mut key = base.clone();
        let mut n = 0;
        while used.contains(&key) {
            n += 1;
            key = format!("{base}{}", key_suffix(n));
        }
        used.insert(key.clone());

        out.push_str(&format!("@article{{{},\n", key));
        out.push_str(&format!("  title = {{{}}},\n", bib_escape(&p.title)));
        if !p.authors.is_empty() {
            out.push_str(&format!(
                "  author = {{{}}},\n",
                bib_escape(&p.authors.join(" and "))
            ));
        }
        if let Some(date) = p.published_date.as_deref().and_then(parse_published) {
            out.push_str(&format!("  year = {{{}}},\n", date.year()));
        }
        if !p.url.is_empty() {
            out.push_str(&format!("  url = {{{}}},\n", bib_escape(&p.url)));
        }
        if !p.source.is_empty() {
            out.push_str(&format!("  note = {{Source: {}}},\n", bib_escape(&p.source)));
        }
        if let Some(abs) = p.abstract_text.as_deref().filter(|a| !a.is_empty()) {
            out.push_str(&format!("  abstract = {{{}}},\n", bib_escape(abs)));
        }
        out.push_str("}\n\n");
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use papersift_core::PaperResult;

    fn attention() -> SummarizedPaper {
        SummarizedPaper {
            paper: PaperResult {
                title: "Attention Is All You Need".into(),
                authors: vec!["Ashish Vaswani".into(), "Noam Shazeer".into()],
                abstract_text: Some("We propose the Transformer, based on {attention}.".into()),
                url: "https://arxiv.org/abs/1706.03762".into(),
                pdf_url: Some("https://arxiv.org/pdf/1706.03762".into()),
                source: "arXiv".into(),
                published_date: Some("2017-06-12".into()),
                citations: Some(100000),
                relevance_score: None,
            },
            ai_summary: Some("Introduces the Transformer, an attention-only model.".into()),
        }
    }

    #[test]
    fn format_names_parse() {
        assert_eq!("bib".parse::<ExportFormat>(), Ok(ExportFormat::Bibtex));
        assert_eq!("JSON".parse::<ExportFormat>(), Ok(ExportFormat::Json));
        assert!("pdf".parse::<ExportFormat>().is_err());
    }

    #[test]
    fn json_includes_summary() {
        let out = export_json(&[attention()]);
        let v: serde_json::Value = serde_json::from_str(&out).unwrap();
        assert_eq!(v[0]["title"], "Attention Is All You Need");
        assert_eq!(v[0]["aiSummary"], "Introduces the Transformer, an attention-only model.");
        assert_eq!(v[0]["pdfUrl"], "https://arxiv.org/pdf/1706.03762");
    }

    #[test]
    fn csv_quotes_fields_with_commas() {
        let out = export_csv(&[attention()]);
        let mut lines = out.lines();
        assert_eq!(
            lines.next(),
            Some("Title,Authors,Source,Published,Citations,URL,PDF URL,Summary")
        );
        let row = lines.next().unwrap();
        assert!(row.starts_with("Attention Is All You Need,Ashish Vaswani; Noam Shazeer,arXiv,6/12/2017,100000,"));
        assert!(row.ends_with(",\"Introduces the Transformer, an attention-only model.\""));
    }

    #[test]
    fn csv_leaves_missing_values_blank() {
        let sp = SummarizedPaper {
            paper: PaperResult {
                title: "Untitled \"draft\"".into(),
                ..Default::default()
            },
            ai_summary: None,
        };
        let out = export_csv(&[sp]);
        assert_eq!(out.lines().nth(1), Some("\"Untitled \"\"draft\"\"\",,,,,,,"));
    }

    #[test]
    fn bibtex_entry_fields_and_escaping() {
        let out = export_bibtex(&[attention()]);
        assert!(out.starts_with("@article{vaswani2017attention,\n"));
        assert!(out.contains("  author = {Ashish Vaswani and Noam Shazeer},\n"));
        assert!(out.contains("  year = {2017},\n"));
        assert!(out.contains("  note = {Source: arXiv},\n"));
        assert!(out.contains("based on \\{attention\\}."));
    }

    #[test]
    fn bibtex_keys_are_unique() {
        let out = export_bibtex(&[attention(), attention(), attention()]);
        assert!(out.contains("@article{vaswani2017attention,"));
        assert!(out.contains("@article{vaswani2017attentiona,"));
        assert!(out.contains("@article{vaswani2017attentionb,"));
    }

    fn graph_paper(title: &str) -> SummarizedPaper {
        SummarizedPaper {
            paper: PaperResult {
                title: title.into(),
                authors: vec!["Jane Smith".into()],
                published_date: Some("2020-05-01".into()),
                ..Default::default()
            },
            ai_summary: None,
        }
    }

    fn keys(bib: &str) -> Vec<&str> {
        bib.lines()
            .filter_map(|l| l.strip_prefix("@article{"))
            .map(|l| l.trim_end_matches(','))
            .collect()
    }

    #[test]
    fn suffixed_key_never_collides_with_another_base_key() {
        let papers = [
            graph_paper("Graph nets"),
            graph_paper("Graph nets"),
            graph_paper("Grapha nets"),
        ];
        let out = export_bibtex(&papers);
        assert_eq!(
            keys(&out),
            vec!["smith2020graph", "smith2020grapha", "smith2020graphaa"]
        );
    }

    #[test]
    fn suffixes_continue_past_z() {
        let papers: Vec<_> = (0..29).map(|_| graph_paper("Graph nets")).collect();
        let out = export_bibtex(&papers);
        let keys = keys(&out);
        let unique: HashSet<&str> = keys.iter().copied().collect();
        assert_eq!(unique.len(), 29);
        assert_eq!(keys[26], "smith2020graphz");
        assert_eq!(keys[27], "smith2020graphaa");
        assert_eq!(keys[28], "smith2020graphab");
    }

    #[test]
    fn key_suffix_sequence() {
        assert_eq!(key_suffix(1), "a");
        assert_eq!(key_suffix(26), "z");
        assert_eq!(key_suffix(27), "aa");
        assert_eq!(key_suffix(52), "az");
        assert_eq!(key_suffix(53), "ba");
    }

    #[test]
    fn bibtex_url_braces_are_escaped() {
        let mut sp = attention();
        sp.paper.url = "https://example.org/{id}".into();
        let out = export_bibtex(&[sp]);
        assert!(out.contains("  url = {https://example.org/\\{id\\}},\n"));
    }
}
