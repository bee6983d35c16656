use std::io::Write;
use std::sync::Arc;

use owo_colors::OwoColorize;
use papersift_core::{
    AddReport, EventSink, Notice, NoticeLevel, PipelineEvent, ResultStats, UploadedFile,
};

/// Whether to use colored output.
#[derive(Debug, Clone, Copy)]
pub struct ColorMode(pub bool);

impl ColorMode {
    pub fn enabled(&self) -> bool {
        self.0
    }
}

/// Print a notice as a single tagged line.
pub fn print_notice(w: &mut dyn Write, notice: &Notice, color: ColorMode) -> std::io::Result<()> {
    let tag = match notice.level {
        NoticeLevel::Info => "info",
        NoticeLevel::Success => "ok",
        NoticeLevel::Error => "error",
    };
    if !color.enabled() {
        return writeln!(w, "[{}] {}", tag, notice.message);
    }
    match notice.level {
        NoticeLevel::Info => writeln!(w, "[{}] {}", tag.cyan(), notice.message),
        NoticeLevel::Success => writeln!(w, "[{}] {}", tag.green(), notice.message),
        NoticeLevel::Error => writeln!(w, "[{}] {}", tag.red().bold(), notice.message.red()),
    }
}

/// An [`EventSink`] that prints busy messages and notices to stderr.
pub fn event_printer(color: ColorMode) -> EventSink {
    Arc::new(move |event| {
        let mut err = std::io::stderr().lock();
        let _ = match event {
            PipelineEvent::Busy(text) if color.enabled() => writeln!(err, "{}", text.dimmed()),
            PipelineEvent::Busy(text) => writeln!(err, "{}", text),
            PipelineEvent::Idle => Ok(()),
            PipelineEvent::Notice(n) => print_notice(&mut err, &n, color),
        };
    })
}

/// Print what happened to a batch of input files.
pub fn print_file_report(
    w: &mut dyn Write,
    report: &AddReport,
    files: &[UploadedFile],
    color: ColorMode,
) -> std::io::Result<()> {
    let total_chars: usize = files.iter().map(|f| f.text.chars().count()).sum();
    let line = format!(
        "{} file(s) loaded, {} characters of text",
        files.len(),
        total_chars
    );
    if color.enabled() {
        writeln!(w, "{}", line.bold())?;
    } else {
        writeln!(w, "{}", line)?;
    }
    if !report.failed.is_empty() {
        let failed = format!("({} file(s) could not be read)", report.failed.len());
        if color.enabled() {
            writeln!(w, "{}", failed.dimmed())?;
        } else {
            writeln!(w, "{}", failed)?;
        }
    }
    Ok(())
}

/// Print queries as a numbered list.
pub fn print_queries(w: &mut dyn Write, queries: &[String], color: ColorMode) -> std::io::Result<()> {
    for (i, q) in queries.iter().enumerate() {
        if color.enabled() {
            writeln!(w, "{} {}", format!("{}.", i + 1).dimmed(), q.bold())?;
        } else {
            writeln!(w, "{}. {}", i + 1, q)?;
        }
    }
    Ok(())
}

/// Print the one-line result summary shown above the cards.
pub fn print_stats(w: &mut dyn Write, stats: &ResultStats, color: ColorMode) -> std::io::Result<()> {
    let year = stats
        .average_year
        .map(|y| y.to_string())
        .unwrap_or_else(|| "N/A".to_string());
    let line = format!(
        "{} papers from {} sources, average year {}, {} citations",
        stats.total, stats.source_count, year, stats.total_citations
    );
    if color.enabled() {
        writeln!(w, "{}", line.cyan())
    } else {
        writeln!(w, "{}", line)
    }
}
