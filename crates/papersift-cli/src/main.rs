use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use papersift_core::config_file::{self, ConfigFile, ModelConfig, OcrConfig, PipelineConfig, ServerConfig};
use papersift_core::{
    Config, HttpModelClient, ModelBackend, Notice, OllamaClient, Pipeline, PipelineEvent,
    QueryRequest, Session, SortCriteria,
};
use papersift_reporting::ExportFormat;

mod inputs;
mod output;

use output::ColorMode;

/// Papersift - turn a research topic and your documents into search queries,
/// and search results into summarized cards
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Cli {
    /// Disable colored output
    #[arg(long, global = true)]
    no_color: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Generate 3-5 academic search queries
    Queries {
        #[command(flatten)]
        topic: TopicArgs,
        #[command(flatten)]
        model: ModelArgs,
    },

    /// Generate one verbose paragraph suited to BM25 ranking
    Verbose {
        #[command(flatten)]
        topic: TopicArgs,
        #[command(flatten)]
        model: ModelArgs,
    },

    /// Summarize a results JSON file and render it as HTML cards
    Render {
        /// JSON file with an array of results (or `{"results": [...]}`)
        results: PathBuf,

        /// Order of the cards: relevance, date, or citations
        #[arg(long, default_value = "relevance")]
        sort: SortCriteria,

        /// Write HTML here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,

        #[command(flatten)]
        model: ModelArgs,
    },

    /// Summarize a results JSON file and export it
    Export {
        /// JSON file with an array of results (or `{"results": [...]}`)
        results: PathBuf,

        /// Export format: json, csv, or bibtex
        #[arg(short, long, default_value = "json")]
        format: ExportFormat,

        /// Order of the exported papers: relevance, date, or citations
        #[arg(long, default_value = "relevance")]
        sort: SortCriteria,

        /// Write the export here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,

        #[command(flatten)]
        model: ModelArgs,
    },

    /// Show the resolved configuration
    Config {
        /// Write the resolved configuration to the platform config file
        #[arg(long)]
        save: bool,
    },
}

#[derive(Args, Debug)]
struct TopicArgs {
    /// Main topic or question
    #[arg(short, long)]
    topic: String,

    /// Additional notes or context
    #[arg(short, long)]
    notes: Option<String>,

    /// Subject focus (e.g. cs, physics, math)
    #[arg(long)]
    subject: Option<String>,

    /// Paper type (e.g. survey, empirical study)
    #[arg(long)]
    paper_type: Option<String>,

    /// PDFs or images whose text is used as context
    files: Vec<PathBuf>,
}

impl TopicArgs {
    fn request(&self) -> QueryRequest {
        QueryRequest {
            topic: self.topic.clone(),
            notes: self.notes.clone(),
            extracted_text: None,
            subject: self.subject.clone(),
            paper_type: self.paper_type.clone(),
        }
    }
}

#[derive(Args, Debug)]
struct ModelArgs {
    /// Model identifier sent with each request
    #[arg(long)]
    model: Option<String>,

    /// Server exposing the /api/ollama-* endpoints
    #[arg(long)]
    backend_url: Option<String>,

    /// Talk to Ollama directly instead of the backend server
    #[arg(long)]
    ollama: bool,

    /// Per-request timeout in seconds
    #[arg(long)]
    timeout: Option<u64>,
}

impl ModelArgs {
    fn apply(&self, config: &mut Config) {
        if let Some(model) = &self.model {
            config.model = model.clone();
        }
        if let Some(url) = &self.backend_url {
            config.backend_url = url.clone();
        }
        if let Some(secs) = self.timeout {
            config.request_timeout_secs = Some(secs);
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let color = ColorMode(!cli.no_color);

    match cli.command {
        Command::Queries { topic, model } => queries(topic, model, color).await,
        Command::Verbose { topic, model } => verbose(topic, model, color).await,
        Command::Render {
            results,
            sort,
            output,
            model,
        } => render(results, sort, output, model, color).await,
        Command::Export {
            results,
            format,
            sort,
            output,
            model,
        } => export(results, format, sort, output, model, color).await,
        Command::Config { save } => show_config(save),
    }
}

/// Resolve configuration: CLI flags > env vars > config files > defaults.
fn resolve_config(model_args: &ModelArgs) -> Config {
    let mut config = config_file::resolve(&config_file::load_config()).apply_env();
    model_args.apply(&mut config);
    config
}

fn build_pipeline(model_args: &ModelArgs) -> Pipeline {
    let config = resolve_config(model_args);
    let timeout = config.request_timeout_secs.map(Duration::from_secs);
    let client = reqwest::Client::new();

    let model: Arc<dyn ModelBackend> = if model_args.ollama {
        Arc::new(OllamaClient::new(client, &config.ollama_url).with_timeout(timeout))
    } else {
        Arc::new(HttpModelClient::new(client, &config.backend_url).with_timeout(timeout))
    };
    tracing::debug!(backend = model.name(), model = %config.model, "model backend configured");

    let extractor = papersift_ingest::default_extractor(&config);
    Pipeline::new(config, extractor, model)
}

/// Extract every input document into a fresh session.
async fn load_session(
    pipeline: &Pipeline,
    paths: &[PathBuf],
    color: ColorMode,
) -> anyhow::Result<Session> {
    let mut session = Session::new();
    if paths.is_empty() {
        return Ok(session);
    }

    let read = inputs::read_documents(paths);
    let events = output::event_printer(color);
    for (_, message) in &read.failed {
        events(PipelineEvent::Notice(Notice::error(message.clone())));
    }
    let mut report = pipeline.add_files(&mut session, read.files, &events).await;
    let mut failed = read.failed;
    failed.append(&mut report.failed);
    report.failed = failed;
    output::print_file_report(
        &mut std::io::stderr(),
        &report,
        session.uploads.files(),
        color,
    )?;
    Ok(session)
}

async fn queries(topic: TopicArgs, model: ModelArgs, color: ColorMode) -> anyhow::Result<()> {
    let pipeline = build_pipeline(&model);
    let session = load_session(&pipeline, &topic.files, color).await?;
    let events = output::event_printer(color);

    let queries = pipeline
        .generate_queries(&session, topic.request(), &events)
        .await;
    if queries.is_empty() {
        anyhow::bail!("No queries were generated");
    }
    output::print_queries(&mut std::io::stdout(), &queries, color)?;
    Ok(())
}

async fn verbose(topic: TopicArgs, model: ModelArgs, color: ColorMode) -> anyhow::Result<()> {
    let pipeline = build_pipeline(&model);
    let mut session = load_session(&pipeline, &topic.files, color).await?;
    let events = output::event_printer(color);

    match pipeline
        .generate_verbose_query(&mut session, topic.request(), &events)
        .await
    {
        Some(text) => {
            writeln!(std::io::stdout(), "{}", text)?;
            Ok(())
        }
        None => anyhow::bail!("No verbose query was generated"),
    }
}

/// Summarize `results` into a session view, sorted by `sort`.
async fn summarized_session(
    pipeline: &Pipeline,
    results: &Path,
    sort: SortCriteria,
    color: ColorMode,
) -> anyhow::Result<(Session, String)> {
    let papers = inputs::load_results(results)?;
    tracing::info!(papers = papers.len(), file = %results.display(), "loaded results");

    let events = output::event_printer(color);
    let mut session = Session::new();
    let rendered = pipeline.render_results(&mut session, papers, &events).await;
    if rendered.show_header {
        output::print_stats(&mut std::io::stderr(), &rendered.stats, color)?;
    }

    let html = pipeline
        .sort_results(&mut session, sort)
        .unwrap_or(rendered.html);
    Ok((session, html))
}

fn write_output(output: Option<&Path>, content: &str) -> anyhow::Result<()> {
    match output {
        Some(path) => {
            std::fs::write(path, content)?;
            eprintln!("Wrote {}", path.display());
        }
        None => std::io::stdout().write_all(content.as_bytes())?,
    }
    Ok(())
}

async fn render(
    results: PathBuf,
    sort: SortCriteria,
    output: Option<PathBuf>,
    model: ModelArgs,
    color: ColorMode,
) -> anyhow::Result<()> {
    let pipeline = build_pipeline(&model);
    let (_, html) = summarized_session(&pipeline, &results, sort, color).await?;
    write_output(output.as_deref(), &html)
}

async fn export(
    results: PathBuf,
    format: ExportFormat,
    sort: SortCriteria,
    output: Option<PathBuf>,
    model: ModelArgs,
    color: ColorMode,
) -> anyhow::Result<()> {
    let pipeline = build_pipeline(&model);
    let (session, _) = summarized_session(&pipeline, &results, sort, color).await?;

    let Some(view) = session.results.as_ref().filter(|v| !v.is_empty()) else {
        anyhow::bail!("No results to export");
    };
    match output {
        Some(path) => {
            papersift_reporting::export_to_path(view.papers(), format, &path)
                .map_err(anyhow::Error::msg)?;
            eprintln!("Exported {} papers as {} to {}", view.len(), format, path.display());
            Ok(())
        }
        None => write_output(None, &papersift_reporting::export(view.papers(), format)),
    }
}

fn show_config(save: bool) -> anyhow::Result<()> {
    let config = config_file::resolve(&config_file::load_config()).apply_env();
    let file = to_config_file(&config);

    if save {
        let path = config_file::save_config(&file).map_err(anyhow::Error::msg)?;
        eprintln!("Saved configuration to {}", path.display());
    }
    print!("{}", toml::to_string_pretty(&file)?);
    Ok(())
}

fn to_config_file(config: &Config) -> ConfigFile {
    ConfigFile {
        model: Some(ModelConfig {
            backend_url: Some(config.backend_url.clone()),
            ollama_url: Some(config.ollama_url.clone()),
            model: Some(config.model.clone()),
            timeout_secs: config.request_timeout_secs,
        }),
        pipeline: Some(PipelineConfig {
            query_context_chars: Some(config.query_context_chars),
            verbose_context_chars: Some(config.verbose_context_chars),
            summary_min_chars: Some(config.summary_min_chars),
            abstract_display_chars: Some(config.abstract_display_chars),
        }),
        ocr: Some(OcrConfig {
            tesseract_cmd: Some(config.tesseract_cmd.clone()),
            language: Some(config.ocr_language.clone()),
        }),
        server: Some(ServerConfig {
            bind: Some(config.bind.clone()),
        }),
    }
}
