//! End-to-end runs of the [`Pipeline`] against a scripted model and an
//! in-memory PDF backend. No network or OCR binary is involved.

use std::sync::{Arc, Mutex};

use papersift_core::backend::{BackendError, PdfBackend};
use papersift_core::model::mock::{MockModel, MockReply};
use papersift_core::{
    Config, EventSink, IncomingFile, Notice, NoticeLevel, PaperResult, Pipeline, PipelineEvent,
    QueryRequest, Session, SortCriteria, TextExtractor,
};

/// Splits the document on form feeds, one page per chunk.
struct PagedPdf;

impl PdfBackend for PagedPdf {
    fn extract_pages(&self, data: &[u8]) -> Result<Vec<String>, BackendError> {
        let text = std::str::from_utf8(data).map_err(|e| BackendError::OpenError(e.to_string()))?;
        Ok(text.split('\x0c').map(str::to_string).collect())
    }
}

fn pipeline(mock: Arc<MockModel>) -> Pipeline {
    let extractor = TextExtractor::new().with_pdf(Arc::new(PagedPdf));
    Pipeline::new(Config::default(), extractor, mock)
}

fn recording_sink() -> (EventSink, Arc<Mutex<Vec<PipelineEvent>>>) {
    let log = Arc::new(Mutex::new(Vec::new()));
    let sink_log = log.clone();
    let sink: EventSink = Arc::new(move |e| sink_log.lock().unwrap().push(e));
    (sink, log)
}

fn notices(log: &Mutex<Vec<PipelineEvent>>) -> Vec<Notice> {
    log.lock()
        .unwrap()
        .iter()
        .filter_map(|e| match e {
            PipelineEvent::Notice(n) => Some(n.clone()),
            _ => None,
        })
        .collect()
}

#[tokio::test]
async fn uploaded_text_reaches_the_query_prompt_in_page_order() {
    let mock = Arc::new(MockModel::new(
        MockReply::text(r#"["ti:(lattice cryptography)"]"#),
        MockReply::Missing,
    ));
    let pipeline = pipeline(mock.clone());
    let mut session = Session::new();
    let (events, _) = recording_sink();

    pipeline
        .add_files(
            &mut session,
            vec![IncomingFile::new(
                "notes.pdf",
                "application/pdf",
                b"PAGE-ONE\x0cPAGE-TWO\x0cPAGE-THREE".to_vec(),
            )],
            &events,
        )
        .await;

    let queries = pipeline
        .generate_queries(
            &session,
            QueryRequest {
                topic: "post-quantum signatures".into(),
                ..Default::default()
            },
            &events,
        )
        .await;
    assert_eq!(queries, vec!["ti:(lattice cryptography)"]);

    let prompt = &mock.prompts()[0];
    let one = prompt.find("PAGE-ONE").unwrap();
    let two = prompt.find("PAGE-TWO").unwrap();
    let three = prompt.find("PAGE-THREE").unwrap();
    assert!(one < two && two < three);
}

#[tokio::test]
async fn failed_query_generation_yields_empty_list_and_error_notice() {
    let mock = Arc::new(MockModel::new(
        MockReply::text("I'm sorry, I can't produce queries for that."),
        MockReply::Missing,
    ));
    let pipeline = pipeline(mock.clone());
    let session = Session::new();
    let (events, log) = recording_sink();

    let queries = pipeline
        .generate_queries(
            &session,
            QueryRequest {
                topic: "x".into(),
                ..Default::default()
            },
            &events,
        )
        .await;

    assert!(queries.is_empty());
    assert_eq!(mock.refine_calls(), 1);
    let errors: Vec<_> = notices(&log)
        .into_iter()
        .filter(|n| n.level == NoticeLevel::Error)
        .collect();
    assert_eq!(errors.len(), 1);
    assert!(errors[0].message.starts_with("Failed to generate AI queries:"));

    let events = log.lock().unwrap();
    assert!(matches!(events.first(), Some(PipelineEvent::Busy(_))));
    assert!(events.contains(&PipelineEvent::Idle));
}

#[tokio::test]
async fn verbose_query_is_tracked_on_the_session() {
    let mock = Arc::new(
        MockModel::new(MockReply::Missing, MockReply::Missing).with_refine_sequence(vec![
            MockReply::text("First paragraph."),
            MockReply::Status {
                status: 500,
                message: "model crashed".into(),
            },
        ]),
    );
    let pipeline = pipeline(mock);
    let mut session = Session::new();
    let events = papersift_core::discard_events();
    let req = QueryRequest {
        topic: "protein folding".into(),
        ..Default::default()
    };

    let first = pipeline
        .generate_verbose_query(&mut session, req.clone(), &events)
        .await;
    assert_eq!(first.as_deref(), Some("First paragraph."));
    assert_eq!(session.verbose_query, "First paragraph.");

    let second = pipeline.generate_verbose_query(&mut session, req, &events).await;
    assert!(second.is_none());
    assert_eq!(session.verbose_query, "");
}

#[tokio::test]
async fn render_toggle_and_sort_share_one_view() {
    let mock = Arc::new(MockModel::new(
        MockReply::Missing,
        MockReply::Echo("Summary of: ".into()),
    ));
    let pipeline = pipeline(mock.clone());
    let mut session = Session::new();
    let events = papersift_core::discard_events();

    let long_abstract = "Transformers ".repeat(40);
    let results = vec![
        PaperResult {
            title: "Older".into(),
            abstract_text: Some(long_abstract.clone()),
            published_date: Some("2018-01-01".into()),
            url: "https://example.org/older".into(),
            source: "arXiv".into(),
            ..Default::default()
        },
        PaperResult {
            title: "Newer".into(),
            abstract_text: Some("A short abstract under fifty characters.".into()),
            published_date: Some("2024-05-05".into()),
            url: "https://example.org/newer".into(),
            source: "Semantic Scholar".into(),
            ..Default::default()
        },
    ];

    let rendered = pipeline.render_results(&mut session, results, &events).await;
    assert_eq!(mock.summarize_calls(), 1);
    assert_eq!(rendered.stats.total, 2);
    assert_eq!(rendered.stats.source_count, 2);
    assert!(rendered.html.find("Older").unwrap() < rendered.html.find("Newer").unwrap());

    let card = pipeline.toggle_card(&mut session, 0).unwrap();
    assert!(card.contains("Read less"));
    assert!(card.contains(&format!("Summary of: {}", long_abstract.trim_end())));

    let html = pipeline
        .sort_results(&mut session, SortCriteria::Date)
        .unwrap();
    assert!(html.find("Newer").unwrap() < html.find("Older").unwrap());
    assert_eq!(mock.summarize_calls(), 1);
}

#[tokio::test]
async fn toggle_and_sort_without_results_are_no_ops() {
    let pipeline = pipeline(Arc::new(MockModel::new(MockReply::Missing, MockReply::Missing)));
    let mut session = Session::new();
    assert!(pipeline.toggle_card(&mut session, 0).is_none());
    assert!(pipeline.sort_results(&mut session, SortCriteria::Citations).is_none());
}
