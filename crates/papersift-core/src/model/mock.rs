//! Scripted model backend for tests.

use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use super::{ModelBackend, ModelError, ModelFuture};

/// A configurable reply for [`MockModel`].
#[derive(Clone, Debug)]
pub enum MockReply {
    /// Return this text.
    Text(String),
    /// Return the input prefixed with this string.
    Echo(String),
    /// Simulate a non-2xx response.
    Status { status: u16, message: String },
    /// Simulate a 2xx response without the expected field.
    Missing,
}

impl MockReply {
    pub fn text(s: impl Into<String>) -> Self {
        MockReply::Text(s.into())
    }

    fn resolve(&self, endpoint: &'static str, input: &str) -> Result<String, ModelError> {
        match self {
            MockReply::Text(t) => Ok(t.clone()),
            MockReply::Echo(prefix) => Ok(format!("{prefix}{input}")),
            MockReply::Status { status, message } => Err(ModelError::Status {
                endpoint,
                status: *status,
                message: message.clone(),
            }),
            MockReply::Missing => Err(ModelError::MissingField("response")),
        }
    }
}

/// A hand-rolled mock implementing [`ModelBackend`].
///
/// - `refine` pops scripted replies in order, repeating the fallback once
///   the script runs out.
/// - `summarize` always uses one reply.
/// - Optional per-call latency, call counting, and an in-flight high-water
///   mark for checking concurrency.
pub struct MockModel {
    refine_script: Mutex<Vec<MockReply>>,
    refine_fallback: MockReply,
    summary: MockReply,
    delay: Option<Duration>,
    refine_calls: AtomicUsize,
    summarize_calls: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    prompts: Mutex<Vec<String>>,
}

impl MockModel {
    pub fn new(refine: MockReply, summary: MockReply) -> Self {
        Self {
            refine_script: Mutex::new(Vec::new()),
            refine_fallback: refine,
            summary,
            delay: None,
            refine_calls: AtomicUsize::new(0),
            summarize_calls: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
            prompts: Mutex::new(Vec::new()),
        }
    }

    /// Refine replies in order; the last one repeats once exhausted.
    pub fn with_refine_sequence(mut self, mut replies: Vec<MockReply>) -> Self {
        assert!(!replies.is_empty(), "sequence must have at least one reply");
        self.refine_fallback = replies.last().cloned().unwrap();
        replies.reverse();
        self.refine_script = Mutex::new(replies);
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn refine_calls(&self) -> usize {
        self.refine_calls.load(Ordering::SeqCst)
    }

    pub fn summarize_calls(&self) -> usize {
        self.summarize_calls.load(Ordering::SeqCst)
    }

    /// Highest number of calls observed in flight at once.
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    /// Every prompt passed to `refine`, in call order.
    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }

    fn next_refine(&self) -> MockReply {
        self.refine_script
            .lock()
            .unwrap()
            .pop()
            .unwrap_or_else(|| self.refine_fallback.clone())
    }

    async fn run(&self, reply: MockReply, endpoint: &'static str, input: &str) -> Result<String, ModelError> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        if let Some(d) = self.delay {
            tokio::time::sleep(d).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        reply.resolve(endpoint, input)
    }
}

impl ModelBackend for MockModel {
    fn name(&self) -> &str {
        "mock"
    }

    fn refine<'a>(&'a self, prompt: &'a str, _model: &'a str) -> ModelFuture<'a, String> {
        self.refine_calls.fetch_add(1, Ordering::SeqCst);
        self.prompts.lock().unwrap().push(prompt.to_string());
        let reply = self.next_refine();
        Box::pin(async move { self.run(reply, "Mock refine", prompt).await })
    }

    fn summarize<'a>(&'a self, abstract_text: &'a str, _model: &'a str) -> ModelFuture<'a, String> {
        self.summarize_calls.fetch_add(1, Ordering::SeqCst);
        let reply = self.summary.clone();
        Box::pin(async move { self.run(reply, "Mock summarize", abstract_text).await })
    }
}
