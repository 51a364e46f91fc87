//! End-to-end scenarios: intake directories, queue, pipeline, ledger and a
//! mock chat-completions API.
//!
//! External tools are replaced by a stub runner. Stub "PDFs" are text files:
//! plain lines are the embedded text layer, lines starting with `#` are
//! scanned content that only OCR can read.

use std::collections::{HashSet, VecDeque};
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::post;
use axum::Router;
use tempfile::TempDir;
use tokio::sync::watch;

use paperintake::config::Layout;
use paperintake::llm::{
    Classification, ClassificationClient, ClassificationError, LlmConfig, TitleClassifier,
};
use paperintake::models::{Document, ProcessingMode};
use paperintake::ocr::{CommandRunner, Invocation, OcrOptions, PdfToolchain, Tool, ToolError, ToolOutput};
use paperintake::rate_limit::BackoffPolicy;
use paperintake::repository::TitleLedger;
use paperintake::services::{intake_queue, startup_scan, DocumentPipeline, QueueStats};

// ---------------------------------------------------------------------------
// Stub tools
// ---------------------------------------------------------------------------

#[derive(Default)]
struct StubTools {
    calls: Mutex<Vec<(Tool, String)>>,
    broken: Mutex<HashSet<String>>,
}

impl StubTools {
    /// Make every tool fail for inputs with this filename.
    fn break_file(&self, filename: &str) {
        self.broken.lock().unwrap().insert(filename.to_string());
    }

    fn ocr_runs(&self, filename: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|(tool, name)| *tool == Tool::Ocr && name == filename)
            .count()
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

#[async_trait]
impl CommandRunner for StubTools {
    async fn run(&self, invocation: &Invocation) -> Result<ToolOutput, ToolError> {
        let name = file_name(&invocation.input);
        self.calls
            .lock()
            .unwrap()
            .push((invocation.tool, name.clone()));
        if self.broken.lock().unwrap().contains(&name) {
            return Ok(ToolOutput {
                success: false,
                stderr: "stub failure".to_string(),
            });
        }

        let content = std::fs::read_to_string(&invocation.input)?;
        let produced: Vec<&str> = match invocation.tool {
            Tool::Cleaner => content.lines().collect(),
            Tool::Ocr => content
                .lines()
                .map(|l| l.strip_prefix('#').map(str::trim_start).unwrap_or(l))
                .collect(),
            Tool::TextLayerProbe | Tool::TextExtractor => {
                content.lines().filter(|l| !l.starts_with('#')).collect()
            }
        };
        std::fs::write(&invocation.output, produced.join("\n"))?;
        Ok(ToolOutput {
            success: true,
            stderr: String::new(),
        })
    }
}

// ---------------------------------------------------------------------------
// Mock classification API
// ---------------------------------------------------------------------------

#[derive(Default)]
struct MockApi {
    script: Mutex<VecDeque<(u16, String)>>,
    user_messages: Mutex<Vec<String>>,
    arrivals: Mutex<Vec<Instant>>,
}

impl MockApi {
    fn push_title(&self, title: &str) {
        self.push(200, completion(title));
    }

    fn push(&self, status: u16, body: String) {
        self.script.lock().unwrap().push_back((status, body));
    }
}

fn completion(title: &str) -> String {
    serde_json::json!({
        "id": "chatcmpl-1",
        "object": "chat.completion",
        "choices": [{
            "index": 0,
            "message": {"role": "assistant", "content": title},
            "finish_reason": "stop"
        }]
    })
    .to_string()
}

async fn chat_completions(State(api): State<Arc<MockApi>>, body: String) -> (StatusCode, String) {
    api.arrivals.lock().unwrap().push(Instant::now());
    if let Ok(request) = serde_json::from_str::<serde_json::Value>(&body) {
        if let Some(content) = request["messages"][1]["content"].as_str() {
            api.user_messages.lock().unwrap().push(content.to_string());
        }
    }
    let (status, body) = api
        .script
        .lock()
        .unwrap()
        .pop_front()
        .unwrap_or_else(|| (500, "no scripted response".to_string()));
    (StatusCode::from_u16(status).unwrap(), body)
}

async fn spawn_api() -> (String, Arc<MockApi>) {
    let api = Arc::new(MockApi::default());
    let app = Router::new()
        .route("/v1/chat/completions", post(chat_completions))
        .with_state(api.clone());
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (format!("http://{}/v1/chat/completions", addr), api)
}

// ---------------------------------------------------------------------------
// Harness
// ---------------------------------------------------------------------------

/// Passes through to the real client and keeps every result.
struct Observed {
    inner: ClassificationClient,
    results: Mutex<Vec<Classification>>,
}

#[async_trait]
impl TitleClassifier for Observed {
    async fn classify(&self, text: &str) -> Result<Classification, ClassificationError> {
        let result = self.inner.classify(text).await?;
        self.results.lock().unwrap().push(result.clone());
        Ok(result)
    }
}

struct Harness {
    _dir: TempDir,
    layout: Layout,
    tools: Arc<StubTools>,
    api: Arc<MockApi>,
    classifier: Arc<Observed>,
    pipeline: Arc<DocumentPipeline>,
}

fn fast_retry() -> BackoffPolicy {
    BackoffPolicy {
        base_delay: Duration::from_millis(20),
        max_delay: Duration::from_millis(500),
        max_attempts: None,
        delay_first_attempt: true,
    }
}

async fn harness() -> Harness {
    let dir = TempDir::new().unwrap();
    let layout = Layout::new(dir.path());
    layout.ensure_dirs().unwrap();
    TitleLedger::new(&layout.ledger).initialize().unwrap();

    let (endpoint, api) = spawn_api().await;
    let config = LlmConfig::from_parts(
        Some(endpoint),
        Some("sk-test".to_string()),
        Some("test-model".to_string()),
    )
    .unwrap();
    let classifier = Arc::new(Observed {
        inner: ClassificationClient::new(config, fast_retry()).unwrap(),
        results: Mutex::new(Vec::new()),
    });

    let tools = Arc::new(StubTools::default());
    let pipeline = Arc::new(DocumentPipeline::new(
        layout.clone(),
        PdfToolchain::new(tools.clone(), OcrOptions::default()),
        classifier.clone(),
    ));

    Harness {
        _dir: dir,
        layout,
        tools,
        api,
        classifier,
        pipeline,
    }
}

impl Harness {
    fn drop_in(&self, mode: ProcessingMode, filename: &str, content: &str) {
        std::fs::write(self.layout.intake_dir(mode).join(filename), content).unwrap();
    }

    /// Start-up scan, then drain the queue (like `--once`).
    async fn run_once(&self) -> QueueStats {
        let (queue, worker) = intake_queue(self.layout.clone(), self.pipeline.clone());
        let (_tx, shutdown) = watch::channel(false);
        for doc in startup_scan(&self.layout) {
            queue.enqueue(doc);
        }
        drop(queue);
        tokio::time::timeout(Duration::from_secs(30), worker.run(shutdown))
            .await
            .expect("queue did not drain")
    }

    fn out_files(&self) -> Vec<String> {
        let mut names: Vec<String> = std::fs::read_dir(&self.layout.out)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }

    fn ledger(&self) -> Vec<String> {
        TitleLedger::new(&self.layout.ledger).load()
    }
}

// ---------------------------------------------------------------------------
// Scenarios
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_invoice_is_named_and_delivered() {
    let h = harness().await;
    h.drop_in(
        ProcessingMode::Normal,
        "invoice.pdf",
        "Stadtwerke, 2021-03-04, Rechnung",
    );
    h.api.push_title("2021-03-04 - Stadtwerke - Rechnung");

    let stats = h.run_once().await;

    assert_eq!(stats.succeeded, 1);
    assert_eq!(h.out_files(), vec!["2021-03-04 - Stadtwerke - Rechnung.pdf"]);
    assert!(!h.layout.intake.join("invoice.pdf").exists());
    assert_eq!(
        *h.api.user_messages.lock().unwrap(),
        vec!["Stadtwerke, 2021-03-04, Rechnung"]
    );
    assert_eq!(h.ledger(), vec!["2021-03-04 - Stadtwerke - Rechnung"]);
}

#[tokio::test]
async fn test_identical_titles_are_disambiguated() {
    let h = harness().await;
    let title = "2020-01-15 - Agentur für Arbeit - Arbeitsuchendmeldung";
    h.drop_in(ProcessingMode::Normal, "scan1.pdf", "# Agentur fur Arbeit");
    h.drop_in(ProcessingMode::Normal, "scan2.pdf", "# Agentur fuer Arbeit");
    h.api.push_title(title);
    h.api.push_title(title);

    let stats = h.run_once().await;

    assert_eq!(stats.succeeded, 2);
    assert_eq!(
        h.out_files(),
        vec![
            "2020-01-15 - Agentur für Arbeit - Arbeitsuchendmeldung.pdf",
            "2020-01-15 - Agentur für Arbeit - Arbeitsuchendmeldung_1.pdf",
        ]
    );
    assert_eq!(
        h.ledger(),
        vec![title.to_string(), format!("{}_1", title)]
    );
}

#[tokio::test]
async fn test_rate_limited_classification_still_delivers() {
    let h = harness().await;
    h.drop_in(ProcessingMode::Normal, "letter.pdf", "Finanzamt Bescheid 2019");
    h.api.push(429, "rate limited".to_string());
    h.api.push(429, "rate limited".to_string());
    h.api.push_title("2019-07-01 - Finanzamt - Bescheid");

    let stats = h.run_once().await;

    assert_eq!(stats.succeeded, 1);
    assert_eq!(h.out_files(), vec!["2019-07-01 - Finanzamt - Bescheid.pdf"]);

    let results = h.classifier.results.lock().unwrap();
    assert_eq!(results[0].attempts, 3);
    let waits = &results[0].waits;
    assert!(waits.len() >= 2, "expected at least two waits, got {:?}", waits);
    assert!(waits.windows(2).all(|w| w[1] >= w[0]), "{:?}", waits);

    let arrivals = h.api.arrivals.lock().unwrap();
    assert_eq!(arrivals.len(), 3);
    for pair in arrivals.windows(2) {
        assert!(pair[1] - pair[0] >= Duration::from_millis(20));
    }
}

#[tokio::test]
async fn test_forced_mode_ocrs_despite_text_layer() {
    let h = harness().await;
    h.drop_in(ProcessingMode::Normal, "digital.pdf", "2021-05-06 - Bank - Auszug");
    h.drop_in(ProcessingMode::Forced, "redo.pdf", "2021-05-07 - Bank - Auszug");
    h.api.push_title("2021-05-06 - Bank - Auszug");
    h.api.push_title("2021-05-07 - Bank - Auszug");

    let stats = h.run_once().await;

    assert_eq!(stats.succeeded, 2);
    // The cleaned copy carries the same filename into OCR.
    assert_eq!(h.tools.ocr_runs("digital.pdf"), 0);
    assert_eq!(h.tools.ocr_runs("redo.pdf"), 1);
    assert!(!h.layout.force_intake.join("redo.pdf").exists());
    assert_eq!(
        h.out_files(),
        vec!["2021-05-06 - Bank - Auszug.pdf", "2021-05-07 - Bank - Auszug.pdf"]
    );
}

#[tokio::test]
async fn test_ledger_names_survive_across_runs() {
    let h = harness().await;
    // A name leaked by an earlier crashed delivery, and a file delivered by hand.
    TitleLedger::new(&h.layout.ledger).append("T").unwrap();
    std::fs::write(h.layout.out.join("T_1.pdf"), "manual").unwrap();

    h.drop_in(ProcessingMode::Normal, "a.pdf", "anything");
    h.api.push_title("T");
    h.run_once().await;

    assert_eq!(h.out_files(), vec!["T_1.pdf", "T_2.pdf"]);
    assert_eq!(h.ledger(), vec!["T", "T_2"]);

    // Every delivered base name is in the ledger.
    let ledger = h.ledger();
    for file in h.out_files().iter().filter(|f| f.as_str() != "T_1.pdf") {
        let base = file.trim_end_matches(".pdf");
        assert!(ledger.iter().any(|t| t == base), "{} not in ledger", base);
    }
}

#[tokio::test]
async fn test_corrupt_ledger_is_treated_as_empty() {
    let h = harness().await;
    std::fs::write(&h.layout.ledger, "{ not json").unwrap();
    h.drop_in(ProcessingMode::Normal, "a.pdf", "text");
    h.api.push_title("2022-02-02 - Versicherung - Police");

    h.run_once().await;

    assert_eq!(h.ledger(), vec!["2022-02-02 - Versicherung - Police"]);
    let raw = std::fs::read_to_string(&h.layout.ledger).unwrap();
    assert_eq!(raw, "[\n  \"2022-02-02 - Versicherung - Police\"\n]");
}

#[tokio::test]
async fn test_tool_failure_isolates_document() {
    let h = harness().await;
    h.drop_in(ProcessingMode::Normal, "a_broken.pdf", "unreadable");
    h.drop_in(ProcessingMode::Normal, "b_fine.pdf", "fine");
    h.tools.break_file("a_broken.pdf");
    h.api.push_title("2023-01-01 - Sender - Fine");

    let stats = h.run_once().await;

    assert_eq!(stats.failed, 1);
    assert_eq!(stats.succeeded, 1);
    assert!(h.layout.intake.join("a_broken.pdf").exists());
    assert_eq!(h.out_files(), vec!["2023-01-01 - Sender - Fine.pdf"]);
    assert_eq!(h.api.user_messages.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn test_unsafe_title_characters_are_replaced() {
    let h = harness().await;
    h.drop_in(ProcessingMode::Normal, "a.pdf", "text");
    h.api.push_title("  2021-00-00 - ../etc - Brief: \"wichtig\"  ");

    h.run_once().await;

    assert_eq!(h.out_files(), vec!["2021-00-00 - ___etc - Brief_ _wichtig_.pdf"]);
}

#[tokio::test]
async fn test_queued_document_removed_before_processing_is_skipped() {
    let h = harness().await;
    h.drop_in(ProcessingMode::Normal, "a.pdf", "text");
    let (queue, worker) = intake_queue(h.layout.clone(), h.pipeline.clone());
    let (_tx, shutdown) = watch::channel(false);

    queue.enqueue(Document::new("a.pdf", ProcessingMode::Normal));
    std::fs::remove_file(h.layout.intake.join("a.pdf")).unwrap();
    drop(queue);

    let stats = worker.run(shutdown).await;
    assert_eq!(stats.skipped, 1);
    assert!(h.api.user_messages.lock().unwrap().is_empty());
}
