//! Command-line surface and the long-running intake service.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::config::{ConfigError, Layout, Settings};
use crate::llm::{ClassificationClient, LlmConfig};
use crate::ocr::{missing_programs, OcrOptions, PdfToolchain};
use crate::rate_limit::BackoffPolicy;
use crate::repository::TitleLedger;
use crate::services::{intake_queue, startup_scan, DocumentPipeline, IntakeWatcher};

#[derive(Parser, Debug)]
#[command(name = "paperintake")]
#[command(about = "Clean, OCR, classify and file PDFs dropped into a watch folder")]
#[command(version)]
pub struct Cli {
    /// Working directory holding in/, force-processing/, cleaned/, ocr/, out/
    #[arg(long, env = "PAPERINTAKE_ROOT", default_value = ".")]
    pub root: PathBuf,

    /// Chat-completions URL of the classification API
    #[arg(long, env = "LLM_ENDPOINT")]
    pub llm_endpoint: Option<String>,

    /// Bearer token for the classification API
    #[arg(long, env = "LLM_API_KEY", hide_env_values = true)]
    pub llm_api_key: Option<String>,

    /// Model identifier sent with every request
    #[arg(long, env = "LLM_MODEL")]
    pub llm_model: Option<String>,

    /// Seconds to wait after a filesystem event before trusting the file
    #[arg(long, env = "SETTLE_DELAY_SECS", default_value_t = 10)]
    pub settle_delay_secs: u64,

    /// Initial classification retry delay in seconds
    #[arg(long, env = "RETRY_BASE_DELAY_SECS", default_value_t = 30)]
    pub retry_base_delay_secs: u64,

    /// Ceiling for the doubled retry delay in seconds
    #[arg(long, env = "RETRY_MAX_DELAY_SECS", default_value_t = 3600)]
    pub retry_max_delay_secs: u64,

    /// Give up on a document after this many classification attempts (default: never)
    #[arg(long, env = "RETRY_MAX_ATTEMPTS")]
    pub retry_max_attempts: Option<u32>,

    /// Wait the retry delay before the first classification attempt too
    #[arg(
        long,
        env = "RETRY_DELAY_FIRST_ATTEMPT",
        default_value_t = true,
        action = clap::ArgAction::Set
    )]
    pub retry_delay_first_attempt: bool,

    /// OCR language(s), e.g. deu+eng
    #[arg(long, env = "OCR_LANGUAGE")]
    pub ocr_language: Option<String>,

    /// Process what is already in the intake directories, then exit
    #[arg(long)]
    pub once: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,
}

impl Cli {
    /// Validate the arguments into [`Settings`] rooted at `root`.
    pub fn settings(&self, root: PathBuf) -> Result<Settings, ConfigError> {
        let llm = LlmConfig::from_parts(
            self.llm_endpoint.clone(),
            self.llm_api_key.clone(),
            self.llm_model.clone(),
        )?;

        if self.retry_max_delay_secs < self.retry_base_delay_secs {
            return Err(ConfigError::Invalid {
                key: "RETRY_MAX_DELAY_SECS",
                reason: format!(
                    "{} is below RETRY_BASE_DELAY_SECS ({})",
                    self.retry_max_delay_secs, self.retry_base_delay_secs
                ),
            });
        }
        if self.retry_max_attempts == Some(0) {
            return Err(ConfigError::Invalid {
                key: "RETRY_MAX_ATTEMPTS",
                reason: "must be at least 1".to_string(),
            });
        }

        let ocr_language = self
            .ocr_language
            .as_deref()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(String::from);

        Ok(Settings {
            layout: Layout::new(root),
            llm,
            retry: BackoffPolicy {
                base_delay: Duration::from_secs(self.retry_base_delay_secs),
                max_delay: Duration::from_secs(self.retry_max_delay_secs),
                max_attempts: self.retry_max_attempts,
                delay_first_attempt: self.retry_delay_first_attempt,
            },
            ocr: OcrOptions {
                language: ocr_language,
                ..OcrOptions::default()
            },
            settle_delay: Duration::from_secs(self.settle_delay_secs),
            once: self.once,
        })
    }
}

/// Run the intake service until Ctrl-C (or, with `--once`, until the
/// start-up scan has been processed).
pub async fn run(cli: Cli) -> anyhow::Result<()> {
    std::fs::create_dir_all(&cli.root)
        .with_context(|| format!("Failed to create {}", cli.root.display()))?;
    // Watch events report resolved paths; match them against a resolved root.
    let root = cli
        .root
        .canonicalize()
        .with_context(|| format!("Failed to resolve {}", cli.root.display()))?;

    let settings = cli.settings(root)?;
    debug!("{:?}", settings);
    let layout = settings.layout.clone();
    layout.ensure_dirs()?;
    TitleLedger::new(&layout.ledger)
        .initialize()
        .context("Failed to initialize title ledger")?;
    info!("Using {}", layout.root.display());

    let missing = missing_programs();
    if !missing.is_empty() {
        warn!(
            "Not found in PATH: {}. Documents will fail until installed.",
            missing.join(", ")
        );
    }

    let (shutdown_tx, shutdown) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Interrupt received, shutting down");
            let _ = shutdown_tx.send(true);
        }
    });

    let classifier = ClassificationClient::new(settings.llm.clone(), settings.retry.clone())?
        .with_shutdown(shutdown.clone());
    let pipeline = DocumentPipeline::new(
        layout.clone(),
        PdfToolchain::system(settings.ocr.clone()),
        Arc::new(classifier),
    );

    let (queue, worker) = intake_queue(layout.clone(), Arc::new(pipeline));
    let worker = tokio::spawn(worker.run(shutdown.clone()));

    for doc in startup_scan(&layout) {
        queue.enqueue(doc);
    }

    if settings.once {
        drop(queue);
    } else {
        IntakeWatcher::new(layout, queue, settings.settle_delay)
            .run(shutdown)
            .await
            .context("Filesystem watcher failed")?;
    }

    let stats = worker.await.context("Queue worker panicked")?;
    if settings.once && stats.failed > 0 {
        anyhow::bail!("{} document(s) failed", stats.failed);
    }
    Ok(())
}
