//! CLI binary for doc-compliance.
//!
//! A thin shim over the library crate: maps flags to `PipelineConfig`,
//! wires the filesystem store and HTTP services, and prints results.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use doc_compliance::{
    ComplianceOrchestrator, ComplianceVerdict, EvaluationStrategy, FsStorage,
    HttpGenerativeService, HttpOcrService, JobState, PipelineConfig, PipelineOutcome,
    PipelineProgressCallback, PipelineStage, ProgressCallback, UploadedDocument,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers ──────────────────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}

// ── CLI progress callback using indicatif ────────────────────────────────

/// Spinner on stderr that follows the run through its stages and OCR polls.
struct CliProgressCallback {
    bar: ProgressBar,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new_spinner();
        let style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}  {elapsed:.dim}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);
        bar.set_style(style);
        bar.set_prefix("Received");
        bar.enable_steady_tick(Duration::from_millis(80));
        Arc::new(Self { bar })
    }
}

// A failed run never reaches `on_complete`; clear the spinner before the error is printed.
impl Drop for CliProgressCallback {
    fn drop(&mut self) {
        if !self.bar.is_finished() {
            self.bar.finish_and_clear();
        }
    }
}

impl PipelineProgressCallback for CliProgressCallback {
    fn on_stage(&self, stage: PipelineStage) {
        let (prefix, msg) = match stage {
            PipelineStage::Received => ("Received", "storing upload…"),
            PipelineStage::Extracting => ("Extracting", "detecting text…"),
            PipelineStage::Evaluating => ("Evaluating", "checking requests…"),
            PipelineStage::Correcting => ("Correcting", "drafting message…"),
            PipelineStage::Done => ("Done", ""),
        };
        self.bar.set_prefix(prefix);
        self.bar.set_message(msg);
    }

    fn on_job_submitted(&self, job_id: &str) {
        self.bar.println(format!("  {} OCR job {}", dim("…"), dim(job_id)));
    }

    fn on_poll(&self, _job_id: &str, attempt: u32, state: JobState) {
        self.bar.set_message(format!("poll {attempt}: {state}"));
    }

    fn on_verdict(&self, verdict: &ComplianceVerdict) {
        let mark = if verdict.is_compliant { green("✓") } else { red("✗") };
        self.bar.println(format!(
            "  {} {}  {}",
            mark,
            verdict.requested_document_name,
            dim(&format!("[{}]", verdict.strategy))
        ));
    }

    fn on_complete(&self, _outcome: &PipelineOutcome) {
        self.bar.finish_and_clear();
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Publish what you need (replaces any outstanding request)
  doccheck request "Tax Form W2" "Employee wage statement for 2023"

  # Plain-English summary of outstanding requests
  doccheck summary

  # Check an upload against outstanding requests
  doccheck check ./w2.pdf

  # Judge with the generative model instead of keyword matching
  doccheck check ./scan.png --strategy semantic --json

EXIT STATUS:
  0  every request satisfied (or nothing requested)
  2  at least one request not satisfied
  1  any error

ENVIRONMENT VARIABLES:
  DOCCHECK_STORE          Directory holding uploads and the requests record
  DOCCHECK_OCR_ENDPOINT   Base URL of the OCR service
  DOCCHECK_LLM_ENDPOINT   Base URL of the text generation service
  DOCCHECK_LLM_API_KEY    Bearer token for the text generation service
  DOCCHECK_MODEL          Model id (default: amazon.titan-text-lite-v1)
"#;

#[derive(Parser, Debug)]
#[command(
    name = "doccheck",
    version,
    about = "Check uploaded documents against requested documents",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Directory used as the document and request store.
    #[arg(long, global = true, env = "DOCCHECK_STORE", default_value = "./doccheck-store")]
    store: PathBuf,

    #[arg(long, global = true, env = "DOCCHECK_OCR_ENDPOINT", default_value = "http://127.0.0.1:8081")]
    ocr_endpoint: String,

    #[arg(long, global = true, env = "DOCCHECK_LLM_ENDPOINT", default_value = "http://127.0.0.1:8080")]
    llm_endpoint: String,

    #[arg(long, global = true, env = "DOCCHECK_LLM_API_KEY", hide_env_values = true)]
    llm_api_key: Option<String>,

    #[arg(long, global = true, env = "DOCCHECK_MODEL")]
    model: Option<String>,

    #[arg(long, global = true, env = "DOCCHECK_MAX_TOKENS", default_value_t = 512)]
    max_tokens: u32,

    #[arg(long, global = true, env = "DOCCHECK_MAX_RETRIES", default_value_t = 3)]
    max_retries: u32,

    /// Seconds between OCR job polls.
    #[arg(long, global = true, env = "DOCCHECK_POLL_INTERVAL", default_value_t = 1)]
    poll_interval: u64,

    /// Seconds to wait for an OCR job before giving up.
    #[arg(long, global = true, env = "DOCCHECK_OCR_TIMEOUT", default_value_t = 300)]
    ocr_timeout: u64,

    /// Per-request HTTP timeout in seconds.
    #[arg(long, global = true, env = "DOCCHECK_API_TIMEOUT", default_value_t = 60)]
    api_timeout: u64,

    #[arg(long, global = true, env = "DOCCHECK_JSON")]
    json: bool,

    #[arg(long, global = true, env = "DOCCHECK_NO_PROGRESS")]
    no_progress: bool,

    #[arg(short, long, global = true, env = "DOCCHECK_VERBOSE")]
    verbose: bool,

    #[arg(short, long, global = true, env = "DOCCHECK_QUIET")]
    quiet: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Publish a document request with a generated summary.
    Request {
        name: String,
        description: String,
        #[arg(long, value_enum)]
        strategy: Option<StrategyArg>,
    },
    /// Summarise outstanding requests in plain English.
    Summary,
    /// Check a file against outstanding requests.
    Check {
        file: PathBuf,
        /// Strategy for requests that do not set their own.
        #[arg(long, value_enum, default_value = "keyword")]
        strategy: StrategyArg,
    },
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum StrategyArg {
    Keyword,
    Semantic,
}

impl From<StrategyArg> for EvaluationStrategy {
    fn from(v: StrategyArg) -> Self {
        match v {
            StrategyArg::Keyword => EvaluationStrategy::Keyword,
            StrategyArg::Semantic => EvaluationStrategy::Semantic,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .with_writer(io::stderr)
        .init();

    // ── Build config ─────────────────────────────────────────────────────
    let mut builder = PipelineConfig::builder()
        .max_tokens(cli.max_tokens)
        .max_retries(cli.max_retries)
        .poll_interval(Duration::from_secs(cli.poll_interval))
        .ocr_timeout(Duration::from_secs(cli.ocr_timeout))
        .bucket(cli.store.display().to_string());
    if let Some(ref model) = cli.model {
        builder = builder.model_id(model.clone());
    }
    if let Command::Check { strategy, .. } = cli.command {
        builder = builder.default_strategy(strategy.into());
    }
    if show_progress && matches!(cli.command, Command::Check { .. }) {
        let cb: ProgressCallback = CliProgressCallback::new();
        builder = builder.progress_callback(cb);
    }
    let config = builder.build().context("Invalid configuration")?;

    let orchestrator = ComplianceOrchestrator::new(
        Arc::new(FsStorage::new(&cli.store)),
        Arc::new(
            HttpOcrService::new(&cli.ocr_endpoint, cli.api_timeout)
                .context("Failed to create OCR client")?,
        ),
        Arc::new(
            HttpGenerativeService::new(&cli.llm_endpoint, cli.llm_api_key.clone(), cli.api_timeout)
                .context("Failed to create text generation client")?,
        ),
        config,
    );

    match cli.command {
        Command::Request {
            ref name,
            ref description,
            strategy,
        } => {
            let request = orchestrator
                .publish_request(name, description, strategy.map(Into::into))
                .await
                .context("Failed to publish request")?;
            if cli.json {
                println!(
                    "{}",
                    serde_json::to_string_pretty(&request).context("Failed to serialize request")?
                );
            } else {
                eprintln!("{} Request published: {}", green("✔"), bold(&request.requested_document_name));
                if let Some(ref summary) = request.summary {
                    println!("{summary}");
                }
            }
        }

        Command::Summary => {
            let requests = orchestrator
                .load_requests()
                .await
                .context("Failed to load requests")?;
            if requests.is_empty() {
                eprintln!("No outstanding requests.");
                return Ok(());
            }
            let summary = orchestrator
                .summarize_requests(&requests)
                .await
                .context("Failed to summarise requests")?;
            if cli.json {
                let value = serde_json::json!({ "requests": requests, "summary": summary });
                println!(
                    "{}",
                    serde_json::to_string_pretty(&value).context("Failed to serialize summary")?
                );
            } else {
                for r in &requests {
                    eprintln!("  {} {}", bold(&r.requested_document_name), dim(&r.description));
                }
                println!("{summary}");
            }
        }

        Command::Check { ref file, .. } => {
            let bytes = tokio::fs::read(file)
                .await
                .with_context(|| format!("Failed to read {}", file.display()))?;
            let filename = file
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            let upload = UploadedDocument::new(filename, bytes);

            let outcome = orchestrator
                .check_pending(&upload)
                .await
                .context("Compliance check failed")?;

            if cli.json {
                println!(
                    "{}",
                    serde_json::to_string_pretty(&outcome).context("Failed to serialize outcome")?
                );
            } else {
                print_outcome(&outcome, show_progress);
            }
            if !outcome.all_compliant() {
                std::process::exit(2);
            }
        }
    }
    Ok(())
}

fn print_outcome(outcome: &PipelineOutcome, verdicts_shown: bool) {
    if !verdicts_shown {
        for v in &outcome.verdicts {
            let mark = if v.is_compliant { green("✓") } else { red("✗") };
            eprintln!("  {} {}  {}", mark, v.requested_document_name, dim(&format!("[{}]", v.strategy)));
        }
    }
    if outcome.verdicts.is_empty() {
        eprintln!("{} No outstanding requests to check against", green("✔"));
    } else if outcome.all_compliant() {
        eprintln!(
            "{} {} request(s) satisfied",
            green("✔"),
            bold(&outcome.verdicts.len().to_string())
        );
    } else {
        eprintln!(
            "{} Missing: {}",
            red("✘"),
            bold(&outcome.missing_documents().join(", "))
        );
    }
    if let Some(ref msg) = outcome.corrective_message {
        println!("{}", msg.text);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spinner_is_cleared_when_a_run_fails() {
        let cb = CliProgressCallback::new();
        cb.on_stage(PipelineStage::Extracting);
        let bar = cb.bar.clone();
        assert!(!bar.is_finished());

        drop(cb);
        assert!(bar.is_finished());
    }
}
