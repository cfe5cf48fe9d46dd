//! CLI binary for edgequake-pdf2docs.
//!
//! A thin shim over the library crate: `analyze` runs one PDF through the
//! pipeline and appends the results to a Google Doc; `serve` starts the web
//! front end.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use edgequake_pdf2docs::pipeline::docs::parse_document_id;
use edgequake_pdf2docs::prompts::{default_document_title, DEFAULT_PROMPT};
use edgequake_pdf2docs::{
    web, AnalysisResult, AnalyzerConfig, ApiKey, DocumentCredentials, InferenceError, Pipeline,
    PipelineProgress, SaveTarget,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Describes and appends are reported on one bar: the bar counts describe
/// calls, then is reset to count appends.
struct CliProgress {
    bar: ProgressBar,
    appending: AtomicBool,
}

impl CliProgress {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new_spinner();
        bar.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        bar.set_prefix("Rendering");
        bar.set_message("Opening PDF…");
        bar.enable_steady_tick(Duration::from_millis(80));
        Arc::new(Self {
            bar,
            appending: AtomicBool::new(false),
        })
    }

    fn activate_bar(&self, prefix: &'static str, total: usize) {
        let style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  [{bar:42.green/238}] {pos:>3}/{len} pages  ⏱ {elapsed_precise}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ");
        self.bar.set_style(style);
        self.bar.set_length(total as u64);
        self.bar.set_position(0);
        self.bar.set_prefix(prefix);
    }

    fn finish(&self) {
        self.bar.finish_and_clear();
    }
}

impl PipelineProgress for CliProgress {
    fn on_run_start(&self, total_pages: usize) {
        self.activate_bar("Describing", total_pages);
    }

    fn on_page_start(&self, page_num: usize, _total: usize) {
        self.bar.set_message(format!("page {page_num}"));
    }

    fn on_page_complete(&self, page_num: usize, total: usize, description_len: usize) {
        self.bar.println(format!(
            "  {} Page {:>3}/{:<3}  {} chars",
            green("✓"),
            page_num,
            total,
            description_len
        ));
        self.bar.inc(1);
    }

    fn on_page_error(&self, page_num: usize, total: usize, error: &str) {
        self.bar
            .println(format!("  {} Page {:>3}/{:<3}  {}", red("✗"), page_num, total, red(error)));
    }

    fn on_page_appended(&self, page_num: usize, total: usize, _document_id: &str) {
        if !self.appending.swap(true, Ordering::Relaxed) {
            self.activate_bar("Appending", total);
        }
        self.bar.println(format!("Processed page_{page_num}.jpg"));
        self.bar.inc(1);
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Describe every page and append to an existing Google Doc
  pdf2docs analyze --pdf slides.pdf --google-credentials sa.json \
      --doc-id https://docs.google.com/document/d/1AbC.../edit

  # Create a new document, keep the rendered JPEGs
  pdf2docs analyze --pdf report.pdf --google-credentials sa.json \
      --title "Report walkthrough" --output-dir pages/

  # Web front end on port 8000
  pdf2docs serve --bind 0.0.0.0:8000

ENVIRONMENT VARIABLES:
  OPENAI_API_KEY          OpenAI API key (analyze; default key for serve)
  PDF2DOCS_MODEL          Vision model ID (default gpt-4o)
  PDFIUM_LIB_PATH         Path to libpdfium (file or directory)
  RUST_LOG                tracing filter, e.g. edgequake_pdf2docs=debug

The Google credentials file is a service-account key (JSON). Share the target
document with the service account's client_email so it may edit it.
"#;

/// Describe PDF pages with a vision model and append them to Google Docs.
#[derive(Parser, Debug)]
#[command(
    name = "pdf2docs",
    version,
    about = "Describe PDF pages with a vision model and append them to Google Docs",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    #[command(flatten)]
    common: CommonArgs,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Analyse one PDF and append the results to a Google Doc.
    Analyze(AnalyzeArgs),
    /// Run the web front end.
    Serve(ServeArgs),
}

#[derive(Args, Debug)]
struct CommonArgs {
    /// Vision model ID.
    #[arg(long, global = true, env = "PDF2DOCS_MODEL", default_value = "gpt-4o")]
    model: String,

    /// Max output tokens per page description.
    #[arg(long, global = true, env = "PDF2DOCS_MAX_TOKENS", default_value_t = 300)]
    max_tokens: usize,

    /// Rendering DPI (72–400).
    #[arg(long, global = true, env = "PDF2DOCS_DPI", default_value_t = 150,
          value_parser = clap::value_parser!(u32).range(72..=400))]
    dpi: u32,

    /// Per-call timeout for the vision API, in seconds.
    #[arg(long, global = true, env = "PDF2DOCS_API_TIMEOUT", default_value_t = 60)]
    api_timeout: u64,

    /// Per-call timeout for the Docs API, in seconds.
    #[arg(long, global = true, env = "PDF2DOCS_DOCS_TIMEOUT", default_value_t = 60)]
    docs_timeout: u64,

    /// Path to libpdfium (file or directory). Default: system library.
    #[arg(long, global = true, env = "PDFIUM_LIB_PATH")]
    pdfium_lib: Option<PathBuf>,

    /// OpenAI API key.
    #[arg(long, global = true, env = "OPENAI_API_KEY", hide_env_values = true)]
    openai_api_key: Option<String>,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, global = true, env = "PDF2DOCS_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, global = true, env = "PDF2DOCS_QUIET")]
    quiet: bool,
}

#[derive(Args, Debug)]
struct AnalyzeArgs {
    /// Input PDF file.
    #[arg(long)]
    pdf: PathBuf,

    /// Prompt sent with each page.
    #[arg(long, default_value = DEFAULT_PROMPT)]
    prompt: String,

    /// Path to the Google service-account JSON credentials.
    #[arg(long, env = "GOOGLE_APPLICATION_CREDENTIALS")]
    google_credentials: PathBuf,

    /// Existing Google Docs document id (or URL) to append to.
    #[arg(long, conflicts_with = "title")]
    doc_id: Option<String>,

    /// Title for a new document (default: derived from the PDF name).
    #[arg(long)]
    title: Option<String>,

    /// Keep the rendered pages as page_<n>.jpg in this directory.
    #[arg(long)]
    output_dir: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct ServeArgs {
    /// Address to listen on.
    #[arg(long, env = "PDF2DOCS_BIND", default_value = "0.0.0.0:8000")]
    bind: String,

    /// Maximum upload size in MiB.
    #[arg(long, env = "PDF2DOCS_MAX_UPLOAD_MB", default_value_t = 64)]
    max_upload_mb: usize,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.common.verbose {
        "debug"
    } else if cli.common.quiet {
        "error"
    } else if matches!(cli.command, Command::Serve(_)) {
        "info"
    } else {
        "warn"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    let mut builder = AnalyzerConfig::builder()
        .model(&cli.common.model)
        .max_tokens(cli.common.max_tokens)
        .dpi(cli.common.dpi)
        .api_timeout_secs(cli.common.api_timeout)
        .docs_timeout_secs(cli.common.docs_timeout)
        .default_api_key(cli.common.openai_api_key.clone().and_then(ApiKey::new));
    if let Some(ref lib) = cli.common.pdfium_lib {
        builder = builder.pdfium_lib_path(lib);
    }

    match cli.command {
        Command::Serve(args) => {
            let config = builder
                .bind_addr(&args.bind)
                .max_upload_bytes(args.max_upload_mb * 1024 * 1024)
                .build()
                .context("invalid configuration")?;
            web::serve(config).await.context("web server failed")
        }
        Command::Analyze(args) => {
            let config = builder.build().context("invalid configuration")?;
            analyze(config, args, cli.common.quiet).await
        }
    }
}

async fn analyze(config: AnalyzerConfig, args: AnalyzeArgs, quiet: bool) -> Result<()> {
    let api_key = config
        .default_api_key
        .clone()
        .ok_or(InferenceError::MissingApiKey)
        .context("set OPENAI_API_KEY or pass --openai-api-key")?;
    let credentials = DocumentCredentials::from_file(&args.google_credentials)
        .context("cannot load Google credentials")?;

    let target = match args.doc_id {
        Some(ref raw) => SaveTarget::Existing {
            document_id: parse_document_id(raw)
                .with_context(|| format!("'{raw}' is not a Google Docs id or URL"))?,
        },
        None => SaveTarget::New {
            title: args.title.clone().unwrap_or_else(|| {
                let name = args
                    .pdf
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_default();
                default_document_title(&name)
            }),
        },
    };

    let progress = (!quiet).then(CliProgress::new);
    let mut pipeline = Pipeline::from_config(&config)?;
    if let Some(ref p) = progress {
        pipeline = pipeline.with_progress(p.clone());
    }

    let results = pipeline
        .run(&args.pdf, &args.prompt, &api_key)
        .await
        .with_context(|| format!("analysis of '{}' failed", args.pdf.display()));
    let results = match results {
        Ok(r) => r,
        Err(e) => {
            if let Some(ref p) = progress {
                p.finish();
            }
            return Err(e);
        }
    };

    if let Some(ref dir) = args.output_dir {
        write_pages(dir, &results)
            .with_context(|| format!("cannot write pages to '{}'", dir.display()))?;
    }

    let saved = pipeline
        .persist_results(&results, &target, &credentials)
        .await;
    if let Some(ref p) = progress {
        p.finish();
    }
    let document_id = saved.context("saving to Google Docs failed")?;

    if !quiet {
        eprintln!(
            "{} {} pages appended to {}",
            green("✔"),
            bold(&results.len().to_string()),
            bold(&format!("https://docs.google.com/document/d/{document_id}/edit"))
        );
    }
    Ok(())
}

/// Write each page as `page_<n>.jpg` under `dir`.
fn write_pages(dir: &Path, results: &[AnalysisResult]) -> io::Result<()> {
    std::fs::create_dir_all(dir)?;
    for r in results {
        std::fs::write(dir.join(r.image.file_name()), &r.image.jpeg)?;
    }
    Ok(())
}
