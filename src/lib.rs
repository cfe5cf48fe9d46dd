//! # edgequake-pdf2docs
//!
//! Describe every page of a PDF with a Vision Language Model and append the
//! page image plus its description to a Google Doc.
//!
//! ## Pipeline Overview
//!
//! ```text
//! PDF
//!  │
//!  ├─ 1. Render    rasterise pages via pdfium into a scoped temp dir (JPEG)
//!  ├─ 2. Describe  one vision call per page, in page order, prompt + image
//!  ├─ 3. Store     keep the run in the in-memory session history
//!  └─ 4. Persist   create (or open) a Google Doc, append image + text per page
//! ```
//!
//! A run is all-or-nothing: the first failing page aborts it and no session
//! is stored. Persisting is an ordered edit log against the remote document;
//! a failure part-way leaves a prefix of the pages in place and is reported
//! as [`AnalyzerError::PartialSave`].
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use edgequake_pdf2docs::{AnalyzerConfig, ApiKey, DocumentCredentials, Pipeline, SaveTarget};
//! use std::path::Path;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = AnalyzerConfig::default();
//!     let pipeline = Pipeline::from_config(&config)?;
//!
//!     let key = ApiKey::new(std::env::var("OPENAI_API_KEY")?).ok_or("empty key")?;
//!     let results = pipeline.run(Path::new("slides.pdf"), "Describe the page", &key).await?;
//!
//!     let creds = DocumentCredentials::from_file(Path::new("service-account.json"))?;
//!     let target = SaveTarget::New { title: "Slides".into() };
//!     let doc_id = pipeline.persist_results(&results, &target, &creds).await?;
//!     println!("https://docs.google.com/document/d/{doc_id}/edit");
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `pdf2docs` binary (clap + anyhow + tracing-subscriber + indicatif) |

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod credentials;
pub mod error;
pub mod orchestrator;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod prompts;
pub mod session;
pub mod web;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{AnalyzerConfig, AnalyzerConfigBuilder};
pub use credentials::{ApiKey, DocumentCredentials, ServiceAccountKey};
pub use error::{AnalyzerError, DocumentServiceError, InferenceError, RenderError};
pub use orchestrator::{Pipeline, SaveTarget};
pub use output::{AnalysisResult, PageImage};
pub use pipeline::describe::{Describer, DescriberFactory};
pub use pipeline::docs::{DocumentSink, DocumentSinkFactory};
pub use pipeline::render::PageRenderer;
pub use progress::{NoopProgress, PipelineProgress, ProgressCallback};
pub use session::{NewSession, Session, SessionStore};
