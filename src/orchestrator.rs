//! Pipeline Orchestrator: Renderer → Describer (×N) → store or persist.
//!
//! ## Run
//!
//! [`Pipeline::run`] renders every page first, then describes pages one at a
//! time in increasing page order. There is no interleaving and no
//! parallelism, so results come back in render order. The first failing
//! page ends the run and nothing is returned for it: callers see either all
//! N results or an error.
//!
//! ## Persist
//!
//! [`Pipeline::persist`] authenticates once, creates a document, and replays
//! the session's results into it with one append per page, in order. A
//! failure after the document exists is reported as
//! [`AnalyzerError::PartialSave`] because the remote document then holds a
//! prefix of the pages.

use crate::config::AnalyzerConfig;
use crate::credentials::{ApiKey, DocumentCredentials};
use crate::error::{AnalyzerError, DocumentServiceError};
use crate::output::AnalysisResult;
use crate::pipeline::describe::{DescriberFactory, OpenAiDescriberFactory};
use crate::pipeline::docs::{
    parse_document_id, DocumentSink, DocumentSinkFactory, GoogleDocsConnector,
};
use crate::pipeline::render::{self, PageRenderer, PdfiumRenderer};
use crate::progress::{NoopProgress, ProgressCallback};
use crate::session::Session;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};

/// Where persisted results go.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveTarget {
    /// Create a new document with this title.
    New { title: String },
    /// Append to the end of an existing document.
    Existing { document_id: String },
}

/// The three external collaborators plus an optional progress observer.
#[derive(Clone)]
pub struct Pipeline {
    renderer: Arc<dyn PageRenderer>,
    describers: Arc<dyn DescriberFactory>,
    documents: Arc<dyn DocumentSinkFactory>,
    progress: ProgressCallback,
}

impl Pipeline {
    pub fn new(
        renderer: Arc<dyn PageRenderer>,
        describers: Arc<dyn DescriberFactory>,
        documents: Arc<dyn DocumentSinkFactory>,
    ) -> Self {
        Self {
            renderer,
            describers,
            documents,
            progress: Arc::new(NoopProgress),
        }
    }

    /// Production wiring: pdfium, OpenAI vision, Google Docs.
    pub fn from_config(config: &AnalyzerConfig) -> Result<Self, AnalyzerError> {
        Ok(Self::new(
            Arc::new(PdfiumRenderer::new(config)),
            Arc::new(OpenAiDescriberFactory::new(config)),
            Arc::new(GoogleDocsConnector::new(config)?),
        ))
    }

    pub fn with_progress(mut self, progress: ProgressCallback) -> Self {
        self.progress = progress;
        self
    }

    /// Render `pdf_path` and describe every page with `prompt`.
    pub async fn run(
        &self,
        pdf_path: &Path,
        prompt: &str,
        api_key: &ApiKey,
    ) -> Result<Vec<AnalysisResult>, AnalyzerError> {
        let start = Instant::now();
        info!("Starting analysis: {}", pdf_path.display());

        let describer = self.describers.describer(api_key)?;
        let pages = self.renderer.render(pdf_path).await?;
        let total = pages.len();
        self.progress.on_run_start(total);

        let mut results = Vec::with_capacity(total);
        for image in pages {
            let page_num = image.page_num;
            self.progress.on_page_start(page_num, total);

            let description = match describer.describe(&image, prompt).await {
                Ok(d) => d,
                Err(e) => {
                    warn!("Page {}/{} failed, aborting run: {}", page_num, total, e);
                    self.progress.on_page_error(page_num, total, &e.to_string());
                    return Err(e.into());
                }
            };

            self.progress
                .on_page_complete(page_num, total, description.len());
            results.push(AnalysisResult { image, description });
        }

        info!(
            "Analysis complete: {} pages in {}ms",
            total,
            start.elapsed().as_millis()
        );
        Ok(results)
    }

    /// Like [`Pipeline::run`] for an in-memory upload.
    ///
    /// The bytes are written to a scoped temporary directory that is removed
    /// when this call returns, whatever the outcome.
    pub async fn run_bytes(
        &self,
        pdf: &[u8],
        prompt: &str,
        api_key: &ApiKey,
    ) -> Result<Vec<AnalysisResult>, AnalyzerError> {
        render::check_pdf_magic(pdf)?;

        let workspace = tempfile::TempDir::new()
            .map_err(|e| AnalyzerError::Internal(format!("tempdir: {e}")))?;
        let pdf_path = workspace.path().join("input.pdf");
        tokio::fs::write(&pdf_path, pdf)
            .await
            .map_err(|e| AnalyzerError::Internal(format!("tempfile write: {e}")))?;

        self.run(&pdf_path, prompt, api_key).await
    }

    /// Create a document titled `title` and replay the session into it.
    pub async fn persist(
        &self,
        session: &Session,
        title: &str,
        credentials: &DocumentCredentials,
    ) -> Result<String, AnalyzerError> {
        let target = SaveTarget::New {
            title: title.to_string(),
        };
        let document_id = self
            .persist_results(&session.results, &target, credentials)
            .await?;
        session.record_saved_document(&document_id);
        Ok(document_id)
    }

    /// Replay the session onto the end of an existing document.
    pub async fn persist_into(
        &self,
        session: &Session,
        document_id: &str,
        credentials: &DocumentCredentials,
    ) -> Result<String, AnalyzerError> {
        let target = SaveTarget::Existing {
            document_id: document_id.to_string(),
        };
        let document_id = self
            .persist_results(&session.results, &target, credentials)
            .await?;
        session.record_saved_document(&document_id);
        Ok(document_id)
    }

    /// Write `results` to `target`, one append per result, in order.
    ///
    /// An existing document id may also be given as a Docs URL; anything
    /// else is rejected before the credentials are used.
    pub async fn persist_results(
        &self,
        results: &[AnalysisResult],
        target: &SaveTarget,
        credentials: &DocumentCredentials,
    ) -> Result<String, AnalyzerError> {
        let existing = match target {
            SaveTarget::New { .. } => None,
            SaveTarget::Existing { document_id } => {
                Some(parse_document_id(document_id).ok_or_else(|| {
                    AnalyzerError::Validation(format!(
                        "document_id ('{document_id}' is not a document id or URL)"
                    ))
                })?)
            }
        };

        let sink = self.documents.connect(credentials).await?;

        let created = existing.is_none();
        let document_id = match (existing, target) {
            (Some(document_id), _) => document_id,
            (None, SaveTarget::New { title }) => sink.create(title).await?,
            (None, SaveTarget::Existing { document_id }) => document_id.clone(),
        };

        if let Err((appended, source)) =
            replay(sink.as_ref(), &document_id, results, &self.progress).await
        {
            warn!(
                "Save to {} stopped after {}/{} pages: {}",
                document_id,
                appended,
                results.len(),
                source
            );
            // Nothing was written to a document we did not create.
            if appended == 0 && !created {
                return Err(AnalyzerError::DocumentService(source));
            }
            return Err(AnalyzerError::PartialSave {
                document_id,
                created,
                appended,
                total: results.len(),
                source,
            });
        }

        info!("Saved {} pages to document {}", results.len(), document_id);
        Ok(document_id)
    }
}

/// Append every result in order; on failure report how many made it.
async fn replay(
    sink: &dyn DocumentSink,
    document_id: &str,
    results: &[AnalysisResult],
    progress: &ProgressCallback,
) -> Result<(), (usize, DocumentServiceError)> {
    let total = results.len();
    for (appended, result) in results.iter().enumerate() {
        sink.append(document_id, &result.image, &result.description)
            .await
            .map_err(|e| (appended, e))?;
        progress.on_page_appended(result.page_num(), total, document_id);
    }
    Ok(())
}
