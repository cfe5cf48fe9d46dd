//! Error types for the edgequake-pdf2docs library.
//!
//! One error enum per external collaborator keeps failure attribution
//! simple:
//!
//! * [`RenderError`] — the PDF could not be opened or rasterised.
//! * [`InferenceError`] — the vision model call failed for a page.
//! * [`DocumentServiceError`] — the Google Docs API (or its OAuth token
//!   endpoint) rejected a request.
//!
//! [`AnalyzerError`] wraps all three together with the request-level
//! failures (missing form fields, unknown session id) and is what the
//! orchestrator and the web handlers return.
//!
//! Nothing here is retried. Every error propagates to the caller, which
//! decides whether to show it, log it, or run the whole operation again.

use std::path::PathBuf;
use thiserror::Error;

/// Page Renderer failures.
#[derive(Debug, Error)]
pub enum RenderError {
    /// Input file was not found at the given path.
    #[error("PDF file not found: '{path}'")]
    FileNotFound { path: PathBuf },

    /// The file exists and was read, but is not a PDF.
    #[error("File is not a valid PDF (first bytes: {magic:?})")]
    NotAPdf { magic: Vec<u8> },

    /// PDF header/trailer/xref is corrupt and cannot be parsed.
    #[error("PDF is corrupt: {detail}")]
    CorruptPdf { detail: String },

    /// PDF requires a password; password-protected uploads are not supported.
    #[error("PDF is encrypted and requires a password")]
    PasswordRequired,

    /// pdfium-render returned an error for a specific page.
    #[error("Rasterisation failed for page {page}: {detail}")]
    RasterisationFailed { page: usize, detail: String },

    /// The rendered bitmap could not be written as JPEG.
    #[error("JPEG encoding failed for page {page}: {detail}")]
    EncodeFailed { page: usize, detail: String },

    /// Could not bind to a pdfium library.
    #[error(
        "Failed to bind to pdfium library: {0}\n\
Set PDFIUM_LIB_PATH=/path/to/libpdfium or install pdfium system-wide."
    )]
    PdfiumBindingFailed(String),

    /// The scoped working directory could not be created or written.
    #[error("Render workspace error: {0}")]
    Workspace(#[from] std::io::Error),
}

/// Vision Describer failures. Any of these aborts the remaining pages.
#[derive(Debug, Error)]
pub enum InferenceError {
    /// Neither the request nor the process environment supplied an API key.
    #[error("No inference API key supplied")]
    MissingApiKey,

    /// The provider rejected the credential (401/403).
    #[error("Authentication error from provider: {detail}")]
    Auth { detail: String },

    /// Transport-level failure talking to the provider.
    #[error("Network error calling provider on page {page}: {detail}")]
    Network { page: usize, detail: String },

    /// The provider did not answer within the configured bound.
    #[error("Provider call timed out after {secs}s on page {page}")]
    Timeout { page: usize, secs: u64 },

    /// The provider answered, but with nothing usable.
    #[error("Provider returned an empty description for page {page}")]
    EmptyCompletion { page: usize },

    /// Any other provider error (bad request, malformed response, 5xx).
    #[error("Provider error on page {page}: {message}")]
    Api { page: usize, message: String },
}

/// Document Sink failures.
#[derive(Debug, Error)]
pub enum DocumentServiceError {
    /// The uploaded service-account payload could not be parsed or used to sign.
    #[error("Invalid service-account credentials: {0}")]
    InvalidCredentials(String),

    /// The token endpoint refused the service-account assertion.
    #[error("Document service authentication failed: {0}")]
    Auth(String),

    /// Transport-level failure.
    #[error("Document service network error: {0}")]
    Network(String),

    /// The request did not complete within the configured bound.
    #[error("Document service call timed out after {secs}s")]
    Timeout { secs: u64 },

    /// Non-success HTTP status from the Docs API.
    #[error("Document service returned HTTP {status}: {message}")]
    Api { status: u16, message: String },

    /// Success status, but the body was not what the API documents.
    #[error("Malformed document service response: {0}")]
    MalformedResponse(String),
}

impl DocumentServiceError {
    /// Classify a reqwest transport error.
    pub(crate) fn from_transport(e: reqwest::Error, timeout_secs: u64) -> Self {
        if e.is_timeout() {
            DocumentServiceError::Timeout { secs: timeout_secs }
        } else {
            DocumentServiceError::Network(e.to_string())
        }
    }
}

/// All errors surfaced by the orchestrator and the request handlers.
#[derive(Debug, Error)]
pub enum AnalyzerError {
    #[error(transparent)]
    Render(#[from] RenderError),

    #[error(transparent)]
    Inference(#[from] InferenceError),

    #[error(transparent)]
    DocumentService(#[from] DocumentServiceError),

    /// A required request field was missing or empty.
    #[error("Missing required fields: {0}")]
    Validation(String),

    /// No session with this id exists in the store.
    #[error("Session {id} not found")]
    NotFound { id: u64 },

    /// Persisting stopped part-way after `appended` pages. When `created`
    /// is set the document was made by this save and holds only those pages;
    /// otherwise they follow whatever the document already contained.
    #[error(
        "Document '{document_id}' was only partially written ({appended}/{total} pages appended): {source}"
    )]
    PartialSave {
        document_id: String,
        created: bool,
        appended: usize,
        total: usize,
        #[source]
        source: DocumentServiceError,
    },

    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}
