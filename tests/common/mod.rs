//! Scripted fakes for the three pipeline collaborators.
//!
//! Every fake records the calls it receives so tests can assert on order
//! and on what was *not* called after a failure.

#![allow(dead_code)]

use async_trait::async_trait;
use edgequake_pdf2docs::{
    ApiKey, Describer, DescriberFactory, DocumentCredentials, DocumentServiceError, DocumentSink,
    DocumentSinkFactory, InferenceError, PageImage, PageRenderer, Pipeline, RenderError,
};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// Minimal bytes that pass the `%PDF-` magic check.
pub const FAKE_PDF: &[u8] = b"%PDF-1.4\n%fake\n";

pub fn fake_jpeg(page: usize) -> Vec<u8> {
    vec![0xFF, 0xD8, 0xFF, page as u8, 0xFF, 0xD9]
}

// ── Renderer ─────────────────────────────────────────────────────────────────

pub struct FakeRenderer {
    pages: usize,
    corrupt: bool,
    pub calls: AtomicUsize,
}

impl FakeRenderer {
    pub fn with_pages(pages: usize) -> Arc<Self> {
        Arc::new(Self {
            pages,
            corrupt: false,
            calls: AtomicUsize::new(0),
        })
    }

    pub fn corrupt() -> Arc<Self> {
        Arc::new(Self {
            pages: 0,
            corrupt: true,
            calls: AtomicUsize::new(0),
        })
    }
}

#[async_trait]
impl PageRenderer for FakeRenderer {
    async fn render(&self, _pdf_path: &Path) -> Result<Vec<PageImage>, RenderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.corrupt {
            return Err(RenderError::CorruptPdf {
                detail: "xref table missing".into(),
            });
        }
        Ok((1..=self.pages)
            .map(|n| PageImage::new(n, fake_jpeg(n)))
            .collect())
    }
}

// ── Describer ────────────────────────────────────────────────────────────────

/// Answers `"description of page N"`, or fails on `fail_on_page`.
#[derive(Default)]
pub struct ScriptedDescriber {
    fail_on_page: Option<usize>,
    /// `(page_num, prompt)` in call order.
    pub calls: Mutex<Vec<(usize, String)>>,
    /// Keys the factory was asked for, exposed.
    pub keys: Mutex<Vec<String>>,
}

impl ScriptedDescriber {
    pub fn ok() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn failing_on(page: usize) -> Arc<Self> {
        Arc::new(Self {
            fail_on_page: Some(page),
            ..Self::default()
        })
    }

    pub fn pages_called(&self) -> Vec<usize> {
        self.calls.lock().unwrap().iter().map(|(p, _)| *p).collect()
    }
}

#[async_trait]
impl Describer for ScriptedDescriber {
    async fn describe(&self, image: &PageImage, prompt: &str) -> Result<String, InferenceError> {
        self.calls
            .lock()
            .unwrap()
            .push((image.page_num, prompt.to_string()));
        if self.fail_on_page == Some(image.page_num) {
            return Err(InferenceError::Api {
                page: image.page_num,
                message: "rate limited".into(),
            });
        }
        Ok(format!("description of page {}", image.page_num))
    }
}

/// Hands out the same [`ScriptedDescriber`] for every key.
pub struct ScriptedDescribers(pub Arc<ScriptedDescriber>);

impl DescriberFactory for ScriptedDescribers {
    fn describer(&self, api_key: &ApiKey) -> Result<Arc<dyn Describer>, InferenceError> {
        self.0.keys.lock().unwrap().push(api_key.expose().to_string());
        Ok(self.0.clone())
    }
}

// ── Document sink ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocCall {
    Create(String),
    Append {
        document_id: String,
        page_num: usize,
        text: String,
    },
}

/// Records creates and appends; the `fail_on_append`-th append (1-based) fails.
#[derive(Default)]
pub struct RecordingSink {
    fail_on_append: Option<usize>,
    reject_credentials: bool,
    pub calls: Mutex<Vec<DocCall>>,
    pub connects: AtomicUsize,
}

impl RecordingSink {
    pub fn ok() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn failing_on_append(n: usize) -> Arc<Self> {
        Arc::new(Self {
            fail_on_append: Some(n),
            ..Self::default()
        })
    }

    pub fn rejecting_credentials() -> Arc<Self> {
        Arc::new(Self {
            reject_credentials: true,
            ..Self::default()
        })
    }

    pub fn calls(&self) -> Vec<DocCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn appended_pages(&self) -> Vec<usize> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                DocCall::Append { page_num, .. } => Some(page_num),
                DocCall::Create(_) => None,
            })
            .collect()
    }
}

#[async_trait]
impl DocumentSink for RecordingSink {
    async fn create(&self, title: &str) -> Result<String, DocumentServiceError> {
        self.calls
            .lock()
            .unwrap()
            .push(DocCall::Create(title.to_string()));
        Ok("doc-new".to_string())
    }

    async fn append(
        &self,
        document_id: &str,
        image: &PageImage,
        text: &str,
    ) -> Result<(), DocumentServiceError> {
        let mut calls = self.calls.lock().unwrap();
        let attempt = calls
            .iter()
            .filter(|c| matches!(c, DocCall::Append { .. }))
            .count()
            + 1;
        if self.fail_on_append == Some(attempt) {
            return Err(DocumentServiceError::Api {
                status: 500,
                message: "backend error".into(),
            });
        }
        calls.push(DocCall::Append {
            document_id: document_id.to_string(),
            page_num: image.page_num,
            text: text.to_string(),
        });
        Ok(())
    }
}

/// Connects to a shared [`RecordingSink`].
pub struct RecordingConnector(pub Arc<RecordingSink>);

#[async_trait]
impl DocumentSinkFactory for RecordingConnector {
    async fn connect(
        &self,
        _credentials: &DocumentCredentials,
    ) -> Result<Arc<dyn DocumentSink>, DocumentServiceError> {
        self.0.connects.fetch_add(1, Ordering::SeqCst);
        if self.0.reject_credentials {
            return Err(DocumentServiceError::InvalidCredentials(
                "not a service-account key".into(),
            ));
        }
        Ok(self.0.clone())
    }
}

// ── Wiring ───────────────────────────────────────────────────────────────────

pub struct Fakes {
    pub renderer: Arc<FakeRenderer>,
    pub describer: Arc<ScriptedDescriber>,
    pub sink: Arc<RecordingSink>,
}

impl Fakes {
    pub fn new(
        renderer: Arc<FakeRenderer>,
        describer: Arc<ScriptedDescriber>,
        sink: Arc<RecordingSink>,
    ) -> Self {
        Self {
            renderer,
            describer,
            sink,
        }
    }

    pub fn happy(pages: usize) -> Self {
        Self::new(
            FakeRenderer::with_pages(pages),
            ScriptedDescriber::ok(),
            RecordingSink::ok(),
        )
    }

    pub fn pipeline(&self) -> Pipeline {
        Pipeline::new(
            self.renderer.clone(),
            Arc::new(ScriptedDescribers(self.describer.clone())),
            Arc::new(RecordingConnector(self.sink.clone())),
        )
    }
}

pub fn api_key() -> ApiKey {
    ApiKey::new("sk-test").unwrap()
}

pub fn credentials() -> DocumentCredentials {
    DocumentCredentials::from_bytes(br#"{"type":"service_account"}"#.to_vec()).unwrap()
}
