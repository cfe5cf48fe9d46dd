//! Orchestrator behaviour against scripted collaborators.

mod common;

use common::*;
use edgequake_pdf2docs::{
    AnalyzerError, DocumentServiceError, NewSession, PipelineProgress, RenderError, SaveTarget,
    SessionStore,
};
use std::path::Path;
use std::sync::atomic::Ordering;
use std::sync::{Arc, Mutex};

#[tokio::test]
async fn run_describes_every_page_in_order() {
    let fakes = Fakes::happy(3);
    let results = fakes
        .pipeline()
        .run(Path::new("deck.pdf"), "Summarise", &api_key())
        .await
        .unwrap();

    assert_eq!(results.len(), 3);
    for (i, r) in results.iter().enumerate() {
        assert_eq!(r.page_num(), i + 1);
        assert_eq!(r.image.file_name(), format!("page_{}.jpg", i + 1));
        assert_eq!(r.description, format!("description of page {}", i + 1));
    }
    assert_eq!(fakes.describer.pages_called(), vec![1, 2, 3]);
    assert!(fakes
        .describer
        .calls
        .lock()
        .unwrap()
        .iter()
        .all(|(_, p)| p == "Summarise"));
}

#[tokio::test]
async fn run_uses_the_callers_key() {
    let fakes = Fakes::happy(1);
    let key = edgequake_pdf2docs::ApiKey::new("sk-per-request").unwrap();
    fakes
        .pipeline()
        .run(Path::new("a.pdf"), "p", &key)
        .await
        .unwrap();
    assert_eq!(*fakes.describer.keys.lock().unwrap(), vec!["sk-per-request"]);
}

#[tokio::test]
async fn failing_page_aborts_without_later_calls() {
    let fakes = Fakes::new(
        FakeRenderer::with_pages(4),
        ScriptedDescriber::failing_on(2),
        RecordingSink::ok(),
    );
    let err = fakes
        .pipeline()
        .run(Path::new("a.pdf"), "p", &api_key())
        .await
        .unwrap_err();

    assert!(matches!(err, AnalyzerError::Inference(_)), "{err:?}");
    assert_eq!(fakes.describer.pages_called(), vec![1, 2]);
}

#[tokio::test]
async fn render_failure_skips_describe() {
    let fakes = Fakes::new(
        FakeRenderer::corrupt(),
        ScriptedDescriber::ok(),
        RecordingSink::ok(),
    );
    let err = fakes
        .pipeline()
        .run(Path::new("a.pdf"), "p", &api_key())
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        AnalyzerError::Render(RenderError::CorruptPdf { .. })
    ));
    assert!(fakes.describer.pages_called().is_empty());
}

#[tokio::test]
async fn run_bytes_rejects_non_pdf_before_rendering() {
    let fakes = Fakes::happy(2);
    let err = fakes
        .pipeline()
        .run_bytes(b"GIF89a....", "p", &api_key())
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        AnalyzerError::Render(RenderError::NotAPdf { .. })
    ));
    assert_eq!(fakes.renderer.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn run_bytes_renders_the_upload() {
    let fakes = Fakes::happy(2);
    let results = fakes
        .pipeline()
        .run_bytes(FAKE_PDF, "p", &api_key())
        .await
        .unwrap();
    assert_eq!(results.len(), 2);
    assert_eq!(fakes.renderer.calls.load(Ordering::SeqCst), 1);
}

async fn stored_session(fakes: &Fakes, store: &SessionStore, pages: usize) -> u64 {
    let results = fakes
        .pipeline()
        .run(Path::new("slides.pdf"), "p", &api_key())
        .await
        .unwrap();
    assert_eq!(results.len(), pages);
    store.add(NewSession {
        file_name: "slides.pdf".into(),
        prompt: "p".into(),
        results,
        credentials: credentials(),
    })
}

#[tokio::test]
async fn persist_creates_then_appends_each_page_in_order() {
    let fakes = Fakes::happy(3);
    let store = SessionStore::new();
    let id = stored_session(&fakes, &store, 3).await;
    let session = store.get(id).unwrap();

    let doc_id = fakes
        .pipeline()
        .persist(&session, "Slides", session.credentials())
        .await
        .unwrap();

    assert_eq!(doc_id, "doc-new");
    let calls = fakes.sink.calls();
    assert_eq!(calls.len(), 4);
    assert_eq!(calls[0], DocCall::Create("Slides".into()));
    assert_eq!(fakes.sink.appended_pages(), vec![1, 2, 3]);
    assert_eq!(
        calls[2],
        DocCall::Append {
            document_id: "doc-new".into(),
            page_num: 2,
            text: "description of page 2".into(),
        }
    );
    assert_eq!(fakes.sink.connects.load(Ordering::SeqCst), 1);
    assert_eq!(session.saved_document().as_deref(), Some("doc-new"));
}

#[tokio::test]
async fn persist_into_existing_document_skips_create() {
    let fakes = Fakes::happy(2);
    let store = SessionStore::new();
    let id = stored_session(&fakes, &store, 2).await;
    let session = store.get(id).unwrap();

    let doc_id = fakes
        .pipeline()
        .persist_into(&session, "1AbCdEf", session.credentials())
        .await
        .unwrap();

    assert_eq!(doc_id, "1AbCdEf");
    let calls = fakes.sink.calls();
    assert!(calls.iter().all(|c| !matches!(c, DocCall::Create(_))));
    assert_eq!(fakes.sink.appended_pages(), vec![1, 2]);
}

#[tokio::test]
async fn persist_into_accepts_a_document_url() {
    let fakes = Fakes::happy(1);
    let store = SessionStore::new();
    let id = stored_session(&fakes, &store, 1).await;
    let session = store.get(id).unwrap();

    let doc_id = fakes
        .pipeline()
        .persist_into(
            &session,
            "https://docs.google.com/document/d/1AbC_dE-f/edit",
            session.credentials(),
        )
        .await
        .unwrap();

    assert_eq!(doc_id, "1AbC_dE-f");
    assert_eq!(session.saved_document().as_deref(), Some("1AbC_dE-f"));
}

#[tokio::test]
async fn malformed_existing_id_is_rejected_before_connecting() {
    let fakes = Fakes::happy(2);
    let store = SessionStore::new();
    let id = stored_session(&fakes, &store, 2).await;
    let session = store.get(id).unwrap();

    let err = fakes
        .pipeline()
        .persist_into(&session, "abc/../../v1/documents?x=1", session.credentials())
        .await
        .unwrap_err();

    match err {
        AnalyzerError::Validation(msg) => assert!(msg.contains("document_id"), "{msg}"),
        other => panic!("expected Validation, got {other:?}"),
    }
    assert_eq!(fakes.sink.connects.load(Ordering::SeqCst), 0);
    assert!(fakes.sink.calls().is_empty());
    assert_eq!(session.saved_document(), None);
}

#[tokio::test]
async fn first_append_failure_on_existing_document_is_not_a_partial_save() {
    let fakes = Fakes::new(
        FakeRenderer::with_pages(2),
        ScriptedDescriber::ok(),
        RecordingSink::failing_on_append(1),
    );
    let store = SessionStore::new();
    let id = stored_session(&fakes, &store, 2).await;
    let session = store.get(id).unwrap();

    let err = fakes
        .pipeline()
        .persist_into(&session, "missing-doc", session.credentials())
        .await
        .unwrap_err();

    assert!(
        matches!(
            err,
            AnalyzerError::DocumentService(DocumentServiceError::Api { status: 500, .. })
        ),
        "expected DocumentService, got {err:?}"
    );
    assert!(fakes.sink.appended_pages().is_empty());
    assert_eq!(session.saved_document(), None);
}

#[tokio::test]
async fn later_append_failure_on_existing_document_is_partial() {
    let fakes = Fakes::new(
        FakeRenderer::with_pages(3),
        ScriptedDescriber::ok(),
        RecordingSink::failing_on_append(2),
    );
    let store = SessionStore::new();
    let id = stored_session(&fakes, &store, 3).await;
    let session = store.get(id).unwrap();

    let err = fakes
        .pipeline()
        .persist_into(&session, "doc-old", session.credentials())
        .await
        .unwrap_err();

    match err {
        AnalyzerError::PartialSave {
            document_id,
            created,
            appended,
            total,
            ..
        } => {
            assert_eq!(document_id, "doc-old");
            assert!(!created);
            assert_eq!((appended, total), (1, 3));
        }
        other => panic!("expected PartialSave, got {other:?}"),
    }
}

#[tokio::test]
async fn first_append_failure_on_new_document_is_still_partial() {
    let fakes = Fakes::new(
        FakeRenderer::with_pages(2),
        ScriptedDescriber::ok(),
        RecordingSink::failing_on_append(1),
    );
    let store = SessionStore::new();
    let id = stored_session(&fakes, &store, 2).await;
    let session = store.get(id).unwrap();

    let err = fakes
        .pipeline()
        .persist(&session, "Slides", session.credentials())
        .await
        .unwrap_err();

    assert!(
        matches!(
            err,
            AnalyzerError::PartialSave {
                created: true,
                appended: 0,
                total: 2,
                ..
            }
        ),
        "{err:?}"
    );
}

#[tokio::test]
async fn failed_append_reports_partial_save() {
    let fakes = Fakes::new(
        FakeRenderer::with_pages(2),
        ScriptedDescriber::ok(),
        RecordingSink::failing_on_append(2),
    );
    let store = SessionStore::new();
    let id = stored_session(&fakes, &store, 2).await;
    let session = store.get(id).unwrap();

    let err = fakes
        .pipeline()
        .persist(&session, "Slides", session.credentials())
        .await
        .unwrap_err();

    match err {
        AnalyzerError::PartialSave {
            document_id,
            created,
            appended,
            total,
            source,
        } => {
            assert_eq!(document_id, "doc-new");
            assert!(created);
            assert_eq!(appended, 1);
            assert_eq!(total, 2);
            assert!(matches!(source, DocumentServiceError::Api { status: 500, .. }));
        }
        other => panic!("expected PartialSave, got {other:?}"),
    }
    assert_eq!(fakes.sink.appended_pages(), vec![1]);
    assert_eq!(session.saved_document(), None);
}

#[tokio::test]
async fn rejected_credentials_touch_nothing() {
    let fakes = Fakes::new(
        FakeRenderer::with_pages(1),
        ScriptedDescriber::ok(),
        RecordingSink::rejecting_credentials(),
    );
    let results = fakes
        .pipeline()
        .run(Path::new("a.pdf"), "p", &api_key())
        .await
        .unwrap();

    let err = fakes
        .pipeline()
        .persist_results(
            &results,
            &SaveTarget::New {
                title: "t".into(),
            },
            &credentials(),
        )
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        AnalyzerError::DocumentService(DocumentServiceError::InvalidCredentials(_))
    ));
    assert!(fakes.sink.calls().is_empty());
}

#[derive(Default)]
struct EventLog(Mutex<Vec<String>>);

impl PipelineProgress for EventLog {
    fn on_run_start(&self, total_pages: usize) {
        self.0.lock().unwrap().push(format!("start {total_pages}"));
    }
    fn on_page_complete(&self, page_num: usize, _total: usize, _len: usize) {
        self.0.lock().unwrap().push(format!("done {page_num}"));
    }
    fn on_page_error(&self, page_num: usize, _total: usize, _error: &str) {
        self.0.lock().unwrap().push(format!("error {page_num}"));
    }
    fn on_page_appended(&self, page_num: usize, _total: usize, document_id: &str) {
        self.0
            .lock()
            .unwrap()
            .push(format!("appended {page_num} to {document_id}"));
    }
}

#[tokio::test]
async fn progress_events_follow_page_order() {
    let fakes = Fakes::new(
        FakeRenderer::with_pages(3),
        ScriptedDescriber::failing_on(3),
        RecordingSink::ok(),
    );
    let log = Arc::new(EventLog::default());
    let pipeline = fakes.pipeline().with_progress(log.clone());

    let _ = pipeline.run(Path::new("a.pdf"), "p", &api_key()).await;
    assert_eq!(
        *log.0.lock().unwrap(),
        vec!["start 3", "done 1", "done 2", "error 3"]
    );
}

#[tokio::test]
async fn progress_reports_each_append() {
    let fakes = Fakes::happy(2);
    let log = Arc::new(EventLog::default());
    let pipeline = fakes.pipeline().with_progress(log.clone());
    let results = pipeline
        .run(Path::new("a.pdf"), "p", &api_key())
        .await
        .unwrap();
    log.0.lock().unwrap().clear();

    pipeline
        .persist_results(
            &results,
            &SaveTarget::Existing {
                document_id: "d1".into(),
            },
            &credentials(),
        )
        .await
        .unwrap();
    assert_eq!(
        *log.0.lock().unwrap(),
        vec!["appended 1 to d1", "appended 2 to d1"]
    );
}
