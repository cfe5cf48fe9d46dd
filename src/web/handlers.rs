use super::AppState;
use crate::credentials::{ApiKey, DocumentCredentials};
use crate::error::AnalyzerError;
use crate::output::AnalysisView;
use crate::pipeline::docs::parse_document_id;
use crate::prompts::{default_document_title, effective_prompt};
use crate::session::{NewSession, Session};
use axum::extract::multipart::{Field, MultipartError};
use axum::extract::{Form, Multipart, Path, State};
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Redirect, Response};
use minijinja::context;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info, warn};

/// Fields of the upload form, as received.
#[derive(Default)]
struct UploadForm {
    pdf: Option<(String, Vec<u8>)>,
    credentials: Option<Vec<u8>>,
    api_key: Option<String>,
    prompt: Option<String>,
}

impl UploadForm {
    async fn read(multipart: &mut Multipart) -> Result<Self, MultipartError> {
        let mut form = UploadForm::default();
        while let Some(field) = multipart.next_field().await? {
            let name = field.name().unwrap_or_default().to_string();
            match name.as_str() {
                "pdf" => {
                    let file_name = field.file_name().unwrap_or("upload.pdf").to_string();
                    let bytes = read_bytes(field).await?;
                    if !bytes.is_empty() {
                        form.pdf = Some((file_name, bytes));
                    }
                }
                "credentials" => {
                    let bytes = read_bytes(field).await?;
                    if !bytes.is_empty() {
                        form.credentials = Some(bytes);
                    }
                }
                "openai_api_key" => form.api_key = Some(field.text().await?),
                "prompt" => form.prompt = Some(field.text().await?),
                other => warn!("Ignoring unexpected form field '{}'", other),
            }
        }
        Ok(form)
    }
}

async fn read_bytes(field: Field<'_>) -> Result<Vec<u8>, MultipartError> {
    Ok(field.bytes().await?.to_vec())
}

/// A fully validated upload.
struct ValidUpload {
    file_name: String,
    pdf: Vec<u8>,
    credentials: DocumentCredentials,
    api_key: ApiKey,
    prompt: String,
}

fn validate(
    form: UploadForm,
    default_key: Option<&ApiKey>,
    default_prompt: &str,
) -> Result<ValidUpload, AnalyzerError> {
    let credentials = form.credentials.and_then(DocumentCredentials::from_bytes);
    let api_key = form
        .api_key
        .and_then(ApiKey::new)
        .or_else(|| default_key.cloned());

    let mut missing = Vec::new();
    if form.pdf.is_none() {
        missing.push("pdf");
    }
    if credentials.is_none() {
        missing.push("credentials");
    }
    if api_key.is_none() {
        missing.push("openai_api_key");
    }

    match (form.pdf, credentials, api_key) {
        (Some((file_name, pdf)), Some(credentials), Some(api_key)) => Ok(ValidUpload {
            file_name,
            pdf,
            credentials,
            api_key,
            prompt: effective_prompt(form.prompt.as_deref(), default_prompt),
        }),
        _ => Err(AnalyzerError::Validation(missing.join(", "))),
    }
}

/// HTTP status for each error kind.
fn status_for(e: &AnalyzerError) -> StatusCode {
    match e {
        AnalyzerError::Validation(_) => StatusCode::BAD_REQUEST,
        AnalyzerError::NotFound { .. } => StatusCode::NOT_FOUND,
        AnalyzerError::Render(_) => StatusCode::UNPROCESSABLE_ENTITY,
        AnalyzerError::Inference(_)
        | AnalyzerError::DocumentService(_)
        | AnalyzerError::PartialSave { .. } => StatusCode::BAD_GATEWAY,
        AnalyzerError::InvalidConfig(_) | AnalyzerError::Internal(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

/// User-facing wording; partial saves say plainly what the document holds.
fn user_message(e: &AnalyzerError) -> String {
    match e {
        AnalyzerError::PartialSave {
            document_id,
            created: true,
            appended,
            total,
            source,
        } => format!(
            "Save failed part-way: document {document_id} now contains only the first \
             {appended} of {total} pages. Error: {source}"
        ),
        AnalyzerError::PartialSave {
            document_id,
            created: false,
            appended,
            total,
            source,
        } => format!(
            "Save failed part-way: {appended} of {total} pages were appended to \
             document {document_id}. Error: {source}"
        ),
        other => other.to_string(),
    }
}

fn render_page<S: Serialize>(state: &AppState, status: StatusCode, name: &str, ctx: S) -> Response {
    match state.templates.render(name, ctx) {
        Ok(html) => (status, Html(html)).into_response(),
        Err(e) => {
            error!("Template '{}' failed: {}", name, e);
            (StatusCode::INTERNAL_SERVER_ERROR, "template error").into_response()
        }
    }
}

fn render_upload(state: &AppState, status: StatusCode, message: Option<String>) -> Response {
    let is_error = status != StatusCode::OK;
    render_page(
        state,
        status,
        "upload.html",
        context! {
            default_prompt => state.config.default_prompt,
            has_default_key => state.config.default_api_key.is_some(),
            message => message,
            is_error => is_error,
        },
    )
}

fn render_error(state: &AppState, e: &AnalyzerError) -> Response {
    let status = status_for(e);
    render_page(
        state,
        status,
        "error.html",
        context! {
            heading => status.canonical_reason().unwrap_or("Error"),
            message => user_message(e),
            is_error => true,
        },
    )
}

#[derive(Serialize)]
struct SessionSummary {
    id: u64,
    file_name: String,
    prompt: String,
    pages: usize,
    created_at: String,
    saved_document: Option<String>,
}

impl From<&Session> for SessionSummary {
    fn from(s: &Session) -> Self {
        Self {
            id: s.id,
            file_name: s.file_name.clone(),
            prompt: s.prompt.clone(),
            pages: s.results.len(),
            created_at: s.created_at.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
            saved_document: s.saved_document(),
        }
    }
}

fn render_detail(
    state: &AppState,
    session: &Session,
    status: StatusCode,
    message: Option<String>,
) -> Response {
    let results: Vec<AnalysisView> = session.results.iter().map(AnalysisView::from).collect();
    render_page(
        state,
        status,
        "detail.html",
        context! {
            session => SessionSummary::from(session),
            results => results,
            default_title => default_document_title(&session.file_name),
            message => message,
            is_error => status != StatusCode::OK,
        },
    )
}

pub(super) async fn upload_form(State(state): State<Arc<AppState>>) -> Response {
    render_upload(&state, StatusCode::OK, None)
}

pub(super) async fn upload(State(state): State<Arc<AppState>>, mut multipart: Multipart) -> Response {
    let form = match UploadForm::read(&mut multipart).await {
        Ok(f) => f,
        Err(e) => return render_upload(&state, e.status(), Some(e.body_text())),
    };

    let upload = match validate(
        form,
        state.config.default_api_key.as_ref(),
        &state.config.default_prompt,
    ) {
        Ok(u) => u,
        Err(e) => return render_upload(&state, status_for(&e), Some(user_message(&e))),
    };

    info!("Analysing upload '{}' ({} bytes)", upload.file_name, upload.pdf.len());
    let results = match state
        .pipeline
        .run_bytes(&upload.pdf, &upload.prompt, &upload.api_key)
        .await
    {
        Ok(r) => r,
        Err(e) => {
            warn!("Analysis of '{}' failed: {}", upload.file_name, e);
            return render_upload(&state, status_for(&e), Some(user_message(&e)));
        }
    };

    let id = state.store.add(NewSession {
        file_name: upload.file_name,
        prompt: upload.prompt,
        results,
        credentials: upload.credentials,
    });
    Redirect::to(&format!("/history/{id}")).into_response()
}

pub(super) async fn history(State(state): State<Arc<AppState>>) -> Response {
    let sessions: Vec<SessionSummary> = state
        .store
        .list()
        .iter()
        .map(|s| SessionSummary::from(s.as_ref()))
        .collect();
    render_page(&state, StatusCode::OK, "history.html", context! { sessions => sessions })
}

pub(super) async fn detail(State(state): State<Arc<AppState>>, Path(id): Path<u64>) -> Response {
    match state.store.get(id) {
        Some(session) => render_detail(&state, &session, StatusCode::OK, None),
        None => render_error(&state, &AnalyzerError::NotFound { id }),
    }
}

#[derive(Debug, Default, Deserialize)]
pub(super) struct SaveForm {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    document_id: Option<String>,
}

pub(super) async fn save(
    State(state): State<Arc<AppState>>,
    Path(id): Path<u64>,
    Form(form): Form<SaveForm>,
) -> Response {
    let Some(session) = state.store.get(id) else {
        return render_error(&state, &AnalyzerError::NotFound { id });
    };

    let existing = form
        .document_id
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty());

    let outcome = match existing {
        Some(raw) => match parse_document_id(raw) {
            Some(doc_id) => {
                state
                    .pipeline
                    .persist_into(&session, &doc_id, session.credentials())
                    .await
            }
            None => Err(AnalyzerError::Validation(format!(
                "document_id ('{raw}' is not a document id or URL)"
            ))),
        },
        None => {
            let title = form
                .title
                .as_deref()
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .unwrap_or_else(|| default_document_title(&session.file_name));
            state
                .pipeline
                .persist(&session, &title, session.credentials())
                .await
        }
    };

    match outcome {
        Ok(doc_id) => {
            info!("Session {} saved to document {}", id, doc_id);
            let message = format!(
                "Saved {} pages to document {}",
                session.results.len(),
                doc_id
            );
            render_detail(&state, &session, StatusCode::OK, Some(message))
        }
        Err(e) => {
            warn!("Saving session {} failed: {}", id, e);
            render_detail(&state, &session, status_for(&e), Some(user_message(&e)))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{DocumentServiceError, InferenceError};

    fn form(pdf: bool, creds: bool, key: Option<&str>) -> UploadForm {
        UploadForm {
            pdf: pdf.then(|| ("a.pdf".to_string(), b"%PDF-1.4".to_vec())),
            credentials: creds.then(|| b"{}".to_vec()),
            api_key: key.map(str::to_string),
            prompt: None,
        }
    }

    #[test]
    fn validation_lists_every_missing_field() {
        let err = validate(form(false, false, None), None, "p").err().unwrap();
        assert_eq!(
            err.to_string(),
            "Missing required fields: pdf, credentials, openai_api_key"
        );
    }

    #[test]
    fn default_key_fills_blank_request_key() {
        let default = ApiKey::new("sk-server").unwrap();
        let ok = validate(form(true, true, Some("  ")), Some(&default), "Describe").ok().unwrap();
        assert_eq!(ok.api_key.expose(), "sk-server");
        assert_eq!(ok.prompt, "Describe");
    }

    #[test]
    fn request_key_wins_over_default() {
        let default = ApiKey::new("sk-server").unwrap();
        let ok = validate(form(true, true, Some("sk-user")), Some(&default), "p").ok().unwrap();
        assert_eq!(ok.api_key.expose(), "sk-user");
    }

    #[test]
    fn statuses_follow_error_kind() {
        assert_eq!(status_for(&AnalyzerError::Validation("x".into())), StatusCode::BAD_REQUEST);
        assert_eq!(status_for(&AnalyzerError::NotFound { id: 1 }), StatusCode::NOT_FOUND);
        assert_eq!(
            status_for(&InferenceError::MissingApiKey.into()),
            StatusCode::BAD_GATEWAY
        );
    }

    #[test]
    fn partial_save_message_is_explicit() {
        let e = AnalyzerError::PartialSave {
            document_id: "doc-9".into(),
            created: true,
            appended: 1,
            total: 2,
            source: DocumentServiceError::Timeout { secs: 60 },
        };
        let msg = user_message(&e);
        assert!(msg.contains("part-way"));
        assert!(msg.contains("first 1 of 2 pages"));
        assert!(msg.contains("doc-9"));
    }

    #[test]
    fn partial_save_into_existing_document_does_not_claim_contents() {
        let e = AnalyzerError::PartialSave {
            document_id: "doc-9".into(),
            created: false,
            appended: 1,
            total: 3,
            source: DocumentServiceError::Timeout { secs: 60 },
        };
        let msg = user_message(&e);
        assert!(msg.contains("1 of 3 pages were appended"), "{msg}");
        assert!(!msg.contains("contains only"));
    }
}
