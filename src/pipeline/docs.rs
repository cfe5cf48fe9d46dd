//! Document Sink: create a Google Doc and append (image, text) blocks to it.
//!
//! ## Authentication
//!
//! [`GoogleDocsConnector::connect`] performs the service-account JWT bearer
//! flow once: it signs an RS256 assertion scoped to
//! [`DOCUMENTS_SCOPE`](crate::credentials::DOCUMENTS_SCOPE), exchanges it at
//! the key's `token_uri`, and returns a [`GoogleDocsSink`] that reuses the
//! access token for every call.
//!
//! ## Append semantics
//!
//! Each append is one `documents.batchUpdate` with two requests, both
//! positioned at the end of the body segment: an inline image at a fixed
//! display size, then `"\n" + text + "\n\n"`. Appends are an ordered edit
//! log against the remote document. There is no rollback: if append k fails,
//! the document keeps appends 1..k-1.

use crate::config::AnalyzerConfig;
use crate::credentials::{DocumentCredentials, ServiceAccountKey, DOCUMENTS_SCOPE};
use crate::error::DocumentServiceError;
use crate::output::PageImage;
use async_trait::async_trait;
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";

/// Assertion lifetime requested from the token endpoint (Google's maximum).
const ASSERTION_TTL_SECS: i64 = 3600;

/// Maximum number of response-body bytes quoted in an error message.
const ERROR_BODY_LIMIT: usize = 500;

static DOC_URL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"/document/(?:u/\d+/)?d/([A-Za-z0-9_-]+)").unwrap());
static DOC_ID_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Za-z0-9_-]+$").unwrap());

/// A remote document that can be created and appended to.
#[async_trait]
pub trait DocumentSink: Send + Sync {
    /// Create a new document and return its id.
    async fn create(&self, title: &str) -> Result<String, DocumentServiceError>;

    /// Append `image` followed by `text` and a blank line at the end of the document.
    async fn append(
        &self,
        document_id: &str,
        image: &PageImage,
        text: &str,
    ) -> Result<(), DocumentServiceError>;
}

/// Authenticates once and hands out a [`DocumentSink`].
#[async_trait]
pub trait DocumentSinkFactory: Send + Sync {
    async fn connect(
        &self,
        credentials: &DocumentCredentials,
    ) -> Result<Arc<dyn DocumentSink>, DocumentServiceError>;
}

/// Production [`DocumentSinkFactory`] for the Google Docs REST API.
#[derive(Debug, Clone)]
pub struct GoogleDocsConnector {
    http: reqwest::Client,
    base_url: String,
    image_size_pt: (f64, f64),
    timeout_secs: u64,
}

impl GoogleDocsConnector {
    pub fn new(config: &AnalyzerConfig) -> Result<Self, DocumentServiceError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.docs_timeout_secs))
            .build()
            .map_err(|e| DocumentServiceError::Network(e.to_string()))?;
        Ok(Self {
            http,
            base_url: config.docs_base_url.clone(),
            image_size_pt: (config.image_width_pt, config.image_height_pt),
            timeout_secs: config.docs_timeout_secs,
        })
    }
}

#[async_trait]
impl DocumentSinkFactory for GoogleDocsConnector {
    async fn connect(
        &self,
        credentials: &DocumentCredentials,
    ) -> Result<Arc<dyn DocumentSink>, DocumentServiceError> {
        let key = credentials.parse()?;
        let access_token = fetch_access_token(&self.http, &key, self.timeout_secs).await?;
        info!("Authenticated to document service as {}", key.client_email);

        Ok(Arc::new(GoogleDocsSink {
            http: self.http.clone(),
            base_url: self.base_url.clone(),
            access_token,
            image_size_pt: self.image_size_pt,
            timeout_secs: self.timeout_secs,
        }))
    }
}

/// An authenticated Google Docs client.
pub struct GoogleDocsSink {
    http: reqwest::Client,
    base_url: String,
    access_token: String,
    image_size_pt: (f64, f64),
    timeout_secs: u64,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreatedDocument {
    document_id: String,
}

#[async_trait]
impl DocumentSink for GoogleDocsSink {
    async fn create(&self, title: &str) -> Result<String, DocumentServiceError> {
        let url = format!("{}/v1/documents", self.base_url);
        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.access_token)
            .json(&json!({ "title": title }))
            .send()
            .await
            .map_err(|e| DocumentServiceError::from_transport(e, self.timeout_secs))?;

        let body = read_success_body(response).await?;
        let created: CreatedDocument = serde_json::from_str(&body)
            .map_err(|e| DocumentServiceError::MalformedResponse(e.to_string()))?;

        info!("Created document {} ('{}')", created.document_id, title);
        Ok(created.document_id)
    }

    async fn append(
        &self,
        document_id: &str,
        image: &PageImage,
        text: &str,
    ) -> Result<(), DocumentServiceError> {
        let url = format!("{}/v1/documents/{}:batchUpdate", self.base_url, document_id);
        let (width, height) = self.image_size_pt;
        let body = append_requests(&image.data_uri(), width, height, text);

        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.access_token)
            .json(&body)
            .send()
            .await
            .map_err(|e| DocumentServiceError::from_transport(e, self.timeout_secs))?;

        read_success_body(response).await?;
        debug!("Appended page {} to document {}", image.page_num, document_id);
        Ok(())
    }
}

/// The `batchUpdate` body for one page: inline image, then the description.
pub fn append_requests(image_uri: &str, width_pt: f64, height_pt: f64, text: &str) -> Value {
    json!({
        "requests": [
            {
                "insertInlineImage": {
                    "location": { "endOfSegmentLocation": {} },
                    "objectSize": {
                        "height": { "magnitude": height_pt, "unit": "PT" },
                        "width": { "magnitude": width_pt, "unit": "PT" }
                    },
                    "uri": image_uri
                }
            },
            {
                "insertText": {
                    "endOfSegmentLocation": {},
                    "text": format!("\n{text}\n\n")
                }
            }
        ]
    })
}

/// Extract a document id from a bare id or a Google Docs URL.
pub fn parse_document_id(input: &str) -> Option<String> {
    let input = input.trim();
    if let Some(caps) = DOC_URL_RE.captures(input) {
        return Some(caps[1].to_string());
    }
    if DOC_ID_RE.is_match(input) {
        Some(input.to_string())
    } else {
        None
    }
}

#[derive(Serialize)]
struct Claims<'a> {
    iss: &'a str,
    scope: &'a str,
    aud: &'a str,
    iat: i64,
    exp: i64,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
}

/// Sign a service-account assertion and exchange it for an access token.
async fn fetch_access_token(
    http: &reqwest::Client,
    key: &ServiceAccountKey,
    timeout_secs: u64,
) -> Result<String, DocumentServiceError> {
    let assertion = sign_assertion(key, chrono::Utc::now().timestamp())?;

    let response = http
        .post(&key.token_uri)
        .form(&[("grant_type", JWT_BEARER_GRANT), ("assertion", assertion.as_str())])
        .send()
        .await
        .map_err(|e| DocumentServiceError::from_transport(e, timeout_secs))?;

    let status = response.status();
    let body = response
        .text()
        .await
        .map_err(|e| DocumentServiceError::from_transport(e, timeout_secs))?;
    if !status.is_success() {
        return Err(DocumentServiceError::Auth(format!(
            "token endpoint returned HTTP {}: {}",
            status.as_u16(),
            truncate(&body)
        )));
    }

    let token: TokenResponse = serde_json::from_str(&body)
        .map_err(|e| DocumentServiceError::MalformedResponse(format!("token response: {e}")))?;
    Ok(token.access_token)
}

fn sign_assertion(key: &ServiceAccountKey, now: i64) -> Result<String, DocumentServiceError> {
    let claims = Claims {
        iss: &key.client_email,
        scope: DOCUMENTS_SCOPE,
        aud: &key.token_uri,
        iat: now,
        exp: now + ASSERTION_TTL_SECS,
    };

    let mut header = Header::new(Algorithm::RS256);
    header.kid = key.private_key_id.clone();

    let signing_key = EncodingKey::from_rsa_pem(key.private_key_pem().as_bytes())
        .map_err(|e| DocumentServiceError::InvalidCredentials(e.to_string()))?;

    jsonwebtoken::encode(&header, &claims, &signing_key)
        .map_err(|e| DocumentServiceError::InvalidCredentials(e.to_string()))
}

/// Return the body of a 2xx response, or the matching error.
async fn read_success_body(response: reqwest::Response) -> Result<String, DocumentServiceError> {
    let status = response.status();
    let body = response
        .text()
        .await
        .map_err(|e| DocumentServiceError::Network(e.to_string()))?;

    if status.is_success() {
        return Ok(body);
    }
    if status.as_u16() == 401 || status.as_u16() == 403 {
        return Err(DocumentServiceError::Auth(format!(
            "HTTP {}: {}",
            status.as_u16(),
            truncate(&body)
        )));
    }
    Err(DocumentServiceError::Api {
        status: status.as_u16(),
        message: truncate(&body),
    })
}

fn truncate(body: &str) -> String {
    if body.len() <= ERROR_BODY_LIMIT {
        return body.to_string();
    }
    let mut end = ERROR_BODY_LIMIT;
    while !body.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}\u{2026}", &body[..end])
}
