//! Credential types for the two external services.
//!
//! Both types are deliberately opaque: neither implements `Serialize`, and
//! their `Debug` output never contains the secret, so they can sit inside a
//! [`crate::session::Session`] or a `tracing` span without leaking.
//!
//! * [`ApiKey`] — bearer key for the inference provider, supplied per request
//!   (or once per process from `OPENAI_API_KEY`) and threaded explicitly into
//!   the describer. It is never written into the process environment.
//! * [`DocumentCredentials`] — the raw service-account JSON uploaded with a
//!   request. It is kept unparsed until save time; only the Document Sink
//!   needs it to be valid. [`ServiceAccountKey`] is the parsed form.

use crate::error::DocumentServiceError;
use serde::Deserialize;
use std::fmt;
use std::path::Path;
use std::sync::Arc;

/// The OAuth scope requested for every Docs API token.
pub const DOCUMENTS_SCOPE: &str = "https://www.googleapis.com/auth/documents";

const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";

/// Inference-provider bearer key.
#[derive(Clone, PartialEq, Eq)]
pub struct ApiKey(String);

impl ApiKey {
    /// Wrap a key, trimming surrounding whitespace. Returns `None` when empty.
    pub fn new(key: impl Into<String>) -> Option<Self> {
        let key = key.into();
        let trimmed = key.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(Self(trimmed.to_string()))
        }
    }

    /// The secret itself. Only the describer should call this.
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ApiKey(<redacted>)")
    }
}

/// Raw service-account payload as uploaded.
#[derive(Clone)]
pub struct DocumentCredentials(Arc<[u8]>);

impl DocumentCredentials {
    /// Wrap uploaded bytes. Returns `None` for an empty upload.
    pub fn from_bytes(bytes: impl Into<Vec<u8>>) -> Option<Self> {
        let bytes = bytes.into();
        if bytes.iter().all(u8::is_ascii_whitespace) {
            None
        } else {
            Some(Self(Arc::from(bytes)))
        }
    }

    /// Read a credentials file from disk.
    pub fn from_file(path: &Path) -> Result<Self, DocumentServiceError> {
        let bytes = std::fs::read(path).map_err(|e| {
            DocumentServiceError::InvalidCredentials(format!(
                "cannot read '{}': {}",
                path.display(),
                e
            ))
        })?;
        Self::from_bytes(bytes).ok_or_else(|| {
            DocumentServiceError::InvalidCredentials(format!("'{}' is empty", path.display()))
        })
    }

    /// Parse the payload into a usable service-account key.
    pub fn parse(&self) -> Result<ServiceAccountKey, DocumentServiceError> {
        ServiceAccountKey::from_json(&self.0)
    }
}

impl fmt::Debug for DocumentCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DocumentCredentials(<{} bytes redacted>)", self.0.len())
    }
}

/// A parsed Google service-account key.
#[derive(Clone, Deserialize)]
pub struct ServiceAccountKey {
    #[serde(rename = "type", default)]
    key_type: Option<String>,
    /// Identity the JWT assertion is issued for.
    pub client_email: String,
    private_key: String,
    #[serde(default)]
    pub private_key_id: Option<String>,
    /// Where the signed assertion is exchanged for an access token.
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

fn default_token_uri() -> String {
    DEFAULT_TOKEN_URI.to_string()
}

impl ServiceAccountKey {
    /// Parse and sanity-check a service-account JSON document.
    pub fn from_json(bytes: &[u8]) -> Result<Self, DocumentServiceError> {
        let key: ServiceAccountKey = serde_json::from_slice(bytes)
            .map_err(|e| DocumentServiceError::InvalidCredentials(e.to_string()))?;

        if let Some(ref t) = key.key_type {
            if t != "service_account" {
                return Err(DocumentServiceError::InvalidCredentials(format!(
                    "expected type \"service_account\", got \"{t}\""
                )));
            }
        }
        if key.client_email.trim().is_empty() {
            return Err(DocumentServiceError::InvalidCredentials(
                "client_email is empty".into(),
            ));
        }
        if !key.private_key.contains("PRIVATE KEY") {
            return Err(DocumentServiceError::InvalidCredentials(
                "private_key is not a PEM private key".into(),
            ));
        }
        Ok(key)
    }

    pub(crate) fn private_key_pem(&self) -> &str {
        &self.private_key
    }
}

impl fmt::Debug for ServiceAccountKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceAccountKey")
            .field("client_email", &self.client_email)
            .field("private_key_id", &self.private_key_id)
            .field("private_key", &"<redacted>")
            .field("token_uri", &self.token_uri)
            .finish()
    }
}
