//! Session Store: the in-memory history of completed analysis runs.
//!
//! The store is the only shared mutable state in the process. It is
//! append-only: [`SessionStore::add`] reserves the next id and pushes the
//! session under one write lock, so ids are unique, gap-free, and equal to
//! the session's position in [`SessionStore::list`]. Nothing is persisted;
//! history ends with the process.

use crate::credentials::DocumentCredentials;
use crate::output::AnalysisResult;
use chrono::{DateTime, Utc};
use std::sync::{Arc, RwLock};
use tracing::debug;

/// A session before the store has assigned it an id.
#[derive(Debug, Clone)]
pub struct NewSession {
    pub file_name: String,
    pub prompt: String,
    pub results: Vec<AnalysisResult>,
    pub credentials: DocumentCredentials,
}

/// One completed pipeline run.
#[derive(Debug)]
pub struct Session {
    pub id: u64,
    pub file_name: String,
    pub prompt: String,
    pub results: Vec<AnalysisResult>,
    pub created_at: DateTime<Utc>,
    credentials: DocumentCredentials,
    saved_document: RwLock<Option<String>>,
}

impl Session {
    /// Credentials needed to persist this session.
    pub fn credentials(&self) -> &DocumentCredentials {
        &self.credentials
    }

    /// Id of the last document this session was saved to, if any.
    pub fn saved_document(&self) -> Option<String> {
        self.saved_document
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    pub(crate) fn record_saved_document(&self, document_id: &str) {
        *self
            .saved_document
            .write()
            .unwrap_or_else(|e| e.into_inner()) = Some(document_id.to_string());
    }
}

/// Process-lifetime list of sessions, safe to share across request tasks.
#[derive(Debug, Default)]
pub struct SessionStore {
    sessions: RwLock<Vec<Arc<Session>>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a session and return its id (0-based, sequential, never reused).
    pub fn add(&self, new: NewSession) -> u64 {
        let mut sessions = self.sessions.write().unwrap_or_else(|e| e.into_inner());
        let id = sessions.len() as u64;
        sessions.push(Arc::new(Session {
            id,
            file_name: new.file_name,
            prompt: new.prompt,
            results: new.results,
            created_at: Utc::now(),
            credentials: new.credentials,
            saved_document: RwLock::new(None),
        }));
        debug!("Stored session {} ({} pages)", id, sessions[id as usize].results.len());
        id
    }

    pub fn get(&self, id: u64) -> Option<Arc<Session>> {
        let sessions = self.sessions.read().unwrap_or_else(|e| e.into_inner());
        usize::try_from(id).ok().and_then(|i| sessions.get(i).cloned())
    }

    /// All sessions in creation (= id) order.
    pub fn list(&self) -> Vec<Arc<Session>> {
        self.sessions
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    pub fn len(&self) -> usize {
        self.sessions.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
