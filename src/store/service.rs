use std::sync::{Arc, Mutex};

use chrono::Utc;
use tracing::{info, warn};
use uuid::Uuid;

use super::blob::BlobStore;
use super::models::{
    derive_title, ChatSession, Document, DocumentScope, Message, Role, User, UserSettings,
};
use super::StoreError;

pub const SESSIONS_KEY: &str = "docchat_sessions";
pub const DOCUMENTS_KEY: &str = "docchat_documents";
pub const SETTINGS_KEY: &str = "docchat_settings";

/// Store handle shared between the HTTP workers, the REPL and the send flow.
pub type SharedStore = Arc<Mutex<ChatStore>>;

/// Every mutation writes through [`ChatStore::flush`]; when that write fails
/// the in-memory change is undone before the error is returned.
pub struct ChatStore {
    blobs: Box<dyn BlobStore>,
    sessions: Vec<ChatSession>,
    documents: Vec<Document>,
    settings: UserSettings,
    active_session: Option<Uuid>,
}

impl ChatStore {
    /// Builds a store over `blobs` and loads whatever it already holds.
    pub fn open(blobs: Box<dyn BlobStore>, settings: UserSettings) -> Result<Self, StoreError> {
        let mut store = Self {
            blobs,
            sessions: Vec::new(),
            documents: seed_documents(),
            settings: settings.clamped(),
            active_session: None,
        };
        store.restore()?;
        Ok(store)
    }

    pub fn into_shared(self) -> SharedStore {
        Arc::new(Mutex::new(self))
    }

    // --- Persistence ---

    /// Reloads sessions, documents and settings. Absent slots keep the
    /// current values (seed documents, empty sessions, configured settings).
    pub fn restore(&mut self) -> Result<(), StoreError> {
        if let Some(raw) = self.blobs.read(SESSIONS_KEY)? {
            self.sessions = serde_json::from_str(&raw)?;
        }
        if let Some(raw) = self.blobs.read(DOCUMENTS_KEY)? {
            self.documents = serde_json::from_str(&raw)?;
        }
        if let Some(raw) = self.blobs.read(SETTINGS_KEY)? {
            let settings: UserSettings = serde_json::from_str(&raw)?;
            self.settings = settings.clamped();
        }
        if let Some(id) = self.active_session {
            if self.session(id).is_none() {
                self.active_session = None;
            }
        }
        Ok(())
    }

    pub fn flush(&self) -> Result<(), StoreError> {
        self.blobs
            .write(SESSIONS_KEY, &serde_json::to_string(&self.sessions)?)?;
        self.blobs
            .write(DOCUMENTS_KEY, &serde_json::to_string(&self.documents)?)?;
        self.blobs
            .write(SETTINGS_KEY, &serde_json::to_string(&self.settings)?)?;
        Ok(())
    }

    // --- Session Operations ---

    /// Most recently created first.
    pub fn sessions(&self) -> &[ChatSession] {
        &self.sessions
    }

    pub fn session(&self, id: Uuid) -> Option<&ChatSession> {
        self.sessions.iter().find(|s| s.id == id)
    }

    pub fn active_session(&self) -> Option<&ChatSession> {
        self.active_session.and_then(|id| self.session(id))
    }

    pub fn clear_active_session(&mut self) {
        self.active_session = None;
    }

    pub fn create_session(&mut self) -> Result<ChatSession, StoreError> {
        let session = ChatSession::new();
        let previous_active = self.active_session;
        self.sessions.insert(0, session.clone());
        self.active_session = Some(session.id);
        if let Err(e) = self.flush() {
            self.sessions.remove(0);
            self.active_session = previous_active;
            return Err(e);
        }

        info!("Created session {}", session.id);
        Ok(session)
    }

    pub fn select_session(&mut self, id: Uuid) -> Result<&ChatSession, StoreError> {
        let index = self.session_index(id).ok_or(StoreError::InvalidSession(id))?;
        self.active_session = Some(id);
        Ok(&self.sessions[index])
    }

    /// Returns whether a session was removed; unknown ids are a no-op.
    pub fn delete_session(&mut self, id: Uuid) -> Result<bool, StoreError> {
        let previous_active = self.active_session;
        if self.active_session == Some(id) {
            self.active_session = None;
        }
        let Some(index) = self.session_index(id) else {
            return Ok(false);
        };
        let removed = self.sessions.remove(index);
        if let Err(e) = self.flush() {
            self.sessions.insert(index, removed);
            self.active_session = previous_active;
            return Err(e);
        }

        info!("Deleted session {}", id);
        Ok(true)
    }

    pub fn append_user_message(
        &mut self,
        session_id: Uuid,
        text: &str,
    ) -> Result<ChatSession, StoreError> {
        let index = self
            .session_index(session_id)
            .ok_or(StoreError::InvalidSession(session_id))?;
        if text.trim().is_empty() {
            return Err(StoreError::Validation("message text is empty".to_string()));
        }

        let session = &mut self.sessions[index];
        let previous = (session.title.clone(), session.updated_at);
        if session.messages.is_empty() {
            session.title = derive_title(text);
        }
        session.messages.push(Message::new(Role::User, text));
        session.updated_at = Utc::now();
        let updated = session.clone();

        if let Err(e) = self.flush() {
            let session = &mut self.sessions[index];
            session.messages.pop();
            (session.title, session.updated_at) = previous;
            return Err(e);
        }
        Ok(updated)
    }

    /// Appends a model reply. A session that no longer exists swallows the
    /// reply and yields `Ok(None)`.
    pub fn append_model_message(
        &mut self,
        session_id: Uuid,
        text: &str,
    ) -> Result<Option<Message>, StoreError> {
        let Some(index) = self.session_index(session_id) else {
            warn!("Dropping model reply for missing session {}", session_id);
            return Ok(None);
        };

        let message = Message::new(Role::Model, text);
        let session = &mut self.sessions[index];
        let previous_updated = session.updated_at;
        session.messages.push(message.clone());
        session.updated_at = Utc::now();

        if let Err(e) = self.flush() {
            let session = &mut self.sessions[index];
            session.messages.pop();
            session.updated_at = previous_updated;
            return Err(e);
        }
        Ok(Some(message))
    }

    fn session_index(&self, id: Uuid) -> Option<usize> {
        self.sessions.iter().position(|s| s.id == id)
    }

    // --- Document Operations ---

    /// Every document in insertion order, regardless of owner.
    pub fn documents(&self) -> &[Document] {
        &self.documents
    }

    /// Project documents plus the private documents owned by `user`.
    pub fn documents_for(&self, user: &User) -> Vec<Document> {
        self.documents
            .iter()
            .filter(|d| d.visible_to(user))
            .cloned()
            .collect()
    }

    pub fn add_document(
        &mut self,
        user: &User,
        title: &str,
        content: &str,
        scope: DocumentScope,
    ) -> Result<Document, StoreError> {
        if title.trim().is_empty() || content.trim().is_empty() {
            return Err(StoreError::Validation(
                "document title and content must not be empty".to_string(),
            ));
        }
        if scope == DocumentScope::Project && !user.is_admin {
            warn!("User {} tried to add a project document", user.id);
            return Err(StoreError::PermissionDenied(
                "only admins can add project documents".to_string(),
            ));
        }

        let document = Document {
            id: Uuid::new_v4(),
            title: title.to_string(),
            content: content.to_string(),
            scope,
            owner_id: match scope {
                DocumentScope::Project => None,
                DocumentScope::User => Some(user.id.clone()),
            },
            created_at: Utc::now(),
        };
        self.documents.push(document.clone());
        if let Err(e) = self.flush() {
            self.documents.pop();
            return Err(e);
        }

        info!("Added {} document {}", scope.as_str(), document.id);
        Ok(document)
    }

    /// Returns the removed document; unknown ids are a no-op.
    pub fn delete_document(&mut self, user: &User, id: Uuid) -> Result<Option<Document>, StoreError> {
        let Some(index) = self.documents.iter().position(|d| d.id == id) else {
            return Ok(None);
        };

        let allowed = match self.documents[index].scope {
            DocumentScope::Project => user.is_admin,
            DocumentScope::User => self.documents[index].owner_id.as_deref() == Some(user.id.as_str()),
        };
        if !allowed {
            warn!("User {} may not delete document {}", user.id, id);
            return Err(StoreError::PermissionDenied(format!(
                "document {} is not editable by {}",
                id, user.id
            )));
        }

        let removed = self.documents.remove(index);
        if let Err(e) = self.flush() {
            self.documents.insert(index, removed);
            return Err(e);
        }

        info!("Deleted document {}", id);
        Ok(Some(removed))
    }

    // --- Settings ---

    pub fn settings(&self) -> UserSettings {
        self.settings
    }

    pub fn update_settings(&mut self, settings: UserSettings) -> Result<UserSettings, StoreError> {
        let previous = self.settings;
        self.settings = settings.clamped();
        if let Err(e) = self.flush() {
            self.settings = previous;
            return Err(e);
        }
        Ok(self.settings)
    }
}

fn seed_documents() -> Vec<Document> {
    let now = Utc::now();
    vec![
        Document {
            id: Uuid::new_v4(),
            title: "Company Remote Work Policy".to_string(),
            content: "Employees are allowed to work remotely up to 3 days a week. Core hours are 10 AM to 3 PM EST. All remote work must be approved by the department manager.".to_string(),
            scope: DocumentScope::Project,
            owner_id: None,
            created_at: now,
        },
        Document {
            id: Uuid::new_v4(),
            title: "Security Protocols 2024".to_string(),
            content: "All passwords must be at least 16 characters long. Multi-factor authentication (MFA) is mandatory for all internal systems. Data classification Levels: Public, Internal, Confidential, Restricted.".to_string(),
            scope: DocumentScope::Project,
            owner_id: None,
            created_at: now,
        },
    ]
}
