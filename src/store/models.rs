use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const NEW_SESSION_TITLE: &str = "New Conversation";
pub const TITLE_MAX_CHARS: usize = 30;
pub const MAX_CONTEXT_HISTORY: u32 = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Model,
    System,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Model => "model",
            Role::System => "system",
        }
    }
}

/// Visibility class of a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentScope {
    /// Shared by everyone, editable by admins only.
    Project,
    /// Private to the user who created it.
    User,
}

impl DocumentScope {
    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentScope::Project => "project",
            DocumentScope::User => "user",
        }
    }
}

impl std::str::FromStr for DocumentScope {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "project" => Ok(DocumentScope::Project),
            "user" => Ok(DocumentScope::User),
            other => Err(format!("unknown document scope '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: Uuid,
    pub title: String,
    pub content: String,
    pub scope: DocumentScope,
    /// Set for user-scope documents; project documents have no owner.
    #[serde(default)]
    pub owner_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Document {
    pub fn visible_to(&self, user: &User) -> bool {
        match self.scope {
            DocumentScope::Project => true,
            DocumentScope::User => self.owner_id.as_deref() == Some(user.id.as_str()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: Uuid,
    pub role: Role,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

impl Message {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            role,
            content: content.into(),
            timestamp: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatSession {
    pub id: Uuid,
    pub title: String,
    pub messages: Vec<Message>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ChatSession {
    pub fn new() -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            title: NEW_SESSION_TITLE.to_string(),
            messages: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }
}

impl Default for ChatSession {
    fn default() -> Self {
        Self::new()
    }
}

/// Session title derived from the first user message.
///
/// Counts characters, not bytes, so multi-byte text is never split.
pub fn derive_title(text: &str) -> String {
    if text.chars().count() <= TITLE_MAX_CHARS {
        text.to_string()
    } else {
        let head: String = text.chars().take(TITLE_MAX_CHARS).collect();
        format!("{}...", head)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserSettings {
    pub context_history_limit: u32,
    pub use_project_knowledge: bool,
    pub use_user_knowledge: bool,
}

impl Default for UserSettings {
    fn default() -> Self {
        Self {
            context_history_limit: 6,
            use_project_knowledge: true,
            use_user_knowledge: true,
        }
    }
}

impl UserSettings {
    pub fn clamped(mut self) -> Self {
        self.context_history_limit = self.context_history_limit.min(MAX_CONTEXT_HISTORY);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub email: String,
    pub name: String,
    pub avatar_url: String,
    pub is_admin: bool,
}
