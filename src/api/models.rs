use serde::{Deserialize, Serialize};

use crate::rag::{Exchange, ReplyOutcome};
use crate::store::models::{DocumentScope, Message, UserSettings};

#[derive(Debug, Deserialize)]
pub struct SendMessageRequest {
    pub content: String,
}

#[derive(Debug, Serialize)]
pub struct SendMessageResponse {
    pub user_message: Message,
    pub model_message: Option<Message>,
    /// `generated`, `empty` or `endpoint_failure`.
    pub outcome: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure: Option<String>,
}

impl From<Exchange> for SendMessageResponse {
    fn from(exchange: Exchange) -> Self {
        let (outcome, failure) = match exchange.outcome {
            ReplyOutcome::Generated => ("generated", None),
            ReplyOutcome::Empty => ("empty", None),
            ReplyOutcome::EndpointFailure(cause) => ("endpoint_failure", Some(cause)),
        };
        Self {
            user_message: exchange.user_message,
            model_message: exchange.model_message,
            outcome,
            failure,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateDocumentRequest {
    pub title: String,
    pub content: String,
    pub scope: DocumentScope,
}

#[derive(Debug, Deserialize)]
pub struct DocumentQuery {
    pub scope: Option<DocumentScope>,
}

/// Partial settings update; omitted fields keep their value.
#[derive(Debug, Deserialize)]
pub struct UpdateSettingsRequest {
    pub context_history_limit: Option<u32>,
    pub use_project_knowledge: Option<bool>,
    pub use_user_knowledge: Option<bool>,
}

impl UpdateSettingsRequest {
    pub fn apply(&self, mut settings: UserSettings) -> UserSettings {
        if let Some(limit) = self.context_history_limit {
            settings.context_history_limit = limit;
        }
        if let Some(on) = self.use_project_knowledge {
            settings.use_project_knowledge = on;
        }
        if let Some(on) = self.use_user_knowledge {
            settings.use_user_knowledge = on;
        }
        settings
    }
}
