//! Grounded answer generation and the send-message flow.

pub mod prompt;

use std::sync::MutexGuard;

use thiserror::Error;
use tracing::{error, info};
use uuid::Uuid;

use crate::llm::{LlmError, LlmProvider};
use crate::store::models::{Document, DocumentScope, Message, User, UserSettings};
use crate::store::{ChatStore, SharedStore, StoreError};

pub const EMPTY_REPLY: &str = "No response generated.";
pub const ENDPOINT_FAILURE_REPLY: &str =
    "Error connecting to AI service. Please check your API key or connection.";

#[derive(Debug, Error)]
pub enum ChatError {
    #[error("Missing Credential: {0}")]
    MissingCredential(String),
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// How a reply came about. Endpoint failures still produce reply text, so
/// this is the only place the underlying cause survives.
#[derive(Debug, Clone, PartialEq)]
pub enum ReplyOutcome {
    Generated,
    Empty,
    EndpointFailure(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Reply {
    pub text: String,
    pub outcome: ReplyOutcome,
}

/// Asks the model for an answer grounded in the given documents.
///
/// Only a missing credential is returned as an error. Every other endpoint
/// failure is logged and turned into [`ENDPOINT_FAILURE_REPLY`].
pub async fn generate_response(
    llm: &dyn LlmProvider,
    query: &str,
    history: &[Message],
    project_docs: &[Document],
    user_docs: &[Document],
    settings: &UserSettings,
) -> Result<Reply, ChatError> {
    let request = prompt::build_request(query, history, project_docs, user_docs, settings);

    match llm.generate(&request).await {
        Ok(response) => Ok(match response.text {
            Some(text) => Reply {
                text,
                outcome: ReplyOutcome::Generated,
            },
            None => Reply {
                text: EMPTY_REPLY.to_string(),
                outcome: ReplyOutcome::Empty,
            },
        }),
        Err(LlmError::MissingCredential(reason)) => Err(ChatError::MissingCredential(reason)),
        Err(e) => {
            error!(provider = llm.name(), error = %e, "Generation request failed");
            Ok(Reply {
                text: ENDPOINT_FAILURE_REPLY.to_string(),
                outcome: ReplyOutcome::EndpointFailure(e.to_string()),
            })
        }
    }
}

/// Result of one user turn.
#[derive(Debug, Clone)]
pub struct Exchange {
    pub user_message: Message,
    /// `None` when the session was deleted while the model was answering.
    pub model_message: Option<Message>,
    pub outcome: ReplyOutcome,
}

fn lock_store(store: &SharedStore) -> Result<MutexGuard<'_, ChatStore>, ChatError> {
    store
        .lock()
        .map_err(|_| ChatError::Store(StoreError::Storage("store lock poisoned".to_string())))
}

/// Records `text` in `session_id`, asks the model and records its reply in
/// the same session.
///
/// The store lock is released while the request is in flight. The reply is
/// bound to `session_id`, never to whichever session is active by then.
pub async fn send_message(
    store: &SharedStore,
    llm: &dyn LlmProvider,
    user: &User,
    session_id: Uuid,
    text: &str,
) -> Result<Exchange, ChatError> {
    let (user_message, history, project_docs, user_docs, settings) = {
        let mut store = lock_store(store)?;
        let session = store.append_user_message(session_id, text)?;
        let Some((user_message, prior)) = session.messages.split_last() else {
            return Err(ChatError::Store(StoreError::InvalidSession(session_id)));
        };
        let visible = store.documents_for(user);
        let (project_docs, user_docs): (Vec<Document>, Vec<Document>) = visible
            .into_iter()
            .partition(|d| d.scope == DocumentScope::Project);
        (
            user_message.clone(),
            prior.to_vec(),
            project_docs,
            user_docs,
            store.settings(),
        )
    };

    let reply = generate_response(llm, text, &history, &project_docs, &user_docs, &settings).await?;

    let model_message = {
        let mut store = lock_store(store)?;
        store.append_model_message(session_id, &reply.text)?
    };
    if model_message.is_some() {
        info!("Answered in session {}", session_id);
    }

    Ok(Exchange {
        user_message,
        model_message,
        outcome: reply.outcome,
    })
}
