//! Request construction for grounded answers.
//!
//! The model only ever sees three things: a fixed rule set, the knowledge
//! section built from the enabled document scopes, and the most recent
//! slice of the conversation followed by the new query.

use tracing::debug;

use crate::llm::models::{GenerationRequest, Turn};
use crate::store::models::{Document, Message, Role, UserSettings};

pub const TEMPERATURE: f32 = 0.3;
pub const NOT_FOUND_ANSWER: &str = "The provided documents do not contain this information.";

const PROJECT_HEADER: &str = "--- PROJECT (GLOBAL) KNOWLEDGE BASE ---";
const USER_HEADER: &str = "--- USER (PRIVATE) KNOWLEDGE BASE ---";

fn push_block(out: &mut String, header: &str, docs: &[Document]) {
    out.push_str("\n\n");
    out.push_str(header);
    out.push('\n');
    for doc in docs {
        out.push_str(&format!(
            "Document: {}\nContent:\n{}\n---\n",
            doc.title, doc.content
        ));
    }
}

/// Labeled document blocks for every enabled, non-empty scope.
pub fn knowledge_section(
    project_docs: &[Document],
    user_docs: &[Document],
    settings: &UserSettings,
) -> String {
    let mut section = String::new();
    if settings.use_project_knowledge && !project_docs.is_empty() {
        push_block(&mut section, PROJECT_HEADER, project_docs);
    }
    if settings.use_user_knowledge && !user_docs.is_empty() {
        push_block(&mut section, USER_HEADER, user_docs);
    }
    section
}

pub fn system_instruction(knowledge: &str) -> String {
    format!(
        r#"
You are a secure, document-grounded AI assistant for the DocChat platform.
Your primary directive is to answer user questions STRICTLY based on the provided "PROJECT KNOWLEDGE BASE" and "USER KNOWLEDGE BASE".

RULES:
1. Answer ONLY from the retrieved documents provided in the context.
2. NEVER use general or prior knowledge to answer queries about facts not present in the documents.
3. NEVER hallucinate or invent information.
4. If the answer is not found in the provided documents, you MUST respond with exactly: "{NOT_FOUND_ANSWER}"
5. If the user asks a greeting or general conversational question (e.g., "Hi", "Help"), you may be polite but remind them you are restricted to the document context.

CONTEXT:
{knowledge}
"#
    )
}

/// The last `limit` messages of `history`, oldest first.
pub fn history_window(history: &[Message], limit: u32) -> Vec<Turn> {
    let keep = (limit as usize).min(history.len());
    history[history.len() - keep..]
        .iter()
        .map(|m| Turn {
            role: m.role,
            text: m.content.clone(),
        })
        .collect()
}

pub fn build_request(
    query: &str,
    history: &[Message],
    project_docs: &[Document],
    user_docs: &[Document],
    settings: &UserSettings,
) -> GenerationRequest {
    let knowledge = knowledge_section(project_docs, user_docs, settings);
    let mut turns = history_window(history, settings.context_history_limit);
    turns.push(Turn {
        role: Role::User,
        text: query.to_string(),
    });

    debug!(
        knowledge_bytes = knowledge.len(),
        turns = turns.len(),
        "Assembled grounded request"
    );

    GenerationRequest {
        system_instruction: system_instruction(&knowledge),
        turns,
        temperature: TEMPERATURE,
    }
}
