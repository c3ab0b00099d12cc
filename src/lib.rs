//! Document-grounded chat.
//!
//! Sessions and documents live in a [`store::ChatStore`]; every question is
//! answered by [`rag::send_message`], which builds a strictly grounded
//! request from the enabled knowledge scopes and the recent conversation.

pub mod api;
pub mod cli;
pub mod config;
pub mod llm;
pub mod rag;
pub mod store;
