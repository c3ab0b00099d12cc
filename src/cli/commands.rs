use clap::builder::BoolishValueParser;
use clap::{Parser, Subcommand};
use uuid::Uuid;

use crate::store::models::DocumentScope;

#[derive(Parser)]
#[command(name = "docchat", version, about = "Document-grounded chat", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Override the config file path globally
    #[arg(short, long, global = true, default_value = "config.yaml")]
    pub config: String,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the HTTP API
    Serve,

    /// Enter the interactive chat REPL
    Chat {
        /// Continue an existing session instead of starting a new one
        #[arg(short, long)]
        session: Option<Uuid>,
    },

    /// Manage chat sessions
    Session {
        #[command(subcommand)]
        action: SessionAction,
    },

    /// Manage knowledge base documents
    Doc {
        #[command(subcommand)]
        action: DocAction,
    },

    /// Show or change retrieval settings
    Settings {
        #[command(subcommand)]
        action: SettingsAction,
    },
}

#[derive(Subcommand)]
pub enum SessionAction {
    /// Create a new session
    Create,

    /// List all sessions, most recent first
    List,

    /// Print a session transcript
    Show { id: Uuid },

    /// Delete a session
    Delete { id: Uuid },
}

#[derive(Subcommand)]
pub enum DocAction {
    /// List the documents visible to the signed-in user
    List {
        /// Only `project` or `user` documents
        #[arg(short, long)]
        scope: Option<DocumentScope>,
    },

    /// Add a document
    Add {
        #[arg(short, long)]
        title: String,
        #[arg(short = 'b', long)]
        content: String,
        #[arg(short, long, default_value = "user")]
        scope: DocumentScope,
    },

    /// Delete a document
    Delete { id: Uuid },
}

#[derive(Subcommand)]
pub enum SettingsAction {
    Show,

    Set {
        /// Number of past messages sent with each question (0-20)
        #[arg(long)]
        history: Option<u32>,
        /// Include project documents (on/off)
        #[arg(long, value_parser = BoolishValueParser::new())]
        project: Option<bool>,
        /// Include private documents (on/off)
        #[arg(long, value_parser = BoolishValueParser::new())]
        user: Option<bool>,
    },
}
