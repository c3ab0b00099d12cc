pub mod commands;

use std::io::{self, Write};
use std::sync::Arc;

use thiserror::Error;
use uuid::Uuid;

use crate::cli::commands::{Commands, DocAction, SessionAction, SettingsAction};
use crate::config::AppConfig;
use crate::llm::{LlmProvider, ProviderFactory};
use crate::rag::{self, ChatError, ReplyOutcome};
use crate::store::models::{ChatSession, User};
use crate::store::{get_connection, ChatStore, DuckDbBlobStore, SharedStore, StoreError};

#[derive(Debug, Error)]
pub enum CliError {
    #[error("Config Error: {0}")]
    Config(#[from] ::config::ConfigError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Chat(#[from] ChatError),
    #[error("IO Error: {0}")]
    Io(#[from] io::Error),
    #[error("Unknown LLM provider '{0}'")]
    UnknownProvider(String),
}

/// Opens the DuckDB-backed store named in the config.
pub fn open_store(config: &AppConfig) -> Result<SharedStore, StoreError> {
    let pool = get_connection(&config.storage)?;
    let store = ChatStore::open(Box::new(DuckDbBlobStore::new(pool)), config.chat.settings())?;
    Ok(store.into_shared())
}

fn lock(store: &SharedStore) -> Result<std::sync::MutexGuard<'_, ChatStore>, StoreError> {
    store
        .lock()
        .map_err(|_| StoreError::Storage("store lock poisoned".to_string()))
}

pub async fn run_cli(command: Commands, config_path: String) -> Result<(), CliError> {
    let config = AppConfig::load(&config_path)?;
    let store = open_store(&config)?;
    let user = config.user.user();

    match command {
        Commands::Serve => {
            unreachable!("Serve command should be intercepted by main.rs to boot actix-web");
        }
        Commands::Session { action } => run_session(&store, action)?,
        Commands::Doc { action } => run_doc(&store, &user, action)?,
        Commands::Settings { action } => run_settings(&store, action)?,
        Commands::Chat { session } => {
            let llm = ProviderFactory::create_default(&config)
                .ok_or_else(|| CliError::UnknownProvider(config.llm.provider.clone()))?;
            run_repl(&store, llm, &user, session).await?;
        }
    }
    Ok(())
}

fn print_sessions(sessions: &[ChatSession]) {
    if sessions.is_empty() {
        println!("No sessions found.");
        return;
    }
    println!("{:<38} | {:<20} | {}", "ID", "Updated At", "Title");
    println!("{:-<38}-+-{:-<20}-+-{:-<20}", "", "", "");
    for s in sessions {
        println!(
            "{:<38} | {:<20} | {}",
            s.id.to_string(),
            s.updated_at.format("%Y-%m-%d %H:%M:%S"),
            s.title
        );
    }
}

fn print_transcript(session: &ChatSession) {
    println!("Session: {}", session.title);
    println!("ID: {}", session.id);
    println!("Created At: {}", session.created_at);
    println!("---");
    for m in &session.messages {
        println!("[{}]: {}", m.role.as_str().to_uppercase(), m.content);
        println!("---");
    }
}

fn run_session(store: &SharedStore, action: SessionAction) -> Result<(), CliError> {
    let mut store = lock(store)?;

    match action {
        SessionAction::Create => {
            let session = store.create_session()?;
            println!("Created Session: {} ({})", session.title, session.id);
        }
        SessionAction::List => print_sessions(store.sessions()),
        SessionAction::Show { id } => match store.session(id) {
            Some(session) => print_transcript(session),
            None => eprintln!("Session {} not found.", id),
        },
        SessionAction::Delete { id } => {
            if store.delete_session(id)? {
                println!("Deleted session {}", id);
            } else {
                println!("Session {} not found, nothing deleted.", id);
            }
        }
    }
    Ok(())
}

fn run_doc(store: &SharedStore, user: &User, action: DocAction) -> Result<(), CliError> {
    let mut store = lock(store)?;

    match action {
        DocAction::List { scope } => {
            let documents: Vec<_> = store
                .documents_for(user)
                .into_iter()
                .filter(|d| scope.map_or(true, |s| d.scope == s))
                .collect();
            if documents.is_empty() {
                println!("No documents found.");
            }
            for d in documents {
                println!("{} [{}] {}", d.id, d.scope.as_str(), d.title);
                println!("    {}", d.content);
            }
        }
        DocAction::Add {
            title,
            content,
            scope,
        } => {
            let document = store.add_document(user, &title, &content, scope)?;
            println!("Added {} document {} ({})", scope.as_str(), document.title, document.id);
        }
        DocAction::Delete { id } => match store.delete_document(user, id)? {
            Some(d) => println!("Deleted document {}", d.title),
            None => println!("Document {} not found, nothing deleted.", id),
        },
    }
    Ok(())
}

fn run_settings(store: &SharedStore, action: SettingsAction) -> Result<(), CliError> {
    let mut store = lock(store)?;

    let settings = match action {
        SettingsAction::Show => store.settings(),
        SettingsAction::Set {
            history,
            project,
            user,
        } => {
            let mut settings = store.settings();
            if let Some(limit) = history {
                settings.context_history_limit = limit;
            }
            if let Some(on) = project {
                settings.use_project_knowledge = on;
            }
            if let Some(on) = user {
                settings.use_user_knowledge = on;
            }
            store.update_settings(settings)?
        }
    };

    println!("Context history limit: {}", settings.context_history_limit);
    println!("Project knowledge:     {}", on_off(settings.use_project_knowledge));
    println!("Private knowledge:     {}", on_off(settings.use_user_knowledge));
    Ok(())
}

fn on_off(flag: bool) -> &'static str {
    if flag {
        "on"
    } else {
        "off"
    }
}

async fn run_repl(
    store: &SharedStore,
    llm: Arc<dyn LlmProvider>,
    user: &User,
    session: Option<Uuid>,
) -> Result<(), CliError> {
    let mut session_id = {
        let mut store = lock(store)?;
        match session {
            Some(id) => store.select_session(id)?.id,
            None => store.create_session()?.id,
        }
    };

    println!("--- DocChat Terminal ---");
    println!("Signed in as {} <{}>", user.name, user.email);
    println!("Connected to Session: {}", session_id);
    println!("Commands: /new /sessions /select <id> /delete <id> /docs /settings /exit");
    println!("------------------------");

    let stdin = io::stdin();
    loop {
        print!("\nUser> ");
        io::stdout().flush()?;

        let mut input = String::new();
        if stdin.read_line(&mut input)? == 0 {
            break;
        }
        let text = input.trim();

        if text.is_empty() {
            continue;
        }
        if text == "/exit" || text == "/quit" {
            break;
        }

        if let Some(command) = text.strip_prefix('/') {
            let mut parts = command.splitn(2, ' ');
            let name = parts.next().unwrap_or_default();
            let arg = parts.next().map(str::trim);
            let mut store = lock(store)?;

            match (name, arg) {
                ("new", _) => {
                    session_id = store.create_session()?.id;
                    println!("Switched to new session {}", session_id);
                }
                ("sessions", _) => print_sessions(store.sessions()),
                ("select", Some(raw)) => match raw.parse::<Uuid>() {
                    Ok(id) => match store.select_session(id) {
                        Ok(session) => {
                            session_id = session.id;
                            print_transcript(session);
                        }
                        Err(e) => eprintln!("{}", e),
                    },
                    Err(_) => eprintln!("'{}' is not a session id", raw),
                },
                ("delete", Some(raw)) => match raw.parse::<Uuid>() {
                    Ok(id) => {
                        store.delete_session(id)?;
                        println!("Deleted session {}", id);
                        if id == session_id {
                            session_id = store.create_session()?.id;
                            println!("Switched to new session {}", session_id);
                        }
                    }
                    Err(_) => eprintln!("'{}' is not a session id", raw),
                },
                ("docs", _) => {
                    for d in store.documents_for(user) {
                        println!("{} [{}] {}", d.id, d.scope.as_str(), d.title);
                    }
                }
                ("settings", _) => {
                    let s = store.settings();
                    println!(
                        "history={} project={} user={}",
                        s.context_history_limit,
                        on_off(s.use_project_knowledge),
                        on_off(s.use_user_knowledge)
                    );
                }
                _ => eprintln!("Unknown command /{}", command),
            }
            continue;
        }

        match rag::send_message(store, llm.as_ref(), user, session_id, text).await {
            Ok(exchange) => {
                if let Some(reply) = exchange.model_message {
                    println!("DocChat> {}", reply.content);
                }
                if let ReplyOutcome::EndpointFailure(cause) = exchange.outcome {
                    eprintln!("(provider error: {})", cause);
                }
            }
            Err(ChatError::MissingCredential(reason)) => {
                eprintln!("{}", reason);
                break;
            }
            Err(e) => eprintln!("Error: {}", e),
        }
    }
    Ok(())
}
