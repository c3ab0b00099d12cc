use actix_web::{web, App, HttpResponse, HttpServer, Responder};
use clap::Parser;
use docchat::api::middleware::{LoginState, RequireLogin};
use docchat::cli::{
    commands::{Cli, Commands},
    open_store, run_cli,
};
use docchat::config::AppConfig;
use docchat::llm::ProviderFactory;
use tracing::{error, info};

async fn health() -> impl Responder {
    HttpResponse::Ok().json(serde_json::json!({"status": "healthy"}))
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    if !matches!(cli.command, Commands::Serve) {
        if let Err(e) = run_cli(cli.command, cli.config).await {
            error!("{}", e);
            std::process::exit(1);
        }
        return Ok(());
    }

    info!("Starting DocChat server...");

    let config = match AppConfig::load(&cli.config) {
        Ok(c) => c,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    let store = match open_store(&config) {
        Ok(store) => store,
        Err(e) => {
            error!("Failed to open store: {}", e);
            std::process::exit(1);
        }
    };

    let llm_provider = match ProviderFactory::create_default(&config) {
        Some(p) => p,
        None => {
            error!("Unknown LLM provider '{}' in configuration", config.llm.provider);
            std::process::exit(1);
        }
    };

    let login = web::Data::new(LoginState::new(config.user.user()));
    let store = web::Data::new(store);
    let llm_provider = web::Data::new(llm_provider);

    let host = config.server.host.clone();
    let port = config.server.port;

    info!("Server listening on {}:{}", host, port);

    HttpServer::new(move || {
        App::new()
            .app_data(login.clone())
            .app_data(store.clone())
            .app_data(llm_provider.clone())
            .route("/health", web::get().to(health))
            .wrap(RequireLogin)
            .configure(docchat::api::routes::configure)
    })
    .bind((host, port))?
    .run()
    .await
}
