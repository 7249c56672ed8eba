use actix_web::{web, App, HttpResponse, HttpServer, Responder};
use clap::Parser;
use std::sync::Arc;
use talaria::api::middleware::RequireAuth;
use talaria::api::routes;
use talaria::chat::dispatch::ChatService;
use talaria::cli::{
    commands::{Cli, Commands},
    run_cli,
};
use talaria::config::AppConfig;
use talaria::genai::{gemini::GeminiClient, GenerativeModel};
use talaria::store::supabase::SupabaseStore;
use talaria::store::{BlobStore, RecordStore, TokenVerifier};
use tracing::{error, info};

async fn health() -> impl Responder {
    HttpResponse::Ok().json(serde_json::json!({"status": "healthy"}))
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    if !matches!(cli.command, Commands::Serve) {
        run_cli(cli.command, cli.config).await;
        return Ok(());
    }

    info!("Starting Talaria chat relay...");

    let config = match AppConfig::load(&cli.config) {
        Ok(c) => c,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    let gemini: Arc<dyn GenerativeModel> = Arc::new(GeminiClient::from_config(&config.gemini));
    let store = Arc::new(SupabaseStore::new(&config.supabase));
    let records: Arc<dyn RecordStore> = store.clone();
    let blobs: Arc<dyn BlobStore> = store.clone();
    let verifier: Arc<dyn TokenVerifier> = store;

    let chat_service = ChatService::new(
        gemini.clone(),
        records.clone(),
        blobs.clone(),
        config.gemini.default_model.clone(),
        config.chat.max_history_messages as usize,
    );

    let host = config.server.host.clone();
    let port = config.server.port;
    info!("Listening on {}:{}", host, port);

    let config_data = web::Data::new(config);
    let chat_data = web::Data::new(chat_service);
    let gemini_data = web::Data::new(gemini);
    let records_data = web::Data::new(records);
    let blobs_data = web::Data::new(blobs);
    let verifier_data = web::Data::new(verifier);

    HttpServer::new(move || {
        App::new()
            .app_data(config_data.clone())
            .app_data(chat_data.clone())
            .app_data(gemini_data.clone())
            .app_data(records_data.clone())
            .app_data(blobs_data.clone())
            .app_data(verifier_data.clone())
            .wrap(RequireAuth)
            .route("/health", web::get().to(health))
            .configure(routes::configure)
    })
    .bind((host, port))?
    .run()
    .await
}
