use actix_cors::Cors;
use actix_web::{middleware::Logger, web, App, HttpServer};
use std::sync::Arc;

mod config;
mod db;
mod handlers;
mod middleware;
mod models;
mod services;

use config::Config;
use services::llm::OpenAiCompatibleClient;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    // Initialize logger
    env_logger::init_from_env(env_logger::Env::default().default_filter_or("info"));

    let config = Config::from_env().map_err(std::io::Error::other)?;

    log::info!("Starting server at {}:{}", config.host, config.port);

    let pool = db::create_pool(&config).await.map_err(|e| {
        log::error!("Failed to open database: {}", e);
        std::io::Error::other(e)
    })?;

    log::info!("Database migrations completed");

    if config.llm_api_key.is_none() {
        log::warn!("LLM_API_KEY is not set; assistant requests may be rejected upstream");
    }
    let llm = OpenAiCompatibleClient::from_config(&config).map_err(|e| {
        log::error!("Failed to create LLM client: {:#}", e);
        std::io::Error::other(e.to_string())
    })?;

    let app_state = web::Data::new(models::AppState {
        db: pool,
        config: config.clone(),
        llm: Arc::new(llm),
    });

    let allowed_origins = config.cors_origins.clone();

    HttpServer::new(move || {
        let allowed_origins = allowed_origins.clone();
        let cors = Cors::default()
            .allowed_origin_fn(move |origin, _req_head| {
                let origin_str = origin.to_str().unwrap_or("");
                allowed_origins
                    .iter()
                    .any(|allowed| origin_str.starts_with(allowed))
            })
            .allowed_methods(vec!["GET", "POST", "PUT", "DELETE", "OPTIONS"])
            .allowed_headers(vec!["Authorization", "Content-Type"])
            .max_age(3600);

        App::new()
            .app_data(app_state.clone())
            .wrap(Logger::default())
            .wrap(cors)
            .configure(handlers::configure_routes)
    })
    .bind((config.host.as_str(), config.port))?
    .run()
    .await
}
