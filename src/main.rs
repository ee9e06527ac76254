mod api;
mod config;
mod database;
mod middleware;
mod models;
mod services;
mod utils;

use actix_cors::Cors;
use actix_web::{middleware::Logger, web, App, HttpServer};
use dotenv::dotenv;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::{config::Settings, services::geocoder_service::Geocoder};

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // Load environment variables
    dotenv().ok();

    // Initialize logger
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    let settings = match Settings::from_env() {
        Ok(settings) => settings,
        Err(e) => {
            log::error!("💥 Invalid configuration: {}", e);
            std::process::exit(1);
        }
    };

    log::info!("🚀 Starting DevCamper API ({})...", settings.app_env);

    let db = match database::MongoDB::new(&settings.database_url).await {
        Ok(db) => db,
        Err(e) => {
            log::error!("💥 Failed to connect to MongoDB: {}", e);
            std::process::exit(1);
        }
    };
    log::info!("✅ MongoDB connected successfully");

    if let Err(e) = tokio::fs::create_dir_all(&settings.file_upload_path).await {
        log::warn!("⚠️  Upload directory {} unavailable: {}", settings.file_upload_path.display(), e);
    }
    if settings.geocoder_api_key.is_empty() {
        log::warn!("⚠️  GEOCODER_API_KEY not set, address geocoding and radius search will fail");
    }

    let host = settings.host.clone();
    let port = settings.port;

    let db_data = web::Data::new(db);
    let geocoder = match Geocoder::new(&settings) {
        Ok(geocoder) => geocoder,
        Err(e) => {
            log::error!("💥 Failed to build geocoder HTTP client: {}", e);
            std::process::exit(1);
        }
    };
    let geocoder_data = web::Data::new(geocoder);
    let settings_data = web::Data::new(settings);

    log::info!("🌐 Server starting on {}:{}", host, port);
    log::info!("📚 Swagger UI available at: http://{}:{}/swagger-ui/", host, port);
    log::info!("📄 OpenAPI spec at: http://{}:{}/api-docs/openapi.json", host, port);

    let server = HttpServer::new(move || {
        let cors = if settings_data.cors_origins.is_empty() {
            Cors::permissive()
        } else {
            settings_data
                .cors_origins
                .iter()
                .fold(Cors::default(), |cors, origin| cors.allowed_origin(origin))
                .allowed_methods(vec!["GET", "POST", "PUT", "DELETE", "OPTIONS"])
                .allowed_headers(vec![
                    actix_web::http::header::AUTHORIZATION,
                    actix_web::http::header::CONTENT_TYPE,
                    actix_web::http::header::ACCEPT,
                ])
                .supports_credentials()
                .max_age(3600)
        };

        // Generate OpenAPI specification
        let openapi = api::swagger::ApiDoc::openapi();

        App::new()
            .app_data(db_data.clone())
            .app_data(settings_data.clone())
            .app_data(geocoder_data.clone())
            .wrap(cors)
            .wrap(middleware::SecurityHeaders)
            .wrap(Logger::default())
            .service(
                SwaggerUi::new("/swagger-ui/{_:.*}")
                    .url("/api-docs/openapi.json", openapi)
            )
            .configure(api::configure)
    })
    .bind((host.as_str(), port))?
    .run();

    if let Err(e) = server.await {
        log::error!("💥 Server stopped with error: {}", e);
        std::process::exit(1);
    }

    log::info!("👋 Server shut down");
    Ok(())
}
