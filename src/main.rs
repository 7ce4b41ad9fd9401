use actix_web::{middleware, web, App, HttpServer};
use anyhow::Result;
use force_refresh::api::state::AppConfig;
use force_refresh::{configure_routes, ApiState};
use std::env;
use std::path::PathBuf;
use tracing_actix_web::TracingLogger;
use tracing_subscriber::EnvFilter;

#[actix_web::main]
async fn main() -> Result<()> {
    // Load environment variables
    dotenv::dotenv().ok();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info"))
        )
        .init();

    tracing::info!("Starting Force Refresh admin service");

    // Load configuration
    let config = load_config();

    // Initialize application state
    let state = web::Data::new(ApiState::new(config).await?);

    // Get server settings
    let host = env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
    let port = env::var("PORT")
        .unwrap_or_else(|_| "8080".to_string())
        .parse::<u16>()?;

    tracing::info!("Starting server on {}:{}", host, port);

    // Start HTTP server
    HttpServer::new(move || {
        App::new()
            .app_data(state.clone())
            .wrap(TracingLogger::default())
            .wrap(middleware::NormalizePath::trim())
            .configure(configure_routes)
    })
    .bind((host.as_str(), port))?
    .run()
    .await?;

    Ok(())
}

fn load_config() -> AppConfig {
    let defaults = AppConfig::default();
    AppConfig {
        install_root: env::var("INSTALL_ROOT")
            .map(PathBuf::from)
            .unwrap_or(defaults.install_root),
        template_dir: env::var("TEMPLATE_DIR")
            .map(PathBuf::from)
            .unwrap_or(defaults.template_dir),
        public_url: env::var("PUBLIC_URL").unwrap_or(defaults.public_url),
        theme_directory_uri: env::var("THEME_DIRECTORY_URI")
            .unwrap_or(defaults.theme_directory_uri),
        site_id: env::var("SITE_ID")
            .ok()
            .and_then(|value| value.parse().ok())
            .unwrap_or(defaults.site_id),
        site_name: env::var("SITE_NAME").unwrap_or(defaults.site_name),
        default_refresh_interval: env::var("DEFAULT_REFRESH_INTERVAL")
            .ok()
            .and_then(|value| value.parse().ok())
            .unwrap_or(defaults.default_refresh_interval),
        nonce_ttl_hours: env::var("NONCE_TTL_HOURS")
            .ok()
            .and_then(|value| value.parse().ok())
            .unwrap_or(defaults.nonce_ttl_hours),
        database_url: env::var("DATABASE_URL").unwrap_or(defaults.database_url),
    }
}
