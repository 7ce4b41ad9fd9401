use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;
use std::path::PathBuf;
use std::sync::Arc;

use crate::core::{AdminHooks, NonceStore};
use crate::settings::SettingsStore;
use crate::templates::Renderer;

#[derive(Clone)]
pub struct ApiState {
    pub db: SqlitePool,
    pub settings: SettingsStore,
    pub renderer: Arc<Renderer>,
    pub nonces: Arc<NonceStore>,
    pub hooks: Arc<AdminHooks>,
    pub config: Arc<AppConfig>,
}

#[derive(Clone)]
pub struct AppConfig {
    /// Directory the dist/ assets live under; install paths vary per site.
    pub install_root: PathBuf,
    pub template_dir: PathBuf,
    /// Base URL the install root is served under.
    pub public_url: String,
    pub theme_directory_uri: String,
    pub site_id: i64,
    pub site_name: String,
    pub default_refresh_interval: u32,
    pub nonce_ttl_hours: i64,
    pub database_url: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            install_root: PathBuf::from("."),
            template_dir: PathBuf::from("templates"),
            public_url: "http://localhost:8080".to_string(),
            theme_directory_uri: "http://localhost:8080/theme".to_string(),
            site_id: 1,
            site_name: "Force Refresh".to_string(),
            default_refresh_interval: 60,
            nonce_ttl_hours: 12,
            database_url: "sqlite:force-refresh.db?mode=rwc".to_string(),
        }
    }
}

impl ApiState {
    pub async fn new(config: AppConfig) -> anyhow::Result<Self> {
        // An in-memory database exists per connection; cap the pool so every
        // query sees the same one.
        let max_connections = if config.database_url.contains(":memory:") { 1 } else { 5 };
        let db = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect(&config.database_url)
            .await?;

        let settings = SettingsStore::new(db.clone());
        settings.bootstrap().await?;

        Ok(ApiState {
            db,
            settings,
            renderer: Arc::new(Renderer::new(config.theme_directory_uri.clone())),
            nonces: Arc::new(NonceStore::new(config.nonce_ttl_hours)),
            hooks: Arc::new(AdminHooks::default()),
            config: Arc::new(config),
        })
    }
}
