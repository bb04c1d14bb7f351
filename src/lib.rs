use std::sync::{Arc, RwLock};

use axum::{
    routing::{get, post},
    Extension, Router,
};
use sqlx::AnyConnection;
use tokio::sync::Mutex;
use tower_http::trace::TraceLayer;

pub mod annotate;
pub mod config;
mod controllers;
pub mod db;
pub mod plays;
pub mod templates;

use config::AppConfig;
use plays::PlaysClient;

pub struct AppContext {
    pub config: AppConfig,
    pub db_connection: Mutex<AnyConnection>,
    pub templates: RwLock<tera::Tera>,
    pub plays_client: PlaysClient,
}

impl AppContext {
    /// Opens the database and loads the templates described by the configuration.
    pub async fn new(config: AppConfig) -> anyhow::Result<Self> {
        let db_connection = db::open(&config.database_url).await?;
        let templates = templates::load(&config.templates_dir)?;
        let plays_client = PlaysClient::from_config(&config)?;
        Ok(Self {
            config,
            db_connection: Mutex::new(db_connection),
            templates: RwLock::new(templates),
            plays_client,
        })
    }
}

pub fn app(ctx: Arc<AppContext>) -> Router {
    Router::new()
        .route("/", get(controllers::public::now_playing))
        .route("/:play_id/add", post(controllers::public::add_comment))
        .route("/static/*path", get(controllers::r#static::get))
        .layer(Extension(ctx))
        .layer(TraceLayer::new_for_http())
}
