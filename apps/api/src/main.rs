mod config;
mod db;
mod errors;
mod jobs;
mod llm_client;
mod models;
mod operations;
mod persistence;
mod prompt;
mod routes;
mod schema;
mod state;

use anyhow::Result;
use aws_config::Region;
use aws_sdk_s3::config::Credentials;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;
use crate::db::create_pool;
use crate::jobs::JSearchClient;
use crate::llm_client::LlmClient;
use crate::operations::{Catalog, Executor};
use crate::persistence::blobs::S3BlobStore;
use crate::persistence::credentials::PgCredentialStore;
use crate::persistence::drive::GoogleDriveClient;
use crate::persistence::oauth::{GoogleOAuth, RedisStateStore};
use crate::persistence::resumes::PgResumeStore;
use crate::persistence::PersistenceGateway;
use crate::routes::build_router;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!(
                "{}={}",
                env!("CARGO_PKG_NAME").replace('-', "_"),
                &config.rust_log
            ))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting CareerPilot API v{}", env!("CARGO_PKG_VERSION"));

    // Initialize PostgreSQL
    let db = create_pool(&config.database_url).await?;

    // Initialize Redis (OAuth state nonces)
    let redis = redis::Client::open(config.redis_url.clone())?;
    info!("Redis client initialized");

    // Initialize S3 / MinIO
    let s3 = build_s3_client(&config).await;
    info!("S3 client initialized (bucket: {})", config.s3_bucket);

    // Initialize LLM client and job search provider
    let llm = LlmClient::new(config.anthropic_api_key.clone())?;
    info!("LLM client initialized (model: {})", llm_client::MODEL);

    let jobs = JSearchClient::new(config.jsearch_api_key.clone(), config.jsearch_host.clone())?;
    if config.jsearch_api_key.is_none() {
        info!("JSEARCH_API_KEY not set; search-jobs will report a provider error");
    }

    // Operation catalog is fixed at startup; a broken template aborts boot.
    let catalog = Catalog::standard()?;
    info!("Operation catalog loaded ({} operations)", catalog.len());

    let gateway = PersistenceGateway::new(
        Arc::new(PgResumeStore::new(db.clone())),
        Arc::new(S3BlobStore::new(s3, config.s3_bucket.clone())),
        Arc::new(PgCredentialStore::new(db)),
        Arc::new(GoogleDriveClient::new(config.google_drive_folder_id.clone())?),
        Arc::new(GoogleOAuth::new(
            config.google_client_id.clone(),
            config.google_client_secret.clone(),
            config.google_redirect_uri.clone(),
        )?),
        Arc::new(RedisStateStore::new(redis)),
    );

    let state = AppState {
        catalog: Arc::new(catalog),
        executor: Executor::new(Arc::new(llm), Arc::new(jobs)),
        gateway,
    };

    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Constructs an S3 client configured for MinIO (local) or AWS (production).
async fn build_s3_client(config: &Config) -> aws_sdk_s3::Client {
    let credentials = Credentials::new(
        &config.aws_access_key_id,
        &config.aws_secret_access_key,
        None,
        None,
        "careerpilot-static",
    );

    let s3_config = aws_config::defaults(aws_config::BehaviorVersion::latest())
        .region(Region::new("us-east-1"))
        .credentials_provider(credentials)
        .endpoint_url(&config.s3_endpoint)
        .load()
        .await;

    aws_sdk_s3::Client::new(&s3_config)
}
