//! services/api/src/bin/api.rs

use api_lib::{
    adapters::{GeminiAdapter, MemStorage, PgStorage},
    config::Config,
    error::ApiError,
    web::{self, rest::ApiDoc, session::SESSION_TTL_SECONDS, state::AppState, SessionStore},
};
use axum::http::{
    header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE},
    HeaderValue, Method,
};
use axum::Router;
use pdf_chat_core::ports::{DocumentQaService, PdfStorage};
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::CorsLayer;
use tracing::{debug, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[tokio::main]
async fn main() -> Result<(), ApiError> {
    // --- 1. Load Configuration & Set Up Logging ---
    let config = Arc::new(Config::from_env()?);
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(config.log_level.to_string()))
        .with(tracing_subscriber::fmt::layer())
        .init();
    info!("Configuration loaded. Starting server...");

    // --- 2. Select the Storage Variant ---
    let storage: Arc<dyn PdfStorage> = match &config.database_url {
        Some(database_url) => {
            info!("Connecting to database...");
            let db_pool = PgPoolOptions::new()
                .max_connections(5)
                .connect(database_url)
                .await?;
            let pg_storage = PgStorage::new(db_pool);
            info!("Running database migrations...");
            pg_storage.run_migrations().await?;
            info!("Database migrations complete.");
            Arc::new(pg_storage)
        }
        None => {
            info!("No DATABASE_URL set; using in-memory storage (data will not survive a restart)");
            Arc::new(MemStorage::new())
        }
    };

    // --- 3. Initialize the Gemini Adapter (if configured) ---
    let qa_adapter: Option<Arc<dyn DocumentQaService>> = match &config.gemini_api_key {
        Some(api_key) => Some(Arc::new(GeminiAdapter::new(
            api_key.clone(),
            config.gemini_model.clone(),
        ))),
        None => {
            info!("GEMINI_API_KEY not set; /api/gemini will report a configuration error");
            None
        }
    };

    // --- 4. Build the Shared AppState & Session Pruner ---
    let sessions = SessionStore::new();
    let pruner_sessions = sessions.clone();
    tokio::spawn(async move {
        let mut interval =
            tokio::time::interval(Duration::from_secs(SESSION_TTL_SECONDS as u64));
        interval.tick().await;
        loop {
            interval.tick().await;
            let pruned = pruner_sessions.prune_expired().await;
            debug!("Pruned {} expired sessions", pruned);
        }
    });

    let app_state = Arc::new(AppState {
        storage,
        sessions,
        qa_adapter,
        config: config.clone(),
    });

    // --- 5. Create the Web Router ---
    let cors_origin = config
        .cors_origin
        .parse::<HeaderValue>()
        .map_err(|e| ApiError::Internal(format!("Invalid CORS_ORIGIN: {}", e)))?;
    let cors = CorsLayer::new()
        .allow_origin(cors_origin)
        .allow_credentials(true)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([AUTHORIZATION, CONTENT_TYPE, ACCEPT]);

    let api_router = web::router(app_state).layer(cors);

    // Merge the API router with the Swagger UI router for a complete application.
    let app = Router::new()
        .merge(api_router)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()));

    // --- 6. Start the Server ---
    info!("Starting server on {}", config.bind_address);
    info!(
        "Swagger UI available at http://{}/swagger-ui",
        config.bind_address
    );
    let listener = tokio::net::TcpListener::bind(&config.bind_address).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
