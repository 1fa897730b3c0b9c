//! Server setup and initialization

use std::sync::Arc;

use axum::Router;
use live_common::{AppConfig, AppError, JwtService, StorageBackend};
use live_core::SnowflakeGenerator;
use live_db::{create_pool, run_migrations, PgMessageRepository, PgSessionRepository};
use live_service::ChatService;
use tokio::net::TcpListener;
use tracing::info;

use crate::middleware::apply_middleware;
use crate::routes::create_router;
use crate::state::AppState;

/// Build the complete application with all routes and middleware
pub fn create_app(state: AppState) -> Router {
    let router = apply_middleware(
        create_router(),
        &state.config().cors,
        state.config().app.env.is_production(),
    );
    router.with_state(state)
}

/// Wire the chat core onto the configured storage backend
pub async fn create_chat_service(config: &AppConfig) -> Result<ChatService, AppError> {
    let ids = Arc::new(SnowflakeGenerator::new(config.snowflake.worker_id));

    match config.storage {
        StorageBackend::Memory => {
            info!("Using in-memory storage");
            Ok(ChatService::in_memory(ids, &config.chat))
        }
        StorageBackend::Postgres => {
            let db = config
                .database
                .as_ref()
                .ok_or_else(|| AppError::Config("DATABASE_URL is required for postgres".into()))?;

            info!("Connecting to PostgreSQL...");
            let pool = create_pool(db)
                .await
                .map_err(|e| AppError::Database(e.to_string()))?;
            run_migrations(&pool)
                .await
                .map_err(|e| AppError::Database(e.to_string()))?;
            info!("PostgreSQL connection established");

            Ok(ChatService::new(
                Arc::new(PgSessionRepository::new(pool.clone())),
                Arc::new(PgMessageRepository::new(pool)),
                ids,
                &config.chat,
            ))
        }
    }
}

/// Initialize all dependencies and create `AppState`
pub async fn create_app_state(config: AppConfig) -> Result<AppState, AppError> {
    let chat = create_chat_service(&config).await?;
    let jwt = JwtService::new(&config.jwt.secret);
    Ok(AppState::new(chat, jwt, config))
}

/// Serve `app` on an already bound listener
pub async fn run_server(app: Router, listener: TcpListener) -> Result<(), AppError> {
    let addr = listener
        .local_addr()
        .map_err(|e| AppError::Config(format!("Listener has no address: {e}")))?;
    info!("Gateway listening on http://{addr}");

    axum::serve(listener, app)
        .await
        .map_err(|e| AppError::Config(format!("Server error: {e}")))
}

/// Run the complete gateway with configuration
pub async fn run(config: AppConfig) -> Result<(), AppError> {
    let addr = config.gateway.address();
    let state = create_app_state(config).await?;
    let app = create_app(state);

    let listener = TcpListener::bind(&addr)
        .await
        .map_err(|e| AppError::Config(format!("Failed to bind to {addr}: {e}")))?;

    run_server(app, listener).await
}
