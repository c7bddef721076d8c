use std::sync::Arc;

use axum::{routing::get, Router};
use chrono::Duration;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use prolocate::{
    api,
    config::Config,
    db, logging,
    services::{
        assistant::{AssistantOracle, AssistantService, HttpAssistant, PgAssistantLog, Unavailable},
        conversation::{ConversationStore, PgConversationStore},
        identity::{IdentityStore, PgIdentityStore},
        message_router::MessageRouter,
        moderation::{HttpModeration, ModerationOracle, Permissive},
        session_guard::SessionGuard,
        token_service::TokenService,
    },
    state::AppState,
    websocket::ConnectionRegistry,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    logging::init_tracing();

    let config = Config::load()?;
    tracing::info!("Configuration loaded successfully");

    let pool = db::init_pool(&config.database).await?;
    db::MIGRATOR.run(&pool).await?;
    tracing::info!("Database connection established, migrations applied");

    let tokens = Arc::new(TokenService::new(&config.jwt.secret));
    let identity: Arc<dyn IdentityStore> = Arc::new(PgIdentityStore::new(pool.clone()));
    let conversations: Arc<dyn ConversationStore> = Arc::new(PgConversationStore::new(pool.clone()));
    let registry = ConnectionRegistry::new();

    let moderation: Arc<dyn ModerationOracle> = match config.moderation.endpoint() {
        Some(url) => Arc::new(HttpModeration::new(url.to_string())),
        None => {
            tracing::warn!("no moderation endpoint configured; public posts are not screened");
            Arc::new(Permissive)
        }
    };

    let assistant_oracle: Arc<dyn AssistantOracle> = match config.assistant.endpoint() {
        Some(url) => Arc::new(HttpAssistant::new(url.to_string())),
        None => {
            tracing::warn!("no assistant endpoint configured; assistant requests are refused");
            Arc::new(Unavailable)
        }
    };
    let assistant = Arc::new(AssistantService::new(
        assistant_oracle,
        Arc::new(PgAssistantLog::new(pool)),
    ));

    let guard = Arc::new(SessionGuard::new(
        tokens.clone(),
        identity.clone(),
        Duration::minutes(config.jwt.access_ttl_minutes),
    ));
    let router = Arc::new(MessageRouter::new(
        conversations,
        registry.clone(),
        moderation,
    ));

    let state = AppState {
        config: Arc::new(config.clone()),
        tokens,
        identity,
        guard,
        router,
        assistant,
        registry,
    };

    let app = Router::new()
        .route("/health", get(health_check))
        .nest("/api/v1", api::routes(state.clone()))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    tracing::info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

async fn health_check() -> &'static str {
    "OK"
}
