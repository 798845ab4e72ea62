//src/main.rs

use axum::{
    middleware as axum_middleware,
    routing::{get, post},
    Json, Router,
};
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;
use utoipa::OpenApi;

// Declaração dos nossos módulos
mod common;
mod config;
mod db;
mod docs;
mod handlers;
mod middleware;
mod models;
mod services;

// Importações principais
use crate::config::{AppState, Config};
use crate::docs::ApiDoc;
use crate::middleware::{auth::auth_guard, cors::cors_guard};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // Inicializa o logger (RUST_LOG sobrescreve o padrão)
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("gear_ops=info,tower_http=info")),
        )
        .with_target(false)
        .compact()
        .init();

    // Se a configuração falhar, a aplicação não deve iniciar.
    let config = Config::from_env()?;
    let addr = format!("{}:{}", config.host, config.port);
    let run_migrations = config.run_migrations;

    let app_state = AppState::new(config).await?;

    if run_migrations {
        sqlx::migrate!().run(&app_state.db_pool).await?;
        tracing::info!("✅ Migrações do banco de dados executadas com sucesso!");
    }

    let app = app_router(app_state);

    // Inicia o servidor
    let listener = TcpListener::bind(&addr).await?;
    tracing::info!("🚀 Servidor escutando em {}", listener.local_addr()?);
    axum::serve(listener, app).await?;

    Ok(())
}

pub fn app_router(app_state: AppState) -> Router {
    // Rota protegida: token → perfil → papel → cota, antes do handler
    let admin_routes = Router::new()
        .route("/admin-ops", post(handlers::admin_ops::admin_ops))
        .layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            auth_guard,
        ));

    Router::new()
        .route("/api/health", get(handlers::health::health))
        .route("/api/docs/openapi.json", get(|| async { Json(ApiDoc::openapi()) }))
        .nest("/api", admin_routes)
        // A guarda de origem fica por fora de tudo (inclusive do preflight)
        .layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            cors_guard,
        ))
        .layer(TraceLayer::new_for_http())
        .with_state(app_state)
}
