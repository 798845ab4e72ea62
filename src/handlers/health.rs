// src/handlers/health.rs

use axum::Json;
use serde_json::{json, Value};

// GET /api/health (sem banco: só diz que o processo responde)
#[utoipa::path(
    get,
    path = "/api/health",
    tag = "Health",
    responses(
        (status = 200, description = "Serviço no ar", body = serde_json::Value)
    )
)]
pub async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}
