// src/db/runtime_config_repo.rs

use serde_json::Value;
use sqlx::PgPool;
use crate::common::error::AppError;

const MAINTENANCE_KEY: &str = "maintenance_mode";

// Configuração global (não é por loja)
#[derive(Clone)]
pub struct RuntimeConfigRepository {
    pool: PgPool,
}

impl RuntimeConfigRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn get_value(&self, key: &str) -> Result<Option<Value>, AppError> {
        let value = sqlx::query_scalar::<_, Value>(
            "SELECT value FROM app_runtime_config WHERE key = $1",
        )
        .bind(key)
        .fetch_optional(&self.pool)
        .await?;

        Ok(value)
    }

    pub async fn maintenance_value(&self) -> Result<Option<Value>, AppError> {
        self.get_value(MAINTENANCE_KEY).await
    }
}
