// src/db/rate_limit_repo.rs

use chrono::{DateTime, Utc};
use sqlx::PgPool;

#[derive(Clone)]
pub struct RateLimitRepository {
    pool: PgPool,
}

impl RateLimitRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Consome uma unidade do balde e devolve quantas já foram usadas na janela.
    ///
    /// Um único UPSERT: a linha do balde é travada pelo próprio Postgres, então
    /// chamadas concorrentes nunca perdem incremento. Janela nova zera o contador.
    pub async fn consume(
        &self,
        bucket_key: &str,
        window_start: DateTime<Utc>,
    ) -> Result<i32, sqlx::Error> {
        sqlx::query_scalar::<_, i32>(
            r#"
            INSERT INTO rate_limit_counters (bucket_key, window_start, hits, updated_at)
            VALUES ($1, $2, 1, NOW())
            ON CONFLICT (bucket_key) DO UPDATE SET
                hits = CASE
                    WHEN rate_limit_counters.window_start = EXCLUDED.window_start
                        THEN rate_limit_counters.hits + 1
                    ELSE 1
                END,
                window_start = EXCLUDED.window_start,
                updated_at = NOW()
            RETURNING hits
            "#,
        )
        .bind(bucket_key)
        .bind(window_start)
        .fetch_one(&self.pool)
        .await
    }
}
