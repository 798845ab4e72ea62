// src/db/history_repo.rs

use sqlx::{Executor, PgPool, Postgres, QueryBuilder};
use uuid::Uuid;
use crate::{
    common::{
        db_utils::{probe, Probe, SchemaFeature},
        error::AppError,
    },
    models::gear::{NewHistoryEntry, RecentStatusRow, StatusHistoryRow},
};

#[derive(Clone)]
pub struct HistoryRepository {
    pool: PgPool,
}

impl HistoryRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    // 1. Feed curto do painel (já com nome/código do item)
    pub async fn recent_events(
        &self,
        tenant_id: Uuid,
        limit: i64,
    ) -> Result<Vec<RecentStatusRow>, AppError> {
        let rows = sqlx::query_as::<_, RecentStatusRow>(
            r#"
            SELECT h.id, h.gear_id, h.status::text AS status, h.note, h.changed_at, h.changed_by,
                   g.name AS gear_name, g.barcode AS gear_barcode
            FROM gear_status_history h
            LEFT JOIN gear g
                   ON g.id = h.gear_id
                  AND g.tenant_id = h.tenant_id
            WHERE h.tenant_id = $1
            ORDER BY h.changed_at DESC
            LIMIT $2
            "#,
        )
        .bind(tenant_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    // 2. Histórico completo do relatório, sem JOIN (a FK pode não existir ainda)
    pub async fn list(
        &self,
        tenant_id: Uuid,
        limit: i64,
    ) -> Result<Probe<Vec<StatusHistoryRow>>, AppError> {
        let result = sqlx::query_as::<_, StatusHistoryRow>(
            r#"
            SELECT id, gear_id, status::text AS status, note, changed_at, changed_by
            FROM gear_status_history
            WHERE tenant_id = $1
            ORDER BY changed_at DESC
            LIMIT $2
            "#,
        )
        .bind(tenant_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await;

        probe(result, &[SchemaFeature::Relation("gear_status_history")])
    }

    // 3. Grava várias transições numa tacada só (dentro da transação do chamador)
    pub async fn insert_batch<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        entries: &[NewHistoryEntry],
    ) -> Result<u64, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        if entries.is_empty() {
            return Ok(0);
        }

        let mut builder = QueryBuilder::<Postgres>::new(
            "INSERT INTO gear_status_history (tenant_id, gear_id, status, note, changed_by) ",
        );
        builder.push_values(entries, |mut b, entry| {
            b.push_bind(tenant_id)
                .push_bind(entry.gear_id)
                .push_bind(entry.status.as_str())
                .push_bind(entry.note.clone())
                .push_bind(entry.changed_by);
        });

        let result = builder.build().execute(executor).await?;
        Ok(result.rows_affected())
    }
}
