// src/db/gear_repo.rs

use chrono::{DateTime, Utc};
use sqlx::{Executor, PgPool, Postgres, QueryBuilder};
use uuid::Uuid;
use crate::{
    common::{
        db_utils::{probe, Probe, SchemaFeature},
        error::AppError,
    },
    models::{
        gear::{FlaggedGearRow, GearIdentity, InsertedGear, NewGear},
        reminders::OverdueGearRow,
    },
};

#[derive(Clone)]
pub struct GearRepository {
    pool: PgPool,
}

impl GearRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    // ---
    // Contadores (painel de notificações)
    // ---

    pub async fn count_overdue(
        &self,
        tenant_id: Uuid,
        due_cutoff: DateTime<Utc>,
    ) -> Result<i64, AppError> {
        let count = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(*)
            FROM gear
            WHERE tenant_id = $1
              AND status = 'checked_out'
              AND deleted_at IS NULL
              AND checked_out_at < $2
            "#,
        )
        .bind(tenant_id)
        .bind(due_cutoff)
        .fetch_one(&self.pool)
        .await?;

        Ok(count)
    }

    pub async fn count_flagged(&self, tenant_id: Uuid) -> Result<i64, AppError> {
        let count = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(*)
            FROM gear
            WHERE tenant_id = $1
              AND deleted_at IS NULL
              AND status NOT IN ('available', 'checked_out')
            "#,
        )
        .bind(tenant_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(count)
    }

    // ---
    // Itens sinalizados (relatório de status)
    // ---

    pub async fn list_flagged(
        &self,
        tenant_id: Uuid,
        limit: i64,
    ) -> Result<Probe<Vec<FlaggedGearRow>>, AppError> {
        let result = sqlx::query_as::<_, FlaggedGearRow>(
            r#"
            SELECT id, name, barcode, serial_number, status::text AS status, notes,
                   updated_at, created_at
            FROM gear
            WHERE tenant_id = $1
              AND deleted_at IS NULL
              AND status NOT IN ('available', 'checked_out')
            ORDER BY updated_at DESC NULLS LAST
            LIMIT $2
            "#,
        )
        .bind(tenant_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await;

        probe(result, &[SchemaFeature::Column("updated_at")])
    }

    /// Mesma lista, ordenada por `created_at` (schemas sem `updated_at`).
    pub async fn list_flagged_by_created_at(
        &self,
        tenant_id: Uuid,
        limit: i64,
    ) -> Result<Vec<FlaggedGearRow>, AppError> {
        let rows = sqlx::query_as::<_, FlaggedGearRow>(
            r#"
            SELECT id, name, barcode, serial_number, status::text AS status, notes,
                   NULL::timestamptz AS updated_at, created_at
            FROM gear
            WHERE tenant_id = $1
              AND deleted_at IS NULL
              AND status NOT IN ('available', 'checked_out')
            ORDER BY created_at DESC
            LIMIT $2
            "#,
        )
        .bind(tenant_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    /// Nome e código de barras de vários itens de uma vez.
    pub async fn find_identities(
        &self,
        tenant_id: Uuid,
        ids: &[Uuid],
    ) -> Result<Vec<GearIdentity>, AppError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let rows = sqlx::query_as::<_, GearIdentity>(
            "SELECT id, name, barcode FROM gear WHERE tenant_id = $1 AND id = ANY($2)",
        )
        .bind(tenant_id)
        .bind(ids)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    // ---
    // Atrasados (lembretes)
    // ---

    pub async fn list_overdue_with_borrower(
        &self,
        tenant_id: Uuid,
        due_cutoff: DateTime<Utc>,
        limit: i64,
    ) -> Result<Vec<OverdueGearRow>, AppError> {
        let rows = sqlx::query_as::<_, OverdueGearRow>(
            r#"
            SELECT g.id, g.name, g.barcode, g.checked_out_at,
                   s.first_name, s.last_name, s.student_id, s.email
            FROM gear g
            LEFT JOIN students s
                   ON s.id = g.checked_out_by
                  AND s.tenant_id = g.tenant_id
            WHERE g.tenant_id = $1
              AND g.status = 'checked_out'
              AND g.deleted_at IS NULL
              AND g.checked_out_at < $2
            ORDER BY g.checked_out_at ASC, g.id
            LIMIT $3
            "#,
        )
        .bind(tenant_id)
        .bind(due_cutoff)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    // ---
    // Importação em lote
    // ---

    /// Códigos já cadastrados na loja (comparação sem diferenciar maiúsculas).
    pub async fn find_existing_barcodes(
        &self,
        tenant_id: Uuid,
        barcodes: &[String],
    ) -> Result<Vec<String>, AppError> {
        let lowered: Vec<String> = barcodes.iter().map(|b| b.to_lowercase()).collect();

        let existing = sqlx::query_scalar::<_, String>(
            "SELECT barcode FROM gear WHERE tenant_id = $1 AND lower(barcode) = ANY($2)",
        )
        .bind(tenant_id)
        .bind(&lowered)
        .fetch_all(&self.pool)
        .await?;

        Ok(existing)
    }

    /// Insere o lote inteiro num único INSERT.
    ///
    /// Linhas que batem na unique (tenant_id, barcode) são ignoradas e não
    /// aparecem no retorno.
    pub async fn insert_batch<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        rows: &[NewGear],
    ) -> Result<Vec<InsertedGear>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        if rows.is_empty() {
            return Ok(Vec::new());
        }

        let mut builder = QueryBuilder::<Postgres>::new(
            "INSERT INTO gear (tenant_id, name, barcode, serial_number, status, notes) ",
        );
        builder.push_values(rows, |mut b, row| {
            b.push_bind(tenant_id)
                .push_bind(row.name.clone())
                .push_bind(row.barcode.clone())
                .push_bind(row.serial_number.clone())
                .push_bind(row.status.as_str())
                .push_bind(row.notes.clone());
        });
        builder.push(
            " ON CONFLICT DO NOTHING \
             RETURNING id, tenant_id, name, barcode, serial_number, status::text AS status, notes",
        );

        let inserted = builder
            .build_query_as::<InsertedGear>()
            .fetch_all(executor)
            .await?;

        Ok(inserted)
    }
}
