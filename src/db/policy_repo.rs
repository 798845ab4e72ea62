// src/db/policy_repo.rs

use sqlx::{Executor, PgPool, Postgres};
use uuid::Uuid;
use crate::{
    common::{
        db_utils::{probe, Probe, SchemaFeature},
        error::AppError,
    },
    models::policy::{DuePolicy, SavedPolicy, TenantPolicyRow},
};

// Colunas que só existem depois da migração de escalonamento
const ESCALATION_COLUMNS: [SchemaFeature; 4] = [
    SchemaFeature::Column("escalation_level_1_hours"),
    SchemaFeature::Column("escalation_level_2_hours"),
    SchemaFeature::Column("escalation_level_3_hours"),
    SchemaFeature::Relation("tenant_policies"),
];

#[derive(Clone)]
pub struct PolicyRepository {
    pool: PgPool,
}

impl PolicyRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Política completa da loja (se houver linha).
    pub async fn find(&self, tenant_id: Uuid) -> Result<Probe<Option<TenantPolicyRow>>, AppError> {
        let result = sqlx::query_as::<_, TenantPolicyRow>(
            r#"
            SELECT checkout_due_hours,
                   escalation_level_1_hours,
                   escalation_level_2_hours,
                   escalation_level_3_hours
            FROM tenant_policies
            WHERE tenant_id = $1
            "#,
        )
        .bind(tenant_id)
        .fetch_optional(&self.pool)
        .await;

        probe(result, &ESCALATION_COLUMNS)
    }

    /// Formato reduzido, para schemas sem as colunas de escalonamento.
    pub async fn find_due_hours(&self, tenant_id: Uuid) -> Result<Option<i32>, AppError> {
        let due_hours = sqlx::query_scalar::<_, Option<i32>>(
            "SELECT checkout_due_hours FROM tenant_policies WHERE tenant_id = $1",
        )
        .bind(tenant_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(due_hours.flatten())
    }

    /// UPSERT pela loja, carimbando quem alterou e quando.
    pub async fn upsert<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        policy: &DuePolicy,
        updated_by: Uuid,
    ) -> Result<SavedPolicy, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let saved = sqlx::query_as::<_, SavedPolicy>(
            r#"
            INSERT INTO tenant_policies (
                tenant_id,
                checkout_due_hours,
                escalation_level_1_hours,
                escalation_level_2_hours,
                escalation_level_3_hours,
                updated_by,
                updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, NOW())
            ON CONFLICT (tenant_id)
            DO UPDATE SET
                checkout_due_hours = EXCLUDED.checkout_due_hours,
                escalation_level_1_hours = EXCLUDED.escalation_level_1_hours,
                escalation_level_2_hours = EXCLUDED.escalation_level_2_hours,
                escalation_level_3_hours = EXCLUDED.escalation_level_3_hours,
                updated_by = EXCLUDED.updated_by,
                updated_at = NOW()
            RETURNING checkout_due_hours,
                      escalation_level_1_hours,
                      escalation_level_2_hours,
                      escalation_level_3_hours
            "#,
        )
        .bind(tenant_id)
        .bind(policy.due_hours)
        .bind(policy.escalation_level_1_hours)
        .bind(policy.escalation_level_2_hours)
        .bind(policy.escalation_level_3_hours)
        .bind(updated_by)
        .fetch_one(executor)
        .await?;

        Ok(saved)
    }
}
