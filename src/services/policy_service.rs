// src/services/policy_service.rs

use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    common::{db_utils::Probe, error::AppError},
    db::PolicyRepository,
    models::policy::{DuePolicy, PolicyInput, SavedPolicy, MAX_DUE_HOURS},
};

#[derive(Clone)]
pub struct PolicyService {
    policy_repo: PolicyRepository,
    pool: PgPool,
}

impl PolicyService {
    pub fn new(policy_repo: PolicyRepository, pool: PgPool) -> Self {
        Self { policy_repo, pool }
    }

    /// Política vigente da loja, sempre normalizada.
    ///
    /// Schemas sem as colunas de escalonamento caem para a consulta reduzida
    /// (só `checkout_due_hours`); sem a tabela, valem os padrões.
    pub async fn load(&self, tenant_id: Uuid) -> Result<DuePolicy, AppError> {
        match self.policy_repo.find(tenant_id).await? {
            Probe::Supported(row) => Ok(row.map(|r| r.normalized()).unwrap_or_default()),
            Probe::MissingColumn(column) => {
                tracing::debug!(%tenant_id, column, "Política sem escalonamento, usando formato reduzido");
                let due_hours = self.policy_repo.find_due_hours(tenant_id).await?;
                Ok(DuePolicy::normalize(due_hours.map(f64::from), None, None, None))
            }
            Probe::MissingRelation(relation) => {
                tracing::debug!(%tenant_id, relation, "Tabela de política ausente, usando padrões");
                Ok(DuePolicy::default())
            }
        }
    }

    pub async fn save(
        &self,
        tenant_id: Uuid,
        updated_by: Uuid,
        input: &PolicyInput,
    ) -> Result<SavedPolicy, AppError> {
        let policy = validate_policy(input)?;

        let saved = self
            .policy_repo
            .upsert(&self.pool, tenant_id, &policy, updated_by)
            .await
            .map_err(|e| e.context("Unable to save due time limit."))?;

        tracing::info!(
            %tenant_id,
            %updated_by,
            due_hours = saved.checkout_due_hours,
            "Prazo de devolução atualizado"
        );

        Ok(saved)
    }
}

/// Normaliza a entrada e recusa prazos fora de 1..=30 dias.
pub fn validate_policy(input: &PolicyInput) -> Result<DuePolicy, AppError> {
    let policy = input.normalized();
    if !(1..=MAX_DUE_HOURS).contains(&policy.due_hours) {
        return Err(AppError::InvalidPolicy);
    }
    Ok(policy)
}
