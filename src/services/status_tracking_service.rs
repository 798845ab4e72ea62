// src/services/status_tracking_service.rs

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::{
    common::{db_utils::Probe, error::AppError},
    db::{GearRepository, HistoryRepository},
    models::{
        gear::{FlaggedGearRow, GearIdentity, GearRef, StatusHistoryItem, StatusHistoryRow, TrackedGear},
        notifications::StatusTrackingReport,
    },
    services::policy_service::PolicyService,
};

const FLAGGED_LIMIT: i64 = 400;
const HISTORY_LIMIT: i64 = 600;
const LOAD_FAILED: &str = "Unable to load status tracking.";

#[derive(Clone)]
pub struct StatusTrackingService {
    gear_repo: GearRepository,
    history_repo: HistoryRepository,
    policy_service: PolicyService,
}

impl StatusTrackingService {
    pub fn new(
        gear_repo: GearRepository,
        history_repo: HistoryRepository,
        policy_service: PolicyService,
    ) -> Self {
        Self { gear_repo, history_repo, policy_service }
    }

    pub async fn report(
        &self,
        tenant_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<StatusTrackingReport, AppError> {
        let (policy, flagged_items, history) = tokio::try_join!(
            self.policy_service.load(tenant_id),
            self.flagged_items(tenant_id, now),
            self.history(tenant_id),
        )
        .map_err(|e| {
            tracing::error!(%tenant_id, error = ?e, "Falha ao montar o relatório de status");
            e.context(LOAD_FAILED)
        })?;

        Ok(StatusTrackingReport {
            policy,
            flagged_items,
            history,
        })
    }

    async fn flagged_items(
        &self,
        tenant_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<Vec<TrackedGear>, AppError> {
        let rows: Vec<FlaggedGearRow> = match self.gear_repo.list_flagged(tenant_id, FLAGGED_LIMIT).await? {
            Probe::Supported(rows) => rows,
            // Sem `updated_at`: ordena por `created_at` e reporta ele no lugar.
            Probe::MissingColumn(_) | Probe::MissingRelation(_) => {
                self.gear_repo
                    .list_flagged_by_created_at(tenant_id, FLAGGED_LIMIT)
                    .await?
            }
        };

        Ok(rows.into_iter().map(|row| row.into_tracked(now)).collect())
    }

    async fn history(&self, tenant_id: Uuid) -> Result<Vec<StatusHistoryItem>, AppError> {
        let rows = match self.history_repo.list(tenant_id, HISTORY_LIMIT).await? {
            Probe::Supported(rows) => rows,
            Probe::MissingColumn(_) | Probe::MissingRelation(_) => return Ok(Vec::new()),
        };

        // Identidade dos itens numa única consulta, sem JOIN
        let gear_ids = distinct_gear_ids(&rows);
        let identities = self.gear_repo.find_identities(tenant_id, &gear_ids).await?;

        Ok(attach_identities(rows, identities))
    }
}

fn distinct_gear_ids(rows: &[StatusHistoryRow]) -> Vec<Uuid> {
    let mut ids: Vec<Uuid> = rows.iter().map(|row| row.gear_id).collect();
    ids.sort_unstable();
    ids.dedup();
    ids
}

fn attach_identities(
    rows: Vec<StatusHistoryRow>,
    identities: Vec<GearIdentity>,
) -> Vec<StatusHistoryItem> {
    let by_id: HashMap<Uuid, GearRef> = identities
        .into_iter()
        .map(|g| (g.id, GearRef { name: g.name, barcode: g.barcode }))
        .collect();

    rows.into_iter()
        .map(|row| {
            let gear = by_id.get(&row.gear_id).cloned();
            StatusHistoryItem::from_row(row, gear)
        })
        .collect()
}
