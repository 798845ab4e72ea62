// src/services/notification_service.rs

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::{GearRepository, HistoryRepository},
    models::{
        gear::StatusHistoryItem,
        notifications::{MaintenanceState, NotificationSummary},
        policy::DuePolicy,
    },
    services::policy_service::PolicyService,
};

const RECENT_EVENTS_LIMIT: i64 = 8;

#[derive(Clone)]
pub struct NotificationService {
    gear_repo: GearRepository,
    history_repo: HistoryRepository,
    policy_service: PolicyService,
}

impl NotificationService {
    pub fn new(
        gear_repo: GearRepository,
        history_repo: HistoryRepository,
        policy_service: PolicyService,
    ) -> Self {
        Self { gear_repo, history_repo, policy_service }
    }

    /// Resumo do painel. Cada leitura falha sozinha: o sino nunca quebra a tela.
    pub async fn summary(
        &self,
        tenant_id: Uuid,
        maintenance: MaintenanceState,
        now: DateTime<Utc>,
    ) -> NotificationSummary {
        // A contagem de atrasados depende do prazo, então vai junto com a política.
        let policy_and_overdue = async {
            let policy = degrade(self.policy_service.load(tenant_id).await, "policy", tenant_id);
            let overdue = degrade(
                self.gear_repo.count_overdue(tenant_id, policy.due_cutoff(now)).await,
                "overdue_count",
                tenant_id,
            );
            (policy, overdue)
        };

        let ((policy, overdue_count), flagged_count, recent) = tokio::join!(
            policy_and_overdue,
            self.gear_repo.count_flagged(tenant_id),
            self.history_repo.recent_events(tenant_id, RECENT_EVENTS_LIMIT),
        );

        build_summary(
            policy,
            overdue_count,
            degrade(flagged_count, "flagged_count", tenant_id),
            maintenance,
            degrade(recent, "recent_status_events", tenant_id)
                .into_iter()
                .map(StatusHistoryItem::from)
                .collect(),
        )
    }
}

fn degrade<T: Default>(result: Result<T, AppError>, part: &'static str, tenant_id: Uuid) -> T {
    result.unwrap_or_else(|e| {
        tracing::warn!(%tenant_id, part, error = ?e, "Leitura do painel falhou, usando valor vazio");
        T::default()
    })
}

fn build_summary(
    policy: DuePolicy,
    overdue_count: i64,
    flagged_count: i64,
    maintenance: MaintenanceState,
    recent_status_events: Vec<StatusHistoryItem>,
) -> NotificationSummary {
    NotificationSummary {
        overdue_count,
        flagged_count,
        policy,
        maintenance,
        recent_status_events,
    }
}
