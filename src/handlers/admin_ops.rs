// src/handlers/admin_ops.rs

use axum::{
    extract::State,
    response::{IntoResponse, Response},
    Json,
};
use axum_extra::extract::WithRejection;
use chrono::Utc;
use serde::Serialize;

use crate::{
    common::error::AppError,
    config::AppState,
    middleware::{auth::AuthenticatedCaller, rbac::authorize},
    models::{
        action::{ActionRequest, AdminAction},
        notifications::MaintenanceState,
    },
};

// Envelope de sucesso: { "data": ... }
#[derive(Debug, Serialize)]
pub struct DataEnvelope<T> {
    pub data: T,
}

fn respond<T: Serialize>(data: T) -> Response {
    Json(DataEnvelope { data }).into_response()
}

// POST /api/admin-ops
#[utoipa::path(
    post,
    path = "/api/admin-ops",
    tag = "Admin Ops",
    request_body = ActionRequest,
    responses(
        (status = 200, description = "{ data } com o resultado da ação (ver schemas de cada ação)", body = serde_json::Value),
        (status = 400, description = "Requisição, ação ou payload inválido"),
        (status = 401, description = "Token ausente ou inválido"),
        (status = 403, description = "Sem loja, papel não permitido ou origem bloqueada"),
        (status = 429, description = "Limite de requisições atingido"),
        (status = 500, description = "Falha de banco, provedor ou configuração")
    ),
    security(("api_jwt" = []))
)]
pub async fn admin_ops(
    State(app_state): State<AppState>,
    AuthenticatedCaller(caller): AuthenticatedCaller,
    WithRejection(Json(request), _): WithRejection<Json<ActionRequest>, AppError>,
) -> Result<Response, AppError> {
    let action = AdminAction::from_request(request)?;
    authorize(&caller, &action)?;

    tracing::debug!(
        tenant_id = %caller.tenant_id,
        user_id = %caller.user_id,
        action = action.name(),
        "Executando ação"
    );

    let now = Utc::now();
    let tenant_id = caller.tenant_id;

    match action {
        AdminAction::GetNotifications => {
            let maintenance = load_maintenance(&app_state).await;
            let summary = app_state
                .notification_service
                .summary(tenant_id, maintenance, now)
                .await;
            Ok(respond(summary))
        }
        AdminAction::GetStatusTracking => {
            let report = app_state.status_tracking_service.report(tenant_id, now).await?;
            Ok(respond(report))
        }
        AdminAction::SetDuePolicy(input) => {
            let saved = app_state
                .policy_service
                .save(tenant_id, caller.user_id, &input)
                .await?;
            Ok(respond(saved))
        }
        AdminAction::SendOverdueReminders => {
            let summary = app_state
                .reminder_service
                .send_overdue_reminders(tenant_id, now)
                .await?;
            Ok(respond(summary))
        }
        AdminAction::BulkImportGear { rows } => {
            let result = app_state
                .import_service
                .import(tenant_id, caller.user_id, &rows)
                .await?;
            Ok(respond(result))
        }
    }
}

// Flag global de manutenção. Falha de leitura vale "desligado".
async fn load_maintenance(app_state: &AppState) -> MaintenanceState {
    match app_state.runtime_config_repo.maintenance_value().await {
        Ok(value) => MaintenanceState::from_value(value.as_ref()),
        Err(e) => {
            tracing::warn!(error = ?e, "Não foi possível ler o modo manutenção");
            MaintenanceState::default()
        }
    }
}
