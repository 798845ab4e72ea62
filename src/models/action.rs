// src/models/action.rs

use serde::Deserialize;
use serde_json::Value;
use utoipa::ToSchema;

use crate::{
    common::error::AppError,
    models::{auth::Role, policy::PolicyInput},
};

// ---
// 1. Envelope de entrada: { action, payload }
// ---
#[derive(Debug, Deserialize, ToSchema)]
pub struct ActionRequest {
    #[serde(default)]
    #[schema(value_type = String, example = "get_notifications")]
    pub action: Value,
    #[serde(default)]
    #[schema(value_type = Object)]
    pub payload: Value,
}

// ---
// 2. Conjunto fechado de comandos, cada um com seu payload já tipado
// ---
#[derive(Debug, Clone, PartialEq)]
pub enum AdminAction {
    GetNotifications,
    GetStatusTracking,
    SetDuePolicy(PolicyInput),
    SendOverdueReminders,
    BulkImportGear { rows: Vec<Value> },
}

impl AdminAction {
    pub fn from_request(request: ActionRequest) -> Result<Self, AppError> {
        let Value::String(action) = request.action else {
            return Err(AppError::InvalidRequest);
        };
        let payload = request.payload;

        match action.as_str() {
            "get_notifications" => Ok(AdminAction::GetNotifications),
            "get_status_tracking" => Ok(AdminAction::GetStatusTracking),
            "set_due_policy" => Ok(AdminAction::SetDuePolicy(PolicyInput::from_payload(&payload))),
            "send_overdue_reminders" => Ok(AdminAction::SendOverdueReminders),
            "bulk_import_gear" => {
                // `rows` ausente ou não-array vira lote vazio (e falha no tamanho)
                let rows = match payload {
                    Value::Object(mut fields) => match fields.remove("rows") {
                        Some(Value::Array(rows)) => rows,
                        _ => Vec::new(),
                    },
                    _ => Vec::new(),
                };
                Ok(AdminAction::BulkImportGear { rows })
            }
            _ => Err(AppError::InvalidAction),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            AdminAction::GetNotifications => "get_notifications",
            AdminAction::GetStatusTracking => "get_status_tracking",
            AdminAction::SetDuePolicy(_) => "set_due_policy",
            AdminAction::SendOverdueReminders => "send_overdue_reminders",
            AdminAction::BulkImportGear { .. } => "bulk_import_gear",
        }
    }

    /// Papéis autorizados para cada comando.
    pub fn allowed_roles(&self) -> &'static [Role] {
        match self {
            AdminAction::GetNotifications => &[Role::TenantAdmin, Role::TenantUser],
            _ => &[Role::TenantAdmin],
        }
    }
}
