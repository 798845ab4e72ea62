// src/models/notifications.rs

use serde::Serialize;
use serde_json::Value;
use utoipa::ToSchema;

use crate::models::{
    gear::{StatusHistoryItem, TrackedGear},
    policy::DuePolicy,
};

const DEFAULT_MAINTENANCE_MESSAGE: &str = "Maintenance in progress.";

// ---
// 1. Modo manutenção (app_runtime_config, chave global)
// ---
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct MaintenanceState {
    pub enabled: bool,
    pub message: String,
}

impl Default for MaintenanceState {
    fn default() -> Self {
        Self {
            enabled: false,
            message: String::new(),
        }
    }
}

impl MaintenanceState {
    /// `enabled` só liga com `true` literal; mensagem vazia vira a padrão.
    pub fn from_value(value: Option<&Value>) -> Self {
        let Some(Value::Object(payload)) = value else {
            return Self::default();
        };

        let message = payload
            .get("message")
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|text| !text.is_empty())
            .unwrap_or(DEFAULT_MAINTENANCE_MESSAGE);

        Self {
            enabled: payload.get("enabled") == Some(&Value::Bool(true)),
            message: message.to_string(),
        }
    }
}

// ---
// 2. get_notifications
// ---
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct NotificationSummary {
    pub overdue_count: i64,
    pub flagged_count: i64,
    #[serde(flatten)]
    pub policy: DuePolicy,
    pub maintenance: MaintenanceState,
    pub recent_status_events: Vec<StatusHistoryItem>,
}

// ---
// 3. get_status_tracking
// ---
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct StatusTrackingReport {
    #[serde(flatten)]
    pub policy: DuePolicy,
    pub flagged_items: Vec<TrackedGear>,
    pub history: Vec<StatusHistoryItem>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn maintenance_defaults_to_disabled() {
        assert_eq!(MaintenanceState::from_value(None), MaintenanceState::default());
        assert_eq!(
            MaintenanceState::from_value(Some(&json!("on"))),
            MaintenanceState::default()
        );
    }

    #[test]
    fn maintenance_requires_literal_true() {
        let state = MaintenanceState::from_value(Some(&json!({ "enabled": "true" })));
        assert!(!state.enabled);
        assert_eq!(state.message, "Maintenance in progress.");

        let state = MaintenanceState::from_value(Some(&json!({
            "enabled": true,
            "message": "  Back at 5pm  ",
        })));
        assert!(state.enabled);
        assert_eq!(state.message, "Back at 5pm");
    }

    #[test]
    fn summary_flattens_the_policy() {
        let summary = NotificationSummary {
            overdue_count: 2,
            flagged_count: 1,
            policy: DuePolicy::default(),
            maintenance: MaintenanceState::default(),
            recent_status_events: Vec::new(),
        };
        let value = serde_json::to_value(&summary).unwrap();
        assert_eq!(value["due_hours"], 72);
        assert_eq!(value["escalation_level_3_hours"], 240);
        assert_eq!(value["overdue_count"], 2);
        assert!(value.get("policy").is_none());
    }
}
