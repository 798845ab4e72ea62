// src/models/policy.rs

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use serde_json::Value;
use sqlx::FromRow;
use utoipa::ToSchema;

use crate::models::reminders::EscalationTier;

pub const DEFAULT_DUE_HOURS: i32 = 72;
pub const DEFAULT_ESCALATION_LEVEL_1_HOURS: i32 = 120;
pub const DEFAULT_ESCALATION_LEVEL_2_HOURS: i32 = 168;
pub const DEFAULT_ESCALATION_LEVEL_3_HOURS: i32 = 240;

/// Maior prazo aceito por `set_due_policy` (30 dias).
pub const MAX_DUE_HOURS: i32 = 24 * 30;

// Teto para qualquer valor bruto, assim o `+ 1` do clamp nunca estoura.
const HOURS_CEILING: i32 = 1_000_000;

// ---
// 1. Política normalizada (a que o resto do sistema usa)
// ---
// Garante: 1 <= due_hours <= level_1 < level_2 < level_3
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
pub struct DuePolicy {
    #[schema(example = 72)]
    pub due_hours: i32,
    #[schema(example = 120)]
    pub escalation_level_1_hours: i32,
    #[schema(example = 168)]
    pub escalation_level_2_hours: i32,
    #[schema(example = 240)]
    pub escalation_level_3_hours: i32,
}

impl Default for DuePolicy {
    fn default() -> Self {
        Self::normalize(None, None, None, None)
    }
}

impl DuePolicy {
    /// Aplica os defaults aos valores ausentes/inválidos e depois força a ordem
    /// estritamente crescente dos níveis de escalonamento.
    pub fn normalize(
        due_hours: Option<f64>,
        level_1: Option<f64>,
        level_2: Option<f64>,
        level_3: Option<f64>,
    ) -> Self {
        let due_hours = positive_hours(due_hours, DEFAULT_DUE_HOURS);
        let level_1 = positive_hours(level_1, DEFAULT_ESCALATION_LEVEL_1_HOURS).max(due_hours);
        let level_2 = positive_hours(level_2, DEFAULT_ESCALATION_LEVEL_2_HOURS).max(level_1 + 1);
        let level_3 = positive_hours(level_3, DEFAULT_ESCALATION_LEVEL_3_HOURS).max(level_2 + 1);

        Self {
            due_hours,
            escalation_level_1_hours: level_1,
            escalation_level_2_hours: level_2,
            escalation_level_3_hours: level_3,
        }
    }

    /// Itens retirados antes deste instante estão atrasados.
    pub fn due_cutoff(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        now - Duration::hours(i64::from(self.due_hours))
    }

    pub fn escalation_tier(&self, hours_overdue: f64) -> EscalationTier {
        if hours_overdue >= f64::from(self.escalation_level_3_hours) {
            EscalationTier::Final
        } else if hours_overdue >= f64::from(self.escalation_level_2_hours) {
            EscalationTier::Second
        } else if hours_overdue >= f64::from(self.escalation_level_1_hours) {
            EscalationTier::Reminder
        } else {
            EscalationTier::Overdue
        }
    }
}

fn positive_hours(value: Option<f64>, fallback: i32) -> i32 {
    match value {
        Some(raw) if raw.is_finite() && raw >= 1.0 => {
            raw.floor().min(f64::from(HOURS_CEILING)) as i32
        }
        _ => fallback,
    }
}

/// Lê um número de horas de um valor JSON. Aceita números e strings numéricas.
pub fn hours_from_json(value: &Value) -> Option<f64> {
    match value {
        Value::Number(number) => number.as_f64(),
        Value::String(text) => text.trim().parse::<f64>().ok(),
        _ => None,
    }
}

// ---
// 2. Linha da tabela tenant_policies
// ---
#[derive(Debug, Clone, Default, FromRow)]
pub struct TenantPolicyRow {
    pub checkout_due_hours: Option<i32>,
    pub escalation_level_1_hours: Option<i32>,
    pub escalation_level_2_hours: Option<i32>,
    pub escalation_level_3_hours: Option<i32>,
}

impl TenantPolicyRow {
    pub fn normalized(&self) -> DuePolicy {
        DuePolicy::normalize(
            self.checkout_due_hours.map(f64::from),
            self.escalation_level_1_hours.map(f64::from),
            self.escalation_level_2_hours.map(f64::from),
            self.escalation_level_3_hours.map(f64::from),
        )
    }
}

// O que o upsert devolve para o cliente
#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
pub struct SavedPolicy {
    #[schema(example = 72)]
    pub checkout_due_hours: i32,
    pub escalation_level_1_hours: i32,
    pub escalation_level_2_hours: i32,
    pub escalation_level_3_hours: i32,
}

// ---
// 3. Payload de set_due_policy
// ---
// Os campos chegam como JSON livre; o que não for número vira default.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PolicyInput {
    pub checkout_due_hours: Option<f64>,
    pub escalation_level_1_hours: Option<f64>,
    pub escalation_level_2_hours: Option<f64>,
    pub escalation_level_3_hours: Option<f64>,
}

impl PolicyInput {
    pub fn from_payload(payload: &Value) -> Self {
        let field = |name: &str| payload.get(name).and_then(hours_from_json);
        Self {
            checkout_due_hours: field("checkout_due_hours"),
            escalation_level_1_hours: field("escalation_level_1_hours"),
            escalation_level_2_hours: field("escalation_level_2_hours"),
            escalation_level_3_hours: field("escalation_level_3_hours"),
        }
    }

    pub fn normalized(&self) -> DuePolicy {
        DuePolicy::normalize(
            self.checkout_due_hours,
            self.escalation_level_1_hours,
            self.escalation_level_2_hours,
            self.escalation_level_3_hours,
        )
    }
}
