// src/models/reminders.rs

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;
use utoipa::ToSchema;

use crate::models::policy::DuePolicy;

// ---
// Nível de escalonamento (0..=3)
// ---
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum EscalationTier {
    #[default]
    Overdue = 0,
    Reminder = 1,
    Second = 2,
    Final = 3,
}

impl EscalationTier {
    pub fn subject_label(self) -> &'static str {
        match self {
            EscalationTier::Overdue => "Overdue notice",
            EscalationTier::Reminder => "Reminder",
            EscalationTier::Second => "Second notice",
            EscalationTier::Final => "Final notice",
        }
    }
}

// Linha vinda do banco: item atrasado + dados do aluno (LEFT JOIN, tudo opcional)
#[derive(Debug, Clone, FromRow)]
pub struct OverdueGearRow {
    pub id: uuid::Uuid,
    pub name: String,
    pub barcode: String,
    pub checked_out_at: Option<DateTime<Utc>>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub student_id: Option<String>,
    pub email: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReminderItem {
    pub name: String,
    pub barcode: String,
    pub checked_out_at: Option<DateTime<Utc>>,
    pub tier: EscalationTier,
}

/// Um destinatário e todos os itens atrasados dele.
#[derive(Debug, Clone, PartialEq)]
pub struct BorrowerReminder {
    pub email: String,
    pub student_name: String,
    pub student_id: String,
    pub max_tier: EscalationTier,
    pub items: Vec<ReminderItem>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OutboundEmail {
    pub to: String,
    pub subject: String,
    pub html: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, ToSchema)]
pub struct EscalationRecipients {
    pub level_1: u32,
    pub level_2: u32,
    pub level_3: u32,
}

impl EscalationRecipients {
    pub fn record(&mut self, tier: EscalationTier) {
        match tier {
            EscalationTier::Overdue => {}
            EscalationTier::Reminder => self.level_1 += 1,
            EscalationTier::Second => self.level_2 += 1,
            EscalationTier::Final => self.level_3 += 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct ReminderSummary {
    pub sent: u32,
    pub recipients: u32,
    #[serde(flatten)]
    pub policy: DuePolicy,
    pub escalation_recipients: EscalationRecipients,
}
