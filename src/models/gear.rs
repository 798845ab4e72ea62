// src/models/gear.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

// ---
// 1. Status do equipamento
// ---
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum GearStatus {
    Available,
    CheckedOut,
    Damaged,
    Lost,
    InRepair,
    Retired,
    InStudioOnly,
}

impl GearStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            GearStatus::Available => "available",
            GearStatus::CheckedOut => "checked_out",
            GearStatus::Damaged => "damaged",
            GearStatus::Lost => "lost",
            GearStatus::InRepair => "in_repair",
            GearStatus::Retired => "retired",
            GearStatus::InStudioOnly => "in_studio_only",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "available" => Some(GearStatus::Available),
            "checked_out" => Some(GearStatus::CheckedOut),
            "damaged" => Some(GearStatus::Damaged),
            "lost" => Some(GearStatus::Lost),
            "in_repair" => Some(GearStatus::InRepair),
            "retired" => Some(GearStatus::Retired),
            "in_studio_only" => Some(GearStatus::InStudioOnly),
            _ => None,
        }
    }

    /// Status "sinalizados": tudo que não está disponível nem emprestado.
    /// Cada mudança para um deles gera linha no histórico.
    pub fn is_tracked(self) -> bool {
        !matches!(self, GearStatus::Available | GearStatus::CheckedOut)
    }
}

// ---
// 2. Relatório de status (get_status_tracking)
// ---
// Na consulta de fallback `updated_at` vem sempre NULL.
#[derive(Debug, Clone, FromRow)]
pub struct FlaggedGearRow {
    pub id: Uuid,
    pub name: String,
    pub barcode: String,
    pub serial_number: Option<String>,
    pub status: String,
    pub notes: Option<String>,
    pub updated_at: Option<DateTime<Utc>>,
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct TrackedGear {
    pub id: Uuid,
    pub name: String,
    pub barcode: String,
    pub serial_number: Option<String>,
    pub status: String,
    pub notes: Option<String>,
    pub updated_at: DateTime<Utc>,
}

impl FlaggedGearRow {
    pub fn into_tracked(self, now: DateTime<Utc>) -> TrackedGear {
        TrackedGear {
            updated_at: self.updated_at.or(self.created_at).unwrap_or(now),
            id: self.id,
            name: self.name,
            barcode: self.barcode,
            serial_number: self.serial_number,
            status: self.status,
            notes: self.notes,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct GearRef {
    pub name: String,
    pub barcode: String,
}

#[derive(Debug, Clone, FromRow)]
pub struct GearIdentity {
    pub id: Uuid,
    pub name: String,
    pub barcode: String,
}

// ---
// 3. Histórico de status
// ---
#[derive(Debug, Clone, FromRow)]
pub struct StatusHistoryRow {
    pub id: Uuid,
    pub gear_id: Uuid,
    pub status: String,
    pub note: Option<String>,
    pub changed_at: DateTime<Utc>,
    pub changed_by: Option<Uuid>,
}

// Linha do feed de notificações, já com o LEFT JOIN em gear
#[derive(Debug, Clone, FromRow)]
pub struct RecentStatusRow {
    pub id: Uuid,
    pub gear_id: Uuid,
    pub status: String,
    pub note: Option<String>,
    pub changed_at: DateTime<Utc>,
    pub changed_by: Option<Uuid>,
    pub gear_name: Option<String>,
    pub gear_barcode: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct StatusHistoryItem {
    pub id: Uuid,
    pub gear_id: Uuid,
    #[schema(example = "damaged")]
    pub status: String,
    pub note: Option<String>,
    pub changed_at: DateTime<Utc>,
    pub changed_by: Option<Uuid>,
    pub gear: Option<GearRef>,
}

impl StatusHistoryItem {
    pub fn from_row(row: StatusHistoryRow, gear: Option<GearRef>) -> Self {
        Self {
            id: row.id,
            gear_id: row.gear_id,
            status: row.status,
            note: row.note,
            changed_at: row.changed_at,
            changed_by: row.changed_by,
            gear,
        }
    }
}

impl From<RecentStatusRow> for StatusHistoryItem {
    fn from(row: RecentStatusRow) -> Self {
        let gear = match (row.gear_name, row.gear_barcode) {
            (Some(name), Some(barcode)) => Some(GearRef { name, barcode }),
            _ => None,
        };
        Self {
            id: row.id,
            gear_id: row.gear_id,
            status: row.status,
            note: row.note,
            changed_at: row.changed_at,
            changed_by: row.changed_by,
            gear,
        }
    }
}

#[derive(Debug, Clone)]
pub struct NewHistoryEntry {
    pub gear_id: Uuid,
    pub status: GearStatus,
    pub note: Option<String>,
    pub changed_by: Uuid,
}

// ---
// 4. Importação em lote
// ---
// Limites de tamanho das colunas, checados antes de tocar no banco.
#[derive(Debug, Clone, PartialEq, Validate)]
pub struct GearCandidate {
    #[validate(length(max = 120))]
    pub name: String,
    #[validate(length(max = 64))]
    pub barcode: String,
    #[validate(length(max = 64))]
    pub serial_number: Option<String>,
    #[validate(length(max = 500))]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewGear {
    pub name: String,
    pub barcode: String,
    pub serial_number: Option<String>,
    pub status: GearStatus,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, FromRow, ToSchema)]
pub struct InsertedGear {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub name: String,
    pub barcode: String,
    pub serial_number: Option<String>,
    pub status: String,
    pub notes: Option<String>,
}
