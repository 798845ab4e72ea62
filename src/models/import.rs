// src/models/import.rs

use serde::Serialize;
use utoipa::ToSchema;

use crate::models::gear::InsertedGear;

pub const MAX_IMPORT_ROWS: usize = 1000;

// Motivos de descarte devolvidos ao cliente
pub const REASON_MISSING_FIELDS: &str = "Missing name or barcode.";
pub const REASON_FIELD_LENGTH: &str = "Field length exceeded.";
pub const REASON_INVALID_STATUS: &str = "Invalid status.";
pub const REASON_DUPLICATE_IN_BATCH: &str = "Duplicate barcode in import.";
pub const REASON_BARCODE_EXISTS: &str = "Barcode already exists.";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct SkippedRow {
    #[schema(example = "CAM-0042")]
    pub barcode: String,
    #[schema(example = "Barcode already exists.")]
    pub reason: String,
}

impl SkippedRow {
    pub fn new(barcode: impl Into<String>, reason: &str) -> Self {
        Self {
            barcode: barcode.into(),
            reason: reason.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct BulkImportResult {
    pub inserted: usize,
    pub skipped: usize,
    pub inserted_items: Vec<InsertedGear>,
    pub skipped_rows: Vec<SkippedRow>,
}

impl BulkImportResult {
    pub fn new(inserted_items: Vec<InsertedGear>, skipped_rows: Vec<SkippedRow>) -> Self {
        Self {
            inserted: inserted_items.len(),
            skipped: skipped_rows.len(),
            inserted_items,
            skipped_rows,
        }
    }
}
