// src/services/import_service.rs

use std::collections::HashSet;

use serde_json::Value;
use sqlx::PgPool;
use uuid::Uuid;
use validator::Validate;

use crate::{
    common::error::AppError,
    db::{GearRepository, HistoryRepository},
    models::{
        gear::{GearCandidate, GearStatus, InsertedGear, NewGear, NewHistoryEntry},
        import::{
            BulkImportResult, SkippedRow, MAX_IMPORT_ROWS, REASON_BARCODE_EXISTS,
            REASON_DUPLICATE_IN_BATCH, REASON_FIELD_LENGTH, REASON_INVALID_STATUS,
            REASON_MISSING_FIELDS,
        },
    },
};

const BLANK_BARCODE: &str = "(blank)";

/// Resultado da validação local: o que segue para o banco e o que já caiu.
#[derive(Debug, Default, PartialEq)]
pub struct ImportPlan {
    pub accepted: Vec<NewGear>,
    pub skipped: Vec<SkippedRow>,
}

#[derive(Clone)]
pub struct ImportService {
    gear_repo: GearRepository,
    history_repo: HistoryRepository,
    pool: PgPool,
}

impl ImportService {
    pub fn new(gear_repo: GearRepository, history_repo: HistoryRepository, pool: PgPool) -> Self {
        Self { gear_repo, history_repo, pool }
    }

    pub async fn import(
        &self,
        tenant_id: Uuid,
        actor_id: Uuid,
        rows: &[Value],
    ) -> Result<BulkImportResult, AppError> {
        let ImportPlan { accepted, mut skipped } = plan_import(rows)?;
        if accepted.is_empty() {
            return Ok(BulkImportResult::new(Vec::new(), skipped));
        }

        // 1. Códigos já cadastrados na loja
        let barcodes: Vec<String> = accepted.iter().map(|row| row.barcode.clone()).collect();
        let existing = self
            .gear_repo
            .find_existing_barcodes(tenant_id, &barcodes)
            .await
            .map_err(|e| e.context("Unable to import item rows."))?;
        let to_insert = drop_existing(accepted, &existing, &mut skipped);

        if to_insert.is_empty() {
            return Ok(BulkImportResult::new(Vec::new(), skipped));
        }

        // 2. Itens + histórico na mesma transação
        let inserted = self
            .insert_with_history(tenant_id, actor_id, &to_insert)
            .await
            .map_err(|e| e.context("Unable to import item rows."))?;

        // Quem perdeu a corrida para a unique constraint não voltou no RETURNING
        skipped.extend(lost_races(&to_insert, &inserted));

        tracing::info!(
            %tenant_id,
            %actor_id,
            inserted = inserted.len(),
            skipped = skipped.len(),
            "Importação de itens concluída"
        );

        Ok(BulkImportResult::new(inserted, skipped))
    }

    async fn insert_with_history(
        &self,
        tenant_id: Uuid,
        actor_id: Uuid,
        rows: &[NewGear],
    ) -> Result<Vec<InsertedGear>, AppError> {
        let mut tx = self.pool.begin().await?;

        let inserted = self.gear_repo.insert_batch(&mut *tx, tenant_id, rows).await?;

        let history = history_entries(&inserted, actor_id);
        self.history_repo.insert_batch(&mut *tx, tenant_id, &history).await?;

        tx.commit().await?;
        Ok(inserted)
    }
}

// ---
// Validação por linha (a primeira regra que falha decide o motivo)
// ---
pub fn plan_import(rows: &[Value]) -> Result<ImportPlan, AppError> {
    if rows.is_empty() || rows.len() > MAX_IMPORT_ROWS {
        return Err(AppError::InvalidBatchSize);
    }

    let mut plan = ImportPlan::default();
    let mut seen: HashSet<String> = HashSet::new();

    for raw in rows {
        match validate_row(raw) {
            Err(skip) => plan.skipped.push(skip),
            Ok(row) => {
                if !seen.insert(row.barcode.to_lowercase()) {
                    plan.skipped.push(SkippedRow::new(row.barcode, REASON_DUPLICATE_IN_BATCH));
                    continue;
                }
                plan.accepted.push(row);
            }
        }
    }

    Ok(plan)
}

fn validate_row(raw: &Value) -> Result<NewGear, SkippedRow> {
    let name = text_field(raw, "name");
    let barcode = text_field(raw, "barcode");

    if name.is_empty() || barcode.is_empty() {
        let reported = if barcode.is_empty() { BLANK_BARCODE } else { barcode.as_str() };
        return Err(SkippedRow::new(reported, REASON_MISSING_FIELDS));
    }

    let candidate = GearCandidate {
        name,
        barcode,
        serial_number: Some(text_field(raw, "serial_number")).filter(|s| !s.is_empty()),
        notes: Some(text_field(raw, "notes")).filter(|s| !s.is_empty()),
    };
    if candidate.validate().is_err() {
        return Err(SkippedRow::new(candidate.barcode, REASON_FIELD_LENGTH));
    }

    // Status ausente (ou não-texto) vale `available`
    let status = match raw.get("status").and_then(Value::as_str) {
        None => GearStatus::Available,
        Some(text) => match GearStatus::parse(text.trim()) {
            Some(status) => status,
            None => return Err(SkippedRow::new(candidate.barcode, REASON_INVALID_STATUS)),
        },
    };

    Ok(NewGear {
        name: candidate.name,
        barcode: candidate.barcode,
        serial_number: candidate.serial_number,
        status,
        notes: candidate.notes,
    })
}

fn text_field(raw: &Value, key: &str) -> String {
    raw.get(key)
        .and_then(Value::as_str)
        .map(|text| text.trim().to_string())
        .unwrap_or_default()
}

fn drop_existing(
    rows: Vec<NewGear>,
    existing: &[String],
    skipped: &mut Vec<SkippedRow>,
) -> Vec<NewGear> {
    let existing: HashSet<String> = existing.iter().map(|b| b.to_lowercase()).collect();
    rows.into_iter()
        .filter(|row| {
            let taken = existing.contains(&row.barcode.to_lowercase());
            if taken {
                skipped.push(SkippedRow::new(row.barcode.clone(), REASON_BARCODE_EXISTS));
            }
            !taken
        })
        .collect()
}

fn lost_races(attempted: &[NewGear], inserted: &[InsertedGear]) -> Vec<SkippedRow> {
    let landed: HashSet<&str> = inserted.iter().map(|item| item.barcode.as_str()).collect();
    attempted
        .iter()
        .filter(|row| !landed.contains(row.barcode.as_str()))
        .map(|row| SkippedRow::new(row.barcode.clone(), REASON_BARCODE_EXISTS))
        .collect()
}

fn history_entries(inserted: &[InsertedGear], actor_id: Uuid) -> Vec<NewHistoryEntry> {
    inserted
        .iter()
        .filter_map(|item| {
            let status = GearStatus::parse(&item.status).filter(|s| s.is_tracked())?;
            Some(NewHistoryEntry {
                gear_id: item.id,
                status,
                note: item.notes.clone(),
                changed_by: actor_id,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use serde_json::json;

    fn reasons(plan: &ImportPlan) -> Vec<(&str, &str)> {
        plan.skipped
            .iter()
            .map(|s| (s.barcode.as_str(), s.reason.as_str()))
            .collect()
    }

    fn inserted(barcode: &str, status: &str) -> InsertedGear {
        InsertedGear {
            id: Uuid::new_v4(),
            tenant_id: Uuid::nil(),
            name: "Item".into(),
            barcode: barcode.into(),
            serial_number: None,
            status: status.into(),
            notes: Some("cracked lens".into()),
        }
    }

    #[test]
    fn batch_size_is_bounded() {
        assert_matches!(plan_import(&[]), Err(AppError::InvalidBatchSize));
        let too_many = vec![json!({ "name": "a", "barcode": "b" }); MAX_IMPORT_ROWS + 1];
        assert_matches!(plan_import(&too_many), Err(AppError::InvalidBatchSize));
    }

    #[test]
    fn duplicate_in_batch_is_case_insensitive() {
        let plan = plan_import(&[
            json!({ "name": "Camera", "barcode": "CAM-1" }),
            json!({ "name": "Camera 2", "barcode": " cam-1 " }),
        ])
        .unwrap();
        assert_eq!(plan.accepted.len(), 1);
        assert_eq!(reasons(&plan), vec![("cam-1", "Duplicate barcode in import.")]);
    }

    #[test]
    fn first_failing_rule_wins() {
        let long_name = "x".repeat(121);
        let plan = plan_import(&[
            json!({ "name": "  ", "barcode": "" }),
            json!({ "name": "", "barcode": "B-1" }),
            json!({ "name": long_name, "barcode": "B-2", "status": "bogus" }),
            json!({ "name": "Tripod", "barcode": "B-3", "status": "broken" }),
            json!({ "name": "Tripod", "barcode": "B-4", "notes": "n".repeat(501) }),
        ])
        .unwrap();
        assert!(plan.accepted.is_empty());
        assert_eq!(
            reasons(&plan),
            vec![
                ("(blank)", "Missing name or barcode."),
                ("B-1", "Missing name or barcode."),
                ("B-2", "Field length exceeded."),
                ("B-3", "Invalid status."),
                ("B-4", "Field length exceeded."),
            ]
        );
    }

    #[test]
    fn status_defaults_to_available_and_blanks_become_null() {
        let plan = plan_import(&[json!({
            "name": " Light stand ",
            "barcode": "LS-9",
            "serial_number": "  ",
            "status": null,
        })])
        .unwrap();
        assert_eq!(
            plan.accepted,
            vec![NewGear {
                name: "Light stand".into(),
                barcode: "LS-9".into(),
                serial_number: None,
                status: GearStatus::Available,
                notes: None,
            }]
        );
    }

    #[test]
    fn existing_barcodes_are_skipped_and_counts_add_up() {
        let rows = vec![
            json!({ "name": "A", "barcode": "A-1" }),
            json!({ "name": "B", "barcode": "B-1", "status": "damaged" }),
            json!({ "name": "B again", "barcode": "b-1" }),
            json!({ "name": "", "barcode": "C-1" }),
        ];
        let ImportPlan { accepted, mut skipped } = plan_import(&rows).unwrap();
        let to_insert = drop_existing(accepted, &["a-1".to_string()], &mut skipped);

        assert_eq!(to_insert.len(), 1);
        assert_eq!(to_insert[0].barcode, "B-1");
        assert!(skipped.contains(&SkippedRow::new("A-1", "Barcode already exists.")));

        let landed = vec![inserted("B-1", "damaged")];
        skipped.extend(lost_races(&to_insert, &landed));
        let result = BulkImportResult::new(landed, skipped);
        assert_eq!(result.inserted + result.skipped, rows.len());
    }

    #[test]
    fn rows_lost_to_a_concurrent_insert_are_reported() {
        let attempted = vec![
            NewGear {
                name: "A".into(),
                barcode: "A-1".into(),
                serial_number: None,
                status: GearStatus::Available,
                notes: None,
            },
            NewGear {
                name: "B".into(),
                barcode: "B-1".into(),
                serial_number: None,
                status: GearStatus::Available,
                notes: None,
            },
        ];
        let lost = lost_races(&attempted, &[inserted("A-1", "available")]);
        assert_eq!(lost, vec![SkippedRow::new("B-1", "Barcode already exists.")]);
    }

    // ---
    // Importação contra o banco
    // ---

    fn service(pool: &PgPool) -> ImportService {
        ImportService::new(
            GearRepository::new(pool.clone()),
            HistoryRepository::new(pool.clone()),
            pool.clone(),
        )
    }

    async fn seed_gear(pool: &PgPool, tenant_id: Uuid, barcode: &str) {
        sqlx::query("INSERT INTO gear (tenant_id, name, barcode) VALUES ($1, 'Seeded', $2)")
            .bind(tenant_id)
            .bind(barcode)
            .execute(pool)
            .await
            .unwrap();
    }

    async fn history_count(pool: &PgPool, tenant_id: Uuid) -> i64 {
        sqlx::query_scalar("SELECT COUNT(*) FROM gear_status_history WHERE tenant_id = $1")
            .bind(tenant_id)
            .fetch_one(pool)
            .await
            .unwrap()
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn import_skips_duplicates_and_existing_barcodes(pool: PgPool) {
        let tenant = Uuid::new_v4();
        let actor = Uuid::new_v4();
        seed_gear(&pool, tenant, "OLD-1").await;

        let rows = vec![
            json!({ "name": "Camera", "barcode": "NEW-1" }),
            json!({ "name": "Lens", "barcode": "NEW-2", "status": "damaged", "notes": "scratched" }),
            json!({ "name": "Camera copy", "barcode": "new-1" }),
            json!({ "name": "Old one", "barcode": "old-1" }),
            json!({ "name": "", "barcode": "X-1" }),
        ];
        let result = service(&pool).import(tenant, actor, &rows).await.unwrap();

        assert_eq!(result.inserted, 2);
        assert_eq!(result.skipped, 3);
        assert!(result.inserted_items.iter().all(|item| item.tenant_id == tenant));
        assert!(result.skipped_rows.contains(&SkippedRow::new("new-1", "Duplicate barcode in import.")));
        assert!(result.skipped_rows.contains(&SkippedRow::new("old-1", "Barcode already exists.")));
        assert!(result.skipped_rows.contains(&SkippedRow::new("X-1", "Missing name or barcode.")));

        // Só o item danificado gera histórico, com a nota e o autor.
        assert_eq!(history_count(&pool, tenant).await, 1);
        let (status, note, changed_by): (String, Option<String>, Option<Uuid>) = sqlx::query_as(
            "SELECT status, note, changed_by FROM gear_status_history WHERE tenant_id = $1",
        )
        .bind(tenant)
        .fetch_one(&pool)
        .await
        .unwrap();
        assert_eq!(status, "damaged");
        assert_eq!(note.as_deref(), Some("scratched"));
        assert_eq!(changed_by, Some(actor));
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn barcodes_are_scoped_to_the_tenant(pool: PgPool) {
        let tenant = Uuid::new_v4();
        let other = Uuid::new_v4();
        seed_gear(&pool, tenant, "OLD-1").await;

        let rows = vec![json!({ "name": "Old one", "barcode": "OLD-1" })];
        let result = service(&pool).import(other, Uuid::new_v4(), &rows).await.unwrap();

        assert_eq!(result.inserted, 1);
        assert_eq!(result.skipped, 0);
        assert_eq!(history_count(&pool, other).await, 0);

        let owned: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM gear WHERE barcode = 'OLD-1'")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(owned, 2);
    }

    #[test]
    fn only_tracked_statuses_get_history() {
        let actor = Uuid::new_v4();
        let items = vec![
            inserted("A", "available"),
            inserted("B", "damaged"),
            inserted("C", "in_studio_only"),
        ];
        let entries = history_entries(&items, actor);
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].status, GearStatus::Damaged);
        assert_eq!(entries[0].note.as_deref(), Some("cracked lens"));
        assert!(entries.iter().all(|e| e.changed_by == actor));
    }
}
