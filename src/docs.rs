// src/docs.rs

use utoipa::OpenApi;
use utoipa::openapi::security::{Http, HttpAuthScheme, SecurityScheme};
use crate::handlers;
use crate::models;

#[derive(OpenApi)]
#[openapi(
    paths(
        // --- Admin Ops ---
        handlers::admin_ops::admin_ops,

        // --- Health ---
        handlers::health::health,
    ),
    components(
        schemas(
            // --- Envelope ---
            models::action::ActionRequest,

            // --- Policy ---
            models::policy::DuePolicy,
            models::policy::SavedPolicy,

            // --- Notifications / Status ---
            models::notifications::MaintenanceState,
            models::notifications::NotificationSummary,
            models::notifications::StatusTrackingReport,
            models::gear::GearStatus,
            models::gear::GearRef,
            models::gear::TrackedGear,
            models::gear::StatusHistoryItem,

            // --- Reminders ---
            models::reminders::EscalationRecipients,
            models::reminders::ReminderSummary,

            // --- Import ---
            models::gear::InsertedGear,
            models::import::SkippedRow,
            models::import::BulkImportResult,
        )
    ),
    tags(
        (name = "Admin Ops", description = "Ações administrativas da loja (notificações, prazos, lembretes, importação)"),
        (name = "Health", description = "Verificação de disponibilidade")
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

struct SecurityAddon;

impl utoipa::Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "api_jwt",
            SecurityScheme::Http(
                Http::new(HttpAuthScheme::Bearer)
            ),
        );
    }
}
