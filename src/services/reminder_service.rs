// src/services/reminder_service.rs

use std::sync::Arc;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::GearRepository,
    models::{
        policy::DuePolicy,
        reminders::{
            BorrowerReminder, EscalationRecipients, OutboundEmail, OverdueGearRow, ReminderItem,
            ReminderSummary,
        },
    },
    services::{mailer::Mailer, policy_service::PolicyService},
};

const OVERDUE_SCAN_LIMIT: i64 = 500;

#[derive(Clone)]
pub struct ReminderService {
    gear_repo: GearRepository,
    policy_service: PolicyService,
    mailer: Option<Arc<dyn Mailer>>,
}

impl ReminderService {
    pub fn new(
        gear_repo: GearRepository,
        policy_service: PolicyService,
        mailer: Option<Arc<dyn Mailer>>,
    ) -> Self {
        Self { gear_repo, policy_service, mailer }
    }

    /// Varre os atrasados da loja e manda um e-mail por aluno.
    pub async fn send_overdue_reminders(
        &self,
        tenant_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<ReminderSummary, AppError> {
        // Sem provedor não adianta nem consultar.
        let mailer = self.mailer.as_deref().ok_or(AppError::ProviderNotConfigured)?;

        let policy = self.policy_service.load(tenant_id).await?;

        let rows = self
            .gear_repo
            .list_overdue_with_borrower(tenant_id, policy.due_cutoff(now), OVERDUE_SCAN_LIMIT)
            .await
            .map_err(|e| e.context("Unable to load overdue items."))?;

        let reminders = group_by_borrower(rows, &policy, now);
        let summary = dispatch(mailer, policy, &reminders).await;

        tracing::info!(
            %tenant_id,
            sent = summary.sent,
            recipients = summary.recipients,
            "Lembretes de atraso enviados"
        );

        Ok(summary)
    }
}

// ---
// Agrupamento e escalonamento (puro)
// ---

/// Horas desde a retirada. Sem data de retirada conta como exatamente o prazo.
pub fn hours_overdue(
    checked_out_at: Option<DateTime<Utc>>,
    policy: &DuePolicy,
    now: DateTime<Utc>,
) -> f64 {
    match checked_out_at {
        Some(at) => ((now - at).num_seconds() as f64 / 3600.0).max(0.0),
        None => f64::from(policy.due_hours),
    }
}

/// Agrupa os itens por e-mail do aluno (aparado, minúsculo), na ordem em que
/// cada aluno aparece. Linhas sem e-mail ou ainda dentro do prazo ficam de fora.
pub fn group_by_borrower(
    rows: Vec<OverdueGearRow>,
    policy: &DuePolicy,
    now: DateTime<Utc>,
) -> Vec<BorrowerReminder> {
    let cutoff = policy.due_cutoff(now);
    let mut groups: Vec<BorrowerReminder> = Vec::new();

    for row in rows {
        let email = row
            .email
            .as_deref()
            .map(|raw| raw.trim().to_lowercase())
            .unwrap_or_default();
        if email.is_empty() {
            continue;
        }
        if row.checked_out_at.is_some_and(|at| at >= cutoff) {
            continue;
        }

        let tier = policy.escalation_tier(hours_overdue(row.checked_out_at, policy, now));
        let item = ReminderItem {
            name: row.name,
            barcode: row.barcode,
            checked_out_at: row.checked_out_at,
            tier,
        };

        match groups.iter_mut().find(|group| group.email == email) {
            Some(group) => {
                group.max_tier = group.max_tier.max(tier);
                group.items.push(item);
            }
            None => {
                let student_name = format!(
                    "{} {}",
                    row.first_name.as_deref().unwrap_or_default(),
                    row.last_name.as_deref().unwrap_or_default()
                )
                .trim()
                .to_string();

                groups.push(BorrowerReminder {
                    email,
                    student_name,
                    student_id: row.student_id.unwrap_or_default(),
                    max_tier: tier,
                    items: vec![item],
                });
            }
        }
    }

    groups
}

pub fn render_reminder(reminder: &BorrowerReminder, policy: &DuePolicy) -> OutboundEmail {
    let label = reminder.max_tier.subject_label();

    let item_rows: String = reminder
        .items
        .iter()
        .map(|item| {
            let when = item
                .checked_out_at
                .map(|at| at.format("%Y-%m-%d %H:%M UTC").to_string())
                .unwrap_or_else(|| "unknown time".to_string());
            format!(
                "<li>{} ({}) - checked out {}</li>",
                escape_html(&item.name),
                escape_html(&item.barcode),
                when
            )
        })
        .collect();

    let greeting = if reminder.student_name.is_empty() {
        "Student"
    } else {
        reminder.student_name.as_str()
    };

    let student_line = if reminder.student_id.is_empty() {
        String::new()
    } else {
        format!("<p>Student ID: {}</p>", escape_html(&reminder.student_id))
    };

    let html = format!(
        "<p>Hello {},</p>\
         {}\
         <p>{}: the following item(s) are overdue.</p>\
         <ul>{}</ul>\
         <p>Due limit: {} hours.</p>\
         <p>Please return these items as soon as possible.</p>",
        escape_html(greeting),
        student_line,
        label,
        item_rows,
        policy.due_hours
    );

    OutboundEmail {
        to: reminder.email.clone(),
        subject: format!("{label} - ItemTraxx overdue item"),
        html,
    }
}

/// Envia em sequência. Falha de um destinatário é registrada e ignorada.
pub async fn dispatch(
    mailer: &dyn Mailer,
    policy: DuePolicy,
    reminders: &[BorrowerReminder],
) -> ReminderSummary {
    let mut sent = 0;
    let mut escalation_recipients = EscalationRecipients::default();

    for reminder in reminders {
        let email = render_reminder(reminder, &policy);
        match mailer.send(&email).await {
            Ok(()) => {
                sent += 1;
                escalation_recipients.record(reminder.max_tier);
            }
            Err(e) => {
                tracing::error!(to = %reminder.email, error = %e, "Falha ao enviar lembrete de atraso");
            }
        }
    }

    ReminderSummary {
        sent,
        recipients: reminders.len() as u32,
        policy,
        escalation_recipients,
    }
}

fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{models::reminders::EscalationTier, services::mailer::MailError};
    use async_trait::async_trait;
    use chrono::Duration;
    use std::sync::Mutex;

    // Provedor falso: grava as mensagens e recusa os endereços listados.
    #[derive(Default)]
    struct RecordingMailer {
        sent: Mutex<Vec<OutboundEmail>>,
        reject: Vec<&'static str>,
    }

    #[async_trait]
    impl Mailer for RecordingMailer {
        async fn send(&self, email: &OutboundEmail) -> Result<(), MailError> {
            self.sent.lock().unwrap().push(email.clone());
            if self.reject.iter().any(|r| *r == email.to) {
                return Err(MailError::Rejected { status: 422, body: "bad address".into() });
            }
            Ok(())
        }
    }

    fn now() -> DateTime<Utc> {
        "2026-05-10T12:00:00Z".parse().unwrap()
    }

    fn row(email: Option<&str>, hours_ago: i64, barcode: &str) -> OverdueGearRow {
        OverdueGearRow {
            id: Uuid::new_v4(),
            name: format!("Item {barcode}"),
            barcode: barcode.to_string(),
            checked_out_at: Some(now() - Duration::hours(hours_ago)),
            first_name: Some("Ada".into()),
            last_name: Some("Lovelace".into()),
            student_id: Some("S-1".into()),
            email: email.map(str::to_string),
        }
    }

    #[test]
    fn tiers_follow_hours_overdue() {
        let policy = DuePolicy::default();
        let rows = vec![
            row(Some("a@x.io"), 130, "A"),
            row(Some("b@x.io"), 170, "B"),
            row(Some("c@x.io"), 250, "C"),
            row(Some("d@x.io"), 60, "D"),
        ];
        let groups = group_by_borrower(rows, &policy, now());
        let tiers: Vec<_> = groups.iter().map(|g| (g.email.as_str(), g.max_tier)).collect();
        assert_eq!(
            tiers,
            vec![
                ("a@x.io", EscalationTier::Reminder),
                ("b@x.io", EscalationTier::Second),
                ("c@x.io", EscalationTier::Final),
            ]
        );
    }

    #[test]
    fn borrowers_are_grouped_by_normalized_email_in_first_seen_order() {
        let policy = DuePolicy::default();
        let rows = vec![
            row(Some(" Ada@X.io "), 80, "A"),
            row(Some("zed@x.io"), 80, "Z"),
            row(Some("ada@x.io"), 200, "B"),
            row(None, 300, "N"),
            row(Some("   "), 300, "W"),
        ];
        let groups = group_by_borrower(rows, &policy, now());
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].email, "ada@x.io");
        assert_eq!(groups[0].items.len(), 2);
        assert_eq!(groups[0].max_tier, EscalationTier::Second);
        assert_eq!(groups[0].student_name, "Ada Lovelace");
        assert_eq!(groups[1].email, "zed@x.io");
    }

    #[test]
    fn missing_checkout_time_counts_as_exactly_due() {
        let policy = DuePolicy::default();
        assert_eq!(hours_overdue(None, &policy, now()), 72.0);

        let mut undated = row(Some("a@x.io"), 0, "A");
        undated.checked_out_at = None;
        let groups = group_by_borrower(vec![undated], &policy, now());
        assert_eq!(groups[0].max_tier, EscalationTier::Overdue);
    }

    #[test]
    fn rendering_escapes_borrower_text() {
        let mut hostile = row(Some("a@x.io"), 130, "<b>1</b>");
        hostile.first_name = Some("<script>".into());
        let groups = group_by_borrower(vec![hostile], &DuePolicy::default(), now());

        let email = render_reminder(&groups[0], &DuePolicy::default());
        assert_eq!(email.subject, "Reminder - ItemTraxx overdue item");
        assert!(email.html.contains("&lt;script&gt;"));
        assert!(email.html.contains("(&lt;b&gt;1&lt;/b&gt;)"));
        assert!(!email.html.contains("<script>"));
        assert!(email.html.contains("Due limit: 72 hours."));
    }

    #[test]
    fn student_id_is_shown_only_when_known() {
        let groups = group_by_borrower(vec![row(Some("a@x.io"), 130, "A")], &DuePolicy::default(), now());
        let email = render_reminder(&groups[0], &DuePolicy::default());
        assert!(email.html.contains("<p>Hello Ada Lovelace,</p><p>Student ID: S-1</p>"));

        let mut unknown = row(Some("b@x.io"), 130, "B");
        unknown.student_id = None;
        let groups = group_by_borrower(vec![unknown], &DuePolicy::default(), now());
        let email = render_reminder(&groups[0], &DuePolicy::default());
        assert!(!email.html.contains("Student ID"));
    }

    #[tokio::test]
    async fn one_failed_recipient_does_not_stop_the_batch() {
        let policy = DuePolicy::default();
        let rows = vec![
            row(Some("a@x.io"), 130, "A"),
            row(Some("bad@x.io"), 250, "B"),
            row(Some("c@x.io"), 250, "C"),
        ];
        let reminders = group_by_borrower(rows, &policy, now());
        let mailer = RecordingMailer {
            reject: vec!["bad@x.io"],
            ..Default::default()
        };

        let summary = dispatch(&mailer, policy, &reminders).await;
        assert_eq!(mailer.sent.lock().unwrap().len(), 3);
        assert_eq!(summary.sent, 2);
        assert_eq!(summary.recipients, 3);
        assert_eq!(
            summary.escalation_recipients,
            EscalationRecipients { level_1: 1, level_2: 0, level_3: 1 }
        );
    }

    #[tokio::test]
    async fn no_overdue_rows_means_no_provider_calls() {
        let mailer = RecordingMailer::default();
        let summary = dispatch(&mailer, DuePolicy::default(), &[]).await;
        assert!(mailer.sent.lock().unwrap().is_empty());
        assert_eq!(summary.sent, 0);
        assert_eq!(summary.recipients, 0);

        let value = serde_json::to_value(&summary).unwrap();
        assert_eq!(value["due_hours"], 72);
        assert_eq!(value["escalation_recipients"]["level_3"], 0);
    }

    // ---
    // Varredura completa contra o banco
    // ---

    use crate::db::PolicyRepository;
    use sqlx::PgPool;

    async fn seed_loan(
        pool: &PgPool,
        tenant_id: Uuid,
        email: Option<&str>,
        barcode: &str,
        hours_ago: i64,
    ) {
        let student: Uuid = sqlx::query_scalar(
            r#"
            INSERT INTO students (tenant_id, first_name, last_name, student_id, email)
            VALUES ($1, 'Ada', 'Lovelace', $2, $3)
            RETURNING id
            "#,
        )
        .bind(tenant_id)
        .bind(format!("S-{barcode}"))
        .bind(email)
        .fetch_one(pool)
        .await
        .unwrap();

        sqlx::query(
            r#"
            INSERT INTO gear (tenant_id, name, barcode, status, checked_out_by, checked_out_at)
            VALUES ($1, 'Camera', $2, 'checked_out', $3, $4)
            "#,
        )
        .bind(tenant_id)
        .bind(barcode)
        .bind(student)
        .bind(now() - Duration::hours(hours_ago))
        .execute(pool)
        .await
        .unwrap();
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn overdue_scan_mails_each_borrower_once(pool: PgPool) {
        let tenant = Uuid::new_v4();
        seed_loan(&pool, tenant, Some("a@x.io"), "A", 130).await;
        seed_loan(&pool, tenant, Some("b@x.io"), "B", 170).await;
        seed_loan(&pool, tenant, Some("c@x.io"), "C", 250).await;
        seed_loan(&pool, tenant, Some("d@x.io"), "D", 60).await;
        seed_loan(&pool, tenant, None, "E", 200).await;
        seed_loan(&pool, Uuid::new_v4(), Some("other@x.io"), "F", 300).await;

        let mailer = Arc::new(RecordingMailer::default());
        let provider: Arc<dyn Mailer> = mailer.clone();
        let service = ReminderService::new(
            GearRepository::new(pool.clone()),
            PolicyService::new(PolicyRepository::new(pool.clone()), pool.clone()),
            Some(provider),
        );

        let summary = service.send_overdue_reminders(tenant, now()).await.unwrap();

        assert_eq!(summary.sent, 3);
        assert_eq!(summary.recipients, 3);
        assert_eq!(
            summary.escalation_recipients,
            EscalationRecipients { level_1: 1, level_2: 1, level_3: 1 }
        );
        let to: Vec<String> = mailer.sent.lock().unwrap().iter().map(|e| e.to.clone()).collect();
        assert_eq!(to, vec!["c@x.io", "b@x.io", "a@x.io"]);
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn no_provider_means_no_scan(pool: PgPool) {
        let service = ReminderService::new(
            GearRepository::new(pool.clone()),
            PolicyService::new(PolicyRepository::new(pool.clone()), pool.clone()),
            None,
        );
        assert_matches::assert_matches!(
            service.send_overdue_reminders(Uuid::new_v4(), now()).await,
            Err(AppError::ProviderNotConfigured)
        );
    }
}
