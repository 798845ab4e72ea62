// src/config.rs

use std::{env, sync::Arc, time::Duration};

use anyhow::Context;
use sqlx::{postgres::PgPoolOptions, PgPool};

use crate::{
    db::{
        GearRepository, HistoryRepository, PolicyRepository, ProfileRepository,
        RateLimitRepository, RuntimeConfigRepository,
    },
    services::{
        auth::AuthService,
        import_service::ImportService,
        mailer::{Mailer, ResendMailer},
        notification_service::NotificationService,
        policy_service::PolicyService,
        rate_limit::RateLimiter,
        reminder_service::ReminderService,
        status_tracking_service::StatusTrackingService,
    },
};

const DEFAULT_JWT_AUDIENCE: &str = "authenticated";
const DEFAULT_EMAIL_FROM: &str = "no-reply@gear-ops.local";
const DEFAULT_EMAIL_API_URL: &str = "https://api.resend.com/emails";

#[derive(Debug, Clone)]
pub struct JwtSettings {
    pub secret: String,
    pub audience: String,
}

#[derive(Debug, Clone)]
pub struct EmailSettings {
    pub api_key: String,
    pub from_address: String,
    pub api_url: String,
}

/// Configuração lida do ambiente (e do `.env`, se existir).
///
/// | Variável          | Obrigatória | Padrão                          |
/// |-------------------|-------------|---------------------------------|
/// | `DATABASE_URL`    | sim         | —                               |
/// | `JWT_SECRET`      | por request | — (ausente → 500)               |
/// | `JWT_AUDIENCE`    | não         | `authenticated`                 |
/// | `ALLOWED_ORIGINS` | não         | vazio                           |
/// | `RESEND_API_KEY`  | por request | — (ausente → sem lembretes)     |
/// | `EMAIL_FROM`      | não         | `no-reply@gear-ops.local`       |
/// | `EMAIL_API_URL`   | não         | `https://api.resend.com/emails` |
/// | `HOST` / `PORT`   | não         | `0.0.0.0` / `3000`              |
/// | `RUN_MIGRATIONS`  | não         | `true`                          |
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub host: String,
    pub port: u16,
    pub run_migrations: bool,
    pub allowed_origins: Vec<String>,
    pub jwt: Option<JwtSettings>,
    pub email: Option<EmailSettings>,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = env::var("DATABASE_URL").context("DATABASE_URL deve ser definida")?;

        let port = match env::var("PORT") {
            Ok(raw) => raw.parse().context("PORT deve ser um u16 válido")?,
            Err(_) => 3000,
        };

        let jwt = non_empty_var("JWT_SECRET").map(|secret| JwtSettings {
            secret,
            audience: non_empty_var("JWT_AUDIENCE")
                .unwrap_or_else(|| DEFAULT_JWT_AUDIENCE.to_string()),
        });

        let email = non_empty_var("RESEND_API_KEY").map(|api_key| EmailSettings {
            api_key,
            from_address: non_empty_var("EMAIL_FROM")
                .unwrap_or_else(|| DEFAULT_EMAIL_FROM.to_string()),
            api_url: non_empty_var("EMAIL_API_URL")
                .unwrap_or_else(|| DEFAULT_EMAIL_API_URL.to_string()),
        });

        Ok(Self {
            database_url,
            host: non_empty_var("HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            port,
            run_migrations: non_empty_var("RUN_MIGRATIONS")
                .map(|raw| !matches!(raw.as_str(), "0" | "false" | "no"))
                .unwrap_or(true),
            allowed_origins: parse_origins(&env::var("ALLOWED_ORIGINS").unwrap_or_default()),
            jwt,
            email,
        })
    }

    pub fn is_origin_allowed(&self, origin: &str) -> bool {
        self.allowed_origins.iter().any(|allowed| allowed == origin)
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn parse_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|origin| !origin.is_empty())
        .map(str::to_string)
        .collect()
}

// O estado compartilhado que será acessível em toda a aplicação
#[derive(Clone)]
pub struct AppState {
    pub db_pool: PgPool,
    pub config: Arc<Config>,
    pub auth_service: AuthService,
    pub policy_service: PolicyService,
    pub notification_service: NotificationService,
    pub status_tracking_service: StatusTrackingService,
    pub reminder_service: ReminderService,
    pub import_service: ImportService,
    pub runtime_config_repo: RuntimeConfigRepository,
}

impl AppState {
    pub async fn new(config: Config) -> anyhow::Result<Self> {
        // Conecta ao banco de dados, usando '?' para propagar erros
        let db_pool = PgPoolOptions::new()
            .max_connections(5)
            .acquire_timeout(Duration::from_secs(3))
            .connect(&config.database_url)
            .await
            .context("Falha ao conectar ao banco de dados")?;

        tracing::info!("✅ Conexão com o banco de dados estabelecida com sucesso!");

        Self::with_pool(db_pool, config)
    }

    /// Monta o gráfico de dependências em cima de uma pool já criada.
    pub fn with_pool(db_pool: PgPool, config: Config) -> anyhow::Result<Self> {
        let mailer: Option<Arc<dyn Mailer>> = match &config.email {
            Some(settings) => Some(Arc::new(
                ResendMailer::new(settings.clone()).context("Falha ao criar o cliente de e-mail")?,
            )),
            None => {
                tracing::warn!("RESEND_API_KEY ausente: lembretes de atraso ficam desativados");
                None
            }
        };

        let profile_repo = ProfileRepository::new(db_pool.clone());
        let gear_repo = GearRepository::new(db_pool.clone());
        let history_repo = HistoryRepository::new(db_pool.clone());
        let policy_repo = PolicyRepository::new(db_pool.clone());
        let rate_limit_repo = RateLimitRepository::new(db_pool.clone());
        let runtime_config_repo = RuntimeConfigRepository::new(db_pool.clone());

        let rate_limiter = RateLimiter::new(rate_limit_repo);
        let auth_service = AuthService::new(profile_repo, rate_limiter, config.jwt.clone());
        let policy_service = PolicyService::new(policy_repo, db_pool.clone());
        let notification_service = NotificationService::new(
            gear_repo.clone(),
            history_repo.clone(),
            policy_service.clone(),
        );
        let status_tracking_service = StatusTrackingService::new(
            gear_repo.clone(),
            history_repo.clone(),
            policy_service.clone(),
        );
        let reminder_service =
            ReminderService::new(gear_repo.clone(), policy_service.clone(), mailer);
        let import_service = ImportService::new(gear_repo, history_repo, db_pool.clone());

        Ok(Self {
            db_pool,
            config: Arc::new(config),
            auth_service,
            policy_service,
            notification_service,
            status_tracking_service,
            reminder_service,
            import_service,
            runtime_config_repo,
        })
    }
}
