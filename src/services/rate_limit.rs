// src/services/rate_limit.rs

use chrono::{DateTime, TimeZone, Utc};

use crate::{
    common::error::AppError,
    db::RateLimitRepository,
    models::auth::{Caller, Role},
};

pub const WINDOW_SECONDS: i64 = 60;

/// Escopo do balde: cada papel tem sua própria cota.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateScope {
    Admin,
    Tenant,
}

impl RateScope {
    pub fn for_role(role: Role) -> Self {
        match role {
            Role::TenantAdmin => RateScope::Admin,
            Role::TenantUser => RateScope::Tenant,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            RateScope::Admin => "admin",
            RateScope::Tenant => "tenant",
        }
    }

    /// Requisições por janela.
    pub fn capacity(self) -> i32 {
        match self {
            RateScope::Admin => 30,
            RateScope::Tenant => 25,
        }
    }
}

/// Cada usuário tem o próprio balde dentro da loja e do escopo do papel.
pub fn bucket_key(caller: &Caller, scope: RateScope) -> String {
    format!("{}:{}:{}", scope.as_str(), caller.tenant_id, caller.user_id)
}

// ---
// Janela fixa
// ---
#[derive(Debug, Clone, Copy)]
pub struct FixedWindow {
    seconds: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateDecision {
    Allowed { remaining: i32 },
    Limited { retry_after_secs: u64 },
}

impl FixedWindow {
    pub fn new(seconds: i64) -> Self {
        Self { seconds: seconds.max(1) }
    }

    /// Início da janela que contém `now`.
    pub fn start_of(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        let start = now.timestamp().div_euclid(self.seconds) * self.seconds;
        Utc.timestamp_opt(start, 0).single().unwrap_or(now)
    }

    pub fn decide(&self, hits: i32, capacity: i32, now: DateTime<Utc>) -> RateDecision {
        if hits <= capacity {
            return RateDecision::Allowed { remaining: capacity - hits };
        }
        let window_end = self.start_of(now).timestamp() + self.seconds;
        let retry_after_secs = (window_end - now.timestamp()).max(1) as u64;
        RateDecision::Limited { retry_after_secs }
    }
}

// ---
// O limitador em si: contador atômico no Postgres
// ---
#[derive(Clone)]
pub struct RateLimiter {
    repo: RateLimitRepository,
    window: FixedWindow,
}

impl RateLimiter {
    pub fn new(repo: RateLimitRepository) -> Self {
        Self {
            repo,
            window: FixedWindow::new(WINDOW_SECONDS),
        }
    }

    pub async fn consume(&self, caller: &Caller, now: DateTime<Utc>) -> Result<(), AppError> {
        let scope = RateScope::for_role(caller.role);
        let key = bucket_key(caller, scope);

        let hits = self
            .repo
            .consume(&key, self.window.start_of(now))
            .await
            .map_err(AppError::RateLimitUnavailable)?;

        match self.window.decide(hits, scope.capacity(), now) {
            RateDecision::Allowed { .. } => Ok(()),
            RateDecision::Limited { retry_after_secs } => {
                tracing::warn!(
                    tenant_id = %caller.tenant_id,
                    user_id = %caller.user_id,
                    scope = scope.as_str(),
                    retry_after_secs,
                    "Limite de requisições atingido"
                );
                Err(AppError::RateLimited { retry_after_secs })
            }
        }
    }
}
