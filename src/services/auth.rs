// src/services/auth.rs

use chrono::Utc;
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    config::JwtSettings,
    db::ProfileRepository,
    models::auth::{Caller, Claims},
    services::rate_limit::RateLimiter,
};

#[derive(Clone)]
pub struct AuthService {
    profile_repo: ProfileRepository,
    rate_limiter: RateLimiter,
    jwt: Option<JwtSettings>,
}

impl AuthService {
    pub fn new(
        profile_repo: ProfileRepository,
        rate_limiter: RateLimiter,
        jwt: Option<JwtSettings>,
    ) -> Self {
        Self { profile_repo, rate_limiter, jwt }
    }

    /// Resolve quem chama: token → identidade → loja/papel → cota.
    /// Roda antes de qualquer regra de negócio.
    pub async fn authenticate(&self, bearer: Option<&str>) -> Result<Caller, AppError> {
        let token = bearer.ok_or(AppError::Unauthorized)?;
        let user_id = self.validate_token(token)?;

        let caller = self.resolve_caller(user_id).await?;
        self.rate_limiter.consume(&caller, Utc::now()).await?;

        Ok(caller)
    }

    pub fn validate_token(&self, token: &str) -> Result<Uuid, AppError> {
        let settings = self.jwt.as_ref().ok_or(AppError::Misconfigured("JWT_SECRET"))?;
        validate_access_token(token, settings)
    }

    async fn resolve_caller(&self, user_id: Uuid) -> Result<Caller, AppError> {
        let profile = self
            .profile_repo
            .find_by_id(user_id)
            .await
            .map_err(|e| {
                tracing::warn!(%user_id, error = %e, "Falha ao buscar o perfil");
                AppError::AccessDenied
            })?
            .ok_or(AppError::AccessDenied)?;

        Caller::from_profile(profile).ok_or_else(|| {
            tracing::info!(%user_id, "Perfil sem loja ou com papel não permitido");
            AppError::AccessDenied
        })
    }
}

pub fn validate_access_token(token: &str, settings: &JwtSettings) -> Result<Uuid, AppError> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.set_audience(&[settings.audience.as_str()]);

    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(settings.secret.as_bytes()),
        &validation,
    )
    .map_err(|e| {
        tracing::debug!(error = %e, "Token rejeitado");
        AppError::Unauthorized
    })?;

    Ok(token_data.claims.sub)
}
