// src/db/profile_repo.rs

use sqlx::PgPool;
use uuid::Uuid;
use crate::{common::error::AppError, models::auth::Profile};

// O repositório de perfis: liga a identidade autenticada à loja e ao papel
#[derive(Clone)]
pub struct ProfileRepository {
    pool: PgPool,
}

impl ProfileRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    // Busca o perfil pelo ID do usuário autenticado
    pub async fn find_by_id(&self, user_id: Uuid) -> Result<Option<Profile>, AppError> {
        let profile = sqlx::query_as::<_, Profile>(
            "SELECT id, tenant_id, role FROM profiles WHERE id = $1",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(profile)
    }
}
