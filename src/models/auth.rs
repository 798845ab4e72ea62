// src/models/auth.rs

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

// Estrutura de dados ("claims") dentro do access token
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,  // ID do usuário autenticado
    pub exp: usize, // Expiração
    #[serde(default)]
    pub aud: Option<String>,
}

// Linha da tabela profiles
#[derive(Debug, Clone, FromRow)]
pub struct Profile {
    pub id: Uuid,
    pub tenant_id: Option<Uuid>,
    pub role: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    TenantAdmin,
    TenantUser,
}

impl Role {
    /// Qualquer outro papel (super admin, aluno, ...) não usa este endpoint.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "tenant_admin" => Some(Role::TenantAdmin),
            "tenant_user" => Some(Role::TenantUser),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Role::TenantAdmin => "tenant_admin",
            Role::TenantUser => "tenant_user",
        }
    }
}

/// Quem está chamando, já resolvido: identidade, loja e papel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Caller {
    pub user_id: Uuid,
    pub tenant_id: Uuid,
    pub role: Role,
}

impl Caller {
    pub fn from_profile(profile: Profile) -> Option<Self> {
        let tenant_id = profile.tenant_id?;
        let role = profile.role.as_deref().and_then(Role::parse)?;
        Some(Self {
            user_id: profile.id,
            tenant_id,
            role,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile(tenant_id: Option<Uuid>, role: Option<&str>) -> Profile {
        Profile {
            id: Uuid::new_v4(),
            tenant_id,
            role: role.map(str::to_string),
        }
    }

    #[test]
    fn caller_requires_tenant_and_known_role() {
        let tenant = Some(Uuid::new_v4());
        assert!(Caller::from_profile(profile(tenant, Some("tenant_admin"))).is_some());
        assert!(Caller::from_profile(profile(tenant, Some("tenant_user"))).is_some());
        assert!(Caller::from_profile(profile(tenant, Some("super_admin"))).is_none());
        assert!(Caller::from_profile(profile(tenant, None)).is_none());
        assert!(Caller::from_profile(profile(None, Some("tenant_admin"))).is_none());
    }
}
