// src/middleware/rbac.rs

use crate::{
    common::error::AppError,
    models::{action::AdminAction, auth::Caller},
};

/// Confere se o papel de quem chama pode executar o comando.
pub fn authorize(caller: &Caller, action: &AdminAction) -> Result<(), AppError> {
    if action.allowed_roles().contains(&caller.role) {
        return Ok(());
    }

    tracing::info!(
        tenant_id = %caller.tenant_id,
        user_id = %caller.user_id,
        role = caller.role.as_str(),
        action = action.name(),
        "Ação negada para o papel"
    );
    Err(AppError::AccessDenied)
}
