// src/common/error.rs

use axum::{
    extract::rejection::JsonRejection,
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

// O tipo de erro do serviço. Toda falha vira `{ "error": "..." }`.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Unauthorized")]
    Unauthorized,

    #[error("Access denied")]
    AccessDenied,

    #[error("Origin not allowed")]
    OriginNotAllowed,

    #[error("Rate limit exceeded, please try again in a minute.")]
    RateLimited { retry_after_secs: u64 },

    #[error("Invalid request")]
    InvalidRequest,

    #[error("Invalid action")]
    InvalidAction,

    #[error("Invalid due time limit.")]
    InvalidPolicy,

    #[error("Provide between 1 and 1000 rows.")]
    InvalidBatchSize,

    #[error("Email provider is not configured. Set RESEND_API_KEY to send reminders.")]
    ProviderNotConfigured,

    #[error("Server misconfiguration: {0} is not set")]
    Misconfigured(&'static str),

    #[error("Rate limit check failed")]
    RateLimitUnavailable(#[source] sqlx::Error),

    // Erro de banco já com a mensagem que o cliente pode ver
    #[error("{message}")]
    UpstreamFailure {
        message: &'static str,
        #[source]
        source: sqlx::Error,
    },

    #[error("Erro de banco de dados: {0}")]
    DatabaseError(#[from] sqlx::Error),

    #[error("Erro interno do servidor: {0}")]
    InternalServerError(#[from] anyhow::Error),
}

impl AppError {
    /// Dá a um erro de banco a mensagem que o cliente deve ver.
    /// Outros erros passam intactos.
    pub fn context(self, message: &'static str) -> Self {
        match self {
            AppError::DatabaseError(source) => AppError::UpstreamFailure { message, source },
            other => other,
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Unauthorized => StatusCode::UNAUTHORIZED,
            AppError::AccessDenied | AppError::OriginNotAllowed => StatusCode::FORBIDDEN,
            AppError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            AppError::InvalidRequest
            | AppError::InvalidAction
            | AppError::InvalidPolicy
            | AppError::InvalidBatchSize => StatusCode::BAD_REQUEST,
            AppError::ProviderNotConfigured
            | AppError::Misconfigured(_)
            | AppError::RateLimitUnavailable(_)
            | AppError::UpstreamFailure { .. }
            | AppError::DatabaseError(_)
            | AppError::InternalServerError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        tracing::debug!(error = %rejection, "Corpo da requisição rejeitado");
        AppError::InvalidRequest
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        let error_message = match &self {
            AppError::Misconfigured(_) => {
                tracing::error!("{}", self);
                "Server misconfiguration".to_string()
            }
            AppError::RateLimitUnavailable(e) => {
                tracing::error!(error = %e, "Falha ao consumir o limite de requisições");
                self.to_string()
            }
            AppError::UpstreamFailure { message, source } => {
                tracing::error!(error = %source, "{}", message);
                message.to_string()
            }
            // O detalhe fica no log, o cliente recebe uma mensagem genérica.
            AppError::DatabaseError(_) | AppError::InternalServerError(_) => {
                tracing::error!("Erro Interno do Servidor: {}", self);
                "Request failed".to_string()
            }
            other => other.to_string(),
        };

        let mut response = match &self {
            AppError::RateLimited { retry_after_secs } => (
                status,
                Json(json!({
                    "error": error_message,
                    "retry_after_seconds": retry_after_secs,
                })),
            )
                .into_response(),
            _ => (status, Json(json!({ "error": error_message }))).into_response(),
        };

        if let AppError::RateLimited { retry_after_secs } = self {
            response
                .headers_mut()
                .insert(header::RETRY_AFTER, HeaderValue::from(retry_after_secs));
        }

        response
    }
}
