// src/middleware/cors.rs

use axum::{
    extract::{Request, State},
    http::{header, HeaderMap, HeaderValue, Method, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::{common::error::AppError, config::AppState};

const ALLOW_HEADERS: &str = "authorization, x-client-info, apikey, content-type";
const ALLOW_METHODS: &str = "POST, OPTIONS";

// Guarda de origem. Fica por fora de todas as rotas: responde o preflight e
// barra chamadas de origens fora da lista antes de qualquer autenticação.
pub async fn cors_guard(
    State(app_state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let origin = request
        .headers()
        .get(header::ORIGIN)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string);

    // Sem Origin (chamada servidor a servidor) sempre passa
    let allowed = origin
        .as_deref()
        .is_none_or(|origin| app_state.config.is_origin_allowed(origin));
    let allowed_origin = origin.filter(|_| allowed);

    let mut response = if request.method() == Method::OPTIONS {
        if allowed {
            (StatusCode::OK, "ok").into_response()
        } else {
            (StatusCode::FORBIDDEN, "Origin not allowed").into_response()
        }
    } else if !allowed {
        tracing::info!("Requisição de origem não permitida");
        AppError::OriginNotAllowed.into_response()
    } else {
        next.run(request).await
    };

    apply_cors_headers(response.headers_mut(), allowed_origin.as_deref());
    response
}

fn apply_cors_headers(headers: &mut HeaderMap, allowed_origin: Option<&str>) {
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_HEADERS,
        HeaderValue::from_static(ALLOW_HEADERS),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_METHODS,
        HeaderValue::from_static(ALLOW_METHODS),
    );
    headers.insert(header::VARY, HeaderValue::from_static("Origin"));

    if let Some(value) = allowed_origin.and_then(|origin| HeaderValue::from_str(origin).ok()) {
        headers.insert(header::ACCESS_CONTROL_ALLOW_ORIGIN, value);
    }
}
