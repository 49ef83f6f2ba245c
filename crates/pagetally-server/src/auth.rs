use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::{IntoResponse, Response},
};
use sha2::{Digest, Sha256};

use crate::{error::AppError, state::AppState};

/// SHA-256 of the admin password. Only the digest is kept in memory.
pub fn password_digest(password: &str) -> [u8; 32] {
    Sha256::digest(password.as_bytes()).into()
}

/// Guard for `/api/*` when `PAGETALLY_ADMIN_PASSWORD` is set.
///
/// Expects `Authorization: Bearer <password>`. With no password configured
/// every request passes through.
pub async fn require_admin(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Response {
    let Some(expected) = state.admin_digest() else {
        return next.run(request).await;
    };

    let provided = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim);

    match provided {
        Some(token) if password_digest(token) == *expected => next.run(request).await,
        _ => AppError::Unauthorized.into_response(),
    }
}
