// ABOUTME: Authentication middleware validating bearer tokens before any handler runs
// ABOUTME: Attaches the decoded claims to the request so handlers know the acting user

use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::Response,
};

use crate::AppState;
use crate::error::{AppError, Result};

pub async fn require_auth(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response> {
    let header_value = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .ok_or_else(|| AppError::Unauthorized("missing authorization header".to_string()))?;

    let token = header_value
        .strip_prefix("Bearer ")
        .ok_or_else(|| AppError::Unauthorized("expected a bearer token".to_string()))?;

    let claims = state.auth.verify(token)?;
    request.extensions_mut().insert(claims);

    Ok(next.run(request).await)
}
