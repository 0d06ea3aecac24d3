use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use axum_extra::headers::{authorization::Bearer, Authorization, HeaderMapExt};
use jsonwebtoken::{decode, DecodingKey, Validation};
use rihla_core::user::User;
use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::state::AppState;

// ============================================================================
// Session Claims
// ============================================================================

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct SessionClaims {
    /// User id
    pub sub: String,
    pub email: String,
    pub name: String,
    pub role: String,
    pub exp: usize,
}

fn bearer_token(req: &Request) -> Option<String> {
    req.headers()
        .typed_get::<Authorization<Bearer>>()
        .map(|Authorization(bearer)| bearer.token().trim().to_string())
}

async fn load_user(state: &AppState, raw_id: &str) -> Result<User, AppError> {
    let id: i64 = raw_id
        .parse()
        .map_err(|_| AppError::AuthenticationError("Invalid credentials".to_string()))?;
    state
        .users
        .find_user(id)
        .await?
        .ok_or_else(|| AppError::AuthenticationError("Unknown user".to_string()))
}

// ============================================================================
// Bearer Identity Middleware
// ============================================================================

/// `Authorization: Bearer <userId>`. The user is loaded on every request so
/// role changes apply immediately.
pub async fn bearer_user_middleware(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = bearer_token(&req).ok_or_else(|| AppError::AuthenticationError("Authentication required".to_string()))?;
    let user = load_user(&state, &token).await?;

    req.extensions_mut().insert(user);
    Ok(next.run(req).await)
}

/// Whoever is calling a public route, if they identified themselves.
#[derive(Debug, Clone, Default)]
pub struct Viewer(pub Option<User>);

/// Public routes: anonymous requests pass, and an invalid identity is
/// treated as anonymous.
pub async fn optional_user_middleware(State(state): State<AppState>, mut req: Request, next: Next) -> Response {
    let user = match bearer_token(&req) {
        Some(token) => load_user(&state, &token).await.ok(),
        None => None,
    };
    req.extensions_mut().insert(Viewer(user));
    next.run(req).await
}

// ============================================================================
// Customer Session Middleware
// ============================================================================

pub async fn session_auth_middleware(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = bearer_token(&req).ok_or_else(|| AppError::AuthenticationError("Authentication required".to_string()))?;

    let token_data = decode::<SessionClaims>(
        &token,
        &DecodingKey::from_secret(state.auth.secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|_| AppError::AuthenticationError("Invalid or expired session".to_string()))?;

    let user = load_user(&state, &token_data.claims.sub).await?;

    req.extensions_mut().insert(user);
    req.extensions_mut().insert(token_data.claims);
    Ok(next.run(req).await)
}
