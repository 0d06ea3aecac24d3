use axum::{extract::State, routing::post, Extension, Json, Router};
use chrono::{Duration, Utc};
use jsonwebtoken::{encode, EncodingKey, Header};
use rihla_core::user::User;
use serde::Serialize;

use crate::{error::AppError, middleware::auth::SessionClaims, state::AppState};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SessionResponse {
    token: String,
    expires_in: u64,
    user: User,
}

/// Mounted behind the bearer identity middleware.
pub fn routes() -> Router<AppState> {
    Router::new().route("/api/auth/session", post(create_session))
}

pub fn issue_session(state: &AppState, user: &User) -> Result<String, AppError> {
    let claims = SessionClaims {
        sub: user.id.to_string(),
        email: user.email.clone(),
        name: user.name.clone(),
        role: user.role.to_string(),
        exp: (Utc::now() + Duration::seconds(state.auth.expiration as i64)).timestamp() as usize,
    };

    encode(&Header::default(), &claims, &EncodingKey::from_secret(state.auth.secret.as_bytes()))
        .map_err(|e| AppError::InternalServerError(format!("Token encoding failed: {}", e)))
}

/// POST /api/auth/session
/// Exchange the bearer identity for a signed customer session
async fn create_session(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
) -> Result<Json<SessionResponse>, AppError> {
    let token = issue_session(&state, &user)?;
    tracing::info!("Issued session for user {}", user.id);

    Ok(Json(SessionResponse { token, expires_in: state.auth.expiration, user }))
}
