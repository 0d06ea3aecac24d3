use axum::{
    extract::State,
    http::StatusCode,
    routing::{delete, get, patch},
    Extension, Json, Router,
};
use rihla_core::notification::{NotificationCategory, NotificationFilter};
use rihla_core::user::User;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::error::AppError;
use crate::extract::{json_object, paginated, parse_param, AppPath, AppQuery};
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationQuery {
    pub unread_only: Option<bool>,
    pub category: Option<String>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/notifications", get(list_notifications))
        .route("/api/notifications/unread-count", get(unread_count))
        .route("/api/notifications/read-all", patch(mark_all_read))
        .route("/api/notifications/{id}/read", patch(mark_read))
        .route("/api/notifications/{id}", delete(delete_notification))
}

fn not_found(id: i64) -> AppError {
    AppError::NotFoundError(format!("Notification {} not found", id))
}

/// GET /api/notifications
pub async fn list_notifications(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    AppQuery(query): AppQuery<NotificationQuery>,
) -> Result<Json<Value>, AppError> {
    let filter = NotificationFilter {
        unread_only: query.unread_only.unwrap_or(false),
        category: parse_param::<NotificationCategory>(query.category.as_deref())?,
    };
    let page = state
        .notifications
        .list_notifications(user.id, &filter, state.page(query.page, query.limit))
        .await?;
    let unread = state.notifications.unread_count(user.id).await?;

    let mut body = paginated("notifications", page)?;
    body.insert("unreadCount".into(), json!(unread));
    Ok(json_object(body))
}

/// GET /api/notifications/unread-count
/// Polled by the client every 30 seconds
pub async fn unread_count(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let count = state.notifications.unread_count(user.id).await?;
    Ok(Json(json!({ "count": count })))
}

/// PATCH /api/notifications/{id}/read
pub async fn mark_read(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    AppPath(id): AppPath<i64>,
) -> Result<Json<Value>, AppError> {
    let notification = state.notifications.mark_read(user.id, id).await?.ok_or_else(|| not_found(id))?;
    Ok(Json(json!({ "notification": notification })))
}

/// PATCH /api/notifications/read-all
pub async fn mark_all_read(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let updated = state.notifications.mark_all_read(user.id).await?;
    Ok(Json(json!({ "updated": updated })))
}

/// DELETE /api/notifications/{id}
pub async fn delete_notification(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    AppPath(id): AppPath<i64>,
) -> Result<StatusCode, AppError> {
    if !state.notifications.delete_notification(user.id, id).await? {
        return Err(not_found(id));
    }
    Ok(StatusCode::NO_CONTENT)
}
