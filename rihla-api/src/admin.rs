use axum::{
    extract::State,
    http::StatusCode,
    routing::{delete, get},
    Extension, Json, Router,
};
use rihla_core::booking::{BookingFilter, BookingStatus, PaymentStatus};
use rihla_core::lifecycle::TransitionCommand;
use rihla_core::policy::{can, Action, Resource};
use rihla_core::service::ServiceType;
use rihla_core::user::User;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::info;

use crate::error::AppError;
use crate::extract::{json_object, paginated, parse_param, AppJson, AppPath, AppQuery};
use crate::state::AppState;

// ============================================================================
// Request Types
// ============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminBookingUpdate {
    pub booking_id: i64,
    #[serde(flatten)]
    pub command: TransitionCommand,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminBookingQuery {
    pub status: Option<String>,
    pub service_type: Option<String>,
    pub payment_status: Option<String>,
    pub user_id: Option<i64>,
    pub search: Option<String>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

/// Platform-wide permission check for admin surfaces.
pub fn require(user: &User, action: Action) -> Result<(), AppError> {
    if can(user, action, Resource::Platform) {
        Ok(())
    } else {
        Err(AppError::AuthorizationError("Admin access required".to_string()))
    }
}

/// Mounted behind the bearer identity middleware.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/admin/bookings", get(list_bookings).put(update_booking))
        .route("/api/admin/bookings/{id}", delete(delete_booking))
        .route("/api/admin/bookings/{id}/history", get(booking_history))
}

// ============================================================================
// Handlers
// ============================================================================

/// GET /api/admin/bookings
pub async fn list_bookings(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    AppQuery(query): AppQuery<AdminBookingQuery>,
) -> Result<Json<Value>, AppError> {
    require(&user, Action::ViewAdminListings)?;

    let filter = BookingFilter {
        user_id: query.user_id,
        services: None,
        status: parse_param::<BookingStatus>(query.status.as_deref())?,
        service_type: parse_param::<ServiceType>(query.service_type.as_deref())?,
        payment_status: parse_param::<PaymentStatus>(query.payment_status.as_deref())?,
        search: query.search,
    };
    let page = state.bookings.list_bookings(&filter, state.page(query.page, query.limit)).await?;

    Ok(json_object(paginated("bookings", page)?))
}

/// PUT /api/admin/bookings
/// Status, payment status and notes; `override` is reserved for super admins
pub async fn update_booking(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    AppJson(update): AppJson<AdminBookingUpdate>,
) -> Result<Json<Value>, AppError> {
    let booking = state.lifecycle().transition(&user, update.booking_id, update.command).await?;

    Ok(Json(json!({
        "booking": booking,
        "message": "Booking updated successfully",
    })))
}

/// DELETE /api/admin/bookings/{id}
pub async fn delete_booking(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    AppPath(id): AppPath<i64>,
) -> Result<StatusCode, AppError> {
    require(&user, Action::DeleteBooking)?;

    if !state.bookings.delete_booking(id).await? {
        return Err(AppError::NotFoundError(format!("Booking {} not found", id)));
    }
    info!("Booking {} deleted by admin {}", id, user.id);
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/admin/bookings/{id}/history
/// The audit trail of status and payment changes
pub async fn booking_history(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    AppPath(id): AppPath<i64>,
) -> Result<Json<Value>, AppError> {
    require(&user, Action::ViewAdminListings)?;

    if state.bookings.get_booking(id).await?.is_none() {
        return Err(AppError::NotFoundError(format!("Booking {} not found", id)));
    }
    let changes = state.bookings.list_changes(id).await?;

    Ok(Json(json!({ "bookingId": id, "changes": changes })))
}
