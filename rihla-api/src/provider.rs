use axum::{extract::State, routing::get, routing::put, Extension, Json, Router};
use rihla_core::booking::{BookingFilter, BookingStatus};
use rihla_core::lifecycle::TransitionCommand;
use rihla_core::user::User;
use serde_json::{json, Value};

use crate::bookings::CustomerListQuery;
use crate::error::AppError;
use crate::extract::{json_object, paginated, parse_param, AppJson, AppPath, AppQuery};
use crate::state::AppState;

/// Mounted behind the bearer identity middleware.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/provider/bookings", get(list_bookings))
        .route("/api/provider/bookings/{id}", put(update_booking_status))
}

/// GET /api/provider/bookings
/// Bookings for every service the caller provides
pub async fn list_bookings(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    AppQuery(query): AppQuery<CustomerListQuery>,
) -> Result<Json<Value>, AppError> {
    let services = state.directory.services_of(user.id).await?;
    let filter = BookingFilter {
        services: Some(services),
        status: parse_param::<BookingStatus>(query.status.as_deref())?,
        ..Default::default()
    };
    let page = state.bookings.list_bookings(&filter, state.page(query.page, query.limit)).await?;

    Ok(json_object(paginated("bookings", page)?))
}

/// PUT /api/provider/bookings/{id}
/// Move one of the provider's bookings along the lifecycle
pub async fn update_booking_status(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    AppPath(id): AppPath<i64>,
    AppJson(command): AppJson<TransitionCommand>,
) -> Result<Json<Value>, AppError> {
    let booking = state.lifecycle().transition(&user, id, command).await?;

    Ok(Json(json!({
        "booking": booking,
        "message": "Booking status updated successfully",
    })))
}
