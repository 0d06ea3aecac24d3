use axum::{
    extract::State,
    http::StatusCode,
    routing::get,
    Extension, Json, Router,
};
use rihla_core::booking::{BookingCustomer, BookingFilter, BookingStatus, CreateBookingRequest, CustomerBookingUpdate};
use rihla_core::policy::Action;
use rihla_core::user::User;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::error::AppError;
use crate::extract::{json_object, paginated, parse_param, to_value, AppJson, AppPath, AppQuery};
use crate::middleware::SessionClaims;
use crate::state::AppState;

// ============================================================================
// Request Types
// ============================================================================

#[derive(Debug, Default, Deserialize)]
pub struct CustomerListQuery {
    pub status: Option<String>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

/// Mounted behind the customer session middleware.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/bookings", get(list_bookings).post(create_booking))
        .route("/api/bookings/{id}", get(get_booking).patch(update_booking))
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /api/bookings
/// Create a PENDING booking for the signed-in customer
pub async fn create_booking(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Extension(claims): Extension<SessionClaims>,
    AppJson(request): AppJson<CreateBookingRequest>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let customer = BookingCustomer {
        user_id: user.id,
        email: claims.email,
        name: Some(claims.name).filter(|n| !n.trim().is_empty()),
    };
    let booking = state.lifecycle().create(request, &customer).await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "booking": booking,
            "message": "Booking created successfully",
        })),
    ))
}

/// GET /api/bookings
/// The caller's own bookings, newest first
pub async fn list_bookings(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    AppQuery(query): AppQuery<CustomerListQuery>,
) -> Result<Json<Value>, AppError> {
    let filter = BookingFilter {
        user_id: Some(user.id),
        status: parse_param::<BookingStatus>(query.status.as_deref())?,
        ..Default::default()
    };
    let page = state.bookings.list_bookings(&filter, state.page(query.page, query.limit)).await?;

    Ok(json_object(paginated("bookings", page)?))
}

/// GET /api/bookings/{id}
pub async fn get_booking(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    AppPath(id): AppPath<i64>,
) -> Result<Json<Value>, AppError> {
    let (booking, info) = state.lifecycle().load(&user, Action::ViewBooking, id).await?;

    let mut body = serde_json::Map::new();
    body.insert("booking".into(), to_value(&booking)?);
    body.insert("serviceName".into(), Value::String(info.display_name));
    Ok(json_object(body))
}

/// PATCH /api/bookings/{id}
/// Edit contact phone or special requests, or cancel
pub async fn update_booking(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    AppPath(id): AppPath<i64>,
    AppJson(update): AppJson<CustomerBookingUpdate>,
) -> Result<Json<Value>, AppError> {
    let booking = state.lifecycle().customer_update(&user, id, update).await?;

    Ok(Json(json!({
        "booking": booking,
        "message": "Booking updated successfully",
    })))
}
