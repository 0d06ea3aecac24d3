use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, put},
    Extension, Json, Router,
};
use chrono::Utc;
use rihla_core::offer::{OfferFilter, SpecialOfferDraft, SpecialOfferRequest};
use rihla_core::policy::Action;
use rihla_core::service::ServiceType;
use rihla_core::user::User;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::info;

use crate::admin::require;
use crate::error::AppError;
use crate::extract::{json_object, paginated, parse_param, AppJson, AppPath, AppQuery};
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OfferQuery {
    pub active: Option<String>,
    pub service_type: Option<String>,
    pub search: Option<String>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

pub fn public_routes() -> Router<AppState> {
    Router::new().route("/api/special-offers", get(list_live_offers))
}

/// Mounted behind the bearer identity middleware.
pub fn admin_routes() -> Router<AppState> {
    Router::new()
        .route("/api/admin/special-offers", get(admin_list).post(create_offer))
        .route("/api/admin/special-offers/{id}", put(update_offer).delete(delete_offer))
}

fn not_found(id: i64) -> AppError {
    AppError::NotFoundError(format!("Special offer {} not found", id))
}

/// GET /api/special-offers
/// Active offers valid today
pub async fn list_live_offers(
    State(state): State<AppState>,
    AppQuery(query): AppQuery<OfferQuery>,
) -> Result<Json<Value>, AppError> {
    let filter = OfferFilter {
        active: Some(true),
        service_type: parse_param::<ServiceType>(query.service_type.as_deref())?,
        search: query.search,
        live_on: Some(Utc::now().date_naive()),
    };
    let page = state.offers.list_offers(&filter, state.page(query.page, query.limit)).await?;

    Ok(json_object(paginated("specialOffers", page)?))
}

/// GET /api/admin/special-offers
pub async fn admin_list(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    AppQuery(query): AppQuery<OfferQuery>,
) -> Result<Json<Value>, AppError> {
    require(&user, Action::ViewAdminListings)?;

    let filter = OfferFilter {
        active: parse_param::<bool>(query.active.as_deref())?,
        service_type: parse_param::<ServiceType>(query.service_type.as_deref())?,
        search: query.search,
        live_on: None,
    };
    let page = state.offers.list_offers(&filter, state.page(query.page, query.limit)).await?;

    Ok(json_object(paginated("specialOffers", page)?))
}

/// POST /api/admin/special-offers
pub async fn create_offer(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    AppJson(request): AppJson<SpecialOfferRequest>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    require(&user, Action::ManageOffers)?;
    let draft = SpecialOfferDraft::from_request(request)?;
    let offer = state.offers.create_offer(&draft).await?;
    info!("Special offer {} created by user {}", offer.id, user.id);

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "specialOffer": offer,
            "message": "Special offer created successfully",
        })),
    ))
}

/// PUT /api/admin/special-offers/{id}
/// Partial update; omitted fields keep their current values
pub async fn update_offer(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    AppPath(id): AppPath<i64>,
    AppJson(request): AppJson<SpecialOfferRequest>,
) -> Result<Json<Value>, AppError> {
    require(&user, Action::ManageOffers)?;
    let existing = state.offers.get_offer(id).await?.ok_or_else(|| not_found(id))?;
    let draft = SpecialOfferDraft::merge(&existing, request)?;
    let offer = state.offers.update_offer(id, &draft).await?;

    Ok(Json(json!({
        "specialOffer": offer,
        "message": "Special offer updated successfully",
    })))
}

/// DELETE /api/admin/special-offers/{id}
pub async fn delete_offer(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    AppPath(id): AppPath<i64>,
) -> Result<StatusCode, AppError> {
    require(&user, Action::ManageOffers)?;
    if !state.offers.delete_offer(id).await? {
        return Err(not_found(id));
    }
    Ok(StatusCode::NO_CONTENT)
}
