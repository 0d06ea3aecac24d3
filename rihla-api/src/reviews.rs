use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Extension, Json, Router,
};
use rihla_core::review::ReviewRequest;
use rihla_core::service::{ServiceRef, ServiceType};
use rihla_core::user::User;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::error::AppError;
use crate::extract::{json_object, paginated, parse_param, AppJson, AppQuery};
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewQuery {
    pub service_type: Option<String>,
    pub service_id: Option<i64>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

/// Mounted behind the customer session middleware.
pub fn session_routes() -> Router<AppState> {
    Router::new().route("/api/reviews", post(create_review))
}

pub fn public_routes() -> Router<AppState> {
    Router::new().route("/api/reviews", get(list_reviews))
}

/// POST /api/reviews
/// Rate a completed booking, once
pub async fn create_review(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    AppJson(request): AppJson<ReviewRequest>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let review = state
        .lifecycle()
        .submit_review(state.reviews.as_ref(), &user, request)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "review": review,
            "message": "Review submitted successfully",
        })),
    ))
}

/// GET /api/reviews
/// Reviews for one service, or all of them, with the average rating
pub async fn list_reviews(
    State(state): State<AppState>,
    AppQuery(query): AppQuery<ReviewQuery>,
) -> Result<Json<Value>, AppError> {
    let service_type = parse_param::<ServiceType>(query.service_type.as_deref())?;
    let service = match (service_type, query.service_id) {
        (Some(service_type), Some(id)) => Some(ServiceRef::new(service_type, id)),
        (None, Some(_)) => return Err(AppError::ValidationError("serviceType is required with serviceId".into())),
        (_, None) => None,
    };

    let page = state.reviews.list_reviews(service, state.page(query.page, query.limit)).await?;
    let summary = state.reviews.rating_summary(service).await?;

    let mut body = paginated("reviews", page)?;
    body.insert("averageRating".into(), json!(summary.average_rating));
    body.insert("reviewCount".into(), json!(summary.review_count));
    Ok(json_object(body))
}
