use axum::{
    extract::State,
    http::{header, Method},
    middleware::{from_fn_with_state, map_response_with_state},
    response::{IntoResponse, Response},
    Json, Router,
};
use serde_json::json;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub mod admin;
pub mod auth;
pub mod bookings;
pub mod content;
pub mod error;
pub mod extract;
pub mod middleware;
pub mod notifications;
pub mod offers;
pub mod provider;
pub mod reviews;
pub mod state;

pub use state::{ApiSettings, AppState, AuthConfig};

use error::ErrorDetails;
use middleware::{bearer_user_middleware, optional_user_middleware, session_auth_middleware};

pub fn app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::PATCH, Method::DELETE, Method::OPTIONS])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE, header::USER_AGENT]);

    // Customer session token
    let session_routes = Router::new()
        .merge(bookings::routes())
        .merge(reviews::session_routes())
        .route_layer(from_fn_with_state(state.clone(), session_auth_middleware));

    // Bearer user identity
    let identified_routes = Router::new()
        .merge(auth::routes())
        .merge(provider::routes())
        .merge(admin::routes())
        .merge(notifications::routes())
        .merge(content::admin_routes())
        .merge(offers::admin_routes())
        .route_layer(from_fn_with_state(state.clone(), bearer_user_middleware));

    let public_routes = Router::new()
        .merge(content::public_routes())
        .merge(reviews::public_routes())
        .merge(offers::public_routes())
        .route_layer(from_fn_with_state(state.clone(), optional_user_middleware));

    Router::new()
        .merge(session_routes)
        .merge(identified_routes)
        .merge(public_routes)
        .layer(map_response_with_state(state.clone(), expose_error_details))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Adds `details` to 500 bodies when the deployment allows it.
async fn expose_error_details(State(state): State<AppState>, mut response: Response) -> Response {
    let details = response.extensions_mut().remove::<ErrorDetails>();
    match details {
        Some(ErrorDetails(details)) if state.settings.expose_error_details => (
            response.status(),
            Json(json!({
                "error": "Internal Server Error",
                "details": details,
            })),
        )
            .into_response(),
        _ => response,
    }
}
