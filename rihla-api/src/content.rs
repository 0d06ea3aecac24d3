//! Blog posts, tourism news and bundles share one set of handlers. Each
//! collection gets its own routes with the [`ContentKind`] attached as an
//! extension.

use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post, put},
    Extension, Json, Router,
};
use rihla_core::content::{self, ContentEntry, ContentFilter, ContentKind, ContentRequest};
use rihla_core::policy::{can, Action, Resource};
use rihla_core::user::User;
use rihla_shared::Language;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::info;

use crate::admin::require;
use crate::error::AppError;
use crate::extract::{json_object, paginated, parse_param, AppJson, AppPath, AppQuery};
use crate::middleware::Viewer;
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct ContentQuery {
    pub lang: Option<String>,
    pub category: Option<String>,
    pub search: Option<String>,
    pub published: Option<String>,
    pub featured: Option<String>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

impl ContentQuery {
    fn filter(&self, kind: ContentKind) -> Result<ContentFilter, AppError> {
        Ok(ContentFilter {
            kind: Some(kind),
            published: parse_param::<bool>(self.published.as_deref())?,
            featured: parse_param::<bool>(self.featured.as_deref())?,
            category: self.category.as_deref().map(str::trim).filter(|c| !c.is_empty()).map(str::to_string),
            search: self.search.clone(),
        })
    }

    fn language(&self, state: &AppState) -> Result<Language, AppError> {
        Ok(parse_param::<Language>(self.lang.as_deref())?.unwrap_or(state.settings.default_language))
    }
}

fn collection(kind: ContentKind) -> String {
    format!("/api/{}", kind.path())
}

pub fn public_routes() -> Router<AppState> {
    ContentKind::ALL.iter().fold(Router::new(), |router, &kind| {
        let base = collection(kind);
        router.merge(
            Router::new()
                .route(&base, get(list_published))
                .route(&format!("{}/{{id}}", base), get(get_by_id))
                .route(&format!("{}/slug/{{slug}}", base), get(get_by_slug))
                .layer(Extension(kind)),
        )
    })
}

/// Mounted behind the bearer identity middleware.
pub fn admin_routes() -> Router<AppState> {
    ContentKind::ALL.iter().fold(Router::new(), |router, &kind| {
        let base = collection(kind);
        router.merge(
            Router::new()
                .route(&base, post(create_content))
                .route(&format!("{}/{{id}}", base), put(update_content).delete(delete_content))
                .route(&format!("/api/admin/{}", kind.path()), get(admin_list))
                .layer(Extension(kind)),
        )
    })
}

fn not_found(kind: ContentKind, key: impl std::fmt::Display) -> AppError {
    AppError::NotFoundError(format!("{} {} not found", kind.label(), key))
}

/// Drafts are only visible to content managers.
fn visible(entry: Option<ContentEntry>, viewer: &Viewer) -> Option<ContentEntry> {
    entry.filter(|e| {
        e.attributes.published
            || viewer.0.as_ref().is_some_and(|user| can(user, Action::ManageContent, Resource::Platform))
    })
}

// ============================================================================
// Public Handlers
// ============================================================================

/// GET /api/{blogs|news|bundles}
pub async fn list_published(
    State(state): State<AppState>,
    Extension(kind): Extension<ContentKind>,
    AppQuery(query): AppQuery<ContentQuery>,
) -> Result<Json<Value>, AppError> {
    let language = query.language(&state)?;
    let filter = ContentFilter { published: Some(true), ..query.filter(kind)? };
    let page = state.content.list_entries(&filter, state.page(query.page, query.limit)).await?;
    let fallback = state.settings.default_language;

    let mut body = paginated(kind.path(), page.map(|e| e.localized(language, fallback)))?;
    body.insert("language".into(), json!(language));
    Ok(json_object(body))
}

/// GET /api/{blogs|news|bundles}/{id}
pub async fn get_by_id(
    State(state): State<AppState>,
    Extension(kind): Extension<ContentKind>,
    Extension(viewer): Extension<Viewer>,
    AppPath(id): AppPath<i64>,
    AppQuery(query): AppQuery<ContentQuery>,
) -> Result<Json<Value>, AppError> {
    let language = query.language(&state)?;
    let entry = visible(state.content.get_entry(kind, id).await?, &viewer).ok_or_else(|| not_found(kind, id))?;

    Ok(Json(json!(entry.localized(language, state.settings.default_language))))
}

/// GET /api/{blogs|news|bundles}/slug/{slug}
pub async fn get_by_slug(
    State(state): State<AppState>,
    Extension(kind): Extension<ContentKind>,
    Extension(viewer): Extension<Viewer>,
    AppPath(slug): AppPath<String>,
    AppQuery(query): AppQuery<ContentQuery>,
) -> Result<Json<Value>, AppError> {
    let language = query.language(&state)?;
    let entry = visible(state.content.find_by_slug(kind, &slug).await?, &viewer)
        .ok_or_else(|| not_found(kind, format!("'{}'", slug)))?;

    Ok(Json(json!(entry.localized(language, state.settings.default_language))))
}

// ============================================================================
// Admin Handlers
// ============================================================================

/// POST /api/{blogs|news|bundles}
/// Create an entry with one translation row per language
pub async fn create_content(
    State(state): State<AppState>,
    Extension(kind): Extension<ContentKind>,
    Extension(user): Extension<User>,
    AppJson(request): AppJson<ContentRequest>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    require(&user, Action::ManageContent)?;
    let entry = content::create_entry(state.content.as_ref(), kind, &request).await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "entry": entry,
            "message": format!("{} created successfully", kind.label()),
        })),
    ))
}

/// PUT /api/{blogs|news|bundles}/{id}
pub async fn update_content(
    State(state): State<AppState>,
    Extension(kind): Extension<ContentKind>,
    Extension(user): Extension<User>,
    AppPath(id): AppPath<i64>,
    AppJson(request): AppJson<ContentRequest>,
) -> Result<Json<Value>, AppError> {
    require(&user, Action::ManageContent)?;
    let entry = content::update_entry(state.content.as_ref(), kind, id, &request).await?;

    Ok(Json(json!({
        "entry": entry,
        "message": format!("{} updated successfully", kind.label()),
    })))
}

/// DELETE /api/{blogs|news|bundles}/{id}
pub async fn delete_content(
    State(state): State<AppState>,
    Extension(kind): Extension<ContentKind>,
    Extension(user): Extension<User>,
    AppPath(id): AppPath<i64>,
) -> Result<StatusCode, AppError> {
    require(&user, Action::ManageContent)?;
    if !state.content.delete_entry(kind, id).await? {
        return Err(not_found(kind, id));
    }
    info!("Deleted {} {} (by user {})", kind.label(), id, user.id);
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/admin/{blogs|news|bundles}
/// Every entry, drafts included, with all translations
pub async fn admin_list(
    State(state): State<AppState>,
    Extension(kind): Extension<ContentKind>,
    Extension(user): Extension<User>,
    AppQuery(query): AppQuery<ContentQuery>,
) -> Result<Json<Value>, AppError> {
    require(&user, Action::ViewAdminListings)?;
    let page = state
        .content
        .list_entries(&query.filter(kind)?, state.page(query.page, query.limit))
        .await?;

    Ok(json_object(paginated(kind.path(), page)?))
}
