//! Extractors that reject with the JSON error envelope instead of axum's
//! plain-text bodies, plus small helpers shared by the listing handlers.

use axum::extract::{FromRequest, FromRequestParts};
use axum::Json;
use rihla_shared::Page;
use serde::Serialize;
use serde_json::{Map, Value};
use std::fmt::Display;
use std::str::FromStr;

use crate::error::AppError;

#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct AppJson<T>(pub T);

#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(AppError))]
pub struct AppPath<T>(pub T);

#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(AppError))]
pub struct AppQuery<T>(pub T);

/// Parses an optional query parameter, treating a blank value as absent.
pub fn parse_param<T>(raw: Option<&str>) -> Result<Option<T>, AppError>
where
    T: FromStr,
    T::Err: Display,
{
    match raw.map(str::trim).filter(|r| !r.is_empty()) {
        None => Ok(None),
        Some(raw) => T::from_str(raw)
            .map(Some)
            .map_err(|e| AppError::ValidationError(e.to_string())),
    }
}

/// `{ <key>: [...], pagination: {...} }`, with room for extra top-level fields.
pub fn paginated<T: Serialize>(key: &str, page: Page<T>) -> Result<Map<String, Value>, AppError> {
    let mut body = Map::new();
    body.insert(key.to_string(), to_value(&page.items)?);
    body.insert("pagination".to_string(), to_value(&page.meta)?);
    Ok(body)
}

pub fn to_value<T: Serialize>(value: &T) -> Result<Value, AppError> {
    serde_json::to_value(value).map_err(|e| AppError::InternalServerError(format!("Serialization failed: {}", e)))
}

pub fn json_object(body: Map<String, Value>) -> Json<Value> {
    Json(Value::Object(body))
}
