use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use serde_json::json;

use pagetally_core::property::{CreatePropertyParams, UpdatePropertyParams};
use pagetally_core::store::bounded;

use crate::{error::AppError, state::AppState};

#[derive(Debug, Deserialize)]
pub struct CreatePropertyRequest {
    pub name: String,
    pub domain: String,
}

#[derive(Debug, Deserialize)]
pub struct UpdatePropertyRequest {
    pub name: Option<String>,
    pub domain: Option<String>,
    pub active: Option<bool>,
}

#[derive(Debug, Deserialize)]
pub struct ListPropertiesQuery {
    pub name: Option<String>,
}

fn validate_name(name: &str) -> Result<String, AppError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(AppError::invalid_field("name", "name is required"));
    }
    Ok(name.to_string())
}

/// Domains are bare hostnames: they are compared against the host part of
/// the tracking request's `Origin`.
fn validate_domain(domain: &str) -> Result<String, AppError> {
    let domain = domain.trim();
    if domain.is_empty() {
        return Err(AppError::invalid_field("domain", "domain is required"));
    }
    if domain.contains("://") || domain.contains('/') || domain.contains(char::is_whitespace) {
        return Err(AppError::invalid_field(
            "domain",
            "domain must be a bare hostname such as example.com",
        ));
    }
    Ok(domain.to_ascii_lowercase())
}

/// `POST /api/properties`: register a property. The response carries the
/// token to embed in the tracking script.
pub async fn create_property(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreatePropertyRequest>,
) -> Result<impl IntoResponse, AppError> {
    let params = CreatePropertyParams {
        name: validate_name(&req.name)?,
        domain: validate_domain(&req.domain)?,
    };

    let property = bounded(
        state.config.storage_timeout(),
        state.store.create_property(params),
    )
    .await?;
    tracing::info!(property_id = %property.id, domain = %property.domain, "property created");

    Ok((StatusCode::CREATED, Json(json!({ "data": property }))))
}

/// `GET /api/properties`: all properties, ordered by name.
pub async fn list_properties(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListPropertiesQuery>,
) -> Result<impl IntoResponse, AppError> {
    let properties = bounded(
        state.config.storage_timeout(),
        state.store.list_properties(query.name.as_deref()),
    )
    .await?;
    Ok(Json(json!({ "data": properties })))
}

/// `GET /api/properties/{id}`
pub async fn get_property(
    State(state): State<Arc<AppState>>,
    Path(property_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let property = bounded(
        state.config.storage_timeout(),
        state.store.get_property(&property_id),
    )
    .await?;
    match property {
        Some(property) => Ok(Json(json!({ "data": property }))),
        None => Err(AppError::NotFound("Property not found".to_string())),
    }
}

/// `PUT /api/properties/{id}`: change name, domain or active flag.
pub async fn update_property(
    State(state): State<Arc<AppState>>,
    Path(property_id): Path<String>,
    Json(req): Json<UpdatePropertyRequest>,
) -> Result<impl IntoResponse, AppError> {
    let params = UpdatePropertyParams {
        name: req.name.as_deref().map(validate_name).transpose()?,
        domain: req.domain.as_deref().map(validate_domain).transpose()?,
        active: req.active,
    };

    let updated = bounded(
        state.config.storage_timeout(),
        state.store.update_property(&property_id, params),
    )
    .await?;
    match updated {
        Some(property) => Ok(Json(json!({ "data": property }))),
        None => Err(AppError::NotFound("Property not found".to_string())),
    }
}

/// `DELETE /api/properties/{id}`: delete a property and all of its events.
pub async fn delete_property(
    State(state): State<Arc<AppState>>,
    Path(property_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let deleted = bounded(
        state.config.storage_timeout(),
        state.store.delete_property(&property_id),
    )
    .await?;
    if !deleted {
        return Err(AppError::NotFound("Property not found".to_string()));
    }
    Ok(StatusCode::NO_CONTENT)
}
