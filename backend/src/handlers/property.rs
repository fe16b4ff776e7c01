//! Property listing handlers

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Serialize;
use shared::access::{Capability, Role};
use shared::models::{
    can_edit_property, may_set_private, Property, PropertyFilter, PropertyInput,
    PropertyVisibility,
};
use uuid::Uuid;
use validator::Validate;

use crate::error::AppError;
use crate::middleware::CurrentSession;
use crate::services::PropertyService;
use crate::AppState;

/// Response for list of properties
#[derive(Serialize)]
pub struct PropertiesResponse {
    pub properties: Vec<Property>,
    pub role: Role,
}

fn private_forbidden() -> AppError {
    AppError::Forbidden("Only master users can set properties to private".to_string())
}

/// List listings visible to the caller
pub async fn list_properties(
    State(state): State<AppState>,
    session: CurrentSession,
    Query(filter): Query<PropertyFilter>,
) -> Result<Json<PropertiesResponse>, AppError> {
    let grant = session.require(&state, Capability::ViewAvailableProperties)?;

    let property_service = PropertyService::new(state.db.clone());
    let properties = property_service
        .list_properties(&PropertyVisibility::for_grant(&grant), &filter)
        .await?;

    Ok(Json(PropertiesResponse {
        properties,
        role: grant.role,
    }))
}

/// Get a listing the caller may see
pub async fn get_property(
    State(state): State<AppState>,
    session: CurrentSession,
    Path(property_id): Path<Uuid>,
) -> Result<Json<Property>, AppError> {
    let grant = session.require(&state, Capability::ViewAvailableProperties)?;

    let property_service = PropertyService::new(state.db.clone());
    let property = property_service
        .get_property(&PropertyVisibility::for_grant(&grant), property_id)
        .await?;

    Ok(Json(property))
}

/// Create a listing owned by the caller
pub async fn create_property(
    State(state): State<AppState>,
    session: CurrentSession,
    Json(input): Json<PropertyInput>,
) -> Result<(StatusCode, Json<Property>), AppError> {
    let grant = session.require(&state, Capability::ManageProperties)?;

    let input = input.normalized();
    input.validate()?;
    if !may_set_private(&grant, input.status_or_default()) {
        return Err(private_forbidden());
    }

    let property_service = PropertyService::new(state.db.clone());
    let property = property_service
        .create_property(grant.user.user_id, input)
        .await?;

    Ok((StatusCode::CREATED, Json(property)))
}

/// Update a listing
pub async fn update_property(
    State(state): State<AppState>,
    session: CurrentSession,
    Path(property_id): Path<Uuid>,
    Json(input): Json<PropertyInput>,
) -> Result<Json<Property>, AppError> {
    let grant = session.require(&state, Capability::ManageProperties)?;

    let input = input.normalized();
    input.validate()?;
    if let Some(status) = input.status {
        if !may_set_private(&grant, status) {
            return Err(private_forbidden());
        }
    }

    let property_service = PropertyService::new(state.db.clone());
    let existing = property_service
        .get_property(&PropertyVisibility::for_grant(&grant), property_id)
        .await?;

    if !can_edit_property(&grant, &existing) {
        return Err(AppError::Forbidden(
            "You can only edit properties you created".to_string(),
        ));
    }

    let property = property_service.update_property(property_id, input).await?;

    Ok(Json(property))
}

/// Delete a listing
pub async fn delete_property(
    State(state): State<AppState>,
    session: CurrentSession,
    Path(property_id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    session.require(&state, Capability::DeleteProperty)?;

    let property_service = PropertyService::new(state.db.clone());
    property_service.delete_property(property_id).await?;

    Ok(StatusCode::NO_CONTENT)
}
