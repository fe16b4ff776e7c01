//! Sharing link handlers

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Serialize;
use shared::access::{Capability, Grant};
use shared::models::{
    can_edit_property, CreateShareInput, Property, PropertyVisibility, ShareInfo, ShareLink,
    ShareStatus, SharedListing, SharedProperty,
};
use uuid::Uuid;
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::middleware::CurrentSession;
use crate::services::{PropertyService, ShareService};
use crate::AppState;

/// A link with its current status
#[derive(Serialize)]
pub struct ShareLinkResponse {
    #[serde(flatten)]
    pub link: ShareLink,
    pub status: ShareStatus,
}

impl From<ShareLink> for ShareLinkResponse {
    fn from(link: ShareLink) -> Self {
        let status = link.status_at(chrono::Utc::now());
        Self { link, status }
    }
}

/// Response for a listing's links
#[derive(Serialize)]
pub struct SharesResponse {
    pub property_id: Uuid,
    pub shares: Vec<ShareLinkResponse>,
}

/// Load a listing the caller may see and edit
async fn owned_property(state: &AppState, grant: &Grant<'_>, property_id: Uuid) -> AppResult<Property> {
    let property = PropertyService::new(state.db.clone())
        .get_property(&PropertyVisibility::for_grant(grant), property_id)
        .await?;

    if !can_edit_property(grant, &property) {
        return Err(AppError::Forbidden(
            "You can only share properties you created".to_string(),
        ));
    }
    Ok(property)
}

/// Create a sharing link for a listing
pub async fn create_share(
    State(state): State<AppState>,
    session: CurrentSession,
    Path(property_id): Path<Uuid>,
    Json(input): Json<CreateShareInput>,
) -> Result<(StatusCode, Json<ShareLinkResponse>), AppError> {
    let grant = session.require(&state, Capability::ManageProperties)?;
    input.validate()?;

    let property = owned_property(&state, &grant, property_id).await?;
    if !property.is_shareable() {
        return Err(AppError::Validation {
            field: "property_id".to_string(),
            message: "Archived and private properties cannot be shared".to_string(),
        });
    }

    let link = ShareService::new(state.db.clone())
        .create_share(property.id, grant.user.user_id, &input)
        .await?;

    Ok((StatusCode::CREATED, Json(link.into())))
}

/// List a listing's sharing links
pub async fn list_shares(
    State(state): State<AppState>,
    session: CurrentSession,
    Path(property_id): Path<Uuid>,
) -> Result<Json<SharesResponse>, AppError> {
    let grant = session.require(&state, Capability::ManageProperties)?;
    let property = owned_property(&state, &grant, property_id).await?;

    let shares = ShareService::new(state.db.clone())
        .list_shares(property.id)
        .await?;

    Ok(Json(SharesResponse {
        property_id: property.id,
        shares: shares.into_iter().map(ShareLinkResponse::from).collect(),
    }))
}

/// Deactivate a sharing link
pub async fn revoke_share(
    State(state): State<AppState>,
    session: CurrentSession,
    Path((property_id, share_id)): Path<(Uuid, Uuid)>,
) -> Result<StatusCode, AppError> {
    let grant = session.require(&state, Capability::ManageProperties)?;
    let property = owned_property(&state, &grant, property_id).await?;

    ShareService::new(state.db.clone())
        .deactivate_share(property.id, share_id)
        .await?;

    Ok(StatusCode::NO_CONTENT)
}

/// Public: the listing behind a sharing token
pub async fn view_shared_property(
    State(state): State<AppState>,
    Path(token): Path<String>,
) -> Result<Json<SharedListing>, AppError> {
    let (link, property) = ShareService::new(state.db.clone())
        .open_share(&token)
        .await?;

    Ok(Json(SharedListing {
        property: SharedProperty::from_property(&property, link.allow_downloads),
        share: ShareInfo::from(&link),
    }))
}
