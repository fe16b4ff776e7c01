//! Archive dashboard and bulk operation handlers

use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;
use shared::access::Capability;
use shared::models::{ArchiveStats, BulkAction, BulkRequest, ProcessedProperty, Property};
use shared::types::BatchResult;

use crate::error::AppError;
use crate::middleware::CurrentSession;
use crate::services::ArchiveService;
use crate::AppState;

/// Response for list of archived properties
#[derive(Serialize)]
pub struct ArchivedPropertiesResponse {
    pub properties: Vec<Property>,
    pub total: usize,
}

/// Response for a bulk operation
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkResponse {
    pub action: String,
    #[serde(flatten)]
    pub result: BatchResult<ProcessedProperty>,
    pub message: String,
}

/// Archived listings
pub async fn list_archived(
    State(state): State<AppState>,
    session: CurrentSession,
) -> Result<Json<ArchivedPropertiesResponse>, AppError> {
    session.require(&state, Capability::AccessArchive)?;

    let archive_service = ArchiveService::new(state.db.clone());
    let properties = archive_service.list_archived().await?;

    Ok(Json(ArchivedPropertiesResponse {
        total: properties.len(),
        properties,
    }))
}

/// Archive statistics
pub async fn get_archive_stats(
    State(state): State<AppState>,
    session: CurrentSession,
) -> Result<Json<ArchiveStats>, AppError> {
    session.require(&state, Capability::AccessArchive)?;

    let archive_service = ArchiveService::new(state.db.clone());
    let stats = archive_service.archive_stats().await?;

    Ok(Json(stats))
}

/// Apply a bulk action; 206 when some items failed
pub async fn bulk_update(
    State(state): State<AppState>,
    session: CurrentSession,
    Json(request): Json<BulkRequest>,
) -> Result<(StatusCode, Json<BulkResponse>), AppError> {
    let grant = session.require(&state, Capability::AccessArchive)?;
    if request.action == BulkAction::Delete {
        grant.require(Capability::DeleteProperty)?;
    }

    let archive_service = ArchiveService::new(state.db.clone());
    let result = archive_service.bulk_update(&request).await?;

    let status = if result.is_partial() {
        StatusCode::PARTIAL_CONTENT
    } else {
        StatusCode::OK
    };
    let action = request.action.name();

    Ok((
        status,
        Json(BulkResponse {
            action: action.to_string(),
            message: format!(
                "Bulk {} completed: {}/{} successful",
                action, result.successful, result.total_requested
            ),
            result,
        }),
    ))
}
