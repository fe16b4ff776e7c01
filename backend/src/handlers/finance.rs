//! Finance record handlers

use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use serde::Serialize;
use shared::access::{Capability, Role};
use shared::models::{
    CreateFinanceInput, FinanceFilter, FinanceRecord, FinanceScope, FinanceSummary,
    PropertyVisibility, UpdateFinanceInput,
};
use uuid::Uuid;
use validator::Validate;

use crate::error::AppError;
use crate::middleware::CurrentSession;
use crate::services::FinanceService;
use crate::AppState;

/// Response for list of finance records
#[derive(Serialize)]
pub struct FinancesResponse {
    pub records: Vec<FinanceRecord>,
    pub summary: FinanceSummary,
    pub role: Role,
}

/// List finance records within the caller's scope
pub async fn list_finances(
    State(state): State<AppState>,
    session: CurrentSession,
    Query(filter): Query<FinanceFilter>,
) -> Result<Json<FinancesResponse>, AppError> {
    let grant = session.require(&state, Capability::ManageOwnFinances)?;

    let finance_service = FinanceService::new(state.db.clone());
    let records = finance_service
        .list_records(FinanceScope::for_grant(&grant), &filter)
        .await?;

    Ok(Json(FinancesResponse {
        summary: FinanceSummary::from_records(&records),
        records,
        role: grant.role,
    }))
}

/// Export finance records as CSV
pub async fn export_finances(
    State(state): State<AppState>,
    session: CurrentSession,
    Query(filter): Query<FinanceFilter>,
) -> Result<impl IntoResponse, AppError> {
    let grant = session.require(&state, Capability::ManageOwnFinances)?;

    let finance_service = FinanceService::new(state.db.clone());
    let records = finance_service
        .list_records(FinanceScope::for_grant(&grant), &filter)
        .await?;
    let csv = FinanceService::export_to_csv(&records)?;

    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8"),
            (
                header::CONTENT_DISPOSITION,
                "attachment; filename=\"finances.csv\"",
            ),
        ],
        csv,
    ))
}

/// Get a finance record
pub async fn get_finance(
    State(state): State<AppState>,
    session: CurrentSession,
    Path(record_id): Path<Uuid>,
) -> Result<Json<FinanceRecord>, AppError> {
    let grant = session.require(&state, Capability::ManageOwnFinances)?;

    let finance_service = FinanceService::new(state.db.clone());
    let record = finance_service
        .get_record(FinanceScope::for_grant(&grant), record_id)
        .await?;

    Ok(Json(record))
}

/// Record a payment owned by the caller
pub async fn create_finance(
    State(state): State<AppState>,
    session: CurrentSession,
    Json(input): Json<CreateFinanceInput>,
) -> Result<(StatusCode, Json<FinanceRecord>), AppError> {
    let grant = session.require(&state, Capability::ManageOwnFinances)?;
    input.validate()?;

    let finance_service = FinanceService::new(state.db.clone());
    let record = finance_service
        .create_record(grant.user.user_id, &PropertyVisibility::for_grant(&grant), input)
        .await?;

    Ok((StatusCode::CREATED, Json(record)))
}

/// Update a finance record
pub async fn update_finance(
    State(state): State<AppState>,
    session: CurrentSession,
    Path(record_id): Path<Uuid>,
    Json(input): Json<UpdateFinanceInput>,
) -> Result<Json<FinanceRecord>, AppError> {
    let grant = session.require(&state, Capability::ManageOwnFinances)?;
    input.validate()?;

    let scope = FinanceScope::for_grant(&grant);
    let finance_service = FinanceService::new(state.db.clone());
    finance_service.get_record(scope, record_id).await?;

    if !scope.may_edit() {
        return Err(AppError::Forbidden(
            "Finance records cannot be edited after creation".to_string(),
        ));
    }

    let record = finance_service
        .update_record(record_id, &PropertyVisibility::for_grant(&grant), input)
        .await?;

    Ok(Json(record))
}

/// Delete a finance record
pub async fn delete_finance(
    State(state): State<AppState>,
    session: CurrentSession,
    Path(record_id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    session.require(&state, Capability::DeleteProperty)?;

    let finance_service = FinanceService::new(state.db.clone());
    finance_service.delete_record(record_id).await?;

    Ok(StatusCode::NO_CONTENT)
}
