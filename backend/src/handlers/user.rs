//! Account administration handlers

use axum::{
    extract::{Path, State},
    Json,
};
use serde::Serialize;
use shared::access::Capability;
use shared::models::{Account, UpdateAccountInput};
use uuid::Uuid;

use crate::error::AppError;
use crate::middleware::CurrentSession;
use crate::services::AccountService;
use crate::AppState;

/// Response for list of accounts
#[derive(Serialize)]
pub struct UsersResponse {
    pub users: Vec<Account>,
}

/// List all accounts
pub async fn list_users(
    State(state): State<AppState>,
    session: CurrentSession,
) -> Result<Json<UsersResponse>, AppError> {
    session.require(&state, Capability::ManageUsers)?;

    let account_service = AccountService::new(state.db.clone());
    let users = account_service.list_accounts().await?;

    Ok(Json(UsersResponse { users }))
}

/// Change an account's role or status
pub async fn update_user(
    State(state): State<AppState>,
    session: CurrentSession,
    Path(user_id): Path<Uuid>,
    Json(input): Json<UpdateAccountInput>,
) -> Result<Json<Account>, AppError> {
    let grant = session.require(&state, Capability::ManageUsers)?;

    let account_service = AccountService::new(state.db.clone());
    let account = account_service
        .update_account(user_id, input, &state.policy)
        .await?;
    state.sessions.remember(account.clone()).await;

    tracing::info!(
        admin = %grant.user.email,
        account = %account.email,
        "Account changed by administrator"
    );

    Ok(Json(account))
}
