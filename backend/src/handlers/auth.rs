//! Sign-in and session handlers

use axum::{body::Bytes, extract::State, http::HeaderMap, Json};
use serde::Serialize;
use shared::access::{Capability, Role, SessionUser};
use shared::models::SignInProfile;

use crate::error::AppError;
use crate::middleware::CurrentSession;
use crate::services::auth::{verify_signature, SignInResponse, SIGNATURE_HEADER};
use crate::services::AuthService;
use crate::AppState;

/// Current session as seen by the UI
#[derive(Serialize)]
pub struct SessionResponse {
    pub user: SessionUser,
    pub role: Role,
    pub capabilities: Vec<Capability>,
}

/// Signed sign-in callback from the OAuth bridge
pub async fn sign_in_callback(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<SignInResponse>, AppError> {
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok());

    if let Err(e) = verify_signature(&state.config.identity.bridge_secret, signature, &body) {
        tracing::warn!("Sign-in callback signature verification failed");
        return Err(e);
    }

    let profile: SignInProfile = serde_json::from_slice(&body)
        .map_err(|e| AppError::ValidationError(format!("Invalid request body: {}", e)))?;

    let auth_service = AuthService::new(state.db.clone(), &state.config);
    let response = auth_service.sign_in(profile, &state.policy).await?;
    state.sessions.remember(response.user.clone()).await;

    Ok(Json(response))
}

/// Who the caller is and what they may do
pub async fn get_session(
    State(state): State<AppState>,
    session: CurrentSession,
) -> Result<Json<SessionResponse>, AppError> {
    let grant = session.signed_in(&state)?;

    Ok(Json(SessionResponse {
        user: grant.user.clone(),
        role: grant.role,
        capabilities: grant.capabilities(),
    }))
}
