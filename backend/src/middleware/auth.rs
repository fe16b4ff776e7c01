//! Session middleware
//!
//! Decodes the bearer session token, reloads the account it names, and
//! exposes the account's current identity to handlers, which then run their
//! route guard against the access policy.

use axum::{
    extract::{Request, State},
    http::HeaderMap,
    middleware::Next,
    response::{IntoResponse, Response},
};
use axum_extra::headers::{authorization::Bearer, Authorization, HeaderMapExt};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use shared::access::{authenticate, authorize, Capability, Grant, SessionUser};
use shared::models::Account;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::services::AccountService;
use crate::AppState;

/// Session token claims
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionClaims {
    /// Account id
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub: Option<String>,
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Stored role at sign-in; the current stored role wins on every request
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    pub exp: i64,
    pub iat: i64,
}

impl SessionClaims {
    /// Claims for `user`, valid for `expiry_seconds` from now
    pub fn for_user(user: &SessionUser, expiry_seconds: i64) -> Self {
        let now = chrono::Utc::now().timestamp();
        Self {
            sub: user.user_id.map(|id| id.to_string()),
            email: user.email.clone(),
            name: user.name.clone(),
            role: user.role.clone(),
            exp: now + expiry_seconds,
            iat: now,
        }
    }

    fn into_session_user(self) -> AppResult<SessionUser> {
        let user_id = match self.sub.as_deref() {
            Some(sub) => Some(
                Uuid::parse_str(sub)
                    .map_err(|_| AppError::InvalidToken("Invalid user ID in token".to_string()))?,
            ),
            None => None,
        };

        Ok(SessionUser {
            user_id,
            email: self.email,
            name: self.name,
            role: self.role,
        })
    }
}

/// Sign session claims
pub fn encode_session(claims: &SessionClaims, secret: &str) -> AppResult<String> {
    encode(
        &Header::default(),
        claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| AppError::Internal(format!("Token generation failed: {}", e)))
}

/// Decode and validate a session token
pub fn decode_session(token: &str, secret: &str) -> AppResult<SessionUser> {
    decode::<SessionClaims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|e| AppError::InvalidToken(e.to_string()))?
    .claims
    .into_session_user()
}

/// Session middleware.
///
/// Protected groups reject a request without an `Authorization` header here,
/// before any body or path extractor runs. A valid token only names the
/// account: its status and stored role are re-read for every request, so a
/// suspension or role change applies to sessions already issued.
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    match authenticate_request(&state, request.headers()).await {
        Ok(user) => {
            request.extensions_mut().insert(user);
            next.run(request).await
        }
        Err(e) => {
            if !matches!(e, AppError::Unauthenticated) {
                tracing::warn!("Rejected session: {}", e);
            }
            e.into_response()
        }
    }
}

async fn authenticate_request(state: &AppState, headers: &HeaderMap) -> AppResult<SessionUser> {
    let Authorization(bearer) = headers
        .typed_get::<Authorization<Bearer>>()
        .ok_or(AppError::Unauthenticated)?;

    let claimed = decode_session(bearer.token(), &state.config.session.secret)?;
    let account_id = claimed
        .user_id
        .ok_or_else(|| AppError::InvalidToken("Token has no subject".to_string()))?;

    let account = load_account(state, account_id)
        .await?
        .ok_or_else(|| AppError::InvalidToken("Account no longer exists".to_string()))?;

    if !account.status.can_sign_in() {
        return Err(AppError::Forbidden("This account has been suspended".to_string()));
    }

    Ok(account.session_user())
}

async fn load_account(state: &AppState, account_id: Uuid) -> AppResult<Option<Account>> {
    if let Some(account) = state.sessions.get(account_id).await {
        return Ok(Some(account));
    }

    let account = AccountService::new(state.db.clone())
        .find_account(account_id)
        .await?;
    if let Some(account) = &account {
        state.sessions.remember(account.clone()).await;
    }
    Ok(account)
}

/// Extractor for the current session, absent when unauthenticated
#[derive(Clone, Debug, Default)]
pub struct CurrentSession(pub Option<SessionUser>);

#[axum::async_trait]
impl<S> axum::extract::FromRequestParts<S> for CurrentSession
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(
        parts: &mut axum::http::request::Parts,
        _state: &S,
    ) -> Result<Self, Self::Rejection> {
        Ok(CurrentSession(parts.extensions.get::<SessionUser>().cloned()))
    }
}

impl CurrentSession {
    /// Route guard: reject unless the caller holds `capability`
    pub fn require<'a>(&'a self, state: &'a AppState, capability: Capability) -> AppResult<Grant<'a>> {
        Ok(authorize(&state.policy, self.0.as_ref(), capability)?)
    }

    /// Route guard for endpoints open to any signed-in account
    pub fn signed_in<'a>(&'a self, state: &'a AppState) -> AppResult<Grant<'a>> {
        Ok(authenticate(&state.policy, self.0.as_ref())?)
    }
}
