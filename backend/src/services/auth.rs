//! Sign-in service: verifies the identity bridge callback and issues sessions

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use hmac::{Hmac, Mac};
use serde::Serialize;
use sha2::Sha256;
use shared::access::{AccessPolicy, Role};
use shared::models::{Account, SignInProfile};
use sqlx::PgPool;
use validator::Validate;

use super::AccountService;
use crate::config::Config;
use crate::error::{AppError, AppResult};
use crate::middleware::auth::{encode_session, SessionClaims};

type HmacSha256 = Hmac<Sha256>;

/// Header carrying base64(HMAC-SHA256(bridge_secret, body))
pub const SIGNATURE_HEADER: &str = "x-signature";

/// Authentication service
#[derive(Clone)]
pub struct AuthService {
    accounts: AccountService,
    session_secret: String,
    session_expiry: i64,
}

/// Response after a successful sign-in
#[derive(Debug, Serialize)]
pub struct SignInResponse {
    pub token: String,
    pub token_type: String,
    pub expires_in: i64,
    /// Effective role for this account
    pub role: Role,
    pub user: Account,
}

/// Check a bridge callback signature against the raw body
pub fn verify_signature(secret: &str, signature: Option<&str>, body: &[u8]) -> AppResult<()> {
    let signature = signature.ok_or(AppError::InvalidSignature)?;
    let provided = BASE64
        .decode(signature.trim())
        .map_err(|_| AppError::InvalidSignature)?;

    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|_| AppError::Internal("Failed to create HMAC".to_string()))?;
    mac.update(body);

    mac.verify_slice(&provided)
        .map_err(|_| AppError::InvalidSignature)
}

/// Compute the signature a bridge would send for `body`
#[cfg(test)]
pub(crate) fn sign_body(secret: &str, body: &[u8]) -> AppResult<String> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|_| AppError::Internal("Failed to create HMAC".to_string()))?;
    mac.update(body);
    Ok(BASE64.encode(mac.finalize().into_bytes()))
}

impl AuthService {
    /// Create a new AuthService instance
    pub fn new(db: PgPool, config: &Config) -> Self {
        Self {
            accounts: AccountService::new(db),
            session_secret: config.session.secret.clone(),
            session_expiry: config.session.expiry_seconds,
        }
    }

    /// Record the sign-in and issue a session token
    pub async fn sign_in(
        &self,
        profile: SignInProfile,
        policy: &AccessPolicy,
    ) -> AppResult<SignInResponse> {
        profile.validate()?;

        let account = self.accounts.record_sign_in(&profile, policy).await?;
        let token = self.issue_session(&account)?;

        let role = policy.resolve_role(Some(&account.session_user()));

        Ok(SignInResponse {
            token,
            token_type: "Bearer".to_string(),
            expires_in: self.session_expiry,
            role,
            user: account,
        })
    }

    fn issue_session(&self, account: &Account) -> AppResult<String> {
        let claims = SessionClaims::for_user(&account.session_user(), self.session_expiry);
        encode_session(&claims, &self.session_secret)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BODY: &[u8] = br#"{"email":"agent@example.com","name":"Agent"}"#;

    #[test]
    fn test_signed_body_verifies() {
        let signature = sign_body("bridge", BODY).unwrap();
        assert!(verify_signature("bridge", Some(&signature), BODY).is_ok());
    }

    #[test]
    fn test_missing_signature_rejected() {
        assert!(matches!(
            verify_signature("bridge", None, BODY),
            Err(AppError::InvalidSignature)
        ));
    }

    #[test]
    fn test_tampered_body_rejected() {
        let signature = sign_body("bridge", BODY).unwrap();
        let tampered = br#"{"email":"owner@propmaster.test","name":"Agent"}"#;
        assert!(verify_signature("bridge", Some(&signature), tampered).is_err());
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let signature = sign_body("other", BODY).unwrap();
        assert!(verify_signature("bridge", Some(&signature), BODY).is_err());
    }

    #[test]
    fn test_non_base64_signature_rejected() {
        assert!(verify_signature("bridge", Some("not base64!"), BODY).is_err());
    }
}
