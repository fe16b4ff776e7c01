//! User account models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::access::SessionUser;

/// Account status
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum AccountStatus {
    Active,
    #[default]
    Pending,
    Suspended,
}

impl AccountStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AccountStatus::Active => "active",
            AccountStatus::Pending => "pending",
            AccountStatus::Suspended => "suspended",
        }
    }

    /// Suspended accounts may not start new sessions
    pub fn can_sign_in(&self) -> bool {
        !matches!(self, AccountStatus::Suspended)
    }
}

impl std::fmt::Display for AccountStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for AccountStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(AccountStatus::Active),
            "pending" => Ok(AccountStatus::Pending),
            "suspended" => Ok(AccountStatus::Suspended),
            other => Err(format!("unknown account status: {}", other)),
        }
    }
}

/// An authenticated end user
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    pub id: Uuid,
    pub email: String,
    pub name: Option<String>,
    pub image: Option<String>,
    /// Stored role tag; resolution to an effective role happens per request
    pub role: Option<String>,
    pub status: AccountStatus,
    pub last_login: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Account {
    /// Session identity for this account
    pub fn session_user(&self) -> SessionUser {
        SessionUser {
            user_id: Some(self.id),
            email: self.email.clone(),
            name: self.name.clone(),
            role: self.role.clone(),
        }
    }
}

/// Profile relayed by the OAuth bridge after a successful provider sign-in
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct SignInProfile {
    #[validate(email)]
    pub email: String,
    #[validate(length(max = 255))]
    pub name: Option<String>,
    pub image: Option<String>,
}

/// Administrative change to an account
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateAccountInput {
    pub role: Option<String>,
    pub status: Option<AccountStatus>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_round_trip() {
        for status in [
            AccountStatus::Active,
            AccountStatus::Pending,
            AccountStatus::Suspended,
        ] {
            assert_eq!(status.as_str().parse::<AccountStatus>(), Ok(status));
        }
        assert!("deleted".parse::<AccountStatus>().is_err());
    }

    #[test]
    fn test_suspended_cannot_sign_in() {
        assert!(AccountStatus::Active.can_sign_in());
        assert!(AccountStatus::Pending.can_sign_in());
        assert!(!AccountStatus::Suspended.can_sign_in());
    }

    #[test]
    fn test_session_user_carries_stored_role() {
        let now = Utc::now();
        let account = Account {
            id: Uuid::new_v4(),
            email: "agent@example.com".to_string(),
            name: None,
            image: None,
            role: Some("editor".to_string()),
            status: AccountStatus::Active,
            last_login: None,
            created_at: now,
            updated_at: now,
        };
        let user = account.session_user();
        assert_eq!(user.user_id, Some(account.id));
        assert_eq!(user.role.as_deref(), Some("editor"));
    }

    #[test]
    fn test_profile_requires_email() {
        let profile = SignInProfile {
            email: "not-an-email".to_string(),
            name: Some("Agent".to_string()),
            image: None,
        };
        assert!(profile.validate().is_err());
    }
}
