//! Identity resolution: which role a request acts with

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::roles::{Role, RoleTable};

/// The authenticated user as carried by a session
///
/// Built once where the session token is decoded; handlers never read
/// untyped session data.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SessionUser {
    /// Account id, absent when the account row could not be written at sign-in
    pub user_id: Option<Uuid>,
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Stored role tag, unvalidated
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
}

impl SessionUser {
    pub fn new(email: impl Into<String>) -> Self {
        Self {
            user_id: None,
            email: email.into(),
            name: None,
            role: None,
        }
    }

    pub fn with_role(mut self, role: impl Into<String>) -> Self {
        self.role = Some(role.into());
        self
    }

    pub fn with_user_id(mut self, user_id: Uuid) -> Self {
        self.user_id = Some(user_id);
        self
    }
}

/// Immutable access configuration, built once at start-up
#[derive(Debug, Clone)]
pub struct AccessPolicy {
    roles: RoleTable,
    master_email: String,
    default_role: Role,
}

impl AccessPolicy {
    pub fn new(roles: RoleTable, master_email: impl Into<String>, default_role: Role) -> Self {
        Self {
            roles,
            master_email: master_email.into(),
            default_role,
        }
    }

    /// Built-in role table with `viewer` as the default role
    pub fn with_master(master_email: impl Into<String>) -> Self {
        Self::new(RoleTable::default(), master_email, Role::Viewer)
    }

    pub fn roles(&self) -> &RoleTable {
        &self.roles
    }

    pub fn master_email(&self) -> &str {
        &self.master_email
    }

    pub fn default_role(&self) -> Role {
        self.default_role
    }

    /// Exact, case-sensitive comparison
    pub fn is_master_email(&self, email: &str) -> bool {
        email == self.master_email
    }

    /// A stored tag is recognized when it names a known role that the
    /// table configures.
    pub fn recognize(&self, tag: &str) -> Option<Role> {
        tag.parse::<Role>()
            .ok()
            .filter(|role| self.roles.contains(role))
    }

    /// Effective role of an account.
    ///
    /// Order matters: no account → default role; master email → `master`
    /// whatever is stored; stored role if recognized; else default role.
    pub fn resolve_role(&self, user: Option<&SessionUser>) -> Role {
        let Some(user) = user else {
            return self.default_role;
        };

        if self.is_master_email(&user.email) {
            return Role::Master;
        }

        user.role
            .as_deref()
            .and_then(|tag| self.recognize(tag))
            .unwrap_or(self.default_role)
    }

    /// Role to store for an account signing in for the first time
    pub fn initial_role(&self, email: &str) -> Role {
        if self.is_master_email(email) {
            Role::Master
        } else {
            self.default_role
        }
    }
}
