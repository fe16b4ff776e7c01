//! Route guard decisions
//!
//! Every protected handler asks [`authorize`] before touching persisted
//! data. The decision is pure; turning a denial into an HTTP status is the
//! caller's job.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::identity::{AccessPolicy, SessionUser};
use super::roles::{Role, RoleTable};

/// Named capability checks, one per derived predicate
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    DeleteProperty,
    ManageUsers,
    ViewAllFinances,
    ManageOwnFinances,
    ManageProperties,
    ViewAvailableProperties,
    AccessArchive,
}

impl Capability {
    pub const ALL: [Capability; 7] = [
        Capability::DeleteProperty,
        Capability::ManageUsers,
        Capability::ViewAllFinances,
        Capability::ManageOwnFinances,
        Capability::ManageProperties,
        Capability::ViewAvailableProperties,
        Capability::AccessArchive,
    ];

    pub fn is_granted(&self, roles: &RoleTable, role: impl AsRef<str>) -> bool {
        match self {
            Capability::DeleteProperty => roles.can_delete_property(role),
            Capability::ManageUsers => roles.can_manage_users(role),
            Capability::ViewAllFinances => roles.can_view_all_finances(role),
            Capability::ManageOwnFinances => roles.can_manage_own_finances(role),
            Capability::ManageProperties => roles.can_manage_properties(role),
            Capability::ViewAvailableProperties => roles.can_view_available_properties(role),
            Capability::AccessArchive => roles.can_access_archive(role),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Capability::DeleteProperty => "delete_property",
            Capability::ManageUsers => "manage_users",
            Capability::ViewAllFinances => "view_all_finances",
            Capability::ManageOwnFinances => "manage_own_finances",
            Capability::ManageProperties => "manage_properties",
            Capability::ViewAvailableProperties => "view_available_properties",
            Capability::AccessArchive => "access_archive",
        }
    }
}

impl std::fmt::Display for Capability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Terminal rejections; the guarded operation never runs
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AccessDenied {
    #[error("authentication required")]
    Unauthenticated,

    #[error("role {role} lacks {capability}")]
    Forbidden { role: Role, capability: Capability },
}

/// Proof that a guard passed, carrying who passed it
#[derive(Debug, Clone)]
pub struct Grant<'a> {
    pub user: &'a SessionUser,
    pub role: Role,
    policy: &'a AccessPolicy,
}

impl<'a> Grant<'a> {
    /// Check a further capability for the same caller
    pub fn allows(&self, capability: Capability) -> bool {
        capability.is_granted(self.policy.roles(), self.role)
    }

    /// Escalate to a second capability, failing like the first check would
    pub fn require(&self, capability: Capability) -> Result<(), AccessDenied> {
        if self.allows(capability) {
            Ok(())
        } else {
            Err(AccessDenied::Forbidden {
                role: self.role,
                capability,
            })
        }
    }

    pub fn roles(&self) -> &RoleTable {
        self.policy.roles()
    }

    /// Everything the resolved role may do
    pub fn capabilities(&self) -> Vec<Capability> {
        Capability::ALL
            .into_iter()
            .filter(|c| self.allows(*c))
            .collect()
    }
}

/// Decide whether a request may proceed.
///
/// No session → `Unauthenticated`; predicate false → `Forbidden`.
pub fn authorize<'a>(
    policy: &'a AccessPolicy,
    session: Option<&'a SessionUser>,
    capability: Capability,
) -> Result<Grant<'a>, AccessDenied> {
    let user = session.ok_or(AccessDenied::Unauthenticated)?;
    let role = policy.resolve_role(Some(user));

    let grant = Grant { user, role, policy };
    grant.require(capability)?;
    Ok(grant)
}

/// Resolve the caller without requiring any capability
pub fn authenticate<'a>(
    policy: &'a AccessPolicy,
    session: Option<&'a SessionUser>,
) -> Result<Grant<'a>, AccessDenied> {
    let user = session.ok_or(AccessDenied::Unauthenticated)?;
    Ok(Grant {
        user,
        role: policy.resolve_role(Some(user)),
        policy,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy() -> AccessPolicy {
        AccessPolicy::with_master("owner@propmaster.test")
    }

    #[test]
    fn test_missing_session_is_unauthenticated() {
        let policy = policy();
        for capability in Capability::ALL {
            let err = authorize(&policy, None, capability).unwrap_err();
            assert_eq!(err, AccessDenied::Unauthenticated);
        }
    }

    #[test]
    fn test_viewer_forbidden_from_management() {
        let policy = policy();
        let viewer = SessionUser::new("v@example.com").with_role("viewer");

        let err = authorize(&policy, Some(&viewer), Capability::ManageProperties).unwrap_err();
        assert_eq!(
            err,
            AccessDenied::Forbidden {
                role: Role::Viewer,
                capability: Capability::ManageProperties,
            }
        );
        assert!(authorize(&policy, Some(&viewer), Capability::ViewAvailableProperties).is_ok());
    }

    #[test]
    fn test_grant_carries_resolved_role() {
        let policy = policy();
        let master = SessionUser::new("owner@propmaster.test").with_role("viewer");

        let grant = authorize(&policy, Some(&master), Capability::ManageUsers).unwrap();
        assert_eq!(grant.role, Role::Master);
        assert_eq!(grant.capabilities().len(), Capability::ALL.len());
    }

    #[test]
    fn test_editor_capabilities() {
        let policy = policy();
        let editor = SessionUser::new("e@example.com").with_role("editor");
        let grant = authenticate(&policy, Some(&editor)).unwrap();

        assert_eq!(
            grant.capabilities(),
            vec![
                Capability::ManageOwnFinances,
                Capability::ManageProperties,
                Capability::ViewAvailableProperties,
            ]
        );
        assert!(grant.require(Capability::DeleteProperty).is_err());
    }
}
